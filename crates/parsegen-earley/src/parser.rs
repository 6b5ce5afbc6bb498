use crate::item::{Back, EItem, EState};
use parsegen_core::{
  backend::{ApproxError, ParserBackend},
  grammar::{Grammar, ProdId, ProductionIter, RuleId, TokenKind},
  info_tree::{IndentSpec, InfoNode},
  tree::{NodeRef, Priority, TreeStore},
};
use parsegen_runtime::{Map, ParsegenResult};

/// Tri-state memoization for rule nullability: a rule being recomputed is
/// tentatively treated as nullable so mutually recursive nullable rules
/// don't infinite-loop the memoizer.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Nullable {
  No,
  Yes,
  Computing,
}

/// The classical Earley backend.
pub struct EarleyParser {
  grammar: Grammar,
  store: TreeStore,

  sets: Vec<Vec<EState>>,
  index: Vec<Map<(ProdId, u32, u32), usize>>,
  nullable: Map<RuleId, Nullable>,

  input: Vec<char>,
  start_prod: Option<ProdId>,
  accept_at: Option<usize>,
  error_at: usize,

  tree: Option<NodeRef>,
  info_tree: Option<InfoNode>,
}

impl Default for EarleyParser {
  fn default() -> Self {
    EarleyParser::new()
  }
}

impl EarleyParser {
  pub fn new() -> Self {
    EarleyParser {
      grammar: Grammar::new(),
      store: TreeStore::new(),
      sets: Vec::new(),
      index: Vec::new(),
      nullable: Map::new(),
      input: Vec::new(),
      start_prod: None,
      accept_at: None,
      error_at: 0,
      tree: None,
      info_tree: None,
    }
  }

  fn reset_parse_state(&mut self) {
    self.store.clear();
    self.sets.clear();
    self.index.clear();
    self.input.clear();
    self.start_prod = None;
    self.accept_at = None;
    self.error_at = 0;
    self.tree = None;
    self.info_tree = None;
  }

  /// `$start -> root`, registered fresh (idempotently) every parse so a
  /// caller can reuse one `EarleyParser` across several root rules.
  fn wrap_root(&mut self, root: RuleId) -> ProdId {
    use parsegen_core::grammar::{Production, Token};
    let start = self.grammar.add_rule("$start");
    self.grammar.add_production(start, Production::new(ProdId::from(0), 0, vec![Token::rule(root)]))
  }

  fn matches_empty_rule(&mut self, rule: RuleId) -> bool {
    match self.nullable.get(&rule) {
      Some(Nullable::Yes) => return true,
      Some(Nullable::No) => return false,
      Some(Nullable::Computing) => return true,
      None => {}
    }
    self.nullable.insert(rule, Nullable::Computing);
    let prods: Vec<ProdId> = self.grammar.iter_productions(rule).collect();
    let result = prods.into_iter().any(|p| self.matches_empty_production(p));
    self.nullable.insert(rule, if result { Nullable::Yes } else { Nullable::No });
    result
  }

  fn matches_empty_production(&mut self, prod: ProdId) -> bool {
    let mut stack = vec![ProductionIter::start(prod)];
    let mut seen = parsegen_runtime::Set::new();
    while let Some(it) = stack.pop() {
      if !seen.insert(it) {
        continue;
      }
      if it.end(&self.grammar) {
        return true;
      }
      if let Some(b) = it.next_b(&self.grammar) {
        stack.push(b);
      }
      let nullable_here = match it.token(&self.grammar).map(|t| self.grammar.resolve(t)) {
        Some(TokenKind::Rule(r)) => self.matches_empty_rule(r),
        Some(TokenKind::Regex(id)) => self.grammar.regex(id).matches_empty(),
        Some(TokenKind::Delimiter) => unreachable!("Grammar::resolve never returns Delimiter"),
        None => false,
      };
      if nullable_here {
        if let Some(a) = it.next_a(&self.grammar) {
          stack.push(a);
        }
      }
    }
    false
  }

  fn add_item(&mut self, set: usize, candidate: EItem, back: Back) -> usize {
    let key = (candidate.iter.production_id(), candidate.iter.position(), candidate.origin);
    if let Some(&existing) = self.index[set].get(&key) {
      let existing_node = self.materialize(set, existing);
      let candidate_node = self.materialize_candidate(candidate.iter.production_id(), &back);
      if self.store.priority(&self.grammar, candidate_node, existing_node) == Priority::Higher {
        self.sets[set][existing].back = back;
      }
      existing
    } else {
      let idx = self.sets[set].len();
      self.sets[set].push(EState { item: candidate, back });
      self.index[set].insert(key, idx);
      idx
    }
  }

  fn walk_children(&mut self, mut back: Back) -> Vec<NodeRef> {
    let mut children = Vec::new();
    loop {
      if let Some((cs, ci)) = back.completed_child {
        children.push(self.materialize(cs as usize, ci as usize));
      } else if let Some((s, e)) = back.scanned {
        children.push(self.store.alloc_terminal(s, e));
      }
      match back.prev {
        Some((s, i)) => back = self.sets[s as usize][i as usize].back.clone(),
        None => break,
      }
    }
    children.reverse();
    children
  }

  fn materialize(&mut self, set: usize, idx: usize) -> NodeRef {
    let prod = self.sets[set][idx].item.iter.production_id();
    let back = self.sets[set][idx].back.clone();
    let children = self.walk_children(back);
    self.store.alloc_nonterminal(prod, children)
  }

  fn materialize_candidate(&mut self, prod: ProdId, back: &Back) -> NodeRef {
    let children = self.walk_children(back.clone());
    self.store.alloc_nonterminal(prod, children)
  }

  fn predictor(&mut self, set: usize, idx: usize, rule: RuleId) {
    let prods: Vec<ProdId> = self.grammar.iter_productions(rule).collect();
    for p in prods {
      self.add_item(set, EItem { iter: ProductionIter::start(p), origin: set as u32 }, Back::default());
    }
    if self.matches_empty_rule(rule) {
      let d = self.sets[set][idx].item;
      if let Some(next) = d.iter.next_a(&self.grammar) {
        self.add_item(
          set,
          EItem { iter: next, origin: d.origin },
          Back { prev: Some((set as u32, idx as u32)), scanned: None, completed_child: None },
        );
      }
    }
  }

  fn scanner(&mut self, set: usize, idx: usize, regex: parsegen_core::grammar::RegexId) {
    let d = self.sets[set][idx].item;
    let Some(end) = self.grammar.regex(regex).match_at(&self.input, set) else { return };
    let Some(next) = d.iter.next_a(&self.grammar) else { return };
    self.add_item(
      end,
      EItem { iter: next, origin: d.origin },
      Back { prev: Some((set as u32, idx as u32)), scanned: Some((set as u32, end as u32)), completed_child: None },
    );
  }

  fn completer(&mut self, set: usize, idx: usize) {
    let item = self.sets[set][idx].item;
    let prod = item.iter.production_id();
    let rule = self.grammar.production_rule(prod);
    let origin = item.origin as usize;
    let snapshot = self.sets[origin].len();
    for k in 0..snapshot {
      let d = self.sets[origin][k].item;
      if d.iter.end(&self.grammar) {
        continue;
      }
      let Some(tok) = d.iter.token(&self.grammar) else { continue };
      if !matches!(self.grammar.resolve(tok), TokenKind::Rule(r) if r == rule) {
        continue;
      }
      let Some(next) = d.iter.next_a(&self.grammar) else { continue };
      self.add_item(
        set,
        EItem { iter: next, origin: d.origin },
        Back { prev: Some((origin as u32, k as u32)), scanned: None, completed_child: Some((set as u32, idx as u32)) },
      );
    }
  }

  fn try_next_b(&mut self, set: usize, idx: usize) {
    let d = self.sets[set][idx].item;
    if let Some(nb) = d.iter.next_b(&self.grammar) {
      self.add_item(set, EItem { iter: nb, origin: d.origin }, Back { prev: Some((set as u32, idx as u32)), scanned: None, completed_child: None });
    }
  }

  fn process(&mut self, set: usize) {
    let mut j = 0;
    while j < self.sets[set].len() {
      let item = self.sets[set][j].item;
      self.try_next_b(set, j);
      if item.iter.end(&self.grammar) {
        self.completer(set, j);
      } else if let Some(tok) = item.iter.token(&self.grammar) {
        match self.grammar.resolve(tok) {
          TokenKind::Rule(r) => self.predictor(set, j, r),
          TokenKind::Regex(id) => self.scanner(set, j, id),
          TokenKind::Delimiter => unreachable!("Grammar::resolve never returns Delimiter"),
        }
      }
      j += 1;
    }
  }

  fn in_progress_report(&self, set: usize) -> String {
    let mut lines = Vec::new();
    for state in &self.sets[set] {
      if !state.item.iter.end(&self.grammar) {
        lines.push(format!("production {:?} at position {}", state.item.iter.production_id(), state.item.iter.position()));
      }
    }
    lines.sort();
    lines.dedup();
    if lines.is_empty() {
      "no productions in progress".to_string()
    } else {
      lines.join("; ")
    }
  }

  /// The best single derivation to report when no accepting parse exists:
  /// among items in the last non-empty state set that started at
  /// `start_offset`, the one whose materialized span covers the most input
  /// (ties broken by production priority), via the same comparator
  /// ambiguity resolution uses.
  fn best_effort_tree(&mut self, start_offset: usize) -> Option<NodeRef> {
    let set = self.error_at;
    let candidates: Vec<usize> = (0..self.sets[set].len()).filter(|&i| self.sets[set][i].item.origin as usize == start_offset).collect();
    let mut best: Option<NodeRef> = None;
    for idx in candidates {
      let node = self.materialize(set, idx);
      best = Some(match best {
        None => node,
        Some(existing) => if self.store.priority(&self.grammar, node, existing) == Priority::Higher { node } else { existing },
      });
    }
    best
  }

  fn build_info_tree(&self, r: NodeRef) -> InfoNode {
    match self.store.node(r).clone() {
      parsegen_core::tree::TreeNode::Terminal { start, end } => {
        let text: String = self.input[start as usize..end as usize].iter().collect();
        InfoNode::leaf(start, text, None)
      }
      parsegen_core::tree::TreeNode::NonTerminal { prod, children, .. } => {
        let info_children: Vec<InfoNode> = children.iter().map(|c| self.build_info_tree(*c)).collect();
        let production = self.grammar.production(prod);
        let indent = production.indent_range.map(|(s, e)| IndentSpec { child_start: s, child_end: e, kind: production.indent_kind });
        InfoNode::internal(prod, info_children, indent)
      }
    }
  }
}

impl ParserBackend for EarleyParser {
  fn grammar(&self) -> &Grammar {
    &self.grammar
  }

  fn grammar_mut(&mut self) -> &mut Grammar {
    &mut self.grammar
  }

  fn parse(&mut self, root: RuleId, text: &str, _source_id: u32, start_offset: u32) -> ParsegenResult<bool> {
    log::trace!("earley: starting parse of {} chars for rule {:?}", text.chars().count(), root);
    self.reset_parse_state();
    self.input = text.chars().collect();
    let start_prod = self.wrap_root(root);
    self.start_prod = Some(start_prod);

    let n = self.input.len();
    self.sets = vec![Vec::new(); n + 1];
    self.index = vec![Map::new(); n + 1];

    let start_offset = start_offset as usize;
    self.add_item(
      start_offset,
      EItem { iter: ProductionIter::start(start_prod), origin: start_offset as u32 },
      Back::default(),
    );

    for set in start_offset..=n {
      self.process(set);
      log::trace!("earley: state set {set} settled with {} items", self.sets[set].len());
    }

    self.error_at = (start_offset..=n).rev().find(|&i| !self.sets[i].is_empty()).unwrap_or(start_offset);

    let accept_key = (start_prod, 1u32, start_offset as u32);
    let mut found = None;
    for set in (start_offset..=n).rev() {
      if let Some(&idx) = self.index[set].get(&accept_key) {
        found = Some((set, idx));
        break;
      }
    }

    if let Some((set, idx)) = found {
      self.accept_at = Some(set);
      let root_node = self.materialize(set, idx);
      self.tree = Some(root_node);
      self.info_tree = Some(self.build_info_tree(root_node));
    } else if let Some(best) = self.best_effort_tree(start_offset) {
      self.tree = Some(best);
      self.info_tree = Some(self.build_info_tree(best));
    }

    Ok(self.accept_at.is_some())
  }

  fn parse_approx(&mut self, root: RuleId, text: &str, source_id: u32, start_offset: u32) -> ParsegenResult<ApproxError> {
    // The Earley backend has no dedicated recovery search; `parse` already
    // populates `info_tree` with the best-effort prefix derivation even on
    // failure, so this just expresses the unmatched remainder as a single
    // "skip" region in the packed ApproxError encoding.
    let matched = self.parse(root, text, source_id, start_offset)?;
    let total = text.chars().count() as u32;
    let end = self.match_end();
    if matched && end >= total {
      Ok(ApproxError::success(0, 0))
    } else {
      Ok(ApproxError::failure(0, total.saturating_sub(end)))
    }
  }

  fn clear(&mut self) {
    self.reset_parse_state();
  }

  fn has_error(&self) -> bool {
    self.match_end() < self.input.len() as u32
  }

  fn has_tree(&self) -> bool {
    self.tree.is_some()
  }

  fn match_end(&self) -> u32 {
    self.accept_at.unwrap_or(self.error_at) as u32
  }

  fn error_msg(&self) -> String {
    if self.has_error() {
      format!("parse error at position {}: {}", self.error_at, self.in_progress_report(self.error_at))
    } else {
      String::new()
    }
  }

  fn error_pos(&self) -> u32 {
    self.error_at as u32
  }

  fn tree(&self) -> Option<NodeRef> {
    self.tree
  }

  fn tree_store(&self) -> &TreeStore {
    &self.store
  }

  fn info_tree(&self) -> Option<&InfoNode> {
    self.info_tree.as_ref()
  }

  fn state_count(&self) -> usize {
    self.sets.iter().map(|s| s.len()).sum()
  }

  fn byte_count(&self) -> usize {
    self.state_count() * std::mem::size_of::<EState>()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use parsegen_core::grammar::{Production, Token};

  fn build_sentence_grammar() -> (Grammar, RuleId) {
    let mut g = Grammar::new();
    let word = g.register_regex("[a-zA-Z]+").unwrap();
    let space = g.register_regex(" ").unwrap();
    let sentence = g.add_rule("Sentence");
    g.add_production(
      sentence,
      Production::new(ProdId::from(0), 0, vec![Token::regex(word), Token::regex(space), Token::regex(word)]),
    );
    (g, sentence)
  }

  #[test]
  fn parses_a_simple_sentence() {
    let (g, sentence) = build_sentence_grammar();
    let mut p = EarleyParser::new();
    *p.grammar_mut() = g;
    let matched = p.parse(sentence, "the cat", 0, 0).unwrap();
    assert!(matched);
    assert_eq!(p.match_end(), 7);
    assert!(p.has_tree());
    assert!(!p.has_error());
  }

  #[test]
  fn greedy_star_prefers_longest_repetition() {
    let mut g = Grammar::new();
    let a = g.register_regex("a").unwrap();
    let run = g.add_rule("Run");
    g.add_production(run, Production::new(ProdId::from(0), 0, vec![Token::regex(a), Token::regex(a)]).with_repeat(0, 1, parsegen_core::grammar::RepType::Star));

    let mut p = EarleyParser::new();
    *p.grammar_mut() = g;
    let matched = p.parse(run, "aaa", 0, 0).unwrap();
    assert!(matched);
    assert_eq!(p.match_end(), 3);
  }

  #[test]
  fn empty_matching_rule_does_not_block_completion() {
    let mut g = Grammar::new();
    let spaces = g.register_regex(" *").unwrap();
    let delim = g.add_rule("Delim");
    g.add_production(delim, Production::new(ProdId::from(0), 0, vec![Token::regex(spaces)]));
    let open = g.register_regex("\\(").unwrap();
    let close = g.register_regex("\\)").unwrap();
    let outer = g.add_rule("Outer");
    g.add_production(outer, Production::new(ProdId::from(0), 0, vec![Token::regex(open), Token::rule(delim), Token::regex(close)]));

    let mut p = EarleyParser::new();
    *p.grammar_mut() = g;
    let matched = p.parse(outer, "()", 0, 0).unwrap();
    assert!(matched);
    assert_eq!(p.match_end(), 2);
  }

  #[test]
  fn failing_parse_reports_best_effort_prefix() {
    let (g, sentence) = build_sentence_grammar();
    let mut p = EarleyParser::new();
    *p.grammar_mut() = g;
    let matched = p.parse(sentence, "the!", 0, 0).unwrap();
    assert!(!matched);
    assert!(p.has_error());
    assert_eq!(p.match_end(), 3);
    assert!(p.has_tree());
    let info = p.info_tree().unwrap();
    assert_eq!(info.leaf_concatenation(), "the");
  }

  #[test]
  fn approx_parse_reports_skip_count_on_unmatched_remainder() {
    let (g, sentence) = build_sentence_grammar();
    let mut p = EarleyParser::new();
    *p.grammar_mut() = g;
    let approx = p.parse_approx(sentence, "the!", 0, 0).unwrap();
    assert!(approx.failed);
    assert_eq!(approx.skips, 1);
    assert!(p.info_tree().is_some());
  }
}
