use crate::back::GBack;
use crate::item::{GItem, GState};
use parsegen_core::{
  backend::{ApproxError, ParserBackend},
  grammar::{Grammar, ProdId, ProductionIter, RuleId, TokenKind},
  info_tree::{IndentSpec, InfoNode},
  tree::{NodeRef, Priority, TreeStore},
};
use parsegen_runtime::{Map, ParsegenResult};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Nullable {
  No,
  Yes,
  Computing,
}

/// Priority-queue key: larger `pos` (further along the input) and, among
/// ties, larger `depth` pop first, so a max-heap always surfaces the most
/// advanced descriptor next.
#[derive(Clone, Copy, PartialEq, Eq)]
struct HeapKey {
  pos:   u32,
  depth: u32,
  idx:   usize,
}

impl Ord for HeapKey {
  fn cmp(&self, other: &Self) -> Ordering {
    (self.pos, self.depth, self.idx).cmp(&(other.pos, other.depth, other.idx))
  }
}
impl PartialOrd for HeapKey {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// The GLL backend.
pub struct GllParser {
  grammar: Grammar,
  store: TreeStore,

  states: Vec<GState>,
  index: Map<(ProdId, u32, u32, u32), usize>,
  processed: Vec<bool>,
  /// `(rule, position)` -> have we pushed that rule's productions as fresh
  /// descriptors yet? The `currentStacks[ruleId]` dedup table.
  seeded: Map<(RuleId, u32), bool>,
  /// `(rule, position)` -> predecessor descriptors waiting for that call to
  /// produce a completion.
  waiting: Map<(RuleId, u32), Vec<usize>>,
  /// `(rule, position)` -> completions already found, for replay to callers
  /// that register after the fact.
  completions: Map<(RuleId, u32), Vec<usize>>,
  nullable: Map<RuleId, Nullable>,

  input: Vec<char>,
  start_prod: Option<ProdId>,
  accept_at: Option<usize>,
  error_at: u32,

  tree: Option<NodeRef>,
  info_tree: Option<InfoNode>,
}

impl Default for GllParser {
  fn default() -> Self {
    GllParser::new()
  }
}

impl GllParser {
  pub fn new() -> Self {
    GllParser {
      grammar: Grammar::new(),
      store: TreeStore::new(),
      states: Vec::new(),
      index: Map::new(),
      processed: Vec::new(),
      seeded: Map::new(),
      waiting: Map::new(),
      completions: Map::new(),
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
    self.states.clear();
    self.index.clear();
    self.processed.clear();
    self.seeded.clear();
    self.waiting.clear();
    self.completions.clear();
    self.input.clear();
    self.start_prod = None;
    self.accept_at = None;
    self.error_at = 0;
    self.tree = None;
    self.info_tree = None;
  }

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

  fn depth_of(&self, back: &GBack) -> u32 {
    match back.prev {
      Some(p) => self.states[p].depth + 1,
      None => 0,
    }
  }

  /// Inserts a descriptor, resolving ambiguity against an existing one at
  /// the same `(production, cursor, origin, pos)` key via the shared
  /// tree-priority order, and returns its index either way.
  fn add_item(&mut self, candidate: GItem, back: GBack) -> usize {
    let key = (candidate.iter.production_id(), candidate.iter.position(), candidate.origin, candidate.pos);
    if let Some(&existing) = self.index.get(&key) {
      let existing_node = self.materialize(existing);
      let candidate_node = self.materialize_candidate(candidate.iter.production_id(), &back);
      if self.store.priority(&self.grammar, candidate_node, existing_node) == Priority::Higher {
        self.states[existing].back = back;
      }
      existing
    } else {
      let depth = self.depth_of(&back);
      let idx = self.states.len();
      self.states.push(GState { item: candidate, back, depth });
      self.processed.push(false);
      self.index.insert(key, idx);
      idx
    }
  }

  fn walk_children(&mut self, mut back: GBack) -> Vec<NodeRef> {
    let mut children = Vec::new();
    loop {
      if let Some(ci) = back.completed_child {
        children.push(self.materialize(ci));
      } else if let Some((s, e)) = back.scanned {
        children.push(self.store.alloc_terminal(s, e));
      }
      match back.prev {
        Some(p) => back = self.states[p].back.clone(),
        None => break,
      }
    }
    children.reverse();
    children
  }

  fn materialize(&mut self, idx: usize) -> NodeRef {
    let prod = self.states[idx].item.iter.production_id();
    let back = self.states[idx].back.clone();
    let children = self.walk_children(back);
    self.store.alloc_nonterminal(prod, children)
  }

  fn materialize_candidate(&mut self, prod: ProdId, back: &GBack) -> NodeRef {
    let children = self.walk_children(back.clone());
    self.store.alloc_nonterminal(prod, children)
  }

  /// Extends `caller_idx` with the completed nonterminal at `completed_idx`,
  /// enqueuing the result.
  fn link_call_return(&mut self, caller_idx: usize, completed_idx: usize, heap: &mut BinaryHeap<HeapKey>) {
    let caller = self.states[caller_idx].item;
    let Some(next) = caller.iter.next_a(&self.grammar) else { return };
    let end_pos = self.states[completed_idx].item.pos;
    let new_idx = self.add_item(
      GItem { iter: next, origin: caller.origin, pos: end_pos },
      GBack { prev: Some(caller_idx), scanned: None, completed_child: Some(completed_idx) },
    );
    heap.push(HeapKey { pos: end_pos, depth: self.states[new_idx].depth, idx: new_idx });
  }

  fn predictor(&mut self, idx: usize, rule: RuleId, heap: &mut BinaryHeap<HeapKey>) {
    let item = self.states[idx].item;
    self.waiting.entry((rule, item.pos)).or_default().push(idx);

    if !*self.seeded.entry((rule, item.pos)).or_insert(false) {
      self.seeded.insert((rule, item.pos), true);
      let prods: Vec<ProdId> = self.grammar.iter_productions(rule).collect();
      for p in prods {
        let new_idx = self.add_item(GItem { iter: ProductionIter::start(p), origin: item.pos, pos: item.pos }, GBack::default());
        heap.push(HeapKey { pos: item.pos, depth: self.states[new_idx].depth, idx: new_idx });
      }
    }

    let already: Vec<usize> = self.completions.get(&(rule, item.pos)).cloned().unwrap_or_default();
    for completed_idx in already {
      self.link_call_return(idx, completed_idx, heap);
    }

    if self.matches_empty_rule(rule) {
      if let Some(next) = item.iter.next_a(&self.grammar) {
        let new_idx = self.add_item(GItem { iter: next, origin: item.origin, pos: item.pos }, GBack { prev: Some(idx), scanned: None, completed_child: None });
        heap.push(HeapKey { pos: item.pos, depth: self.states[new_idx].depth, idx: new_idx });
      }
    }
  }

  fn scanner(&mut self, idx: usize, regex: parsegen_core::grammar::RegexId, heap: &mut BinaryHeap<HeapKey>) {
    let item = self.states[idx].item;
    let Some(end) = self.grammar.regex(regex).match_at(&self.input, item.pos as usize) else { return };
    let Some(next) = item.iter.next_a(&self.grammar) else { return };
    let new_idx = self.add_item(
      GItem { iter: next, origin: item.origin, pos: end as u32 },
      GBack { prev: Some(idx), scanned: Some((item.pos, end as u32)), completed_child: None },
    );
    heap.push(HeapKey { pos: end as u32, depth: self.states[new_idx].depth, idx: new_idx });
  }

  fn completer(&mut self, idx: usize, heap: &mut BinaryHeap<HeapKey>) {
    let item = self.states[idx].item;
    let rule = self.grammar.production_rule(item.iter.production_id());
    let key = (rule, item.origin);
    self.completions.entry(key).or_default().push(idx);
    let callers: Vec<usize> = self.waiting.get(&key).cloned().unwrap_or_default();
    for caller_idx in callers {
      self.link_call_return(caller_idx, idx, heap);
    }
  }

  fn try_next_b(&mut self, idx: usize, heap: &mut BinaryHeap<HeapKey>) {
    let item = self.states[idx].item;
    if let Some(nb) = item.iter.next_b(&self.grammar) {
      let new_idx = self.add_item(GItem { iter: nb, origin: item.origin, pos: item.pos }, GBack { prev: Some(idx), scanned: None, completed_child: None });
      heap.push(HeapKey { pos: item.pos, depth: self.states[new_idx].depth, idx: new_idx });
    }
  }

  fn process(&mut self, idx: usize, heap: &mut BinaryHeap<HeapKey>) {
    if self.processed[idx] {
      return;
    }
    self.processed[idx] = true;
    let item = self.states[idx].item;
    self.try_next_b(idx, heap);
    if item.iter.end(&self.grammar) {
      self.completer(idx, heap);
    } else if let Some(tok) = item.iter.token(&self.grammar) {
      match self.grammar.resolve(tok) {
        TokenKind::Rule(r) => self.predictor(idx, r, heap),
        TokenKind::Regex(id) => self.scanner(idx, id, heap),
        TokenKind::Delimiter => unreachable!("Grammar::resolve never returns Delimiter"),
      }
    }
  }

  fn in_progress_report(&self, pos: u32) -> String {
    let mut lines = Vec::new();
    for state in &self.states {
      if state.item.pos == pos && !state.item.iter.end(&self.grammar) {
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
  /// among descriptors at the furthest input position reached that started
  /// at `start_offset`, the one whose materialized span covers the most
  /// input, ties broken by production priority -- the same comparator
  /// ambiguity resolution uses.
  fn best_effort_tree(&mut self, start_offset: u32) -> Option<NodeRef> {
    let pos = self.error_at;
    let candidates: Vec<usize> = (0..self.states.len()).filter(|&i| self.states[i].item.pos == pos && self.states[i].item.origin == start_offset).collect();
    let mut best: Option<NodeRef> = None;
    for idx in candidates {
      let node = self.materialize(idx);
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

impl ParserBackend for GllParser {
  fn grammar(&self) -> &Grammar {
    &self.grammar
  }

  fn grammar_mut(&mut self) -> &mut Grammar {
    &mut self.grammar
  }

  fn parse(&mut self, root: RuleId, text: &str, _source_id: u32, start_offset: u32) -> ParsegenResult<bool> {
    log::trace!("gll: starting parse of {} chars for rule {:?}", text.chars().count(), root);
    self.reset_parse_state();
    self.input = text.chars().collect();
    let start_prod = self.wrap_root(root);
    self.start_prod = Some(start_prod);

    let mut heap = BinaryHeap::new();
    let root_idx = self.add_item(
      GItem { iter: ProductionIter::start(start_prod), origin: start_offset, pos: start_offset },
      GBack::default(),
    );
    heap.push(HeapKey { pos: start_offset, depth: 0, idx: root_idx });

    while let Some(HeapKey { idx, .. }) = heap.pop() {
      self.process(idx, &mut heap);
    }
    log::trace!("gll: worklist drained with {} descriptors", self.states.len());

    self.error_at = self.states.iter().map(|s| s.item.pos).max().unwrap_or(start_offset);

    let accepting: Vec<(usize, usize)> = self
      .states
      .iter()
      .enumerate()
      .filter(|(_, s)| s.item.iter.production_id() == start_prod && s.item.iter.position() == 1 && s.item.origin == start_offset)
      .map(|(i, s)| (s.item.pos as usize, i))
      .collect();

    if let Some(&(pos, idx)) = accepting.iter().max_by_key(|(pos, _)| *pos) {
      self.accept_at = Some(pos);
      let root_node = self.materialize(idx);
      self.tree = Some(root_node);
      self.info_tree = Some(self.build_info_tree(root_node));
    } else if let Some(best) = self.best_effort_tree(start_offset) {
      self.tree = Some(best);
      self.info_tree = Some(self.build_info_tree(best));
    }

    Ok(self.accept_at.is_some())
  }

  fn parse_approx(&mut self, root: RuleId, text: &str, source_id: u32, start_offset: u32) -> ParsegenResult<ApproxError> {
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
    self.accept_at.map(|p| p as u32).unwrap_or(self.error_at)
  }

  fn error_msg(&self) -> String {
    if self.has_error() {
      format!("parse error at position {}: {}", self.error_at, self.in_progress_report(self.error_at))
    } else {
      String::new()
    }
  }

  fn error_pos(&self) -> u32 {
    self.error_at
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
    self.states.len()
  }

  fn byte_count(&self) -> usize {
    self.state_count() * std::mem::size_of::<GState>()
  }
}
