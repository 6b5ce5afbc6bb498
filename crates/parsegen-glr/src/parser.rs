use crate::stack::{Edge, GlrBack, StackNode};
use crate::state::{close, goto_kernel, StateId};
use parsegen_core::{
  backend::{ApproxError, ParserBackend},
  grammar::{Grammar, ProdId, Production, ProductionIter, RepType, RuleId, TokenKind},
  info_tree::{IndentSpec, InfoNode},
  tree::{NodeRef, Priority, TreeStore},
};
use parsegen_runtime::{Map, ParsegenResult};

/// The GLR backend: a graph-structured stack of interned LR-state
/// nodes.
pub struct GlrParser {
  grammar: Grammar,
  store: TreeStore,

  /// Interned closures, indexed by `StateId`.
  states: Vec<Vec<ProductionIter>>,
  state_index: Map<Vec<ProductionIter>, StateId>,

  nodes: Vec<StackNode>,
  node_index: Map<(StateId, u32), usize>,
  edge_index: Map<(usize, usize), usize>,

  input: Vec<char>,
  start_prod: Option<ProdId>,
  accept: Option<(u32, NodeRef)>,
  error_at: u32,

  tree: Option<NodeRef>,
  info_tree: Option<InfoNode>,
}

impl Default for GlrParser {
  fn default() -> Self {
    GlrParser::new()
  }
}

impl GlrParser {
  pub fn new() -> Self {
    GlrParser {
      grammar: Grammar::new(),
      store: TreeStore::new(),
      states: Vec::new(),
      state_index: Map::new(),
      nodes: Vec::new(),
      node_index: Map::new(),
      edge_index: Map::new(),
      input: Vec::new(),
      start_prod: None,
      accept: None,
      error_at: 0,
      tree: None,
      info_tree: None,
    }
  }

  fn reset_parse_state(&mut self) {
    self.store.clear();
    self.states.clear();
    self.state_index.clear();
    self.nodes.clear();
    self.node_index.clear();
    self.edge_index.clear();
    self.input.clear();
    self.start_prod = None;
    self.accept = None;
    self.error_at = 0;
    self.tree = None;
    self.info_tree = None;
  }

  fn wrap_root(&mut self, root: RuleId) -> ProdId {
    use parsegen_core::grammar::Token;
    let start = self.grammar.add_rule("$start");
    self.grammar.add_production(start, Production::new(ProdId::from(0), 0, vec![Token::rule(root)]))
  }

  fn close_state(&mut self, kernel: Vec<ProductionIter>) -> StateId {
    let items = close(&self.grammar, kernel);
    if let Some(&id) = self.state_index.get(&items) {
      return id;
    }
    let id = self.states.len() as StateId;
    self.state_index.insert(items.clone(), id);
    self.states.push(items);
    id
  }

  /// Finds or creates the stack node at `(state, pos)`. Returns whether it
  /// was newly created.
  fn node_at(&mut self, state: StateId, pos: u32) -> (usize, bool) {
    if let Some(&idx) = self.node_index.get(&(state, pos)) {
      return (idx, false);
    }
    let idx = self.nodes.len();
    self.nodes.push(StackNode { state, pos, edges: Vec::new() });
    self.node_index.insert((state, pos), idx);
    (idx, true)
  }

  fn back_node(&mut self, back: &GlrBack) -> NodeRef {
    match back {
      GlrBack::Shift { start, end } => self.store.alloc_terminal(*start, *end),
      GlrBack::Reduce { child } => *child,
    }
  }

  /// Adds an edge `from -> target`, resolving a merge against any existing
  /// edge between the same pair via tree priority. Returns whether
  /// anything changed.
  fn add_edge(&mut self, target: usize, from: usize, back: GlrBack) -> bool {
    let key = (target, from);
    if let Some(&i) = self.edge_index.get(&key) {
      let existing = self.nodes[target].edges[i].back.clone();
      let existing_node = self.back_node(&existing);
      let candidate_node = self.back_node(&back);
      if self.store.priority(&self.grammar, candidate_node, existing_node) == Priority::Higher {
        self.nodes[target].edges[i].back = back;
        true
      } else {
        false
      }
    } else {
      let idx = self.nodes[target].edges.len();
      self.nodes[target].edges.push(Edge { from, back });
      self.edge_index.insert(key, idx);
      true
    }
  }

  /// The dot positions reachable from `from` by chaining `next_b`'s
  /// epsilon bypass/loop-back to a fixed point -- i.e. the positions
  /// equivalent to `from` at zero edge cost. For a production with no
  /// repeat range this is just `{from}`; for one with a `?`/`*`/`+` range
  /// it additionally includes the range's other boundary whenever the
  /// bypass or loop-back applies. Takes the production's repeat fields by
  /// value (rather than a borrow of the `Production`) so callers can
  /// still mutably borrow `self` afterward.
  fn epsilon_class(rep_start: u32, rep_end: u32, rep_type: RepType, from: u32) -> Vec<u32> {
    let mut class = vec![from];
    let mut i = 0;
    while i < class.len() {
      let p = class[i];
      if p == rep_start && rep_start != rep_end && matches!(rep_type, RepType::Optional | RepType::Star) && !class.contains(&rep_end)
      {
        class.push(rep_end);
      }
      if p == rep_end && rep_start != rep_end && matches!(rep_type, RepType::Star | RepType::Plus) && !class.contains(&rep_start) {
        class.push(rep_start);
      }
      i += 1;
    }
    class
  }

  /// Positions `q` a single real (input-consuming) edge could have left
  /// from to land the cursor on `pos`, given `next_b` may then fire for
  /// free right after that edge lands. Ordinarily just `pos - 1`; at a
  /// repeat range's boundary this also includes the other boundary minus
  /// one, since e.g. `pos == rep_start` reached after a real edge is
  /// ambiguous between "entered the range for the first time"
  /// (predecessor `rep_start - 1`) and "looped back after another
  /// iteration" (predecessor `rep_end - 1`).
  fn predecessor_positions(rep_start: u32, rep_end: u32, rep_type: RepType, pos: u32) -> Vec<u32> {
    Self::epsilon_class(rep_start, rep_end, rep_type, pos).into_iter().filter(|&r| r > 0).map(|r| r - 1).collect()
  }

  /// Every way to walk backward from `node` to the start of `prod`'s
  /// current derivation, starting from dot position `pos`, paired with
  /// the node the walk bottoms out at and the children collected along
  /// the way, in forward (left-to-right) order.
  ///
  /// Stops at `node` itself whenever `pos` is in the epsilon class of 0
  /// (dot 0 reachable for free): with a repeat range, that can happen at
  /// a node several real edges deep, since every loop iteration revisits
  /// the same symbolic dot positions -- so unlike a plain bounded pop,
  /// this keeps walking backward through edges even past that point,
  /// to also surface completions from earlier iterations. A candidate
  /// whose origin state never actually expected this production (no
  /// pending item the caller's `goto_kernel` can match) is harmless here;
  /// the caller discards it.
  fn walk_back_pos(&mut self, node: usize, prod: ProdId, pos: u32) -> Vec<(usize, Vec<NodeRef>)> {
    let Production { rep_start, rep_end, rep_type, .. } = *self.grammar.production(prod);
    let mut out = Vec::new();
    if Self::epsilon_class(rep_start, rep_end, rep_type, 0).contains(&pos) {
      out.push((node, Vec::new()));
    }
    let preds = Self::predecessor_positions(rep_start, rep_end, rep_type, pos);
    if !preds.is_empty() {
      let edges = self.nodes[node].edges.clone();
      for e in edges {
        let child = self.back_node(&e.back);
        for &prev in &preds {
          for (origin, mut children) in self.walk_back_pos(e.from, prod, prev) {
            children.push(child);
            out.push((origin, children));
          }
        }
      }
    }
    out
  }

  fn record_accept(&mut self, pos: u32, node_ref: NodeRef) {
    match self.accept {
      None => self.accept = Some((pos, node_ref)),
      Some((p, existing)) => {
        if pos > p || (pos == p && self.store.priority(&self.grammar, node_ref, existing) == Priority::Higher) {
          self.accept = Some((pos, node_ref));
        }
      }
    }
  }

  /// For every completed item in `node`'s state, walks back through the
  /// stack and performs the goto transition for the rule it completes.
  /// Returns whether anything new was added.
  fn try_reduce(&mut self, node_idx: usize) -> bool {
    let state = self.nodes[node_idx].state;
    let pos = self.nodes[node_idx].pos;
    let items = self.states[state as usize].clone();
    let mut changed = false;
    for it in items {
      if !it.end(&self.grammar) {
        continue;
      }
      let prod = it.production_id();
      for (origin, children) in self.walk_back_pos(node_idx, prod, it.position()) {
        let node_ref = self.store.alloc_nonterminal(prod, children);
        if Some(prod) == self.start_prod {
          self.record_accept(pos, node_ref);
        }
        let rule = self.grammar.production_rule(prod);
        let origin_state = self.nodes[origin].state;
        let kernel = goto_kernel(&self.grammar, &self.states[origin_state as usize], rule);
        if kernel.is_empty() {
          continue;
        }
        let target_state = self.close_state(kernel);
        let (target_idx, is_new) = self.node_at(target_state, pos);
        let edge_changed = self.add_edge(target_idx, origin, GlrBack::Reduce { child: node_ref });
        changed |= is_new || edge_changed;
      }
    }
    changed
  }

  /// Groups every matching terminal transition out of `node` by how far
  /// it advances the input, and shifts into the resulting goto states.
  fn try_shift(&mut self, node_idx: usize) {
    let state = self.nodes[node_idx].state;
    let pos = self.nodes[node_idx].pos;
    let items = self.states[state as usize].clone();
    let mut by_end: Map<u32, Vec<ProductionIter>> = Map::new();
    for it in items {
      if it.end(&self.grammar) {
        continue;
      }
      let Some(tok) = it.token(&self.grammar) else { continue };
      if let TokenKind::Regex(id) = self.grammar.resolve(tok) {
        if let Some(end) = self.grammar.regex(id).match_at(&self.input, pos as usize) {
          if let Some(next) = it.next_a(&self.grammar) {
            by_end.entry(end as u32).or_default().push(next);
          }
        }
      }
    }
    for (end, kernel) in by_end {
      let target_state = self.close_state(kernel);
      let (target_idx, _) = self.node_at(target_state, end);
      self.add_edge(target_idx, node_idx, GlrBack::Shift { start: pos, end });
    }
  }

  fn nodes_at(&self, pos: u32) -> Vec<usize> {
    self.nodes.iter().enumerate().filter(|(_, n)| n.pos == pos).map(|(i, _)| i).collect()
  }

  fn in_progress_report(&self, pos: u32) -> String {
    let mut lines = Vec::new();
    for idx in self.nodes_at(pos) {
      for it in &self.states[self.nodes[idx].state as usize] {
        if !it.end(&self.grammar) {
          lines.push(format!("production {:?} at position {}", it.production_id(), it.position()));
        }
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

  /// The best single derivation to report when no accepting parse exists.
  /// Unlike `try_reduce`, which only acts on completed items, this walks
  /// back `it.position()` hops for *every* item in a state reachable at the
  /// furthest input position reached -- complete or not -- so a production
  /// stuck mid-way still yields the prefix it matched so far, the same way
  /// Earley/GLL materialize a partial back-pointer chain. Keeps only walks
  /// that bottom out at `start_offset`; ties broken by the same
  /// tree-priority comparator ambiguity resolution uses.
  fn best_effort_tree(&mut self, start_offset: u32) -> Option<NodeRef> {
    let pos = self.error_at;
    let mut best: Option<NodeRef> = None;
    for node_idx in self.nodes_at(pos) {
      let state = self.nodes[node_idx].state;
      let items = self.states[state as usize].clone();
      for it in items {
        let prod = it.production_id();
        let pos_in_prod = it.position();
        if pos_in_prod == 0 {
          continue;
        }
        for (origin, children) in self.walk_back_pos(node_idx, prod, pos_in_prod) {
          if self.nodes[origin].pos != start_offset {
            continue;
          }
          let node_ref = self.store.alloc_nonterminal(prod, children);
          best = Some(match best {
            None => node_ref,
            Some(existing) => if self.store.priority(&self.grammar, node_ref, existing) == Priority::Higher { node_ref } else { existing },
          });
        }
      }
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

impl ParserBackend for GlrParser {
  fn grammar(&self) -> &Grammar {
    &self.grammar
  }

  fn grammar_mut(&mut self) -> &mut Grammar {
    &mut self.grammar
  }

  fn parse(&mut self, root: RuleId, text: &str, _source_id: u32, start_offset: u32) -> ParsegenResult<bool> {
    log::trace!("glr: starting parse of {} chars for rule {:?}", text.chars().count(), root);
    self.reset_parse_state();
    self.input = text.chars().collect();
    let start_prod = self.wrap_root(root);
    self.start_prod = Some(start_prod);

    let n = self.input.len() as u32;
    let initial_state = self.close_state(vec![ProductionIter::start(start_prod)]);
    self.node_at(initial_state, start_offset);

    let mut pos = start_offset;
    loop {
      loop {
        let mut changed = false;
        for idx in self.nodes_at(pos) {
          if self.try_reduce(idx) {
            changed = true;
          }
        }
        if !changed {
          break;
        }
      }
      if pos >= n {
        break;
      }
      for idx in self.nodes_at(pos) {
        self.try_shift(idx);
      }
      pos += 1;
    }
    log::trace!("glr: scan finished at position {pos} with {} stack nodes interned", self.nodes.len());

    self.error_at = self.nodes.iter().map(|n| n.pos).max().unwrap_or(start_offset);

    if let Some((_, node_ref)) = self.accept {
      self.tree = Some(node_ref);
      self.info_tree = Some(self.build_info_tree(node_ref));
    } else if let Some(best) = self.best_effort_tree(start_offset) {
      self.tree = Some(best);
      self.info_tree = Some(self.build_info_tree(best));
    }

    Ok(self.accept.is_some())
  }

  fn parse_approx(&mut self, root: RuleId, text: &str, source_id: u32, start_offset: u32) -> ParsegenResult<ApproxError> {
    // As with the other two backends, no dedicated recovery search: report
    // the best-effort prefix `parse` already found.
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
    self.accept.map(|(pos, _)| pos).unwrap_or(self.error_at)
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
    self.nodes.len()
  }

  fn byte_count(&self) -> usize {
    self.nodes.iter().map(|n| std::mem::size_of::<StackNode>() + n.edges.len() * std::mem::size_of::<Edge>()).sum()
  }
}
