//! Shared helpers for the scenario and equivalence tests.

use parsegen_core::tree::{NodeRef, TreeNode, TreeStore};

/// Renders a tree as a parenthesized s-expression keyed by numeric
/// production id, so that two trees built from identically-constructed
/// grammars (same registration order, hence same ids) can be compared for
/// structural equivalence across backends without sharing a `TreeStore`.
pub fn render(store: &TreeStore, input: &[char], r: NodeRef) -> String {
  match store.node(r) {
    TreeNode::Terminal { start, end } => input[*start as usize..*end as usize].iter().collect(),
    TreeNode::NonTerminal { prod, children, .. } => {
      let mut s = format!("({}", prod.0);
      for c in children {
        s.push(' ');
        s.push_str(&render(store, input, *c));
      }
      s.push(')');
      s
    }
  }
}
