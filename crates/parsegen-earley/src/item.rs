//! The Earley item and its back-pointer chain.

use parsegen_core::grammar::ProductionIter;

/// `(production, cursor position)` plus the input position at which this
/// derivation started. Two items with equal `(iter, origin)` are the same
/// item for the purposes of state-set membership.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EItem {
  pub iter:   ProductionIter,
  pub origin: u32,
}

/// How an [`EItem`] was added to its state set -- enough to walk backwards
/// and rebuild the subtree it represents.
#[derive(Clone, Debug, Default)]
pub struct Back {
  /// The predecessor item this one extends, as `(set, index)`.
  pub prev: Option<(u32, u32)>,
  /// Set when this transition consumed a terminal, spanning `[start, end)`.
  pub scanned: Option<(u32, u32)>,
  /// Set when this transition consumed a completed nonterminal, identifying
  /// the completed item as `(set, index)`.
  pub completed_child: Option<(u32, u32)>,
}

/// An item together with how it was derived.
#[derive(Clone, Debug)]
pub struct EState {
  pub item: EItem,
  pub back: Back,
}
