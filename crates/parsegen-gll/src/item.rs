use crate::back::GBack;
use parsegen_core::grammar::ProductionIter;

/// A descriptor: `(production, cursor)` plus where this production instance
/// started (`origin`) and how far the input has been consumed along this
/// derivation so far (`pos`). Earley keeps the analogue of `pos` implicit
/// (which state set an item lives in); this backend has no such
/// partitioning, so it's carried explicitly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GItem {
  pub iter:   ProductionIter,
  pub origin: u32,
  pub pos:    u32,
}

#[derive(Clone, Debug)]
pub struct GState {
  pub item:  GItem,
  pub back:  GBack,
  pub depth: u32,
}
