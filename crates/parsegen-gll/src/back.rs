//! How a [`crate::item::GItem`] was reached -- a flat-arena analogue of the
//! Earley backend's back-pointer, since this backend has no per-position
//! state sets to index into.

#[derive(Clone, Debug, Default)]
pub struct GBack {
  pub prev: Option<usize>,
  pub scanned: Option<(u32, u32)>,
  pub completed_child: Option<usize>,
}
