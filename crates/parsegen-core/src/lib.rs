//! The grammar model, parse-tree store, and info tree shared by every
//! parsegen backend (components B, C, D of the system overview).
//!
//! This crate has no notion of *how* a string gets parsed -- that's each
//! backend's job. It only defines what a grammar, a parse tree, and an info
//! tree *are*, plus the comparison and rewriting logic that
//! every backend must agree on to produce interchangeable results.

pub mod backend;
pub mod grammar;
pub mod info_tree;
pub mod tree;

pub use backend::{ApproxError, ParserBackend};
pub use grammar::Grammar;
pub use info_tree::InfoNode;
pub use tree::{NodeRef, Priority, TreeStore};
