//! Primitives shared by every crate in the parsegen workbench.
//!
//! This crate carries nothing specific to grammars or parse trees -- it is
//! the leaf of the dependency graph. [`regex`] is the terminal matcher used
//! by every backend, [`istring`] is the global string interner used to keep
//! rule/production names cheap to copy and compare, and [`collections`]
//! centralizes the concrete container types so the rest of the workspace
//! doesn't have to pick between `HashMap`/`BTreeMap` ad hoc.

pub mod collections;
pub mod error;
pub mod istring;
pub mod regex;

pub use collections::*;
pub use error::{ParsegenError, ParsegenResult};
pub use istring::{CachedString, IString, IStringStore};
pub use regex::Regex;
