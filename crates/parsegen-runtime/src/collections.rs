//! Concrete collection aliases used throughout the workbench.
//!
//! Keeping these as aliases (rather than using `Vec`/`HashMap` directly
//! everywhere) means the container backing a hot path can be swapped in one
//! place if profiling ever calls for it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A plain growable array. Most of the workbench's "tables" (rules, tokens,
/// states) are `Array<T>` indexed by a newtype key.
pub type Array<T> = Vec<T>;

/// An unordered set, used where only membership matters.
pub type Set<T> = HashSet<T>;

/// A map whose iteration order is not significant.
pub type Map<K, V> = HashMap<K, V>;

/// A set whose iteration order must be deterministic (e.g. anything that
/// feeds into `same_syntax` comparisons or diagnostic output).
pub type OrderedSet<T> = BTreeSet<T>;

/// A map whose iteration order must be deterministic.
pub type OrderedMap<K, V> = BTreeMap<K, V>;
