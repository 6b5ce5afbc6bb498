//! The GLL backend.
//!
//! Where the Earley backend sweeps state sets left to right, this backend
//! is a worklist of descriptors ordered by how far along the input they've
//! gotten, with explicit call/return bookkeeping per `(rule, position)`
//! in a per-rule table of in-progress call sites.
//! A rule call is only *seeded* (its productions pushed as fresh
//! descriptors) the first time it's reached at a given position; every
//! caller that reaches the same `(rule, position)` afterwards registers
//! itself as a pending return and is immediately replayed against whatever
//! completions already exist. That replay is what makes left recursion
//! terminate instead of descending forever: a left-recursive call resolves
//! to "register as my own caller," and each newly discovered completion of
//! the rule wakes every registered caller, including itself, one token
//! further along.

mod back;
mod item;
mod parser;

pub use parser::GllParser;
