//! The façade contract every backend implements.
//!
//! `ParserBackend` is deliberately small: grammar mutation goes straight
//! through `grammar_mut()` rather than being duplicated as `add_rule`/
//! `add_production` methods on every backend, since all three backends
//! share the exact same `Grammar` type. What differs between backends is
//! everything downstream of registration -- how `parse` walks the grammar,
//! and what per-parse state `clear()` resets.

use crate::{
  grammar::{Grammar, ProdId, RuleId},
  info_tree::InfoNode,
  tree::{NodeRef, TreeStore},
};
use parsegen_runtime::ParsegenResult;
use std::ops::Add;

/// The result of an error-recovering parse.
///
/// The taxonomy specifies this as a packed 32-bit value (top bit: failed,
/// next 15 bits: saturating shift count, low 16 bits: saturating skip
/// count) so that partial results from nested recovery attempts can be
/// combined with plain integer addition. [`ApproxError::pack`]/[`unpack`]
/// expose that representation for anything that needs to store or compare
/// it compactly; day to day code uses the unpacked struct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ApproxError {
  pub failed: bool,
  pub shifts: u16,
  pub skips: u16,
}

const MAX_SHIFTS: u16 = 0x7FFF;

impl ApproxError {
  pub fn success(shifts: u16, skips: u16) -> Self {
    ApproxError { failed: false, shifts: shifts.min(MAX_SHIFTS), skips }
  }

  pub fn failure(shifts: u16, skips: u16) -> Self {
    ApproxError { failed: true, shifts: shifts.min(MAX_SHIFTS), skips }
  }

  pub fn pack(&self) -> u32 {
    let failed_bit = if self.failed { 1u32 << 31 } else { 0 };
    let shifts = (self.shifts.min(MAX_SHIFTS) as u32) << 16;
    failed_bit | shifts | self.skips as u32
  }

  pub fn unpack(value: u32) -> Self {
    ApproxError { failed: value >> 31 == 1, shifts: ((value >> 16) & 0x7FFF) as u16, skips: (value & 0xFFFF) as u16 }
  }
}

impl Add for ApproxError {
  type Output = ApproxError;

  fn add(self, rhs: ApproxError) -> ApproxError {
    ApproxError {
      failed: self.failed || rhs.failed,
      shifts: self.shifts.saturating_add(rhs.shifts).min(MAX_SHIFTS),
      skips: self.skips.saturating_add(rhs.skips),
    }
  }
}

/// Uniform interface over the Earley, GLR, and GLL backends.
pub trait ParserBackend {
  fn grammar(&self) -> &Grammar;
  fn grammar_mut(&mut self) -> &mut Grammar;

  /// Runs until acceptance or exhaustion. Returns whether any derivation of
  /// `root` matched a prefix of `text` starting at `start_offset`.
  ///
  /// Returns `Err` only for `GrammarInternal` faults (an ill-formed
  /// registered grammar); an unsuccessful parse is reported through
  /// `has_tree`/`error_msg`/`error_pos`, never as an `Err`.
  fn parse(&mut self, root: RuleId, text: &str, source_id: u32, start_offset: u32) -> ParsegenResult<bool>;

  /// Runs with error recovery; always produces an info tree, even on
  /// failure.
  fn parse_approx(&mut self, root: RuleId, text: &str, source_id: u32, start_offset: u32) -> ParsegenResult<ApproxError>;

  /// Discards per-parse state (state sets, stacks, the tree store). Grammar
  /// registration is retained.
  fn clear(&mut self);

  fn has_error(&self) -> bool;
  fn has_tree(&self) -> bool;
  fn match_end(&self) -> u32;
  fn error_msg(&self) -> String;
  fn error_pos(&self) -> u32;

  fn tree(&self) -> Option<NodeRef>;
  fn tree_store(&self) -> &TreeStore;
  fn info_tree(&self) -> Option<&InfoNode>;

  fn state_count(&self) -> usize;
  fn byte_count(&self) -> usize;

  /// Structural grammar equivalence with another backend instance,
  /// regardless of which concrete backend it runs.
  fn same_syntax(&self, other: &dyn ParserBackend) -> bool {
    self.grammar().same_syntax(other.grammar())
  }
}

/// The production a backend's diagnostic report points at when a parse
/// fails at `error_pos` -- one of "a list of productions in progress at
/// that position".
#[derive(Clone, Debug)]
pub struct InProgressProduction {
  pub production: ProdId,
  pub position:   u32,
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn approx_error_pack_round_trips() {
    let e = ApproxError::failure(12, 3);
    assert_eq!(ApproxError::unpack(e.pack()), e);
  }

  #[test]
  fn approx_error_add_saturates_and_sticky_fails() {
    let a = ApproxError::success(MAX_SHIFTS - 1, 10);
    let b = ApproxError::failure(5, 5);
    let sum = a + b;
    assert!(sum.failed);
    assert_eq!(sum.shifts, MAX_SHIFTS);
    assert_eq!(sum.skips, 15);
  }
}
