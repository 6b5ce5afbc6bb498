//! Stable integer handles into a [`Grammar`](super::database::Grammar).
//!
//! Ids are assigned in insertion order and stay valid for the lifetime of
//! the grammar; `Grammar::clear` is the only thing that invalidates them.

macro_rules! grammar_id {
  ($name:ident, $doc:literal) => {
    #[doc = $doc]
    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
    pub struct $name(pub u32);

    impl $name {
      pub fn index(&self) -> usize {
        self.0 as usize
      }
    }

    impl From<usize> for $name {
      fn from(value: usize) -> Self {
        $name(value as u32)
      }
    }
  };
}

grammar_id!(RuleId, "Identifies a rule (a left-hand-side nonterminal and its productions).");
grammar_id!(ProdId, "Identifies a single production (one right-hand side of a rule).");
grammar_id!(RegexId, "Identifies a compiled regex terminal registered with the grammar.");
