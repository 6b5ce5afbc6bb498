//! The token types a [`Production`](super::production::Production) is made
//! of.

use super::ids::{RegexId, RuleId};
use parsegen_runtime::IString;

/// A single position's worth of syntax -- either a terminal (regex), a
/// nonterminal (rule reference), or the grammar's implicit delimiter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
  /// Matched directly against input text via a compiled regex.
  Regex(RegexId),
  /// Matched by recursively invoking another rule.
  Rule(RuleId),
  /// Expands to a reference to the grammar's declared delimiter rule.
  /// Resolved to a concrete `Rule` token at grammar-finalization time.
  Delimiter,
}

/// One token within a production, plus the metadata the façade needs to
/// place its match into a host-provided record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  /// The field offset in the host's syntax-tree record this token's match
  /// should be written to, if any. Array slots (repeated captures) are
  /// appended in reverse by the backend and flipped at tree-construction
  /// time; see target slots.
  pub target: Option<u32>,
  /// Semantic color for IDE presentation, carried through to info-tree
  /// leaves.
  pub color: Option<IString>,
}

impl Token {
  pub fn regex(id: RegexId) -> Self {
    Token { kind: TokenKind::Regex(id), target: None, color: None }
  }

  pub fn rule(id: RuleId) -> Self {
    Token { kind: TokenKind::Rule(id), target: None, color: None }
  }

  pub fn delimiter() -> Self {
    Token { kind: TokenKind::Delimiter, target: None, color: None }
  }

  pub fn with_target(mut self, target: u32) -> Self {
    self.target = Some(target);
    self
  }

  pub fn with_color(mut self, color: IString) -> Self {
    self.color = Some(color);
    self
  }
}
