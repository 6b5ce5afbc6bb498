//! The error taxonomy shared by every backend.
//!
//! Only [`ParsegenError::RegexSyntax`] and [`ParsegenError::GrammarInternal`]
//! ever unwind a call -- a failure to *parse* input text is never an `Err`,
//! it is visible through the façade's `has_error`/`error_msg`/`error_pos`
//! accessors instead. See `ParseFailure` in the façade's `ParseError` report
//! type for that half of the taxonomy.

use thiserror::Error;

pub type ParsegenResult<T> = Result<T, ParsegenError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParsegenError {
  /// A malformed regex pattern was supplied at grammar-construction time.
  #[error("regex syntax error at offset {offset}: {message}")]
  RegexSyntax { offset: usize, message: String },

  /// The registered grammar is internally inconsistent -- a rule token
  /// refers to a rule id that was never added, a production id collided
  /// with one already registered, etc.
  #[error("grammar is internally inconsistent: {message}")]
  GrammarInternal { message: String },
}
