//! The parser facade.
//!
//! A single [`Parser`] type picks one of the three backend crates at
//! construction and forwards the uniform [`ParserBackend`] contract to it.
//! Grammar mutation always goes through `grammar_mut()`, exactly as the
//! backends themselves expose it -- the facade adds no grammar-building
//! API of its own, since duplicating `add_rule`/`add_production` here
//! would just be one more place for the three backends to drift out of
//! sync.

use parsegen_core::{
  backend::{ApproxError, ParserBackend},
  grammar::{Grammar, RuleId},
  info_tree::InfoNode,
  tree::{NodeRef, TreeStore},
};
use parsegen_earley::EarleyParser;
use parsegen_gll::GllParser;
use parsegen_glr::GlrParser;
use parsegen_runtime::ParsegenResult;

/// Which backend a [`Parser`] runs on. The grammar registered through one
/// is fully portable to another -- `ParserBackend::same_syntax` is how a
/// caller checks that two instances, possibly of different kinds, agree.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BackendKind {
  Earley,
  Gll,
  Glr,
}

enum Backend {
  Earley(EarleyParser),
  Gll(GllParser),
  Glr(GlrParser),
}

impl Backend {
  fn as_dyn(&self) -> &dyn ParserBackend {
    match self {
      Backend::Earley(p) => p,
      Backend::Gll(p) => p,
      Backend::Glr(p) => p,
    }
  }

  fn as_dyn_mut(&mut self) -> &mut dyn ParserBackend {
    match self {
      Backend::Earley(p) => p,
      Backend::Gll(p) => p,
      Backend::Glr(p) => p,
    }
  }
}

/// A parser over one of the three interchangeable backends.
pub struct Parser {
  backend: Backend,
  kind: BackendKind,
}

impl Parser {
  pub fn new(kind: BackendKind) -> Self {
    let backend = match kind {
      BackendKind::Earley => Backend::Earley(EarleyParser::new()),
      BackendKind::Gll => Backend::Gll(GllParser::new()),
      BackendKind::Glr => Backend::Glr(GlrParser::new()),
    };
    Parser { backend, kind }
  }

  pub fn kind(&self) -> BackendKind {
    self.kind
  }

  pub fn grammar(&self) -> &Grammar {
    self.backend.as_dyn().grammar()
  }

  pub fn grammar_mut(&mut self) -> &mut Grammar {
    self.backend.as_dyn_mut().grammar_mut()
  }

  pub fn same_syntax(&self, other: &Parser) -> bool {
    self.backend.as_dyn().same_syntax(other.backend.as_dyn())
  }

  pub fn parse(&mut self, root: RuleId, text: &str, source_id: u32, start_offset: u32) -> ParsegenResult<bool> {
    log::debug!("parsing {} bytes with root rule {:?} on a {:?} backend", text.len(), root, self.kind);
    let matched = self.backend.as_dyn_mut().parse(root, text, source_id, start_offset)?;
    if !matched {
      log::debug!("parse failed at {}", self.error_pos());
    }
    Ok(matched)
  }

  pub fn parse_approx(&mut self, root: RuleId, text: &str, source_id: u32, start_offset: u32) -> ParsegenResult<ApproxError> {
    self.backend.as_dyn_mut().parse_approx(root, text, source_id, start_offset)
  }

  pub fn clear(&mut self) {
    self.backend.as_dyn_mut().clear();
  }

  pub fn has_error(&self) -> bool {
    self.backend.as_dyn().has_error()
  }

  pub fn has_tree(&self) -> bool {
    self.backend.as_dyn().has_tree()
  }

  pub fn match_end(&self) -> u32 {
    self.backend.as_dyn().match_end()
  }

  pub fn error_msg(&self) -> String {
    self.backend.as_dyn().error_msg()
  }

  pub fn error_pos(&self) -> u32 {
    self.backend.as_dyn().error_pos()
  }

  pub fn tree(&self) -> Option<NodeRef> {
    self.backend.as_dyn().tree()
  }

  pub fn tree_store(&self) -> &TreeStore {
    self.backend.as_dyn().tree_store()
  }

  pub fn info_tree(&self) -> Option<&InfoNode> {
    self.backend.as_dyn().info_tree()
  }

  pub fn state_count(&self) -> usize {
    self.backend.as_dyn().state_count()
  }

  pub fn byte_count(&self) -> usize {
    self.backend.as_dyn().byte_count()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use parsegen_core::grammar::{Production, ProdId, Token};

  fn build_sentence_grammar(g: &mut Grammar) -> RuleId {
    let word = g.register_regex("[a-zA-Z]+").unwrap();
    let space = g.register_regex(" ").unwrap();
    let sentence = g.add_rule("Sentence");
    g.add_production(sentence, Production::new(ProdId::from(0), 0, vec![Token::regex(word), Token::regex(space), Token::regex(word)]));
    sentence
  }

  #[test]
  fn every_backend_accepts_the_same_sentence() {
    for kind in [BackendKind::Earley, BackendKind::Gll, BackendKind::Glr] {
      let mut p = Parser::new(kind);
      let sentence = build_sentence_grammar(p.grammar_mut());

      let matched = p.parse(sentence, "the cat", 0, 0).unwrap();
      assert!(matched, "{:?} backend failed to parse", kind);
      assert_eq!(p.match_end(), 7, "{:?} backend matched the wrong length", kind);
    }
  }

  #[test]
  fn clear_retains_grammar_but_drops_tree() {
    let mut p = Parser::new(BackendKind::Earley);
    let sentence = build_sentence_grammar(p.grammar_mut());
    p.parse(sentence, "the cat", 0, 0).unwrap();
    assert!(p.has_tree());
    let rule_count_before = p.grammar().rule_count();
    p.clear();
    assert!(!p.has_tree());
    assert_eq!(p.grammar().rule_count(), rule_count_before);
    // The grammar survived `clear()`, so parsing again needs no re-registration.
    let matched = p.parse(sentence, "a dog", 0, 0).unwrap();
    assert!(matched);
  }
}
