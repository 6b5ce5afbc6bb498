//! Productions and the production iterator.
//!
//! [`ProductionIter`] is the sole place in the workbench that encodes the
//! extended operators `?`, `*`, `+`. Every backend walks a production
//! exclusively through this cursor; none of them special-case `RepType`
//! directly.

use super::{database::Grammar, ids::ProdId, token::Token};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RepType {
  #[default]
  None,
  /// `?` -- the captured range may be skipped.
  Optional,
  /// `*` -- the captured range may be skipped or repeated.
  Star,
  /// `+` -- the captured range must appear at least once, and may repeat.
  Plus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum IndentKind {
  #[default]
  None,
  Increase,
  Decrease,
  /// Match the indentation of a sibling at the given token index.
  SameAs(u32),
  /// Fix indentation to an absolute level.
  Level(u32),
}

/// One right-hand side of a rule.
///
/// Auxiliary productions synthesized from operator rewriting are
/// ordinary `Production` values with `is_auxiliary` set; see
/// `Grammar::rewrite_repetition` and `DESIGN.md` for why tag bits in the id
/// space were not used to represent them.
#[derive(Clone, Debug)]
pub struct Production {
  pub id: ProdId,
  /// Larger wins when two derivations are otherwise tied on coverage.
  pub priority: i32,
  pub tokens: Vec<Token>,
  /// `[rep_start, rep_end)` bounds the token range that `?`/`*`/`+` applies
  /// to. Equal bounds mean no repetition in this production.
  pub rep_start: u32,
  pub rep_end: u32,
  pub rep_type: RepType,
  pub indent_range: Option<(u32, u32)>,
  pub indent_kind: IndentKind,
  /// Set on productions synthesized by `?`/`*`/`+`/`()` rewriting. The tree
  /// store treats these as transparent when comparing priority.
  pub is_auxiliary: bool,
}

impl Production {
  pub fn new(id: ProdId, priority: i32, tokens: Vec<Token>) -> Self {
    Production {
      id,
      priority,
      tokens,
      rep_start: 0,
      rep_end: 0,
      rep_type: RepType::None,
      indent_range: None,
      indent_kind: IndentKind::None,
      is_auxiliary: false,
    }
  }

  pub fn with_repeat(mut self, rep_start: u32, rep_end: u32, rep_type: RepType) -> Self {
    self.rep_start = rep_start;
    self.rep_end = rep_end;
    self.rep_type = rep_type;
    self
  }

  pub fn with_indent(mut self, start: u32, end: u32, kind: IndentKind) -> Self {
    self.indent_range = Some((start, end));
    self.indent_kind = kind;
    self
  }

  pub fn auxiliary(mut self) -> Self {
    self.is_auxiliary = true;
    self
  }

  pub fn len(&self) -> u32 {
    self.tokens.len() as u32
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  fn has_repeat(&self) -> bool {
    self.rep_type != RepType::None && self.rep_start < self.rep_end
  }
}

/// A two-fork cursor through a production.
///
/// At any reachable position `p`, `next_a` advances linearly and `next_b`
/// either bypasses the repeated range (`?`/`*`) or loops back to its start
/// (`*`/`+`). At most one of `next_a`/`next_b` is ever invalid at a
/// reachable position, and the set of positions reachable from position 0
/// is finite -- bypass only ever moves forward, and loop-back only revisits
/// `rep_start`, which a backend's own dedup (Earley state-set membership,
/// GLL's per-rule table, GLR's processed-set) is responsible for bounding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductionIter {
  prod: ProdId,
  pos:  u32,
}

impl ProductionIter {
  pub fn new(prod: ProdId, pos: u32) -> Self {
    ProductionIter { prod, pos }
  }

  pub fn start(prod: ProdId) -> Self {
    ProductionIter { prod, pos: 0 }
  }

  pub fn position(&self) -> u32 {
    self.pos
  }

  pub fn production_id(&self) -> ProdId {
    self.prod
  }

  pub fn end(&self, g: &Grammar) -> bool {
    self.pos >= g.production(self.prod).len()
  }

  pub fn token<'g>(&self, g: &'g Grammar) -> Option<&'g Token> {
    g.production(self.prod).tokens.get(self.pos as usize)
  }

  /// At the start of a repeated range.
  pub fn at_rep_start(&self, g: &Grammar) -> bool {
    let p = g.production(self.prod);
    p.has_repeat() && self.pos == p.rep_start
  }

  /// At the end of a repeated range (one past its last token).
  pub fn at_rep_end(&self, g: &Grammar) -> bool {
    let p = g.production(self.prod);
    p.has_repeat() && self.pos == p.rep_end
  }

  /// Advance linearly to `pos + 1`. Invalid at the end of the production.
  pub fn next_a(&self, g: &Grammar) -> Option<ProductionIter> {
    if self.end(g) {
      None
    } else {
      Some(ProductionIter { prod: self.prod, pos: self.pos + 1 })
    }
  }

  /// Bypass a `?`/`*` range from its start, or loop back to the start of a
  /// `*`/`+` range from its end. Invalid everywhere else.
  pub fn next_b(&self, g: &Grammar) -> Option<ProductionIter> {
    let p = g.production(self.prod);
    if self.at_rep_start(g) && matches!(p.rep_type, RepType::Optional | RepType::Star) {
      Some(ProductionIter { prod: self.prod, pos: p.rep_end })
    } else if self.at_rep_end(g) && matches!(p.rep_type, RepType::Star | RepType::Plus) {
      Some(ProductionIter { prod: self.prod, pos: p.rep_start })
    } else {
      None
    }
  }
}
