//! A rule: a stable id, a name, and an ordered list of productions.

use super::ids::{ProdId, RuleId};
use parsegen_runtime::IString;

#[derive(Clone, Debug)]
pub struct Rule {
  pub id: RuleId,
  pub name: IString,
  pub productions: Vec<ProdId>,
  /// `true` for rules synthesized by `?`/`*`/`+`/`()` rewriting.
  /// Such rules have no user-facing name and are never returned by
  /// `Grammar::rule_by_name`.
  pub is_auxiliary: bool,
  /// `true` for scanner nonterminals -- rules whose purpose is to define a
  /// regex-backed token rather than to appear in the parse tree.
  pub is_scanner: bool,
}
