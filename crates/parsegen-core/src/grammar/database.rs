//! The grammar database: rule/production registration, operator rewriting,
//! and `same_syntax` structural comparison.

use super::{
  ids::{ProdId, RegexId, RuleId},
  production::{Production, RepType},
  rule::Rule,
  token::{Token, TokenKind},
};
use parsegen_runtime::{CachedString, IString, OrderedMap, Regex};

/// Registers rules and productions, resolves delimiter tokens, and performs
/// the `?`/`*`/`+`/`()` rewriting into auxiliary rules.
///
/// `add_rule`/`add_production` are idempotent: re-registering the same rule
/// name or the same production content returns the existing id rather than
/// creating a duplicate, so a grammar loader can freely re-declare shared
/// sub-grammars (e.g. a common `Delim` rule) without needing its own
/// memoization.
#[derive(Default)]
pub struct Grammar {
  rules: Vec<Rule>,
  rule_by_name: OrderedMap<IString, RuleId>,
  productions: Vec<Production>,
  production_sigs: OrderedMap<(RuleId, String), ProdId>,
  regexes: Vec<Regex>,
  regex_by_pattern: OrderedMap<String, RegexId>,
  delimiter_rule: Option<RuleId>,
  aux_rule_count: u32,
  /// Parallel to `productions`: which rule each production belongs to.
  /// Lets a backend recover the left-hand side from a bare `ProdId`
  /// (Earley's completer needs this to know which rule just finished).
  prod_rule: Vec<RuleId>,
}

impl Grammar {
  pub fn new() -> Self {
    Grammar::default()
  }

  pub fn add_rule(&mut self, name: &str) -> RuleId {
    if let Some(id) = self.rule_by_name.get(&name.to_token()) {
      return *id;
    }
    let id = RuleId::from(self.rules.len());
    self.rules.push(Rule { id, name: name.to_token(), productions: Vec::new(), is_auxiliary: false, is_scanner: false });
    self.rule_by_name.insert(name.to_token(), id);
    id
  }

  pub fn mark_scanner(&mut self, rule: RuleId) {
    self.rules[rule.index()].is_scanner = true;
  }

  pub fn set_delimiter(&mut self, rule: RuleId) {
    self.delimiter_rule = Some(rule);
  }

  pub fn delimiter_rule(&self) -> Option<RuleId> {
    self.delimiter_rule
  }

  pub fn register_regex(&mut self, pattern: &str) -> Result<RegexId, parsegen_runtime::ParsegenError> {
    if let Some(id) = self.regex_by_pattern.get(pattern) {
      return Ok(*id);
    }
    let regex = Regex::new(pattern)?;
    let id = RegexId::from(self.regexes.len());
    self.regexes.push(regex);
    self.regex_by_pattern.insert(pattern.to_string(), id);
    Ok(id)
  }

  pub fn regex(&self, id: RegexId) -> &Regex {
    &self.regexes[id.index()]
  }

  /// Adds a production to `rule`. Returns the existing id if a production
  /// with identical content was already registered under the same rule.
  pub fn add_production(&mut self, rule: RuleId, production: Production) -> ProdId {
    let sig = production_signature(&production);
    if let Some(id) = self.production_sigs.get(&(rule, sig.clone())) {
      return *id;
    }
    let id = ProdId::from(self.productions.len());
    let mut production = production;
    production.id = id;
    self.productions.push(production);
    self.prod_rule.push(rule);
    self.rules[rule.index()].productions.push(id);
    self.production_sigs.insert((rule, sig), id);
    id
  }

  /// Which rule `prod` is a right-hand side of.
  pub fn production_rule(&self, prod: ProdId) -> RuleId {
    self.prod_rule[prod.index()]
  }

  /// Rewrites a `(body)?`/`(body)*`/`(body)+` capture group into a fresh
  /// auxiliary rule and returns the `Token::rule(..)` that should replace
  /// the group in the enclosing production's token list.
  ///
  /// `* `and `+` are encoded as left-recursive auxiliary rules (`X' -> eps |
  /// X' body` and `X' -> body | X' body` respectively) so that the greedy
  /// preference for longer derivations falls naturally out of the shared
  /// tree-priority order instead of needing bespoke logic in
  /// each backend.
  pub fn rewrite_group(&mut self, body: Vec<Token>, rep: RepType, capture_target: Option<u32>) -> Token {
    self.aux_rule_count += 1;
    let aux_name = format!("$aux{}", self.aux_rule_count);
    let aux = RuleId::from(self.rules.len());
    self.rules.push(Rule { id: aux, name: aux_name.as_str().to_token(), productions: Vec::new(), is_auxiliary: true, is_scanner: false });

    match rep {
      RepType::None => unreachable!("rewrite_group is only called for ?/*/+ groups"),
      RepType::Optional => {
        self.add_production(aux, Production::new(ProdId::from(0), 0, vec![]).auxiliary());
        self.add_production(aux, Production::new(ProdId::from(0), 0, body).auxiliary());
      }
      RepType::Star => {
        self.add_production(aux, Production::new(ProdId::from(0), 0, vec![]).auxiliary());
        let mut tokens = vec![Token::rule(aux)];
        tokens.extend(body);
        self.add_production(aux, Production::new(ProdId::from(0), 0, tokens).auxiliary());
      }
      RepType::Plus => {
        self.add_production(aux, Production::new(ProdId::from(0), 0, body.clone()).auxiliary());
        let mut tokens = vec![Token::rule(aux)];
        tokens.extend(body);
        self.add_production(aux, Production::new(ProdId::from(0), 0, tokens).auxiliary());
      }
    }

    let mut tok = Token::rule(aux);
    if let Some(target) = capture_target {
      tok = tok.with_target(target);
    }
    tok
  }

  pub fn rule(&self, id: RuleId) -> &Rule {
    &self.rules[id.index()]
  }

  pub fn rule_by_name(&self, name: &str) -> Option<RuleId> {
    self.rule_by_name.get(&name.to_token()).copied()
  }

  pub fn production(&self, id: ProdId) -> &Production {
    &self.productions[id.index()]
  }

  /// Resolves a `Token::Delimiter` to the grammar's configured delimiter
  /// rule. Every other token kind is returned unchanged.
  pub fn resolve(&self, token: &Token) -> TokenKind {
    match &token.kind {
      TokenKind::Delimiter => {
        TokenKind::Rule(self.delimiter_rule.expect("grammar uses a delimiter token but no delimiter rule was set"))
      }
      other => other.clone(),
    }
  }

  /// Yields the productions of `rule` in registration order.
  pub fn iter_productions(&self, rule: RuleId) -> impl Iterator<Item = ProdId> + '_ {
    self.rules[rule.index()].productions.iter().copied()
  }

  pub fn rule_count(&self) -> usize {
    self.rules.len()
  }

  pub fn rules(&self) -> &[Rule] {
    &self.rules
  }

  /// Structural grammar equivalence, used to decide whether a backend's
  /// derived tables (e.g. GLR's LR(0) table) can be reused across parser
  /// instances sharing "the same" grammar.
  pub fn same_syntax(&self, other: &Grammar) -> bool {
    if self.rules.len() != other.rules.len() || self.delimiter_rule.is_some() != other.delimiter_rule.is_some() {
      return false;
    }

    let mut mine: Vec<(String, Vec<String>)> = self
      .rules
      .iter()
      .map(|r| {
        let mut sigs: Vec<String> =
          r.productions.iter().map(|p| production_signature(self.production(*p))).collect();
        sigs.sort();
        (r.name.to_string(&Default::default()), sigs)
      })
      .collect();
    let mut theirs: Vec<(String, Vec<String>)> = other
      .rules
      .iter()
      .map(|r| {
        let mut sigs: Vec<String> =
          r.productions.iter().map(|p| production_signature(other.production(*p))).collect();
        sigs.sort();
        (r.name.to_string(&Default::default()), sigs)
      })
      .collect();
    mine.sort();
    theirs.sort();
    mine == theirs
  }
}

/// A structural fingerprint of a production's content, independent of its
/// id. Two productions with the same signature under the same rule are
/// considered duplicates by `add_production`.
fn production_signature(p: &Production) -> String {
  let mut s = format!("{}|{}|{}|{:?}", p.priority, p.rep_start, p.rep_end, p.rep_type);
  for t in &p.tokens {
    s.push('|');
    match &t.kind {
      TokenKind::Regex(id) => s.push_str(&format!("r{}", id.0)),
      TokenKind::Rule(id) => s.push_str(&format!("u{}", id.0)),
      TokenKind::Delimiter => s.push_str("d"),
    }
    if let Some(target) = t.target {
      s.push_str(&format!("->{target}"));
    }
  }
  s
}
