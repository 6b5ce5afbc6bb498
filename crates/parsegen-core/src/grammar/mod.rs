//! The grammar model.

pub mod database;
pub mod ids;
pub mod production;
pub mod rule;
pub mod token;

pub use database::Grammar;
pub use ids::{ProdId, RegexId, RuleId};
pub use production::{IndentKind, Production, ProductionIter, RepType};
pub use rule::Rule;
pub use token::{Token, TokenKind};

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn add_rule_is_idempotent_by_name() {
    let mut g = Grammar::new();
    let a = g.add_rule("Sentence");
    let b = g.add_rule("Sentence");
    assert_eq!(a, b);
  }

  #[test]
  fn add_production_is_idempotent_by_content() {
    let mut g = Grammar::new();
    let number = g.register_regex("[0-9]+").unwrap();
    let rule = g.add_rule("Number");
    let a = g.add_production(rule, Production::new(ProdId::from(0), 0, vec![Token::regex(number)]));
    let b = g.add_production(rule, Production::new(ProdId::from(0), 0, vec![Token::regex(number)]));
    assert_eq!(a, b);
    assert_eq!(g.rule(rule).productions.len(), 1);
  }

  #[test]
  fn production_iter_walks_a_star_repeat() {
    let mut g = Grammar::new();
    let a = g.register_regex("a").unwrap();
    let rule = g.add_rule("Run");
    // A -> "a"* "a"   (concrete scenario 3: greedy *)
    let prod = g.add_production(
      rule,
      Production::new(ProdId::from(0), 0, vec![Token::regex(a), Token::regex(a)]).with_repeat(0, 1, RepType::Star),
    );

    let start = ProductionIter::start(prod);
    assert!(start.at_rep_start(&g));
    // nextB bypasses the repeat entirely.
    let skipped = start.next_b(&g).unwrap();
    assert_eq!(skipped.position(), 1);
    // nextA enters the repeat body.
    let entered = start.next_a(&g).unwrap();
    assert!(entered.at_rep_end(&g));
    // from the end of the repeat, nextB loops back to its start.
    let looped = entered.next_b(&g).unwrap();
    assert_eq!(looped.position(), 0);
  }

  #[test]
  fn rewrite_group_star_is_left_recursive_with_an_epsilon_base() {
    let mut g = Grammar::new();
    let a = g.register_regex("a").unwrap();
    let tok = g.rewrite_group(vec![Token::regex(a)], RepType::Star, None);
    let TokenKind::Rule(aux) = tok.kind else { panic!("expected a rule token") };
    assert_eq!(g.iter_productions(aux).count(), 2);
    assert!(g.rule(aux).is_auxiliary);
  }

  #[test]
  fn same_syntax_is_order_insensitive() {
    let mut a = Grammar::new();
    let ra = a.register_regex("a").unwrap();
    let rb = a.register_regex("b").unwrap();
    let x = a.add_rule("X");
    a.add_production(x, Production::new(ProdId::from(0), 0, vec![Token::regex(ra)]));
    a.add_production(x, Production::new(ProdId::from(0), 0, vec![Token::regex(rb)]));

    let mut b = Grammar::new();
    let rb2 = b.register_regex("b").unwrap();
    let ra2 = b.register_regex("a").unwrap();
    let x2 = b.add_rule("X");
    b.add_production(x2, Production::new(ProdId::from(0), 0, vec![Token::regex(rb2)]));
    b.add_production(x2, Production::new(ProdId::from(0), 0, vec![Token::regex(ra2)]));

    assert!(a.same_syntax(&b));
  }
}
