//! Cross-backend agreement: for LR-feasible (unambiguous) grammars, Earley,
//! GLL, and GLR must produce structurally identical trees, and `same_syntax`
//! must hold regardless of which two backend kinds are compared.

use crate::support::render;
use parsegen::{BackendKind, Parser};
use parsegen_core::grammar::{ProdId, Production, Token};

const ALL_BACKENDS: [BackendKind; 3] = [BackendKind::Earley, BackendKind::Gll, BackendKind::Glr];

fn build_arithmetic_grammar(p: &mut Parser) -> parsegen_core::grammar::RuleId {
  let g = p.grammar_mut();
  let number = g.register_regex("[0-9]+").unwrap();
  let plus = g.register_regex("\\+").unwrap();
  let lparen = g.register_regex("\\(").unwrap();
  let rparen = g.register_regex("\\)").unwrap();

  let term = g.add_rule("Term");
  g.add_production(term, Production::new(ProdId::from(0), 0, vec![Token::regex(number)]));
  g.add_production(term, Production::new(ProdId::from(0), 0, vec![Token::regex(lparen), Token::rule(term), Token::regex(rparen)]));

  let sum = g.add_rule("Sum");
  g.add_production(sum, Production::new(ProdId::from(0), 0, vec![Token::rule(term)]));
  g.add_production(sum, Production::new(ProdId::from(0), 0, vec![Token::rule(sum), Token::regex(plus), Token::rule(term)]));
  sum
}

#[test]
fn all_three_backends_agree_on_an_unambiguous_grammar() {
  let inputs = ["1+2+3", "(1)+2", "42"];
  for input in inputs {
    let mut rendered_trees = Vec::new();
    for kind in ALL_BACKENDS {
      let mut p = Parser::new(kind);
      let sum = build_arithmetic_grammar(&mut p);
      let matched = p.parse(sum, input, 0, 0).unwrap();
      assert!(matched, "{kind:?} failed on {input:?}");
      let chars: Vec<char> = input.chars().collect();
      rendered_trees.push((kind, render(p.tree_store(), &chars, p.tree().unwrap())));
    }
    let (first_kind, first_tree) = &rendered_trees[0];
    for (kind, tree) in &rendered_trees[1..] {
      assert_eq!(tree, first_tree, "{kind:?} disagreed with {first_kind:?} on {input:?}");
    }
  }
}

#[test]
fn same_syntax_holds_across_backend_kinds() {
  let mut earley = Parser::new(BackendKind::Earley);
  build_arithmetic_grammar(&mut earley);
  let mut gll = Parser::new(BackendKind::Gll);
  build_arithmetic_grammar(&mut gll);
  let mut glr = Parser::new(BackendKind::Glr);
  build_arithmetic_grammar(&mut glr);

  assert!(earley.same_syntax(&gll));
  assert!(gll.same_syntax(&glr));
  assert!(earley.same_syntax(&glr));
}

#[test]
fn reparsing_without_clear_is_idempotent() {
  for kind in ALL_BACKENDS {
    let mut p = Parser::new(kind);
    let sum = build_arithmetic_grammar(&mut p);

    let first = p.parse(sum, "1+2", 0, 0).unwrap();
    assert!(first, "{kind:?}");
    let first_end = p.match_end();

    let second = p.parse(sum, "1+2", 0, 0).unwrap();
    assert!(second, "{kind:?}");
    assert_eq!(p.match_end(), first_end, "{kind:?}: reparsing the same input changed the result");
  }
}
