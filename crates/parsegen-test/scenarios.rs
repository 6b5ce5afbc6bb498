//! The concrete scenarios from the parser-core testable properties:
//! simple sentence, ambiguity by priority, greedy `*`, empty-matching
//! rule, negative priority escape, and approximate parsing. Each is run
//! against all three backends.

use crate::support::render;
use parsegen_core::grammar::{Grammar, IndentKind, ProdId, Production, RepType, RuleId, Token};
use parsegen::{BackendKind, Parser};

const ALL_BACKENDS: [BackendKind; 3] = [BackendKind::Earley, BackendKind::Gll, BackendKind::Glr];

#[test]
fn simple_sentence() {
  for kind in ALL_BACKENDS {
    let mut p = Parser::new(kind);
    let g = p.grammar_mut();
    let word = g.register_regex("[a-zA-Z]+").unwrap();
    let space = g.register_regex(" ").unwrap();
    let the = g.register_regex("the").unwrap();
    let runs = g.register_regex("runs").unwrap();
    let sentence = g.add_rule("Sentence");
    g.add_production(
      sentence,
      Production::new(
        ProdId::from(0),
        0,
        vec![
          Token::regex(the).with_target(0),
          Token::regex(space),
          Token::regex(word).with_target(1),
          Token::regex(space),
          Token::regex(runs).with_target(2),
        ],
      ),
    );

    let matched = p.parse(sentence, "the cat runs", 0, 0).unwrap();
    assert!(matched, "{kind:?}");
    assert_eq!(p.match_end(), 12, "{kind:?}");
    let input: Vec<char> = "the cat runs".chars().collect();
    assert_eq!(p.info_tree().unwrap().length(), 12, "{kind:?}");
    let rendered = render(p.tree_store(), &input, p.tree().unwrap());
    assert!(rendered.contains("cat"), "{kind:?}: {rendered}");
  }
}

#[test]
fn ambiguity_by_priority() {
  // E -> E "+" E [0] | E "*" E [1] | number
  for kind in ALL_BACKENDS {
    let mut p = Parser::new(kind);
    let g = p.grammar_mut();
    let number = g.register_regex("[0-9]+").unwrap();
    let plus = g.register_regex("\\+").unwrap();
    let star = g.register_regex("\\*").unwrap();
    let e = g.add_rule("E");
    g.add_production(e, Production::new(ProdId::from(0), 0, vec![Token::regex(number)]));
    g.add_production(e, Production::new(ProdId::from(0), 0, vec![Token::rule(e), Token::regex(plus), Token::rule(e)]));
    g.add_production(e, Production::new(ProdId::from(0), 1, vec![Token::rule(e), Token::regex(star), Token::rule(e)]));

    let matched = p.parse(e, "1+2*3", 0, 0).unwrap();
    assert!(matched, "{kind:?}");
    assert_eq!(p.match_end(), 5, "{kind:?}");
    let input: Vec<char> = "1+2*3".chars().collect();
    let rendered = render(p.tree_store(), &input, p.tree().unwrap());
    // Registration order fixes production ids: 0 = number, 1 = "+", 2 = "*".
    // Higher priority wins where the two overlap, so `*` binds tighter and
    // nests "2*3" under the right-hand side of "+" rather than the reverse.
    assert_eq!(rendered, "(1 (0 1) + (2 (0 2) * (0 3)))", "{kind:?}");
  }
}

#[test]
fn greedy_star() {
  // A -> "a"* "a"
  for kind in ALL_BACKENDS {
    let mut p = Parser::new(kind);
    let g = p.grammar_mut();
    let a = g.register_regex("a").unwrap();
    let run = g.add_rule("Run");
    g.add_production(run, Production::new(ProdId::from(0), 0, vec![Token::regex(a), Token::regex(a)]).with_repeat(0, 1, RepType::Star));

    let matched = p.parse(run, "aaa", 0, 0).unwrap();
    assert!(matched, "{kind:?}");
    assert_eq!(p.match_end(), 3, "{kind:?}", );
  }
}

#[test]
fn empty_matching_rule() {
  // Delim : " *"; Outer : "(" , Inner , ")"; Inner : Delim;
  for kind in ALL_BACKENDS {
    let mut p = Parser::new(kind);
    let g = p.grammar_mut();
    let spaces = g.register_regex(" *").unwrap();
    let open = g.register_regex("\\(").unwrap();
    let close = g.register_regex("\\)").unwrap();
    let delim = g.add_rule("Delim");
    g.add_production(delim, Production::new(ProdId::from(0), 0, vec![Token::regex(spaces)]));
    let inner = g.add_rule("Inner");
    g.add_production(inner, Production::new(ProdId::from(0), 0, vec![Token::rule(delim)]));
    let outer = g.add_rule("Outer");
    g.add_production(outer, Production::new(ProdId::from(0), 0, vec![Token::regex(open), Token::rule(inner), Token::regex(close)]));

    let matched = p.parse(outer, "()", 0, 0).unwrap();
    assert!(matched, "{kind:?}");
    assert_eq!(p.match_end(), 2, "{kind:?}");
  }
}

#[test]
fn negative_priority_escape() {
  // Prio : "var" name [10] | kw name [-10]
  for kind in ALL_BACKENDS {
    let mut p = Parser::new(kind);
    let g = p.grammar_mut();
    let var = g.register_regex("var").unwrap();
    let kw = g.register_regex("[a-z]+").unwrap();
    let space = g.register_regex(" ").unwrap();
    let name = g.register_regex("[a-zA-Z]+").unwrap();
    let prio = g.add_rule("Prio");
    g.add_production(prio, Production::new(ProdId::from(0), 10, vec![Token::regex(var), Token::regex(space), Token::regex(name)]));
    g.add_production(prio, Production::new(ProdId::from(0), -10, vec![Token::regex(kw), Token::regex(space), Token::regex(name)]));

    let matched = p.parse(prio, "var x", 0, 0).unwrap();
    assert!(matched, "{kind:?}");
    let input: Vec<char> = "var x".chars().collect();
    let rendered = render(p.tree_store(), &input, p.tree().unwrap());
    let var_prod = g.rule(prio).productions[0].0;
    assert!(rendered.starts_with(&format!("({var_prod}")), "{kind:?}: {rendered}");
  }
}

#[test]
fn approximate_parse_reports_recovery_on_missing_terminator() {
  // A mandatory ";" after a word; "foo +" has no terminator.
  for kind in ALL_BACKENDS {
    let mut p = Parser::new(kind);
    let g = p.grammar_mut();
    let word = g.register_regex("[a-zA-Z]+").unwrap();
    let semi = g.register_regex(";").unwrap();
    let stmt = g.add_rule("Stmt");
    g.add_production(stmt, Production::new(ProdId::from(0), 0, vec![Token::regex(word), Token::regex(semi)]));

    let matched = p.parse(stmt, "foo +", 0, 0).unwrap();
    assert!(!matched, "{kind:?}");

    let approx = p.parse_approx(stmt, "foo +", 0, 0).unwrap();
    assert!(approx.failed, "{kind:?}");
    assert!(p.info_tree().is_some(), "{kind:?}");
    let leaves = p.info_tree().unwrap().leaf_concatenation();
    assert!(leaves.starts_with("foo"), "{kind:?}: {leaves}");
  }
}

#[test]
fn indent_metadata_survives_to_the_info_tree() {
  let mut p = Parser::new(BackendKind::Earley);
  let g = p.grammar_mut();
  let word = g.register_regex("[a-zA-Z]+").unwrap();
  let block = g.add_rule("Block");
  g.add_production(
    block,
    Production::new(ProdId::from(0), 0, vec![Token::regex(word), Token::regex(word)]).with_indent(0, 2, IndentKind::Increase),
  );

  let matched = p.parse(block, "ab cd", 0, 0).unwrap();
  assert!(matched);
  let info = p.info_tree().unwrap();
  assert_eq!(info.indent_at(0), IndentKind::Increase);
}

#[allow(dead_code)]
fn unused_helper_keeps_imports_honest(_: RuleId, _: &Grammar) {}
