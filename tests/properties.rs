//! Universal properties from the spec's testable-properties section that
//! aren't already pinned down by a concrete S1-S6 scenario.

use std::rc::Rc;

use microses_parser::{Action, Grammar, ParserConfig, Tree};

fn action<F>(f: F) -> Action<Tree>
where
    F: Fn(&[Tree]) -> Tree + 'static,
{
    Rc::new(f)
}

fn arith_grammar() -> Grammar<Tree> {
    Grammar::<Tree>::compile(
        &[
            "expr ::= term ((\"+\" / \"-\") term)* ",
            " ;\nterm ::= factor ((\"*\" / \"/\") factor)* ",
            " ;\nfactor ::= NUMBER / \"(\" expr \")\" ;",
        ],
        vec![
            action(|vals| fold_left(vals)),
            action(|vals| fold_left(vals)),
        ],
    )
    .unwrap()
}

fn fold_left(vals: &[Tree]) -> Tree {
    let mut acc = vals[0].clone();
    for pair in vals[1].items() {
        let parts = pair.items();
        acc = Tree::Seq(vec![parts[0].clone(), acc, parts[1].clone()]);
    }
    acc
}

// Property 3: two fresh parses of the same grammar/input agree, and turning
// memoization off changes only the hit/miss counters, not the result.
#[test]
fn memoization_equivalence() {
    let grammar = arith_grammar();
    let input = "1 + 2 * (3 + 4) - 5";

    let (first, stats_memo) = grammar
        .parse_with_stats(&[input], vec![], ParserConfig::default())
        .unwrap();
    let (second, _) = grammar
        .parse_with_stats(&[input], vec![], ParserConfig::default())
        .unwrap();
    assert_eq!(first, second);
    assert!(stats_memo.hits > 0, "a grammar this deep should reuse memoized results");

    let no_memo_config = ParserConfig {
        debug: false,
        memoize: false,
    };
    let (third, stats_no_memo) = grammar
        .parse_with_stats(&[input], vec![], no_memo_config)
        .unwrap();
    assert_eq!(first, third);
    assert_eq!(stats_no_memo.hits, 0);
}

// Property 4: ordered choice picks the first alternative that matches.
#[test]
fn ordered_choice_prefers_first_alternative() {
    let grammar = Grammar::<Tree>::compile(
        &["start ::= \"a\" ", " / \"a\" ", " ;"],
        vec![
            action(|_| Tree::Text("first".to_string())),
            action(|_| Tree::Text("second".to_string())),
        ],
    )
    .unwrap();

    let result = grammar.parse(&["a"], vec![]).unwrap();
    assert_eq!(result, Tree::Text("first".to_string()));
}

// Property 6: the furthest-failure position is >= any single failure's
// position — checked here by confirming it lands on the deepest failure in
// a grammar with several alternatives failing at different depths.
#[test]
fn diagnostic_position_is_the_furthest_failure() {
    let grammar = Grammar::<Tree>::compile(
        &["start ::= \"a\" \"b\" \"c\" / \"a\" \"x\" ;"],
        vec![],
    )
    .unwrap();

    // "a b" fails on the first alternative after two tokens (expecting
    // "c"), and on the second alternative after one token (expecting "x").
    // The furthest failure must be attributed to the first alternative.
    let err = grammar.parse(&["a b"], vec![]).unwrap_err();
    match err {
        microses_parser::Error::Syntax(e) => {
            assert!(e.expected.contains(&"c".to_string()));
            assert!(!e.expected.contains(&"x".to_string()));
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

// Property 7: a successful start rule with unconsumed trailing input is
// still a parse failure.
#[test]
fn eof_discipline_rejects_trailing_input() {
    let grammar = Grammar::<Tree>::compile(&["start ::= \"a\" ;"], vec![]).unwrap();
    assert!(grammar.parse(&["a"], vec![]).is_ok());
    assert!(grammar.parse(&["a b"], vec![]).is_err());
}

// §4.5: a failure at end of stream is reported as "Unexpected EOF after
// <last token>", distinct from naming an offending token mid-stream.
#[test]
fn syntax_error_names_unexpected_eof_after_last_token() {
    let grammar = Grammar::<Tree>::compile(&["start ::= \"a\" \"b\" ;"], vec![]).unwrap();
    let err = grammar.parse(&["a"], vec![]).unwrap_err();
    match err {
        microses_parser::Error::Syntax(e) => {
            assert!(e.message.starts_with("Unexpected EOF after"));
            assert!(e.message.contains("\"a\""));
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

// Indirect left recursion (A -> B -> A) must also be caught, not just the
// direct A -> A case covered by S5.
#[test]
fn indirect_left_recursion_is_detected() {
    let grammar =
        Grammar::<Tree>::compile(&["A ::= B \"x\" / \"x\" ;\nB ::= A \"y\" ;"], vec![]).unwrap();
    let err = grammar.parse(&["x y x"], vec![]).unwrap_err();
    assert!(matches!(err, microses_parser::Error::GrammarUse(_)));
}

// A hole used as a value placeholder (interpolated data, not an action)
// round-trips through `Grammar::parse`'s hole substitution.
#[test]
fn interpolated_hole_value_is_substituted() {
    let grammar = Grammar::<Tree>::compile(
        &["start ::= \"(\" HOLE \")\" ", " ;"],
        vec![action(|vals| vals[1].clone())],
    )
    .unwrap();

    let result = grammar
        .parse(&["(", ")"], vec![Tree::Text("payload".to_string())])
        .unwrap();
    assert_eq!(result, Tree::Text("payload".to_string()));
}
