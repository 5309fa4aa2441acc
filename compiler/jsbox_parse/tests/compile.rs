//! End-to-end compilation of whole scripts through the public API.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use jsbox_ir::{FunctionBody, Node, Opcode};
use jsbox_parse::{compile, compile_with, parse_deferred, ParseError, ParseOptions, CONTEXT_LEN};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const SCRIPT: &str = r#"
// Totals per category, skipping empty rows.
const rows = input.rows
let totals = {}
for (const row of rows) {
    if (!row.amount) continue
    totals[row.category] = (totals[row.category] ?? 0) + row.amount
}

/* Helpers */
function describe(name) {
    return `${name}: ${totals[name].toFixed(2)}`
}

const names = Object.keys(totals).filter(n => n !== '').sort()
return names.map(describe).join("\n")
"#;

#[test]
fn realistic_script_compiles() {
    let program = compile(SCRIPT).unwrap();
    // The function declaration is hoisted ahead of everything else.
    assert!(matches!(&program.body[0], Node::Function(def) if def.name.as_deref() == Some("describe")));
    assert!(matches!(program.body.last(), Some(Node::Return(Some(_)))));
    assert_eq!(program.body.len(), 6);
}

#[test]
fn realistic_script_compiles_lazily() {
    let program = compile_with(SCRIPT, ParseOptions::default().lazy_functions(true)).unwrap();
    let Node::Function(def) = &program.body[0] else {
        panic!("expected hoisted function");
    };
    let FunctionBody::Deferred(body) = &def.body else {
        panic!("expected deferred body");
    };
    let nodes = body.get_or_parse(parse_deferred).unwrap();
    assert!(matches!(&nodes[0], Node::Return(Some(value)) if matches!(**value, Node::Template { .. })));
}

#[test]
fn strings_keep_their_contents() {
    let program = compile(r#"return "a // not a comment" + '/* nor this */'"#).unwrap();
    let Node::Return(Some(value)) = &program.body[0] else {
        panic!("expected return");
    };
    assert_eq!(
        **value,
        Node::Binary {
            op: Opcode::Add,
            left: Box::new(Node::Str("a // not a comment".into())),
            right: Box::new(Node::Str("/* nor this */".into())),
        }
    );
}

#[test]
fn empty_script_has_empty_body() {
    assert!(compile("").unwrap().is_empty());
    assert!(compile("  // only a comment\n").unwrap().is_empty());
}

#[test]
fn unexpected_token_context_is_truncated() {
    let source = format!("a {}", "b".repeat(100));
    let err = compile(&source).unwrap_err();
    let ParseError::UnexpectedToken { context, .. } = &err else {
        panic!("expected unexpected token, got {err:?}");
    };
    assert_eq!(context.chars().count(), CONTEXT_LEN);
}

#[test]
fn error_messages() {
    assert_eq!(
        compile("'abc").unwrap_err().to_string(),
        "Unterminated string literal"
    );
    assert_eq!(compile("f(").unwrap_err().to_string(), "Unbalanced '('");
    assert_eq!(
        compile("a +").unwrap_err().to_string(),
        "Unexpected end of expression"
    );
}

#[test]
fn await_needs_an_async_context() {
    let refused = ParseError::invalid("await", "only valid in async functions and at the top level");
    assert_eq!(compile("function f() { return await 3 }").unwrap_err(), refused);
    assert_eq!(compile("const f = () => await x").unwrap_err(), refused);
    assert_eq!(
        compile("async function g() { return () => await x }").unwrap_err(),
        refused
    );
    assert!(compile("await job; async function g() { return await 1 }").is_ok());
    assert!(compile("const h = async () => `${await x}`").is_ok());
}

#[test]
fn deferred_bodies_remember_their_async_context() {
    let lazy = ParseOptions::default().lazy_functions(true);
    let program = compile_with("function f() { return await 3 }", lazy).unwrap();
    let Node::Function(def) = &program.body[0] else {
        panic!("expected hoisted function");
    };
    let FunctionBody::Deferred(body) = &def.body else {
        panic!("expected deferred body");
    };
    assert!(!body.is_async);
    assert!(body.get_or_parse(parse_deferred).is_err());

    let program = compile_with("async function f() { return await 3 }", lazy).unwrap();
    let Node::Function(def) = &program.body[0] else {
        panic!("expected hoisted function");
    };
    let FunctionBody::Deferred(body) = &def.body else {
        panic!("expected deferred body");
    };
    assert!(body.get_or_parse(parse_deferred).is_ok());
}

#[test]
fn division_after_postfix_update_compiles() {
    let program = compile("let i = 4; let x = i++ / 2; return i-- / 2 / 1").unwrap();
    assert_eq!(program.body.len(), 3);
    let Node::Return(Some(value)) = &program.body[2] else {
        panic!("expected return");
    };
    assert!(matches!(**value, Node::Binary { op: Opcode::Div, .. }));
}

fn arb_operand() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..1000).prop_map(|n| n.to_string()),
        "[a-z][a-z0-9_]{0,6}".prop_filter("reserved words are not operands", |s| {
            !matches!(
                s.as_str(),
                "do" | "if" | "in" | "of" | "for" | "let" | "new" | "try" | "var" | "case" | "else"
                    | "void" | "with" | "break" | "catch" | "class" | "const" | "while"
                    | "yield" | "delete" | "return" | "switch" | "typeof" | "default"
                    | "await" | "throw" | "async" | "finally" | "continue" | "function"
                    | "instanceof"
            )
        }),
    ]
}

fn arb_operator() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("+"),
        Just("-"),
        Just("*"),
        Just("/"),
        Just("%"),
        Just("**"),
        Just("<"),
        Just("==="),
        Just("&&"),
        Just("||"),
        Just("??"),
        Just("|"),
        Just("<<"),
    ]
}

fn arb_chain() -> impl Strategy<Value = String> {
    (
        arb_operand(),
        prop::collection::vec((arb_operator(), arb_operand()), 0..8),
    )
        .prop_map(|(first, rest)| {
            rest.into_iter().fold(first, |acc, (op, operand)| {
                format!("{acc} {op} {operand}")
            })
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn operator_chains_are_one_statement(chain in arb_chain()) {
        let program = compile(&chain).unwrap();
        prop_assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn parentheses_do_not_change_statement_count(chain in arb_chain()) {
        let program = compile(&format!("x = ({chain})\ny")).unwrap();
        prop_assert_eq!(program.body.len(), 2);
    }
}
