//! Tests for declaration hoisting.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use jsbox_ir::{DeclKind, FunctionKind, Node};
use pretty_assertions::assert_eq;

use crate::compile;

fn body(source: &str) -> Vec<Node> {
    compile(source).unwrap().body.to_vec()
}

fn hoisted_vars(nodes: &[Node]) -> Vec<String> {
    nodes
        .iter()
        .map_while(|node| match node {
            Node::Declare {
                kind: DeclKind::Var,
                name,
                value: None,
            } => Some(name.to_string()),
            _ => None,
        })
        .collect()
}

#[test]
fn vars_in_nested_blocks_are_declared_first() {
    let nodes = body("x = 1; if (a) { var x = 2 } else { for (var i = 0; i < 1; i++) { var y } }");
    assert_eq!(hoisted_vars(&nodes), vec!["x", "i", "y"]);
}

#[test]
fn vars_are_declared_once() {
    let nodes = body("var a = 1; var a = 2; try { var a } catch (e) { var b }");
    assert_eq!(hoisted_vars(&nodes), vec!["a", "b"]);
}

#[test]
fn for_in_var_binding_is_hoisted() {
    let nodes = body("for (var k in o) {}");
    assert_eq!(hoisted_vars(&nodes), vec!["k"]);
}

#[test]
fn let_and_const_stay_in_place() {
    let nodes = body("let a = 1; const b = 2;");
    assert!(hoisted_vars(&nodes).is_empty());
    assert_eq!(nodes.len(), 2);
}

#[test]
fn nested_function_vars_stay_inside() {
    let nodes = body("function f() { var inner = 1 } f()");
    assert!(hoisted_vars(&nodes).is_empty());
}

#[test]
fn function_declarations_move_after_vars() {
    let nodes = body("g(); var v = 1; function g() {}");
    assert_eq!(hoisted_vars(&nodes), vec!["v"]);
    let Node::Function(def) = &nodes[1] else {
        panic!("expected function declaration, got {:?}", nodes[1]);
    };
    assert_eq!(def.kind, FunctionKind::Declaration);
    assert_eq!(def.name.as_deref(), Some("g"));
    assert!(matches!(nodes[2], Node::Call { .. }));
}

#[test]
fn block_functions_move_to_block_front() {
    let nodes = body("{ h(); function h() {} }");
    let Node::Block(inner) = &nodes[0] else {
        panic!("expected block");
    };
    assert!(matches!(&inner[0], Node::Function(def) if def.name.as_deref() == Some("h")));
}
