//! Declaration hoisting.
//!
//! `var` bindings anywhere in a function body (outside nested functions)
//! are declared up front without a value, and function declarations move
//! ahead of the remaining statements so they can be called before the
//! line that defines them. `let`, `const` and assignments stay in place.

use std::rc::Rc;

use jsbox_ir::{DeclKind, FunctionKind, LoopNode, Node};
use rustc_hash::FxHashSet;

/// Hoist the `var` names and function declarations of a function body.
pub(crate) fn hoist(body: Vec<Node>) -> Vec<Node> {
    let mut names = Vec::new();
    let mut seen = FxHashSet::default();
    for node in &body {
        collect_vars(node, &mut names, &mut seen);
    }
    let body = hoist_functions(body);
    if names.is_empty() {
        return body;
    }
    tracing::trace!(count = names.len(), "hoisted var bindings");

    let mut out = Vec::with_capacity(names.len() + body.len());
    out.extend(names.into_iter().map(|name| Node::Declare {
        kind: DeclKind::Var,
        name,
        value: None,
    }));
    out.extend(body);
    out
}

/// Move function declarations to the front, keeping their relative order.
pub(crate) fn hoist_functions(body: Vec<Node>) -> Vec<Node> {
    if !body.iter().any(is_declaration) {
        return body;
    }
    let (mut functions, rest): (Vec<Node>, Vec<Node>) = body.into_iter().partition(is_declaration);
    functions.extend(rest);
    functions
}

fn is_declaration(node: &Node) -> bool {
    matches!(node, Node::Function(def) if def.kind == FunctionKind::Declaration)
}

fn collect_vars(node: &Node, names: &mut Vec<Rc<str>>, seen: &mut FxHashSet<Rc<str>>) {
    match node {
        Node::Declare {
            kind: DeclKind::Var,
            name,
            ..
        } => add(name, names, seen),
        Node::If {
            consequent,
            alternate,
            ..
        } => {
            collect_vars(consequent, names, seen);
            if let Some(alternate) = alternate {
                collect_vars(alternate, names, seen);
            }
        }
        Node::Block(body) => collect_all(body, names, seen),
        Node::Loop(node) => collect_loop(node, names, seen),
        Node::Switch(switch) => {
            for case in &switch.cases {
                collect_all(&case.body, names, seen);
            }
        }
        Node::Try(node) => {
            collect_all(&node.block, names, seen);
            if let Some(handler) = &node.handler {
                collect_all(handler, names, seen);
            }
            if let Some(finalizer) = &node.finalizer {
                collect_all(finalizer, names, seen);
            }
        }
        _ => {}
    }
}

fn collect_loop(node: &LoopNode, names: &mut Vec<Rc<str>>, seen: &mut FxHashSet<Rc<str>>) {
    if let Some(binding) = &node.binding {
        if binding.kind == Some(DeclKind::Var) {
            add(&binding.name, names, seen);
        }
    }
    collect_all(&node.init, names, seen);
    collect_all(&node.body, names, seen);
}

fn add(name: &Rc<str>, names: &mut Vec<Rc<str>>, seen: &mut FxHashSet<Rc<str>>) {
    if seen.insert(Rc::clone(name)) {
        names.push(Rc::clone(name));
    }
}

fn collect_all(body: &[Node], names: &mut Vec<Rc<str>>, seen: &mut FxHashSet<Rc<str>>) {
    for node in body {
        collect_vars(node, names, seen);
    }
}

#[cfg(test)]
mod tests;
