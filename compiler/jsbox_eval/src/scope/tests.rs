#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use crate::errors::EvalErrorKind;
use crate::value::ObjectKind;
use pretty_assertions::assert_eq;

fn root() -> (Obj, Scope) {
    let global = Obj::with_kind(ObjectKind::Global, None);
    let scope = Scope::root(&global, ["Math".into()]);
    (global, scope)
}

#[test]
fn var_hoists_to_function_scope() {
    let (_, root) = root();
    let function = root.function_child(None);
    let block = function.child().child();
    block.declare("x", DeclKind::Var, Some(Value::from(1.0))).unwrap();
    assert_eq!(function.read("x"), Some(Value::from(1.0)));
    assert_eq!(block.read("x"), None);
}

#[test]
fn var_redeclaration_keeps_value_without_initializer() {
    let (_, root) = root();
    root.declare("x", DeclKind::Var, Some(Value::from(1.0))).unwrap();
    root.declare("x", DeclKind::Var, None).unwrap();
    assert_eq!(root.read("x"), Some(Value::from(1.0)));
}

#[test]
fn let_redeclaration_is_rejected() {
    let (_, root) = root();
    let block = root.child();
    block.declare("a", DeclKind::Let, None).unwrap();
    let err = block.declare("a", DeclKind::Const, None).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Syntax);
    // Shadowing in a nested block is fine.
    block.child().declare("a", DeclKind::Let, None).unwrap();
}

#[test]
fn const_cannot_be_set() {
    let (_, root) = root();
    root.declare("k", DeclKind::Const, Some(Value::from(1.0))).unwrap();
    let err = root.child().set("k", Value::from(2.0)).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Type);
    assert!(root.get("k").flags().contains(PropFlags::CONST));
}

#[test]
fn globals_resolve_to_the_global_object() {
    let (global, root) = root();
    match root.child().get("Math") {
        Prop::Member { object, key, flags } => {
            assert_eq!(object, Value::Object(global));
            assert_eq!(&*key, "Math");
            assert!(flags.contains(PropFlags::GLOBAL));
        }
        other => panic!("expected a global member, got {other:?}"),
    }
    assert!(root.set("Math", Value::Null).unwrap_err().is_capability());
}

#[test]
fn let_overrides_a_global_name() {
    let (_, root) = root();
    root.declare("Math", DeclKind::Let, Some(Value::from(1.0))).unwrap();
    assert!(matches!(root.get("Math"), Prop::Binding { .. }));
}

#[test]
fn unknown_names_are_unresolved() {
    let (_, root) = root();
    assert!(matches!(root.get("nope"), Prop::Unresolved(_)));
    assert_eq!(root.set("nope", Value::Null).unwrap_err().kind, EvalErrorKind::Reference);
}

#[test]
fn arrows_see_the_enclosing_this() {
    let (global, root) = root();
    let method = root.function_child(Some(Value::from("receiver")));
    let arrow = method.function_child(None);
    assert_eq!(arrow.this_value(), Value::from("receiver"));
    assert_eq!(root.child().this_value(), Value::Object(global));
}

#[test]
fn forked_scope_has_independent_bindings() {
    let (_, root) = root();
    let first = root.child();
    first.declare("i", DeclKind::Let, Some(Value::from(0.0))).unwrap();
    let second = first.fork();
    second.set("i", Value::from(1.0)).unwrap();
    assert_eq!(first.read("i"), Some(Value::from(0.0)));
    assert_eq!(second.read("i"), Some(Value::from(1.0)));
}

#[test]
fn var_cannot_hoist_over_a_lexical_binding() {
    let (_, root) = root();
    let program = root.program_child();
    program.declare("a", DeclKind::Let, None).unwrap();
    let err = program.child().declare("a", DeclKind::Var, None).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Syntax);
    assert_eq!(root.read("a"), None);

    program.declare("b", DeclKind::Var, None).unwrap();
    assert_eq!(root.read("b"), Some(Value::Undefined));
    let err = program.declare("b", DeclKind::Const, None).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Syntax);
    // Only the program level checks the hoisted vars.
    program.child().declare("b", DeclKind::Let, None).unwrap();
}
