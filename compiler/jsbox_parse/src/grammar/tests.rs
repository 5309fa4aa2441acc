//! Tests for tree building.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::rc::Rc;

use jsbox_ir::{
    DeclKind, FunctionBody, FunctionKind, Literal, LogicalOp, LoopAction, LoopBinding,
    LoopIteration, Node, ObjectEntry, ObjectKey, Opcode,
};
use pretty_assertions::assert_eq;

use crate::{compile, compile_with, parse_deferred, ParseError, ParseOptions};

fn parse(source: &str) -> Vec<Node> {
    compile(source).unwrap().body.to_vec()
}

/// The single statement of `source`.
fn single(source: &str) -> Node {
    let mut nodes = parse(source);
    assert_eq!(nodes.len(), 1, "expected one statement in {source:?}: {nodes:?}");
    nodes.remove(0)
}

fn binary(op: Opcode, left: Node, right: Node) -> Node {
    Node::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn member(object: Node, name: &str, optional: bool) -> Node {
    Node::Member {
        object: Box::new(object),
        property: Box::new(Node::Str(name.into())),
        optional,
    }
}

fn num(value: f64) -> Node {
    Node::number(value)
}

fn id(name: &str) -> Node {
    Node::ident(name)
}

fn parsed_body(node: &Node) -> Rc<[Node]> {
    let Node::Function(def) = node else {
        panic!("expected function, got {node:?}");
    };
    def.body.parsed().unwrap()
}

// Operators

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(
        single("1 + 2 * 3"),
        binary(Opcode::Add, num(1.0), binary(Opcode::Mul, num(2.0), num(3.0)))
    );
}

#[test]
fn same_precedence_folds_left() {
    assert_eq!(
        single("a - b - c"),
        binary(Opcode::Sub, binary(Opcode::Sub, id("a"), id("b")), id("c"))
    );
}

#[test]
fn exponent_is_right_associative() {
    assert_eq!(
        single("2 ** 3 ** 2"),
        binary(Opcode::Exp, num(2.0), binary(Opcode::Exp, num(3.0), num(2.0)))
    );
}

#[test]
fn and_binds_tighter_than_or() {
    assert_eq!(
        single("a || b && c"),
        Node::Logical {
            op: LogicalOp::Or,
            left: Box::new(id("a")),
            right: Box::new(Node::Logical {
                op: LogicalOp::And,
                left: Box::new(id("b")),
                right: Box::new(id("c")),
            }),
        }
    );
}

#[test]
fn conditionals_nest_to_the_right() {
    assert_eq!(
        single("a ? b : c ? d : e"),
        Node::Conditional {
            test: Box::new(id("a")),
            consequent: Box::new(id("b")),
            alternate: Box::new(Node::Conditional {
                test: Box::new(id("c")),
                consequent: Box::new(id("d")),
                alternate: Box::new(id("e")),
            }),
        }
    );
}

#[test]
fn typeof_applies_before_comparison() {
    assert_eq!(
        single("typeof x === 'undefined'"),
        binary(
            Opcode::StrictEq,
            Node::Unary {
                op: Opcode::Typeof,
                operand: Box::new(id("x")),
            },
            Node::Str("undefined".into()),
        )
    );
}

#[test]
fn compound_assignment_targets_member() {
    assert_eq!(
        single("a.b += 1"),
        Node::Assign {
            op: Opcode::AddAssign,
            target: Box::new(member(id("a"), "b", false)),
            value: Box::new(num(1.0)),
        }
    );
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(
        single("a = b = 1"),
        Node::Assign {
            op: Opcode::Assign,
            target: Box::new(id("a")),
            value: Box::new(Node::Assign {
                op: Opcode::Assign,
                target: Box::new(id("b")),
                value: Box::new(num(1.0)),
            }),
        }
    );
}

#[test]
fn logical_assignment() {
    assert_eq!(
        single("a ??= 2"),
        Node::LogicalAssign {
            op: LogicalOp::Nullish,
            target: Box::new(id("a")),
            value: Box::new(num(2.0)),
        }
    );
}

#[test]
fn comma_builds_sequence() {
    assert_eq!(
        single("a, b"),
        Node::Sequence(vec![id("a"), id("b")])
    );
}

// Member access and calls

#[test]
fn optional_chain_marks_only_the_optional_link() {
    assert_eq!(
        single("a?.b.c"),
        member(member(id("a"), "b", true), "c", false)
    );
}

#[test]
fn optional_call() {
    assert_eq!(
        single("a?.()"),
        Node::Call {
            callee: Box::new(id("a")),
            args: Vec::new(),
            optional: true,
        }
    );
}

#[test]
fn computed_member_and_spread_arguments() {
    assert_eq!(
        single("f(o[k], ...rest,)"),
        Node::Call {
            callee: Box::new(id("f")),
            args: vec![
                Node::Member {
                    object: Box::new(id("o")),
                    property: Box::new(id("k")),
                    optional: false,
                },
                Node::Spread(Box::new(id("rest"))),
            ],
            optional: false,
        }
    );
}

#[test]
fn new_with_arguments_then_member() {
    assert_eq!(
        single("new Foo(1).bar"),
        member(
            Node::New {
                callee: Box::new(id("Foo")),
                args: vec![num(1.0)],
            },
            "bar",
            false,
        )
    );
}

#[test]
fn new_without_arguments() {
    assert_eq!(
        single("new a.B"),
        Node::New {
            callee: Box::new(member(id("a"), "B", false)),
            args: Vec::new(),
        }
    );
}

#[test]
fn keywords_are_valid_property_names() {
    assert_eq!(single("a.default"), member(id("a"), "default", false));
}

#[test]
fn postfix_and_prefix_updates() {
    assert_eq!(
        parse("a++; --b"),
        vec![
            Node::Update {
                op: Opcode::PostInc,
                target: Box::new(id("a")),
            },
            Node::Update {
                op: Opcode::PreDec,
                target: Box::new(id("b")),
            },
        ]
    );
}

// Literals

#[test]
fn array_holes_and_trailing_comma() {
    assert_eq!(
        single("[1, , 2]"),
        Node::Array(vec![num(1.0), Node::Literal(Literal::Undefined), num(2.0)])
    );
    assert_eq!(single("[1, ]"), Node::Array(vec![num(1.0)]));
}

#[test]
fn object_literal_entries() {
    let Node::Object(entries) = single("({a, b: 1, [k]: 2, ...o, 'q': 3})") else {
        panic!("expected object");
    };
    assert_eq!(
        entries,
        vec![
            ObjectEntry::Property(ObjectKey::Static("a".into()), id("a")),
            ObjectEntry::Property(ObjectKey::Static("b".into()), num(1.0)),
            ObjectEntry::Property(ObjectKey::Computed(id("k")), num(2.0)),
            ObjectEntry::Spread(id("o")),
            ObjectEntry::Property(ObjectKey::Static("q".into()), num(3.0)),
        ]
    );
}

#[test]
fn object_methods_are_named_functions() {
    let Node::Object(entries) = single("({ m(x) { return x }, async n() {} })") else {
        panic!("expected object");
    };
    let ObjectEntry::Property(ObjectKey::Static(key), Node::Function(def)) = &entries[0] else {
        panic!("expected method");
    };
    assert_eq!(&**key, "m");
    assert_eq!(def.name.as_deref(), Some("m"));
    assert_eq!(def.params.len(), 1);
    let ObjectEntry::Property(_, Node::Function(def)) = &entries[1] else {
        panic!("expected async method");
    };
    assert!(def.is_async);
}

#[test]
fn template_literal_parts() {
    assert_eq!(
        single("`a${b + 1}c`"),
        Node::Template {
            quasis: vec![Rc::from("a"), Rc::from("c")].into(),
            parts: vec![binary(Opcode::Add, id("b"), num(1.0))],
        }
    );
}

#[test]
fn regex_literal_method_call() {
    let Node::Call { callee, .. } = single("/ab+/g.test(s)") else {
        panic!("expected call");
    };
    let Node::Member { object, .. } = *callee else {
        panic!("expected member");
    };
    let Node::Regex(regex) = *object else {
        panic!("expected regex");
    };
    assert_eq!(&*regex.pattern, "ab+");
    assert_eq!(&*regex.flags, "g");
}

// Functions

#[test]
fn arrow_with_expression_body_returns_it() {
    let node = single("(a, b) => a + b");
    let Node::Function(def) = &node else {
        panic!("expected arrow");
    };
    assert_eq!(def.kind, FunctionKind::Arrow);
    assert_eq!(def.params.len(), 2);
    assert_eq!(
        &*parsed_body(&node),
        &[Node::Return(Some(Box::new(binary(Opcode::Add, id("a"), id("b")))))]
    );
}

#[test]
fn async_arrow_and_rest_parameter() {
    let node = single("async (first, ...others) => { await first }");
    let Node::Function(def) = &node else {
        panic!("expected arrow");
    };
    assert!(def.is_async);
    assert!(def.params[1].rest);
    assert_eq!(
        &*parsed_body(&node),
        &[Node::Await(Box::new(id("first")))]
    );
}

#[test]
fn arrow_named_async_parameter() {
    let Node::Function(def) = single("async => 1") else {
        panic!("expected arrow");
    };
    assert!(!def.is_async);
    assert_eq!(&*def.params[0].name, "async");
}

#[test]
fn call_named_async_is_not_an_arrow() {
    assert!(matches!(single("async(x)"), Node::Call { .. }));
}

#[test]
fn function_expression_can_be_called() {
    let Node::Call { callee, .. } = single("(function f() { return 1 })()") else {
        panic!("expected call");
    };
    assert!(matches!(*callee, Node::Function(ref def) if def.kind == FunctionKind::Expression));
}

#[test]
fn lazy_functions_defer_their_bodies() {
    let program = compile_with(
        "function f() { return 1 + 1 }",
        ParseOptions::default().lazy_functions(true),
    )
    .unwrap();
    let Node::Function(def) = &program.body[0] else {
        panic!("expected function");
    };
    let FunctionBody::Deferred(deferred) = &def.body else {
        panic!("expected deferred body");
    };
    assert!(!deferred.is_parsed());
    let body = deferred.get_or_parse(parse_deferred).unwrap();
    assert_eq!(
        &*body,
        &[Node::Return(Some(Box::new(binary(Opcode::Add, num(1.0), num(1.0)))))]
    );
    assert!(deferred.is_parsed());
}

#[test]
fn lazy_arrow_keeps_expression_flag() {
    let program = compile_with("x => x * 2", ParseOptions::default().lazy_functions(true)).unwrap();
    let Node::Function(def) = &program.body[0] else {
        panic!("expected arrow");
    };
    let FunctionBody::Deferred(deferred) = &def.body else {
        panic!("expected deferred body");
    };
    assert!(deferred.expression);
    assert_eq!(deferred.code.as_str(), "x * 2");
}

// Statements and line breaks

#[test]
fn line_breaks_separate_declarations() {
    assert_eq!(
        parse("let a = 1\nconst b = a"),
        vec![
            Node::Declare {
                kind: DeclKind::Let,
                name: "a".into(),
                value: Some(Box::new(num(1.0))),
            },
            Node::Declare {
                kind: DeclKind::Const,
                name: "b".into(),
                value: Some(Box::new(id("a"))),
            },
        ]
    );
}

#[test]
fn return_before_line_break_returns_nothing() {
    assert_eq!(parse("return\n1"), vec![Node::Return(None), num(1.0)]);
}

#[test]
fn increment_after_line_break_starts_new_statement() {
    assert_eq!(
        parse("a\n++b"),
        vec![
            id("a"),
            Node::Update {
                op: Opcode::PreInc,
                target: Box::new(id("b")),
            },
        ]
    );
}

#[test]
fn parenthesis_after_line_break_continues_call() {
    assert!(matches!(single("a\n(b)"), Node::Call { .. }));
}

#[test]
fn if_else_without_braces() {
    assert_eq!(
        single("if (a) b\nelse c"),
        Node::If {
            test: Box::new(id("a")),
            consequent: Box::new(id("b")),
            alternate: Some(Box::new(id("c"))),
        }
    );
}

#[test]
fn counted_for_loop() {
    let Node::Loop(node) = single("for (let i = 0; i < 2; i++) { x = i }") else {
        panic!("expected loop");
    };
    assert_eq!(node.iteration, LoopIteration::Counted);
    assert_eq!(
        node.init,
        vec![Node::Declare {
            kind: DeclKind::Let,
            name: "i".into(),
            value: Some(Box::new(num(0.0))),
        }]
    );
    assert_eq!(
        node.condition,
        Some(binary(Opcode::Lt, id("i"), num(2.0)))
    );
    assert_eq!(
        node.step,
        Some(Node::Update {
            op: Opcode::PostInc,
            target: Box::new(id("i")),
        })
    );
    assert_eq!(node.body.len(), 1);
}

#[test]
fn for_of_binds_each_value() {
    let Node::Loop(node) = single("for (const x of xs) {}") else {
        panic!("expected loop");
    };
    assert_eq!(node.iteration, LoopIteration::ForOf);
    assert_eq!(
        node.binding,
        Some(LoopBinding {
            kind: Some(DeclKind::Const),
            name: "x".into(),
        })
    );
    assert_eq!(node.iterable, Some(id("xs")));
}

#[test]
fn do_while_checks_after_body() {
    let Node::Loop(node) = single("do { a() } while (b)") else {
        panic!("expected loop");
    };
    assert!(!node.check_first);
    assert_eq!(node.condition, Some(id("b")));
}

#[test]
fn labeled_loop_with_labeled_break() {
    let Node::Loop(node) = single("outer: while (true) { break outer }") else {
        panic!("expected loop");
    };
    assert_eq!(node.label.as_deref(), Some("outer"));
    assert_eq!(
        node.body,
        vec![Node::LoopAction {
            action: LoopAction::Break,
            label: Some("outer".into()),
        }]
    );
}

#[test]
fn switch_cases_and_default() {
    let Node::Switch(switch) = single("switch (x) { case 1: a; break; default: b }") else {
        panic!("expected switch");
    };
    assert_eq!(switch.cases.len(), 2);
    assert_eq!(switch.cases[0].test, Some(num(1.0)));
    assert_eq!(
        switch.cases[0].body,
        vec![
            id("a"),
            Node::LoopAction {
                action: LoopAction::Break,
                label: None,
            },
        ]
    );
    assert_eq!(switch.cases[1].test, None);
    assert_eq!(switch.cases[1].body, vec![id("b")]);
}

#[test]
fn catch_binding_is_optional() {
    let Node::Try(node) = single("try { a } catch { b }") else {
        panic!("expected try");
    };
    assert_eq!(node.param, None);
    assert_eq!(node.handler, Some(vec![id("b")]));
    assert_eq!(node.finalizer, None);
}

#[test]
fn try_finally_with_catch_param() {
    let Node::Try(node) = single("try { a } catch (e) { b } finally { c }") else {
        panic!("expected try");
    };
    assert_eq!(node.param.as_deref(), Some("e"));
    assert_eq!(node.finalizer, Some(vec![id("c")]));
}

// Errors

#[test]
fn missing_operand_is_unexpected_end() {
    assert_eq!(compile("a +").unwrap_err(), ParseError::UnexpectedEnd);
}

#[test]
fn adjacent_identifiers_are_rejected() {
    assert!(matches!(
        compile("a b").unwrap_err(),
        ParseError::UnexpectedToken { ch: 'b', .. }
    ));
}

#[test]
fn const_requires_initializer() {
    assert!(matches!(
        compile("const a").unwrap_err(),
        ParseError::Invalid {
            construct: "declaration",
            ..
        }
    ));
}

#[test]
fn invalid_assignment_target() {
    assert!(matches!(
        compile("1 = 2").unwrap_err(),
        ParseError::Invalid {
            construct: "assignment",
            ..
        }
    ));
}

#[test]
fn default_parameters_are_unsupported() {
    assert!(matches!(
        compile("function f(a = 1) {}").unwrap_err(),
        ParseError::Invalid {
            construct: "parameter",
            ..
        }
    ));
}

#[test]
fn tagged_templates_are_unsupported() {
    assert!(matches!(
        compile("tag`x`").unwrap_err(),
        ParseError::Invalid {
            construct: "template",
            ..
        }
    ));
}

#[test]
fn reserved_words_are_not_identifiers() {
    assert!(compile("let class = 1").is_err());
}
