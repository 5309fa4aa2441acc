//! Whole programs run through `execute` under the standard capabilities.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use jsbox_eval::{execute, Context, EvalError, EvalErrorKind, Execution, HostScope, Value};
use pretty_assertions::assert_eq;

fn run_with(source: &str, scopes: &[HostScope], context: &Context) -> Result<Execution, EvalError> {
    let program = jsbox_parse::compile(source).unwrap();
    execute(&program, scopes, context)
}

fn run(source: &str) -> Result<Execution, EvalError> {
    run_with(source, &[], &Context::standard())
}

fn value(source: &str) -> Value {
    run(source).unwrap().value
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(
        value("1+2*4/5-6+7/8 % 9+10-11-12/13*14"),
        Value::from(-16.448_076_923_076_925)
    );
}

#[test]
fn loop_then_return() {
    let run = run("let x; for(let i=0;i<2;i++){x=i}; return x;").unwrap();
    assert_eq!(run.value, Value::from(1.0));
    assert!(run.returned);
}

#[test]
fn function_constructor_sees_the_sandbox_global() {
    assert_eq!(
        value(r#"[].filter.constructor("return this.constructor.name")()"#),
        Value::from("SandboxGlobal")
    );
}

#[test]
fn optional_call_short_circuits_the_whole_chain() {
    assert_eq!(value("({}).c?.()() ? 1 : 2"), Value::from(2.0));
    assert_eq!(value("let o = null; o?.a.b.c"), Value::Undefined);
    assert_eq!(value("let o = {a: {b: 5}}; o?.a?.b"), Value::from(5.0));
}

#[test]
fn reference_error_on_deep_access_is_caught() {
    let run = run("try {a.x.a} catch {return 1}; return 2").unwrap();
    assert_eq!(run.value, Value::from(1.0));
    assert!(run.returned);
}

#[test]
fn prototype_writes_are_host_only() {
    let context = Context::standard();
    let err = run_with("[].constructor.prototype.flatMap = 1", &[], &context).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Capability);

    let array_prototype = &context.realm().intrinsics().array_prototype;
    array_prototype.set("flatMap", 1.0).unwrap();
    assert_eq!(
        run_with("typeof [].flatMap", &[], &context).unwrap().value,
        Value::from("number")
    );
}

#[test]
fn host_scopes_are_visible_as_bindings() {
    let context = Context::standard();
    let outer = HostScope::new().bind("greeting", "hello").bind("n", 2.0);
    let inner = HostScope::new().bind("n", 3.0);
    let run = run_with("greeting + ' ' + n", &[outer, inner], &context).unwrap();
    assert_eq!(run.value, Value::from("hello 3"));
    assert!(!run.returned);
}

#[test]
fn realistic_script_over_host_data() {
    let source = r#"
        // Totals per category, skipping empty rows.
        const rows = input.rows
        let totals = {}
        for (const row of rows) {
            if (!row.amount) continue
            totals[row.category] = (totals[row.category] ?? 0) + row.amount
        }

        function describe(name) {
            return `${name}: ${totals[name].toFixed(2)}`
        }

        const names = Object.keys(totals).filter(n => n !== '').sort()
        return names.map(describe).join("\n")
    "#;
    let context = Context::standard();
    let realm = context.realm();
    let row = |category: &str, amount: f64| {
        let obj = realm.new_object();
        obj.set("category", category).unwrap();
        obj.set("amount", amount).unwrap();
        Value::Object(obj)
    };
    let rows = realm.new_array(vec![
        row("tea", 2.5),
        row("cake", 4.0),
        row("tea", 1.25),
        row("cake", 0.0),
    ]);
    let input = realm.new_object();
    input.set("rows", rows).unwrap();

    let run = run_with(source, &[HostScope::new().bind("input", input)], &context).unwrap();
    assert_eq!(run.value, Value::from("cake: 4.00\ntea: 3.75"));
}

#[test]
fn closures_recursion_and_hoisting() {
    let source = "
        return fib(15);
        function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2) }
    ";
    assert_eq!(value(source), Value::from(610.0));
}

#[test]
fn var_is_function_scoped_and_let_is_not() {
    assert_eq!(value("{ var v = 1 } v"), Value::from(1.0));
    let err = run("{ let l = 1 } l").unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Reference);
}

#[test]
fn redeclaring_let_is_a_syntax_error() {
    let err = run("let a = 1; let a = 2").unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Syntax);
}

#[test]
fn top_level_let_and_var_cannot_share_a_name() {
    for (source, name) in [
        ("let a; var a;", "a"),
        ("var a; let a;", "a"),
        ("const a = 1; { var a = 2 }", "a"),
        ("{ var a } let a", "a"),
        ("function f() { let b; { var b } } f()", "b"),
    ] {
        let err = run(source).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::Syntax, "{source}");
        assert_eq!(err.message, format!("Identifier '{name}' has already been declared"));
    }
    assert_eq!(value("var a = 1; { let a = 2 } a"), Value::from(1.0));
}

#[test]
fn division_after_postfix_update() {
    assert_eq!(value("let i = 4; let x = i++ / 2; return x"), Value::from(2.0));
    assert_eq!(value("let i = 8; i-- / 2 / 1 + i"), Value::from(11.0));
}

#[test]
fn spread_and_templates() {
    assert_eq!(value("let a = [1, 2]; [...a, ...'xy'].join('')"), Value::from("12xy"));
    assert_eq!(value("let o = {...{a: 1}, b: 2}; o.a + o.b"), Value::from(3.0));
    assert_eq!(value("Math.max(...[4, 9, 2])"), Value::from(9.0));
    assert_eq!(value("let n = 3; `${n} * 2 = ${n * 2}`"), Value::from("3 * 2 = 6"));
}

#[test]
fn rest_parameters_collect_arguments() {
    assert_eq!(
        value("function f(first, ...others) { return others.length } f(1, 2, 3)"),
        Value::from(2.0)
    );
}

#[test]
fn for_in_and_for_of() {
    assert_eq!(
        value("let keys = ''; for (const k in {a: 1, b: 2}) keys += k; keys"),
        Value::from("ab")
    );
    assert_eq!(
        value("let sum = 0; for (const v of [1, 2, 3]) sum += v; sum"),
        Value::from(6.0)
    );
    let err = run("for (const v of 5) {}").unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Type);
}

#[test]
fn do_while_runs_at_least_once() {
    assert_eq!(value("let n = 0; do { n++ } while (false); n"), Value::from(1.0));
}

#[test]
fn logical_assignment_short_circuits() {
    assert_eq!(value("let a = 0; a ||= 5; a"), Value::from(5.0));
    assert_eq!(value("let a = 1; a &&= 7; a"), Value::from(7.0));
    assert_eq!(value("let a = null; a ??= 'd'; a"), Value::from("d"));
}

#[test]
fn uncaught_throw_reaches_the_host() {
    let err = run("throw new Error('boom')").unwrap_err();
    let EvalErrorKind::Thrown(Value::Object(error)) = &err.kind else {
        panic!("expected a thrown error object, got {err:?}");
    };
    assert_eq!(error.get("message"), Value::from("boom"));
    assert_eq!(err.to_string(), "Uncaught Error: boom");
}

#[test]
fn delete_removes_own_properties() {
    assert_eq!(
        value("let o = {a: 1, b: 2}; delete o.a; Object.keys(o).join()"),
        Value::from("b")
    );
}

#[test]
fn equality_and_typeof() {
    assert_eq!(value("1 == '1'"), Value::from(true));
    assert_eq!(value("1 === '1'"), Value::from(false));
    assert_eq!(value("null == undefined"), Value::from(true));
    assert_eq!(value("typeof null + typeof (() => 1)"), Value::from("objectfunction"));
    assert_eq!(value("'b' in {b: 1}"), Value::from(true));
}

#[test]
fn compiled_program_is_reusable() {
    let program = jsbox_parse::compile("let total = base * 2; total").unwrap();
    let context = Context::standard();
    for base in [1.0, 5.0] {
        let run = execute(&program, &[HostScope::new().bind("base", base)], &context).unwrap();
        assert_eq!(run.value, Value::from(base * 2.0));
    }
}
