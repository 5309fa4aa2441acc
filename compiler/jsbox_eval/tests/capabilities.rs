//! Capability policies as a host configures them: whitelists, quotas,
//! observers and audit reports.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::cell::RefCell;
use std::rc::Rc;

use jsbox_eval::{
    execute, ArrayChange, CapabilitiesBuilder, Change, Context, EvalError, EvalErrorKind,
    Execution, HostScope, Realm, Value,
};
use pretty_assertions::assert_eq;

fn context_with(policy: impl FnOnce(&Realm) -> CapabilitiesBuilder) -> Context {
    let realm = Rc::new(Realm::new());
    let caps = policy(&realm).build();
    Context::new(realm, caps)
}

fn run_with(source: &str, scopes: &[HostScope], context: &Context) -> Result<Execution, EvalError> {
    let program = jsbox_parse::compile(source).unwrap();
    execute(&program, scopes, context)
}

fn run(source: &str, context: &Context) -> Result<Execution, EvalError> {
    run_with(source, &[], context)
}

#[test]
fn narrowed_prototype_exposes_only_listed_members() {
    let context = context_with(|realm| {
        CapabilitiesBuilder::standard(realm)
            .allow_prototype_members(&realm.intrinsics().array_prototype, ["map", "join"])
    });
    let run_ok = run("[1, 2].map(x => x * 3).join('/')", &context).unwrap();
    assert_eq!(run_ok.value, Value::from("3/6"));

    let err = run("[].flatMap(x => x)", &context).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Capability);
    assert_eq!(
        err.message,
        "Method or property access not permitted: Array.flatMap"
    );
}

#[test]
fn denied_prototype_is_unreachable_from_every_value() {
    let context = context_with(|realm| {
        CapabilitiesBuilder::standard(realm).deny_prototype(&realm.intrinsics().number_prototype)
    });
    let err = run("(5).toFixed(1)", &context).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Capability);
    assert_eq!(run("5 + 1", &context).unwrap().value, Value::from(6.0));
}

#[test]
fn only_listed_globals_are_in_scope() {
    let context = context_with(|_| CapabilitiesBuilder::new().global("limit", Value::from(10.0)));
    assert_eq!(run("limit * 2", &context).unwrap().value, Value::from(20.0));
    let err = run("Math.abs(-1)", &context).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Reference);
}

#[test]
fn replaced_values_are_what_the_sandbox_reads() {
    let realm = Rc::new(Realm::new());
    let secret = realm.new_object();
    secret.set("token", "hunter2").unwrap();
    let holder = realm.new_object();
    holder.set("inner", secret.clone()).unwrap();

    let caps = CapabilitiesBuilder::standard(&realm)
        .replace(&secret, Value::from("redacted"))
        .build();
    let context = Context::new(realm, caps);
    let scopes = [HostScope::new().bind("holder", holder)];
    let run = run_with("holder.inner", &scopes, &context).unwrap();
    assert_eq!(run.value, Value::from("redacted"));
}

#[test]
fn infinite_loop_stops_at_the_quota() {
    let context = context_with(|realm| CapabilitiesBuilder::standard(realm).execution_quota(50));
    let err = run("while (true) {}", &context).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::QuotaExceeded { ticks: 51 });
    assert_eq!(context.caps().ticks(), 51);
}

#[test]
fn quota_hook_lets_long_runs_finish() {
    let extensions = Rc::new(RefCell::new(0_u32));
    let counter = Rc::clone(&extensions);
    let context = context_with(move |realm| {
        CapabilitiesBuilder::standard(realm)
            .execution_quota(10)
            .on_quota_reached(move |_| {
                *counter.borrow_mut() += 1;
                true
            })
    });
    let run = run("let s = 0; for (let i = 0; i < 100; i++) s += i; s", &context).unwrap();
    assert_eq!(run.value, Value::from(4950.0));
    assert!(*extensions.borrow() > 0);
}

#[test]
fn quota_is_counted_per_run() {
    let context = context_with(|realm| CapabilitiesBuilder::standard(realm).execution_quota(500));
    for _ in 0..3 {
        let run = run("let s = 0; for (let i = 0; i < 10; i++) s += i; s", &context).unwrap();
        assert_eq!(run.value, Value::from(45.0));
    }
}

#[test]
fn change_subscribers_see_key_level_writes() {
    let context = Context::standard();
    let data = context.realm().new_object();
    data.set("a", 1.0).unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let subscription = context
        .caps()
        .subscribe_change(&data, move |change| sink.borrow_mut().push(change.clone()));

    let scopes = [HostScope::new().bind("data", data.clone())];
    run_with("data.a = 2; data.b = 3; delete data.a", &scopes, &context).unwrap();
    assert_eq!(
        *log.borrow(),
        [
            Change::Replace("a".into()),
            Change::Create("b".into()),
            Change::Delete("a".into()),
        ]
    );
    assert_eq!(data.get("b"), Value::from(3.0));

    subscription.unsubscribe();
    run_with("data.c = 1", &scopes, &context).unwrap();
    assert_eq!(log.borrow().len(), 3);
}

#[test]
fn set_subscribers_only_hear_their_key() {
    let context = Context::standard();
    let data = context.realm().new_object();
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let _subscription = context
        .caps()
        .subscribe_set(&data, "a", move |change| sink.borrow_mut().push(change.clone()));

    let scopes = [HostScope::new().bind("data", data)];
    run_with("data.b = 1; data.a = 1; data.a = 2", &scopes, &context).unwrap();
    assert_eq!(
        *log.borrow(),
        [Change::Create("a".into()), Change::Replace("a".into())]
    );
}

#[test]
fn array_methods_report_what_they_change() {
    let context = Context::standard();
    let list = context.realm().new_array(vec![Value::from(1.0)]);
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let _subscription = context
        .caps()
        .subscribe_change(&list, move |change| sink.borrow_mut().push(change.clone()));

    let scopes = [HostScope::new().bind("list", list)];
    let run = run_with("list.push(2, 3); list.pop(); list.length", &scopes, &context).unwrap();
    assert_eq!(run.value, Value::from(2.0));
    assert_eq!(
        *log.borrow(),
        [
            Change::Array(ArrayChange {
                method: "push",
                start: 1,
                end: 3,
                added: vec![Value::from(2.0), Value::from(3.0)],
                removed: Vec::new(),
            }),
            Change::Array(ArrayChange {
                method: "pop",
                start: 2,
                end: 3,
                added: Vec::new(),
                removed: vec![Value::from(3.0)],
            }),
        ]
    );
}

#[test]
fn get_subscribers_see_reads_in_order() {
    let context = Context::standard();
    let data = context.realm().new_object();
    data.set("a", 2.0).unwrap();
    data.set("b", 5.0).unwrap();

    let keys = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&keys);
    let watched = data.clone();
    let subscription = context.caps().subscribe_get(move |object, key| {
        if *object == watched {
            sink.borrow_mut().push(key.to_string());
        }
    });

    let scopes = [HostScope::new().bind("data", data)];
    let run = run_with("data.b - data.a * data.a", &scopes, &context).unwrap();
    assert_eq!(run.value, Value::from(1.0));
    assert_eq!(*keys.borrow(), ["b", "a", "a"]);

    subscription.unsubscribe();
    run_with("data.a", &scopes, &context).unwrap();
    assert_eq!(keys.borrow().len(), 3);
}

#[test]
fn audit_lists_globals_and_prototype_members() {
    let context = context_with(|realm| CapabilitiesBuilder::standard(realm).audit(true));
    let run = run("Math.max([1].map(x => x)[0], 2)", &context).unwrap();
    assert_eq!(run.value, Value::from(2.0));

    let report = run.audit.unwrap();
    assert_eq!(report.globals.iter().map(String::as_str).collect::<Vec<_>>(), ["Math"]);
    assert!(report.prototypes["Array"].contains("map"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["globals"], serde_json::json!(["Math"]));
    assert!(json["prototypes"]["Array"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("map")));
}

#[test]
fn audit_is_absent_unless_enabled() {
    let context = Context::standard();
    assert_eq!(run("Math.abs(-1)", &context).unwrap().audit, None);
}

#[test]
fn audit_report_resets_between_runs() {
    let context = context_with(|realm| CapabilitiesBuilder::standard(realm).audit(true));
    run("JSON.stringify(1)", &context).unwrap();
    let second = run("Math.abs(-1)", &context).unwrap().audit.unwrap();
    assert!(!second.globals.contains("JSON"));
    assert!(second.globals.contains("Math"));
}

#[test]
fn repeated_runs_are_deterministic() {
    let source = "
        const words = ['delta', 'alpha', 'charlie', 'bravo'];
        const index = {};
        for (const w of words) index[w[0]] = w.length;
        JSON.stringify(index) + ' ' + words.slice().sort().join()
    ";
    let context = Context::standard();
    let first = run(source, &context).unwrap();
    let second = run(source, &context).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.value,
        Value::from(r#"{"d":5,"a":5,"c":7,"b":5} alpha,bravo,charlie,delta"#)
    );
}
