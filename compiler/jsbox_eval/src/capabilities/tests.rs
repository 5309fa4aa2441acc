#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::errors::EvalErrorKind;
use crate::value::ObjectKind;
use pretty_assertions::assert_eq;

fn object() -> Obj {
    Obj::with_kind(ObjectKind::Ordinary, None)
}

#[test]
fn empty_member_set_is_unrestricted() {
    let open = object();
    let narrow = object();
    let caps = Capabilities::builder()
        .allow_prototype(&open)
        .allow_prototype_members(&narrow, ["map", "filter"])
        .build();
    assert!(caps.prototype_allows(&open, "anything"));
    assert!(caps.prototype_allows(&narrow, "map"));
    assert!(!caps.prototype_allows(&narrow, "flatMap"));
    assert!(!caps.prototype_allows(&object(), "map"));
}

#[test]
fn quota_counts_ticks() {
    let caps = Capabilities::builder().execution_quota(3).build();
    for _ in 0..3 {
        assert_eq!(caps.tick(), Ok(()));
    }
    let err = caps.tick().unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::QuotaExceeded { ticks: 4 });
    caps.begin_run();
    assert_eq!(caps.ticks(), 0);
}

#[test]
fn quota_hook_can_grant_a_reprieve() {
    let asked = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&asked);
    let caps = Capabilities::builder()
        .execution_quota(2)
        .on_quota_reached(move |ticks| {
            seen.borrow_mut().push(ticks);
            ticks < 5
        })
        .build();
    let results: Vec<bool> = (0..6).map(|_| caps.tick().is_ok()).collect();
    // The reprieve at tick 3 restarts the count; the hook declines at 6.
    assert_eq!(results, [true, true, true, true, true, false]);
    assert_eq!(*asked.borrow(), [3, 6]);
}

#[test]
fn replacement_values_count_as_globals() {
    let original = object();
    let stand_in = object();
    let caps = Capabilities::builder()
        .replace(&original, Value::Object(stand_in.clone()))
        .build();
    assert_eq!(
        caps.replacement(&Value::Object(original)),
        Some(Value::Object(stand_in.clone()))
    );
    assert!(caps.is_global_object(&stand_in));
    assert_eq!(caps.replacement(&Value::Null), None);
}

#[test]
fn set_subscribers_filter_by_key() {
    let target = object();
    let caps = Capabilities::builder().build();
    let log = Rc::new(RefCell::new(Vec::new()));
    let key_log = Rc::clone(&log);
    let sub = caps.subscribe_set(&target, "a", move |change| {
        key_log.borrow_mut().push(change.clone());
    });
    caps.fire_set(&target, &Change::Create("a".into()));
    caps.fire_set(&target, &Change::Create("b".into()));
    caps.fire_set(&object(), &Change::Create("a".into()));
    assert_eq!(*log.borrow(), [Change::Create("a".into())]);

    sub.unsubscribe();
    caps.fire_set(&target, &Change::Delete("a".into()));
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn change_subscribers_see_everything() {
    let target = object();
    let caps = Capabilities::builder().build();
    assert!(!caps.has_change_subscribers(&target));
    let count = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&count);
    let _sub = caps.subscribe_change(&target, move |_| *counter.borrow_mut() += 1);
    assert!(caps.has_change_subscribers(&target));
    caps.fire_set(&target, &Change::Replace("x".into()));
    caps.fire_set(&target, &Change::Delete("y".into()));
    assert_eq!(*count.borrow(), 2);
}

#[test]
fn audit_records_only_when_enabled() {
    let quiet = Capabilities::builder().build();
    quiet.record_global("Math");
    assert_eq!(quiet.audit_report(), AuditReport::default());

    let audited = Capabilities::builder().audit(true).build();
    audited.record_global("Math");
    audited.record_prototype("Array", "map");
    audited.record_prototype("Array", "filter");
    let report = audited.audit_report();
    assert!(report.globals.contains("Math"));
    let members: Vec<&str> = report.prototypes["Array"].iter().map(String::as_str).collect();
    assert_eq!(members, ["filter", "map"]);
}

#[test]
fn live_functions_push_the_next_sweep_further_out() {
    let caps = Capabilities::builder().build();
    let live: Vec<Obj> = (0..=PRUNE_FLOOR).map(|_| object()).collect();
    for function in &live {
        caps.register_function(function);
    }
    assert_eq!(caps.0.created.borrow().len(), PRUNE_FLOOR + 1);
    assert_eq!(caps.0.prune_at.get(), 2 * PRUNE_FLOOR);

    let more: Vec<Obj> = (0..PRUNE_FLOOR / 2).map(|_| object()).collect();
    for function in &more {
        caps.register_function(function);
    }
    assert_eq!(caps.0.prune_at.get(), 2 * PRUNE_FLOOR);
}

#[test]
fn sweep_drops_dead_functions() {
    let caps = Capabilities::builder().build();
    let dead: Vec<Obj> = (0..PRUNE_FLOOR).map(|_| object()).collect();
    for function in &dead {
        caps.register_function(function);
    }
    drop(dead);
    let survivor = object();
    caps.register_function(&survivor);
    assert_eq!(caps.0.created.borrow().len(), 1);
    assert_eq!(caps.0.prune_at.get(), PRUNE_FLOOR);
    assert!(caps.is_created(&survivor));
}
