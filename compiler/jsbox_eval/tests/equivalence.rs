//! Without `await`, the blocking and the suspending driver must agree on
//! results and on the reads they report.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::cell::RefCell;
use std::rc::Rc;

use jsbox_eval::{execute, execute_async, Context, HostScope};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Rendered result (or error message) plus the host keys read, in order.
type Observed = (String, Vec<String>);

fn observe(source: &str, suspending: bool) -> Observed {
    let program = jsbox_parse::compile(source).unwrap();
    let context = Context::standard();
    let data = context.realm().new_object();
    data.set("a", 7.0).unwrap();
    data.set("b", 2.5).unwrap();

    let reads = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&reads);
    let watched = data.clone();
    let _subscription = context.caps().subscribe_get(move |object, key| {
        if *object == watched {
            sink.borrow_mut().push(key.to_string());
        }
    });

    let scopes = [HostScope::new().bind("data", data)];
    let result = if suspending {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(execute_async(&program, &scopes, &context))
    } else {
        execute(&program, &scopes, &context)
    };
    let rendered = match result {
        Ok(run) => run.value.to_js_string().to_string(),
        Err(err) => err.to_string(),
    };
    let keys = reads.borrow().clone();
    (rendered, keys)
}

fn expression() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (0_u32..100).prop_map(|n| n.to_string()),
        Just("data.a".to_string()),
        Just("data.b".to_string()),
        Just("'x'".to_string()),
    ];
    leaf.prop_recursive(4, 32, 2, |inner| {
        let op = prop::sample::select(vec![
            "+", "-", "*", "/", "%", "<", "===", "&&", "||", "??",
        ]);
        prop_oneof![
            (inner.clone(), op, inner.clone()).prop_map(|(l, op, r)| format!("({l} {op} {r})")),
            (inner.clone(), inner.clone(), inner)
                .prop_map(|(c, t, e)| format!("({c} ? {t} : {e})")),
        ]
    })
}

proptest! {
    #[test]
    fn drivers_agree_on_expressions(expr in expression()) {
        let source = format!("let r = {expr}; data.a = r; return [r, data.a]");
        assert_eq!(observe(&source, false), observe(&source, true));
    }
}

#[test]
fn drivers_agree_on_control_flow() {
    let source = "
        let out = [];
        for (let i = 0; i < 4; i++) {
            try {
                if (i == 2) throw new Error('skip ' + i);
                out.push(i * data.a);
            } catch (e) {
                out.push(e.message);
            } finally {
                out.push('f');
            }
        }
        switch (out.length) { case 8: out.push('eight'); break; default: out.push('other') }
        out.join('|')
    ";
    let sync = observe(source, false);
    assert_eq!(sync, observe(source, true));
    assert_eq!(sync.0, "0|f|7|f|skip 2|f|21|f|eight");
    assert_eq!(sync.1, ["a", "a", "a"]);
}
