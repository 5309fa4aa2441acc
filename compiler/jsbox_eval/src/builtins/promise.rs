//! `Promise` and `Promise.prototype`.
//!
//! Reactions are tasks on the derived promise. Like every promise task they
//! start eagerly: a `then` on an already settled promise runs its handler
//! before `then` returns.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::{callback, constructor, methods, this_object};
use crate::errors::{not_a_function, thrown, type_error, EvalError, EvalResult};
use crate::interpreter::Interp;
use crate::realm::Realm;
use crate::value::promise::{self, PromiseFuture};
use crate::value::{Args, Obj, Value};

pub(super) fn install(realm: &mut Realm) {
    let proto = realm.intrinsics().promise_prototype.clone();
    let ctor = constructor(realm, "Promise", 1, &proto, promise_constructor);
    methods(
        realm,
        &ctor,
        &[
            ("resolve", 1, resolve),
            ("reject", 1, reject),
            ("all", 1, all),
            ("allSettled", 1, all_settled),
            ("race", 1, race),
        ],
    );
    methods(
        realm,
        &proto,
        &[("then", 2, then), ("catch", 1, catch), ("finally", 1, finally)],
    );
    realm.add_global("Promise", ctor);
}

fn is_promise(value: &Value) -> bool {
    matches!(value, Value::Object(obj) if obj.promise().is_some())
}

/// Wait for `value` if it is a promise; other values are ready at once.
async fn settled(value: Value) -> EvalResult {
    match value {
        Value::Object(obj) if obj.promise().is_some() => PromiseFuture::new(obj).await,
        other => Ok(other),
    }
}

fn promise_constructor(interp: &Interp, args: &Args<'_>) -> EvalResult {
    if !args.construct {
        return Err(type_error(
            "Promise constructor cannot be invoked without 'new'",
        ));
    }
    let executor = args.get(0);
    if !executor.is_callable() {
        return Err(not_a_function("Promise resolver"));
    }
    let realm = interp.realm();
    let (promise, handle) = realm.new_promise();
    let fulfil = handle.clone();
    let resolve_fn = realm.native_function("resolve", 1, move |_, a| {
        fulfil.resolve(a.get(0));
        Ok(Value::Undefined)
    });
    let reject_handle = handle;
    let reject_fn = realm.native_function("reject", 1, move |_, a| {
        reject_handle.reject(a.get(0));
        Ok(Value::Undefined)
    });
    let outcome = interp.call(
        &executor,
        Value::Undefined,
        &[Value::Object(resolve_fn), Value::Object(reject_fn)],
    );
    match outcome {
        Err(err) if !err.is_catchable() => return Err(err),
        Err(err) => promise::settle(&promise, Err(err)),
        Ok(_) => {}
    }
    Ok(Value::Object(promise))
}

fn new_settled(interp: &Interp, result: EvalResult) -> Value {
    let (promise, _) = interp.realm().new_promise();
    promise::settle(&promise, result);
    Value::Object(promise)
}

fn resolve(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let value = args.get(0);
    if is_promise(&value) {
        return Ok(value);
    }
    Ok(new_settled(interp, Ok(value)))
}

fn reject(interp: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(new_settled(interp, Err(thrown(args.get(0)))))
}

fn iterable(args: &Args<'_>, method: &str) -> Result<Vec<Value>, EvalError> {
    args.get(0)
        .as_object()
        .and_then(Obj::array_items)
        .ok_or_else(|| type_error(format!("Promise.{method} requires an array")))
}

/// A promise settled by `task`.
fn spawn(interp: &Interp, task: impl Future<Output = EvalResult> + 'static) -> Value {
    let (promise, _) = interp.realm().new_promise();
    promise::start(&promise, Box::pin(task));
    Value::Object(promise)
}

fn all(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let items = iterable(args, "all")?;
    let task_interp = interp.clone();
    Ok(spawn(interp, async move {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            values.push(settled(item).await?);
        }
        Ok(Value::Object(task_interp.realm().new_array(values)))
    }))
}

fn all_settled(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let items = iterable(args, "allSettled")?;
    let task_interp = interp.clone();
    Ok(spawn(interp, async move {
        let realm = task_interp.realm();
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let entry = realm.new_object();
            match settled(item).await {
                Ok(value) => {
                    entry.set("status", "fulfilled")?;
                    entry.set("value", value)?;
                }
                Err(err) if !err.is_catchable() => return Err(err),
                Err(err) => {
                    entry.set("status", "rejected")?;
                    entry.set("reason", task_interp.error_value(&err))?;
                }
            }
            results.push(Value::Object(entry));
        }
        Ok(Value::Object(realm.new_array(results)))
    }))
}

/// Settles with whichever input settles first, in input order on ties.
struct Race {
    entrants: Vec<Pin<Box<dyn Future<Output = EvalResult>>>>,
}

impl Future for Race {
    type Output = EvalResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<EvalResult> {
        for entrant in &mut self.entrants {
            if let Poll::Ready(outcome) = entrant.as_mut().poll(cx) {
                return Poll::Ready(outcome);
            }
        }
        Poll::Pending
    }
}

fn race(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let items = iterable(args, "race")?;
    let entrants = items
        .into_iter()
        .map(|item| Box::pin(settled(item)) as Pin<Box<dyn Future<Output = EvalResult>>>)
        .collect();
    Ok(spawn(interp, Race { entrants }))
}

fn this_promise(args: &Args<'_>, method: &str) -> Result<Obj, EvalError> {
    let obj = this_object(args, method)?;
    if obj.promise().is_none() {
        return Err(type_error(format!(
            "Method {method} called on incompatible receiver"
        )));
    }
    Ok(obj.clone())
}

fn then(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let source = this_promise(args, "Promise.prototype.then")?;
    let on_fulfilled = args.get(0);
    let on_rejected = args.get(1);
    let task_interp = interp.clone();
    Ok(spawn(interp, async move {
        match PromiseFuture::new(source).await {
            Ok(value) if on_fulfilled.is_callable() => {
                task_interp.call(&on_fulfilled, Value::Undefined, &[value])
            }
            Ok(value) => Ok(value),
            Err(err) if err.is_catchable() && on_rejected.is_callable() => {
                let reason = task_interp.error_value(&err);
                task_interp.call(&on_rejected, Value::Undefined, &[reason])
            }
            Err(err) => Err(err),
        }
    }))
}

fn catch(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let forwarded = [Value::Undefined, args.get(0)];
    then(interp, &Args::new(args.this.clone(), &forwarded))
}

fn finally(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let source = this_promise(args, "Promise.prototype.finally")?;
    let on_finally = callback(args, 0)?;
    let task_interp = interp.clone();
    Ok(spawn(interp, async move {
        let outcome = PromiseFuture::new(source).await;
        if outcome.as_ref().is_err_and(|err| !err.is_catchable()) {
            return outcome;
        }
        let cleanup = task_interp.call(&on_finally, Value::Undefined, &[])?;
        settled(cleanup).await?;
        outcome
    }))
}
