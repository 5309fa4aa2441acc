//! Built-in constructors, prototype methods and global functions.
//!
//! Each submodule installs one family into a [`Realm`] under construction.
//! Natives receive the calling [`Interp`] so that callbacks they invoke run
//! under the caller's capabilities, and so that any object they mutate on
//! the sandbox's behalf goes through the same write checks as a script
//! assignment would.

mod array;
mod error;
pub(crate) mod function;
mod global;
mod json;
mod math;
mod number;
mod object;
mod promise;
mod regexp;
mod string;

use std::rc::Rc;

use crate::errors::{not_a_function, type_error, EvalError, EvalResult};
use crate::interpreter::Interp;
use crate::realm::{native_function, Realm};
use crate::value::{Args, Obj, Value};

pub(crate) use array::change_record;
pub(crate) use regexp::new_regexp;

pub(crate) fn install(realm: &mut Realm) {
    object::install(realm);
    function::install(realm);
    array::install(realm);
    string::install(realm);
    number::install(realm);
    math::install(realm);
    json::install(realm);
    error::install(realm);
    regexp::install(realm);
    promise::install(realm);
    global::install(realm);
}

type Native = fn(&Interp, &Args<'_>) -> EvalResult;

/// Define `name` as a native method on `target`.
fn method(realm: &Realm, target: &Obj, name: &str, length: u32, func: Native) -> Obj {
    let function = realm.native_function(name, length, func);
    target.define(name, function.clone());
    function
}

/// Define several methods of the same arity class at once.
fn methods(realm: &Realm, target: &Obj, table: &[(&str, u32, Native)]) {
    for &(name, length, func) in table {
        method(realm, target, name, length, func);
    }
}

/// A native constructor linked both ways with `prototype`.
fn constructor(realm: &Realm, name: &str, length: u32, prototype: &Obj, func: Native) -> Obj {
    let ctor = native_function(
        &realm.intrinsics().function_prototype,
        name,
        length,
        true,
        Rc::new(func),
    );
    ctor.define("prototype", prototype.clone());
    prototype.define("constructor", ctor.clone());
    ctor
}

/// `this` as an object, or a `TypeError` naming the method.
fn this_object<'a>(args: &'a Args<'_>, method: &str) -> Result<&'a Obj, EvalError> {
    args.this
        .as_object()
        .ok_or_else(|| type_error(format!("{method} called on non-object")))
}

/// Argument `index`, which must be callable.
fn callback(args: &Args<'_>, index: usize) -> Result<Value, EvalError> {
    let value = args.get(index);
    if value.is_callable() {
        Ok(value)
    } else {
        Err(not_a_function(&describe(&value)))
    }
}

/// Short description of a value for error messages.
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        Value::Object(obj) if obj.is_array() => "array".to_string(),
        Value::Object(obj) if obj.is_callable() => "function".to_string(),
        Value::Object(_) => "object".to_string(),
        other => other.to_js_string().to_string(),
    }
}

/// Resolve a relative index argument against `len` the way `slice` does:
/// negative counts from the end, the result is clamped to `0..=len`.
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = value.to_integer();
    let len_f = len as f64;
    if n < 0.0 {
        (len_f + n).max(0.0) as usize
    } else {
        n.min(len_f) as usize
    }
}
