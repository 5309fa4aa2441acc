//! Global functions and values, and the sandbox global's own constructor.

use super::constructor;
use crate::errors::{type_error, EvalResult};
use crate::interpreter::Interp;
use crate::realm::Realm;
use crate::value::{parse_float, parse_int, Args, Value};

pub(super) fn install(realm: &mut Realm) {
    let proto = realm.intrinsics().global_prototype.clone();
    // Reachable as `this.constructor` at the top level.
    constructor(realm, "SandboxGlobal", 0, &proto, sandbox_global);

    for (name, length, func) in [
        ("parseInt", 2, parse_int_global as super::Native),
        ("parseFloat", 1, parse_float_global),
        ("isNaN", 1, is_nan),
        ("isFinite", 1, is_finite),
    ] {
        let function = realm.native_function(name, length, func);
        realm.add_global(name, function);
    }
    realm.add_global("NaN", f64::NAN);
    realm.add_global("Infinity", f64::INFINITY);
    realm.add_global("undefined", Value::Undefined);
}

fn sandbox_global(_: &Interp, _: &Args<'_>) -> EvalResult {
    Err(type_error("Illegal constructor"))
}

fn parse_int_global(_: &Interp, args: &Args<'_>) -> EvalResult {
    let radix = match args.get(1) {
        Value::Undefined => None,
        r => Some(r.to_integer() as u32),
    };
    Ok(Value::Number(parse_int(&args.get(0).to_js_string(), radix)))
}

fn parse_float_global(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::Number(parse_float(&args.get(0).to_js_string())))
}

fn is_nan(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::Bool(args.get(0).to_number().is_nan()))
}

fn is_finite(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::Bool(args.get(0).to_number().is_finite()))
}
