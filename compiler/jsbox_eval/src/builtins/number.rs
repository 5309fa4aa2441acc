//! `Number` and `Boolean` with their prototypes.

use super::{constructor, methods};
use crate::errors::{range_error, type_error, EvalError, EvalResult};
use crate::interpreter::Interp;
use crate::realm::Realm;
use crate::value::{number_to_radix_string, parse_float, parse_int, Args, Obj, ObjectKind, Value};

/// 2^53 - 1.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub(super) fn install(realm: &mut Realm) {
    let proto = realm.intrinsics().number_prototype.clone();
    let ctor = constructor(realm, "Number", 1, &proto, number);
    methods(
        realm,
        &ctor,
        &[
            ("isInteger", 1, is_integer),
            ("isSafeInteger", 1, is_safe_integer),
            ("isFinite", 1, is_finite),
            ("isNaN", 1, is_nan),
            ("parseFloat", 1, number_parse_float),
            ("parseInt", 2, number_parse_int),
        ],
    );
    for (name, value) in [
        ("MAX_SAFE_INTEGER", MAX_SAFE_INTEGER),
        ("MIN_SAFE_INTEGER", -MAX_SAFE_INTEGER),
        ("EPSILON", f64::EPSILON),
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", 5e-324),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ("NaN", f64::NAN),
    ] {
        ctor.define(name, value);
    }
    methods(
        realm,
        &proto,
        &[
            ("toFixed", 1, to_fixed),
            ("toString", 1, number_to_string),
            ("valueOf", 0, number_value_of),
        ],
    );
    realm.add_global("Number", ctor);

    let proto = realm.intrinsics().boolean_prototype.clone();
    let ctor = constructor(realm, "Boolean", 1, &proto, boolean);
    methods(
        realm,
        &proto,
        &[("toString", 0, boolean_to_string), ("valueOf", 0, boolean_value_of)],
    );
    realm.add_global("Boolean", ctor);
}

fn boxed(interp: &Interp, value: Value) -> Value {
    let proto = interp.realm().prototype_of(&value);
    Value::Object(Obj::with_kind(ObjectKind::Boxed(value), proto))
}

fn number(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let n = Value::Number(if args.is_empty() { 0.0 } else { args.get(0).to_number() });
    Ok(if args.construct { boxed(interp, n) } else { n })
}

fn boolean(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let b = Value::Bool(args.get(0).truthy());
    Ok(if args.construct { boxed(interp, b) } else { b })
}

fn is_integer(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::Bool(matches!(args.get(0), Value::Number(n) if n.is_finite() && n.trunc() == n)))
}

fn is_safe_integer(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::Bool(matches!(
        args.get(0),
        Value::Number(n) if n.trunc() == n && n.abs() <= MAX_SAFE_INTEGER
    )))
}

fn is_finite(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::Bool(matches!(args.get(0), Value::Number(n) if n.is_finite())))
}

fn is_nan(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::Bool(matches!(args.get(0), Value::Number(n) if n.is_nan())))
}

fn number_parse_float(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::Number(parse_float(&args.get(0).to_js_string())))
}

fn number_parse_int(_: &Interp, args: &Args<'_>) -> EvalResult {
    let radix = match args.get(1) {
        Value::Undefined => None,
        r => Some(r.to_integer() as u32),
    };
    Ok(Value::Number(parse_int(&args.get(0).to_js_string(), radix)))
}

fn this_number(args: &Args<'_>, method: &str) -> Result<f64, EvalError> {
    match &args.this {
        Value::Number(n) => Ok(*n),
        Value::Object(obj) => match &obj.borrow().kind {
            ObjectKind::Boxed(Value::Number(n)) => Ok(*n),
            _ => Err(type_error(format!("Number.prototype.{method} requires that 'this' be a Number"))),
        },
        _ => Err(type_error(format!("Number.prototype.{method} requires that 'this' be a Number"))),
    }
}

fn to_fixed(_: &Interp, args: &Args<'_>) -> EvalResult {
    let x = this_number(args, "toFixed")?;
    let digits = args.get(0).to_integer();
    if !(0.0..=100.0).contains(&digits) {
        return Err(range_error("toFixed() digits argument must be between 0 and 100"));
    }
    if !x.is_finite() || x.abs() >= 1e21 {
        return Ok(Value::String(Value::Number(x).to_js_string()));
    }
    Ok(Value::from(fixed(x, digits as usize)))
}

/// Fixed-point notation with ties rounded away from zero, computed on the
/// exact decimal expansion of `x`.
pub(super) fn fixed(x: f64, digits: usize) -> String {
    // 1100 places covers the longest exact expansion of an f64.
    let exact = format!("{:.1100}", x.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut kept: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(digits))
        .collect();
    if frac_part.as_bytes().get(digits).is_some_and(|d| *d >= b'5') {
        let mut i = kept.len();
        loop {
            if i == 0 {
                kept.insert(0, b'1');
                break;
            }
            i -= 1;
            if kept[i] == b'9' {
                kept[i] = b'0';
            } else {
                kept[i] += 1;
                break;
            }
        }
    }
    let int_len = kept.len() - digits;
    let mut out = String::with_capacity(kept.len() + 2);
    if x < 0.0 {
        out.push('-');
    }
    out.push_str(&String::from_utf8_lossy(&kept[..int_len]));
    if digits > 0 {
        out.push('.');
        out.push_str(&String::from_utf8_lossy(&kept[int_len..]));
    }
    out
}

fn number_to_string(_: &Interp, args: &Args<'_>) -> EvalResult {
    let n = this_number(args, "toString")?;
    match args.get(0) {
        Value::Undefined => Ok(Value::String(Value::Number(n).to_js_string())),
        radix => {
            let radix = radix.to_integer();
            if !(2.0..=36.0).contains(&radix) {
                return Err(range_error("toString() radix must be between 2 and 36"));
            }
            Ok(Value::from(number_to_radix_string(n, radix as u32)))
        }
    }
}

fn number_value_of(_: &Interp, args: &Args<'_>) -> EvalResult {
    this_number(args, "valueOf").map(Value::Number)
}

fn this_boolean(args: &Args<'_>, method: &str) -> Result<bool, EvalError> {
    match &args.this {
        Value::Bool(b) => Ok(*b),
        Value::Object(obj) => match &obj.borrow().kind {
            ObjectKind::Boxed(Value::Bool(b)) => Ok(*b),
            _ => Err(type_error(format!("Boolean.prototype.{method} requires that 'this' be a Boolean"))),
        },
        _ => Err(type_error(format!("Boolean.prototype.{method} requires that 'this' be a Boolean"))),
    }
}

fn boolean_to_string(_: &Interp, args: &Args<'_>) -> EvalResult {
    this_boolean(args, "toString").map(|b| Value::from(if b { "true" } else { "false" }))
}

fn boolean_value_of(_: &Interp, args: &Args<'_>) -> EvalResult {
    this_boolean(args, "valueOf").map(Value::Bool)
}
