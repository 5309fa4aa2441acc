//! The `Math` namespace.

use std::cell::Cell;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};

use super::methods;
use crate::errors::EvalResult;
use crate::interpreter::Interp;
use crate::realm::Realm;
use crate::value::Args;
use crate::value::Value;

pub(super) fn install(realm: &mut Realm) {
    let math = realm.new_object();
    for (name, value) in [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ] {
        math.define(name, value);
    }
    methods(
        realm,
        &math,
        &[
            ("abs", 1, |_, a| unary(a, f64::abs)),
            ("floor", 1, |_, a| unary(a, f64::floor)),
            ("ceil", 1, |_, a| unary(a, f64::ceil)),
            ("round", 1, |_, a| unary(a, round)),
            ("trunc", 1, |_, a| unary(a, f64::trunc)),
            ("sign", 1, |_, a| unary(a, sign)),
            ("sqrt", 1, |_, a| unary(a, f64::sqrt)),
            ("cbrt", 1, |_, a| unary(a, f64::cbrt)),
            ("exp", 1, |_, a| unary(a, f64::exp)),
            ("log", 1, |_, a| unary(a, f64::ln)),
            ("log2", 1, |_, a| unary(a, f64::log2)),
            ("log10", 1, |_, a| unary(a, f64::log10)),
            ("sin", 1, |_, a| unary(a, f64::sin)),
            ("cos", 1, |_, a| unary(a, f64::cos)),
            ("tan", 1, |_, a| unary(a, f64::tan)),
            ("asin", 1, |_, a| unary(a, f64::asin)),
            ("acos", 1, |_, a| unary(a, f64::acos)),
            ("atan", 1, |_, a| unary(a, f64::atan)),
            ("atan2", 2, atan2),
            ("pow", 2, pow),
            ("max", 2, max),
            ("min", 2, min),
            ("hypot", 2, hypot),
            ("random", 0, random),
        ],
    );
    realm.add_global("Math", math);
}

fn unary(args: &Args<'_>, f: fn(f64) -> f64) -> EvalResult {
    Ok(Value::Number(f(args.get(0).to_number())))
}

/// Rounds half up, toward positive infinity.
fn round(x: f64) -> f64 {
    if !x.is_finite() || x.fract() == 0.0 {
        return x;
    }
    let floor = x.floor();
    let rounded = if x - floor >= 0.5 { floor + 1.0 } else { floor };
    if rounded == 0.0 && x < 0.0 {
        -0.0
    } else {
        rounded
    }
}

fn sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

fn atan2(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::Number(args.get(0).to_number().atan2(args.get(1).to_number())))
}

fn pow(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::Number(crate::operators::pow(
        args.get(0).to_number(),
        args.get(1).to_number(),
    )))
}

fn max(_: &Interp, args: &Args<'_>) -> EvalResult {
    let mut out = f64::NEG_INFINITY;
    for value in args.values {
        let n = value.to_number();
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        if n > out || (n == 0.0 && out == 0.0 && out.is_sign_negative()) {
            out = n;
        }
    }
    Ok(Value::Number(out))
}

fn min(_: &Interp, args: &Args<'_>) -> EvalResult {
    let mut out = f64::INFINITY;
    for value in args.values {
        let n = value.to_number();
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        if n < out || (n == 0.0 && out == 0.0 && n.is_sign_negative()) {
            out = n;
        }
    }
    Ok(Value::Number(out))
}

fn hypot(_: &Interp, args: &Args<'_>) -> EvalResult {
    let sum: f64 = args.values.iter().map(|v| v.to_number().powi(2)).sum();
    Ok(Value::Number(sum.sqrt()))
}

thread_local! {
    static RNG: Cell<u64> = Cell::new(seed());
}

fn seed() -> u64 {
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(0x9E37_79B9_7F4A_7C15);
    hasher.finish() | 1
}

/// xorshift64*; not suitable for anything security related.
fn random(_: &Interp, _: &Args<'_>) -> EvalResult {
    let next = RNG.with(|state| {
        let mut x = state.get();
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        state.set(x);
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    });
    Ok(Value::Number((next >> 11) as f64 / (1u64 << 53) as f64))
}

#[cfg(test)]
mod tests {
    use super::{round, sign};

    #[test]
    fn round_ties_toward_positive_infinity() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert_eq!(round(-0.4), 0.0);
        assert!(round(-0.4).is_sign_negative());
        assert_eq!(round(1.49), 1.0);
    }

    #[test]
    fn sign_preserves_zero_and_nan() {
        assert!(sign(-0.0).is_sign_negative());
        assert!(sign(f64::NAN).is_nan());
        assert_eq!(sign(-3.0), -1.0);
    }
}
