#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use jsbox_ir::Opcode;
use pretty_assertions::assert_eq;

use super::{binary, pow, unary};
use crate::value::Value;

fn num(n: f64) -> Value {
    Value::Number(n)
}

#[test]
fn add_concatenates_when_either_side_is_a_string() {
    assert_eq!(binary(Opcode::Add, &"a".into(), &num(1.0)).unwrap(), Value::from("a1"));
    assert_eq!(binary(Opcode::Add, &num(1.5), &"b".into()).unwrap(), Value::from("1.5b"));
    assert_eq!(binary(Opcode::Add, &num(1.0), &Value::Bool(true)).unwrap(), num(2.0));
    assert!(binary(Opcode::Add, &Value::Null, &Value::Undefined)
        .unwrap()
        .to_number()
        .is_nan());
}

#[test]
fn remainder_keeps_the_dividend_sign() {
    assert_eq!(binary(Opcode::Rem, &num(-7.0), &num(3.0)).unwrap(), num(-1.0));
    assert_eq!(binary(Opcode::Rem, &num(7.5), &num(2.0)).unwrap(), num(1.5));
}

#[test]
fn bitwise_operators_work_on_int32() {
    assert_eq!(binary(Opcode::BitOr, &num(4_294_967_297.0), &num(0.0)).unwrap(), num(1.0));
    assert_eq!(binary(Opcode::Shl, &num(1.0), &num(33.0)).unwrap(), num(2.0));
    assert_eq!(binary(Opcode::Shr, &num(-8.0), &num(1.0)).unwrap(), num(-4.0));
    assert_eq!(binary(Opcode::UShr, &num(-1.0), &num(28.0)).unwrap(), num(15.0));
    assert_eq!(unary(Opcode::BitNot, &num(5.0)).unwrap(), num(-6.0));
}

#[test]
fn comparisons_treat_nan_as_unordered() {
    let nan = num(f64::NAN);
    for op in [Opcode::Lt, Opcode::LtEq, Opcode::Gt, Opcode::GtEq] {
        assert_eq!(binary(op, &nan, &num(1.0)).unwrap(), Value::Bool(false));
    }
    assert_eq!(binary(Opcode::Lt, &"a".into(), &"b".into()).unwrap(), Value::Bool(true));
    assert_eq!(binary(Opcode::Lt, &"10".into(), &"9".into()).unwrap(), Value::Bool(true));
    assert_eq!(binary(Opcode::Lt, &"10".into(), &num(9.0)).unwrap(), Value::Bool(false));
}

#[test]
fn equality_operators() {
    assert_eq!(binary(Opcode::Eq, &"1".into(), &num(1.0)).unwrap(), Value::Bool(true));
    assert_eq!(binary(Opcode::StrictEq, &"1".into(), &num(1.0)).unwrap(), Value::Bool(false));
    assert_eq!(binary(Opcode::NotEq, &Value::Null, &Value::Undefined).unwrap(), Value::Bool(false));
}

#[test]
fn pow_follows_ieee_edge_cases() {
    assert!(pow(1.0, f64::INFINITY).is_nan());
    assert!(pow(1.0, f64::NAN).is_nan());
    assert_eq!(pow(f64::NAN, 0.0), 1.0);
    assert_eq!(pow(2.0, 10.0), 1024.0);
}

#[test]
fn unary_operators() {
    assert_eq!(unary(Opcode::Not, &"".into()).unwrap(), Value::Bool(true));
    assert_eq!(unary(Opcode::Neg, &"3".into()).unwrap(), num(-3.0));
    assert_eq!(unary(Opcode::Plus, &Value::Bool(true)).unwrap(), num(1.0));
    assert_eq!(unary(Opcode::Void, &num(1.0)).unwrap(), Value::Undefined);
    assert!(unary(Opcode::Delete, &num(1.0)).is_err());
}
