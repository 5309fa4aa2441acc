//! Operators that act on plain values.
//!
//! Everything here is a pure function of its operands. Operators that need
//! the realm or a binding (`in`, `instanceof`, `typeof`, `delete`) live in
//! the operator table instead.

use std::cmp::Ordering;

use jsbox_ir::Opcode;

use crate::errors::{type_error, EvalError};
use crate::value::{check_string_length, to_int32, to_uint32, Value};

/// Apply a binary operator.
pub fn binary(op: Opcode, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let num = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
    let int = |f: fn(i32, i32) -> i32| {
        let (a, b) = (to_int32(left.to_number()), to_int32(right.to_number()));
        Value::Number(f64::from(f(a, b)))
    };
    Ok(match op {
        Opcode::Add => add(left, right)?,
        Opcode::Sub => num(|a, b| a - b),
        Opcode::Mul => num(|a, b| a * b),
        Opcode::Div => num(|a, b| a / b),
        Opcode::Rem => num(|a, b| a % b),
        Opcode::Exp => num(pow),
        Opcode::BitAnd => int(|a, b| a & b),
        Opcode::BitOr => int(|a, b| a | b),
        Opcode::BitXor => int(|a, b| a ^ b),
        Opcode::Shl => int(|a, b| a.wrapping_shl(b as u32 & 31)),
        Opcode::Shr => int(|a, b| a.wrapping_shr(b as u32 & 31)),
        Opcode::UShr => {
            let shift = to_uint32(right.to_number()) & 31;
            Value::Number(f64::from(to_uint32(left.to_number()) >> shift))
        }
        Opcode::Eq => Value::Bool(left.loose_equals(right)),
        Opcode::NotEq => Value::Bool(!left.loose_equals(right)),
        Opcode::StrictEq => Value::Bool(left.strict_equals(right)),
        Opcode::StrictNotEq => Value::Bool(!left.strict_equals(right)),
        Opcode::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        Opcode::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        Opcode::LtEq => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        Opcode::GtEq => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        _ => return Err(type_error(format!("'{op}' is not a binary operator"))),
    })
}

/// `+`: string concatenation when either primitive operand is a string.
fn add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    let left = left.to_primitive();
    let right = right.to_primitive();
    let (a, b) = match (&left, &right) {
        (Value::String(a), b) => (a.clone(), b.to_js_string()),
        (a, Value::String(b)) => (a.to_js_string(), b.clone()),
        _ => return Ok(Value::Number(left.to_number() + right.to_number())),
    };
    check_string_length(a.len() + b.len())?;
    Ok(Value::from(format!("{a}{b}")))
}

/// Abstract relational comparison; `None` when either side is NaN.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    let left = left.to_primitive();
    let right = right.to_primitive();
    if let (Value::String(a), Value::String(b)) = (&left, &right) {
        return Some(a.encode_utf16().cmp(b.encode_utf16()));
    }
    left.to_number().partial_cmp(&right.to_number())
}

/// `**` and `Math.pow`.
pub fn pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

/// Apply a unary operator that needs only the operand's value.
pub fn unary(op: Opcode, value: &Value) -> Result<Value, EvalError> {
    Ok(match op {
        Opcode::Not => Value::Bool(!value.truthy()),
        Opcode::BitNot => Value::Number(f64::from(!to_int32(value.to_number()))),
        Opcode::Neg => Value::Number(-value.to_number()),
        Opcode::Plus => Value::Number(value.to_number()),
        Opcode::Void => Value::Undefined,
        Opcode::Typeof => Value::from(value.type_of()),
        _ => return Err(type_error(format!("'{op}' is not a unary operator"))),
    })
}

#[cfg(test)]
mod tests;
