//! Runtime values.
//!
//! Primitives are stored inline; everything else is an [`Obj`] handle with
//! identity semantics. Conversions follow the abstract operations scripts
//! rely on (`ToNumber`, `ToString`, `ToBoolean`, `==`, `===`). Objects
//! convert to primitives without calling script-defined `valueOf` or
//! `toString`, so coercion can never run sandbox code behind the
//! interpreter's back.

mod number;
mod object;
pub mod promise;

use std::fmt;
use std::rc::Rc;

pub use number::{
    number_to_radix_string, number_to_string, parse_float, parse_int, string_to_number, to_int32,
    to_uint32,
};
pub use object::{
    array_index, array_length, Args, BoundFunction, Callable, NativeFn, NativeFunction, Obj, ObjId, ObjectData,
    ObjectKind, RegExpData, WeakObj,
};

/// Longest array a script can create or grow.
pub const MAX_ARRAY_LENGTH: usize = 1 << 22;

/// Longest string, in bytes, a script can build.
pub const MAX_STRING_LENGTH: usize = 1 << 26;

/// Reject a string of `len` bytes before it is built.
pub fn check_string_length(len: usize) -> Result<(), crate::EvalError> {
    if len > MAX_STRING_LENGTH {
        return Err(crate::errors::invalid_string_length());
    }
    Ok(())
}

/// A script value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Obj),
}

impl Value {
    /// Result of the `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(obj) if obj.is_callable() => "function",
            Value::Object(_) => "object",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Object(obj) if obj.is_callable())
    }

    pub fn as_object(&self) -> Option<&Obj> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// `ToBoolean`.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// `ToNumber`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Object(_) => self.to_primitive().to_number(),
        }
    }

    /// `ToIntegerOrInfinity`: NaN becomes 0, fractions truncate.
    pub fn to_integer(&self) -> f64 {
        let n = self.to_number();
        if n.is_nan() {
            0.0
        } else {
            n.trunc()
        }
    }

    /// `ToPrimitive`. Boxed primitives unwrap; every other object becomes
    /// its string form.
    pub fn to_primitive(&self) -> Value {
        match self {
            Value::Object(obj) => {
                if let ObjectKind::Boxed(inner) = &obj.borrow().kind {
                    return inner.clone();
                }
                Value::String(object_to_string(obj, &mut Vec::new()).into())
            }
            other => other.clone(),
        }
    }

    /// `ToString`.
    pub fn to_js_string(&self) -> Rc<str> {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(true) => "true".into(),
            Value::Bool(false) => "false".into(),
            Value::Number(n) => number_to_string(*n).into(),
            Value::String(s) => Rc::clone(s),
            Value::Object(obj) => object_to_string(obj, &mut Vec::new()).into(),
        }
    }

    /// `ToPropertyKey`.
    pub fn to_property_key(&self) -> Rc<str> {
        self.to_js_string()
    }

    /// `===`.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => self == other,
        }
    }

    /// `SameValueZero`, used by `includes`: like `===` but NaN equals NaN.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }

    /// `==`.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Bool(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Bool(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Object(_), _) => self.to_primitive().loose_equals(other),
            (_, Value::Object(_)) => self.loose_equals(&other.to_primitive()),
            _ => self.strict_equals(other),
        }
    }
}

/// String form of an object, guarding against cycles through arrays.
fn object_to_string(obj: &Obj, seen: &mut Vec<ObjId>) -> String {
    if seen.contains(&obj.id()) {
        return String::new();
    }
    if let Some(items) = obj.array_items() {
        seen.push(obj.id());
        let parts: Vec<String> = items
            .iter()
            .map(|item| match item {
                Value::Undefined | Value::Null => String::new(),
                Value::Object(inner) => object_to_string(inner, seen),
                other => other.to_js_string().to_string(),
            })
            .collect();
        seen.pop();
        return parts.join(",");
    }

    let simple = match &obj.borrow().kind {
        ObjectKind::Boxed(inner) => Some(inner.to_js_string().to_string()),
        ObjectKind::RegExp(re) => Some(format!("/{}/{}", re.source, re.flags)),
        ObjectKind::Promise(_) => Some("[object Promise]".to_string()),
        ObjectKind::Global => Some("[object SandboxGlobal]".to_string()),
        ObjectKind::Ordinary | ObjectKind::Array(_) => Some("[object Object]".to_string()),
        ObjectKind::Error | ObjectKind::Function(_) => None,
    };
    if let Some(text) = simple {
        return text;
    }
    if obj.is_callable() {
        let name = obj.get("name");
        return format!("function {}() {{ [native code] }}", primitive_string(&name));
    }
    error_to_string(obj)
}

/// `Error.prototype.toString` without script calls.
pub(crate) fn error_to_string(obj: &Obj) -> String {
    let name = match obj.get("name") {
        Value::Undefined => "Error".to_string(),
        other => primitive_string(&other),
    };
    let message = match obj.get("message") {
        Value::Undefined => String::new(),
        other => primitive_string(&other),
    };
    match (name.is_empty(), message.is_empty()) {
        (_, true) => name,
        (true, false) => message,
        (false, false) => format!("{name}: {message}"),
    }
}

fn primitive_string(value: &Value) -> String {
    match value {
        Value::Object(_) => String::new(),
        other => other.to_js_string().to_string(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_js_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl From<Obj> for Value {
    fn from(obj: Obj) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Undefined, Into::into)
    }
}

#[cfg(test)]
mod tests;
