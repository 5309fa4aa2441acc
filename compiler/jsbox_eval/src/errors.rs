//! Runtime errors and non-local control flow.
//!
//! Factory functions are the public way to build errors; they fill in both
//! the structured [`EvalErrorKind`] and the message text, so the wording of
//! every runtime error lives in this one file.

use std::fmt;
use std::rc::Rc;

use jsbox_parse::ParseError;

use crate::value::Value;

/// Result of evaluating an expression.
pub type EvalResult = Result<Value, EvalError>;

/// Category of a runtime error.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalErrorKind {
    /// Use of an undeclared binding.
    Reference,
    /// Wrong kind of value: calling a non-function, writing a constant.
    Type,
    /// Structural error found while running, including deferred parse failures.
    Syntax,
    /// Numeric argument out of range.
    Range,
    /// A capability rule denied the operation.
    Capability,
    /// The execution quota ran out. Never visible to sandboxed `catch`.
    QuotaExceeded { ticks: u64 },
    /// A value thrown by the script itself.
    Thrown(Value),
}

impl EvalErrorKind {
    /// Constructor name of the script-visible error, if this kind has one.
    pub fn js_name(&self) -> Option<&'static str> {
        match self {
            Self::Reference => Some("ReferenceError"),
            Self::Type => Some("TypeError"),
            Self::Syntax => Some("SyntaxError"),
            Self::Range => Some("RangeError"),
            Self::Capability => Some("Error"),
            Self::QuotaExceeded { .. } | Self::Thrown(_) => None,
        }
    }
}

/// A runtime error.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: String,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        EvalError {
            kind,
            message: message.into(),
        }
    }

    /// Whether sandboxed `try`/`catch` may intercept this error.
    pub fn is_catchable(&self) -> bool {
        !matches!(self.kind, EvalErrorKind::QuotaExceeded { .. })
    }

    pub fn is_capability(&self) -> bool {
        matches!(self.kind, EvalErrorKind::Capability)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EvalErrorKind::Reference => write!(f, "ReferenceError: {}", self.message),
            EvalErrorKind::Type => write!(f, "TypeError: {}", self.message),
            EvalErrorKind::Syntax => write!(f, "SyntaxError: {}", self.message),
            EvalErrorKind::Range => write!(f, "RangeError: {}", self.message),
            EvalErrorKind::Capability => write!(f, "CapabilityError: {}", self.message),
            EvalErrorKind::QuotaExceeded { .. } => {
                write!(f, "QuotaExceededError: {}", self.message)
            }
            EvalErrorKind::Thrown(_) => write!(f, "Uncaught {}", self.message),
        }
    }
}

impl std::error::Error for EvalError {}

impl From<ParseError> for EvalError {
    fn from(err: ParseError) -> Self {
        EvalError::new(EvalErrorKind::Syntax, err.to_string())
    }
}

/// Non-local exits carried on the `Err` side of statement execution.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlAction {
    Error(EvalError),
    Return(Value),
    Break(Option<Rc<str>>),
    Continue(Option<Rc<str>>),
}

impl From<EvalError> for ControlAction {
    fn from(err: EvalError) -> Self {
        ControlAction::Error(err)
    }
}

impl ControlAction {
    /// Turn a `break`/`continue` that escaped every loop into an error.
    pub fn into_error(self) -> Result<Value, EvalError> {
        match self {
            ControlAction::Error(err) => Err(err),
            ControlAction::Return(value) => Ok(value),
            ControlAction::Break(label) => Err(illegal_jump("break", label.as_deref())),
            ControlAction::Continue(label) => Err(illegal_jump("continue", label.as_deref())),
        }
    }
}

// Reference errors

#[cold]
pub fn not_defined(name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::Reference, format!("{name} is not defined"))
}

// Type errors

#[cold]
pub fn type_error(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Type, message)
}

#[cold]
pub fn not_a_function(what: &str) -> EvalError {
    type_error(format!("{what} is not a function"))
}

#[cold]
pub fn not_a_constructor(what: &str) -> EvalError {
    type_error(format!("{what} is not a constructor"))
}

#[cold]
pub fn cannot_read(key: &str, target: &str) -> EvalError {
    type_error(format!("Cannot read properties of {target} (reading '{key}')"))
}

#[cold]
pub fn const_assignment(name: &str) -> EvalError {
    type_error(format!("Assignment to constant variable '{name}'"))
}

#[cold]
pub fn primitive_assignment(key: &str) -> EvalError {
    type_error(format!("Cannot assign property '{key}' of a primitive value"))
}

#[cold]
pub fn frozen_assignment(key: &str) -> EvalError {
    type_error(format!("Cannot assign to read only property '{key}' of object"))
}

#[cold]
pub fn not_iterable(what: &str) -> EvalError {
    type_error(format!("{what} is not iterable"))
}

// Syntax errors

#[cold]
pub fn syntax_error(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Syntax, message)
}

#[cold]
pub fn already_declared(name: &str) -> EvalError {
    syntax_error(format!("Identifier '{name}' has already been declared"))
}

#[cold]
pub fn illegal_jump(keyword: &str, label: Option<&str>) -> EvalError {
    match label {
        Some(label) => syntax_error(format!("Undefined label '{label}' for {keyword}")),
        None => syntax_error(format!("Illegal {keyword} statement")),
    }
}

#[cold]
pub fn illegal_await() -> EvalError {
    syntax_error("await is only valid in asynchronous execution")
}

// Range errors

#[cold]
pub fn range_error(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Range, message)
}

#[cold]
pub fn invalid_array_length() -> EvalError {
    range_error("Invalid array length")
}

#[cold]
pub fn invalid_string_length() -> EvalError {
    range_error("Invalid string length")
}

// Capability errors

#[cold]
pub fn capability_denied(member: &str) -> EvalError {
    EvalError::new(
        EvalErrorKind::Capability,
        format!("Method or property access not permitted: {member}"),
    )
}

#[cold]
pub fn global_write(key: &str) -> EvalError {
    EvalError::new(
        EvalErrorKind::Capability,
        format!("Cannot modify property '{key}' of a global object"),
    )
}

#[cold]
pub fn frozen_global() -> EvalError {
    EvalError::new(EvalErrorKind::Capability, "Cannot freeze a global object")
}

#[cold]
pub fn prototype_override(key: &str) -> EvalError {
    EvalError::new(
        EvalErrorKind::Capability,
        format!("Override prototype property '{key}' not allowed"),
    )
}

#[cold]
pub fn construction_denied(name: &str) -> EvalError {
    EvalError::new(
        EvalErrorKind::Capability,
        format!("Object construction not allowed: {name}"),
    )
}

#[cold]
pub fn calls_forbidden() -> EvalError {
    EvalError::new(EvalErrorKind::Capability, "Function invocations are not allowed")
}

#[cold]
pub fn creation_forbidden() -> EvalError {
    EvalError::new(EvalErrorKind::Capability, "Function creation is forbidden")
}

#[cold]
pub fn async_forbidden() -> EvalError {
    EvalError::new(EvalErrorKind::Capability, "Async/await not permitted")
}

// Quota

#[cold]
pub fn quota_exceeded(ticks: u64) -> EvalError {
    EvalError::new(
        EvalErrorKind::QuotaExceeded { ticks },
        format!("Execution quota exceeded after {ticks} ticks"),
    )
}

// Script throws

#[cold]
pub fn thrown(value: Value) -> EvalError {
    let message = value.to_js_string().to_string();
    EvalError::new(EvalErrorKind::Thrown(value), message)
}

#[cfg(test)]
mod tests;
