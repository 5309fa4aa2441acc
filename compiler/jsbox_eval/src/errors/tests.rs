use super::*;
use pretty_assertions::assert_eq;

#[test]
fn display_prefixes_category() {
    assert_eq!(not_defined("a").to_string(), "ReferenceError: a is not defined");
    assert_eq!(
        cannot_read("x", "undefined").to_string(),
        "TypeError: Cannot read properties of undefined (reading 'x')"
    );
    assert_eq!(
        capability_denied("Array.flatMap").to_string(),
        "CapabilityError: Method or property access not permitted: Array.flatMap"
    );
    assert_eq!(
        quota_exceeded(10).to_string(),
        "QuotaExceededError: Execution quota exceeded after 10 ticks"
    );
    assert_eq!(thrown(Value::from("boom")).to_string(), "Uncaught boom");
}

#[test]
fn quota_is_not_catchable() {
    assert!(!quota_exceeded(1).is_catchable());
    assert!(capability_denied("Object.x").is_catchable());
    assert!(thrown(Value::Null).is_catchable());
}

#[test]
fn capability_errors_surface_as_plain_errors() {
    assert_eq!(EvalErrorKind::Capability.js_name(), Some("Error"));
    assert_eq!(EvalErrorKind::Type.js_name(), Some("TypeError"));
    assert_eq!(EvalErrorKind::QuotaExceeded { ticks: 3 }.js_name(), None);
}

#[test]
fn escaped_jumps_become_errors() {
    assert_eq!(ControlAction::Return(Value::from(1.0)).into_error(), Ok(Value::from(1.0)));
    assert_eq!(
        ControlAction::Break(None).into_error(),
        Err(syntax_error("Illegal break statement"))
    );
    assert_eq!(
        ControlAction::Continue(Some("outer".into())).into_error(),
        Err(syntax_error("Undefined label 'outer' for continue"))
    );
}

#[test]
fn parse_errors_convert_to_syntax_errors() {
    let err = EvalError::from(ParseError::UnterminatedString);
    assert_eq!(err.kind, EvalErrorKind::Syntax);
    assert_eq!(err.to_string(), "SyntaxError: Unterminated string literal");
}
