#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use pretty_assertions::assert_eq;

fn stream(source: &str) -> TokenStream {
    TokenStream::new(CodeSlice::new(source)).unwrap()
}

#[test]
fn brackets_are_matched_both_ways() {
    let s = stream("f(a[1], {b: 2})");
    assert_eq!(s.closing(1), Some(12));
    assert_eq!(s.opening(12), Some(1));
    assert_eq!(s.closing(3), Some(5));
    assert_eq!(s.closing(7), Some(11));
}

#[test]
fn unbalanced_brackets_are_rejected() {
    assert_eq!(
        TokenStream::new(CodeSlice::new("f(a]")).err(),
        Some(ParseError::UnbalancedBracket { open: '(' })
    );
    assert_eq!(
        TokenStream::new(CodeSlice::new("{ a")).err(),
        Some(ParseError::UnbalancedBracket { open: '{' })
    );
    assert!(matches!(
        TokenStream::new(CodeSlice::new("a)")),
        Err(ParseError::UnexpectedToken { ch: ')', .. })
    ));
}

#[test]
fn rest_of_exp_skips_bracket_groups() {
    let s = stream("f(a, b), c");
    let end = s.rest_of_exp(0, s.len(), |i| s.is(i, ","));
    assert_eq!(s.text(end), ",");
    assert_eq!(end, 6);
}

#[test]
fn rest_of_exp_stops_at_inserted_semicolons() {
    let s = stream("a = 1\nb = 2");
    let end = s.rest_of_exp(0, s.len(), |_| false);
    assert_eq!(end, 3);
    assert_eq!(s.text(end), "b");
}

#[test]
fn split_keeps_empty_segments() {
    let s = stream("(;i<2;)");
    assert_eq!(s.split(1, 6, ";"), vec![(1, 1), (2, 5), (6, 6)]);
}

#[test]
fn value_endings() {
    let s = stream("a ++ - typeof b . in");
    assert!(s.ends_value(0));
    assert!(s.is_postfix_update(1));
    assert!(s.ends_value(1));
    assert!(!s.ends_value(2));
    assert!(!s.ends_value(3));
    assert!(s.ends_value(6), "property names end values");
}

#[test]
fn slices_share_the_buffer() {
    let s = stream("let x = a + b;");
    let slice = s.slice(3, 6);
    assert_eq!(slice.as_str(), "a + b");
    assert!(slice.shares_buffer(&s.code));
}
