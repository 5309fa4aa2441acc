//! Tests for source slicing.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn whole_buffer_view() {
    let code = CodeSlice::new("let x = 1");
    assert_eq!(code.as_str(), "let x = 1");
    assert_eq!(code.len(), 9);
    assert_eq!(code.start(), 0);
    assert_eq!(code.end(), 9);
}

#[test]
fn sub_slices_keep_absolute_offsets() {
    let code = CodeSlice::new("return a + b;");
    let tail = code.skip(7);
    assert_eq!(tail.as_str(), "a + b;");
    assert_eq!(tail.start(), 7);

    let inner = tail.slice(4, 5);
    assert_eq!(inner.as_str(), "b");
    assert_eq!(inner.start(), 11);
    assert_eq!(inner.end(), 12);
    assert_eq!(inner.buffer_id(), code.buffer_id());
    assert!(inner.shares_buffer(&code));
}

#[test]
fn slicing_is_clamped() {
    let code = CodeSlice::new("abc");
    assert_eq!(code.slice(2, 10).as_str(), "c");
    assert_eq!(code.slice(5, 1).as_str(), "");
    assert_eq!(code.take(100).as_str(), "abc");
    assert!(code.skip(3).is_empty());
}

#[test]
fn trimming_moves_the_window() {
    let code = CodeSlice::new("  \n x = 1 ;  ");
    let trimmed = code.trim();
    assert_eq!(trimmed.as_str(), "x = 1 ;");
    assert_eq!(trimmed.start(), 4);
}

#[test]
fn split_multibyte_cut_is_empty_not_panic() {
    let code = CodeSlice::new("é");
    assert_eq!(code.take(1).as_str(), "");
    assert_eq!(code.byte(0).unwrap(), 0xC3);
}

#[test]
fn separate_buffers_have_distinct_ids() {
    let a = CodeSlice::new("x");
    let b = CodeSlice::new("x");
    assert_eq!(a, b);
    assert!(!a.shares_buffer(&b));
}

proptest! {
    #[test]
    fn nested_slices_match_str_slicing(
        text in "[a-z ;(){}]{0,40}",
        a in 0usize..50,
        b in 0usize..50,
        c in 0usize..50,
        d in 0usize..50,
    ) {
        let code = CodeSlice::new(text.as_str());
        let outer = code.slice(a, b);
        let inner = outer.slice(c, d);

        let to = b.min(text.len());
        let from = a.min(to);
        let outer_text = &text[from..to];
        let to2 = d.min(outer_text.len());
        let from2 = c.min(to2);

        prop_assert_eq!(outer.as_str(), outer_text);
        prop_assert_eq!(inner.as_str(), &outer_text[from2..to2]);
        prop_assert_eq!(inner.start(), from + from2);
        prop_assert_eq!(inner.buffer_id(), code.buffer_id());
    }
}
