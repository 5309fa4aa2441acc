//! Automatic semicolon insertion.
//!
//! A line break ends a statement when the token before it can end a value
//! and the token after it can start one, except:
//! - before `catch`, `finally` and `else`, and before the `while` of a
//!   `do { } while (..)`;
//! - after the `)` of an `if`/`while`/`for` header still waiting for its body;
//! - inside `(..)` or `[..]`, where statements cannot end.
//!
//! `return`, `break` and `continue` also end a statement at a line break, so
//! `return\nx` returns `undefined`.

use rustc_hash::FxHashSet;

use crate::lexeme::TokenKind;
use crate::scanner::TokenStream;

/// Indices of tokens that are preceded by an inserted semicolon.
pub(crate) fn insert(stream: &TokenStream) -> FxHashSet<usize> {
    let mut inserted = FxHashSet::default();
    let mut open: Vec<&str> = Vec::new();

    for i in 0..stream.len() {
        if i > 0
            && stream.newline_before(i)
            && matches!(open.last(), None | Some(&"{"))
            && ends_statement(stream, i - 1)
            && starts_statement(stream, i)
            && !continues_previous(stream, i)
        {
            inserted.insert(i);
        }
        if let Some(TokenKind::Punct(p)) = stream.get(i).map(|t| t.kind) {
            match p {
                "(" | "[" | "{" => open.push(p),
                ")" | "]" | "}" => {
                    open.pop();
                }
                _ => {}
            }
        }
    }

    inserted
}

fn ends_statement(stream: &TokenStream, i: usize) -> bool {
    if matches!(stream.word(i), Some("return" | "break" | "continue")) && !stream.after_dot(i) {
        return true;
    }
    if stream.is(i, ")") && awaits_body(stream, i) {
        return false;
    }
    stream.ends_value(i)
}

fn starts_statement(stream: &TokenStream, i: usize) -> bool {
    let Some(token) = stream.get(i) else {
        return false;
    };
    match token.kind {
        TokenKind::Word => !matches!(stream.text(i), "in" | "instanceof" | "of"),
        TokenKind::Number(_) | TokenKind::Str(_) | TokenKind::Template(_) | TokenKind::Regex(_) => {
            true
        }
        TokenKind::Punct("{") => !stream.is(i - 1, ")"),
        TokenKind::Punct("++" | "--" | "!" | "~") => true,
        TokenKind::Punct(_) => false,
    }
}

fn continues_previous(stream: &TokenStream, i: usize) -> bool {
    match stream.word(i) {
        Some("catch" | "finally" | "else") => true,
        Some("while") => stream.is(i - 1, "}") && opener_preceded_by(stream, i - 1, &["do"]),
        _ => false,
    }
}

/// Whether the `)` at `close` ends an `if`/`while`/`for` header, and is
/// therefore followed by a body rather than ending a statement.
fn awaits_body(stream: &TokenStream, close: usize) -> bool {
    let Some(open) = stream.opening(close) else {
        return false;
    };
    if open == 0 {
        return false;
    }
    match stream.word(open - 1) {
        Some("if" | "for") => true,
        // `do { } while (x)` is complete; a plain `while (x)` awaits its body.
        Some("while") => {
            !(open >= 2 && stream.is(open - 2, "}") && opener_preceded_by(stream, open - 2, &["do"]))
        }
        _ => false,
    }
}

fn opener_preceded_by(stream: &TokenStream, close: usize, words: &[&str]) -> bool {
    stream
        .opening(close)
        .and_then(|o| o.checked_sub(1))
        .and_then(|prev| stream.word(prev))
        .is_some_and(|w| words.contains(&w))
}
