//! Lexemes of extracted code.
//!
//! After constant extraction only words, numbers, placeholders and
//! punctuators remain, so tokenizing is a flat longest-match scan. Each
//! token records its absolute byte range in the backing buffer and whether
//! a line break precedes it, which is all automatic semicolon insertion
//! needs.

use jsbox_ir::CodeSlice;

use crate::ParseError;

/// Punctuators, longest first so a prefix never shadows a longer match.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".",
];

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Word,
    Number(f64),
    /// `"N"`: index into the string table.
    Str(usize),
    /// `` `N` ``: index into the template table.
    Template(usize),
    /// `@N@`: index into the regex table.
    Regex(usize),
    Punct(&'static str),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Absolute offsets in the backing buffer.
    pub start: usize,
    pub end: usize,
    pub newline_before: bool,
}

impl Token {
    #[inline]
    pub fn is_punct(&self, punct: &str) -> bool {
        matches!(self.kind, TokenKind::Punct(p) if p == punct)
    }
}

#[inline]
pub(crate) fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Split extracted code into tokens.
pub fn tokenize(code: &CodeSlice) -> Result<Vec<Token>, ParseError> {
    let text = code.as_bytes();
    let base = code.start();
    let mut tokens = Vec::with_capacity(text.len() / 3);
    let mut pos = 0;
    let mut newline_before = false;

    while pos < text.len() {
        let b = text[pos];
        if b == b'\n' || b == b'\r' {
            newline_before = true;
            pos += 1;
            continue;
        }
        if b.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        // Unicode line and paragraph separators.
        let rest = &text[pos..];
        if rest.starts_with("\u{2028}".as_bytes()) || rest.starts_with("\u{2029}".as_bytes()) {
            newline_before = true;
            pos += 3;
            continue;
        }

        let start = pos;
        let kind = if b.is_ascii_digit()
            || (b == b'.' && text.get(pos + 1).is_some_and(u8::is_ascii_digit))
        {
            let (value, end) = number(text, pos).ok_or_else(|| unexpected(code, pos))?;
            pos = end;
            TokenKind::Number(value)
        } else if is_word_byte(b) {
            while pos < text.len() && is_word_byte(text[pos]) {
                pos += 1;
            }
            TokenKind::Word
        } else if matches!(b, b'"' | b'`' | b'@') {
            let (index, end) = placeholder(text, pos).ok_or_else(|| unexpected(code, pos))?;
            pos = end;
            match b {
                b'"' => TokenKind::Str(index),
                b'`' => TokenKind::Template(index),
                _ => TokenKind::Regex(index),
            }
        } else {
            let rest = &text[pos..];
            // `a?.5:b` is a conditional, not optional chaining.
            let punct = PUNCTUATORS.iter().copied().find(|p| {
                rest.starts_with(p.as_bytes())
                    && (*p != "?." || !rest.get(2).is_some_and(u8::is_ascii_digit))
            });
            let Some(punct) = punct else {
                return Err(unexpected(code, pos));
            };
            pos += punct.len();
            TokenKind::Punct(punct)
        };

        tokens.push(Token {
            kind,
            start: base + start,
            end: base + pos,
            newline_before,
        });
        newline_before = false;
    }

    Ok(tokens)
}

fn unexpected(code: &CodeSlice, pos: usize) -> ParseError {
    ParseError::unexpected(code.skip(pos).as_str())
}

/// A `"N"` / `` `N` `` / `@N@` placeholder starting at `pos`.
fn placeholder(text: &[u8], pos: usize) -> Option<(usize, usize)> {
    let delimiter = text[pos];
    let digits_start = pos + 1;
    let mut end = digits_start;
    while text.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    if end == digits_start || text.get(end) != Some(&delimiter) {
        return None;
    }
    let index = std::str::from_utf8(&text[digits_start..end]).ok()?.parse().ok()?;
    Some((index, end + 1))
}

/// A numeric literal starting at `pos`; returns its value and end offset.
fn number(text: &[u8], pos: usize) -> Option<(f64, usize)> {
    let radix = match (text[pos], text.get(pos + 1).map(u8::to_ascii_lowercase)) {
        (b'0', Some(b'x')) => Some(16),
        (b'0', Some(b'o')) => Some(8),
        (b'0', Some(b'b')) => Some(2),
        _ => None,
    };

    if let Some(radix) = radix {
        let mut end = pos + 2;
        let mut value = 0f64;
        let mut any = false;
        while let Some(&b) = text.get(end) {
            if b == b'_' {
                end += 1;
                continue;
            }
            let Some(digit) = char::from(b).to_digit(radix) else {
                break;
            };
            value = value * f64::from(radix) + f64::from(digit);
            any = true;
            end += 1;
        }
        if !any || text.get(end).is_some_and(|&b| is_word_byte(b)) {
            return None;
        }
        return Some((value, end));
    }

    let mut end = pos;
    let digits = |end: &mut usize| {
        while text
            .get(*end)
            .is_some_and(|&b| b.is_ascii_digit() || b == b'_')
        {
            *end += 1;
        }
    };
    digits(&mut end);
    if text.get(end) == Some(&b'.') {
        end += 1;
        digits(&mut end);
    }
    if matches!(text.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(text.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        if text.get(exp_end).is_some_and(u8::is_ascii_digit) {
            end = exp_end;
            digits(&mut end);
        }
    }
    if text.get(end).is_some_and(|&b| is_word_byte(b)) {
        return None;
    }
    let literal: String = text[pos..end]
        .iter()
        .filter(|&&b| b != b'_')
        .map(|&b| char::from(b))
        .collect();
    let value = literal.parse().ok()?;
    Some((value, end))
}

#[cfg(test)]
mod tests;
