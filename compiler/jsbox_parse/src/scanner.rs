//! The expression scanner.
//!
//! A [`TokenStream`] is built once per buffer. Building it matches every
//! bracket and runs automatic semicolon insertion, so the grammar can find the
//! end of any expression with [`TokenStream::rest_of_exp`] by skipping whole
//! bracket groups in one step instead of re-scanning them on every attempt.

use rustc_hash::{FxHashMap, FxHashSet};

use jsbox_ir::CodeSlice;

use crate::lexeme::{tokenize, Token, TokenKind};
use crate::{semicolons, ParseError};

/// Words that cannot end a value, so a following operator is unary and a
/// following line break never ends the statement.
const NON_VALUE_WORDS: &[&str] = &[
    "in",
    "instanceof",
    "typeof",
    "void",
    "delete",
    "new",
    "await",
    "else",
    "do",
    "case",
    "var",
    "let",
    "const",
    "if",
    "for",
    "while",
    "switch",
    "try",
    "catch",
    "finally",
    "function",
    "throw",
    "of",
];

/// Tokens of one buffer with bracket matches and inserted semicolons.
pub struct TokenStream {
    code: CodeSlice,
    tokens: Vec<Token>,
    /// Opening bracket index to closing bracket index.
    closing: FxHashMap<usize, usize>,
    /// Closing bracket index to opening bracket index.
    opening: FxHashMap<usize, usize>,
    /// Indices of tokens preceded by an inserted semicolon.
    inserted: FxHashSet<usize>,
}

impl TokenStream {
    pub fn new(code: CodeSlice) -> Result<Self, ParseError> {
        let tokens = tokenize(&code)?;
        let mut stream = TokenStream {
            code,
            tokens,
            closing: FxHashMap::default(),
            opening: FxHashMap::default(),
            inserted: FxHashSet::default(),
        };
        stream.match_brackets()?;
        stream.inserted = semicolons::insert(&stream);
        tracing::trace!(
            tokens = stream.tokens.len(),
            inserted = stream.inserted.len(),
            "scanned buffer"
        );
        Ok(stream)
    }

    fn match_brackets(&mut self) -> Result<(), ParseError> {
        let mut open: Vec<(usize, char)> = Vec::new();
        for (i, token) in self.tokens.iter().enumerate() {
            let TokenKind::Punct(p) = token.kind else {
                continue;
            };
            match p {
                "(" | "[" | "{" => open.push((i, p.chars().next().unwrap_or('('))),
                ")" | "]" | "}" => {
                    let expected = match p {
                        ")" => '(',
                        "]" => '[',
                        _ => '{',
                    };
                    match open.pop() {
                        Some((start, ch)) if ch == expected => {
                            self.closing.insert(start, i);
                            self.opening.insert(i, start);
                        }
                        Some((_, ch)) => return Err(ParseError::UnbalancedBracket { open: ch }),
                        None => return Err(ParseError::unexpected(self.rest_text(i))),
                    }
                }
                _ => {}
            }
        }
        match open.pop() {
            Some((_, ch)) => Err(ParseError::UnbalancedBracket { open: ch }),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<&Token> {
        self.tokens.get(i)
    }

    /// Source text of token `i`.
    pub fn text(&self, i: usize) -> &str {
        match self.tokens.get(i) {
            Some(t) => self.absolute(t.start, t.end),
            None => "",
        }
    }

    fn absolute(&self, start: usize, end: usize) -> &str {
        let base = self.code.start();
        self.code
            .as_str()
            .get(start - base..end - base)
            .unwrap_or("")
    }

    /// Text from token `i` to the end of the buffer.
    pub fn rest_text(&self, i: usize) -> &str {
        match self.tokens.get(i) {
            Some(t) => self.absolute(t.start, self.code.end()),
            None => "",
        }
    }

    /// Whether token `i` is the punctuator `punct`.
    #[inline]
    pub fn is(&self, i: usize, punct: &str) -> bool {
        self.tokens.get(i).is_some_and(|t| t.is_punct(punct))
    }

    /// The word at `i`, if token `i` is a word.
    #[inline]
    pub fn word(&self, i: usize) -> Option<&str> {
        match self.tokens.get(i) {
            Some(t) if t.kind == TokenKind::Word => Some(self.text(i)),
            _ => None,
        }
    }

    #[inline]
    pub fn is_word(&self, i: usize, word: &str) -> bool {
        self.word(i) == Some(word)
    }

    /// Index of the bracket closing the one opened at `i`.
    #[inline]
    pub fn closing(&self, i: usize) -> Option<usize> {
        self.closing.get(&i).copied()
    }

    /// Index of the bracket opening the one closed at `i`.
    #[inline]
    pub fn opening(&self, i: usize) -> Option<usize> {
        self.opening.get(&i).copied()
    }

    /// Whether a semicolon was inserted before token `i`.
    #[inline]
    pub fn semicolon_before(&self, i: usize) -> bool {
        self.inserted.contains(&i)
    }

    #[inline]
    pub fn newline_before(&self, i: usize) -> bool {
        self.tokens.get(i).is_some_and(|t| t.newline_before)
    }

    /// Whether token `i` can be the last token of a value, making a
    /// following operator binary.
    pub fn ends_value(&self, i: usize) -> bool {
        let Some(token) = self.tokens.get(i) else {
            return false;
        };
        match token.kind {
            TokenKind::Word => !NON_VALUE_WORDS.contains(&self.text(i)) || self.after_dot(i),
            TokenKind::Number(_)
            | TokenKind::Str(_)
            | TokenKind::Template(_)
            | TokenKind::Regex(_) => true,
            TokenKind::Punct(")" | "]" | "}") => true,
            TokenKind::Punct("++" | "--") => self.is_postfix_update(i),
            TokenKind::Punct(_) => false,
        }
    }

    /// Whether the `++`/`--` at `i` applies to the preceding operand.
    pub fn is_postfix_update(&self, i: usize) -> bool {
        let Some(token) = self.tokens.get(i) else {
            return false;
        };
        i > 0
            && !token.newline_before
            && !matches!(self.tokens[i - 1].kind, TokenKind::Punct("++" | "--"))
            && self.ends_value(i - 1)
    }

    /// Whether the word at `i` is a property name (`a.in`, `a?.default`).
    pub fn after_dot(&self, i: usize) -> bool {
        i > 0 && (self.is(i - 1, ".") || self.is(i - 1, "?."))
    }

    /// Scan `from..to` for the end of an expression.
    ///
    /// Returns the index of the first top-level token for which `stop`
    /// holds, the first token preceded by an inserted semicolon, or `to`.
    /// Bracket groups are skipped whole. The first token is never treated as
    /// an inserted-semicolon boundary.
    pub fn rest_of_exp(&self, from: usize, to: usize, stop: impl Fn(usize) -> bool) -> usize {
        let mut i = from;
        while i < to {
            if i > from && self.semicolon_before(i) {
                return i;
            }
            if stop(i) {
                return i;
            }
            i = match self.closing(i) {
                Some(close) if close < to => close + 1,
                _ => i + 1,
            };
        }
        to
    }

    /// Split `from..to` at top-level occurrences of `punct`.
    ///
    /// Returns `(start, end)` pairs; empty segments are kept.
    pub fn split(&self, from: usize, to: usize, punct: &str) -> Vec<(usize, usize)> {
        let mut parts = Vec::new();
        let mut start = from;
        let mut i = from;
        while i < to {
            if self.is(i, punct) {
                parts.push((start, i));
                start = i + 1;
                i += 1;
                continue;
            }
            i = match self.closing(i) {
                Some(close) if close < to => close + 1,
                _ => i + 1,
            };
        }
        parts.push((start, to));
        parts
    }

    /// Source slice covering tokens `from..to`, sharing this buffer.
    pub fn slice(&self, from: usize, to: usize) -> CodeSlice {
        let base = self.code.start();
        let start = self.tokens.get(from).map_or(self.code.end(), |t| t.start);
        let end = if to > from {
            self.tokens.get(to - 1).map_or(start, |t| t.end)
        } else {
            start
        };
        self.code.slice(start - base, end - base)
    }

    /// A syntax error pointing at token `i`.
    #[cold]
    pub fn error_at(&self, i: usize) -> ParseError {
        ParseError::unexpected(self.rest_text(i))
    }
}

#[cfg(test)]
mod tests;
