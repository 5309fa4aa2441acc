//! Tree building.
//!
//! Every rule receives a token range `from..to` and either consumes it
//! exactly or returns the index where it stopped. Sub-ranges are found with
//! [`TokenStream::rest_of_exp`], which skips bracket groups whole and
//! honours inserted semicolons, so no rule has to handle line breaks.
//!
//! # Module Structure
//!
//! - `stmt.rs`: statements, blocks, loops, `switch`, `try`
//! - `expr/mod.rs`: comma, assignment, conditional and binary operators
//! - `expr/primary.rs`: literals, identifiers, arrays, objects, templates, `new`
//! - `expr/postfix.rs`: member access, calls, postfix updates
//! - `function.rs`: function and arrow literals, parameters, bodies

mod expr;
mod function;
mod stmt;

use std::cell::Cell;
use std::rc::Rc;

use jsbox_ir::Constants;

use crate::scanner::TokenStream;
use crate::{ParseError, ParseOptions};

/// Words that can never be identifiers.
const RESERVED: &[&str] = &[
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "default",
    "delete",
    "do",
    "else",
    "finally",
    "for",
    "function",
    "if",
    "in",
    "instanceof",
    "let",
    "new",
    "return",
    "switch",
    "throw",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
];

pub(crate) fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

/// Parser state for one token stream.
pub(crate) struct Parser<'a> {
    stream: &'a TokenStream,
    constants: &'a Rc<Constants>,
    options: ParseOptions,
    /// Inside an `async` function or at program top level.
    await_allowed: Cell<bool>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(
        stream: &'a TokenStream,
        constants: &'a Rc<Constants>,
        options: ParseOptions,
    ) -> Self {
        Parser {
            stream,
            constants,
            options,
            await_allowed: Cell::new(true),
        }
    }

    /// Allow `await` only when the enclosing code is `async`.
    pub(crate) fn in_function(self, is_async: bool) -> Self {
        self.await_allowed.set(is_async);
        self
    }

    /// Error for the token at `i`, or for running out of input.
    #[cold]
    fn err(&self, i: usize) -> ParseError {
        if i >= self.stream.len() {
            ParseError::UnexpectedEnd
        } else {
            self.stream.error_at(i)
        }
    }

    fn expect(&self, i: usize, punct: &str) -> Result<(), ParseError> {
        if self.stream.is(i, punct) {
            Ok(())
        } else {
            Err(self.err(i))
        }
    }

    /// Index of the bracket closing the one at `open`, which must be `punct`.
    fn group(&self, open: usize, punct: &str) -> Result<usize, ParseError> {
        self.expect(open, punct)?;
        self.stream.closing(open).ok_or_else(|| self.err(open))
    }

    /// An identifier at `i`.
    fn identifier(&self, i: usize) -> Result<Rc<str>, ParseError> {
        match self.stream.word(i) {
            Some(word) if !is_reserved(word) => Ok(word.into()),
            _ => Err(self.err(i)),
        }
    }
}

#[cfg(test)]
mod tests;
