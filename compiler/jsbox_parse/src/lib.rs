//! Parser for jsbox scripts.
//!
//! Compilation runs in three passes over one shared buffer:
//!
//! 1. [`extract`] strips comments and interns string, template and regex
//!    literals into a [`Constants`](jsbox_ir::Constants) table.
//! 2. The scanner tokenizes the rewritten text, matches brackets and marks
//!    the statement boundaries implied by line breaks.
//! 3. The grammar builds the tagged tree by repeatedly locating the end of
//!    the next construct with the scanner and re-entering itself on each
//!    sub-span; `var` and function declarations are then hoisted.
//!
//! The result is an immutable [`Program`]. Function bodies can be left
//! unparsed until first call with [`ParseOptions::lazy_functions`].

mod error;
mod extract;
mod grammar;
mod hoist;
mod lexeme;
mod scanner;
mod semicolons;

use std::rc::Rc;

use jsbox_ir::{DeferredBody, Node, Program};

pub use error::{ParseError, CONTEXT_LEN};
pub use extract::{extract, Extracted};

use grammar::Parser;
use scanner::TokenStream;

/// Parser configuration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep function bodies as raw text and parse them on first call.
    pub lazy_functions: bool,
}

impl ParseOptions {
    #[must_use]
    pub fn lazy_functions(mut self, lazy: bool) -> Self {
        self.lazy_functions = lazy;
        self
    }
}

/// Compile a script with default options.
pub fn compile(source: &str) -> Result<Program, ParseError> {
    compile_with(source, ParseOptions::default())
}

/// Compile a script.
#[tracing::instrument(level = "trace", skip_all, fields(len = source.len()))]
pub fn compile_with(source: &str, options: ParseOptions) -> Result<Program, ParseError> {
    let Extracted { code, constants } = extract(source)?;
    let constants = Rc::new(constants);
    let stream = TokenStream::new(code)?;
    let parser = Parser::new(&stream, &constants, options);
    let body = parser.function_body(0, stream.len())?;
    tracing::debug!(statements = body.len(), lazy = options.lazy_functions, "compiled program");
    Ok(Program::new(body, constants))
}

/// Parse a function body that was deferred at compile time.
///
/// Nested functions inside it stay deferred.
pub fn parse_deferred(body: &DeferredBody) -> Result<Vec<Node>, ParseError> {
    let stream = TokenStream::new(body.code.clone())?;
    let parser = Parser::new(
        &stream,
        &body.constants,
        ParseOptions {
            lazy_functions: true,
        },
    )
    .in_function(body.is_async);
    tracing::trace!(len = body.code.len(), expression = body.expression, "parsing deferred body");
    if body.expression {
        let value = parser.expression(0, stream.len())?;
        Ok(vec![Node::Return(Some(Box::new(value)))])
    } else {
        parser.function_body(0, stream.len())
    }
}
