//! Compiled programs and function bodies.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use crate::{CodeSlice, Constants, Node};

/// A compiled script: hoisted top-level statements plus the constants table
/// they were built from. Immutable; clone it to share across executions.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub body: Rc<[Node]>,
    pub constants: Rc<Constants>,
}

impl Program {
    pub fn new(body: Vec<Node>, constants: Rc<Constants>) -> Self {
        Program {
            body: body.into(),
            constants,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// The statements of a function, parsed now or on first call.
#[derive(Debug, PartialEq)]
pub enum FunctionBody {
    Parsed(Rc<[Node]>),
    Deferred(DeferredBody),
}

impl FunctionBody {
    /// Statements if already parsed.
    pub fn parsed(&self) -> Option<Rc<[Node]>> {
        match self {
            FunctionBody::Parsed(body) => Some(Rc::clone(body)),
            FunctionBody::Deferred(deferred) => deferred.parsed.get().cloned(),
        }
    }
}

/// Raw, already-extracted body text kept until the function is first invoked.
pub struct DeferredBody {
    pub code: CodeSlice,
    pub constants: Rc<Constants>,
    /// Arrow function with an expression body (`x => x + 1`).
    pub expression: bool,
    /// Body of an `async` function, where `await` is allowed.
    pub is_async: bool,
    parsed: OnceCell<Rc<[Node]>>,
}

impl DeferredBody {
    pub fn new(code: CodeSlice, constants: Rc<Constants>, expression: bool, is_async: bool) -> Self {
        DeferredBody {
            code,
            constants,
            expression,
            is_async,
            parsed: OnceCell::new(),
        }
    }

    /// Parse on first use and cache the result; later calls reuse it.
    ///
    /// A failed parse is not cached, so the error resurfaces on every call.
    pub fn get_or_parse<E>(
        &self,
        parse: impl FnOnce(&DeferredBody) -> Result<Vec<Node>, E>,
    ) -> Result<Rc<[Node]>, E> {
        if let Some(body) = self.parsed.get() {
            return Ok(Rc::clone(body));
        }
        let body: Rc<[Node]> = parse(self)?.into();
        // A re-entrant parse of the same body may have filled the cell first.
        let _ = self.parsed.set(Rc::clone(&body));
        Ok(body)
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed.get().is_some()
    }
}

impl PartialEq for DeferredBody {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
            && self.expression == other.expression
            && self.is_async == other.is_async
    }
}

impl fmt::Debug for DeferredBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredBody")
            .field("code", &self.code.as_str())
            .field("expression", &self.expression)
            .field("is_async", &self.is_async)
            .field("parsed", &self.is_parsed())
            .finish()
    }
}
