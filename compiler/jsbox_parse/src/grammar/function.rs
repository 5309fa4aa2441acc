//! Function literals, methods and arrows.

use std::rc::Rc;

use jsbox_ir::{DeferredBody, FunctionBody, FunctionDef, FunctionKind, Node, Param};

use super::Parser;
use crate::ParseError;

impl Parser<'_> {
    /// `[async] function [name](params) { body }` starting at `from`.
    ///
    /// Returns the definition and the index after the closing brace.
    pub(super) fn function(
        &self,
        from: usize,
        to: usize,
        kind: FunctionKind,
    ) -> Result<(Rc<FunctionDef>, usize), ParseError> {
        let s = self.stream;
        let is_async = s.is_word(from, "async");
        let mut pos = from + usize::from(is_async);
        if !s.is_word(pos, "function") {
            return Err(self.err(pos));
        }
        pos += 1;
        if s.is(pos, "*") {
            return Err(ParseError::invalid(
                "function",
                "generator functions are not supported",
            ));
        }
        let name = if s.is(pos, "(") {
            None
        } else {
            let name = self.identifier(pos)?;
            pos += 1;
            Some(name)
        };
        let close = self.group(pos, "(")?;
        let params = self.params(pos + 1, close)?;
        let open = close + 1;
        let end = self.group(open, "{")?;
        if end >= to {
            return Err(self.err(to));
        }
        let def = FunctionDef {
            name,
            params,
            is_async,
            kind,
            body: self.body(open + 1, end, false, is_async)?,
        };
        Ok((Rc::new(def), end + 1))
    }

    /// Object literal method `key(params) { body }`; `paren` is the `(`.
    pub(super) fn method(
        &self,
        paren: usize,
        to: usize,
        is_async: bool,
        name: Option<Rc<str>>,
    ) -> Result<Node, ParseError> {
        let close = self.group(paren, "(")?;
        let params = self.params(paren + 1, close)?;
        let open = close + 1;
        let end = self.group(open, "{")?;
        if end + 1 != to {
            return Err(self.err(end + 1));
        }
        Ok(Node::Function(Rc::new(FunctionDef {
            name,
            params,
            is_async,
            kind: FunctionKind::Expression,
            body: self.body(open + 1, end, false, is_async)?,
        })))
    }

    /// An arrow function spanning exactly `from..to`, or `None` when the
    /// range does not start with an arrow head.
    pub(super) fn arrow(&self, from: usize, to: usize) -> Result<Option<Node>, ParseError> {
        let s = self.stream;
        let head = |at: usize| -> Option<usize> {
            if s.word(at).is_some() && s.is(at + 1, "=>") {
                Some(at + 1)
            } else if s.is(at, "(") {
                s.closing(at).filter(|&c| s.is(c + 1, "=>")).map(|c| c + 1)
            } else {
                None
            }
        };

        // `async => 1` is a plain arrow with a parameter called `async`.
        let is_async = s.is_word(from, "async")
            && !s.is(from + 1, "=>")
            && !s.newline_before(from + 1)
            && head(from + 1).is_some();
        let start = from + usize::from(is_async);
        let Some(arrow) = head(start) else {
            return Ok(None);
        };
        if arrow >= to {
            return Ok(None);
        }

        let params = if s.is(start, "(") {
            self.params(start + 1, arrow - 1)?
        } else {
            vec![Param {
                name: self.identifier(start)?,
                rest: false,
            }]
        };

        let body_at = arrow + 1;
        if body_at >= to {
            return Err(self.err(body_at));
        }
        let body = if s.is(body_at, "{") {
            let end = self.group(body_at, "{")?;
            if end + 1 != to {
                return Err(self.err(end + 1));
            }
            self.body(body_at + 1, end, false, is_async)?
        } else {
            self.body(body_at, to, true, is_async)?
        };

        Ok(Some(Node::Function(Rc::new(FunctionDef {
            name: None,
            params,
            is_async,
            kind: FunctionKind::Arrow,
            body,
        }))))
    }

    /// Parameter names in `from..to`; a rest parameter must come last.
    fn params(&self, from: usize, to: usize) -> Result<Vec<Param>, ParseError> {
        if from >= to {
            return Ok(Vec::new());
        }
        let s = self.stream;
        let parts = s.split(from, to, ",");
        let last = parts.len() - 1;
        let mut params = Vec::with_capacity(parts.len());
        for (index, (a, b)) in parts.into_iter().enumerate() {
            if a >= b {
                let after_rest = params.last().is_some_and(|p: &Param| p.rest);
                if index == last && index > 0 && !after_rest {
                    break;
                }
                return Err(self.err(a));
            }
            if params.last().is_some_and(|p: &Param| p.rest) {
                return Err(ParseError::invalid(
                    "parameter",
                    "a rest parameter must be last",
                ));
            }
            let rest = s.is(a, "...");
            let at = a + usize::from(rest);
            if s.is(at, "{") || s.is(at, "[") {
                return Err(ParseError::invalid(
                    "parameter",
                    "destructuring parameters are not supported",
                ));
            }
            let name = self.identifier(at)?;
            if at + 1 < b {
                if s.is(at + 1, "=") {
                    return Err(ParseError::invalid(
                        "parameter",
                        "default values are not supported",
                    ));
                }
                return Err(self.err(at + 1));
            }
            if params.iter().any(|p: &Param| p.name == name) {
                return Err(ParseError::invalid(
                    "parameter",
                    format!("duplicate parameter '{name}'"),
                ));
            }
            params.push(Param { name, rest });
        }
        Ok(params)
    }

    /// A function body in `from..to`, deferred when functions are lazy.
    ///
    /// An expression body becomes a single `return`.
    fn body(
        &self,
        from: usize,
        to: usize,
        expression: bool,
        is_async: bool,
    ) -> Result<FunctionBody, ParseError> {
        if self.options.lazy_functions {
            let code = self.stream.slice(from, to);
            return Ok(FunctionBody::Deferred(DeferredBody::new(
                code,
                Rc::clone(self.constants),
                expression,
                is_async,
            )));
        }
        let outer = self.await_allowed.replace(is_async);
        let nodes = if expression {
            self.expression(from, to)
                .map(|value| vec![Node::Return(Some(Box::new(value)))])
        } else {
            self.function_body(from, to)
        };
        self.await_allowed.set(outer);
        Ok(FunctionBody::Parsed(nodes?.into()))
    }
}
