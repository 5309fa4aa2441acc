//! Statements.

use std::rc::Rc;

use jsbox_ir::{
    DeclKind, FunctionKind, LoopAction, LoopBinding, LoopIteration, LoopNode, Node, SwitchCase,
    SwitchNode, TryNode,
};
use jsbox_stack::ensure_sufficient_stack;

use super::{is_reserved, Parser};
use crate::{hoist, ParseError};

impl Parser<'_> {
    /// Parse `from..to` as a statement list, without hoisting.
    pub(crate) fn statements(&self, from: usize, to: usize) -> Result<Vec<Node>, ParseError> {
        let mut out = Vec::new();
        let mut pos = from;
        while pos < to {
            pos = self.statement(pos, to, &mut out)?;
        }
        Ok(out)
    }

    /// Parse a function or program body and hoist its declarations.
    pub(crate) fn function_body(&self, from: usize, to: usize) -> Result<Vec<Node>, ParseError> {
        Ok(hoist::hoist(self.statements(from, to)?))
    }

    /// Statements of a braced block opened at `open`, with function
    /// declarations moved to the front. Returns them with the index after `}`.
    fn block(&self, open: usize) -> Result<(Vec<Node>, usize), ParseError> {
        let close = self.group(open, "{")?;
        let body = hoist::hoist_functions(self.statements(open + 1, close)?);
        Ok((body, close + 1))
    }

    /// Parse one statement at `pos`, appending its nodes to `out`.
    /// Returns the index after the statement.
    fn statement(&self, pos: usize, to: usize, out: &mut Vec<Node>) -> Result<usize, ParseError> {
        ensure_sufficient_stack(|| self.statement_inner(pos, to, out))
    }

    fn statement_inner(
        &self,
        pos: usize,
        to: usize,
        out: &mut Vec<Node>,
    ) -> Result<usize, ParseError> {
        let s = self.stream;
        if s.is(pos, ";") {
            return Ok(pos + 1);
        }
        if s.is(pos, "{") {
            let (body, next) = self.block(pos)?;
            out.push(Node::Block(body));
            return Ok(next);
        }

        if let Some(word) = s.word(pos) {
            if s.is(pos + 1, ":") && !is_reserved(word) {
                return self.labeled(pos, to, out);
            }
            match word {
                "var" | "let" | "const" => {
                    let kind = DeclKind::from_keyword(word).unwrap_or(DeclKind::Var);
                    let end = self.statement_end(pos + 1, to);
                    out.extend(self.declarations(kind, pos + 1, end)?);
                    return Ok(self.finish(end));
                }
                "if" => {
                    let (node, next) = self.if_statement(pos, to)?;
                    out.push(node);
                    return Ok(next);
                }
                "for" | "while" | "do" | "switch" => {
                    let (node, next) = self.breakable(pos, to, None)?;
                    out.push(node);
                    return Ok(next);
                }
                "try" => {
                    let (node, next) = self.try_statement(pos)?;
                    out.push(node);
                    return Ok(next);
                }
                "return" => {
                    let (value, next) = self.optional_value(pos + 1, to)?;
                    out.push(Node::Return(value.map(Box::new)));
                    return Ok(next);
                }
                "throw" => {
                    let (value, next) = self.optional_value(pos + 1, to)?;
                    let value = value.ok_or_else(|| self.err(pos + 1))?;
                    out.push(Node::Throw(Box::new(value)));
                    return Ok(next);
                }
                "break" | "continue" => {
                    let action = if word == "break" {
                        LoopAction::Break
                    } else {
                        LoopAction::Continue
                    };
                    let label = match s.word(pos + 1) {
                        Some(label)
                            if pos + 1 < to && !s.newline_before(pos + 1) && !is_reserved(label) =>
                        {
                            Some(Rc::from(label))
                        }
                        _ => None,
                    };
                    let next = pos + 1 + usize::from(label.is_some());
                    out.push(Node::LoopAction { action, label });
                    return Ok(self.finish(next));
                }
                "function" => {
                    return self.function_declaration(pos, to, out);
                }
                "async" if s.is_word(pos + 1, "function") && !s.newline_before(pos + 1) => {
                    return self.function_declaration(pos, to, out);
                }
                _ => {}
            }
        }

        let end = self.statement_end(pos, to);
        if end == pos {
            return Err(self.err(pos));
        }
        out.push(self.expression(pos, end)?);
        Ok(self.finish(end))
    }

    /// End of the simple statement starting at `from`: the next top-level
    /// `;`, inserted semicolon, or a stray `else` continuing an `if`.
    fn statement_end(&self, from: usize, to: usize) -> usize {
        let s = self.stream;
        s.rest_of_exp(from, to, |i| {
            s.is(i, ";") || (s.is_word(i, "else") && !s.after_dot(i))
        })
    }

    /// Step over the `;` ending a statement, if present.
    fn finish(&self, end: usize) -> usize {
        if self.stream.is(end, ";") {
            end + 1
        } else {
            end
        }
    }

    /// The optional operand of `return`/`throw`.
    fn optional_value(&self, from: usize, to: usize) -> Result<(Option<Node>, usize), ParseError> {
        let s = self.stream;
        if from >= to || s.is(from, ";") || s.semicolon_before(from) || s.is(from, "}") {
            return Ok((None, self.finish(from)));
        }
        let end = self.statement_end(from, to);
        let value = self.expression(from, end)?;
        Ok((Some(value), self.finish(end)))
    }

    /// `name = value, name2, ...` after a `var`/`let`/`const` keyword.
    pub(super) fn declarations(
        &self,
        kind: DeclKind,
        from: usize,
        to: usize,
    ) -> Result<Vec<Node>, ParseError> {
        let s = self.stream;
        let mut out = Vec::new();
        for (a, b) in s.split(from, to, ",") {
            let name = self.identifier(a)?;
            let value = if b == a + 1 {
                if kind == DeclKind::Const {
                    return Err(ParseError::invalid(
                        "declaration",
                        format!("missing initializer in const declaration '{name}'"),
                    ));
                }
                None
            } else {
                self.expect(a + 1, "=")?;
                Some(Box::new(self.assignment(a + 2, b)?))
            };
            out.push(Node::Declare { kind, name, value });
        }
        Ok(out)
    }

    /// A single statement used as a body, wrapping multiple nodes in a block.
    fn single_statement(&self, pos: usize, to: usize) -> Result<(Node, usize), ParseError> {
        if pos >= to {
            return Err(ParseError::UnexpectedEnd);
        }
        let mut nodes = Vec::new();
        let next = self.statement(pos, to, &mut nodes)?;
        let node = match nodes.len() {
            0 => Node::Empty,
            1 => nodes.pop().unwrap_or(Node::Empty),
            _ => Node::Block(nodes),
        };
        Ok((node, next))
    }

    fn if_statement(&self, pos: usize, to: usize) -> Result<(Node, usize), ParseError> {
        let close = self.group(pos + 1, "(")?;
        let test = self.expression(pos + 2, close)?;
        let (consequent, mut next) = self.single_statement(close + 1, to)?;
        let mut alternate = None;
        if self.stream.is_word(next, "else") {
            let (node, after) = self.single_statement(next + 1, to)?;
            alternate = Some(Box::new(node));
            next = after;
        }
        Ok((
            Node::If {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate,
            },
            next,
        ))
    }

    fn labeled(&self, pos: usize, to: usize, out: &mut Vec<Node>) -> Result<usize, ParseError> {
        let label = self.identifier(pos)?;
        let at = pos + 2;
        match self.stream.word(at) {
            Some("for" | "while" | "do" | "switch") => {
                let (node, next) = self.breakable(at, to, Some(label))?;
                out.push(node);
                Ok(next)
            }
            _ => Err(ParseError::invalid(
                "label",
                format!("label '{label}' must precede a loop or switch"),
            )),
        }
    }

    /// Loops and `switch`, which can carry a label.
    fn breakable(
        &self,
        pos: usize,
        to: usize,
        label: Option<Rc<str>>,
    ) -> Result<(Node, usize), ParseError> {
        match self.stream.word(pos) {
            Some("for") => self.for_statement(pos, to, label),
            Some("while") => {
                let close = self.group(pos + 1, "(")?;
                let condition = self.expression(pos + 2, close)?;
                let (body, next) = self.loop_body(close + 1, to)?;
                Ok((
                    loop_node(LoopNode {
                        label,
                        check_first: true,
                        condition: Some(condition),
                        body,
                        ..counted()
                    }),
                    next,
                ))
            }
            Some("do") => {
                let (body, next) = self.loop_body(pos + 1, to)?;
                if !self.stream.is_word(next, "while") {
                    return Err(ParseError::invalid("do", "expected 'while' after do body"));
                }
                let close = self.group(next + 1, "(")?;
                let condition = self.expression(next + 2, close)?;
                Ok((
                    loop_node(LoopNode {
                        label,
                        check_first: false,
                        condition: Some(condition),
                        body,
                        ..counted()
                    }),
                    self.finish(close + 1),
                ))
            }
            Some("switch") => self.switch_statement(pos, label),
            _ => Err(self.err(pos)),
        }
    }

    fn loop_body(&self, pos: usize, to: usize) -> Result<(Vec<Node>, usize), ParseError> {
        let (node, next) = self.single_statement(pos, to)?;
        let body = match node {
            Node::Block(body) => body,
            Node::Empty => Vec::new(),
            other => vec![other],
        };
        Ok((body, next))
    }

    fn for_statement(
        &self,
        pos: usize,
        to: usize,
        label: Option<Rc<str>>,
    ) -> Result<(Node, usize), ParseError> {
        let s = self.stream;
        let open = pos + 1;
        let close = self.group(open, "(")?;
        let (body, next) = self.loop_body(close + 1, to)?;
        let head = open + 1;

        let kind = s.word(head).and_then(DeclKind::from_keyword);
        let name_at = head + usize::from(kind.is_some());
        let iteration = if name_at + 1 < close && s.word(name_at).is_some() {
            match s.word(name_at + 1) {
                Some("of") => Some(LoopIteration::ForOf),
                Some("in") => Some(LoopIteration::ForIn),
                _ => None,
            }
        } else {
            None
        };

        if let Some(iteration) = iteration {
            let name = self.identifier(name_at)?;
            let iterable = self.expression(name_at + 2, close)?;
            return Ok((
                loop_node(LoopNode {
                    label,
                    check_first: true,
                    iteration,
                    iterable: Some(iterable),
                    binding: Some(LoopBinding { kind, name }),
                    body,
                    ..counted()
                }),
                next,
            ));
        }

        let clauses = s.split(head, close, ";");
        let &[(init_from, init_to), (cond_from, cond_to), (step_from, step_to)] = clauses.as_slice()
        else {
            return Err(ParseError::invalid(
                "for",
                "expected 'for (init; condition; step)'",
            ));
        };
        let init = match kind {
            Some(kind) => self.declarations(kind, init_from + 1, init_to)?,
            None if init_from < init_to => vec![self.expression(init_from, init_to)?],
            None => Vec::new(),
        };
        let condition = self.optional_expression(cond_from, cond_to)?;
        let step = self.optional_expression(step_from, step_to)?;

        Ok((
            loop_node(LoopNode {
                label,
                check_first: true,
                init,
                condition,
                step,
                body,
                ..counted()
            }),
            next,
        ))
    }

    fn optional_expression(&self, from: usize, to: usize) -> Result<Option<Node>, ParseError> {
        if from < to {
            self.expression(from, to).map(Some)
        } else {
            Ok(None)
        }
    }

    fn switch_statement(
        &self,
        pos: usize,
        label: Option<Rc<str>>,
    ) -> Result<(Node, usize), ParseError> {
        let s = self.stream;
        let close = self.group(pos + 1, "(")?;
        let discriminant = self.expression(pos + 2, close)?;
        let open = close + 1;
        let end = self.group(open, "{")?;

        let mut cases = Vec::new();
        let mut i = open + 1;
        while i < end {
            let test = if s.is_word(i, "case") {
                let colon = s.rest_of_exp(i + 1, end, |j| s.is(j, ":"));
                self.expect(colon, ":")?;
                let test = self.expression(i + 1, colon)?;
                i = colon + 1;
                Some(test)
            } else if s.is_word(i, "default") {
                self.expect(i + 1, ":")?;
                i += 2;
                None
            } else {
                return Err(self.err(i));
            };

            let mut body = Vec::new();
            while i < end && !s.is_word(i, "case") && !s.is_word(i, "default") {
                i = self.statement(i, end, &mut body)?;
            }
            cases.push(SwitchCase { test, body });
        }

        Ok((
            Node::Switch(Box::new(SwitchNode {
                label,
                discriminant,
                cases,
            })),
            end + 1,
        ))
    }

    fn try_statement(&self, pos: usize) -> Result<(Node, usize), ParseError> {
        let s = self.stream;
        let (block, mut next) = self.block(pos + 1)?;

        let mut param = None;
        let mut handler = None;
        if s.is_word(next, "catch") {
            let mut open = next + 1;
            if s.is(open, "(") {
                param = Some(self.identifier(open + 1)?);
                self.expect(open + 2, ")")?;
                open += 3;
            }
            let (body, after) = self.block(open)?;
            handler = Some(body);
            next = after;
        }

        let mut finalizer = None;
        if s.is_word(next, "finally") {
            let (body, after) = self.block(next + 1)?;
            finalizer = Some(body);
            next = after;
        }

        if handler.is_none() && finalizer.is_none() {
            return Err(ParseError::invalid("try", "missing catch or finally after try"));
        }

        Ok((
            Node::Try(Box::new(TryNode {
                block,
                param,
                handler,
                finalizer,
            })),
            next,
        ))
    }

    fn function_declaration(
        &self,
        pos: usize,
        to: usize,
        out: &mut Vec<Node>,
    ) -> Result<usize, ParseError> {
        let (def, next) = self.function(pos, to, FunctionKind::Declaration)?;
        if def.name.is_none() {
            return Err(ParseError::invalid(
                "function",
                "function declarations require a name",
            ));
        }
        out.push(Node::Function(def));
        Ok(self.finish(next))
    }
}

fn loop_node(node: LoopNode) -> Node {
    Node::Loop(Box::new(node))
}

/// Defaults for a plain counted loop.
fn counted() -> LoopNode {
    LoopNode {
        label: None,
        check_first: true,
        iteration: LoopIteration::Counted,
        iterable: None,
        init: Vec::new(),
        step: None,
        condition: None,
        binding: None,
        body: Vec::new(),
    }
}
