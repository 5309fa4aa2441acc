//! Expressions.
//!
//! Precedence is expressed through terminator sets: the right operand of a
//! binary operator extends up to the next top-level operator that binds no
//! tighter than it (strictly looser for the right-associative `**`). The
//! resulting left fold makes this precedence climbing without a recursive
//! level per operator.

mod postfix;
mod primary;

use std::cell::Cell;

use jsbox_ir::{LogicalOp, Node, Opcode};
use jsbox_stack::ensure_sufficient_stack;

use super::Parser;
use crate::lexeme::TokenKind;
use crate::ParseError;

/// Precedence of `**`, the only right-associative binary operator.
const EXPONENT: u8 = 11;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum BinaryKind {
    Op(Opcode),
    Logical(LogicalOp),
}

/// Binding power of a binary operator spelling; larger binds tighter.
fn precedence(symbol: &str) -> Option<(BinaryKind, u8)> {
    if let Some(op) = LogicalOp::from_symbol(symbol) {
        if symbol.ends_with('=') {
            return None;
        }
        let prec = if op == LogicalOp::And { 2 } else { 1 };
        return Some((BinaryKind::Logical(op), prec));
    }
    let op = Opcode::binary(symbol)?;
    let prec = match op {
        Opcode::BitOr => 3,
        Opcode::BitXor => 4,
        Opcode::BitAnd => 5,
        Opcode::Eq | Opcode::NotEq | Opcode::StrictEq | Opcode::StrictNotEq => 6,
        Opcode::Lt
        | Opcode::LtEq
        | Opcode::Gt
        | Opcode::GtEq
        | Opcode::In
        | Opcode::InstanceOf => 7,
        Opcode::Shl | Opcode::Shr | Opcode::UShr => 8,
        Opcode::Add | Opcode::Sub => 9,
        Opcode::Mul | Opcode::Div | Opcode::Rem => 10,
        Opcode::Exp => EXPONENT,
        _ => return None,
    };
    Some((BinaryKind::Op(op), prec))
}

impl Parser<'_> {
    /// A full expression, including top-level commas.
    pub(crate) fn expression(&self, from: usize, to: usize) -> Result<Node, ParseError> {
        if from >= to {
            return Err(self.err(to));
        }
        let parts = self.stream.split(from, to, ",");
        if parts.len() == 1 {
            return self.assignment(from, to);
        }
        let mut nodes = Vec::with_capacity(parts.len());
        for (a, b) in parts {
            if a >= b {
                return Err(self.err(a));
            }
            nodes.push(self.assignment(a, b)?);
        }
        Ok(Node::Sequence(nodes))
    }

    /// An expression without top-level commas: arrow, assignment,
    /// conditional or binary chain.
    pub(crate) fn assignment(&self, from: usize, to: usize) -> Result<Node, ParseError> {
        ensure_sufficient_stack(|| self.assignment_inner(from, to))
    }

    fn assignment_inner(&self, from: usize, to: usize) -> Result<Node, ParseError> {
        if from >= to {
            return Err(self.err(from));
        }
        if let Some(arrow) = self.arrow(from, to)? {
            return Ok(arrow);
        }

        let s = self.stream;
        let split = s.rest_of_exp(from, to, |i| {
            i > from && (s.is(i, "?") || self.assignment_operator(i).is_some())
        });
        if split >= to {
            return self.binary(from, to);
        }
        if s.is(split, "?") {
            return self.conditional(from, split, to);
        }
        let Some(kind) = self.assignment_operator(split) else {
            return Err(self.err(split));
        };

        let target = self.binary(from, split)?;
        if !target.is_assignable() {
            return Err(ParseError::invalid(
                "assignment",
                format!("invalid assignment target before '{}'", s.text(split)),
            ));
        }
        let target = Box::new(target);
        let value = Box::new(self.assignment(split + 1, to)?);
        Ok(match kind {
            AssignKind::Op(op) => Node::Assign { op, target, value },
            AssignKind::Logical(op) => Node::LogicalAssign { op, target, value },
        })
    }

    /// `test ? consequent : alternate` with the `?` at `question`.
    fn conditional(&self, from: usize, question: usize, to: usize) -> Result<Node, ParseError> {
        let s = self.stream;
        let nested = Cell::new(0usize);
        let colon = s.rest_of_exp(question + 1, to, |i| {
            if s.is(i, "?") {
                nested.set(nested.get() + 1);
            } else if s.is(i, ":") {
                if nested.get() == 0 {
                    return true;
                }
                nested.set(nested.get() - 1);
            }
            false
        });
        if !s.is(colon, ":") || colon >= to {
            return Err(ParseError::invalid("conditional", "missing ':' in conditional"));
        }
        let test = self.binary(from, question)?;
        let consequent = self.assignment(question + 1, colon)?;
        let alternate = self.assignment(colon + 1, to)?;
        Ok(Node::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn assignment_operator(&self, i: usize) -> Option<AssignKind> {
        let TokenKind::Punct(p) = self.stream.get(i)?.kind else {
            return None;
        };
        if let Some(op) = Opcode::assignment(p) {
            return Some(AssignKind::Op(op));
        }
        match p {
            "&&=" | "||=" | "??=" => LogicalOp::from_symbol(p).map(AssignKind::Logical),
            _ => None,
        }
    }

    /// The binary operator at `i`, if `i` is in operator position.
    fn binary_operator(&self, i: usize) -> Option<(BinaryKind, u8)> {
        let s = self.stream;
        if i == 0 || !s.ends_value(i - 1) {
            return None;
        }
        match s.get(i)?.kind {
            TokenKind::Punct(p) => precedence(p),
            TokenKind::Word if !s.after_dot(i) => precedence(s.text(i)),
            _ => None,
        }
    }

    /// A chain of unary operands joined by binary operators.
    fn binary(&self, from: usize, to: usize) -> Result<Node, ParseError> {
        let s = self.stream;
        let (mut left, mut pos) = self.unary(from, to)?;
        while pos < to {
            let Some((kind, prec)) = self.binary_operator(pos) else {
                return Err(self.err(pos));
            };
            let operand = pos + 1;
            let end = s.rest_of_exp(operand, to, |i| {
                i > operand
                    && self.binary_operator(i).is_some_and(|(_, p)| {
                        if prec == EXPONENT {
                            p < prec
                        } else {
                            p <= prec
                        }
                    })
            });
            let right = ensure_sufficient_stack(|| self.binary(operand, end))?;
            left = match kind {
                BinaryKind::Op(op) => Node::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                BinaryKind::Logical(op) => Node::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
            pos = end;
        }
        Ok(left)
    }

    /// Prefix operators applied to a postfix chain. Returns the node and the
    /// index after it.
    fn unary(&self, from: usize, to: usize) -> Result<(Node, usize), ParseError> {
        ensure_sufficient_stack(|| self.unary_inner(from, to))
    }

    fn unary_inner(&self, from: usize, to: usize) -> Result<(Node, usize), ParseError> {
        let s = self.stream;
        if from >= to {
            return Err(self.err(from));
        }
        let Some(token) = s.get(from) else {
            return Err(ParseError::UnexpectedEnd);
        };

        let op = match token.kind {
            TokenKind::Punct("!") => Some(Opcode::Not),
            TokenKind::Punct("~") => Some(Opcode::BitNot),
            TokenKind::Punct("-") => Some(Opcode::Neg),
            TokenKind::Punct("+") => Some(Opcode::Plus),
            TokenKind::Punct("++") => Some(Opcode::PreInc),
            TokenKind::Punct("--") => Some(Opcode::PreDec),
            TokenKind::Word => match s.text(from) {
                "typeof" => Some(Opcode::Typeof),
                "void" => Some(Opcode::Void),
                "delete" => Some(Opcode::Delete),
                "await" => {
                    if !self.await_allowed.get() {
                        return Err(ParseError::invalid(
                            "await",
                            "only valid in async functions and at the top level",
                        ));
                    }
                    let (operand, next) = self.unary(from + 1, to)?;
                    return Ok((Node::Await(Box::new(operand)), next));
                }
                "new" => return self.new_expression(from, to),
                _ => None,
            },
            _ => None,
        };

        match op {
            Some(op @ (Opcode::PreInc | Opcode::PreDec)) => {
                let (target, next) = self.unary(from + 1, to)?;
                if !target.is_assignable() {
                    return Err(ParseError::invalid(
                        "update",
                        "invalid operand for prefix update",
                    ));
                }
                Ok((
                    Node::Update {
                        op,
                        target: Box::new(target),
                    },
                    next,
                ))
            }
            Some(op) => {
                let (operand, next) = self.unary(from + 1, to)?;
                Ok((
                    Node::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    next,
                ))
            }
            None => {
                let (node, next) = self.primary(from, to)?;
                self.postfix(node, next, to)
            }
        }
    }

    /// Comma-separated call arguments in `from..to`, allowing spread and a
    /// trailing comma.
    fn arguments(&self, from: usize, to: usize) -> Result<Vec<Node>, ParseError> {
        if from >= to {
            return Ok(Vec::new());
        }
        let s = self.stream;
        let parts = s.split(from, to, ",");
        let last = parts.len() - 1;
        let mut args = Vec::with_capacity(parts.len());
        for (index, (a, b)) in parts.into_iter().enumerate() {
            if a >= b {
                if index == last && index > 0 {
                    break;
                }
                return Err(self.err(a));
            }
            args.push(self.element(a, b)?);
        }
        Ok(args)
    }

    /// One argument or array element, possibly spread.
    fn element(&self, from: usize, to: usize) -> Result<Node, ParseError> {
        if self.stream.is(from, "...") {
            Ok(Node::Spread(Box::new(self.assignment(from + 1, to)?)))
        } else {
            self.assignment(from, to)
        }
    }
}

/// `=`/compound assignment, or `&&=`/`||=`/`??=`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum AssignKind {
    Op(Opcode),
    Logical(LogicalOp),
}
