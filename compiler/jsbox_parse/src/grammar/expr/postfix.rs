//! Member access, calls and postfix updates.

use jsbox_ir::{Node, Opcode};

use crate::grammar::Parser;
use crate::lexeme::TokenKind;
use crate::ParseError;

impl Parser<'_> {
    /// Apply `.name`, `?.name`, `[key]`, `(args)`, `?.(args)` and postfix
    /// `++`/`--` to `node` starting at `pos`.
    pub(super) fn postfix(
        &self,
        mut node: Node,
        mut pos: usize,
        to: usize,
    ) -> Result<(Node, usize), ParseError> {
        let s = self.stream;
        while pos < to {
            let Some(TokenKind::Punct(p)) = s.get(pos).map(|t| t.kind) else {
                if matches!(s.get(pos).map(|t| t.kind), Some(TokenKind::Template(_)))
                    && !s.newline_before(pos)
                {
                    return Err(ParseError::invalid(
                        "template",
                        "tagged templates are not supported",
                    ));
                }
                break;
            };
            match p {
                "." => {
                    let name = s.word(pos + 1).ok_or_else(|| self.err(pos + 1))?;
                    node = member(node, Node::Str(name.into()), false);
                    pos += 2;
                }
                "?." => {
                    if s.is(pos + 1, "(") {
                        let close = self.group(pos + 1, "(")?;
                        node = Node::Call {
                            callee: Box::new(node),
                            args: self.arguments(pos + 2, close)?,
                            optional: true,
                        };
                        pos = close + 1;
                    } else if s.is(pos + 1, "[") {
                        let close = self.group(pos + 1, "[")?;
                        let key = self.expression(pos + 2, close)?;
                        node = member(node, key, true);
                        pos = close + 1;
                    } else {
                        let name = s.word(pos + 1).ok_or_else(|| self.err(pos + 1))?;
                        node = member(node, Node::Str(name.into()), true);
                        pos += 2;
                    }
                }
                "[" => {
                    let close = self.group(pos, "[")?;
                    let key = self.expression(pos + 1, close)?;
                    node = member(node, key, false);
                    pos = close + 1;
                }
                "(" => {
                    let close = self.group(pos, "(")?;
                    node = Node::Call {
                        callee: Box::new(node),
                        args: self.arguments(pos + 1, close)?,
                        optional: false,
                    };
                    pos = close + 1;
                }
                "++" | "--" if s.is_postfix_update(pos) => {
                    if !node.is_assignable() {
                        return Err(ParseError::invalid(
                            "update",
                            "invalid operand for postfix update",
                        ));
                    }
                    let op = if p == "++" {
                        Opcode::PostInc
                    } else {
                        Opcode::PostDec
                    };
                    node = Node::Update {
                        op,
                        target: Box::new(node),
                    };
                    pos += 1;
                }
                _ => break,
            }
        }
        Ok((node, pos))
    }
}

fn member(object: Node, property: Node, optional: bool) -> Node {
    Node::Member {
        object: Box::new(object),
        property: Box::new(property),
        optional,
    }
}
