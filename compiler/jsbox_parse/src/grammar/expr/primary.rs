//! Primary expressions: literals, identifiers, groups, arrays, objects,
//! templates and `new`.

use std::rc::Rc;

use jsbox_ir::{FunctionKind, Literal, Node, ObjectEntry, ObjectKey};

use crate::grammar::{is_reserved, Parser};
use crate::lexeme::TokenKind;
use crate::scanner::TokenStream;
use crate::ParseError;

impl Parser<'_> {
    /// A primary expression at `from`. Returns the node and the index after it.
    pub(super) fn primary(&self, from: usize, to: usize) -> Result<(Node, usize), ParseError> {
        let s = self.stream;
        let Some(token) = s.get(from).filter(|_| from < to) else {
            return Err(ParseError::UnexpectedEnd);
        };
        let node = match token.kind {
            TokenKind::Number(value) => Node::number(value),
            TokenKind::Str(index) => Node::Str(self.string(index)?),
            TokenKind::Template(index) => self.template(index)?,
            TokenKind::Regex(index) => Node::Regex(
                self.constants
                    .regex(index)
                    .cloned()
                    .ok_or_else(|| self.err(from))?,
            ),
            TokenKind::Punct("(") => {
                let close = self.group(from, "(")?;
                let inner = self.expression(from + 1, close)?;
                return Ok((inner, close + 1));
            }
            TokenKind::Punct("[") => return self.array(from),
            TokenKind::Punct("{") => return self.object(from),
            TokenKind::Word => match s.text(from) {
                "true" => Node::Literal(Literal::Bool(true)),
                "false" => Node::Literal(Literal::Bool(false)),
                "null" => Node::Literal(Literal::Null),
                "undefined" => Node::Literal(Literal::Undefined),
                "this" => Node::This,
                "function" => {
                    let (def, next) = self.function(from, to, FunctionKind::Expression)?;
                    return Ok((Node::Function(def), next));
                }
                "async" if s.is_word(from + 1, "function") => {
                    let (def, next) = self.function(from, to, FunctionKind::Expression)?;
                    return Ok((Node::Function(def), next));
                }
                word if is_reserved(word) => return Err(self.err(from)),
                word => Node::Ident(word.into()),
            },
            _ => return Err(self.err(from)),
        };
        Ok((node, from + 1))
    }

    pub(super) fn string(&self, index: usize) -> Result<Rc<str>, ParseError> {
        self.constants
            .string(index)
            .cloned()
            .ok_or_else(|| ParseError::invalid("string", format!("unknown constant {index}")))
    }

    /// A template literal; each interpolation is parsed from its own buffer.
    fn template(&self, index: usize) -> Result<Node, ParseError> {
        let template = self
            .constants
            .template(index)
            .ok_or_else(|| ParseError::invalid("template", format!("unknown constant {index}")))?;
        let mut parts = Vec::with_capacity(template.expressions.len());
        for code in &template.expressions {
            let stream = TokenStream::new(code.clone())?;
            if stream.is_empty() {
                return Err(ParseError::invalid(
                    "template",
                    "empty interpolation '${}'",
                ));
            }
            let parser = Parser::new(&stream, self.constants, self.options)
                .in_function(self.await_allowed.get());
            parts.push(parser.expression(0, stream.len())?);
        }
        Ok(Node::Template {
            quasis: template.quasis.iter().cloned().collect(),
            parts,
        })
    }

    fn array(&self, open: usize) -> Result<(Node, usize), ParseError> {
        let close = self.group(open, "[")?;
        let mut elements = Vec::new();
        if open + 1 < close {
            let parts = self.stream.split(open + 1, close, ",");
            let last = parts.len() - 1;
            for (index, (a, b)) in parts.into_iter().enumerate() {
                if a >= b {
                    // `[a, ]` has no trailing hole; `[a, , b]` does.
                    if index != last {
                        elements.push(Node::Literal(Literal::Undefined));
                    }
                    continue;
                }
                elements.push(self.element(a, b)?);
            }
        }
        Ok((Node::Array(elements), close + 1))
    }

    fn object(&self, open: usize) -> Result<(Node, usize), ParseError> {
        let s = self.stream;
        let close = self.group(open, "{")?;
        let mut entries = Vec::new();
        if open + 1 < close {
            let parts = s.split(open + 1, close, ",");
            let last = parts.len() - 1;
            for (index, (a, b)) in parts.into_iter().enumerate() {
                if a >= b {
                    if index == last && index > 0 {
                        break;
                    }
                    return Err(self.err(a));
                }
                entries.push(self.object_entry(a, b)?);
            }
        }
        Ok((Node::Object(entries), close + 1))
    }

    fn object_entry(&self, from: usize, to: usize) -> Result<ObjectEntry, ParseError> {
        let s = self.stream;
        if s.is(from, "...") {
            return Ok(ObjectEntry::Spread(self.assignment(from + 1, to)?));
        }

        // `async name() {}`, but not a property called `async`.
        let is_async = s.is_word(from, "async")
            && from + 1 < to
            && !s.is(from + 1, "(")
            && !s.is(from + 1, ":");
        let key_at = from + usize::from(is_async);

        let (key, key_end) = match s.get(key_at).map(|t| t.kind) {
            Some(TokenKind::Punct("[")) => {
                let close = self.group(key_at, "[")?;
                (
                    ObjectKey::Computed(self.expression(key_at + 1, close)?),
                    close + 1,
                )
            }
            Some(TokenKind::Word) => (ObjectKey::Static(s.text(key_at).into()), key_at + 1),
            Some(TokenKind::Str(index)) => (ObjectKey::Static(self.string(index)?), key_at + 1),
            Some(TokenKind::Number(value)) => {
                (ObjectKey::Static(number_key(value).into()), key_at + 1)
            }
            _ => return Err(self.err(key_at)),
        };

        if key_end == to && !is_async {
            return match (key, s.get(from).map(|t| t.kind)) {
                (ObjectKey::Static(name), Some(TokenKind::Word)) if !is_reserved(&name) => Ok(
                    ObjectEntry::Property(ObjectKey::Static(Rc::clone(&name)), Node::Ident(name)),
                ),
                _ => Err(self.err(from)),
            };
        }
        if s.is(key_end, ":") && !is_async {
            let value = self.assignment(key_end + 1, to)?;
            return Ok(ObjectEntry::Property(key, value));
        }
        if s.is(key_end, "(") {
            let name = match &key {
                ObjectKey::Static(name) => Some(Rc::clone(name)),
                ObjectKey::Computed(_) => None,
            };
            let method = self.method(key_end, to, is_async, name)?;
            return Ok(ObjectEntry::Property(key, method));
        }
        Err(self.err(key_end))
    }

    /// `new Callee(args)` or `new Callee`, followed by any postfix chain.
    pub(super) fn new_expression(
        &self,
        from: usize,
        to: usize,
    ) -> Result<(Node, usize), ParseError> {
        let s = self.stream;
        let (mut callee, mut pos) = if s.is_word(from + 1, "new") {
            self.new_expression(from + 1, to)?
        } else {
            self.primary(from + 1, to)?
        };
        while pos < to {
            if s.is(pos, ".") {
                let name = s.word(pos + 1).ok_or_else(|| self.err(pos + 1))?;
                callee = Node::Member {
                    object: Box::new(callee),
                    property: Box::new(Node::Str(name.into())),
                    optional: false,
                };
                pos += 2;
            } else if s.is(pos, "[") {
                let close = self.group(pos, "[")?;
                callee = Node::Member {
                    object: Box::new(callee),
                    property: Box::new(self.expression(pos + 1, close)?),
                    optional: false,
                };
                pos = close + 1;
            } else {
                break;
            }
        }
        let mut args = Vec::new();
        if s.is(pos, "(") && pos < to {
            let close = self.group(pos, "(")?;
            args = self.arguments(pos + 1, close)?;
            pos = close + 1;
        }
        let node = Node::New {
            callee: Box::new(callee),
            args,
        };
        self.postfix(node, pos, to)
    }
}

/// Property name for a numeric literal key (`{1: a}`, `{1.5: b}`).
fn number_key(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}
