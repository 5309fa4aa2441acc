//! Constant extraction.
//!
//! A single left-to-right pass that strips comments and moves every quoted
//! construct into the [`Constants`] table, leaving a placeholder behind:
//!
//! | Literal            | Placeholder |
//! |--------------------|-------------|
//! | `'text'`, `"text"` | `"N"`       |
//! | `` `a${b}c` ``     | `` `N` ``   |
//! | `/re/g`            | `@N@`       |
//!
//! Everything downstream works on the rewritten text and never has to
//! re-tokenize quoted content. Regex placeholders use `@` so that a later
//! `/` is always division.

use jsbox_ir::{CodeSlice, Constants, RegexLiteral, TemplateLiteral};
use jsbox_stack::ensure_sufficient_stack;

use crate::ParseError;

/// Keywords after which a `/` starts a regex rather than a division.
const REGEX_AFTER_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "await",
    "yield",
];

/// Rewritten source plus the constants pulled out of it.
#[derive(Debug)]
pub struct Extracted {
    pub code: CodeSlice,
    pub constants: Constants,
}

/// Run the extractor over a whole script.
pub fn extract(source: &str) -> Result<Extracted, ParseError> {
    let mut constants = Constants::new();
    let mut extractor = Extractor {
        src: source.as_bytes(),
        pos: 0,
        constants: &mut constants,
    };
    let code = extractor.code(false)?;
    tracing::trace!(
        strings = constants.strings().len(),
        regexes = constants.regexes().len(),
        templates = constants.templates().len(),
        "extracted constants"
    );
    Ok(Extracted {
        code: CodeSlice::new(code),
        constants,
    })
}

struct Extractor<'a, 'c> {
    src: &'a [u8],
    pos: usize,
    constants: &'c mut Constants,
}

impl Extractor<'_, '_> {
    #[inline]
    fn peek(&self, ahead: usize) -> Option<u8> {
        self.src.get(self.pos + ahead).copied()
    }

    /// Rewrite code until end of input, or until the `}` closing a template
    /// interpolation when `in_template` is set.
    fn code(&mut self, in_template: bool) -> Result<String, ParseError> {
        ensure_sufficient_stack(|| self.code_inner(in_template))
    }

    fn code_inner(&mut self, in_template: bool) -> Result<String, ParseError> {
        let mut out: Vec<u8> = Vec::with_capacity(self.src.len().saturating_sub(self.pos));
        let mut depth = 0usize;
        loop {
            let Some(b) = self.peek(0) else {
                if in_template {
                    return Err(ParseError::UnterminatedTemplate);
                }
                break;
            };
            match b {
                b'"' | b'\'' => {
                    let value = self.string(b)?;
                    let index = self.constants.push_string(value);
                    out.extend_from_slice(format!("\"{index}\"").as_bytes());
                }
                b'`' => {
                    let template = self.template()?;
                    let index = self.constants.push_template(template);
                    out.extend_from_slice(format!("`{index}`").as_bytes());
                }
                b'/' if self.peek(1) == Some(b'/') => {
                    while let Some(c) = self.peek(0) {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    let body_start = self.pos + 2;
                    let Some(close) = find(&self.src[body_start..], b"*/") else {
                        return Err(ParseError::UnterminatedComment);
                    };
                    let multiline = self.src[body_start..body_start + close].contains(&b'\n');
                    out.push(if multiline { b'\n' } else { b' ' });
                    self.pos = body_start + close + 2;
                }
                b'/' if regex_allowed(&out) => {
                    let regex = self.regex()?;
                    let index = self.constants.push_regex(regex);
                    out.extend_from_slice(format!("@{index}@").as_bytes());
                }
                b'{' => {
                    depth += 1;
                    out.push(b);
                    self.pos += 1;
                }
                b'}' if in_template && depth == 0 => {
                    self.pos += 1;
                    break;
                }
                b'}' => {
                    depth = depth.saturating_sub(1);
                    out.push(b);
                    self.pos += 1;
                }
                _ => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// A quoted string starting at the opening quote; returns its decoded value.
    fn string(&mut self, quote: u8) -> Result<String, ParseError> {
        let start = self.pos + 1;
        let mut i = start;
        loop {
            match self.src.get(i) {
                None | Some(b'\n' | b'\r') => return Err(ParseError::UnterminatedString),
                Some(b'\\') => {
                    i += if self.src.get(i + 1) == Some(&b'\r') && self.src.get(i + 2) == Some(&b'\n') {
                        3
                    } else {
                        2
                    };
                }
                Some(&c) if c == quote => break,
                Some(_) => i += 1,
            }
        }
        self.pos = i + 1;
        decode_escapes(&String::from_utf8_lossy(&self.src[start..i]))
    }

    fn template(&mut self) -> Result<TemplateLiteral, ParseError> {
        self.pos += 1;
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        let mut raw: Vec<u8> = Vec::new();
        loop {
            match self.peek(0) {
                None => return Err(ParseError::UnterminatedTemplate),
                Some(b'\\') => {
                    raw.push(b'\\');
                    if let Some(next) = self.peek(1) {
                        raw.push(next);
                    }
                    self.pos += 2;
                }
                Some(b'`') => {
                    self.pos += 1;
                    break;
                }
                Some(b'$') if self.peek(1) == Some(b'{') => {
                    quasis.push(decode_escapes(&String::from_utf8_lossy(&raw))?.into());
                    raw.clear();
                    self.pos += 2;
                    let expression = self.code(true)?;
                    expressions.push(CodeSlice::new(expression));
                }
                Some(c) => {
                    raw.push(c);
                    self.pos += 1;
                }
            }
        }
        quasis.push(decode_escapes(&String::from_utf8_lossy(&raw))?.into());
        Ok(TemplateLiteral {
            quasis,
            expressions,
        })
    }

    fn regex(&mut self) -> Result<RegexLiteral, ParseError> {
        let start = self.pos + 1;
        let mut i = start;
        let mut in_class = false;
        loop {
            match self.src.get(i) {
                None | Some(b'\n' | b'\r') => return Err(ParseError::UnterminatedRegex),
                Some(b'\\') => i += 2,
                Some(b'[') => {
                    in_class = true;
                    i += 1;
                }
                Some(b']') => {
                    in_class = false;
                    i += 1;
                }
                Some(b'/') if !in_class => break,
                Some(_) => i += 1,
            }
        }
        let pattern = String::from_utf8_lossy(&self.src[start..i]).into_owned();
        let flags_start = i + 1;
        let mut end = flags_start;
        while self.src.get(end).is_some_and(u8::is_ascii_alphabetic) {
            end += 1;
        }
        let flags = String::from_utf8_lossy(&self.src[flags_start..end]).into_owned();
        self.pos = end;
        Ok(RegexLiteral {
            pattern: pattern.into(),
            flags: flags.into(),
        })
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[inline]
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Whether a `/` following `out` starts a regex literal.
fn regex_allowed(out: &[u8]) -> bool {
    let trimmed = out.trim_ascii_end();
    let Some(&last) = trimmed.last() else {
        return true;
    };
    if is_word_byte(last) {
        let word_start = trimmed
            .iter()
            .rposition(|&b| !is_word_byte(b))
            .map_or(0, |p| p + 1);
        let word = &trimmed[word_start..];
        return REGEX_AFTER_KEYWORDS
            .iter()
            .any(|keyword| keyword.as_bytes() == word);
    }
    if let [.., op @ (b'+' | b'-'), second] = trimmed {
        if op == second {
            return !closes_operand(&trimmed[..trimmed.len() - 2]);
        }
    }
    !matches!(last, b')' | b']' | b'"' | b'`' | b'@')
}

/// Whether `out` ends with something a postfix `++`/`--` can apply to.
fn closes_operand(out: &[u8]) -> bool {
    out.trim_ascii_end()
        .last()
        .is_some_and(|&b| is_word_byte(b) || matches!(b, b')' | b']'))
}

/// Decode the escape sequences of a string or template chunk.
pub(crate) fn decode_escapes(raw: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            break;
        };
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !chars.peek().is_some_and(char::is_ascii_digit) => out.push('\0'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                out.push(code_point(&hex, "\\x")?);
            }
            'u' => {
                let unit = if chars.peek() == Some(&'{') {
                    chars.next();
                    let hex: String = chars.by_ref().take_while(|&c| c != '}').collect();
                    parse_hex(&hex, "\\u{}")?
                } else {
                    let hex: String = chars.by_ref().take(4).collect();
                    parse_hex(&hex, "\\u")?
                };
                if (0xD800..0xDC00).contains(&unit) {
                    let mut lookahead = chars.clone();
                    if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
                        let low: String = lookahead.by_ref().take(4).collect();
                        if let Ok(low) = u32::from_str_radix(&low, 16) {
                            if (0xDC00..0xE000).contains(&low) {
                                chars = lookahead;
                                let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                                out.push(char::from_u32(combined).unwrap_or('\u{FFFD}'));
                                continue;
                            }
                        }
                    }
                }
                out.push(char::from_u32(unit).unwrap_or('\u{FFFD}'));
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
    }
    Ok(out)
}

fn parse_hex(hex: &str, escape: &str) -> Result<u32, ParseError> {
    if hex.is_empty() {
        return Err(ParseError::invalid(
            "escape sequence",
            format!("empty {escape} escape"),
        ));
    }
    u32::from_str_radix(hex, 16).map_err(|_| {
        ParseError::invalid(
            "escape sequence",
            format!("bad hex digits '{hex}' in {escape} escape"),
        )
    })
}

fn code_point(hex: &str, escape: &str) -> Result<char, ParseError> {
    let value = parse_hex(hex, escape)?;
    Ok(char::from_u32(value).unwrap_or('\u{FFFD}'))
}
