//! Compile-time errors.

/// Longest context excerpt carried by [`ParseError::UnexpectedToken`].
pub const CONTEXT_LEN: usize = 40;

/// A syntax error raised while compiling source text.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unterminated string literal")]
    UnterminatedString,

    #[error("Unterminated comment")]
    UnterminatedComment,

    #[error("Unterminated template literal")]
    UnterminatedTemplate,

    #[error("Unterminated regular expression")]
    UnterminatedRegex,

    #[error("Unbalanced '{open}'")]
    UnbalancedBracket { open: char },

    #[error("Unexpected token '{ch}': {context}")]
    UnexpectedToken { ch: char, context: String },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Invalid {construct}: {message}")]
    Invalid {
        construct: &'static str,
        message: String,
    },
}

impl ParseError {
    /// Build an [`ParseError::UnexpectedToken`] from the text starting at the
    /// offending position.
    #[cold]
    pub fn unexpected(rest: &str) -> Self {
        let Some(ch) = rest.chars().next() else {
            return ParseError::UnexpectedEnd;
        };
        ParseError::UnexpectedToken {
            ch,
            context: rest.chars().take(CONTEXT_LEN).collect(),
        }
    }

    #[cold]
    pub fn invalid(construct: &'static str, message: impl Into<String>) -> Self {
        ParseError::Invalid {
            construct,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unexpected_keeps_forty_chars_of_context() {
        let rest = "}".repeat(60);
        let ParseError::UnexpectedToken { ch, context } = ParseError::unexpected(&rest) else {
            panic!("expected UnexpectedToken");
        };
        assert_eq!(ch, '}');
        assert_eq!(context.len(), CONTEXT_LEN);
    }

    #[test]
    fn unexpected_at_end() {
        assert_eq!(ParseError::unexpected(""), ParseError::UnexpectedEnd);
    }

    #[test]
    fn messages() {
        assert_eq!(
            ParseError::invalid("for", "missing ')'").to_string(),
            "Invalid for: missing ')'"
        );
        assert_eq!(
            ParseError::UnbalancedBracket { open: '(' }.to_string(),
            "Unbalanced '('"
        );
        assert_eq!(
            ParseError::unexpected(") + 1").to_string(),
            "Unexpected token ')': ) + 1"
        );
    }
}
