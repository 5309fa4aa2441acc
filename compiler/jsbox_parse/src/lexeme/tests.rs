#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use pretty_assertions::assert_eq;

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(&CodeSlice::new(source))
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn longest_match_punctuators() {
    assert_eq!(
        kinds("a >>>= b ?? c?.d"),
        vec![
            TokenKind::Word,
            TokenKind::Punct(">>>="),
            TokenKind::Word,
            TokenKind::Punct("??"),
            TokenKind::Word,
            TokenKind::Punct("?."),
            TokenKind::Word,
        ]
    );
}

#[test]
fn optional_chain_is_not_taken_before_a_digit() {
    assert_eq!(
        kinds("a?.5:1"),
        vec![
            TokenKind::Word,
            TokenKind::Punct("?"),
            TokenKind::Number(0.5),
            TokenKind::Punct(":"),
            TokenKind::Number(1.0),
        ]
    );
}

#[test]
fn numbers() {
    assert_eq!(
        kinds("0x1F 0b101 0o17 1_000 .5 2e3 1.5E-2"),
        vec![
            TokenKind::Number(31.0),
            TokenKind::Number(5.0),
            TokenKind::Number(15.0),
            TokenKind::Number(1000.0),
            TokenKind::Number(0.5),
            TokenKind::Number(2000.0),
            TokenKind::Number(0.015),
        ]
    );
    assert!(tokenize(&CodeSlice::new("12abc")).is_err());
}

#[test]
fn placeholders() {
    assert_eq!(
        kinds(r#""0" `12` @3@"#),
        vec![
            TokenKind::Str(0),
            TokenKind::Template(12),
            TokenKind::Regex(3),
        ]
    );
}

#[test]
fn newline_flags_and_absolute_offsets() {
    let code = CodeSlice::new("xx; a\n  b").skip(4);
    let tokens = tokenize(&code).unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!((tokens[0].start, tokens[0].end), (4, 5));
    assert!(!tokens[0].newline_before);
    assert!(tokens[1].newline_before);
    assert_eq!(tokens[1].start, 8);
}

#[test]
fn unknown_character_reports_context() {
    let err = tokenize(&CodeSlice::new("a # b")).unwrap_err();
    assert_eq!(
        err,
        ParseError::UnexpectedToken {
            ch: '#',
            context: "# b".into(),
        }
    );
}
