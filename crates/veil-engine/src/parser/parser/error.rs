//! Parse error types

use crate::parser::token::{Span, Token};
use std::fmt;

/// A parse error with location and contextual information.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    /// Human-readable error message
    pub message: String,
}

/// The kind of parse error.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    UnexpectedToken { expected: Vec<Token>, found: Token },
    UnexpectedEof { expected: Vec<Token> },
    InvalidSyntax { reason: String },
    /// A construct outside the language subset
    Unsupported { feature: String },
}

fn describe(expected: &[Token]) -> String {
    let names: Vec<String> = expected
        .iter()
        .map(|t| match t {
            Token::Identifier(_) => "identifier".to_string(),
            Token::StringLiteral(_) => "string literal".to_string(),
            other => format!("'{}'", other),
        })
        .collect();
    match names.len() {
        0 => "a token".to_string(),
        1 => names[0].clone(),
        _ => format!("one of {}", names.join(", ")),
    }
}

impl ParseError {
    pub fn unexpected_token(expected: Vec<Token>, found: Token, span: Span) -> Self {
        let message = format!("expected {}, found '{}'", describe(&expected), found);
        Self {
            kind: ParseErrorKind::UnexpectedToken { expected, found },
            span,
            message,
        }
    }

    pub fn unexpected_eof(expected: Vec<Token>, span: Span) -> Self {
        let message = format!("unexpected end of file, expected {}", describe(&expected));
        Self {
            kind: ParseErrorKind::UnexpectedEof { expected },
            span,
            message,
        }
    }

    pub fn invalid_syntax(reason: impl Into<String>, span: Span) -> Self {
        let reason = reason.into();
        Self {
            message: reason.clone(),
            kind: ParseErrorKind::InvalidSyntax { reason },
            span,
        }
    }

    pub fn unsupported(feature: impl Into<String>, span: Span) -> Self {
        let feature = feature.into();
        Self {
            message: format!("{} is not supported", feature),
            kind: ParseErrorKind::Unsupported { feature },
            span,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at {}:{}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let span = Span::new(0, 1, 3, 7);
        let err = ParseError::unexpected_token(vec![Token::Semicolon], Token::RightBrace, span);
        assert_eq!(err.to_string(), "parse error at 3:7: expected ';', found '}'");

        let err = ParseError::unexpected_eof(vec![Token::Identifier(String::new()), Token::LeftBrace], span);
        assert_eq!(err.message, "unexpected end of file, expected one of identifier, '{'");

        assert_eq!(ParseError::unsupported("'finally'", span).message, "'finally' is not supported");
    }
}
