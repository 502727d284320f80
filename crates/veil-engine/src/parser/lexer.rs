//! Lexer for Veil source.
//!
//! Built on logos. Identifiers may contain `$` so generated names such as
//! `$Proxy3` lex as ordinary identifiers.

use std::fmt;

use logos::Logos;

use crate::parser::token::{Span, Token};

/// Logos-based token enum, converted to [`Token`] after lexing.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
enum LogosToken {
    #[token("/*", lex_block_comment)]
    BlockComment,

    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("class")]
    Class,
    #[token("interface")]
    Interface,
    #[token("extends")]
    Extends,
    #[token("implements")]
    Implements,
    #[token("public")]
    Public,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("static")]
    Static,
    #[token("final")]
    Final,
    #[token("abstract")]
    Abstract,
    #[token("new")]
    New,
    #[token("this")]
    This,
    #[token("super")]
    Super,
    #[token("return")]
    Return,
    #[token("throw")]
    Throw,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("null")]
    Null,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("void")]
    Void,
    #[token("boolean")]
    Boolean,
    #[token("int")]
    Int,
    #[token("long")]
    Long,
    #[token("double")]
    Double,

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntLiteral(i64),

    #[regex(r"[0-9]+[lL]", |lex| {
        let s = lex.slice();
        s[..s.len() - 1].parse::<i64>().ok()
    })]
    LongLiteral(i64),

    #[regex(r#""([^"\\\n]|\\.)*""#, lex_string)]
    StringLiteral(String),

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("=")]
    Equal,
    #[token("|")]
    Pipe,
}

fn lex_block_comment(lex: &mut logos::Lexer<LogosToken>) -> logos::FilterResult<(), ()> {
    let remainder = lex.remainder();
    match remainder.find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            logos::FilterResult::Skip
        }
        None => {
            lex.bump(remainder.len());
            logos::FilterResult::Error(())
        }
    }
}

fn lex_string(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    let slice = lex.slice();
    unescape(&slice[1..slice.len() - 1])
}

fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '"' => '"',
            '\'' => '\'',
            '\\' => '\\',
            _ => return None,
        };
        out.push(escaped);
    }
    Some(out)
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnexpectedCharacter { char: char, span: Span },
    UnterminatedString { span: Span },
    UnterminatedComment { span: Span },
    InvalidNumber { text: String, span: Span },
    InvalidEscape { text: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> &Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::UnterminatedComment { span }
            | LexError::InvalidNumber { span, .. }
            | LexError::InvalidEscape { span, .. } => span,
        }
    }

    pub fn description(&self) -> String {
        match self {
            LexError::UnexpectedCharacter { char, .. } => format!("unexpected character '{}'", char),
            LexError::UnterminatedString { .. } => "unterminated string literal".to_string(),
            LexError::UnterminatedComment { .. } => "unterminated block comment".to_string(),
            LexError::InvalidNumber { text, .. } => format!("invalid number literal '{}'", text),
            LexError::InvalidEscape { text, .. } => format!("invalid escape in string {}", text),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.description(),
            self.span().line,
            self.span().column
        )
    }
}

impl std::error::Error for LexError {}

/// Veil lexer
pub struct Lexer<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    fn span(&self, range: std::ops::Range<usize>) -> Span {
        let line = self.line_starts.partition_point(|&start| start <= range.start);
        let line_start = self.line_starts[line.saturating_sub(1)];
        let column = self.source[line_start..range.start].chars().count() + 1;
        Span::new(range.start, range.end, line as u32, column as u32)
    }

    /// Tokenize the whole input; the last token is always [`Token::Eof`]
    pub fn tokenize(self) -> Result<Vec<(Token, Span)>, Vec<LexError>> {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        let mut lex = LogosToken::lexer(self.source);

        while let Some(result) = lex.next() {
            let span = self.span(lex.span());
            match result {
                Ok(token) => tokens.extend(convert(token).map(|t| (t, span))),
                Err(()) => errors.push(self.classify_error(lex.slice(), span)),
            }
        }

        let end = self.source.len();
        tokens.push((Token::Eof, self.span(end..end)));

        if errors.is_empty() {
            Ok(tokens)
        } else {
            Err(errors)
        }
    }

    fn classify_error(&self, slice: &str, span: Span) -> LexError {
        if slice.starts_with("/*") {
            LexError::UnterminatedComment { span }
        } else if slice.starts_with('"') {
            if slice.len() > 1 && slice.ends_with('"') {
                LexError::InvalidEscape {
                    text: slice.to_string(),
                    span,
                }
            } else {
                LexError::UnterminatedString { span }
            }
        } else if slice.starts_with(|c: char| c.is_ascii_digit()) {
            LexError::InvalidNumber {
                text: slice.to_string(),
                span,
            }
        } else {
            LexError::UnexpectedCharacter {
                char: slice.chars().next().unwrap_or('\0'),
                span,
            }
        }
    }
}

fn convert(token: LogosToken) -> Option<Token> {
    let token = match token {
        LogosToken::BlockComment => return None,
        LogosToken::Package => Token::Package,
        LogosToken::Import => Token::Import,
        LogosToken::Class => Token::Class,
        LogosToken::Interface => Token::Interface,
        LogosToken::Extends => Token::Extends,
        LogosToken::Implements => Token::Implements,
        LogosToken::Public => Token::Public,
        LogosToken::Private => Token::Private,
        LogosToken::Protected => Token::Protected,
        LogosToken::Static => Token::Static,
        LogosToken::Final => Token::Final,
        LogosToken::Abstract => Token::Abstract,
        LogosToken::New => Token::New,
        LogosToken::This => Token::This,
        LogosToken::Super => Token::Super,
        LogosToken::Return => Token::Return,
        LogosToken::Throw => Token::Throw,
        LogosToken::Try => Token::Try,
        LogosToken::Catch => Token::Catch,
        LogosToken::Finally => Token::Finally,
        LogosToken::Null => Token::Null,
        LogosToken::True => Token::True,
        LogosToken::False => Token::False,
        LogosToken::Void => Token::Void,
        LogosToken::Boolean => Token::Boolean,
        LogosToken::Int => Token::Int,
        LogosToken::Long => Token::Long,
        LogosToken::Double => Token::Double,
        LogosToken::IntLiteral(n) => Token::IntLiteral(n),
        LogosToken::LongLiteral(n) => Token::LongLiteral(n),
        LogosToken::StringLiteral(s) => Token::StringLiteral(s),
        LogosToken::Identifier(s) => Token::Identifier(s),
        LogosToken::LeftBrace => Token::LeftBrace,
        LogosToken::RightBrace => Token::RightBrace,
        LogosToken::LeftParen => Token::LeftParen,
        LogosToken::RightParen => Token::RightParen,
        LogosToken::LeftBracket => Token::LeftBracket,
        LogosToken::RightBracket => Token::RightBracket,
        LogosToken::Semicolon => Token::Semicolon,
        LogosToken::Comma => Token::Comma,
        LogosToken::Dot => Token::Dot,
        LogosToken::Equal => Token::Equal,
        LogosToken::Pipe => Token::Pipe,
    };
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .tokenize()
            .expect("should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("public final class $Proxy0 extends ProxyBase"),
            vec![
                Token::Public,
                Token::Final,
                Token::Class,
                Token::Identifier("$Proxy0".to_string()),
                Token::Extends,
                Token::Identifier("ProxyBase".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds(r#"42 7L "a\"b\n" null"#),
            vec![
                Token::IntLiteral(42),
                Token::LongLiteral(7),
                Token::StringLiteral("a\"b\n".to_string()),
                Token::Null,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("a // line\n /* block\n comment */ b"),
            vec![
                Token::Identifier("a".to_string()),
                Token::Identifier("b".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = Lexer::new("class A {\n  int x;\n}").tokenize().unwrap();
        let (token, span) = &tokens[3];
        assert_eq!(token, &Token::Int);
        assert_eq!((span.line, span.column), (2, 3));
        assert_eq!(span.slice("class A {\n  int x;\n}"), "int");
    }

    #[test]
    fn test_errors() {
        let errors = Lexer::new("a # b").tokenize().unwrap_err();
        assert!(matches!(errors[0], LexError::UnexpectedCharacter { char: '#', .. }));

        let errors = Lexer::new("\"open").tokenize().unwrap_err();
        assert!(matches!(errors[0], LexError::UnterminatedString { .. }));

        let errors = Lexer::new("/* never closed").tokenize().unwrap_err();
        assert!(matches!(errors[0], LexError::UnterminatedComment { .. }));
    }
}
