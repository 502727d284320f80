//! Veil source front end: tokens, lexer, AST and parser

pub mod ast;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod token;

pub use ast::CompilationUnit;
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, ParseErrorKind, Parser};
pub use token::{Span, Token};

/// Either kind of front-end failure
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxError {
    Lex(LexError),
    Parse(ParseError),
}

impl SyntaxError {
    pub fn span(&self) -> Span {
        match self {
            SyntaxError::Lex(err) => *err.span(),
            SyntaxError::Parse(err) => err.span,
        }
    }

    pub fn message(&self) -> String {
        match self {
            SyntaxError::Lex(err) => err.description(),
            SyntaxError::Parse(err) => err.message.clone(),
        }
    }
}

/// Lex and parse one source file
pub fn parse_source(source: &str) -> Result<CompilationUnit, Vec<SyntaxError>> {
    let parser = Parser::new(source)
        .map_err(|errors| errors.into_iter().map(SyntaxError::Lex).collect::<Vec<_>>())?;
    parser
        .parse()
        .map_err(|errors| errors.into_iter().map(SyntaxError::Parse).collect())
}
