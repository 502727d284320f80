//! Token definitions for Veil source.

use std::fmt;

/// A token in Veil source.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Declarations
    Package,
    Import,
    Class,
    Interface,
    Extends,
    Implements,

    // Modifiers
    Public,
    Private,
    Protected,
    Static,
    Final,
    Abstract,

    // Statements and expressions
    New,
    This,
    Super,
    Return,
    Throw,
    Try,
    Catch,
    /// Reserved, rejected by the parser
    Finally,
    Null,
    True,
    False,

    // Primitive types
    Void,
    Boolean,
    Int,
    Long,
    Double,

    // Literals
    IntLiteral(i64),
    LongLiteral(i64),
    StringLiteral(String),
    Identifier(String),

    // Punctuation
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,
    Dot,
    Equal,
    Pipe,

    Eof,
}

impl Token {
    /// Whether the token is a declaration modifier
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Token::Public
                | Token::Private
                | Token::Protected
                | Token::Static
                | Token::Final
                | Token::Abstract
        )
    }

    /// Whether the token names a primitive type (or `void`)
    pub fn is_primitive_type(&self) -> bool {
        matches!(
            self,
            Token::Void | Token::Boolean | Token::Int | Token::Long | Token::Double
        )
    }
}

/// Source location information for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Span from the start of `self` to the end of `other`
    pub fn to(&self, other: &Span) -> Span {
        Span {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
            column: self.column,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Package => write!(f, "package"),
            Token::Import => write!(f, "import"),
            Token::Class => write!(f, "class"),
            Token::Interface => write!(f, "interface"),
            Token::Extends => write!(f, "extends"),
            Token::Implements => write!(f, "implements"),
            Token::Public => write!(f, "public"),
            Token::Private => write!(f, "private"),
            Token::Protected => write!(f, "protected"),
            Token::Static => write!(f, "static"),
            Token::Final => write!(f, "final"),
            Token::Abstract => write!(f, "abstract"),
            Token::New => write!(f, "new"),
            Token::This => write!(f, "this"),
            Token::Super => write!(f, "super"),
            Token::Return => write!(f, "return"),
            Token::Throw => write!(f, "throw"),
            Token::Try => write!(f, "try"),
            Token::Catch => write!(f, "catch"),
            Token::Finally => write!(f, "finally"),
            Token::Null => write!(f, "null"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Void => write!(f, "void"),
            Token::Boolean => write!(f, "boolean"),
            Token::Int => write!(f, "int"),
            Token::Long => write!(f, "long"),
            Token::Double => write!(f, "double"),
            Token::IntLiteral(n) => write!(f, "{}", n),
            Token::LongLiteral(n) => write!(f, "{}L", n),
            Token::StringLiteral(s) => write!(f, "{:?}", s),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Equal => write!(f, "="),
            Token::Pipe => write!(f, "|"),
            Token::Eof => write!(f, "end of file"),
        }
    }
}
