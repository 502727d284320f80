//! Type and name parsing

use super::{ParseError, Parser};
use crate::parser::ast::{QualifiedName, TypeExpr, TypeExprKind};
use crate::parser::token::Token;

/// Parse a dotted name: `a.b.C`
pub fn parse_qualified_name(parser: &mut Parser) -> Result<QualifiedName, ParseError> {
    let first = parser.expect_ident()?;
    let start = first.span;
    let mut parts = vec![first];
    while parser.check(&Token::Dot) && matches!(parser.peek_nth(1), Token::Identifier(_)) {
        parser.advance();
        parts.push(parser.expect_ident()?);
    }
    let span = start.to(&parser.previous_span());
    Ok(QualifiedName { parts, span })
}

/// Parse a type: a primitive or a qualified name, followed by `[]` pairs
pub fn parse_type(parser: &mut Parser) -> Result<TypeExpr, ParseError> {
    let start = parser.current_span();
    let kind = match parser.current() {
        Token::Void => TypeExprKind::Void,
        Token::Boolean => TypeExprKind::Boolean,
        Token::Int => TypeExprKind::Int,
        Token::Long => TypeExprKind::Long,
        Token::Double => TypeExprKind::Double,
        Token::Identifier(_) => TypeExprKind::Named(parse_qualified_name(parser)?),
        _ => {
            return Err(parser.unexpected(&[
                Token::Identifier(String::new()),
                Token::Int,
                Token::Void,
            ]))
        }
    };
    if !matches!(kind, TypeExprKind::Named(_)) {
        parser.advance();
    }

    let mut dims = 0;
    while parser.check(&Token::LeftBracket) && matches!(parser.peek_nth(1), Token::RightBracket) {
        parser.advance();
        parser.advance();
        dims += 1;
    }
    Ok(TypeExpr {
        kind,
        dims,
        span: start.to(&parser.previous_span()),
    })
}

/// Scan a type starting `offset` tokens ahead without consuming anything
///
/// Returns the offset just past the type.
pub fn scan_type(parser: &Parser, offset: usize) -> Option<usize> {
    let mut at = offset;
    match parser.peek_nth(at) {
        t if t.is_primitive_type() => at += 1,
        Token::Identifier(_) => {
            at += 1;
            while matches!(parser.peek_nth(at), Token::Dot)
                && matches!(parser.peek_nth(at + 1), Token::Identifier(_))
            {
                at += 2;
            }
        }
        _ => return None,
    }
    while matches!(parser.peek_nth(at), Token::LeftBracket)
        && matches!(parser.peek_nth(at + 1), Token::RightBracket)
    {
        at += 2;
    }
    Some(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_types() {
        let mut parser = Parser::new("veil.Method[][] int void").unwrap();
        let ty = parse_type(&mut parser).unwrap();
        assert_eq!(ty.dims, 2);
        match &ty.kind {
            TypeExprKind::Named(name) => assert_eq!(name.to_string(), "veil.Method"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(parse_type(&mut parser).unwrap().kind, TypeExprKind::Int);
        assert_eq!(parse_type(&mut parser).unwrap().kind, TypeExprKind::Void);
        assert!(parser.at_eof());
    }

    #[test]
    fn test_scan_type() {
        let parser = Parser::new("(String[]) x").unwrap();
        assert_eq!(scan_type(&parser, 1), Some(4));
        assert_eq!(scan_type(&parser, 0), None);
    }
}
