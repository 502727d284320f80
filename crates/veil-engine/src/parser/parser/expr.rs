//! Expression parsing
//!
//! Precedence, lowest first: assignment, cast, postfix (`.name`, calls),
//! primary.

use super::types::{parse_type, scan_type};
use super::{ParseError, Parser};
use crate::parser::ast::{Expr, ExprKind, Ident, TypeExpr};
use crate::parser::token::Token;

/// Parse an expression.
pub fn parse_expression(parser: &mut Parser) -> Result<Expr, ParseError> {
    let target = parse_unary(parser)?;
    if !parser.check(&Token::Equal) {
        return Ok(target);
    }

    if !matches!(target.kind, ExprKind::Name(_) | ExprKind::Field { .. }) {
        return Err(ParseError::invalid_syntax(
            "invalid assignment target",
            target.span,
        ));
    }
    parser.advance();
    let value = parse_expression(parser)?;
    let span = target.span.to(&value.span);
    Ok(Expr::new(
        ExprKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        },
        span,
    ))
}

fn starts_operand(token: &Token) -> bool {
    matches!(
        token,
        Token::Identifier(_)
            | Token::IntLiteral(_)
            | Token::LongLiteral(_)
            | Token::StringLiteral(_)
            | Token::Null
            | Token::True
            | Token::False
            | Token::This
            | Token::New
            | Token::LeftParen
    )
}

fn is_cast(parser: &Parser) -> bool {
    if !parser.check(&Token::LeftParen) {
        return false;
    }
    match scan_type(parser, 1) {
        Some(end) if matches!(parser.peek_nth(end), Token::RightParen) => {
            parser.peek_nth(1).is_primitive_type() || starts_operand(parser.peek_nth(end + 1))
        }
        _ => false,
    }
}

fn parse_unary(parser: &mut Parser) -> Result<Expr, ParseError> {
    if is_cast(parser) {
        let start = parser.expect(Token::LeftParen)?;
        let ty = parse_type(parser)?;
        parser.expect(Token::RightParen)?;
        let expr = parse_unary(parser)?;
        let span = start.to(&expr.span);
        return Ok(Expr::new(
            ExprKind::Cast {
                ty,
                expr: Box::new(expr),
            },
            span,
        ));
    }
    parse_postfix(parser)
}

fn parse_postfix(parser: &mut Parser) -> Result<Expr, ParseError> {
    let mut expr = parse_primary(parser)?;
    while parser.eat(&Token::Dot) {
        let name = parser.expect_ident()?;
        if parser.check(&Token::LeftParen) {
            let args = parse_args(parser)?;
            let span = expr.span.to(&parser.previous_span());
            expr = Expr::new(
                ExprKind::Call {
                    target: Some(Box::new(expr)),
                    name,
                    args,
                },
                span,
            );
        } else {
            let span = expr.span.to(&name.span);
            expr = Expr::new(
                ExprKind::Field {
                    target: Box::new(expr),
                    name,
                },
                span,
            );
        }
    }
    Ok(expr)
}

fn parse_primary(parser: &mut Parser) -> Result<Expr, ParseError> {
    let start = parser.current_span();
    let kind = match parser.current().clone() {
        Token::Null => ExprKind::Null,
        Token::True => ExprKind::Bool(true),
        Token::False => ExprKind::Bool(false),
        Token::IntLiteral(value) => ExprKind::Int(value),
        Token::LongLiteral(value) => ExprKind::Long(value),
        Token::StringLiteral(value) => ExprKind::Str(value),
        Token::This => ExprKind::This,
        Token::Super => {
            parser.advance();
            if !parser.check(&Token::LeftParen) {
                return Err(ParseError::unsupported("'super' member access", start));
            }
            let args = parse_args(parser)?;
            return Ok(Expr::new(
                ExprKind::SuperCall { args },
                start.to(&parser.previous_span()),
            ));
        }
        Token::Identifier(name) => {
            parser.advance();
            if parser.check(&Token::LeftParen) {
                let args = parse_args(parser)?;
                return Ok(Expr::new(
                    ExprKind::Call {
                        target: None,
                        name: Ident { name, span: start },
                        args,
                    },
                    start.to(&parser.previous_span()),
                ));
            }
            return Ok(Expr::new(ExprKind::Name(name), start));
        }
        Token::New => return parse_new(parser),
        Token::LeftParen => {
            parser.advance();
            let mut inner = parse_expression(parser)?;
            let end = parser.expect(Token::RightParen)?;
            inner.span = start.to(&end);
            return Ok(inner);
        }
        _ => {
            return Err(parser.unexpected(&[
                Token::Identifier(String::new()),
                Token::New,
                Token::LeftParen,
            ]))
        }
    };
    parser.advance();
    Ok(Expr::new(kind, start))
}

fn parse_new(parser: &mut Parser) -> Result<Expr, ParseError> {
    let start = parser.expect(Token::New)?;
    let ty = parse_type(parser)?;

    if ty.dims > 0 {
        let elements = parse_array_initializer(parser)?;
        let element = TypeExpr {
            dims: ty.dims - 1,
            ..ty
        };
        return Ok(Expr::new(
            ExprKind::NewArray { element, elements },
            start.to(&parser.previous_span()),
        ));
    }
    if parser.check(&Token::LeftBracket) {
        return Err(ParseError::unsupported(
            "sized array creation",
            parser.current_span(),
        ));
    }

    let args = parse_args(parser)?;
    Ok(Expr::new(
        ExprKind::New { ty, args },
        start.to(&parser.previous_span()),
    ))
}

fn parse_array_initializer(parser: &mut Parser) -> Result<Vec<Expr>, ParseError> {
    parser.expect(Token::LeftBrace)?;
    let mut elements = Vec::new();
    while !parser.check(&Token::RightBrace) {
        elements.push(parse_expression(parser)?);
        if !parser.eat(&Token::Comma) {
            break;
        }
    }
    parser.expect(Token::RightBrace)?;
    Ok(elements)
}

/// Parse `( expr, ... )`
pub fn parse_args(parser: &mut Parser) -> Result<Vec<Expr>, ParseError> {
    parser.expect(Token::LeftParen)?;
    let mut args = Vec::new();
    if !parser.check(&Token::RightParen) {
        loop {
            args.push(parse_expression(parser)?);
            if !parser.eat(&Token::Comma) {
                break;
            }
        }
    }
    parser.expect(Token::RightParen)?;
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expr {
        let mut parser = Parser::new(source).unwrap();
        let expr = parse_expression(&mut parser).unwrap();
        assert!(parser.at_eof(), "trailing tokens in {:?}", source);
        expr
    }

    #[test]
    fn test_call_chain() {
        let e = expr("this.handler.invoke(this, m, new Object[] { a, 1 })");
        match e.kind {
            ExprKind::Call { target, name, args } => {
                assert_eq!(name.name, "invoke");
                assert_eq!(args.len(), 3);
                assert!(matches!(args[2].kind, ExprKind::NewArray { .. }));
                match target.map(|t| t.kind) {
                    Some(ExprKind::Field { target, name }) => {
                        assert_eq!(name.name, "handler");
                        assert_eq!(target.kind, ExprKind::This);
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dotted_name() {
        let e = expr("demo.Util.VALUE");
        assert_eq!(e.as_dotted_name().as_deref(), Some("demo.Util.VALUE"));
    }

    #[test]
    fn test_cast_vs_parenthesized() {
        assert!(matches!(expr("(String) x").kind, ExprKind::Cast { .. }));
        assert!(matches!(expr("(int) 3").kind, ExprKind::Cast { .. }));
        assert!(matches!(expr("(Object[]) x").kind, ExprKind::Cast { .. }));
        assert!(matches!(expr("(x)").kind, ExprKind::Name(_)));
        assert!(matches!(expr("(x).y").kind, ExprKind::Field { .. }));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        match expr("a = b = null").kind {
            ExprKind::Assign { value, .. } => {
                assert!(matches!(value.kind, ExprKind::Assign { .. }))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_assignment_target() {
        let mut parser = Parser::new("f() = 1").unwrap();
        assert!(parse_expression(&mut parser).is_err());
    }

    #[test]
    fn test_new_array() {
        match expr("new String[] { \"a\", \"b\" }").kind {
            ExprKind::NewArray { element, elements } => {
                assert_eq!(element.dims, 0);
                assert_eq!(elements.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut parser = Parser::new("new String[3]").unwrap();
        let err = parse_expression(&mut parser).unwrap_err();
        assert!(err.message.contains("not supported"));
    }

    #[test]
    fn test_super_call() {
        assert!(matches!(expr("super(h)").kind, ExprKind::SuperCall { ref args } if args.len() == 1));
    }
}
