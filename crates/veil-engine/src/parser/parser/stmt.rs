//! Statement parsing

use super::expr::parse_expression;
use super::recovery::sync_to_statement_boundary;
use super::types::parse_type;
use super::{ParseError, Parser};
use crate::parser::ast::{Block, CatchClause, Stmt, TryStmt};
use crate::parser::token::Token;

/// Parse `{ statements }`
pub fn parse_block(parser: &mut Parser) -> Result<Block, ParseError> {
    let start = parser.expect(Token::LeftBrace)?;
    let mut stmts = Vec::new();
    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        match parse_statement(parser) {
            Ok(stmt) => stmts.push(stmt),
            Err(err) => {
                parser.report(err);
                sync_to_statement_boundary(parser);
            }
        }
    }
    let end = parser.expect(Token::RightBrace)?;
    Ok(Block {
        stmts,
        span: start.to(&end),
    })
}

/// Parse a statement.
pub fn parse_statement(parser: &mut Parser) -> Result<Stmt, ParseError> {
    let start = parser.current_span();
    match parser.current() {
        Token::Return => {
            parser.advance();
            let value = if parser.check(&Token::Semicolon) {
                None
            } else {
                Some(parse_expression(parser)?)
            };
            let end = parser.expect(Token::Semicolon)?;
            Ok(Stmt::Return {
                value,
                span: start.to(&end),
            })
        }
        Token::Throw => {
            parser.advance();
            let value = parse_expression(parser)?;
            let end = parser.expect(Token::Semicolon)?;
            Ok(Stmt::Throw {
                value,
                span: start.to(&end),
            })
        }
        Token::Try => parse_try(parser).map(Stmt::Try),
        Token::LeftBrace => parse_block(parser).map(Stmt::Block),
        Token::Finally => {
            parser.advance();
            Err(ParseError::unsupported("'finally'", start))
        }
        _ => {
            let expr = parse_expression(parser)?;
            parser.expect(Token::Semicolon)?;
            Ok(Stmt::Expr(expr))
        }
    }
}

fn parse_try(parser: &mut Parser) -> Result<TryStmt, ParseError> {
    let start = parser.expect(Token::Try)?;
    let body = parse_block(parser)?;

    let mut catches = Vec::new();
    while parser.check(&Token::Catch) {
        let catch_start = parser.current_span();
        parser.advance();
        parser.expect(Token::LeftParen)?;
        let mut types = vec![parse_type(parser)?];
        while parser.eat(&Token::Pipe) {
            types.push(parse_type(parser)?);
        }
        let name = parser.expect_ident()?;
        parser.expect(Token::RightParen)?;
        let catch_body = parse_block(parser)?;
        catches.push(CatchClause {
            types,
            name,
            span: catch_start.to(&catch_body.span),
            body: catch_body,
        });
    }

    if parser.check(&Token::Finally) {
        return Err(ParseError::unsupported("'finally'", parser.current_span()));
    }
    if catches.is_empty() {
        return Err(ParseError::invalid_syntax(
            "'try' without 'catch'",
            start,
        ));
    }

    Ok(TryStmt {
        body,
        catches,
        span: start.to(&parser.previous_span()),
    })
}
