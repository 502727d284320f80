//! Error recovery strategies for the parser.
//!
//! After an error the parser skips tokens until a point where member or
//! class parsing can resume.

use super::Parser;
use crate::parser::token::Token;

/// Skip to the next member of the enclosing class body.
///
/// Stops after a `;` or a balanced `{ ... }` block, or before a modifier
/// or the closing brace of the class.
pub fn sync_to_member_boundary(parser: &mut Parser) {
    let mut depth = 0usize;
    while !parser.at_eof() {
        match parser.current() {
            Token::LeftBrace => {
                depth += 1;
                parser.advance();
            }
            Token::RightBrace => {
                if depth == 0 {
                    return;
                }
                depth -= 1;
                parser.advance();
                if depth == 0 {
                    return;
                }
            }
            Token::Semicolon => {
                parser.advance();
                if depth == 0 {
                    return;
                }
            }
            token if depth == 0 && token.is_modifier() => return,
            _ => {
                parser.advance();
            }
        }
    }
}

/// Skip to the next top-level class declaration.
pub fn sync_to_class_boundary(parser: &mut Parser) {
    let mut depth = 0usize;
    while !parser.at_eof() {
        match parser.current() {
            Token::LeftBrace => depth += 1,
            Token::RightBrace => {
                depth = depth.saturating_sub(1);
                parser.advance();
                if depth == 0 {
                    return;
                }
                continue;
            }
            Token::Class | Token::Interface if depth == 0 => return,
            token if depth == 0 && token.is_modifier() => return,
            _ => {}
        }
        parser.advance();
    }
}

/// Skip to the end of the current statement.
pub fn sync_to_statement_boundary(parser: &mut Parser) {
    while !parser.at_eof() {
        match parser.current() {
            Token::Semicolon => {
                parser.advance();
                return;
            }
            Token::RightBrace => return,
            _ => {
                parser.advance();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_boundary_skips_block() {
        let mut parser = Parser::new("garbage { a; { b; } } public int x;").unwrap();
        sync_to_member_boundary(&mut parser);
        assert!(parser.check(&Token::Public));
    }

    #[test]
    fn test_member_boundary_stops_at_class_end() {
        let mut parser = Parser::new("x y } class B {}").unwrap();
        sync_to_member_boundary(&mut parser);
        assert!(parser.check(&Token::RightBrace));
    }

    #[test]
    fn test_class_boundary() {
        let mut parser = Parser::new("oops { nested } class B {}").unwrap();
        sync_to_class_boundary(&mut parser);
        assert!(parser.check(&Token::Class));
    }
}
