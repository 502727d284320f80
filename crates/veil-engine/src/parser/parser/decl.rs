//! Declaration parsing: compilation unit, classes and members

use super::recovery::{sync_to_class_boundary, sync_to_member_boundary};
use super::stmt::parse_block;
use super::types::{parse_qualified_name, parse_type};
use super::{ParseError, Parser};
use crate::parser::ast::{
    ClassDecl, ClassKind, CompilationUnit, ConstructorDecl, FieldDecl, Ident, Member, MethodDecl,
    ModifierList, Param, TypeExpr,
};
use crate::parser::token::Token;

/// Parse `package`, `import`s and every class declaration
pub fn parse_compilation_unit(parser: &mut Parser) -> CompilationUnit {
    let start = parser.current_span();

    let mut package = None;
    if parser.eat(&Token::Package) {
        match parse_qualified_name(parser).and_then(|name| {
            parser.expect(Token::Semicolon)?;
            Ok(name)
        }) {
            Ok(name) => package = Some(name),
            Err(err) => {
                parser.report(err);
                sync_to_class_boundary(parser);
            }
        }
    }

    let mut imports = Vec::new();
    while parser.eat(&Token::Import) {
        match parse_qualified_name(parser).and_then(|name| {
            parser.expect(Token::Semicolon)?;
            Ok(name)
        }) {
            Ok(name) => imports.push(name),
            Err(err) => {
                parser.report(err);
                sync_to_class_boundary(parser);
            }
        }
    }

    let mut classes = Vec::new();
    while !parser.at_eof() {
        let before = parser.pos;
        match parse_class(parser) {
            Ok(class) => classes.push(class),
            Err(err) => {
                parser.report(err);
                sync_to_class_boundary(parser);
                if parser.pos == before {
                    parser.advance();
                }
            }
        }
    }

    CompilationUnit {
        package,
        imports,
        classes,
        span: start.to(&parser.current_span()),
    }
}

fn parse_modifiers(parser: &mut Parser) -> ModifierList {
    let mut list = ModifierList::default();
    while parser.current().is_modifier() {
        let span = parser.current_span();
        let word = parser.advance().to_string();
        let before = list.modifiers;
        list.modifiers.apply_keyword(&word);
        if before == list.modifiers {
            parser.report(ParseError::invalid_syntax(format!("duplicate modifier '{}'", word), span));
        }
        list.span = Some(match list.span {
            Some(first) => first.to(&span),
            None => span,
        });
    }
    list
}

fn parse_type_list(parser: &mut Parser) -> Result<Vec<TypeExpr>, ParseError> {
    let mut types = vec![parse_type(parser)?];
    while parser.eat(&Token::Comma) {
        types.push(parse_type(parser)?);
    }
    Ok(types)
}

/// Parse one class or interface declaration
pub fn parse_class(parser: &mut Parser) -> Result<ClassDecl, ParseError> {
    let start = parser.current_span();
    let modifiers = parse_modifiers(parser);

    let kind = match parser.current() {
        Token::Class => ClassKind::Class,
        Token::Interface => ClassKind::Interface,
        _ => return Err(parser.unexpected(&[Token::Class, Token::Interface])),
    };
    parser.advance();
    let name = parser.expect_ident()?;

    let mut extends = Vec::new();
    if parser.eat(&Token::Extends) {
        extends = parse_type_list(parser)?;
        if kind == ClassKind::Class && extends.len() > 1 {
            parser.report(ParseError::invalid_syntax(
                "a class can extend only one class",
                extends[1].span,
            ));
        }
    }

    let mut implements = Vec::new();
    if parser.check(&Token::Implements) {
        let span = parser.current_span();
        parser.advance();
        implements = parse_type_list(parser)?;
        if kind == ClassKind::Interface {
            parser.report(ParseError::invalid_syntax(
                "an interface cannot implement other types; use 'extends'",
                span,
            ));
        }
    }

    parser.expect(Token::LeftBrace)?;
    let mut members = Vec::new();
    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        let before = parser.pos;
        match parse_member(parser, &name) {
            Ok(member) => members.push(member),
            Err(err) => {
                parser.report(err);
                sync_to_member_boundary(parser);
                if parser.pos == before {
                    parser.advance();
                }
            }
        }
    }
    parser.expect(Token::RightBrace)?;

    Ok(ClassDecl {
        modifiers,
        kind,
        name,
        extends,
        implements,
        members,
        span: start.to(&parser.previous_span()),
    })
}

fn parse_params(parser: &mut Parser) -> Result<Vec<Param>, ParseError> {
    parser.expect(Token::LeftParen)?;
    let mut params = Vec::new();
    if !parser.check(&Token::RightParen) {
        loop {
            let ty = parse_type(parser)?;
            let name = parser.expect_ident()?;
            params.push(Param { ty, name });
            if !parser.eat(&Token::Comma) {
                break;
            }
        }
    }
    parser.expect(Token::RightParen)?;
    Ok(params)
}

/// Parse a field, constructor, method or static initializer
pub fn parse_member(parser: &mut Parser, class_name: &Ident) -> Result<Member, ParseError> {
    let start = parser.current_span();

    if parser.check(&Token::Static) && matches!(parser.peek_nth(1), Token::LeftBrace) {
        parser.advance();
        let mut body = parse_block(parser)?;
        body.span = start.to(&body.span);
        return Ok(Member::StaticInit(body));
    }

    let modifiers = parse_modifiers(parser);

    let is_constructor = matches!(parser.current(), Token::Identifier(n) if *n == class_name.name)
        && matches!(parser.peek_nth(1), Token::LeftParen);
    if is_constructor {
        let name = parser.expect_ident()?;
        let params = parse_params(parser)?;
        let body = parse_block(parser)?;
        return Ok(Member::Constructor(ConstructorDecl {
            modifiers,
            name,
            params,
            body,
            span: start.to(&parser.previous_span()),
        }));
    }

    let ty = parse_type(parser)?;
    let name = parser.expect_ident()?;

    if parser.check(&Token::LeftParen) {
        let params = parse_params(parser)?;
        let body = if parser.eat(&Token::Semicolon) {
            None
        } else {
            Some(parse_block(parser)?)
        };
        return Ok(Member::Method(MethodDecl {
            modifiers,
            return_type: ty,
            name,
            params,
            body,
            span: start.to(&parser.previous_span()),
        }));
    }

    let init = if parser.eat(&Token::Equal) {
        Some(super::expr::parse_expression(parser)?)
    } else {
        None
    };
    parser.expect(Token::Semicolon)?;
    Ok(Member::Field(FieldDecl {
        modifiers,
        ty,
        name,
        init,
        span: start.to(&parser.previous_span()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{ExprKind, Stmt};

    fn parse(source: &str) -> CompilationUnit {
        Parser::new(source).unwrap().parse().unwrap()
    }

    #[test]
    fn test_package_imports_and_classes() {
        let unit = parse(
            "package demo.api; import veil.Method; \
             public interface Greeter extends Named { String greet(String who); } \
             final class Impl implements Greeter { }",
        );
        assert_eq!(unit.package.unwrap().to_string(), "demo.api");
        assert_eq!(unit.imports[0].to_string(), "veil.Method");
        assert_eq!(unit.classes.len(), 2);
        assert_eq!(unit.classes[0].kind, ClassKind::Interface);
        assert!(unit.classes[0].modifiers.modifiers.is_public);
        assert!(unit.classes[1].modifiers.modifiers.is_final);
        assert_eq!(unit.classes[1].implements.len(), 1);
    }

    #[test]
    fn test_members() {
        let unit = parse(
            "class P extends Base { \
               private static Method m0; \
               protected int count = 3; \
               static { m0 = Method.find(\"A\", \"f\", new String[] {}); } \
               P(veil.InvocationHandler h) { super(h); } \
               public final String f(int a, Object[] rest) { return null; } \
               abstract void g(); \
             }",
        );
        let members = &unit.classes[0].members;
        assert_eq!(members.len(), 6);
        assert!(matches!(&members[0], Member::Field(f) if f.modifiers.modifiers.is_static));
        assert!(matches!(&members[1], Member::Field(f) if f.init.is_some()));
        assert!(matches!(&members[2], Member::StaticInit(b) if b.stmts.len() == 1));
        match &members[3] {
            Member::Constructor(c) => {
                assert_eq!(c.params.len(), 1);
                assert!(matches!(
                    &c.body.stmts[0],
                    Stmt::Expr(e) if matches!(e.kind, ExprKind::SuperCall { .. })
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &members[4] {
            Member::Method(m) => {
                assert_eq!(m.params[1].ty.dims, 1);
                assert!(m.body.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&members[5], Member::Method(m) if m.body.is_none()));
    }

    #[test]
    fn test_duplicate_modifier_reported() {
        let errors = Parser::new("public public class A {}").unwrap().parse().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("duplicate modifier"));
    }

    #[test]
    fn test_recovers_to_report_several_errors() {
        let errors = Parser::new(
            "class A { int ; void f() { return } } class B { void g() { try { } finally { } } }",
        )
        .unwrap()
        .parse()
        .unwrap_err();
        assert!(errors.len() >= 2, "{:?}", errors);
        assert!(errors.iter().any(|e| e.message.contains("'finally' is not supported")));
    }

    #[test]
    fn test_try_without_catch() {
        let errors = Parser::new("class A { void f() { try { } } }")
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(errors[0].message.contains("without 'catch'"));
    }
}
