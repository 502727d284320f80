//! Abstract syntax tree for Veil source.

use crate::parser::token::Span;
use crate::vm::types::Modifiers;

/// A whole source file
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub package: Option<QualifiedName>,
    pub imports: Vec<QualifiedName>,
    pub classes: Vec<ClassDecl>,
    pub span: Span,
}

/// An identifier with its location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// A dotted name such as `veil.InvocationHandler`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub parts: Vec<Ident>,
    pub span: Span,
}

impl QualifiedName {
    pub fn is_simple(&self) -> bool {
        self.parts.len() == 1
    }

    /// Last segment
    pub fn last(&self) -> &str {
        self.parts.last().map(|p| p.name.as_str()).unwrap_or_default()
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.parts.iter().map(|p| p.name.as_str()).collect();
        write!(f, "{}", names.join("."))
    }
}

/// Modifier keywords written on a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierList {
    pub modifiers: Modifiers,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub modifiers: ModifierList,
    pub kind: ClassKind,
    pub name: Ident,
    /// Superclass of a class, or super-interfaces of an interface
    pub extends: Vec<TypeExpr>,
    pub implements: Vec<TypeExpr>,
    pub members: Vec<Member>,
    pub span: Span,
}

/// A type as written in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    /// Array dimensions
    pub dims: usize,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExprKind {
    Void,
    Boolean,
    Int,
    Long,
    Double,
    Named(QualifiedName),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Constructor(ConstructorDecl),
    Method(MethodDecl),
    StaticInit(Block),
}

impl Member {
    pub fn span(&self) -> Span {
        match self {
            Member::Field(f) => f.span,
            Member::Constructor(c) => c.span,
            Member::Method(m) => m.span,
            Member::StaticInit(b) => b.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub modifiers: ModifierList,
    pub ty: TypeExpr,
    pub name: Ident,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: TypeExpr,
    pub name: Ident,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub modifiers: ModifierList,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub modifiers: ModifierList,
    pub return_type: TypeExpr,
    pub name: Ident,
    pub params: Vec<Param>,
    /// `None` for abstract and interface methods
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Return { value: Option<Expr>, span: Span },
    Throw { value: Expr, span: Span },
    Try(TryStmt),
    Block(Block),
    Expr(Expr),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Return { span, .. } | Stmt::Throw { span, .. } => *span,
            Stmt::Try(t) => t.span,
            Stmt::Block(b) => b.span,
            Stmt::Expr(e) => e.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStmt {
    pub body: Block,
    pub catches: Vec<CatchClause>,
    pub span: Span,
}

/// `catch (A | B name) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub types: Vec<TypeExpr>,
    pub name: Ident,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Null,
    Bool(bool),
    Int(i64),
    Long(i64),
    Str(String),
    This,
    /// A simple name: local, parameter, field or the start of a type name
    Name(String),
    Field {
        target: Box<Expr>,
        name: Ident,
    },
    /// A call; without a target the receiver is `this` (or the current class)
    Call {
        target: Option<Box<Expr>>,
        name: Ident,
        args: Vec<Expr>,
    },
    /// `super(args)` inside a constructor
    SuperCall {
        args: Vec<Expr>,
    },
    New {
        ty: TypeExpr,
        args: Vec<Expr>,
    },
    /// `new T[] { a, b }`
    NewArray {
        element: TypeExpr,
        elements: Vec<Expr>,
    },
    Cast {
        ty: TypeExpr,
        expr: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Interpret a name/field chain as a dotted name, e.g. `demo.Util`
    pub fn as_dotted_name(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Name(name) => Some(name.clone()),
            ExprKind::Field { target, name } => {
                target.as_dotted_name().map(|prefix| format!("{}.{}", prefix, name.name))
            }
            _ => None,
        }
    }
}
