//! Typed intermediate form
//!
//! The checker resolves every name, overload and conversion and produces this
//! tree; the code generator lowers it to bytecode without further lookups.

use std::fmt;

use crate::vm::types::{MethodDescriptor, Modifiers, TypeKind, TypeRef};

/// Static type of an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Ty {
    /// The `null` literal
    Null,
    /// A call to a `void` method
    Void,
    Value(TypeRef),
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Null => write!(f, "null"),
            Ty::Void => write!(f, "void"),
            Ty::Value(ty) => write!(f, "{}", ty),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TExpr {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Str(String),
    /// Local slot; slot 0 is `this` in instance bodies
    Local(u16),
    Field {
        object: Box<TExpr>,
        name: String,
    },
    Static {
        owner: String,
        name: String,
    },
    StoreLocal {
        slot: u16,
        value: Box<TExpr>,
        keep: bool,
    },
    /// `temp` holds the value when the assignment result is used
    StoreField {
        object: Box<TExpr>,
        name: String,
        value: Box<TExpr>,
        temp: Option<u16>,
    },
    StoreStatic {
        owner: String,
        name: String,
        value: Box<TExpr>,
        keep: bool,
    },
    CallVirtual {
        receiver: Box<TExpr>,
        name: String,
        descriptor: MethodDescriptor,
        args: Vec<TExpr>,
    },
    CallStatic {
        owner: String,
        name: String,
        descriptor: MethodDescriptor,
        args: Vec<TExpr>,
    },
    New {
        class: String,
        descriptor: MethodDescriptor,
        args: Vec<TExpr>,
    },
    NewArray {
        element: TypeRef,
        elements: Vec<TExpr>,
    },
    /// Runtime-checked cast
    Cast {
        ty: TypeRef,
        value: Box<TExpr>,
    },
}

impl TExpr {
    /// Whether evaluating leaves a value on the operand stack
    pub(crate) fn pushes_value(&self) -> bool {
        match self {
            TExpr::StoreLocal { keep, .. } | TExpr::StoreStatic { keep, .. } => *keep,
            TExpr::StoreField { temp, .. } => temp.is_some(),
            TExpr::CallVirtual { descriptor, .. } | TExpr::CallStatic { descriptor, .. } => {
                !descriptor.return_type.is_void()
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TStmt {
    /// Expression evaluated for its effect; any value it leaves is popped
    Expr(TExpr),
    Return(Option<TExpr>),
    Throw(TExpr),
    Block(Vec<TStmt>),
    Try {
        body: Vec<TStmt>,
        body_completes: bool,
        catches: Vec<TCatch>,
    },
    /// Superclass constructor call on `this`
    SuperCall {
        class: String,
        descriptor: MethodDescriptor,
        args: Vec<TExpr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TCatch {
    pub types: Vec<String>,
    pub slot: u16,
    pub body: Vec<TStmt>,
    pub completes: bool,
}

/// A checked code body
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TBody {
    pub max_locals: u16,
    pub stmts: Vec<TStmt>,
    /// Control can reach the end of the body; a `void` return is appended
    pub completes: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MethodIr {
    pub name: String,
    pub params: Vec<TypeRef>,
    pub return_type: TypeRef,
    pub modifiers: Modifiers,
    /// `None` for abstract methods
    pub body: Option<TBody>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldIr {
    pub name: String,
    pub ty: TypeRef,
    pub modifiers: Modifiers,
}

/// A checked class ready for code generation
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClassIr {
    pub name: String,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldIr>,
    pub constructors: Vec<MethodIr>,
    pub methods: Vec<MethodIr>,
    pub static_init: Option<TBody>,
    pub source_file: String,
}
