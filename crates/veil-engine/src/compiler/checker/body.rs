//! Statement and expression checking
//!
//! A [`BodyChecker`] checks one method, constructor or static initializer
//! body and lowers it to the typed IR. Errors are pushed to the shared
//! diagnostic list; [`Reported`] only signals that the current construct
//! could not be typed.

use std::rc::Rc;

use crate::compiler::diagnostic::{Diagnostic, DiagnosticCode};
use crate::compiler::env::{package_of, ClassSig, FieldSig, MethodSig, TypeEnv};
use crate::compiler::ir::{TBody, TCatch, TExpr, TStmt, Ty};
use crate::parser::ast::{Block, CatchClause, Expr, ExprKind, FieldDecl, Ident, Stmt, TryStmt, TypeExpr};
use crate::parser::Span;
use crate::vm::builtins::{self, OBJECT, THROWABLE};
use crate::vm::throwable::is_builtin_throwable;
use crate::vm::types::{MethodDescriptor, Modifiers, TypeRef};

/// The error was already recorded as a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Reported;

type Check<T> = Result<T, Reported>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyKind {
    Method,
    Constructor,
    StaticInit,
}

/// A piece of the static initializer, in source order
pub(crate) enum StaticPart<'p> {
    Field(&'p FieldDecl),
    Block(&'p Block),
}

struct Local {
    name: String,
    slot: u16,
    ty: TypeRef,
}

struct Arg {
    expr: TExpr,
    ty: Ty,
    span: Span,
}

/// An assignable location
enum Place {
    Local { slot: u16, ty: TypeRef },
    Field { object: TExpr, field: FieldSig },
    Static { field: FieldSig },
}

/// Receiver of a method call
enum Receiver {
    /// Unqualified call inside the current class
    Implicit,
    /// Static call through a type name
    Type,
    Value(TExpr),
}

pub(crate) struct BodyChecker<'a, 'u> {
    env: &'a TypeEnv<'u>,
    class: Rc<ClassSig>,
    kind: BodyKind,
    is_static: bool,
    return_type: TypeRef,
    scopes: Vec<Vec<Local>>,
    next_slot: u16,
    max_locals: u16,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a, 'u> BodyChecker<'a, 'u> {
    pub fn new(
        env: &'a TypeEnv<'u>,
        class: Rc<ClassSig>,
        kind: BodyKind,
        is_static: bool,
        return_type: TypeRef,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        let next_slot = u16::from(!is_static);
        Self {
            env,
            class,
            kind,
            is_static,
            return_type,
            scopes: vec![Vec::new()],
            next_slot,
            max_locals: next_slot,
            diagnostics,
        }
    }

    /// Declare the next parameter
    pub fn param(&mut self, name: &Ident, ty: TypeRef) {
        self.declare(name, ty);
    }

    pub fn method_body(mut self, block: &Block) -> TBody {
        let (stmts, completes) = self.block(&block.stmts);
        if completes && !self.return_type.is_void() {
            self.error(DiagnosticCode::ControlFlow, "missing return statement", block.span);
        }
        self.finish(stmts, completes)
    }

    /// Constructor body: superclass constructor call, instance field
    /// initializers, then the remaining statements
    ///
    /// Field initializer diagnostics are dropped unless `report_inits` is set,
    /// so that a class with several constructors reports them once.
    pub fn constructor_body(mut self, block: &Block, inits: &[&FieldDecl], report_inits: bool, span: Span) -> TBody {
        let mut stmts = Vec::new();
        let mut rest = block.stmts.as_slice();

        let super_call = match rest.first() {
            Some(Stmt::Expr(Expr {
                kind: ExprKind::SuperCall { args },
                span,
            })) => {
                rest = &rest[1..];
                self.super_call(args, *span)
            }
            _ => self.super_call(&[], span),
        };
        if let Ok(stmt) = super_call {
            stmts.push(stmt);
        }

        let mark = self.diagnostics.len();
        let saved = std::mem::replace(&mut self.scopes, vec![Vec::new()]);
        for field in inits {
            if let Ok(stmt) = self.field_init(field) {
                stmts.push(stmt);
            }
        }
        self.scopes = saved;
        if !report_inits {
            self.diagnostics.truncate(mark);
        }

        let (body, completes) = self.block(rest);
        stmts.extend(body);
        self.finish(stmts, completes)
    }

    pub fn static_init_body(mut self, parts: &[StaticPart<'_>]) -> TBody {
        let mut stmts = Vec::new();
        for part in parts {
            match part {
                StaticPart::Field(field) => {
                    if let Ok(stmt) = self.field_init(field) {
                        stmts.push(stmt);
                    }
                }
                StaticPart::Block(block) => {
                    self.scopes.push(Vec::new());
                    let (body, completes) = self.block(&block.stmts);
                    self.scopes.pop();
                    if !completes {
                        self.error(
                            DiagnosticCode::ControlFlow,
                            "static initializer must be able to complete normally",
                            block.span,
                        );
                    }
                    stmts.push(TStmt::Block(body));
                }
            }
        }
        self.finish(stmts, true)
    }

    fn finish(self, stmts: Vec<TStmt>, completes: bool) -> TBody {
        TBody {
            max_locals: self.max_locals,
            stmts,
            completes,
        }
    }

    fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) -> Reported {
        self.diagnostics.push(Diagnostic::error(code, message, span));
        Reported
    }

    fn alloc(&mut self) -> u16 {
        let slot = self.next_slot;
        self.next_slot = self.next_slot.saturating_add(1);
        self.max_locals = self.max_locals.max(self.next_slot);
        slot
    }

    fn declare(&mut self, name: &Ident, ty: TypeRef) -> u16 {
        if self.lookup_local(&name.name).is_some() {
            self.error(
                DiagnosticCode::Duplicate,
                format!("variable '{}' is already defined", name.name),
                name.span,
            );
        }
        let slot = self.alloc();
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(Local {
                name: name.name.clone(),
                slot,
                ty,
            });
        }
        slot
    }

    fn lookup_local(&self, name: &str) -> Option<&Local> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|local| local.name == name)
    }

    fn resolve_type(&mut self, ty: &TypeExpr) -> Check<TypeRef> {
        self.env
            .resolve_type(ty)
            .map_err(|name| self.error(DiagnosticCode::UnknownSymbol, format!("cannot find type '{}'", name), ty.span))
    }

    fn accessible(&self, modifiers: Modifiers, declaring: &str) -> bool {
        if modifiers.is_public || builtins::is_builtin_value_type(declaring) {
            return true;
        }
        if modifiers.is_private {
            return declaring == self.class.name;
        }
        package_of(declaring) == package_of(&self.class.name)
            || (modifiers.is_protected && self.env.is_subtype(&self.class.name, declaring))
    }

    fn check_access(&mut self, modifiers: Modifiers, declaring: &str, what: &str, span: Span) -> Check<()> {
        if self.accessible(modifiers, declaring) {
            return Ok(());
        }
        let level = if modifiers.is_private {
            "private"
        } else if modifiers.is_protected {
            "protected"
        } else {
            "package-private"
        };
        Err(self.error(
            DiagnosticCode::Access,
            format!("{} has {} access in '{}'", what, level, declaring),
            span,
        ))
    }

    // Statements

    fn block(&mut self, stmts: &[Stmt]) -> (Vec<TStmt>, bool) {
        let mut out = Vec::with_capacity(stmts.len());
        let mut completes = true;
        for stmt in stmts {
            if !completes {
                self.error(DiagnosticCode::ControlFlow, "unreachable statement", stmt.span());
                break;
            }
            if let Ok((checked, next)) = self.stmt(stmt) {
                out.push(checked);
                completes = next;
            }
        }
        (out, completes)
    }

    fn stmt(&mut self, stmt: &Stmt) -> Check<(TStmt, bool)> {
        match stmt {
            Stmt::Return { value, span } => self.return_stmt(value.as_ref(), *span).map(|s| (s, false)),
            Stmt::Throw { value, .. } => {
                let (expr, ty) = self.expr(value)?;
                let throwable = match &ty {
                    Ty::Null => true,
                    Ty::Value(TypeRef::Named(name)) => self.env.is_subtype(name, THROWABLE),
                    _ => false,
                };
                if !throwable {
                    return Err(self.error(
                        DiagnosticCode::TypeMismatch,
                        format!("incompatible types: {} cannot be converted to Throwable", ty),
                        value.span,
                    ));
                }
                Ok((TStmt::Throw(expr), false))
            }
            Stmt::Try(try_stmt) => self.try_stmt(try_stmt),
            Stmt::Block(block) => {
                self.scopes.push(Vec::new());
                let (body, completes) = self.block(&block.stmts);
                self.scopes.pop();
                Ok((TStmt::Block(body), completes))
            }
            Stmt::Expr(expr) => self.expr_stmt(expr).map(|e| (TStmt::Expr(e), true)),
        }
    }

    fn return_stmt(&mut self, value: Option<&Expr>, span: Span) -> Check<TStmt> {
        match (self.kind, value) {
            (BodyKind::StaticInit, _) => Err(self.error(DiagnosticCode::ControlFlow, "return outside method", span)),
            (BodyKind::Constructor, Some(value)) => Err(self.error(
                DiagnosticCode::TypeMismatch,
                "cannot return a value from a constructor",
                value.span,
            )),
            (BodyKind::Constructor, None) => Ok(TStmt::Return(None)),
            (BodyKind::Method, None) if self.return_type.is_void() => Ok(TStmt::Return(None)),
            (BodyKind::Method, None) => Err(self.error(DiagnosticCode::TypeMismatch, "missing return value", span)),
            (BodyKind::Method, Some(value)) if self.return_type.is_void() => Err(self.error(
                DiagnosticCode::TypeMismatch,
                "cannot return a value from a method with void result type",
                value.span,
            )),
            (BodyKind::Method, Some(value)) => {
                let (expr, ty) = self.expr(value)?;
                let target = self.return_type.clone();
                let expr = self.coerce(expr, &ty, &target, value.span)?;
                Ok(TStmt::Return(Some(expr)))
            }
        }
    }

    fn expr_stmt(&mut self, expr: &Expr) -> Check<TExpr> {
        match &expr.kind {
            ExprKind::Assign { target, value } => self.assign(target, value, false).map(|(e, _)| e),
            ExprKind::Call { .. } | ExprKind::New { .. } => self.expr(expr).map(|(e, _)| e),
            ExprKind::SuperCall { .. } => Err(self.misplaced_super(expr.span)),
            _ => Err(self.error(DiagnosticCode::ControlFlow, "not a statement", expr.span)),
        }
    }

    fn misplaced_super(&mut self, span: Span) -> Reported {
        self.error(
            DiagnosticCode::ControlFlow,
            "call to super must be the first statement in a constructor",
            span,
        )
    }

    fn try_stmt(&mut self, stmt: &TryStmt) -> Check<(TStmt, bool)> {
        self.scopes.push(Vec::new());
        let (body, body_completes) = self.block(&stmt.body.stmts);
        self.scopes.pop();

        let mut caught: Vec<String> = Vec::new();
        let mut catches = Vec::with_capacity(stmt.catches.len());
        let mut completes = body_completes;
        for clause in &stmt.catches {
            match self.catch_clause(clause, &mut caught) {
                Ok(checked) => {
                    completes |= checked.completes;
                    catches.push(checked);
                }
                Err(Reported) => completes = true,
            }
        }
        Ok((
            TStmt::Try {
                body,
                body_completes,
                catches,
            },
            completes,
        ))
    }

    fn catch_clause(&mut self, clause: &CatchClause, caught: &mut Vec<String>) -> Check<TCatch> {
        let mut types: Vec<String> = Vec::with_capacity(clause.types.len());
        for ty in &clause.types {
            let name = match self.resolve_type(ty)? {
                TypeRef::Named(name) if self.env.is_subtype(&name, THROWABLE) => name,
                other => {
                    return Err(self.error(
                        DiagnosticCode::TypeMismatch,
                        format!("incompatible types: {} cannot be converted to Throwable", other),
                        ty.span,
                    ))
                }
            };
            let earlier = caught.iter().find(|c| self.env.is_subtype(&name, c)).cloned();
            if let Some(earlier) = earlier {
                return Err(self.error(
                    DiagnosticCode::ControlFlow,
                    format!("exception '{}' has already been caught by '{}'", name, earlier),
                    ty.span,
                ));
            }
            let related = types
                .iter()
                .any(|t| self.env.is_subtype(&name, t) || self.env.is_subtype(t, &name));
            if related {
                return Err(self.error(
                    DiagnosticCode::TypeMismatch,
                    "alternatives in a multi-catch statement cannot be related by subclassing",
                    ty.span,
                ));
            }
            types.push(name);
        }
        caught.extend(types.iter().cloned());

        let var_type = match types.as_slice() {
            [single] => TypeRef::named(single.clone()),
            _ => TypeRef::named(self.env.common_throwable(&types)),
        };
        self.scopes.push(Vec::new());
        let slot = self.declare(&clause.name, var_type);
        let (body, completes) = self.block(&clause.body.stmts);
        self.scopes.pop();
        Ok(TCatch {
            types,
            slot,
            body,
            completes,
        })
    }

    fn field_init(&mut self, field: &FieldDecl) -> Check<TStmt> {
        let Some(init) = &field.init else {
            return Err(Reported);
        };
        let Some(sig) = self.class.field(&field.name.name).cloned() else {
            return Err(Reported);
        };
        let (value, ty) = self.expr(init)?;
        let value = Box::new(self.coerce(value, &ty, &sig.ty, init.span)?);
        let store = if sig.modifiers.is_static {
            TExpr::StoreStatic {
                owner: self.class.name.clone(),
                name: sig.name,
                value,
                keep: false,
            }
        } else {
            TExpr::StoreField {
                object: Box::new(TExpr::Local(0)),
                name: sig.name,
                value,
                temp: None,
            }
        };
        Ok(TStmt::Expr(store))
    }

    fn super_call(&mut self, args: &[Expr], span: Span) -> Check<TStmt> {
        let args = self.args(args)?;
        let Some(superclass) = self.class.superclass.clone() else {
            if !args.is_empty() {
                return Err(self.error(
                    DiagnosticCode::Resolution,
                    "constructor 'Object' takes no arguments",
                    span,
                ));
            }
            return Ok(TStmt::SuperCall {
                class: OBJECT.to_string(),
                descriptor: MethodDescriptor::new(Vec::new(), TypeRef::Void),
                args: Vec::new(),
            });
        };
        let Some(parent) = self.env.class(&superclass) else {
            return Err(self.error(
                DiagnosticCode::UnknownSymbol,
                format!("cannot find type '{}'", superclass),
                span,
            ));
        };
        let candidates: Vec<Vec<TypeRef>> = parent.ctors.iter().map(|c| c.params.clone()).collect();
        let what = format!("constructor '{}'", superclass);
        let index = self.select(&what, &candidates, &args, span)?;
        let ctor = parent.ctors[index].clone();
        self.check_access(ctor.modifiers, &ctor.declaring, &what, span)?;
        let args = self.coerce_args(args, &ctor.params)?;
        Ok(TStmt::SuperCall {
            class: superclass,
            descriptor: MethodDescriptor::new(ctor.params, TypeRef::Void),
            args,
        })
    }

    // Expressions

    fn expr(&mut self, expr: &Expr) -> Check<(TExpr, Ty)> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Null => Ok((TExpr::Null, Ty::Null)),
            ExprKind::Bool(value) => Ok((TExpr::Bool(*value), Ty::Value(TypeRef::Boolean))),
            ExprKind::Int(value) => match i32::try_from(*value) {
                Ok(value) => Ok((TExpr::Int(value), Ty::Value(TypeRef::Int))),
                Err(_) => Err(self.error(
                    DiagnosticCode::TypeMismatch,
                    format!("integer number too large: {}", value),
                    span,
                )),
            },
            ExprKind::Long(value) => Ok((TExpr::Long(*value), Ty::Value(TypeRef::Long))),
            ExprKind::Str(value) => Ok((TExpr::Str(value.clone()), Ty::Value(TypeRef::string()))),
            ExprKind::This => {
                if self.is_static {
                    return Err(self.error(
                        DiagnosticCode::Access,
                        "cannot reference 'this' from a static context",
                        span,
                    ));
                }
                Ok((TExpr::Local(0), Ty::Value(TypeRef::named(self.class.name.clone()))))
            }
            ExprKind::Name(name) => self.name(name, span),
            ExprKind::Field { target, name } => self.field_access(target, name),
            ExprKind::Call { target, name, args } => self.call(target.as_deref(), name, args, span),
            ExprKind::SuperCall { .. } => Err(self.misplaced_super(span)),
            ExprKind::New { ty, args } => self.new_instance(ty, args, span),
            ExprKind::NewArray { element, elements } => self.new_array(element, elements),
            ExprKind::Cast { ty, expr } => self.cast(ty, expr, span),
            ExprKind::Assign { target, value } => {
                let (expr, ty) = self.assign(target, value, true)?;
                Ok((expr, Ty::Value(ty)))
            }
        }
    }

    fn name(&mut self, name: &str, span: Span) -> Check<(TExpr, Ty)> {
        if let Some(local) = self.lookup_local(name) {
            return Ok((TExpr::Local(local.slot), Ty::Value(local.ty.clone())));
        }
        if self.env.find_field(&self.class.name, name).is_some() {
            return match self.implicit_field(name, span)? {
                Place::Static { field } => Ok((
                    TExpr::Static {
                        owner: field.declaring,
                        name: field.name,
                    },
                    Ty::Value(field.ty),
                )),
                Place::Field { object, field } => Ok((
                    TExpr::Field {
                        object: Box::new(object),
                        name: field.name,
                    },
                    Ty::Value(field.ty),
                )),
                Place::Local { .. } => Err(Reported),
            };
        }
        if let Some(ty) = self.env.resolve_simple(name) {
            return Err(self.error(
                DiagnosticCode::TypeMismatch,
                format!("expected a value, found type '{}'", ty),
                span,
            ));
        }
        Err(self.error(
            DiagnosticCode::UnknownSymbol,
            format!("cannot find symbol '{}'", name),
            span,
        ))
    }

    /// A field of the current class named without a qualifier
    fn implicit_field(&mut self, name: &str, span: Span) -> Check<Place> {
        let class_name = self.class.name.clone();
        let field = self.member_field(&class_name, name, span)?;
        if field.modifiers.is_static {
            return Ok(Place::Static { field });
        }
        if self.is_static {
            return Err(self.error(
                DiagnosticCode::Access,
                format!("non-static field '{}' cannot be referenced from a static context", name),
                span,
            ));
        }
        Ok(Place::Field {
            object: TExpr::Local(0),
            field,
        })
    }

    fn member_field(&mut self, owner: &str, name: &str, span: Span) -> Check<FieldSig> {
        let Some(field) = self.env.find_field(owner, name) else {
            return Err(self.error(
                DiagnosticCode::UnknownSymbol,
                format!("cannot find field '{}' in '{}'", name, owner),
                span,
            ));
        };
        self.check_access(field.modifiers, &field.declaring, &format!("field '{}'", name), span)?;
        Ok(field)
    }

    /// The type a qualifier names, when it is not a value
    ///
    /// Locals and fields shadow types of the same name, except for runtime
    /// package spellings such as `veil.Method`.
    fn static_target(&self, target: &Expr) -> Option<String> {
        let dotted = target.as_dotted_name()?;
        if let Some(builtin) = builtins::runtime_type(&dotted) {
            return Some(builtin.to_string());
        }
        let first = dotted.split('.').next()?;
        if self.lookup_local(first).is_some() || self.env.find_field(&self.class.name, first).is_some() {
            return None;
        }
        self.env.resolve_name(&dotted)
    }

    /// A field reached through a qualifier
    fn qualified_field(&mut self, target: &Expr, name: &Ident) -> Check<Place> {
        if let Some(owner) = self.static_target(target) {
            let field = self.member_field(&owner, &name.name, name.span)?;
            if !field.modifiers.is_static {
                return Err(self.error(
                    DiagnosticCode::Access,
                    format!("non-static field '{}' cannot be referenced from a static context", name.name),
                    name.span,
                ));
            }
            return Ok(Place::Static { field });
        }

        let (object, ty) = self.expr(target)?;
        let owner = match &ty {
            Ty::Value(TypeRef::Named(owner)) if !builtins::is_builtin_value_type(owner) => owner.clone(),
            _ => {
                return Err(self.error(
                    DiagnosticCode::UnknownSymbol,
                    format!("cannot find field '{}' in '{}'", name.name, ty),
                    name.span,
                ))
            }
        };
        let field = self.member_field(&owner, &name.name, name.span)?;
        if field.modifiers.is_static {
            return Err(self.error(
                DiagnosticCode::Access,
                format!("static field '{}' must be accessed through type '{}'", name.name, field.declaring),
                name.span,
            ));
        }
        Ok(Place::Field { object, field })
    }

    fn field_access(&mut self, target: &Expr, name: &Ident) -> Check<(TExpr, Ty)> {
        match self.qualified_field(target, name)? {
            Place::Static { field } => Ok((
                TExpr::Static {
                    owner: field.declaring,
                    name: field.name,
                },
                Ty::Value(field.ty),
            )),
            Place::Field { object, field } => Ok((
                TExpr::Field {
                    object: Box::new(object),
                    name: field.name,
                },
                Ty::Value(field.ty),
            )),
            Place::Local { .. } => Err(Reported),
        }
    }

    fn place(&mut self, target: &Expr) -> Check<Place> {
        match &target.kind {
            ExprKind::Name(name) => {
                if let Some(local) = self.lookup_local(name) {
                    return Ok(Place::Local {
                        slot: local.slot,
                        ty: local.ty.clone(),
                    });
                }
                if self.env.find_field(&self.class.name, name).is_none() {
                    return Err(self.error(
                        DiagnosticCode::UnknownSymbol,
                        format!("cannot find symbol '{}'", name),
                        target.span,
                    ));
                }
                self.implicit_field(name, target.span)
            }
            ExprKind::Field { target, name } => self.qualified_field(target, name),
            _ => Err(self.error(DiagnosticCode::TypeMismatch, "invalid assignment target", target.span)),
        }
    }

    fn check_final_assignment(&mut self, field: &FieldSig, span: Span) -> Check<()> {
        if !field.modifiers.is_final {
            return Ok(());
        }
        let in_initializer = field.declaring == self.class.name
            && match self.kind {
                BodyKind::Constructor => !field.modifiers.is_static,
                BodyKind::StaticInit => field.modifiers.is_static,
                BodyKind::Method => false,
            };
        if in_initializer {
            return Ok(());
        }
        Err(self.error(
            DiagnosticCode::Access,
            format!("cannot assign a value to final field '{}'", field.name),
            span,
        ))
    }

    /// Assignment; `keep` leaves the assigned value on the stack
    fn assign(&mut self, target: &Expr, value: &Expr, keep: bool) -> Check<(TExpr, TypeRef)> {
        let place = self.place(target)?;
        let target_type = match &place {
            Place::Local { ty, .. } => ty.clone(),
            Place::Field { field, .. } | Place::Static { field } => {
                self.check_final_assignment(field, target.span)?;
                field.ty.clone()
            }
        };
        let (expr, ty) = self.expr(value)?;
        let value = Box::new(self.coerce(expr, &ty, &target_type, value.span)?);

        let stored = match place {
            Place::Local { slot, .. } => TExpr::StoreLocal { slot, value, keep },
            Place::Static { field } => TExpr::StoreStatic {
                owner: field.declaring,
                name: field.name,
                value,
                keep,
            },
            Place::Field { object, field } => TExpr::StoreField {
                object: Box::new(object),
                name: field.name,
                value,
                temp: keep.then(|| self.alloc()),
            },
        };
        Ok((stored, target_type))
    }

    fn args(&mut self, args: &[Expr]) -> Check<Vec<Arg>> {
        let mut checked = Vec::with_capacity(args.len());
        let mut failed = false;
        for arg in args {
            match self.expr(arg) {
                Ok((expr, ty)) => checked.push(Arg {
                    expr,
                    ty,
                    span: arg.span,
                }),
                Err(Reported) => failed = true,
            }
        }
        if failed {
            Err(Reported)
        } else {
            Ok(checked)
        }
    }

    /// Methods named `name` callable on a receiver of type `owner`
    fn methods_of(&self, owner: &str, name: &str) -> Vec<MethodSig> {
        if builtins::is_builtin_value_type(owner) {
            self.env.builtin_methods(owner, name)
        } else {
            self.env.methods_named(owner, name)
        }
    }

    fn call(&mut self, target: Option<&Expr>, name: &Ident, args: &[Expr], span: Span) -> Check<(TExpr, Ty)> {
        let (receiver, owner) = match target {
            None => (Receiver::Implicit, self.class.name.clone()),
            Some(target) => match self.static_target(target) {
                Some(ty) => (Receiver::Type, ty),
                None => {
                    let (expr, ty) = self.expr(target)?;
                    match ty {
                        Ty::Value(TypeRef::Named(owner)) => (Receiver::Value(expr), owner),
                        other => {
                            return Err(self.error(
                                DiagnosticCode::TypeMismatch,
                                format!("cannot invoke '{}' on type {}", name.name, other),
                                name.span,
                            ))
                        }
                    }
                }
            },
        };

        let candidates = self.methods_of(&owner, &name.name);
        let args = self.args(args)?;
        let params: Vec<Vec<TypeRef>> = candidates.iter().map(|m| m.params.clone()).collect();
        let what = format!("method '{}' in '{}'", name.name, owner);
        let index = self.select(&what, &params, &args, span)?;
        let method = candidates[index].clone();
        self.check_access(method.modifiers, &method.declaring, &format!("method '{}'", method.key()), name.span)?;
        let args = self.coerce_args(args, &method.params)?;

        let result = if method.return_type.is_void() {
            Ty::Void
        } else {
            Ty::Value(method.return_type.clone())
        };
        let descriptor = method.descriptor();
        let is_static = method.modifiers.is_static;
        let call = match receiver {
            _ if is_static => {
                if let Receiver::Value(_) = receiver {
                    return Err(self.error(
                        DiagnosticCode::Access,
                        format!("static method '{}' must be invoked through type '{}'", method.key(), method.declaring),
                        name.span,
                    ));
                }
                TExpr::CallStatic {
                    owner: method.declaring,
                    name: method.name,
                    descriptor,
                    args,
                }
            }
            Receiver::Type => {
                return Err(self.error(
                    DiagnosticCode::Access,
                    format!("non-static method '{}' cannot be referenced from a static context", method.key()),
                    name.span,
                ))
            }
            Receiver::Implicit if self.is_static => {
                return Err(self.error(
                    DiagnosticCode::Access,
                    format!("non-static method '{}' cannot be referenced from a static context", method.key()),
                    name.span,
                ))
            }
            Receiver::Implicit => TExpr::CallVirtual {
                receiver: Box::new(TExpr::Local(0)),
                name: method.name,
                descriptor,
                args,
            },
            Receiver::Value(receiver) => TExpr::CallVirtual {
                receiver: Box::new(receiver),
                name: method.name,
                descriptor,
                args,
            },
        };
        Ok((call, result))
    }

    fn new_instance(&mut self, ty: &TypeExpr, args: &[Expr], span: Span) -> Check<(TExpr, Ty)> {
        let class = match self.resolve_type(ty)? {
            TypeRef::Named(name) => name,
            other => {
                return Err(self.error(
                    DiagnosticCode::TypeMismatch,
                    format!("cannot instantiate type {}", other),
                    ty.span,
                ))
            }
        };
        let args = self.args(args)?;

        let ctors: Vec<(Vec<TypeRef>, Modifiers, String)> = if is_builtin_throwable(&class) {
            builtins::throwable_constructors()
                .into_iter()
                .map(|params| (params, Modifiers::public(), class.clone()))
                .collect()
        } else if builtins::is_builtin_value_type(&class) {
            return Err(self.error(
                DiagnosticCode::TypeMismatch,
                format!("cannot instantiate builtin type '{}'", class),
                ty.span,
            ));
        } else {
            let Some(sig) = self.env.class(&class) else {
                return Err(self.error(
                    DiagnosticCode::UnknownSymbol,
                    format!("cannot find type '{}'", class),
                    ty.span,
                ));
            };
            if sig.is_abstract() {
                return Err(self.error(
                    DiagnosticCode::TypeMismatch,
                    format!("'{}' is abstract; cannot be instantiated", class),
                    ty.span,
                ));
            }
            sig.ctors
                .iter()
                .map(|c| (c.params.clone(), c.modifiers, c.declaring.clone()))
                .collect()
        };

        let params: Vec<Vec<TypeRef>> = ctors.iter().map(|(p, _, _)| p.clone()).collect();
        let what = format!("constructor '{}'", class);
        let index = self.select(&what, &params, &args, span)?;
        let (params, modifiers, declaring) = ctors[index].clone();
        self.check_access(modifiers, &declaring, &what, span)?;
        let args = self.coerce_args(args, &params)?;
        Ok((
            TExpr::New {
                class: class.clone(),
                descriptor: MethodDescriptor::new(params, TypeRef::Void),
                args,
            },
            Ty::Value(TypeRef::named(class)),
        ))
    }

    fn new_array(&mut self, element: &TypeExpr, elements: &[Expr]) -> Check<(TExpr, Ty)> {
        let element_type = self.resolve_type(element)?;
        if element_type.is_void() {
            return Err(self.error(DiagnosticCode::TypeMismatch, "array of void", element.span));
        }
        let mut checked = Vec::with_capacity(elements.len());
        let mut failed = false;
        for item in elements {
            let lowered = self
                .expr(item)
                .and_then(|(expr, ty)| self.coerce(expr, &ty, &element_type, item.span));
            match lowered {
                Ok(expr) => checked.push(expr),
                Err(Reported) => failed = true,
            }
        }
        if failed {
            return Err(Reported);
        }
        Ok((
            TExpr::NewArray {
                element: element_type.clone(),
                elements: checked,
            },
            Ty::Value(TypeRef::array(element_type)),
        ))
    }

    fn cast(&mut self, ty: &TypeExpr, value: &Expr, span: Span) -> Check<(TExpr, Ty)> {
        let target = self.resolve_type(ty)?;
        let (expr, from) = self.expr(value)?;
        let incompatible = |from: &dyn std::fmt::Display| {
            format!("incompatible types: {} cannot be converted to {}", from, target)
        };

        let checked = match &from {
            Ty::Void => Err(incompatible(&from)),
            Ty::Null if target.is_reference() => Ok(expr),
            Ty::Null => Err(incompatible(&from)),
            Ty::Value(source) if target.is_void() => Err(incompatible(source)),
            Ty::Value(source) if target.is_primitive() => {
                if *source == target {
                    Ok(expr)
                } else if source.name() == Some(OBJECT) {
                    Ok(TExpr::Cast {
                        ty: target.clone(),
                        value: Box::new(expr),
                    })
                } else {
                    Err(incompatible(source))
                }
            }
            Ty::Value(source) if source.is_primitive() => {
                if target.name() == Some(OBJECT) {
                    Ok(expr)
                } else {
                    Err(incompatible(source))
                }
            }
            Ty::Value(source) => {
                if self.env.is_assignable(source, &target) {
                    Ok(expr)
                } else if self.env.is_assignable(&target, source)
                    || self.is_interface_type(source)
                    || self.is_interface_type(&target)
                {
                    Ok(TExpr::Cast {
                        ty: target.clone(),
                        value: Box::new(expr),
                    })
                } else {
                    Err(incompatible(source))
                }
            }
        };
        match checked {
            Ok(expr) => Ok((expr, Ty::Value(target))),
            Err(message) => Err(self.error(DiagnosticCode::TypeMismatch, message, span)),
        }
    }

    fn is_interface_type(&self, ty: &TypeRef) -> bool {
        ty.name().map(|name| self.env.is_interface(name)).unwrap_or(false)
    }

    // Conversions and overloads

    fn fits(&self, arg: &Arg, to: &TypeRef) -> bool {
        match &arg.ty {
            Ty::Null => to.is_reference(),
            Ty::Void => false,
            Ty::Value(from) => {
                self.env.is_assignable(from, to) || (matches!(arg.expr, TExpr::Int(_)) && *to == TypeRef::Long)
            }
        }
    }

    fn applicable(&self, params: &[TypeRef], args: &[Arg]) -> bool {
        params.len() == args.len() && args.iter().zip(params).all(|(arg, param)| self.fits(arg, param))
    }

    fn more_specific(&self, a: &[TypeRef], b: &[TypeRef]) -> bool {
        a.iter().zip(b).all(|(x, y)| self.env.is_assignable(x, y))
    }

    /// Pick the most specific applicable candidate
    fn select(&mut self, what: &str, candidates: &[Vec<TypeRef>], args: &[Arg], span: Span) -> Check<usize> {
        let applicable: Vec<usize> = (0..candidates.len())
            .filter(|&i| self.applicable(&candidates[i], args))
            .collect();
        match applicable.as_slice() {
            [] if candidates.is_empty() => Err(self.error(
                DiagnosticCode::UnknownSymbol,
                format!("cannot find {}", what),
                span,
            )),
            [] => {
                let types: Vec<String> = args.iter().map(|a| a.ty.to_string()).collect();
                Err(self.error(
                    DiagnosticCode::Resolution,
                    format!("no suitable {} for argument types ({})", what, types.join(",")),
                    span,
                ))
            }
            [only] => Ok(*only),
            _ => {
                let best = applicable.iter().copied().find(|&i| {
                    applicable
                        .iter()
                        .all(|&j| i == j || self.more_specific(&candidates[i], &candidates[j]))
                });
                best.ok_or_else(|| {
                    self.error(
                        DiagnosticCode::Resolution,
                        format!("reference to {} is ambiguous", what),
                        span,
                    )
                })
            }
        }
    }

    fn coerce_args(&mut self, args: Vec<Arg>, params: &[TypeRef]) -> Check<Vec<TExpr>> {
        args.into_iter()
            .zip(params)
            .map(|(arg, param)| self.coerce(arg.expr, &arg.ty, param, arg.span))
            .collect()
    }

    /// Convert an expression to `to`; only int literals widen (to long)
    fn coerce(&mut self, expr: TExpr, from: &Ty, to: &TypeRef, span: Span) -> Check<TExpr> {
        let ok = match from {
            Ty::Null => to.is_reference(),
            Ty::Void => false,
            Ty::Value(from) => self.env.is_assignable(from, to),
        };
        if ok {
            return Ok(expr);
        }
        match (expr, to) {
            (TExpr::Int(value), TypeRef::Long) => Ok(TExpr::Long(i64::from(value))),
            _ => {
                let message = match from {
                    Ty::Void => "'void' type not allowed here".to_string(),
                    other => format!("incompatible types: {} cannot be converted to {}", other, to),
                };
                Err(self.error(DiagnosticCode::TypeMismatch, message, span))
            }
        }
    }
}
