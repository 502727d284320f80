//! Semantic checking
//!
//! Resolves every type name of a compilation unit, checks declarations
//! (modifiers, inheritance, overrides, duplicates) and hands each body to a
//! [`BodyChecker`]. The result is the typed IR of every class in the unit, or
//! the complete list of diagnostics.

mod body;

use std::path::Path;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::compiler::bytecode::CONSTRUCTOR_NAME;
use crate::compiler::diagnostic::{Diagnostic, DiagnosticCode};
use crate::compiler::env::{package_of, ClassSig, CtorSig, FieldSig, MethodSig, TypeEnv};
use crate::compiler::ir::{ClassIr, FieldIr, MethodIr};
use crate::parser::ast::{Block, ClassDecl, ClassKind, CompilationUnit, FieldDecl, Member, ModifierList, TypeExpr};
use crate::parser::Span;
use crate::vm::builtins::{self, OBJECT};
use crate::vm::types::{Modifiers, TypeKind, TypeRef};
use crate::vm::universe::TypeUniverse;

use body::{BodyChecker, BodyKind, StaticPart};

/// Check a parsed unit against a universe
pub(crate) fn check_unit(
    universe: &TypeUniverse,
    file_name: &str,
    unit: &CompilationUnit,
) -> Result<Vec<ClassIr>, Vec<Diagnostic>> {
    let package = unit.package.as_ref().map(|p| p.to_string());
    let checker = UnitChecker {
        env: TypeEnv::new(universe, package),
        file_stem: Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name)
            .to_string(),
        source_file: file_name.to_string(),
        diagnostics: Vec::new(),
    };
    checker.run(unit)
}

/// Access level order used for override checks
fn access_rank(modifiers: Modifiers) -> u8 {
    if modifiers.is_public {
        3
    } else if modifiers.is_protected {
        2
    } else if modifiers.is_private {
        0
    } else {
        1
    }
}

fn access_name(modifiers: Modifiers) -> &'static str {
    match access_rank(modifiers) {
        3 => "public",
        2 => "protected",
        0 => "private",
        _ => "package-private",
    }
}

struct UnitChecker<'u> {
    env: TypeEnv<'u>,
    file_stem: String,
    source_file: String,
    diagnostics: Vec<Diagnostic>,
}

impl<'u> UnitChecker<'u> {
    fn run(mut self, unit: &CompilationUnit) -> Result<Vec<ClassIr>, Vec<Diagnostic>> {
        self.imports(unit);
        let decls = self.declare_classes(unit);

        let mut sigs = Vec::with_capacity(decls.len());
        for decl in &decls {
            sigs.push(self.header(decl));
        }
        for sig in sigs {
            self.env.insert_local(sig);
        }

        let mut classes = Vec::with_capacity(decls.len());
        for decl in decls {
            let name = self.env.qualify(&decl.name.name);
            let Some(sig) = self.env.class(&name) else {
                continue;
            };
            self.check_declaration(decl, &sig);
            classes.push(self.lower_class(decl, sig));
        }

        if self.diagnostics.is_empty() {
            Ok(classes)
        } else {
            self.diagnostics.sort_by_key(|d| (d.span.line, d.span.column));
            Err(self.diagnostics)
        }
    }

    fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::error(code, message, span));
    }

    fn imports(&mut self, unit: &CompilationUnit) {
        for import in &unit.imports {
            let name = import.to_string();
            if import.is_simple() || !self.env.exists(&name) {
                self.error(
                    DiagnosticCode::UnknownSymbol,
                    format!("cannot find imported type '{}'", name),
                    import.span,
                );
                continue;
            }
            if let Err(existing) = self.env.add_import(&name) {
                self.error(
                    DiagnosticCode::Duplicate,
                    format!("'{}' is already imported from '{}'", import.last(), existing),
                    import.span,
                );
            }
        }
    }

    fn declare_classes<'d>(&mut self, unit: &'d CompilationUnit) -> Vec<&'d ClassDecl> {
        let mut accepted = Vec::with_capacity(unit.classes.len());
        for decl in &unit.classes {
            let simple = decl.name.name.as_str();
            let qualified = self.env.qualify(simple);
            if self.env.universe().contains(&qualified) || builtins::is_builtin_value_type(&qualified) {
                self.error(
                    DiagnosticCode::Duplicate,
                    format!("type '{}' is already defined", qualified),
                    decl.name.span,
                );
                continue;
            }
            if !self.env.declare_local(simple) {
                self.error(
                    DiagnosticCode::Duplicate,
                    format!("duplicate class '{}'", simple),
                    decl.name.span,
                );
                continue;
            }
            if decl.modifiers.modifiers.is_public && simple != self.file_stem {
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::FileName,
                        format!("public class '{}' must be declared in a file named '{}.veil'", simple, simple),
                        decl.name.span,
                    )
                    .with_note(format!("the unit is named '{}'", self.source_file)),
                );
            }
            accepted.push(decl);
        }
        accepted
    }

    // Signatures

    fn resolve_named(&mut self, ty: &TypeExpr) -> Option<String> {
        match self.env.resolve_type(ty) {
            Ok(TypeRef::Named(name)) => Some(name),
            Ok(other) => {
                self.error(
                    DiagnosticCode::Inheritance,
                    format!("unexpected type '{}'", other),
                    ty.span,
                );
                None
            }
            Err(name) => {
                self.error(
                    DiagnosticCode::UnknownSymbol,
                    format!("cannot find type '{}'", name),
                    ty.span,
                );
                None
            }
        }
    }

    /// Resolve a member type; unknown types fall back to `Object`
    fn member_type(&mut self, ty: &TypeExpr, allow_void: bool, what: &str) -> TypeRef {
        match self.env.resolve_type(ty) {
            Ok(TypeRef::Void) if !allow_void => {
                self.error(
                    DiagnosticCode::TypeMismatch,
                    format!("{} cannot have type void", what),
                    ty.span,
                );
                TypeRef::object()
            }
            Ok(resolved) => resolved,
            Err(name) => {
                self.error(
                    DiagnosticCode::UnknownSymbol,
                    format!("cannot find type '{}'", name),
                    ty.span,
                );
                TypeRef::object()
            }
        }
    }

    fn header(&mut self, decl: &ClassDecl) -> ClassSig {
        let name = self.env.qualify(&decl.name.name);
        let is_interface = decl.kind == ClassKind::Interface;
        let mut modifiers = decl.modifiers.modifiers;
        if is_interface {
            modifiers.is_abstract = true;
        }

        let (superclass, supertypes) = if is_interface {
            (None, &decl.extends)
        } else {
            let superclass = decl
                .extends
                .first()
                .and_then(|ty| self.resolve_named(ty))
                .filter(|s| s != OBJECT);
            (superclass, &decl.implements)
        };
        let interfaces = supertypes
            .iter()
            .filter_map(|ty| self.resolve_named(ty))
            .collect();

        let mut sig = ClassSig {
            name: name.clone(),
            kind: if is_interface {
                TypeKind::Interface
            } else {
                TypeKind::Class
            },
            modifiers,
            superclass,
            interfaces,
            fields: Vec::new(),
            ctors: Vec::new(),
            methods: Vec::new(),
            local: true,
        };

        for member in &decl.members {
            match member {
                Member::Field(field) => {
                    let ty = self.member_type(&field.ty, false, "a field");
                    sig.fields.push(FieldSig {
                        name: field.name.name.clone(),
                        ty,
                        modifiers: field.modifiers.modifiers,
                        declaring: name.clone(),
                    });
                }
                Member::Constructor(ctor) => {
                    let params = ctor
                        .params
                        .iter()
                        .map(|p| self.member_type(&p.ty, false, "a parameter"))
                        .collect();
                    sig.ctors.push(CtorSig {
                        params,
                        modifiers: ctor.modifiers.modifiers,
                        declaring: name.clone(),
                    });
                }
                Member::Method(method) => {
                    let params = method
                        .params
                        .iter()
                        .map(|p| self.member_type(&p.ty, false, "a parameter"))
                        .collect();
                    let return_type = self.member_type(&method.return_type, true, "a method");
                    let mut modifiers = method.modifiers.modifiers;
                    if is_interface && !modifiers.is_private && !modifiers.is_protected {
                        modifiers.is_public = true;
                    }
                    let is_abstract = method.body.is_none();
                    if is_interface {
                        modifiers.is_abstract = is_abstract && !modifiers.is_static;
                    }
                    sig.methods.push(MethodSig {
                        name: method.name.name.clone(),
                        params,
                        return_type,
                        modifiers,
                        is_abstract,
                        declaring: name.clone(),
                    });
                }
                Member::StaticInit(_) => {}
            }
        }

        if !is_interface && sig.ctors.is_empty() {
            let mut ctor_modifiers = Modifiers::default();
            ctor_modifiers.is_public = modifiers.is_public;
            sig.ctors.push(CtorSig {
                params: Vec::new(),
                modifiers: ctor_modifiers,
                declaring: name,
            });
        }
        sig
    }

    // Declaration checks

    fn check_declaration(&mut self, decl: &ClassDecl, sig: &Rc<ClassSig>) {
        self.check_class_modifiers(decl, sig);
        self.check_supertypes(decl, sig);
        self.check_members(decl, sig);
        self.check_overrides(decl, sig);
        if !sig.is_abstract() {
            self.check_implemented(decl, sig);
        }
    }

    fn modifier_span(&self, list: &ModifierList, fallback: Span) -> Span {
        list.span.unwrap_or(fallback)
    }

    fn check_class_modifiers(&mut self, decl: &ClassDecl, sig: &ClassSig) {
        let written = decl.modifiers.modifiers;
        let span = self.modifier_span(&decl.modifiers, decl.name.span);
        for (set, word) in [
            (written.is_private, "private"),
            (written.is_protected, "protected"),
            (written.is_static, "static"),
        ] {
            if set {
                self.error(
                    DiagnosticCode::InvalidModifier,
                    format!("modifier '{}' not allowed here", word),
                    span,
                );
            }
        }
        if sig.is_interface() && written.is_final {
            self.error(
                DiagnosticCode::InvalidModifier,
                "modifier 'final' not allowed on interfaces",
                span,
            );
        }
        if !sig.is_interface() && written.is_abstract && written.is_final {
            self.error(
                DiagnosticCode::InvalidModifier,
                "illegal combination of modifiers: abstract and final",
                span,
            );
        }
    }

    fn type_accessible(&self, target: &ClassSig, from: &ClassSig) -> bool {
        target.modifiers.is_public || package_of(&target.name) == package_of(&from.name)
    }

    fn check_supertypes(&mut self, decl: &ClassDecl, sig: &ClassSig) {
        if !sig.is_interface() {
            if let (Some(superclass), Some(written)) = (&sig.superclass, decl.extends.first()) {
                let span = written.span;
                if builtins::is_builtin_value_type(superclass) {
                    self.error(
                        DiagnosticCode::Inheritance,
                        format!("cannot inherit from builtin type '{}'", superclass),
                        span,
                    );
                } else if let Some(parent) = self.env.class(superclass) {
                    if parent.is_interface() {
                        self.error(
                            DiagnosticCode::Inheritance,
                            format!("class '{}' cannot extend interface '{}'", sig.name, superclass),
                            span,
                        );
                    } else if parent.is_final() {
                        self.error(
                            DiagnosticCode::Inheritance,
                            format!("cannot inherit from final '{}'", superclass),
                            span,
                        );
                    }
                    if !self.type_accessible(&parent, sig) {
                        self.error(
                            DiagnosticCode::Access,
                            format!("'{}' is not public in its package", superclass),
                            span,
                        );
                    }
                    if self.env.is_subtype(superclass, &sig.name) {
                        self.error(
                            DiagnosticCode::Inheritance,
                            format!("cyclic inheritance involving '{}'", sig.name),
                            span,
                        );
                    }
                }
            }
        }

        let written = if sig.is_interface() {
            &decl.extends
        } else {
            &decl.implements
        };
        let mut seen = FxHashSet::default();
        for ty in written {
            let Ok(TypeRef::Named(name)) = self.env.resolve_type(ty) else {
                continue;
            };
            if !seen.insert(name.clone()) {
                self.error(
                    DiagnosticCode::Duplicate,
                    format!("repeated interface '{}'", name),
                    ty.span,
                );
                continue;
            }
            if builtins::is_builtin_value_type(&name) {
                self.error(
                    DiagnosticCode::Inheritance,
                    format!("cannot implement builtin type '{}'", name),
                    ty.span,
                );
                continue;
            }
            let Some(parent) = self.env.class(&name) else {
                continue;
            };
            if !parent.is_interface() {
                self.error(
                    DiagnosticCode::Inheritance,
                    format!("'{}' is not an interface", name),
                    ty.span,
                );
                continue;
            }
            if !self.type_accessible(&parent, sig) {
                self.error(
                    DiagnosticCode::Access,
                    format!("'{}' is not public in its package", name),
                    ty.span,
                );
            }
            if self.env.is_subtype(&name, &sig.name) {
                self.error(
                    DiagnosticCode::Inheritance,
                    format!("cyclic inheritance involving '{}'", sig.name),
                    ty.span,
                );
            }
        }
    }

    fn check_access_combination(&mut self, modifiers: Modifiers, span: Span) {
        let count = [modifiers.is_public, modifiers.is_protected, modifiers.is_private]
            .iter()
            .filter(|set| **set)
            .count();
        if count > 1 {
            self.error(
                DiagnosticCode::InvalidModifier,
                "illegal combination of access modifiers",
                span,
            );
        }
    }

    fn check_members(&mut self, decl: &ClassDecl, sig: &ClassSig) {
        let is_interface = sig.is_interface();
        let mut field_names = FxHashSet::default();
        let mut method_keys = FxHashSet::default();
        let mut ctor_params: Vec<&Vec<TypeRef>> = Vec::new();
        let (mut field_index, mut ctor_index, mut method_index) = (0, 0, 0);

        for member in &decl.members {
            match member {
                Member::Field(field) => {
                    let written = field.modifiers.modifiers;
                    let span = self.modifier_span(&field.modifiers, field.name.span);
                    self.check_access_combination(written, span);
                    if is_interface {
                        self.error(
                            DiagnosticCode::InvalidModifier,
                            "interfaces cannot declare fields",
                            field.name.span,
                        );
                    }
                    if written.is_abstract {
                        self.error(
                            DiagnosticCode::InvalidModifier,
                            "modifier 'abstract' not allowed on fields",
                            span,
                        );
                    }
                    if !field_names.insert(field.name.name.clone()) {
                        self.error(
                            DiagnosticCode::Duplicate,
                            format!("field '{}' is already defined in '{}'", field.name.name, sig.name),
                            field.name.span,
                        );
                    }
                    if let (Some(field_sig), Some(superclass)) = (sig.fields.get(field_index), &sig.superclass) {
                        if !written.is_static {
                            if let Some(inherited) = self.env.find_field(superclass, &field_sig.name) {
                                if !inherited.modifiers.is_static {
                                    self.error(
                                        DiagnosticCode::Inheritance,
                                        format!(
                                            "field '{}' hides a field inherited from '{}'",
                                            field_sig.name, inherited.declaring
                                        ),
                                        field.name.span,
                                    );
                                }
                            }
                        }
                    }
                    field_index += 1;
                }
                Member::Constructor(ctor) => {
                    let written = ctor.modifiers.modifiers;
                    let span = self.modifier_span(&ctor.modifiers, ctor.name.span);
                    self.check_access_combination(written, span);
                    if is_interface {
                        self.error(
                            DiagnosticCode::InvalidModifier,
                            "interfaces cannot declare constructors",
                            ctor.name.span,
                        );
                    }
                    for (set, word) in [
                        (written.is_static, "static"),
                        (written.is_final, "final"),
                        (written.is_abstract, "abstract"),
                    ] {
                        if set {
                            self.error(
                                DiagnosticCode::InvalidModifier,
                                format!("modifier '{}' not allowed on constructors", word),
                                span,
                            );
                        }
                    }
                    if let Some(ctor_sig) = sig.ctors.get(ctor_index) {
                        if ctor_params.contains(&&ctor_sig.params) {
                            self.error(
                                DiagnosticCode::Duplicate,
                                format!("constructor '{}' is already defined", decl.name.name),
                                ctor.name.span,
                            );
                        }
                        ctor_params.push(&ctor_sig.params);
                    }
                    ctor_index += 1;
                }
                Member::Method(method) => {
                    let written = method.modifiers.modifiers;
                    let span = self.modifier_span(&method.modifiers, method.name.span);
                    self.check_access_combination(written, span);
                    let has_body = method.body.is_some();

                    if written.is_abstract {
                        for (set, word) in [
                            (written.is_private, "private"),
                            (written.is_static, "static"),
                            (written.is_final, "final"),
                        ] {
                            if set {
                                self.error(
                                    DiagnosticCode::InvalidModifier,
                                    format!("illegal combination of modifiers: abstract and {}", word),
                                    span,
                                );
                            }
                        }
                    }

                    if is_interface {
                        for (set, word) in [
                            (written.is_private, "private"),
                            (written.is_protected, "protected"),
                            (written.is_final, "final"),
                        ] {
                            if set {
                                self.error(
                                    DiagnosticCode::InvalidModifier,
                                    format!("modifier '{}' not allowed on interface methods", word),
                                    span,
                                );
                            }
                        }
                        if has_body && !written.is_static {
                            self.error(
                                DiagnosticCode::InvalidModifier,
                                "interface abstract methods cannot have a body",
                                method.name.span,
                            );
                        }
                        if !has_body && written.is_static {
                            self.error(
                                DiagnosticCode::ControlFlow,
                                "missing method body",
                                method.name.span,
                            );
                        }
                    } else if written.is_abstract {
                        if has_body {
                            self.error(
                                DiagnosticCode::InvalidModifier,
                                "abstract methods cannot have a body",
                                method.name.span,
                            );
                        }
                        if !sig.modifiers.is_abstract {
                            self.error(
                                DiagnosticCode::InvalidModifier,
                                format!(
                                    "abstract method '{}' in non-abstract class '{}'",
                                    method.name.name, sig.name
                                ),
                                method.name.span,
                            );
                        }
                    } else if !has_body {
                        self.error(
                            DiagnosticCode::ControlFlow,
                            "missing method body, or declare abstract",
                            method.name.span,
                        );
                    }

                    if let Some(method_sig) = sig.methods.get(method_index) {
                        let key = method_sig.key();
                        if !method_keys.insert(key.clone()) {
                            self.error(
                                DiagnosticCode::Duplicate,
                                format!("method '{}' is already defined in '{}'", key, sig.name),
                                method.name.span,
                            );
                        }
                    }
                    method_index += 1;
                }
                Member::StaticInit(block) => {
                    if is_interface {
                        self.error(
                            DiagnosticCode::InvalidModifier,
                            "interfaces cannot declare static initializers",
                            block.span,
                        );
                    }
                }
            }
        }
    }

    /// Inherited methods with the same overload key, nearest first
    fn overridden(&self, sig: &Rc<ClassSig>, key: &str) -> Vec<MethodSig> {
        let mut found = Vec::new();
        let supertypes = self
            .env
            .superclass_chain(sig)
            .into_iter()
            .chain(self.env.all_interfaces(sig));
        for ty in supertypes {
            if let Some(method) = ty.method(key) {
                let inherited = !method.modifiers.is_private && !(ty.is_interface() && method.modifiers.is_static);
                if inherited {
                    found.push(method.clone());
                }
            }
        }
        found
    }

    fn check_overrides(&mut self, decl: &ClassDecl, sig: &Rc<ClassSig>) {
        let spans: Vec<Span> = decl
            .members
            .iter()
            .filter_map(|m| match m {
                Member::Method(method) => Some(method.name.span),
                _ => None,
            })
            .collect();

        for (method, span) in sig.methods.iter().zip(spans) {
            if method.modifiers.is_private {
                continue;
            }
            let key = method.key();
            for inherited in self.overridden(sig, &key) {
                let owner = inherited.declaring.clone();
                if inherited.modifiers.is_static != method.modifiers.is_static {
                    let message = if method.modifiers.is_static {
                        format!("static method '{}' cannot hide instance method in '{}'", key, owner)
                    } else {
                        format!("instance method '{}' cannot override static method in '{}'", key, owner)
                    };
                    self.error(DiagnosticCode::Override, message, span);
                    continue;
                }
                if method.modifiers.is_static {
                    continue;
                }
                if inherited.modifiers.is_final {
                    self.error(
                        DiagnosticCode::Override,
                        format!("cannot override final method '{}' in '{}'", key, owner),
                        span,
                    );
                }
                let compatible = method.return_type == inherited.return_type
                    || (method.return_type.is_reference()
                        && inherited.return_type.is_reference()
                        && self.env.is_assignable(&method.return_type, &inherited.return_type));
                if !compatible {
                    self.error(
                        DiagnosticCode::Override,
                        format!(
                            "return type {} is not compatible with {} of '{}' in '{}'",
                            method.return_type, inherited.return_type, key, owner
                        ),
                        span,
                    );
                }
                if access_rank(method.modifiers) < access_rank(inherited.modifiers) {
                    self.error(
                        DiagnosticCode::Override,
                        format!(
                            "attempting to assign weaker access privileges to '{}'; was {}",
                            key,
                            access_name(inherited.modifiers)
                        ),
                        span,
                    );
                }
            }
        }
    }

    /// A concrete class must implement every inherited abstract method;
    /// only the first missing one is reported
    fn check_implemented(&mut self, decl: &ClassDecl, sig: &Rc<ClassSig>) {
        let mut classes = vec![sig.clone()];
        classes.extend(self.env.superclass_chain(sig));

        let supertypes = self
            .env
            .superclass_chain(sig)
            .into_iter()
            .chain(self.env.all_interfaces(sig));
        for ty in supertypes {
            for method in ty.methods.iter().filter(|m| m.is_abstract && !m.modifiers.is_static) {
                let key = method.key();
                let implemented = classes.iter().any(|class| {
                    class
                        .method(&key)
                        .map(|m| !m.is_abstract && !m.modifiers.is_static)
                        .unwrap_or(false)
                });
                if !implemented {
                    self.error(
                        DiagnosticCode::MissingImplementation,
                        format!(
                            "class '{}' must implement abstract method '{}' declared in '{}'",
                            sig.name, key, method.declaring
                        ),
                        decl.name.span,
                    );
                    return;
                }
            }
        }
    }

    // Lowering

    fn lower_class(&mut self, decl: &ClassDecl, sig: Rc<ClassSig>) -> ClassIr {
        let fields = sig
            .fields
            .iter()
            .map(|f| FieldIr {
                name: f.name.clone(),
                ty: f.ty.clone(),
                modifiers: f.modifiers,
            })
            .collect();

        let instance_inits: Vec<&FieldDecl> = decl
            .members
            .iter()
            .filter_map(|m| match m {
                Member::Field(f) if !f.modifiers.modifiers.is_static && f.init.is_some() => Some(f),
                _ => None,
            })
            .collect();
        let static_parts: Vec<StaticPart<'_>> = decl
            .members
            .iter()
            .filter_map(|m| match m {
                Member::Field(f) if f.modifiers.modifiers.is_static && f.init.is_some() => Some(StaticPart::Field(f)),
                Member::StaticInit(block) => Some(StaticPart::Block(block)),
                _ => None,
            })
            .collect();

        let mut constructors = Vec::new();
        let mut methods = Vec::new();
        let (mut ctor_index, mut method_index) = (0, 0);
        for member in &decl.members {
            match member {
                Member::Constructor(ctor) => {
                    let Some(ctor_sig) = sig.ctors.get(ctor_index).cloned() else {
                        continue;
                    };
                    let mut checker = self.body_checker(&sig, BodyKind::Constructor, false, TypeRef::Void);
                    for (param, ty) in ctor.params.iter().zip(&ctor_sig.params) {
                        checker.param(&param.name, ty.clone());
                    }
                    let body = checker.constructor_body(&ctor.body, &instance_inits, ctor_index == 0, ctor.name.span);
                    constructors.push(MethodIr {
                        name: CONSTRUCTOR_NAME.to_string(),
                        params: ctor_sig.params,
                        return_type: TypeRef::Void,
                        modifiers: ctor_sig.modifiers,
                        body: Some(body),
                    });
                    ctor_index += 1;
                }
                Member::Method(method) => {
                    let Some(method_sig) = sig.methods.get(method_index).cloned() else {
                        continue;
                    };
                    method_index += 1;
                    let body = match &method.body {
                        Some(block) => {
                            let mut checker = self.body_checker(
                                &sig,
                                BodyKind::Method,
                                method_sig.modifiers.is_static,
                                method_sig.return_type.clone(),
                            );
                            for (param, ty) in method.params.iter().zip(&method_sig.params) {
                                checker.param(&param.name, ty.clone());
                            }
                            Some(checker.method_body(block))
                        }
                        None => None,
                    };
                    methods.push(MethodIr {
                        name: method_sig.name,
                        params: method_sig.params,
                        return_type: method_sig.return_type,
                        modifiers: method_sig.modifiers,
                        body,
                    });
                }
                _ => {}
            }
        }

        if !sig.is_interface() && ctor_index == 0 {
            if let Some(default_ctor) = sig.ctors.first().cloned() {
                let empty = Block {
                    stmts: Vec::new(),
                    span: decl.name.span,
                };
                let checker = self.body_checker(&sig, BodyKind::Constructor, false, TypeRef::Void);
                let body = checker.constructor_body(&empty, &instance_inits, true, decl.name.span);
                constructors.push(MethodIr {
                    name: CONSTRUCTOR_NAME.to_string(),
                    params: Vec::new(),
                    return_type: TypeRef::Void,
                    modifiers: default_ctor.modifiers,
                    body: Some(body),
                });
            }
        }

        let static_init = if static_parts.is_empty() {
            None
        } else {
            let checker = self.body_checker(&sig, BodyKind::StaticInit, true, TypeRef::Void);
            Some(checker.static_init_body(&static_parts))
        };

        ClassIr {
            name: sig.name.clone(),
            kind: sig.kind,
            modifiers: sig.modifiers,
            superclass: sig.superclass.clone(),
            interfaces: sig.interfaces.clone(),
            fields,
            constructors,
            methods,
            static_init,
            source_file: self.source_file.clone(),
        }
    }

    fn body_checker<'a>(
        &'a mut self,
        sig: &Rc<ClassSig>,
        kind: BodyKind,
        is_static: bool,
        return_type: TypeRef,
    ) -> BodyChecker<'a, 'u> {
        BodyChecker::new(&self.env, sig.clone(), kind, is_static, return_type, &mut self.diagnostics)
    }
}
