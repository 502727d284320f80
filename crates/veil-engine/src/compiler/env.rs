//! Type environment of one compilation unit
//!
//! Merges the classes declared by the unit with the types of the universe it
//! is compiled against. Unit classes shadow universe types of the same name.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::parser::ast::{TypeExpr, TypeExprKind};
use crate::vm::builtins::{self, OBJECT, THROWABLE};
use crate::vm::throwable::{is_builtin_subclass, is_builtin_throwable};
use crate::vm::types::{overload_key, MethodDescriptor, Modifiers, TypeDef, TypeKind, TypeRef};
use crate::vm::universe::TypeUniverse;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldSig {
    pub name: String,
    pub ty: TypeRef,
    pub modifiers: Modifiers,
    pub declaring: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MethodSig {
    pub name: String,
    pub params: Vec<TypeRef>,
    pub return_type: TypeRef,
    pub modifiers: Modifiers,
    pub is_abstract: bool,
    pub declaring: String,
}

impl MethodSig {
    pub fn key(&self) -> String {
        overload_key(&self.name, &self.params)
    }

    pub fn descriptor(&self) -> MethodDescriptor {
        MethodDescriptor::new(self.params.clone(), self.return_type.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CtorSig {
    pub params: Vec<TypeRef>,
    pub modifiers: Modifiers,
    pub declaring: String,
}

/// Member signatures of an interface or class
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClassSig {
    pub name: String,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    /// `None` means `Object`
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldSig>,
    pub ctors: Vec<CtorSig>,
    pub methods: Vec<MethodSig>,
    /// Declared by the unit being compiled
    pub local: bool,
}

impl ClassSig {
    pub fn from_def(def: &TypeDef) -> Self {
        Self {
            name: def.name.clone(),
            kind: def.kind,
            modifiers: def.modifiers,
            superclass: def.superclass.clone(),
            interfaces: def.interfaces.clone(),
            fields: def
                .fields
                .iter()
                .map(|f| FieldSig {
                    name: f.name.clone(),
                    ty: f.ty.clone(),
                    modifiers: f.modifiers,
                    declaring: f.declaring_type.clone(),
                })
                .collect(),
            ctors: def
                .constructors
                .iter()
                .map(|c| CtorSig {
                    params: c.params.clone(),
                    modifiers: c.modifiers,
                    declaring: c.declaring_type.clone(),
                })
                .collect(),
            methods: def
                .methods
                .iter()
                .map(|m| MethodSig {
                    name: m.name.clone(),
                    params: m.params.clone(),
                    return_type: m.return_type.clone(),
                    modifiers: m.modifiers,
                    is_abstract: m.is_abstract(),
                    declaring: m.declaring_type.clone(),
                })
                .collect(),
            local: false,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_final(&self) -> bool {
        !self.is_interface() && self.modifiers.is_final
    }

    /// Interfaces and abstract classes
    pub fn is_abstract(&self) -> bool {
        self.is_interface() || self.modifiers.is_abstract
    }

    pub fn field(&self, name: &str) -> Option<&FieldSig> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, key: &str) -> Option<&MethodSig> {
        self.methods.iter().find(|m| m.key() == key)
    }
}

/// Package part of a qualified type name
pub(crate) fn package_of(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(package, _)| package)
}

pub(crate) struct TypeEnv<'u> {
    universe: &'u TypeUniverse,
    package: Option<String>,
    /// Simple name to qualified name, from single-type imports
    imports: FxHashMap<String, String>,
    /// Simple name to qualified name of unit classes
    local_names: FxHashMap<String, String>,
    local: FxHashMap<String, Rc<ClassSig>>,
    cache: RefCell<FxHashMap<String, Rc<ClassSig>>>,
}

impl<'u> TypeEnv<'u> {
    pub fn new(universe: &'u TypeUniverse, package: Option<String>) -> Self {
        Self {
            universe,
            package,
            imports: FxHashMap::default(),
            local_names: FxHashMap::default(),
            local: FxHashMap::default(),
            cache: RefCell::new(FxHashMap::default()),
        }
    }

    /// Qualified name of a class declared in this unit
    pub fn qualify(&self, simple: &str) -> String {
        match &self.package {
            Some(package) => format!("{}.{}", package, simple),
            None => simple.to_string(),
        }
    }

    /// Register a unit class name; false if the name is already taken
    pub fn declare_local(&mut self, simple: &str) -> bool {
        if self.local_names.contains_key(simple) {
            return false;
        }
        let qualified = self.qualify(simple);
        self.local_names.insert(simple.to_string(), qualified);
        true
    }

    /// Register a single-type import; returns the conflicting import if any
    pub fn add_import(&mut self, qualified: &str) -> Result<(), String> {
        let simple = qualified.rsplit('.').next().unwrap_or(qualified).to_string();
        match self.imports.get(&simple) {
            Some(existing) if existing != qualified => Err(existing.clone()),
            _ => {
                self.imports.insert(simple, qualified.to_string());
                Ok(())
            }
        }
    }

    pub fn insert_local(&mut self, sig: ClassSig) {
        self.local.insert(sig.name.clone(), Rc::new(sig));
    }

    pub fn universe(&self) -> &'u TypeUniverse {
        self.universe
    }

    /// Class or interface signature by qualified name
    pub fn class(&self, name: &str) -> Option<Rc<ClassSig>> {
        if let Some(sig) = self.local.get(name) {
            return Some(sig.clone());
        }
        if let Some(sig) = self.cache.borrow().get(name) {
            return Some(sig.clone());
        }
        let def = self.universe.get(name)?;
        let sig = Rc::new(ClassSig::from_def(&def));
        self.cache.borrow_mut().insert(name.to_string(), sig.clone());
        Some(sig)
    }

    fn is_local_name(&self, name: &str) -> bool {
        self.local_names.values().any(|n| n == name)
    }

    /// Whether a qualified reference type name is known
    pub fn exists(&self, name: &str) -> bool {
        builtins::is_builtin_value_type(name) || self.is_local_name(name) || self.universe.contains(name)
    }

    /// Resolve a simple type name: unit classes, imports, the unit's
    /// package, then the implicitly available builtins
    pub fn resolve_simple(&self, simple: &str) -> Option<String> {
        if let Some(name) = self.local_names.get(simple) {
            return Some(name.clone());
        }
        if let Some(name) = self.imports.get(simple) {
            return Some(name.clone());
        }
        let same_package = self.qualify(simple);
        if self.package.is_some() && self.exists(&same_package) {
            return Some(same_package);
        }
        if let Some(name) = builtins::implicit_type(simple) {
            return Some(name.to_string());
        }
        if self.package.is_none() && self.universe.contains(simple) {
            return Some(simple.to_string());
        }
        None
    }

    /// Resolve a dotted or simple type name
    pub fn resolve_name(&self, text: &str) -> Option<String> {
        if let Some(builtin) = builtins::runtime_type(text) {
            return Some(builtin.to_string());
        }
        if text.contains('.') {
            self.exists(text).then(|| text.to_string())
        } else {
            self.resolve_simple(text)
        }
    }

    /// Resolve a written type; the error carries the name that failed
    pub fn resolve_type(&self, ty: &TypeExpr) -> Result<TypeRef, String> {
        let mut resolved = match &ty.kind {
            TypeExprKind::Void => TypeRef::Void,
            TypeExprKind::Boolean => TypeRef::Boolean,
            TypeExprKind::Int => TypeRef::Int,
            TypeExprKind::Long => TypeRef::Long,
            TypeExprKind::Double => TypeRef::Double,
            TypeExprKind::Named(name) => {
                let text = name.to_string();
                TypeRef::Named(self.resolve_name(&text).ok_or(text)?)
            }
        };
        for _ in 0..ty.dims {
            resolved = TypeRef::array(resolved);
        }
        Ok(resolved)
    }

    /// Nominal subtyping over unit classes, universe types and builtins
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT {
            return true;
        }
        if is_builtin_throwable(sub) {
            return is_builtin_subclass(sub, sup);
        }
        let mut seen = FxHashSet::default();
        let mut pending = vec![sub.to_string()];
        while let Some(name) = pending.pop() {
            if name == sup {
                return true;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(sig) = self.class(&name) {
                pending.extend(sig.superclass.iter().cloned());
                pending.extend(sig.interfaces.iter().cloned());
            }
        }
        false
    }

    /// Assignment compatibility; primitives only box to `Object`
    pub fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        if from == to {
            return !from.is_void();
        }
        match (from, to) {
            (TypeRef::Void, _) | (_, TypeRef::Void) => false,
            (from, TypeRef::Named(name)) if from.is_primitive() => name == OBJECT,
            (_, to) if to.is_primitive() => false,
            (TypeRef::Named(a), TypeRef::Named(b)) => self.is_subtype(a, b),
            (TypeRef::Array(_), TypeRef::Named(b)) => b == OBJECT,
            (TypeRef::Array(a), TypeRef::Array(b)) => {
                if a.is_primitive() || b.is_primitive() {
                    a == b
                } else {
                    self.is_assignable(a, b)
                }
            }
            _ => false,
        }
    }

    /// Whether a named type is an interface
    pub fn is_interface(&self, name: &str) -> bool {
        matches!(name, builtins::INVOCATION_HANDLER)
            || self.class(name).map(|c| c.is_interface()).unwrap_or(false)
    }

    /// Superclasses of a class, nearest first
    pub fn superclass_chain(&self, class: &ClassSig) -> Vec<Rc<ClassSig>> {
        let mut chain: Vec<Rc<ClassSig>> = Vec::new();
        let mut next = class.superclass.clone();
        while let Some(name) = next {
            if name == class.name || chain.iter().any(|c| c.name == name) {
                break;
            }
            let Some(sig) = self.class(&name) else { break };
            next = sig.superclass.clone();
            chain.push(sig);
        }
        chain
    }

    /// Every interface a type implements or extends, transitively
    pub fn all_interfaces(&self, class: &ClassSig) -> Vec<Rc<ClassSig>> {
        let mut pending: Vec<String> = class.interfaces.iter().rev().cloned().collect();
        for parent in self.superclass_chain(class) {
            pending.splice(0..0, parent.interfaces.iter().rev().cloned());
        }
        let mut seen: Vec<Rc<ClassSig>> = Vec::new();
        while let Some(name) = pending.pop() {
            if name == class.name || seen.iter().any(|s| s.name == name) {
                continue;
            }
            if let Some(sig) = self.class(&name) {
                pending.extend(sig.interfaces.iter().rev().cloned());
                seen.push(sig);
            }
        }
        seen
    }

    /// The class followed by its superclasses and then its interfaces
    pub fn lookup_order(&self, class: &Rc<ClassSig>) -> Vec<Rc<ClassSig>> {
        let mut order = vec![class.clone()];
        order.extend(self.superclass_chain(class));
        order.extend(self.all_interfaces(class));
        order
    }

    /// A field visible in `class`, searching supertypes
    pub fn find_field(&self, class: &str, name: &str) -> Option<FieldSig> {
        let sig = self.class(class)?;
        self.lookup_order(&sig)
            .iter()
            .find_map(|ty| ty.field(name).cloned())
    }

    /// Methods named `name` callable on `class`; an override hides the
    /// methods it overrides
    pub fn methods_named(&self, class: &str, name: &str) -> Vec<MethodSig> {
        let Some(sig) = self.class(class) else {
            return Vec::new();
        };
        let mut found: Vec<MethodSig> = Vec::new();
        for ty in self.lookup_order(&sig) {
            for method in ty.methods.iter().filter(|m| m.name == name) {
                if !found.iter().any(|f| f.params == method.params) {
                    found.push(method.clone());
                }
            }
        }
        found
    }

    /// Methods the runtime implements on a builtin value type
    pub fn builtin_methods(&self, owner: &str, name: &str) -> Vec<MethodSig> {
        builtins::builtin_methods(owner, name)
            .into_iter()
            .map(|m| {
                let mut modifiers = Modifiers::public();
                modifiers.is_static = m.is_static;
                MethodSig {
                    name: m.name.to_string(),
                    params: m.param_types(),
                    return_type: m.return_type(),
                    modifiers,
                    is_abstract: false,
                    declaring: m.owner.to_string(),
                }
            })
            .collect()
    }

    /// Nearest builtin throwable that every name derives from
    pub fn common_throwable(&self, names: &[String]) -> String {
        let Some(first) = names.first() else {
            return THROWABLE.to_string();
        };
        let mut candidate = Some(first.as_str());
        while let Some(name) = candidate {
            if names.iter().all(|n| is_builtin_subclass(n, name)) {
                return name.to_string();
            }
            candidate = crate::vm::throwable::builtin_parent(name);
        }
        THROWABLE.to_string()
    }
}
