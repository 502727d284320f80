//! The type universe
//!
//! A [`TypeUniverse`] is the registry every proxy, compiled class and native
//! type lives in. It is a cheap clonable handle over a concurrent map;
//! [`TypeUniverse::global`] is the process-wide ambient universe, and
//! [`TypeUniverse::new`] creates isolated universes (tests, tools).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::{debug, warn};

use crate::vm::builtins;
use crate::vm::interpreter::Interpreter;
use crate::vm::object::{Instance, ObjectRef};
use crate::vm::throwable::{is_builtin_subclass, is_builtin_throwable, Throwable};
use crate::vm::types::{
    join_types, overload_key, ConstructorBody, ConstructorInfo, InitState, MethodBody, MethodInfo,
    MethodRef, TypeDef, TypeRef,
};
use crate::vm::value::Value;

static NEXT_UNIVERSE_ID: AtomicU64 = AtomicU64::new(0);

static GLOBAL: Lazy<TypeUniverse> = Lazy::new(TypeUniverse::new);

/// Errors raised when defining a type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefineError {
    #[error("duplicate definition of type {0}")]
    Duplicate(String),

    #[error("{0} is a builtin type and cannot be redefined")]
    Builtin(String),

    #[error("invalid type name '{0}'")]
    InvalidName(String),

    #[error("{type_name}: supertype {supertype} not found")]
    MissingSupertype { type_name: String, supertype: String },

    #[error("{type_name}: cannot inherit from final {supertype}")]
    FinalSupertype { type_name: String, supertype: String },

    #[error("{type_name}: {supertype} is an interface, a class is expected")]
    ExpectedClass { type_name: String, supertype: String },

    #[error("{type_name}: {supertype} is not an interface")]
    ExpectedInterface { type_name: String, supertype: String },

    #[error("{0}: an interface cannot declare a superclass")]
    InterfaceWithSuperclass(String),
}

/// Handle to a registry of types
#[derive(Clone)]
pub struct TypeUniverse {
    inner: Arc<UniverseInner>,
}

struct UniverseInner {
    id: u64,
    types: DashMap<String, Arc<TypeDef>>,
}

impl TypeUniverse {
    /// Create an isolated universe holding only the builtin types
    pub fn new() -> Self {
        let universe = Self {
            inner: Arc::new(UniverseInner {
                id: NEXT_UNIVERSE_ID.fetch_add(1, Ordering::Relaxed),
                types: DashMap::new(),
            }),
        };
        builtins::install(&universe);
        universe
    }

    /// The process-wide ambient universe
    pub fn global() -> &'static TypeUniverse {
        &GLOBAL
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Link and register a type
    ///
    /// Supertypes must already be defined. The instance field layout is the
    /// superclass layout followed by the type's own instance fields.
    pub fn define(&self, mut def: TypeDef) -> Result<Arc<TypeDef>, DefineError> {
        let name = def.name.clone();
        if !matches!(TypeRef::parse(&name), Some(TypeRef::Named(_))) {
            return Err(DefineError::InvalidName(name));
        }
        let reserved = builtins::runtime_type(&name).is_some_and(|builtin| builtin != name);
        if builtins::is_builtin_value_type(&name) || reserved {
            return Err(DefineError::Builtin(name));
        }
        if self.contains(&name) {
            return Err(DefineError::Duplicate(name));
        }

        if def.superclass.as_deref() == Some(builtins::OBJECT) {
            def.superclass = None;
        }

        let mut layout = Vec::new();
        if let Some(superclass) = &def.superclass {
            if def.is_interface() {
                return Err(DefineError::InterfaceWithSuperclass(name));
            }
            let parent = self.get(superclass).ok_or_else(|| DefineError::MissingSupertype {
                type_name: name.clone(),
                supertype: superclass.clone(),
            })?;
            if parent.is_interface() {
                return Err(DefineError::ExpectedClass {
                    type_name: name,
                    supertype: superclass.clone(),
                });
            }
            if parent.is_final() {
                return Err(DefineError::FinalSupertype {
                    type_name: name,
                    supertype: superclass.clone(),
                });
            }
            layout.extend(parent.layout.iter().cloned());
        }

        for iface in &def.interfaces {
            let parent = self.get(iface).ok_or_else(|| DefineError::MissingSupertype {
                type_name: name.clone(),
                supertype: iface.clone(),
            })?;
            if !parent.is_interface() {
                return Err(DefineError::ExpectedInterface {
                    type_name: name,
                    supertype: iface.clone(),
                });
            }
        }

        {
            let mut statics = def.statics.lock();
            for field in &def.fields {
                if field.modifiers.is_static {
                    statics.insert(field.name.clone(), field.ty.default_value());
                } else {
                    layout.push(field.name.clone());
                }
            }
        }
        def.layout = layout;

        match self.inner.types.entry(name.clone()) {
            Entry::Occupied(_) => Err(DefineError::Duplicate(name)),
            Entry::Vacant(slot) => {
                let def = Arc::new(def);
                slot.insert(def.clone());
                debug!(type_name = %name, kind = %def.kind, universe = self.inner.id, "defined type");
                Ok(def)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<TypeDef>> {
        self.inner.types.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.types.contains_key(name)
    }

    /// Sorted names of every defined type
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.types.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Whether a type reference names something this universe knows
    pub fn type_exists(&self, ty: &TypeRef) -> bool {
        match ty {
            TypeRef::Named(name) => builtins::is_builtin_value_type(name) || self.contains(name),
            TypeRef::Array(element) => self.type_exists(element),
            _ => true,
        }
    }

    /// Nominal subtype test over reference type names
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == builtins::OBJECT {
            return true;
        }
        if is_builtin_throwable(sub) {
            return is_builtin_subclass(sub, sup);
        }
        let Some(def) = self.get(sub) else {
            return false;
        };
        if let Some(superclass) = &def.superclass {
            if self.is_subtype(superclass, sup) {
                return true;
            }
        }
        def.interfaces.iter().any(|iface| self.is_subtype(iface, sup))
    }

    /// Static assignability, including primitive widening and boxing to `Object`
    pub fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        if from == to {
            return !from.is_void();
        }
        match (from, to) {
            (TypeRef::Void, _) | (_, TypeRef::Void) => false,
            (TypeRef::Int, TypeRef::Long)
            | (TypeRef::Int, TypeRef::Double)
            | (TypeRef::Long, TypeRef::Double) => true,
            (from, TypeRef::Named(name)) if from.is_primitive() => name == builtins::OBJECT,
            (_, to) if to.is_primitive() => false,
            (TypeRef::Named(a), TypeRef::Named(b)) => self.is_subtype(a, b),
            (TypeRef::Array(_), TypeRef::Named(b)) => b == builtins::OBJECT,
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

    /// Runtime type test; null is never an instance
    pub fn is_instance_of(&self, value: &Value, ty: &TypeRef) -> bool {
        match (value, ty) {
            (Value::Null, _) => false,
            (_, TypeRef::Named(name)) if name == builtins::OBJECT => true,
            (Value::Bool(_), TypeRef::Boolean)
            | (Value::Int(_), TypeRef::Int)
            | (Value::Long(_), TypeRef::Long)
            | (Value::Double(_), TypeRef::Double) => true,
            (Value::Str(_), TypeRef::Named(name)) => name == builtins::STRING,
            (Value::Object(obj), TypeRef::Named(name)) => self.is_subtype(obj.class_name(), name),
            (Value::Array(items), TypeRef::Array(element)) => items
                .iter()
                .all(|item| (item.is_null() && element.is_reference()) || self.is_instance_of(item, element)),
            (Value::Handler(_), TypeRef::Named(name)) => name == builtins::INVOCATION_HANDLER,
            (Value::Method(_), TypeRef::Named(name)) => name == builtins::METHOD,
            (Value::Throwable(t), TypeRef::Named(name)) => t.is_instance_of(name),
            _ => false,
        }
    }

    /// Checked cast: null passes reference casts, anything else must be an instance
    pub fn check_cast(&self, value: Value, ty: &TypeRef) -> Result<Value, Throwable> {
        if value.is_null() {
            if ty.is_primitive() {
                return Err(Throwable::null_pointer(format!(
                    "cannot unbox null value to {}",
                    ty
                )));
            }
            return Ok(value);
        }
        if self.is_instance_of(&value, ty) {
            Ok(value)
        } else {
            Err(Throwable::class_cast(format!(
                "class {} cannot be cast to class {}",
                value.type_name(),
                ty
            )))
        }
    }

    /// Superclasses of a type, nearest first
    pub fn superclasses(&self, def: &TypeDef) -> Vec<Arc<TypeDef>> {
        let mut chain = Vec::new();
        let mut next = def.superclass.as_deref().and_then(|s| self.get(s));
        while let Some(current) = next {
            next = current.superclass.as_deref().and_then(|s| self.get(s));
            chain.push(current);
        }
        chain
    }

    /// Every interface a type implements, transitively, without duplicates
    pub fn all_interfaces(&self, def: &TypeDef) -> Vec<Arc<TypeDef>> {
        let mut seen: Vec<Arc<TypeDef>> = Vec::new();
        let mut pending: Vec<String> = def.interfaces.iter().rev().cloned().collect();
        for parent in self.superclasses(def) {
            pending.splice(0..0, parent.interfaces.iter().rev().cloned());
        }
        while let Some(name) = pending.pop() {
            if seen.iter().any(|s| s.name == name) {
                continue;
            }
            if let Some(iface) = self.get(&name) {
                pending.extend(iface.interfaces.iter().rev().cloned());
                seen.push(iface);
            }
        }
        seen
    }

    /// Look up a non-private method by exact signature, searching supertypes
    pub fn find_method(&self, type_name: &str, name: &str, params: &[TypeRef]) -> Option<MethodRef> {
        let def = self.get(type_name)?;
        std::iter::once(def.clone())
            .chain(self.superclasses(&def))
            .chain(self.all_interfaces(&def))
            .find_map(|ty| {
                ty.declared_method(name, params)
                    .filter(|m| !m.modifiers.is_private)
                    .cloned()
            })
    }

    /// Select the implementation a virtual call on an instance of `class` runs
    pub fn resolve_virtual(&self, class: &TypeDef, name: &str, params: &[TypeRef]) -> Option<MethodRef> {
        let concrete = |ty: &TypeDef| {
            ty.declared_method(name, params)
                .filter(|m| !m.is_static() && !m.is_abstract())
                .cloned()
        };
        if let Some(method) = concrete(class) {
            return Some(method);
        }
        if let Some(method) = self.superclasses(class).iter().find_map(|ty| concrete(ty)) {
            return Some(method);
        }
        self.all_interfaces(class).iter().find_map(|ty| concrete(ty))
    }

    /// Declared type of an instance field, searching the superclass chain
    pub fn instance_field_type(&self, class: &TypeDef, name: &str) -> Option<TypeRef> {
        let own = class
            .declared_field(name)
            .filter(|f| !f.modifiers.is_static)
            .map(|f| f.ty.clone());
        own.or_else(|| {
            self.superclasses(class).iter().find_map(|ty| {
                ty.declared_field(name)
                    .filter(|f| !f.modifiers.is_static)
                    .map(|f| f.ty.clone())
            })
        })
    }

    /// Invoke a resolved method
    ///
    /// `receiver` is the instance for instance methods and is ignored for
    /// static ones. Static methods trigger initialization of their type.
    pub fn invoke(&self, method: &MethodRef, receiver: Option<&ObjectRef>, args: &[Value]) -> Result<Value, Throwable> {
        if args.len() != method.params.len() {
            return Err(Throwable::illegal_argument(format!(
                "wrong number of arguments for {}.{}: expected {}, got {}",
                method.declaring_type,
                method.overload_key(),
                method.params.len(),
                args.len()
            )));
        }
        if method.is_static() {
            if let Some(owner) = self.get(&method.declaring_type) {
                self.ensure_initialized(&owner)?;
            }
        } else if receiver.is_none() {
            return Err(Throwable::null_pointer(format!(
                "cannot invoke {}.{} on null",
                method.declaring_type,
                method.overload_key()
            )));
        }

        match &method.body {
            MethodBody::Abstract => Err(Throwable::builtin(
                "AbstractMethodError",
                Some(format!("{}.{}", method.declaring_type, method.overload_key())),
            )),
            MethodBody::Native(native) => {
                let this = match receiver {
                    Some(obj) if !method.is_static() => Value::Object(obj.clone()),
                    _ => Value::Null,
                };
                native(&this, args)
            }
            MethodBody::Compiled(code) => {
                let this = if method.is_static() { None } else { receiver };
                Interpreter::new(self).execute(code, this, args)
            }
        }
    }

    /// Instantiate a class by name, choosing the constructor from the runtime argument types
    pub fn instantiate(&self, class_name: &str, args: &[Value]) -> Result<ObjectRef, Throwable> {
        let class = self.get(class_name).ok_or_else(|| {
            Throwable::builtin("ClassNotFoundException", Some(class_name.to_string()))
        })?;
        self.instantiate_type(&class, args)
    }

    pub fn instantiate_type(&self, class: &Arc<TypeDef>, args: &[Value]) -> Result<ObjectRef, Throwable> {
        let ctor = class
            .constructors
            .iter()
            .find(|ctor| {
                ctor.params.len() == args.len()
                    && ctor.params.iter().zip(args).all(|(param, arg)| {
                        (arg.is_null() && param.is_reference()) || self.is_instance_of(arg, param)
                    })
            })
            .cloned()
            .ok_or_else(|| {
                let arg_types: Vec<String> = args.iter().map(|a| a.type_name()).collect();
                Throwable::builtin(
                    "NoSuchMethodException",
                    Some(format!("{}.<init>({})", class.name, arg_types.join(","))),
                )
            })?;
        self.construct(class, &ctor, args)
    }

    /// Allocate an instance and run the given constructor on it
    pub(crate) fn construct(
        &self,
        class: &Arc<TypeDef>,
        ctor: &ConstructorInfo,
        args: &[Value],
    ) -> Result<ObjectRef, Throwable> {
        if class.is_abstract() {
            return Err(Throwable::builtin(
                "InstantiationException",
                Some(class.name.clone()),
            ));
        }
        self.ensure_initialized(class)?;
        let obj = Arc::new(Instance::new(class.clone(), self.clone()));
        self.run_constructor(ctor, &obj, args)?;
        Ok(obj)
    }

    /// Run a constructor body on an already allocated instance
    pub(crate) fn run_constructor(
        &self,
        ctor: &ConstructorInfo,
        obj: &ObjectRef,
        args: &[Value],
    ) -> Result<(), Throwable> {
        if args.len() != ctor.params.len() {
            return Err(Throwable::illegal_argument(format!(
                "wrong number of constructor arguments for {}({}): got {}",
                ctor.declaring_type,
                join_types(&ctor.params),
                args.len()
            )));
        }
        match &ctor.body {
            ConstructorBody::Native(native) => native(obj, args),
            ConstructorBody::Compiled(code) => Interpreter::new(self)
                .execute(code, Some(obj), args)
                .map(|_| ()),
        }
    }

    /// Run the static initializer of a type (and its superclasses) once
    ///
    /// An `Error` raised by the initializer is rethrown as is; any other
    /// throwable is wrapped in `ExceptionInInitializerError`. Once failed, a
    /// type raises `NoClassDefFoundError` on every later touch, caused by the
    /// original failure. A recursive
    /// request from the initializing thread returns immediately.
    pub fn ensure_initialized(&self, ty: &Arc<TypeDef>) -> Result<(), Throwable> {
        enum Action {
            Ready,
            Failed(Throwable),
            Wait,
            Run,
        }

        let current = std::thread::current().id();
        {
            let mut state = ty.init.state.lock();
            loop {
                let action = match &*state {
                    InitState::Done => Action::Ready,
                    InitState::Failed(raised) => Action::Failed(raised.clone()),
                    InitState::Running(owner) if *owner == current => Action::Ready,
                    InitState::Running(_) => Action::Wait,
                    InitState::Pending => Action::Run,
                };
                match action {
                    Action::Ready => return Ok(()),
                    Action::Failed(raised) => {
                        return Err(Throwable::builtin(
                            "NoClassDefFoundError",
                            Some(format!("Could not initialize class {}", ty.name)),
                        )
                        .with_cause(raised))
                    }
                    Action::Wait => ty.init.ready.wait(&mut state),
                    Action::Run => {
                        *state = InitState::Running(current);
                        break;
                    }
                }
            }
        }

        let result = self.run_static_init(ty);

        let mut state = ty.init.state.lock();
        let outcome = match result {
            Ok(()) => {
                *state = InitState::Done;
                Ok(())
            }
            Err(thrown) => {
                let raised = if thrown.is_error() {
                    thrown
                } else {
                    Throwable::builtin("ExceptionInInitializerError", None).with_cause(thrown)
                };
                warn!(type_name = %ty.name, error = %raised, "static initialization failed");
                *state = InitState::Failed(raised.clone());
                Err(raised)
            }
        };
        ty.init.ready.notify_all();
        outcome
    }

    fn run_static_init(&self, ty: &Arc<TypeDef>) -> Result<(), Throwable> {
        if let Some(parent) = ty.superclass.as_deref().and_then(|s| self.get(s)) {
            self.ensure_initialized(&parent)?;
        }
        if let Some(code) = &ty.static_init {
            Interpreter::new(self).execute(code, None, &[])?;
        }
        Ok(())
    }
}

impl Default for TypeUniverse {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeUniverse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeUniverse")
            .field("id", &self.inner.id)
            .field("types", &self.inner.types.len())
            .finish()
    }
}

impl MethodInfo {
    /// Invoke this method on `target` with virtual dispatch
    ///
    /// Handlers use this to delegate a proxied call to a real implementation.
    pub fn invoke(&self, target: &Value, args: &[Value]) -> Result<Value, Throwable> {
        match target {
            Value::Object(obj) => obj.call(&self.name, &self.params, args),
            Value::Null => Err(Throwable::null_pointer(format!(
                "cannot invoke {} on null",
                overload_key(&self.name, &self.params)
            ))),
            other => Err(Throwable::illegal_argument(format!(
                "{} is not an instance of {}",
                other.type_name(),
                self.declaring_type
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::builder::{MethodBuilder, TypeBuilder};
    use crate::vm::types::TypeKind;

    fn universe_with_subject() -> TypeUniverse {
        let universe = TypeUniverse::new();
        TypeBuilder::interface("demo.Subject")
            .method(MethodBuilder::new("doOperation"))
            .define(&universe)
            .unwrap();
        TypeBuilder::class("demo.RealSubject")
            .implements("demo.Subject")
            .field("count", TypeRef::Int)
            .method(
                MethodBuilder::new("doOperation").native(|this, _| {
                    let obj = this.as_object().unwrap();
                    let count = obj.get_field("count").and_then(|v| v.as_int()).unwrap_or(0);
                    obj.set_field("count", Value::Int(count + 1));
                    Ok(Value::Null)
                }),
            )
            .define(&universe)
            .unwrap();
        universe
    }

    #[test]
    fn test_builtins_installed() {
        let universe = TypeUniverse::new();
        assert!(universe.contains(builtins::PROXY_BASE));
        assert!(universe.type_exists(&TypeRef::string()));
        assert!(universe.type_exists(&TypeRef::named("RuntimeException")));
        assert!(!universe.type_exists(&TypeRef::named("demo.Missing")));
    }

    #[test]
    fn test_define_duplicate() {
        let universe = universe_with_subject();
        let err = universe
            .define(TypeDef::new("demo.Subject", TypeKind::Interface))
            .unwrap_err();
        assert_eq!(err, DefineError::Duplicate("demo.Subject".to_string()));
        assert!(matches!(
            universe.define(TypeDef::new("String", TypeKind::Class)),
            Err(DefineError::Builtin(_))
        ));
        assert!(matches!(
            universe.define(TypeDef::new("veil.Error", TypeKind::Class)),
            Err(DefineError::Builtin(_))
        ));
    }

    #[test]
    fn test_define_rejects_final_superclass() {
        let universe = TypeUniverse::new();
        TypeBuilder::class("demo.Sealed").as_final().define(&universe).unwrap();
        let err = TypeBuilder::class("demo.Sub")
            .extends("demo.Sealed")
            .define(&universe)
            .unwrap_err();
        assert!(matches!(err, DefineError::FinalSupertype { .. }));
    }

    #[test]
    fn test_subtyping_and_assignability() {
        let universe = universe_with_subject();
        assert!(universe.is_subtype("demo.RealSubject", "demo.Subject"));
        assert!(universe.is_subtype("demo.RealSubject", "Object"));
        assert!(!universe.is_subtype("demo.Subject", "demo.RealSubject"));
        assert!(universe.is_assignable(&TypeRef::Int, &TypeRef::Long));
        assert!(universe.is_assignable(&TypeRef::Int, &TypeRef::object()));
        assert!(!universe.is_assignable(&TypeRef::object(), &TypeRef::Int));
        assert!(universe.is_assignable(
            &TypeRef::array(TypeRef::string()),
            &TypeRef::array(TypeRef::object())
        ));
        assert!(!universe.is_assignable(
            &TypeRef::array(TypeRef::Int),
            &TypeRef::array(TypeRef::object())
        ));
    }

    #[test]
    fn test_check_cast() {
        let universe = TypeUniverse::new();
        assert_eq!(
            universe.check_cast(Value::from("x"), &TypeRef::string()).unwrap(),
            Value::from("x")
        );
        assert_eq!(universe.check_cast(Value::Null, &TypeRef::string()).unwrap(), Value::Null);
        let cce = universe.check_cast(Value::from(1), &TypeRef::string()).unwrap_err();
        assert_eq!(cce.class_name(), "ClassCastException");
        let npe = universe.check_cast(Value::Null, &TypeRef::Int).unwrap_err();
        assert_eq!(npe.class_name(), "NullPointerException");
        assert!(universe
            .check_cast(
                Value::array(vec![Value::from("a"), Value::Null]),
                &TypeRef::array(TypeRef::string())
            )
            .is_ok());
    }

    #[test]
    fn test_instantiate_and_dispatch() {
        let universe = universe_with_subject();
        let obj = universe.instantiate("demo.RealSubject", &[]).unwrap();
        assert_eq!(obj.get_field("count"), Some(Value::Int(0)));

        let method = universe.find_method("demo.Subject", "doOperation", &[]).unwrap();
        assert!(method.is_abstract());
        method.invoke(&Value::Object(obj.clone()), &[]).unwrap();
        obj.call("doOperation", &[], &[]).unwrap();
        assert_eq!(obj.get_field("count"), Some(Value::Int(2)));
    }

    #[test]
    fn test_instantiate_interface_fails() {
        let universe = universe_with_subject();
        let err = universe.instantiate("demo.Subject", &[]).unwrap_err();
        assert_eq!(err.class_name(), "NoSuchMethodException");
        let err = universe.instantiate("demo.Nope", &[]).unwrap_err();
        assert_eq!(err.class_name(), "ClassNotFoundException");
    }

    #[test]
    fn test_all_interfaces_transitive() {
        let universe = TypeUniverse::new();
        TypeBuilder::interface("demo.Base").define(&universe).unwrap();
        TypeBuilder::interface("demo.Mid")
            .implements("demo.Base")
            .define(&universe)
            .unwrap();
        let leaf = TypeBuilder::class("demo.Leaf")
            .implements("demo.Mid")
            .define(&universe)
            .unwrap();
        let names: Vec<String> = universe
            .all_interfaces(&leaf)
            .iter()
            .map(|i| i.name.clone())
            .collect();
        assert_eq!(names, vec!["demo.Mid".to_string(), "demo.Base".to_string()]);
    }
}
