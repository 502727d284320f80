//! Fluent builders for native interfaces and classes
//!
//! ```ignore
//! TypeBuilder::interface("demo.Subject")
//!     .method(MethodBuilder::new("doOperation").param(TypeRef::string()))
//!     .define(&universe)?;
//! ```

use std::sync::Arc;

use crate::vm::object::ObjectRef;
use crate::vm::throwable::Throwable;
use crate::vm::types::{
    ConstructorBody, ConstructorInfo, FieldInfo, MethodBody, MethodInfo, Modifiers, TypeDef,
    TypeKind, TypeRef,
};
use crate::vm::universe::{DefineError, TypeUniverse};
use crate::vm::value::Value;

/// Definition of a method to be added to a type
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    name: String,
    params: Vec<TypeRef>,
    return_type: TypeRef,
    modifiers: Modifiers,
    body: MethodBody,
}

impl MethodBuilder {
    /// A public, abstract `void` method with no parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: TypeRef::Void,
            modifiers: Modifiers::public(),
            body: MethodBody::Abstract,
        }
    }

    pub fn param(mut self, ty: impl Into<TypeRef>) -> Self {
        self.params.push(ty.into());
        self
    }

    pub fn returns(mut self, ty: impl Into<TypeRef>) -> Self {
        self.return_type = ty.into();
        self
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn as_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    pub fn as_final(mut self) -> Self {
        self.modifiers.is_final = true;
        self
    }

    pub fn as_private(mut self) -> Self {
        self.modifiers.is_public = false;
        self.modifiers.is_private = true;
        self
    }

    pub fn as_protected(mut self) -> Self {
        self.modifiers.is_public = false;
        self.modifiers.is_protected = true;
        self
    }

    /// Implement the method with a closure; the receiver is null for static methods
    pub fn native<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Throwable> + Send + Sync + 'static,
    {
        self.body = MethodBody::Native(Arc::new(f));
        self
    }

    pub(crate) fn body(mut self, body: MethodBody) -> Self {
        self.body = body;
        self
    }

    fn build(mut self, declaring_type: &str) -> MethodInfo {
        self.modifiers.is_abstract = matches!(self.body, MethodBody::Abstract);
        MethodInfo {
            name: self.name,
            params: self.params,
            return_type: self.return_type,
            declaring_type: declaring_type.to_string(),
            modifiers: self.modifiers,
            body: self.body,
        }
    }
}

/// Builder for a native interface or class
pub struct TypeBuilder {
    def: TypeDef,
    methods: Vec<MethodBuilder>,
    constructors: Vec<(Vec<TypeRef>, ConstructorBody)>,
}

impl TypeBuilder {
    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(TypeDef::new(name, TypeKind::Interface))
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(TypeDef::new(name, TypeKind::Class))
    }

    fn new(def: TypeDef) -> Self {
        Self {
            def,
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.def.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.def.interfaces.push(interface.into());
        self
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.def.modifiers = modifiers;
        self
    }

    pub fn as_final(mut self) -> Self {
        self.def.modifiers.is_final = true;
        self
    }

    pub fn as_abstract(mut self) -> Self {
        self.def.modifiers.is_abstract = true;
        self
    }

    /// Add a public instance field
    pub fn field(self, name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        self.field_with(name, ty, Modifiers::public())
    }

    /// Add a public static field
    pub fn static_field(self, name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        let mut modifiers = Modifiers::public();
        modifiers.is_static = true;
        self.field_with(name, ty, modifiers)
    }

    pub fn field_with(mut self, name: impl Into<String>, ty: impl Into<TypeRef>, modifiers: Modifiers) -> Self {
        self.def.fields.push(FieldInfo {
            name: name.into(),
            ty: ty.into(),
            modifiers,
            declaring_type: self.def.name.clone(),
        });
        self
    }

    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a constructor implemented by a closure
    pub fn constructor<F>(mut self, params: Vec<TypeRef>, f: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<(), Throwable> + Send + Sync + 'static,
    {
        self.constructors
            .push((params, ConstructorBody::Native(Arc::new(f))));
        self
    }

    /// Finish the type; classes without constructors get a no-argument one
    pub fn build(self) -> TypeDef {
        let TypeBuilder {
            mut def,
            methods,
            mut constructors,
        } = self;

        if def.kind == TypeKind::Class && constructors.is_empty() {
            constructors.push((Vec::new(), ConstructorBody::Native(Arc::new(|_, _| Ok(())))));
        }

        let name = def.name.clone();
        def.methods = methods
            .into_iter()
            .map(|m| Arc::new(m.build(&name)))
            .collect();
        def.constructors = constructors
            .into_iter()
            .map(|(params, body)| {
                Arc::new(ConstructorInfo {
                    params,
                    declaring_type: name.clone(),
                    modifiers: Modifiers::public(),
                    body,
                })
            })
            .collect();
        def
    }

    /// Build and register the type
    pub fn define(self, universe: &TypeUniverse) -> Result<Arc<TypeDef>, DefineError> {
        universe.define(self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_methods_are_abstract() {
        let def = TypeBuilder::interface("demo.Subject")
            .method(MethodBuilder::new("doOperation").param("String").returns("int"))
            .build();
        let method = &def.methods[0];
        assert!(method.is_abstract());
        assert!(method.modifiers.is_abstract);
        assert_eq!(method.overload_key(), "doOperation(String)");
        assert_eq!(method.return_type, TypeRef::Int);
        assert_eq!(method.declaring_type, "demo.Subject");
        assert!(def.constructors.is_empty());
    }

    #[test]
    fn test_class_gets_default_constructor() {
        let def = TypeBuilder::class("demo.Real")
            .method(MethodBuilder::new("run").native(|_, _| Ok(Value::Null)))
            .build();
        assert_eq!(def.constructors.len(), 1);
        assert!(def.constructors[0].params.is_empty());
        assert!(!def.methods[0].is_abstract());
    }

    #[test]
    fn test_fields_and_layout() {
        let universe = TypeUniverse::new();
        TypeBuilder::class("demo.Base")
            .field("a", TypeRef::Int)
            .static_field("counter", TypeRef::Long)
            .define(&universe)
            .unwrap();
        let sub = TypeBuilder::class("demo.Sub")
            .extends("demo.Base")
            .field("b", "String")
            .define(&universe)
            .unwrap();
        assert_eq!(sub.field_layout(), &["a".to_string(), "b".to_string()]);

        let base = universe.get("demo.Base").unwrap();
        assert_eq!(base.static_field("counter"), Some(Value::Long(0)));
        assert!(base.set_static_field("counter", Value::Long(5)));
        assert!(!base.set_static_field("missing", Value::Null));
    }

    #[test]
    fn test_private_method() {
        let method = MethodBuilder::new("hidden").as_private().build("demo.A");
        assert!(method.modifiers.is_private);
        assert!(!method.modifiers.is_public);
    }
}
