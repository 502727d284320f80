//! Dispatch façade for proxies of classes that cannot be subclassed

use crate::proxy::handler::HandlerRef;
use crate::vm::builtins::HANDLER_FIELD;
use crate::vm::object::ObjectRef;
use crate::vm::throwable::Throwable;
use crate::vm::types::MethodRef;
use crate::vm::value::Value;

/// A proxy instance derived from `veil.ProxyBase`
///
/// The generated type is not assignable to the target class, so callers
/// reach its forwarding methods by name through [`ProxyBase::invoke`].
#[derive(Clone, Debug)]
pub struct ProxyBase {
    object: ObjectRef,
}

impl ProxyBase {
    pub(crate) fn new(object: ObjectRef) -> Self {
        Self { object }
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn into_object(self) -> ObjectRef {
        self.object
    }

    /// The handler passed at construction
    pub fn handler(&self) -> Option<HandlerRef> {
        self.object
            .get_field(HANDLER_FIELD)
            .and_then(|value| value.as_handler().cloned())
    }

    /// Forwarding methods declared by the proxy type
    pub fn methods(&self) -> Vec<MethodRef> {
        declared_instance_methods(&self.object)
    }

    /// Call the forwarding method matching `name` and the runtime types of `args`
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, Throwable> {
        invoke_by_name(&self.object, name, args)
    }
}

/// Result of proxying a class
#[derive(Clone, Debug)]
pub enum ClassProxy {
    /// The proxy extends the class and can be used wherever the class is expected
    Subclass(ObjectRef),
    /// The class is final; the proxy extends `veil.ProxyBase`
    Sealed(ProxyBase),
}

impl ClassProxy {
    pub fn object(&self) -> &ObjectRef {
        match self {
            ClassProxy::Subclass(object) => object,
            ClassProxy::Sealed(base) => base.object(),
        }
    }

    pub fn into_object(self) -> ObjectRef {
        match self {
            ClassProxy::Subclass(object) => object,
            ClassProxy::Sealed(base) => base.into_object(),
        }
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self, ClassProxy::Sealed(_))
    }

    pub fn as_sealed(&self) -> Option<&ProxyBase> {
        match self {
            ClassProxy::Sealed(base) => Some(base),
            ClassProxy::Subclass(_) => None,
        }
    }

    /// Name-based dispatch, available for both shapes
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, Throwable> {
        invoke_by_name(self.object(), name, args)
    }
}

fn declared_instance_methods(object: &ObjectRef) -> Vec<MethodRef> {
    object
        .class()
        .methods
        .iter()
        .filter(|m| !m.is_static())
        .cloned()
        .collect()
}

/// Locate the declared method of the object's class matching `name` and the
/// runtime argument types (`null` matches any reference parameter) and invoke it
fn invoke_by_name(object: &ObjectRef, name: &str, args: &[Value]) -> Result<Value, Throwable> {
    let universe = object.universe();
    let class = object.class();
    let candidates: Vec<&MethodRef> = class
        .declared_methods_named(name)
        .filter(|m| !m.is_static() && m.params.len() == args.len())
        .filter(|m| {
            m.params.iter().zip(args).all(|(param, arg)| {
                (arg.is_null() && param.is_reference()) || universe.is_instance_of(arg, param)
            })
        })
        .collect();

    match candidates.as_slice() {
        [method] => universe.invoke(method, Some(object), args),
        [] => {
            let arg_types: Vec<String> = args.iter().map(Value::type_name).collect();
            Err(Throwable::builtin(
                "NoSuchMethodException",
                Some(format!("{}.{}({})", class.name, name, arg_types.join(","))),
            ))
        }
        several => {
            let keys: Vec<String> = several.iter().map(|m| m.overload_key()).collect();
            Err(Throwable::illegal_argument(format!(
                "ambiguous call {}.{}: matches {}",
                class.name,
                name,
                keys.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::builder::{MethodBuilder, TypeBuilder};
    use crate::vm::universe::TypeUniverse;

    fn object() -> ObjectRef {
        let universe = TypeUniverse::new();
        TypeBuilder::class("demo.Target")
            .method(MethodBuilder::new("echo").param("String").returns("String").native(|_, args| {
                Ok(args[0].clone())
            }))
            .method(MethodBuilder::new("echo").param("demo.Target").returns("String").native(|_, _| {
                Ok(Value::from("target"))
            }))
            .method(MethodBuilder::new("count").param("int").returns("int").native(|_, args| {
                Ok(args[0].clone())
            }))
            .define(&universe)
            .unwrap();
        universe.instantiate("demo.Target", &[]).unwrap()
    }

    #[test]
    fn test_invoke_selects_by_runtime_type() {
        let proxy = ClassProxy::Subclass(object());
        assert_eq!(proxy.invoke("echo", &[Value::from("x")]).unwrap(), Value::from("x"));
        assert_eq!(proxy.invoke("count", &[Value::Int(3)]).unwrap(), Value::Int(3));
        let itself = Value::Object(proxy.object().clone());
        assert_eq!(proxy.invoke("echo", &[itself]).unwrap(), Value::from("target"));
    }

    #[test]
    fn test_invoke_failures() {
        let proxy = ClassProxy::Subclass(object());
        let missing = proxy.invoke("echo", &[Value::Int(1)]).unwrap_err();
        assert_eq!(missing.class_name(), "NoSuchMethodException");
        assert_eq!(missing.message(), Some("demo.Target.echo(int)"));

        let ambiguous = proxy.invoke("echo", &[Value::Null]).unwrap_err();
        assert_eq!(ambiguous.class_name(), "IllegalArgumentException");
    }
}
