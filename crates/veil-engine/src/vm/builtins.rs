//! Builtin types
//!
//! `Object`, `String`, `veil.InvocationHandler`, `veil.Method` and the
//! throwable hierarchy are value types known by name only. `veil.ProxyBase`
//! is a real class registered in every universe.

use crate::vm::builder::TypeBuilder;
use crate::vm::object::ObjectRef;
use crate::vm::throwable::{is_builtin_subclass, is_builtin_throwable, Throwable};
use crate::vm::types::{join_types, Modifiers, TypeRef};
use crate::vm::universe::TypeUniverse;
use crate::vm::value::Value;

pub const OBJECT: &str = "Object";
pub const STRING: &str = "String";
pub const THROWABLE: &str = "Throwable";

/// Package of the proxy runtime support types
pub const RUNTIME_PACKAGE: &str = "veil";
pub const INVOCATION_HANDLER: &str = "veil.InvocationHandler";
pub const METHOD: &str = "veil.Method";
pub const PROXY_BASE: &str = "veil.ProxyBase";

/// Field of `veil.ProxyBase` (and of generated subclass proxies) holding the handler
pub const HANDLER_FIELD: &str = "handler";

/// Reference types implemented by the runtime rather than by a `TypeDef`
pub fn is_builtin_value_type(name: &str) -> bool {
    matches!(name, OBJECT | STRING | INVOCATION_HANDLER | METHOD) || is_builtin_throwable(name)
}

/// Simple names that resolve without an import
pub fn implicit_type(simple: &str) -> Option<&'static str> {
    match simple {
        OBJECT => Some(OBJECT),
        STRING => Some(STRING),
        _ => crate::vm::throwable::builtin_throwable_names().find(|n| *n == simple),
    }
}

/// Resolve a builtin spelled through the runtime package
///
/// `veil.Method` names the runtime type itself and `veil.String` the
/// implicit `String`. Generated code uses these spellings because no local,
/// field, import or package type can shadow them.
pub fn runtime_type(name: &str) -> Option<&'static str> {
    let simple = name.strip_prefix(RUNTIME_PACKAGE)?.strip_prefix('.')?;
    match name {
        INVOCATION_HANDLER => Some(INVOCATION_HANDLER),
        METHOD => Some(METHOD),
        PROXY_BASE => Some(PROXY_BASE),
        _ => implicit_type(simple),
    }
}

/// A method implemented by the runtime on a builtin value type
#[derive(Debug, Clone, Copy)]
pub struct BuiltinMethod {
    pub owner: &'static str,
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub returns: &'static str,
    pub is_static: bool,
}

impl BuiltinMethod {
    pub fn param_types(&self) -> Vec<TypeRef> {
        self.params.iter().map(|p| TypeRef::from(*p)).collect()
    }

    pub fn return_type(&self) -> TypeRef {
        TypeRef::from(self.returns)
    }
}

const BUILTIN_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod {
        owner: INVOCATION_HANDLER,
        name: "invoke",
        params: &[OBJECT, METHOD, "Object[]"],
        returns: OBJECT,
        is_static: false,
    },
    BuiltinMethod {
        owner: METHOD,
        name: "find",
        params: &[STRING, STRING, "String[]"],
        returns: METHOD,
        is_static: true,
    },
    BuiltinMethod {
        owner: METHOD,
        name: "getName",
        params: &[],
        returns: STRING,
        is_static: false,
    },
    BuiltinMethod {
        owner: METHOD,
        name: "getDeclaringType",
        params: &[],
        returns: STRING,
        is_static: false,
    },
    BuiltinMethod {
        owner: METHOD,
        name: "invoke",
        params: &[OBJECT, "Object[]"],
        returns: OBJECT,
        is_static: false,
    },
    BuiltinMethod {
        owner: THROWABLE,
        name: "getMessage",
        params: &[],
        returns: STRING,
        is_static: false,
    },
    BuiltinMethod {
        owner: THROWABLE,
        name: "getCause",
        params: &[],
        returns: THROWABLE,
        is_static: false,
    },
];

/// Builtin methods callable on a receiver of type `owner` with the given name
pub fn builtin_methods(owner: &str, name: &str) -> Vec<BuiltinMethod> {
    BUILTIN_METHODS
        .iter()
        .filter(|m| m.name == name)
        .filter(|m| {
            m.owner == owner || (m.owner == THROWABLE && is_builtin_subclass(owner, THROWABLE))
        })
        .copied()
        .collect()
}

/// Constructor signatures shared by every builtin throwable
pub fn throwable_constructors() -> Vec<Vec<TypeRef>> {
    vec![
        Vec::new(),
        vec![TypeRef::string()],
        vec![TypeRef::named(THROWABLE)],
        vec![TypeRef::string(), TypeRef::named(THROWABLE)],
    ]
}

/// Construct a builtin throwable from constructor arguments
pub(crate) fn construct_throwable(class: &str, args: &[Value]) -> Result<Value, Throwable> {
    let text = |v: &Value| v.as_str().map(str::to_string);
    let (message, cause) = match args {
        [] => (None, None),
        [Value::Throwable(cause)] => (None, Some(cause.as_ref().clone())),
        [only] => (text(only), None),
        [message, cause] => (text(message), cause.as_throwable().cloned()),
        _ => {
            return Err(Throwable::illegal_argument(format!(
                "no constructor {}({} arguments)",
                class,
                args.len()
            )))
        }
    };
    let mut thrown = Throwable::builtin(class, message);
    if let Some(cause) = cause {
        thrown = thrown.with_cause(cause);
    }
    Ok(Value::from(thrown))
}

/// Dispatch a call on a builtin receiver
///
/// Returns `None` when the receiver is not a builtin value type.
pub(crate) fn call_builtin(
    receiver: &Value,
    name: &str,
    args: &[Value],
) -> Option<Result<Value, Throwable>> {
    let result = match (receiver, name, args) {
        (Value::Handler(handler), "invoke", [proxy, method, arguments]) => {
            let Some(proxy) = proxy.as_object() else {
                return Some(Err(Throwable::illegal_argument("proxy argument is not an object")));
            };
            let Some(method) = method.as_method() else {
                return Some(Err(Throwable::null_pointer("method handle is null")));
            };
            let arguments = arguments.as_array().map(<[Value]>::to_vec).unwrap_or_default();
            handler.invoke(proxy, method, &arguments)
        }
        (Value::Method(method), "getName", []) => Ok(Value::str(&method.name)),
        (Value::Method(method), "getDeclaringType", []) => Ok(Value::str(&method.declaring_type)),
        (Value::Method(method), "invoke", [target, arguments]) => {
            let arguments = arguments.as_array().map(<[Value]>::to_vec).unwrap_or_default();
            method.invoke(target, &arguments)
        }
        (Value::Throwable(thrown), "getMessage", []) => {
            Ok(thrown.message().map(Value::str).unwrap_or(Value::Null))
        }
        (Value::Throwable(thrown), "getCause", []) => Ok(thrown
            .cause()
            .map(|c| Value::from(c.clone()))
            .unwrap_or(Value::Null)),
        (Value::Object(_), _, _) | (Value::Null, _, _) => return None,
        (other, _, _) => Err(Throwable::builtin(
            "AbstractMethodError",
            Some(format!("{}.{}", other.type_name(), name)),
        )),
    };
    Some(result)
}

/// `Method.find(owner, name, parameterTypes)`
///
/// Unknown owner or parameter types raise `ClassNotFoundException`; a
/// missing method raises `NoSuchMethodException`.
pub(crate) fn method_find(universe: &TypeUniverse, args: &[Value]) -> Result<Value, Throwable> {
    let [owner, name, params] = args else {
        return Err(Throwable::illegal_argument("Method.find expects 3 arguments"));
    };
    let (Some(owner), Some(name), Some(params)) = (owner.as_str(), name.as_str(), params.as_array())
    else {
        return Err(Throwable::null_pointer("Method.find argument is null"));
    };

    if !universe.contains(owner) {
        return Err(Throwable::builtin("ClassNotFoundException", Some(owner.to_string())));
    }

    let mut param_types = Vec::with_capacity(params.len());
    for param in params {
        let text = param
            .as_str()
            .ok_or_else(|| Throwable::null_pointer("parameter type name is null"))?;
        match TypeRef::parse(text) {
            Some(ty) if !ty.is_void() && universe.type_exists(&ty) => param_types.push(ty),
            _ => {
                return Err(Throwable::builtin(
                    "ClassNotFoundException",
                    Some(text.to_string()),
                ))
            }
        }
    }

    universe
        .find_method(owner, name, &param_types)
        .map(Value::Method)
        .ok_or_else(|| {
            Throwable::builtin(
                "NoSuchMethodException",
                Some(format!("{}.{}({})", owner, name, join_types(&param_types))),
            )
        })
}

/// Register `veil.ProxyBase`
pub(crate) fn install(universe: &TypeUniverse) {
    let mut handler_modifiers = Modifiers::default();
    handler_modifiers.is_protected = true;

    let proxy_base = TypeBuilder::class(PROXY_BASE)
        .field_with(HANDLER_FIELD, TypeRef::named(INVOCATION_HANDLER), handler_modifiers)
        .constructor(vec![TypeRef::named(INVOCATION_HANDLER)], |obj: &ObjectRef, args| {
            match args.first() {
                Some(handler @ Value::Handler(_)) => {
                    obj.set_field(HANDLER_FIELD, handler.clone());
                    Ok(())
                }
                _ => Err(Throwable::null_pointer("invocation handler is null")),
            }
        });

    if let Err(err) = proxy_base.define(universe) {
        tracing::error!(error = %err, "failed to install {}", PROXY_BASE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::builder::MethodBuilder;

    #[test]
    fn test_builtin_value_types() {
        assert!(is_builtin_value_type("String"));
        assert!(is_builtin_value_type(METHOD));
        assert!(is_builtin_value_type("NoSuchMethodError"));
        assert!(!is_builtin_value_type(PROXY_BASE));
        assert_eq!(implicit_type("RuntimeException"), Some("RuntimeException"));
        assert_eq!(implicit_type("ProxyBase"), None);
    }

    #[test]
    fn test_runtime_spellings() {
        assert_eq!(runtime_type("veil.Object"), Some(OBJECT));
        assert_eq!(runtime_type("veil.Error"), Some("Error"));
        assert_eq!(runtime_type(METHOD), Some(METHOD));
        assert_eq!(runtime_type(PROXY_BASE), Some(PROXY_BASE));
        assert_eq!(runtime_type("veil.Missing"), None);
        assert_eq!(runtime_type("Error"), None);
        assert_eq!(runtime_type("demo.Error"), None);
        assert_eq!(runtime_type("veilx.Error"), None);
    }

    #[test]
    fn test_builtin_method_lookup() {
        assert_eq!(builtin_methods(INVOCATION_HANDLER, "invoke").len(), 1);
        assert_eq!(builtin_methods("NoSuchMethodException", "getMessage").len(), 1);
        assert!(builtin_methods(STRING, "getMessage").is_empty());
        let find = builtin_methods(METHOD, "find");
        assert!(find[0].is_static);
        assert_eq!(find[0].return_type(), TypeRef::named(METHOD));
    }

    #[test]
    fn test_method_find() {
        let universe = TypeUniverse::new();
        TypeBuilder::interface("demo.Subject")
            .method(MethodBuilder::new("doOperation").param("String"))
            .define(&universe)
            .unwrap();

        let args = |owner: &str, params: Vec<Value>| {
            vec![Value::from(owner), Value::from("doOperation"), Value::array(params)]
        };

        let found = method_find(&universe, &args("demo.Subject", vec![Value::from("String")])).unwrap();
        assert_eq!(found.as_method().unwrap().overload_key(), "doOperation(String)");

        let missing = method_find(&universe, &args("demo.Subject", vec![])).unwrap_err();
        assert_eq!(missing.class_name(), "NoSuchMethodException");

        let no_class = method_find(&universe, &args("demo.Gone", vec![])).unwrap_err();
        assert_eq!(no_class.class_name(), "ClassNotFoundException");

        let bad_param = method_find(&universe, &args("demo.Subject", vec![Value::from("demo.Gone")])).unwrap_err();
        assert_eq!(bad_param.class_name(), "ClassNotFoundException");
    }

    #[test]
    fn test_construct_throwable() {
        let cause = Throwable::checked("demo.IOException", "disk");
        let wrapped = construct_throwable("UndeclaredThrowableException", &[Value::from(cause.clone())]).unwrap();
        let wrapped = wrapped.as_throwable().unwrap();
        assert_eq!(wrapped.cause(), Some(&cause));
        assert_eq!(wrapped.message(), None);

        let err = construct_throwable("NoSuchMethodError", &[Value::from("m()")]).unwrap();
        assert_eq!(err.as_throwable().unwrap().message(), Some("m()"));
    }

    #[test]
    fn test_proxy_base_requires_handler() {
        let universe = TypeUniverse::new();
        let err = universe.instantiate(PROXY_BASE, &[Value::Null]).unwrap_err();
        assert_eq!(err.class_name(), "NullPointerException");
    }
}
