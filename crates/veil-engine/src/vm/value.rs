//! Runtime values

use std::fmt;
use std::sync::Arc;

use crate::proxy::handler::HandlerRef;
use crate::vm::builtins;
use crate::vm::object::ObjectRef;
use crate::vm::throwable::Throwable;
use crate::vm::types::{MethodRef, TypeRef};

/// A value held in locals, fields, the operand stack or passed to handlers
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(Arc<str>),
    Object(ObjectRef),
    Array(Arc<[Value]>),
    Handler(HandlerRef),
    Method(MethodRef),
    Throwable(Arc<Throwable>),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Arc::from(values))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&HandlerRef> {
        match self {
            Value::Handler(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodRef> {
        match self {
            Value::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_throwable(&self) -> Option<&Throwable> {
        match self {
            Value::Throwable(t) => Some(t),
            _ => None,
        }
    }

    /// The runtime type of the value; `None` for null
    pub fn runtime_type(&self) -> Option<TypeRef> {
        let ty = match self {
            Value::Null => return None,
            Value::Bool(_) => TypeRef::Boolean,
            Value::Int(_) => TypeRef::Int,
            Value::Long(_) => TypeRef::Long,
            Value::Double(_) => TypeRef::Double,
            Value::Str(_) => TypeRef::string(),
            Value::Object(o) => TypeRef::named(o.class_name()),
            Value::Array(_) => TypeRef::array(TypeRef::object()),
            Value::Handler(_) => TypeRef::named(builtins::INVOCATION_HANDLER),
            Value::Method(_) => TypeRef::named(builtins::METHOD),
            Value::Throwable(t) => TypeRef::named(t.class_name()),
        };
        Some(ty)
    }

    /// Runtime type text used in diagnostics
    pub fn type_name(&self) -> String {
        self.runtime_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "null".to_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Handler(a), Value::Handler(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Method(a), Value::Method(b)) => Arc::ptr_eq(a, b),
            (Value::Throwable(a), Value::Throwable(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}L", l),
            Value::Double(d) => write!(f, "{:?}", d),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Object(o) => write!(f, "{}@{:p}", o.class_name(), Arc::as_ptr(o)),
            Value::Array(a) => f.debug_list().entries(a.iter()).finish(),
            Value::Handler(h) => write!(f, "InvocationHandler@{:p}", Arc::as_ptr(h)),
            Value::Method(m) => write!(f, "Method({}.{})", m.declaring_type, m.overload_key()),
            Value::Throwable(t) => write!(f, "{}", t),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            other => write!(f, "{:?}", other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<Throwable> for Value {
    fn from(t: Throwable) -> Self {
        Value::Throwable(Arc::new(t))
    }
}

impl From<MethodRef> for Value {
    fn from(m: MethodRef) -> Self {
        Value::Method(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_types() {
        assert_eq!(Value::Null.runtime_type(), None);
        assert_eq!(Value::from(3).runtime_type(), Some(TypeRef::Int));
        assert_eq!(Value::from("x").runtime_type(), Some(TypeRef::string()));
        assert_eq!(Value::from(3i64).type_name(), "long");
        assert_eq!(Value::array(vec![]).type_name(), "Object[]");
        assert_eq!(Value::Null.type_name(), "null");
    }

    #[test]
    fn test_equality() {
        assert_eq!(Value::from("a"), Value::str("a"));
        assert_ne!(Value::from(1), Value::from(1i64));
        assert_eq!(
            Value::array(vec![Value::from(1), Value::Null]),
            Value::array(vec![Value::from(1), Value::Null])
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("plain").to_string(), "plain");
        assert_eq!(format!("{:?}", Value::from("q")), "\"q\"");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
