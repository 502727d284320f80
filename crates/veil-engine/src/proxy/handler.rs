//! The invocation handler contract

use std::sync::Arc;

use crate::vm::object::ObjectRef;
use crate::vm::throwable::Throwable;
use crate::vm::types::MethodRef;
use crate::vm::value::Value;

/// Receives every call made on a proxy
///
/// `proxy` is the proxy instance itself, `method` the handle of the
/// interface or class method that was called and `args` the exact argument
/// list. The returned value is cast to the method's return type by the
/// forwarding method; `void` methods ignore it.
///
/// Unchecked throwables (`RuntimeException` and `Error` families) reach the
/// caller unchanged. Checked ones arrive wrapped in
/// `UndeclaredThrowableException`.
pub trait InvocationHandler: Send + Sync {
    fn invoke(&self, proxy: &ObjectRef, method: &MethodRef, args: &[Value]) -> Result<Value, Throwable>;
}

impl<F> InvocationHandler for F
where
    F: Fn(&ObjectRef, &MethodRef, &[Value]) -> Result<Value, Throwable> + Send + Sync,
{
    fn invoke(&self, proxy: &ObjectRef, method: &MethodRef, args: &[Value]) -> Result<Value, Throwable> {
        self(proxy, method, args)
    }
}

/// Shared handler reference, as stored in a proxy's `handler` field
pub type HandlerRef = Arc<dyn InvocationHandler>;

/// Wrap a handler for use with the proxy factory
pub fn handler<H: InvocationHandler + 'static>(handler: H) -> HandlerRef {
    Arc::new(handler)
}

/// Handler that delegates every call to `target`
///
/// Useful as the inner step of decorating handlers.
pub struct Delegate {
    target: Value,
}

impl Delegate {
    pub fn new(target: impl Into<Value>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &Value {
        &self.target
    }
}

impl InvocationHandler for Delegate {
    fn invoke(&self, _proxy: &ObjectRef, method: &MethodRef, args: &[Value]) -> Result<Value, Throwable> {
        method.invoke(&self.target, args)
    }
}
