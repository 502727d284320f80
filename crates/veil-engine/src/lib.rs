//! Veil Engine
//!
//! Runtime proxy synthesis for the Veil type system:
//! - **Parser**: lexer and parser for Veil source (`parser` module)
//! - **Compiler**: in-memory source compiler producing class units (`compiler` module)
//! - **VM**: type universe, interpreter and dynamic type loader (`vm` module)
//! - **Proxy**: method surface resolution, source synthesis and the proxy factory (`proxy` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use veil_engine::{handler, ProxyFactory, TypeUniverse, Value};
//!
//! let universe = TypeUniverse::new();
//! universe.load_specs_json(r#"[{ "name": "demo.Subject", "kind": "interface",
//!     "methods": [{ "name": "doOperation" }] }]"#)?;
//!
//! let factory = ProxyFactory::new(&universe);
//! let proxy = factory.new_proxy_instance(
//!     ["demo.Subject"],
//!     handler(|_, method, _| {
//!         println!("called {}", method.name);
//!         Ok(Value::Null)
//!     }),
//! )?;
//! proxy.call("doOperation", &[], &[])?;
//! ```

#![warn(rust_2018_idioms)]
#![allow(clippy::new_without_default)]
#![allow(clippy::result_large_err)]

/// Lexer, AST and parser for Veil source
pub mod parser;

/// Source compiler: checking, code generation, class unit format
pub mod compiler;

/// Type universe, values, interpreter and loader
pub mod vm;

/// Dynamic proxy synthesis
pub mod proxy;

pub use compiler::{CompileError, CompiledArtifact, SourceCompiler};
pub use proxy::{
    handler, ClassProxy, Delegate, HandlerRef, InvocationHandler, ProxyBase, ProxyConfig, ProxyError,
    ProxyFactory, ProxyStage, ProxyTarget,
};
pub use vm::{DynamicTypeLoader, LoadError, MethodRef, ObjectRef, Throwable, TypeUniverse, Value};
