//! Runtime
//!
//! The type universe, values and instances, the throwable hierarchy, the
//! bytecode interpreter and the dynamic type loader.

pub mod builder;
pub mod builtins;
pub mod interpreter;
pub mod loader;
pub mod object;
pub mod spec;
pub mod throwable;
pub mod types;
pub mod universe;
pub mod value;

pub use builder::{MethodBuilder, TypeBuilder};
pub use interpreter::{Interpreter, MAX_CALL_DEPTH};
pub use loader::{DynamicTypeLoader, LoadError};
pub use object::{Instance, ObjectRef};
pub use spec::{parse_specs, MethodSpec, SpecError, SpecKind, TypeSpec};
pub use throwable::{Throwable, ThrowableKind};
pub use types::{
    CodeBody, ConstructorInfo, FieldInfo, MethodBody, MethodDescriptor, MethodInfo, MethodRef,
    Modifiers, TypeDef, TypeKind, TypeOrigin, TypeRef,
};
pub use universe::{DefineError, TypeUniverse};
pub use value::Value;
