//! Object instances

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::vm::throwable::Throwable;
use crate::vm::types::{TypeDef, TypeRef};
use crate::vm::universe::TypeUniverse;
use crate::vm::value::Value;

/// Shared reference to an instance
pub type ObjectRef = Arc<Instance>;

/// An instance of a class defined in a [`TypeUniverse`]
pub struct Instance {
    class: Arc<TypeDef>,
    universe: TypeUniverse,
    fields: Mutex<Vec<Value>>,
}

impl Instance {
    /// Allocate an instance with every field at its default value
    pub(crate) fn new(class: Arc<TypeDef>, universe: TypeUniverse) -> Self {
        let fields = class
            .field_layout()
            .iter()
            .map(|name| {
                universe
                    .instance_field_type(&class, name)
                    .map(|ty| ty.default_value())
                    .unwrap_or_default()
            })
            .collect();
        Self {
            class,
            universe,
            fields: Mutex::new(fields),
        }
    }

    pub fn class(&self) -> &Arc<TypeDef> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    pub fn universe(&self) -> &TypeUniverse {
        &self.universe
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        let slot = self.class.field_slot(name)?;
        self.fields.lock().get(slot).cloned()
    }

    /// Store a field value; false if the class has no such instance field
    pub fn set_field(&self, name: &str, value: Value) -> bool {
        let Some(slot) = self.class.field_slot(name) else {
            return false;
        };
        match self.fields.lock().get_mut(slot) {
            Some(field) => {
                *field = value;
                true
            }
            None => false,
        }
    }

    /// Whether the instance's class is `type_name` or one of its subtypes
    pub fn is_instance_of(&self, type_name: &str) -> bool {
        self.universe.is_subtype(&self.class.name, type_name)
    }

    /// Call a method by name and parameter types with virtual dispatch
    pub fn call(self: &Arc<Self>, name: &str, params: &[TypeRef], args: &[Value]) -> Result<Value, Throwable> {
        let method = self
            .universe
            .resolve_virtual(&self.class, name, params)
            .ok_or_else(|| {
                Throwable::builtin(
                    "AbstractMethodError",
                    Some(format!(
                        "{}.{}",
                        self.class.name,
                        crate::vm::types::overload_key(name, params)
                    )),
                )
            })?;
        self.universe.invoke(&method, Some(self), args)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:p}", self.class.name, self as *const Self)
    }
}
