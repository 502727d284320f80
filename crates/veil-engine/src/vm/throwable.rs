//! Throwables raised by interpreted code, native methods and handlers
//!
//! The builtin hierarchy is a fixed table. Throwable classes that are not in
//! the table are classified by their [`ThrowableKind`]: a checked throwable
//! behaves as a subclass of `Exception`, an unchecked one as a subclass of
//! `RuntimeException`, an error as a subclass of `Error`.

use std::fmt;
use std::sync::Arc;

/// Classification used for rethrow/wrap decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrowableKind {
    /// `Exception` family outside `RuntimeException`
    Checked,
    /// `RuntimeException` family
    Unchecked,
    /// `Error` family
    Error,
}

use ThrowableKind::{Checked, Error as Fatal, Unchecked};

/// (name, parent, kind)
const BUILTIN_THROWABLES: &[(&str, Option<&str>, ThrowableKind)] = &[
    ("Throwable", None, Checked),
    ("Exception", Some("Throwable"), Checked),
    ("RuntimeException", Some("Exception"), Unchecked),
    ("Error", Some("Throwable"), Fatal),
    ("ReflectiveOperationException", Some("Exception"), Checked),
    ("NoSuchMethodException", Some("ReflectiveOperationException"), Checked),
    ("ClassNotFoundException", Some("ReflectiveOperationException"), Checked),
    ("InstantiationException", Some("ReflectiveOperationException"), Checked),
    ("LinkageError", Some("Error"), Fatal),
    ("IncompatibleClassChangeError", Some("LinkageError"), Fatal),
    ("NoSuchMethodError", Some("IncompatibleClassChangeError"), Fatal),
    ("AbstractMethodError", Some("IncompatibleClassChangeError"), Fatal),
    ("NoClassDefFoundError", Some("LinkageError"), Fatal),
    ("ExceptionInInitializerError", Some("LinkageError"), Fatal),
    ("VerifyError", Some("LinkageError"), Fatal),
    ("VirtualMachineError", Some("Error"), Fatal),
    ("StackOverflowError", Some("VirtualMachineError"), Fatal),
    ("UndeclaredThrowableException", Some("RuntimeException"), Unchecked),
    ("ClassCastException", Some("RuntimeException"), Unchecked),
    ("NullPointerException", Some("RuntimeException"), Unchecked),
    ("IllegalArgumentException", Some("RuntimeException"), Unchecked),
    ("IllegalStateException", Some("RuntimeException"), Unchecked),
    ("UnsupportedOperationException", Some("RuntimeException"), Unchecked),
];

fn builtin_entry(name: &str) -> Option<&'static (&'static str, Option<&'static str>, ThrowableKind)> {
    BUILTIN_THROWABLES.iter().find(|(n, _, _)| *n == name)
}

/// Names of every builtin throwable class
pub fn builtin_throwable_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_THROWABLES.iter().map(|(name, _, _)| *name)
}

pub fn is_builtin_throwable(name: &str) -> bool {
    builtin_entry(name).is_some()
}

/// Parent of a builtin throwable class
pub fn builtin_parent(name: &str) -> Option<&'static str> {
    builtin_entry(name).and_then(|(_, parent, _)| *parent)
}

/// Kind of a builtin throwable class
pub fn builtin_kind(name: &str) -> Option<ThrowableKind> {
    builtin_entry(name).map(|(_, _, kind)| *kind)
}

/// Subclass test within the builtin table
pub fn is_builtin_subclass(sub: &str, sup: &str) -> bool {
    let mut current = Some(sub);
    while let Some(name) = current {
        if name == sup {
            return true;
        }
        current = builtin_parent(name);
    }
    false
}

/// A raised throwable
#[derive(Debug, Clone, PartialEq)]
pub struct Throwable {
    class_name: String,
    kind: ThrowableKind,
    message: Option<String>,
    cause: Option<Arc<Throwable>>,
}

impl Throwable {
    pub fn new(class_name: impl Into<String>, kind: ThrowableKind, message: Option<String>) -> Self {
        Self {
            class_name: class_name.into(),
            kind,
            message,
            cause: None,
        }
    }

    /// A builtin throwable; unknown names are treated as checked
    pub fn builtin(class_name: &str, message: Option<String>) -> Self {
        let kind = builtin_kind(class_name).unwrap_or(Checked);
        Self::new(class_name, kind, message)
    }

    pub fn checked(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(class_name, Checked, Some(message.into()))
    }

    pub fn unchecked(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(class_name, Unchecked, Some(message.into()))
    }

    pub fn error(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(class_name, Fatal, Some(message.into()))
    }

    pub fn with_cause(mut self, cause: Throwable) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// `UndeclaredThrowableException` wrapping a checked throwable
    pub fn undeclared(cause: Throwable) -> Self {
        Self::builtin("UndeclaredThrowableException", None).with_cause(cause)
    }

    pub fn null_pointer(message: impl Into<String>) -> Self {
        Self::builtin("NullPointerException", Some(message.into()))
    }

    pub fn class_cast(message: impl Into<String>) -> Self {
        Self::builtin("ClassCastException", Some(message.into()))
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::builtin("IllegalArgumentException", Some(message.into()))
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn kind(&self) -> ThrowableKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn cause(&self) -> Option<&Throwable> {
        self.cause.as_deref()
    }

    /// Unchecked throwables and errors propagate through forwarding methods unchanged
    pub fn is_unchecked(&self) -> bool {
        self.kind != Checked
    }

    pub fn is_error(&self) -> bool {
        self.kind == Fatal
    }

    /// Whether this throwable would be caught by `catch (type_name e)`
    pub fn is_instance_of(&self, type_name: &str) -> bool {
        if self.class_name == type_name {
            return true;
        }
        if is_builtin_throwable(&self.class_name) {
            return is_builtin_subclass(&self.class_name, type_name);
        }
        let root = match self.kind {
            Checked => "Exception",
            Unchecked => "RuntimeException",
            Fatal => "Error",
        };
        is_builtin_subclass(root, type_name)
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.class_name, message),
            None => write!(f, "{}", self.class_name),
        }
    }
}

impl std::error::Error for Throwable {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_hierarchy() {
        let err = Throwable::builtin("NoSuchMethodError", Some("x".to_string()));
        assert!(err.is_error());
        assert!(err.is_instance_of("LinkageError"));
        assert!(err.is_instance_of("Error"));
        assert!(err.is_instance_of("Throwable"));
        assert!(!err.is_instance_of("RuntimeException"));

        let ex = Throwable::builtin("NoSuchMethodException", None);
        assert_eq!(ex.kind(), ThrowableKind::Checked);
        assert!(ex.is_instance_of("ReflectiveOperationException"));
        assert!(!ex.is_instance_of("Error"));
    }

    #[test]
    fn test_custom_throwables_use_kind() {
        let io = Throwable::checked("demo.IOException", "disk");
        assert!(io.is_instance_of("Exception"));
        assert!(!io.is_instance_of("RuntimeException"));
        assert!(!io.is_unchecked());

        let state = Throwable::unchecked("demo.BadState", "boom");
        assert!(state.is_instance_of("RuntimeException"));
        assert!(state.is_instance_of("demo.BadState"));
        assert!(state.is_unchecked());
    }

    #[test]
    fn test_undeclared_keeps_cause() {
        let cause = Throwable::checked("demo.IOException", "disk");
        let wrapped = Throwable::undeclared(cause.clone());
        assert_eq!(wrapped.class_name(), "UndeclaredThrowableException");
        assert!(wrapped.is_unchecked());
        assert_eq!(wrapped.cause(), Some(&cause));
        assert!(std::error::Error::source(&wrapped).is_some());
    }

    #[test]
    fn test_display() {
        let npe = Throwable::null_pointer("receiver is null");
        assert_eq!(npe.to_string(), "NullPointerException: receiver is null");
        assert_eq!(Throwable::builtin("Error", None).to_string(), "Error");
    }
}
