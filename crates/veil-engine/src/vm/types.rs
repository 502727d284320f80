//! Type references, modifiers and the runtime type descriptors
//!
//! A [`TypeDef`] is the live form of an interface or class: its members,
//! static storage and initialization state. Types are created natively
//! (through [`crate::vm::TypeBuilder`] or JSON descriptions) or by the
//! dynamic type loader from compiled class units.

use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

use crate::compiler::bytecode::{access, ConstantPool};
use crate::vm::object::ObjectRef;
use crate::vm::throwable::Throwable;
use crate::vm::value::Value;

/// A type as it appears in signatures, fields and casts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Void,
    Boolean,
    Int,
    Long,
    Double,
    /// Fully qualified reference type name
    Named(String),
    Array(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    pub fn object() -> Self {
        TypeRef::named(crate::vm::builtins::OBJECT)
    }

    pub fn string() -> Self {
        TypeRef::named(crate::vm::builtins::STRING)
    }

    /// Parse the canonical text form (`int`, `demo.Subject`, `Object[]`)
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(element) = text.strip_suffix("[]") {
            return Self::parse(element)
                .filter(|e| !e.is_void())
                .map(Self::array);
        }
        match text {
            "void" => Some(TypeRef::Void),
            "boolean" => Some(TypeRef::Boolean),
            "int" => Some(TypeRef::Int),
            "long" => Some(TypeRef::Long),
            "double" => Some(TypeRef::Double),
            _ if is_qualified_name(text) => Some(TypeRef::Named(text.to_string())),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeRef::Boolean | TypeRef::Int | TypeRef::Long | TypeRef::Double
        )
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, TypeRef::Named(_) | TypeRef::Array(_))
    }

    /// The name of a named reference type
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeRef::Named(name) => Some(name),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Default value of a field or local of this type
    pub fn default_value(&self) -> Value {
        match self {
            TypeRef::Boolean => Value::Bool(false),
            TypeRef::Int => Value::Int(0),
            TypeRef::Long => Value::Long(0),
            TypeRef::Double => Value::Double(0.0),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => write!(f, "void"),
            TypeRef::Boolean => write!(f, "boolean"),
            TypeRef::Int => write!(f, "int"),
            TypeRef::Long => write!(f, "long"),
            TypeRef::Double => write!(f, "double"),
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::Array(element) => write!(f, "{}[]", element),
        }
    }
}

impl From<&str> for TypeRef {
    /// Parses the text form; anything unparseable is kept as a named type
    fn from(text: &str) -> Self {
        TypeRef::parse(text).unwrap_or_else(|| TypeRef::Named(text.to_string()))
    }
}

/// Check that `text` is a dotted sequence of identifiers
pub fn is_qualified_name(text: &str) -> bool {
    !text.is_empty() && text.split('.').all(is_identifier)
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Render a parameter list as `T1,T2,...`
pub fn join_types(types: &[TypeRef]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// A method descriptor: `(T1,T2)R`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<TypeRef>,
    pub return_type: TypeRef,
}

impl MethodDescriptor {
    pub fn new(params: Vec<TypeRef>, return_type: TypeRef) -> Self {
        Self {
            params,
            return_type,
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix('(')?;
        let (params, ret) = rest.split_once(')')?;
        let params = if params.trim().is_empty() {
            Vec::new()
        } else {
            params
                .split(',')
                .map(|p| TypeRef::parse(p).filter(|t| !t.is_void()))
                .collect::<Option<Vec<_>>>()?
        };
        Some(Self {
            params,
            return_type: TypeRef::parse(ret)?,
        })
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){}", join_types(&self.params), self.return_type)
    }
}

/// Interface or class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Interface,
    Class,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Interface => write!(f, "interface"),
            TypeKind::Class => write!(f, "class"),
        }
    }
}

/// Type and member modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Public visibility
    pub is_public: bool,
    /// Private visibility
    pub is_private: bool,
    /// Protected visibility
    pub is_protected: bool,
    /// Static member
    pub is_static: bool,
    /// Final type or member
    pub is_final: bool,
    /// Abstract type or member
    pub is_abstract: bool,
}

impl Modifiers {
    pub fn public() -> Self {
        Self {
            is_public: true,
            ..Self::default()
        }
    }

    /// Parse a single keyword into this set; returns false for unknown words
    pub fn apply_keyword(&mut self, keyword: &str) -> bool {
        match keyword {
            "public" => self.is_public = true,
            "private" => self.is_private = true,
            "protected" => self.is_protected = true,
            "static" => self.is_static = true,
            "final" => self.is_final = true,
            "abstract" => self.is_abstract = true,
            _ => return false,
        }
        true
    }

    /// Encode as class unit access flags
    pub fn to_bits(self) -> u16 {
        let mut bits = 0;
        if self.is_public {
            bits |= access::PUBLIC;
        }
        if self.is_private {
            bits |= access::PRIVATE;
        }
        if self.is_protected {
            bits |= access::PROTECTED;
        }
        if self.is_static {
            bits |= access::STATIC;
        }
        if self.is_final {
            bits |= access::FINAL;
        }
        if self.is_abstract {
            bits |= access::ABSTRACT;
        }
        bits
    }

    /// Decode class unit access flags
    pub fn from_bits(bits: u16) -> Self {
        Self {
            is_public: bits & access::PUBLIC != 0,
            is_private: bits & access::PRIVATE != 0,
            is_protected: bits & access::PROTECTED != 0,
            is_static: bits & access::STATIC != 0,
            is_final: bits & access::FINAL != 0,
            is_abstract: bits & access::ABSTRACT != 0,
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = [
            (self.is_public, "public"),
            (self.is_protected, "protected"),
            (self.is_private, "private"),
            (self.is_abstract, "abstract"),
            (self.is_static, "static"),
            (self.is_final, "final"),
        ];
        let set: Vec<&str> = words
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, word)| *word)
            .collect();
        write!(f, "{}", set.join(" "))
    }
}

/// Field descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: TypeRef,
    pub modifiers: Modifiers,
    pub declaring_type: String,
}

/// Native method implementation: receiver (null for static methods) and arguments
pub type NativeMethod = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, Throwable> + Send + Sync>;

/// Native constructor implementation, run on the freshly allocated instance
pub type NativeConstructor = Arc<dyn Fn(&ObjectRef, &[Value]) -> Result<(), Throwable> + Send + Sync>;

/// Exception table entry of a loaded code body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start: usize,
    pub end: usize,
    pub handler: usize,
    /// Caught type names; empty catches everything
    pub catch_types: Vec<String>,
}

/// Verified bytecode ready for the interpreter
#[derive(Debug)]
pub struct CodeBody {
    /// Type the body belongs to
    pub owner: String,
    pub name: String,
    pub is_static: bool,
    pub param_count: usize,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub handlers: Vec<ExceptionHandler>,
    pub constants: Arc<ConstantPool>,
}

/// How a method is implemented
#[derive(Clone)]
pub enum MethodBody {
    Abstract,
    Native(NativeMethod),
    Compiled(Arc<CodeBody>),
}

impl fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodBody::Abstract => write!(f, "Abstract"),
            MethodBody::Native(_) => write!(f, "Native"),
            MethodBody::Compiled(code) => write!(f, "Compiled({} bytes)", code.code.len()),
        }
    }
}

/// A method declared by a type
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    pub params: Vec<TypeRef>,
    pub return_type: TypeRef,
    pub declaring_type: String,
    pub modifiers: Modifiers,
    pub body: MethodBody,
}

/// Shared method handle
pub type MethodRef = Arc<MethodInfo>;

impl MethodInfo {
    /// Overload key: `name(T1,T2,...)`
    pub fn overload_key(&self) -> String {
        overload_key(&self.name, &self.params)
    }

    pub fn descriptor(&self) -> MethodDescriptor {
        MethodDescriptor::new(self.params.clone(), self.return_type.clone())
    }

    /// Human readable signature, e.g. `String echo(String,int)`
    pub fn signature(&self) -> String {
        format!("{} {}", self.return_type, self.overload_key())
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.body, MethodBody::Abstract)
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static
    }

    /// Check the name and parameter list
    pub fn matches(&self, name: &str, params: &[TypeRef]) -> bool {
        self.name == name && self.params == params
    }
}

/// Build an overload key from a name and parameter list
pub fn overload_key(name: &str, params: &[TypeRef]) -> String {
    format!("{}({})", name, join_types(params))
}

/// How a constructor is implemented
#[derive(Clone)]
pub enum ConstructorBody {
    Native(NativeConstructor),
    Compiled(Arc<CodeBody>),
}

impl fmt::Debug for ConstructorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorBody::Native(_) => write!(f, "Native"),
            ConstructorBody::Compiled(code) => write!(f, "Compiled({} bytes)", code.code.len()),
        }
    }
}

/// A constructor declared by a class
#[derive(Debug, Clone)]
pub struct ConstructorInfo {
    pub params: Vec<TypeRef>,
    pub declaring_type: String,
    pub modifiers: Modifiers,
    pub body: ConstructorBody,
}

/// Where a type came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeOrigin {
    /// Defined by Rust code or a type description
    Native,
    /// Defined by the dynamic type loader from a class unit
    Loaded {
        /// SHA-256 of the class unit bytes
        digest: [u8; 32],
        source_file: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub(crate) enum InitState {
    Pending,
    Running(ThreadId),
    Done,
    Failed(Throwable),
}

/// One-time static initialization guard
#[derive(Debug)]
pub(crate) struct InitCell {
    pub(crate) state: Mutex<InitState>,
    pub(crate) ready: Condvar,
}

impl InitCell {
    fn new() -> Self {
        Self {
            state: Mutex::new(InitState::Pending),
            ready: Condvar::new(),
        }
    }
}

/// A live interface or class
pub struct TypeDef {
    /// Fully qualified name
    pub name: String,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    /// Declared fields (instance and static)
    pub fields: Vec<FieldInfo>,
    pub constructors: Vec<Arc<ConstructorInfo>>,
    /// Declared methods
    pub methods: Vec<MethodRef>,
    pub static_init: Option<Arc<CodeBody>>,
    pub origin: TypeOrigin,
    /// Instance field names, inherited first; filled in when defined
    pub(crate) layout: Vec<String>,
    pub(crate) statics: Mutex<FxHashMap<String, Value>>,
    pub(crate) init: InitCell,
}

impl TypeDef {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers: Modifiers::public(),
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            static_init: None,
            origin: TypeOrigin::Native,
            layout: Vec::new(),
            statics: Mutex::new(FxHashMap::default()),
            init: InitCell::new(),
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.is_final
    }

    /// Interfaces and abstract classes cannot be instantiated
    pub fn is_abstract(&self) -> bool {
        self.is_interface() || self.modifiers.is_abstract
    }

    /// Package part of the name, if any
    pub fn package(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(package, _)| package)
    }

    pub fn simple_name(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(_, simple)| simple)
            .unwrap_or(&self.name)
    }

    pub fn as_type_ref(&self) -> TypeRef {
        TypeRef::named(self.name.clone())
    }

    /// Find a declared method by name and parameter list
    pub fn declared_method(&self, name: &str, params: &[TypeRef]) -> Option<&MethodRef> {
        self.methods.iter().find(|m| m.matches(name, params))
    }

    /// Declared methods with the given name
    pub fn declared_methods_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a MethodRef> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn declared_field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Find a declared constructor by parameter list
    pub fn constructor(&self, params: &[TypeRef]) -> Option<&Arc<ConstructorInfo>> {
        self.constructors.iter().find(|c| c.params == params)
    }

    /// Instance field names in slot order
    pub fn field_layout(&self) -> &[String] {
        &self.layout
    }

    /// Slot of an instance field; a subclass field shadows an inherited one
    pub fn field_slot(&self, name: &str) -> Option<usize> {
        self.layout.iter().rposition(|n| n == name)
    }

    pub fn static_field(&self, name: &str) -> Option<Value> {
        self.statics.lock().get(name).cloned()
    }

    /// Store into a declared static field; false if there is no such field
    pub fn set_static_field(&self, name: &str, value: Value) -> bool {
        let mut statics = self.statics.lock();
        match statics.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// SHA-256 digest of the class unit this type was loaded from
    pub fn digest(&self) -> Option<&[u8; 32]> {
        match &self.origin {
            TypeOrigin::Loaded { digest, .. } => Some(digest),
            TypeOrigin::Native => None,
        }
    }

    /// Whether static initialization finished successfully
    pub fn is_initialized(&self) -> bool {
        matches!(*self.init.state.lock(), InitState::Done)
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("modifiers", &self.modifiers)
            .field("superclass", &self.superclass)
            .field("interfaces", &self.interfaces)
            .field("methods", &self.methods.len())
            .field("origin", &self.origin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_parse() {
        assert_eq!(TypeRef::parse("int"), Some(TypeRef::Int));
        assert_eq!(TypeRef::parse("demo.Subject"), Some(TypeRef::named("demo.Subject")));
        assert_eq!(
            TypeRef::parse("Object[][]"),
            Some(TypeRef::array(TypeRef::array(TypeRef::object())))
        );
        assert_eq!(TypeRef::parse("$Proxy3"), Some(TypeRef::named("$Proxy3")));
        assert_eq!(TypeRef::parse("void[]"), None);
        assert_eq!(TypeRef::parse("1abc"), None);
        assert_eq!(TypeRef::parse("a..b"), None);
        assert_eq!(TypeRef::parse(""), None);
    }

    #[test]
    fn test_type_ref_display() {
        let ty = TypeRef::array(TypeRef::named("demo.Subject"));
        assert_eq!(ty.to_string(), "demo.Subject[]");
        assert_eq!(TypeRef::parse(&ty.to_string()), Some(ty));
    }

    #[test]
    fn test_descriptor_parse() {
        let desc = MethodDescriptor::parse("(String,int)void").unwrap();
        assert_eq!(desc.params, vec![TypeRef::string(), TypeRef::Int]);
        assert_eq!(desc.return_type, TypeRef::Void);
        assert_eq!(desc.to_string(), "(String,int)void");

        let empty = MethodDescriptor::parse("()Object[]").unwrap();
        assert!(empty.params.is_empty());
        assert!(MethodDescriptor::parse("(void)int").is_none());
        assert!(MethodDescriptor::parse("String)int").is_none());
    }

    #[test]
    fn test_modifier_bits() {
        let mut mods = Modifiers::public();
        assert!(mods.apply_keyword("final"));
        assert!(!mods.apply_keyword("sealed"));
        assert_eq!(Modifiers::from_bits(mods.to_bits()), mods);
        assert_eq!(mods.to_string(), "public final");
    }

    #[test]
    fn test_overload_key() {
        assert_eq!(
            overload_key("doOperation", &[TypeRef::string(), TypeRef::Int]),
            "doOperation(String,int)"
        );
        assert_eq!(overload_key("run", &[]), "run()");
    }

    #[test]
    fn test_type_def_names() {
        let def = TypeDef::new("demo.sub.Subject", TypeKind::Interface);
        assert_eq!(def.package(), Some("demo.sub"));
        assert_eq!(def.simple_name(), "Subject");
        assert!(def.is_abstract());

        let top = TypeDef::new("Top", TypeKind::Class);
        assert_eq!(top.package(), None);
        assert_eq!(top.simple_name(), "Top");
    }
}
