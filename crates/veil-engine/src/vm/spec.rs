//! JSON type descriptions
//!
//! A description file is a list of types:
//!
//! ```json
//! [
//!   { "name": "demo.Subject", "kind": "interface",
//!     "methods": [{ "name": "doOperation", "params": ["String"], "returns": "void" }] },
//!   { "name": "demo.Sealed", "kind": "class", "modifiers": ["final"],
//!     "methods": [{ "name": "doOperation" }] }
//! ]
//! ```
//!
//! Described classes have no behavior of their own: their non-abstract
//! methods throw `UnsupportedOperationException`. They exist so proxies can
//! be generated and compiled against them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::vm::builder::{MethodBuilder, TypeBuilder};
use crate::vm::throwable::Throwable;
use crate::vm::types::{MethodBody, Modifiers, TypeDef, TypeRef};
use crate::vm::universe::{DefineError, TypeUniverse};
use crate::vm::value::Value;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("invalid type description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{owner}: invalid type '{text}'")]
    InvalidType { owner: String, text: String },

    #[error("{owner}: unknown modifier '{modifier}'")]
    InvalidModifier { owner: String, modifier: String },

    #[error(transparent)]
    Define(#[from] DefineError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecKind {
    Interface,
    Class,
}

/// Description of one interface or class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub name: String,
    pub kind: SpecKind,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constructors: Vec<ConstructorSpec>,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorSpec {
    #[serde(default)]
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default = "void_type")]
    pub returns: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

fn void_type() -> String {
    "void".to_string()
}

/// Parse a JSON list of type descriptions
pub fn parse_specs(json: &str) -> Result<Vec<TypeSpec>, SpecError> {
    Ok(serde_json::from_str(json)?)
}

fn parse_modifiers(owner: &str, words: &[String]) -> Result<Modifiers, SpecError> {
    let mut modifiers = Modifiers::default();
    for word in words {
        if !modifiers.apply_keyword(word) {
            return Err(SpecError::InvalidModifier {
                owner: owner.to_string(),
                modifier: word.clone(),
            });
        }
    }
    if !modifiers.is_private && !modifiers.is_protected {
        modifiers.is_public = true;
    }
    Ok(modifiers)
}

fn parse_type(owner: &str, text: &str) -> Result<TypeRef, SpecError> {
    TypeRef::parse(text).ok_or_else(|| SpecError::InvalidType {
        owner: owner.to_string(),
        text: text.to_string(),
    })
}

fn parse_params(owner: &str, params: &[String]) -> Result<Vec<TypeRef>, SpecError> {
    params
        .iter()
        .map(|p| match parse_type(owner, p)? {
            TypeRef::Void => Err(SpecError::InvalidType {
                owner: owner.to_string(),
                text: p.clone(),
            }),
            ty => Ok(ty),
        })
        .collect()
}

impl TypeSpec {
    /// Convert into a type definition ready to be defined
    pub fn to_type_def(&self) -> Result<TypeDef, SpecError> {
        let owner = self.name.as_str();
        let mut builder = match self.kind {
            SpecKind::Interface => TypeBuilder::interface(owner),
            SpecKind::Class => TypeBuilder::class(owner),
        }
        .modifiers(parse_modifiers(owner, &self.modifiers)?);

        if let Some(superclass) = &self.superclass {
            builder = builder.extends(superclass.clone());
        }
        for iface in &self.interfaces {
            builder = builder.implements(iface.clone());
        }
        for field in &self.fields {
            let ty = parse_type(owner, &field.ty)?;
            builder = builder.field_with(field.name.clone(), ty, parse_modifiers(owner, &field.modifiers)?);
        }
        for ctor in &self.constructors {
            builder = builder.constructor(parse_params(owner, &ctor.params)?, |_, _| Ok(()));
        }

        for method in &self.methods {
            let modifiers = parse_modifiers(owner, &method.modifiers)?;
            let params = parse_params(owner, &method.params)?;
            let abstract_body = modifiers.is_abstract
                || (self.kind == SpecKind::Interface && !modifiers.is_static);
            let body = if abstract_body {
                MethodBody::Abstract
            } else {
                let message = format!("{}.{}", owner, crate::vm::types::overload_key(&method.name, &params));
                MethodBody::Native(Arc::new(move |_: &Value, _: &[Value]| {
                    Err(Throwable::builtin("UnsupportedOperationException", Some(message.clone())))
                }))
            };
            let mut mb = MethodBuilder::new(method.name.clone())
                .modifiers(modifiers)
                .returns(parse_type(owner, &method.returns)?)
                .body(body);
            for param in params {
                mb = mb.param(param);
            }
            builder = builder.method(mb);
        }
        Ok(builder.build())
    }
}

impl TypeUniverse {
    /// Define described types, in dependency order
    ///
    /// Types may appear in any order in the list; each one is defined once
    /// its supertypes exist. The first definition failure is returned.
    pub fn load_specs(&self, specs: &[TypeSpec]) -> Result<Vec<Arc<TypeDef>>, SpecError> {
        let mut pending: Vec<&TypeSpec> = specs.iter().collect();
        let mut defined = Vec::with_capacity(specs.len());

        while !pending.is_empty() {
            let ready = pending.iter().position(|spec| {
                spec.superclass
                    .iter()
                    .chain(spec.interfaces.iter())
                    .all(|s| s == crate::vm::builtins::OBJECT || self.contains(s))
            });
            // Without a ready type the first remaining one reports the missing supertype
            let spec = pending.remove(ready.unwrap_or(0));
            let def = self.define(spec.to_type_def()?)?;
            debug!(type_name = %def.name, "loaded type description");
            defined.push(def);
        }
        Ok(defined)
    }

    /// Parse and define a JSON type description list
    pub fn load_specs_json(&self, json: &str) -> Result<Vec<Arc<TypeDef>>, SpecError> {
        self.load_specs(&parse_specs(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        { "name": "demo.Sealed", "kind": "class", "modifiers": ["final"],
          "interfaces": ["demo.Subject"],
          "methods": [
            { "name": "doOperation" },
            { "name": "doOperation", "params": ["String"] },
            { "name": "helper", "modifiers": ["private"] }
          ] },
        { "name": "demo.Subject", "kind": "interface",
          "methods": [{ "name": "doOperation", "params": ["String"], "returns": "void" }] }
    ]"#;

    #[test]
    fn test_load_in_dependency_order() {
        let universe = TypeUniverse::new();
        let defined = universe.load_specs_json(SAMPLE).unwrap();
        let names: Vec<&str> = defined.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["demo.Subject", "demo.Sealed"]);

        let sealed = universe.get("demo.Sealed").unwrap();
        assert!(sealed.is_final());
        assert_eq!(sealed.methods.len(), 3);
        assert!(sealed.methods[2].modifiers.is_private);
        assert!(universe.find_method("demo.Subject", "doOperation", &[TypeRef::string()])
            .unwrap()
            .is_abstract());
    }

    #[test]
    fn test_described_class_methods_are_unsupported() {
        let universe = TypeUniverse::new();
        universe.load_specs_json(SAMPLE).unwrap();
        let obj = universe.instantiate("demo.Sealed", &[]).unwrap();
        let err = obj.call("doOperation", &[], &[]).unwrap_err();
        assert_eq!(err.class_name(), "UnsupportedOperationException");
        assert_eq!(err.message(), Some("demo.Sealed.doOperation()"));
    }

    #[test]
    fn test_missing_supertype() {
        let universe = TypeUniverse::new();
        let err = universe
            .load_specs_json(r#"[{ "name": "demo.A", "kind": "class", "superclass": "demo.Gone" }]"#)
            .unwrap_err();
        assert!(matches!(err, SpecError::Define(DefineError::MissingSupertype { .. })));
    }

    #[test]
    fn test_invalid_modifier_and_type() {
        let universe = TypeUniverse::new();
        let err = universe
            .load_specs_json(r#"[{ "name": "demo.A", "kind": "class", "modifiers": ["sealed"] }]"#)
            .unwrap_err();
        assert!(matches!(err, SpecError::InvalidModifier { .. }));

        let err = universe
            .load_specs_json(
                r#"[{ "name": "demo.B", "kind": "interface",
                      "methods": [{ "name": "m", "params": ["void"] }] }]"#,
            )
            .unwrap_err();
        assert!(matches!(err, SpecError::InvalidType { .. }));
    }

    #[test]
    fn test_bad_json() {
        let universe = TypeUniverse::new();
        assert!(matches!(universe.load_specs_json("{"), Err(SpecError::Json(_))));
    }
}
