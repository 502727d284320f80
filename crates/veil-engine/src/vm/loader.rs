//! Dynamic type loader
//!
//! A [`DynamicTypeLoader`] owns the class units of one compiled artifact.
//! Requesting a name it holds decodes, verifies, links and defines that unit
//! in the universe; the unit is consumed, so the next request for the same
//! name is answered by the universe. Every other name is delegated to the
//! universe.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::compiler::bytecode::{verify_class, ClassFile, ClassFileError, CodeDef, ConstantPool, VerifyError};
use crate::compiler::CompiledArtifact;
use crate::vm::builtins;
use crate::vm::types::{
    CodeBody, ConstructorBody, ConstructorInfo, ExceptionHandler, FieldInfo, MethodBody, MethodInfo,
    Modifiers, TypeDef, TypeKind, TypeOrigin, TypeRef,
};
use crate::vm::universe::{DefineError, TypeUniverse};

/// Errors raised while loading a type
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("malformed class unit for {type_name}: {error}")]
    Format {
        type_name: String,
        #[source]
        error: ClassFileError,
    },

    #[error("verification failed: {0}")]
    Verify(#[from] VerifyError),

    #[error("class unit registered as {expected} declares {found}")]
    NameMismatch { expected: String, found: String },

    #[error("linkage error: {0}")]
    Define(#[from] DefineError),

    #[error("{type_name}: invalid type '{text}'")]
    InvalidType { type_name: String, text: String },
}

/// Single-use loader over one compiled artifact
pub struct DynamicTypeLoader {
    universe: TypeUniverse,
    units: Mutex<FxHashMap<String, Vec<u8>>>,
}

impl DynamicTypeLoader {
    /// Take ownership of an artifact's class units
    pub fn define(universe: &TypeUniverse, artifact: CompiledArtifact) -> Self {
        Self {
            universe: universe.clone(),
            units: Mutex::new(artifact.into_units()),
        }
    }

    /// Names of units not yet loaded, sorted
    pub fn pending(&self) -> Vec<String> {
        let mut names: Vec<String> = self.units.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Load a type by fully qualified name
    pub fn load_type(&self, name: &str) -> Result<Arc<TypeDef>, LoadError> {
        let unit = self.units.lock().remove(name);
        match unit {
            Some(bytes) => self.define_unit(name, &bytes),
            None => self
                .universe
                .get(name)
                .ok_or_else(|| LoadError::ClassNotFound(name.to_string())),
        }
    }

    fn define_unit(&self, name: &str, bytes: &[u8]) -> Result<Arc<TypeDef>, LoadError> {
        let class = ClassFile::decode(bytes).map_err(|error| LoadError::Format {
            type_name: name.to_string(),
            error,
        })?;
        if class.name != name {
            return Err(LoadError::NameMismatch {
                expected: name.to_string(),
                found: class.name,
            });
        }
        verify_class(&class)?;

        // Supertypes first; siblings from the same artifact are defined on demand
        for supertype in class.superclass.iter().chain(class.interfaces.iter()) {
            if supertype != builtins::OBJECT {
                self.load_type(supertype)?;
            }
        }

        let digest: [u8; 32] = Sha256::digest(bytes).into();
        let def = link(class, digest)?;
        let def = self.universe.define(def)?;
        info!(
            type_name = %def.name,
            digest = %hex::encode(&digest[..8]),
            bytes = bytes.len(),
            "loaded class unit"
        );
        Ok(def)
    }
}

impl std::fmt::Debug for DynamicTypeLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicTypeLoader")
            .field("universe", &self.universe.id())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Build a runtime type from a decoded, verified class unit
fn link(class: ClassFile, digest: [u8; 32]) -> Result<TypeDef, LoadError> {
    let ClassFile {
        constants,
        name,
        access,
        superclass,
        interfaces,
        fields,
        constructors,
        methods,
        static_init,
        metadata,
        ..
    } = class;

    let kind = if access & crate::compiler::bytecode::access::INTERFACE != 0 {
        TypeKind::Interface
    } else {
        TypeKind::Class
    };
    let pool = Arc::new(constants);
    let mut def = TypeDef::new(name.clone(), kind);
    def.modifiers = Modifiers::from_bits(access);
    def.superclass = superclass;
    def.interfaces = interfaces;
    def.origin = TypeOrigin::Loaded {
        digest,
        source_file: metadata.source_file,
    };

    for field in fields {
        def.fields.push(FieldInfo {
            ty: parse_type(&name, &field.type_name)?,
            name: field.name,
            modifiers: Modifiers::from_bits(field.access),
            declaring_type: name.clone(),
        });
    }

    for ctor in constructors {
        let params = parse_params(&name, &ctor.params)?;
        let code = code_body(&name, &ctor, &pool, false)?;
        def.constructors.push(Arc::new(ConstructorInfo {
            params,
            declaring_type: name.clone(),
            modifiers: Modifiers::from_bits(ctor.access),
            body: ConstructorBody::Compiled(Arc::new(code)),
        }));
    }

    for method in methods {
        let modifiers = Modifiers::from_bits(method.access);
        let body = if method.is_abstract() {
            MethodBody::Abstract
        } else {
            MethodBody::Compiled(Arc::new(code_body(&name, &method, &pool, method.is_static())?))
        };
        def.methods.push(Arc::new(MethodInfo {
            params: parse_params(&name, &method.params)?,
            return_type: parse_type(&name, &method.return_type)?,
            name: method.name,
            declaring_type: name.clone(),
            modifiers,
            body,
        }));
    }

    if let Some(init) = static_init {
        def.static_init = Some(Arc::new(code_body(&name, &init, &pool, true)?));
    }

    debug!(type_name = %name, methods = def.methods.len(), "linked class unit");
    Ok(def)
}

fn code_body(owner: &str, def: &CodeDef, pool: &Arc<ConstantPool>, is_static: bool) -> Result<CodeBody, LoadError> {
    let handlers = def
        .handlers
        .iter()
        .map(|h| {
            let catch_types = h
                .catch_types
                .iter()
                .map(|&index| {
                    pool.get_string(index)
                        .map(str::to_string)
                        .ok_or_else(|| LoadError::InvalidType {
                            type_name: owner.to_string(),
                            text: format!("#{}", index),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ExceptionHandler {
                start: h.start as usize,
                end: h.end as usize,
                handler: h.handler as usize,
                catch_types,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    Ok(CodeBody {
        owner: owner.to_string(),
        name: def.name.clone(),
        is_static,
        param_count: def.params.len(),
        max_locals: def.max_locals,
        code: def.code.clone(),
        handlers,
        constants: pool.clone(),
    })
}

fn parse_type(owner: &str, text: &str) -> Result<TypeRef, LoadError> {
    TypeRef::parse(text).ok_or_else(|| LoadError::InvalidType {
        type_name: owner.to_string(),
        text: text.to_string(),
    })
}

fn parse_params(owner: &str, params: &[String]) -> Result<Vec<TypeRef>, LoadError> {
    params.iter().map(|p| parse_type(owner, p)).collect()
}
