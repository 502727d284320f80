//! Proxy creation errors

use std::fmt;

use thiserror::Error;

use crate::compiler::CompileError;
use crate::vm::loader::LoadError;
use crate::vm::throwable::Throwable;

/// Pipeline stages of one proxy creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyStage {
    Requested,
    SurfaceResolved,
    SourceGenerated,
    Compiled,
    Loaded,
    Instantiated,
}

impl ProxyStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyStage::Requested => "requested",
            ProxyStage::SurfaceResolved => "surface-resolved",
            ProxyStage::SourceGenerated => "source-generated",
            ProxyStage::Compiled => "compiled",
            ProxyStage::Loaded => "loaded",
            ProxyStage::Instantiated => "instantiated",
        }
    }
}

impl fmt::Display for ProxyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed proxy creation request
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Empty target list, or a non-interface in an interface list
    #[error("malformed proxy request: {0}")]
    Malformed(String),

    #[error("unknown target type '{0}'")]
    UnknownType(String),

    #[error("proxy {type_name} failed to compile: {error}")]
    Compile {
        type_name: String,
        #[source]
        error: CompileError,
    },

    #[error("proxy {type_name} failed to load: {error}")]
    Load {
        type_name: String,
        #[source]
        error: LoadError,
    },

    /// Static initialization or the generated constructor threw
    #[error("proxy {type_name} failed to instantiate: {throwable}")]
    Instantiation { type_name: String, throwable: Throwable },
}

impl ProxyError {
    /// The stage the request was trying to reach when it failed
    pub fn stage(&self) -> ProxyStage {
        match self {
            ProxyError::Malformed(_) | ProxyError::UnknownType(_) => ProxyStage::SurfaceResolved,
            ProxyError::Compile { .. } => ProxyStage::Compiled,
            ProxyError::Load { .. } => ProxyStage::Loaded,
            ProxyError::Instantiation { .. } => ProxyStage::Instantiated,
        }
    }

    /// The throwable behind an instantiation failure
    pub fn throwable(&self) -> Option<&Throwable> {
        match self {
            ProxyError::Instantiation { throwable, .. } => Some(throwable),
            _ => None,
        }
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
