//! Runtime proxy synthesis
//!
//! Creating a proxy runs one pipeline per request:
//!
//! 1. resolve the target and collect its method surface ([`resolver`])
//! 2. render the forwarding class as Veil source ([`synth`]), optionally
//!    dumping it ([`dump`])
//! 3. compile the source in memory ([`crate::compiler`])
//! 4. load the class unit through a single-use [`DynamicTypeLoader`]
//! 5. instantiate it with the handler, which runs its static initializer
//!
//! Every request synthesizes and compiles a fresh type named `$Proxy<N>`;
//! nothing is cached between requests.

pub mod base;
pub mod config;
pub mod dump;
pub mod error;
pub mod handler;
pub mod resolver;
pub mod synth;

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, debug_span, trace};

pub use base::{ClassProxy, ProxyBase};
pub use config::{ProxyConfig, DUMP_DIR_ENV};
pub use error::{ProxyError, ProxyResult, ProxyStage};
pub use handler::{handler, Delegate, HandlerRef, InvocationHandler};
pub use resolver::{MethodSurface, ProxyTarget, ResolvedTarget};
pub use synth::GeneratedUnit;

use crate::compiler::SourceCompiler;
use crate::vm::loader::DynamicTypeLoader;
use crate::vm::object::ObjectRef;
use crate::vm::universe::TypeUniverse;
use crate::vm::value::Value;

static NEXT_PROXY_ID: AtomicU64 = AtomicU64::new(0);

/// Allocate the suffix of the next generated type name
pub fn next_proxy_id() -> u64 {
    NEXT_PROXY_ID.fetch_add(1, Ordering::Relaxed)
}

/// Creates proxies in one type universe
#[derive(Debug, Clone)]
pub struct ProxyFactory {
    universe: TypeUniverse,
    config: ProxyConfig,
}

impl ProxyFactory {
    pub fn new(universe: &TypeUniverse) -> Self {
        Self {
            universe: universe.clone(),
            config: ProxyConfig::default(),
        }
    }

    /// Factory over the global universe, configured from the environment
    pub fn global() -> Self {
        Self::new(TypeUniverse::global()).with_config(ProxyConfig::from_env())
    }

    pub fn with_config(mut self, config: ProxyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn universe(&self) -> &TypeUniverse {
        &self.universe
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Create a proxy implementing every interface in `interfaces`
    pub fn new_proxy_instance<I, S>(&self, interfaces: I, handler: HandlerRef) -> ProxyResult<ObjectRef>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let target = ProxyTarget::interfaces(interfaces);
        self.create(&target, handler).map(|(_, object)| object)
    }

    /// Create a proxy standing in for `class`
    ///
    /// Final classes cannot be extended; their proxy derives from
    /// `veil.ProxyBase` and is returned as [`ClassProxy::Sealed`].
    pub fn new_class_proxy(&self, class: &str, handler: HandlerRef) -> ProxyResult<ClassProxy> {
        let target = ProxyTarget::class(class);
        let (resolved, object) = self.create(&target, handler)?;
        Ok(if resolved.is_sealed() {
            ClassProxy::Sealed(ProxyBase::new(object))
        } else {
            ClassProxy::Subclass(object)
        })
    }

    /// Resolve and render a target without compiling it
    pub fn render(&self, target: &ProxyTarget) -> ProxyResult<(MethodSurface, GeneratedUnit)> {
        let resolved = target.resolve(&self.universe)?;
        let surface = MethodSurface::collect(&self.universe, &resolved);
        let unit = synth::render(&resolved, &surface, next_proxy_id());
        Ok((surface, unit))
    }

    fn create(&self, target: &ProxyTarget, handler: HandlerRef) -> ProxyResult<(ResolvedTarget, ObjectRef)> {
        let id = next_proxy_id();
        let _span = debug_span!("proxy", id).entered();
        trace!(stage = %ProxyStage::Requested, ?target, "proxy requested");

        self.run(target, handler, id).inspect_err(|err| {
            debug!(stage = %err.stage(), error = %err, "proxy creation failed");
        })
    }

    fn run(&self, target: &ProxyTarget, handler: HandlerRef, id: u64) -> ProxyResult<(ResolvedTarget, ObjectRef)> {
        let resolved = target.resolve(&self.universe)?;
        let surface = MethodSurface::collect(&self.universe, &resolved);
        debug!(stage = %ProxyStage::SurfaceResolved, methods = surface.len());

        let unit = synth::render(&resolved, &surface, id);
        debug!(stage = %ProxyStage::SourceGenerated, type_name = %unit.type_name, bytes = unit.source.len());
        trace!(source = %unit.source, "generated source");
        if let Some(dir) = self.config.dump_dir() {
            dump::dump_source(dir, &unit);
        }

        let artifact = SourceCompiler::new(&self.universe)
            .compile(&unit.file_name, &unit.source)
            .map_err(|error| ProxyError::Compile {
                type_name: unit.type_name.clone(),
                error,
            })?;
        debug!(stage = %ProxyStage::Compiled, units = artifact.len());

        let loader = DynamicTypeLoader::define(&self.universe, artifact);
        let def = loader.load_type(&unit.type_name).map_err(|error| ProxyError::Load {
            type_name: unit.type_name.clone(),
            error,
        })?;
        debug!(stage = %ProxyStage::Loaded, type_name = %def.name);

        let object = self
            .universe
            .instantiate_type(&def, &[Value::Handler(handler)])
            .map_err(|throwable| ProxyError::Instantiation {
                type_name: unit.type_name.clone(),
                throwable,
            })?;
        debug!(stage = %ProxyStage::Instantiated, type_name = %def.name);
        Ok((resolved, object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::builder::{MethodBuilder, TypeBuilder};
    use crate::vm::types::MethodRef;

    #[test]
    fn test_ids_are_unique() {
        let first = next_proxy_id();
        let second = next_proxy_id();
        assert!(second > first);
    }

    #[test]
    fn test_malformed_request_reports_stage() {
        let universe = TypeUniverse::new();
        let factory = ProxyFactory::new(&universe);
        let err = factory
            .new_proxy_instance(Vec::<String>::new(), handler(|_: &ObjectRef, _: &MethodRef, _: &[Value]| Ok(Value::Null)))
            .unwrap_err();
        assert!(matches!(err, ProxyError::Malformed(_)));
        assert_eq!(err.stage(), ProxyStage::SurfaceResolved);
    }

    #[test]
    fn test_render_without_compiling() {
        let universe = TypeUniverse::new();
        TypeBuilder::interface("demo.Subject")
            .method(MethodBuilder::new("doOperation"))
            .define(&universe)
            .unwrap();
        let factory = ProxyFactory::new(&universe);
        let (surface, unit) = factory.render(&ProxyTarget::interfaces(["demo.Subject"])).unwrap();
        assert_eq!(surface.len(), 1);
        assert!(unit.type_name.starts_with("demo.$Proxy"));
        assert!(!universe.contains(&unit.type_name));
    }
}
