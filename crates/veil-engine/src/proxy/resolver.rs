//! Method surface resolution
//!
//! Validates a proxy target against the universe and collects the methods a
//! generated proxy has to forward.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::proxy::error::{ProxyError, ProxyResult};
use crate::vm::types::{MethodRef, TypeDef};
use crate::vm::universe::TypeUniverse;

/// What a proxy stands in for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyTarget {
    /// Ordered interface list; the proxy implements all of them
    Interfaces(Vec<String>),
    /// A single class (or interface) type
    Class(String),
}

impl ProxyTarget {
    pub fn interfaces<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProxyTarget::Interfaces(names.into_iter().map(Into::into).collect())
    }

    pub fn class(name: impl Into<String>) -> Self {
        ProxyTarget::Class(name.into())
    }

    /// Look the target up and decide the proxy shape
    pub fn resolve(&self, universe: &TypeUniverse) -> ProxyResult<ResolvedTarget> {
        let lookup = |name: &str| {
            universe
                .get(name)
                .ok_or_else(|| ProxyError::UnknownType(name.to_string()))
        };
        match self {
            ProxyTarget::Interfaces(names) => {
                if names.is_empty() {
                    return Err(ProxyError::Malformed("no interfaces given".to_string()));
                }
                let mut types: Vec<Arc<TypeDef>> = Vec::with_capacity(names.len());
                for name in names {
                    let def = lookup(name)?;
                    if !def.is_interface() {
                        return Err(ProxyError::Malformed(format!("{} is not an interface", name)));
                    }
                    if types.iter().any(|t| t.name == def.name) {
                        return Err(ProxyError::Malformed(format!("repeated interface {}", name)));
                    }
                    types.push(def);
                }
                Ok(ResolvedTarget::Interfaces(types))
            }
            ProxyTarget::Class(name) => {
                let def = lookup(name)?;
                if def.is_interface() {
                    Ok(ResolvedTarget::Interfaces(vec![def]))
                } else if def.is_final() {
                    Ok(ResolvedTarget::Sealed(def))
                } else {
                    Ok(ResolvedTarget::Subclass(def))
                }
            }
        }
    }
}

/// A validated target and the shape of the proxy generated for it
#[derive(Debug, Clone)]
pub enum ResolvedTarget {
    /// `extends ProxyBase implements <interfaces>`
    Interfaces(Vec<Arc<TypeDef>>),
    /// `extends <class>`; the proxy is assignable to the class
    Subclass(Arc<TypeDef>),
    /// The class is final: `extends ProxyBase`, reached through the dispatch façade
    Sealed(Arc<TypeDef>),
}

impl ResolvedTarget {
    /// The target types, in request order
    pub fn types(&self) -> &[Arc<TypeDef>] {
        match self {
            ResolvedTarget::Interfaces(types) => types,
            ResolvedTarget::Subclass(def) | ResolvedTarget::Sealed(def) => std::slice::from_ref(def),
        }
    }

    /// Package of the first target type
    pub fn package(&self) -> Option<&str> {
        self.types().first().and_then(|def| def.package())
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self, ResolvedTarget::Sealed(_))
    }
}

/// Deduplicated methods a proxy forwards, keyed by overload key
///
/// The first method observed for a key is kept.
#[derive(Debug, Clone, Default)]
pub struct MethodSurface {
    methods: Vec<MethodRef>,
    index: FxHashMap<String, usize>,
}

impl MethodSurface {
    /// Collect the surface of a resolved target
    ///
    /// Interface targets contribute their own methods and those of every
    /// super-interface. Class targets contribute their declared methods;
    /// subclass proxies skip `final` methods and also pick up abstract
    /// methods the class inherits without implementing.
    pub fn collect(universe: &TypeUniverse, target: &ResolvedTarget) -> Self {
        let mut surface = MethodSurface::default();
        match target {
            ResolvedTarget::Interfaces(types) => {
                for def in types {
                    surface.add_declared(def, |_| true);
                    for parent in universe.all_interfaces(def) {
                        surface.add_declared(&parent, |_| true);
                    }
                }
            }
            ResolvedTarget::Sealed(def) => surface.add_declared(def, |_| true),
            ResolvedTarget::Subclass(def) => {
                surface.add_declared(def, |m| !m.modifiers.is_final);
                let inherited = universe
                    .superclasses(def)
                    .into_iter()
                    .chain(universe.all_interfaces(def));
                for parent in inherited {
                    surface.add_declared(&parent, |m| {
                        m.is_abstract()
                            && universe
                                .resolve_virtual(def, &m.name, &m.params)
                                .map_or(true, |found| found.is_abstract())
                    });
                }
            }
        }
        trace!(methods = surface.len(), "collected method surface");
        surface
    }

    fn add_declared(&mut self, def: &TypeDef, keep: impl Fn(&MethodRef) -> bool) {
        for method in &def.methods {
            if method.modifiers.is_static || method.modifiers.is_private || !keep(method) {
                continue;
            }
            self.insert(method.clone());
        }
    }

    /// Add a method unless its overload key is already present
    pub fn insert(&mut self, method: MethodRef) -> bool {
        let key = method.overload_key();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.methods.len());
        self.methods.push(method);
        true
    }

    pub fn get(&self, key: &str) -> Option<&MethodRef> {
        self.index.get(key).map(|&i| &self.methods[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Methods in the order they were first observed
    pub fn iter(&self) -> impl Iterator<Item = &MethodRef> {
        self.methods.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.methods.iter().map(|m| m.overload_key())
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::builder::{MethodBuilder, TypeBuilder};
    use crate::vm::value::Value;

    fn universe() -> TypeUniverse {
        let universe = TypeUniverse::new();
        TypeBuilder::interface("demo.Base")
            .method(MethodBuilder::new("describe").returns("String"))
            .method(MethodBuilder::new("helper").as_static())
            .define(&universe)
            .unwrap();
        TypeBuilder::interface("demo.Subject")
            .implements("demo.Base")
            .method(MethodBuilder::new("doOperation"))
            .method(MethodBuilder::new("doOperation").param("String"))
            .define(&universe)
            .unwrap();
        TypeBuilder::interface("demo.Other")
            .method(MethodBuilder::new("doOperation"))
            .method(MethodBuilder::new("close"))
            .define(&universe)
            .unwrap();
        TypeBuilder::class("demo.Sealed")
            .as_final()
            .method(MethodBuilder::new("run").native(|_, _| Ok(Value::Null)))
            .method(MethodBuilder::new("secret").as_private().native(|_, _| Ok(Value::Null)))
            .define(&universe)
            .unwrap();
        TypeBuilder::class("demo.Open")
            .implements("demo.Other")
            .as_abstract()
            .method(MethodBuilder::new("run").native(|_, _| Ok(Value::Null)))
            .method(MethodBuilder::new("fixed").as_final().native(|_, _| Ok(Value::Null)))
            .method(MethodBuilder::new("close").native(|_, _| Ok(Value::Null)))
            .define(&universe)
            .unwrap();
        universe
    }

    fn keys(surface: &MethodSurface) -> Vec<String> {
        surface.keys().collect()
    }

    #[test]
    fn test_malformed_targets() {
        let universe = universe();
        let err = ProxyTarget::Interfaces(Vec::new()).resolve(&universe).unwrap_err();
        assert!(matches!(err, ProxyError::Malformed(_)));

        let err = ProxyTarget::interfaces(["demo.Sealed"]).resolve(&universe).unwrap_err();
        assert!(matches!(err, ProxyError::Malformed(_)));

        let err = ProxyTarget::interfaces(["demo.Missing"]).resolve(&universe).unwrap_err();
        assert!(matches!(err, ProxyError::UnknownType(name) if name == "demo.Missing"));
    }

    #[test]
    fn test_class_target_shapes() {
        let universe = universe();
        assert!(ProxyTarget::class("demo.Sealed").resolve(&universe).unwrap().is_sealed());
        assert!(matches!(
            ProxyTarget::class("demo.Open").resolve(&universe).unwrap(),
            ResolvedTarget::Subclass(_)
        ));
        let single = ProxyTarget::class("demo.Subject").resolve(&universe).unwrap();
        assert!(matches!(&single, ResolvedTarget::Interfaces(types) if types.len() == 1));
        assert_eq!(single.package(), Some("demo"));
    }

    #[test]
    fn test_interface_surface_is_transitive_and_deduplicated() {
        let universe = universe();
        let target = ProxyTarget::interfaces(["demo.Subject", "demo.Other"])
            .resolve(&universe)
            .unwrap();
        let surface = MethodSurface::collect(&universe, &target);
        assert_eq!(
            keys(&surface),
            vec!["doOperation()", "doOperation(String)", "describe()", "close()"]
        );
        assert_eq!(surface.get("doOperation()").unwrap().declaring_type, "demo.Subject");
        assert!(!surface.contains("helper()"));
    }

    #[test]
    fn test_class_surfaces() {
        let universe = universe();
        let sealed = ProxyTarget::class("demo.Sealed").resolve(&universe).unwrap();
        assert_eq!(keys(&MethodSurface::collect(&universe, &sealed)), vec!["run()"]);

        let open = ProxyTarget::class("demo.Open").resolve(&universe).unwrap();
        let surface = MethodSurface::collect(&universe, &open);
        // `fixed()` cannot be overridden; `doOperation()` is inherited abstract
        assert_eq!(keys(&surface), vec!["run()", "close()", "doOperation()"]);
    }
}
