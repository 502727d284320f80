//! Subcommand implementations

pub mod compile;
pub mod render;
pub mod surface;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Args;
use veil_engine::proxy::ProxyTarget;
use veil_engine::TypeUniverse;

/// Type description file plus the proxy target
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// JSON type description file
    #[arg(short, long)]
    pub types: PathBuf,

    /// Proxy a single class instead of a list of interfaces
    #[arg(long)]
    pub class: bool,

    /// Fully qualified target type names
    #[arg(required = true)]
    pub targets: Vec<String>,
}

impl TargetArgs {
    /// Build a fresh universe from the type file and the requested target
    pub fn load(&self) -> anyhow::Result<(TypeUniverse, ProxyTarget)> {
        let universe = load_types(&self.types)?;
        let target = if self.class {
            match self.targets.as_slice() {
                [class] => ProxyTarget::class(class.as_str()),
                _ => bail!("--class takes exactly one target, got {}", self.targets.len()),
            }
        } else {
            ProxyTarget::interfaces(self.targets.iter().cloned())
        };
        Ok((universe, target))
    }
}

pub fn load_types(path: &Path) -> anyhow::Result<TypeUniverse> {
    let json = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let universe = TypeUniverse::new();
    universe
        .load_specs_json(&json)
        .with_context(|| format!("invalid type file {}", path.display()))?;
    Ok(universe)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::PathBuf;

    pub const TYPES: &str = r#"[
        { "name": "demo.Subject", "kind": "interface",
          "methods": [
            { "name": "doOperation" },
            { "name": "doOperation", "params": ["String"] },
            { "name": "count", "returns": "int" }
          ] },
        { "name": "demo.Sealed", "kind": "class", "modifiers": ["final"],
          "methods": [{ "name": "run" }] }
    ]"#;

    pub fn types_file(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("types.json");
        std::fs::write(&path, TYPES).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(types: PathBuf, class: bool, targets: &[&str]) -> TargetArgs {
        TargetArgs {
            types,
            class,
            targets: targets.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_load_targets() {
        let dir = tempfile::tempdir().unwrap();
        let types = fixtures::types_file(&dir);

        let (universe, target) = args(types.clone(), false, &["demo.Subject"]).load().unwrap();
        assert!(universe.contains("demo.Subject"));
        assert_eq!(target, ProxyTarget::interfaces(["demo.Subject"]));

        let (_, target) = args(types.clone(), true, &["demo.Sealed"]).load().unwrap();
        assert_eq!(target, ProxyTarget::class("demo.Sealed"));

        assert!(args(types, true, &["demo.Sealed", "demo.Subject"]).load().is_err());
    }

    #[test]
    fn test_missing_type_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_types(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
