//! `veil compile`: compile a synthesized proxy or a Veil source file and
//! load the resulting class units

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use termcolor::{Color, WriteColor};
use tracing::debug;
use veil_engine::proxy::ProxyTarget;
use veil_engine::{CompileError, DynamicTypeLoader, ProxyFactory, SourceCompiler, TypeUniverse};

use crate::output::status;

/// What to compile
pub enum Input<'a> {
    /// Synthesize the proxy for a target first
    Proxy(ProxyTarget),
    /// A source file on disk
    Source(&'a Path),
}

pub fn execute(
    universe: &TypeUniverse,
    input: Input<'_>,
    out: &mut dyn WriteColor,
    err: &mut dyn WriteColor,
) -> anyhow::Result<()> {
    let (file_name, source) = match input {
        Input::Proxy(target) => {
            let (_, unit) = ProxyFactory::new(universe).render(&target)?;
            (unit.file_name, unit.source)
        }
        Input::Source(path) => {
            let source = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            (file_name, source)
        }
    };

    debug!(file = %file_name, bytes = source.len(), "compiling");
    let artifact = match SourceCompiler::new(universe).compile(&file_name, &source) {
        Ok(artifact) => artifact,
        Err(error) => {
            error.emit(err)?;
            match &error {
                CompileError::Diagnostics { diagnostics, .. } => {
                    bail!("could not compile {} ({} errors)", file_name, diagnostics.len())
                }
                _ => bail!("could not compile {}", file_name),
            }
        }
    };
    let sizes: Vec<(String, usize)> = artifact
        .names()
        .into_iter()
        .map(|name| {
            let size = artifact.get(&name).map_or(0, <[u8]>::len);
            (name, size)
        })
        .collect();

    let loader = DynamicTypeLoader::define(universe, artifact);
    for (name, size) in sizes {
        let def = loader.load_type(&name)?;
        let digest = def.digest().map(hex::encode).unwrap_or_default();
        status(out, "Loaded", Color::Green, &format!("{} ({} bytes, sha256 {})", def.name, size, digest))?;
    }
    Ok(())
}
