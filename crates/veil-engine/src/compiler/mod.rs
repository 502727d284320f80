//! Veil source compiler
//!
//! Compiles one source unit, entirely in memory, into class units keyed by
//! type name. Names resolve against a [`TypeUniverse`]; nothing the compiler
//! produces is defined there. Defining is the loader's job.

pub mod bytecode;
pub mod diagnostic;
pub mod error;
pub mod file_manager;

mod checker;
mod codegen;
mod env;
mod ir;

use std::io::Write;

use tracing::{debug, trace};

pub use diagnostic::{Diagnostic, DiagnosticCode};
pub use error::{CompileError, CompileResult};
pub use file_manager::{CompiledArtifact, MemoryFileManager};

use crate::parser;
use crate::vm::universe::TypeUniverse;

/// Main compiler entry point
pub struct SourceCompiler<'u> {
    universe: &'u TypeUniverse,
}

impl<'u> SourceCompiler<'u> {
    pub fn new(universe: &'u TypeUniverse) -> Self {
        Self { universe }
    }

    /// Compile one unit; `file_name` is used for diagnostics and the
    /// public-class file name rule
    pub fn compile(&self, file_name: &str, source: &str) -> CompileResult<CompiledArtifact> {
        let manager = MemoryFileManager::new();
        let result = self.compile_into(&manager, file_name, source);
        // The manager is emptied whichever way the call ends
        let artifact = manager.take_artifact();
        result.map(|()| artifact)
    }

    fn compile_into(&self, manager: &MemoryFileManager, file_name: &str, source: &str) -> CompileResult<()> {
        let unit = parser::parse_source(source).map_err(|errors| {
            let diagnostics = errors.into_iter().map(Diagnostic::from).collect();
            CompileError::diagnostics(file_name, source, diagnostics)
        })?;
        trace!(file = file_name, classes = unit.classes.len(), "parsed");

        let classes = checker::check_unit(self.universe, file_name, &unit)
            .map_err(|diagnostics| CompileError::diagnostics(file_name, source, diagnostics))?;

        for class in &classes {
            let unit = codegen::generate(class).map_err(|error| CompileError::Verification {
                file_name: file_name.to_string(),
                error,
            })?;
            let bytes = unit.encode();

            let mut writer = manager
                .open_output(&class.name)
                .ok_or_else(|| CompileError::DuplicateOutput {
                    file_name: file_name.to_string(),
                    type_name: class.name.clone(),
                })?;
            writer.write_all(&bytes).map_err(|error| CompileError::Output {
                file_name: file_name.to_string(),
                type_name: class.name.clone(),
                error,
            })?;
            debug!(type_name = %class.name, bytes = bytes.len(), "generated class unit");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::bytecode::ClassFile;

    #[test]
    fn test_compile_produces_unit_per_class() {
        let universe = TypeUniverse::new();
        let artifact = SourceCompiler::new(&universe)
            .compile(
                "Pair.veil",
                r#"
                package demo;
                public class Pair { private Helper helper = new Helper(); }
                class Helper {}
                "#,
            )
            .unwrap();
        assert_eq!(artifact.names(), vec!["demo.Helper".to_string(), "demo.Pair".to_string()]);

        let unit = ClassFile::decode(artifact.get("demo.Pair").unwrap()).unwrap();
        assert_eq!(unit.name, "demo.Pair");
        assert_eq!(unit.fields.len(), 1);
        assert_eq!(unit.constructors.len(), 1);
        assert!(!universe.contains("demo.Pair"));
    }

    #[test]
    fn test_syntax_errors_are_diagnostics() {
        let universe = TypeUniverse::new();
        let err = SourceCompiler::new(&universe)
            .compile("Broken.veil", "class Broken {")
            .unwrap_err();
        let diagnostics = err.diagnostic_list();
        assert!(!diagnostics.is_empty());
        assert_eq!(diagnostics[0].code, DiagnosticCode::Syntax);
        assert!(err.to_string().starts_with("Broken.veil: compilation failed"));
    }

    #[test]
    fn test_semantic_errors_render_source() {
        let universe = TypeUniverse::new();
        let err = SourceCompiler::new(&universe)
            .compile("Bad.veil", "class Bad extends Missing {}")
            .unwrap_err();
        assert_eq!(err.diagnostic_list()[0].code, DiagnosticCode::UnknownSymbol);
        let text = err.to_string();
        assert!(text.contains("cannot find type 'Missing'"));
        assert!(text.contains("Bad.veil"));
    }
}
