//! Compilation errors

use thiserror::Error;
use termcolor::WriteColor;

use crate::compiler::bytecode::VerifyError;
use crate::compiler::diagnostic::{self, Diagnostic};

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    /// The unit has syntax or semantic errors
    #[error("{file_name}: compilation failed with {} error(s)\n{rendered}", .diagnostics.len())]
    Diagnostics {
        file_name: String,
        source_text: String,
        diagnostics: Vec<Diagnostic>,
        /// Plain text report
        rendered: String,
    },

    /// Generated code was rejected by the verifier
    #[error("{file_name}: bytecode verification failed: {error}")]
    Verification {
        file_name: String,
        #[source]
        error: VerifyError,
    },

    /// Two outputs claimed the same type name
    #[error("{file_name}: duplicate output for {type_name}")]
    DuplicateOutput { file_name: String, type_name: String },

    #[error("{file_name}: failed to write output for {type_name}: {error}")]
    Output {
        file_name: String,
        type_name: String,
        #[source]
        error: std::io::Error,
    },
}

impl CompileError {
    pub(crate) fn diagnostics(file_name: &str, source_text: &str, diagnostics: Vec<Diagnostic>) -> Self {
        let rendered = diagnostic::render(file_name, source_text, &diagnostics);
        CompileError::Diagnostics {
            file_name: file_name.to_string(),
            source_text: source_text.to_string(),
            diagnostics,
            rendered,
        }
    }

    /// Diagnostics carried by this error; empty for non-source failures
    pub fn diagnostic_list(&self) -> &[Diagnostic] {
        match self {
            CompileError::Diagnostics { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }

    /// Render the error, with source snippets when diagnostics are present
    pub fn emit(&self, writer: &mut dyn WriteColor) -> std::io::Result<()> {
        match self {
            CompileError::Diagnostics {
                file_name,
                source_text,
                diagnostics,
                ..
            } => diagnostic::emit(writer, file_name, source_text, diagnostics)
                .map_err(|err| std::io::Error::other(err.to_string())),
            other => writeln!(writer, "error: {}", other),
        }
    }
}
