//! Compiler diagnostics
//!
//! Every problem found while compiling a unit becomes a [`Diagnostic`]
//! carrying a code, a message and the span it points at. Reports are
//! rendered with codespan against the original source text.

use std::fmt;

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::{self, Config};
use termcolor::{NoColor, WriteColor};

use crate::parser::{Span, SyntaxError};

/// Diagnostic category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// Lexer or parser error
    Syntax,
    /// A type, variable, field, method or import that cannot be found
    UnknownSymbol,
    /// Two declarations with the same name or signature
    Duplicate,
    /// A modifier that is not allowed or conflicts with another
    InvalidModifier,
    /// Illegal superclass or interface
    Inheritance,
    /// Illegal override of an inherited method
    Override,
    /// Concrete class missing an implementation of an abstract method
    MissingImplementation,
    /// Public class declared in a file with another name
    FileName,
    TypeMismatch,
    /// No applicable or more than one applicable method or constructor
    Resolution,
    /// Unreachable code, missing return and misplaced statements
    ControlFlow,
    /// Access to a private, protected or instance member from the wrong place
    Access,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::Syntax => "E0001",
            DiagnosticCode::UnknownSymbol => "E0100",
            DiagnosticCode::Duplicate => "E0101",
            DiagnosticCode::InvalidModifier => "E0102",
            DiagnosticCode::Inheritance => "E0200",
            DiagnosticCode::Override => "E0201",
            DiagnosticCode::MissingImplementation => "E0202",
            DiagnosticCode::FileName => "E0203",
            DiagnosticCode::TypeMismatch => "E0300",
            DiagnosticCode::Resolution => "E0301",
            DiagnosticCode::ControlFlow => "E0302",
            DiagnosticCode::Access => "E0303",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compile error located in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    pub span: Span,
    /// Text attached to the primary label
    pub label: Option<String>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            label: None,
            notes: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn line(&self) -> u32 {
        self.span.line
    }

    pub fn column(&self) -> u32 {
        self.span.column
    }

    fn to_codespan(&self) -> CsDiagnostic<()> {
        let mut label = Label::primary((), self.span.start..self.span.end);
        if let Some(text) = &self.label {
            label = label.with_message(text.clone());
        }
        CsDiagnostic::error()
            .with_code(self.code.as_str())
            .with_message(self.message.clone())
            .with_labels(vec![label])
            .with_notes(self.notes.clone())
    }
}

impl From<SyntaxError> for Diagnostic {
    fn from(error: SyntaxError) -> Self {
        Diagnostic::error(DiagnosticCode::Syntax, error.message(), error.span())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: error[{}]: {}",
            self.span.line, self.span.column, self.code, self.message
        )
    }
}

/// Render diagnostics against their source file
pub fn emit(
    writer: &mut dyn WriteColor,
    file_name: &str,
    source: &str,
    diagnostics: &[Diagnostic],
) -> Result<(), codespan_reporting::files::Error> {
    let file = SimpleFile::new(file_name, source);
    let config = Config::default();
    for diagnostic in diagnostics {
        term::emit(writer, &config, &file, &diagnostic.to_codespan())?;
    }
    Ok(())
}

/// Render diagnostics as plain text
pub fn render(file_name: &str, source: &str, diagnostics: &[Diagnostic]) -> String {
    let mut writer = NoColor::new(Vec::new());
    if emit(&mut writer, file_name, source, diagnostics).is_err() {
        // Spans outside the source: fall back to the one-line form
        return diagnostics
            .iter()
            .map(|d| format!("{}:{}\n", file_name, d))
            .collect();
    }
    String::from_utf8_lossy(&writer.into_inner()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_points_at_source() {
        let source = "class A extends Missing {}\n";
        let diag = Diagnostic::error(
            DiagnosticCode::UnknownSymbol,
            "cannot find type 'Missing'",
            Span::new(16, 23, 1, 17),
        )
        .with_label("not found");
        let text = render("A.veil", source, &[diag.clone()]);
        assert!(text.contains("error[E0100]: cannot find type 'Missing'"));
        assert!(text.contains("A.veil:1:17"));
        assert!(text.contains("not found"));
        assert_eq!(diag.to_string(), "1:17: error[E0100]: cannot find type 'Missing'");
    }
}
