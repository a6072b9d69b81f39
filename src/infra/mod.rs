use std::process::Termination;

use thiserror::Error;

use crate::compile::{ast::SourcePos, llvm::CodegenError, semantic::SemanticError};

pub mod report;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(u8);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAIL_IO: ExitCode = ExitCode(1);
    pub const FAIL_PARSING: ExitCode = ExitCode(42);
    pub const FAIL_SEMANTIC: ExitCode = ExitCode(7);
    pub const FAIL_INTERNAL: ExitCode = ExitCode(255);

    pub fn is_success(&self) -> bool {
        self.0 == 0
    }
}

impl Termination for ExitCode {
    fn report(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self.0)
    }
}

impl From<&MiniJavaError> for ExitCode {
    fn from(value: &MiniJavaError) -> Self {
        match value {
            MiniJavaError::LexerError(_) => ExitCode::FAIL_PARSING,
            MiniJavaError::ParsingError(_) => ExitCode::FAIL_PARSING,
            MiniJavaError::SemanticError(_) => ExitCode::FAIL_SEMANTIC,
            MiniJavaError::IOError(_) => ExitCode::FAIL_IO,
            _ => ExitCode::FAIL_INTERNAL,
        }
    }
}

/// An owned message pointing into the source of the unit being compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: SourcePos,
}

impl Diagnostic {
    pub fn new(message: String, span: SourcePos) -> Self {
        Self { message, span }
    }
}

#[derive(Error, Debug)]
pub enum MiniJavaError {
    #[error("Lexical Analysis failed.")]
    LexerError(Vec<Diagnostic>),

    #[error("Syntactic Analysis failed.")]
    ParsingError(Vec<Diagnostic>),

    #[error("Semantic Error, {0}")]
    SemanticError(#[from] SemanticError),

    #[error("Internal code generation error: {0}")]
    CodegenError(#[from] CodegenError),

    #[error("There was an I/O error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("There was an Formatting error: {0}")]
    FmtError(#[from] std::fmt::Error),
}

impl MiniJavaError {
    /// Source locations worth labelling when the error is shown to the user.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::LexerError(diagnostics) | Self::ParsingError(diagnostics) => diagnostics.clone(),
            Self::SemanticError(err) => vec![Diagnostic::new(err.to_string(), err.span())],
            _ => Vec::new(),
        }
    }
}
