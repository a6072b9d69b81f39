use thiserror::Error;

use crate::compile::ast::{BinaryOp, Program, ProgramPass, SourcePos, Type};

pub mod declarations;
pub mod symbols;
pub mod typecheck;

use symbols::SymbolModel;
use typecheck::TypeChecker;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("class {name} is declared more than once")]
    DuplicateClass { name: String, span: SourcePos },

    #[error("class {parent} extended by {name} is not declared before it")]
    UnknownParent {
        name: String,
        parent: String,
        span: SourcePos,
    },

    #[error("unknown type {name}")]
    UnknownType { name: String, span: SourcePos },

    #[error("field {name} is already declared in class {class}")]
    DuplicateField {
        class: String,
        name: String,
        span: SourcePos,
    },

    #[error("method {name} is already declared in class {class}")]
    DuplicateMethod {
        class: String,
        name: String,
        span: SourcePos,
    },

    #[error("variable {name} is already declared")]
    DuplicateVariable { name: String, span: SourcePos },

    #[error("{name} undeclared")]
    Undeclared { name: String, span: SourcePos },

    #[error("wrong assignment to {name}: expected `{expected}`, but got `{got}`")]
    WrongAssignment {
        name: String,
        expected: Type,
        got: Type,
        span: SourcePos,
    },

    #[error("wrong allocation: cannot store `{got}` in {name} of type `{expected}`")]
    WrongAllocation {
        name: String,
        expected: Type,
        got: Type,
        span: SourcePos,
    },

    #[error("wrong multiplication: expected `int * int`, but got `{lhs} * {rhs}`")]
    WrongMultiplication {
        lhs: Type,
        rhs: Type,
        span: SourcePos,
    },

    #[error("operator `{op}` expects `{expected}` operands, but got `{got}`")]
    WrongOperand {
        op: BinaryOp,
        expected: Type,
        got: Type,
        span: SourcePos,
    },

    #[error("Expression has unexpected type. Expected was `{expected}`, but got `{got}`")]
    MismatchedTypes {
        expected: Type,
        got: Type,
        span: SourcePos,
    },

    #[error("wrong type `{got}`, expected an array")]
    NotAnArray { got: Type, span: SourcePos },

    #[error("wrong return type in {method}: expected `{expected}`, but got `{got}`")]
    WrongReturnType {
        method: String,
        expected: Type,
        got: Type,
        span: SourcePos,
    },

    #[error("cannot call {method} on a value of type `{got}`")]
    NotAnObject {
        method: String,
        got: Type,
        span: SourcePos,
    },

    #[error("class {class} has no method {method}")]
    UnknownMethod {
        class: String,
        method: String,
        span: SourcePos,
    },

    #[error("{method} takes {expected} arguments, but {got} were supplied")]
    WrongArgumentCount {
        method: String,
        expected: usize,
        got: usize,
        span: SourcePos,
    },

    #[error("`this` cannot be used in the static main method")]
    ThisInMain { span: SourcePos },

    #[error("integer literal {literal} out of bounds")]
    IntLiteralOutOfBounds { literal: String, span: SourcePos },
}

impl SemanticError {
    pub fn span(&self) -> SourcePos {
        match self {
            Self::DuplicateClass { span, .. }
            | Self::UnknownParent { span, .. }
            | Self::UnknownType { span, .. }
            | Self::DuplicateField { span, .. }
            | Self::DuplicateMethod { span, .. }
            | Self::DuplicateVariable { span, .. }
            | Self::Undeclared { span, .. }
            | Self::WrongAssignment { span, .. }
            | Self::WrongAllocation { span, .. }
            | Self::WrongMultiplication { span, .. }
            | Self::WrongOperand { span, .. }
            | Self::MismatchedTypes { span, .. }
            | Self::NotAnArray { span, .. }
            | Self::WrongReturnType { span, .. }
            | Self::NotAnObject { span, .. }
            | Self::UnknownMethod { span, .. }
            | Self::WrongArgumentCount { span, .. }
            | Self::ThisInMain { span }
            | Self::IntLiteralOutOfBounds { span, .. } => span.clone(),
        }
    }
}

/// Builds the Symbol Model for `program` and type checks every body against it.
///
/// The first violated rule aborts the analysis.
pub fn analyze(program: &Program) -> Result<SymbolModel, SemanticError> {
    let model = declarations::declare(program)?;
    TypeChecker::new(&model).run(program)?;

    Ok(model)
}
