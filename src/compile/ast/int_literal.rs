use std::num::IntErrorKind;

use crate::compile::ast::SourcePos;
use crate::compile::semantic::SemanticError;

#[derive(Debug, Clone)]
pub struct IntLiteral {
    value: String,
    base: u32,
}

impl IntLiteral {
    pub fn new(value: String, base: u32) -> IntLiteral {
        IntLiteral { value, base }
    }

    pub fn text(&self) -> &str {
        &self.value
    }

    pub fn parse(&self, span: &SourcePos) -> Result<i32, SemanticError> {
        i32::from_str_radix(&self.value, self.base).map_err(|err| match err.kind() {
            IntErrorKind::PosOverflow => SemanticError::IntLiteralOutOfBounds {
                literal: self.value.clone(),
                span: span.clone(),
            },
            _ => unreachable!("Parser returned invalid number: {}", self.value),
        })
    }
}
