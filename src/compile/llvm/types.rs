use std::fmt::Display;

use crate::compile::ast::Type;

/// Types as they appear in the emitted IR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlvmType {
    I1,
    I8,
    I32,
    I64,
    Ptr(Box<LlvmType>),
    /// Object reference, rendered as `i8*` but still knowing its static class.
    Object(String),
}

impl LlvmType {
    pub fn ptr(self) -> Self {
        Self::Ptr(Box::new(self))
    }

    pub fn pointee(&self) -> Option<&LlvmType> {
        match self {
            Self::Ptr(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn class(&self) -> Option<&str> {
        match self {
            Self::Object(class) => Some(class),
            _ => None,
        }
    }
}

impl From<&Type> for LlvmType {
    fn from(value: &Type) -> Self {
        match value {
            Type::Int => Self::I32,
            Type::Boolean => Self::I8,
            Type::IntArray => Self::I32.ptr(),
            Type::BoolArray => Self::I8.ptr(),
            Type::Class(name) => Self::Object(name.clone()),
        }
    }
}

impl Display for LlvmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::I1 => write!(f, "i1"),
            Self::I8 => write!(f, "i8"),
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
            Self::Ptr(inner) => write!(f, "{inner}*"),
            Self::Object(_) => write!(f, "i8*"),
        }
    }
}
