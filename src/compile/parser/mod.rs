use chumsky::{Parser, input::Input};

use crate::compile::ast::{Program, SourcePos};
use crate::compile::parser::{lex::lexer, parse::program_parser};
use crate::infra::{Diagnostic, MiniJavaError};

pub mod lex;
pub mod parse;

pub type Spanned<T> = (T, SourcePos);

/// Lexes and parses a whole compilation unit.
pub fn parse_source(src: &str) -> Result<Program, MiniJavaError> {
    let tokens = lexer().parse(src).into_result().map_err(|errs| {
        MiniJavaError::LexerError(
            errs.into_iter()
                .map(|err| Diagnostic::new(err.to_string(), (*err.span()).into()))
                .collect(),
        )
    })?;

    let token_stream = tokens
        .as_slice()
        .map(src.len()..src.len(), |(t, s)| (t, s));

    program_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| {
            MiniJavaError::ParsingError(
                errs.into_iter()
                    .map(|err| Diagnostic::new(err.reason().to_string(), err.span().clone()))
                    .collect(),
            )
        })
}
