use std::io;

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::infra::MiniJavaError;

/// Renders one failing unit to stderr.
///
/// Errors that point into the source get an annotated snippet, everything else
/// (I/O, internal code generation failures) a single line.
pub fn eprint(path: &str, src: &str, err: &MiniJavaError) -> io::Result<()> {
    let diagnostics = err.diagnostics();

    let Some(primary) = diagnostics.first() else {
        eprintln!("{path}: {err}");
        return Ok(());
    };

    Report::build(ReportKind::Error, (path, primary.span.clone()))
        .with_message(err.to_string())
        .with_labels(diagnostics.iter().map(|diagnostic| {
            Label::new((path, diagnostic.span.clone()))
                .with_message(&diagnostic.message)
                .with_color(Color::Red)
        }))
        .finish()
        .eprint((path, Source::from(src)))
}
