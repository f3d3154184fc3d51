use crate::{language::errors::SyntaxError, runtime::error::RuntimeError};
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(host::syntax))]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource, err: SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message,
            label: err.label,
        }
    }
}

fn render(diagnostic: &dyn Diagnostic) -> String {
    let mut out = String::new();
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
    if handler.render_report(&mut out, diagnostic).is_err() {
        // Fall back to the bare message.
        out = diagnostic.to_string();
    }
    out
}

pub fn render_syntax_error(name: &str, source: &str, err: SyntaxError) -> String {
    let src = NamedSource::new(name, source.to_string());
    render(&SyntaxDiagnostic::from_error(src, err))
}

/// Renders `error` as a plain report. Syntax errors are shown against
/// `source` when it is given.
pub fn render_error(error: &RuntimeError, source: Option<(&str, &str)>) -> String {
    match (error, source) {
        (RuntimeError::Syntax(err), Some((name, text))) => {
            render_syntax_error(name, text, err.clone())
        }
        _ => render(error),
    }
}
