#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use helix_ast::Span;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("parse error: {message}")]
#[diagnostic(code(helix::parse))]
#[allow(unused_assignments)]
pub struct ParseError {
    pub message: String,
    #[label]
    pub span: Span,
    #[help]
    pub help: Option<String>,
}

impl ParseError {
    pub(crate) fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span,
            help: None,
        }
    }

    pub(crate) fn expected(span: Span, expected: &str, found: &str) -> Self {
        Self::new(span, format!("expected {expected}, found {found}"))
    }

    /// Reported at the last token when the input stops mid-declaration.
    pub(crate) fn end_of_input(span: Span, expected: &str) -> Self {
        Self::new(span, format!("expected {expected}, found end of input"))
            .with_help("the file ends before this declaration is complete")
    }

    pub(crate) fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}
