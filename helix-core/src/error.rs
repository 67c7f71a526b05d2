#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use std::fmt;

use helix_ast::Span;
use miette::{Diagnostic, LabeledSpan};
use thiserror::Error;

use crate::path::IdentifierPath;
use crate::types::Type;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    IdentifierAlreadyDefined,
    IdentifierNotFound,
    TypeMismatch,
    InvalidOperands,
    InvalidMemberAccess,
    NotWritable,
    NotAnLValue,
    InvalidArity,
    MissingReturn,
    NonConstantGlobal,
    MissingMemberValue,
    CircularValueObject,
    InvalidUnionMember,
    LifetimeExceeded,
}

impl ErrorKind {
    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::IdentifierAlreadyDefined => "Identifier Already Defined",
            ErrorKind::IdentifierNotFound => "Variable Undefined",
            ErrorKind::TypeMismatch => "Type Mismatch",
            ErrorKind::InvalidOperands => "Invalid Operands",
            ErrorKind::InvalidMemberAccess => "Invalid Member Access",
            ErrorKind::NotWritable => "Variable Not Writable",
            ErrorKind::NotAnLValue => "Invalid Address Target",
            ErrorKind::InvalidArity => "Parameter Count Mismatch",
            ErrorKind::MissingReturn => "Missing Return",
            ErrorKind::NonConstantGlobal => "Non-Constant Global",
            ErrorKind::MissingMemberValue => "Missing Member Value",
            ErrorKind::CircularValueObject => "Circular Value Object",
            ErrorKind::InvalidUnionMember => "Invalid Union Type",
            ErrorKind::LifetimeExceeded => "Lifetime Exceeded",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::IdentifierAlreadyDefined | ErrorKind::IdentifierNotFound => "helix::name",
            ErrorKind::CircularValueObject | ErrorKind::InvalidUnionMember => "helix::aggregate",
            ErrorKind::LifetimeExceeded => "helix::lifetime",
            _ => "helix::type",
        }
    }
}

/// A user-facing error raised by one of the checking passes.
#[derive(Debug, Error)]
#[error("{}: {message}", kind.title())]
pub struct SemanticError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
}

impl Diagnostic for SemanticError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.kind.title().to_string()),
            self.span,
        ))))
    }
}

impl SemanticError {
    pub fn new(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn identifier_defined(span: Span, name: &str) -> Self {
        Self::new(
            ErrorKind::IdentifierAlreadyDefined,
            span,
            format!("the identifier '{name}' is already defined"),
        )
    }

    pub fn identifier_not_found(span: Span, name: &str) -> Self {
        Self::new(
            ErrorKind::IdentifierNotFound,
            span,
            format!("the identifier '{name}' is not defined in the current scope"),
        )
    }

    pub fn type_mismatch(span: Span, expected: &Type, actual: &Type) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            span,
            format!("expected type '{expected}', found '{actual}'"),
        )
    }

    pub fn invalid_operands(span: Span, op: &str, left: &Type, right: &Type) -> Self {
        Self::new(
            ErrorKind::InvalidOperands,
            span,
            format!("operator '{op}' cannot be applied to '{left}' and '{right}'"),
        )
    }

    pub fn member_undefined(span: Span, ty: &Type, member: &str) -> Self {
        Self::new(
            ErrorKind::InvalidMemberAccess,
            span,
            format!("the type '{ty}' has no member named '{member}'"),
        )
    }

    pub fn not_writable(span: Span, what: &str) -> Self {
        Self::new(
            ErrorKind::NotWritable,
            span,
            format!("{what} is not writable"),
        )
    }

    pub fn not_lvalue(span: Span) -> Self {
        Self::new(
            ErrorKind::NotAnLValue,
            span,
            "this expression does not denote a storage location",
        )
    }

    pub fn invalid_arity(span: Span, name: &str, expected: usize, actual: usize) -> Self {
        Self::new(
            ErrorKind::InvalidArity,
            span,
            format!("the function '{name}' expects {expected} argument(s), but {actual} were given"),
        )
    }

    pub fn circular_value_object(span: Span, ty: &Type) -> Self {
        Self::new(
            ErrorKind::CircularValueObject,
            span,
            format!("the value type '{ty}' cannot contain itself by value"),
        )
    }

    pub fn lifetime_exceeded(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LifetimeExceeded, span, message)
    }
}

/// A pass-ordering invariant was violated; always a compiler bug.
#[derive(Debug, Error, Diagnostic)]
#[error("internal compiler error: {message}")]
#[diagnostic(
    code(helix::internal),
    help("this is a bug in the compiler, not in the program being compiled")
)]
pub struct InternalError {
    pub message: String,
}

impl InternalError {
    pub fn missing_path(path: &IdentifierPath) -> Self {
        Self {
            message: format!("the path '{path}' does not contain a value"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum CheckError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Internal(#[from] InternalError),
}

impl CheckError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CheckError::Semantic(e) => Some(e.kind),
            CheckError::Internal(_) => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CheckError::Semantic(e) => &e.message,
            CheckError::Internal(e) => &e.message,
        }
    }
}
