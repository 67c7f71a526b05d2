#![forbid(unsafe_code)]

//! Helix compiler entry points: source text in, C text (or a diagnostic) out.

pub mod manifest;

use helix_ast::Program;
use helix_backend_c::{CBackendError, CodegenOptions};
use helix_core::{CheckError, CheckedProgram};
use helix_ir::DebugSource;
use helix_lex::{LexError, Lexer};
use helix_parse::{ParseError, Parser};
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Check(#[from] CheckError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Backend(#[from] CBackendError),
}

#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// Shown in `// Line N` comments and diagnostics.
    pub file_name: String,
    pub line_comments: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            file_name: "main.hx".to_string(),
            line_comments: false,
        }
    }
}

pub fn parse_program(src: &str) -> Result<Program, CompileError> {
    let tokens = Lexer::new(src).lex()?;
    let program = Parser::new(&tokens).parse_program()?;
    debug!(tokens = tokens.len(), decls = program.decls.len(), "parsed");
    Ok(program)
}

/// Runs every pass up to and including flow analysis.
pub fn check_source(src: &str) -> Result<CheckedProgram, CompileError> {
    let program = parse_program(src)?;
    Ok(helix_core::check_program(&program)?)
}

/// Compiles one Helix source file into one C translation unit. Nothing is
/// returned unless every pass succeeds.
pub fn compile_source(src: &str, options: &CompileOptions) -> Result<String, CompileError> {
    let checked = check_source(src)?;
    let codegen = CodegenOptions {
        line_comments: options.line_comments,
        source: options
            .line_comments
            .then(|| DebugSource::new(options.file_name.clone(), src)),
    };
    let module = helix_backend_c::generate(&checked, &codegen)?;
    let text = helix_backend_c::emit_module(&module);
    debug!(bytes = text.len(), file = %options.file_name, "emitted C");
    Ok(text)
}
