#![forbid(unsafe_code)]

mod aggregate;
mod error;
mod frame;
mod index_vec;
mod lifetime;
mod path;
mod syntax;
mod typeck;
mod types;

pub mod flow;
pub mod names;

use helix_ast::{Decl, Program};
use tracing::debug;

pub use error::{CheckError, ErrorKind, InternalError, SemanticError};
pub use flow::{FlowFrame, FlowResults};
pub use frame::{
    DeclarationThunk, DeclarationWriter, FrameId, Frames, GlobalContext, NameTarget, SyntaxFrame,
    SyntaxValue,
};
pub use lifetime::{
    LifetimeBounds, LifetimeBundle, LifetimeId, LifetimeOrigin, LifetimeRecord, LifetimeRole,
    Lifetimes, VariableLifetimes,
};
pub use path::IdentifierPath;
pub use syntax::{
    CaptureKind, CapturedVariable, NodeId, PlaceKind, TypedBlock, TypedExpr, TypedExprKind,
    TypedFunction, TypedGlobal, TypedParam, TypedStmt, TypedStmtKind,
};
pub use typeck::Checker;
pub use types::{
    AggregateMember, AggregateSignature, Copiability, FunctionSignature, ParameterSignature, Type,
    VariableOrigin, VariableSignature,
};

/// A program that passed every check, ready for code generation.
#[derive(Debug)]
pub struct CheckedProgram {
    pub globals: Vec<TypedGlobal>,
    pub functions: Vec<TypedFunction>,
    /// Extern functions in declaration order.
    pub externs: Vec<FunctionSignature>,
    pub context: GlobalContext,
}

/// Runs every checking pass over `program`, stopping at the first error.
pub fn check_program(program: &Program) -> Result<CheckedProgram, CheckError> {
    let mut frame = SyntaxFrame::new();
    names::declare_names(program, &mut frame)?;
    let program = names::resolve_names(program, &mut frame)?;
    aggregate::declare_types(&program, &mut frame)?;

    let mut checker = Checker::new(&mut frame);
    let globals = checker.check_globals(&program)?;
    let functions = checker.check_functions(&program)?;

    let mut externs = Vec::new();
    for decl in &program.decls {
        if let Decl::Extern(e) = decl {
            let path = frame.resolve_path(&e.name.node)?;
            externs.push(frame.context().function(&path)?.clone());
        }
    }

    let context = frame.into_context();
    let flow = flow::analyze_program(&context, &globals, &functions)?;
    debug!(
        functions = functions.len(),
        lifetimes = flow.lifetimes.len(),
        globals = globals.len(),
        externs = externs.len(),
        "checked program"
    );

    Ok(CheckedProgram {
        globals,
        functions,
        externs,
        context,
    })
}
