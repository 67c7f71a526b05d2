#![forbid(unsafe_code)]

mod emit;
mod layout;
mod lower;
mod naming;

use helix_core::{CheckedProgram, IdentifierPath, TypedExpr, VariableOrigin};
use helix_ir::{CDeclaration, CModule, CParameter, DebugSource};
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use layout::{LayoutWriter, convert_type};
use lower::{FunctionLowering, lower_constant};
use naming::NameTable;

pub use emit::emit_module;

#[derive(Debug, Error, Diagnostic)]
#[error("C backend error: {message}")]
#[diagnostic(code(helix::backend_c))]
#[allow(unused_assignments)]
pub struct CBackendError {
    pub message: String,
}

impl CBackendError {
    fn unnamed(path: &IdentifierPath) -> Self {
        Self {
            message: format!("no C name was assigned to '{path}'"),
        }
    }

    fn non_constant(expr: &TypedExpr) -> Self {
        Self {
            message: format!("global initializer of type '{}' is not a constant", expr.ty),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CodegenOptions {
    /// Emit a `// Line N: ...` comment whenever a statement starts a new
    /// source line. Needs `source`.
    pub line_comments: bool,
    pub source: Option<DebugSource>,
}

/// Lowers a checked program into a C translation unit.
///
/// Declarations come out as: aggregate forward declarations, full aggregate
/// layouts (by-value dependencies first), globals, prototypes for every
/// extern and function, then the function bodies.
pub fn generate(program: &CheckedProgram, options: &CodegenOptions) -> Result<CModule, CBackendError> {
    let context = &program.context;
    let mut globals = NameTable::new();
    assign_global_names(program, &mut globals);

    let mut module = CModule::new();

    let mut writer = LayoutWriter::new(context, &mut globals);
    writer.write_all();
    let LayoutWriter {
        forwards, layouts, ..
    } = writer;
    let aggregates = forwards.len();
    if !forwards.is_empty() {
        forwards.into_iter().for_each(|d| module.push(d));
        module.push(CDeclaration::EmptyLine);
    }
    layouts.into_iter().for_each(|d| module.push(d));

    for global in &program.globals {
        let name = globals
            .get(&global.path)
            .map(str::to_string)
            .ok_or_else(|| CBackendError::unnamed(&global.path))?;
        let ty = convert_type(&global.ty, &mut globals);
        let value = lower_constant(&global.value, &globals)?;
        module.push(CDeclaration::Global {
            name,
            ty,
            value: Some(value),
        });
    }
    if !program.globals.is_empty() {
        module.push(CDeclaration::EmptyLine);
    }

    for sig in &program.externs {
        let name = globals
            .get(&sig.path)
            .map(str::to_string)
            .ok_or_else(|| CBackendError::unnamed(&sig.path))?;
        let ret = convert_type(&sig.ret, &mut globals);
        let params = sig
            .params
            .iter()
            .map(|p| CParameter {
                name: naming::sanitize(&p.name),
                ty: convert_type(&p.ty, &mut globals),
            })
            .collect();
        module.push(CDeclaration::FunctionPrototype { name, ret, params });
    }

    let source = if options.line_comments {
        options.source.as_ref()
    } else {
        None
    };
    let mut bodies = Vec::with_capacity(program.functions.len());
    for function in &program.functions {
        let lowered = FunctionLowering::new(context, &mut globals, source).lower(function)?;
        module.push(CDeclaration::FunctionPrototype {
            name: lowered.name.clone(),
            ret: lowered.ret.clone(),
            params: lowered.params.clone(),
        });
        bodies.push(lowered);
    }
    if !program.externs.is_empty() || !bodies.is_empty() {
        module.push(CDeclaration::EmptyLine);
    }

    let functions = bodies.len();
    for (i, lowered) in bodies.into_iter().enumerate() {
        if i > 0 {
            module.push(CDeclaration::EmptyLine);
        }
        module.push(CDeclaration::Function {
            name: lowered.name,
            ret: lowered.ret,
            params: lowered.params,
            body: lowered.body,
        });
    }

    debug!(aggregates, functions, declarations = module.declarations.len(), "generated C module");
    Ok(module)
}

/// Names every top-level entity up front, in a stable order, so locals can
/// avoid them and aggregates can refer to each other.
fn assign_global_names(program: &CheckedProgram, globals: &mut NameTable) {
    let context = &program.context;
    for sig in &program.externs {
        globals.assign(&sig.path);
    }

    let mut functions: Vec<&IdentifierPath> = context.functions.keys().collect();
    functions.sort();
    let mut aggregates: Vec<&IdentifierPath> = context.aggregates.keys().collect();
    aggregates.sort();
    let mut variables: Vec<&IdentifierPath> = context
        .variables
        .values()
        .filter(|v| v.origin == VariableOrigin::Global)
        .map(|v| &v.path)
        .collect();
    variables.sort();

    for path in functions.into_iter().chain(aggregates).chain(variables) {
        globals.assign(path);
    }
}
