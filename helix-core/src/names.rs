#![forbid(unsafe_code)]

//! Name declaration and name resolution: the first two passes over a program.

use helix_ast::{
    AssignStmt, BinOp, Block, Decl, Expr, ExprKind, ForStmt, FunctionDecl, Ident, IfStmt, Param,
    Program, Spanned, Stmt, TypeExpr, TypeExprKind, VarDecl, WhileStmt,
};
use tracing::debug;

use crate::aggregate;
use crate::error::{CheckError, ErrorKind, SemanticError};
use crate::frame::{NameTarget, SyntaxFrame, SyntaxValue};
use crate::types::{FunctionSignature, ParameterSignature, Type};

/// Registers every top-level name so later passes can refer to declarations
/// regardless of source order.
pub fn declare_names(program: &Program, frame: &mut SyntaxFrame) -> Result<(), CheckError> {
    for decl in &program.decls {
        match decl {
            Decl::Function(f) => {
                frame.declare_global_name(&f.name, NameTarget::Function)?;
            }
            Decl::Extern(e) => {
                frame.declare_global_name(&e.name, NameTarget::Function)?;
            }
            Decl::Aggregate(a) => {
                aggregate::declare_names(a, frame)?;
            }
            Decl::Global(g) => {
                frame.declare_global_name(&g.name, NameTarget::Variable)?;
            }
        }
    }
    debug!(declarations = program.decls.len(), "declared names");
    Ok(())
}

/// Resolves function signatures and rewrites `for` loops into `while` loops.
/// Returns the rewritten program.
pub fn resolve_names(program: &Program, frame: &mut SyntaxFrame) -> Result<Program, CheckError> {
    let mut decls = Vec::with_capacity(program.decls.len());

    for decl in &program.decls {
        match decl {
            Decl::Function(f) => {
                let sig = resolve_signature(frame, &f.name, &f.params, &f.ret, false)?;
                frame.context_mut().functions.insert(sig.path.clone(), sig);
                decls.push(Decl::Function(FunctionDecl {
                    body: desugar_block(&f.body, frame),
                    ..f.clone()
                }));
            }
            Decl::Extern(e) => {
                let sig = resolve_signature(frame, &e.name, &e.params, &e.ret, true)?;
                frame.context_mut().functions.insert(sig.path.clone(), sig);
                decls.push(decl.clone());
            }
            other => decls.push(other.clone()),
        }
    }

    debug!(functions = frame.context().functions.len(), "resolved names");
    Ok(Program { decls })
}

fn resolve_signature(
    frame: &SyntaxFrame,
    name: &Ident,
    params: &[Param],
    ret: &TypeExpr,
    is_extern: bool,
) -> Result<FunctionSignature, CheckError> {
    let mut resolved: Vec<ParameterSignature> = Vec::with_capacity(params.len());
    for par in params {
        if resolved.iter().any(|p| p.name == par.name.node) {
            return Err(SemanticError::identifier_defined(par.name.span, &par.name.node).into());
        }
        let ty = resolve_type(frame, &par.ty)?;
        if ty == Type::Void {
            return Err(SemanticError::new(
                ErrorKind::TypeMismatch,
                par.ty.span,
                format!("the parameter '{}' cannot have type 'void'", par.name.node),
            )
            .into());
        }
        resolved.push(ParameterSignature {
            name: par.name.node.clone(),
            ty,
        });
    }

    Ok(FunctionSignature {
        path: frame.resolve_path(&name.node)?,
        params: resolved,
        ret: resolve_type(frame, ret)?,
        is_extern,
    })
}

/// Turns a written type into a checked [`Type`] using the names visible from
/// the frame's current scope.
pub fn resolve_type(frame: &SyntaxFrame, ty: &TypeExpr) -> Result<Type, SemanticError> {
    match &ty.kind {
        TypeExprKind::Void => Ok(Type::Void),
        TypeExprKind::Int => Ok(Type::Int),
        TypeExprKind::Bool => Ok(Type::Bool),
        TypeExprKind::Pointer { inner, writable } => {
            let inner = resolve_type(frame, inner)?;
            if inner == Type::Void {
                return Err(SemanticError::new(
                    ErrorKind::TypeMismatch,
                    ty.span,
                    "pointers to 'void' are not supported",
                ));
            }
            Ok(Type::pointer(inner, *writable))
        }
        TypeExprKind::Named(name) => match frame.try_resolve_name(name) {
            Some((_, SyntaxValue::Type(t))) => Ok(t),
            Some(_) => Err(SemanticError::new(
                ErrorKind::TypeMismatch,
                ty.span,
                format!("'{name}' is not a type"),
            )),
            None => Err(SemanticError::identifier_not_found(ty.span, name)),
        },
    }
}

fn desugar_block(block: &Block, frame: &mut SyntaxFrame) -> Block {
    Block {
        span: block.span,
        stmts: block.stmts.iter().map(|s| desugar_stmt(s, frame)).collect(),
    }
}

fn desugar_stmt(stmt: &Stmt, frame: &mut SyntaxFrame) -> Stmt {
    match stmt {
        Stmt::For(f) => desugar_for(f, frame),
        Stmt::If(i) => Stmt::If(IfStmt {
            then_block: desugar_block(&i.then_block, frame),
            else_block: i.else_block.as_ref().map(|b| desugar_block(b, frame)),
            ..i.clone()
        }),
        Stmt::While(w) => Stmt::While(WhileStmt {
            body: desugar_block(&w.body, frame),
            ..w.clone()
        }),
        Stmt::Block(b) => Stmt::Block(desugar_block(b, frame)),
        other => other.clone(),
    }
}

/// `for i in a .. b do { body }` becomes
///
/// ```text
/// {
///     var $for_counter_N as int = a;
///     while $for_counter_N <= b do {
///         let i = $for_counter_N;
///         { body }
///         $for_counter_N = $for_counter_N + 1;
///     }
/// }
/// ```
fn desugar_for(f: &ForStmt, frame: &mut SyntaxFrame) -> Stmt {
    let counter_name = frame.fresh_name("for_counter");
    let span = f.span;
    let counter = || Expr {
        span,
        kind: ExprKind::Ident(Spanned::new(span, counter_name.clone())),
    };

    let declare_counter = Stmt::VarDecl(VarDecl {
        span: f.start.span,
        name: Spanned::new(f.id.span, counter_name.clone()),
        writable: true,
        ty: Some(TypeExpr {
            span: f.start.span,
            kind: TypeExprKind::Int,
        }),
        value: f.start.clone(),
    });

    let test = Expr {
        span: f.end.span,
        kind: ExprKind::Binary {
            left: Box::new(counter()),
            op: BinOp::Le,
            right: Box::new(f.end.clone()),
        },
    };

    let bind_id = Stmt::VarDecl(VarDecl {
        span: f.id.span,
        name: f.id.clone(),
        writable: false,
        ty: None,
        value: counter(),
    });

    let increment = Stmt::Assign(AssignStmt {
        span,
        target: counter(),
        value: Expr {
            span,
            kind: ExprKind::Binary {
                left: Box::new(counter()),
                op: BinOp::Add,
                right: Box::new(Expr {
                    span,
                    kind: ExprKind::IntLit(1),
                }),
            },
        },
    });

    let body = Block {
        span: f.body.span,
        stmts: vec![bind_id, Stmt::Block(desugar_block(&f.body, frame)), increment],
    };

    Stmt::Block(Block {
        span,
        stmts: vec![
            declare_counter,
            Stmt::While(WhileStmt {
                span,
                cond: test,
                body,
            }),
        ],
    })
}
