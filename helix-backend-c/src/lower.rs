#![forbid(unsafe_code)]

//! Lowering of checked function bodies into C statements.

use std::collections::{HashMap, HashSet};

use helix_ast::{BinOp, Span, UnaryOp};
use helix_core::{
    CaptureKind, Copiability, GlobalContext, IdentifierPath, Type, TypedBlock, TypedExpr,
    TypedExprKind, TypedFunction, TypedStmt, TypedStmtKind,
};
use helix_ir::{CBinOp, CExpr, CParameter, CStmt, CType, CUnaryOp, DebugSource};

use crate::CBackendError;
use crate::layout::convert_type;
use crate::naming::{NameTable, sanitize};

/// How a backend variable may be reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Storage {
    /// Only ever named directly, so no call can change it.
    Local,
    /// Its address is taken somewhere in the function.
    Exposed,
}

pub(crate) struct LoweredFunction {
    pub(crate) name: String,
    pub(crate) ret: CType,
    pub(crate) params: Vec<CParameter>,
    pub(crate) body: Vec<CStmt>,
}

pub(crate) struct FunctionLowering<'a> {
    context: &'a GlobalContext,
    globals: &'a mut NameTable,
    locals: NameTable,
    storage: HashMap<IdentifierPath, Storage>,
    exposed: HashSet<IdentifierPath>,
    next_temp: u32,
    source: Option<&'a DebugSource>,
    last_line: Option<u32>,
}

impl<'a> FunctionLowering<'a> {
    pub(crate) fn new(
        context: &'a GlobalContext,
        globals: &'a mut NameTable,
        source: Option<&'a DebugSource>,
    ) -> Self {
        let locals = globals.nested();
        Self {
            context,
            globals,
            locals,
            storage: HashMap::new(),
            exposed: HashSet::new(),
            next_temp: 0,
            source,
            last_line: None,
        }
    }

    pub(crate) fn lower(mut self, function: &TypedFunction) -> Result<LoweredFunction, CBackendError> {
        let name = self.global_name(&function.path)?;
        let ret = self.convert(&function.ret);
        collect_exposed(&function.body.stmts, &mut self.exposed);

        let mut params = Vec::with_capacity(function.params.len());
        for param in &function.params {
            let ty = self.convert(&param.ty);
            let name = self.declare_local(&param.path);
            params.push(CParameter { name, ty });
        }

        let body = self.lower_stmts(&function.body.stmts)?;
        Ok(LoweredFunction {
            name,
            ret,
            params,
            body,
        })
    }

    fn convert(&mut self, ty: &Type) -> CType {
        convert_type(ty, self.globals)
    }

    fn global_name(&self, path: &IdentifierPath) -> Result<String, CBackendError> {
        self.globals
            .get(path)
            .map(str::to_string)
            .ok_or_else(|| CBackendError::unnamed(path))
    }

    fn declare_local(&mut self, path: &IdentifierPath) -> String {
        let storage = if self.exposed.contains(path) {
            Storage::Exposed
        } else {
            Storage::Local
        };
        self.storage.insert(path.clone(), storage);
        self.locals.assign(path)
    }

    /// A pure expression whose value no call can change: it reads only
    /// plain-data locals that are never exposed. Addresses are stable too.
    fn is_stable(&self, expr: &TypedExpr) -> bool {
        expr.is_pure()
            && expr.captures.iter().all(|c| match c.kind {
                CaptureKind::LocationCapture => true,
                CaptureKind::ValueCapture => {
                    c.ty.copiability(self.context) == Copiability::Copyable
                        && self.storage.get(&c.path) == Some(&Storage::Local)
                }
            })
    }

    fn fresh_temp(&mut self) -> String {
        let n = self.next_temp;
        self.next_temp += 1;
        self.locals.reserve(&format!("__t_{n}"))
    }

    /// Evaluates `value` into a new temporary and returns the temporary.
    fn materialize(&mut self, ty: CType, value: CExpr, pre: &mut Vec<CStmt>) -> CExpr {
        let name = self.fresh_temp();
        pre.push(CStmt::VariableDeclaration {
            name: name.clone(),
            ty,
            value: Some(value),
        });
        CExpr::Variable(name)
    }

    fn line_comment(&mut self, span: Span, out: &mut Vec<CStmt>) {
        let Some(source) = self.source else {
            return;
        };
        let line = source.line_col(span).line;
        if self.last_line == Some(line) {
            return;
        }
        self.last_line = Some(line);
        out.push(CStmt::Comment(format!(
            "Line {line}: {}",
            source.line_text(line).trim()
        )));
    }

    fn lower_block(&mut self, block: &TypedBlock) -> Result<Vec<CStmt>, CBackendError> {
        self.lower_stmts(&block.stmts)
    }

    fn lower_stmts(&mut self, stmts: &[TypedStmt]) -> Result<Vec<CStmt>, CBackendError> {
        let mut out = Vec::new();
        for stmt in stmts {
            self.lower_stmt(stmt, &mut out)?;
        }
        Ok(out)
    }

    fn lower_stmt(&mut self, stmt: &TypedStmt, out: &mut Vec<CStmt>) -> Result<(), CBackendError> {
        self.line_comment(stmt.span, out);
        match &stmt.kind {
            TypedStmtKind::VarDecl { path, ty, value, .. } => {
                let value = self.lower_expr(value, out)?;
                let ty = self.convert(ty);
                let name = self.declare_local(path);
                out.push(CStmt::VariableDeclaration {
                    name,
                    ty,
                    value: Some(value),
                });
            }
            TypedStmtKind::Assign { target, value } => {
                let target_expr = if !target.is_pure() && !value.is_pure() {
                    let place = self.lower_expr(target, out)?;
                    let ty = CType::pointer(self.convert(&target.ty));
                    let slot = self.materialize(ty, address_of(place), out);
                    CExpr::deref(slot)
                } else {
                    self.lower_expr(target, out)?
                };
                let value = self.lower_expr(value, out)?;
                out.push(CStmt::Assignment {
                    target: target_expr,
                    value,
                });
            }
            TypedStmtKind::Return(value) => {
                let value = match value {
                    Some(v) => Some(self.lower_expr(v, out)?),
                    None => None,
                };
                out.push(CStmt::Return(value));
            }
            TypedStmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                let cond = self.lower_expr(cond, out)?;
                let then_block = self.lower_block(then_block)?;
                let else_block = match else_block {
                    Some(b) => self.lower_block(b)?,
                    None => Vec::new(),
                };
                out.push(CStmt::If {
                    cond,
                    then_block,
                    else_block,
                });
            }
            TypedStmtKind::While { cond, body } => self.lower_while(cond, body, out)?,
            TypedStmtKind::Block(block) => {
                let stmts = self.lower_block(block)?;
                out.push(CStmt::Block(stmts));
            }
            TypedStmtKind::Expr(expr) => {
                let expr = self.lower_expr(expr, out)?;
                out.push(CStmt::Expression(expr));
            }
            TypedStmtKind::UnionFlowVar {
                path,
                target,
                member,
                ty,
                ..
            } => {
                let through_pointer = target.ty.is_pointer();
                let target = self.lower_expr(target, out)?;
                let data = CExpr::member(target, "data", through_pointer);
                let value = address_of(CExpr::member(data, sanitize(member), false));
                let ty = self.convert(ty);
                let name = self.declare_local(path);
                out.push(CStmt::VariableDeclaration {
                    name,
                    ty,
                    value: Some(value),
                });
            }
        }
        Ok(())
    }

    /// A condition that needed only temporaries keeps them in a comma
    /// expression; anything else is re-evaluated at the top of an endless
    /// loop that breaks when the condition fails.
    fn lower_while(
        &mut self,
        cond: &TypedExpr,
        body: &TypedBlock,
        out: &mut Vec<CStmt>,
    ) -> Result<(), CBackendError> {
        let mut pre = Vec::new();
        let cond = self.lower_expr(cond, &mut pre)?;
        let mut body = self.lower_block(body)?;

        if pre.is_empty() {
            out.push(CStmt::While { cond, body });
            return Ok(());
        }

        let only_temps = pre
            .iter()
            .all(|s| matches!(s, CStmt::VariableDeclaration { value: Some(_), .. }));
        if only_temps {
            let mut steps = Vec::with_capacity(pre.len() + 1);
            for stmt in pre {
                if let CStmt::VariableDeclaration {
                    name,
                    ty,
                    value: Some(value),
                } = stmt
                {
                    out.push(CStmt::VariableDeclaration {
                        name: name.clone(),
                        ty,
                        value: None,
                    });
                    steps.push(CExpr::Assign {
                        target: Box::new(CExpr::Variable(name)),
                        value: Box::new(value),
                    });
                }
            }
            steps.push(cond);
            out.push(CStmt::While {
                cond: CExpr::Comma(steps),
                body,
            });
            return Ok(());
        }

        let mut looped = pre;
        looped.push(CStmt::If {
            cond: CExpr::not(cond),
            then_block: vec![CStmt::Break],
            else_block: Vec::new(),
        });
        looped.append(&mut body);
        out.push(CStmt::While {
            cond: CExpr::IntLiteral(1),
            body: looped,
        });
        Ok(())
    }

    fn lower_expr(&mut self, expr: &TypedExpr, pre: &mut Vec<CStmt>) -> Result<CExpr, CBackendError> {
        Ok(match &expr.kind {
            TypedExprKind::IntLit(n) => CExpr::IntLiteral(*n),
            TypedExprKind::BoolLit(b) => CExpr::BoolLiteral(*b),
            TypedExprKind::Variable(path) => self.variable(path)?,
            TypedExprKind::Unary { op, expr } => {
                let op = match op {
                    UnaryOp::Neg => CUnaryOp::Neg,
                    UnaryOp::Not => CUnaryOp::Not,
                };
                CExpr::Unary {
                    op,
                    expr: Box::new(self.lower_expr(expr, pre)?),
                }
            }
            TypedExprKind::Binary { left, op, right } => self.lower_binary(left, *op, right, pre)?,
            TypedExprKind::AddressOf(place) => address_of(self.lower_expr(place, pre)?),
            TypedExprKind::Deref(pointer) => CExpr::deref(self.lower_expr(pointer, pre)?),
            TypedExprKind::Member {
                base,
                member,
                through_pointer,
                in_union,
                ..
            } => {
                let base = self.lower_expr(base, pre)?;
                let member = sanitize(member);
                if *in_union {
                    CExpr::member(CExpr::member(base, "data", *through_pointer), member, false)
                } else {
                    CExpr::member(base, member, *through_pointer)
                }
            }
            TypedExprKind::Call { function, args } => {
                let target = self.global_name(function)?;
                let args: Vec<&TypedExpr> = args.iter().collect();
                let args = self.lower_ordered(&args, pre)?;
                CExpr::Call { target, args }
            }
            TypedExprKind::NewStruct { aggregate, fields } => {
                let ty = CType::Named(self.global_name(aggregate)?);
                let values: Vec<&TypedExpr> = fields.iter().map(|(_, e)| e).collect();
                let values = self.lower_ordered(&values, pre)?;
                let members = fields
                    .iter()
                    .zip(values)
                    .map(|((name, _), value)| (sanitize(name), value))
                    .collect();
                CExpr::CompoundLiteral { ty, members }
            }
            TypedExprKind::NewUnion {
                aggregate,
                member,
                index,
                value,
            } => {
                let ty = CType::Named(self.global_name(aggregate)?);
                let value = self.lower_expr(value, pre)?;
                CExpr::CompoundLiteral {
                    ty,
                    members: vec![
                        ("tag".to_string(), CExpr::IntLiteral(*index as i64)),
                        (format!("data.{}", sanitize(member)), value),
                    ],
                }
            }
            TypedExprKind::Is {
                target,
                index,
                through_pointer,
                ..
            } => {
                let target = self.lower_expr(target, pre)?;
                CExpr::binary(
                    CBinOp::Eq,
                    CExpr::member(target, "tag", *through_pointer),
                    CExpr::IntLiteral(*index as i64),
                )
            }
        })
    }

    fn variable(&self, path: &IdentifierPath) -> Result<CExpr, CBackendError> {
        if let Some(name) = self.locals.get(path) {
            return Ok(CExpr::var(name));
        }
        Ok(CExpr::var(self.global_name(path)?))
    }

    /// Lowers `exprs` left to right. C leaves the evaluation order of
    /// arguments and initializers unspecified, so once a call could change
    /// what another of them reads, every value a call could affect goes
    /// through a temporary.
    fn lower_ordered(
        &mut self,
        exprs: &[&TypedExpr],
        pre: &mut Vec<CStmt>,
    ) -> Result<Vec<CExpr>, CBackendError> {
        let unstable = exprs.iter().filter(|e| !self.is_stable(e)).count();
        let ordered = unstable > 1 && exprs.iter().any(|e| !e.is_pure());
        let mut out = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let value = self.lower_expr(expr, pre)?;
            if ordered && !self.is_stable(expr) {
                let ty = self.convert(&expr.ty);
                out.push(self.materialize(ty, value, pre));
            } else {
                out.push(value);
            }
        }
        Ok(out)
    }

    fn lower_binary(
        &mut self,
        left: &TypedExpr,
        op: BinOp,
        right: &TypedExpr,
        pre: &mut Vec<CStmt>,
    ) -> Result<CExpr, CBackendError> {
        let mut l = self.lower_expr(left, pre)?;
        let mut right_pre = Vec::new();
        let r = self.lower_expr(right, &mut right_pre)?;

        if matches!(op, BinOp::And | BinOp::Or) && !right_pre.is_empty() {
            let result = self.materialize(CType::Bool, l, pre);
            let guard = if op == BinOp::And {
                result.clone()
            } else {
                CExpr::not(result.clone())
            };
            right_pre.push(CStmt::Assignment {
                target: result.clone(),
                value: r,
            });
            pre.push(CStmt::If {
                cond: guard,
                then_block: right_pre,
                else_block: Vec::new(),
            });
            return Ok(result);
        }

        if !right.is_pure() && !self.is_stable(left) {
            let ty = self.convert(&left.ty);
            l = self.materialize(ty, l, pre);
        }
        pre.append(&mut right_pre);

        let op = match op {
            BinOp::Add => CBinOp::Add,
            BinOp::Sub => CBinOp::Sub,
            BinOp::Mul => CBinOp::Mul,
            BinOp::Div => CBinOp::Div,
            BinOp::Mod => CBinOp::Mod,
            BinOp::Eq => CBinOp::Eq,
            BinOp::Ne | BinOp::Xor => CBinOp::Ne,
            BinOp::Lt => CBinOp::Lt,
            BinOp::Gt => CBinOp::Gt,
            BinOp::Le => CBinOp::Le,
            BinOp::Ge => CBinOp::Ge,
            BinOp::And => CBinOp::LogicalAnd,
            BinOp::Or => CBinOp::LogicalOr,
        };
        Ok(CExpr::binary(op, l, r))
    }
}

/// Variables whose address some statement in `stmts` takes, directly or by
/// narrowing a union in place.
fn collect_exposed(stmts: &[TypedStmt], exposed: &mut HashSet<IdentifierPath>) {
    for stmt in stmts {
        match &stmt.kind {
            TypedStmtKind::VarDecl { value, .. } => exposed_by(value, exposed),
            TypedStmtKind::Assign { target, value } => {
                exposed_by(target, exposed);
                exposed_by(value, exposed);
            }
            TypedStmtKind::Return(value) => {
                if let Some(value) = value {
                    exposed_by(value, exposed);
                }
            }
            TypedStmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                exposed_by(cond, exposed);
                collect_exposed(&then_block.stmts, exposed);
                if let Some(else_block) = else_block {
                    collect_exposed(&else_block.stmts, exposed);
                }
            }
            TypedStmtKind::While { cond, body } => {
                exposed_by(cond, exposed);
                collect_exposed(&body.stmts, exposed);
            }
            TypedStmtKind::Block(block) => collect_exposed(&block.stmts, exposed),
            TypedStmtKind::Expr(expr) => exposed_by(expr, exposed),
            TypedStmtKind::UnionFlowVar { target, .. } => {
                exposed_by(target, exposed);
                if !target.ty.is_pointer() {
                    exposed.extend(target.root_variable().cloned());
                }
            }
        }
    }
}

fn exposed_by(expr: &TypedExpr, exposed: &mut HashSet<IdentifierPath>) {
    exposed.extend(
        expr.captures
            .iter()
            .filter(|c| c.kind == CaptureKind::LocationCapture)
            .map(|c| c.path.clone()),
    );
}

/// `&*p` is just `p`.
fn address_of(place: CExpr) -> CExpr {
    match place {
        CExpr::Deref(pointer) => *pointer,
        other => CExpr::address_of(other),
    }
}

/// Global initializers are constants, so they lower without any context
/// beyond the global names.
pub(crate) fn lower_constant(expr: &TypedExpr, globals: &NameTable) -> Result<CExpr, CBackendError> {
    match &expr.kind {
        TypedExprKind::IntLit(n) => Ok(CExpr::IntLiteral(*n)),
        TypedExprKind::BoolLit(b) => Ok(CExpr::BoolLiteral(*b)),
        TypedExprKind::Unary {
            op: UnaryOp::Neg,
            expr: inner,
        } => match inner.kind {
            TypedExprKind::IntLit(n) => Ok(CExpr::IntLiteral(-n)),
            _ => Err(CBackendError::non_constant(expr)),
        },
        TypedExprKind::AddressOf(place) => match &place.kind {
            TypedExprKind::Variable(path) => {
                let name = globals.get(path).ok_or_else(|| CBackendError::unnamed(path))?;
                Ok(CExpr::address_of(CExpr::var(name)))
            }
            _ => Err(CBackendError::non_constant(expr)),
        },
        _ => Err(CBackendError::non_constant(expr)),
    }
}
