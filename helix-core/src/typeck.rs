#![forbid(unsafe_code)]

//! Type checking. Walks the resolved parse tree once, assigning every node a
//! type, a place kind, and the variables it captures.

use std::collections::HashSet;

use helix_ast::{
    AggregateKind, BinOp, Block, Decl, Expr, ExprKind, FunctionDecl, GlobalDecl, Ident, Program,
    Span, Stmt, UnaryOp,
};
use tracing::debug;

use crate::error::{CheckError, ErrorKind, InternalError, SemanticError};
use crate::frame::{NameTarget, SyntaxFrame, SyntaxValue};
use crate::names::resolve_type;
use crate::path::IdentifierPath;
use crate::syntax::{
    CaptureKind, CapturedVariable, NodeId, PlaceKind, TypedBlock, TypedExpr, TypedExprKind,
    TypedFunction, TypedGlobal, TypedParam, TypedStmt, TypedStmtKind,
};
use crate::types::{Type, VariableOrigin, VariableSignature};

pub struct Checker<'f> {
    frame: &'f mut SyntaxFrame,
    next_node: u32,
    return_type: Type,
}

/// A union variable narrowed to one member by an `if u is m` condition. The
/// narrowed name is a pointer to the member inside the union.
struct FlowVar {
    name: Ident,
    target: TypedExpr,
    member: String,
    index: usize,
    ty: Type,
    /// Whether the member may be written through the pointer.
    writable: bool,
}

impl<'f> Checker<'f> {
    pub fn new(frame: &'f mut SyntaxFrame) -> Self {
        Self {
            frame,
            next_node: 0,
            return_type: Type::Void,
        }
    }

    fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    fn expr(
        &mut self,
        span: Span,
        ty: Type,
        place: PlaceKind,
        captures: Vec<CapturedVariable>,
        kind: TypedExprKind,
    ) -> TypedExpr {
        TypedExpr {
            id: self.node_id(),
            span,
            ty,
            place,
            captures,
            kind,
        }
    }

    fn stmt(&mut self, span: Span, kind: TypedStmtKind) -> TypedStmt {
        TypedStmt {
            id: self.node_id(),
            span,
            kind,
        }
    }

    /// Runs `f` inside a fresh scope. The scope is left again whether or not
    /// `f` succeeds.
    fn in_scope<T>(
        &mut self,
        segment: Option<&str>,
        f: impl FnOnce(&mut Self, IdentifierPath) -> Result<T, CheckError>,
    ) -> Result<T, CheckError> {
        let scope = self.frame.push_scope(segment);
        let result = f(self, scope);
        self.frame.pop_scope();
        result
    }

    fn register_variable(&mut self, path: &IdentifierPath, ty: &Type, writable: bool, origin: VariableOrigin) {
        self.frame.context_mut().variables.insert(
            path.clone(),
            VariableSignature {
                path: path.clone(),
                ty: ty.clone(),
                writable,
                origin,
            },
        );
    }

    /// Globals are checked in source order, so an initializer may only take
    /// the address of a global declared above it.
    pub fn check_globals(&mut self, program: &Program) -> Result<Vec<TypedGlobal>, CheckError> {
        let mut globals = Vec::new();
        for decl in &program.decls {
            if let Decl::Global(g) = decl {
                globals.push(self.check_global(g)?);
            }
        }
        debug!(globals = globals.len(), "checked globals");
        Ok(globals)
    }

    fn check_global(&mut self, g: &GlobalDecl) -> Result<TypedGlobal, CheckError> {
        let value = self.check_expr(&g.value)?;
        if !is_constant(&value) {
            return Err(SemanticError::new(
                ErrorKind::NonConstantGlobal,
                g.value.span,
                format!("the initializer of the global '{}' must be a constant", g.name.node),
            )
            .into());
        }

        let (ty, value) = self.annotate(g.ty.as_ref(), value)?;
        check_storable(&ty, g.name.span)?;

        let path = self.frame.resolve_path(&g.name.node)?;
        self.register_variable(&path, &ty, g.writable, VariableOrigin::Global);
        Ok(TypedGlobal {
            path,
            span: g.span,
            ty,
            writable: g.writable,
            value,
        })
    }

    pub fn check_functions(&mut self, program: &Program) -> Result<Vec<TypedFunction>, CheckError> {
        let mut functions = Vec::new();
        for decl in &program.decls {
            if let Decl::Function(f) = decl {
                functions.push(self.check_function(f)?);
            }
        }
        debug!(functions = functions.len(), nodes = self.next_node, "checked functions");
        Ok(functions)
    }

    fn check_function(&mut self, f: &FunctionDecl) -> Result<TypedFunction, CheckError> {
        let path = self.frame.resolve_path(&f.name.node)?;
        let sig = self.frame.context().function(&path)?.clone();
        self.return_type = sig.ret.clone();

        let (params, body) = self.in_scope(Some(&f.name.node), |this, scope| {
            let mut params = Vec::with_capacity(f.params.len());
            for (param, resolved) in f.params.iter().zip(&sig.params) {
                let param_path = this.frame.declare_local_name(&param.name, NameTarget::Variable)?;
                this.register_variable(&param_path, &resolved.ty, false, VariableOrigin::Parameter);
                params.push(TypedParam {
                    path: param_path,
                    name: resolved.name.clone(),
                    ty: resolved.ty.clone(),
                    span: param.span,
                });
            }

            let stmts = this.check_stmts(&f.body.stmts)?;
            Ok((
                params,
                TypedBlock {
                    scope,
                    span: f.body.span,
                    stmts,
                },
            ))
        })?;

        if sig.ret != Type::Void && !returns_on_all_paths(&body.stmts) {
            return Err(SemanticError::new(
                ErrorKind::MissingReturn,
                f.name.span,
                format!(
                    "the function '{}' must return a value of type '{}' on every path",
                    f.name.node, sig.ret
                ),
            )
            .into());
        }

        Ok(TypedFunction {
            path,
            span: f.span,
            params,
            ret: sig.ret,
            body,
        })
    }

    fn check_block(&mut self, block: &Block, flow_var: Option<FlowVar>) -> Result<TypedBlock, CheckError> {
        self.in_scope(None, |this, scope| {
            let mut stmts = Vec::with_capacity(block.stmts.len() + 1);
            if let Some(var) = flow_var {
                stmts.push(this.declare_flow_var(var)?);
            }
            stmts.extend(this.check_stmts(&block.stmts)?);
            Ok(TypedBlock {
                scope,
                span: block.span,
                stmts,
            })
        })
    }

    fn check_stmts(&mut self, stmts: &[Stmt]) -> Result<Vec<TypedStmt>, CheckError> {
        stmts.iter().map(|s| self.check_stmt(s)).collect()
    }

    fn declare_flow_var(&mut self, var: FlowVar) -> Result<TypedStmt, CheckError> {
        let path = self.frame.declare_local_name(&var.name, NameTarget::Variable)?;
        self.register_variable(&path, &var.ty, false, VariableOrigin::UnionAlias);
        Ok(self.stmt(
            var.name.span,
            TypedStmtKind::UnionFlowVar {
                path,
                target: var.target,
                member: var.member,
                index: var.index,
                ty: var.ty,
                writable: var.writable,
            },
        ))
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<TypedStmt, CheckError> {
        let kind = match stmt {
            Stmt::VarDecl(v) => {
                let value = self.check_expr(&v.value)?;
                let (ty, value) = self.annotate(v.ty.as_ref(), value)?;
                check_storable(&ty, v.name.span)?;

                let path = self.frame.declare_local_name(&v.name, NameTarget::Variable)?;
                self.register_variable(&path, &ty, v.writable, VariableOrigin::Local);
                TypedStmtKind::VarDecl {
                    path,
                    ty,
                    writable: v.writable,
                    value,
                }
            }
            Stmt::Assign(a) => {
                let target = self.check_expr(&a.target)?;
                match target.place {
                    PlaceKind::Value => return Err(SemanticError::not_lvalue(a.target.span).into()),
                    PlaceKind::ReadOnly => {
                        return Err(SemanticError::not_writable(a.target.span, &describe_place(&target)).into());
                    }
                    PlaceKind::Writable => {}
                }
                let value = self.check_expr(&a.value)?;
                let value = coerce(value, &target.ty)?;
                TypedStmtKind::Assign { target, value }
            }
            Stmt::Return(r) => {
                let ret = self.return_type.clone();
                match &r.value {
                    None if ret != Type::Void => {
                        return Err(SemanticError::type_mismatch(r.span, &ret, &Type::Void).into());
                    }
                    None => TypedStmtKind::Return(None),
                    Some(e) => {
                        let value = self.check_expr(e)?;
                        if ret == Type::Void {
                            return Err(SemanticError::new(
                                ErrorKind::TypeMismatch,
                                e.span,
                                "a function returning 'void' cannot return a value",
                            )
                            .into());
                        }
                        TypedStmtKind::Return(Some(coerce(value, &ret)?))
                    }
                }
            }
            Stmt::If(i) => {
                let cond = self.check_condition(&i.cond)?;
                let flow_var = self.flow_var_for(&i.cond, &cond);
                let then_block = self.check_block(&i.then_block, flow_var)?;
                let else_block = match &i.else_block {
                    Some(b) => Some(self.check_block(b, None)?),
                    None => None,
                };
                TypedStmtKind::If {
                    cond,
                    then_block,
                    else_block,
                }
            }
            Stmt::While(w) => {
                let cond = self.check_condition(&w.cond)?;
                let body = self.check_block(&w.body, None)?;
                TypedStmtKind::While { cond, body }
            }
            Stmt::Block(b) => TypedStmtKind::Block(self.check_block(b, None)?),
            Stmt::Expr(e) => TypedStmtKind::Expr(self.check_expr(e)?),
            Stmt::For(_) => {
                return Err(InternalError {
                    message: "for loops must be desugared before type checking".to_string(),
                }
                .into());
            }
        };
        Ok(self.stmt(stmt.span(), kind))
    }

    /// Applies an optional `as T` annotation to an initializer.
    fn annotate(
        &mut self,
        annotation: Option<&helix_ast::TypeExpr>,
        value: TypedExpr,
    ) -> Result<(Type, TypedExpr), CheckError> {
        match annotation {
            Some(t) => {
                let ty = resolve_type(self.frame, t)?;
                let value = coerce(value, &ty)?;
                Ok((ty, value))
            }
            None => Ok((value.ty.clone(), value)),
        }
    }

    fn check_condition(&mut self, cond: &Expr) -> Result<TypedExpr, CheckError> {
        let cond = self.check_expr(cond)?;
        Ok(coerce(cond, &Type::Bool)?)
    }

    /// `if u is m then { ... }` narrows `u` inside the then-block when the
    /// condition tests a plain variable.
    fn flow_var_for(&self, cond: &Expr, typed: &TypedExpr) -> Option<FlowVar> {
        let ExprKind::Is { target, .. } = &cond.kind else {
            return None;
        };
        let ExprKind::Ident(name) = &target.kind else {
            return None;
        };
        let TypedExprKind::Is {
            target: typed_target,
            member,
            index,
            through_pointer,
        } = &typed.kind
        else {
            return None;
        };

        let union_path = match &typed_target.ty {
            Type::Named(path) => path,
            Type::Pointer { inner, .. } => inner.as_named()?,
            _ => return None,
        };
        let mem = self.frame.context().aggregates.get(union_path)?.members.get(*index)?;
        let container_writable = if *through_pointer {
            typed_target.ty.pointee().is_some_and(|(_, writable)| writable)
        } else {
            typed_target.place == PlaceKind::Writable
        };

        let writable = mem.writable && container_writable;
        let union_ty = Type::Named(union_path.clone());
        let ty = Type::pointer(union_ty.clone(), writable).substitute(&union_ty, &mem.ty);

        Some(FlowVar {
            name: name.clone(),
            target: (**typed_target).clone(),
            member: member.clone(),
            index: *index,
            ty,
            writable,
        })
    }

    pub fn check_expr(&mut self, expr: &Expr) -> Result<TypedExpr, CheckError> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::IntLit(n) => Ok(self.expr(span, Type::Int, PlaceKind::Value, Vec::new(), TypedExprKind::IntLit(*n))),
            ExprKind::BoolLit(b) => Ok(self.expr(span, Type::Bool, PlaceKind::Value, Vec::new(), TypedExprKind::BoolLit(*b))),
            ExprKind::Ident(name) => self.check_variable(name),
            ExprKind::Unary { op, expr: operand } => {
                let operand = self.check_expr(operand)?;
                let (expected, symbol) = match op {
                    UnaryOp::Neg => (Type::Int, "-"),
                    UnaryOp::Not => (Type::Bool, "not"),
                };
                if operand.ty != expected {
                    return Err(SemanticError::new(
                        ErrorKind::InvalidOperands,
                        span,
                        format!("operator '{symbol}' cannot be applied to '{}'", operand.ty),
                    )
                    .into());
                }
                let captures = operand.captures.clone();
                Ok(self.expr(
                    span,
                    expected,
                    PlaceKind::Value,
                    captures,
                    TypedExprKind::Unary {
                        op: *op,
                        expr: Box::new(operand),
                    },
                ))
            }
            ExprKind::Binary { left, op, right } => {
                let left = self.check_expr(left)?;
                let right = self.check_expr(right)?;
                let ty = binary_result(*op, &left.ty, &right.ty)
                    .ok_or_else(|| SemanticError::invalid_operands(span, op.symbol(), &left.ty, &right.ty))?;
                let captures = concat_captures([&left, &right]);
                Ok(self.expr(
                    span,
                    ty,
                    PlaceKind::Value,
                    captures,
                    TypedExprKind::Binary {
                        left: Box::new(left),
                        op: *op,
                        right: Box::new(right),
                    },
                ))
            }
            ExprKind::AddressOf(inner) => {
                let inner = self.check_expr(inner)?;
                if !inner.place.is_place() {
                    return Err(SemanticError::not_lvalue(inner.span).into());
                }
                let ty = Type::pointer(inner.ty.clone(), inner.place == PlaceKind::Writable);
                let root = inner.root_variable().cloned();
                let captures = inner
                    .captures
                    .iter()
                    .cloned()
                    .map(|mut c| {
                        if root.as_ref() == Some(&c.path) {
                            c.kind = CaptureKind::LocationCapture;
                        }
                        c
                    })
                    .collect();
                Ok(self.expr(span, ty, PlaceKind::Value, captures, TypedExprKind::AddressOf(Box::new(inner))))
            }
            ExprKind::Deref(inner) => {
                let inner = self.check_expr(inner)?;
                let Some((pointee, writable)) = inner.ty.pointee() else {
                    return Err(SemanticError::new(
                        ErrorKind::TypeMismatch,
                        inner.span,
                        format!("cannot dereference a value of type '{}'", inner.ty),
                    )
                    .into());
                };
                let ty = pointee.clone();
                let place = if writable { PlaceKind::Writable } else { PlaceKind::ReadOnly };
                let captures = inner.captures.clone();
                Ok(self.expr(span, ty, place, captures, TypedExprKind::Deref(Box::new(inner))))
            }
            ExprKind::Member { base, member } => self.check_member(span, base, member),
            ExprKind::Call { callee, args } => self.check_call(span, callee, args),
            ExprKind::New { name, fields } => self.check_new(span, name, fields),
            ExprKind::Is { target, member } => self.check_is(span, target, member),
        }
    }

    fn check_variable(&mut self, name: &Ident) -> Result<TypedExpr, CheckError> {
        let path = match self.frame.try_resolve_name(&name.node) {
            Some((path, SyntaxValue::Name(NameTarget::Variable))) => path,
            Some(_) => {
                return Err(SemanticError::new(
                    ErrorKind::TypeMismatch,
                    name.span,
                    format!("'{}' is not a variable", name.node),
                )
                .into());
            }
            None => return Err(SemanticError::identifier_not_found(name.span, &name.node).into()),
        };

        // Globals are declared up front but only typed in source order.
        let Some(sig) = self.frame.context().variables.get(&path) else {
            return Err(SemanticError::new(
                ErrorKind::IdentifierNotFound,
                name.span,
                format!("the global '{}' is used before its declaration", name.node),
            )
            .into());
        };
        let ty = sig.ty.clone();
        let place = if sig.writable { PlaceKind::Writable } else { PlaceKind::ReadOnly };
        let captures = vec![CapturedVariable {
            path: path.clone(),
            kind: CaptureKind::ValueCapture,
            ty: ty.clone(),
        }];
        Ok(self.expr(name.span, ty, place, captures, TypedExprKind::Variable(path)))
    }

    fn check_member(&mut self, span: Span, base: &Expr, member: &Ident) -> Result<TypedExpr, CheckError> {
        let base = self.check_expr(base)?;
        let container = match &base.ty {
            Type::Named(path) => Some((path.clone(), false, base.place == PlaceKind::Writable)),
            Type::Pointer { inner, writable } => inner.as_named().map(|path| (path.clone(), true, *writable)),
            _ => None,
        };
        let Some((aggregate, through_pointer, container_writable)) = container else {
            return Err(SemanticError::new(
                ErrorKind::InvalidMemberAccess,
                member.span,
                format!("the type '{}' has no members", base.ty),
            )
            .into());
        };

        let sig = self.frame.context().aggregate(&aggregate)?;
        let Some((index, mem)) = sig.member(&member.node) else {
            return Err(SemanticError::member_undefined(member.span, &base.ty, &member.node).into());
        };
        let ty = mem.ty.clone();
        let in_union = sig.kind == AggregateKind::Union;
        let place = if !through_pointer && !base.place.is_place() {
            PlaceKind::Value
        } else if container_writable && mem.writable {
            PlaceKind::Writable
        } else {
            PlaceKind::ReadOnly
        };

        let captures = base.captures.clone();
        Ok(self.expr(
            span,
            ty,
            place,
            captures,
            TypedExprKind::Member {
                base: Box::new(base),
                member: member.node.clone(),
                index,
                through_pointer,
                in_union,
            },
        ))
    }

    fn check_call(&mut self, span: Span, callee: &Ident, args: &[Expr]) -> Result<TypedExpr, CheckError> {
        let path = match self.frame.try_resolve_name(&callee.node) {
            Some((path, SyntaxValue::Name(NameTarget::Function))) => path,
            Some(_) => {
                return Err(SemanticError::new(
                    ErrorKind::TypeMismatch,
                    callee.span,
                    format!("'{}' is not a function", callee.node),
                )
                .into());
            }
            None => return Err(SemanticError::identifier_not_found(callee.span, &callee.node).into()),
        };

        let sig = self.frame.context().function(&path)?.clone();
        if sig.params.len() != args.len() {
            return Err(SemanticError::invalid_arity(span, &callee.node, sig.params.len(), args.len()).into());
        }

        let mut typed = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(&sig.params) {
            let arg = self.check_expr(arg)?;
            typed.push(coerce(arg, &param.ty)?);
        }

        let captures = concat_captures(&typed);
        Ok(self.expr(
            span,
            sig.ret,
            PlaceKind::Value,
            captures,
            TypedExprKind::Call {
                function: path,
                args: typed,
            },
        ))
    }

    fn check_new(&mut self, span: Span, name: &Ident, fields: &[(Ident, Expr)]) -> Result<TypedExpr, CheckError> {
        let path = match self.frame.try_resolve_name(&name.node) {
            Some((_, SyntaxValue::Type(Type::Named(path)))) => path,
            Some(_) => {
                return Err(SemanticError::new(
                    ErrorKind::TypeMismatch,
                    name.span,
                    format!("'{}' is not a struct or union", name.node),
                )
                .into());
            }
            None => return Err(SemanticError::identifier_not_found(name.span, &name.node).into()),
        };
        let sig = self.frame.context().aggregate(&path)?.clone();
        let ty = Type::Named(path.clone());

        if sig.kind == AggregateKind::Union {
            let [(member, value)] = fields else {
                return Err(SemanticError::new(
                    ErrorKind::MissingMemberValue,
                    span,
                    format!("a literal of the union '{}' must set exactly one member", name.node),
                )
                .into());
            };
            let Some((index, mem)) = sig.member(&member.node) else {
                return Err(SemanticError::member_undefined(member.span, &ty, &member.node).into());
            };
            let value = self.check_expr(value)?;
            let value = coerce(value, &mem.ty)?;
            let captures = value.captures.clone();
            return Ok(self.expr(
                span,
                ty,
                PlaceKind::Value,
                captures,
                TypedExprKind::NewUnion {
                    aggregate: path,
                    member: member.node.clone(),
                    index,
                    value: Box::new(value),
                },
            ));
        }

        let mut seen = HashSet::new();
        let mut typed = Vec::with_capacity(fields.len());
        for (member, value) in fields {
            if !seen.insert(member.node.as_str()) {
                return Err(SemanticError::identifier_defined(member.span, &member.node).into());
            }
            let Some((index, mem)) = sig.member(&member.node) else {
                return Err(SemanticError::member_undefined(member.span, &ty, &member.node).into());
            };
            let value = self.check_expr(value)?;
            typed.push((index, member.node.clone(), coerce(value, &mem.ty)?));
        }

        let ctx = self.frame.context();
        if let Some(missing) = sig
            .members
            .iter()
            .find(|m| !seen.contains(m.name.as_str()) && !m.ty.is_value_type(ctx))
        {
            return Err(SemanticError::new(
                ErrorKind::MissingMemberValue,
                span,
                format!(
                    "the member '{}' of '{}' holds a pointer and must be initialized",
                    missing.name, name.node
                ),
            )
            .into());
        }

        typed.sort_by_key(|(index, ..)| *index);
        let fields: Vec<(String, TypedExpr)> = typed.into_iter().map(|(_, name, value)| (name, value)).collect();
        let captures = concat_captures(fields.iter().map(|(_, e)| e));
        Ok(self.expr(
            span,
            ty,
            PlaceKind::Value,
            captures,
            TypedExprKind::NewStruct {
                aggregate: path,
                fields,
            },
        ))
    }

    fn check_is(&mut self, span: Span, target: &Expr, member: &Ident) -> Result<TypedExpr, CheckError> {
        let target = self.check_expr(target)?;
        let (aggregate, through_pointer) = match &target.ty {
            Type::Named(path) => (Some(path.clone()), false),
            Type::Pointer { inner, .. } => (inner.as_named().cloned(), true),
            _ => (None, false),
        };
        let sig = match &aggregate {
            Some(path) => self.frame.context().aggregates.get(path),
            None => None,
        };
        let Some(sig) = sig.filter(|s| s.kind == AggregateKind::Union) else {
            return Err(SemanticError::new(
                ErrorKind::TypeMismatch,
                target.span,
                format!("'is' requires a union, found '{}'", target.ty),
            )
            .into());
        };
        let Some((index, _)) = sig.member(&member.node) else {
            return Err(SemanticError::member_undefined(member.span, &target.ty, &member.node).into());
        };

        let captures = target.captures.clone();
        Ok(self.expr(
            span,
            Type::Bool,
            PlaceKind::Value,
            captures,
            TypedExprKind::Is {
                target: Box::new(target),
                member: member.node.clone(),
                index,
                through_pointer,
            },
        ))
    }
}

fn coerce(expr: TypedExpr, to: &Type) -> Result<TypedExpr, SemanticError> {
    if expr.ty.can_coerce_to(to) {
        Ok(TypedExpr { ty: to.clone(), ..expr })
    } else {
        Err(SemanticError::type_mismatch(expr.span, to, &expr.ty))
    }
}

fn check_storable(ty: &Type, span: Span) -> Result<(), SemanticError> {
    if *ty == Type::Void {
        return Err(SemanticError::new(
            ErrorKind::TypeMismatch,
            span,
            "a variable cannot have type 'void'",
        ));
    }
    Ok(())
}

fn binary_result(op: BinOp, left: &Type, right: &Type) -> Option<Type> {
    let ints = *left == Type::Int && *right == Type::Int;
    let bools = *left == Type::Bool && *right == Type::Bool;
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => ints.then_some(Type::Int),
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => ints.then_some(Type::Bool),
        BinOp::Eq | BinOp::Ne => {
            let comparable = matches!(left, Type::Int | Type::Bool | Type::Pointer { .. });
            (comparable && (left.can_coerce_to(right) || right.can_coerce_to(left))).then_some(Type::Bool)
        }
        BinOp::And | BinOp::Or | BinOp::Xor => bools.then_some(Type::Bool),
    }
}

fn is_constant(expr: &TypedExpr) -> bool {
    match &expr.kind {
        TypedExprKind::IntLit(_) | TypedExprKind::BoolLit(_) => true,
        TypedExprKind::Unary {
            op: UnaryOp::Neg,
            expr,
        } => matches!(expr.kind, TypedExprKind::IntLit(_)),
        TypedExprKind::AddressOf(target) => matches!(target.kind, TypedExprKind::Variable(_)),
        _ => false,
    }
}

fn concat_captures<'a>(exprs: impl IntoIterator<Item = &'a TypedExpr>) -> Vec<CapturedVariable> {
    exprs.into_iter().flat_map(|e| e.captures.iter().cloned()).collect()
}

fn describe_place(place: &TypedExpr) -> String {
    match &place.kind {
        TypedExprKind::Variable(path) => format!("the variable '{}'", path.last().unwrap_or_default()),
        TypedExprKind::Member { member, .. } => format!("the member '{member}'"),
        _ => "the pointee".to_string(),
    }
}

fn returns_on_all_paths(stmts: &[TypedStmt]) -> bool {
    stmts.iter().any(|s| match &s.kind {
        TypedStmtKind::Return(_) => true,
        TypedStmtKind::If {
            then_block,
            else_block: Some(else_block),
            ..
        } => returns_on_all_paths(&then_block.stmts) && returns_on_all_paths(&else_block.stmts),
        TypedStmtKind::Block(b) => returns_on_all_paths(&b.stmts),
        _ => false,
    })
}
