#![forbid(unsafe_code)]

//! The checked syntax tree. Nodes are immutable once built; a later pass that
//! needs more information keeps it in a side table keyed by [`NodeId`].

use helix_ast::{BinOp, Span, UnaryOp};

use crate::path::IdentifierPath;
use crate::types::Type;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaptureKind {
    /// The variable's value is read.
    ValueCapture,
    /// The variable's address is taken or it is written through.
    LocationCapture,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CapturedVariable {
    pub path: IdentifierPath,
    pub kind: CaptureKind,
    pub ty: Type,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceKind {
    /// Not a storage location.
    Value,
    ReadOnly,
    Writable,
}

impl PlaceKind {
    pub fn is_place(self) -> bool {
        self != PlaceKind::Value
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypedExpr {
    pub id: NodeId,
    pub span: Span,
    pub ty: Type,
    pub place: PlaceKind,
    pub captures: Vec<CapturedVariable>,
    pub kind: TypedExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypedExprKind {
    IntLit(i64),
    BoolLit(bool),
    Variable(IdentifierPath),
    Unary {
        op: UnaryOp,
        expr: Box<TypedExpr>,
    },
    Binary {
        left: Box<TypedExpr>,
        op: BinOp,
        right: Box<TypedExpr>,
    },
    AddressOf(Box<TypedExpr>),
    Deref(Box<TypedExpr>),
    Member {
        base: Box<TypedExpr>,
        member: String,
        index: usize,
        through_pointer: bool,
        in_union: bool,
    },
    Call {
        function: IdentifierPath,
        args: Vec<TypedExpr>,
    },
    NewStruct {
        aggregate: IdentifierPath,
        fields: Vec<(String, TypedExpr)>,
    },
    NewUnion {
        aggregate: IdentifierPath,
        member: String,
        index: usize,
        value: Box<TypedExpr>,
    },
    Is {
        target: Box<TypedExpr>,
        member: String,
        index: usize,
        through_pointer: bool,
    },
}

impl TypedExpr {
    pub fn children(&self) -> Vec<&TypedExpr> {
        match &self.kind {
            TypedExprKind::IntLit(_) | TypedExprKind::BoolLit(_) | TypedExprKind::Variable(_) => {
                Vec::new()
            }
            TypedExprKind::Unary { expr, .. }
            | TypedExprKind::AddressOf(expr)
            | TypedExprKind::Deref(expr) => vec![expr.as_ref()],
            TypedExprKind::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            TypedExprKind::Member { base, .. } => vec![base.as_ref()],
            TypedExprKind::Call { args, .. } => args.iter().collect(),
            TypedExprKind::NewStruct { fields, .. } => fields.iter().map(|(_, e)| e).collect(),
            TypedExprKind::NewUnion { value, .. } => vec![value.as_ref()],
            TypedExprKind::Is { target, .. } => vec![target.as_ref()],
        }
    }

    /// Evaluating a pure expression has no side effects.
    pub fn is_pure(&self) -> bool {
        !matches!(self.kind, TypedExprKind::Call { .. }) && self.children().iter().all(|c| c.is_pure())
    }

    /// The variable a place expression is rooted in, when no pointer is
    /// followed on the way.
    pub fn root_variable(&self) -> Option<&IdentifierPath> {
        match &self.kind {
            TypedExprKind::Variable(path) => Some(path),
            TypedExprKind::Member {
                base,
                through_pointer: false,
                ..
            } => base.root_variable(),
            _ => None,
        }
    }

    /// Member path from the storage this place lives in down to the place:
    /// from [`TypedExpr::root_variable`], or from the target of the last
    /// pointer followed.
    pub fn member_path(&self) -> IdentifierPath {
        match &self.kind {
            TypedExprKind::Member {
                member,
                through_pointer: true,
                ..
            } => IdentifierPath::root().append(member),
            TypedExprKind::Member { base, member, .. } => base.member_path().append(member),
            _ => IdentifierPath::root(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypedBlock {
    /// Unique scope path; also the lifetime region of the block.
    pub scope: IdentifierPath,
    pub span: Span,
    pub stmts: Vec<TypedStmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypedStmt {
    pub id: NodeId,
    pub span: Span,
    pub kind: TypedStmtKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypedStmtKind {
    VarDecl {
        path: IdentifierPath,
        ty: Type,
        writable: bool,
        value: TypedExpr,
    },
    Assign {
        target: TypedExpr,
        value: TypedExpr,
    },
    Return(Option<TypedExpr>),
    If {
        cond: TypedExpr,
        then_block: TypedBlock,
        else_block: Option<TypedBlock>,
    },
    While {
        cond: TypedExpr,
        body: TypedBlock,
    },
    Block(TypedBlock),
    Expr(TypedExpr),
    /// Re-binds a union variable as one of its members for the rest of the
    /// enclosing block.
    UnionFlowVar {
        path: IdentifierPath,
        target: TypedExpr,
        member: String,
        index: usize,
        ty: Type,
        writable: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypedParam {
    pub path: IdentifierPath,
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypedFunction {
    pub path: IdentifierPath,
    pub span: Span,
    pub params: Vec<TypedParam>,
    pub ret: Type,
    pub body: TypedBlock,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypedGlobal {
    pub path: IdentifierPath,
    pub span: Span,
    pub ty: Type,
    pub writable: bool,
    pub value: TypedExpr,
}
