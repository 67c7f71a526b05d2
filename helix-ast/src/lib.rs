#![forbid(unsafe_code)]

use miette::SourceSpan;

pub type Span = SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            span: self.span,
            node: f(self.node),
        }
    }
}

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

pub type Ident = Spanned<String>;

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub decls: Vec<Decl>,
}

/// Top-level declarations.
#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Function(FunctionDecl),
    Aggregate(AggregateDecl),
    Extern(ExternDecl),
    Global(GlobalDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Function(f) => f.span,
            Decl::Aggregate(a) => a.span,
            Decl::Extern(e) => e.span,
            Decl::Global(g) => g.span,
        }
    }

    pub fn name(&self) -> &Ident {
        match self {
            Decl::Function(f) => &f.name,
            Decl::Aggregate(a) => &a.name,
            Decl::Extern(e) => &e.name,
            Decl::Global(g) => &g.name,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub span: Span,
    pub name: Ident,
    pub params: Vec<Param>,
    pub ret: TypeExpr,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExternDecl {
    pub span: Span,
    pub name: Ident,
    pub params: Vec<Param>,
    pub ret: TypeExpr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub span: Span,
    pub name: Ident,
    pub ty: TypeExpr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AggregateKind {
    Struct,
    Union,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateDecl {
    pub span: Span,
    pub kind: AggregateKind,
    pub name: Ident,
    pub members: Vec<AggregateMember>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateMember {
    pub span: Span,
    pub name: Ident,
    pub ty: TypeExpr,
    pub writable: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GlobalDecl {
    pub span: Span,
    pub name: Ident,
    pub writable: bool,
    pub ty: Option<TypeExpr>,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeExpr {
    pub span: Span,
    pub kind: TypeExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeExprKind {
    Void,
    Int,
    Bool,
    Named(String),
    Pointer { inner: Box<TypeExpr>, writable: bool },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    VarDecl(VarDecl),
    Assign(AssignStmt),
    Return(ReturnStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Block(Block),
    Expr(Expr),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl(v) => v.span,
            Stmt::Assign(a) => a.span,
            Stmt::Return(r) => r.span,
            Stmt::If(i) => i.span,
            Stmt::While(w) => w.span,
            Stmt::For(f) => f.span,
            Stmt::Block(b) => b.span,
            Stmt::Expr(e) => e.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub span: Span,
    pub name: Ident,
    pub writable: bool,
    pub ty: Option<TypeExpr>,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignStmt {
    pub span: Span,
    pub target: Expr,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStmt {
    pub span: Span,
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub span: Span,
    pub cond: Expr,
    pub then_block: Block,
    pub else_block: Option<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhileStmt {
    pub span: Span,
    pub cond: Expr,
    pub body: Block,
}

/// `for id in start .. end do { body }`, inclusive of `end`.
#[derive(Clone, Debug, PartialEq)]
pub struct ForStmt {
    pub span: Span,
    pub id: Ident,
    pub start: Expr,
    pub end: Expr,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    IntLit(i64),
    BoolLit(bool),
    Ident(Ident),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    AddressOf(Box<Expr>),
    Deref(Box<Expr>),
    Member {
        base: Box<Expr>,
        member: Ident,
    },
    Call {
        callee: Ident,
        args: Vec<Expr>,
    },
    /// `new Name { member = value, ... }`
    New {
        name: Ident,
        fields: Vec<(Ident, Expr)>,
    },
    /// `target is member`
    Is {
        target: Box<Expr>,
        member: Ident,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    And,
    Or,
    Xor,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod)
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or | BinOp::Xor)
    }
}
