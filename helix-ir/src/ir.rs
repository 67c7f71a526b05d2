#![forbid(unsafe_code)]

//! The low-level, C-shaped tree produced by code generation.
//!
//! Nodes carry flat backend identifiers only; every scoping and naming
//! decision has been made before a node is built, so the textual emitter is a
//! pure function of this tree.

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CType {
    Void,
    Int,
    Bool,
    Named(String),
    Pointer(Box<CType>),
}

impl CType {
    pub fn pointer(inner: CType) -> Self {
        CType::Pointer(Box::new(inner))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CUnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CBinOp {
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

    LogicalAnd,
    LogicalOr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CExpr {
    IntLiteral(i64),
    BoolLiteral(bool),
    Variable(String),
    MemberAccess {
        target: Box<CExpr>,
        member: String,
        /// `->` rather than `.`
        through_pointer: bool,
    },
    AddressOf(Box<CExpr>),
    Deref(Box<CExpr>),
    Unary {
        op: CUnaryOp,
        expr: Box<CExpr>,
    },
    Binary {
        op: CBinOp,
        left: Box<CExpr>,
        right: Box<CExpr>,
    },
    Call {
        target: String,
        args: Vec<CExpr>,
    },
    /// `(T){ .a = x, .b.c = y }`; member names may be dotted designators.
    CompoundLiteral {
        ty: CType,
        members: Vec<(String, CExpr)>,
    },
    /// `a = b` used as an expression, only inside a [`CExpr::Comma`].
    Assign {
        target: Box<CExpr>,
        value: Box<CExpr>,
    },
    /// `(a, b, c)`
    Comma(Vec<CExpr>),
}

impl CExpr {
    pub fn var(name: impl Into<String>) -> Self {
        CExpr::Variable(name.into())
    }

    pub fn member(target: CExpr, member: impl Into<String>, through_pointer: bool) -> Self {
        CExpr::MemberAccess {
            target: Box::new(target),
            member: member.into(),
            through_pointer,
        }
    }

    pub fn binary(op: CBinOp, left: CExpr, right: CExpr) -> Self {
        CExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(expr: CExpr) -> Self {
        CExpr::Unary {
            op: CUnaryOp::Not,
            expr: Box::new(expr),
        }
    }

    pub fn address_of(expr: CExpr) -> Self {
        CExpr::AddressOf(Box::new(expr))
    }

    pub fn deref(expr: CExpr) -> Self {
        CExpr::Deref(Box::new(expr))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CStmt {
    VariableDeclaration {
        name: String,
        ty: CType,
        value: Option<CExpr>,
    },
    Assignment {
        target: CExpr,
        value: CExpr,
    },
    Expression(CExpr),
    Block(Vec<CStmt>),
    If {
        cond: CExpr,
        then_block: Vec<CStmt>,
        else_block: Vec<CStmt>,
    },
    While {
        cond: CExpr,
        body: Vec<CStmt>,
    },
    Break,
    Return(Option<CExpr>),
    Comment(String),
    EmptyLine,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CParameter {
    pub name: String,
    pub ty: CType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CMember {
    pub name: String,
    pub ty: CType,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CDeclaration {
    /// `typedef struct N N;`
    AggregateForward { name: String },
    Struct {
        name: String,
        members: Vec<CMember>,
    },
    /// `struct N { int tag; union { ... } data; };`
    TaggedUnion {
        name: String,
        members: Vec<CMember>,
    },
    FunctionPrototype {
        name: String,
        ret: CType,
        params: Vec<CParameter>,
    },
    Function {
        name: String,
        ret: CType,
        params: Vec<CParameter>,
        body: Vec<CStmt>,
    },
    Global {
        name: String,
        ty: CType,
        value: Option<CExpr>,
    },
    EmptyLine,
}

/// A whole translation unit in emission order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CModule {
    pub declarations: Vec<CDeclaration>,
}

impl CModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decl: CDeclaration) {
        self.declarations.push(decl);
    }

    pub fn forward_declarations(&self) -> impl Iterator<Item = &str> {
        self.declarations.iter().filter_map(|d| match d {
            CDeclaration::AggregateForward { name } => Some(name.as_str()),
            _ => None,
        })
    }
}
