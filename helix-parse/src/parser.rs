#![forbid(unsafe_code)]

use std::mem;

use helix_ast::{
    AggregateDecl, AggregateKind, AggregateMember, AssignStmt, BinOp, Block, Decl, Expr,
    ExprKind, ExternDecl, ForStmt, FunctionDecl, GlobalDecl, Ident, IfStmt, Param, Program,
    ReturnStmt, Span, Stmt, TypeExpr, TypeExprKind, UnaryOp, VarDecl, WhileStmt, span_between,
};
use helix_lex::{Token, TokenKind};

use crate::error::ParseError;

pub struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, idx: 0 }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut decls = Vec::new();
        while !self.at(TokenKind::Eof) {
            decls.push(self.parse_decl()?);
        }
        Ok(Program { decls })
    }

    fn parse_decl(&mut self) -> Result<Decl, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::KwFunc) => Ok(Decl::Function(self.parse_function()?)),
            Some(TokenKind::KwExtern) => Ok(Decl::Extern(self.parse_extern()?)),
            Some(TokenKind::KwStruct) | Some(TokenKind::KwUnion) => {
                Ok(Decl::Aggregate(self.parse_aggregate()?))
            }
            Some(TokenKind::KwVar) | Some(TokenKind::KwLet) => {
                let v = self.parse_var_decl()?;
                Ok(Decl::Global(GlobalDecl {
                    span: v.span,
                    name: v.name,
                    writable: v.writable,
                    ty: v.ty,
                    value: v.value,
                }))
            }
            _ => Err(self.unexpected("a declaration")),
        }
    }

    fn parse_function(&mut self) -> Result<FunctionDecl, ParseError> {
        let start = self.expect(TokenKind::KwFunc)?;
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        self.expect(TokenKind::KwAs)?;
        let ret = self.parse_type()?;
        let body = self.parse_block()?;
        Ok(FunctionDecl {
            span: join(start.span, body.span),
            name,
            params,
            ret,
            body,
        })
    }

    fn parse_extern(&mut self) -> Result<ExternDecl, ParseError> {
        let start = self.expect(TokenKind::KwExtern)?;
        self.expect(TokenKind::KwFunc)?;
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        self.expect(TokenKind::KwAs)?;
        let ret = self.parse_type()?;
        let end = self.expect(TokenKind::Semicolon)?;
        Ok(ExternDecl {
            span: join(start.span, end.span),
            name,
            params,
            ret,
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let name = self.expect_ident()?;
                self.expect(TokenKind::KwAs)?;
                let ty = self.parse_type()?;
                params.push(Param {
                    span: join(name.span, ty.span),
                    name,
                    ty,
                });
                if !self.at(TokenKind::Comma) {
                    break;
                }
                self.next();
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_aggregate(&mut self) -> Result<AggregateDecl, ParseError> {
        let start = self.expect_any("`struct` or `union`")?;
        let kind = match start.kind {
            TokenKind::KwStruct => AggregateKind::Struct,
            _ => AggregateKind::Union,
        };
        let name = self.expect_ident()?;
        self.expect(TokenKind::LBrace)?;

        let mut members = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let first = self.peek_span().unwrap_or(start.span);
            let writable = self.parse_binding_keyword()?;
            let member_name = self.expect_ident()?;
            self.expect(TokenKind::KwAs)?;
            let ty = self.parse_type()?;
            let end = self.expect(TokenKind::Semicolon)?;
            members.push(AggregateMember {
                span: join(first, end.span),
                name: member_name,
                ty,
                writable,
            });
        }
        self.expect(TokenKind::RBrace)?;
        let end = self.expect(TokenKind::Semicolon)?;

        Ok(AggregateDecl {
            span: join(start.span, end.span),
            kind,
            name,
            members,
        })
    }

    fn parse_binding_keyword(&mut self) -> Result<bool, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::KwVar) => {
                self.next();
                Ok(true)
            }
            Some(TokenKind::KwLet) => {
                self.next();
                Ok(false)
            }
            _ => Err(self.unexpected("`var` or `let`")),
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        let tok = self.expect_any("a type")?;
        let writable = tok.kind == TokenKind::Star;
        let kind = match tok.kind {
            TokenKind::KwInt => TypeExprKind::Int,
            TokenKind::KwBool => TypeExprKind::Bool,
            TokenKind::KwVoid => TypeExprKind::Void,
            TokenKind::Ident(name) => TypeExprKind::Named(name),
            TokenKind::Star | TokenKind::Amp => {
                let inner = self.parse_type()?;
                let span = join(tok.span, inner.span);
                return Ok(TypeExpr {
                    span,
                    kind: TypeExprKind::Pointer {
                        writable,
                        inner: Box::new(inner),
                    },
                });
            }
            other => {
                return Err(ParseError::expected(tok.span, "a type", &other.describe()));
            }
        };
        Ok(TypeExpr {
            span: tok.span,
            kind,
        })
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start = self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.unexpected("`}`"));
            }
            stmts.push(self.parse_stmt()?);
        }
        let end = self.expect(TokenKind::RBrace)?;
        Ok(Block {
            span: join(start.span, end.span),
            stmts,
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::KwVar) | Some(TokenKind::KwLet) => {
                Ok(Stmt::VarDecl(self.parse_var_decl()?))
            }
            Some(TokenKind::KwReturn) => {
                let start = self.expect(TokenKind::KwReturn)?;
                let value = if self.at(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                let end = self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Return(ReturnStmt {
                    span: join(start.span, end.span),
                    value,
                }))
            }
            Some(TokenKind::KwIf) => Ok(Stmt::If(self.parse_if_stmt()?)),
            Some(TokenKind::KwWhile) => Ok(Stmt::While(self.parse_while_stmt()?)),
            Some(TokenKind::KwFor) => Ok(Stmt::For(self.parse_for_stmt()?)),
            Some(TokenKind::LBrace) => Ok(Stmt::Block(self.parse_block()?)),
            _ => {
                let target = self.parse_expr()?;
                if self.at(TokenKind::Eq) {
                    self.next();
                    let value = self.parse_expr()?;
                    let end = self.expect(TokenKind::Semicolon)?;
                    return Ok(Stmt::Assign(AssignStmt {
                        span: join(target.span, end.span),
                        target,
                        value,
                    }));
                }
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(target))
            }
        }
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl, ParseError> {
        let start = self.peek_span().unwrap_or_else(|| span_between(0, 0));
        let writable = self.parse_binding_keyword()?;
        let name = self.expect_ident()?;
        let ty = if self.at(TokenKind::KwAs) {
            self.next();
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr()?;
        let end = self.expect(TokenKind::Semicolon)?;
        Ok(VarDecl {
            span: join(start, end.span),
            name,
            writable,
            ty,
            value,
        })
    }

    fn parse_if_stmt(&mut self) -> Result<IfStmt, ParseError> {
        let start = self.expect(TokenKind::KwIf)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::KwThen)?;
        let then_block = self.parse_block()?;
        let mut span = join(start.span, then_block.span);

        let else_block = if self.at(TokenKind::KwElse) {
            self.next();
            let block = if self.at(TokenKind::KwIf) {
                // `else if` nests the chained `if` in a synthetic block.
                let nested = self.parse_if_stmt()?;
                Block {
                    span: nested.span,
                    stmts: vec![Stmt::If(nested)],
                }
            } else {
                self.parse_block()?
            };
            span = join(span, block.span);
            Some(block)
        } else {
            None
        };

        Ok(IfStmt {
            span,
            cond,
            then_block,
            else_block,
        })
    }

    fn parse_while_stmt(&mut self) -> Result<WhileStmt, ParseError> {
        let start = self.expect(TokenKind::KwWhile)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::KwDo)?;
        let body = self.parse_block()?;
        Ok(WhileStmt {
            span: join(start.span, body.span),
            cond,
            body,
        })
    }

    fn parse_for_stmt(&mut self) -> Result<ForStmt, ParseError> {
        let start = self.expect(TokenKind::KwFor)?;
        let id = self.expect_ident()?;
        self.expect(TokenKind::KwIn)?;
        let from = self.parse_expr()?;
        self.expect(TokenKind::DotDot)?;
        let to = self.parse_expr()?;
        self.expect(TokenKind::KwDo)?;
        let body = self.parse_block()?;
        Ok(ForStmt {
            span: join(start.span, body.span),
            id,
            start: from,
            end: to,
            body,
        })
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or_expr()
    }

    pub fn parse_expr_eof(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        if !self.at(TokenKind::Eof) {
            return Err(self.unexpected("end of input"));
        }
        Ok(expr)
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_xor_expr()?;
        while self.at(TokenKind::KwOr) {
            self.next();
            let right = self.parse_xor_expr()?;
            left = binary(left, BinOp::Or, right);
        }
        Ok(left)
    }

    fn parse_xor_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and_expr()?;
        while self.at(TokenKind::KwXor) {
            self.next();
            let right = self.parse_and_expr()?;
            left = binary(left, BinOp::Xor, right);
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_cmp_expr()?;
        while self.at(TokenKind::KwAnd) {
            self.next();
            let right = self.parse_cmp_expr()?;
            left = binary(left, BinOp::And, right);
        }
        Ok(left)
    }

    fn parse_cmp_expr(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_add_expr()?;

        if self.at(TokenKind::KwIs) {
            self.next();
            let member = self.expect_ident()?;
            return Ok(Expr {
                span: join(left.span, member.span),
                kind: ExprKind::Is {
                    target: Box::new(left),
                    member,
                },
            });
        }

        let op = match self.peek_kind() {
            Some(TokenKind::EqEq) => Some(BinOp::Eq),
            Some(TokenKind::Neq) => Some(BinOp::Ne),
            Some(TokenKind::Lt) => Some(BinOp::Lt),
            Some(TokenKind::Gt) => Some(BinOp::Gt),
            Some(TokenKind::Le) => Some(BinOp::Le),
            Some(TokenKind::Ge) => Some(BinOp::Ge),
            _ => None,
        };

        let Some(op) = op else { return Ok(left) };
        self.next();
        let right = self.parse_add_expr()?;
        let expr = binary(left, op, right);

        if matches!(
            self.peek_kind(),
            Some(
                TokenKind::EqEq
                    | TokenKind::Neq
                    | TokenKind::Lt
                    | TokenKind::Gt
                    | TokenKind::Le
                    | TokenKind::Ge
            )
        ) {
            let span = self.peek_span().unwrap_or(expr.span);
            return Err(ParseError::new(span, "chained comparisons are not supported")
                .with_help("use parentheses or boolean operators"));
        }

        Ok(expr)
    }

    fn parse_add_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => Some(BinOp::Add),
                Some(TokenKind::Minus) => Some(BinOp::Sub),
                _ => None,
            };
            let Some(op) = op else { break };
            self.next();
            let right = self.parse_mul_expr()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_mul_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => Some(BinOp::Mul),
                Some(TokenKind::Slash) => Some(BinOp::Div),
                Some(TokenKind::Percent) => Some(BinOp::Mod),
                _ => None,
            };
            let Some(op) = op else { break };
            self.next();
            let right = self.parse_unary_expr()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        let prefix = match self.peek_kind() {
            Some(TokenKind::Minus) => Prefix::Neg,
            Some(TokenKind::KwNot) => Prefix::Not,
            Some(TokenKind::Amp) => Prefix::AddressOf,
            Some(TokenKind::Star) => Prefix::Deref,
            _ => return self.parse_postfix_expr(),
        };
        let t = self.expect_any("an operator")?;
        let expr = Box::new(self.parse_unary_expr()?);
        let span = join(t.span, expr.span);
        let kind = match prefix {
            Prefix::Neg => ExprKind::Unary {
                op: UnaryOp::Neg,
                expr,
            },
            Prefix::Not => ExprKind::Unary {
                op: UnaryOp::Not,
                expr,
            },
            Prefix::AddressOf => ExprKind::AddressOf(expr),
            Prefix::Deref => ExprKind::Deref(expr),
        };
        Ok(Expr { span, kind })
    }

    fn parse_postfix_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary_expr()?;
        loop {
            if self.at(TokenKind::Dot) {
                self.next();
                let member = self.expect_ident()?;
                expr = Expr {
                    span: join(expr.span, member.span),
                    kind: ExprKind::Member {
                        base: Box::new(expr),
                        member,
                    },
                };
                continue;
            }

            if self.at(TokenKind::LParen) {
                let ExprKind::Ident(callee) = &expr.kind else {
                    return Err(ParseError::new(expr.span, "only named functions can be called"));
                };
                let callee = callee.clone();
                let (args, end) = self.parse_args()?;
                expr = Expr {
                    span: join(expr.span, end),
                    kind: ExprKind::Call { callee, args },
                };
                continue;
            }

            break;
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<(Vec<Expr>, Span), ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.at(TokenKind::Comma) {
                    break;
                }
                self.next();
            }
        }
        let end = self.expect(TokenKind::RParen)?;
        Ok((args, end.span))
    }

    fn parse_new_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(TokenKind::KwNew)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LBrace)?;

        let mut fields = Vec::new();
        if !self.at(TokenKind::RBrace) {
            loop {
                let field = self.expect_ident()?;
                self.expect(TokenKind::Eq)?;
                let value = self.parse_expr()?;
                fields.push((field, value));
                if !self.at(TokenKind::Comma) {
                    break;
                }
                self.next();
            }
        }
        let end = self.expect(TokenKind::RBrace)?;

        Ok(Expr {
            span: join(start.span, end.span),
            kind: ExprKind::New { name, fields },
        })
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::KwNew) => return self.parse_new_expr(),
            Some(TokenKind::LParen) => {
                let start = self.expect(TokenKind::LParen)?;
                let inner = self.parse_expr()?;
                let end = self.expect(TokenKind::RParen)?;
                return Ok(Expr {
                    span: join(start.span, end.span),
                    kind: inner.kind,
                });
            }
            _ => {}
        }

        let tok = self.expect_any("an expression")?;
        let kind = match tok.kind {
            TokenKind::Int(n) => ExprKind::IntLit(n),
            TokenKind::KwTrue => ExprKind::BoolLit(true),
            TokenKind::KwFalse => ExprKind::BoolLit(false),
            TokenKind::Ident(name) => ExprKind::Ident(Ident {
                span: tok.span,
                node: name,
            }),
            other => {
                return Err(ParseError::expected(tok.span, "an expression", &other.describe()));
            }
        };
        Ok(Expr {
            span: tok.span,
            kind,
        })
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.idx) {
            Some(t) => ParseError::expected(t.span, expected, &t.kind.describe()),
            None => ParseError::end_of_input(self.end_span(), expected),
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let tok = self.expect_any("identifier")?;
        match tok.kind {
            TokenKind::Ident(name) => Ok(Ident {
                span: tok.span,
                node: name,
            }),
            other => Err(ParseError::expected(tok.span, "identifier", &other.describe())),
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        let tok = self.expect_any(&expected.describe())?;
        if mem::discriminant(&tok.kind) == mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError::expected(tok.span, &expected.describe(), &tok.kind.describe()))
        }
    }

    fn expect_any(&mut self, expected: &str) -> Result<Token, ParseError> {
        match self.next() {
            Some(tok) => Ok(tok),
            None => Err(ParseError::end_of_input(self.end_span(), expected)),
        }
    }

    /// Zero-width span just past the last token.
    fn end_span(&self) -> Span {
        match self.tokens.last() {
            Some(t) => {
                let end = t.span.offset() + t.span.len();
                span_between(end, end)
            }
            None => span_between(0, 0),
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind()
            .is_some_and(|k| mem::discriminant(k) == mem::discriminant(&kind))
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.idx)?.clone();
        self.idx += 1;
        Some(tok)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.idx).map(|t| &t.kind)
    }

    fn peek_span(&self) -> Option<Span> {
        self.tokens.get(self.idx).map(|t| t.span)
    }
}

enum Prefix {
    Neg,
    Not,
    AddressOf,
    Deref,
}

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    Expr {
        span: join(left.span, right.span),
        kind: ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
    }
}

fn join(a: Span, b: Span) -> Span {
    let a0: usize = a.offset();
    let b0: usize = b.offset();
    let b1 = b0 + b.len();
    if b0 >= a0 {
        span_between(a0, b1.max(a0 + a.len()))
    } else {
        let a1 = a0 + a.len();
        span_between(b0, a1)
    }
}
