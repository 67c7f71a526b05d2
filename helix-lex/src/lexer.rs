#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use helix_ast::{Span, span_between};
use logos::Logos;
use miette::Diagnostic;
use thiserror::Error;

use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Diagnostic)]
#[error("lex error: {message}")]
#[diagnostic(code(helix::lex))]
#[allow(unused_assignments)]
pub struct LexError {
    pub message: String,
    #[label]
    pub span: Span,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f\r\n]+")]
#[logos(skip r"//[^\n]*")]
enum RawToken {
    #[token("var")]
    KwVar,
    #[token("let")]
    KwLet,
    #[token("func")]
    KwFunc,
    #[token("extern")]
    KwExtern,
    #[token("as")]
    KwAs,
    #[token("is")]
    KwIs,
    #[token("if")]
    KwIf,
    #[token("then")]
    KwThen,
    #[token("else")]
    KwElse,
    #[token("while")]
    KwWhile,
    #[token("do")]
    KwDo,
    #[token("for")]
    KwFor,
    #[token("in")]
    KwIn,
    #[token("struct")]
    KwStruct,
    #[token("union")]
    KwUnion,
    #[token("return")]
    KwReturn,
    #[token("new")]
    KwNew,
    #[token("true")]
    KwTrue,
    #[token("false")]
    KwFalse,
    #[token("and")]
    KwAnd,
    #[token("or")]
    KwOr,
    #[token("xor")]
    KwXor,
    #[token("not")]
    KwNot,
    #[token("int")]
    KwInt,
    #[token("bool")]
    KwBool,
    #[token("void")]
    KwVoid,

    #[token("==")]
    EqEq,
    #[token("!=")]
    Neq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,

    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    #[regex(r"0x[0-9a-fA-F_]+", |lex| parse_int_prefixed(lex.slice(), 16, 2))]
    #[regex(r"[0-9][0-9_]*", |lex| parse_int_decimal(lex.slice()))]
    Int(Option<i64>),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

fn parse_int_decimal(s: &str) -> Option<i64> {
    let digits = strip_underscores(s)?;
    digits.parse::<i64>().ok()
}

fn parse_int_prefixed(s: &str, radix: u32, prefix_len: usize) -> Option<i64> {
    let rest = s.get(prefix_len..)?;
    let digits = strip_underscores(rest)?;
    i64::from_str_radix(&digits, radix).ok()
}

fn strip_underscores(s: &str) -> Option<String> {
    if s.is_empty() {
        return None;
    }
    if s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return None;
    }
    Some(s.replace('_', ""))
}

pub struct Lexer<'a> {
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src }
    }

    pub fn lex(&self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut lex = RawToken::lexer(self.src);

        while let Some(raw) = lex.next() {
            let range = lex.span();
            let span = span_between(range.start, range.end);

            let kind = match raw {
                Ok(RawToken::KwVar) => TokenKind::KwVar,
                Ok(RawToken::KwLet) => TokenKind::KwLet,
                Ok(RawToken::KwFunc) => TokenKind::KwFunc,
                Ok(RawToken::KwExtern) => TokenKind::KwExtern,
                Ok(RawToken::KwAs) => TokenKind::KwAs,
                Ok(RawToken::KwIs) => TokenKind::KwIs,
                Ok(RawToken::KwIf) => TokenKind::KwIf,
                Ok(RawToken::KwThen) => TokenKind::KwThen,
                Ok(RawToken::KwElse) => TokenKind::KwElse,
                Ok(RawToken::KwWhile) => TokenKind::KwWhile,
                Ok(RawToken::KwDo) => TokenKind::KwDo,
                Ok(RawToken::KwFor) => TokenKind::KwFor,
                Ok(RawToken::KwIn) => TokenKind::KwIn,
                Ok(RawToken::KwStruct) => TokenKind::KwStruct,
                Ok(RawToken::KwUnion) => TokenKind::KwUnion,
                Ok(RawToken::KwReturn) => TokenKind::KwReturn,
                Ok(RawToken::KwNew) => TokenKind::KwNew,
                Ok(RawToken::KwTrue) => TokenKind::KwTrue,
                Ok(RawToken::KwFalse) => TokenKind::KwFalse,
                Ok(RawToken::KwAnd) => TokenKind::KwAnd,
                Ok(RawToken::KwOr) => TokenKind::KwOr,
                Ok(RawToken::KwXor) => TokenKind::KwXor,
                Ok(RawToken::KwNot) => TokenKind::KwNot,
                Ok(RawToken::KwInt) => TokenKind::KwInt,
                Ok(RawToken::KwBool) => TokenKind::KwBool,
                Ok(RawToken::KwVoid) => TokenKind::KwVoid,

                Ok(RawToken::EqEq) => TokenKind::EqEq,
                Ok(RawToken::Neq) => TokenKind::Neq,
                Ok(RawToken::Le) => TokenKind::Le,
                Ok(RawToken::Ge) => TokenKind::Ge,
                Ok(RawToken::Lt) => TokenKind::Lt,
                Ok(RawToken::Gt) => TokenKind::Gt,
                Ok(RawToken::Eq) => TokenKind::Eq,

                Ok(RawToken::Plus) => TokenKind::Plus,
                Ok(RawToken::Minus) => TokenKind::Minus,
                Ok(RawToken::Star) => TokenKind::Star,
                Ok(RawToken::Slash) => TokenKind::Slash,
                Ok(RawToken::Percent) => TokenKind::Percent,
                Ok(RawToken::Amp) => TokenKind::Amp,

                Ok(RawToken::DotDot) => TokenKind::DotDot,
                Ok(RawToken::Dot) => TokenKind::Dot,
                Ok(RawToken::Comma) => TokenKind::Comma,
                Ok(RawToken::Semicolon) => TokenKind::Semicolon,

                Ok(RawToken::LParen) => TokenKind::LParen,
                Ok(RawToken::RParen) => TokenKind::RParen,
                Ok(RawToken::LBrace) => TokenKind::LBrace,
                Ok(RawToken::RBrace) => TokenKind::RBrace,

                Ok(RawToken::Ident(s)) => {
                    // Double-underscore names belong to compiler temporaries.
                    if s.starts_with("__") {
                        return Err(LexError {
                            message: format!("identifier `{s}` is reserved"),
                            span,
                        });
                    }
                    TokenKind::Ident(s)
                }
                Ok(RawToken::Int(Some(n))) => TokenKind::Int(n),
                Ok(RawToken::Int(None)) => {
                    return Err(LexError {
                        message: "invalid integer literal".to_string(),
                        span,
                    });
                }

                Err(_) => {
                    return Err(LexError {
                        message: "unexpected token".to_string(),
                        span,
                    });
                }
            };

            tokens.push(Token { kind, span });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: span_between(self.src.len(), self.src.len()),
        });

        Ok(tokens)
    }
}
