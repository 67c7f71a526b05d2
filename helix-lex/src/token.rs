#![forbid(unsafe_code)]

use helix_ast::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Keywords
    KwVar,
    KwLet,
    KwFunc,
    KwExtern,
    KwAs,
    KwIs,
    KwIf,
    KwThen,
    KwElse,
    KwWhile,
    KwDo,
    KwFor,
    KwIn,
    KwStruct,
    KwUnion,
    KwReturn,
    KwNew,
    KwTrue,
    KwFalse,
    KwAnd,
    KwOr,
    KwXor,
    KwNot,
    KwInt,
    KwBool,
    KwVoid,

    // Operators / punctuation
    Eq,
    EqEq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,

    Dot,
    DotDot,
    Comma,
    Semicolon,

    LParen,
    RParen,
    LBrace,
    RBrace,

    Eof,

    // Literals / identifiers
    Ident(String),
    Int(i64),
}

impl TokenKind {
    /// Short human description used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Int(n) => format!("integer `{n}`"),
            TokenKind::Eof => "end of file".to_string(),
            other => format!("`{}`", other.text()),
        }
    }

    fn text(&self) -> &'static str {
        match self {
            TokenKind::KwVar => "var",
            TokenKind::KwLet => "let",
            TokenKind::KwFunc => "func",
            TokenKind::KwExtern => "extern",
            TokenKind::KwAs => "as",
            TokenKind::KwIs => "is",
            TokenKind::KwIf => "if",
            TokenKind::KwThen => "then",
            TokenKind::KwElse => "else",
            TokenKind::KwWhile => "while",
            TokenKind::KwDo => "do",
            TokenKind::KwFor => "for",
            TokenKind::KwIn => "in",
            TokenKind::KwStruct => "struct",
            TokenKind::KwUnion => "union",
            TokenKind::KwReturn => "return",
            TokenKind::KwNew => "new",
            TokenKind::KwTrue => "true",
            TokenKind::KwFalse => "false",
            TokenKind::KwAnd => "and",
            TokenKind::KwOr => "or",
            TokenKind::KwXor => "xor",
            TokenKind::KwNot => "not",
            TokenKind::KwInt => "int",
            TokenKind::KwBool => "bool",
            TokenKind::KwVoid => "void",
            TokenKind::Eq => "=",
            TokenKind::EqEq => "==",
            TokenKind::Neq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Le => "<=",
            TokenKind::Ge => ">=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Amp => "&",
            TokenKind::Dot => ".",
            TokenKind::DotDot => "..",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Eof | TokenKind::Ident(_) | TokenKind::Int(_) => "",
        }
    }
}
