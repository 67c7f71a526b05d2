#![forbid(unsafe_code)]

mod lexer;
mod token;

pub use lexer::{LexError, Lexer};
pub use token::{Token, TokenKind};

#[cfg(test)]
mod tests {
	use super::*;

	fn kinds(src: &str) -> Vec<TokenKind> {
		Lexer::new(src)
			.lex()
			.unwrap()
			.into_iter()
			.map(|t| t.kind)
			.collect()
	}

	#[test]
	fn lex_keywords_before_identifiers() {
		let ks = kinds("let letter as int");
		assert_eq!(
			ks,
			vec![
				TokenKind::KwLet,
				TokenKind::Ident("letter".to_string()),
				TokenKind::KwAs,
				TokenKind::KwInt,
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn lex_range_and_member_dots() {
		let ks = kinds("for i in 0 .. p.x do {}");
		assert!(ks.contains(&TokenKind::DotDot));
		assert!(ks.contains(&TokenKind::Dot));
		assert_eq!(ks.iter().filter(|k| **k == TokenKind::Dot).count(), 1);
	}

	#[test]
	fn lex_int_literals_with_hex_and_underscores() {
		let ints: Vec<i64> = kinds("1_000 0xFF 7")
			.into_iter()
			.filter_map(|k| match k {
				TokenKind::Int(n) => Some(n),
				_ => None,
			})
			.collect();
		assert_eq!(ints, vec![1000, 255, 7]);
	}

	#[test]
	fn lex_skips_line_comments() {
		let ks = kinds("var x = 1; // trailing words\nx");
		assert_eq!(ks.len(), 7);
		assert_eq!(ks[5], TokenKind::Ident("x".to_string()));
	}

	#[test]
	fn lex_rejects_reserved_identifiers() {
		let err = Lexer::new("var __t_0 = 1;").lex().unwrap_err();
		assert!(err.message.contains("reserved"));
	}

	#[test]
	fn lex_rejects_bad_int_underscore_placement() {
		let err = Lexer::new("var x = 1__0;").lex().unwrap_err();
		assert!(err.message.contains("invalid integer literal"));
	}

	#[test]
	fn lex_rejects_unknown_characters() {
		let err = Lexer::new("var x = 1 $ 2;").lex().unwrap_err();
		assert!(err.message.contains("unexpected token"));
	}

	#[test]
	fn spans_are_absolute_offsets() {
		let tokens = Lexer::new("  func f").lex().unwrap();
		assert_eq!(tokens[0].span.offset(), 2);
		assert_eq!(tokens[0].span.len(), 4);
		assert_eq!(tokens[1].span.offset(), 7);
	}
}
