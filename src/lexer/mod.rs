//! Tokenizer: turns a `&str` into a flat `Vec<Token>`, whitespace and
//! comments stripped. Grounded on `crates/apollo-parser/src/lexer/cursor.rs`
//! and `lookup.rs` (char-cursor + const keyword table), generalized for
//! HogQL's richer literal and operator surface (four quote styles, `||`,
//! `??`, `?.`, `?[`, the `=~`/`!~` regex-match family, `:=`).

mod cursor;
mod keywords;
mod token;

pub use keywords::{is_reserved, lookup_keyword, RESERVED};
pub use token::{Token, TokenKind};

use cursor::Cursor;

use crate::error::HogQlError;
use crate::span::Span;

pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Tokenizes the whole input. Lexical errors (an unterminated string, an
    /// unrecognized character) are collected rather than aborting immediately,
    /// matching the teacher's "accumulate errors, let the parser decide what
    /// to do with a ragged token stream" approach — though for this grammar
    /// the first lexical error is always fatal by the time the parser
    /// reaches it, since there is no error-recovery token to resynchronize on.
    pub fn tokenize(&self) -> Result<Vec<Token>, HogQlError> {
        let mut cursor = Cursor::new(self.source);
        let mut tokens = Vec::new();

        loop {
            skip_trivia(&mut cursor);
            let start = cursor.offset();
            if cursor.is_eof() {
                tokens.push(Token::new(TokenKind::Eof, Span::new(start, start)));
                break;
            }
            let kind = advance(&mut cursor, self.source)?;
            let end = cursor.offset();
            tokens.push(Token::new(kind, Span::new(start, end)));
        }

        Ok(tokens)
    }
}

fn skip_trivia(cursor: &mut Cursor) {
    loop {
        match cursor.first() {
            c if c.is_whitespace() => {
                cursor.bump();
            }
            '-' if cursor.second() == '-' => {
                while !cursor.is_eof() && cursor.first() != '\n' {
                    cursor.bump();
                }
            }
            '/' if cursor.second() == '*' => {
                cursor.bump();
                cursor.bump();
                while !cursor.is_eof() && !(cursor.first() == '*' && cursor.second() == '/') {
                    cursor.bump();
                }
                cursor.bump();
                cursor.bump();
            }
            _ => break,
        }
    }
}

fn advance(cursor: &mut Cursor, source: &str) -> Result<TokenKind, HogQlError> {
    let start = cursor.offset();
    let c = cursor.bump().expect("advance called at EOF");

    let kind = match c {
        c if is_ident_start(c) => {
            while is_ident_continue(cursor.first()) {
                cursor.bump();
            }
            let text = &source[start as usize..cursor.offset() as usize];
            lookup_keyword(text).unwrap_or(TokenKind::Ident)
        }
        c if c.is_ascii_digit() => {
            lex_number(cursor);
            let text = &source[start as usize..cursor.offset() as usize];
            if text.contains('.') || text.to_ascii_lowercase().contains('e') {
                TokenKind::FloatLiteral
            } else {
                TokenKind::IntLiteral
            }
        }
        '\'' => {
            lex_quoted(cursor, '\'')?;
            TokenKind::StringLiteral
        }
        '"' => {
            lex_quoted(cursor, '"')?;
            TokenKind::QuotedIdent
        }
        '`' => {
            lex_quoted(cursor, '`')?;
            TokenKind::QuotedIdent
        }
        '+' => TokenKind::Plus,
        '-' if cursor.first() == '>' => {
            cursor.bump();
            TokenKind::Arrow
        }
        '-' => TokenKind::Minus,
        '*' => TokenKind::Star,
        '/' => TokenKind::Slash,
        '%' => TokenKind::Percent,
        '|' if cursor.first() == '|' => {
            cursor.bump();
            TokenKind::Concat
        }
        '=' if cursor.first() == '=' => {
            cursor.bump();
            TokenKind::Eq
        }
        '=' if cursor.first() == '~' && cursor.second() == '*' => {
            cursor.bump();
            cursor.bump();
            TokenKind::IRegexMatch
        }
        '=' if cursor.first() == '~' => {
            cursor.bump();
            TokenKind::RegexMatch
        }
        '=' => TokenKind::Eq,
        '!' if cursor.first() == '=' => {
            cursor.bump();
            TokenKind::NotEq
        }
        '!' if cursor.first() == '~' && cursor.second() == '*' => {
            cursor.bump();
            cursor.bump();
            TokenKind::IRegexNotMatch
        }
        '!' if cursor.first() == '~' => {
            cursor.bump();
            TokenKind::RegexNotMatch
        }
        '<' if cursor.first() == '>' => {
            cursor.bump();
            TokenKind::NotEq
        }
        '<' if cursor.first() == '=' => {
            cursor.bump();
            TokenKind::LtEq
        }
        '<' => TokenKind::Lt,
        '>' if cursor.first() == '=' => {
            cursor.bump();
            TokenKind::GtEq
        }
        '>' => TokenKind::Gt,
        '?' if cursor.first() == '?' => {
            cursor.bump();
            TokenKind::Nullish
        }
        '?' if cursor.first() == '.' => {
            cursor.bump();
            TokenKind::QuestionDot
        }
        '?' if cursor.first() == '[' => {
            cursor.bump();
            TokenKind::QuestionLBracket
        }
        '?' => TokenKind::Question,
        ':' if cursor.first() == '=' => {
            cursor.bump();
            TokenKind::ColonColon
        }
        ':' => TokenKind::Colon,
        '.' => TokenKind::Dot,
        ',' => TokenKind::Comma,
        ';' => TokenKind::Semicolon,
        '(' => TokenKind::LParen,
        ')' => TokenKind::RParen,
        '[' => TokenKind::LBracket,
        ']' => TokenKind::RBracket,
        '{' => TokenKind::LBrace,
        '}' => TokenKind::RBrace,
        other => {
            return Err(HogQlError::syntax(
                format!("Unexpected character: {other:?}"),
                Span::new(start, cursor.offset()),
            ))
        }
    };
    Ok(kind)
}

fn lex_number(cursor: &mut Cursor) {
    while cursor.first().is_ascii_digit() {
        cursor.bump();
    }
    if cursor.first() == '.' && cursor.second().is_ascii_digit() {
        cursor.bump();
        while cursor.first().is_ascii_digit() {
            cursor.bump();
        }
    }
    if matches!(cursor.first(), 'e' | 'E') {
        let mut lookahead = cursor.clone();
        lookahead.bump();
        if matches!(lookahead.first(), '+' | '-') {
            lookahead.bump();
        }
        if lookahead.first().is_ascii_digit() {
            cursor.bump();
            if matches!(cursor.first(), '+' | '-') {
                cursor.bump();
            }
            while cursor.first().is_ascii_digit() {
                cursor.bump();
            }
        }
    }
}

/// Consumes up to and including the matching closing `quote`, honoring
/// `\`-escapes and doubled-quote escapes so an embedded `''`/`""`/` `` ``
/// doesn't end the literal early. Decoding happens later, in
/// `string_literal.rs` — the lexer's only job is finding the right end.
fn lex_quoted(cursor: &mut Cursor, quote: char) -> Result<(), HogQlError> {
    let start = cursor.offset();
    loop {
        if cursor.is_eof() {
            return Err(HogQlError::syntax(
                "Unterminated string literal".to_string(),
                Span::new(start - 1, cursor.offset()),
            ));
        }
        match cursor.first() {
            '\\' => {
                cursor.bump();
                cursor.bump();
            }
            c if c == quote => {
                cursor.bump();
                if cursor.first() == quote {
                    cursor.bump();
                } else {
                    return Ok(());
                }
            }
            _ => {
                cursor.bump();
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            kinds("SeLeCt a FROM b"),
            vec![
                TokenKind::Select,
                TokenKind::Ident,
                TokenKind::From,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn float_vs_int() {
        assert_eq!(kinds("1"), vec![TokenKind::IntLiteral, TokenKind::Eof]);
        assert_eq!(kinds("1.5"), vec![TokenKind::FloatLiteral, TokenKind::Eof]);
        assert_eq!(kinds("1e10"), vec![TokenKind::FloatLiteral, TokenKind::Eof]);
    }

    #[test]
    fn nullish_and_dot_access_operators() {
        assert_eq!(
            kinds("a ?? b"),
            vec![TokenKind::Ident, TokenKind::Nullish, TokenKind::Ident, TokenKind::Eof]
        );
        assert_eq!(
            kinds("a?.b"),
            vec![
                TokenKind::Ident,
                TokenKind::QuestionDot,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn line_and_block_comments_are_skipped() {
        assert_eq!(
            kinds("a -- comment\n+ /* block */ b"),
            vec![
                TokenKind::Ident,
                TokenKind::Plus,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_string_is_syntax_error() {
        let err = Lexer::new("'abc").tokenize().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::SyntaxError);
    }
}
