//! String & literal decoding (spec §4.1).
//!
//! Ported from the common-escape-table behavior of the reference
//! `hogql_parser`'s `unquote_string` (see
//! `examples/original_source/hogql_parser/string.cpp`), expressed without
//! the quote-then-unescape ordering bugs that `boost::replace_all` chains
//! are prone to (each escape is applied once, left to right, over the
//! *already quote-unescaped* text, exactly as the source does).

use crate::error::HogQlError;
use crate::span::Span;

/// Strips matching outer quotes (`'…'`, `"…"`, `` `…` ``, `{…}`), un-doubles
/// the quote character, un-backslash-escapes it, then applies the common
/// escape table. `span` is used only to locate a raised error.
pub fn parse_string_literal_text(text: &str, span: Span) -> Result<String, HogQlError> {
    if text.len() < 2 {
        return Err(HogQlError::syntax(
            format!("Invalid string literal, too short: {text:?}"),
            span,
        ));
    }
    let bytes = text.as_bytes();
    let first = bytes[0];
    let last = bytes[bytes.len() - 1];
    let quote = match (first, last) {
        (b'\'', b'\'') => '\'',
        (b'"', b'"') => '"',
        (b'`', b'`') => '`',
        (b'{', b'}') => return parse_brace_quoted(text, span),
        _ => {
            return Err(HogQlError::syntax(
                format!(
                    "Invalid string literal, must start and end with the same quote type: {text}"
                ),
                span,
            ))
        }
    };
    let inner = &text[1..text.len() - 1];
    let unquoted = undouble_and_unescape_quote(inner, quote);
    Ok(apply_common_escapes(&unquoted))
}

/// `{…}`-quoted text un-escapes `{{` and `\{` rather than a doubled/escaped
/// quote character, then still applies the common escape table.
fn parse_brace_quoted(text: &str, _span: Span) -> Result<String, HogQlError> {
    let inner = &text[1..text.len() - 1];
    let unquoted = inner.replace("{{", "{").replace("\\{", "{");
    Ok(apply_common_escapes(&unquoted))
}

/// Decoder for segments embedded in template strings (spec §4.1's second
/// operation). Always un-escapes `\{` to `{`; additionally handles `''` and
/// `\'` when `escape_quotes` is set (used for segments that sit inside a
/// single-quoted template string).
pub fn parse_string_text_ctx(text: &str, escape_quotes: bool) -> String {
    let mut unquoted = text.replace("\\{", "{");
    if escape_quotes {
        unquoted = unquoted.replace("''", "'").replace("\\'", "'");
    }
    apply_common_escapes(&unquoted)
}

fn undouble_and_unescape_quote(text: &str, quote: char) -> String {
    let doubled: String = std::iter::once(quote).chain(std::iter::once(quote)).collect();
    let escaped: String = std::iter::once('\\').chain(std::iter::once(quote)).collect();
    text.replace(doubled.as_str(), &quote.to_string())
        .replace(escaped.as_str(), &quote.to_string())
}

/// The common C-style escape table shared by both decoder entry points.
/// `\0` is dropped silently (NUL characters are not representable in the
/// JSON string output and carry no information for HogQL's purposes).
fn apply_common_escapes(text: &str) -> String {
    text.replace("\\a", "\u{07}")
        .replace("\\b", "\u{08}")
        .replace("\\f", "\u{0C}")
        .replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\t", "\t")
        .replace("\\v", "\u{0B}")
        .replace("\\0", "")
        .replace("\\\\", "\\")
}

/// Decodes a backtick- or double-quoted identifier (spec §4.4). Bare
/// identifiers never reach this function — their literal text is used
/// as-is.
pub fn parse_identifier_text(text: &str, span: Span) -> Result<String, HogQlError> {
    parse_string_literal_text(text, span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(0, 0)
    }

    #[test]
    fn strips_single_quotes_and_undoubles() {
        assert_eq!(parse_string_literal_text("'it''s'", span()).unwrap(), "it's");
    }

    #[test]
    fn strips_double_quotes_and_unescapes() {
        assert_eq!(
            parse_string_literal_text(r#""a\"b""#, span()).unwrap(),
            "a\"b"
        );
    }

    #[test]
    fn backtick_identifier() {
        assert_eq!(parse_string_literal_text("`col name`", span()).unwrap(), "col name");
    }

    #[test]
    fn brace_quoted_unescapes_braces() {
        assert_eq!(parse_string_literal_text("{a\\{b}", span()).unwrap(), "a{b");
    }

    #[test]
    fn common_escape_table() {
        assert_eq!(
            parse_string_literal_text("'a\\nb\\tc'", span()).unwrap(),
            "a\nb\tc"
        );
    }

    #[test]
    fn nul_escape_is_dropped() {
        assert_eq!(parse_string_literal_text("'a\\0b'", span()).unwrap(), "ab");
    }

    #[test]
    fn mismatched_quotes_is_syntax_error() {
        let err = parse_string_literal_text("'abc\"", span()).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::SyntaxError);
    }

    #[test]
    fn decoder_idempotent_round_trip() {
        for (quote, s) in [('\'', "plain"), ('"', "plain"), ('`', "plain")] {
            let doubled = s.replace(quote, &format!("{quote}{quote}"));
            let quoted = format!("{quote}{doubled}{quote}");
            assert_eq!(parse_string_literal_text(&quoted, span()).unwrap(), s);
        }
    }
}
