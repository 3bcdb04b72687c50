//! # Lexer - Tokenizing List Markup
//!
//! First stage of reading markup: the source is broken into a flat sequence
//! of tokens by the [Logos] lexer generator.
//!
//! [Logos]: https://docs.rs/logos
//!
//! ## Lossless Tokens
//!
//! Every byte of the input appears in exactly one token. Bytes the lexer
//! does not recognise (a lone `<` for example) become [`TokenKind::Text`],
//! so malformed input never aborts lexing:
//!
//! ```
//! use flatlist_markup::lexer::lex;
//!
//! let input = "<ul><li>a < b</li></ul>";
//! let tokens = lex(input);
//!
//! let reconstructed: String = tokens.iter().map(|t| t.text).collect();
//! assert_eq!(input, reconstructed);
//! ```
//!
//! ## Token Design
//!
//! Tags are lexed whole. Attribute splitting happens later in
//! [`parse_start_tag`], which keeps the lexer context-free: Logos cannot
//! switch modes between "inside a tag" and "inside text".

use logos::Logos;

/// Token kinds produced by the Logos lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<name attr="value">` or `<name/>`
    #[regex(r#"<[a-zA-Z][a-zA-Z0-9-]*([^<>"']|"[^"]*"|'[^']*')*>"#)]
    StartTag,

    /// `</name>`
    #[regex(r"</[a-zA-Z][a-zA-Z0-9-]*[ \t\r\n]*>")]
    EndTag,

    /// Comments, doctype and other `<!...>` declarations
    #[regex(r"<![^>]*>")]
    Declaration,

    /// Character data between tags
    #[regex(r"[^<]+")]
    Text,
}

/// A lexed token with its kind and text slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Lex the input into a sequence of tokens.
///
/// Guarantees that all bytes from the input appear in the output tokens.
pub fn lex(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        let text = lexer.slice();
        // Unrecognised bytes (a stray `<`) are plain text
        let kind = result.unwrap_or(TokenKind::Text);
        tokens.push(Token { kind, text });
    }

    tokens
}

/// A start tag split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    /// Lowercased element name
    pub name: String,
    /// Attributes in source order, values entity-decoded
    pub attrs: Vec<(String, String)>,
    /// `<name/>` form
    pub self_closing: bool,
}

/// Split the text of a [`TokenKind::StartTag`] token into name and attributes.
///
/// Attributes without a value (`reversed`) get an empty string value.
pub fn parse_start_tag(text: &str) -> StartTag {
    let inner = text.trim_start_matches('<').trim_end_matches('>');
    let (inner, self_closing) = match inner.strip_suffix('/') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };

    let name_end = inner
        .find(|c: char| c.is_ascii_whitespace())
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();

    let mut attrs = Vec::new();
    let mut rest = inner[name_end..].trim_start();
    while !rest.is_empty() {
        let key_end = rest
            .find(|c: char| c == '=' || c.is_ascii_whitespace())
            .unwrap_or(rest.len());
        let key = rest[..key_end].to_ascii_lowercase();
        rest = rest[key_end..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (raw, remainder) = split_attr_value(after_eq);
            rest = remainder;
            html_escape::decode_html_entities(raw).into_owned()
        } else {
            String::new()
        };

        if !key.is_empty() {
            attrs.push((key, value));
        }
        rest = rest.trim_start();
    }

    StartTag {
        name,
        attrs,
        self_closing,
    }
}

/// Lowercased element name of a start tag token, without splitting the
/// attributes.
pub fn start_tag_name(text: &str) -> String {
    let inner = text.trim_start_matches('<');
    let end = inner
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(inner.len());
    inner[..end].to_ascii_lowercase()
}

/// Element name of an end tag token (`</ul >` → `ul`).
pub fn end_tag_name(text: &str) -> String {
    text.trim_start_matches("</")
        .trim_end_matches('>')
        .trim()
        .to_ascii_lowercase()
}

fn split_attr_value(s: &str) -> (&str, &str) {
    for quote in ['"', '\''] {
        if let Some(body) = s.strip_prefix(quote) {
            return match body.find(quote) {
                Some(end) => (&body[..end], &body[end + 1..]),
                None => (body, ""),
            };
        }
    }
    let end = s.find(|c: char| c.is_ascii_whitespace()).unwrap_or(s.len());
    (&s[..end], &s[end..])
}
