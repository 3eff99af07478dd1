//! Plain-text helpers shared by the importer and the CMS handlers.

use lazy_static::lazy_static;
use regex::Regex;

/// Number of characters kept in a derived excerpt.
pub const EXCERPT_CHARS: usize = 200;

lazy_static! {
    static ref TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref ENTITY: Regex = Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").unwrap();
}

/// Removes every HTML tag, leaving the text between them untouched.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// Decodes numeric character references and the common named entities.
/// Unknown entities are kept as written.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = match name {
                "nbsp" => Some(' '),
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => name.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Truncates to at most `max` characters, never splitting a UTF-8 sequence.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Derives the excerpt of an HTML body: the first `max` characters of its
/// tag-stripped, entity-decoded text.
pub fn excerpt(html: &str, max: usize) -> String {
    let plain = decode_entities(&strip_tags(html));
    truncate_chars(&plain, max).to_string()
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}
