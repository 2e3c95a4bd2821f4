//! HTML to plain text

use regex_lite::{Captures, Regex};
use std::sync::OnceLock;

struct Patterns {
    hidden: Regex,
    comment: Regex,
    tag: Regex,
    entity: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        hidden: Regex::new(r"(?is)<(script|style|template)\b[^>]*>.*?</(script|style|template)\s*>")
            .expect("valid hidden-element pattern"),
        comment: Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"),
        // A bare `<` followed by a space or digit is text, not a tag
        tag: Regex::new(r"<[A-Za-z/!?][^>]*>").expect("valid tag pattern"),
        entity: Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});")
            .expect("valid entity pattern"),
    })
}

/// Strip all markup from `html`, keeping the text nodes in document order.
///
/// Script, style and template bodies are dropped, character references are
/// decoded and whitespace is left untouched.
pub fn strip_markup(html: &str) -> String {
    let p = patterns();
    let text = p.hidden.replace_all(html, "");
    let text = p.comment.replace_all(&text, "");
    let text = p.tag.replace_all(&text, "");
    p.entity
        .replace_all(&text, |caps: &Captures| {
            decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "shy" => "\u{ad}",
        "laquo" => "«",
        "raquo" => "»",
        "ndash" => "–",
        "mdash" => "—",
        "hellip" => "…",
        "deg" => "°",
        "plusmn" => "±",
        "times" => "×",
        "micro" => "µ",
        "middot" => "·",
        "bull" => "•",
        "le" => "≤",
        "ge" => "≥",
        "copy" => "©",
        "reg" => "®",
        _ => return None,
    };
    Some(decoded.to_string())
}
