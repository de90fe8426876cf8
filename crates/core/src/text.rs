//! Text helpers shared by the admin services and the site generator.

use regex::Regex;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern is valid"));

/// Derive a URL-safe slug from a title.
///
/// Only ASCII alphanumerics survive; whitespace, `-` and `_` become separators
/// and runs of separators collapse to a single `-`.
///
/// ```text
/// generate_slug("Hello, World!")      → "hello-world"
/// generate_slug("  Rust  2024 notes") → "rust-2024-notes"
/// ```
pub fn generate_slug(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c)
            } else if c.is_whitespace() || c == '-' || c == '_' {
                Some('-')
            } else {
                None
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Check a slug against `[a-z0-9]+(-[a-z0-9]+)*`
pub fn validate_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// Remove every `<...>` tag, keeping the text between them
pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").into_owned()
}

/// First `max` characters of `s` (character-, not byte-based)
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Plain-text summary of HTML content.
///
/// Tags are stripped. Text of at most `max_len` characters is returned as is;
/// longer text is cut at the last space within the limit (or hard-cut when
/// there is none) and `...` is appended.
pub fn extract_excerpt(content: &str, max_len: usize) -> String {
    let text = strip_tags(content);
    if text.chars().count() <= max_len {
        return text;
    }

    let truncated = truncate_chars(&text, max_len);
    match truncated.rfind(' ') {
        Some(idx) if idx > 0 => format!("{}...", &truncated[..idx]),
        _ => format!("{}...", truncated),
    }
}

/// HTML-escape a string for use in element text or attribute values
///
/// Escapes: & < > " '
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap text in a CDATA section, splitting any embedded `]]>` terminator
pub fn cdata(s: &str) -> String {
    format!("<![CDATA[{}]]>", s.replace("]]>", "]]]]><![CDATA[>"))
}
