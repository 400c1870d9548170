//! Translation between the display wildcards users type (`%`, `_`) and the
//! pattern syntax the query language matches with (`.*`, `.`).
//!
//! Only the operand that follows a `like` keyword is rewritten, so field
//! names and comparison values keep their underscores and dots.

use crate::dsl::{find_closing_quote, in_word, opens_literal};

/// `%` becomes `.*` and `_` becomes `.` in every LIKE pattern.
pub fn display_to_pattern(query: &str) -> String {
    rewrite_like_operands(query, |operand| {
        let mut out = String::with_capacity(operand.len() + 4);
        for ch in operand.chars() {
            match ch {
                '%' => out.push_str(".*"),
                '_' => out.push('.'),
                other => out.push(other),
            }
        }
        out
    })
}

/// Inverse of [`display_to_pattern`], for showing stored queries.
pub fn pattern_to_display(query: &str) -> String {
    rewrite_like_operands(query, |operand| operand.replace(".*", "%").replace('.', "_"))
}

fn rewrite_like_operands(query: &str, rewrite: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(query.len());
    let mut rest = query;
    while let Some(after_keyword) = find_like_keyword(rest) {
        out.push_str(&rest[..after_keyword]);
        rest = &rest[after_keyword..];

        let (lead, operand) = split_operand(rest);
        out.push_str(&rest[..lead]);
        out.push_str(&rewrite(operand));
        rest = &rest[lead + operand.len()..];
    }
    out.push_str(rest);
    out
}

/// Byte offset just past the first standalone `like` outside quotes.
fn find_like_keyword(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        if opens_literal(text, pos) {
            pos = find_closing_quote(text, pos)? + 1;
            continue;
        }
        if bytes[pos..].starts_with(b"like") && !in_word(text, pos, pos + 4) {
            return Some(pos + 4);
        }
        pos += 1;
    }
    None
}

/// Leading whitespace length and the operand after it: a quoted literal, or a
/// run up to the next whitespace or `)`.
fn split_operand(text: &str) -> (usize, &str) {
    let trimmed = text.trim_start();
    let lead = text.len() - trimmed.len();
    let len = if trimmed.starts_with('\'') {
        find_closing_quote(trimmed, 0).map_or(trimmed.len(), |close| close + 1)
    } else {
        trimmed
            .find(|c: char| c.is_whitespace() || c == ')')
            .unwrap_or(trimmed.len())
    };
    (lead, &trimmed[..len])
}
