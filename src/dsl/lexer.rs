//! Scanner for the query language.
//!
//! There is no separate token pass: the parser asks the scanner for the
//! leftmost operator of one precedence tier in a raw string. Parenthesised
//! groups and single-quoted literals are skipped as opaque blocks.

use std::fmt;

use winnow::combinator::{alt, opt};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

use super::ast::CompareOp;

/// An operator recognised by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
    Like,
    Compare(CompareOp),
}

impl Operator {
    /// Word operators must stand on their own, not inside an identifier.
    fn is_word(self) -> bool {
        !matches!(self, Operator::Compare(_))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::And => write!(f, "and"),
            Operator::Or => write!(f, "or"),
            Operator::Not => write!(f, "not"),
            Operator::Like => write!(f, "like"),
            Operator::Compare(op) => write!(f, "{}", op),
        }
    }
}

/// Precedence tiers, scanned in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// `and`, `or`
    Logical,
    /// `not`, `like`
    UnaryText,
    /// `=`, `<`, `>`, `<=`, `>=`, `<>`
    Comparison,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Logical, Tier::UnaryText, Tier::Comparison];
}

/// Position of an operator in the scanned string. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorMatch {
    pub op: Operator,
    pub start: usize,
    pub end: usize,
}

type PResult<T> = Result<T, ErrMode<ContextError>>;

fn logical_token(input: &mut &str) -> PResult<Operator> {
    alt(("and".value(Operator::And), "or".value(Operator::Or))).parse_next(input)
}

fn unary_text_token(input: &mut &str) -> PResult<Operator> {
    alt(("not".value(Operator::Not), "like".value(Operator::Like))).parse_next(input)
}

fn comparison_token(input: &mut &str) -> PResult<Operator> {
    alt((
        // Two-char forms first so `<=` never splits as `<` plus `= ...`
        "<=".value(Operator::Compare(CompareOp::Le)),
        ">=".value(Operator::Compare(CompareOp::Ge)),
        "<>".value(Operator::Compare(CompareOp::Ne)),
        "=".value(Operator::Compare(CompareOp::Eq)),
        "<".value(Operator::Compare(CompareOp::Lt)),
        ">".value(Operator::Compare(CompareOp::Gt)),
    ))
    .parse_next(input)
}

/// Try to read a token of `tier` starting exactly at byte `pos`.
fn token_at(text: &str, pos: usize, tier: Tier) -> Option<(Operator, usize)> {
    let mut input = text.get(pos..)?;
    let before = input.len();
    let op = match tier {
        Tier::Logical => logical_token(&mut input),
        Tier::UnaryText => unary_text_token(&mut input),
        Tier::Comparison => comparison_token(&mut input),
    }
    .ok()?;
    Some((op, before - input.len()))
}

/// True when a letter touches either side of `text[start..end]`.
pub(crate) fn in_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.is_some_and(|c| c.is_ascii_alphabetic()) || after.is_some_and(|c| c.is_ascii_alphabetic())
}

/// A `'` opens a literal only at the start of an operand, so apostrophes
/// inside words (`L'Hospitalet`) stay plain text.
pub fn opens_literal(text: &str, pos: usize) -> bool {
    text.as_bytes().get(pos) == Some(&b'\'')
        && !text[..pos]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Index of the `'` closing the literal opened at `open`. A doubled `''`
/// inside the literal is an escaped quote.
pub fn find_closing_quote(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut pos = open + 1;
    while pos < bytes.len() {
        if bytes[pos] == b'\'' {
            if bytes.get(pos + 1) == Some(&b'\'') {
                pos += 2;
                continue;
            }
            return Some(pos);
        }
        pos += 1;
    }
    None
}

/// Index of the `)` matching the `(` at `open`. Quoted literals inside the
/// group are skipped. `None` if the group never closes.
pub fn find_closing_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut pos = open + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\'' if opens_literal(text, pos) => {
                pos = find_closing_quote(text, pos)?;
            }
            b'(' => depth += 1,
            b')' if depth == 0 => return Some(pos),
            b')' => depth -= 1,
            _ => {}
        }
        pos += 1;
    }
    None
}

/// Leftmost operator of `tier` outside parentheses and quotes.
///
/// An unmatched `)` at the top level, or a group or literal that never
/// closes, ends the scan with no match.
pub fn find_operator(text: &str, tier: Tier) -> Option<OperatorMatch> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'(' => {
                pos = find_closing_paren(text, pos)? + 1;
                continue;
            }
            b'\'' if opens_literal(text, pos) => {
                pos = find_closing_quote(text, pos)? + 1;
                continue;
            }
            b')' => return None,
            _ => {}
        }

        if text.is_char_boundary(pos)
            && let Some((op, len)) = token_at(text, pos, tier)
        {
            let end = pos + len;
            if !op.is_word() || !in_word(text, pos, end) {
                return Some(OperatorMatch {
                    op,
                    start: pos,
                    end,
                });
            }
        }
        pos += 1;
    }
    None
}

/// The operator to split on: the leftmost match of the lowest tier that has one.
pub fn find_next_operator(text: &str) -> Option<OperatorMatch> {
    Tier::ALL
        .iter()
        .find_map(|tier| find_operator(text, *tier))
}

fn number(input: &mut &str) -> PResult<f64> {
    let neg = opt('-').parse_next(input)?;
    let digits = take_while(1.., |c: char| c.is_ascii_digit() || c == '.').parse_next(input)?;
    let n: f64 = digits
        .parse()
        .map_err(|_| ErrMode::Backtrack(ContextError::default()))?;
    Ok(if neg.is_some() { -n } else { n })
}

/// Parse a whole string as a decimal number (`12`, `-3.5`). Surrounding
/// whitespace is ignored; anything else makes it text.
pub fn parse_number(text: &str) -> Option<f64> {
    let mut input = text.trim();
    let n = number(&mut input).ok()?;
    input.is_empty().then_some(n)
}
