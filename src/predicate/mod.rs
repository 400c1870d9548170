//! Compiled predicates over records.
//!
//! `compile` turns a parsed [`Expression`] into a [`Predicate`], checking
//! every field against the collection's schema and preparing literals and
//! LIKE patterns once. Evaluation is fallible only for ordering comparisons
//! between a numeric field and a non-numeric literal.

mod combine;
mod like;

pub use combine::{CombinationMode, combine};
pub use like::LikePattern;

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::dsl::{CompareOp, Expression, parse_number};
use crate::error::FilterError;
use crate::record::{FieldSchema, Record, Value};

/// A literal operand, unquoted, with its numeric reading if it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub text: String,
    pub number: Option<f64>,
}

impl Literal {
    pub fn new(raw: &str) -> Self {
        let text = unquote(raw).into_owned();
        let number = parse_number(&text);
        Literal { text, number }
    }
}

/// An executable test over a single record.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        field: String,
        op: CompareOp,
        literal: Literal,
    },
    Like {
        field: String,
        pattern: LikePattern,
    },
    Not(Box<Predicate>),
    /// All must hold; evaluated left to right, stops at the first false.
    And(Vec<Predicate>),
    /// Any must hold; evaluated left to right, stops at the first true.
    Or(Vec<Predicate>),
}

/// Compile an expression for a collection with the given fields.
pub fn compile(expr: &Expression, schema: &FieldSchema) -> Result<Predicate, FilterError> {
    let predicate = match expr {
        Expression::Comparison { op, field, value } => Predicate::Compare {
            field: known_field(field, schema)?,
            op: *op,
            literal: Literal::new(value),
        },
        Expression::Like { field, pattern } => Predicate::Like {
            field: known_field(field, schema)?,
            pattern: LikePattern::compile(&unquote(pattern))?,
        },
        Expression::Not(inner) => Predicate::Not(Box::new(compile(inner, schema)?)),
        Expression::And(exprs) => Predicate::And(
            exprs
                .iter()
                .map(|e| compile(e, schema))
                .collect::<Result<_, _>>()?,
        ),
        Expression::Or(exprs) => Predicate::Or(
            exprs
                .iter()
                .map(|e| compile(e, schema))
                .collect::<Result<_, _>>()?,
        ),
    };
    Ok(predicate)
}

fn known_field(raw: &str, schema: &FieldSchema) -> Result<String, FilterError> {
    let field = unquote(raw);
    if schema.contains(&field) {
        Ok(field.into_owned())
    } else {
        Err(FilterError::UnknownField {
            field: field.into_owned(),
        })
    }
}

/// Strip one pair of surrounding single quotes; `''` inside them is a quote.
fn unquote(raw: &str) -> Cow<'_, str> {
    match raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
    {
        Some(inner) if inner.contains("''") => Cow::Owned(inner.replace("''", "'")),
        Some(inner) => Cow::Borrowed(inner),
        None => Cow::Borrowed(raw),
    }
}

impl Predicate {
    /// Test one record. A field the record lacks reads as null.
    pub fn evaluate(&self, record: &Record) -> Result<bool, FilterError> {
        match self {
            Predicate::Compare { field, op, literal } => {
                let value = record.get(field).unwrap_or(&Value::Null);
                compare(field, *op, value, literal)
            }
            Predicate::Like { field, pattern } => Ok(record
                .get(field)
                .and_then(Value::as_text)
                .is_some_and(|text| pattern.is_match(&text))),
            Predicate::Not(inner) => Ok(!inner.evaluate(record)?),
            Predicate::And(preds) => {
                for pred in preds {
                    if !pred.evaluate(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(preds) => {
                for pred in preds {
                    if pred.evaluate(record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

fn compare(field: &str, op: CompareOp, value: &Value, literal: &Literal) -> Result<bool, FilterError> {
    match op {
        CompareOp::Eq => Ok(equals(value, literal)),
        CompareOp::Ne => Ok(!equals(value, literal)),
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            let Some(ordering) = order(field, value, literal)? else {
                return Ok(false);
            };
            Ok(match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
    }
}

/// Numeric equality when both sides are numbers, exact text otherwise.
fn equals(value: &Value, literal: &Literal) -> bool {
    if let (Some(actual), Some(expected)) = (value.as_number(), literal.number) {
        return actual == expected;
    }
    value.as_text().is_some_and(|text| text == literal.text)
}

/// Ordering of the field value against the literal. Null orders against
/// nothing (`None`); a numeric field against a text literal is a mismatch.
fn order(field: &str, value: &Value, literal: &Literal) -> Result<Option<Ordering>, FilterError> {
    match (value, value.as_number(), literal.number) {
        (Value::Null, _, _) => Ok(None),
        (_, Some(actual), Some(expected)) => {
            actual
                .partial_cmp(&expected)
                .map(Some)
                .ok_or_else(|| FilterError::TypeMismatch {
                    field: field.to_string(),
                    detail: format!("{} cannot be ordered against {}", actual, expected),
                })
        }
        (Value::Number(n), _, _) => Err(FilterError::TypeMismatch {
            field: field.to_string(),
            detail: format!("number {} compared with text '{}'", n, literal.text),
        }),
        (Value::String(text), _, _) => Ok(Some(text.as_str().cmp(literal.text.as_str()))),
    }
}
