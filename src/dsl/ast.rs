//! AST types for the query language.

use std::fmt;

/// A parsed filter query.
///
/// Leaves carry their operands exactly as written, trimmed and with wrapping
/// parentheses removed. Quotes are kept; the compiler strips them.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `field <op> value`
    Comparison {
        op: CompareOp,
        field: String,
        value: String,
    },

    /// `field like pattern`, where `.` matches one character and `.*` any run.
    Like { field: String, pattern: String },

    /// `not expr`
    Not(Box<Expression>),

    /// `expr and expr`
    And(Vec<Expression>),

    /// `expr or expr`
    Or(Vec<Expression>),
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq, // =
    Ne, // <>
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "="),
            CompareOp::Ne => write!(f, "<>"),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Le => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Ge => write!(f, ">="),
        }
    }
}

impl Expression {
    pub fn comparison(op: CompareOp, field: impl Into<String>, value: impl Into<String>) -> Self {
        Expression::Comparison {
            op,
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Expression::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    pub fn not(inner: Expression) -> Self {
        Expression::Not(Box::new(inner))
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::And(vec![left, right])
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Or(vec![left, right])
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Comparison { op, field, value } => write!(f, "{} {} {}", field, op, value),
            Expression::Like { field, pattern } => write!(f, "{} like {}", field, pattern),
            Expression::Not(inner) => write!(f, "not ({})", inner),
            Expression::And(exprs) | Expression::Or(exprs) => {
                let sep = if matches!(self, Expression::And(_)) {
                    " and "
                } else {
                    " or "
                };
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "({})", expr)?;
                }
                Ok(())
            }
        }
    }
}
