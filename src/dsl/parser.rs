//! Parser for the query language.
//!
//! Recursive descent over a shrinking substring. Each call asks the scanner
//! for the leftmost operator of the lowest tier that has one, splits the text
//! around it, and recurses into each side:
//!
//! ```text
//! tier 1 (lowest)   and, or
//! tier 2            not, like
//! tier 3 (highest)  =, <>, <, <=, >, >=
//! ```
//!
//! `and` and `or` share the lowest tier with no mutual precedence: the first
//! one found left to right becomes the root. `a and b and c` therefore parses
//! as `And(a, And(b, c))`, and `x=1 or x=2 and y=3` as `Or(x=1, And(x=2, y=3))`.
//! Use parentheses to group.

use super::ast::Expression;
use super::lexer::{
    Operator, find_closing_paren, find_closing_quote, find_next_operator, opens_literal,
};
use crate::error::FilterError;

/// Deepest nesting of operators and groups a query may have. Every `and`
/// or `or` in a chain adds a level.
pub const MAX_NESTING: usize = 256;

/// Parse a query string into an expression.
pub fn parse(input: &str) -> Result<Expression, FilterError> {
    check_balance(input)?;

    let body = strip_wrapping(input);
    if body.is_empty() {
        return Err(FilterError::malformed(input, "query is empty"));
    }

    let expr = parse_expression(input, body, 0)?;
    tracing::debug!("Parsed query '{}' as {}", input.trim(), expr);
    Ok(expr)
}

fn parse_expression(query: &str, text: &str, depth: usize) -> Result<Expression, FilterError> {
    if depth >= MAX_NESTING {
        return Err(FilterError::malformed(query, "query nests too deeply"));
    }
    let Some(found) = find_next_operator(text) else {
        return Err(FilterError::malformed(
            query,
            format!("no operator in '{}'", text),
        ));
    };

    let left = strip_wrapping(&text[..found.start]);
    let right = strip_wrapping(&text[found.end..]);

    match found.op {
        Operator::And => Ok(Expression::and(
            parse_side(query, left, found.op, depth)?,
            parse_side(query, right, found.op, depth)?,
        )),
        Operator::Or => Ok(Expression::or(
            parse_side(query, left, found.op, depth)?,
            parse_side(query, right, found.op, depth)?,
        )),
        Operator::Not => {
            if !left.is_empty() {
                return Err(FilterError::malformed(
                    query,
                    format!("unexpected '{}' before 'not'", left),
                ));
            }
            Ok(Expression::not(parse_side(query, right, found.op, depth)?))
        }
        Operator::Like => {
            let (field, pattern) = leaf_operands(query, left, right, found.op)?;
            Ok(Expression::like(field, pattern))
        }
        Operator::Compare(op) => {
            let (field, value) = leaf_operands(query, left, right, found.op)?;
            Ok(Expression::comparison(op, field, value))
        }
    }
}

/// An operand of `and`, `or` or `not` must itself be a condition.
fn parse_side(
    query: &str,
    side: &str,
    op: Operator,
    depth: usize,
) -> Result<Expression, FilterError> {
    if side.is_empty() {
        return Err(FilterError::malformed(
            query,
            format!("missing operand for '{}'", op),
        ));
    }
    if find_next_operator(side).is_none() {
        return Err(FilterError::malformed(
            query,
            format!("'{}' is not a condition", side),
        ));
    }
    parse_expression(query, side, depth + 1)
}

/// Both operands of a leaf operator must be present and operator-free.
fn leaf_operands<'a>(
    query: &str,
    left: &'a str,
    right: &'a str,
    op: Operator,
) -> Result<(&'a str, &'a str), FilterError> {
    if left.is_empty() {
        return Err(FilterError::malformed(
            query,
            format!("missing field before '{}'", op),
        ));
    }
    if right.is_empty() {
        return Err(FilterError::malformed(
            query,
            format!("missing value after '{}'", op),
        ));
    }
    for side in [left, right] {
        if let Some(extra) = find_next_operator(side) {
            return Err(FilterError::malformed(
                query,
                format!("unexpected '{}' in operand '{}' of '{}'", extra.op, side, op),
            ));
        }
    }
    Ok((left, right))
}

/// Trim, then drop parentheses that wrap the whole string.
fn strip_wrapping(text: &str) -> &str {
    let mut text = text.trim();
    while text.starts_with('(') && find_closing_paren(text, 0) == Some(text.len() - 1) {
        text = text[1..text.len() - 1].trim();
    }
    text
}

/// Reject unbalanced parentheses and unterminated quotes up front.
fn check_balance(query: &str) -> Result<(), FilterError> {
    let bytes = query.as_bytes();
    let mut depth = 0usize;
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\'' if opens_literal(query, pos) => match find_closing_quote(query, pos) {
                Some(close) => pos = close,
                None => {
                    return Err(FilterError::malformed(
                        query,
                        "unterminated quoted literal",
                    ));
                }
            },
            b'(' => depth += 1,
            b')' if depth == 0 => {
                return Err(FilterError::malformed(
                    query,
                    format!("unmatched ')' at position {}", pos),
                ));
            }
            b')' => depth -= 1,
            _ => {}
        }
        pos += 1;
    }

    if depth > 0 {
        return Err(FilterError::malformed(query, "unclosed '('"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::CompareOp;

    fn cmp(op: CompareOp, field: &str, value: &str) -> Expression {
        Expression::comparison(op, field, value)
    }

    fn is_malformed(input: &str) -> bool {
        matches!(
            parse(input),
            Err(FilterError::MalformedQuery { .. })
        )
    }

    #[test]
    fn test_single_comparison() {
        let ast = parse("nombre = Cadiz").unwrap();
        assert_eq!(ast, cmp(CompareOp::Eq, "nombre", "Cadiz"));
    }

    #[test]
    fn test_two_char_comparisons() {
        assert_eq!(parse("x <= 5").unwrap(), cmp(CompareOp::Le, "x", "5"));
        assert_eq!(parse("x >= 5").unwrap(), cmp(CompareOp::Ge, "x", "5"));
        assert_eq!(parse("x <> 5").unwrap(), cmp(CompareOp::Ne, "x", "5"));
        assert_eq!(parse("x<5").unwrap(), cmp(CompareOp::Lt, "x", "5"));
        assert_eq!(parse("x>5").unwrap(), cmp(CompareOp::Gt, "x", "5"));
    }

    #[test]
    fn test_and_expression() {
        let ast = parse("x = 1 and y = 2").unwrap();
        assert_eq!(
            ast,
            Expression::and(cmp(CompareOp::Eq, "x", "1"), cmp(CompareOp::Eq, "y", "2"))
        );
    }

    #[test]
    fn test_or_expression() {
        let ast = parse("x = 1 or y = 2").unwrap();
        assert_eq!(
            ast,
            Expression::or(cmp(CompareOp::Eq, "x", "1"), cmp(CompareOp::Eq, "y", "2"))
        );
    }

    #[test]
    fn test_not_expression() {
        let ast = parse("not x = 1").unwrap();
        assert_eq!(ast, Expression::not(cmp(CompareOp::Eq, "x", "1")));
    }

    #[test]
    fn test_like_expression() {
        let ast = parse("provincia like 'And.*'").unwrap();
        assert_eq!(ast, Expression::like("provincia", "'And.*'"));
    }

    #[test]
    fn test_chained_and_splits_at_first_operator() {
        let ast = parse("p=1 and q=2 and r=3").unwrap();
        assert_eq!(
            ast,
            Expression::and(
                cmp(CompareOp::Eq, "p", "1"),
                Expression::and(cmp(CompareOp::Eq, "q", "2"), cmp(CompareOp::Eq, "r", "3")),
            )
        );
    }

    #[test]
    fn test_field_containing_operator_word() {
        assert_eq!(
            parse("andalucia = 1").unwrap(),
            cmp(CompareOp::Eq, "andalucia", "1")
        );
        assert_eq!(
            parse("color = rojo or notas = 2").unwrap(),
            Expression::or(
                cmp(CompareOp::Eq, "color", "rojo"),
                cmp(CompareOp::Eq, "notas", "2")
            )
        );
    }

    #[test]
    fn test_parentheses_group_outside_operator() {
        let grouped = parse("(x=1 or x=2) and y=3").unwrap();
        assert_eq!(
            grouped,
            Expression::and(
                Expression::or(cmp(CompareOp::Eq, "x", "1"), cmp(CompareOp::Eq, "x", "2")),
                cmp(CompareOp::Eq, "y", "3"),
            )
        );

        // and/or share a tier: without parentheses the first one found is the root
        let bare = parse("x=1 or x=2 and y=3").unwrap();
        assert_eq!(
            bare,
            Expression::or(
                cmp(CompareOp::Eq, "x", "1"),
                Expression::and(cmp(CompareOp::Eq, "x", "2"), cmp(CompareOp::Eq, "y", "3")),
            )
        );
        assert_ne!(grouped, bare);
    }

    #[test]
    fn test_full_example() {
        let ast =
            parse("nombre = 'Cadiz' and (poblacion > 1000 or not provincia like 'And.*')")
                .unwrap();
        assert_eq!(
            ast,
            Expression::and(
                cmp(CompareOp::Eq, "nombre", "'Cadiz'"),
                Expression::or(
                    cmp(CompareOp::Gt, "poblacion", "1000"),
                    Expression::not(Expression::like("provincia", "'And.*'")),
                ),
            )
        );
    }

    #[test]
    fn test_redundant_parentheses() {
        assert_eq!(
            parse("((x = 1))").unwrap(),
            cmp(CompareOp::Eq, "x", "1")
        );
        assert_eq!(
            parse("(x) = (1)").unwrap(),
            cmp(CompareOp::Eq, "x", "1")
        );
        assert_eq!(
            parse("not (x = 1)").unwrap(),
            Expression::not(cmp(CompareOp::Eq, "x", "1"))
        );
    }

    #[test]
    fn test_quoted_literal_hides_operators() {
        assert_eq!(
            parse("nombre = 'Rio and Mar'").unwrap(),
            cmp(CompareOp::Eq, "nombre", "'Rio and Mar'")
        );
    }

    #[test]
    fn test_apostrophe_in_values() {
        assert_eq!(
            parse("nombre = L'Hospitalet").unwrap(),
            cmp(CompareOp::Eq, "nombre", "L'Hospitalet")
        );
        assert_eq!(
            parse("nombre = 'L''Hospitalet' or x = 1").unwrap(),
            Expression::or(
                cmp(CompareOp::Eq, "nombre", "'L''Hospitalet'"),
                cmp(CompareOp::Eq, "x", "1")
            )
        );
        assert!(is_malformed("nombre = 'L''Hospitalet"));
    }

    #[test]
    fn test_long_chains_fail_cleanly() {
        let chain = |terms: usize| {
            (0..terms)
                .map(|i| format!("x = {}", i))
                .collect::<Vec<_>>()
                .join(" or ")
        };

        assert!(parse(&chain(100)).is_ok());

        let err = parse(&chain(5000)).unwrap_err();
        assert!(
            matches!(err, FilterError::MalformedQuery { ref reason, .. } if reason == "query nests too deeply")
        );

        let nested = format!("{}x = 1{}", "(x = 0 and ".repeat(400), ")".repeat(400));
        assert!(is_malformed(&nested));
    }

    #[test]
    fn test_display_reparses_to_same_tree() {
        let ast = parse("a = 1 and not (b <> 2 or c like x.*)").unwrap();
        assert_eq!(parse(&ast.to_string()).unwrap(), ast);
    }

    #[test]
    fn test_operand_without_operator_is_malformed() {
        assert!(is_malformed("Cadiz"));
        assert!(is_malformed("a and b"));
        assert!(is_malformed("x = 1 and Cadiz"));
    }

    #[test]
    fn test_empty_query_is_malformed() {
        assert!(is_malformed(""));
        assert!(is_malformed("   "));
        assert!(is_malformed("()"));
    }

    #[test]
    fn test_unbalanced_parentheses_are_malformed() {
        assert!(is_malformed("(x = 1 and y = 2"));
        assert!(is_malformed("x = 1) and y = 2"));
        assert!(is_malformed(") x = 1 ("));
        assert!(is_malformed("nombre = 'Cadiz"));
    }

    #[test]
    fn test_missing_operands_are_malformed() {
        assert!(is_malformed("x = "));
        assert!(is_malformed("= 5"));
        assert!(is_malformed("x = 1 and"));
        assert!(is_malformed("or y = 2"));
        assert!(is_malformed("not"));
        assert!(is_malformed("x = = 5"));
    }

    #[test]
    fn test_not_with_left_operand_is_malformed() {
        assert!(is_malformed("provincia not like 'And.*'"));
    }
}
