//! Filter query language over record attributes.
//!
//! Syntax:
//!   field = value             - equality (numeric if both sides are numbers)
//!   field <> value            - inequality
//!   field < n, field >= n ... - ordering comparison
//!   field like pattern        - `.` matches one character, `.*` any run
//!   not expr                  - negation
//!   expr and expr             - AND
//!   expr or expr              - OR (same precedence as AND: leftmost wins)
//!   (expr)                    - grouping
//!   'quoted literal'          - operators inside quotes are plain text;
//!                               '' is a quote inside the literal
//!
//! Operator words are lowercase and never match inside an identifier, so a
//! field named `andalucia` or `color` is safe.

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{Operator, OperatorMatch, Tier, find_next_operator, find_operator, parse_number};
pub use parser::parse;
pub(crate) use lexer::{find_closing_quote, in_word, opens_literal};
