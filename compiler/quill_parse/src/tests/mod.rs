//! Parser tests.
//!
//! - `expressions`: literals, operators, precedence and postfix forms
//! - `content`: text, directives, calls and their error cases

mod expressions;
