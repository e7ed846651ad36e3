//! Diagnostics for template compilation.
//!
//! Parse errors and validation problems are reported as [`Diagnostic`]s:
//! - an [`ErrorCode`] for searchability
//! - a message saying what went wrong
//! - a primary label saying where
//! - optional notes
//!
//! The annotator never stops at the first problem; it pushes everything it
//! finds into a [`Problems`] list and hands the whole list back.

mod diagnostic;
pub mod emitter;
mod error_code;
mod problems;
pub mod span_utils;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use problems::Problems;
