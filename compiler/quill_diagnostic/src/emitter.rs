//! Human-readable diagnostic output with optional ANSI colors.
//!
//! ```text
//! error[E2001]: `return` outside a macro or function
//!   --> page.ftl:3:5
//!    |
//!  3 |     [#return]
//!    |     ^^^^^^^^^ not inside a macro
//! ```

use std::io::{self, Write};

use crate::span_utils::LineOffsetTable;
use crate::{Diagnostic, Severity};

mod colors {
    pub const ERROR: &str = "\x1b[1;31m";
    pub const WARNING: &str = "\x1b[1;33m";
    pub const NOTE: &str = "\x1b[1;36m";
    pub const BOLD: &str = "\x1b[1m";
    pub const SECONDARY: &str = "\x1b[1;34m";
    pub const RESET: &str = "\x1b[0m";
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Colors when the output is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Source a diagnostic refers to.
#[derive(Copy, Clone, Debug)]
pub struct SourceFile<'a> {
    pub name: &'a str,
    pub text: &'a str,
}

pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn with_color_mode(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter {
            writer,
            colors: mode.should_use_colors(is_tty),
        }
    }

    pub fn stderr(mode: ColorMode, is_tty: bool) -> TerminalEmitter<io::Stderr> {
        TerminalEmitter::with_color_mode(io::stderr(), mode, is_tty)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn paint(&mut self, text: &str, color: &str) -> io::Result<()> {
        if self.colors {
            write!(self.writer, "{color}{text}{}", colors::RESET)
        } else {
            write!(self.writer, "{text}")
        }
    }

    /// Write every diagnostic for one source, followed by a summary line.
    pub fn emit_all(&mut self, source: SourceFile<'_>, diagnostics: &[Diagnostic]) -> io::Result<()> {
        let table = LineOffsetTable::build(source.text);
        for diagnostic in diagnostics {
            self.emit_with_table(source, &table, diagnostic)?;
        }
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        let warnings = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        self.emit_summary(errors, warnings)
    }

    pub fn emit(&mut self, source: SourceFile<'_>, diagnostic: &Diagnostic) -> io::Result<()> {
        let table = LineOffsetTable::build(source.text);
        self.emit_with_table(source, &table, diagnostic)
    }

    fn emit_with_table(
        &mut self,
        source: SourceFile<'_>,
        table: &LineOffsetTable,
        diagnostic: &Diagnostic,
    ) -> io::Result<()> {
        let color = match diagnostic.severity {
            Severity::Error => colors::ERROR,
            Severity::Warning => colors::WARNING,
            Severity::Note => colors::NOTE,
        };
        self.paint(&diagnostic.severity.to_string(), color)?;
        self.paint(&format!("[{}]", diagnostic.code), colors::BOLD)?;
        writeln!(self.writer, ": {}", diagnostic.message)?;

        for label in &diagnostic.labels {
            let at = table.locate(source.text, label.span);
            let marker = if label.is_primary { "-->" } else { ":::" };
            writeln!(self.writer, "  {marker} {}:{at}", source.name)?;

            let Some(line) = table.line_text(source.text, at.line) else {
                continue;
            };
            let gutter = at.line.to_string();
            let pad = " ".repeat(gutter.len());
            writeln!(self.writer, " {pad} |")?;
            writeln!(self.writer, " {gutter} | {line}")?;

            let indent = " ".repeat((at.column - 1) as usize);
            let width = label_width(source.text, label.span.start, label.span.end, line.len());
            let caret = if label.is_primary { "^" } else { "-" };
            write!(self.writer, " {pad} | {indent}")?;
            let underline = format!("{} {}", caret.repeat(width), label.message);
            let label_color = if label.is_primary {
                color
            } else {
                colors::SECONDARY
            };
            self.paint(underline.trim_end(), label_color)?;
            writeln!(self.writer)?;
        }

        for note in &diagnostic.notes {
            write!(self.writer, "  = ")?;
            self.paint("note", colors::BOLD)?;
            writeln!(self.writer, ": {note}")?;
        }
        writeln!(self.writer)
    }

    pub fn emit_summary(&mut self, errors: usize, warnings: usize) -> io::Result<()> {
        match (errors, warnings) {
            (0, 0) => Ok(()),
            (0, w) => {
                self.paint("warning", colors::WARNING)?;
                writeln!(self.writer, ": {w} warning{} emitted", plural_s(w))
            }
            (e, 0) => {
                self.paint("error", colors::ERROR)?;
                writeln!(self.writer, ": template has {e} error{}", plural_s(e))
            }
            (e, w) => {
                self.paint("error", colors::ERROR)?;
                writeln!(
                    self.writer,
                    ": template has {e} error{}; {w} warning{} emitted",
                    plural_s(e),
                    plural_s(w)
                )
            }
        }
    }
}

fn plural_s(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Underline width in characters, clipped to the first line of the span.
fn label_width(source: &str, start: u32, end: u32, line_len: usize) -> usize {
    let start = start as usize;
    let end = (end as usize).min(source.len());
    let text = source.get(start..end).unwrap_or("");
    let first_line = text.split('\n').next().unwrap_or("");
    first_line.chars().count().clamp(1, line_len.max(1))
}
