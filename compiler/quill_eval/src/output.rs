//! Output sinks and render-time output buffering.
//!
//! The sink receives text as it is produced; output already written is never
//! retracted. [`Output`] adds a stack of capture buffers on top of it for the
//! constructs that must hold output back: `[#attempt]` (committed only on
//! success), `[#compress]` (rewritten before it is written), functions and
//! imports (discarded).

use std::io;

use quill_value::{output_sink, EvalError};

/// Destination of rendered text.
pub trait OutputSink {
    fn write(&mut self, text: &str) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputSink for String {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.push_str(text);
        Ok(())
    }
}

/// Sink over any [`io::Write`], writing UTF-8.
pub struct WriterSink<W: io::Write> {
    writer: W,
}

impl<W: io::Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        WriterSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> OutputSink for WriterSink<W> {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes())
    }

    fn close(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

pub(crate) struct Output<'s> {
    sink: &'s mut dyn OutputSink,
    captures: Vec<String>,
}

impl<'s> Output<'s> {
    pub(crate) fn new(sink: &'s mut dyn OutputSink) -> Self {
        Output {
            sink,
            captures: Vec::new(),
        }
    }

    pub(crate) fn write(&mut self, text: &str) -> Result<(), EvalError> {
        if text.is_empty() {
            return Ok(());
        }
        match self.captures.last_mut() {
            Some(buffer) => {
                buffer.push_str(text);
                Ok(())
            }
            None => self
                .sink
                .write(text)
                .map_err(|e| output_sink(e.to_string())),
        }
    }

    /// Start holding output back.
    pub(crate) fn begin_capture(&mut self) {
        self.captures.push(String::new());
    }

    /// Stop the innermost capture and return what it held.
    pub(crate) fn end_capture(&mut self) -> String {
        self.captures.pop().unwrap_or_default()
    }

    /// Number of open captures; restored by `truncate_captures` after a
    /// failed region.
    pub(crate) fn capture_depth(&self) -> usize {
        self.captures.len()
    }

    pub(crate) fn truncate_captures(&mut self, depth: usize) {
        self.captures.truncate(depth);
    }

    pub(crate) fn close(&mut self) -> Result<(), EvalError> {
        self.sink.close().map_err(|e| output_sink(e.to_string()))
    }
}

/// `[#compress]`: drop blank lines, trim lines and collapse inner
/// whitespace runs to one space.
pub(crate) fn compress(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            continue;
        };
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(first);
        for word in words {
            out.push(' ');
            out.push_str(word);
        }
    }
    if !out.is_empty() && text.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests;
