use std::io;

use pretty_assertions::assert_eq;
use quill_value::EvalErrorKind;

use super::{compress, Output, OutputSink, WriterSink};

#[test]
fn captures_nest_and_hold_output_back() {
    let mut sink = String::new();
    {
        let mut out = Output::new(&mut sink);
        assert!(out.write("a").is_ok());
        out.begin_capture();
        assert!(out.write("b").is_ok());
        out.begin_capture();
        assert!(out.write("c").is_ok());
        assert_eq!(out.end_capture(), "c");
        let held = out.end_capture();
        assert_eq!(held, "b");
        assert!(out.write(&held).is_ok());
    }
    assert_eq!(sink, "ab");
}

#[test]
fn truncating_drops_abandoned_captures() {
    let mut sink = String::new();
    {
        let mut out = Output::new(&mut sink);
        let depth = out.capture_depth();
        out.begin_capture();
        out.begin_capture();
        assert!(out.write("lost").is_ok());
        out.truncate_captures(depth);
        assert!(out.write("kept").is_ok());
    }
    assert_eq!(sink, "kept");
}

struct BrokenSink;

impl OutputSink for BrokenSink {
    fn write(&mut self, _text: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
    }
}

#[test]
fn sink_failures_are_output_errors() {
    let mut sink = BrokenSink;
    let mut out = Output::new(&mut sink);
    let err = out.write("x").err().map(|e| e.kind);
    assert_eq!(
        err,
        Some(EvalErrorKind::OutputSink {
            message: "pipe closed".to_owned()
        })
    );
}

#[test]
fn writer_sink_writes_bytes() {
    let mut sink = WriterSink::new(Vec::new());
    assert!(sink.write("héllo").is_ok());
    assert!(sink.close().is_ok());
    assert_eq!(sink.into_inner(), "héllo".as_bytes());
}

#[test]
fn compress_collapses_whitespace() {
    assert_eq!(compress("\n  a   b \n\n\t c\n"), "a b\nc\n");
    assert_eq!(compress("   "), "");
    assert_eq!(compress("x"), "x");
}
