//! Line and column lookup for spans.
//!
//! Render errors and diagnostics report `template:line:column`. A template
//! keeps its source, and a [`LineOffsetTable`] built once per template turns
//! any byte offset into a 1-based line/column pair by binary search.

use std::fmt;

use quill_ir::Span;

/// 1-based line and column (columns count characters, not bytes).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Byte offset of every line start in a source text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineOffsetTable {
    /// `offsets[i]` is where line `i + 1` starts.
    offsets: Vec<u32>,
}

impl LineOffsetTable {
    pub fn build(source: &str) -> Self {
        let mut offsets = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                offsets.push(u32::try_from(i + 1).unwrap_or(u32::MAX));
            }
        }
        LineOffsetTable { offsets }
    }

    /// 1-based line containing `offset`.
    #[inline]
    pub fn line_from_offset(&self, offset: u32) -> u32 {
        let index = match self.offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        u32::try_from(index).unwrap_or(u32::MAX - 1) + 1
    }

    pub fn offset_to_line_col(&self, source: &str, offset: u32) -> LineCol {
        let line = self.line_from_offset(offset);
        let start = self
            .offsets
            .get((line - 1) as usize)
            .copied()
            .unwrap_or(0) as usize;
        let end = (offset as usize).min(source.len());
        let column = source
            .get(start..end)
            .map_or(0, |prefix| prefix.chars().count());
        LineCol {
            line,
            column: u32::try_from(column).unwrap_or(u32::MAX - 1) + 1,
        }
    }

    /// Location of the start of `span`.
    pub fn locate(&self, source: &str, span: Span) -> LineCol {
        self.offset_to_line_col(source, span.start)
    }

    /// Text of the 1-based `line` without its line terminator.
    pub fn line_text<'s>(&self, source: &'s str, line: u32) -> Option<&'s str> {
        let index = line.checked_sub(1)? as usize;
        let start = *self.offsets.get(index)? as usize;
        let end = self
            .offsets
            .get(index + 1)
            .map_or(source.len(), |next| *next as usize);
        source
            .get(start..end)
            .map(|text| text.trim_end_matches(['\n', '\r']))
    }

    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }
}

/// One-off lookup without building a table.
pub fn offset_to_line_col(source: &str, offset: u32) -> LineCol {
    LineOffsetTable::build(source).offset_to_line_col(source, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lc(line: u32, column: u32) -> LineCol {
        LineCol { line, column }
    }

    #[test]
    fn lines_and_columns_are_one_based() {
        let source = "abc\ndefgh\nij";
        let table = LineOffsetTable::build(source);
        assert_eq!(table.offset_to_line_col(source, 0), lc(1, 1));
        assert_eq!(table.offset_to_line_col(source, 2), lc(1, 3));
        assert_eq!(table.offset_to_line_col(source, 4), lc(2, 1));
        assert_eq!(table.offset_to_line_col(source, 7), lc(2, 4));
        assert_eq!(table.offset_to_line_col(source, 10), lc(3, 1));
    }

    #[test]
    fn newline_belongs_to_its_line() {
        let table = LineOffsetTable::build("one\ntwo");
        assert_eq!(table.line_from_offset(3), 1);
        assert_eq!(table.line_from_offset(4), 2);
    }

    #[test]
    fn columns_count_characters() {
        let source = "αβγ\n${δ}";
        let table = LineOffsetTable::build(source);
        assert_eq!(table.offset_to_line_col(source, 4), lc(1, 3));
        assert_eq!(table.locate(source, Span::new(7, 13)), lc(2, 1));
    }

    #[test]
    fn empty_source_has_one_line() {
        let table = LineOffsetTable::build("");
        assert_eq!(table.line_count(), 1);
        assert_eq!(table.offset_to_line_col("", 0), lc(1, 1));
    }

    #[test]
    fn line_text_strips_terminators() {
        let source = "first\r\nsecond\nthird";
        let table = LineOffsetTable::build(source);
        assert_eq!(table.line_text(source, 1), Some("first"));
        assert_eq!(table.line_text(source, 2), Some("second"));
        assert_eq!(table.line_text(source, 3), Some("third"));
        assert_eq!(table.line_text(source, 0), None);
        assert_eq!(table.line_text(source, 4), None);
    }

    #[test]
    fn offset_past_end_clamps() {
        let source = "ab";
        assert_eq!(offset_to_line_col(source, 10), lc(1, 3));
    }

    #[test]
    fn display_is_line_colon_column() {
        assert_eq!(lc(3, 14).to_string(), "3:14");
    }
}
