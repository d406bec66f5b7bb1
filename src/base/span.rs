//! Source text positions and ranges.

use std::fmt;

use text_size::TextSize;

/// A row/column position in source text.
///
/// Rows are 1-indexed and columns are 0-indexed, in UTF-8 bytes. This matches
/// the addressing convention of the editor collaborators that supply cursor
/// positions, and the line numbers reported for definitions.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Cursor {
    /// 1-indexed row number.
    pub row: u32,
    /// 0-indexed column (in UTF-8 bytes, not characters).
    pub col: u32,
}

impl Cursor {
    /// Create a new cursor position.
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// A half-open range `[start, end)` of cursor positions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Span {
    pub start: Cursor,
    pub end: Cursor,
}

impl Span {
    /// Create a new span from start and end cursors.
    #[inline]
    pub const fn new(start: Cursor, end: Cursor) -> Self {
        Self { start, end }
    }

    /// Check whether the span contains `cursor` (`start <= cursor < end`).
    #[inline]
    pub fn contains(&self, cursor: Cursor) -> bool {
        self.start <= cursor && cursor < self.end
    }

    /// The smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Index for converting byte offsets into cursor positions.
#[derive(Clone, Debug)]
pub struct LineIndex {
    /// Byte offset of the start of each line.
    line_starts: Vec<TextSize>,
}

impl LineIndex {
    /// Build a line index from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];

        for (offset, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push(TextSize::from((offset + 1) as u32));
            }
        }

        Self { line_starts }
    }

    /// Convert a byte offset to a cursor position.
    pub fn cursor(&self, offset: TextSize) -> Cursor {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);

        let line_start = self.line_starts[line];
        let col: u32 = (offset - line_start).into();

        Cursor {
            row: line as u32 + 1,
            col,
        }
    }

    /// Get the number of lines.
    pub fn len(&self) -> usize {
        self.line_starts.len()
    }

    /// Check if there are no lines (empty file).
    pub fn is_empty(&self) -> bool {
        self.line_starts.is_empty()
    }
}
