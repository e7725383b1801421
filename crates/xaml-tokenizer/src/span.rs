//! Source locations: byte spans, line/column positions and the index that
//! converts between them.

/// A span representing a range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
pub struct Span {
    /// Byte offset of the start (inclusive)
    pub start: u32,
    /// Byte offset of the end (exclusive)
    pub end: u32,
}

impl Span {
    /// Create a new span from start and end byte offsets.
    #[inline]
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Create an empty span at a position.
    #[inline]
    pub fn empty(pos: u32) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Length of this span in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether this span is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Get the source text for this span.
    #[inline]
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start as usize..self.end as usize]
    }
}

impl From<Span> for std::ops::Range<usize> {
    fn from(span: Span) -> Self {
        span.start as usize..span.end as usize
    }
}

/// A 1-based line/column position. Columns count characters, not bytes.
///
/// `Position::default()` (line 0, column 0) means "no position known".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

impl Position {
    /// Create a position from a 1-based line and column.
    #[inline]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Whether this position carries real line information.
    #[inline]
    pub fn is_known(&self) -> bool {
        self.line > 0
    }

    /// The position `chars` characters further along the same line.
    #[inline]
    pub fn advance(self, chars: u32) -> Self {
        Self {
            line: self.line,
            column: self.column + chars,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Maps byte offsets of one source text to line/column positions and back.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset at which each line starts. Always contains `0`.
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    /// Build the index for `source`.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self {
            line_starts,
            len: source.len() as u32,
        }
    }

    /// Number of lines in the source.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Position of the byte at `offset` in `source`.
    ///
    /// `source` must be the text this index was built from.
    pub fn position(&self, source: &str, offset: u32) -> Position {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line] as usize;
        let column = source
            .get(line_start..offset as usize)
            .map(|s| s.chars().count())
            .unwrap_or(0);
        Position::new(line as u32 + 1, column as u32 + 1)
    }

    /// Byte offset of `position` in `source`, clamped to the source length.
    pub fn offset(&self, source: &str, position: Position) -> u32 {
        if !position.is_known() {
            return 0;
        }
        let line = (position.line as usize - 1).min(self.line_starts.len() - 1);
        let line_start = self.line_starts[line] as usize;
        let line_text = &source[line_start..];
        let column = position.column.saturating_sub(1) as usize;
        let within = line_text
            .char_indices()
            .nth(column)
            .map(|(i, _)| i)
            .unwrap_or(line_text.len());
        (line_start + within) as u32
    }
}
