// src/span.rs
//
// Source positions attached to AST nodes and diagnostics.

use miette::SourceSpan;

/// A source position: line/column for humans, byte offset/len for miette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
    pub offset: u32,
    pub len: u32,
}

impl Pos {
    pub fn new(line: u32, col: u32, offset: u32, len: u32) -> Self {
        Self {
            line,
            col,
            offset,
            len,
        }
    }

    /// A position that only carries a line number (hand-built ASTs in tests).
    pub fn at_line(line: u32) -> Self {
        Self {
            line,
            ..Self::default()
        }
    }

    /// Extend this position to cover up to the end of `other`.
    pub fn extend(self, other: Pos) -> Pos {
        let end = (other.offset + other.len).max(self.offset + self.len);
        Pos {
            len: end - self.offset,
            ..self
        }
    }
}

impl From<Pos> for SourceSpan {
    fn from(pos: Pos) -> Self {
        SourceSpan::new((pos.offset as usize).into(), pos.len as usize)
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_covers_both() {
        let a = Pos::new(1, 1, 10, 3);
        let b = Pos::new(1, 9, 18, 4);
        let joined = a.extend(b);
        assert_eq!(joined.offset, 10);
        assert_eq!(joined.len, 12);
    }

    #[test]
    fn source_span_conversion() {
        let span: SourceSpan = Pos::new(2, 5, 42, 7).into();
        assert_eq!(span.offset(), 42);
        assert_eq!(span.len(), 7);
    }
}
