//! Source offsets attached to fragments and diagnostics.

// Re-export from text-size for compatibility
pub use text_size::TextRange;
pub use text_size::TextSize;

/// The three offsets every declaration fragment records.
///
/// `start` points at the first token of the declaration (metadata excluded
/// unless the caller says otherwise), `name` at the declared identifier, and
/// `end` at the last token.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct DeclarationOffsets {
    pub start: TextSize,
    pub name: TextSize,
    pub end: TextSize,
}

impl DeclarationOffsets {
    #[inline]
    pub fn new(start: impl Into<TextSize>, name: impl Into<TextSize>, end: impl Into<TextSize>) -> Self {
        Self {
            start: start.into(),
            name: name.into(),
            end: end.into(),
        }
    }

    /// Offsets for a synthesized entity that only has a single position.
    #[inline]
    pub fn at(offset: impl Into<TextSize>) -> Self {
        let offset = offset.into();
        Self {
            start: offset,
            name: offset,
            end: offset,
        }
    }

    /// Replace the start offset, keeping name and end.
    #[inline]
    pub fn with_start(self, start: TextSize) -> Self {
        Self { start, ..self }
    }

    /// Replace the end offset, known only once the declaration closes.
    #[inline]
    pub fn with_end(self, end: TextSize) -> Self {
        Self { end, ..self }
    }

    /// The full `start..end` range. Inverted offsets from recovered
    /// parses collapse to an empty range at `start`.
    pub fn range(&self) -> TextRange {
        if self.end < self.start {
            TextRange::empty(self.start)
        } else {
            TextRange::new(self.start, self.end)
        }
    }
}
