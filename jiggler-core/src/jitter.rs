//! Deterministic jitter applied to the nudge interval.
//!
//! A fixed table keeps the interval from looking perfectly periodic without
//! pulling in an RNG. The cursor advances once per cycle and wraps.

/// Offsets in seconds added to the base interval, one per cycle.
pub const DEFAULT_OFFSETS: [i8; 16] = [22, -5, -25, 14, -28, 28, -22, 16, -6, 8, 1, -5, 11, -17, 7, 3];

/// Cyclic cursor over a table of signed offsets.
#[derive(Clone, Debug)]
pub struct JitterSequence {
    offsets: &'static [i8],
    cursor: usize,
}

impl JitterSequence {
    /// Creates a sequence over `offsets`, starting at the first entry.
    ///
    /// An empty table yields a constant zero offset.
    #[must_use]
    pub const fn new(offsets: &'static [i8]) -> Self {
        Self { offsets, cursor: 0 }
    }

    /// Offset the next call to [`next_offset`](Self::next_offset) will return.
    #[must_use]
    pub fn peek(&self) -> i8 {
        self.offsets.get(self.cursor).copied().unwrap_or(0)
    }

    /// Number of offsets drawn so far, modulo the table length.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Period of the sequence.
    #[must_use]
    pub const fn period(&self) -> usize {
        self.offsets.len()
    }

    /// Returns the current offset and advances the cursor.
    pub fn next_offset(&mut self) -> i8 {
        let offset = self.peek();
        if !self.offsets.is_empty() {
            self.cursor = (self.cursor + 1) % self.offsets.len();
        }
        offset
    }

    /// Draws the next offset and applies it to `base_secs`, clamping at zero.
    pub fn next_delay(&mut self, base_secs: u16) -> u32 {
        let delay = i32::from(base_secs) + i32::from(self.next_offset());
        u32::try_from(delay).unwrap_or(0)
    }
}

impl Default for JitterSequence {
    fn default() -> Self {
        Self::new(&DEFAULT_OFFSETS)
    }
}
