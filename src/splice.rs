use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental rewrite primitive: verified byte-span replacement.
///
/// All composition steps (template inclusion, slot harvesting, slot
/// substitution) compile down to this single primitive. Intelligence lives in
/// span acquisition (the SOM and the selector engine), not in application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Splice does nothing until apply() is called"]
pub struct Splice {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: SpliceVerification,
}

/// Verification strategy for splice safety.
///
/// The expected text is always the node's recorded source slice, so a
/// verification failure means the buffer and the SOM that produced the span
/// have drifted apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpliceVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl SpliceVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            SpliceVerification::ExactMatch(expected) => text == expected,
            SpliceVerification::Hash(expected_hash) => {
                xxh3_64(text.as_bytes()) == *expected_hash
            }
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            SpliceVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            SpliceVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum SpliceError {
    #[error("before-text verification failed at [{byte_start}, {byte_end})")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        found: String,
    },

    #[error("invalid byte range: [{byte_start}, {byte_end}) in buffer of length {buf_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        buf_len: usize,
    },

    #[error("byte offset {offset} is not a char boundary")]
    NotCharBoundary { offset: usize },

    #[error("overlapping splices: [{first_start}, {first_end}) and [{second_start}, ..)")]
    Overlap {
        first_start: usize,
        first_end: usize,
        second_start: usize,
    },
}

impl Splice {
    /// Create a new splice with automatic verification generation.
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: &str,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: SpliceVerification::from_text(expected_before),
        }
    }

    /// Create a splice with an explicit verification strategy.
    pub fn with_verification(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        verification: SpliceVerification,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: verification,
        }
    }

    /// Validate the splice against the current buffer.
    ///
    /// Returns the current text at [byte_start, byte_end) on success.
    fn validate<'a>(&self, source: &'a str) -> Result<&'a str, SpliceError> {
        if self.byte_start > self.byte_end || self.byte_end > source.len() {
            return Err(SpliceError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                buf_len: source.len(),
            });
        }

        for offset in [self.byte_start, self.byte_end] {
            if !source.is_char_boundary(offset) {
                return Err(SpliceError::NotCharBoundary { offset });
            }
        }

        let current = &source[self.byte_start..self.byte_end];

        // Already applied counts as verified
        if current == self.new_text {
            return Ok(current);
        }

        if !self.expected_before.matches(current) {
            return Err(SpliceError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                found: current.to_string(),
            });
        }

        Ok(current)
    }

    /// Apply this splice to a buffer, returning the rewritten text.
    ///
    /// The input buffer is never mutated; untouched bytes are copied through
    /// verbatim.
    pub fn apply(&self, source: &str) -> Result<String, SpliceError> {
        self.validate(source)?;

        let mut out = String::with_capacity(
            source.len() + self.new_text.len() - (self.byte_end - self.byte_start),
        );
        out.push_str(&source[..self.byte_start]);
        out.push_str(&self.new_text);
        out.push_str(&source[self.byte_end..]);
        Ok(out)
    }

    /// Apply multiple splices to one buffer in a single pass.
    ///
    /// Splices are sorted by byte_start descending and applied bottom-to-top
    /// so earlier offsets never shift. Overlapping spans are rejected.
    pub fn apply_all(source: &str, mut splices: Vec<Splice>) -> Result<String, SpliceError> {
        if splices.is_empty() {
            return Ok(source.to_string());
        }

        splices.sort_by(|a, b| b.byte_start.cmp(&a.byte_start));

        // Validate all spans against the original buffer before touching it
        for splice in &splices {
            splice.validate(source)?;
        }

        // Sorted descending: the later-in-buffer splice comes first
        for window in splices.windows(2) {
            let (later, earlier) = (&window[0], &window[1]);
            if earlier.byte_end > later.byte_start {
                return Err(SpliceError::Overlap {
                    first_start: earlier.byte_start,
                    first_end: earlier.byte_end,
                    second_start: later.byte_start,
                });
            }
        }

        let mut text = source.to_string();
        for splice in &splices {
            let mut next = String::with_capacity(
                text.len() + splice.new_text.len() - (splice.byte_end - splice.byte_start),
            );
            next.push_str(&text[..splice.byte_start]);
            next.push_str(&splice.new_text);
            next.push_str(&text[splice.byte_end..]);
            text = next;
        }

        Ok(text)
    }
}
