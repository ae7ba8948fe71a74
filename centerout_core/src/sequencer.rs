//! Cyclic reader over the target-index sequence.
//!
//! The sequence itself is loaded elsewhere; this type only cycles through it
//! and remembers where it came from so the controller can refresh it when a
//! pass completes.

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq)]
pub struct TargetSequencer {
    indices: Vec<usize>,
    pos: usize,
    source: Option<String>,
}

impl TargetSequencer {
    pub fn new(indices: Vec<usize>, source: Option<String>) -> Result<Self, CoreError> {
        if indices.is_empty() {
            return Err(CoreError::EmptySequence);
        }
        Ok(Self {
            indices,
            pos: 0,
            source,
        })
    }

    /// Index of the target in use.
    #[inline]
    pub fn current(&self) -> usize {
        self.indices[self.pos]
    }

    /// Move to the next index, wrapping at the end, and return it.
    pub fn advance(&mut self) -> usize {
        self.pos = (self.pos + 1) % self.indices.len();
        self.current()
    }

    /// True when the last `advance` wrapped back to the start of the sequence.
    #[inline]
    pub fn at_start(&self) -> bool {
        self.pos == 0
    }

    /// Swap in a new sequence; its first index becomes current.
    pub fn replace(&mut self, indices: Vec<usize>, source: Option<String>) -> Result<(), CoreError> {
        *self = Self::new(indices, source)?;
        Ok(())
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}
