//! Batch assembly on the sampling thread
//!
//! [`BatchAssembler`] buffers archived AC samples for the channels in the
//! current recording mask and cuts them into [`OutgoingBatch`]es. Cutting
//! a batch always advances the rolling sequence counter, whether or not
//! the batch carries any samples.

use crate::relay::OutgoingBatch;
use crate::types::ChannelMask;

/// Result of appending a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum AppendOutcome {
    /// Sample stored
    Appended,
    /// Buffer at capacity; sample discarded
    Dropped,
}

/// Fixed-capacity sample buffer plus the mask and counter that label it
#[derive(Debug)]
pub struct BatchAssembler {
    capacity: usize,
    samples: Vec<u16>,
    mask: ChannelMask,
    sequence: u8,
}

impl BatchAssembler {
    /// Create an empty assembler recording nothing
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: Vec::with_capacity(capacity),
            mask: ChannelMask::NONE,
            sequence: 0,
        }
    }

    /// Store one sample unless the buffer is full
    pub fn append(&mut self, ac: u16) -> AppendOutcome {
        if self.samples.len() >= self.capacity {
            return AppendOutcome::Dropped;
        }
        self.samples.push(ac);
        AppendOutcome::Appended
    }

    /// Cut the buffered samples into a batch labelled with the current mask
    ///
    /// The batch gets an exact-size copy; the assembler keeps its buffer.
    pub fn flush(&mut self) -> OutgoingBatch {
        let batch = OutgoingBatch {
            sequence: self.sequence,
            mask: self.mask,
            samples: self.samples.drain(..).collect(),
        };
        self.sequence = self.sequence.wrapping_add(1);
        batch
    }

    /// Flush under the old mask, then switch to `mask`
    ///
    /// The returned batch is the one cut under the previous mask, so no
    /// batch ever mixes samples recorded under two masks.
    pub fn replace_mask(&mut self, mask: ChannelMask) -> OutgoingBatch {
        let batch = self.flush();
        self.mask = mask;
        batch
    }

    pub fn mask(&self) -> ChannelMask {
        self.mask
    }

    /// Counter the next flush will carry
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
