//! Outbound batch frame
//!
//! Wire layout, all multi-byte fields little-endian:
//!
//! | Offset | Size | Field                      |
//! |--------|------|----------------------------|
//! | 0      | 1    | Rolling sequence counter   |
//! | 1      | 2    | Recording channel mask     |
//! | 3      | 2·n  | `n` AC samples             |
//!
//! The host recovers each sample's channel from the mask: samples are
//! stored in archive order, cycling through the set bits of the mask from
//! lowest to highest.

use crate::error::{FrameError, Result};
use crate::types::ChannelMask;

/// Bytes before the first sample
pub const HEADER_LEN: usize = 3;

/// One flushed batch of archived samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingBatch {
    /// Rolling counter, incremented (mod 256) on every flush
    pub sequence: u8,
    /// Mask in force while these samples were archived
    pub mask: ChannelMask,
    /// AC samples in archive order
    pub samples: Vec<u16>,
}

impl OutgoingBatch {
    /// Serialized size in bytes
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + 2 * self.samples.len()
    }

    /// Serialize to the wire layout
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.push(self.sequence);
        out.extend_from_slice(&self.mask.bits().to_le_bytes());
        for sample in &self.samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }

    /// Parse a frame produced by [`encode`](Self::encode)
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || (bytes.len() - HEADER_LEN) % 2 != 0 {
            return Err(FrameError::TooShort { len: bytes.len() }.into());
        }
        let samples = bytes[HEADER_LEN..]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Self {
            sequence: bytes[0],
            mask: ChannelMask::new(u16::from_le_bytes([bytes[1], bytes[2]])),
            samples,
        })
    }

    /// Pair every sample with the channel it was archived from
    pub fn labelled_samples(&self) -> impl Iterator<Item = (u8, u16)> + '_ {
        let channels: Vec<u8> = self.mask.channels().collect();
        self.samples.iter().enumerate().filter_map(move |(i, &s)| {
            if channels.is_empty() {
                None
            } else {
                Some((channels[i % channels.len()], s))
            }
        })
    }
}
