//! Core value types shared by the sampler and the relay
//!
//! - [`ChannelSample`] - Decoded CONVERT result for one channel
//! - [`ChannelMask`] - Which channels are archived into outgoing batches
//! - [`SamplerStats`] / [`RelayStats`] - Counters reported by the workers

use crate::chip::CHANNEL_COUNT;
use serde::{Deserialize, Serialize};

/// Decoded CONVERT result: 10-bit DC amplifier and 16-bit AC amplifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelSample {
    /// DC low-gain amplifier value (10 bits)
    pub dc: u16,
    /// AC amplifier value
    pub ac: u16,
}

impl ChannelSample {
    /// Split a CONVERT response word: AC in bits 31..16, DC in bits 9..0
    pub const fn from_response(raw: u32) -> Self {
        Self {
            dc: (raw & 0x03FF) as u16,
            ac: (raw >> 16) as u16,
        }
    }
}

/// 16-bit bitmap of archived channels; bit *n* selects channel *n*
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelMask(u16);

impl ChannelMask {
    /// No channel archived
    pub const NONE: Self = Self(0);
    /// Every channel archived
    pub const ALL: Self = Self(0xFFFF);

    /// Wrap a raw bitmap
    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw bitmap
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Whether `channel` is archived under this mask
    pub const fn contains(self, channel: u8) -> bool {
        (channel as usize) < CHANNEL_COUNT && self.0 & (1 << channel) != 0
    }

    /// Number of archived channels
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate archived channels in ascending order
    pub fn channels(self) -> impl Iterator<Item = u8> {
        (0..CHANNEL_COUNT as u8).filter(move |&c| self.contains(c))
    }
}

impl std::fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Counters kept by the sampling thread
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerStats {
    /// Completed 20-exchange sampling cycles
    pub cycles: u64,
    /// Chip exchanges attempted (including bring-up)
    pub exchanges: u64,
    /// Exchanges whose transport call failed
    pub transport_failures: u64,
    /// WRITE responses that did not echo the written data
    pub write_mismatches: u64,
    /// Samples dropped because the batch was full
    pub batch_overflows: u64,
    /// Batches handed to the outbound queue
    pub flushes: u64,
    /// Batches dropped because the outbound queue was full
    pub outbound_drops: u64,
    /// Host requests turned into slot commands or state changes
    pub host_requests_applied: u64,
    /// Host requests ignored (unknown opcode, short payload, bad channel)
    pub host_requests_rejected: u64,
    /// Stimulation sequencer ticks
    pub stim_ticks: u64,
}

/// Counters kept by the relay thread
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStats {
    /// Frames handed to the host link successfully
    pub frames_sent: u64,
    /// Frames the host link failed to send
    pub send_failures: u64,
    /// Bytes handed to the host link successfully
    pub bytes_sent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_is_a_bitmap() {
        let mask = ChannelMask::new(0x0003);
        assert!(mask.contains(0));
        assert!(mask.contains(1));
        assert!(!mask.contains(2));
        assert!(!mask.contains(3));
        assert_eq!(mask.count(), 2);
        assert_eq!(mask.channels().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_mask_out_of_range_channel() {
        assert!(!ChannelMask::ALL.contains(16));
        assert!(!ChannelMask::ALL.contains(63));
    }

    #[test]
    fn test_mask_display() {
        assert_eq!(ChannelMask::new(0x00A5).to_string(), "0x00A5");
    }

    #[test]
    fn test_sample_from_response_ignores_reserved_bits() {
        let sample = ChannelSample::from_response(0x1234_FC01);
        assert_eq!(sample.dc, 0x001);
        assert_eq!(sample.ac, 0x1234);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = SamplerStats {
            cycles: 3,
            ..Default::default()
        };
        let json = serde_json::to_string(&stats).unwrap();
        let parsed: SamplerStats = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, stats);
    }
}
