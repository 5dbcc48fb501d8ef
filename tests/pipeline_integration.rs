//! Integration tests for response pairing
//!
//! These tests drive the public codec and tracker against transports that
//! model the chip's two-exchange latency:
//! - Warm-up exchanges are discarded
//! - Every later response decodes against the command sent two exchanges earlier
//! - A failed exchange loses only its own response

mod common;

use common::mock_helpers::ScriptedChip;
use rhs_relay::chip::{ChipCommand, ChipTransport, Decoded, Exchange, PipelineTracker, FILLER_COMMAND};
use rhs_relay::{ChannelSample, RelayError, Result};

#[test]
fn test_third_exchange_answers_first_command() {
    let mut chip = ScriptedChip::new(&[0x1234_0055, 0x0000_0020, 0x0000_0020]);
    let mut tracker = PipelineTracker::new();

    let first = tracker.send_and_track(&mut chip, ChipCommand::convert(3)).unwrap();
    let second = tracker.send_and_track(&mut chip, FILLER_COMMAND).unwrap();
    let third = tracker.send_and_track(&mut chip, FILLER_COMMAND).unwrap();

    assert_eq!(first, Exchange::Discarded);
    assert_eq!(second, Exchange::Discarded);
    assert_eq!(
        third,
        Exchange::Paired {
            command: ChipCommand::convert(3),
            decoded: Decoded::Sample {
                channel: 3,
                sample: ChannelSample { ac: 0x1234, dc: 0x0055 },
            },
        }
    );
}

#[test]
fn test_write_acknowledgement_checked_against_own_data() {
    let write = ChipCommand::write_triggered(42, 0x00F0);
    let mut chip = ScriptedChip::new(&[0xFFFF_00F0, 0xFFFF_00F1]);
    let mut tracker = PipelineTracker::new();

    tracker.send_and_track(&mut chip, write).unwrap();
    tracker.send_and_track(&mut chip, ChipCommand::write(43, 0x00F0)).unwrap();
    let acked = tracker.send_and_track(&mut chip, FILLER_COMMAND).unwrap();
    let mismatched = tracker.send_and_track(&mut chip, FILLER_COMMAND).unwrap();

    assert_eq!(acked.decoded(), Some(Decoded::WriteAck { register: 42, ok: true }));
    assert_eq!(mismatched.decoded(), Some(Decoded::WriteAck { register: 43, ok: false }));
}

/// Fails one chosen exchange but keeps the chip's pipeline moving
struct FlakyChip {
    inner: ScriptedChip,
    fail_on: usize,
    count: usize,
}

impl ChipTransport for FlakyChip {
    fn exchange(&mut self, tx: [u8; 4]) -> Result<[u8; 4]> {
        self.count += 1;
        let rx = self.inner.exchange(tx)?;
        if self.count == self.fail_on {
            return Err(RelayError::Transport("bit error".into()));
        }
        Ok(rx)
    }
}

#[test]
fn test_failed_exchange_keeps_alignment() {
    let responses: Vec<u32> = (0..6u32).map(|i| (i + 1) << 16).collect();
    let mut chip = FlakyChip {
        inner: ScriptedChip::new(&responses),
        fail_on: 3,
        count: 0,
    };
    let mut tracker = PipelineTracker::new();

    let mut results = Vec::new();
    for ch in 0..6u8 {
        results.push(tracker.send_and_track(&mut chip, ChipCommand::convert(ch)));
    }
    // Two more exchanges flush the last two responses
    results.push(tracker.send_and_track(&mut chip, FILLER_COMMAND));
    results.push(tracker.send_and_track(&mut chip, FILLER_COMMAND));

    assert!(results[2].is_err());
    assert_eq!(tracker.failures(), 1);
    for (k, result) in results.iter().enumerate().skip(3) {
        let channel = (k - 2) as u8;
        match result {
            Ok(Exchange::Paired {
                decoded: Decoded::Sample { channel: ch, sample },
                ..
            }) => {
                assert_eq!(*ch, channel);
                assert_eq!(sample.ac, u16::from(channel) + 1);
            }
            other => panic!("exchange {}: unexpected {:?}", k, other),
        }
    }
}

#[test]
#[cfg(feature = "mock-chip")]
fn test_full_cycle_against_simulated_chip() {
    use rhs_relay::chip::{SignalPattern, SimulatedChip, AUX_SLOT_COUNT, CHANNEL_COUNT};

    let mut chip = SimulatedChip::new().with_all_patterns(SignalPattern::Ramp { step: 1 });
    let mut tracker = PipelineTracker::new();

    let mut commands = Vec::new();
    for _ in 0..3 {
        commands.extend((0..CHANNEL_COUNT as u8).map(ChipCommand::convert));
        commands.extend(std::iter::repeat(FILLER_COMMAND).take(AUX_SLOT_COUNT));
    }

    let samples: Vec<(u8, u16)> = commands
        .into_iter()
        .filter_map(|cmd| match tracker.send_and_track(&mut chip, cmd).unwrap().decoded() {
            Some(Decoded::Sample { channel, sample }) => Some((channel, sample.ac)),
            _ => None,
        })
        .collect();

    assert_eq!(samples.len(), 3 * CHANNEL_COUNT);
    for (i, (channel, ac)) in samples.iter().enumerate() {
        assert_eq!(*channel as usize, i % CHANNEL_COUNT);
        assert_eq!(*ac as usize, i / CHANNEL_COUNT);
    }
}
