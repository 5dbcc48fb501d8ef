//! Periodic stimulation sequencer
//!
//! At most once per interval the sequencer writes the next phase of a
//! three-phase cycle into the auxiliary slots:
//!
//! | Phase                | Slot 0           | Slot 1           |
//! |----------------------|------------------|------------------|
//! | `NegativePolarityOn` | polarity ← 0x0000 | stim-on ← 0xFFFF |
//! | `PositivePolarityOn` | polarity ← 0xFFFF | stim-on ← 0xFFFF |
//! | `AllOff`             | untouched         | stim-on ← 0x0000 |
//!
//! Slots 2 and 3 reprogram the positive current magnitude of up to two
//! configured channels. Stimulation writes take precedence over any host
//! request already placed in the same slot.

use super::AuxSlots;
use crate::chip::{regs, ChipCommand, CHANNEL_COUNT, CURRENT_MAGNITUDE_SIGN};
use crate::config::{StimulationConfig, MAX_STIM_CHANNELS};
use std::time::{Duration, Instant};

/// First slot used for magnitude writes
const MAGNITUDE_SLOT: usize = 2;

/// Stimulation phase, programmed in this order and then repeated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StimPhase {
    NegativePolarityOn,
    PositivePolarityOn,
    AllOff,
}

impl StimPhase {
    /// Phase that follows this one
    pub fn next(self) -> Self {
        match self {
            StimPhase::NegativePolarityOn => StimPhase::PositivePolarityOn,
            StimPhase::PositivePolarityOn => StimPhase::AllOff,
            StimPhase::AllOff => StimPhase::NegativePolarityOn,
        }
    }
}

/// Time-driven three-phase stimulation state machine
#[derive(Debug)]
pub struct StimSequencer {
    enabled: bool,
    interval: Duration,
    magnitude: u8,
    channels: Vec<u8>,
    next_phase: StimPhase,
    last_tick: Option<Instant>,
}

impl StimSequencer {
    /// Build from config, keeping only the first [`MAX_STIM_CHANNELS`] valid channels
    pub fn new(config: &StimulationConfig) -> Self {
        let mut channels = Vec::with_capacity(MAX_STIM_CHANNELS);
        for &channel in &config.channels {
            if channel as usize >= CHANNEL_COUNT {
                tracing::warn!("Ignoring out-of-range stimulation channel {}", channel);
            } else if channels.len() == MAX_STIM_CHANNELS {
                tracing::warn!("Ignoring stimulation channel {} (slots full)", channel);
            } else {
                channels.push(channel);
            }
        }
        Self {
            enabled: config.enabled,
            interval: config.interval(),
            magnitude: config.magnitude,
            channels,
            next_phase: StimPhase::NegativePolarityOn,
            last_tick: None,
        }
    }

    /// Program the next phase into `slots` if the interval has elapsed
    ///
    /// The first call after construction always ticks. Returns the phase
    /// that was programmed.
    pub fn tick(&mut self, now: Instant, slots: &mut AuxSlots) -> Option<StimPhase> {
        if !self.enabled {
            return None;
        }
        if let Some(last) = self.last_tick {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }

        let phase = self.next_phase;
        match phase {
            StimPhase::NegativePolarityOn => {
                slots[0] = Some(ChipCommand::write_triggered(regs::STIM_POLARITY_TRIGGERED, 0x0000));
                slots[1] = Some(ChipCommand::write_triggered(regs::STIM_ON_TRIGGERED, 0xFFFF));
            }
            StimPhase::PositivePolarityOn => {
                slots[0] = Some(ChipCommand::write_triggered(regs::STIM_POLARITY_TRIGGERED, 0xFFFF));
                slots[1] = Some(ChipCommand::write_triggered(regs::STIM_ON_TRIGGERED, 0xFFFF));
            }
            StimPhase::AllOff => {
                slots[1] = Some(ChipCommand::write_triggered(regs::STIM_ON_TRIGGERED, 0x0000));
            }
        }

        let magnitude = CURRENT_MAGNITUDE_SIGN | u16::from(self.magnitude);
        for (slot, &channel) in slots[MAGNITUDE_SLOT..].iter_mut().zip(&self.channels) {
            *slot = Some(ChipCommand::write_triggered(
                regs::POS_CURRENT_MAGNITUDE_BASE + channel,
                magnitude,
            ));
        }

        tracing::debug!("Stimulation phase {:?}", phase);
        self.next_phase = phase.next();
        self.last_tick = Some(now);
        Some(phase)
    }

    /// Phase the next tick will program
    pub fn next_phase(&self) -> StimPhase {
        self.next_phase
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequencer() -> StimSequencer {
        StimSequencer::new(&StimulationConfig::default())
    }

    #[test]
    fn test_first_tick_is_unconditional() {
        let mut stim = sequencer();
        let mut slots = AuxSlots::default();
        assert_eq!(
            stim.tick(Instant::now(), &mut slots),
            Some(StimPhase::NegativePolarityOn)
        );
        assert_eq!(
            slots[0],
            Some(ChipCommand::write_triggered(regs::STIM_POLARITY_TRIGGERED, 0x0000))
        );
        assert_eq!(
            slots[1],
            Some(ChipCommand::write_triggered(regs::STIM_ON_TRIGGERED, 0xFFFF))
        );
        assert_eq!(
            slots[2],
            Some(ChipCommand::write_triggered(96, 0x8080))
        );
        assert_eq!(
            slots[3],
            Some(ChipCommand::write_triggered(97, 0x8080))
        );
    }

    #[test]
    fn test_respects_interval() {
        let mut stim = sequencer();
        let start = Instant::now();
        let mut slots = AuxSlots::default();
        assert!(stim.tick(start, &mut slots).is_some());

        let mut slots = AuxSlots::default();
        assert_eq!(stim.tick(start + Duration::from_millis(999), &mut slots), None);
        assert_eq!(slots, AuxSlots::default());

        assert_eq!(
            stim.tick(start + Duration::from_millis(1000), &mut slots),
            Some(StimPhase::PositivePolarityOn)
        );
    }

    #[test]
    fn test_phase_cycle() {
        let mut stim = sequencer();
        let start = Instant::now();
        let phases: Vec<_> = (0..7)
            .filter_map(|i| {
                let mut slots = AuxSlots::default();
                stim.tick(start + Duration::from_secs(i), &mut slots)
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                StimPhase::NegativePolarityOn,
                StimPhase::PositivePolarityOn,
                StimPhase::AllOff,
                StimPhase::NegativePolarityOn,
                StimPhase::PositivePolarityOn,
                StimPhase::AllOff,
                StimPhase::NegativePolarityOn,
            ]
        );
    }

    #[test]
    fn test_all_off_leaves_polarity_slot() {
        let mut stim = sequencer();
        let start = Instant::now();
        let mut slots = AuxSlots::default();
        stim.tick(start, &mut slots);
        stim.tick(start + Duration::from_secs(1), &mut slots);

        let host = Some(ChipCommand::write_triggered(regs::STIM_ON_TRIGGERED, 0x0003));
        let mut slots = [host, host, None, None];
        assert_eq!(
            stim.tick(start + Duration::from_secs(2), &mut slots),
            Some(StimPhase::AllOff)
        );
        assert_eq!(slots[0], host);
        assert_eq!(
            slots[1],
            Some(ChipCommand::write_triggered(regs::STIM_ON_TRIGGERED, 0x0000))
        );
    }

    #[test]
    fn test_disabled_never_ticks() {
        let config = StimulationConfig {
            enabled: false,
            ..StimulationConfig::default()
        };
        let mut stim = StimSequencer::new(&config);
        let mut slots = AuxSlots::default();
        assert_eq!(stim.tick(Instant::now(), &mut slots), None);
        assert_eq!(slots, AuxSlots::default());
    }

    #[test]
    fn test_single_magnitude_channel() {
        let config = StimulationConfig {
            channels: vec![5],
            magnitude: 0x20,
            ..StimulationConfig::default()
        };
        let mut stim = StimSequencer::new(&config);
        let mut slots = AuxSlots::default();
        stim.tick(Instant::now(), &mut slots);
        assert_eq!(slots[2], Some(ChipCommand::write_triggered(101, 0x8020)));
        assert_eq!(slots[3], None);
    }

    #[test]
    fn test_unusable_channels_ignored() {
        let config = StimulationConfig {
            channels: vec![200, 3, 16, 4, 7],
            magnitude: 0x10,
            ..StimulationConfig::default()
        };
        let mut stim = StimSequencer::new(&config);
        let mut slots = AuxSlots::default();
        stim.tick(Instant::now(), &mut slots);
        assert_eq!(slots[2], Some(ChipCommand::write_triggered(99, 0x8010)));
        assert_eq!(slots[3], Some(ChipCommand::write_triggered(100, 0x8010)));
    }
}
