//! Simulated headstage for running without hardware
//!
//! [`SimulatedChip`] implements [`ChipTransport`] by modelling the parts of
//! the chip the firmware depends on:
//!
//! - **Two-exchange response latency**: each response is computed when an
//!   instruction arrives and clocked out two exchanges later
//! - **Register file**: WRITEs store their data and are acknowledged with
//!   `0xFFFF` followed by the data; READs return the stored value
//! - **Conversions**: each channel produces samples from a [`SignalPattern`]
//! - **Fault injection**: failing exchanges, corrupted acknowledgements,
//!   a power-up delay and a failing bring-up
//!
//! # Example
//!
//! ```ignore
//! use rhs_relay::chip::{SimulatedChip, SignalPattern};
//!
//! let chip = SimulatedChip::new()
//!     .with_pattern(0, SignalPattern::Sine { amplitude: 2000.0, period: 50 })
//!     .with_pattern(1, SignalPattern::Ramp { step: 3 });
//! ```
//!
//! # Enabling
//!
//! Only available with the `mock-chip` feature (on by default).

use crate::chip::command::{ChipCommand, CommandKind};
use crate::chip::transport::ChipTransport;
use crate::chip::{regs, CHANNEL_COUNT, EXPECTED_CHIP_ID, PIPELINE_DEPTH, WRITE_ACK_MARKER};
use crate::error::{RelayError, Result};
use crossbeam_channel::Sender;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Offset-binary midscale of the AC amplifier output
const AC_MIDSCALE: u16 = 0x8000;

/// Pattern for generating simulated amplifier output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalPattern {
    /// Fixed AC and DC values
    Constant { ac: u16, dc: u16 },
    /// AC value increasing by `step` every conversion, wrapping
    Ramp { step: u16 },
    /// Sine around midscale; `period` in conversions of this channel
    Sine { amplitude: f64, period: u32 },
}

impl Default for SignalPattern {
    fn default() -> Self {
        SignalPattern::Constant {
            ac: AC_MIDSCALE,
            dc: 0x200,
        }
    }
}

impl SignalPattern {
    fn generate(&self, n: u32) -> (u16, u16) {
        match *self {
            SignalPattern::Constant { ac, dc } => (ac, dc & 0x03FF),
            SignalPattern::Ramp { step } => ((n as u16).wrapping_mul(step), 0x200),
            SignalPattern::Sine { amplitude, period } => {
                let period = period.max(1) as f64;
                let phase = 2.0 * std::f64::consts::PI * (n as f64) / period;
                let ac = (AC_MIDSCALE as f64 + amplitude * phase.sin())
                    .clamp(0.0, u16::MAX as f64) as u16;
                (ac, 0x200)
            }
        }
    }
}

/// Software model of the chip behind the serial link
pub struct SimulatedChip {
    registers: [u16; 256],
    patterns: [SignalPattern; CHANNEL_COUNT],
    conversions: [u32; CHANNEL_COUNT],
    in_flight: VecDeque<u32>,
    exchanges: u64,
    /// Fail every n-th exchange (0 = never)
    fail_every: u64,
    /// Answer WRITEs with a wrong echo
    corrupt_acks: bool,
    fail_bring_up: bool,
    power_up_delay: Duration,
    ready_at: Option<Instant>,
    observer: Option<Sender<ChipCommand>>,
}

impl Default for SimulatedChip {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedChip {
    /// Create a chip with default patterns and no faults
    pub fn new() -> Self {
        let mut registers = [0u16; 256];
        registers[regs::CHIP_ID as usize] = EXPECTED_CHIP_ID;
        registers[regs::CHANNEL_TOTAL_CHIP_REV as usize] = CHANNEL_COUNT as u16 | (1 << 8);
        registers[regs::COMPANY_DESIGNATION_1 as usize] = u16::from(b'I');
        registers[regs::COMPANY_DESIGNATION_2 as usize] = u16::from(b'N');
        registers[regs::COMPANY_DESIGNATION_3 as usize] = u16::from(b'T');

        Self {
            registers,
            patterns: [SignalPattern::default(); CHANNEL_COUNT],
            conversions: [0; CHANNEL_COUNT],
            in_flight: VecDeque::from(vec![0; PIPELINE_DEPTH]),
            exchanges: 0,
            fail_every: 0,
            corrupt_acks: false,
            fail_bring_up: false,
            power_up_delay: Duration::ZERO,
            ready_at: None,
            observer: None,
        }
    }

    /// Use `pattern` for `channel`
    pub fn with_pattern(mut self, channel: u8, pattern: SignalPattern) -> Self {
        if let Some(slot) = self.patterns.get_mut(channel as usize) {
            *slot = pattern;
        }
        self
    }

    /// Use `pattern` for every channel
    pub fn with_all_patterns(mut self, pattern: SignalPattern) -> Self {
        self.patterns = [pattern; CHANNEL_COUNT];
        self
    }

    /// Fail every `n`-th exchange with a transport error
    pub fn with_failure_every(mut self, n: u64) -> Self {
        self.fail_every = n;
        self
    }

    /// Acknowledge WRITEs with data that does not match
    pub fn with_corrupt_acks(mut self) -> Self {
        self.corrupt_acks = true;
        self
    }

    /// Make `bring_up` fail
    pub fn with_bring_up_failure(mut self) -> Self {
        self.fail_bring_up = true;
        self
    }

    /// Report not-ready for `delay` after bring-up
    pub fn with_power_up_delay(mut self, delay: Duration) -> Self {
        self.power_up_delay = delay;
        self
    }

    /// Report every received instruction on `observer`
    pub fn with_observer(mut self, observer: Sender<ChipCommand>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Current value of a register
    pub fn register(&self, address: u8) -> u16 {
        self.registers[address as usize]
    }

    /// Exchanges performed so far
    pub fn exchanges(&self) -> u64 {
        self.exchanges
    }

    fn execute(&mut self, command: ChipCommand) -> u32 {
        match command.kind() {
            CommandKind::Convert => {
                let channel = command.channel() as usize;
                if channel >= CHANNEL_COUNT {
                    return 0;
                }
                let n = self.conversions[channel];
                self.conversions[channel] = n.wrapping_add(1);
                let (ac, dc) = self.patterns[channel].generate(n);
                let dc = if command.samples_dc() { dc } else { 0 };
                (u32::from(ac) << 16) | u32::from(dc)
            }
            CommandKind::Read => u32::from(self.registers[command.register() as usize]),
            CommandKind::Write => {
                let register = command.register();
                if register >= regs::COMPANY_DESIGNATION_1 {
                    // Read-only ROM registers echo their own contents
                    return u32::from(self.registers[register as usize]);
                }
                self.registers[register as usize] = command.data();
                let echoed = if self.corrupt_acks {
                    command.data() ^ 0x0001
                } else {
                    command.data()
                };
                (u32::from(WRITE_ACK_MARKER) << 16) | u32::from(echoed)
            }
            CommandKind::Clear => 0x8000_0000,
        }
    }
}

impl ChipTransport for SimulatedChip {
    fn bring_up(&mut self) -> Result<()> {
        if self.fail_bring_up {
            return Err(RelayError::TransportUnavailable(
                "simulated bus did not respond".to_string(),
            ));
        }
        self.ready_at = Some(Instant::now() + self.power_up_delay);
        tracing::info!("Simulated headstage brought up");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready_at.is_some_and(|at| Instant::now() >= at)
    }

    fn exchange(&mut self, tx: [u8; 4]) -> Result<[u8; 4]> {
        self.exchanges += 1;

        let command = ChipCommand::from_raw(u32::from_be_bytes(tx));
        if let Some(observer) = &self.observer {
            let _ = observer.try_send(command);
        }

        // The chip still clocks the word in; only the received bytes are lost
        let response = self.execute(command);
        self.in_flight.push_back(response);
        let out = self.in_flight.pop_front().unwrap_or(0);

        if self.fail_every > 0 && self.exchanges % self.fail_every == 0 {
            return Err(RelayError::Transport(format!(
                "simulated failure on exchange {}",
                self.exchanges
            )));
        }
        Ok(out.to_be_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::pipeline::{Exchange, PipelineTracker};
    use crate::chip::Decoded;

    #[test]
    fn test_responses_arrive_two_exchanges_late() {
        let mut chip = SimulatedChip::new();
        let first = chip.exchange(ChipCommand::write(36, 0x0080).to_be_bytes()).unwrap();
        let second = chip.exchange(ChipCommand::read(255).to_be_bytes()).unwrap();
        let third = chip.exchange(ChipCommand::read(255).to_be_bytes()).unwrap();

        assert_eq!(first, [0; 4]);
        assert_eq!(second, [0; 4]);
        assert_eq!(u32::from_be_bytes(third), 0xFFFF_0080);
    }

    #[test]
    fn test_tracker_against_simulator() {
        let mut chip = SimulatedChip::new().with_pattern(
            4,
            SignalPattern::Constant { ac: 0x1234, dc: 0x0055 },
        );
        let mut tracker = PipelineTracker::new();

        tracker.send_and_track(&mut chip, ChipCommand::convert(4)).unwrap();
        tracker.send_and_track(&mut chip, ChipCommand::read(255)).unwrap();
        let exchange = tracker.send_and_track(&mut chip, ChipCommand::read(255)).unwrap();

        match exchange {
            Exchange::Paired { decoded: Decoded::Sample { channel, sample }, .. } => {
                assert_eq!(channel, 4);
                assert_eq!(sample.ac, 0x1234);
                assert_eq!(sample.dc, 0x0055);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_register_file() {
        let mut chip = SimulatedChip::new();
        chip.exchange(ChipCommand::write_triggered(42, 0xFFFF).to_be_bytes()).unwrap();
        assert_eq!(chip.register(42), 0xFFFF);
        assert_eq!(chip.register(regs::CHIP_ID), EXPECTED_CHIP_ID);
    }

    #[test]
    fn test_rom_registers_reject_writes() {
        let mut chip = SimulatedChip::new();
        chip.exchange(ChipCommand::write(regs::CHIP_ID, 0x0001).to_be_bytes()).unwrap();
        assert_eq!(chip.register(regs::CHIP_ID), EXPECTED_CHIP_ID);
    }

    #[test]
    fn test_failure_injection() {
        let mut chip = SimulatedChip::new().with_failure_every(3);
        assert!(chip.exchange([0; 4]).is_ok());
        assert!(chip.exchange([0; 4]).is_ok());
        assert!(chip.exchange([0; 4]).is_err());
        assert!(chip.exchange([0; 4]).is_ok());
    }

    #[test]
    fn test_readiness_follows_bring_up() {
        let mut chip = SimulatedChip::new();
        assert!(!chip.is_ready());
        chip.bring_up().unwrap();
        assert!(chip.is_ready());

        let mut slow = SimulatedChip::new().with_power_up_delay(Duration::from_secs(60));
        slow.bring_up().unwrap();
        assert!(!slow.is_ready());

        assert!(SimulatedChip::new().with_bring_up_failure().bring_up().is_err());
    }

    #[test]
    fn test_ramp_pattern_wraps() {
        let pattern = SignalPattern::Ramp { step: 0x4000 };
        assert_eq!(pattern.generate(0).0, 0);
        assert_eq!(pattern.generate(3).0, 0xC000);
        assert_eq!(pattern.generate(4).0, 0);
    }
}
