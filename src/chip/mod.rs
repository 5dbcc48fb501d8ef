//! RHS2116 headstage access
//!
//! This module covers everything that talks to the amplifier/stimulator
//! chip: the register map, the 32-bit command codec, the transport seam,
//! and the pipeline tracker that pairs each response with the command
//! issued two exchanges earlier.
//!
//! # Components
//!
//! - [`ChipCommand`] / [`decode_response`] - Command codec
//! - [`ChipTransport`] - One synchronous 4-byte exchange with the chip
//! - [`SpiTransport`] - Transport over an `embedded-hal` SPI device
//! - [`PipelineTracker`] - Command history and response reconciliation
//! - [`bring_up_sequence`] - Datasheet power-up register programming
//! - [`SimulatedChip`] - Software headstage for testing (feature-gated)

pub mod command;
pub mod init;
pub mod pipeline;
#[cfg(feature = "mock-chip")]
pub mod sim;
pub mod transport;

pub use command::{decode_response, encode, ChipCommand, CommandKind, Decoded};
pub use init::bring_up_sequence;
pub use pipeline::{Exchange, PipelineTracker};
#[cfg(feature = "mock-chip")]
pub use sim::{SimulatedChip, SignalPattern};
pub use transport::{ChipTransport, SpiTransport};

/// Amplifier channels on the chip
pub const CHANNEL_COUNT: usize = 16;

/// Auxiliary command slots appended to every sampling cycle
pub const AUX_SLOT_COUNT: usize = 4;

/// Exchanges between issuing a command and receiving its response
pub const PIPELINE_DEPTH: usize = 2;

/// Value returned by register 255
pub const EXPECTED_CHIP_ID: u16 = 0x20;

/// Upper half of every successful WRITE response
pub const WRITE_ACK_MARKER: u16 = 0xFFFF;

/// Stimulation enable register A key (all channels)
pub const STIM_ENABLE_A_KEY: u16 = 0xAAAA;

/// Stimulation enable register B key (all channels)
pub const STIM_ENABLE_B_KEY: u16 = 0x00FF;

/// Sign bit of the per-channel current magnitude registers
pub const CURRENT_MAGNITUDE_SIGN: u16 = 0x8000;

/// Register addresses
pub mod regs {
    pub const SUPPLY_SENSOR_ADC_BIAS: u8 = 0;
    pub const ADC_FORMAT_DSP_AUX_OUT: u8 = 1;
    pub const IMPEDANCE_CHECK_CONTROL: u8 = 2;
    pub const IMPEDANCE_CHECK_DAC: u8 = 3;
    pub const AMP_BANDWIDTH_1: u8 = 4;
    pub const AMP_BANDWIDTH_2: u8 = 5;
    pub const AMP_BANDWIDTH_3: u8 = 6;
    pub const AMP_BANDWIDTH_4: u8 = 7;
    pub const AC_AMP_POWER: u8 = 8;
    pub const AMP_FAST_SETTLE_TRIGGERED: u8 = 10;
    pub const AMP_LOWER_CUTOFF_TRIGGERED: u8 = 12;

    pub const STIM_ENABLE_A: u8 = 32;
    pub const STIM_ENABLE_B: u8 = 33;
    pub const STIM_STEP_SIZE: u8 = 34;
    pub const STIM_BIAS_VOLTAGE: u8 = 35;
    pub const CHARGE_RECOVERY_TARGET: u8 = 36;
    pub const CHARGE_RECOVERY_LIMIT: u8 = 37;
    pub const DC_AMP_POWER: u8 = 38;
    pub const COMPLIANCE_MONITOR: u8 = 40;

    pub const STIM_ON_TRIGGERED: u8 = 42;
    pub const STIM_POLARITY_TRIGGERED: u8 = 44;
    pub const CHARGE_RECOVERY_SWITCH_TRIGGERED: u8 = 46;
    pub const CHARGE_RECOVERY_ENABLE_TRIGGERED: u8 = 48;

    /// First of 16 negative current magnitude registers (one per channel)
    pub const NEG_CURRENT_MAGNITUDE_BASE: u8 = 64;
    /// First of 16 positive current magnitude registers (one per channel)
    pub const POS_CURRENT_MAGNITUDE_BASE: u8 = 96;

    pub const COMPANY_DESIGNATION_1: u8 = 251;
    pub const COMPANY_DESIGNATION_2: u8 = 252;
    pub const COMPANY_DESIGNATION_3: u8 = 253;
    pub const CHANNEL_TOTAL_CHIP_REV: u8 = 254;
    pub const CHIP_ID: u8 = 255;
}

/// READ issued in auxiliary slots that carry nothing else
pub const FILLER_COMMAND: ChipCommand = ChipCommand::read(regs::CHIP_ID);
