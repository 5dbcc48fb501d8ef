//! Power-up register programming
//!
//! The sequence follows the datasheet's recommended start-up order: a
//! dummy read, stimulation locked out, amplifier and ADC configuration,
//! ADC calibration, stimulation defaults, then stimulation unlocked. The
//! list is built here and issued by the sampler through the same pipeline
//! tracker as every other instruction.

use crate::chip::command::ChipCommand;
use crate::chip::{regs, CHANNEL_COUNT, CURRENT_MAGNITUDE_SIGN, STIM_ENABLE_A_KEY, STIM_ENABLE_B_KEY};

/// ADC buffer bias and mux bias for sampling rates up to 120 kS/s
const ADC_BIAS_CONFIG: u16 = (32 << 5) | 40;

/// Every instruction issued before sampling starts, in order
pub fn bring_up_sequence() -> Vec<ChipCommand> {
    let mut seq = vec![
        ChipCommand::read(regs::CHIP_ID),
        ChipCommand::write(regs::STIM_ENABLE_A, 0x0000),
        ChipCommand::write(regs::STIM_ENABLE_B, 0x0000),
        // DC amplifiers must be powered to avoid excess supply current
        ChipCommand::write(regs::DC_AMP_POWER, 0xFFFF),
        ChipCommand::clear(),
        ChipCommand::write(regs::SUPPLY_SENSOR_ADC_BIAS, ADC_BIAS_CONFIG),
        ChipCommand::write(regs::ADC_FORMAT_DSP_AUX_OUT, 0x051A),
        ChipCommand::write(regs::IMPEDANCE_CHECK_CONTROL, 0x0040),
        ChipCommand::write(regs::IMPEDANCE_CHECK_DAC, 0x0080),
        ChipCommand::write(regs::AMP_BANDWIDTH_1, 0x0016),
        ChipCommand::write(regs::AMP_BANDWIDTH_2, 0x0017),
        ChipCommand::write(regs::AMP_BANDWIDTH_3, 0x00A8),
        ChipCommand::write(regs::AMP_BANDWIDTH_4, 0x000A),
        ChipCommand::write(regs::AC_AMP_POWER, 0xFFFF),
        ChipCommand::write_triggered(regs::AMP_FAST_SETTLE_TRIGGERED, 0x0000),
        ChipCommand::write_triggered(regs::AMP_LOWER_CUTOFF_TRIGGERED, 0xFFFF),
        ChipCommand::write(regs::STIM_STEP_SIZE, 0x00E2),
        ChipCommand::write(regs::STIM_BIAS_VOLTAGE, 0x00AA),
        ChipCommand::write(regs::CHARGE_RECOVERY_TARGET, 0x0080),
        ChipCommand::write(regs::CHARGE_RECOVERY_LIMIT, 0x4F00),
        ChipCommand::write_triggered(regs::STIM_ON_TRIGGERED, 0x0000),
        ChipCommand::write_triggered(regs::STIM_POLARITY_TRIGGERED, 0x0000),
        ChipCommand::write_triggered(regs::CHARGE_RECOVERY_SWITCH_TRIGGERED, 0x0000),
        ChipCommand::write_triggered(regs::CHARGE_RECOVERY_ENABLE_TRIGGERED, 0x0000),
    ];

    for ch in 0..CHANNEL_COUNT as u8 {
        seq.push(ChipCommand::write_triggered(
            regs::NEG_CURRENT_MAGNITUDE_BASE + ch,
            CURRENT_MAGNITUDE_SIGN,
        ));
    }
    for ch in 0..CHANNEL_COUNT as u8 {
        seq.push(ChipCommand::write_triggered(
            regs::POS_CURRENT_MAGNITUDE_BASE + ch,
            CURRENT_MAGNITUDE_SIGN,
        ));
    }

    seq.push(ChipCommand::write(regs::STIM_ENABLE_A, STIM_ENABLE_A_KEY));
    seq.push(ChipCommand::write(regs::STIM_ENABLE_B, STIM_ENABLE_B_KEY));
    seq.push(ChipCommand::read_clearing_compliance(regs::CHIP_ID));
    seq
}
