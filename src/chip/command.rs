//! Command codec for the headstage instruction set
//!
//! Every instruction is a single 32-bit word. The top two bits select the
//! instruction kind; the U (update triggered registers) and M (clear
//! compliance monitor) flags sit right below them:
//!
//! ```text
//!  31 30  29  28  27  26  25..24  23..16        15..0
//! [kind ][ U][ M][ D][ H][  0  ][ reg / chan ][  data  ]
//! ```
//!
//! D and H only exist on CONVERT. CLEAR is a fixed word (`0x6A00_0000`).
//! Fields are extracted with plain shifts and masks; nothing is ever
//! reinterpreted from raw bytes.

use crate::chip::{CHANNEL_COUNT, WRITE_ACK_MARKER};
use crate::types::ChannelSample;

const KIND_OFFSET: u32 = 30;
const KIND_MASK: u32 = 0b11;
const U_FLAG: u32 = 1 << 29;
const M_FLAG: u32 = 1 << 28;
const D_FLAG: u32 = 1 << 27;
const H_FLAG: u32 = 1 << 26;
const SELECTOR_OFFSET: u32 = 16;
const REGISTER_MASK: u32 = 0xFF;
const CHANNEL_MASK: u32 = 0x3F;
const DATA_MASK: u32 = 0xFFFF;
const CLEAR_WORD: u32 = 0b0110_1010 << 24;

/// Instruction kind, encoded in the top two bits of the command word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Sample one amplifier channel
    Convert,
    /// ADC calibration (fixed word)
    Clear,
    /// Write a 16-bit register
    Write,
    /// Read a 16-bit register
    Read,
}

impl CommandKind {
    const fn bits(self) -> u32 {
        match self {
            CommandKind::Convert => 0b00,
            CommandKind::Clear => 0b01,
            CommandKind::Write => 0b10,
            CommandKind::Read => 0b11,
        }
    }

    const fn from_bits(bits: u32) -> Self {
        match bits & KIND_MASK {
            0b00 => CommandKind::Convert,
            0b01 => CommandKind::Clear,
            0b10 => CommandKind::Write,
            _ => CommandKind::Read,
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandKind::Convert => write!(f, "CONVERT"),
            CommandKind::Clear => write!(f, "CLEAR"),
            CommandKind::Write => write!(f, "WRITE"),
            CommandKind::Read => write!(f, "READ"),
        }
    }
}

/// An encoded 32-bit chip instruction
///
/// Immutable once built. Constructors cover every instruction the firmware
/// issues; [`encode`] is the general form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChipCommand(u32);

impl ChipCommand {
    /// CONVERT on `channel`, also sampling the DC low-gain amplifier
    pub const fn convert(channel: u8) -> Self {
        Self::convert_with(channel, true, false)
    }

    /// CONVERT with explicit D (DC sample) and H (high-pass reset) flags
    pub const fn convert_with(channel: u8, dc: bool, reset_highpass: bool) -> Self {
        let mut word = (CommandKind::Convert.bits() << KIND_OFFSET)
            | ((channel as u32 & CHANNEL_MASK) << SELECTOR_OFFSET);
        if dc {
            word |= D_FLAG;
        }
        if reset_highpass {
            word |= H_FLAG;
        }
        Self(word)
    }

    /// READ of `register`
    pub const fn read(register: u8) -> Self {
        encode(CommandKind::Read, register, 0, false, false)
    }

    /// READ of `register` that also clears the compliance monitor
    pub const fn read_clearing_compliance(register: u8) -> Self {
        encode(CommandKind::Read, register, 0, false, true)
    }

    /// WRITE of `data` into a plain register
    pub const fn write(register: u8, data: u16) -> Self {
        encode(CommandKind::Write, register, data, false, false)
    }

    /// WRITE of `data` with the U flag set, latching all triggered registers
    pub const fn write_triggered(register: u8, data: u16) -> Self {
        encode(CommandKind::Write, register, data, true, false)
    }

    /// The fixed CLEAR (ADC calibration) instruction
    pub const fn clear() -> Self {
        Self(CLEAR_WORD)
    }

    /// Wrap a raw word (e.g. one observed on the bus)
    pub const fn from_raw(word: u32) -> Self {
        Self(word)
    }

    /// The raw 32-bit word
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Wire bytes, most significant byte first
    pub const fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Instruction kind
    pub const fn kind(self) -> CommandKind {
        CommandKind::from_bits(self.0 >> KIND_OFFSET)
    }

    /// Register selector (READ/WRITE)
    pub const fn register(self) -> u8 {
        ((self.0 >> SELECTOR_OFFSET) & REGISTER_MASK) as u8
    }

    /// Channel selector (CONVERT)
    pub const fn channel(self) -> u8 {
        ((self.0 >> SELECTOR_OFFSET) & CHANNEL_MASK) as u8
    }

    /// Data payload (WRITE)
    pub const fn data(self) -> u16 {
        (self.0 & DATA_MASK) as u16
    }

    /// U flag: triggered registers update on this instruction
    pub const fn updates_triggered(self) -> bool {
        self.0 & U_FLAG != 0
    }

    /// M flag: compliance monitor is cleared on this instruction
    pub const fn clears_compliance(self) -> bool {
        self.0 & M_FLAG != 0
    }

    /// D flag (CONVERT only)
    pub const fn samples_dc(self) -> bool {
        self.0 & D_FLAG != 0
    }
}

impl std::fmt::Display for ChipCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            CommandKind::Convert => write!(f, "CONVERT({})", self.channel()),
            CommandKind::Clear => write!(f, "CLEAR"),
            CommandKind::Read => write!(f, "READ({})", self.register()),
            CommandKind::Write => {
                write!(f, "WRITE({}, 0x{:04X})", self.register(), self.data())
            }
        }
    }
}

/// Build a command word from its fields
///
/// `selector` is a register number for READ/WRITE and a channel number for
/// CONVERT (masked to 6 bits). `data` is only carried by WRITE. CLEAR
/// ignores every field and yields the fixed CLEAR word.
pub const fn encode(
    kind: CommandKind,
    selector: u8,
    data: u16,
    update: bool,
    clear_compliance: bool,
) -> ChipCommand {
    let selector_mask = match kind {
        CommandKind::Convert => CHANNEL_MASK,
        CommandKind::Clear => return ChipCommand(CLEAR_WORD),
        CommandKind::Read | CommandKind::Write => REGISTER_MASK,
    };
    let mut word = (kind.bits() << KIND_OFFSET) | ((selector as u32 & selector_mask) << SELECTOR_OFFSET);
    if let CommandKind::Write = kind {
        word |= data as u32 & DATA_MASK;
    }
    if update {
        word |= U_FLAG;
    }
    if clear_compliance {
        word |= M_FLAG;
    }
    ChipCommand(word)
}

/// A response interpreted against the command it answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// Result of a CONVERT
    Sample { channel: u8, sample: ChannelSample },
    /// Result of a READ
    ReadResult { register: u8, value: u16 },
    /// Acknowledgement of a WRITE
    WriteAck { register: u8, ok: bool },
    /// Nothing meaningful to extract (CLEAR, or an out-of-range channel)
    Unknown,
}

/// Interpret a raw response word given the command it answers
pub fn decode_response(raw: u32, command: ChipCommand) -> Decoded {
    match command.kind() {
        CommandKind::Convert => {
            let channel = command.channel();
            if channel as usize >= CHANNEL_COUNT {
                return Decoded::Unknown;
            }
            Decoded::Sample {
                channel,
                sample: ChannelSample::from_response(raw),
            }
        }
        CommandKind::Read => Decoded::ReadResult {
            register: command.register(),
            value: (raw & DATA_MASK) as u16,
        },
        CommandKind::Write => Decoded::WriteAck {
            register: command.register(),
            ok: write_acknowledged(command, raw),
        },
        CommandKind::Clear => Decoded::Unknown,
    }
}

/// A WRITE is acknowledged iff the chip echoes `0xFFFF` followed by the data
pub fn write_acknowledged(command: ChipCommand, raw: u32) -> bool {
    (raw >> 16) as u16 == WRITE_ACK_MARKER && (raw & DATA_MASK) as u16 == command.data()
}
