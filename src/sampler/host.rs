//! Host requests
//!
//! Inbound frames arrive on the host link's receive callback, are copied
//! into a fixed-size [`RawHostFrame`] and queued by [`HostInbox`]. The
//! sampling thread drains them and turns each one into a [`HostAction`].
//!
//! Frame layout: byte 0 is the opcode, the rest is a little-endian payload.
//!
//! | Opcode | Request                    | Payload                     |
//! |--------|----------------------------|-----------------------------|
//! | 0x01   | set rate (not supported)   | -                           |
//! | 0x02   | `SetStimEnableMask`        | `u16` mask                  |
//! | 0x03   | `SetStimPositiveMagnitude` | `u16` channel, `u16` value  |
//! | 0x04   | `SetRecordingChannelMask`  | `u16` mask                  |

use crate::chip::{regs, ChipCommand, CHANNEL_COUNT, CURRENT_MAGNITUDE_SIGN};
use crate::error::FrameError;
use crate::queue::{EnqueueOutcome, QueueSender};
use crate::types::ChannelMask;

/// Largest inbound frame accepted from the host link
pub const MAX_HOST_FRAME_LEN: usize = 32;

/// Opcode plus at least one payload byte
pub const MIN_HOST_FRAME_LEN: usize = 2;

/// Inbound frame as copied out of the receive callback
pub type RawHostFrame = heapless::Vec<u8, MAX_HOST_FRAME_LEN>;

pub const OPCODE_SET_RATE: u8 = 0x01;
pub const OPCODE_SET_STIM_ENABLE_MASK: u8 = 0x02;
pub const OPCODE_SET_STIM_POSITIVE_MAGNITUDE: u8 = 0x03;
pub const OPCODE_SET_RECORDING_MASK: u8 = 0x04;

/// A parsed host request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    /// Write the stimulation on-mask
    SetStimEnableMask(u16),
    /// Program one channel's positive current magnitude
    SetStimPositiveMagnitude { channel: u8, magnitude: u8 },
    /// Choose which channels are archived
    SetRecordingChannelMask(ChannelMask),
}

/// What the sampler does with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    /// Issue this command in the request's auxiliary slot
    Slot(ChipCommand),
    /// Flush the current batch, then switch to this mask
    SetRecordingMask(ChannelMask),
}

fn payload_u16(frame: &[u8], opcode: u8, index: usize) -> Result<u16, FrameError> {
    let start = 1 + 2 * index;
    match frame.get(start..start + 2) {
        Some(bytes) => Ok(u16::from_le_bytes([bytes[0], bytes[1]])),
        None => Err(FrameError::ShortPayload {
            opcode,
            needed: 2 * (index + 1),
            got: frame.len() - 1,
        }),
    }
}

impl HostRequest {
    /// Parse one inbound frame
    pub fn parse(frame: &[u8]) -> Result<Self, FrameError> {
        if frame.len() < MIN_HOST_FRAME_LEN {
            return Err(FrameError::TooShort { len: frame.len() });
        }
        let opcode = frame[0];
        match opcode {
            OPCODE_SET_STIM_ENABLE_MASK => Ok(HostRequest::SetStimEnableMask(payload_u16(
                frame, opcode, 0,
            )?)),
            OPCODE_SET_STIM_POSITIVE_MAGNITUDE => {
                let channel = payload_u16(frame, opcode, 0)?;
                let value = payload_u16(frame, opcode, 1)?;
                if channel as usize >= CHANNEL_COUNT {
                    return Err(FrameError::ChannelOutOfRange(channel));
                }
                if value > u16::from(u8::MAX) {
                    tracing::warn!(
                        "Magnitude 0x{:04X} for channel {} truncated to 8 bits",
                        value,
                        channel
                    );
                }
                Ok(HostRequest::SetStimPositiveMagnitude {
                    channel: channel as u8,
                    magnitude: (value & 0x00FF) as u8,
                })
            }
            OPCODE_SET_RECORDING_MASK => Ok(HostRequest::SetRecordingChannelMask(
                ChannelMask::new(payload_u16(frame, opcode, 0)?),
            )),
            other => Err(FrameError::UnsupportedOpcode(other)),
        }
    }

    /// Serialize for sending from the host side
    pub fn to_frame(&self) -> RawHostFrame {
        let mut frame = RawHostFrame::new();
        let mut put = |bytes: &[u8]| {
            // Every request fits well within MAX_HOST_FRAME_LEN
            let _ = frame.extend_from_slice(bytes);
        };
        match *self {
            HostRequest::SetStimEnableMask(mask) => {
                put(&[OPCODE_SET_STIM_ENABLE_MASK]);
                put(&mask.to_le_bytes());
            }
            HostRequest::SetStimPositiveMagnitude { channel, magnitude } => {
                put(&[OPCODE_SET_STIM_POSITIVE_MAGNITUDE]);
                put(&u16::from(channel).to_le_bytes());
                put(&u16::from(magnitude).to_le_bytes());
            }
            HostRequest::SetRecordingChannelMask(mask) => {
                put(&[OPCODE_SET_RECORDING_MASK]);
                put(&mask.bits().to_le_bytes());
            }
        }
        frame
    }

    /// Decide what the sampler does with this request
    pub fn action(&self) -> HostAction {
        match *self {
            HostRequest::SetStimEnableMask(mask) => {
                HostAction::Slot(ChipCommand::write_triggered(regs::STIM_ON_TRIGGERED, mask))
            }
            HostRequest::SetStimPositiveMagnitude { channel, magnitude } => {
                HostAction::Slot(ChipCommand::write_triggered(
                    regs::POS_CURRENT_MAGNITUDE_BASE + channel,
                    CURRENT_MAGNITUDE_SIGN | u16::from(magnitude),
                ))
            }
            HostRequest::SetRecordingChannelMask(mask) => HostAction::SetRecordingMask(mask),
        }
    }
}

/// Producer end of the inbound queue, handed to the host link
///
/// [`on_receive`](Self::on_receive) is safe to call from a receive
/// callback: it copies at most [`MAX_HOST_FRAME_LEN`] bytes and never
/// blocks.
#[derive(Debug, Clone)]
pub struct HostInbox {
    queue: QueueSender<RawHostFrame>,
}

impl HostInbox {
    pub fn new(queue: QueueSender<RawHostFrame>) -> Self {
        Self { queue }
    }

    /// Queue one received frame
    ///
    /// Frames shorter than [`MIN_HOST_FRAME_LEN`] or longer than
    /// [`MAX_HOST_FRAME_LEN`] are dropped, as are frames arriving while the
    /// queue is full.
    pub fn on_receive(&self, bytes: &[u8]) -> EnqueueOutcome {
        if bytes.len() < MIN_HOST_FRAME_LEN {
            tracing::debug!("Discarding {}-byte host frame", bytes.len());
            return EnqueueOutcome::Dropped;
        }
        let frame = match RawHostFrame::from_slice(bytes) {
            Ok(frame) => frame,
            Err(()) => {
                tracing::warn!(
                    "Dropping {}-byte host frame (limit {})",
                    bytes.len(),
                    MAX_HOST_FRAME_LEN
                );
                return EnqueueOutcome::Dropped;
            }
        };
        let outcome = self.queue.offer(frame);
        if !outcome.is_accepted() {
            tracing::warn!("Inbound queue full, host frame dropped");
        }
        outcome
    }

    /// Frames waiting for the sampler
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
