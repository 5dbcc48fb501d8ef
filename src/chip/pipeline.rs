//! Pipeline tracker
//!
//! The chip answers each instruction two exchanges late: the four bytes
//! clocked in during exchange *k* are the response to the instruction sent
//! during exchange *k − 2*. The tracker keeps the last three instructions
//! so every response can be decoded against the command it belongs to.
//!
//! Every instruction in the firmware goes through [`PipelineTracker::send_and_track`].
//! Sending around it would silently misalign every later response.

use crate::chip::command::{decode_response, ChipCommand, Decoded};
use crate::chip::transport::ChipTransport;
use crate::error::Result;

/// Outcome of one tracked exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// The response belonged to `command`, issued two exchanges earlier
    Paired { command: ChipCommand, decoded: Decoded },
    /// No command was outstanding two exchanges ago (startup warm-up)
    Discarded,
}

impl Exchange {
    /// The decoded response, if any
    pub fn decoded(&self) -> Option<Decoded> {
        match self {
            Exchange::Paired { decoded, .. } => Some(*decoded),
            Exchange::Discarded => None,
        }
    }
}

/// History of the three most recently issued commands
#[derive(Debug, Clone, Default)]
pub struct PipelineTracker {
    current: Option<ChipCommand>,
    previous: Option<ChipCommand>,
    two_ago: Option<ChipCommand>,
    exchanges: u64,
    failures: u64,
}

impl PipelineTracker {
    /// Create an empty tracker (next two exchanges are warm-up)
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all history, as after a chip (re)initialization
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Transmit `command`, shift history, and decode the response against
    /// the command that is now two exchanges old
    ///
    /// A transport failure still shifts the history so later responses stay
    /// aligned; only this exchange's response is lost.
    pub fn send_and_track(
        &mut self,
        transport: &mut dyn ChipTransport,
        command: ChipCommand,
    ) -> Result<Exchange> {
        let result = transport.exchange(command.to_be_bytes());

        self.two_ago = self.previous;
        self.previous = self.current;
        self.current = Some(command);
        self.exchanges += 1;

        let rx = match result {
            Ok(rx) => rx,
            Err(e) => {
                self.failures += 1;
                return Err(e);
            }
        };

        let Some(answered) = self.two_ago else {
            tracing::trace!("{} sent during warm-up, response discarded", command);
            return Ok(Exchange::Discarded);
        };

        let raw = u32::from_be_bytes(rx);
        tracing::trace!("{} -> 0x{:08X} answers {}", command, raw, answered);
        Ok(Exchange::Paired {
            command: answered,
            decoded: decode_response(raw, answered),
        })
    }

    /// Most recently issued command
    pub fn current(&self) -> Option<ChipCommand> {
        self.current
    }

    /// Command issued one exchange ago
    pub fn previous(&self) -> Option<ChipCommand> {
        self.previous
    }

    /// Command whose response arrived on the last exchange
    pub fn two_ago(&self) -> Option<ChipCommand> {
        self.two_ago
    }

    /// Exchanges attempted since the last reset
    pub fn exchanges(&self) -> u64 {
        self.exchanges
    }

    /// Exchanges whose transport call failed since the last reset
    pub fn failures(&self) -> u64 {
        self.failures
    }
}
