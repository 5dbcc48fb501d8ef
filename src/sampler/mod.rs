//! Sampling thread
//!
//! The sampler owns the chip. It runs fixed 20-exchange cycles, applies
//! host requests and stimulation through the four auxiliary slots, and
//! archives samples of the recorded channels into batches for the relay.
//!
//! # Components
//!
//! - [`SamplerWorker`] - Thread loop with init gating and pacing
//! - [`SamplerContext`] - All state the loop mutates
//! - [`BatchAssembler`] - Sample buffer, mask and rolling counter
//! - [`StimSequencer`] - Three-phase periodic stimulation
//! - [`HostRequest`] / [`HostInbox`] - Inbound request parsing and queueing

pub mod batch;
pub mod context;
pub mod host;
pub mod stim;
pub mod worker;

pub use batch::{AppendOutcome, BatchAssembler};
pub use context::SamplerContext;
pub use host::{HostAction, HostInbox, HostRequest, RawHostFrame, MAX_HOST_FRAME_LEN};
pub use stim::{StimPhase, StimSequencer};
pub use worker::SamplerWorker;

use crate::chip::{ChipCommand, AUX_SLOT_COUNT};

/// Commands for the auxiliary exchanges of the next cycle; `None` is sent as a filler READ
pub type AuxSlots = [Option<ChipCommand>; AUX_SLOT_COUNT];
