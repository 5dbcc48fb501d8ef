//! Relay thread
//!
//! The relay has no deadline of its own: it waits for batches from the
//! sampler and hands their encoded form to the host link.
//!
//! - [`OutgoingBatch`] - Batch type and wire encoding
//! - [`HostLink`] - Outbound link seam, with writer and channel implementations
//! - [`RelayWorker`] - Thread loop

pub mod frame;
pub mod link;
pub mod worker;

pub use frame::OutgoingBatch;
pub use link::{parse_hex_line, ChannelHostLink, HostLink, WriterHostLink};
pub use worker::RelayWorker;
