//! Relay thread loop
//!
//! Blocks on the outbound queue and forwards each batch to the host link.
//! A failed send is logged and counted; the batch is not retried. The loop
//! ends when the sampler side of the queue is dropped.

use super::frame::OutgoingBatch;
use super::link::HostLink;
use crate::queue::QueueReceiver;
use crate::types::RelayStats;

/// Relay thread worker
pub struct RelayWorker {
    outbound: QueueReceiver<OutgoingBatch>,
    link: Box<dyn HostLink>,
    stats: RelayStats,
}

impl RelayWorker {
    pub fn new(outbound: QueueReceiver<OutgoingBatch>, link: Box<dyn HostLink>) -> Self {
        Self {
            outbound,
            link,
            stats: RelayStats::default(),
        }
    }

    /// Forward batches until the queue disconnects; returns the final counters
    pub fn run(mut self) -> RelayStats {
        if let Err(e) = self.link.bring_up() {
            tracing::warn!("Host link bring-up failed: {}", e);
        }
        tracing::info!("Relay started");

        while let Some(batch) = self.outbound.take_blocking() {
            self.forward(&batch);
        }

        tracing::info!(
            "Relay stopped after {} frames ({} failed)",
            self.stats.frames_sent,
            self.stats.send_failures
        );
        self.stats
    }

    fn forward(&mut self, batch: &OutgoingBatch) {
        let frame = batch.encode();
        match self.link.send(&frame) {
            Ok(()) => {
                self.stats.frames_sent += 1;
                self.stats.bytes_sent += frame.len() as u64;
                tracing::debug!(
                    "Sent batch {} ({} samples, mask {})",
                    batch.sequence,
                    batch.samples.len(),
                    batch.mask
                );
            }
            Err(e) => {
                self.stats.send_failures += 1;
                tracing::warn!("Failed to send batch {}: {}", batch.sequence, e);
            }
        }
    }
}
