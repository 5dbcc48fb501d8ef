//! Sampling thread loop
//!
//! Each iteration, once the chip is initialized:
//!
//! 1. Run one sampling cycle (16 CONVERTs, 4 auxiliary slots)
//! 2. Drain up to four host requests and rebuild the slots, then let the
//!    stimulation sequencer overwrite what it needs
//! 3. Flush the batch if it reached the threshold
//! 4. Sleep for the configured sample delay
//!
//! Before initialization the worker polls the transport's readiness,
//! sleeping the init backoff between attempts.

use super::context::SamplerContext;
use super::host::RawHostFrame;
use crate::chip::{ChipTransport, AUX_SLOT_COUNT};
use crate::config::DeviceConfig;
use crate::queue::{QueueReceiver, QueueSender};
use crate::relay::OutgoingBatch;
use crate::types::SamplerStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sampling thread worker
pub struct SamplerWorker {
    context: SamplerContext,
    inbound: QueueReceiver<RawHostFrame>,
    running: Arc<AtomicBool>,
    sample_delay: Duration,
    init_backoff: Duration,
}

impl SamplerWorker {
    pub fn new(
        config: &DeviceConfig,
        transport: Box<dyn ChipTransport>,
        inbound: QueueReceiver<RawHostFrame>,
        outbound: QueueSender<OutgoingBatch>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            context: SamplerContext::new(config, transport, outbound),
            inbound,
            running,
            sample_delay: config.sampling.sample_delay(),
            init_backoff: config.sampling.init_backoff(),
        }
    }

    /// Run until the running flag clears; returns the final counters
    pub fn run(mut self) -> SamplerStats {
        tracing::info!("Sampler started");

        while self.running.load(Ordering::SeqCst) {
            if !self.context.is_initialized() {
                if !self.context.transport_ready() {
                    tracing::debug!("Chip not ready, retrying in {:?}", self.init_backoff);
                    std::thread::sleep(self.init_backoff);
                    continue;
                }
                self.context.initialize_chip();
            }

            self.iterate(Instant::now());
            self.pace();
        }

        let stats = self.context.stats().clone();
        tracing::info!(
            "Sampler stopped after {} cycles ({} flushes, {} transport failures)",
            stats.cycles,
            stats.flushes,
            stats.transport_failures
        );
        stats
    }

    /// One initialized iteration, without the trailing sleep
    fn iterate(&mut self, now: Instant) {
        self.context.run_cycle();
        let requests = self.inbound.drain_up_to(AUX_SLOT_COUNT);
        self.context.prepare_slots(&requests, now);
        self.context.flush_if_due();
    }

    fn pace(&self) {
        if self.sample_delay.is_zero() {
            std::thread::yield_now();
        } else {
            std::thread::sleep(self.sample_delay);
        }
    }
}
