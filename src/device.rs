//! Device startup and shutdown
//!
//! [`Device::start`] brings the chip transport up, wires the two bounded
//! queues and spawns the two workers:
//!
//! ```text
//!  host link rx ──► HostInbox ──[inbound]──► sampler ──[outbound]──► relay ──► HostLink
//! ```
//!
//! Only the transport bring-up can fail startup. Everything after that is
//! handled inside the workers.
//!
//! # Example
//!
//! ```ignore
//! use rhs_relay::{config::DeviceConfig, chip::SimulatedChip, relay::WriterHostLink, Device};
//!
//! let handle = Device::start(
//!     DeviceConfig::default(),
//!     Box::new(SimulatedChip::new()),
//!     Box::new(WriterHostLink::new(std::io::stdout())),
//! )?;
//! handle.inbox().on_receive(&[0x04, 0x03, 0x00]);
//! let (sampler_stats, relay_stats) = handle.shutdown()?;
//! ```

use crate::chip::ChipTransport;
use crate::config::DeviceConfig;
use crate::error::{RelayError, Result, ResultExt};
use crate::queue::bounded_queue;
use crate::relay::{HostLink, RelayWorker};
use crate::sampler::{HostInbox, SamplerWorker};
use crate::types::{RelayStats, SamplerStats};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Name of the time-critical sampling thread
pub const SAMPLER_THREAD: &str = "sampler";

/// Name of the relay thread
pub const RELAY_THREAD: &str = "relay";

/// Entry point that starts the firmware's two threads
pub struct Device;

impl Device {
    /// Bring up the transport and start both workers
    pub fn start(
        config: DeviceConfig,
        mut transport: Box<dyn ChipTransport>,
        link: Box<dyn HostLink>,
    ) -> Result<DeviceHandle> {
        config.validate()?;
        transport.bring_up().context("Chip transport bring-up")?;

        let (inbound_tx, inbound_rx) = bounded_queue(config.queues.inbound_capacity);
        let (outbound_tx, outbound_rx) = bounded_queue(config.queues.outbound_capacity);
        let running = Arc::new(AtomicBool::new(true));

        let sampler = SamplerWorker::new(&config, transport, inbound_rx, outbound_tx, running.clone());
        let relay = RelayWorker::new(outbound_rx, link);

        let relay = thread::Builder::new()
            .name(RELAY_THREAD.to_string())
            .spawn(move || relay.run())?;
        let sampler = thread::Builder::new()
            .name(SAMPLER_THREAD.to_string())
            .spawn(move || sampler.run())?;

        tracing::info!(
            "Device started (batch capacity {}, queues {}/{})",
            config.sampling.batch_capacity,
            config.queues.inbound_capacity,
            config.queues.outbound_capacity
        );

        Ok(DeviceHandle {
            inbox: HostInbox::new(inbound_tx),
            running,
            sampler,
            relay,
        })
    }
}

/// Handle to a running device
pub struct DeviceHandle {
    inbox: HostInbox,
    running: Arc<AtomicBool>,
    sampler: JoinHandle<SamplerStats>,
    relay: JoinHandle<RelayStats>,
}

impl DeviceHandle {
    /// Producer end for the host link's receive callback
    pub fn inbox(&self) -> HostInbox {
        self.inbox.clone()
    }

    /// Ask the sampler to stop after its current iteration
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop and wait for both threads
    ///
    /// The relay ends once the sampler has exited and it has forwarded
    /// every batch still queued.
    pub fn shutdown(self) -> Result<(SamplerStats, RelayStats)> {
        self.stop();
        let sampler = self
            .sampler
            .join()
            .map_err(|_| RelayError::Thread(SAMPLER_THREAD.to_string()))?;
        let relay = self
            .relay
            .join()
            .map_err(|_| RelayError::Thread(RELAY_THREAD.to_string()))?;
        Ok((sampler, relay))
    }
}
