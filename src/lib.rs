//! # rhs-relay: RHS2116 sampling and stimulation relay
//!
//! Firmware core for a wireless headstage built around an RHS2116
//! amplifier/stimulator. It samples all 16 channels through the chip's
//! pipelined serial protocol, drives a periodic three-phase stimulation
//! pattern, applies requests from a host, and streams batches of archived
//! samples back over a wireless link.
//!
//! ## Architecture
//!
//! - **Sampler**: Time-critical thread that owns the chip, runs fixed
//!   20-exchange cycles and assembles batches
//! - **Relay**: Thread that forwards batches to the host link
//! - **Queues**: Bounded, drop-on-full queues are the only link between
//!   the two threads and the host link's receive callback
//! - **Chip**: Command codec, pipeline tracker and transport seam
//!   (SPI via `embedded-hal`, or a simulated chip)
//!
//! ## Configuration
//!
//! Device settings live in a TOML file, by default under the platform
//! config directory at `rhs-relay/device.toml`. See [`config`].
//!
//! ## Example
//!
//! ```ignore
//! use rhs_relay::{chip::SimulatedChip, config::DeviceConfig, relay::WriterHostLink, Device};
//!
//! fn main() -> anyhow::Result<()> {
//!     let handle = Device::start(
//!         DeviceConfig::default(),
//!         Box::new(SimulatedChip::new()),
//!         Box::new(WriterHostLink::new(std::io::stdout())),
//!     )?;
//!
//!     // Record channels 0 and 1
//!     handle.inbox().on_receive(&[0x04, 0x03, 0x00]);
//!
//!     std::thread::sleep(std::time::Duration::from_secs(1));
//!     let (sampler, relay) = handle.shutdown()?;
//!     println!("{} cycles, {} frames", sampler.cycles, relay.frames_sent);
//!     Ok(())
//! }
//! ```

pub mod chip;
pub mod config;
pub mod device;
pub mod error;
pub mod queue;
pub mod relay;
pub mod sampler;
pub mod types;

// Re-export commonly used types
pub use chip::{ChipCommand, ChipTransport, PipelineTracker, SpiTransport};
pub use config::DeviceConfig;
pub use device::{Device, DeviceHandle};
pub use error::{RelayError, Result};
pub use relay::{HostLink, OutgoingBatch};
pub use sampler::{HostInbox, HostRequest};
pub use types::{ChannelMask, ChannelSample, RelayStats, SamplerStats};
