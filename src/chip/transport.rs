//! ChipTransport trait for the synchronous serial link
//!
//! One call to [`ChipTransport::exchange`] clocks four bytes out to the
//! chip and four bytes back in, full duplex. The bytes received belong to
//! the instruction sent two exchanges earlier; pairing them up is the
//! [`PipelineTracker`](super::PipelineTracker)'s job, not the transport's.

use crate::error::{RelayError, Result};
use embedded_hal::spi::SpiDevice;

/// Unified interface for the chip bus
///
/// Implementations must be `Send` so the sampler thread can own them.
#[cfg_attr(test, mockall::automock)]
pub trait ChipTransport: Send {
    /// Bring the bus up. Called once at startup; failure is fatal.
    fn bring_up(&mut self) -> Result<()> {
        Ok(())
    }

    /// Whether the chip can accept instructions yet
    fn is_ready(&self) -> bool {
        true
    }

    /// Send one big-endian instruction and receive one response word
    fn exchange(&mut self, tx: [u8; 4]) -> Result<[u8; 4]>;
}

impl<T: ChipTransport + ?Sized> ChipTransport for Box<T> {
    fn bring_up(&mut self) -> Result<()> {
        (**self).bring_up()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn exchange(&mut self, tx: [u8; 4]) -> Result<[u8; 4]> {
        (**self).exchange(tx)
    }
}

/// Transport over an `embedded-hal` SPI device
///
/// Chip select is managed by the `SpiDevice` implementation; the falling
/// edge of CS sets the sample time on the chip.
pub struct SpiTransport<SPI> {
    spi: SPI,
}

impl<SPI> SpiTransport<SPI>
where
    SPI: SpiDevice<u8>,
{
    /// Wrap an SPI device configured for 8-bit words, MSB first
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Release the underlying device
    pub fn into_inner(self) -> SPI {
        self.spi
    }
}

impl<SPI> ChipTransport for SpiTransport<SPI>
where
    SPI: SpiDevice<u8> + Send,
{
    fn exchange(&mut self, tx: [u8; 4]) -> Result<[u8; 4]> {
        let mut rx = [0u8; 4];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| RelayError::Transport(format!("SPI transfer failed: {:?}", e)))?;
        tracing::trace!("SPI tx {:02X?} rx {:02X?}", tx, rx);
        Ok(rx)
    }
}
