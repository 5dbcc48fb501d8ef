//! State owned by the sampling thread
//!
//! [`SamplerContext`] holds everything the sampling loop mutates: the
//! transport and its pipeline tracker, the latest sample of every channel,
//! the auxiliary slots, the batch assembler and the stimulation sequencer.
//! It is moved into the sampling thread and never shared.

use super::batch::{AppendOutcome, BatchAssembler};
use super::host::{HostAction, HostRequest, RawHostFrame};
use super::stim::StimSequencer;
use super::AuxSlots;
use crate::chip::{
    bring_up_sequence, regs, ChipCommand, ChipTransport, Decoded, Exchange, PipelineTracker,
    AUX_SLOT_COUNT, CHANNEL_COUNT, EXPECTED_CHIP_ID, FILLER_COMMAND,
};
use crate::config::DeviceConfig;
use crate::error::FrameError;
use crate::queue::{EnqueueOutcome, QueueSender};
use crate::relay::OutgoingBatch;
use crate::types::{ChannelMask, ChannelSample, SamplerStats};
use std::time::Instant;

/// Mutable state of the sampling loop
pub struct SamplerContext {
    transport: Box<dyn ChipTransport>,
    tracker: PipelineTracker,
    samples: [ChannelSample; CHANNEL_COUNT],
    slots: AuxSlots,
    batch: BatchAssembler,
    stim: StimSequencer,
    outbound: QueueSender<OutgoingBatch>,
    flush_threshold: usize,
    initialized: bool,
    chip_id: Option<u16>,
    stats: SamplerStats,
}

impl SamplerContext {
    /// Build the context; the chip is not touched until [`initialize_chip`](Self::initialize_chip)
    pub fn new(
        config: &DeviceConfig,
        transport: Box<dyn ChipTransport>,
        outbound: QueueSender<OutgoingBatch>,
    ) -> Self {
        Self {
            transport,
            tracker: PipelineTracker::new(),
            samples: [ChannelSample::default(); CHANNEL_COUNT],
            slots: AuxSlots::default(),
            batch: BatchAssembler::new(config.sampling.batch_capacity),
            stim: StimSequencer::new(&config.stimulation),
            outbound,
            flush_threshold: config.sampling.flush_threshold(),
            initialized: false,
            chip_id: None,
            stats: SamplerStats::default(),
        }
    }

    /// Whether the transport reports the chip powered and reachable
    pub fn transport_ready(&self) -> bool {
        self.transport.is_ready()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Reset pipeline and samples, then issue the power-up sequence
    pub fn initialize_chip(&mut self) {
        tracing::info!("Initializing chip");
        self.tracker.reset();
        self.samples = [ChannelSample::default(); CHANNEL_COUNT];
        self.chip_id = None;

        for command in bring_up_sequence() {
            self.issue(command);
        }
        self.initialized = true;
        tracing::info!("Chip initialized, sampling");
    }

    /// Issue one command through the tracker and absorb the paired response
    pub fn issue(&mut self, command: ChipCommand) -> Option<Decoded> {
        self.stats.exchanges += 1;
        match self.tracker.send_and_track(self.transport.as_mut(), command) {
            Ok(Exchange::Paired { command: answered, decoded }) => {
                self.absorb(answered, decoded);
                Some(decoded)
            }
            Ok(Exchange::Discarded) => None,
            Err(e) => {
                self.stats.transport_failures += 1;
                tracing::error!("Exchange for {} failed: {}", command, e);
                None
            }
        }
    }

    fn absorb(&mut self, answered: ChipCommand, decoded: Decoded) {
        match decoded {
            Decoded::Sample { channel, sample } => {
                self.samples[channel as usize] = sample;
                if self.batch.mask().contains(channel)
                    && self.batch.append(sample.ac) == AppendOutcome::Dropped
                {
                    self.stats.batch_overflows += 1;
                    tracing::error!(
                        "Batch full ({} samples), channel {} sample dropped",
                        self.batch.capacity(),
                        channel
                    );
                }
            }
            Decoded::ReadResult { register, value } => {
                if register == regs::CHIP_ID && self.chip_id != Some(value) {
                    self.chip_id = Some(value);
                    if value == EXPECTED_CHIP_ID {
                        tracing::info!("Chip ID 0x{:04X}", value);
                    } else {
                        tracing::warn!(
                            "Unexpected chip ID 0x{:04X} (expected 0x{:04X})",
                            value,
                            EXPECTED_CHIP_ID
                        );
                    }
                }
            }
            Decoded::WriteAck { ok: false, .. } => {
                self.stats.write_mismatches += 1;
                tracing::warn!("{} was not acknowledged", answered);
            }
            Decoded::WriteAck { ok: true, .. } | Decoded::Unknown => {}
        }
    }

    /// One sampling cycle: CONVERT every channel, then the four slots
    ///
    /// Slots are consumed by the cycle; empty ones carry [`FILLER_COMMAND`].
    pub fn run_cycle(&mut self) {
        for channel in 0..CHANNEL_COUNT as u8 {
            self.issue(ChipCommand::convert(channel));
        }
        let slots = std::mem::take(&mut self.slots);
        for slot in slots {
            self.issue(slot.unwrap_or(FILLER_COMMAND));
        }
        self.stats.cycles += 1;
    }

    /// Refill the slots for the next cycle: host requests first, then stimulation
    ///
    /// Request *i* lands in slot *i*; at most [`AUX_SLOT_COUNT`] requests
    /// are considered. A stimulation tick overwrites whatever it needs.
    pub fn prepare_slots(&mut self, requests: &[RawHostFrame], now: Instant) {
        self.slots = AuxSlots::default();

        for (index, frame) in requests.iter().take(AUX_SLOT_COUNT).enumerate() {
            match HostRequest::parse(frame) {
                Ok(request) => {
                    self.stats.host_requests_applied += 1;
                    match request.action() {
                        HostAction::Slot(command) => {
                            tracing::debug!("Host request {:?} -> slot {}", request, index);
                            self.slots[index] = Some(command);
                        }
                        HostAction::SetRecordingMask(mask) => self.set_recording_mask(mask),
                    }
                }
                Err(FrameError::TooShort { len }) => {
                    self.stats.host_requests_rejected += 1;
                    tracing::debug!("Ignoring {}-byte host frame", len);
                }
                Err(e) => {
                    self.stats.host_requests_rejected += 1;
                    tracing::warn!("Ignoring host frame: {}", e);
                }
            }
        }

        if self.stim.tick(now, &mut self.slots).is_some() {
            self.stats.stim_ticks += 1;
        }
    }

    /// Flush under the current mask, then record `mask`
    pub fn set_recording_mask(&mut self, mask: ChannelMask) {
        tracing::info!("Recording mask {} -> {}", self.batch.mask(), mask);
        let batch = self.batch.replace_mask(mask);
        self.dispatch(batch);
    }

    /// Flush once the batch reaches the threshold
    pub fn flush_if_due(&mut self) {
        if self.batch.len() >= self.flush_threshold {
            let batch = self.batch.flush();
            self.dispatch(batch);
        }
    }

    fn dispatch(&mut self, batch: OutgoingBatch) {
        self.stats.flushes += 1;
        let sequence = batch.sequence;
        if self.outbound.offer(batch) == EnqueueOutcome::Dropped {
            self.stats.outbound_drops += 1;
            tracing::warn!("Outbound queue full, batch {} dropped", sequence);
        }
    }

    /// Latest sample of every channel
    pub fn samples(&self) -> &[ChannelSample; CHANNEL_COUNT] {
        &self.samples
    }

    /// Commands queued for the next cycle's auxiliary slots
    pub fn slots(&self) -> &AuxSlots {
        &self.slots
    }

    pub fn recording_mask(&self) -> ChannelMask {
        self.batch.mask()
    }

    pub fn buffered(&self) -> usize {
        self.batch.len()
    }

    /// Last chip ID read back
    pub fn chip_id(&self) -> Option<u16> {
        self.chip_id
    }

    pub fn stats(&self) -> &SamplerStats {
        &self.stats
    }
}
