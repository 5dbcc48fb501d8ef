//! Fake transports and links

use crossbeam_channel::{unbounded, Receiver};
use rhs_relay::chip::ChipTransport;
use rhs_relay::relay::ChannelHostLink;
use rhs_relay::{OutgoingBatch, Result};
use std::collections::VecDeque;

/// Transport that answers each instruction with a scripted word,
/// delivered two exchanges later the way the chip does
pub struct ScriptedChip {
    script: VecDeque<u32>,
    in_flight: VecDeque<u32>,
    pub sent: Vec<u32>,
}

impl ScriptedChip {
    /// `responses[i]` is the answer to the i-th instruction sent
    pub fn new(responses: &[u32]) -> Self {
        Self {
            script: responses.iter().copied().collect(),
            in_flight: VecDeque::from(vec![0, 0]),
            sent: Vec::new(),
        }
    }
}

impl ChipTransport for ScriptedChip {
    fn exchange(&mut self, tx: [u8; 4]) -> Result<[u8; 4]> {
        self.sent.push(u32::from_be_bytes(tx));
        self.in_flight.push_back(self.script.pop_front().unwrap_or(0));
        Ok(self.in_flight.pop_front().unwrap_or(0).to_be_bytes())
    }
}

/// Host link whose frames can be read back, decoded
pub fn recording_link() -> (ChannelHostLink, Receiver<Vec<u8>>) {
    let (tx, rx) = unbounded();
    (ChannelHostLink::new(tx), rx)
}

/// Decode every frame received so far
pub fn drain_batches(rx: &Receiver<Vec<u8>>) -> Vec<OutgoingBatch> {
    rx.try_iter()
        .map(|frame| OutgoingBatch::decode(&frame).unwrap())
        .collect()
}
