//! Host link seam
//!
//! [`HostLink`] is the outbound half of the wireless link. Whatever drives
//! the link's receive path hands inbound bytes to a
//! [`HostInbox`](crate::sampler::HostInbox).

use crate::error::{RelayError, Result};
use crossbeam_channel::Sender;
use std::io::Write;

/// Outbound connection to the host
#[cfg_attr(test, mockall::automock)]
pub trait HostLink: Send {
    /// Prepare the link; called once on the relay thread before any send
    fn bring_up(&mut self) -> Result<()> {
        Ok(())
    }

    /// Transmit one encoded frame
    fn send(&mut self, frame: &[u8]) -> Result<()>;
}

impl<T: HostLink + ?Sized> HostLink for Box<T> {
    fn bring_up(&mut self) -> Result<()> {
        (**self).bring_up()
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        (**self).send(frame)
    }
}

/// Writes each frame as one line of hex
pub struct WriterHostLink<W> {
    writer: W,
}

impl<W: Write + Send> WriterHostLink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> HostLink for WriterHostLink<W> {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        let line: String = frame.iter().map(|b| format!("{:02x}", b)).collect();
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|e| RelayError::HostLink(format!("write failed: {}", e)))
    }
}

/// Forwards frames to a channel; for tests and in-process hosts
pub struct ChannelHostLink {
    tx: Sender<Vec<u8>>,
}

impl ChannelHostLink {
    pub fn new(tx: Sender<Vec<u8>>) -> Self {
        Self { tx }
    }
}

impl HostLink for ChannelHostLink {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.tx
            .send(frame.to_vec())
            .map_err(|_| RelayError::HostLink("receiver disconnected".to_string()))
    }
}

/// Parse one hex line, as written by [`WriterHostLink`]
pub fn parse_hex_line(line: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = line
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks_exact(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(s, 16).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_link_hex_lines() {
        let mut link = WriterHostLink::new(Vec::new());
        link.send(&[0x00, 0x03, 0x00, 0xAB]).unwrap();
        link.send(&[0xFF]).unwrap();
        assert_eq!(
            String::from_utf8(link.into_inner()).unwrap(),
            "000300ab\nff\n"
        );
    }

    #[test]
    fn test_channel_link_disconnected() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut link = ChannelHostLink::new(tx);
        link.send(&[1, 2]).unwrap();
        assert_eq!(rx.recv().unwrap(), vec![1, 2]);
        drop(rx);
        assert!(link.send(&[3]).is_err());
    }

    #[test]
    fn test_parse_hex_line() {
        assert_eq!(parse_hex_line("04 03 00"), Some(vec![0x04, 0x03, 0x00]));
        assert_eq!(parse_hex_line("0403ff"), Some(vec![0x04, 0x03, 0xFF]));
        assert_eq!(parse_hex_line(""), Some(vec![]));
        assert_eq!(parse_hex_line("043"), None);
        assert_eq!(parse_hex_line("zz"), None);
    }
}
