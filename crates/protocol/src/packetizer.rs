//! The stream-buffer packetizer (§4.4): drives a fixed-size read region and
//! a staged write buffer over a raw, non-blocking [`Connection`]. Used by
//! the handshake layer, whose packets (12-byte header, then a variable-size
//! body whose length the header just gave us) are always known-size ahead
//! of time, unlike the framed-message layer (§4.8), which discovers each
//! packet's length from a varint it has to parse incrementally and so
//! drives its own buffer directly (see `crate::framing`).

use openrti_net::Connection;

use crate::error::LayerError;
use crate::layer::{read_available, ReadOutcome};

/// Accumulates exactly `expect`-many bytes across however many non-blocking
/// reads it takes, then hands the complete region to the caller via
/// [`take`]. Mirrors "expand the expected input buffer in reaction to
/// partial reads" (§4.4).
///
/// [`take`]: PacketReader::take
#[derive(Debug, Default)]
pub struct PacketReader {
    buf: Vec<u8>,
    want: usize,
}

impl PacketReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that `n` more bytes are needed before [`fill`] reports the
    /// region as complete.
    ///
    /// [`fill`]: PacketReader::fill
    pub fn expect(&mut self, n: usize) {
        self.want += n;
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.want == 0
    }

    /// Reads as much as is immediately available without blocking. Returns
    /// `Ok(true)` once the expected region (set by [`expect`]) is
    /// completely filled; `Ok(false)` if the socket ran out of readable
    /// bytes first. EOF before the region fills is a [`LayerError::ConnectionLost`].
    ///
    /// [`expect`]: PacketReader::expect
    pub fn fill(&mut self, conn: &Connection) -> Result<bool, LayerError> {
        while self.buf.len() < self.want {
            let mut chunk = vec![0u8; self.want - self.buf.len()];
            match read_available(conn, &mut chunk)? {
                ReadOutcome::Data(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                }
                ReadOutcome::WouldBlock => return Ok(false),
                ReadOutcome::Eof => {
                    return Err(LayerError::ConnectionLost(
                        "peer closed the connection".to_string(),
                    ))
                }
            }
        }
        Ok(true)
    }

    /// Takes the completed region and resets for the next packet.
    pub fn take(&mut self) -> Vec<u8> {
        self.want = 0;
        std::mem::take(&mut self.buf)
    }
}

/// Stages exactly one outbound packet at a time and drains it across
/// however many non-blocking writes it takes.
#[derive(Debug, Default)]
pub struct PacketWriter {
    pending: Vec<u8>,
    sent: usize,
}

impl PacketWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn stage(&mut self, packet: Vec<u8>) {
        self.pending = packet;
        self.sent = 0;
    }

    /// Writes as much of the staged packet as the socket accepts right
    /// now. Returns `Ok(true)` once fully drained (and resets for the next
    /// packet), `Ok(false)` if the socket is not writable yet.
    pub fn drain(&mut self, conn: &Connection) -> Result<bool, LayerError> {
        while self.sent < self.pending.len() {
            let n = crate::layer::ignore_would_block(conn.try_write(&self.pending[self.sent..]))?;
            if n == 0 {
                return Ok(false);
            }
            self.sent += n;
        }
        self.pending.clear();
        self.sent = 0;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_and_writer_start_idle() {
        assert!(PacketReader::new().is_idle());
        assert!(PacketWriter::new().is_idle());
    }

    #[test]
    fn reader_accumulates_expectation() {
        let mut reader = PacketReader::new();
        reader.expect(12);
        assert!(!reader.is_idle());
        reader.expect(8);
        assert!(!reader.is_idle());
    }
}
