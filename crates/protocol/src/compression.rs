//! The optional zlib compression layer (§4.7), negotiated during the
//! handshake. Wraps the framed-message layer: inflates raw socket bytes
//! before handing them to [`FramedMessageLayer::on_decompressed`], and
//! deflates whatever [`FramedMessageLayer::next_outbound_chunk`] stages.
//!
//! Flush discipline follows the source's `ZLibProtocolLayer`: a full sync
//! flush (`Z_SYNC_FLUSH`) whenever the outbound queue has drained dry, so a
//! peer waiting on a reply is never left stuck behind zlib's internal
//! window buffering; `Z_NO_FLUSH` while more messages are already queued,
//! since the next `compress` call will pick the window back up.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use openrti_net::Connection;

use crate::error::LayerError;
use crate::framing::FramedMessageLayer;
use crate::layer::{read_available, LayerAction, ProtocolLayer, ReadOutcome};

const CHUNK: usize = 32 * 1024;

/// Drives `compress` to consume all of `input` under `flush`, looping the
/// fixed-size output buffer until a call both consumes nothing further and
/// produces nothing further, the point at which the requested flush has
/// been fully emitted.
fn compress_all(compress: &mut Compress, input: &[u8], flush: FlushCompress) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; CHUNK];
    let mut offset = 0;
    loop {
        let before_in = compress.total_in();
        let before_out = compress.total_out();
        let status = compress
            .compress(&input[offset..], &mut buf, flush)
            .expect("zlib compress stream is never corrupt on the encode side");
        let consumed = (compress.total_in() - before_in) as usize;
        let produced = (compress.total_out() - before_out) as usize;
        out.extend_from_slice(&buf[..produced]);
        offset += consumed;
        if status == Status::StreamEnd {
            break;
        }
        if offset >= input.len() && produced == 0 {
            break;
        }
    }
    out
}

/// Corrupt or hostile input surfaces as `Err` rather than panicking; the
/// caller tears the connection down as a `ConnectionLost` (§7) instead of
/// trusting a peer-controlled byte stream to always inflate cleanly.
fn decompress_all(decompress: &mut Decompress, input: &[u8]) -> Result<Vec<u8>, LayerError> {
    let mut out = Vec::new();
    let mut buf = [0u8; CHUNK];
    let mut offset = 0;
    loop {
        let before_in = decompress.total_in();
        let before_out = decompress.total_out();
        let status = decompress
            .decompress(&input[offset..], &mut buf, FlushDecompress::None)
            .map_err(|e| LayerError::other(format!("corrupt zlib stream: {e}")))?;
        let consumed = (decompress.total_in() - before_in) as usize;
        let produced = (decompress.total_out() - before_out) as usize;
        out.extend_from_slice(&buf[..produced]);
        offset += consumed;
        if status == Status::StreamEnd {
            break;
        }
        if offset >= input.len() && produced == 0 {
            break;
        }
    }
    Ok(out)
}

pub struct CompressionLayer {
    inner: FramedMessageLayer,
    compress: Compress,
    decompress: Decompress,
    outbound: Vec<u8>,
    outbound_sent: usize,
}

impl CompressionLayer {
    /// Wraps an already-constructed [`FramedMessageLayer`]; the zlib
    /// header/trailer is emitted (`zlib_header = true`), matching the
    /// "zlib" compression string the handshake negotiated rather than a
    /// headerless raw-deflate stream.
    #[must_use]
    pub fn wrap(inner: FramedMessageLayer) -> Self {
        Self {
            inner,
            compress: Compress::new(Compression::default(), true),
            decompress: Decompress::new(true),
            outbound: Vec::new(),
            outbound_sent: 0,
        }
    }

    fn refill_outbound(&mut self) {
        while self.outbound_sent >= self.outbound.len() {
            let Some(chunk) = self.inner.next_outbound_chunk() else {
                self.outbound.clear();
                self.outbound_sent = 0;
                return;
            };
            let flush = if self.inner.has_more_outbound() {
                FlushCompress::None
            } else {
                FlushCompress::Sync
            };
            self.outbound = compress_all(&mut self.compress, &chunk, flush);
            self.outbound_sent = 0;
            if !self.outbound.is_empty() {
                return;
            }
        }
    }
}

impl ProtocolLayer for CompressionLayer {
    fn wants_read(&self) -> bool {
        self.inner.wants_read()
    }

    fn wants_write(&self) -> bool {
        self.outbound_sent < self.outbound.len() || self.inner.wants_write()
    }

    fn on_readable(&mut self, conn: &Connection) -> Result<LayerAction, LayerError> {
        let mut scratch = [0u8; CHUNK];
        loop {
            match read_available(conn, &mut scratch)? {
                ReadOutcome::Data(n) => {
                    match decompress_all(&mut self.decompress, &scratch[..n]) {
                        Ok(plaintext) => {
                            self.inner.on_decompressed(&plaintext)?;
                            if n < scratch.len() {
                                break;
                            }
                        }
                        Err(err) => {
                            self.inner.on_lower_closed(err.to_string());
                            return Ok(LayerAction::Close);
                        }
                    }
                }
                ReadOutcome::WouldBlock => break,
                ReadOutcome::Eof => {
                    self.inner
                        .on_lower_closed("peer closed the connection".to_string());
                    return Ok(LayerAction::Close);
                }
            }
        }
        Ok(LayerAction::Continue)
    }

    fn on_writable(&mut self, conn: &Connection) -> Result<LayerAction, LayerError> {
        loop {
            self.refill_outbound();
            if self.outbound_sent >= self.outbound.len() {
                return Ok(LayerAction::Continue);
            }
            let n = crate::layer::ignore_would_block(
                conn.try_write(&self.outbound[self.outbound_sent..]),
            )?;
            if n == 0 {
                return Ok(LayerAction::Continue);
            }
            self.outbound_sent += n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_compress_and_decompress() {
        let mut compress = Compress::new(Compression::default(), true);
        let mut decompress = Decompress::new(true);
        let plaintext = b"the quick brown fox jumps over the lazy dog".repeat(40);

        let compressed = compress_all(&mut compress, &plaintext, FlushCompress::Sync);
        assert!(!compressed.is_empty());
        let restored = decompress_all(&mut decompress, &compressed).unwrap();
        assert_eq!(restored, plaintext);
    }

    #[test]
    fn empty_input_compresses_to_a_valid_flush_with_nothing_to_restore() {
        let mut compress = Compress::new(Compression::default(), true);
        let mut decompress = Decompress::new(true);
        let compressed = compress_all(&mut compress, &[], FlushCompress::Sync);
        let restored = decompress_all(&mut decompress, &compressed).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn corrupt_stream_is_rejected_instead_of_panicking() {
        let mut decompress = Decompress::new(true);
        let garbage = vec![0xffu8; 16];
        assert!(decompress_all(&mut decompress, &garbage).is_err());
    }

    proptest::proptest! {
        /// Any byte string survives a compress/decompress round trip
        /// regardless of flush discipline.
        #[test]
        fn round_trips_for_any_input(bytes in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..4096)) {
            let mut compress = Compress::new(Compression::default(), true);
            let mut decompress = Decompress::new(true);
            let compressed = compress_all(&mut compress, &bytes, FlushCompress::Sync);
            let restored = decompress_all(&mut decompress, &compressed).unwrap();
            prop_assert_eq!(restored, bytes);
        }
    }
}
