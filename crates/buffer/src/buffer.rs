use crate::blob::VariableLengthData;

/// An ordered sequence of byte blobs, the non-contiguous container backing
/// scatter/gather socket I/O. Total length is the sum of chunk sizes; empty
/// chunks are never left in canonical cursor positions (see [`ChunkCursor`]).
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    chunks: Vec<VariableLengthData>,
}

impl Buffer {
    #[must_use]
    pub fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    #[must_use]
    pub fn chunks(&self) -> &[VariableLengthData] {
        &self.chunks
    }

    pub fn push_chunk(&mut self, chunk: VariableLengthData) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    #[must_use]
    pub fn total_len(&self) -> usize {
        self.chunks.iter().map(VariableLengthData::size).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(VariableLengthData::is_empty)
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Concatenates every chunk into one contiguous buffer. Used by codecs
    /// that don't need to preserve the chunk boundary for scatter/gather I/O.
    #[must_use]
    pub fn to_contiguous(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len());
        for chunk in &self.chunks {
            out.extend_from_slice(chunk.data());
        }
        out
    }

    #[must_use]
    pub fn cursor_at_start(&self) -> ChunkCursor {
        ChunkCursor::canonical(self, 0, 0)
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        let mut buf = Self::new();
        buf.push_chunk(VariableLengthData::from_vec(bytes));
        buf
    }
}

/// A byte cursor into a [`Buffer`]: the pair `(chunk, offset)`.
///
/// Advancing past the end of a chunk moves to the next chunk with
/// `offset == 0`; canonical form never leaves the cursor sitting on an
/// empty chunk (mirrors the invariant in §4.2 of the design notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCursor {
    chunk: usize,
    offset: usize,
}

impl ChunkCursor {
    fn canonical(buffer: &Buffer, mut chunk: usize, mut offset: usize) -> Self {
        while chunk < buffer.chunks.len() && offset >= buffer.chunks[chunk].size() {
            offset -= buffer.chunks[chunk].size();
            chunk += 1;
        }
        // Skip any empty chunks so the cursor never rests on one, unless
        // we've run off the end of the chunk list (a valid "at end" state).
        while chunk < buffer.chunks.len() && buffer.chunks[chunk].is_empty() {
            chunk += 1;
        }
        Self { chunk, offset }
    }

    #[must_use]
    pub fn chunk_index(&self) -> usize {
        self.chunk
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of contiguous bytes reachable from this cursor without
    /// crossing into another chunk, bounded by `remaining_total`.
    #[must_use]
    pub fn chunk_size(&self, buffer: &Buffer, remaining_total: usize) -> usize {
        let Some(chunk) = buffer.chunks.get(self.chunk) else {
            return 0;
        };
        (chunk.size() - self.offset).min(remaining_total)
    }

    #[must_use]
    pub fn advance(&self, buffer: &Buffer, n: usize) -> Self {
        Self::canonical(buffer, self.chunk, self.offset + n)
    }

    /// Decrements the cursor by `n` bytes. Symmetric with [`advance`].
    ///
    /// [`advance`]: ChunkCursor::advance
    #[must_use]
    pub fn retreat(&self, buffer: &Buffer, n: usize) -> Self {
        let mut remaining = n;
        let mut chunk = self.chunk;
        let mut offset = self.offset;
        while remaining > 0 {
            if offset >= remaining {
                offset -= remaining;
                remaining = 0;
            } else {
                remaining -= offset;
                chunk = chunk.saturating_sub(1);
                offset = buffer.chunks.get(chunk).map_or(0, VariableLengthData::size);
                if offset >= remaining {
                    offset -= remaining;
                    remaining = 0;
                }
            }
        }
        Self { chunk, offset }
    }

    #[must_use]
    pub fn byte_offset(&self, buffer: &Buffer) -> usize {
        buffer.chunks[..self.chunk.min(buffer.chunks.len())]
            .iter()
            .map(VariableLengthData::size)
            .sum::<usize>()
            + self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_crosses_chunk_boundary_to_canonical_offset_zero() {
        let mut buf = Buffer::new();
        buf.push_chunk(VariableLengthData::from_vec(vec![1, 2, 3]));
        buf.push_chunk(VariableLengthData::from_vec(vec![4, 5]));
        let start = buf.cursor_at_start();
        let advanced = start.advance(&buf, 3);
        assert_eq!(advanced.chunk_index(), 1);
        assert_eq!(advanced.offset(), 0);
    }

    #[test]
    fn empty_chunks_are_transparent_to_cursor_position() {
        let mut buf = Buffer::new();
        buf.push_chunk(VariableLengthData::from_vec(vec![1, 2]));
        // Pushing an empty chunk is a no-op: push_chunk drops empty chunks.
        buf.push_chunk(VariableLengthData::from_vec(Vec::new()));
        buf.push_chunk(VariableLengthData::from_vec(vec![3]));
        let c = buf.cursor_at_start().advance(&buf, 2);
        assert_eq!(c.chunk_index(), 1);
        assert_eq!(c.offset(), 0);
    }

    #[test]
    fn advance_then_retreat_is_identity() {
        let mut buf = Buffer::new();
        buf.push_chunk(VariableLengthData::from_vec(vec![1, 2, 3, 4, 5]));
        buf.push_chunk(VariableLengthData::from_vec(vec![6, 7, 8]));
        let start = buf.cursor_at_start();
        let advanced = start.advance(&buf, 6);
        let back = advanced.retreat(&buf, 6);
        assert_eq!(back.byte_offset(&buf), start.byte_offset(&buf));
    }

    #[test]
    fn chunk_size_is_bounded_by_remaining_total() {
        let mut buf = Buffer::new();
        buf.push_chunk(VariableLengthData::from_vec(vec![0; 10]));
        let c = buf.cursor_at_start();
        assert_eq!(c.chunk_size(&buf, 4), 4);
        assert_eq!(c.chunk_size(&buf, 100), 10);
    }

    proptest::proptest! {
        /// For any cursor c and byte count n <= remaining(c), c + n - n == c.
        #[test]
        fn advance_then_retreat_is_identity_for_any_chunking_and_offset(
            chunk_sizes in proptest::collection::vec(0usize..8, 1..6),
            advance_n in 0usize..40,
        ) {
            let mut buf = Buffer::new();
            let mut next_byte = 0u8;
            for size in &chunk_sizes {
                let chunk: Vec<u8> = (0..*size).map(|_| { next_byte = next_byte.wrapping_add(1); next_byte }).collect();
                buf.push_chunk(VariableLengthData::from_vec(chunk));
            }
            let total = buf.total_len();
            let n = advance_n.min(total);
            let start = buf.cursor_at_start();
            let advanced = start.advance(&buf, n);
            let back = advanced.retreat(&buf, n);
            prop_assert_eq!(back.byte_offset(&buf), start.byte_offset(&buf));
        }
    }
}
