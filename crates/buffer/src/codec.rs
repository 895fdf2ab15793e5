//! Aligned/unaligned primitive accessors and LEB128-style varints over a
//! single contiguous, growable byte blob.
//!
//! This is the codec layer framed messages and the handshake envelope are
//! built on; it is deliberately simpler than [`crate::buffer::Buffer`]'s
//! chunk-aware cursor, matching the "buffer reference plus monotonic
//! offset" shape described for encode/decode cursors.

use crate::blob::VariableLengthData;
use crate::error::ProtocolError;

/// Padding byte written by aligned encoders, consumed (and ignored) by
/// aligned decoders.
pub const ALIGNMENT_PAD: u8 = 0xff;

/// A write cursor over a growable [`VariableLengthData`]. Writes always
/// succeed, auto-extending the backing storage.
#[derive(Debug)]
pub struct EncodeCursor<'a> {
    data: &'a mut VariableLengthData,
}

impl<'a> EncodeCursor<'a> {
    pub fn new(data: &'a mut VariableLengthData) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.data.size()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Pads with [`ALIGNMENT_PAD`] bytes up to the next multiple of `n`.
    pub fn align(&mut self, n: usize) {
        let rem = self.offset() % n;
        if rem != 0 {
            let pad = n - rem;
            self.data.extend_from_slice(&vec![ALIGNMENT_PAD; pad]);
        }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub fn write_u16_be(&mut self, v: u16) {
        self.write_bytes(&v.to_be_bytes());
    }
    pub fn write_u16_le(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }
    pub fn write_u32_be(&mut self, v: u32) {
        self.write_bytes(&v.to_be_bytes());
    }
    pub fn write_u32_le(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }
    pub fn write_u64_be(&mut self, v: u64) {
        self.write_bytes(&v.to_be_bytes());
    }
    pub fn write_u64_le(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_aligned_u16_be(&mut self, v: u16) {
        self.align(2);
        self.write_u16_be(v);
    }
    pub fn write_aligned_u32_be(&mut self, v: u32) {
        self.align(4);
        self.write_u32_be(v);
    }
    pub fn write_aligned_u64_be(&mut self, v: u64) {
        self.align(8);
        self.write_u64_be(v);
    }

    pub fn write_f32_be(&mut self, v: f32) {
        self.write_u32_be(v.to_bits());
    }
    pub fn write_f64_be(&mut self, v: f64) {
        self.write_u64_be(v.to_bits());
    }
    pub fn write_aligned_f32_be(&mut self, v: f32) {
        self.write_aligned_u32_be(v.to_bits());
    }
    pub fn write_aligned_f64_be(&mut self, v: f64) {
        self.write_aligned_u64_be(v.to_bits());
    }

    /// LEB128: least-significant 7-bit groups first, high bit set on every
    /// byte but the last. Zero encodes as a single `0x00`.
    pub fn write_varint_u64(&mut self, mut v: u64) {
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
                self.write_u8(byte);
            } else {
                self.write_u8(byte);
                break;
            }
        }
    }

    /// Signed varints reuse the unsigned shape over the reinterpreted bit
    /// pattern (no zigzag transform), per the wire format notes.
    pub fn write_varint_i64(&mut self, v: i64) {
        self.write_varint_u64(v as u64);
    }
}

/// A read cursor over a byte slice. Reads past the end fail with
/// [`ProtocolError::ReadBeyondEnd`].
#[derive(Debug, Clone, Copy)]
pub struct DecodeCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> DecodeCursor<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::ReadBeyondEnd);
        }
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    /// Consumes padding bytes up to the next multiple of `n`, ignoring
    /// their value.
    pub fn align(&mut self, n: usize) -> Result<(), ProtocolError> {
        let rem = self.offset % n;
        if rem != 0 {
            self.read_bytes(n - rem)?;
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_be_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }
    pub fn read_u16_le(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_le_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }
    pub fn read_u32_be(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_be_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }
    pub fn read_u32_le(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_le_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }
    pub fn read_u64_be(&mut self) -> Result<u64, ProtocolError> {
        Ok(u64::from_be_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }
    pub fn read_u64_le(&mut self) -> Result<u64, ProtocolError> {
        Ok(u64::from_le_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }

    pub fn read_aligned_u16_be(&mut self) -> Result<u16, ProtocolError> {
        self.align(2)?;
        self.read_u16_be()
    }
    pub fn read_aligned_u32_be(&mut self) -> Result<u32, ProtocolError> {
        self.align(4)?;
        self.read_u32_be()
    }
    pub fn read_aligned_u64_be(&mut self) -> Result<u64, ProtocolError> {
        self.align(8)?;
        self.read_u64_be()
    }

    pub fn read_f32_be(&mut self) -> Result<f32, ProtocolError> {
        Ok(f32::from_bits(self.read_u32_be()?))
    }
    pub fn read_f64_be(&mut self) -> Result<f64, ProtocolError> {
        Ok(f64::from_bits(self.read_u64_be()?))
    }
    pub fn read_aligned_f32_be(&mut self) -> Result<f32, ProtocolError> {
        Ok(f32::from_bits(self.read_aligned_u32_be()?))
    }
    pub fn read_aligned_f64_be(&mut self) -> Result<f64, ProtocolError> {
        Ok(f64::from_bits(self.read_aligned_u64_be()?))
    }

    pub fn read_varint_u64(&mut self) -> Result<u64, ProtocolError> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift >= 64 {
                return Err(ProtocolError::other("varint too long"));
            }
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        Ok(result)
    }

    pub fn read_varint_i64(&mut self) -> Result<i64, ProtocolError> {
        Ok(self.read_varint_u64()? as i64)
    }
}

/// Number of bytes [`EncodeCursor::write_varint_u64`] would emit for `v`.
#[must_use]
pub fn varint_len(v: u64) -> usize {
    if v == 0 {
        return 1;
    }
    let bits = 64 - v.leading_zeros() as usize;
    bits.div_ceil(7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_known_encodings() {
        let mut d = VariableLengthData::new();
        let mut c = EncodeCursor::new(&mut d);
        c.write_varint_u64(127);
        c.write_varint_u64(128);
        c.write_varint_u64(16384);
        assert_eq!(d.data(), &[0x7f, 0x80, 0x01, 0x80, 0x80, 0x01]);
    }

    #[test]
    fn varint_zero_is_single_byte() {
        let mut d = VariableLengthData::new();
        let mut c = EncodeCursor::new(&mut d);
        c.write_varint_u64(0);
        assert_eq!(d.data(), &[0]);
    }

    #[test]
    fn varint_round_trip_and_length() {
        for v in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut d = VariableLengthData::new();
            {
                let mut c = EncodeCursor::new(&mut d);
                c.write_varint_u64(v);
            }
            assert_eq!(d.size(), varint_len(v), "length mismatch for {v}");
            let mut dc = DecodeCursor::new(d.data());
            assert_eq!(dc.read_varint_u64().unwrap(), v);
            assert!(dc.is_empty());
        }
    }

    #[test]
    fn aligned_accessor_pads_with_0xff_and_advances_to_multiple() {
        let mut d = VariableLengthData::new();
        {
            let mut c = EncodeCursor::new(&mut d);
            c.write_u8(1);
            c.write_aligned_u32_be(0xdead_beef);
        }
        // offset was 1, pad 3 bytes of 0xff, then 4 bytes big-endian value.
        assert_eq!(d.data()[1..4], [0xff, 0xff, 0xff]);
        assert_eq!(d.size(), 8);
        let mut dc = DecodeCursor::new(d.data());
        assert_eq!(dc.read_u8().unwrap(), 1);
        assert_eq!(dc.read_aligned_u32_be().unwrap(), 0xdead_beef);
    }

    #[test]
    fn read_beyond_end_fails() {
        let d = VariableLengthData::from_vec(vec![1, 2]);
        let mut dc = DecodeCursor::new(d.data());
        assert!(dc.read_u32_be().is_err());
    }

    #[test]
    fn float_round_trip() {
        let mut d = VariableLengthData::new();
        {
            let mut c = EncodeCursor::new(&mut d);
            c.write_f64_be(std::f64::consts::PI);
        }
        let mut dc = DecodeCursor::new(d.data());
        assert_eq!(dc.read_f64_be().unwrap(), std::f64::consts::PI);
    }

    proptest::proptest! {
        /// For all unsigned integers x <= u64::MAX, decode_varint(encode_varint(x)) == x
        /// and the byte length equals max(1, ceil(bit_length(x)/7)).
        #[test]
        fn varint_u64_round_trips_for_any_value(v: u64) {
            let mut d = VariableLengthData::new();
            {
                let mut c = EncodeCursor::new(&mut d);
                c.write_varint_u64(v);
            }
            prop_assert_eq!(d.size(), varint_len(v));
            let mut dc = DecodeCursor::new(d.data());
            prop_assert_eq!(dc.read_varint_u64().unwrap(), v);
            prop_assert!(dc.is_empty());
        }

        #[test]
        fn varint_i64_round_trips_for_any_value(v: i64) {
            let mut d = VariableLengthData::new();
            {
                let mut c = EncodeCursor::new(&mut d);
                c.write_varint_i64(v);
            }
            let mut dc = DecodeCursor::new(d.data());
            prop_assert_eq!(dc.read_varint_i64().unwrap(), v);
            prop_assert!(dc.is_empty());
        }
    }
}
