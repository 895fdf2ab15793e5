//! Big-endian, 4-byte-aligned `map<string, list<string>>` codec used by the
//! handshake envelope (§6.1) and the server configuration representation.

use openrti_buffer::{DecodeCursor, EncodeCursor, ProtocolError, VariableLengthData};

/// Ordered mapping from string keys to lists of strings. Insertion order is
/// preserved; lookups are linear, which is appropriate for the handful of
/// entries a handshake or config negotiation ever carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionMap {
    entries: Vec<(String, Vec<String>)>,
}

impl OptionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn set(&mut self, key: impl Into<String>, values: Vec<String>) -> &mut Self {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = values;
        } else {
            self.entries.push((key, values));
        }
        self
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, values: Vec<String>) -> Self {
        self.set(key, values);
        self
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn write_padded_string(cursor: &mut EncodeCursor<'_>, s: &str) {
    let bytes = s.as_bytes();
    cursor.write_u32_be(bytes.len() as u32);
    cursor.write_bytes(bytes);
    cursor.align(4);
}

fn read_padded_string(cursor: &mut DecodeCursor<'_>) -> Result<String, ProtocolError> {
    let len = cursor.read_u32_be()? as usize;
    let bytes = cursor.read_bytes(len)?.to_vec();
    cursor.align(4)?;
    String::from_utf8(bytes).map_err(|e| ProtocolError::other(format!("invalid utf8 in option map: {e}")))
}

/// Encodes `map` into the body format described in §6.1: a `u32` entry
/// count followed by `(key, list<value>)` pairs, each length-prefixed
/// string padded to a 4-byte boundary.
#[must_use]
pub fn encode_option_map(map: &OptionMap) -> VariableLengthData {
    let mut data = VariableLengthData::new();
    let mut cursor = EncodeCursor::new(&mut data);
    cursor.write_u32_be(map.entries.len() as u32);
    for (key, values) in &map.entries {
        write_padded_string(&mut cursor, key);
        cursor.write_u32_be(values.len() as u32);
        for value in values {
            write_padded_string(&mut cursor, value);
        }
    }
    data
}

/// Decodes a body previously produced by [`encode_option_map`].
pub fn decode_option_map(bytes: &[u8]) -> Result<OptionMap, ProtocolError> {
    let mut cursor = DecodeCursor::new(bytes);
    let mut map = OptionMap::new();
    let count = cursor.read_u32_be()?;
    for _ in 0..count {
        let key = read_padded_string(&mut cursor)?;
        let value_count = cursor.read_u32_be()?;
        let mut values = Vec::with_capacity(value_count as usize);
        for _ in 0..value_count {
            values.push(read_padded_string(&mut cursor)?);
        }
        map.set(key, values);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_round_trips() {
        let map = OptionMap::new();
        let encoded = encode_option_map(&map);
        assert_eq!(decode_option_map(encoded.data()).unwrap(), map);
    }

    #[test]
    fn single_entry_matches_known_byte_layout() {
        let map = OptionMap::new().with("version", vec!["8".to_string()]);
        let encoded = encode_option_map(&map);
        let expected: &[u8] = &[
            0x00, 0x00, 0x00, 0x01, // 1 entry
            0x00, 0x00, 0x00, 0x07, b'v', b'e', b'r', b's', b'i', b'o', b'n', 0x00, // key + pad
            0x00, 0x00, 0x00, 0x01, // 1 value
            0x00, 0x00, 0x00, 0x01, b'8', 0x00, 0x00, 0x00, // value + pad
        ];
        assert_eq!(encoded.data(), expected);
        assert_eq!(decode_option_map(encoded.data()).unwrap(), map);
    }

    #[test]
    fn round_trip_arbitrary_utf8_map() {
        let map = OptionMap::new()
            .with("encoding", vec!["TightBE1".to_string()])
            .with("unicode", vec!["\u{1F600}".to_string(), "caf\u{e9}".to_string()]);
        let encoded = encode_option_map(&map);
        assert_eq!(decode_option_map(encoded.data()).unwrap(), map);
    }
}
