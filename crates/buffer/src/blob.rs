use std::ops::Deref;
use std::sync::Arc;

/// A sized, shareable, copy-on-write byte array.
///
/// Cloning a [`VariableLengthData`] is O(1); the underlying storage is only
/// duplicated the first time a clone is mutated through [`make_mut`].
///
/// [`make_mut`]: VariableLengthData::make_mut
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableLengthData(Arc<Vec<u8>>);

impl VariableLengthData {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(Vec::new()))
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Arc::new(Vec::with_capacity(capacity)))
    }

    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self(Arc::new(bytes))
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.0
    }

    /// Forces private (non-shared) ownership of the backing storage and
    /// returns a mutable view into it, cloning the bytes if another
    /// [`VariableLengthData`] still shares them.
    pub fn make_mut(&mut self) -> &mut Vec<u8> {
        Arc::make_mut(&mut self.0)
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.make_mut().extend_from_slice(bytes);
    }

    pub fn resize(&mut self, new_len: usize, value: u8) {
        self.make_mut().resize(new_len, value);
    }
}

impl Deref for VariableLengthData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for VariableLengthData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_vec(bytes)
    }
}

impl From<&[u8]> for VariableLengthData {
    fn from(bytes: &[u8]) -> Self {
        Self::from_vec(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_empty() {
        let d = VariableLengthData::new();
        assert_eq!(d.size(), 0);
        assert!(d.is_empty());
        assert_eq!(d.data(), &[] as &[u8]);
    }

    #[test]
    fn clone_is_independent_after_make_mut() {
        let original = VariableLengthData::from_vec(vec![1, 2, 3]);
        let mut clone = original.clone();
        clone.make_mut().push(4);
        assert_eq!(original.data(), &[1, 2, 3]);
        assert_eq!(clone.data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn extend_from_slice_appends() {
        let mut d = VariableLengthData::from_vec(vec![1, 2]);
        d.extend_from_slice(&[3, 4]);
        assert_eq!(d.data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn resize_grows_and_shrinks() {
        let mut d = VariableLengthData::from_vec(vec![1, 2, 3]);
        d.resize(5, 0xaa);
        assert_eq!(d.data(), &[1, 2, 3, 0xaa, 0xaa]);
        d.resize(1, 0);
        assert_eq!(d.data(), &[1]);
    }

    #[test]
    fn deref_exposes_slice_methods() {
        let d = VariableLengthData::from_vec(vec![5, 6, 7]);
        assert_eq!(d.len(), 3);
        assert_eq!(&d[1..], &[6, 7]);
    }

    #[test]
    fn from_conversions_match_from_vec() {
        let bytes: &[u8] = &[9, 8, 7];
        assert_eq!(VariableLengthData::from(bytes.to_vec()), VariableLengthData::from_vec(bytes.to_vec()));
        assert_eq!(VariableLengthData::from(bytes), VariableLengthData::from_vec(bytes.to_vec()));
    }
}
