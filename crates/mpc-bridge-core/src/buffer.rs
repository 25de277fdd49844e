//! Owned byte buffers and packed buffer arrays.
//!
//! Every buffer that can carry key material is a [`SecretBytes`], which zeroes
//! its contents when dropped. [`BufferArray`] packs N results into one
//! contiguous allocation plus a parallel list of lengths.

use crate::{Error, Result};
use zeroize::Zeroizing;

/// Heap buffer that is zeroed on drop
pub type SecretBytes = Zeroizing<Vec<u8>>;

/// Copy bytes into a fresh zeroizing buffer
pub fn secret(bytes: &[u8]) -> SecretBytes {
    Zeroizing::new(bytes.to_vec())
}

/// Ordered collection of buffers packed as one contiguous region
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BufferArray {
    data: SecretBytes,
    lengths: Vec<usize>,
}

impl BufferArray {
    /// Pack a list of byte sequences.
    ///
    /// If every element is empty the result collapses to zero elements, which
    /// is how a party with no output (the non-receiver of an asymmetric
    /// protocol) is represented.
    pub fn pack<I, B>(items: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut data = Zeroizing::new(Vec::new());
        let mut lengths = Vec::new();
        for item in items {
            let item = item.as_ref();
            data.extend_from_slice(item);
            lengths.push(item.len());
        }
        if data.is_empty() {
            lengths.clear();
        }
        Self { data, lengths }
    }

    /// Rebuild from a contiguous region and its lengths
    pub fn from_parts(data: &[u8], lengths: &[usize]) -> Result<Self> {
        let total = lengths
            .iter()
            .try_fold(0usize, |acc, len| acc.checked_add(*len))
            .ok_or_else(|| Error::BadArgument("buffer lengths overflow".into()))?;
        if total != data.len() {
            return Err(Error::BadArgument(format!(
                "buffer lengths sum to {total}, data holds {}",
                data.len()
            )));
        }
        Ok(Self {
            data: Zeroizing::new(data.to_vec()),
            lengths: lengths.to_vec(),
        })
    }

    /// Number of logical buffers
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Contiguous backing bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Per-element lengths
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Borrow element `index`
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        let len = *self.lengths.get(index)?;
        let start: usize = self.lengths[..index].iter().sum();
        self.data.get(start..start + len)
    }

    /// Iterate elements in order
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let mut offset = 0;
        self.lengths.iter().map(move |len| {
            let item = &self.data[offset..offset + len];
            offset += len;
            item
        })
    }

    /// Copy out the elements as separate vectors
    pub fn to_vecs(&self) -> Vec<Vec<u8>> {
        self.iter().map(<[u8]>::to_vec).collect()
    }
}

impl std::fmt::Debug for BufferArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferArray")
            .field("lengths", &self.lengths)
            .finish_non_exhaustive()
    }
}
