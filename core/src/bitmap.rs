use crate::error::{IndexError, Result};
use crate::index::DocId;
use std::collections::HashMap;

/// Bijection from the doc ids of one corpus snapshot onto `0..N`.
///
/// Built once per build pass. Documents added to the corpus afterwards have
/// no slot and are invisible to bitmaps built from this snapshot.
#[derive(Debug, Clone, Default)]
pub struct DenseDocIndex {
    ids: Vec<DocId>,
    slots: HashMap<DocId, usize>,
}

impl DenseDocIndex {
    /// Assign slots in snapshot order. A repeated id keeps its first slot.
    pub fn from_snapshot<I: IntoIterator<Item = DocId>>(snapshot: I) -> Self {
        let mut dense = DenseDocIndex::default();
        for doc_id in snapshot {
            if let std::collections::hash_map::Entry::Vacant(v) = dense.slots.entry(doc_id) {
                v.insert(dense.ids.len());
                dense.ids.push(doc_id);
            }
        }
        dense
    }

    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    pub fn position(&self, doc_id: DocId) -> Option<usize> {
        self.slots.get(&doc_id).copied()
    }

    pub fn doc_at(&self, index: usize) -> Option<DocId> {
        self.ids.get(index).copied()
    }
}

/// Presence bitmap over a dense doc space. Bit `i` is byte `i / 8`,
/// mask `0x80 >> (i % 8)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    bytes: Vec<u8>,
    bits: usize,
}

impl Bitmap {
    pub fn zeroed(bits: usize) -> Self {
        Self { bytes: vec![0u8; bits.div_ceil(8)], bits }
    }

    pub fn from_bytes(bytes: Vec<u8>, bits: usize) -> Result<Self> {
        if bytes.len() != bits.div_ceil(8) {
            return Err(IndexError::malformed(format!(
                "bitmap of {} bytes cannot hold exactly {bits} bits",
                bytes.len()
            )));
        }
        Ok(Self { bytes, bits })
    }

    /// Build the bitmap of one posting list. Doc ids missing from the
    /// snapshot are stale and skipped.
    pub fn from_postings(postings: &[DocId], dense: &DenseDocIndex) -> Self {
        let mut bitmap = Bitmap::zeroed(dense.len());
        let mut stale = 0usize;
        for &doc_id in postings {
            match dense.position(doc_id) {
                Some(i) => bitmap.set(i),
                None => stale += 1,
            }
        }
        if stale > 0 {
            tracing::debug!(stale, "skipped doc ids outside the snapshot");
        }
        bitmap
    }

    /// Bitmap with the given 1-based positions set.
    pub fn from_positions(positions: &[u32], bits: usize) -> Result<Self> {
        let mut bitmap = Bitmap::zeroed(bits);
        for &p in positions {
            let i = (p as usize).checked_sub(1).filter(|&i| i < bits).ok_or_else(|| {
                IndexError::malformed(format!("position {p} outside bitmap of {bits} bits"))
            })?;
            bitmap.set(i);
        }
        Ok(bitmap)
    }

    pub fn set(&mut self, i: usize) {
        assert!(i < self.bits, "bit {i} out of range for {} bits", self.bits);
        self.bytes[i / 8] |= 0x80 >> (i % 8);
    }

    pub fn get(&self, i: usize) -> bool {
        i < self.bits && self.bytes[i / 8] & (0x80 >> (i % 8)) != 0
    }

    pub fn bits(&self) -> usize { self.bits }

    pub fn as_bytes(&self) -> &[u8] { &self.bytes }

    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Ascending 1-based positions of the set bits.
    pub fn positions(&self) -> Vec<u32> {
        (0..self.bits).filter(|&i| self.get(i)).map(|i| i as u32 + 1).collect()
    }

    /// Map the set bits back to doc ids through the snapshot.
    pub fn doc_ids(&self, dense: &DenseDocIndex) -> Vec<DocId> {
        (0..self.bits).filter(|&i| self.get(i)).filter_map(|i| dense.doc_at(i)).collect()
    }
}
