use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub type TermId = u32;
pub type DocId = u32;
pub type Position = u32;

/// Unique doc ids for one term, in insertion order.
pub type PostingList = Vec<DocId>;

pub const DEFAULT_BUCKETS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub term: String,
    pub postings: PostingList,
}

/// DJB2 over the key bytes: `h = h * 33 + c`, starting at 5381.
pub fn djb2(key: &str) -> u64 {
    key.bytes()
        .fold(5381u64, |h, c| h.wrapping_mul(33).wrapping_add(c as u64))
}

/// Term -> posting list map with a fixed number of buckets.
///
/// Each bucket is a chain of entries. New terms are linked at the head of
/// their chain, so chain order is reverse insertion order. The bucket count
/// never changes after construction; heavy collisions only make chains longer.
#[derive(Debug, Clone)]
pub struct HashIndex {
    buckets: Vec<VecDeque<Entry>>,
    len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChainStats {
    pub terms: usize,
    pub occupied_buckets: usize,
    pub longest_chain: usize,
}

impl Default for HashIndex {
    fn default() -> Self { Self::new() }
}

impl HashIndex {
    pub fn new() -> Self {
        Self {
            buckets: vec![VecDeque::new(); DEFAULT_BUCKETS],
            len: 0,
        }
    }

    pub fn with_buckets(bucket_count: usize) -> Result<Self> {
        if bucket_count == 0 {
            return Err(IndexError::InvalidBucketCount);
        }
        Ok(Self { buckets: vec![VecDeque::new(); bucket_count], len: 0 })
    }

    pub fn bucket_count(&self) -> usize { self.buckets.len() }

    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn bucket_of(&self, term: &str) -> usize {
        (djb2(term) % self.buckets.len() as u64) as usize
    }

    /// Record that `doc_id` contains `term`. Repeated pairs are ignored.
    pub fn insert(&mut self, term: &str, doc_id: DocId) {
        let bucket = self.bucket_of(term);
        let chain = &mut self.buckets[bucket];
        if let Some(entry) = chain.iter_mut().find(|e| e.term == term) {
            // linear scan keeps the list a plain vec
            if !entry.postings.contains(&doc_id) {
                entry.postings.push(doc_id);
            }
            return;
        }
        chain.push_front(Entry { term: term.to_string(), postings: vec![doc_id] });
        self.len += 1;
    }

    /// Index every stem of one document.
    pub fn insert_document<S: AsRef<str>>(&mut self, doc_id: DocId, stems: &[S]) {
        for stem in stems {
            self.insert(stem.as_ref(), doc_id);
        }
    }

    pub fn lookup(&self, term: &str) -> Option<&PostingList> {
        self.buckets[self.bucket_of(term)]
            .iter()
            .find(|e| e.term == term)
            .map(|e| &e.postings)
    }

    /// Postings for `term`, empty when the term is absent.
    pub fn postings(&self, term: &str) -> &[DocId] {
        self.lookup(term).map(|p| p.as_slice()).unwrap_or(&[])
    }

    /// Link a whole entry at the head of its chain without any duplicate
    /// checks. Callers must guarantee the term is not present yet.
    pub(crate) fn push_entry(&mut self, entry: Entry) {
        let bucket = self.bucket_of(&entry.term);
        self.buckets[bucket].push_front(entry);
        self.len += 1;
    }

    pub fn chain_len(&self, bucket: usize) -> usize {
        self.buckets.get(bucket).map_or(0, |c| c.len())
    }

    /// Chain contents of one bucket, head first.
    pub fn chain(&self, bucket: usize) -> impl Iterator<Item = &Entry> {
        self.buckets.get(bucket).into_iter().flat_map(|c| c.iter())
    }

    /// All entries, bucket 0 first, each chain head first.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.buckets.iter().flat_map(|c| c.iter())
    }

    pub fn stats(&self) -> ChainStats {
        let mut stats = ChainStats { terms: self.len, ..ChainStats::default() };
        for chain in &self.buckets {
            if !chain.is_empty() {
                stats.occupied_buckets += 1;
                stats.longest_chain = stats.longest_chain.max(chain.len());
            }
        }
        stats
    }
}
