use crate::index::DEFAULT_BUCKETS;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Fixed bucket count of every hash index built with this config.
    pub bucket_count: usize,
    /// Bitmaps buffered by the bulk builder before their artifacts are written.
    pub batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { bucket_count: DEFAULT_BUCKETS, batch_size: DEFAULT_BATCH_SIZE }
    }
}
