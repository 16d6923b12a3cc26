use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the index engine and its stores.
///
/// Absent terms and stale document references are not errors: lookups return
/// an empty posting list and bitmap construction skips the stale id.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("malformed data: {0}")]
    Malformed(String),

    #[error("unknown query operator: {0}")]
    UnknownOperator(String),

    #[error("bucket count must be greater than zero")]
    InvalidBucketCount,

    #[error("positions are not strictly increasing at index {index}: prev={prev}, next={next}")]
    NotStrictlyIncreasing { index: usize, prev: u32, next: u32 },

    #[error("triple stream is not sorted: ({term}, {doc_id}) follows ({prev_term}, {prev_doc_id})")]
    UnsortedStream {
        prev_term: String,
        prev_doc_id: u32,
        term: String,
        doc_id: u32,
    },

    #[error("{what} of {value} does not fit in 32 bits")]
    TooLarge { what: &'static str, value: usize },

    #[error("store error: {0}")]
    Store(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("metadata error: {0}")]
    Meta(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io { path: path.into(), source }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        IndexError::Malformed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = IndexError::UnknownOperator("XOR".into());
        assert_eq!(err.to_string(), "unknown query operator: XOR");
        let err = IndexError::NotStrictlyIncreasing { index: 2, prev: 5, next: 5 };
        assert_eq!(err.to_string(), "positions are not strictly increasing at index 2: prev=5, next=5");
    }
}
