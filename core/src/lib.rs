//! Boolean retrieval over a stemmed corpus: a fixed-bucket hash index of
//! term postings, its binary file format, per-term presence bitmaps with
//! run-length and Elias-gamma compressed forms, a left-to-right AND/OR/NOT
//! evaluator and a streaming bulk builder.

pub mod bitmap;
pub mod builder;
pub mod codec;
pub mod compress;
pub mod config;
pub mod corpus;
pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod store;
pub mod tokenizer;

pub use bitmap::{Bitmap, DenseDocIndex};
pub use builder::{BuildReport, BulkIndexBuilder, Triple};
pub use compress::CompressedArtifact;
pub use config::IndexConfig;
pub use corpus::{Corpus, DocMeta};
pub use error::{IndexError, Result};
pub use index::{DocId, HashIndex, Position, PostingList, TermId};
pub use query::{search, search_with, BooleanQuery, Operator, UnknownOperatorPolicy};
pub use store::{MemoryStore, PostingsStore, SledStore};
