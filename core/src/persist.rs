use crate::codec;
use crate::error::{IndexError, Result};
use crate::index::HashIndex;
use crate::store::SledStore;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

/// What the doc ids stored in an index refer to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocIdSpace {
    /// Ids come from a corpus store and resolve through `Corpus::doc`.
    #[default]
    Corpus,
    /// Ids are positions in the input documents of a direct build.
    InputOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub bucket_count: u32,
    #[serde(default)]
    pub doc_ids: DocIdSpace,
    pub created_at: String,
    pub version: u32,
}

impl MetaFile {
    pub fn new(num_docs: usize, index: &HashIndex, doc_ids: DocIdSpace) -> Result<Self> {
        let created_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Ok(Self {
            num_docs: fit_u32("document count", num_docs)?,
            num_terms: fit_u32("term count", index.len())?,
            bucket_count: fit_u32("bucket count", index.bucket_count())?,
            doc_ids,
            created_at,
            version: FORMAT_VERSION,
        })
    }
}

fn fit_u32(what: &'static str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| IndexError::TooLarge { what, value })
}

/// Layout of an index directory.
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn index_file(&self) -> PathBuf { self.root.join("index.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn store_dir(&self) -> PathBuf { self.root.join("store") }

    pub fn create(&self) -> Result<()> {
        create_dir_all(&self.root).map_err(|e| IndexError::io(&self.root, e))
    }
}

pub fn save_index(paths: &IndexPaths, index: &HashIndex) -> Result<()> {
    paths.create()?;
    codec::save(index, paths.index_file())
}

pub fn load_index(paths: &IndexPaths) -> Result<HashIndex> {
    codec::load(paths.index_file())
}

pub fn open_store(paths: &IndexPaths) -> Result<SledStore> {
    paths.create()?;
    SledStore::open(paths.store_dir())
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    paths.create()?;
    let path = paths.meta();
    let json = serde_json::to_string_pretty(meta)?;
    let mut f = File::create(&path).map_err(|e| IndexError::io(&path, e))?;
    f.write_all(json.as_bytes()).map_err(|e| IndexError::io(&path, e))?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    let mut f = File::open(&path).map_err(|e| IndexError::io(&path, e))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf).map_err(|e| IndexError::io(&path, e))?;
    Ok(serde_json::from_str(&buf)?)
}
