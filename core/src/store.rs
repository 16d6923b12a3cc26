use crate::compress::CompressedArtifact;
use crate::error::Result;
use crate::index::{DocId, Position, TermId};
use std::collections::BTreeMap;
use std::path::Path;

/// Sink for the rows produced by a bulk build. Writes are upserts: writing
/// the same key twice keeps the last value.
pub trait PostingsStore {
    fn put_term(&mut self, term: &str, term_id: TermId) -> Result<()>;
    fn put_postings(&mut self, term_id: TermId, doc_id: DocId, positions: &[Position]) -> Result<()>;
    fn put_artifact(&mut self, term_id: TermId, artifact: &CompressedArtifact) -> Result<()>;
    fn flush(&mut self) -> Result<()> { Ok(()) }
}

impl<S: PostingsStore + ?Sized> PostingsStore for &mut S {
    fn put_term(&mut self, term: &str, term_id: TermId) -> Result<()> {
        (**self).put_term(term, term_id)
    }
    fn put_postings(&mut self, term_id: TermId, doc_id: DocId, positions: &[Position]) -> Result<()> {
        (**self).put_postings(term_id, doc_id, positions)
    }
    fn put_artifact(&mut self, term_id: TermId, artifact: &CompressedArtifact) -> Result<()> {
        (**self).put_artifact(term_id, artifact)
    }
    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub terms: BTreeMap<String, TermId>,
    pub postings: BTreeMap<(TermId, DocId), Vec<Position>>,
    pub artifacts: BTreeMap<TermId, CompressedArtifact>,
}

impl PostingsStore for MemoryStore {
    fn put_term(&mut self, term: &str, term_id: TermId) -> Result<()> {
        self.terms.insert(term.to_string(), term_id);
        Ok(())
    }

    fn put_postings(&mut self, term_id: TermId, doc_id: DocId, positions: &[Position]) -> Result<()> {
        self.postings.insert((term_id, doc_id), positions.to_vec());
        Ok(())
    }

    fn put_artifact(&mut self, term_id: TermId, artifact: &CompressedArtifact) -> Result<()> {
        self.artifacts.insert(term_id, artifact.clone());
        Ok(())
    }
}

const TERMS_TREE: &str = "terms";
const POSTINGS_TREE: &str = "postings";
const BOOLEAN_TREE: &str = "boolean";

/// Postings store on sled.
///
/// - `terms`: term bytes -> term id (BE)
/// - `postings`: term id (BE) ++ doc id (BE) -> bincode positions
/// - `boolean`: term id (BE) -> bincode [`CompressedArtifact`]
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    terms: sled::Tree,
    postings: sled::Tree,
    boolean: sled::Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_db(sled::open(path)?)
    }

    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            terms: db.open_tree(TERMS_TREE)?,
            postings: db.open_tree(POSTINGS_TREE)?,
            boolean: db.open_tree(BOOLEAN_TREE)?,
            db,
        })
    }

    pub fn term_id(&self, term: &str) -> Result<Option<TermId>> {
        Ok(self.terms.get(term.as_bytes())?.map(|v| be_u32(&v)))
    }

    pub fn positions(&self, term_id: TermId, doc_id: DocId) -> Result<Option<Vec<Position>>> {
        match self.postings.get(postings_key(term_id, doc_id))? {
            Some(v) => Ok(Some(bincode::deserialize(&v)?)),
            None => Ok(None),
        }
    }

    /// Every (doc id, positions) row of one term, ascending by doc id.
    pub fn postings_for(&self, term_id: TermId) -> Result<Vec<(DocId, Vec<Position>)>> {
        let mut rows = Vec::new();
        for kv in self.postings.scan_prefix(term_id.to_be_bytes()) {
            let (k, v) = kv?;
            rows.push((be_u32(&k[4..8]), bincode::deserialize(&v)?));
        }
        Ok(rows)
    }

    pub fn artifact(&self, term_id: TermId) -> Result<Option<CompressedArtifact>> {
        match self.boolean.get(term_id.to_be_bytes())? {
            Some(v) => Ok(Some(bincode::deserialize(&v)?)),
            None => Ok(None),
        }
    }

    /// Remove every term, postings row and artifact.
    pub fn clear(&self) -> Result<()> {
        self.terms.clear()?;
        self.postings.clear()?;
        self.boolean.clear()?;
        Ok(())
    }

    pub fn term_count(&self) -> usize { self.terms.len() }

    pub fn artifact_count(&self) -> usize { self.boolean.len() }
}

impl PostingsStore for SledStore {
    fn put_term(&mut self, term: &str, term_id: TermId) -> Result<()> {
        self.terms.insert(term.as_bytes(), term_id.to_be_bytes().to_vec())?;
        Ok(())
    }

    fn put_postings(&mut self, term_id: TermId, doc_id: DocId, positions: &[Position]) -> Result<()> {
        let bytes = bincode::serialize(positions)?;
        self.postings.insert(postings_key(term_id, doc_id), bytes)?;
        Ok(())
    }

    fn put_artifact(&mut self, term_id: TermId, artifact: &CompressedArtifact) -> Result<()> {
        let bytes = bincode::serialize(artifact)?;
        self.boolean.insert(term_id.to_be_bytes(), bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn postings_key(term_id: TermId, doc_id: DocId) -> [u8; 8] {
    let mut key = [0u8; 8];
    key[..4].copy_from_slice(&term_id.to_be_bytes());
    key[4..].copy_from_slice(&doc_id.to_be_bytes());
    key
}

fn be_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;

    #[test]
    fn sled_rows_are_upserts() {
        let mut store = SledStore::temporary().unwrap();
        store.put_term("fox", 3).unwrap();
        store.put_postings(3, 10, &[1, 4]).unwrap();
        store.put_postings(3, 10, &[2]).unwrap();
        store.put_postings(3, 2, &[0]).unwrap();
        assert_eq!(store.term_id("fox").unwrap(), Some(3));
        assert_eq!(store.term_id("owl").unwrap(), None);
        assert_eq!(store.positions(3, 10).unwrap(), Some(vec![2]));
        assert_eq!(store.postings_for(3).unwrap(), vec![(2, vec![0]), (10, vec![2])]);
    }

    #[test]
    fn rebuild_after_clear_has_no_rows_from_the_first_build() {
        use crate::bitmap::DenseDocIndex;
        use crate::builder::{BulkIndexBuilder, Triple};
        use crate::config::IndexConfig;

        let mut store = SledStore::temporary().unwrap();
        let first = DenseDocIndex::from_snapshot([1]);
        BulkIndexBuilder::new(&first, &mut store, IndexConfig::default())
            .unwrap()
            .run(vec![Ok(Triple::new("b", 1, 0))])
            .unwrap();
        assert_eq!(store.term_id("b").unwrap(), Some(0));

        store.clear().unwrap();
        assert_eq!(store.term_count(), 0);
        assert_eq!(store.artifact_count(), 0);

        // "a" now sorts first and takes the id "b" had before
        let second = DenseDocIndex::from_snapshot([1, 2]);
        let report = BulkIndexBuilder::new(&second, &mut store, IndexConfig::default())
            .unwrap()
            .run(vec![Ok(Triple::new("a", 2, 0)), Ok(Triple::new("b", 1, 0))])
            .unwrap();
        let a = report.dictionary["a"];
        assert_eq!(a, 0);
        let docs: Vec<DocId> = store.postings_for(a).unwrap().into_iter().map(|(d, _)| d).collect();
        assert_eq!(docs, report.index.postings("a"));
        assert_eq!(docs, vec![2]);
        assert_eq!(store.term_count(), 2);
    }

    #[test]
    fn sled_artifact_roundtrip() {
        let mut store = SledStore::temporary().unwrap();
        let art = CompressedArtifact::from_bitmap(&Bitmap::from_positions(&[1, 3], 3).unwrap()).unwrap();
        store.put_artifact(0, &art).unwrap();
        store.flush().unwrap();
        assert_eq!(store.artifact(0).unwrap(), Some(art));
        assert_eq!(store.artifact(1).unwrap(), None);
        assert_eq!(store.artifact_count(), 1);
    }
}
