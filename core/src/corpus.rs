use crate::builder::Triple;
use crate::error::{IndexError, Result};
use crate::index::{DocId, Position};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub external_id: String,
    pub title: String,
    pub url: Option<String>,
    pub word_count: u32,
    pub title_len: u32,
}

/// Document store the ingestion workers write into.
///
/// Token keys are `term ++ 0x00 ++ doc_id (BE) ++ position (BE)`. sled keeps
/// keys in byte order, so a full scan of `tokens` yields triples sorted by
/// (term, doc, position) and a scan of `docs` yields the snapshot in id order.
/// Handles are cheap to clone and safe to share between threads.
#[derive(Clone)]
pub struct Corpus {
    db: sled::Db,
    docs: sled::Tree,
    tokens: sled::Tree,
}

impl Corpus {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_db(sled::open(path)?)
    }

    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Self { docs: db.open_tree("docs")?, tokens: db.open_tree("tokens")?, db })
    }

    pub fn put_doc(&self, doc_id: DocId, meta: &DocMeta) -> Result<()> {
        self.docs.insert(doc_id.to_be_bytes(), bincode::serialize(meta)?)?;
        Ok(())
    }

    pub fn doc(&self, doc_id: DocId) -> Result<Option<DocMeta>> {
        match self.docs.get(doc_id.to_be_bytes())? {
            Some(v) => Ok(Some(bincode::deserialize(&v)?)),
            None => Ok(None),
        }
    }

    pub fn put_token(&self, term: &str, doc_id: DocId, position: Position) -> Result<()> {
        self.tokens.insert(token_key(term, doc_id, position)?, Vec::<u8>::new())?;
        Ok(())
    }

    /// All doc ids, ascending. This is the snapshot a dense index is built from.
    pub fn snapshot(&self) -> Result<Vec<DocId>> {
        self.docs
            .iter()
            .keys()
            .map(|k| -> Result<DocId> {
                let k = k?;
                Ok(u32::from_be_bytes(fixed4(&k)?))
            })
            .collect()
    }

    pub fn doc_count(&self) -> usize { self.docs.len() }

    /// Sorted (term, doc, position) stream.
    pub fn triples(&self) -> impl Iterator<Item = Result<Triple>> + '_ {
        self.tokens.iter().keys().map(|k| -> Result<Triple> { parse_token_key(&k?) })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn token_key(term: &str, doc_id: DocId, position: Position) -> Result<Vec<u8>> {
    if term.as_bytes().contains(&0) {
        return Err(IndexError::malformed(format!("term {term:?} contains a NUL byte")));
    }
    let mut key = Vec::with_capacity(term.len() + 9);
    key.extend_from_slice(term.as_bytes());
    key.push(0);
    key.extend_from_slice(&doc_id.to_be_bytes());
    key.extend_from_slice(&position.to_be_bytes());
    Ok(key)
}

fn parse_token_key(key: &[u8]) -> Result<Triple> {
    if key.len() < 9 || key[key.len() - 9] != 0 {
        return Err(IndexError::malformed("token key without separator"));
    }
    let split = key.len() - 9;
    let term = std::str::from_utf8(&key[..split])
        .map_err(|_| IndexError::malformed("token key is not valid UTF-8"))?
        .to_string();
    Ok(Triple {
        term,
        doc_id: u32::from_be_bytes(fixed4(&key[split + 1..split + 5])?),
        position: u32::from_be_bytes(fixed4(&key[split + 5..])?),
    })
}

fn fixed4(bytes: &[u8]) -> Result<[u8; 4]> {
    bytes.try_into().map_err(|_| IndexError::malformed(format!("expected 4 bytes, found {}", bytes.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str) -> DocMeta {
        DocMeta { external_id: id.into(), title: String::new(), url: None, word_count: 0, title_len: 0 }
    }

    #[test]
    fn triples_come_out_sorted() {
        let corpus = Corpus::temporary().unwrap();
        corpus.put_token("abc", 1, 0).unwrap();
        corpus.put_token("ab", 300, 2).unwrap();
        corpus.put_token("ab", 2, 9).unwrap();
        corpus.put_token("ab", 2, 1).unwrap();
        corpus.put_token("b", 0, 0).unwrap();
        let got: Vec<(String, DocId, Position)> = corpus
            .triples()
            .map(|t| t.map(|t| (t.term, t.doc_id, t.position)))
            .collect::<Result<_>>()
            .unwrap();
        let expected = vec![
            ("ab".to_string(), 2, 1),
            ("ab".to_string(), 2, 9),
            ("ab".to_string(), 300, 2),
            ("abc".to_string(), 1, 0),
            ("b".to_string(), 0, 0),
        ];
        assert_eq!(got, expected);
    }

    #[test]
    fn snapshot_is_ascending() {
        let corpus = Corpus::temporary().unwrap();
        for id in [512u32, 3, 70] {
            corpus.put_doc(id, &meta(&id.to_string())).unwrap();
        }
        assert_eq!(corpus.snapshot().unwrap(), vec![3, 70, 512]);
        assert_eq!(corpus.doc(70).unwrap().unwrap().external_id, "70");
        assert_eq!(corpus.doc_count(), 3);
    }

    #[test]
    fn nul_in_term_rejected() {
        let corpus = Corpus::temporary().unwrap();
        assert!(corpus.put_token("a\0b", 1, 1).is_err());
    }
}
