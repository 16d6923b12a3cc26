//! Binary file format for a [`HashIndex`].
//!
//! All integers are unsigned 32-bit little-endian:
//!
//! ```text
//! u32 bucket_count
//! repeat until EOF:
//!   u32 key_len
//!   u8[key_len] key (UTF-8, no terminator)
//!   u32 posting_count
//!   u32[posting_count] doc_ids (chain/list order)
//! ```
//!
//! Records are written bucket by bucket, each chain head first. Bucket
//! placement is never stored; `load` recomputes it from the key and links
//! each record at the head of its chain, so chains come back reversed.

use crate::error::{IndexError, Result};
use crate::index::{DocId, Entry, HashIndex};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

pub fn save(index: &HashIndex, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path).map_err(|e| IndexError::io(path, e))?;
    let mut w = BufWriter::new(f);
    write_to(index, &mut w).map_err(|e| IndexError::io(path, e))?;
    w.flush().map_err(|e| IndexError::io(path, e))?;
    tracing::debug!(path = %path.display(), terms = index.len(), "saved hash index");
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<HashIndex> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| IndexError::io(path, e))?;
    let index = read_from(&mut BufReader::new(f)).map_err(|e| match e {
        IndexError::Stream(source) => IndexError::io(path, source),
        other => other,
    })?;
    tracing::debug!(path = %path.display(), terms = index.len(), buckets = index.bucket_count(), "loaded hash index");
    Ok(index)
}

pub fn write_to<W: Write>(index: &HashIndex, w: &mut W) -> io::Result<()> {
    w.write_all(&len_u32(index.bucket_count())?.to_le_bytes())?;
    for entry in index.iter() {
        w.write_all(&len_u32(entry.term.len())?.to_le_bytes())?;
        w.write_all(entry.term.as_bytes())?;
        w.write_all(&len_u32(entry.postings.len())?.to_le_bytes())?;
        for doc_id in &entry.postings {
            w.write_all(&doc_id.to_le_bytes())?;
        }
    }
    Ok(())
}

/// Decode a whole index. Any record cut short is an error; nothing partial
/// is ever returned.
pub fn read_from<R: Read>(r: &mut R) -> Result<HashIndex> {
    let bucket_count = match read_u32_or_eof(r)? {
        Some(n) => n,
        None => return Err(IndexError::malformed("missing bucket count header")),
    };
    let mut index = HashIndex::with_buckets(bucket_count as usize)
        .map_err(|_| IndexError::malformed("bucket count of zero"))?;
    let mut seen_terms: HashSet<String> = HashSet::new();

    while let Some(key_len) = read_u32_or_eof(r)? {
        let key = read_bytes(r, key_len as usize, "key")?;
        let term = String::from_utf8(key).map_err(|_| IndexError::malformed("key is not valid UTF-8"))?;
        let count = read_u32(r, "posting count")?;

        let raw = read_bytes(r, count as usize * 4, "doc ids")?;
        let mut postings: Vec<DocId> = Vec::with_capacity(count as usize);
        let mut seen_docs: HashSet<DocId> = HashSet::with_capacity(count as usize);
        for chunk in raw.chunks_exact(4) {
            let doc_id = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if !seen_docs.insert(doc_id) {
                return Err(IndexError::malformed(format!("term {term:?} repeats doc id {doc_id}")));
            }
            postings.push(doc_id);
        }
        if !seen_terms.insert(term.clone()) {
            return Err(IndexError::malformed(format!("term {term:?} appears twice")));
        }
        index.push_entry(Entry { term, postings });
    }
    Ok(index)
}

fn len_u32(n: usize) -> io::Result<u32> {
    u32::try_from(n).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length exceeds u32"))
}

/// Reads a u32, or `None` on a clean end of stream before its first byte.
fn read_u32_or_eof<R: Read>(r: &mut R) -> Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    match filled {
        0 => Ok(None),
        4 => Ok(Some(u32::from_le_bytes(buf))),
        n => Err(IndexError::malformed(format!("truncated length field ({n} of 4 bytes)"))),
    }
}

fn read_u32<R: Read>(r: &mut R, what: &str) -> Result<u32> {
    match read_u32_or_eof(r)? {
        Some(v) => Ok(v),
        None => Err(IndexError::malformed(format!("truncated record: missing {what}"))),
    }
}

fn read_bytes<R: Read>(r: &mut R, len: usize, what: &str) -> Result<Vec<u8>> {
    // take() caps the allocation at what the stream really holds
    let mut buf = Vec::new();
    r.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(IndexError::malformed(format!(
            "truncated record: {what} has {} of {len} bytes",
            buf.len()
        )));
    }
    Ok(buf)
}
