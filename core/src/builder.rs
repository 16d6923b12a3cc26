use crate::bitmap::{Bitmap, DenseDocIndex};
use crate::compress::CompressedArtifact;
use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::index::{DocId, HashIndex, Position, TermId};
use crate::store::PostingsStore;
use std::collections::BTreeMap;

/// One occurrence of a term in a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Triple {
    pub term: String,
    pub doc_id: DocId,
    pub position: Position,
}

impl Triple {
    pub fn new(term: impl Into<String>, doc_id: DocId, position: Position) -> Self {
        Self { term: term.into(), doc_id, position }
    }
}

#[derive(Debug)]
pub struct BuildReport {
    pub terms: usize,
    pub postings_rows: usize,
    pub artifacts: usize,
    pub batches: usize,
    /// Postings whose doc id was not part of the snapshot.
    pub skipped_stale: usize,
    pub dictionary: BTreeMap<String, TermId>,
    /// Term -> docs map over the same stream.
    pub index: HashIndex,
}

/// Docs seen so far for the term currently being streamed. The last entry is
/// the current doc.
struct TermGroup {
    term: String,
    term_id: TermId,
    docs: Vec<(DocId, Vec<Position>)>,
}

impl TermGroup {
    fn push(&mut self, doc_id: DocId, position: Position) -> Result<()> {
        match self.docs.last().map(|(d, _)| *d) {
            Some(cur) if cur == doc_id => {
                if let Some((_, positions)) = self.docs.last_mut() {
                    positions.push(position);
                }
            }
            Some(cur) if doc_id < cur => {
                return Err(IndexError::UnsortedStream {
                    prev_term: self.term.clone(),
                    prev_doc_id: cur,
                    term: self.term.clone(),
                    doc_id,
                });
            }
            _ => self.docs.push((doc_id, vec![position])),
        }
        Ok(())
    }

    fn last_doc(&self) -> DocId {
        self.docs.last().map_or(0, |(d, _)| *d)
    }
}

/// Single pass over a (term, doc, position) stream sorted ascending.
///
/// Each finished term gets one postings row per doc and a bitmap over the
/// dense doc space. Bitmaps are buffered and their compressed artifacts are
/// written once `batch_size` terms are pending, and again at the end.
pub struct BulkIndexBuilder<'a, S: PostingsStore> {
    dense: &'a DenseDocIndex,
    store: S,
    batch_size: usize,
    pending: Vec<(TermId, Bitmap)>,
    next_term_id: TermId,
    report: BuildReport,
}

impl<'a, S: PostingsStore> BulkIndexBuilder<'a, S> {
    pub fn new(dense: &'a DenseDocIndex, store: S, config: IndexConfig) -> Result<Self> {
        let batch_size = config.batch_size.max(1);
        Ok(Self {
            dense,
            store,
            batch_size,
            pending: Vec::with_capacity(batch_size),
            next_term_id: 0,
            report: BuildReport {
                terms: 0,
                postings_rows: 0,
                artifacts: 0,
                batches: 0,
                skipped_stale: 0,
                dictionary: BTreeMap::new(),
                index: HashIndex::with_buckets(config.bucket_count)?,
            },
        })
    }

    pub fn run<I>(mut self, triples: I) -> Result<BuildReport>
    where
        I: IntoIterator<Item = Result<Triple>>,
    {
        let mut current: Option<TermGroup> = None;
        for triple in triples {
            let Triple { term, doc_id, position } = triple?;

            if current.as_ref().is_some_and(|g| g.term == term) {
                if let Some(group) = current.as_mut() {
                    group.push(doc_id, position)?;
                }
                continue;
            }

            if let Some(done) = current.take() {
                if term < done.term {
                    return Err(IndexError::UnsortedStream {
                        prev_doc_id: done.last_doc(),
                        prev_term: done.term,
                        term,
                        doc_id,
                    });
                }
                self.finish_term(done)?;
            }
            let term_id = self.assign_term_id(&term)?;
            current = Some(TermGroup { term, term_id, docs: vec![(doc_id, vec![position])] });
        }

        if let Some(done) = current.take() {
            self.finish_term(done)?;
        }
        self.flush_pending()?;
        self.store.flush()?;

        let r = &self.report;
        tracing::info!(
            terms = r.terms,
            postings_rows = r.postings_rows,
            artifacts = r.artifacts,
            batches = r.batches,
            skipped_stale = r.skipped_stale,
            "bulk build complete"
        );
        Ok(self.report)
    }

    fn assign_term_id(&mut self, term: &str) -> Result<TermId> {
        let term_id = self.next_term_id;
        self.next_term_id += 1;
        self.store.put_term(term, term_id)?;
        self.report.dictionary.insert(term.to_string(), term_id);
        Ok(term_id)
    }

    fn finish_term(&mut self, group: TermGroup) -> Result<()> {
        let mut doc_ids: Vec<DocId> = Vec::with_capacity(group.docs.len());
        for (doc_id, positions) in &group.docs {
            self.store.put_postings(group.term_id, *doc_id, positions)?;
            self.report.index.insert(&group.term, *doc_id);
            doc_ids.push(*doc_id);
        }
        self.report.postings_rows += group.docs.len();

        let bitmap = Bitmap::from_postings(&doc_ids, self.dense);
        self.report.skipped_stale += doc_ids.len() - bitmap.count_ones();
        self.report.terms += 1;

        self.pending.push((group.term_id, bitmap));
        if self.pending.len() >= self.batch_size {
            self.flush_pending()?;
        }
        Ok(())
    }

    fn flush_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        for (term_id, bitmap) in self.pending.drain(..) {
            let artifact = CompressedArtifact::from_bitmap(&bitmap)?;
            self.store.put_artifact(term_id, &artifact)?;
            self.report.artifacts += 1;
        }
        self.report.batches += 1;
        tracing::debug!(batch = self.report.batches, artifacts = self.report.artifacts, "flushed bitmap batch");
        Ok(())
    }
}
