use crate::input::InputDoc;
use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use stemdex::tokenizer::{tokenize, word_count};
use stemdex::{Corpus, DocId, DocMeta};

/// Line-oriented log shared by all workers. Each line is written under one
/// lock so lines from different workers never interleave.
pub struct LogSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> LogSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn line(&self, msg: &str) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{msg}").and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "failed to write ingest log line");
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub processed: usize,
    pub failed: usize,
}

/// Drain `jobs` with a fixed pool of `workers` threads.
///
/// Workers claim the next job by bumping a shared cursor. A failed job is
/// logged and counted; it is not retried and does not stop the other workers.
/// Returns once every worker has joined.
pub fn run_pool<J, W, F>(jobs: &[J], workers: usize, log: &LogSink<W>, process: F) -> IngestReport
where
    J: Sync,
    W: Write + Send,
    F: Fn(&J) -> Result<String> + Sync,
{
    let cursor = AtomicUsize::new(0);
    let processed = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let workers = workers.max(1);

    std::thread::scope(|s| {
        for worker in 0..workers {
            let (cursor, processed, failed, process) = (&cursor, &processed, &failed, &process);
            s.spawn(move || loop {
                let idx = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(job) = jobs.get(idx) else { break };
                match process(job) {
                    Ok(summary) => {
                        processed.fetch_add(1, Ordering::Relaxed);
                        log.line(&format!("worker {worker} processed {summary}"));
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(worker, job = idx, error = %e, "job failed");
                        log.line(&format!("worker {worker} error on job {idx}: {e:#}"));
                    }
                }
            });
        }
    });

    IngestReport { processed: processed.into_inner(), failed: failed.into_inner() }
}

/// Store one document's metadata and token triples in the corpus.
pub fn ingest_doc(corpus: &Corpus, doc_id: DocId, doc: &InputDoc) -> Result<String> {
    if doc.body.trim().is_empty() {
        bail!("document {} has an empty body", doc.id);
    }
    let meta = DocMeta {
        external_id: doc.id.clone(),
        title: doc.title.clone(),
        url: doc.url.clone(),
        word_count: word_count(&doc.body),
        title_len: doc.title.chars().count() as u32,
    };
    corpus.put_doc(doc_id, &meta)?;
    let tokens = tokenize(&doc.body);
    for token in &tokens {
        corpus.put_token(&token.stem, doc_id, token.position)?;
    }
    Ok(format!("{} as {doc_id} words={} stems={}", doc.id, meta.word_count, tokens.len()))
}

/// Assign doc ids after the highest id already in the corpus and ingest
/// everything with the worker pool.
pub fn ingest_all<W: Write + Send>(corpus: &Corpus, docs: Vec<InputDoc>, workers: usize, log: &LogSink<W>) -> Result<IngestReport> {
    let first_id = match corpus.snapshot()?.last() {
        Some(last) => last.checked_add(1).context("corpus doc ids are exhausted")?,
        None => 0,
    };
    let jobs: Vec<(DocId, InputDoc)> = docs
        .into_iter()
        .enumerate()
        .map(|(i, doc)| -> Result<(DocId, InputDoc)> {
            let doc_id = DocId::try_from(i)
                .ok()
                .and_then(|i| first_id.checked_add(i))
                .with_context(|| format!("no doc id left for input document {}", doc.id))?;
            Ok((doc_id, doc))
        })
        .collect::<Result<_>>()?;
    tracing::info!(jobs = jobs.len(), workers, first_id, "starting ingestion");

    let report = run_pool(&jobs, workers, log, |(doc_id, doc)| ingest_doc(corpus, *doc_id, doc));
    corpus.flush()?;
    tracing::info!(processed = report.processed, failed = report.failed, "ingestion finished");
    Ok(report)
}
