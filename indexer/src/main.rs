mod ingest;
mod input;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ingest::{ingest_all, LogSink};
use input::InputDoc;
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use stemdex::config::{DEFAULT_BATCH_SIZE, IndexConfig};
use stemdex::index::DEFAULT_BUCKETS;
use stemdex::persist::{load_index, load_meta, open_store, save_index, save_meta, DocIdSpace, IndexPaths, MetaFile};
use stemdex::store::SledStore;
use stemdex::tokenizer::stems;
use stemdex::{search_with, BuildReport, BulkIndexBuilder, Corpus, DenseDocIndex, DocId, HashIndex, UnknownOperatorPolicy};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, store and query boolean inverted indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize JSON/JSONL documents into a corpus store with a worker pool
    Ingest {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Corpus store directory
        #[arg(long)]
        corpus: PathBuf,
        /// Number of worker threads
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Per-document log file (appended)
        #[arg(long, default_value = "ingest.log")]
        log: PathBuf,
    },
    /// Build a hash index directly from documents, one insert per stem
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// Fixed bucket count of the hash index
        #[arg(long, default_value_t = DEFAULT_BUCKETS)]
        buckets: usize,
    },
    /// Build postings, bitmaps and compressed artifacts from a corpus store
    Bulk {
        /// Corpus store directory written by `ingest`
        #[arg(long)]
        corpus: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_BUCKETS)]
        buckets: usize,
        /// Terms buffered before their artifacts are written
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch: usize,
    },
    /// Run a boolean query such as `cat AND dog NOT bird`
    Search {
        #[arg(long, default_value = "./index")]
        index: PathBuf,
        /// Skip unknown operators instead of failing
        #[arg(long, default_value_t = false)]
        ignore_unknown: bool,
        /// Corpus store to print document titles from
        #[arg(long)]
        corpus: Option<PathBuf>,
        query: Vec<String>,
    },
    /// Show a term's postings and check its compressed artifact
    Inspect {
        #[arg(long, default_value = "./index")]
        index: PathBuf,
        #[arg(long)]
        term: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { input, corpus, workers, log } => run_ingest(&input, &corpus, workers, &log),
        Commands::Build { input, output, buckets } => build_index(&input, &output, buckets),
        Commands::Bulk { corpus, output, buckets, batch } => {
            bulk_build(&corpus, &output, IndexConfig { bucket_count: buckets, batch_size: batch })
        }
        Commands::Search { index, ignore_unknown, corpus, query } => {
            run_search(&index, &query.join(" "), ignore_unknown, corpus.as_deref())
        }
        Commands::Inspect { index, term } => inspect(&index, &term),
    }
}

fn run_ingest(input: &Path, corpus_dir: &Path, workers: usize, log_path: &Path) -> Result<()> {
    let docs = input::read_documents(input)?;
    let corpus = Corpus::open(corpus_dir).with_context(|| format!("opening corpus {}", corpus_dir.display()))?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("opening log {}", log_path.display()))?;
    let log = LogSink::new(BufWriter::new(log_file));
    let report = ingest_all(&corpus, docs, workers, &log)?;
    println!("processed={} failed={}", report.processed, report.failed);
    Ok(())
}

fn build_index(input: &Path, output: &Path, buckets: usize) -> Result<()> {
    let docs = input::read_documents(input)?;
    let index = build_from_docs(&docs, &IndexPaths::new(output), buckets)?;

    let stats = index.stats();
    tracing::info!(
        docs = docs.len(),
        terms = stats.terms,
        occupied_buckets = stats.occupied_buckets,
        longest_chain = stats.longest_chain,
        output = %output.display(),
        "index build complete"
    );
    Ok(())
}

/// Incremental path: doc ids are input positions, not corpus ids.
fn build_from_docs(docs: &[InputDoc], paths: &IndexPaths, buckets: usize) -> Result<HashIndex> {
    let mut index = HashIndex::with_buckets(buckets)?;
    for (i, doc) in docs.iter().enumerate() {
        let doc_id = DocId::try_from(i).with_context(|| format!("too many input documents at {}", doc.id))?;
        index.insert_document(doc_id, &stems(&doc.body));
    }
    save_index(paths, &index)?;
    save_meta(paths, &MetaFile::new(docs.len(), &index, DocIdSpace::InputOrder)?)?;
    Ok(index)
}

fn bulk_build(corpus_dir: &Path, output: &Path, config: IndexConfig) -> Result<()> {
    let corpus = Corpus::open(corpus_dir).with_context(|| format!("opening corpus {}", corpus_dir.display()))?;
    let paths = IndexPaths::new(output);
    let mut store = open_store(&paths)?;
    let report = bulk_into(&corpus, &mut store, &paths, config)?;
    println!(
        "terms={} postings_rows={} artifacts={} batches={} skipped_stale={}",
        report.terms, report.postings_rows, report.artifacts, report.batches, report.skipped_stale
    );
    Ok(())
}

/// Rebuild the store and index files from the corpus. Term ids are reassigned
/// on every pass, so the store is emptied first.
fn bulk_into(corpus: &Corpus, store: &mut SledStore, paths: &IndexPaths, config: IndexConfig) -> Result<BuildReport> {
    let dense = DenseDocIndex::from_snapshot(corpus.snapshot()?);
    tracing::info!(docs = dense.len(), "frozen corpus snapshot");

    store.clear()?;
    let report = BulkIndexBuilder::new(&dense, &mut *store, config)?.run(corpus.triples())?;

    save_index(paths, &report.index)?;
    save_meta(paths, &MetaFile::new(dense.len(), &report.index, DocIdSpace::Corpus)?)?;
    Ok(report)
}

fn run_search(index_dir: &Path, query: &str, ignore_unknown: bool, corpus_dir: Option<&Path>) -> Result<()> {
    let policy = if ignore_unknown { UnknownOperatorPolicy::Ignore } else { UnknownOperatorPolicy::Reject };
    let corpus = corpus_dir.map(Corpus::open).transpose()?;
    for line in search_lines(&IndexPaths::new(index_dir), query, policy, corpus.as_ref())? {
        println!("{line}");
    }
    Ok(())
}

fn search_lines(paths: &IndexPaths, query: &str, policy: UnknownOperatorPolicy, corpus: Option<&Corpus>) -> Result<Vec<String>> {
    let index = load_index(paths)?;
    if corpus.is_some() && load_meta(paths)?.doc_ids != DocIdSpace::Corpus {
        bail!("index at {} was built in input order; its doc ids do not refer to a corpus", paths.root.display());
    }
    let hits = search_with(&index, query, policy)?;

    let mut lines = vec![format!("{} hits for {query:?}", hits.len())];
    for doc_id in hits {
        match corpus.map(|c| c.doc(doc_id)).transpose()?.flatten() {
            Some(meta) => lines.push(format!("{doc_id}\t{}\t{}", meta.external_id, meta.title)),
            None => lines.push(format!("{doc_id}")),
        }
    }
    Ok(lines)
}

fn inspect(index_dir: &Path, term: &str) -> Result<()> {
    let store = open_store(&IndexPaths::new(index_dir))?;
    println!("{}", serde_json::to_string_pretty(&inspect_term(&store, term)?)?);
    Ok(())
}

fn inspect_term(store: &SledStore, term: &str) -> Result<serde_json::Value> {
    let Some(term_id) = store.term_id(term)? else {
        return Ok(serde_json::json!({ "term": term, "found": false }));
    };
    let rows = store.postings_for(term_id)?;
    let artifact = store.artifact(term_id)?;
    let verified = match &artifact {
        Some(a) => a.verify().map(|_| true).unwrap_or_else(|e| {
            tracing::error!(term, term_id, error = %e, "artifact failed verification");
            false
        }),
        None => false,
    };
    Ok(serde_json::json!({
        "term": term,
        "found": true,
        "term_id": term_id,
        "postings": rows.iter().map(|(doc, pos)| serde_json::json!({ "doc_id": doc, "positions": pos })).collect::<Vec<_>>(),
        "bitmap_bytes": artifact.as_ref().map(|a| a.bitmap.len()),
        "rle_bytes": artifact.as_ref().map(|a| a.rle.len()),
        "gamma_bytes": artifact.as_ref().map(|a| a.gamma.len()),
        "verified": verified,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::ingest_doc;

    fn doc(id: &str, title: &str, body: &str) -> InputDoc {
        InputDoc { id: id.into(), title: title.into(), body: body.into(), url: None }
    }

    fn doc_ids(inspected: &serde_json::Value) -> Vec<u64> {
        inspected["postings"].as_array().unwrap().iter().map(|p| p["doc_id"].as_u64().unwrap()).collect()
    }

    #[test]
    fn second_bulk_run_replaces_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let corpus = Corpus::temporary().unwrap();
        let mut store = open_store(&paths).unwrap();

        ingest_doc(&corpus, 1, &doc("r", "River", "river")).unwrap();
        let first = bulk_into(&corpus, &mut store, &paths, IndexConfig::default()).unwrap();
        assert_eq!(first.dictionary["river"], 0);

        // "appl" sorts before "river" and takes its old term id
        ingest_doc(&corpus, 2, &doc("a", "Apple", "apple")).unwrap();
        let second = bulk_into(&corpus, &mut store, &paths, IndexConfig::default()).unwrap();
        assert_eq!(second.dictionary["appl"], 0);
        assert_eq!(second.dictionary["river"], 1);

        let apple = inspect_term(&store, "appl").unwrap();
        assert_eq!(doc_ids(&apple), vec![2]);
        assert_eq!(apple["verified"], true);
        let river = inspect_term(&store, "river").unwrap();
        assert_eq!(doc_ids(&river), vec![1]);
        assert_eq!(river["verified"], true);
        assert_eq!(inspect_term(&store, "pear").unwrap()["found"], false);

        assert_eq!(load_index(&paths).unwrap().postings("appl"), &[2]);
        assert_eq!(load_meta(&paths).unwrap().num_docs, 2);
    }

    #[test]
    fn search_prints_corpus_titles() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let corpus = Corpus::temporary().unwrap();
        let mut store = open_store(&paths).unwrap();
        ingest_doc(&corpus, 4, &doc("r", "River", "river bank")).unwrap();
        ingest_doc(&corpus, 7, &doc("b", "Bank", "bank")).unwrap();
        bulk_into(&corpus, &mut store, &paths, IndexConfig::default()).unwrap();

        let lines = search_lines(&paths, "bank NOT river", UnknownOperatorPolicy::Reject, Some(&corpus)).unwrap();
        assert_eq!(lines, vec!["1 hits for \"bank NOT river\"".to_string(), "7\tb\tBank".to_string()]);
    }

    #[test]
    fn input_order_index_refuses_corpus_titles() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        build_from_docs(&[doc("x", "X", "river"), doc("y", "Y", "river")], &paths, 16).unwrap();
        let corpus = Corpus::temporary().unwrap();

        let err = search_lines(&paths, "river", UnknownOperatorPolicy::Reject, Some(&corpus)).unwrap_err();
        assert!(err.to_string().contains("input order"), "{err:#}");

        let lines = search_lines(&paths, "river", UnknownOperatorPolicy::Reject, None).unwrap();
        assert_eq!(lines, vec!["2 hits for \"river\"", "0", "1"]);
    }
}
