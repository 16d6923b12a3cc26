use stemdex::tokenizer::{stems, tokenize};
use stemdex::{
    search, BulkIndexBuilder, Corpus, DenseDocIndex, DocMeta, HashIndex, IndexConfig, SledStore,
};

const DOCS: &[(u32, &str)] = &[
    (10, "Rivers flood the lowland farms"),
    (20, "Farms grow wheat near the river"),
    (30, "Wheat prices rise after the flood"),
    (40, "Boats drift down the river at night"),
];

fn ingest(corpus: &Corpus) {
    for (doc_id, text) in DOCS {
        let meta = DocMeta {
            external_id: format!("doc-{doc_id}"),
            title: String::new(),
            url: None,
            word_count: text.split_whitespace().count() as u32,
            title_len: 0,
        };
        corpus.put_doc(*doc_id, &meta).unwrap();
        for token in tokenize(text) {
            corpus.put_token(&token.stem, *doc_id, token.position).unwrap();
        }
    }
}

#[test]
fn bulk_and_incremental_paths_agree() {
    let corpus = Corpus::temporary().unwrap();
    ingest(&corpus);
    let dense = DenseDocIndex::from_snapshot(corpus.snapshot().unwrap());
    assert_eq!(dense.len(), 4);

    let mut store = SledStore::temporary().unwrap();
    let config = IndexConfig { bucket_count: 64, batch_size: 3 };
    let report = BulkIndexBuilder::new(&dense, &mut store, config)
        .unwrap()
        .run(corpus.triples())
        .unwrap();

    let mut incremental = HashIndex::with_buckets(64).unwrap();
    for (doc_id, text) in DOCS {
        incremental.insert_document(*doc_id, &stems(text));
    }

    assert_eq!(report.index.len(), incremental.len());
    for entry in incremental.iter() {
        let mut a = entry.postings.clone();
        a.sort_unstable();
        // bulk postings arrive in doc order already
        assert_eq!(report.index.postings(&entry.term), a.as_slice(), "term {}", entry.term);
    }
    for q in ["river AND flood", "wheat OR boat", "farm NOT wheat"] {
        assert_eq!(search(&report.index, q).unwrap(), search(&incremental, q).unwrap(), "{q}");
    }
    assert_eq!(report.artifacts, report.terms);
    assert_eq!(store.artifact_count(), report.terms);
}

#[test]
fn stored_artifacts_are_consistent_with_postings() {
    let corpus = Corpus::temporary().unwrap();
    ingest(&corpus);
    let dense = DenseDocIndex::from_snapshot(corpus.snapshot().unwrap());
    let mut store = SledStore::temporary().unwrap();
    let report = BulkIndexBuilder::new(&dense, &mut store, IndexConfig::default())
        .unwrap()
        .run(corpus.triples())
        .unwrap();

    for (term, term_id) in &report.dictionary {
        assert_eq!(store.term_id(term).unwrap(), Some(*term_id));
        let artifact = store.artifact(*term_id).unwrap().expect("artifact per term");
        artifact.verify().unwrap();
        let rows = store.postings_for(*term_id).unwrap();
        let docs: Vec<u32> = rows.iter().map(|(d, _)| *d).collect();
        assert_eq!(artifact.raw_bitmap().unwrap().doc_ids(&dense), docs, "term {term}");
        assert_eq!(artifact.count, docs.len());
    }

    // "river" occurs in docs 10 (as "rivers"), 20 and 40 -> slots 0, 1, 3
    let river = store.term_id("river").unwrap().unwrap();
    let art = store.artifact(river).unwrap().unwrap();
    assert_eq!(art.bitmap, vec![0b1101_0000]);
    assert_eq!(store.positions(river, 40).unwrap(), Some(vec![4]));
}
