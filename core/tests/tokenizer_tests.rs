use stemdex::tokenizer::{stems, tokenize};

#[test]
fn it_normalizes_and_stems() {
    let words = stems("Running Runners RUN! The café's menu.");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // Unicode normalization keeps the accented stem intact and lowercased
    assert!(words.iter().any(|w| w.starts_with("caf")));
}

#[test]
fn it_filters_stopwords() {
    let words = stems("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert_eq!(words.len(), 5);
}

#[test]
fn positions_skip_stopwords_but_keep_counting() {
    let toks = tokenize("the fox and the dog");
    let positions: Vec<u32> = toks.iter().map(|t| t.position).collect();
    assert_eq!(positions, vec![1, 4]);
}
