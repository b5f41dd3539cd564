use ufsaco_core::tokenizer::{tokenize, TokenizerOptions};

#[test]
fn it_normalizes_and_stems() {
    let options = TokenizerOptions { stem: true, remove_stopwords: true };
    let words = tokenize("Running Runners RUN! The café's menu.", options);
    assert!(words.contains(&"run".to_string()));
    // NFKC keeps the accent; lower-casing still applies
    assert!(words.iter().any(|w| w.starts_with("café")));
}

#[test]
fn it_filters_stopwords() {
    let options = TokenizerOptions { remove_stopwords: true, ..Default::default() };
    let words = tokenize("The quick brown fox and the lazy dog", options);
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"fox".to_string()));
}

#[test]
fn stopwords_stay_without_filtering() {
    let words = tokenize("the wheat and the corn", TokenizerOptions::default());
    assert_eq!(words.len(), 5);
}
