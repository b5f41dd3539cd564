use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type Term = String;
pub type DocId = String;

/// Per-document occurrence counts, keyed by document id.
pub type PostingDocs = BTreeMap<DocId, u32>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Number of distinct terms in the document.
    pub term_count: usize,
    pub terms: BTreeMap<Term, u32>,
    pub label: String,
}

/// Term/document index built once per corpus snapshot.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TermIndex {
    postings: Vec<Term>, // canonical term order, first-seen
    posting_documents: HashMap<Term, PostingDocs>,
    documents: HashMap<DocId, Document>,
    categories: BTreeMap<String, u32>,
    term_count: usize,
    document_count: usize,
}

impl TermIndex {
    pub fn new() -> Self { Self::default() }

    pub(crate) fn from_parts(
        postings: Vec<Term>,
        posting_documents: HashMap<Term, PostingDocs>,
        documents: HashMap<DocId, Document>,
        categories: BTreeMap<String, u32>,
        term_count: usize,
        document_count: usize,
    ) -> Self {
        Self { postings, posting_documents, documents, categories, term_count, document_count }
    }

    /// Add one document. Tokens are lower-cased and counted; a document without
    /// any token is skipped and `false` is returned. Document ids are not deduplicated.
    pub fn ingest<I, S>(&mut self, doc_id: impl Into<DocId>, tokens: I, label: impl Into<String>) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let doc_id = doc_id.into();
        let mut counts: BTreeMap<Term, u32> = BTreeMap::new();
        for token in tokens {
            *counts.entry(token.as_ref().to_lowercase()).or_insert(0) += 1;
        }
        if counts.is_empty() {
            tracing::debug!(%doc_id, "skipping document without tokens");
            return false;
        }

        for (term, count) in &counts {
            if !self.posting_documents.contains_key(term) {
                self.postings.push(term.clone());
                self.term_count += 1;
            }
            self.posting_documents.entry(term.clone()).or_default().insert(doc_id.clone(), *count);
        }

        let label = label.into();
        *self.categories.entry(label.clone()).or_insert(0) += 1;
        self.documents.insert(doc_id, Document { term_count: counts.len(), terms: counts, label });
        self.document_count += 1;
        true
    }

    /// All known terms in canonical (first-seen) order.
    pub fn term_universe(&self) -> &[Term] { &self.postings }

    pub fn contains_term(&self, term: &str) -> bool { self.posting_documents.contains_key(term) }

    pub fn document_frequency(&self, term: &str) -> usize {
        self.posting_documents.get(term).map_or(0, |docs| docs.len())
    }

    pub fn within_doc_frequency(&self, term: &str, doc_id: &str) -> u32 {
        self.posting_documents
            .get(term)
            .and_then(|docs| docs.get(doc_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn posting_docs(&self, term: &str) -> Option<&PostingDocs> { self.posting_documents.get(term) }

    pub fn posting_documents(&self) -> &HashMap<Term, PostingDocs> { &self.posting_documents }

    pub fn documents(&self) -> &HashMap<DocId, Document> { &self.documents }

    pub fn document(&self, doc_id: &str) -> Option<&Document> { self.documents.get(doc_id) }

    /// Label -> number of documents carrying it.
    pub fn categories(&self) -> &BTreeMap<String, u32> { &self.categories }

    pub fn term_count(&self) -> usize { self.term_count }

    pub fn document_count(&self) -> usize { self.document_count }

    pub fn is_empty(&self) -> bool { self.document_count == 0 }

    /// Position of every term in the canonical ordering.
    pub fn term_positions(&self) -> HashMap<&str, usize> {
        self.postings.iter().enumerate().map(|(i, t)| (t.as_str(), i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TermIndex {
        let mut index = TermIndex::new();
        index.ingest("d1", ["Oil", "price", "oil"], "crude");
        index.ingest("d2", ["wheat", "price"], "grain");
        index.ingest("d3", ["corn"], "grain");
        index
    }

    #[test]
    fn ingest_lowercases_and_counts() {
        let index = sample();
        assert_eq!(index.within_doc_frequency("oil", "d1"), 2);
        assert_eq!(index.document_frequency("price"), 2);
        assert_eq!(index.document("d1").unwrap().term_count, 2);
        assert!(!index.contains_term("Oil"));
    }

    #[test]
    fn canonical_order_is_first_seen() {
        let index = sample();
        // terms within a document are visited in sorted order
        assert_eq!(index.term_universe(), &["oil", "price", "wheat", "corn"]);
        assert_eq!(index.term_count(), 4);
    }

    #[test]
    fn empty_documents_are_skipped() {
        let mut index = sample();
        let before = index.clone();
        assert!(!index.ingest("d4", Vec::<String>::new(), "grain"));
        assert_eq!(index, before);
    }

    #[test]
    fn category_counts_sum_to_documents() {
        let index = sample();
        let total: u32 = index.categories().values().sum();
        assert_eq!(total as usize, index.document_count());
        assert_eq!(index.categories()["grain"], 2);
    }

    #[test]
    fn every_term_has_a_document() {
        let index = sample();
        for term in index.term_universe() {
            assert!(index.document_frequency(term) >= 1);
        }
    }
}
