use crate::index::{DocId, PostingDocs, Term, TermIndex};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Cosine similarity of two occurrence vectors. The dot product runs over
/// `shared` documents only; each norm covers the whole vector.
pub fn cosine_similarity<'a, I>(shared: I, a: &BTreeMap<DocId, u32>, b: &BTreeMap<DocId, u32>) -> f64
where
    I: IntoIterator<Item = &'a DocId>,
{
    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f64 = shared
        .into_iter()
        .map(|doc| f64::from(a.get(doc).copied().unwrap_or(0)) * f64::from(b.get(doc).copied().unwrap_or(0)))
        .sum();
    dot / (norm_a * norm_b)
}

fn norm(v: &BTreeMap<DocId, u32>) -> f64 {
    v.values().map(|c| f64::from(*c) * f64::from(*c)).sum::<f64>().sqrt()
}

fn shared_docs<'a>(a: &'a PostingDocs, b: &PostingDocs) -> Vec<&'a DocId> {
    a.keys().filter(|doc| b.contains_key(*doc)).collect()
}

/// Inverse cosine similarity for every co-occurring term pair, so smaller
/// means closer. Each unordered pair is stored once, keyed by the term that
/// comes first in the canonical term order.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    entries: HashMap<Term, HashMap<Term, f64>>,
}

impl SimilarityMatrix {
    pub fn new() -> Self { Self::default() }

    pub(crate) fn from_entries(entries: HashMap<Term, HashMap<Term, f64>>) -> Self { Self { entries } }

    pub fn entries(&self) -> &HashMap<Term, HashMap<Term, f64>> { &self.entries }

    /// Build the matrix for every pair of terms sharing at least one document.
    pub fn compute_all(index: &TermIndex) -> Self {
        let terms = index.term_universe();
        let positions = index.term_positions();

        let rows: Vec<(usize, HashMap<Term, f64>)> = terms
            .par_iter()
            .enumerate()
            .filter_map(|(i, term)| {
                let docs = index.posting_docs(term)?;
                // candidates later in the canonical order that co-occur with `term`
                let mut candidates: HashSet<usize> = HashSet::new();
                for doc_id in docs.keys() {
                    let Some(doc) = index.document(doc_id) else { continue };
                    for other in doc.terms.keys() {
                        if let Some(&j) = positions.get(other.as_str()) {
                            if j > i {
                                candidates.insert(j);
                            }
                        }
                    }
                }

                let mut row = HashMap::new();
                for j in candidates {
                    let Some(other_docs) = index.posting_docs(&terms[j]) else { continue };
                    let shared = shared_docs(docs, other_docs);
                    if shared.is_empty() {
                        continue;
                    }
                    let cos = cosine_similarity(shared, docs, other_docs);
                    if cos > 0.0 {
                        row.insert(terms[j].clone(), 1.0 / cos);
                    }
                }
                if row.is_empty() { None } else { Some((i, row)) }
            })
            .collect();

        let entries: HashMap<Term, HashMap<Term, f64>> =
            rows.into_iter().map(|(i, row)| (terms[i].clone(), row)).collect();
        let pairs: usize = entries.values().map(HashMap::len).sum();
        tracing::info!(terms = terms.len(), pairs, "computed similarity matrix");
        Self { entries }
    }

    /// Stored inverse similarity for the pair in either key order, 0 when unrelated.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        self.entries
            .get(a)
            .and_then(|row| row.get(b))
            .or_else(|| self.entries.get(b).and_then(|row| row.get(a)))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn pair_count(&self) -> usize { self.entries.values().map(HashMap::len).sum() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Drop the in-memory matrix.
    pub fn free(&mut self) {
        self.entries = HashMap::new();
    }

    /// Every stored pair from both sides, by canonical term position, each
    /// neighbour list sorted by position. Terms outside `terms` are ignored.
    pub fn adjacency(&self, terms: &[Term]) -> Vec<Vec<(usize, f64)>> {
        let positions: HashMap<&str, usize> = terms.iter().enumerate().map(|(i, t)| (t.as_str(), i)).collect();
        let mut adjacency = vec![Vec::new(); terms.len()];
        for (from, row) in &self.entries {
            let Some(&i) = positions.get(from.as_str()) else { continue };
            for (to, value) in row {
                let Some(&j) = positions.get(to.as_str()) else { continue };
                adjacency[i].push((j, *value));
                adjacency[j].push((i, *value));
            }
        }
        for neighbours in &mut adjacency {
            neighbours.sort_by_key(|(j, _)| *j);
            neighbours.dedup_by_key(|(j, _)| *j);
        }
        adjacency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(&str, u32)]) -> BTreeMap<DocId, u32> {
        pairs.iter().map(|(d, c)| (d.to_string(), *c)).collect()
    }

    #[test]
    fn disjoint_vectors_are_orthogonal() {
        let a = vector(&[("d1", 3)]);
        let b = vector(&[("d2", 5)]);
        assert_eq!(cosine_similarity(Vec::<&DocId>::new(), &a, &b), 0.0);
    }

    #[test]
    fn norms_use_the_full_vector() {
        let a = vector(&[("d1", 1), ("d2", 1)]);
        let b = vector(&[("d1", 1), ("d3", 1)]);
        let shared = shared_docs(&a, &b);
        let cos = cosine_similarity(shared, &a, &b);
        assert!((cos - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_norm_yields_zero() {
        let a = vector(&[("d1", 0)]);
        let b = vector(&[("d1", 2)]);
        let shared = shared_docs(&a, &b);
        assert_eq!(cosine_similarity(shared, &a, &b), 0.0);
    }

    #[test]
    fn stores_each_pair_once_as_inverse() {
        let mut index = TermIndex::new();
        index.ingest("d1", ["a", "b"], "x");
        index.ingest("d2", ["a", "c"], "y");
        let matrix = SimilarityMatrix::compute_all(&index);

        assert_eq!(matrix.pair_count(), 2);
        // a: [1,1], b: [1,0] -> cos = 1/sqrt(2)
        assert!((matrix.entries()["a"]["b"] - 2f64.sqrt()).abs() < 1e-12);
        assert!(!matrix.entries().contains_key("b"));
        assert_eq!(matrix.similarity("b", "c"), 0.0);
    }

    #[test]
    fn lookup_is_symmetric() {
        let mut index = TermIndex::new();
        index.ingest("d1", ["oil", "price", "opec"], "crude");
        index.ingest("d2", ["price", "wheat", "wheat"], "grain");
        index.ingest("d3", ["opec", "oil", "oil"], "crude");
        let matrix = SimilarityMatrix::compute_all(&index);
        let terms = index.term_universe();
        for a in terms {
            for b in terms {
                assert_eq!(matrix.similarity(a, b), matrix.similarity(b, a));
            }
        }
    }

    #[test]
    fn free_releases_entries() {
        let mut index = TermIndex::new();
        index.ingest("d1", ["a", "b"], "x");
        let mut matrix = SimilarityMatrix::compute_all(&index);
        assert!(!matrix.is_empty());
        matrix.free();
        assert!(matrix.is_empty());
        assert_eq!(matrix.similarity("a", "b"), 0.0);
    }

    #[test]
    fn adjacency_covers_both_directions() {
        let mut index = TermIndex::new();
        index.ingest("d1", ["a", "b"], "x");
        index.ingest("d2", ["c"], "y");
        let matrix = SimilarityMatrix::compute_all(&index);
        let adjacency = matrix.adjacency(index.term_universe());
        assert_eq!(adjacency[0], vec![(1, 1.0)]);
        assert_eq!(adjacency[1], vec![(0, 1.0)]);
        assert!(adjacency[2].is_empty());
    }
}
