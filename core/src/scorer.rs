use crate::error::ScoreError;
use crate::index::{DocId, Term, TermIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    InformationGain,
    GainRatio,
}

impl FromStr for Metric {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "information_gain" => Ok(Metric::InformationGain),
            "gain_ratio" => Ok(Metric::GainRatio),
            other => Err(ScoreError::UnknownMetric(other.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::InformationGain => f.write_str("information_gain"),
            Metric::GainRatio => f.write_str("gain_ratio"),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfIdfTables {
    pub tf: HashMap<Term, BTreeMap<DocId, f64>>,
    pub idf: HashMap<Term, f64>,
    pub tfidf: HashMap<Term, BTreeMap<DocId, i64>>,
}

impl TfIdfTables {
    pub fn is_empty(&self) -> bool { self.idf.is_empty() }
}

/// Raw per-term scores plus the terms sorted by descending score.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    pub scores: HashMap<Term, f64>,
    pub ordering: Vec<Term>,
}

impl ScoreTable {
    pub fn from_scores(scores: HashMap<Term, f64>) -> Self {
        let mut ordering: Vec<Term> = scores.keys().cloned().collect();
        ordering.sort_by(|a, b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(b))
        });
        Self { scores, ordering }
    }

    pub fn is_empty(&self) -> bool { self.scores.is_empty() }

    pub fn score(&self, term: &str) -> Option<f64> { self.scores.get(term).copied() }

    /// At most `n` terms with their scores, best first.
    pub fn top(&self, n: usize) -> Vec<(Term, f64)> {
        self.ordering
            .iter()
            .take(n)
            .map(|t| (t.clone(), self.scores[t]))
            .collect()
    }
}

/// TF-IDF plus Information Gain and Gain Ratio, which treat term presence as
/// a binary split of the documents.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StatisticalScorer {
    pub tfidf: TfIdfTables,
    pub information_gain: ScoreTable,
    pub gain_ratio: ScoreTable,
}

impl StatisticalScorer {
    pub fn new() -> Self { Self::default() }

    /// Recompute every entry from scratch with `tf = 1 + log10(count)` and
    /// `idf = log10(N / df)`. tf and idf keep four decimals, tfidf is rounded
    /// to an integer.
    pub fn compute_tf_idf(&mut self, index: &TermIndex) {
        let n = index.document_count() as f64;
        let mut tables = TfIdfTables::default();

        for term in index.term_universe() {
            let Some(docs) = index.posting_docs(term) else { continue };
            let idf = (n / docs.len() as f64).log10();
            let mut tf = BTreeMap::new();
            let mut tfidf = BTreeMap::new();
            for (doc_id, count) in docs {
                let doc_tf = 1.0 + f64::from(*count).log10();
                tf.insert(doc_id.clone(), round4(doc_tf));
                tfidf.insert(doc_id.clone(), (doc_tf * idf).round() as i64);
            }
            tables.tf.insert(term.clone(), tf);
            tables.tfidf.insert(term.clone(), tfidf);
            tables.idf.insert(term.clone(), round4(idf));
        }

        tracing::debug!(terms = tables.idf.len(), "computed tf-idf");
        self.tfidf = tables;
    }

    /// Information Gain and Gain Ratio for every term. A term whose presence
    /// split carries no entropy (present in no or in all documents) gets a
    /// Gain Ratio of 0.
    pub fn compute_information_gain_and_gain_ratio(&mut self, index: &TermIndex) {
        let mut gains = HashMap::new();
        let mut ratios = HashMap::new();
        let total = match u32::try_from(index.document_count()) {
            Ok(total) => total,
            Err(_) => {
                tracing::warn!(documents = index.document_count(), "too many documents for information gain, skipping");
                0
            }
        };

        if total > 0 {
            let categories = index.categories();
            let corpus_entropy = entropy(categories.values().copied(), total);

            for term in index.term_universe() {
                let mut has: HashMap<&str, u32> = HashMap::new();
                if let Some(docs) = index.posting_docs(term) {
                    for doc_id in docs.keys() {
                        if let Some(doc) = index.document(doc_id) {
                            *has.entry(doc.label.as_str()).or_insert(0) += 1;
                        }
                    }
                }
                let has_total: u32 = has.values().sum();
                let lacks_total = total.saturating_sub(has_total);
                let lacks = categories.iter().map(|(label, count)| {
                    count.saturating_sub(has.get(label.as_str()).copied().unwrap_or(0))
                });

                let ig = corpus_entropy
                    - weighted_entropy(has.values().copied(), has_total, total)
                    - weighted_entropy(lacks, lacks_total, total);
                let split = split_info(has_total, lacks_total, total);
                let ratio = if split > 0.0 { ig / split } else { 0.0 };

                gains.insert(term.clone(), ig);
                ratios.insert(term.clone(), ratio);
            }
        }

        tracing::debug!(terms = gains.len(), "computed information gain and gain ratio");
        self.information_gain = ScoreTable::from_scores(gains);
        self.gain_ratio = ScoreTable::from_scores(ratios);
    }

    pub fn table(&self, metric: Metric) -> &ScoreTable {
        match metric {
            Metric::InformationGain => &self.information_gain,
            Metric::GainRatio => &self.gain_ratio,
        }
    }

    /// Top `n` terms by the precomputed ordering of `metric`; fewer when the
    /// index has fewer terms.
    pub fn top_features(&self, n: usize, metric: Metric) -> Vec<Term> {
        self.table(metric).ordering.iter().take(n).cloned().collect()
    }

    pub fn top_scored_features(&self, n: usize, metric: Metric) -> Vec<(Term, f64)> {
        self.table(metric).top(n)
    }
}

fn round4(value: f64) -> f64 { (value * 10_000.0).round() / 10_000.0 }

fn plogp(p: f64) -> f64 {
    if p > 0.0 { p * p.log2() } else { 0.0 }
}

/// Shannon entropy (bits) of a label distribution given by raw counts.
pub fn entropy<I: IntoIterator<Item = u32>>(counts: I, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = f64::from(total);
    -counts.into_iter().map(|c| plogp(f64::from(c) / total)).sum::<f64>()
}

fn weighted_entropy<I: IntoIterator<Item = u32>>(counts: I, part: u32, total: u32) -> f64 {
    if part == 0 {
        return 0.0;
    }
    f64::from(part) / f64::from(total) * entropy(counts, part)
}

fn split_info(has: u32, lacks: u32, total: u32) -> f64 {
    let total = f64::from(total);
    -plogp(f64::from(has) / total) - plogp(f64::from(lacks) / total)
}
