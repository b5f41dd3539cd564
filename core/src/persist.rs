use crate::error::IndexError;
use crate::index::{DocId, Document, PostingDocs, Term, TermIndex};
use crate::scorer::{ScoreTable, StatisticalScorer, TfIdfTables};
use crate::similarity::SimilarityMatrix;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const INDEX_VERSION: u32 = 1;

fn default_version() -> u32 { INDEX_VERSION }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub terms: usize,
    pub documents: usize,
    pub categories: BTreeMap<String, u32>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default = "default_version")]
    pub version: u32,
}

/// Folder holding every artifact of one named index: `<folder>/<name>/`.
pub struct IndexPaths {
    pub root: PathBuf,
    pub name: String,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(folder: P, name: &str) -> Self {
        Self { root: folder.as_ref().join(name), name: name.to_string() }
    }
    fn stats(&self) -> PathBuf { self.root.join("stats.index.json") }
    fn posting_docs(&self) -> PathBuf { self.root.join("index.postingdocs.json") }
    fn documents(&self) -> PathBuf { self.root.join("index.documents.json") }
    fn postings(&self) -> PathBuf { self.root.join("index.postings.json") }
    fn tf(&self) -> PathBuf { self.root.join("stats.tf.json") }
    fn idf(&self) -> PathBuf { self.root.join("stats.idf.json") }
    fn tfidf(&self) -> PathBuf { self.root.join("stats.tfidf.json") }
    fn info_gain(&self) -> PathBuf { self.root.join("index.infogain.json") }
    fn gain_ratio(&self) -> PathBuf { self.root.join("index.gainratio.json") }
    fn similarity(&self) -> PathBuf { self.root.join("index.similarities.bin") }

    /// Mandatory artifacts, in load order.
    fn mandatory(&self) -> [(&'static str, PathBuf); 4] {
        [
            ("stats", self.stats()),
            ("posting documents", self.posting_docs()),
            ("documents", self.documents()),
            ("postings", self.postings()),
        ]
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), IndexError> {
    let mut f = File::create(path)?;
    let json = serde_json::to_vec(value)?;
    f.write_all(&json)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, IndexError> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(serde_json::from_slice(&buf)?)
}

/// Absent optional artifacts read as an empty table.
fn read_optional_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, IndexError> {
    if path.exists() { read_json(path) } else { Ok(T::default()) }
}

pub fn save_index(paths: &IndexPaths, index: &TermIndex, created_at: Option<String>) -> Result<(), IndexError> {
    create_dir_all(&paths.root)?;
    let stats = IndexStats {
        terms: index.term_count(),
        documents: index.document_count(),
        categories: index.categories().clone(),
        created_at,
        version: INDEX_VERSION,
    };
    write_json(&paths.stats(), &stats)?;
    write_json(&paths.posting_docs(), index.posting_documents())?;
    write_json(&paths.documents(), index.documents())?;
    write_json(&paths.postings(), &index.term_universe())?;
    Ok(())
}

pub fn load_stats(paths: &IndexPaths) -> Result<IndexStats, IndexError> {
    let path = paths.stats();
    if !path.exists() {
        return Err(IndexError::MissingArtifact { artifact: "stats", path });
    }
    read_json(&path)
}

/// Rebuild the term index. Fails before reading anything if a mandatory
/// artifact is absent.
pub fn load_term_index(paths: &IndexPaths) -> Result<(TermIndex, IndexStats), IndexError> {
    for (artifact, path) in paths.mandatory() {
        if !path.exists() {
            return Err(IndexError::MissingArtifact { artifact, path });
        }
    }
    let stats: IndexStats = read_json(&paths.stats())?;
    let posting_documents: HashMap<Term, PostingDocs> = read_json(&paths.posting_docs())?;
    let documents: HashMap<DocId, Document> = read_json(&paths.documents())?;
    let postings: Vec<Term> = read_json(&paths.postings())?;
    let index = TermIndex::from_parts(
        postings,
        posting_documents,
        documents,
        stats.categories.clone(),
        stats.terms,
        stats.documents,
    );
    Ok((index, stats))
}

pub fn save_tf_idf(paths: &IndexPaths, tables: &TfIdfTables) -> Result<(), IndexError> {
    create_dir_all(&paths.root)?;
    write_json(&paths.tf(), &tables.tf)?;
    write_json(&paths.idf(), &tables.idf)?;
    write_json(&paths.tfidf(), &tables.tfidf)?;
    Ok(())
}

pub fn load_tf_idf(paths: &IndexPaths) -> Result<TfIdfTables, IndexError> {
    Ok(TfIdfTables {
        tf: read_optional_json(&paths.tf())?,
        idf: read_optional_json(&paths.idf())?,
        tfidf: read_optional_json(&paths.tfidf())?,
    })
}

pub fn save_gain_tables(paths: &IndexPaths, scorer: &StatisticalScorer) -> Result<(), IndexError> {
    create_dir_all(&paths.root)?;
    write_json(&paths.info_gain(), &scorer.information_gain)?;
    write_json(&paths.gain_ratio(), &scorer.gain_ratio)?;
    Ok(())
}

pub fn load_gain_tables(paths: &IndexPaths) -> Result<(ScoreTable, ScoreTable), IndexError> {
    Ok((read_optional_json(&paths.info_gain())?, read_optional_json(&paths.gain_ratio())?))
}

pub fn save_similarity(paths: &IndexPaths, matrix: &SimilarityMatrix) -> Result<(), IndexError> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.similarity())?;
    let bytes = bincode::serialize(matrix.entries())?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_similarity(paths: &IndexPaths) -> Result<SimilarityMatrix, IndexError> {
    let path = paths.similarity();
    if !path.exists() {
        return Ok(SimilarityMatrix::new());
    }
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let entries = bincode::deserialize(&buf)?;
    Ok(SimilarityMatrix::from_entries(entries))
}

/// Everything persisted for one index.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub stats: IndexStats,
    pub index: TermIndex,
    pub scorer: StatisticalScorer,
    pub similarity: SimilarityMatrix,
}

pub fn load_index(paths: &IndexPaths) -> Result<LoadedIndex, IndexError> {
    let (index, stats) = load_term_index(paths)?;
    let (information_gain, gain_ratio) = load_gain_tables(paths)?;
    let scorer = StatisticalScorer { tfidf: load_tf_idf(paths)?, information_gain, gain_ratio };
    let similarity = load_similarity(paths)?;
    tracing::info!(
        index = %paths.name,
        terms = stats.terms,
        documents = stats.documents,
        similarity_pairs = similarity.pair_count(),
        "loaded index"
    );
    Ok(LoadedIndex { stats, index, scorer, similarity })
}

/// Persist the index and every derived table.
pub fn save_all(paths: &IndexPaths, loaded: &LoadedIndex) -> Result<(), IndexError> {
    save_index(paths, &loaded.index, loaded.stats.created_at.clone())?;
    save_tf_idf(paths, &loaded.scorer.tfidf)?;
    save_gain_tables(paths, &loaded.scorer)?;
    save_similarity(paths, &loaded.similarity)?;
    Ok(())
}
