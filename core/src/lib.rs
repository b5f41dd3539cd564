pub mod arff;
pub mod classify;
pub mod config;
pub mod error;
pub mod index;
pub mod persist;
pub mod scorer;
pub mod search;
pub mod similarity;
pub mod tokenizer;

pub use error::{ClassifyError, ConfigError, IndexError, ScoreError, SearchError};
pub use index::{DocId, Document, Term, TermIndex};
pub use scorer::{Metric, StatisticalScorer};
pub use search::{SearchParams, Ufsaco};
pub use similarity::SimilarityMatrix;
