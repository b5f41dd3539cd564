use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading or writing index artifacts.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A mandatory artifact is absent; the index is unusable.
    #[error("index artifact `{artifact}` not found at {}", .path.display())]
    MissingArtifact { artifact: &'static str, path: PathBuf },
    #[error("index i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("index json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("index bincode: {0}")]
    Bincode(#[from] bincode::Error),
}

impl IndexError {
    pub fn is_missing(&self) -> bool {
        matches!(self, IndexError::MissingArtifact { .. })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoreError {
    #[error("unknown metric `{0}`, expected `information_gain` or `gain_ratio`")]
    UnknownMetric(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError {
    /// Every agent needs a distinct starting term.
    #[error("{agents} agents cannot start on distinct terms of a {terms}-term universe")]
    TooManyAgents { agents: usize, terms: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid search configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("dataset has no instances")]
    EmptyDataset,
    #[error("test data does not match the training header: {0}")]
    IncompatibleHeader(String),
    #[error("arff line {line}: {message}")]
    Arff { line: usize, message: String },
    #[error("arff i/o: {0}")]
    Io(#[from] std::io::Error),
}
