use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use ufsaco_core::persist::{load_index, load_stats, save_all, IndexPaths, IndexStats, LoadedIndex, INDEX_VERSION};
use ufsaco_core::tokenizer::{tokenize, TokenizerOptions};
use ufsaco_core::{Metric, SimilarityMatrix, StatisticalScorer, TermIndex};
use walkdir::WalkDir;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One corpus document: pre-split `tokens` or raw `body` text, plus its label.
#[derive(Debug, Deserialize)]
struct InputDoc {
    id: String,
    label: String,
    #[serde(default)]
    tokens: Option<Vec<String>>,
    #[serde(default)]
    body: Option<String>,
    /// Target index (e.g. `training`, `test`); the build's default name when absent.
    #[serde(default)]
    split: Option<String>,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build term indexes, statistical scores and term similarities", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one index per corpus split from JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Folder holding the named indexes
        #[arg(long, default_value = "./index")]
        index_dir: String,
        /// Index name for documents without a `split`
        #[arg(long, default_value = "training")]
        name: String,
        /// Drop English stop words from raw text
        #[arg(long, default_value_t = false)]
        stopwords: bool,
        /// Stem raw text with the English Snowball stemmer
        #[arg(long, default_value_t = false)]
        stem: bool,
        /// Skip the term similarity matrix
        #[arg(long, default_value_t = false)]
        skip_similarity: bool,
    },
    /// Print index stats and its best terms by a statistical metric
    Inspect {
        #[arg(long, default_value = "./index")]
        index_dir: String,
        #[arg(long, default_value = "training")]
        name: String,
        /// information_gain or gain_ratio
        #[arg(long, default_value = "information_gain")]
        metric: String,
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, index_dir, name, stopwords, stem, skip_similarity } => {
            let options = TokenizerOptions { remove_stopwords: stopwords, stem };
            build_indexes(&input, &index_dir, &name, options, skip_similarity)
        }
        Commands::Inspect { index_dir, name, metric, top } => inspect(&index_dir, &name, &metric, top),
    }
}

fn build_indexes(input: &str, index_dir: &str, default_name: &str, options: TokenizerOptions, skip_similarity: bool) -> Result<()> {
    let input_path = Path::new(input);
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        return Err(anyhow!("input {input} does not exist"));
    }

    let mut splits: BTreeMap<String, TermIndex> = BTreeMap::new();
    let mut ingest = |doc: InputDoc| {
        let split = doc.split.clone().unwrap_or_else(|| default_name.to_string());
        let tokens = match (doc.tokens, doc.body) {
            (Some(tokens), _) => tokens,
            (None, Some(body)) => tokenize(&body, options),
            (None, None) => Vec::new(),
        };
        splits.entry(split).or_default().ingest(doc.id, tokens, doc.label);
    };
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut ingest)?;
        } else {
            read_json(&file, &mut ingest)?;
        }
    }

    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .ok();
    for (name, index) in splits {
        if index.is_empty() {
            tracing::warn!(index = %name, "no documents with tokens, not saved");
            continue;
        }
        tracing::info!(index = %name, documents = index.document_count(), terms = index.term_count(), "ingested documents");

        let mut scorer = StatisticalScorer::new();
        scorer.compute_tf_idf(&index);
        scorer.compute_information_gain_and_gain_ratio(&index);
        let similarity = if skip_similarity { SimilarityMatrix::new() } else { SimilarityMatrix::compute_all(&index) };

        let stats = IndexStats {
            terms: index.term_count(),
            documents: index.document_count(),
            categories: index.categories().clone(),
            created_at: created_at.clone(),
            version: INDEX_VERSION,
        };
        let paths = IndexPaths::new(index_dir, &name);
        save_all(&paths, &LoadedIndex { stats, index, scorer, similarity })?;
        tracing::info!(index = %name, path = %paths.root.display(), "index build complete");
    }
    Ok(())
}

fn read_jsonl(file: &Path, ingest: &mut impl FnMut(InputDoc)) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        ingest(serde_json::from_str(&line)?);
    }
    Ok(())
}

fn read_json(file: &Path, ingest: &mut impl FnMut(InputDoc)) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                ingest(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => ingest(serde_json::from_value(json)?),
        _ => tracing::warn!(file = %file.display(), "skipping json that is neither a document nor a list"),
    }
    Ok(())
}

fn inspect(index_dir: &str, name: &str, metric: &str, top: usize) -> Result<()> {
    let metric: Metric = metric.parse()?;
    let paths = IndexPaths::new(index_dir, name);
    let stats = load_stats(&paths)?;
    if stats.version != INDEX_VERSION {
        tracing::warn!(found = stats.version, expected = INDEX_VERSION, "index was written by a different format version");
    }
    let loaded = load_index(&paths)?;
    let features: Vec<serde_json::Value> = loaded
        .scorer
        .top_scored_features(top, metric)
        .into_iter()
        .map(|(term, score)| serde_json::json!({ "term": term, "score": score }))
        .collect();
    let out = serde_json::json!({
        "index": name,
        "stats": loaded.stats,
        "similarity_pairs": loaded.similarity.pair_count(),
        "metric": metric.to_string(),
        "top": features,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
