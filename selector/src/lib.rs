use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use ufsaco_core::arff::{load_dataset, save_dataset};
use ufsaco_core::classify::{evaluate, ClassifierKind, Dataset, DecisionTreeOptions, EvaluationReport, NaiveBayesOptions};
use ufsaco_core::config::SearchConfig;
use ufsaco_core::persist::{load_index, IndexPaths, LoadedIndex};
use ufsaco_core::{IndexError, Metric, SearchParams, Term, Ufsaco};

pub struct ExperimentOptions {
    pub index_dir: PathBuf,
    pub training: String,
    pub test: String,
    pub config: SearchConfig,
    pub arff_dir: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ClassifierOutcome {
    pub selector: String,
    pub classifier: &'static str,
    pub built: bool,
    pub evaluated: bool,
    pub report: Option<EvaluationReport>,
}

#[derive(Debug, Serialize)]
pub struct ExperimentSummary {
    pub seed: u64,
    pub params: SearchParams,
    pub features: BTreeMap<String, Vec<Term>>,
    pub results: Vec<ClassifierOutcome>,
}

/// Load an index. Any load failure, absent or unreadable artifacts alike,
/// is logged and reported as "no index".
fn load_optional(index_dir: &Path, name: &str) -> Option<LoadedIndex> {
    match load_index(&IndexPaths::new(index_dir, name)) {
        Ok(loaded) => Some(loaded),
        Err(e @ IndexError::MissingArtifact { .. }) => {
            tracing::warn!(index = name, error = %e, "index not available");
            None
        }
        Err(e) => {
            tracing::warn!(index = name, error = %e, "index could not be read");
            None
        }
    }
}

pub fn run_experiment(options: &ExperimentOptions) -> Result<ExperimentSummary> {
    let config = &options.config;
    let params = SearchParams::from_config(config);
    let seed = config.seed.unwrap_or_else(rand::random);

    let Some(mut training) = load_optional(&options.index_dir, &options.training) else {
        return Err(anyhow!("training index `{}` could not be loaded", options.training));
    };
    if training.similarity.is_empty() {
        tracing::warn!("training index has no similarity matrix; agents will not move");
    }

    let top = config.top_features;
    let (ufsaco, params) = {
        let mut engine = Ufsaco::new(&training.index, &training.similarity, params);
        tracing::info!(seed, agents = engine.params().agents, cycles = engine.params().cycles, "starting feature search");
        engine.search_subset_seeded(seed)?;
        (engine.feature_results(top), *engine.params())
    };
    // the search was the matrix's last consumer
    training.similarity.free();

    if training.scorer.information_gain.is_empty() {
        training.scorer.compute_information_gain_and_gain_ratio(&training.index);
    }
    let mut features = BTreeMap::new();
    features.insert("ufsaco".to_string(), ufsaco);
    features.insert("info_gain".to_string(), training.scorer.top_features(top, Metric::InformationGain));
    features.insert("gain_ratio".to_string(), training.scorer.top_features(top, Metric::GainRatio));

    let mut results = Vec::new();
    match load_optional(&options.index_dir, &options.test) {
        Some(test) => {
            let classes: Vec<String> = training
                .index
                .categories()
                .keys()
                .chain(test.index.categories().keys())
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            for (selector, terms) in &features {
                let train_name = format!("{}-{}", options.training, selector);
                let test_name = format!("{}-{}", options.test, selector);
                let train_path = options.arff_dir.join(format!("{train_name}.arff"));
                let test_path = options.arff_dir.join(format!("{test_name}.arff"));
                save_dataset(&train_path, &Dataset::from_index(&train_name, &training.index, terms, &classes))?;
                save_dataset(&test_path, &Dataset::from_index(&test_name, &test.index, terms, &classes))?;

                for kind in [
                    ClassifierKind::DecisionTree(DecisionTreeOptions::default()),
                    ClassifierKind::NaiveBayes(NaiveBayesOptions::default()),
                ] {
                    results.push(classify(selector, &kind, &train_path, &test_path));
                }
            }
        }
        None => tracing::warn!(index = %options.test, "no test index, skipping classification"),
    }

    Ok(ExperimentSummary { seed, params, features, results })
}

/// Build on the training file and evaluate on the test file. Failures are
/// logged and reported as flags, never propagated.
fn classify(selector: &str, kind: &ClassifierKind, train_path: &Path, test_path: &Path) -> ClassifierOutcome {
    let mut outcome = ClassifierOutcome {
        selector: selector.to_string(),
        classifier: kind.name(),
        built: false,
        evaluated: false,
        report: None,
    };

    let training = match load_dataset(train_path) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(selector, classifier = kind.name(), error = %e, "could not load training data");
            return outcome;
        }
    };
    let model = match kind.build(&training) {
        Ok(model) => model,
        Err(e) => {
            tracing::warn!(selector, classifier = kind.name(), error = %e, "classifier build failed");
            return outcome;
        }
    };
    outcome.built = true;

    match load_dataset(test_path).and_then(|test| evaluate(model.as_ref(), &training, &test)) {
        Ok(report) => {
            tracing::info!(selector, classifier = kind.name(), percent_correct = report.percent_correct, "evaluated");
            outcome.evaluated = true;
            outcome.report = Some(report);
        }
        Err(e) => tracing::warn!(selector, classifier = kind.name(), error = %e, "evaluation failed"),
    }
    outcome
}
