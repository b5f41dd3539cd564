use std::collections::HashSet;
use ufsaco_core::arff::{load_dataset, save_dataset};
use ufsaco_core::classify::{evaluate, ClassifierKind, Dataset, DecisionTreeOptions, NaiveBayesOptions};
use ufsaco_core::{Metric, SearchParams, SimilarityMatrix, StatisticalScorer, TermIndex, Ufsaco};

fn corpus(docs: &[(&str, &str, &str)]) -> TermIndex {
    let mut index = TermIndex::new();
    for (id, text, label) in docs {
        index.ingest(*id, text.split_whitespace(), *label);
    }
    index
}

fn training() -> TermIndex {
    corpus(&[
        ("t1", "opec oil barrel crude price", "crude"),
        ("t2", "oil barrel output opec", "crude"),
        ("t3", "crude oil refinery barrel", "crude"),
        ("t4", "wheat grain harvest tonnes", "grain"),
        ("t5", "grain corn wheat export tonnes", "grain"),
        ("t6", "corn harvest grain price", "grain"),
    ])
}

fn test_docs() -> TermIndex {
    corpus(&[
        ("s1", "opec barrel oil", "crude"),
        ("s2", "wheat tonnes grain", "grain"),
        ("s3", "corn grain export", "grain"),
    ])
}

#[test]
fn selectors_feed_classifiers() {
    let train = training();
    let test = test_docs();
    let mut scorer = StatisticalScorer::new();
    scorer.compute_information_gain_and_gain_ratio(&train);
    let similarity = SimilarityMatrix::compute_all(&train);

    let params = SearchParams { cycles: 10, ..SearchParams::new(4, 5) };
    let mut engine = Ufsaco::new(&train, &similarity, params);
    assert!(engine.search_subset_seeded(2024).unwrap());

    let ufsaco = engine.feature_results(6);
    let info_gain = scorer.top_features(6, Metric::InformationGain);
    assert_eq!(ufsaco.len(), 6);
    assert_eq!(ufsaco.iter().collect::<HashSet<_>>().len(), 6);
    assert!(info_gain.iter().all(|t| train.contains_term(t)));

    let classes: Vec<String> = train.categories().keys().cloned().collect();
    let dir = tempfile::tempdir().unwrap();
    for (name, features) in [("ufsaco", &ufsaco), ("info_gain", &info_gain)] {
        let train_path = dir.path().join(format!("training-{name}.arff"));
        let test_path = dir.path().join(format!("test-{name}.arff"));
        save_dataset(&train_path, &Dataset::from_index(&format!("training-{name}"), &train, features, &classes)).unwrap();
        save_dataset(&test_path, &Dataset::from_index(&format!("test-{name}"), &test, features, &classes)).unwrap();

        let training_set = load_dataset(&train_path).unwrap();
        let test_set = load_dataset(&test_path).unwrap();
        for kind in [
            ClassifierKind::NaiveBayes(NaiveBayesOptions::default()),
            ClassifierKind::DecisionTree(DecisionTreeOptions { min_instances_per_leaf: 1, max_depth: None }),
        ] {
            let model = kind.build(&training_set).unwrap();
            let report = evaluate(model.as_ref(), &training_set, &test_set).unwrap();
            assert_eq!(report.num_instances, 3);
            assert_eq!(report.num_correct + report.num_incorrect, 3);
        }
    }

    // information gain separates the classes perfectly on this corpus
    let features = &info_gain;
    let training_set = Dataset::from_index("t", &train, features, &classes);
    let test_set = Dataset::from_index("s", &test, features, &classes);
    let model = ClassifierKind::NaiveBayes(NaiveBayesOptions::default()).build(&training_set).unwrap();
    let report = evaluate(model.as_ref(), &training_set, &test_set).unwrap();
    assert_eq!(report.percent_correct, 100.0);
}
