pub mod evaluation;
pub mod naive_bayes;
pub mod tree;

use crate::error::ClassifyError;
use crate::index::{Term, TermIndex};
use serde::{Deserialize, Serialize};

pub use evaluation::{cross_validate, evaluate, ClassStats, EvaluationReport};
pub use naive_bayes::NaiveBayesOptions;
pub use tree::DecisionTreeOptions;

#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub values: Vec<bool>,
    pub class: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub relation: String,
    pub attributes: Vec<Term>,
    pub classes: Vec<String>,
    pub instances: Vec<Instance>,
}

impl Dataset {
    /// One row per document (sorted by id) marking which `features` it contains.
    /// Labels missing from `classes` are appended to the class list.
    pub fn from_index(relation: &str, index: &TermIndex, features: &[Term], classes: &[String]) -> Self {
        let mut classes = classes.to_vec();
        let mut doc_ids: Vec<&String> = index.documents().keys().collect();
        doc_ids.sort();

        let mut instances = Vec::with_capacity(doc_ids.len());
        for doc_id in doc_ids {
            let doc = &index.documents()[doc_id];
            let class = match classes.iter().position(|c| *c == doc.label) {
                Some(i) => i,
                None => {
                    classes.push(doc.label.clone());
                    classes.len() - 1
                }
            };
            let values = features.iter().map(|f| doc.terms.contains_key(f)).collect();
            instances.push(Instance { values, class });
        }

        Self { relation: relation.to_string(), attributes: features.to_vec(), classes, instances }
    }

    pub fn len(&self) -> usize { self.instances.len() }

    pub fn is_empty(&self) -> bool { self.instances.is_empty() }

    pub fn num_classes(&self) -> usize { self.classes.len() }

    pub fn class_counts(&self) -> Vec<u32> {
        let mut counts = vec![0; self.classes.len()];
        for instance in &self.instances {
            counts[instance.class] += 1;
        }
        counts
    }

    /// Rows at `rows`, same header.
    pub fn subset(&self, rows: &[usize]) -> Self {
        Self {
            relation: self.relation.clone(),
            attributes: self.attributes.clone(),
            classes: self.classes.clone(),
            instances: rows.iter().map(|&i| self.instances[i].clone()).collect(),
        }
    }

    /// Test data must share attributes and class labels with the training data.
    pub fn check_compatible(&self, other: &Dataset) -> Result<(), ClassifyError> {
        if self.attributes != other.attributes {
            return Err(ClassifyError::IncompatibleHeader(format!(
                "{} attributes vs {}",
                self.attributes.len(),
                other.attributes.len()
            )));
        }
        if self.classes != other.classes {
            return Err(ClassifyError::IncompatibleHeader(format!(
                "classes {:?} vs {:?}",
                self.classes, other.classes
            )));
        }
        Ok(())
    }
}

/// A trained classifier.
pub trait Model: Send + Sync {
    /// Probability of each class for one row of attribute values.
    fn distribution(&self, values: &[bool]) -> Vec<f64>;

    fn predict(&self, values: &[bool]) -> usize {
        let dist = self.distribution(values);
        let mut best = 0;
        for (i, p) in dist.iter().enumerate() {
            if *p > dist[best] {
                best = i;
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum ClassifierKind {
    NaiveBayes(NaiveBayesOptions),
    DecisionTree(DecisionTreeOptions),
}

impl ClassifierKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::NaiveBayes(_) => "naive_bayes",
            ClassifierKind::DecisionTree(_) => "decision_tree",
        }
    }

    pub fn build(&self, training: &Dataset) -> Result<Box<dyn Model>, ClassifyError> {
        if training.is_empty() {
            return Err(ClassifyError::EmptyDataset);
        }
        tracing::debug!(classifier = self.name(), instances = training.len(), "building classifier");
        match self {
            ClassifierKind::NaiveBayes(options) => Ok(Box::new(naive_bayes::train(training, options))),
            ClassifierKind::DecisionTree(options) => Ok(Box::new(tree::train(training, options))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_from_index() {
        let mut index = TermIndex::new();
        index.ingest("b", ["oil", "opec"], "crude");
        index.ingest("a", ["wheat"], "grain");
        index.ingest("c", ["corn", "oil"], "corn");
        let features = vec!["oil".to_string(), "wheat".to_string()];
        let data = Dataset::from_index("t", &index, &features, &["grain".to_string(), "crude".to_string()]);

        assert_eq!(data.classes, vec!["grain", "crude", "corn"]);
        assert_eq!(data.instances[0], Instance { values: vec![false, true], class: 0 });
        assert_eq!(data.instances[1], Instance { values: vec![true, false], class: 1 });
        assert_eq!(data.instances[2].class, 2);
        assert_eq!(data.class_counts(), vec![1, 1, 1]);
    }

    #[test]
    fn header_mismatch_is_reported() {
        let a = Dataset { relation: "a".into(), attributes: vec!["x".into()], classes: vec!["p".into()], instances: vec![] };
        let mut b = a.clone();
        b.classes.push("q".into());
        assert!(matches!(a.check_compatible(&b), Err(ClassifyError::IncompatibleHeader(_))));
        assert!(a.check_compatible(&a.clone()).is_ok());
    }

    #[test]
    fn empty_training_fails() {
        let data = Dataset { relation: "e".into(), attributes: vec![], classes: vec!["p".into()], instances: vec![] };
        let kind = ClassifierKind::NaiveBayes(NaiveBayesOptions::default());
        assert!(matches!(kind.build(&data), Err(ClassifyError::EmptyDataset)));
    }

    #[test]
    fn kind_from_json() {
        let kind: ClassifierKind = serde_json::from_str(r#"{"algorithm": "decision_tree", "min_instances_per_leaf": 1}"#).unwrap();
        assert_eq!(kind.name(), "decision_tree");
    }
}
