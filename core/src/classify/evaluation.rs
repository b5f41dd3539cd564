use super::{ClassifierKind, Dataset, Model};
use crate::error::ClassifyError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_FOLDS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStats {
    pub tp: u64,
    pub tn: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
    pub tp_rate: f64,
    pub tn_rate: f64,
    pub fp_rate: f64,
    pub fn_rate: f64,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
    pub matthews_correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub num_instances: u64,
    pub num_correct: u64,
    pub percent_correct: f64,
    pub num_incorrect: u64,
    pub percent_incorrect: f64,
    pub kappa: f64,
    pub mean_absolute_error: f64,
    pub root_mean_squared_error: f64,
    pub classes: Vec<String>,
    /// Rows are actual classes, columns predicted classes.
    pub confusion_matrix: Vec<Vec<u64>>,
    pub class_stats: BTreeMap<String, ClassStats>,
}

struct Accumulator {
    classes: Vec<String>,
    confusion: Vec<Vec<u64>>,
    abs_error: f64,
    sq_error: f64,
    n: u64,
}

impl Accumulator {
    fn new(classes: &[String]) -> Self {
        let k = classes.len();
        Self { classes: classes.to_vec(), confusion: vec![vec![0; k]; k], abs_error: 0.0, sq_error: 0.0, n: 0 }
    }

    fn add(&mut self, model: &dyn Model, data: &Dataset) {
        let k = self.classes.len().max(1) as f64;
        for instance in &data.instances {
            let dist = model.distribution(&instance.values);
            let predicted = model.predict(&instance.values);
            self.confusion[instance.class][predicted] += 1;
            for (c, p) in dist.iter().enumerate() {
                let actual = if c == instance.class { 1.0 } else { 0.0 };
                let err = p - actual;
                self.abs_error += err.abs() / k;
                self.sq_error += err * err / k;
            }
            self.n += 1;
        }
    }

    fn finish(self) -> EvaluationReport {
        let n = self.n;
        let nf = n.max(1) as f64;
        let k = self.classes.len();
        let correct: u64 = (0..k).map(|c| self.confusion[c][c]).sum();
        let row = |c: usize| self.confusion[c].iter().sum::<u64>();
        let col = |c: usize| self.confusion.iter().map(|r| r[c]).sum::<u64>();

        let observed = correct as f64 / nf;
        let chance: f64 = (0..k).map(|c| row(c) as f64 * col(c) as f64).sum::<f64>() / (nf * nf);
        let kappa = if chance < 1.0 { (observed - chance) / (1.0 - chance) } else { 1.0 };

        let mut class_stats = BTreeMap::new();
        for c in 0..k {
            let tp = self.confusion[c][c];
            let fn_ = row(c) - tp;
            let fp = col(c) - tp;
            let tn = n - tp - fn_ - fp;
            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fn_);
            let f_measure = if precision + recall > 0.0 { 2.0 * precision * recall / (precision + recall) } else { 0.0 };
            let mcc_denom = ((tp + fp) as f64 * (tp + fn_) as f64 * (tn + fp) as f64 * (tn + fn_) as f64).sqrt();
            let matthews_correlation = if mcc_denom > 0.0 {
                (tp as f64 * tn as f64 - fp as f64 * fn_ as f64) / mcc_denom
            } else {
                0.0
            };
            class_stats.insert(
                self.classes[c].clone(),
                ClassStats {
                    tp,
                    tn,
                    fp,
                    fn_,
                    tp_rate: recall,
                    tn_rate: ratio(tn, tn + fp),
                    fp_rate: ratio(fp, fp + tn),
                    fn_rate: ratio(fn_, fn_ + tp),
                    precision,
                    recall,
                    f_measure,
                    matthews_correlation,
                },
            );
        }

        EvaluationReport {
            num_instances: n,
            num_correct: correct,
            percent_correct: 100.0 * correct as f64 / nf,
            num_incorrect: n - correct,
            percent_incorrect: 100.0 * (n - correct) as f64 / nf,
            kappa,
            mean_absolute_error: self.abs_error / nf,
            root_mean_squared_error: (self.sq_error / nf).sqrt(),
            classes: self.classes,
            confusion_matrix: self.confusion,
            class_stats,
        }
    }
}

fn ratio(a: u64, b: u64) -> f64 {
    if b == 0 { 0.0 } else { a as f64 / b as f64 }
}

/// Score `model` (built from `training`) on `test`.
pub fn evaluate(model: &dyn Model, training: &Dataset, test: &Dataset) -> Result<EvaluationReport, ClassifyError> {
    training.check_compatible(test)?;
    if test.is_empty() {
        return Err(ClassifyError::EmptyDataset);
    }
    let mut acc = Accumulator::new(&training.classes);
    acc.add(model, test);
    Ok(acc.finish())
}

/// Stratified k-fold cross-validation; every fold's predictions feed one report.
pub fn cross_validate(
    kind: &ClassifierKind,
    data: &Dataset,
    folds: usize,
    seed: u64,
) -> Result<EvaluationReport, ClassifyError> {
    if data.is_empty() {
        return Err(ClassifyError::EmptyDataset);
    }
    let folds = folds.clamp(2, data.len().max(2));
    let mut rows: Vec<usize> = (0..data.len()).collect();
    rows.shuffle(&mut StdRng::seed_from_u64(seed));
    rows.sort_by_key(|&r| data.instances[r].class);

    let mut acc = Accumulator::new(&data.classes);
    for fold in 0..folds {
        let mut test = Vec::new();
        let mut train = Vec::new();
        for (pos, &r) in rows.iter().enumerate() {
            if pos % folds == fold { test.push(r) } else { train.push(r) }
        }
        if test.is_empty() || train.is_empty() {
            continue;
        }
        let model = kind.build(&data.subset(&train))?;
        acc.add(model.as_ref(), &data.subset(&test));
    }
    tracing::debug!(classifier = kind.name(), folds, "cross-validation complete");
    Ok(acc.finish())
}
