use super::{Dataset, Model};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NaiveBayesOptions {
    /// Additive smoothing applied to priors and per-attribute estimates.
    pub laplace: f64,
}

impl Default for NaiveBayesOptions {
    fn default() -> Self { Self { laplace: 1.0 } }
}

/// Bernoulli naive Bayes over presence/absence attributes.
#[derive(Debug, Clone)]
pub struct NaiveBayesModel {
    log_prior: Vec<f64>,
    /// ln P(present | class) and ln P(absent | class), per class then attribute.
    log_present: Vec<Vec<f64>>,
    log_absent: Vec<Vec<f64>>,
}

pub(crate) fn train(data: &Dataset, options: &NaiveBayesOptions) -> NaiveBayesModel {
    let alpha = options.laplace.max(0.0);
    let classes = data.num_classes();
    let attributes = data.attributes.len();
    let class_counts = data.class_counts();

    let mut present = vec![vec![0u32; attributes]; classes];
    for instance in &data.instances {
        for (a, value) in instance.values.iter().enumerate() {
            if *value {
                present[instance.class][a] += 1;
            }
        }
    }

    let total = data.len() as f64;
    let mut log_prior = Vec::with_capacity(classes);
    let mut log_present = Vec::with_capacity(classes);
    let mut log_absent = Vec::with_capacity(classes);
    for c in 0..classes {
        let n_c = f64::from(class_counts[c]);
        log_prior.push(ln((n_c + alpha) / (total + alpha * classes as f64)));
        let (p, a): (Vec<f64>, Vec<f64>) = present[c]
            .iter()
            .map(|&k| {
                let denom = n_c + 2.0 * alpha;
                let p = if denom > 0.0 { (f64::from(k) + alpha) / denom } else { 0.5 };
                (ln(p), ln(1.0 - p))
            })
            .unzip();
        log_present.push(p);
        log_absent.push(a);
    }

    NaiveBayesModel { log_prior, log_present, log_absent }
}

/// Natural log with ln(0) mapped to a large negative finite value.
fn ln(x: f64) -> f64 {
    if x > 0.0 { x.ln() } else { -1e300 }
}

impl Model for NaiveBayesModel {
    fn distribution(&self, values: &[bool]) -> Vec<f64> {
        let scores: Vec<f64> = (0..self.log_prior.len())
            .map(|c| {
                let mut s = self.log_prior[c];
                for (a, value) in values.iter().enumerate() {
                    s += if *value { self.log_present[c][a] } else { self.log_absent[c][a] };
                }
                s
            })
            .collect();
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let sum: f64 = exp.iter().sum();
        exp.into_iter().map(|e| e / sum).collect()
    }
}
