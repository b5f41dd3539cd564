use super::{Dataset, Model};
use crate::scorer::entropy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionTreeOptions {
    /// Smallest branch a split may produce.
    pub min_instances_per_leaf: usize,
    pub max_depth: Option<usize>,
}

impl Default for DecisionTreeOptions {
    fn default() -> Self { Self { min_instances_per_leaf: 2, max_depth: None } }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { distribution: Vec<f64> },
    Split { attribute: usize, absent: Box<Node>, present: Box<Node> },
}

/// Unpruned information-gain tree over binary attributes.
#[derive(Debug, Clone)]
pub struct DecisionTreeModel {
    root: Node,
}

impl DecisionTreeModel {
    pub fn num_leaves(&self) -> usize { count(&self.root, true) }

    pub fn size(&self) -> usize { count(&self.root, false) }
}

fn count(node: &Node, leaves_only: bool) -> usize {
    match node {
        Node::Leaf { .. } => 1,
        Node::Split { absent, present, .. } => {
            let own = if leaves_only { 0 } else { 1 };
            own + count(absent, leaves_only) + count(present, leaves_only)
        }
    }
}

pub(crate) fn train(data: &Dataset, options: &DecisionTreeOptions) -> DecisionTreeModel {
    let rows: Vec<usize> = (0..data.len()).collect();
    let root = grow(data, &rows, 0, options);
    let model = DecisionTreeModel { root };
    tracing::debug!(leaves = model.num_leaves(), size = model.size(), "grew decision tree");
    model
}

fn class_counts(data: &Dataset, rows: &[usize]) -> Vec<u32> {
    let mut counts = vec![0u32; data.num_classes()];
    for &r in rows {
        counts[data.instances[r].class] += 1;
    }
    counts
}

fn leaf(counts: &[u32]) -> Node {
    let total: u32 = counts.iter().sum();
    let distribution = if total == 0 {
        vec![1.0 / counts.len().max(1) as f64; counts.len()]
    } else {
        counts.iter().map(|c| f64::from(*c) / f64::from(total)).collect()
    };
    Node::Leaf { distribution }
}

fn grow(data: &Dataset, rows: &[usize], depth: usize, options: &DecisionTreeOptions) -> Node {
    let counts = class_counts(data, rows);
    let total = rows.len() as u32;
    let min_leaf = options.min_instances_per_leaf.max(1);
    let pure = counts.iter().filter(|c| **c > 0).count() <= 1;
    let too_deep = options.max_depth.map_or(false, |max| depth >= max);
    if pure || too_deep || rows.len() < 2 * min_leaf {
        return leaf(&counts);
    }

    let parent_entropy = entropy(counts.iter().copied(), total);
    let mut best: Option<(usize, f64)> = None;
    for attribute in 0..data.attributes.len() {
        let mut present = vec![0u32; counts.len()];
        for &r in rows {
            let instance = &data.instances[r];
            if instance.values[attribute] {
                present[instance.class] += 1;
            }
        }
        let n_present: u32 = present.iter().sum();
        let n_absent = total - n_present;
        if (n_present as usize) < min_leaf || (n_absent as usize) < min_leaf {
            continue;
        }
        let absent = counts.iter().zip(&present).map(|(c, p)| c - p);
        let gain = parent_entropy
            - f64::from(n_present) / f64::from(total) * entropy(present.iter().copied(), n_present)
            - f64::from(n_absent) / f64::from(total) * entropy(absent, n_absent);
        if gain > 1e-12 && best.map_or(true, |(_, g)| gain > g) {
            best = Some((attribute, gain));
        }
    }

    let Some((attribute, _)) = best else { return leaf(&counts) };
    let (present, absent): (Vec<usize>, Vec<usize>) =
        rows.iter().partition(|&&r| data.instances[r].values[attribute]);
    Node::Split {
        attribute,
        absent: Box::new(grow(data, &absent, depth + 1, options)),
        present: Box::new(grow(data, &present, depth + 1, options)),
    }
}

impl Model for DecisionTreeModel {
    fn distribution(&self, values: &[bool]) -> Vec<f64> {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { distribution } => return distribution.clone(),
                Node::Split { attribute, absent, present } => {
                    node = if values.get(*attribute).copied().unwrap_or(false) { present } else { absent };
                }
            }
        }
    }
}
