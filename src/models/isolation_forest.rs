//! Isolation forest outlier scoring.
//!
//! Each tree recursively splits a random subsample on a random feature at a
//! uniform threshold until points are isolated or the height limit is reached.
//! Outliers isolate in fewer splits, so their expected path length is short.
//!
//! Scores follow the usual decision-function convention:
//!
//! ```text
//! s(x)        = 2^(-E[h(x)] / c(ψ))      ψ = subsample size
//! decision(x) = 0.5 - s(x)               negative = anomalous
//! ```
//!
//! Determinism: every tree draws from its own `StdRng` seeded from
//! `(seed, tree index)`, so trees can be grown in parallel and the result does
//! not depend on scheduling.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use log::debug;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::FeatureMatrix;
use crate::error::AppError;
use crate::models::OutlierModel;

/// Default cap on the per-tree subsample size.
pub const DEFAULT_MAX_SAMPLES: usize = 256;

/// Offset applied to raw scores so that "normal" sits around zero.
const DECISION_OFFSET: f64 = 0.5;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone)]
pub struct IsolationForest {
    pub n_estimators: usize,
    /// Subsample size per tree is `min(max_samples, n_rows)`.
    pub max_samples: usize,
    pub seed: u64,
}

impl IsolationForest {
    pub fn new(n_estimators: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            max_samples: DEFAULT_MAX_SAMPLES,
            seed,
        }
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Grow the forest on `features`.
    pub fn fit(&self, features: &FeatureMatrix) -> Result<FittedForest, AppError> {
        let n = features.nrows();
        if self.n_estimators == 0 {
            return Err(AppError::ModelFit("n_estimators must be > 0".to_string()));
        }
        if self.max_samples == 0 {
            return Err(AppError::ModelFit("max_samples must be > 0".to_string()));
        }
        if (0..features.ncols()).all(|col| column_is_constant(features, col)) {
            return Err(AppError::ModelFit(format!(
                "all {} feature columns are constant across {n} rows; nothing to split on",
                features.ncols()
            )));
        }

        let sample_size = self.max_samples.min(n);
        let height_limit = (sample_size as f64).log2().ceil().max(1.0) as usize;
        debug!(
            "Fitting isolation forest: rows={n}, cols={}, trees={}, subsample={sample_size}, height_limit={height_limit}, seed={}",
            features.ncols(),
            self.n_estimators,
            self.seed
        );

        let trees: Vec<IsolationTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|idx| {
                let mut rng = StdRng::seed_from_u64(tree_seed(self.seed, idx));
                let sample = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
                IsolationTree::grow(features, &sample, height_limit, &mut rng)
            })
            .collect();

        Ok(FittedForest { trees, sample_size })
    }
}

impl OutlierModel for IsolationForest {
    fn fit_and_score(&self, features: &FeatureMatrix) -> Result<Vec<f64>, AppError> {
        let fitted = self.fit(features)?;
        Ok(fitted.decision_function(features))
    }

    fn name(&self) -> &str {
        "IsolationForest"
    }
}

/// A grown forest. Only lives for one fit + score pass.
#[derive(Debug, Clone)]
pub struct FittedForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl FittedForest {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean path length of `row` across all trees.
    pub fn mean_path_length(&self, features: &FeatureMatrix, row: usize) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.path_length(features, row)).sum();
        total / self.trees.len() as f64
    }

    /// Raw anomaly measure `s(x)` in `(0, 1]`; higher = more anomalous.
    pub fn anomaly_measure(&self, features: &FeatureMatrix) -> Vec<f64> {
        let c = average_path_length(self.sample_size).max(f64::MIN_POSITIVE);
        (0..features.nrows())
            .into_par_iter()
            .map(|row| 2f64.powf(-self.mean_path_length(features, row) / c))
            .collect()
    }

    /// `0.5 - s(x)`: negative = anomalous, positive = normal.
    pub fn decision_function(&self, features: &FeatureMatrix) -> Vec<f64> {
        self.anomaly_measure(features)
            .into_iter()
            .map(|s| DECISION_OFFSET - s)
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// Arena-allocated isolation tree; node 0 is the root.
#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(features: &FeatureMatrix, sample: &[usize], height_limit: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.build(features, sample, 0, height_limit, rng);
        tree
    }

    fn build(
        &mut self,
        features: &FeatureMatrix,
        rows: &[usize],
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });
        if depth >= height_limit || rows.len() <= 1 {
            return idx;
        }

        // Only features that still vary inside this node can split it.
        let candidates: Vec<(usize, f64, f64)> = (0..features.ncols())
            .filter_map(|col| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    let v = features.get(r, col);
                    (lo.min(v), hi.max(v))
                });
                (hi > lo).then_some((col, lo, hi))
            })
            .collect();
        let Some(&(feature, lo, hi)) = candidates.choose(rng) else {
            return idx;
        };

        // threshold in [lo, hi): both sides are non-empty with `<=` going left.
        let threshold = rng.gen_range(lo..hi);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.iter().partition(|&&r| features.get(r, feature) <= threshold);

        let left = self.build(features, &left_rows, depth + 1, height_limit, rng);
        let right = self.build(features, &right_rows, depth + 1, height_limit, rng);
        self.nodes[idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        idx
    }

    /// Path length of `row`, with the expected remaining depth added at leaves
    /// that were cut off by the height limit.
    fn path_length(&self, features: &FeatureMatrix, row: usize) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes[node] {
                Node::Leaf { size } => return depth + average_path_length(size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features.get(row, feature) <= threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

fn column_is_constant(features: &FeatureMatrix, col: usize) -> bool {
    let first = features.get(0, col);
    (1..features.nrows()).all(|row| features.get(row, col) == first)
}

fn tree_seed(seed: u64, tree_index: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    tree_index.hash(&mut hasher);
    hasher.finish()
}
