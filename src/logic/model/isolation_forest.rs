//! Isolation Forest
//!
//! Anomalies are isolated by fewer random splits, so their average path
//! length across trees is short. The decision function is the usual
//! `2^(-E[h(x)] / c(psi))`: close to 1 for anomalies, about 0.5 or lower
//! for normal points.

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::ModelError;

/// Euler-Mascheroni constant
const EULER_GAMMA: f64 = 0.577_215_664_9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub num_trees: usize,
    pub sample_size: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            num_trees: 100,
            sample_size: 256,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    /// Effective subsample size (min of configured size and row count)
    sample_size: usize,
    n_features: usize,
    params: ForestParams,
}

impl IsolationForest {
    /// Fit on a row matrix
    pub fn fit(data: ArrayView2<'_, f64>, params: ForestParams) -> Result<Self, ModelError> {
        let (rows, n_features) = data.dim();
        if rows == 0 || n_features == 0 {
            return Err(ModelError::EmptyInput);
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidInput("non-finite training value".into()));
        }

        let sample_size = params.sample_size.min(rows).max(1);
        let max_depth = (sample_size as f64).log2().ceil().max(1.0) as usize;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.num_trees.max(1))
            .map(|_| {
                let sample = rand::seq::index::sample(&mut rng, rows, sample_size).into_vec();
                IsolationTree::build(&data, sample, max_depth, &mut rng)
            })
            .collect();

        Ok(Self {
            trees,
            sample_size,
            n_features,
            params,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Anomaly score in (0, 1]
    pub fn decision_function(&self, sample: &[f64]) -> Result<f64, ModelError> {
        if sample.len() != self.n_features {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features,
                actual: sample.len(),
            });
        }
        if sample.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidInput("non-finite feature value".into()));
        }

        let normalizer = average_path_length(self.sample_size);
        if normalizer <= 0.0 || self.trees.is_empty() {
            return Ok(0.5);
        }

        let mean_path = self
            .trees
            .iter()
            .map(|tree| tree.path_length(sample))
            .sum::<f64>()
            / self.trees.len() as f64;

        Ok(2f64.powf(-mean_path / normalizer))
    }
}

/// c(n): average path length of an unsuccessful BST search
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

/// Nodes stored flat; children are indices into `nodes`, root at 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn build(data: &ArrayView2<'_, f64>, rows: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(data, rows, 0, max_depth, rng);
        tree
    }

    fn grow(
        &mut self,
        data: &ArrayView2<'_, f64>,
        rows: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });

        if depth >= max_depth || rows.len() <= 1 {
            return index;
        }

        // Only features that still vary within this node can split it
        let ranges: Vec<(usize, f64, f64)> = (0..data.ncols())
            .filter_map(|feature| {
                let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    let v = data[[r, feature]];
                    (lo.min(v), hi.max(v))
                });
                (max > min).then_some((feature, min, max))
            })
            .collect();
        if ranges.is_empty() {
            return index;
        }

        let (feature, min, max) = ranges[rng.gen_range(0..ranges.len())];
        let threshold = rng.gen_range(min..max);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| data[[r, feature]] < threshold);

        let left = self.grow(data, left_rows, depth + 1, max_depth, rng);
        let right = self.grow(data, right_rows, depth + 1, max_depth, rng);
        self.nodes[index] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        index
    }

    fn path_length(&self, sample: &[f64]) -> f64 {
        let mut index = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    index = if sample[*feature] < *threshold { *left } else { *right };
                    depth += 1.0;
                }
                Some(Node::Leaf { size }) => return depth + average_path_length(*size),
                None => return depth,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn cluster(n: usize) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(7);
        Array2::from_shape_fn((n, 3), |_| rng.gen_range(45.0..55.0))
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > 9.0 && average_path_length(256) < 11.0);
    }

    #[test]
    fn test_outlier_scores_higher() {
        let data = cluster(300);
        let forest = IsolationForest::fit(data.view(), ForestParams::default()).unwrap();
        assert_eq!(forest.num_trees(), 100);

        let normal = forest.decision_function(&[50.0, 50.0, 50.0]).unwrap();
        let outlier = forest.decision_function(&[900.0, 1.0, 1.0]).unwrap();
        assert!(outlier > normal, "outlier {} vs normal {}", outlier, normal);
        assert!(outlier > 0.5);
    }

    #[test]
    fn test_seeded_fit_is_deterministic() {
        let data = cluster(120);
        let a = IsolationForest::fit(data.view(), ForestParams::default()).unwrap();
        let b = IsolationForest::fit(data.view(), ForestParams::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_dimension_mismatch() {
        let forest = IsolationForest::fit(cluster(20).view(), ForestParams::default()).unwrap();
        assert!(matches!(
            forest.decision_function(&[1.0, 2.0]),
            Err(ModelError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_empty_input() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            IsolationForest::fit(empty.view(), ForestParams::default()),
            Err(ModelError::EmptyInput)
        ));
    }

    #[test]
    fn test_serde_keeps_scores() {
        let forest = IsolationForest::fit(cluster(64).view(), ForestParams::default()).unwrap();
        let json = serde_json::to_string(&forest).unwrap();
        let restored: IsolationForest = serde_json::from_str(&json).unwrap();

        let sample = [51.0, 58.0, 52.0];
        assert_eq!(
            forest.decision_function(&sample).unwrap(),
            restored.decision_function(&sample).unwrap()
        );
    }
}
