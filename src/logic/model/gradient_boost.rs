//! Gradient Boosted Trees (binary logistic)
//!
//! Second-order boosting: each round fits a regression tree to the
//! gradient/hessian of the log loss and adds `learning_rate * leaf_weight`
//! to the margin. Splits are exact greedy over sorted feature values.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    pub n_rounds: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 regularization on leaf weights
    pub lambda: f64,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_rounds: 100,
            max_depth: 6,
            learning_rate: 0.3,
            lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    trees: Vec<RegressionTree>,
    base_margin: f64,
    n_features: usize,
    params: BoostParams,
}

impl GradientBoostedTrees {
    /// Fit on rows `x` with 0/1 labels `y`
    pub fn fit(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>, params: BoostParams) -> Result<Self, ModelError> {
        let (rows, n_features) = x.dim();
        if rows == 0 || n_features == 0 {
            return Err(ModelError::EmptyInput);
        }
        if y.len() != rows {
            return Err(ModelError::InvalidInput(format!(
                "{} rows but {} labels",
                rows,
                y.len()
            )));
        }
        if y.iter().any(|&label| label != 0.0 && label != 1.0) {
            return Err(ModelError::InvalidInput("labels must be 0 or 1".into()));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidInput("non-finite training value".into()));
        }

        let base_margin = 0.0;
        let mut margins = vec![base_margin; rows];
        let mut trees = Vec::with_capacity(params.n_rounds);

        for _ in 0..params.n_rounds {
            let (grad, hess): (Vec<f64>, Vec<f64>) = margins
                .iter()
                .zip(y.iter())
                .map(|(&m, &label)| {
                    let p = sigmoid(m);
                    (p - label, (p * (1.0 - p)).max(1e-16))
                })
                .unzip();

            let tree = RegressionTree::fit(&x, &grad, &hess, &params);
            for (row, margin) in margins.iter_mut().enumerate() {
                *margin += tree.evaluate_with(|feature| x[[row, feature]]);
            }
            trees.push(tree);
        }

        Ok(Self {
            trees,
            base_margin,
            n_features,
            params,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn params(&self) -> &BoostParams {
        &self.params
    }

    /// Raw margin (log-odds)
    pub fn predict_margin(&self, sample: &[f64]) -> Result<f64, ModelError> {
        if sample.len() != self.n_features {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features,
                actual: sample.len(),
            });
        }
        Ok(self.base_margin + self.trees.iter().map(|t| t.evaluate(sample)).sum::<f64>())
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64, ModelError> {
        self.predict_margin(sample).map(sigmoid)
    }
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

// ============================================================================
// REGRESSION TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Leaf weight, learning rate already applied
    Leaf { value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<TreeNode>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    fn fit(x: &ArrayView2<'_, f64>, grad: &[f64], hess: &[f64], params: &BoostParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let rows: Vec<usize> = (0..x.nrows()).collect();
        tree.grow(x, grad, hess, rows, 0, params);
        tree
    }

    fn grow(
        &mut self,
        x: &ArrayView2<'_, f64>,
        grad: &[f64],
        hess: &[f64],
        rows: Vec<usize>,
        depth: usize,
        params: &BoostParams,
    ) -> usize {
        let g: f64 = rows.iter().map(|&r| grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| hess[r]).sum();

        let index = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            value: params.learning_rate * -g / (h + params.lambda),
        });

        if depth >= params.max_depth || rows.len() < 2 {
            return index;
        }

        let Some(split) = best_split(x, grad, hess, &rows, g, h, params) else {
            return index;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| x[[r, split.feature]] < split.threshold);

        let left = self.grow(x, grad, hess, left_rows, depth + 1, params);
        let right = self.grow(x, grad, hess, right_rows, depth + 1, params);
        self.nodes[index] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    fn evaluate(&self, sample: &[f64]) -> f64 {
        self.evaluate_with(|feature| sample[feature])
    }

    fn evaluate_with(&self, value_of: impl Fn(usize) -> f64) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    index = if value_of(*feature) < *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { value }) => return *value,
                None => return 0.0,
            }
        }
    }
}

fn best_split(
    x: &ArrayView2<'_, f64>,
    grad: &[f64],
    hess: &[f64],
    rows: &[usize],
    g_total: f64,
    h_total: f64,
    params: &BoostParams,
) -> Option<BestSplit> {
    let parent_score = g_total * g_total / (h_total + params.lambda);
    let mut best: Option<BestSplit> = None;

    for feature in 0..x.ncols() {
        let mut sorted: Vec<usize> = rows.to_vec();
        sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let mut g_left = 0.0;
        let mut h_left = 0.0;
        for pair in sorted.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            g_left += grad[current];
            h_left += hess[current];

            let (value, next_value) = (x[[current, feature]], x[[next, feature]]);
            if next_value <= value {
                continue;
            }

            let g_right = g_total - g_left;
            let h_right = h_total - h_left;
            if h_left < params.min_child_weight || h_right < params.min_child_weight {
                continue;
            }

            let gain = 0.5
                * (g_left * g_left / (h_left + params.lambda)
                    + g_right * g_right / (h_right + params.lambda)
                    - parent_score);

            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(BestSplit {
                    feature,
                    threshold: (value + next_value) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}
