//! Gradient-boosted regression trees
//!
//! Small in-crate booster: depth-limited CART trees fit to gradient
//! residuals, shrunk by a learning rate, with early stopping on a
//! validation slice. Two objectives: squared error for regression and
//! logistic loss for binary probability models (multiclass is handled
//! one-vs-rest by the trainer).

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    #[serde(rename = "squared")]
    Squared,
    #[serde(rename = "logistic")]
    Logistic,
}

#[derive(Debug, Clone, Copy)]
pub struct GbmParams {
    pub num_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Minimum samples on each side of a split.
    pub min_leaf: usize,
    /// Rounds without validation improvement before stopping.
    pub early_stopping_rounds: usize,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            num_rounds: 200,
            learning_rate: 0.05,
            max_depth: 4,
            min_leaf: 5,
            early_stopping_rounds: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// One regression tree, nodes stored flat with index links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// A trained booster. Serializable as a model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gbm {
    objective: Objective,
    base_score: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
}

impl Gbm {
    /// Fit a booster. `x_val`/`y_val` drive early stopping; the model
    /// keeps only the trees up to the best validation round.
    pub fn train(
        params: &GbmParams,
        objective: Objective,
        x_train: &[Vec<f64>],
        y_train: &[f64],
        x_val: &[Vec<f64>],
        y_val: &[f64],
    ) -> Gbm {
        let base_score = match objective {
            Objective::Squared => mean(y_train),
            // Log-odds of the positive rate, clamped away from 0/1.
            Objective::Logistic => {
                let p = mean(y_train).clamp(1e-4, 1.0 - 1e-4);
                (p / (1.0 - p)).ln()
            }
        };

        let mut model = Gbm {
            objective,
            base_score,
            learning_rate: params.learning_rate,
            trees: Vec::new(),
        };

        let mut train_scores = vec![base_score; x_train.len()];
        let mut val_scores = vec![base_score; x_val.len()];
        let mut best_loss = f64::INFINITY;
        let mut best_round = 0;

        for round in 0..params.num_rounds {
            let residuals: Vec<f64> = train_scores
                .iter()
                .zip(y_train)
                .map(|(&score, &y)| y - model.transform(score))
                .collect();

            let tree = build_tree(x_train, &residuals, params.max_depth, params.min_leaf);
            for (score, row) in train_scores.iter_mut().zip(x_train) {
                *score += params.learning_rate * tree.predict(row);
            }
            for (score, row) in val_scores.iter_mut().zip(x_val) {
                *score += params.learning_rate * tree.predict(row);
            }
            model.trees.push(tree);

            let loss = model.loss(&val_scores, y_val);
            if loss < best_loss - 1e-9 {
                best_loss = loss;
                best_round = round;
            } else if round - best_round >= params.early_stopping_rounds {
                debug!(round, best_round, best_loss, "early stop");
                break;
            }
        }

        model.trees.truncate(best_round + 1);
        model
    }

    /// Raw score → model output (probability for logistic).
    fn transform(&self, score: f64) -> f64 {
        match self.objective {
            Objective::Squared => score,
            Objective::Logistic => sigmoid(score),
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let score = self.base_score
            + self.learning_rate * self.trees.iter().map(|t| t.predict(row)).sum::<f64>();
        self.transform(score)
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Validation loss on raw scores: MSE or log loss.
    fn loss(&self, scores: &[f64], targets: &[f64]) -> f64 {
        if targets.is_empty() {
            return 0.0;
        }
        let total: f64 = match self.objective {
            Objective::Squared => scores
                .iter()
                .zip(targets)
                .map(|(&s, &y)| (s - y) * (s - y))
                .sum(),
            Objective::Logistic => scores
                .iter()
                .zip(targets)
                .map(|(&s, &y)| {
                    let p = sigmoid(s).clamp(1e-7, 1.0 - 1e-7);
                    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
                })
                .sum(),
        };
        total / targets.len() as f64
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Fit one CART regression tree to the residuals.
fn build_tree(x: &[Vec<f64>], residuals: &[f64], max_depth: usize, min_leaf: usize) -> Tree {
    let mut tree = Tree { nodes: Vec::new() };
    let rows: Vec<usize> = (0..x.len()).collect();
    grow(&mut tree, x, residuals, rows, max_depth, min_leaf);
    tree
}

fn grow(
    tree: &mut Tree,
    x: &[Vec<f64>],
    residuals: &[f64],
    rows: Vec<usize>,
    depth: usize,
    min_leaf: usize,
) -> usize {
    let node_mean = {
        let sum: f64 = rows.iter().map(|&i| residuals[i]).sum();
        sum / rows.len().max(1) as f64
    };

    if depth == 0 || rows.len() < 2 * min_leaf {
        tree.nodes.push(Node::Leaf { value: node_mean });
        return tree.nodes.len() - 1;
    }

    let Some((feature, threshold)) = best_split(x, residuals, &rows, min_leaf) else {
        tree.nodes.push(Node::Leaf { value: node_mean });
        return tree.nodes.len() - 1;
    };

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        rows.into_iter().partition(|&i| x[i][feature] <= threshold);

    // Reserve the split slot before growing children.
    let idx = tree.nodes.len();
    tree.nodes.push(Node::Leaf { value: node_mean });
    let left = grow(tree, x, residuals, left_rows, depth - 1, min_leaf);
    let right = grow(tree, x, residuals, right_rows, depth - 1, min_leaf);
    tree.nodes[idx] = Node::Split {
        feature,
        threshold,
        left,
        right,
    };
    idx
}

/// Best (feature, threshold) by squared-error reduction, or None when
/// no split leaves `min_leaf` samples on both sides.
fn best_split(
    x: &[Vec<f64>],
    residuals: &[f64],
    rows: &[usize],
    min_leaf: usize,
) -> Option<(usize, f64)> {
    let n_features = x.first().map(|r| r.len()).unwrap_or(0);
    let total_sum: f64 = rows.iter().map(|&i| residuals[i]).sum();
    let n = rows.len() as f64;

    let mut best: Option<(f64, usize, f64)> = None;
    for feature in 0..n_features {
        let mut ordered: Vec<(f64, f64)> =
            rows.iter().map(|&i| (x[i][feature], residuals[i])).collect();
        ordered.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut left_sum = 0.0;
        for (k, window) in ordered.windows(2).enumerate() {
            left_sum += window[0].1;
            let left_n = (k + 1) as f64;
            // No split between identical values.
            if window[0].0 == window[1].0 {
                continue;
            }
            if k + 1 < min_leaf || rows.len() - (k + 1) < min_leaf {
                continue;
            }
            let right_sum = total_sum - left_sum;
            let right_n = n - left_n;
            // Variance-reduction surrogate: sum of per-side (sum^2 / n).
            let gain = left_sum * left_sum / left_n + right_sum * right_sum / right_n
                - total_sum * total_sum / n;
            let threshold = (window[0].0 + window[1].0) / 2.0;
            if best.map(|(g, _, _)| gain > g).unwrap_or(gain > 1e-12) {
                best = Some((gain, feature, threshold));
            }
        }
    }
    best.map(|(_, feature, threshold)| (feature, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        // y = 1 when x0 > 0.5, independent of x1.
        let x: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![i as f64 / n as f64, ((i * 7) % 13) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| if r[0] > 0.5 { 1.0 } else { 0.0 }).collect();
        (x, y)
    }

    #[test]
    fn regression_learns_a_step_function() {
        let (x, y) = step_data(100);
        let params = GbmParams {
            num_rounds: 50,
            learning_rate: 0.3,
            ..Default::default()
        };
        let model = Gbm::train(&params, Objective::Squared, &x, &y, &x, &y);
        assert!(model.predict(&[0.1, 3.0]) < 0.2);
        assert!(model.predict(&[0.9, 3.0]) > 0.8);
    }

    #[test]
    fn logistic_outputs_probabilities() {
        let (x, y) = step_data(100);
        let params = GbmParams {
            num_rounds: 80,
            learning_rate: 0.3,
            ..Default::default()
        };
        let model = Gbm::train(&params, Objective::Logistic, &x, &y, &x, &y);
        let low = model.predict(&[0.1, 0.0]);
        let high = model.predict(&[0.9, 0.0]);
        assert!((0.0..=1.0).contains(&low));
        assert!((0.0..=1.0).contains(&high));
        assert!(low < 0.3, "got {low}");
        assert!(high > 0.7, "got {high}");
    }

    #[test]
    fn early_stopping_caps_tree_count() {
        let (x, y) = step_data(60);
        let params = GbmParams {
            num_rounds: 200,
            learning_rate: 0.5,
            early_stopping_rounds: 5,
            ..Default::default()
        };
        let model = Gbm::train(&params, Objective::Squared, &x, &y, &x, &y);
        assert!(model.num_trees() < 200);
    }

    #[test]
    fn constant_target_yields_constant_prediction() {
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64]).collect();
        let y = vec![2.5; 30];
        let model = Gbm::train(&GbmParams::default(), Objective::Squared, &x, &y, &x, &y);
        assert!((model.predict(&[12.0]) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn model_round_trips_through_json() {
        let (x, y) = step_data(40);
        let params = GbmParams {
            num_rounds: 10,
            ..Default::default()
        };
        let model = Gbm::train(&params, Objective::Logistic, &x, &y, &x, &y);
        let json = serde_json::to_string(&model).unwrap();
        let back: Gbm = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
        assert_eq!(back.predict(&x[7]), model.predict(&x[7]));
    }
}
