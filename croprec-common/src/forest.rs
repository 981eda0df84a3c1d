//! Random forest classifier
//!
//! CART trees with Gini impurity, grown on bootstrap resamples with a random
//! subset of candidate features per split. Prediction is a majority vote
//! across trees, ties going to the lowest class index.
//!
//! Trees are stored as flat node arenas so the whole forest serializes with
//! serde and can be checked for structural soundness after loading.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the ensemble
    pub n_trees: usize,
    /// Maximum tree depth (None = grow until pure)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split an internal node
    pub min_samples_split: usize,
    /// Minimum samples required in each child of a split
    pub min_samples_leaf: usize,
    /// Candidate features per split (None = floor(sqrt(n_features)))
    pub max_features: Option<usize>,
    /// Train each tree on a bootstrap resample
    pub bootstrap: bool,
    /// RNG seed (None = seeded from OS entropy)
    pub seed: Option<u64>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: None,
        }
    }
}

impl ForestConfig {
    fn features_per_split(&self, n_features: usize) -> usize {
        self.max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
            .clamp(1, n_features)
    }
}

/// Tree node; children are indices into the owning tree's node list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single CART classification tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Class predicted for `x`
    ///
    /// `x` must have at least as many columns as the tree was trained on.
    pub fn predict(&self, x: &[f64]) -> usize {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { class } => return class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Structural check: root exists, every child index points forward
    /// and in range, features and classes are in range
    fn validate(&self, n_features: usize, n_classes: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { class } if class >= n_classes => {
                    return Err(format!("node {} predicts class {} of {}", i, class, n_classes));
                }
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if feature >= n_features {
                        return Err(format!("node {} splits on feature {} of {}", i, feature, n_features));
                    }
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", i, child));
                        }
                    }
                }
                Node::Leaf { .. } => {}
            }
        }
        Ok(())
    }
}

/// Best split found on one node
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Grows one tree over a fixed training matrix
struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    n_features: usize,
    features_per_split: usize,
    config: &'a ForestConfig,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn build(mut self, rows: Vec<usize>, rng: &mut StdRng) -> DecisionTree {
        self.grow(rows, 0, rng);
        DecisionTree { nodes: self.nodes }
    }

    fn grow(&mut self, rows: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let counts = self.class_counts(&rows);
        let majority = argmax(&counts);
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf { class: majority });

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if pure || depth_reached || rows.len() < self.config.min_samples_split {
            return node_idx;
        }

        let Some(split) = self.find_split(&rows, rng) else {
            return node_idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| self.x[r][split.feature] <= split.threshold);

        let left = self.grow(left_rows, depth + 1, rng);
        let right = self.grow(right_rows, depth + 1, rng);
        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    /// Draw features in random order until `features_per_split` of them have
    /// offered a valid split, continuing past that while none has
    fn find_split(&self, rows: &[usize], rng: &mut StdRng) -> Option<SplitCandidate> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);

        let mut examined = 0;
        let mut best: Option<SplitCandidate> = None;
        for feature in features {
            if examined >= self.features_per_split && best.is_some() {
                break;
            }
            let Some((threshold, impurity)) = self.best_threshold(rows, feature) else {
                continue;
            };
            examined += 1;
            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
        best
    }

    /// Lowest weighted child Gini over all thresholds on `feature`
    ///
    /// Returns None when the feature is constant over `rows` or no threshold
    /// satisfies `min_samples_leaf`.
    fn best_threshold(&self, rows: &[usize], feature: usize) -> Option<(f64, f64)> {
        let mut sorted: Vec<(f64, usize)> = rows.iter().map(|&r| (self.x[r][feature], self.y[r])).collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = sorted.len();
        let first = sorted.first()?.0;
        let last = sorted.last()?.0;
        if first >= last {
            return None;
        }

        let mut left = vec![0usize; self.n_classes];
        let mut right = self.class_counts(rows);
        let min_leaf = self.config.min_samples_leaf.max(1);
        let mut best: Option<(f64, f64)> = None;

        for i in 0..n - 1 {
            let (value, class) = sorted[i];
            left[class] += 1;
            right[class] -= 1;

            let next = sorted[i + 1].0;
            if value >= next {
                continue;
            }
            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let impurity = (n_left as f64 * gini(&left, n_left) + n_right as f64 * gini(&right, n_right)) / n as f64;
            if best.map_or(true, |(_, b)| impurity < b) {
                let mut threshold = value + (next - value) / 2.0;
                if threshold >= next {
                    threshold = value;
                }
                best = Some((threshold, impurity));
            }
        }

        best
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &r in rows {
            counts[self.y[r]] += 1;
        }
        counts
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

/// Index of the largest count; ties resolve to the lowest index
fn argmax(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    best
}

/// Majority-vote ensemble of decision trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit a forest on feature rows `x` with class indices `y` in `0..n_classes`
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, config: ForestConfig) -> Result<Self> {
        if x.is_empty() {
            return Err(Error::Training("no training samples".to_string()));
        }
        if x.len() != y.len() {
            return Err(Error::Training(format!(
                "{} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        if config.n_trees == 0 {
            return Err(Error::Training("n_trees must be at least 1".to_string()));
        }
        let n_features = x[0].len();
        if n_features == 0 {
            return Err(Error::Training("feature rows are empty".to_string()));
        }
        if let Some(row) = x.iter().position(|r| r.len() != n_features) {
            return Err(Error::Training(format!(
                "row {} has {} features, expected {}",
                row,
                x[row].len(),
                n_features
            )));
        }
        if let Some(row) = x.iter().position(|r| r.iter().any(|v| !v.is_finite())) {
            return Err(Error::Training(format!("row {} has a non-finite feature", row)));
        }
        if let Some(&label) = y.iter().find(|&&l| l >= n_classes) {
            return Err(Error::Training(format!(
                "label {} out of range for {} classes",
                label, n_classes
            )));
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let features_per_split = config.features_per_split(n_features);
        let n = x.len();

        let trees: Vec<DecisionTree> = (0..config.n_trees)
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen());
                let rows: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| tree_rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                TreeBuilder {
                    x,
                    y,
                    n_classes,
                    n_features,
                    features_per_split,
                    config: &config,
                    nodes: Vec::new(),
                }
                .build(rows, &mut tree_rng)
            })
            .collect();

        debug!(
            "Fitted {} trees on {} samples ({} features, {} classes, {} candidate features per split)",
            trees.len(),
            n,
            n_features,
            n_classes,
            features_per_split
        );

        Ok(Self {
            config,
            n_features,
            n_classes,
            trees,
        })
    }

    /// Per-class vote counts for `x`
    pub fn votes(&self, x: &[f64]) -> Vec<usize> {
        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            votes[tree.predict(x)] += 1;
        }
        votes
    }

    /// Majority-vote class index for `x`
    pub fn predict(&self, x: &[f64]) -> usize {
        argmax(&self.votes(x))
    }

    /// Fraction of rows whose prediction equals the given label
    pub fn accuracy(&self, x: &[Vec<f64>], y: &[usize]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        let correct = x
            .iter()
            .zip(y)
            .filter(|(row, &label)| self.predict(row) == label)
            .count();
        correct as f64 / x.len() as f64
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Check a deserialized forest before it is used for prediction
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(Error::IncompatibleArtifact("forest has no trees".to_string()));
        }
        if self.n_classes == 0 {
            return Err(Error::IncompatibleArtifact("forest has no classes".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.n_classes)
                .map_err(|e| Error::IncompatibleArtifact(format!("tree {}: {}", i, e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(n_trees: usize) -> ForestConfig {
        ForestConfig {
            n_trees,
            seed: Some(7),
            ..ForestConfig::default()
        }
    }

    fn two_clusters() -> (Vec<Vec<f64>>, Vec<usize>) {
        let x = vec![
            vec![0.0, 1.0],
            vec![0.5, 1.2],
            vec![1.0, 0.8],
            vec![10.0, 9.0],
            vec![10.5, 9.5],
            vec![11.0, 10.0],
        ];
        let y = vec![0, 0, 0, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[0, 0], 0), 0.0);
    }

    #[test]
    fn test_argmax_ties_go_low() {
        assert_eq!(argmax(&[3, 5, 5]), 1);
        assert_eq!(argmax(&[0, 0, 0]), 0);
    }

    #[test]
    fn test_separates_clusters() {
        let (x, y) = two_clusters();
        let forest = RandomForest::fit(&x, &y, 2, seeded(25)).unwrap();

        assert_eq!(forest.n_trees(), 25);
        assert_eq!(forest.predict(&[0.2, 1.0]), 0);
        assert_eq!(forest.predict(&[10.2, 9.8]), 1);
        assert_eq!(forest.accuracy(&x, &y), 1.0);
        assert_eq!(forest.votes(&[0.2, 1.0]).iter().sum::<usize>(), 25);
    }

    #[test]
    fn test_single_tree_without_bootstrap_is_pure() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        let y = vec![0, 1, 2, 3];
        let config = ForestConfig {
            n_trees: 1,
            bootstrap: false,
            seed: Some(1),
            ..ForestConfig::default()
        };
        let forest = RandomForest::fit(&x, &y, 4, config).unwrap();

        let tree = &forest.trees()[0];
        assert_eq!(tree.n_leaves(), 4);
        assert_eq!(tree.n_nodes(), 7);
        for (row, &label) in x.iter().zip(&y) {
            assert_eq!(tree.predict(row), label);
        }
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        let y = vec![0, 1, 2, 3];
        let config = ForestConfig {
            n_trees: 1,
            bootstrap: false,
            max_depth: Some(1),
            seed: Some(1),
            ..ForestConfig::default()
        };
        let forest = RandomForest::fit(&x, &y, 4, config).unwrap();
        assert_eq!(forest.trees()[0].n_leaves(), 2);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = two_clusters();
        let a = RandomForest::fit(&x, &y, 2, seeded(10)).unwrap();
        let b = RandomForest::fit(&x, &y, 2, seeded(10)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_features_yield_single_leaf() {
        let x = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let y = vec![0, 1];
        let forest = RandomForest::fit(&x, &y, 2, seeded(3)).unwrap();
        for tree in forest.trees() {
            assert_eq!(tree.n_nodes(), 1);
        }
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let (x, y) = two_clusters();
        assert!(matches!(
            RandomForest::fit(&[], &[], 2, seeded(1)),
            Err(Error::Training(_))
        ));
        assert!(matches!(
            RandomForest::fit(&x, &y[..3], 2, seeded(1)),
            Err(Error::Training(_))
        ));
        assert!(matches!(
            RandomForest::fit(&x, &y, 1, seeded(1)),
            Err(Error::Training(_))
        ));
        assert!(matches!(
            RandomForest::fit(&x, &y, 2, seeded(0)),
            Err(Error::Training(_))
        ));

        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(RandomForest::fit(&ragged, &[0, 1], 2, seeded(1)).is_err());

        let nan = vec![vec![f64::NAN, 2.0], vec![1.0, 2.0]];
        assert!(RandomForest::fit(&nan, &[0, 1], 2, seeded(1)).is_err());
    }

    #[test]
    fn test_validate_detects_corruption() {
        let (x, y) = two_clusters();
        let forest = RandomForest::fit(&x, &y, 2, seeded(2)).unwrap();
        assert!(forest.validate().is_ok());

        let mut broken = forest.clone();
        broken.trees[0].nodes[0] = Node::Split {
            feature: 5,
            threshold: 0.0,
            left: 1,
            right: 2,
        };
        assert!(matches!(broken.validate(), Err(Error::IncompatibleArtifact(_))));

        let mut cyclic = forest;
        cyclic.trees[0].nodes[0] = Node::Split {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
        };
        assert!(cyclic.validate().is_err());
    }
}
