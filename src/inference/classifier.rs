//! Tree-ensemble classifiers exported from the offline training job.
//!
//! Two families are supported:
//! - `random_forest`: averaged class distributions of decision trees
//!   (split rule `x[f] <= t`).
//! - `gradient_boosting`: per-class additive regression trees followed by a
//!   softmax, or a sigmoid for two classes (split rule `x[f] < t`).
//!
//! Node arrays are stored flat, parent before child, with `-1` marking
//! leaves. Validation at load time guarantees every traversal terminates.

use serde::{Deserialize, Serialize};

use super::InferenceError;

const LEAF: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitRule {
    LessOrEqual,
    Less,
}

/// Flat node arrays shared by both tree kinds.
struct Nodes<'a> {
    left: &'a [i64],
    right: &'a [i64],
    feature: &'a [i64],
    threshold: &'a [f64],
}

impl Nodes<'_> {
    fn len(&self) -> usize {
        self.left.len()
    }

    fn is_leaf(&self, node: usize) -> bool {
        self.left[node] == LEAF
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        let n = self.left.len();
        if n == 0 {
            return Err("tree has no nodes".into());
        }
        if self.right.len() != n || self.feature.len() != n || self.threshold.len() != n {
            return Err("tree node arrays differ in length".into());
        }
        for node in 0..n {
            let (left, right) = (self.left[node], self.right[node]);
            if left == LEAF && right == LEAF {
                continue;
            }
            if left == LEAF || right == LEAF {
                return Err(format!("node {node} has a single child"));
            }
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(format!("node {node} has invalid child {child}"));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature >= n_features as i64 {
                return Err(format!("node {node} splits on unknown feature {feature}"));
            }
            if !self.threshold[node].is_finite() {
                return Err(format!("node {node} has a non-finite threshold"));
            }
        }
        Ok(())
    }

    fn find_leaf(&self, x: &[f64], rule: SplitRule) -> usize {
        let mut node = 0;
        while !self.is_leaf(node) {
            let value = x[self.feature[node] as usize];
            let go_left = match rule {
                SplitRule::LessOrEqual => value <= self.threshold[node],
                SplitRule::Less => value < self.threshold[node],
            };
            let next = if go_left {
                self.left[node]
            } else {
                self.right[node]
            };
            node = next as usize;
        }
        node
    }
}

/// A single classification tree; `value[node]` holds per-class weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn nodes(&self) -> Nodes<'_> {
        Nodes {
            left: &self.children_left,
            right: &self.children_right,
            feature: &self.feature,
            threshold: &self.threshold,
        }
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        let nodes = self.nodes();
        nodes.validate(n_features)?;
        if self.value.len() != nodes.len() {
            return Err("tree value array differs in length".into());
        }
        for node in (0..nodes.len()).filter(|&n| nodes.is_leaf(n)) {
            let weights = &self.value[node];
            if weights.len() != n_classes {
                return Err(format!(
                    "leaf {node} has {} class weights, expected {n_classes}",
                    weights.len()
                ));
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(format!("leaf {node} has invalid class weights"));
            }
            if weights.iter().sum::<f64>() <= 0.0 {
                return Err(format!("leaf {node} has no class weight"));
            }
        }
        Ok(())
    }

    /// Normalized class distribution of the leaf reached by `x`.
    fn leaf_distribution(&self, x: &[f64]) -> impl Iterator<Item = f64> + '_ {
        let weights = &self.value[self.nodes().find_leaf(x, SplitRule::LessOrEqual)];
        let total: f64 = weights.iter().sum();
        weights.iter().map(move |w| w / total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_classes: usize,
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (p, w) in proba.iter_mut().zip(tree.leaf_distribution(x)) {
                *p += w;
            }
        }
        let n_trees = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        proba
    }

    fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("random forest has no trees".into());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.n_classes)
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }
}

/// A boosted regression tree; leaves carry an additive margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub leaf_value: Vec<f64>,
}

impl RegressionTree {
    fn nodes(&self) -> Nodes<'_> {
        Nodes {
            left: &self.children_left,
            right: &self.children_right,
            feature: &self.feature,
            threshold: &self.threshold,
        }
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        let nodes = self.nodes();
        nodes.validate(n_features)?;
        if self.leaf_value.len() != nodes.len() {
            return Err("tree leaf_value array differs in length".into());
        }
        if self.leaf_value.iter().any(|v| !v.is_finite()) {
            return Err("tree has non-finite leaf values".into());
        }
        Ok(())
    }

    fn margin(&self, x: &[f64]) -> f64 {
        self.leaf_value[self.nodes().find_leaf(x, SplitRule::Less)]
    }
}

/// Tree `i` contributes to class `i % n_classes`. With two classes all
/// trees feed a single logistic margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub n_classes: usize,
    pub n_features: usize,
    #[serde(default)]
    pub base_margin: f64,
    pub trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        if self.n_classes == 2 {
            let margin = self.base_margin + self.trees.iter().map(|t| t.margin(x)).sum::<f64>();
            let positive = 1.0 / (1.0 + (-margin).exp());
            return vec![1.0 - positive, positive];
        }

        let mut margins = vec![self.base_margin; self.n_classes];
        for (i, tree) in self.trees.iter().enumerate() {
            margins[i % self.n_classes] += tree.margin(x);
        }
        softmax(&margins)
    }

    fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("gradient boosting model has no trees".into());
        }
        if self.n_classes > 2 && self.trees.len() % self.n_classes != 0 {
            return Err(format!(
                "{} trees do not divide evenly across {} classes",
                self.trees.len(),
                self.n_classes
            ));
        }
        if !self.base_margin.is_finite() {
            return Err("base_margin is not finite".into());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }
}

fn softmax(margins: &[f64]) -> Vec<f64> {
    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = margins.iter().map(|m| (m - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// A trained classifier producing a probability distribution over classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl Classifier {
    pub fn n_classes(&self) -> usize {
        match self {
            Self::RandomForest(m) => m.n_classes,
            Self::GradientBoosting(m) => m.n_classes,
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            Self::RandomForest(m) => m.n_features,
            Self::GradientBoosting(m) => m.n_features,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::RandomForest(_) => "RandomForest",
            Self::GradientBoosting(_) => "GradientBoosting",
        }
    }

    /// Probability of each class for one feature vector.
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if x.len() != self.n_features() {
            return Err(InferenceError::Prediction(format!(
                "classifier expects {} features, got {}",
                self.n_features(),
                x.len()
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(InferenceError::Prediction(
                "feature vector contains non-finite values".into(),
            ));
        }

        let proba = match self {
            Self::RandomForest(m) => m.predict_proba(x),
            Self::GradientBoosting(m) => m.predict_proba(x),
        };

        if proba.iter().any(|p| !p.is_finite()) {
            return Err(InferenceError::Prediction(
                "classifier produced non-finite probabilities".into(),
            ));
        }
        Ok(proba)
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.n_classes() < 2 && matches!(self, Self::GradientBoosting(_)) {
            return Err("gradient boosting needs at least two classes".into());
        }
        if self.n_classes() == 0 {
            return Err("classifier has no classes".into());
        }
        if self.n_features() == 0 {
            return Err("classifier has no features".into());
        }
        match self {
            Self::RandomForest(m) => m.validate(),
            Self::GradientBoosting(m) => m.validate(),
        }
    }
}

/// Class indices ordered by probability descending. Equal probabilities
/// keep ascending class index order.
pub fn rank_classes(proba: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..proba.len()).collect();
    order.sort_by(|&a, &b| proba[b].total_cmp(&proba[a]).then(a.cmp(&b)));
    order
}

/// Index and value of the most probable class; the lowest index wins ties.
pub fn argmax(proba: &[f64]) -> Option<(usize, f64)> {
    rank_classes(proba).first().map(|&i| (i, proba[i]))
}
