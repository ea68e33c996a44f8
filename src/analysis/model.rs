// Model - frozen classifier artifact
//
// The classifier is trained elsewhere and consumed read-only. The artifact is
// a JSON decision forest:
//
//   { "format_version": 1, "n_features": 14, "classes": [...],
//     "trees": [ { "nodes": [ {"feature", "threshold", "left", "right"} | {"value": [...]} ] } ] }
//
// Node 0 is the root of each tree. A split sends the sample left when
// x[feature] <= threshold. Leaves hold per-class weights; the forest averages
// the normalized leaf distributions and predicts the first arg-max.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::features::FeatureVector;
use crate::error::ModelError;

/// Only artifact layout this build understands
pub const FORMAT_VERSION: u32 = 1;

/// Frozen classifier consumed by the pipeline
///
/// Implementations must be read-only after construction so one instance can
/// be shared across concurrent requests.
pub trait EmotionModel: Send + Sync {
    /// Class index for a vector of length `input_dim()`
    fn predict(&self, features: &FeatureVector) -> usize;

    /// Dimensionality the model was trained on
    fn input_dim(&self) -> usize;

    /// Number of classes the model can output
    fn n_classes(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Leaf weights reached by `x`
    fn leaf(&self, x: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }
}

/// Averaging decision forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionForest {
    pub format_version: u32,
    pub n_features: usize,
    pub classes: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

impl DecisionForest {
    /// Load and validate an artifact from disk
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let contents = fs::read_to_string(path).map_err(|e| ModelError::Unavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let forest = Self::from_json(&contents)?;

        info!(
            path = %path.display(),
            trees = forest.trees.len(),
            classes = forest.classes.len(),
            n_features = forest.n_features,
            "classifier model loaded"
        );
        Ok(forest)
    }

    /// Parse and validate an artifact
    pub fn from_json(contents: &str) -> Result<Self, ModelError> {
        let forest: DecisionForest =
            serde_json::from_str(contents).map_err(|e| ModelError::Corrupt {
                reason: e.to_string(),
            })?;
        forest.validate()?;
        Ok(forest)
    }

    /// Check everything `predict` relies on so it can never index out of bounds
    /// or loop forever
    pub fn validate(&self) -> Result<(), ModelError> {
        let corrupt = |reason: String| Err(ModelError::Corrupt { reason });

        if self.format_version != FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: self.format_version,
            });
        }
        if self.n_features == 0 {
            return corrupt("n_features must be positive".to_string());
        }
        if self.classes.is_empty() {
            return corrupt("no classes declared".to_string());
        }
        if self.trees.is_empty() {
            return corrupt("forest has no trees".to_string());
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return corrupt(format!("tree {} has no nodes", t));
            }
            for (n, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if *feature >= self.n_features {
                            return corrupt(format!(
                                "tree {} node {} splits on feature {} of {}",
                                t, n, feature, self.n_features
                            ));
                        }
                        if !threshold.is_finite() {
                            return corrupt(format!("tree {} node {} has non-finite threshold", t, n));
                        }
                        // Children must come after their parent, which rules out cycles
                        for child in [*left, *right] {
                            if child <= n || child >= tree.nodes.len() {
                                return corrupt(format!(
                                    "tree {} node {} has invalid child {}",
                                    t, n, child
                                ));
                            }
                        }
                    }
                    TreeNode::Leaf { value } => {
                        if value.len() != self.classes.len() {
                            return corrupt(format!(
                                "tree {} leaf {} has {} weights for {} classes",
                                t,
                                n,
                                value.len(),
                                self.classes.len()
                            ));
                        }
                        let valid = value.iter().all(|w| w.is_finite() && *w >= 0.0);
                        if !valid || value.iter().sum::<f64>() <= 0.0 {
                            return corrupt(format!("tree {} leaf {} has invalid weights", t, n));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Averaged class distribution for `x`
    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf(x);
            let sum: f64 = leaf.iter().sum();
            for (total, weight) in totals.iter_mut().zip(leaf) {
                *total += weight / sum;
            }
        }
        let n_trees = self.trees.len() as f64;
        totals.iter_mut().for_each(|t| *t /= n_trees);
        totals
    }
}

impl EmotionModel for DecisionForest {
    fn predict(&self, features: &FeatureVector) -> usize {
        let proba = self.predict_proba(features.as_slice());
        // First index wins ties
        proba
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(best, best_p), (i, &p)| {
                if p > best_p {
                    (i, p)
                } else {
                    (best, best_p)
                }
            })
            .0
    }

    fn input_dim(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One stump on feature 0: <= 1.0 → class 0, otherwise class 2
    const STUMP: &str = r#"{
        "format_version": 1,
        "n_features": 2,
        "classes": ["angry", "disgust", "fear"],
        "trees": [
            { "nodes": [
                { "feature": 0, "threshold": 1.0, "left": 1, "right": 2 },
                { "value": [5.0, 1.0, 0.0] },
                { "value": [0.0, 1.0, 3.0] }
            ] }
        ]
    }"#;

    #[test]
    fn test_split_goes_left_on_equal() {
        let forest = DecisionForest::from_json(STUMP).unwrap();
        assert_eq!(forest.predict(&FeatureVector::new(vec![1.0, 0.0])), 0);
        assert_eq!(forest.predict(&FeatureVector::new(vec![1.5, 0.0])), 2);
        assert_eq!(forest.input_dim(), 2);
        assert_eq!(forest.n_classes(), 3);
    }

    #[test]
    fn test_forest_averages_normalized_leaves() {
        let mut forest = DecisionForest::from_json(STUMP).unwrap();
        // A single leaf voting strongly for class 1
        forest.trees.push(DecisionTree {
            nodes: vec![TreeNode::Leaf {
                value: vec![0.0, 100.0, 0.0],
            }],
        });
        forest.validate().unwrap();

        let proba = forest.predict_proba(&[0.0, 0.0]);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        // (5/6 + 0) / 2 vs (1/6 + 1) / 2
        assert_eq!(forest.predict(&FeatureVector::new(vec![0.0, 0.0])), 1);
    }

    #[test]
    fn test_ties_pick_first_class() {
        let json = r#"{"format_version":1,"n_features":1,"classes":["a","b"],
            "trees":[{"nodes":[{"value":[1.0,1.0]}]}]}"#;
        let forest = DecisionForest::from_json(json).unwrap();
        assert_eq!(forest.predict(&FeatureVector::new(vec![0.0])), 0);
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let json = STUMP.replace("\"format_version\": 1", "\"format_version\": 2");
        assert_eq!(
            DecisionForest::from_json(&json),
            Err(ModelError::UnsupportedVersion { found: 2 })
        );
    }

    #[test]
    fn test_rejects_structural_problems() {
        let cases = [
            STUMP.replace("\"feature\": 0", "\"feature\": 7"),
            STUMP.replace("\"left\": 1", "\"left\": 0"),
            STUMP.replace("\"right\": 2", "\"right\": 9"),
            STUMP.replace("[5.0, 1.0, 0.0]", "[5.0, 1.0]"),
            STUMP.replace("[5.0, 1.0, 0.0]", "[0.0, 0.0, 0.0]"),
            STUMP.replace("[5.0, 1.0, 0.0]", "[-1.0, 1.0, 0.0]"),
            "not json".to_string(),
        ];
        for json in cases {
            assert!(
                matches!(DecisionForest::from_json(&json), Err(ModelError::Corrupt { .. })),
                "accepted {}",
                json
            );
        }
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let err = DecisionForest::load(Path::new("/nonexistent/forest.json")).unwrap_err();
        assert!(matches!(err, ModelError::Unavailable { .. }));
    }
}
