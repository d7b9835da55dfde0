//! Exercise-state classification.
//!
//! The pretrained classifier is an opaque oracle: the pipeline only relies on
//! its label domain and on it being deterministic for identical inputs.
//! [`ForestClassifier`] evaluates a decision-tree ensemble exported to JSON.

use std::path::Path;

use serde::Deserialize;

use repsense_common::error::{RepsenseError, RepsenseResult};
use repsense_model::label::ExerciseLabel;

use crate::angles::{AngleVector, ANGLE_COUNT};

/// Trait for angle-vector classifiers.
pub trait StateClassifier: Send + Sync {
    /// Map a valid angle vector to an exercise label.
    fn classify(&self, angles: &AngleVector) -> RepsenseResult<ExerciseLabel>;

    /// Classifier name for logging.
    fn name(&self) -> &str;
}

/// Decision-tree ensemble evaluated like a random forest's `predict`:
/// per-tree class distributions are normalized, averaged, and the most
/// probable class wins (ties go to the lowest class index).
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    classes: Vec<ExerciseLabel>,
    trees: Vec<Tree>,
}

#[derive(Debug, Clone, Deserialize)]
struct ForestFile {
    classes: Vec<String>,
    trees: Vec<Tree>,
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Node {
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

impl ForestClassifier {
    /// Load and validate a model file.
    pub fn load(path: &Path) -> RepsenseResult<Self> {
        if !path.exists() {
            return Err(RepsenseError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let classifier = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            trees = classifier.trees.len(),
            classes = ?classifier.classes,
            "Classifier model loaded"
        );
        Ok(classifier)
    }

    /// Parse and validate a model from JSON text.
    pub fn from_json(json: &str) -> RepsenseResult<Self> {
        let file: ForestFile = serde_json::from_str(json)
            .map_err(|e| RepsenseError::classifier(format!("Invalid model file: {e}")))?;

        if file.classes.is_empty() {
            return Err(RepsenseError::classifier("Model declares no classes"));
        }
        if file.trees.is_empty() {
            return Err(RepsenseError::classifier("Model contains no trees"));
        }
        for (tree_idx, tree) in file.trees.iter().enumerate() {
            validate_tree(tree, file.classes.len())
                .map_err(|msg| RepsenseError::classifier(format!("Tree {tree_idx}: {msg}")))?;
        }

        Ok(Self {
            classes: file.classes.iter().map(|c| ExerciseLabel::parse(c)).collect(),
            trees: file.trees,
        })
    }

    /// Labels this model can emit, in class-index order.
    pub fn classes(&self) -> &[ExerciseLabel] {
        &self.classes
    }

    /// Averaged class probabilities for an angle vector.
    pub fn predict_proba(&self, angles: &AngleVector) -> Vec<f64> {
        let features = angles.as_array();
        let mut totals = vec![0.0; self.classes.len()];

        for tree in &self.trees {
            let value = tree.leaf_for(features);
            let sum: f64 = value.iter().sum();
            if sum <= 0.0 {
                continue;
            }
            for (total, v) in totals.iter_mut().zip(value) {
                *total += v / sum;
            }
        }

        let n = self.trees.len() as f64;
        totals.iter_mut().for_each(|t| *t /= n);
        totals
    }
}

impl StateClassifier for ForestClassifier {
    fn classify(&self, angles: &AngleVector) -> RepsenseResult<ExerciseLabel> {
        let proba = self.predict_proba(angles);
        let mut best: Option<(usize, f64)> = None;
        for (idx, p) in proba.iter().enumerate() {
            if best.map_or(true, |(_, best_p)| *p > best_p) {
                best = Some((idx, *p));
            }
        }
        let (idx, p) = best.ok_or_else(|| RepsenseError::classifier("Empty prediction"))?;
        if p <= 0.0 {
            return Err(RepsenseError::classifier("No tree produced a prediction"));
        }
        Ok(self.classes[idx].clone())
    }

    fn name(&self) -> &str {
        "forest"
    }
}

impl Tree {
    /// Walk from the root to a leaf. Validation guarantees children come
    /// after their parent, so the walk terminates.
    fn leaf_for(&self, features: &[f64; ANGLE_COUNT]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf { value } => return value,
            }
        }
    }
}

fn validate_tree(tree: &Tree, class_count: usize) -> Result<(), String> {
    if tree.nodes.is_empty() {
        return Err("no nodes".to_string());
    }
    for (idx, node) in tree.nodes.iter().enumerate() {
        match node {
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= ANGLE_COUNT {
                    return Err(format!("node {idx} splits on unknown feature {feature}"));
                }
                if !threshold.is_finite() {
                    return Err(format!("node {idx} has a non-finite threshold"));
                }
                for child in [left, right] {
                    if *child <= idx || *child >= tree.nodes.len() {
                        return Err(format!("node {idx} has invalid child {child}"));
                    }
                }
            }
            Node::Leaf { value } => {
                if value.len() != class_count {
                    return Err(format!(
                        "leaf {idx} has {} values, expected {class_count}",
                        value.len()
                    ));
                }
            }
        }
    }
    Ok(())
}
