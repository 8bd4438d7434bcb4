//! A serde-JSON random forest, applied but never trained here.
//!
//! The file format is a plain decision forest: axis-aligned threshold
//! splits and class-index leaves, nodes stored per tree in an array
//! with child links pointing forward. A sample goes left when
//! `x[feature] <= threshold`. The forest votes; ties go to the
//! smallest class value; confidence is the winning vote fraction.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::Classifier;
use crate::error::ClassifyError;
use crate::matrix::FeatureMatrix;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        class: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    /// Walk from the root to a leaf, returning the class index.
    ///
    /// Termination is guaranteed by the forward-links rule checked at
    /// load time.
    fn decide(&self, sample: &[f32]) -> usize {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                TreeNode::Leaf { class } => return *class,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// A pre-trained random forest loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestModel {
    n_features: usize,
    /// Class labels in leaf-index order.
    classes: Vec<u8>,
    trees: Vec<Tree>,
}

impl RandomForestModel {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ClassifyError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ClassifyError::ModelIo {
            path: path.display().to_string(),
            source,
        })?;
        let model: Self = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            ClassifyError::ModelFormat {
                path: path.display().to_string(),
                source,
            }
        })?;
        model.validate()?;
        info!(
            path = %path.display(),
            trees = model.trees.len(),
            features = model.n_features,
            classes = model.classes.len(),
            "loaded random forest model"
        );
        Ok(model)
    }

    /// Structural validation: every index the walk can follow must be
    /// in range, and child links must point forward so the walk
    /// terminates.
    fn validate(&self) -> Result<(), ClassifyError> {
        if self.n_features == 0 {
            return Err(ClassifyError::ModelInvalid("zero features".into()));
        }
        if self.classes.is_empty() {
            return Err(ClassifyError::ModelInvalid("empty class list".into()));
        }
        if self.trees.is_empty() {
            return Err(ClassifyError::ModelInvalid("empty forest".into()));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ClassifyError::ModelInvalid(format!("tree {t} has no nodes")));
            }
            for (n, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Leaf { class } => {
                        if *class >= self.classes.len() {
                            return Err(ClassifyError::ModelInvalid(format!(
                                "tree {t} node {n}: class index {class} out of range"
                            )));
                        }
                    }
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= self.n_features {
                            return Err(ClassifyError::ModelInvalid(format!(
                                "tree {t} node {n}: feature index {feature} out of range"
                            )));
                        }
                        if *left >= tree.nodes.len() || *right >= tree.nodes.len() {
                            return Err(ClassifyError::ModelInvalid(format!(
                                "tree {t} node {n}: child index out of range"
                            )));
                        }
                        if *left <= n || *right <= n {
                            return Err(ClassifyError::ModelInvalid(format!(
                                "tree {t} node {n}: child links must point forward"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Vote over all trees for one sample: (class label, vote fraction).
    fn vote(&self, sample: &[f32]) -> (u8, f32) {
        let mut counts = vec![0u32; self.classes.len()];
        for tree in &self.trees {
            counts[tree.decide(sample)] += 1;
        }
        let mut best = 0usize;
        for (i, count) in counts.iter().enumerate().skip(1) {
            let better = *count > counts[best]
                || (*count == counts[best] && self.classes[i] < self.classes[best]);
            if better {
                best = i;
            }
        }
        let confidence = counts[best] as f32 / self.trees.len() as f32;
        (self.classes[best], confidence)
    }
}

impl Classifier for RandomForestModel {
    fn expected_feature_count(&self) -> usize {
        self.n_features
    }

    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<u8>, ClassifyError> {
        self.check_feature_count(matrix)?;
        Ok((0..matrix.samples())
            .map(|i| self.vote(matrix.sample(i)).0)
            .collect())
    }

    fn predict_with_confidence(
        &self,
        matrix: &FeatureMatrix,
    ) -> Result<(Vec<u8>, Vec<f32>), ClassifyError> {
        self.check_feature_count(matrix)?;
        let mut labels = Vec::with_capacity(matrix.samples());
        let mut scores = Vec::with_capacity(matrix.samples());
        for i in 0..matrix.samples() {
            let (label, confidence) = self.vote(matrix.sample(i));
            labels.push(label);
            scores.push(confidence);
        }
        Ok((labels, scores))
    }
}
