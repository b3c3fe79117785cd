//! Decision-forest estimator loaded from a JSON export.
//!
//! Expected shape:
//!
//! ```json
//! {
//!   "features": ["co","no","no2","o3","so2","pm2_5","pm10","nh3","hour"],
//!   "trees": [
//!     { "nodes": [
//!         { "feature": 5, "threshold": 12.5, "left": 1, "right": 2 },
//!         { "class": 1 },
//!         { "class": 3 }
//!     ] }
//!   ]
//! }
//! ```
//!
//! A split sends the sample left when `x[feature] <= threshold`.

use super::{AqiEstimator, check_features};
use crate::models::{AqiCategory, FEATURE_COUNT, FeatureVector, Pollutant};
use crate::{AirError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

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
        class: AqiCategory,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, features: &FeatureVector) -> AqiCategory {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Children must point strictly forward, which rules out cycles
    fn validate(&self, tree_index: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(AirError::config(format!("tree {tree_index} has no nodes")));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= FEATURE_COUNT {
                    return Err(AirError::config(format!(
                        "tree {tree_index} node {i} splits on unknown feature {feature}"
                    )));
                }
                for child in [*left, *right] {
                    if child <= i || child >= self.nodes.len() {
                        return Err(AirError::config(format!(
                            "tree {tree_index} node {i} has invalid child {child}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ForestFile {
    features: Vec<String>,
    trees: Vec<Tree>,
}

/// Majority vote over a set of decision trees
#[derive(Debug, Clone)]
pub struct ForestEstimator {
    trees: Vec<Tree>,
}

impl ForestEstimator {
    /// Parse and validate a forest from its JSON export
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ForestFile = serde_json::from_str(json)
            .map_err(|e| AirError::config(format!("Invalid forest model: {e}")))?;

        let expected: Vec<&str> = Pollutant::ALL
            .iter()
            .map(|p| p.symbol())
            .chain(std::iter::once("hour"))
            .collect();
        if file.features != expected {
            return Err(AirError::config(format!(
                "Forest model feature order {:?} does not match {:?}",
                file.features, expected
            )));
        }
        if file.trees.is_empty() {
            return Err(AirError::config("Forest model contains no trees"));
        }
        for (i, tree) in file.trees.iter().enumerate() {
            tree.validate(i)?;
        }

        debug!("Loaded forest with {} trees", file.trees.len());
        Ok(Self { trees: file.trees })
    }

    /// Load a forest from a JSON file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let forest = Self::from_json(&json)?;
        info!(
            "Loaded AQI forest model from {} ({} trees)",
            path.display(),
            forest.trees.len()
        );
        Ok(forest)
    }

    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl AqiEstimator for ForestEstimator {
    fn estimate(&self, features: &FeatureVector) -> Result<AqiCategory> {
        check_features(features)?;

        let mut votes = [0usize; 5];
        for tree in &self.trees {
            votes[usize::from(tree.predict(features).value()) - 1] += 1;
        }

        // ties go to the cleaner category, like an argmax over ordered classes
        let (best, _) = votes
            .iter()
            .enumerate()
            .fold((0, 0), |(best, max), (i, &count)| {
                if count > max { (i, count) } else { (best, max) }
            });
        Ok(AqiCategory::ALL[best])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEATURES: &str = r#"["co","no","no2","o3","so2","pm2_5","pm10","nh3","hour"]"#;

    fn forest(trees: &str) -> Result<ForestEstimator> {
        ForestEstimator::from_json(&format!(r#"{{"features": {FEATURES}, "trees": {trees}}}"#))
    }

    fn vector(pm2_5: f64, hour: f64) -> FeatureVector {
        [200.0, 1.0, 5.0, 10.0, 2.0, pm2_5, 30.0, 3.0, hour]
    }

    #[test]
    fn test_single_tree_split() {
        let estimator = forest(
            r#"[{"nodes": [
                {"feature": 5, "threshold": 12.5, "left": 1, "right": 2},
                {"class": 1},
                {"class": 3}
            ]}]"#,
        )
        .unwrap();

        assert_eq!(estimator.estimate(&vector(10.0, 8.0)).unwrap(), AqiCategory::Good);
        assert_eq!(estimator.estimate(&vector(12.5, 8.0)).unwrap(), AqiCategory::Good);
        assert_eq!(estimator.estimate(&vector(20.0, 8.0)).unwrap(), AqiCategory::Moderate);
    }

    #[test]
    fn test_majority_vote_uses_hour() {
        let estimator = forest(
            r#"[
                {"nodes": [{"feature": 8, "threshold": 17.0, "left": 1, "right": 2},
                           {"class": 2}, {"class": 4}]},
                {"nodes": [{"feature": 8, "threshold": 17.0, "left": 1, "right": 2},
                           {"class": 2}, {"class": 4}]},
                {"nodes": [{"class": 2}]}
            ]"#,
        )
        .unwrap();
        assert_eq!(estimator.tree_count(), 3);
        assert_eq!(estimator.estimate(&vector(15.0, 9.0)).unwrap(), AqiCategory::Fair);
        assert_eq!(estimator.estimate(&vector(15.0, 19.0)).unwrap(), AqiCategory::Poor);
    }

    #[test]
    fn test_tie_prefers_cleaner_category() {
        let estimator =
            forest(r#"[{"nodes": [{"class": 4}]}, {"nodes": [{"class": 2}]}]"#).unwrap();
        assert_eq!(estimator.estimate(&vector(15.0, 9.0)).unwrap(), AqiCategory::Fair);
    }

    #[test]
    fn test_rejects_wrong_feature_order() {
        let json = r#"{"features": ["no","co","no2","o3","so2","pm2_5","pm10","nh3","hour"],
                       "trees": [{"nodes": [{"class": 1}]}]}"#;
        assert!(matches!(
            ForestEstimator::from_json(json),
            Err(AirError::Config { .. })
        ));
    }

    #[test]
    fn test_rejects_backward_or_dangling_children() {
        let backward = r#"[{"nodes": [
            {"feature": 0, "threshold": 1.0, "left": 0, "right": 1}, {"class": 1}
        ]}]"#;
        let dangling = r#"[{"nodes": [
            {"feature": 0, "threshold": 1.0, "left": 1, "right": 7}, {"class": 1}
        ]}]"#;
        let unknown_feature = r#"[{"nodes": [
            {"feature": 12, "threshold": 1.0, "left": 1, "right": 2}, {"class": 1}, {"class": 2}
        ]}]"#;
        assert!(forest(backward).is_err());
        assert!(forest(dangling).is_err());
        assert!(forest(unknown_feature).is_err());
        assert!(forest("[]").is_err());
    }

    #[test]
    fn test_invalid_class_is_rejected_on_load() {
        assert!(forest(r#"[{"nodes": [{"class": 9}]}]"#).is_err());
    }

    #[test]
    fn test_malformed_vector_fails() {
        let estimator = forest(r#"[{"nodes": [{"class": 1}]}]"#).unwrap();
        assert!(matches!(
            estimator.estimate(&vector(-3.0, 9.0)),
            Err(AirError::EstimationFailure { .. })
        ));
    }
}
