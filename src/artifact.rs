//! Pipeline artifact persistence
//!
//! One JSON file bundles the fitted preprocessor, the fitted booster and the
//! column lists they were fit on. Training writes it, serving reads it.

use crate::error::{BlockProfitError, Result};
use crate::preprocessing::ColumnPreprocessor;
use crate::schema::FeatureSchema;
use crate::training::{ModelMetrics, XGBoostRegressor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default artifact location, relative to the working directory
pub const DEFAULT_ARTIFACT_PATH: &str = "xgboost_pipeline.json";

/// Format tag written into every artifact
pub const ARTIFACT_FORMAT: &str = "block-profit/xgboost-pipeline";

/// Descriptive training facts; never consulted by inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub target: String,
    pub created_at: String,
    pub n_train: usize,
    pub n_holdout: usize,
    /// Holdout scores, absent when the holdout set was empty
    pub holdout_metrics: Option<ModelMetrics>,
}

/// Fitted preprocessor + model + the schema both were fit on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub format: String,
    pub preprocessor: ColumnPreprocessor,
    pub model: XGBoostRegressor,
    pub num_cols: Vec<String>,
    pub cat_cols: Vec<String>,
    pub metadata: ArtifactMetadata,
}

impl PipelineArtifact {
    pub fn new(preprocessor: ColumnPreprocessor, model: XGBoostRegressor, metadata: ArtifactMetadata) -> Self {
        let schema = preprocessor.schema().clone();
        Self {
            format: ARTIFACT_FORMAT.to_string(),
            preprocessor,
            model,
            num_cols: schema.numeric,
            cat_cols: schema.categorical,
            metadata,
        }
    }

    /// Column lists the pipeline expects, numeric first
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema {
            numeric: self.num_cols.clone(),
            categorical: self.cat_cols.clone(),
        }
    }

    /// Write the artifact, replacing any previous one.
    ///
    /// Goes through a sibling temp file and a rename so readers never see a
    /// half-written artifact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        let tmp = temp_path(path);
        if let Err(e) = std::fs::write(&tmp, json).and_then(|_| std::fs::rename(&tmp, path)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        info!(path = %path.display(), trees = self.model.n_trees(), "Saved pipeline artifact");
        Ok(())
    }

    /// Read and check an artifact
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BlockProfitError::ArtifactMissing(path.to_path_buf()));
        }

        let unreadable = |reason: String| BlockProfitError::ArtifactUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        let json = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        let artifact: Self = serde_json::from_str(&json).map_err(|e| unreadable(e.to_string()))?;
        artifact.check().map_err(unreadable)?;

        info!(path = %path.display(), trees = artifact.model.n_trees(), "Loaded pipeline artifact");
        Ok(artifact)
    }

    /// Internal consistency of a deserialized bundle
    fn check(&self) -> std::result::Result<(), String> {
        if self.format != ARTIFACT_FORMAT {
            return Err(format!("unsupported artifact format '{}'", self.format));
        }
        if !self.preprocessor.is_fitted() || !self.model.is_fitted() {
            return Err("artifact holds an unfitted pipeline".to_string());
        }
        if *self.preprocessor.schema() != self.schema() {
            return Err("column lists disagree with the preprocessor".to_string());
        }
        if self.preprocessor.n_output_features() != self.model.n_features() {
            return Err(format!(
                "preprocessor emits {} features but the model expects {}",
                self.preprocessor.n_output_features(),
                self.model.n_features()
            ));
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
