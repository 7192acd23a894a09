//! Training engine: dataset → fitted pipeline artifact

use crate::artifact::{ArtifactMetadata, PipelineArtifact};
use crate::dataset::{load_dataset, target_vector, validate_training_frame};
use crate::error::Result;
use crate::preprocessing::ColumnPreprocessor;
use crate::schema::{FeatureSchema, TARGET_COLUMN};
use super::{ModelMetrics, XGBoostConfig, XGBoostRegressor};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Training run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub schema: FeatureSchema,
    pub model: XGBoostConfig,
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    /// Seed of the holdout shuffle
    pub split_seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            schema: FeatureSchema::default(),
            model: XGBoostConfig::default(),
            test_size: 0.2,
            split_seed: 42,
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to replace booster hyperparameters
    pub fn with_model(mut self, model: XGBoostConfig) -> Self {
        self.model = model;
        self
    }
}

/// Shuffled train/holdout row indices.
///
/// Holdout size is `ceil(n * test_size)`, so any positive fraction of a
/// non-trivial dataset holds out at least one row.
pub fn train_test_indices(n: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_size.clamp(0.0, 1.0)).ceil() as usize;
    let n_test = n_test.min(n.saturating_sub(1));
    let test = indices.split_off(n - n_test);
    (indices, test)
}

/// Fits the preprocessor and booster and bundles them
#[derive(Debug, Clone)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Load the CSV at `path` and fit on it
    pub fn fit_path(&self, path: &Path) -> Result<PipelineArtifact> {
        let df = load_dataset(path, &self.config.schema)?;
        self.fit(&df)
    }

    /// Fit on an in-memory block model frame
    pub fn fit(&self, df: &DataFrame) -> Result<PipelineArtifact> {
        let start = Instant::now();
        validate_training_frame(df, &self.config.schema)?;

        // Preprocessor is fit on every row, then the matrix is split
        let mut preprocessor = ColumnPreprocessor::new(self.config.schema.clone());
        let x = preprocessor.fit_transform(df)?;
        let y = target_vector(df)?;

        let (train_idx, test_idx) = train_test_indices(x.nrows(), self.config.test_size, self.config.split_seed);
        let (x_train, y_train) = take_rows(&x, &y, &train_idx);
        let (x_test, y_test) = take_rows(&x, &y, &test_idx);

        info!(
            rows = x.nrows(),
            n_train = train_idx.len(),
            n_holdout = test_idx.len(),
            n_features = x.ncols(),
            n_estimators = self.config.model.n_estimators,
            "Training booster"
        );

        let mut model = XGBoostRegressor::new(self.config.model.clone());
        model.fit(&x_train, &y_train)?;

        let holdout_metrics = if test_idx.is_empty() {
            warn!("Holdout set is empty, skipping evaluation");
            None
        } else {
            let y_pred = model.predict(&x_test)?;
            ModelMetrics::compute_regression(&y_test, &y_pred)
        };
        if let Some(m) = &holdout_metrics {
            info!(r2 = m.r2, mae = m.mae, rmse = m.rmse, n = m.n_samples, "Holdout evaluation");
        }

        let metadata = ArtifactMetadata {
            target: TARGET_COLUMN.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            n_train: train_idx.len(),
            n_holdout: test_idx.len(),
            holdout_metrics,
        };

        info!(elapsed_secs = start.elapsed().as_secs_f64(), "Training finished");
        Ok(PipelineArtifact::new(preprocessor, model, metadata))
    }
}

/// Train with the fixed default configuration
pub fn train(dataset_path: &Path) -> Result<PipelineArtifact> {
    TrainEngine::new(TrainingConfig::default()).fit_path(dataset_path)
}

/// Train and write the artifact. Nothing is written if training fails.
pub fn train_and_save(dataset_path: &Path, artifact_path: &Path, config: TrainingConfig) -> Result<PipelineArtifact> {
    let artifact = TrainEngine::new(config).fit_path(dataset_path)?;
    artifact.save(artifact_path)?;
    Ok(artifact)
}

fn take_rows(x: &Array2<f64>, y: &Array1<f64>, rows: &[usize]) -> (Array2<f64>, Array1<f64>) {
    (x.select(Axis(0), rows), y.select(Axis(0), rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic_block_model;
    use crate::error::BlockProfitError;

    fn quick_config() -> TrainingConfig {
        TrainingConfig::new().with_model(XGBoostConfig {
            n_estimators: 40,
            learning_rate: 0.2,
            ..Default::default()
        })
    }

    #[test]
    fn test_split_sizes() {
        let (train, test) = train_test_indices(100, 0.2, 42);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);

        let (train, test) = train_test_indices(101, 0.2, 42);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 21);
    }

    #[test]
    fn test_split_is_a_seeded_partition() {
        let (train, test) = train_test_indices(50, 0.2, 7);
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
        assert_eq!(train_test_indices(50, 0.2, 7), (train, test));
    }

    #[test]
    fn test_split_keeps_a_training_row() {
        let (train, test) = train_test_indices(1, 0.2, 42);
        assert_eq!(train, vec![0]);
        assert!(test.is_empty());
    }

    #[test]
    fn test_fit_produces_consistent_artifact() {
        let df = synthetic_block_model(80, 9).unwrap();
        let artifact = TrainEngine::new(quick_config()).fit(&df).unwrap();

        assert_eq!(artifact.schema(), FeatureSchema::default());
        assert_eq!(artifact.model.n_trees(), 40);
        assert_eq!(artifact.model.n_features(), 11);
        assert_eq!(artifact.metadata.n_train, 64);
        assert_eq!(artifact.metadata.n_holdout, 16);
        assert!(artifact.metadata.holdout_metrics.is_some());
    }

    #[test]
    fn test_fit_rejects_missing_columns() {
        let df = synthetic_block_model(20, 1).unwrap().drop(TARGET_COLUMN).unwrap();
        assert!(matches!(
            TrainEngine::new(quick_config()).fit(&df),
            Err(BlockProfitError::MissingColumns(_))
        ));
    }

    #[test]
    fn test_missing_dataset_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let artifact_path = dir.path().join("pipeline.json");
        let err = train_and_save(&dir.path().join("absent.csv"), &artifact_path, quick_config()).unwrap_err();
        assert!(matches!(err, BlockProfitError::DatasetMissing(_)));
        assert!(!artifact_path.exists());
    }
}
