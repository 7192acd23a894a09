//! Block Profit - profit prediction for mining block models
//!
//! A preprocessing + gradient boosted tree pipeline is trained once on a
//! labeled block model and bundled into a single artifact; the server loads
//! that artifact and scores one block at a time from a web form.
//!
//! # Modules
//!
//! ## Core
//! - [`schema`] - Column names, block records, form field bounds
//! - [`dataset`] - CSV loading and synthetic block models
//! - [`preprocessing`] - Standard scaling and one-hot encoding
//! - [`training`] - Boosted trees, holdout split, metrics
//! - [`artifact`] - Pipeline artifact persistence
//! - [`inference`] - Single-block prediction and verdicts
//!
//! ## Services
//! - [`server`] - HTTP form UI and JSON API
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod schema;
pub mod dataset;
pub mod preprocessing;
pub mod training;
pub mod artifact;
pub mod inference;

// Services
pub mod server;
pub mod cli;

pub use error::{BlockProfitError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{BlockProfitError, Result};

    // Schema
    pub use crate::schema::{BlockRecord, FeatureSchema, RockType};

    // Preprocessing
    pub use crate::preprocessing::{ColumnPreprocessor, OneHotEncoder, StandardScaler};

    // Training
    pub use crate::training::{train, train_and_save, ModelMetrics, TrainEngine, TrainingConfig, XGBoostConfig, XGBoostRegressor};

    // Persistence
    pub use crate::artifact::PipelineArtifact;

    // Inference
    pub use crate::inference::{format_usd, Predictor, ProfitEstimate, Verdict};
}
