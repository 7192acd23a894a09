//! Model training
//!
//! - [`XGBoostRegressor`]: second-order gradient boosted regression trees
//! - [`TrainEngine`]: fits preprocessor + booster on a block model and
//!   evaluates the seeded holdout split
//! - [`ModelMetrics`]: holdout R², MAE, RMSE

mod engine;
mod metrics;
pub mod xgboost;

pub use engine::{train, train_and_save, train_test_indices, TrainEngine, TrainingConfig};
pub use metrics::ModelMetrics;
pub use xgboost::{XGBoostConfig, XGBoostRegressor};
