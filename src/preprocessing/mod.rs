//! Feature preprocessing
//!
//! Column-wise transform fit once on training data and applied unchanged at
//! inference:
//! - numeric columns: missing values imputed with 0, then standardized
//! - categorical columns: one-hot encoded with the first category dropped

mod encoder;
mod pipeline;
mod scaler;

pub use encoder::OneHotEncoder;
pub use pipeline::ColumnPreprocessor;
pub use scaler::StandardScaler;
