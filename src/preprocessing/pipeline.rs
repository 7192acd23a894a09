//! Column-wise preprocessor: numeric scaling + categorical one-hot encoding

use crate::dataset::{categorical_column, numeric_matrix};
use crate::error::{BlockProfitError, Result};
use crate::schema::FeatureSchema;
use super::{OneHotEncoder, StandardScaler};
use ndarray::{concatenate, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Fitted transform from a block frame to the model's feature matrix.
///
/// Output layout is `[scaled numeric..., indicators...]`. Columns are looked
/// up by name, so the frame may carry them in any order and may carry extra
/// columns (the target, for instance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPreprocessor {
    schema: FeatureSchema,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    is_fitted: bool,
}

impl ColumnPreprocessor {
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            scaler: StandardScaler::new(),
            encoder: OneHotEncoder::new(true),
            is_fitted: false,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fit scaler statistics and encoder categories
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let start = Instant::now();
        self.check_columns(df)?;

        let numeric = numeric_matrix(df, &self.schema.numeric)?;
        self.scaler.fit(&numeric)?;

        let categorical = self.categorical_values(df)?;
        self.encoder.fit(&categorical)?;

        self.is_fitted = true;
        debug!(
            rows = df.height(),
            n_features = self.n_output_features(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted preprocessor"
        );
        Ok(self)
    }

    /// Apply the fitted transform, never refitting
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(BlockProfitError::ModelNotFitted);
        }
        self.check_columns(df)?;

        let numeric = numeric_matrix(df, &self.schema.numeric)?;
        let scaled = self.scaler.transform(&numeric)?;
        if self.schema.categorical.is_empty() {
            return Ok(scaled);
        }

        let categorical = self.categorical_values(df)?;
        let encoded = self.encoder.transform(&categorical)?;

        Ok(concatenate(Axis(1), &[scaled.view(), encoded.view()])?)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Width of the transformed matrix
    pub fn n_output_features(&self) -> usize {
        self.schema.numeric.len() + self.encoder.n_output_features()
    }

    /// Names of the transformed columns
    pub fn feature_names(&self) -> Vec<String> {
        self.schema
            .numeric
            .iter()
            .cloned()
            .chain(self.encoder.feature_names())
            .collect()
    }

    /// Sorted categories learned for a categorical column
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.encoder.categories(column)
    }

    fn check_columns(&self, df: &DataFrame) -> Result<()> {
        let missing = FeatureSchema::missing_in(df, &self.schema.ordered_columns());
        if missing.is_empty() {
            Ok(())
        } else {
            Err(BlockProfitError::MissingColumns(missing))
        }
    }

    fn categorical_values(&self, df: &DataFrame) -> Result<Vec<(String, Vec<String>)>> {
        self.schema
            .categorical
            .iter()
            .map(|name| Ok((name.clone(), categorical_column(df, name)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic_block_model;
    use crate::schema::{BlockRecord, RockType, COL_ROCK_TYPE, COL_TONNAGE};

    fn fitted() -> (ColumnPreprocessor, DataFrame) {
        let df = synthetic_block_model(60, 5).unwrap();
        let mut pre = ColumnPreprocessor::new(FeatureSchema::default());
        pre.fit(&df).unwrap();
        (pre, df)
    }

    #[test]
    fn test_output_layout() {
        let (pre, df) = fitted();
        let x = pre.transform(&df).unwrap();
        assert_eq!(x.shape(), &[60, 11]);

        let names = pre.feature_names();
        assert_eq!(names.len(), 11);
        assert_eq!(names[4], COL_TONNAGE);
        assert_eq!(&names[9..], &["Rock_Type_Magnetite".to_string(), "Rock_Type_Waste".to_string()]);
    }

    #[test]
    fn test_numeric_columns_standardized_on_fit_data() {
        let (pre, df) = fitted();
        let x = pre.transform(&df).unwrap();
        for col in x.slice(ndarray::s![.., 0..9]).axis_iter(Axis(1)) {
            let mean = col.sum() / col.len() as f64;
            assert!(mean.abs() < 1e-9);
        }
    }

    #[test]
    fn test_transform_ignores_column_order() {
        let (pre, df) = fitted();
        let mut reversed: Vec<String> = df.get_column_names().into_iter().map(|s| s.to_string()).collect();
        reversed.reverse();
        let permuted = df.select(reversed).unwrap();

        assert_eq!(pre.transform(&df).unwrap(), pre.transform(&permuted).unwrap());
    }

    #[test]
    fn test_single_record_transform_is_deterministic() {
        let (pre, _) = fitted();
        let record = BlockRecord { rock_type: RockType::Waste, waste_flag: 1, ..Default::default() };
        let frame = record.to_frame(pre.schema()).unwrap();
        let a = pre.transform(&frame).unwrap();
        let b = pre.transform(&frame).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[[0, 10]], 1.0);
        assert_eq!(a[[0, 9]], 0.0);
    }

    #[test]
    fn test_transform_reports_missing_column() {
        let (pre, df) = fitted();
        let trimmed = df.drop(COL_ROCK_TYPE).unwrap();
        assert!(matches!(
            pre.transform(&trimmed),
            Err(BlockProfitError::MissingColumns(_))
        ));
    }

    #[test]
    fn test_unfitted_transform_fails() {
        let pre = ColumnPreprocessor::new(FeatureSchema::default());
        let df = synthetic_block_model(3, 1).unwrap();
        assert!(matches!(pre.transform(&df), Err(BlockProfitError::ModelNotFitted)));
    }
}
