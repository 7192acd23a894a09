//! One-hot encoding of categorical columns

use crate::error::{BlockProfitError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Categories learned for one column, sorted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ColumnCategories {
    column: String,
    categories: Vec<String>,
}

impl ColumnCategories {
    /// Categories that get an indicator column
    fn encoded(&self, drop_first: bool) -> &[String] {
        if drop_first && !self.categories.is_empty() {
            &self.categories[1..]
        } else {
            &self.categories
        }
    }
}

/// One-hot encoder over one or more string columns.
///
/// With `drop_first` the first category of each column (in sorted order)
/// gets no indicator, leaving k-1 columns. A category not seen during fit
/// is an error at transform time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    drop_first: bool,
    columns: Vec<ColumnCategories>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new(drop_first: bool) -> Self {
        Self {
            drop_first,
            columns: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learn sorted categories for each `(column name, values)` pair
    pub fn fit(&mut self, columns: &[(String, Vec<String>)]) -> Result<&mut Self> {
        self.columns = columns
            .iter()
            .map(|(name, values)| {
                let mut categories: Vec<String> = values.clone();
                categories.sort();
                categories.dedup();
                ColumnCategories {
                    column: name.clone(),
                    categories,
                }
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Indicator matrix, columns grouped per source column in fit order
    pub fn transform(&self, columns: &[(String, Vec<String>)]) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(BlockProfitError::ModelNotFitted);
        }
        if columns.len() != self.columns.len() {
            return Err(BlockProfitError::ShapeError {
                expected: format!("{} categorical columns", self.columns.len()),
                actual: format!("{} categorical columns", columns.len()),
            });
        }

        let n_rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut out = Array2::zeros((n_rows, self.n_output_features()));

        let mut offset = 0;
        for (fitted, (name, values)) in self.columns.iter().zip(columns.iter()) {
            if fitted.column != *name {
                return Err(BlockProfitError::MissingColumns(vec![fitted.column.clone()]));
            }
            if values.len() != n_rows {
                return Err(BlockProfitError::ShapeError {
                    expected: format!("{} rows", n_rows),
                    actual: format!("{} rows in '{}'", values.len(), name),
                });
            }

            let encoded = fitted.encoded(self.drop_first);
            for (row, value) in values.iter().enumerate() {
                let idx = fitted
                    .categories
                    .binary_search(value)
                    .map_err(|_| BlockProfitError::UnknownCategory {
                        column: name.clone(),
                        value: value.clone(),
                    })?;
                let dropped = fitted.categories.len() - encoded.len();
                if idx >= dropped {
                    out[[row, offset + idx - dropped]] = 1.0;
                }
            }
            offset += encoded.len();
        }

        Ok(out)
    }

    /// Number of indicator columns produced
    pub fn n_output_features(&self) -> usize {
        self.columns.iter().map(|c| c.encoded(self.drop_first).len()).sum()
    }

    /// `<column>_<category>` for each indicator column
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|c| {
                c.encoded(self.drop_first)
                    .iter()
                    .map(move |cat| format!("{}_{}", c.column, cat))
            })
            .collect()
    }

    /// Sorted categories learned for a column
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.categories.as_slice())
    }
}
