//! Block model column schema
//!
//! Column names match the block model CSV exactly. The numeric columns are
//! always laid out before the categorical ones when a frame is fed to the
//! preprocessor.

use crate::error::{BlockProfitError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const COL_X: &str = "X";
pub const COL_Y: &str = "Y";
pub const COL_Z: &str = "Z";
pub const COL_ORE_GRADE: &str = "Ore_Grade (%)";
pub const COL_TONNAGE: &str = "Tonnage";
pub const COL_ORE_VALUE: &str = "Ore_Value (USD/tonne)";
pub const COL_MINING_COST: &str = "Mining_Cost (USD)";
pub const COL_PROCESSING_COST: &str = "Processing_Cost (USD)";
pub const COL_WASTE_FLAG: &str = "Waste_Flag";
pub const COL_ROCK_TYPE: &str = "Rock_Type";
pub const COL_PROFIT: &str = "Profit (USD)";

/// Numeric feature columns in training order
pub const NUMERIC_COLUMNS: [&str; 9] = [
    COL_X,
    COL_Y,
    COL_Z,
    COL_ORE_GRADE,
    COL_TONNAGE,
    COL_ORE_VALUE,
    COL_MINING_COST,
    COL_PROCESSING_COST,
    COL_WASTE_FLAG,
];

/// Categorical feature columns in training order
pub const CATEGORICAL_COLUMNS: [&str; 1] = [COL_ROCK_TYPE];

/// Regression target
pub const TARGET_COLUMN: &str = COL_PROFIT;

/// Lithology of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RockType {
    Magnetite,
    Hematite,
    Waste,
}

impl RockType {
    /// Selection order used by the form
    pub const ALL: [RockType; 3] = [RockType::Magnetite, RockType::Hematite, RockType::Waste];

    pub fn as_str(&self) -> &'static str {
        match self {
            RockType::Magnetite => "Magnetite",
            RockType::Hematite => "Hematite",
            RockType::Waste => "Waste",
        }
    }
}

impl fmt::Display for RockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RockType {
    type Err = BlockProfitError;

    fn from_str(s: &str) -> Result<Self> {
        RockType::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| BlockProfitError::UnknownCategory {
                column: COL_ROCK_TYPE.to_string(),
                value: s.to_string(),
            })
    }
}

/// Ordered column lists a fitted pipeline expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            numeric: NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
            categorical: CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl FeatureSchema {
    /// `[numeric..., categorical...]`
    pub fn ordered_columns(&self) -> Vec<&str> {
        self.numeric
            .iter()
            .chain(self.categorical.iter())
            .map(String::as_str)
            .collect()
    }

    /// Names from `required` that the frame lacks
    pub fn missing_in(df: &DataFrame, required: &[&str]) -> Vec<String> {
        let present: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        required
            .iter()
            .filter(|name| !present.iter().any(|p| p == *name))
            .map(|name| name.to_string())
            .collect()
    }

    /// Select the feature columns in canonical order, whatever order the
    /// frame carries them in.
    pub fn reorder(&self, df: &DataFrame) -> Result<DataFrame> {
        let ordered = self.ordered_columns();
        let missing = Self::missing_in(df, &ordered);
        if !missing.is_empty() {
            return Err(BlockProfitError::MissingColumns(missing));
        }
        Ok(df.select(ordered)?)
    }
}

/// One block's input features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub ore_grade: f64,
    pub tonnage: f64,
    pub ore_value: f64,
    pub mining_cost: f64,
    pub processing_cost: f64,
    pub waste_flag: u8,
    pub rock_type: RockType,
}

impl Default for BlockRecord {
    fn default() -> Self {
        Self {
            x: 100.0,
            y: 200.0,
            z: 50.0,
            ore_grade: 55.0,
            tonnage: 2000.0,
            ore_value: 1.9,
            mining_cost: 0.35,
            processing_cost: 0.22,
            waste_flag: 0,
            rock_type: RockType::Magnetite,
        }
    }
}

impl BlockRecord {
    /// Numeric value for a CSV column name
    pub fn numeric_value(&self, column: &str) -> Option<f64> {
        let v = match column {
            COL_X => self.x,
            COL_Y => self.y,
            COL_Z => self.z,
            COL_ORE_GRADE => self.ore_grade,
            COL_TONNAGE => self.tonnage,
            COL_ORE_VALUE => self.ore_value,
            COL_MINING_COST => self.mining_cost,
            COL_PROCESSING_COST => self.processing_cost,
            COL_WASTE_FLAG => f64::from(self.waste_flag),
            _ => return None,
        };
        Some(v)
    }

    /// Categorical value for a CSV column name
    pub fn categorical_value(&self, column: &str) -> Option<&'static str> {
        match column {
            COL_ROCK_TYPE => Some(self.rock_type.as_str()),
            _ => None,
        }
    }

    /// Single-row frame laid out as `[numeric..., categorical...]` of `schema`
    pub fn to_frame(&self, schema: &FeatureSchema) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(schema.numeric.len() + schema.categorical.len());
        for name in &schema.numeric {
            let v = self
                .numeric_value(name)
                .ok_or_else(|| BlockProfitError::MissingColumns(vec![name.clone()]))?;
            columns.push(Column::new(name.as_str().into(), [v]));
        }
        for name in &schema.categorical {
            let v = self
                .categorical_value(name)
                .ok_or_else(|| BlockProfitError::MissingColumns(vec![name.clone()]))?;
            columns.push(Column::new(name.as_str().into(), [v]));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Check every numeric field against the form bounds
    pub fn validate(&self) -> Result<()> {
        for field in FIELD_SPECS.iter() {
            let value = self.numeric_value(field.column).unwrap_or(f64::NAN);
            if !field.contains(value) {
                return Err(BlockProfitError::InvalidInput(format!(
                    "{} must be between {} and {}, got {}",
                    field.label, field.min, field.max, value
                )));
            }
        }
        if self.waste_flag > 1 {
            return Err(BlockProfitError::InvalidInput(format!(
                "{} must be 0 or 1, got {}",
                COL_WASTE_FLAG, self.waste_flag
            )));
        }
        Ok(())
    }
}

/// Input bounds of one numeric form field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Form / JSON key
    pub key: &'static str,
    pub column: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

impl FieldSpec {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Form guardrails, keeping inputs inside the block model's plausible domain.
/// Waste_Flag is a 0/1 selection and is checked separately.
pub const FIELD_SPECS: [FieldSpec; 8] = [
    FieldSpec { key: "x", column: COL_X, label: "X", min: 0.0, max: 500.0, step: 1.0, default: 100.0 },
    FieldSpec { key: "y", column: COL_Y, label: "Y", min: 0.0, max: 500.0, step: 1.0, default: 200.0 },
    FieldSpec { key: "z", column: COL_Z, label: "Z", min: 0.0, max: 100.0, step: 1.0, default: 50.0 },
    FieldSpec { key: "ore_grade", column: COL_ORE_GRADE, label: "Ore_Grade (%)", min: 0.0, max: 100.0, step: 1.0, default: 55.0 },
    FieldSpec { key: "tonnage", column: COL_TONNAGE, label: "Tonnage", min: 500.0, max: 5000.0, step: 100.0, default: 2000.0 },
    FieldSpec { key: "ore_value", column: COL_ORE_VALUE, label: "Ore_Value (USD/tonne)", min: 0.0, max: 5.0, step: 0.1, default: 1.9 },
    FieldSpec { key: "mining_cost", column: COL_MINING_COST, label: "Mining_Cost (USD)", min: 0.1, max: 1.0, step: 0.01, default: 0.35 },
    FieldSpec { key: "processing_cost", column: COL_PROCESSING_COST, label: "Processing_Cost (USD)", min: 0.1, max: 0.5, step: 0.01, default: 0.22 },
];
