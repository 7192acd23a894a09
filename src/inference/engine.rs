//! Predictor implementation

use crate::artifact::PipelineArtifact;
use crate::error::{BlockProfitError, Result};
use crate::schema::{BlockRecord, FeatureSchema, RockType, COL_ROCK_TYPE};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Profitability reading of a predicted value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Viable,
    NotRecommended,
}

impl Verdict {
    /// Strictly positive profit is viable; zero is not.
    pub fn from_profit(profit_usd: f64) -> Self {
        if profit_usd > 0.0 {
            Verdict::Viable
        } else {
            Verdict::NotRecommended
        }
    }

    pub fn is_viable(&self) -> bool {
        matches!(self, Verdict::Viable)
    }

    pub fn message(&self) -> &'static str {
        match self {
            Verdict::Viable => "This block is viable to mine.",
            Verdict::NotRecommended => "This block is not recommended for mining.",
        }
    }
}

/// One prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitEstimate {
    pub profit_usd: f64,
    pub verdict: Verdict,
}

impl ProfitEstimate {
    pub fn new(profit_usd: f64) -> Self {
        Self {
            profit_usd,
            verdict: Verdict::from_profit(profit_usd),
        }
    }

    /// `12,345.67 USD`
    pub fn formatted(&self) -> String {
        format_usd(self.profit_usd)
    }
}

/// Render a dollar amount as `-1,234.50 USD`
pub fn format_usd(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // Values that round to zero print without a sign
    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{cents} USD")
}

/// Fitted pipeline ready to score blocks.
///
/// Holds the artifact read-only; the preprocessor is only ever applied,
/// never refit.
#[derive(Debug, Clone)]
pub struct Predictor {
    artifact: PipelineArtifact,
}

impl Predictor {
    pub fn from_artifact(artifact: PipelineArtifact) -> Self {
        Self { artifact }
    }

    /// Load the artifact at `path`
    pub fn load(path: &Path) -> Result<Self> {
        PipelineArtifact::load(path).map(Self::from_artifact)
    }

    pub fn artifact(&self) -> &PipelineArtifact {
        &self.artifact
    }

    pub fn schema(&self) -> FeatureSchema {
        self.artifact.schema()
    }

    /// Rock types the fitted encoder knows, in sorted order
    pub fn rock_types(&self) -> Vec<RockType> {
        match self.artifact.preprocessor.categories(COL_ROCK_TYPE) {
            Some(categories) => categories.iter().filter_map(|c| c.parse().ok()).collect(),
            None => RockType::ALL.to_vec(),
        }
    }

    /// `(feature name, split share)` pairs, most used first
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let Some(shares) = self.artifact.model.feature_importances() else {
            return Vec::new();
        };
        let mut ranked: Vec<(String, f64)> = self
            .artifact
            .preprocessor
            .feature_names()
            .into_iter()
            .zip(shares.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Check the record against the form bounds, then score it
    pub fn predict(&self, record: &BlockRecord) -> Result<ProfitEstimate> {
        record.validate()?;
        let frame = record.to_frame(&self.schema())?;
        self.predict_frame(&frame).map(ProfitEstimate::new)
    }

    /// Score a one-row frame carrying the feature columns in any order
    pub fn predict_frame(&self, df: &DataFrame) -> Result<f64> {
        if df.height() != 1 {
            return Err(BlockProfitError::InvalidInput(format!(
                "expected exactly one row, got {}",
                df.height()
            )));
        }

        let ordered = self.schema().reorder(df)?;
        let features = self.artifact.preprocessor.transform(&ordered)?;
        let prediction = self.artifact.model.predict(&features)?;

        prediction
            .first()
            .copied()
            .ok_or_else(|| BlockProfitError::TrainingError("model returned no prediction".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic_block_model;
    use crate::schema::COL_TONNAGE;
    use crate::training::{TrainEngine, TrainingConfig, XGBoostConfig};

    fn predictor() -> Predictor {
        let df = synthetic_block_model(60, 3).unwrap();
        let config = TrainingConfig::new().with_model(XGBoostConfig {
            n_estimators: 30,
            learning_rate: 0.3,
            ..Default::default()
        });
        Predictor::from_artifact(TrainEngine::new(config).fit(&df).unwrap())
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(12345.67), "12,345.67 USD");
        assert_eq!(format_usd(-1234.5), "-1,234.50 USD");
        assert_eq!(format_usd(999.999), "1,000.00 USD");
        assert_eq!(format_usd(0.0), "0.00 USD");
        assert_eq!(format_usd(-0.001), "0.00 USD");
        assert_eq!(format_usd(1234567.0), "1,234,567.00 USD");
        assert_eq!(format_usd(12.0), "12.00 USD");
    }

    #[test]
    fn test_verdict_threshold_is_exclusive() {
        assert_eq!(Verdict::from_profit(0.0), Verdict::NotRecommended);
        assert_eq!(Verdict::from_profit(-0.01), Verdict::NotRecommended);
        assert_eq!(Verdict::from_profit(0.01), Verdict::Viable);
        assert!(ProfitEstimate::new(1.0).verdict.is_viable());
    }

    #[test]
    fn test_predict_is_deterministic() {
        let predictor = predictor();
        let record = BlockRecord { rock_type: RockType::Hematite, ..Default::default() };
        let a = predictor.predict(&record).unwrap();
        let b = predictor.predict(&record).unwrap();
        assert_eq!(a.profit_usd.to_bits(), b.profit_usd.to_bits());
    }

    #[test]
    fn test_predict_frame_ignores_column_order() {
        let predictor = predictor();
        let frame = BlockRecord::default().to_frame(&predictor.schema()).unwrap();
        let mut names: Vec<String> = frame.get_column_names().into_iter().map(|s| s.to_string()).collect();
        names.rotate_left(4);
        let shuffled = frame.select(names).unwrap();

        assert_eq!(
            predictor.predict_frame(&frame).unwrap(),
            predictor.predict_frame(&shuffled).unwrap()
        );
    }

    #[test]
    fn test_predict_frame_requires_one_row() {
        let predictor = predictor();
        let df = synthetic_block_model(2, 1).unwrap();
        assert!(matches!(predictor.predict_frame(&df), Err(BlockProfitError::InvalidInput(_))));

        let missing = BlockRecord::default()
            .to_frame(&predictor.schema())
            .unwrap()
            .drop(COL_TONNAGE)
            .unwrap();
        assert!(matches!(predictor.predict_frame(&missing), Err(BlockProfitError::MissingColumns(_))));
    }

    #[test]
    fn test_rock_types_come_from_the_fitted_encoder() {
        assert_eq!(predictor().rock_types(), vec![RockType::Hematite, RockType::Magnetite, RockType::Waste]);
    }

    #[test]
    fn test_feature_importances_are_ranked() {
        let ranked = predictor().feature_importances();
        assert_eq!(ranked.len(), 11);
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
        assert!((ranked.iter().map(|(_, v)| v).sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(ranked.iter().any(|(name, _)| name == "Rock_Type_Waste"));
    }

    #[test]
    fn test_predict_rejects_out_of_range_record() {
        let predictor = predictor();
        let record = BlockRecord { tonnage: 100.0, ..Default::default() };
        assert!(matches!(predictor.predict(&record), Err(BlockProfitError::InvalidInput(_))));
    }
}
