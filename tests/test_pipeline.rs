//! Integration test: train → save → load → predict

use block_profit::artifact::PipelineArtifact;
use block_profit::dataset::{block_profit, synthetic_block_model, write_csv};
use block_profit::error::BlockProfitError;
use block_profit::inference::{Predictor, Verdict};
use block_profit::schema::{
    BlockRecord, RockType, COL_MINING_COST, COL_ORE_GRADE, COL_ORE_VALUE, COL_PROCESSING_COST,
    COL_ROCK_TYPE, COL_TONNAGE, COL_WASTE_FLAG, COL_X, COL_Y, COL_Z, TARGET_COLUMN,
};
use block_profit::training::{
    train_and_save, train_test_indices, TrainEngine, TrainingConfig, XGBoostConfig,
};
use polars::prelude::*;
use std::path::Path;

const LINEAR_ROWS: usize = 100;

/// Block `i` of the linear fixture, every profit input varies with `i`
fn linear_block(i: usize) -> BlockRecord {
    let rock_type = RockType::ALL[i % 3];
    BlockRecord {
        x: ((i * 37) % 500) as f64,
        y: ((i * 53) % 500) as f64,
        z: ((i * 7) % 100) as f64,
        ore_grade: 40.0 + (i % 20) as f64,
        tonnage: 500.0 + 45.0 * i as f64,
        ore_value: 1.85 + 0.05 * (i % 4) as f64,
        mining_cost: 0.30 + 0.05 * (i % 3) as f64,
        processing_cost: 0.20 + 0.02 * (i % 3) as f64,
        waste_flag: u8::from(rock_type == RockType::Waste),
        rock_type,
    }
}

fn linear_profit(block: &BlockRecord) -> f64 {
    block_profit(block.tonnage, block.ore_value, block.mining_cost, block.processing_cost)
}

/// 100 blocks whose profit follows the block profit formula exactly
fn linear_block_model() -> DataFrame {
    let blocks: Vec<BlockRecord> = (0..LINEAR_ROWS).map(linear_block).collect();
    let column = |f: fn(&BlockRecord) -> f64| blocks.iter().map(f).collect::<Vec<f64>>();
    let waste: Vec<i64> = blocks.iter().map(|b| i64::from(b.waste_flag)).collect();
    let rock: Vec<&str> = blocks.iter().map(|b| b.rock_type.as_str()).collect();

    df!(
        COL_X => column(|b| b.x),
        COL_Y => column(|b| b.y),
        COL_Z => column(|b| b.z),
        COL_ORE_GRADE => column(|b| b.ore_grade),
        COL_TONNAGE => column(|b| b.tonnage),
        COL_ORE_VALUE => column(|b| b.ore_value),
        COL_MINING_COST => column(|b| b.mining_cost),
        COL_PROCESSING_COST => column(|b| b.processing_cost),
        COL_WASTE_FLAG => &waste,
        COL_ROCK_TYPE => &rock,
        TARGET_COLUMN => column(linear_profit)
    )
    .unwrap()
}

fn quick_config() -> TrainingConfig {
    TrainingConfig::new().with_model(XGBoostConfig {
        n_estimators: 60,
        learning_rate: 0.2,
        ..Default::default()
    })
}

fn write_dataset(dir: &Path, mut df: DataFrame) -> std::path::PathBuf {
    let path = dir.join("mining_block_model.csv");
    write_csv(&mut df, &path).unwrap();
    path
}

#[test]
fn test_end_to_end_prediction_within_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = write_dataset(dir.path(), linear_block_model());
    let artifact_path = dir.path().join("xgboost_pipeline.json");

    let artifact = train_and_save(&data_path, &artifact_path, TrainingConfig::default()).unwrap();
    assert!(artifact_path.exists());
    assert_eq!(artifact.model.n_trees(), 500);
    assert_eq!(artifact.metadata.n_holdout, 20);

    // a block the model never trained on, from the middle of the tonnage range
    let (_, mut holdout) = train_test_indices(LINEAR_ROWS, 0.2, 42);
    holdout.sort_unstable();
    let record = linear_block(holdout[holdout.len() / 2]);
    let expected = linear_profit(&record);

    let predictor = Predictor::load(&artifact_path).unwrap();
    let estimate = predictor.predict(&record).unwrap();

    let relative = (estimate.profit_usd - expected).abs() / expected;
    assert!(relative < 0.15, "predicted {} for {}", estimate.profit_usd, expected);
    assert_eq!(estimate.verdict, Verdict::Viable);

    let metrics = artifact.metadata.holdout_metrics.unwrap();
    assert!(metrics.r2 > 0.9, "holdout r2 {}", metrics.r2);
}

#[test]
fn test_saved_artifact_predicts_bit_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");

    let artifact = TrainEngine::new(quick_config())
        .fit(&synthetic_block_model(120, 11).unwrap())
        .unwrap();
    artifact.save(&path).unwrap();
    let reloaded = PipelineArtifact::load(&path).unwrap();
    assert_eq!(reloaded, artifact);

    let before = Predictor::from_artifact(artifact);
    let after = Predictor::from_artifact(reloaded);
    for rock_type in RockType::ALL {
        for tonnage in [500.0, 1750.0, 4900.0] {
            let record = BlockRecord { rock_type, tonnage, ..Default::default() };
            let a = before.predict(&record).unwrap().profit_usd;
            let b = after.predict(&record).unwrap().profit_usd;
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}

#[test]
fn test_training_is_reproducible() {
    let df = synthetic_block_model(90, 4).unwrap();
    let a = TrainEngine::new(quick_config()).fit(&df).unwrap();
    let b = TrainEngine::new(quick_config()).fit(&df).unwrap();
    assert_eq!(a.preprocessor, b.preprocessor);
    assert_eq!(a.model, b.model);
    assert_eq!(a.metadata.holdout_metrics, b.metadata.holdout_metrics);
}

#[test]
fn test_prediction_ignores_input_column_order() {
    let artifact = TrainEngine::new(quick_config())
        .fit(&synthetic_block_model(60, 8).unwrap())
        .unwrap();
    let predictor = Predictor::from_artifact(artifact);

    let canonical = BlockRecord::default().to_frame(&predictor.schema()).unwrap();
    let reversed = canonical
        .select([
            COL_ROCK_TYPE,
            COL_WASTE_FLAG,
            COL_PROCESSING_COST,
            COL_MINING_COST,
            COL_ORE_VALUE,
            COL_TONNAGE,
            COL_ORE_GRADE,
            COL_Z,
            COL_Y,
            COL_X,
        ])
        .unwrap();

    assert_eq!(
        predictor.predict_frame(&canonical).unwrap(),
        predictor.predict_frame(&reversed).unwrap()
    );
}

#[test]
fn test_zero_profit_is_not_recommended() {
    assert_eq!(Verdict::from_profit(0.0), Verdict::NotRecommended);
    assert!(!Verdict::from_profit(-0.0).is_viable());
    assert!(Verdict::from_profit(f64::MIN_POSITIVE).is_viable());
}

#[test]
fn test_dataset_without_target_writes_no_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let df = linear_block_model().drop(TARGET_COLUMN).unwrap();
    let data_path = write_dataset(dir.path(), df);
    let artifact_path = dir.path().join("xgboost_pipeline.json");

    let err = train_and_save(&data_path, &artifact_path, quick_config()).unwrap_err();
    match err {
        BlockProfitError::MissingColumns(cols) => assert_eq!(cols, vec![TARGET_COLUMN.to_string()]),
        other => panic!("expected MissingColumns, got {other:?}"),
    }
    assert!(!artifact_path.exists());
}

#[test]
fn test_missing_numeric_cells_still_train() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = write_dataset(dir.path(), linear_block_model());
    let text = std::fs::read_to_string(&data_path).unwrap();

    // blank out Ore_Grade in a few rows with the usual missing-value markers
    let markers = ["NA", "NaN", "", "null"];
    let patched: Vec<String> = text
        .lines()
        .enumerate()
        .map(|(i, line)| match i.checked_sub(1).and_then(|row| markers.get(row)) {
            Some(marker) => {
                let mut fields: Vec<&str> = line.split(',').collect();
                fields[3] = marker;
                fields.join(",")
            }
            None => line.to_string(),
        })
        .collect();
    std::fs::write(&data_path, patched.join("\n")).unwrap();

    let artifact_path = dir.path().join("xgboost_pipeline.json");
    let artifact = train_and_save(&data_path, &artifact_path, quick_config()).unwrap();
    assert_eq!(artifact.metadata.n_train + artifact.metadata.n_holdout, LINEAR_ROWS);
    assert!(artifact_path.exists());
}

#[test]
fn test_unknown_rock_type_is_rejected_at_inference() {
    let artifact = TrainEngine::new(quick_config())
        .fit(&synthetic_block_model(30, 2).unwrap())
        .unwrap();
    let predictor = Predictor::from_artifact(artifact);

    let mut frame = BlockRecord::default().to_frame(&predictor.schema()).unwrap();
    frame
        .with_column(Series::new(COL_ROCK_TYPE.into(), ["Granite"]))
        .unwrap();
    assert!(matches!(
        predictor.predict_frame(&frame),
        Err(BlockProfitError::UnknownCategory { .. })
    ));
}
