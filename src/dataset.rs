//! Block model dataset loading
//!
//! Reads the labeled CSV, checks it carries every column the pipeline needs,
//! and turns columns into dense ndarray buffers. Also hosts a synthetic
//! block model generator used by the `sample` command, tests and benches.

use crate::error::{BlockProfitError, Result};
use crate::schema::{
    FeatureSchema, RockType, COL_MINING_COST, COL_ORE_GRADE, COL_ORE_VALUE, COL_PROCESSING_COST,
    COL_ROCK_TYPE, COL_TONNAGE, COL_WASTE_FLAG, COL_X, COL_Y, COL_Z, TARGET_COLUMN,
};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::path::Path;
use tracing::{debug, info};

/// Default location of the training data
pub const DEFAULT_DATASET_PATH: &str = "mining_block_model.csv";

/// Cell tokens read as missing, imputed as 0 for numeric columns
pub const NULL_TOKENS: [&str; 7] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL"];

/// Read the block model CSV and check required columns.
pub fn load_dataset(path: &Path, schema: &FeatureSchema) -> Result<DataFrame> {
    if !path.exists() {
        return Err(BlockProfitError::DatasetMissing(path.to_path_buf()));
    }

    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .map_parse_options(|opts| {
            opts.with_null_values(Some(NullValues::AllColumns(
                NULL_TOKENS.iter().map(|t| (*t).into()).collect(),
            )))
        })
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    info!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded dataset");

    validate_training_frame(&df, schema)?;
    Ok(df)
}

/// Every feature column and the target must be present and the frame non-empty.
pub fn validate_training_frame(df: &DataFrame, schema: &FeatureSchema) -> Result<()> {
    let mut required = schema.ordered_columns();
    required.push(TARGET_COLUMN);

    let missing = FeatureSchema::missing_in(df, &required);
    if !missing.is_empty() {
        return Err(BlockProfitError::MissingColumns(missing));
    }
    if df.height() == 0 {
        return Err(BlockProfitError::DatasetMalformed("dataset has no rows".to_string()));
    }
    Ok(())
}

/// Values of one numeric column with nulls and NaN imputed as 0.
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| BlockProfitError::MissingColumns(vec![name.to_string()]))?;

    let dtype = column.dtype();
    if column.null_count() == column.len() {
        return Ok(vec![0.0; column.len()]);
    }
    if !(dtype.is_float() || dtype.is_integer()) {
        return Err(BlockProfitError::DatasetMalformed(format!(
            "column '{}' is not numeric (found {})",
            name, dtype
        )));
    }

    let as_f64 = column.strict_cast(&DataType::Float64).map_err(|e| {
        BlockProfitError::DatasetMalformed(format!("column '{}' is not numeric: {}", name, e))
    })?;
    let values = as_f64
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()).unwrap_or(0.0))
        .collect();
    Ok(values)
}

/// Extract named numeric columns into a row-major matrix, nulls imputed as 0.
pub fn numeric_matrix(df: &DataFrame, names: &[String]) -> Result<Array2<f64>> {
    let col_data: Vec<Vec<f64>> = names
        .iter()
        .map(|name| numeric_column(df, name))
        .collect::<Result<_>>()?;

    let n_rows = df.height();
    Ok(Array2::from_shape_fn((n_rows, names.len()), |(r, c)| col_data[c][r]))
}

/// String values of one categorical column; nulls are rejected.
pub fn categorical_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .map_err(|_| BlockProfitError::MissingColumns(vec![name.to_string()]))?;
    let ca = column.str().map_err(|e| {
        BlockProfitError::DatasetMalformed(format!("column '{}' is not categorical: {}", name, e))
    })?;
    ca.into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.map(str::to_string).ok_or_else(|| {
                BlockProfitError::DatasetMalformed(format!("column '{}' is empty at row {}", name, row))
            })
        })
        .collect()
}

/// Target vector with nulls read as 0.
pub fn target_vector(df: &DataFrame) -> Result<Array1<f64>> {
    Ok(Array1::from_vec(numeric_column(df, TARGET_COLUMN)?))
}

/// Profit the way the block model defines it
pub fn block_profit(tonnage: f64, ore_value: f64, mining_cost: f64, processing_cost: f64) -> f64 {
    tonnage * ore_value - tonnage * (mining_cost + processing_cost)
}

/// Generate a synthetic block model whose profit follows
/// `Tonnage*Ore_Value - Tonnage*(Mining_Cost+Processing_Cost)`.
pub fn synthetic_block_model(n_rows: usize, seed: u64) -> Result<DataFrame> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    let mut xs = Vec::with_capacity(n_rows);
    let mut ys = Vec::with_capacity(n_rows);
    let mut zs = Vec::with_capacity(n_rows);
    let mut rock = Vec::with_capacity(n_rows);
    let mut grade = Vec::with_capacity(n_rows);
    let mut tonnage = Vec::with_capacity(n_rows);
    let mut value = Vec::with_capacity(n_rows);
    let mut mining = Vec::with_capacity(n_rows);
    let mut processing = Vec::with_capacity(n_rows);
    let mut waste = Vec::with_capacity(n_rows);
    let mut profit = Vec::with_capacity(n_rows);

    for i in 0..n_rows {
        // Every lithology shows up, whatever the row count
        let rock_type = RockType::ALL[i % RockType::ALL.len()];
        let is_waste = rock_type == RockType::Waste;

        let t = (rng.gen_range(500.0..5000.0_f64) / 10.0).round() * 10.0;
        let g: f64 = if is_waste { rng.gen_range(0.0..20.0) } else { rng.gen_range(35.0..70.0) };
        let v: f64 = if is_waste { rng.gen_range(0.0..0.4) } else { g / 100.0 * rng.gen_range(2.5..4.0) };
        let mc: f64 = rng.gen_range(0.1..1.0);
        let pc: f64 = rng.gen_range(0.1..0.5);

        xs.push(rng.gen_range(0..=500) as f64);
        ys.push(rng.gen_range(0..=500) as f64);
        zs.push(rng.gen_range(0..=100) as f64);
        rock.push(rock_type.as_str());
        grade.push((g * 100.0).round() / 100.0);
        tonnage.push(t);
        value.push((v * 100.0).round() / 100.0);
        mining.push((mc * 100.0).round() / 100.0);
        processing.push((pc * 100.0).round() / 100.0);
        waste.push(i64::from(is_waste));
    }

    for i in 0..n_rows {
        profit.push(block_profit(tonnage[i], value[i], mining[i], processing[i]));
    }

    debug!(rows = n_rows, seed, "Generated synthetic block model");

    let df = df!(
        COL_X => &xs,
        COL_Y => &ys,
        COL_Z => &zs,
        COL_ROCK_TYPE => &rock,
        COL_ORE_GRADE => &grade,
        COL_TONNAGE => &tonnage,
        COL_ORE_VALUE => &value,
        COL_MINING_COST => &mining,
        COL_PROCESSING_COST => &processing,
        COL_WASTE_FLAG => &waste,
        TARGET_COLUMN => &profit
    )?;
    Ok(df)
}

/// Write a frame as CSV with a header row.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}
