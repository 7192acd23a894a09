//! Block Profit CLI Module
//!
//! Command-line interface for training the pipeline, serving it and
//! generating a synthetic block model.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::artifact::DEFAULT_ARTIFACT_PATH;
use crate::dataset::{synthetic_block_model, write_csv, DEFAULT_DATASET_PATH};
use crate::server::{run_server, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
use crate::training::{train_and_save, TrainingConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 200, 130) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "block-profit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Predict mining block profit with gradient boosted trees")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the pipeline on a block model CSV and write the artifact
    Train {
        /// Block model CSV
        #[arg(short, long, default_value = DEFAULT_DATASET_PATH)]
        data: PathBuf,

        /// Artifact file to write
        #[arg(short, long, default_value = DEFAULT_ARTIFACT_PATH)]
        output: PathBuf,
    },

    /// Start the web form and JSON API
    Serve {
        /// Server host
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,

        /// Server port
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Trained artifact
        #[arg(short, long, default_value = DEFAULT_ARTIFACT_PATH)]
        model: PathBuf,
    },

    /// Write a synthetic block model CSV
    Sample {
        /// Number of blocks
        #[arg(short, long, default_value = "1000")]
        rows: usize,

        /// Generator seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output CSV
        #[arg(short, long, default_value = DEFAULT_DATASET_PATH)]
        output: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(data_path: &Path, output: &Path) -> anyhow::Result<()> {
    section("Train");

    let config = TrainingConfig::default();
    step_run(&format!(
        "Training {} trees on {}",
        config.model.n_estimators,
        data_path.display().to_string().cyan()
    ));
    let start = Instant::now();
    let artifact = train_and_save(data_path, output, config)?;
    step_done(&format!("{:.2?}", start.elapsed()));
    step_ok(&format!("Artifact written to {}", output.display()));

    let meta = &artifact.metadata;
    println!();
    println!("  {:<16} {}", muted("Train rows"), meta.n_train.to_string().white());
    println!("  {:<16} {}", muted("Holdout rows"), meta.n_holdout.to_string().white());
    println!("  {:<16} {}", muted("Features"), artifact.preprocessor.feature_names().join(", ").white());
    match &meta.holdout_metrics {
        Some(m) => {
            println!("  {:<16} {}", muted("R²"), format!("{:.4}", m.r2).white().bold());
            println!("  {:<16} {}", muted("MAE"), format!("{:.2}", m.mae).white());
            println!("  {:<16} {}", muted("RMSE"), format!("{:.2}", m.rmse).white());
        }
        None => println!("  {}", "Holdout set empty, no evaluation".yellow()),
    }
    println!();

    Ok(())
}

pub async fn cmd_serve(config: ServerConfig) -> anyhow::Result<()> {

    // 0.0.0.0 is not browsable
    let shown_host = if config.host == "0.0.0.0" { "localhost" } else { config.host.as_str() };

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Mining Block Profit Predictor".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Web UI ", &format!("http://{}:{}", shown_host, config.port)));
    line_box(&kv("Health ", &format!("http://{}:{}/api/health", shown_host, config.port)));
    line_box(&kv("Model  ", &config.model_path.display().to_string()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}

pub fn cmd_sample(rows: usize, seed: u64, output: &Path) -> anyhow::Result<()> {
    section("Sample");

    step_run(&format!("Generating {} blocks", rows));
    let mut df = synthetic_block_model(rows, seed)?;
    write_csv(&mut df, output)?;
    step_done(&format!("seed {}", seed));
    step_ok(&format!("Block model written to {}", output.display()));
    println!();

    Ok(())
}
