//! Single-block inference
//!
//! Provides:
//! - [`Predictor`]: loaded artifact applied to one block at a time
//! - [`ProfitEstimate`] and [`Verdict`]: the scalar result and its reading
//! - [`format_usd`]: two-decimal currency rendering with thousands separators

mod engine;

pub use engine::{format_usd, Predictor, ProfitEstimate, Verdict};
