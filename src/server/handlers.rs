//! HTTP request handlers

use std::sync::Arc;
use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde::Serialize;
use tracing::debug;

use crate::inference::{Predictor, ProfitEstimate};
use crate::schema::BlockRecord;

use super::error::{Result, ServerError};
use super::state::{AppState, ModelState};
use super::ui::{render_page, Outcome};

/// JSON prediction result
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub profit_usd: f64,
    pub formatted: String,
    pub viable: bool,
    pub verdict: String,
}

impl From<ProfitEstimate> for PredictionResponse {
    fn from(estimate: ProfitEstimate) -> Self {
        Self {
            profit_usd: estimate.profit_usd,
            formatted: estimate.formatted(),
            viable: estimate.verdict.is_viable(),
            verdict: estimate.verdict.message().to_string(),
        }
    }
}

// ============================================================================
// UI Handlers
// ============================================================================

pub async fn serve_index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_page(state.model(), &BlockRecord::default(), None))
}

/// Form submit: re-render the page with the estimate or the rejection
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    form: std::result::Result<Form<BlockRecord>, FormRejection>,
) -> Response {
    let model = state.model();

    let Form(record) = match form {
        Ok(form) => form,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "Rejected form submission");
            let outcome = Outcome::Rejected(format!("Invalid form input: {}", rejection.body_text()));
            let page = render_page(model, &BlockRecord::default(), Some(&outcome));
            return (StatusCode::BAD_REQUEST, Html(page)).into_response();
        }
    };

    let Some(predictor) = model.predictor() else {
        return (StatusCode::SERVICE_UNAVAILABLE, Html(render_page(model, &record, None))).into_response();
    };

    let (status, outcome) = match predictor.predict(&record) {
        Ok(estimate) => (StatusCode::OK, Outcome::Estimate(estimate)),
        Err(e) => {
            let err = ServerError::from(e);
            (err.status(), Outcome::Rejected(err.public_message()))
        }
    };

    (status, Html(render_page(model, &record, Some(&outcome)))).into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<BlockRecord>, JsonRejection>,
) -> Result<Json<PredictionResponse>> {
    let predictor = loaded(state.model())?;
    let Json(record) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let estimate = predictor.predict(&record)?;
    Ok(Json(estimate.into()))
}

/// Schema, hyperparameters and holdout scores of the loaded artifact
pub async fn get_model_info(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>> {
    let predictor = loaded(state.model())?;
    let artifact = predictor.artifact();

    Ok(Json(serde_json::json!({
        "format": artifact.format,
        "target": artifact.metadata.target,
        "created_at": artifact.metadata.created_at,
        "num_cols": artifact.num_cols,
        "cat_cols": artifact.cat_cols,
        "feature_names": artifact.preprocessor.feature_names(),
        "n_trees": artifact.model.n_trees(),
        "hyperparameters": artifact.model.config(),
        "n_train": artifact.metadata.n_train,
        "n_holdout": artifact.metadata.n_holdout,
        "holdout_metrics": artifact.metadata.holdout_metrics,
        "rock_types": predictor.rock_types(),
        "feature_importances": predictor
            .feature_importances()
            .into_iter()
            .map(|(name, share)| serde_json::json!({ "feature": name, "importance": share }))
            .collect::<Vec<_>>(),
    })))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.model().is_loaded(),
    }))
}

fn loaded(model: &ModelState) -> Result<&Arc<Predictor>> {
    match model {
        ModelState::Loaded(predictor) => Ok(predictor),
        ModelState::NoArtifact { reason, .. } => Err(ServerError::ModelUnavailable(format!(
            "{reason}. Train the model first with `block-profit train`."
        ))),
    }
}
