//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::BlockProfitError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client
    pub fn public_message(&self) -> String {
        match self {
            ServerError::BadRequest(msg) | ServerError::ModelUnavailable(msg) => msg.clone(),
            ServerError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

impl From<BlockProfitError> for ServerError {
    fn from(e: BlockProfitError) -> Self {
        match e {
            BlockProfitError::InvalidInput(_)
            | BlockProfitError::UnknownCategory { .. }
            | BlockProfitError::MissingColumns(_) => ServerError::BadRequest(e.to_string()),
            BlockProfitError::ArtifactMissing(_) | BlockProfitError::ArtifactUnreadable { .. } => {
                ServerError::ModelUnavailable(e.to_string())
            }
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if let ServerError::Internal(detail) = &self {
            tracing::error!(detail = %detail, "Internal server error");
        }

        let body = Json(json!({
            "error": true,
            "message": self.public_message(),
        }));

        (self.status(), body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_domain_errors_map_to_status() {
        let e: ServerError = BlockProfitError::InvalidInput("Tonnage out of range".into()).into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);

        let e: ServerError = BlockProfitError::ArtifactMissing(PathBuf::from("x.json")).into();
        assert_eq!(e.status(), StatusCode::SERVICE_UNAVAILABLE);

        let e: ServerError = BlockProfitError::ModelNotFitted.into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.public_message(), "An internal error occurred");
    }
}
