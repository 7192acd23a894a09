//! Application state management

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

use crate::inference::Predictor;

use super::ServerConfig;

/// Serving state of the artifact slot. Once set it never changes.
#[derive(Debug, Clone)]
pub enum ModelState {
    /// No usable artifact; predictions are refused until the process restarts
    NoArtifact { path: PathBuf, reason: String },
    /// Artifact loaded and shared read-only by every request
    Loaded(Arc<Predictor>),
}

impl ModelState {
    pub fn predictor(&self) -> Option<&Arc<Predictor>> {
        match self {
            ModelState::Loaded(p) => Some(p),
            ModelState::NoArtifact { .. } => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.predictor().is_some()
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    model: OnceLock<ModelState>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            model: OnceLock::new(),
        }
    }

    /// State with an already loaded predictor
    pub fn with_predictor(config: ServerConfig, predictor: Predictor) -> Self {
        let state = Self::new(config);
        let _ = state.model.set(ModelState::Loaded(Arc::new(predictor)));
        state
    }

    /// Artifact slot, loading it on first access.
    ///
    /// The load runs at most once per process; a failed load is remembered.
    pub fn model(&self) -> &ModelState {
        self.model.get_or_init(|| {
            let path = self.config.model_path.clone();
            match Predictor::load(&path) {
                Ok(predictor) => {
                    info!(path = %path.display(), "Model artifact ready");
                    ModelState::Loaded(Arc::new(predictor))
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Model artifact unavailable, predictions disabled");
                    ModelState::NoArtifact { path, reason: e.to_string() }
                }
            }
        })
    }
}
