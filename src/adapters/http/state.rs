use std::sync::Arc;
use crate::application::services::PredictionService;

/// Shared state for the axum handlers.
#[derive(Clone)]
pub struct HttpState {
    pub prediction: Arc<PredictionService>,
}
