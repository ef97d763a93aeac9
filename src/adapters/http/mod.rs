pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/predictions", post(routes::predict))
        .route("/api/stock", get(routes::stock))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
