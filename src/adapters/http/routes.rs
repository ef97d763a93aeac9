use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::adapters::http::state::HttpState;
use crate::application::dto::{ErrorResponse, OkResponse, PredictRequest};
use crate::domain::errors::DomainError;

fn error_response(e: DomainError) -> Response {
    let status = match &e {
        DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DomainError::UnknownCategory(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::NotFound(_) | DomainError::Inference(_) | DomainError::OperationFailed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    warn!(status = status.as_u16(), "request failed: {e}");
    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

/// Body rejections answer with the same `{"error"}` shape as the service.
/// Oversized bodies keep 413; everything else is invalid input.
fn rejection_response(rejection: JsonRejection) -> Response {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(status = 413, "request failed: {}", rejection.body_text());
        let body = ErrorResponse { error: format!("request body too large: {}", rejection.body_text()) };
        return (StatusCode::PAYLOAD_TOO_LARGE, Json(body)).into_response();
    }
    error_response(DomainError::InvalidInput(rejection.body_text()))
}

pub async fn predict(
    State(st): State<HttpState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(rejection),
    };
    match st.prediction.predict(req).await {
        Ok(res) => Json(res).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn stock(State(st): State<HttpState>) -> impl IntoResponse {
    Json(st.prediction.stock_snapshot())
}

pub async fn health() -> impl IntoResponse {
    Json(OkResponse { ok: true })
}
