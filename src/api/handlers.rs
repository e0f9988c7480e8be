//! HTTP request handlers

use super::types::{CitiesResponse, ErrorResponse, QueryRequest, QueryResponse, SamplesResponse};
use super::AppState;
use crate::cities::{city_names, SAMPLE_QUERIES};
use crate::workflow::{EngineError, RunOptions};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/cities", get(list_cities))
        .route("/api/samples", get(list_samples))
        .route("/api/query", post(submit_query))
        .with_state(state)
}

async fn list_cities() -> Json<CitiesResponse> {
    Json(CitiesResponse {
        cities: city_names(),
    })
}

async fn list_samples() -> Json<SamplesResponse> {
    Json(SamplesResponse {
        samples: SAMPLE_QUERIES.to_vec(),
    })
}

async fn submit_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let options = RunOptions {
        verbose: req.verbose,
        ..RunOptions::default()
    };
    let output = state
        .workflow
        .run_with_transcript(&req.query, options)
        .await?;

    Ok(Json(QueryResponse {
        answer: output.answer,
        rounds: output.rounds,
        transcript: req.include_transcript.then_some(output.transcript),
    }))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    BadGateway(String),
    GatewayTimeout(String),
    Internal(String),
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        let message = e.to_string();
        match e {
            EngineError::Validation(_) => AppError::BadRequest(message),
            EngineError::Llm(_) => AppError::BadGateway(message),
            EngineError::Timeout(_) => AppError::GatewayTimeout(message),
            EngineError::Stalled
            | EngineError::MaxRoundsExceeded(_)
            | EngineError::Protocol(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
