// ticket-service/src/error.rs
// ============================================================================
// Module: API Error Mapping
// Description: Maps EngineError onto HTTP status codes and a JSON body.
// Purpose: Present the error kinds listed in the ticket intake contract (§7)
//          as a stable HTTP-facing vocabulary.
// Dependencies: axum, ticket-core
// ============================================================================

//! ## Overview
//! Every engine error kind maps to exactly one HTTP status so callers can
//! branch on status alone; the body additionally carries a `kind` discriminant
//! and a human-readable `message` for logging.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;
use ticket_core::EngineError;

// ============================================================================
// SECTION: Error Body
// ============================================================================

/// JSON error body returned for every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    /// Stable discriminant matching the engine's error kind.
    pub kind: &'static str,
    /// Human-readable error message; not stable across versions.
    pub message: String,
}

/// Wraps an [`EngineError`] for conversion into an axum [`Response`].
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            EngineError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            EngineError::AlreadyExists(_) => (StatusCode::CONFLICT, "already_exists"),
            EngineError::ResourceExhausted(_) => (StatusCode::TOO_MANY_REQUESTS, "resource_exhausted"),
            EngineError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            EngineError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        let body = ApiErrorBody {
            kind,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
