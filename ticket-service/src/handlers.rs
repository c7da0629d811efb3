// ticket-service/src/handlers.rs
// ============================================================================
// Module: HTTP Handlers
// Description: axum handlers for the five ticket engine operations.
// Purpose: Translate HTTP requests into engine calls and engine results into
//          HTTP responses (§6). Transport framing itself is out of scope; this
//          module only adapts the engine's existing contract to JSON/HTTP.
// Dependencies: axum, ticket-core
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use ticket_core::CreateTicketArgs;
use ticket_core::EngineError;
use ticket_core::GetTicketsArgs;
use ticket_core::ReporterId;
use ticket_core::ReporterTicketView;
use ticket_core::Source;
use ticket_core::TicketId;
use ticket_core::UpdateTicketArgs;

use crate::dto::CheckDuplicateRequest;
use crate::dto::CheckDuplicateResponse;
use crate::dto::CreateTicketResponse;
use crate::dto::GetTicketsResponse;
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// SECTION: CreateTicket
// ============================================================================

/// Handles `POST /tickets`.
pub async fn create_ticket(
    State(state): State<AppState>,
    Json(args): Json<CreateTicketArgs>,
) -> Result<Json<CreateTicketResponse>, ApiError> {
    let engine = state.engine.clone();
    let ticket_id = tokio::task::spawn_blocking(move || engine.create_ticket(args))
        .await
        .map_err(join_error)??;
    Ok(Json(CreateTicketResponse {
        ticket_id,
    }))
}

// ============================================================================
// SECTION: UpdateTicket
// ============================================================================

/// Handles `PATCH /tickets/{ticket_id}`.
pub async fn update_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
    Json(mut args): Json<UpdateTicketArgs>,
) -> Result<StatusCode, ApiError> {
    args.ticket_id = TicketId::from(ticket_id);
    let engine = state.engine.clone();
    tokio::task::spawn_blocking(move || engine.update_ticket(args)).await.map_err(join_error)??;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// SECTION: GetTicket
// ============================================================================

/// Query parameters accepted by `GET /tickets/{ticket_id}`.
#[derive(Debug, serde::Deserialize)]
pub struct GetTicketQuery {
    /// Scope the lookup to a specific reporter.
    pub reporter: Option<String>,
}

/// Handles `GET /tickets/{ticket_id}`.
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
    Query(query): Query<GetTicketQuery>,
) -> Result<Json<ReporterTicketView>, ApiError> {
    let engine = state.engine.clone();
    let ticket_id = TicketId::from(ticket_id);
    let reporter = query.reporter.map(ReporterId::from);
    let view = tokio::task::spawn_blocking(move || engine.get_ticket(&ticket_id, reporter.as_ref()))
        .await
        .map_err(join_error)??;
    Ok(Json(view))
}

// ============================================================================
// SECTION: GetTickets
// ============================================================================

/// Handles `GET /tickets`.
pub async fn get_tickets(
    State(state): State<AppState>,
    Query(args): Query<GetTicketsArgs>,
) -> Result<Json<GetTicketsResponse>, ApiError> {
    let engine = state.engine.clone();
    let result = tokio::task::spawn_blocking(move || engine.get_tickets(args)).await.map_err(join_error)??;
    Ok(Json(GetTicketsResponse::from(result)))
}

// ============================================================================
// SECTION: CheckDuplicate
// ============================================================================

/// Handles `POST /tickets/check-duplicate`.
pub async fn check_duplicate(
    State(state): State<AppState>,
    Json(request): Json<CheckDuplicateRequest>,
) -> Result<Json<CheckDuplicateResponse>, ApiError> {
    let engine = state.engine.clone();
    let source = Source::from(request.source);
    let excluded = request.excluded;
    let (_, duplicate_ids) =
        tokio::task::spawn_blocking(move || engine.check_duplicate(&source, excluded.as_ref()))
            .await
            .map_err(join_error)??;
    let duplicate = duplicate_ids.first().map(TicketId::to_string).unwrap_or_default();
    Ok(Json(CheckDuplicateResponse {
        duplicate,
    }))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a `spawn_blocking` join failure onto the engine's internal error kind;
/// the blocking task itself only panics on a bug, never on a handled error.
fn join_error(error: tokio::task::JoinError) -> ApiError {
    ApiError(EngineError::Internal(format!("worker task failed: {error}")))
}
