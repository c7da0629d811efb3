// ticket-service/src/router.rs
// ============================================================================
// Module: HTTP Router
// Description: Route table exposing the five ticket engine operations.
// Purpose: Bind each RPC-equivalent method (§6) to a path and method pair.
// Dependencies: axum
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Router;
use axum::routing::patch;
use axum::routing::post;

use crate::handlers::check_duplicate;
use crate::handlers::create_ticket;
use crate::handlers::get_ticket;
use crate::handlers::get_tickets;
use crate::handlers::update_ticket;
use crate::state::AppState;

/// Builds the service's route table.
///
/// | Method | Path                          | Engine operation  |
/// |--------|-------------------------------|--------------------|
/// | POST   | `/tickets`                     | `CreateTicket`     |
/// | PATCH  | `/tickets/{ticket_id}`         | `UpdateTicket`     |
/// | GET    | `/tickets/{ticket_id}`         | `GetTicket`        |
/// | GET    | `/tickets`                     | `GetTickets`       |
/// | POST   | `/tickets/check-duplicate`     | `CheckDuplicate`   |
#[must_use]
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/tickets", post(create_ticket).get(get_tickets))
        .route("/tickets/check-duplicate", post(check_duplicate))
        .route("/tickets/{ticket_id}", patch(update_ticket).get(get_ticket))
        .with_state(state)
}
