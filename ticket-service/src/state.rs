// ticket-service/src/state.rs
// ============================================================================
// Module: Application State
// Description: Shared state handed to every axum handler.
// Purpose: Hold the concrete ticket engine built from the configured adapters.
// Dependencies: ticket-core, ticket-backend-http, ticket-broker, ticket-store-sqlite
// ============================================================================

//! ## Overview
//! The service wires exactly one concrete adapter per capability: HTTPS
//! against the remote ticketing backend, SQLite for the incident store, and
//! AMQP for task publishing. [`AppState`] is cloned into every request
//! handler; the clone is cheap because the engine itself is held behind an
//! [`Arc`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use ticket_backend_http::HttpBackendAdapter;
use ticket_broker::AmqpTaskPublisher;
use ticket_core::TicketEngine;
use ticket_store_sqlite::SqliteIncidentStore;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Concrete ticket engine wired for this deployment.
pub type Engine = TicketEngine<HttpBackendAdapter, SqliteIncidentStore, AmqpTaskPublisher>;

/// Shared application state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The wired ticket engine.
    pub engine: Arc<Engine>,
}

impl AppState {
    /// Wraps `engine` for sharing across handlers.
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
