// ticket-service/src/main.rs
// ============================================================================
// Module: Ticket Service Binary
// Description: Composition root: wires the backend, store, and broker
//              adapters into the ticket engine and serves it over HTTP.
// Purpose: Load configuration, build the concrete engine, and run the axum
//          server until shutdown is requested.
// Dependencies: axum, tokio, tracing-subscriber, ticket-config, ticket-core,
//               ticket-backend-http, ticket-broker, ticket-store-sqlite
// ============================================================================

//! ## Overview
//! This binary loads [`ticket_config::TicketConfig`], builds one concrete
//! adapter per injected capability, and hands the resulting
//! [`ticket_core::TicketEngine`] to the axum router. Transport framing for
//! the five operations is out of scope for the underlying contract; JSON
//! over HTTP is this deployment's concrete choice of transport.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod dto;
mod error;
mod handlers;
mod router;
mod state;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;
use ticket_backend_http::HttpBackendAdapter;
use ticket_backend_http::HttpBackendConfig;
use ticket_broker::AmqpPublisherConfig;
use ticket_broker::AmqpSetupError;
use ticket_broker::AmqpTaskPublisher;
use ticket_config::CONFIG_ENV_VAR;
use ticket_config::ConfigError;
use ticket_config::TicketConfig;
use ticket_core::BackendError;
use ticket_core::EngineConfig;
use ticket_core::IncidentStore as _;
use ticket_core::TicketEngine;
use ticket_store_sqlite::SqliteIncidentStore;
use ticket_store_sqlite::SqliteStoreConfig;
use ticket_store_sqlite::StoreSetupError;

use crate::state::AppState;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming the socket address this service binds to.
const BIND_ADDR_ENV_VAR: &str = "TICKET_SERVICE_BIND_ADDR";
/// Default bind address when [`BIND_ADDR_ENV_VAR`] is not set.
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

// ============================================================================
// SECTION: Startup Errors
// ============================================================================

/// Errors that can abort startup before the server begins serving requests.
#[derive(Debug, Error)]
enum StartupError {
    /// Configuration failed to load or validate.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The HTTPS backend adapter failed to construct.
    #[error("backend adapter error: {0}")]
    Backend(#[from] BackendError),
    /// The SQLite incident store failed to open or migrate.
    #[error("store setup error: {0}")]
    Store(#[from] StoreSetupError),
    /// The AMQP task publisher failed to connect.
    #[error("broker setup error: {0}")]
    Broker(#[from] AmqpSetupError),
    /// The configured bind address could not be parsed or bound.
    #[error("bind error: {0}")]
    Bind(String),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Initializes logging and runs the service, translating startup failures
/// into a non-zero exit code instead of a panic.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "ticket-service failed to start");
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration, wires the engine, and serves until `SIGINT`/`SIGTERM`.
async fn run() -> Result<(), StartupError> {
    let config_path = env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from);
    let config = TicketConfig::load(config_path.as_deref())?;

    let backend = HttpBackendAdapter::new(HttpBackendConfig {
        base_url: config.backend.base_url.clone(),
        username: config.backend.username.clone(),
        password: config.backend.password.clone(),
        timeout_ms: config.backend.timeout_ms,
    })?;

    let store = SqliteIncidentStore::open(&SqliteStoreConfig {
        path: PathBuf::from(&config.store.connection_string),
        busy_timeout_ms: config.store.busy_timeout_ms,
    })?;

    let publisher = AmqpTaskPublisher::connect(&AmqpPublisherConfig {
        urls: config.broker.urls.clone(),
        quorum_queue: config.broker.quorum_queue,
        middleware_queue: config.broker.middleware_queue.clone(),
        gdbs_queue: config.broker.gdbs_queue.clone(),
    })?;

    let mut user_generated_domains: BTreeSet<String> = config.reporters.user_generated_domains.clone();
    match store.user_gen_domains() {
        Ok(blacklisted) => user_generated_domains.extend(blacklisted),
        Err(error) => tracing::warn!(%error, "failed to load user-generated domains at startup"),
    }

    let engine_config = EngineConfig {
        trusted_reporters: config.reporters.trusted.clone(),
        exempt_reporters: config.reporters.exempt.clone(),
        user_generated_domains,
        degraded_mode: config.degraded_mode,
        ..EngineConfig::default()
    };

    let engine = TicketEngine::new(backend, store, publisher, engine_config);
    let state = AppState::new(engine);
    let app = router::build(state);

    let bind_addr = env::var(BIND_ADDR_ENV_VAR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|error| StartupError::Bind(error.to_string()))?;
    tracing::info!(%bind_addr, "ticket-service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|error| StartupError::Bind(error.to_string()))?;

    Ok(())
}

/// Resolves once `SIGINT` (`Ctrl+C`) is received, or immediately on platforms
/// without a `SIGTERM` signal.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install ctrl-c handler; shutdown signal disabled");
    }
}
