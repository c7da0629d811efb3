// ticket-core/src/interfaces/mod.rs
// ============================================================================
// Module: Ticket Engine Interfaces
// Description: Backend-agnostic interfaces for the remote backend, the
//              incident store, and the task publisher.
// Purpose: Define the contract surfaces the ticket engine is injected with.
// Dependencies: crate::model
// ============================================================================

//! ## Overview
//! Interfaces define how the ticket engine integrates with external systems
//! without embedding backend-specific details. Every implementation is
//! best-effort: failures are surfaced to the caller rather than retried here
//! (retries, if any, belong to the concrete adapter or its transport).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::model::CloseReason;
use crate::model::Evidence;
use crate::model::TicketId;
use crate::model::TicketType;

// ============================================================================
// SECTION: Backend Adapter
// ============================================================================

/// Raw response returned by the remote ticketing backend.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response header value, when present (only `x-total-count` is read).
    pub total_count: Option<u64>,
    /// Parsed JSON body.
    pub body: serde_json::Value,
}

/// Backend adapter errors.
///
/// Any transport failure, non-2xx response on a write path, or unparseable
/// body surfaces as an opaque failure; this layer performs no retries.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The HTTP transport itself failed (DNS, TLS, timeout, connection reset).
    #[error("backend transport error: {0}")]
    Transport(String),
    /// The response body could not be parsed as JSON.
    #[error("backend response was not valid json: {0}")]
    InvalidResponse(String),
}

/// Stateless adapter to the remote ticketing backend.
///
/// Implementations own field-name translation, URL-parameter construction,
/// POST-payload construction, and per-call timeouts; see
/// `ticket-backend-http` for the concrete HTTPS implementation.
pub trait BackendAdapter {
    /// Issues a GET request against `path` (relative to the configured
    /// table base, e.g. `/u_dcu_ticket?...`).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on transport failure or unparseable body.
    fn get(&self, path: &str) -> Result<RemoteResponse, BackendError>;

    /// Issues a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on transport failure or unparseable body.
    fn post(&self, path: &str, body: serde_json::Value) -> Result<RemoteResponse, BackendError>;

    /// Issues a PATCH request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on transport failure or unparseable body.
    fn patch(&self, path: &str, body: serde_json::Value) -> Result<RemoteResponse, BackendError>;
}

// ============================================================================
// SECTION: Incident Store Adapter
// ============================================================================

/// Projection of a ticket persisted into the incident store and forwarded
/// to the middleware queue. Mirrors the `MIDDLEWARE_MODEL` field set plus
/// the optional enrichment fields recorded at create time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentProjection {
    /// Remote ticket identifier.
    pub ticket_id: TicketId,
    /// Abuse ticket type.
    pub r#type: TicketType,
    /// Source URL or host.
    pub source: Option<String>,
    /// Domain or IP extracted from the source.
    pub source_domain_or_ip: Option<String>,
    /// Subdomain extracted from the source; cap-bucket key.
    pub source_sub_domain: Option<String>,
    /// Attack or victim target.
    pub target: Option<String>,
    /// Observed proxy IP.
    pub proxy: Option<String>,
    /// Reporter identifier.
    pub reporter: Option<String>,
    /// Free-form nested metadata; may carry `reclassified_from`, `fraud_score`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    /// Present only when the incoming report carried an `info` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
    /// Set when the reporter is trusted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abuse_verified: Option<bool>,
}

/// Merge-patch applied to an incident document by `UpdateIncident`.
///
/// Every field is optional; only fields present in the patch are modified.
#[derive(Debug, Clone, Default)]
pub struct IncidentPatch {
    /// Sets or clears the `abuseVerified` flag.
    pub abuse_verified: Option<bool>,
}

/// Filter on the normalized cap-bucket key (§4.4): either a subdomain, which
/// matches both the `www.`-prefixed and bare forms, or a bare domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubdomainOrDomain {
    /// Matches either the `www.`-prefixed or bare form of `normalized`.
    Subdomain {
        /// The `www.`-prefixed form.
        www_form: String,
        /// The bare (non-`www.`) form.
        bare_form: String,
    },
    /// Matches only the exact domain.
    Domain(String),
}

/// Query used by `FindIncidents` for the domain-cap and duplicate checks.
#[derive(Debug, Clone)]
pub struct IncidentQuery {
    /// Restrict to incidents whose `phishstory_status` is not `CLOSED`.
    pub exclude_closed: bool,
    /// Restrict to incidents of this ticket type.
    pub r#type: Option<TicketType>,
    /// Restrict to incidents matching this subdomain/domain bucket.
    pub subdomain_or_domain: Option<SubdomainOrDomain>,
}

/// Incident store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or the operation failed transiently.
    #[error("incident store io error: {0}")]
    Io(String),
    /// The stored or supplied document was invalid.
    #[error("incident store invalid document: {0}")]
    Invalid(String),
}

/// Thin interface over the internal incident database.
pub trait IncidentStore {
    /// Upserts an incident by ticket ID, defaulting `phishstory_status` to
    /// `OPEN`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn add_incident(&self, ticket_id: &TicketId, doc: &IncidentProjection) -> Result<(), StoreError>;

    /// Applies a merge patch to an existing incident document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn update_incident(&self, ticket_id: &TicketId, patch: &IncidentPatch) -> Result<(), StoreError>;

    /// Transitions an incident to `CLOSED`, recording the reason and the
    /// closure timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn close_incident(&self, ticket_id: &TicketId, close_reason: CloseReason) -> Result<(), StoreError>;

    /// Loads an incident document by ticket ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn get_incident(&self, ticket_id: &TicketId) -> Result<Option<crate::model::Incident>, StoreError>;

    /// Finds incidents matching `query`, capped at `limit` results.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn find_incidents(
        &self,
        query: &IncidentQuery,
        limit: usize,
    ) -> Result<Vec<crate::model::Incident>, StoreError>;

    /// Appends an email acknowledgement record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn add_email_ack(&self, ack: &crate::model::EmailAck) -> Result<(), StoreError>;

    /// Returns the set of user-generated domain names loaded from the
    /// blocklist collection.
    ///
    /// Implementations load this lazily and cache it indefinitely on first
    /// successful read; a load failure is logged by the implementation and
    /// an empty set is returned rather than propagated (§4.2).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only for programming-level misuse; transport
    /// failures are swallowed per the documented fallback.
    fn user_gen_domains(&self) -> Result<BTreeSet<String>, StoreError>;
}

// ============================================================================
// SECTION: Task Publisher
// ============================================================================

/// Task publisher errors. Callers (the ticket engine) log and swallow these;
/// a publish failure must never fail the originating RPC (§4.3, §7).
#[derive(Debug, Error)]
pub enum PublishError {
    /// The broker could not be reached or rejected the publish.
    #[error("task publish failed: {0}")]
    Broker(String),
}

/// Publishes named tasks to the middleware and GDBS broker queues.
pub trait TaskPublisher {
    /// Publishes `run.process` to the middleware queue with the incident
    /// projection as its sole positional argument.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] on broker failure. Callers are expected to
    /// log and swallow this error rather than fail the originating RPC.
    fn publish_process(&self, projection: &IncidentProjection) -> Result<(), PublishError>;

    /// Publishes `run.hubstream_sync` to the GDBS queue with `{ticketId}` as
    /// its sole positional argument.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] on broker failure. Callers are expected to
    /// log and swallow this error rather than fail the originating RPC.
    fn publish_hubstream_sync(&self, ticket_id: &TicketId) -> Result<(), PublishError>;
}
