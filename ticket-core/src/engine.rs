// ticket-core/src/engine.rs
// ============================================================================
// Module: Ticket Engine
// Description: Orchestrates CreateTicket, UpdateTicket, GetTicket, GetTickets,
//              and CheckDuplicate against the backend adapter, incident store,
//              and task publisher.
// Purpose: Own the exact ordering and partial-failure semantics the RPC
//          boundary depends on (§4.5, §7).
// Dependencies: crate::{backend, interfaces, model, policy}
// ============================================================================

//! ## Overview
//! The ticket engine is the single canonical execution path for every
//! admission and lifecycle operation. It is generic over the three injected
//! capabilities ([`BackendAdapter`], [`IncidentStore`], [`TaskPublisher`]) so
//! the same ordering and error semantics apply regardless of which concrete
//! adapters a deployment wires in. Side effects within a single call happen
//! in the exact order documented on each method; across concurrent calls no
//! ordering is guaranteed (§5).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::backend::PaginationLinks;
use crate::backend::create_param_query;
use crate::backend::create_pagination_links;
use crate::backend::create_post_payload;
use crate::backend::create_url_parameters;
use crate::interfaces::BackendAdapter;
use crate::interfaces::BackendError;
use crate::interfaces::IncidentPatch;
use crate::interfaces::IncidentProjection;
use crate::interfaces::IncidentStore;
use crate::interfaces::PublishError;
use crate::interfaces::StoreError;
use crate::interfaces::TaskPublisher;
use crate::model::Evidence;
use crate::model::identifiers::ReporterId;
use crate::model::identifiers::Source;
use crate::model::identifiers::TicketId;
use crate::model::incident::EmailAck;
use crate::model::mapping::TICKET_TABLE_NAME;
use crate::model::ticket::CreateTicketArgs;
use crate::model::ticket::ReporterTicketView;
use crate::model::ticket::TicketType;
use crate::model::ticket::UpdateTicketArgs;
use crate::model::ticket::now;
use crate::policy;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Environment-scoped engine configuration (§4.6, §6 environment variables).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Reporter IDs that bypass the domain cap and trigger retroactive
    /// `abuseVerified` flagging on duplicate-suppressed originals.
    pub trusted_reporters: BTreeSet<ReporterId>,
    /// Reporter IDs that bypass the domain cap unconditionally; expected to
    /// be a superset of `trusted_reporters`.
    pub exempt_reporters: BTreeSet<ReporterId>,
    /// Environment-configured user-generated domain names, merged at call
    /// time with the store's lazily-loaded blocklist set.
    pub user_generated_domains: BTreeSet<String>,
    /// `DATABASE_IMPACTED`: when true, local persistence and queue
    /// publishing are suppressed on every write path (§7).
    pub degraded_mode: bool,
    /// Remote table name for abuse tickets (defaults to `u_dcu_ticket`).
    pub ticket_table: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trusted_reporters: BTreeSet::new(),
            exempt_reporters: BTreeSet::new(),
            user_generated_domains: BTreeSet::new(),
            degraded_mode: false,
            ticket_table: TICKET_TABLE_NAME.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced to the RPC boundary (§7).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad ticket type, missing/unsupported close reason, or empty source.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Ticket does not exist for `UpdateTicket`/`GetTicket`.
    #[error("not found: {0}")]
    NotFound(String),
    /// An open duplicate ticket already exists for this source.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// The per-domain admission cap has been reached.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
    /// `UpdateTicket` (or another write path) is unavailable in degraded mode.
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// Remote backend or incident store failure.
    #[error("internal: {0}")]
    Internal(String),
}

impl From<BackendError> for EngineError {
    fn from(error: BackendError) -> Self {
        Self::Internal(error.to_string())
    }
}

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        Self::Internal(error.to_string())
    }
}

// ============================================================================
// SECTION: Request/Result Types
// ============================================================================

/// Filter and pagination inputs for `GetTickets` (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetTicketsArgs {
    /// Page size.
    pub limit: Option<u64>,
    /// Page offset.
    pub offset: Option<u64>,
    /// Inclusive lower bound on `createdAt` (`YYYY-MM-DD`).
    pub created_start: Option<String>,
    /// Inclusive upper bound on `createdAt` (`YYYY-MM-DD`).
    pub created_end: Option<String>,
    /// Restrict to tickets with this closed state.
    pub closed: Option<bool>,
    /// Restrict to tickets reported by this reporter.
    pub reporter: Option<ReporterId>,
}

/// Result of `GetTickets`: ticket identifiers plus optional pagination links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetTicketsResult {
    /// Matching ticket identifiers, in backend order.
    pub ticket_ids: Vec<TicketId>,
    /// Pagination metadata, present when the backend reported a total count.
    pub pagination: Option<PaginationLinks>,
}

// ============================================================================
// SECTION: Ticket Engine
// ============================================================================

/// Orchestrates ticket admission and lifecycle operations.
pub struct TicketEngine<B, S, T> {
    /// Remote ticketing backend adapter.
    backend: B,
    /// Local incident store adapter.
    store: S,
    /// Broker task publisher.
    publisher: T,
    /// Reporter classes, user-generated domains, and degraded-mode flag.
    config: EngineConfig,
}

impl<B, S, T> TicketEngine<B, S, T>
where
    B: BackendAdapter,
    S: IncidentStore,
    T: TaskPublisher,
{
    /// Builds a new ticket engine from its injected capabilities.
    pub fn new(backend: B, store: S, publisher: T, config: EngineConfig) -> Self {
        Self {
            backend,
            store,
            publisher,
            config,
        }
    }

    // ------------------------------------------------------------------
    // CreateTicket
    // ------------------------------------------------------------------

    /// Creates a new abuse ticket, applying duplicate detection and the
    /// per-domain admission cap before persisting to the remote backend and
    /// (outside degraded mode) the local incident store (§4.5).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] for an unsupported type,
    /// [`EngineError::AlreadyExists`] for an open duplicate,
    /// [`EngineError::ResourceExhausted`] when the domain cap is reached, and
    /// [`EngineError::Internal`] on backend or store failure.
    #[allow(clippy::too_many_lines, reason = "single linear ordered flow per §4.5/§5")]
    pub fn create_ticket(&self, args: CreateTicketArgs) -> Result<TicketId, EngineError> {
        if !policy::is_supported_type(args.r#type) {
            return Err(EngineError::InvalidArgument("unsupported ticket type".to_string()));
        }
        // Safety: checked above.
        let ticket_type = args.r#type.unwrap_or(TicketType::Content);

        let reclassified_from = args
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get("reclassified_from"))
            .and_then(Value::as_str)
            .map(TicketId::from);

        let source = args
            .source
            .clone()
            .ok_or_else(|| EngineError::InvalidArgument("source is required".to_string()))?;

        let (is_duplicate, duplicate_ids) =
            self.check_duplicate(&source, reclassified_from.as_ref())?;

        if is_duplicate {
            if !self.config.degraded_mode {
                if let Some(reporter_email) = &args.reporter_email {
                    self.store.add_email_ack(&EmailAck {
                        source: source.as_str().to_string(),
                        email: reporter_email.clone(),
                        created: now(),
                    })?;
                } else if policy::is_trusted(args.reporter.as_ref(), &self.config.trusted_reporters)
                    && !duplicate_ids.is_empty()
                {
                    for duplicate_id in &duplicate_ids {
                        self.store.update_incident(
                            duplicate_id,
                            &IncidentPatch {
                                abuse_verified: Some(true),
                            },
                        )?;
                    }
                }
            }
            return Err(EngineError::AlreadyExists(format!(
                "existing open ticket for source {}",
                source.as_str()
            )));
        }

        let is_trusted = policy::is_trusted(args.reporter.as_ref(), &self.config.trusted_reporters);

        if !self.config.degraded_mode && !is_trusted {
            let store_domains = self.user_gen_domains();
            let cap_reached = policy::domain_cap_reached(
                &self.store,
                ticket_type,
                args.reporter.as_ref(),
                args.source_sub_domain.as_deref(),
                args.source_domain_or_ip.as_deref(),
                &self.config.exempt_reporters,
                &store_domains,
            )?;
            if cap_reached {
                return Err(EngineError::ResourceExhausted(
                    "per-domain admission cap reached".to_string(),
                ));
            }
        }

        let canonical = build_create_payload(&args, ticket_type);
        let post_body = create_post_payload(&canonical);
        let path = format!("/{}", self.config.ticket_table);
        let response = self.backend.post(&path, Value::Object(post_body))?;
        if response.status != 201 {
            return Err(EngineError::Internal(format!(
                "create ticket failed with status {}",
                response.status
            )));
        }
        let ticket_id = extract_u_number(&response.body)
            .ok_or_else(|| EngineError::Internal("create response missing u_number".to_string()))?;

        if !self.config.degraded_mode {
            let evidence = args.info.is_some().then_some(Evidence {
                snow: true,
            });
            let projection = IncidentProjection {
                ticket_id: ticket_id.clone(),
                r#type: ticket_type,
                source: args.source.as_ref().map(|value| value.as_str().to_string()),
                source_domain_or_ip: args.source_domain_or_ip.clone(),
                source_sub_domain: args.source_sub_domain.clone(),
                target: args.target.clone(),
                proxy: args.proxy.clone(),
                reporter: args.reporter.as_ref().map(ToString::to_string),
                metadata: args.metadata.clone(),
                evidence,
                abuse_verified: is_trusted.then_some(true),
            };
            self.store.add_incident(&ticket_id, &projection)?;
            if let Some(reporter_email) = &args.reporter_email {
                self.store.add_email_ack(&EmailAck {
                    source: source.as_str().to_string(),
                    email: reporter_email.clone(),
                    created: now(),
                })?;
            }
            if let Err(error) = self.publisher.publish_process(&projection) {
                log_publish_failure(&error);
            }
        }

        Ok(ticket_id)
    }

    // ------------------------------------------------------------------
    // UpdateTicket
    // ------------------------------------------------------------------

    /// Updates or closes an existing ticket (§4.5).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] in degraded mode,
    /// [`EngineError::InvalidArgument`] for a missing/unsupported close
    /// reason, [`EngineError::NotFound`] when the ticket cannot be resolved,
    /// and [`EngineError::Internal`] on backend or store failure.
    pub fn update_ticket(&self, args: UpdateTicketArgs) -> Result<(), EngineError> {
        if self.config.degraded_mode {
            return Err(EngineError::Unavailable(
                "update is unavailable while the database is impacted".to_string(),
            ));
        }

        if args.closed == Some(true) {
            if args.close_reason.is_none() {
                return Err(EngineError::InvalidArgument(
                    "close_reason is required when closing a ticket".to_string(),
                ));
            }
            if !policy::is_supported_closure(args.close_reason) {
                return Err(EngineError::InvalidArgument(
                    "close_reason is not a supported closure reason".to_string(),
                ));
            }
        }

        let sys_id = self.resolve_sys_id(&args.ticket_id)?;

        let mut canonical = Map::new();
        if let Some(closed) = args.closed {
            canonical.insert("closed".to_string(), Value::String(closed.to_string()));
        }
        if let Some(close_reason) = args.close_reason {
            canonical.insert(
                "close_reason".to_string(),
                Value::String(serde_json::to_value(close_reason).map_or_else(
                    |_| String::new(),
                    |value| value.as_str().unwrap_or_default().to_string(),
                )),
            );
        }
        if let Some(target) = &args.target {
            canonical.insert("target".to_string(), Value::String(target.clone()));
        }
        if let Some(ticket_type) = args.r#type {
            canonical.insert("type".to_string(), serde_json::to_value(ticket_type).unwrap_or(Value::Null));
        }
        let post_body = create_post_payload(&canonical);

        let path = format!("/{}/{sys_id}", self.config.ticket_table);
        let response = self.backend.patch(&path, Value::Object(post_body))?;
        if response.status != 200 {
            return Err(EngineError::Internal(format!(
                "update ticket failed with status {}",
                response.status
            )));
        }

        if args.closed == Some(true) {
            // Safety: checked above that close_reason is present and supported.
            if let Some(close_reason) = args.close_reason {
                self.store.close_incident(&args.ticket_id, close_reason)?;
            }
        }

        if let Err(error) = self.publisher.publish_hubstream_sync(&args.ticket_id) {
            log_publish_failure(&error);
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // GetTickets
    // ------------------------------------------------------------------

    /// Returns a paginated list of ticket identifiers matching `args` (§4.5).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] when the backend returns an empty
    /// result set, and [`EngineError::Internal`] on a non-200 response or
    /// backend failure.
    pub fn get_tickets(&self, args: GetTicketsArgs) -> Result<GetTicketsResult, EngineError> {
        let mut canonical = Map::new();
        canonical.insert("sysparm_fields".to_string(), Value::String("u_number".to_string()));
        if let Some(limit) = args.limit {
            canonical.insert("limit".to_string(), Value::Number(limit.into()));
        }
        if let Some(offset) = args.offset {
            canonical.insert("offset".to_string(), Value::Number(offset.into()));
        }
        if let Some(closed) = args.closed {
            canonical.insert("closed".to_string(), Value::String(closed.to_string()));
        }
        if let Some(reporter) = &args.reporter {
            canonical.insert("reporter".to_string(), Value::String(reporter.to_string()));
        }

        let param_query =
            create_param_query(args.created_start.as_deref(), args.created_end.as_deref());
        let url = create_url_parameters(&canonical) + &param_query;
        let path = format!("/{}{url}", self.config.ticket_table);
        let response = self.backend.get(&path)?;

        if response.status != 200 {
            return Err(EngineError::Internal(format!(
                "get tickets failed with status {}",
                response.status
            )));
        }

        let rows = extract_result_array(&response.body);
        if rows.is_empty() {
            return Err(EngineError::NotFound("no tickets matched the query".to_string()));
        }

        let ticket_ids =
            rows.iter().filter_map(|row| row.get("u_number")).filter_map(Value::as_str).map(TicketId::from).collect();

        let pagination = response.total_count.and_then(|total| {
            let limit = args.limit.unwrap_or(u64::try_from(rows.len()).unwrap_or(1)).max(1);
            let offset = args.offset.unwrap_or(0);
            Some(create_pagination_links(offset, limit, total))
        });

        Ok(GetTicketsResult {
            ticket_ids,
            pagination,
        })
    }

    // ------------------------------------------------------------------
    // GetTicket
    // ------------------------------------------------------------------

    /// Retrieves a single ticket, optionally scoped to a reporter (§4.5).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] when the ticket does not exist and
    /// [`EngineError::Internal`] on backend failure.
    pub fn get_ticket(
        &self,
        ticket_id: &TicketId,
        reporter: Option<&ReporterId>,
    ) -> Result<ReporterTicketView, EngineError> {
        let mut path =
            format!("/{}?sysparam_limit=1&u_number={ticket_id}", self.config.ticket_table);
        if let Some(reporter) = reporter {
            path.push_str(&format!("&u_reporter={reporter}"));
        }

        let response = self.backend.get(&path)?;
        if response.status != 200 {
            return Err(EngineError::NotFound(format!("ticket {ticket_id} not found")));
        }

        let rows = extract_result_array(&response.body);
        let row = rows.first().ok_or_else(|| EngineError::NotFound(format!("ticket {ticket_id} not found")))?;

        Ok(project_reporter_view(ticket_id, row))
    }

    // ------------------------------------------------------------------
    // CheckDuplicate
    // ------------------------------------------------------------------

    /// Checks whether an open ticket already exists for `source` (§4.5).
    ///
    /// `excluded`, when set, removes a matching ticket id from the result —
    /// used by `CreateTicket` to treat a `reclassified_from` ticket as
    /// non-duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] when `source` is empty and
    /// [`EngineError::Internal`] on backend failure.
    pub fn check_duplicate(
        &self,
        source: &Source,
        excluded: Option<&TicketId>,
    ) -> Result<(bool, Vec<TicketId>), EngineError> {
        if source.is_empty() {
            return Err(EngineError::InvalidArgument("source must not be empty".to_string()));
        }

        let mut canonical = Map::new();
        canonical.insert("closed".to_string(), Value::String("false".to_string()));
        canonical.insert("source".to_string(), Value::String(source.as_str().to_string()));
        let url = create_url_parameters(&canonical);
        let path = format!("/{}{url}", self.config.ticket_table);

        let response = self.backend.get(&path)?;
        if response.status != 200 {
            return Err(EngineError::Internal(format!(
                "duplicate check failed with status {}",
                response.status
            )));
        }

        let rows = extract_result_array(&response.body);
        let duplicate_ids: Vec<TicketId> = rows
            .iter()
            .filter_map(|row| row.get("u_number"))
            .filter_map(Value::as_str)
            .map(TicketId::from)
            .filter(|id| Some(id) != excluded)
            .collect();

        Ok((!duplicate_ids.is_empty(), duplicate_ids))
    }

    /// Resolves the remote `sys_id` backing `ticket_id`, or `NotFound`.
    fn resolve_sys_id(&self, ticket_id: &TicketId) -> Result<String, EngineError> {
        let path = format!("/{}?sysparam_limit=1&u_number={ticket_id}", self.config.ticket_table);
        let response = self.backend.get(&path)?;
        if response.status != 200 {
            return Err(EngineError::NotFound(format!("ticket {ticket_id} not found")));
        }
        let rows = extract_result_array(&response.body);
        rows.first()
            .and_then(|row| row.get("sys_id"))
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| EngineError::NotFound(format!("ticket {ticket_id} not found")))
    }

    /// Merges the environment-configured user-generated domains with the
    /// incident store's lazily-loaded blocklist set (§4.2).
    ///
    /// A store load failure is logged and treated as an empty contribution
    /// rather than propagated (§4.2, §7).
    fn user_gen_domains(&self) -> BTreeSet<String> {
        let mut domains = self.config.user_generated_domains.clone();
        match self.store.user_gen_domains() {
            Ok(store_domains) => domains.extend(store_domains),
            Err(error) => {
                tracing::warn!(error = %error, "failed to load user-generated domains; treating as empty");
            }
        }
        domains
    }
}

// ============================================================================
// SECTION: Helper Functions
// ============================================================================

/// Builds the canonical field map sent to the remote backend on create.
///
/// `reporterEmail` is deliberately excluded: it must never reach the remote
/// backend (§4.5 step 2).
fn build_create_payload(args: &CreateTicketArgs, ticket_type: TicketType) -> Map<String, Value> {
    let mut canonical = Map::new();
    canonical.insert("type".to_string(), serde_json::to_value(ticket_type).unwrap_or(Value::Null));
    if let Some(source) = &args.source {
        canonical.insert("source".to_string(), Value::String(source.as_str().to_string()));
    }
    if let Some(domain) = &args.source_domain_or_ip {
        canonical.insert("sourceDomainOrIp".to_string(), Value::String(domain.clone()));
    }
    if let Some(target) = &args.target {
        canonical.insert("target".to_string(), Value::String(target.clone()));
    }
    if let Some(proxy) = &args.proxy {
        canonical.insert("proxy".to_string(), Value::String(proxy.clone()));
    }
    if let Some(reporter) = &args.reporter {
        canonical.insert("reporter".to_string(), Value::String(reporter.to_string()));
    }
    if let Some(info) = &args.info {
        canonical.insert("info".to_string(), Value::String(info.clone()));
    }
    if let Some(info_url) = &args.info_url {
        canonical.insert("infoUrl".to_string(), Value::String(info_url.clone()));
    }
    if let Some(intentional) = args.intentional {
        canonical.insert("intentional".to_string(), Value::Bool(intentional));
    }
    canonical
}

/// Extracts `result.u_number` from a single-item backend response body.
fn extract_u_number(body: &Value) -> Option<TicketId> {
    body.get("result")?.get("u_number")?.as_str().map(TicketId::from)
}

/// Extracts the `result` array from a list-shaped backend response body.
///
/// Treats both an array result and a single object result as a (possibly
/// singleton) row list, since `GetTicket` and `CheckDuplicate` share this
/// helper with `GetTickets`.
fn extract_result_array(body: &Value) -> Vec<Value> {
    match body.get("result") {
        Some(Value::Array(rows)) => rows.clone(),
        Some(single @ Value::Object(_)) => vec![single.clone()],
        _ => Vec::new(),
    }
}

/// Projects a raw remote row into the reporter-facing ticket view (§4.5).
fn project_reporter_view(ticket_id: &TicketId, row: &Value) -> ReporterTicketView {
    let closed = row
        .get("u_closed")
        .and_then(Value::as_str)
        .is_some_and(|value| value.to_lowercase().contains("true"));

    ReporterTicketView {
        ticket_id: ticket_id.clone(),
        reporter: string_field(row, "u_reporter"),
        source: string_field(row, "u_source"),
        source_domain_or_ip: string_field(row, "u_source_domain_or_ip"),
        closed,
        created_at: string_field(row, "sys_created_on"),
        closed_at: string_field(row, "u_closed_date"),
        r#type: string_field(row, "u_type"),
        target: string_field(row, "u_target"),
        proxy: string_field(row, "u_proxy_ip"),
    }
}

/// Reads a string field from a raw JSON row.
fn string_field(row: &Value, key: &str) -> Option<String> {
    row.get(key).and_then(Value::as_str).map(ToString::to_string)
}

/// Logs a swallowed task-publish failure (§4.3, §7): a failure to enqueue
/// must never fail the originating RPC.
fn log_publish_failure(error: &PublishError) {
    tracing::warn!(error = %error, "task publish failed; continuing without retry");
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use serde_json::json;

    use super::*;
    use crate::interfaces::IncidentQuery;
    use crate::interfaces::SubdomainOrDomain;
    use crate::model::CloseReason;
    use crate::model::Incident;
    use crate::model::PhishstoryStatus;

    // ------------------------------------------------------------------
    // Fake adapters
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct FakeBackend {
        get_responses: RefCell<VecDeque<Result<RemoteResponse, BackendError>>>,
        post_responses: RefCell<VecDeque<Result<RemoteResponse, BackendError>>>,
        patch_responses: RefCell<VecDeque<Result<RemoteResponse, BackendError>>>,
    }

    impl FakeBackend {
        fn queue_get(self, response: Result<RemoteResponse, BackendError>) -> Self {
            self.get_responses.borrow_mut().push_back(response);
            self
        }

        fn queue_post(self, response: Result<RemoteResponse, BackendError>) -> Self {
            self.post_responses.borrow_mut().push_back(response);
            self
        }
    }

    impl BackendAdapter for FakeBackend {
        fn get(&self, _path: &str) -> Result<RemoteResponse, BackendError> {
            self.get_responses.borrow_mut().pop_front().expect("unexpected extra get call")
        }

        fn post(&self, _path: &str, _body: Value) -> Result<RemoteResponse, BackendError> {
            self.post_responses.borrow_mut().pop_front().expect("unexpected extra post call")
        }

        fn patch(&self, _path: &str, _body: Value) -> Result<RemoteResponse, BackendError> {
            self.patch_responses.borrow_mut().pop_front().expect("unexpected extra patch call")
        }
    }

    #[derive(Default)]
    struct FakeStore {
        incidents: RefCell<Vec<Incident>>,
        email_acks: RefCell<Vec<EmailAck>>,
        user_gen: BTreeSet<String>,
    }

    impl FakeStore {
        fn with_incidents(incidents: Vec<Incident>) -> Self {
            Self {
                incidents: RefCell::new(incidents),
                ..Self::default()
            }
        }
    }

    impl IncidentStore for FakeStore {
        fn add_incident(&self, ticket_id: &TicketId, doc: &IncidentProjection) -> Result<(), StoreError> {
            self.incidents.borrow_mut().push(Incident {
                ticket_id: ticket_id.clone(),
                r#type: doc.r#type,
                source: doc.source.clone(),
                source_domain_or_ip: doc.source_domain_or_ip.clone(),
                source_sub_domain: doc.source_sub_domain.clone(),
                target: doc.target.clone(),
                proxy: doc.proxy.clone(),
                reporter: doc.reporter.clone(),
                metadata: doc.metadata.clone(),
                evidence: doc.evidence,
                abuse_verified: doc.abuse_verified,
                phishstory_status: PhishstoryStatus::Open,
                close_reason: None,
                closed_at: None,
            });
            Ok(())
        }

        fn update_incident(&self, ticket_id: &TicketId, patch: &IncidentPatch) -> Result<(), StoreError> {
            let mut incidents = self.incidents.borrow_mut();
            if let Some(incident) = incidents.iter_mut().find(|incident| &incident.ticket_id == ticket_id)
                && let Some(abuse_verified) = patch.abuse_verified
            {
                incident.abuse_verified = Some(abuse_verified);
            }
            Ok(())
        }

        fn close_incident(&self, ticket_id: &TicketId, close_reason: CloseReason) -> Result<(), StoreError> {
            let mut incidents = self.incidents.borrow_mut();
            if let Some(incident) = incidents.iter_mut().find(|incident| &incident.ticket_id == ticket_id) {
                incident.phishstory_status = PhishstoryStatus::Closed;
                incident.close_reason = Some(close_reason);
            }
            Ok(())
        }

        fn get_incident(&self, ticket_id: &TicketId) -> Result<Option<Incident>, StoreError> {
            Ok(self.incidents.borrow().iter().find(|incident| &incident.ticket_id == ticket_id).cloned())
        }

        fn find_incidents(&self, query: &IncidentQuery, limit: usize) -> Result<Vec<Incident>, StoreError> {
            let incidents = self.incidents.borrow();
            let matches = incidents
                .iter()
                .filter(|incident| {
                    if query.exclude_closed && !incident.phishstory_status.counts_as_open() {
                        return false;
                    }
                    if let Some(ticket_type) = query.r#type
                        && incident.r#type != ticket_type
                    {
                        return false;
                    }
                    match &query.subdomain_or_domain {
                        Some(SubdomainOrDomain::Subdomain {
                            www_form,
                            bare_form,
                        }) => {
                            incident.source_sub_domain.as_deref() == Some(www_form.as_str())
                                || incident.source_sub_domain.as_deref() == Some(bare_form.as_str())
                        }
                        Some(SubdomainOrDomain::Domain(domain)) => {
                            incident.source_domain_or_ip.as_deref() == Some(domain.as_str())
                        }
                        None => true,
                    }
                })
                .take(limit)
                .cloned()
                .collect();
            Ok(matches)
        }

        fn add_email_ack(&self, ack: &EmailAck) -> Result<(), StoreError> {
            self.email_acks.borrow_mut().push(ack.clone());
            Ok(())
        }

        fn user_gen_domains(&self) -> Result<BTreeSet<String>, StoreError> {
            Ok(self.user_gen.clone())
        }
    }

    #[derive(Default)]
    struct FakePublisher {
        processed: RefCell<Vec<IncidentProjection>>,
        hubstream_synced: RefCell<Vec<TicketId>>,
    }

    impl TaskPublisher for FakePublisher {
        fn publish_process(&self, projection: &IncidentProjection) -> Result<(), PublishError> {
            self.processed.borrow_mut().push(projection.clone());
            Ok(())
        }

        fn publish_hubstream_sync(&self, ticket_id: &TicketId) -> Result<(), PublishError> {
            self.hubstream_synced.borrow_mut().push(ticket_id.clone());
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    fn no_duplicates() -> Result<RemoteResponse, BackendError> {
        Ok(RemoteResponse {
            status: 200,
            total_count: None,
            body: json!({"result": []}),
        })
    }

    fn open_duplicate(ticket_id: &str) -> Result<RemoteResponse, BackendError> {
        Ok(RemoteResponse {
            status: 200,
            total_count: None,
            body: json!({"result": [{"u_number": ticket_id}]}),
        })
    }

    fn created(ticket_id: &str) -> Result<RemoteResponse, BackendError> {
        Ok(RemoteResponse {
            status: 201,
            total_count: None,
            body: json!({"result": {"u_number": ticket_id}}),
        })
    }

    fn open_incident(ticket_id: &str, r#type: TicketType, subdomain: &str, domain: &str) -> Incident {
        Incident {
            ticket_id: TicketId::from(ticket_id),
            r#type,
            source: None,
            source_domain_or_ip: Some(domain.to_string()),
            source_sub_domain: Some(subdomain.to_string()),
            target: None,
            proxy: None,
            reporter: None,
            metadata: None,
            evidence: None,
            abuse_verified: None,
            phishstory_status: PhishstoryStatus::Open,
            close_reason: None,
            closed_at: None,
        }
    }

    fn create_args(r#type: TicketType, source: &str, subdomain: &str, domain: &str) -> CreateTicketArgs {
        CreateTicketArgs {
            r#type: Some(r#type),
            source: Some(Source::from(source)),
            source_domain_or_ip: Some(domain.to_string()),
            source_sub_domain: Some(subdomain.to_string()),
            info: Some("supporting details".to_string()),
            ..CreateTicketArgs::default()
        }
    }

    // ------------------------------------------------------------------
    // CreateTicket: happy path ordering
    // ------------------------------------------------------------------

    #[test]
    fn happy_path_create_ticket_persists_incident_and_publishes() {
        let backend = FakeBackend::default().queue_get(no_duplicates()).queue_post(created("DCU1"));
        let store = FakeStore::default();
        let publisher = FakePublisher::default();
        let engine = TicketEngine::new(backend, store, publisher, EngineConfig::default());

        let ticket_id = engine
            .create_ticket(create_args(TicketType::Phishing, "http://a.example/x", "a.example", "a.example"))
            .expect("create must succeed");

        assert_eq!(ticket_id, TicketId::from("DCU1"));
        let incidents = engine.store.incidents.borrow();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].ticket_id, TicketId::from("DCU1"));
        assert_eq!(incidents[0].evidence.map(|evidence| evidence.snow), Some(true));
        assert_eq!(engine.publisher.processed.borrow().len(), 1);
        assert!(engine.store.email_acks.borrow().is_empty());
    }

    // ------------------------------------------------------------------
    // CreateTicket: degraded mode
    // ------------------------------------------------------------------

    #[test]
    fn degraded_mode_skips_local_persistence_and_publish() {
        let backend = FakeBackend::default().queue_get(no_duplicates()).queue_post(created("DCU2"));
        let store = FakeStore::default();
        let publisher = FakePublisher::default();
        let config = EngineConfig {
            degraded_mode: true,
            ..EngineConfig::default()
        };
        let engine = TicketEngine::new(backend, store, publisher, config);

        let ticket_id = engine
            .create_ticket(create_args(TicketType::Phishing, "http://b.example/x", "b.example", "b.example"))
            .expect("create must still reach the remote backend in degraded mode");

        assert_eq!(ticket_id, TicketId::from("DCU2"));
        assert!(engine.store.incidents.borrow().is_empty());
        assert!(engine.publisher.processed.borrow().is_empty());
    }

    // ------------------------------------------------------------------
    // CreateTicket: trusted-duplicate branches
    // ------------------------------------------------------------------

    #[test]
    fn trusted_duplicate_without_email_flags_existing_incident_as_abuse_verified() {
        let backend = FakeBackend::default().queue_get(open_duplicate("DCU9"));
        let store = FakeStore::with_incidents(vec![open_incident(
            "DCU9",
            TicketType::Phishing,
            "c.example",
            "c.example",
        )]);
        let publisher = FakePublisher::default();
        let config = EngineConfig {
            trusted_reporters: [ReporterId::new("TR1")].into_iter().collect(),
            ..EngineConfig::default()
        };
        let engine = TicketEngine::new(backend, store, publisher, config);

        let mut args = create_args(TicketType::Phishing, "http://c.example/x", "c.example", "c.example");
        args.reporter = Some(ReporterId::new("TR1"));

        let error = engine.create_ticket(args).expect_err("duplicate must be rejected");
        assert!(matches!(error, EngineError::AlreadyExists(_)));

        let incidents = engine.store.incidents.borrow();
        assert_eq!(incidents[0].abuse_verified, Some(true));
        assert!(engine.store.email_acks.borrow().is_empty());
    }

    #[test]
    fn trusted_duplicate_with_email_records_acknowledgement_instead_of_flagging() {
        let backend = FakeBackend::default().queue_get(open_duplicate("DCU9"));
        let store = FakeStore::with_incidents(vec![open_incident(
            "DCU9",
            TicketType::Phishing,
            "d.example",
            "d.example",
        )]);
        let publisher = FakePublisher::default();
        let config = EngineConfig {
            trusted_reporters: [ReporterId::new("TR1")].into_iter().collect(),
            ..EngineConfig::default()
        };
        let engine = TicketEngine::new(backend, store, publisher, config);

        let mut args = create_args(TicketType::Phishing, "http://d.example/x", "d.example", "d.example");
        args.reporter = Some(ReporterId::new("TR1"));
        args.reporter_email = Some("reporter@example.com".to_string());

        let error = engine.create_ticket(args).expect_err("duplicate must be rejected");
        assert!(matches!(error, EngineError::AlreadyExists(_)));

        assert_eq!(engine.store.incidents.borrow()[0].abuse_verified, None);
        let acks = engine.store.email_acks.borrow();
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].email, "reporter@example.com");
    }

    // ------------------------------------------------------------------
    // CreateTicket: domain cap
    // ------------------------------------------------------------------

    #[test]
    fn domain_cap_reached_blocks_creation_for_non_exempt_reporter() {
        let saturating: Vec<Incident> = (0..5)
            .map(|index| open_incident(&format!("DCU{index}"), TicketType::Phishing, "e.example", "e.example"))
            .collect();
        let backend = FakeBackend::default().queue_get(no_duplicates());
        let store = FakeStore::with_incidents(saturating);
        let publisher = FakePublisher::default();
        let engine = TicketEngine::new(backend, store, publisher, EngineConfig::default());

        let error = engine
            .create_ticket(create_args(TicketType::Phishing, "http://e.example/new", "e.example", "e.example"))
            .expect_err("cap must reject the sixth open incident");

        assert!(matches!(error, EngineError::ResourceExhausted(_)));
    }

    #[test]
    fn content_type_bypasses_the_domain_cap() {
        let saturating: Vec<Incident> = (0..5)
            .map(|index| open_incident(&format!("DCU{index}"), TicketType::Content, "f.example", "f.example"))
            .collect();
        let backend = FakeBackend::default().queue_get(no_duplicates()).queue_post(created("DCU99"));
        let store = FakeStore::with_incidents(saturating);
        let publisher = FakePublisher::default();
        let engine = TicketEngine::new(backend, store, publisher, EngineConfig::default());

        let ticket_id = engine
            .create_ticket(create_args(TicketType::Content, "http://f.example/new", "f.example", "f.example"))
            .expect("content type must bypass the domain cap even when saturated");

        assert_eq!(ticket_id, TicketId::from("DCU99"));
    }

    #[test]
    fn exempt_reporter_bypasses_the_domain_cap() {
        let saturating: Vec<Incident> = (0..5)
            .map(|index| open_incident(&format!("DCU{index}"), TicketType::Phishing, "g.example", "g.example"))
            .collect();
        let backend = FakeBackend::default().queue_get(no_duplicates()).queue_post(created("DCU100"));
        let store = FakeStore::with_incidents(saturating);
        let publisher = FakePublisher::default();
        let config = EngineConfig {
            exempt_reporters: [ReporterId::new("EX1")].into_iter().collect(),
            ..EngineConfig::default()
        };
        let engine = TicketEngine::new(backend, store, publisher, config);

        let mut args = create_args(TicketType::Phishing, "http://g.example/new", "g.example", "g.example");
        args.reporter = Some(ReporterId::new("EX1"));

        let ticket_id = engine.create_ticket(args).expect("exempt reporter must bypass the domain cap");

        assert_eq!(ticket_id, TicketId::from("DCU100"));
    }
}
