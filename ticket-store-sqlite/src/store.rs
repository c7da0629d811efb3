// ticket-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Incident Store
// Description: IncidentStore implementation backed by SQLite.
// Purpose: Persist incident projections, email acknowledgements, and the
//          user-generated-domain blocklist (§3, §4.2).
// Dependencies: ticket-core, rusqlite, serde_json, time
// ============================================================================

//! ## Overview
//! One SQLite connection, guarded by a mutex, backs three tables: `incidents`
//! (the local projection keyed by `ticket_id`), `acknowledge_email` (an
//! append-only audit log), and `blacklist` (a category-indexed table the
//! user-generated-domains set is read from). A single connection behind a
//! mutex is sufficient here because every call is a short, synchronous
//! read-modify-write against a small local database (§5) — the batched
//! writer-thread architecture larger deployments use for high-throughput
//! SQLite access would be disproportionate to this adapter's load shape; see
//! `DESIGN.md` for the tradeoff.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Mutex;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use ticket_core::CloseReason;
use ticket_core::Evidence;
use ticket_core::Incident;
use ticket_core::IncidentPatch;
use ticket_core::IncidentProjection;
use ticket_core::IncidentQuery;
use ticket_core::IncidentStore;
use ticket_core::PhishstoryStatus;
use ticket_core::StoreError;
use ticket_core::SubdomainOrDomain;
use ticket_core::TicketId;
use ticket_core::TicketType;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Blocklist category read for the lazily-loaded user-generated-domains set
/// (§3, §4.2). Entries under other categories are ignored.
pub const USER_GENERATED_DOMAIN_CATEGORY: &str = "user_generated_domain";

/// Default SQLite busy timeout, in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for [`SqliteIncidentStore::open`].
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Path to the SQLite database file. `:memory:` is accepted for tests.
    pub path: PathBuf,
    /// Busy timeout applied to the connection, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl SqliteStoreConfig {
    /// Builds a configuration pointing at `path` with the default busy
    /// timeout.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Errors raised while opening or migrating the store.
#[derive(Debug, Error)]
pub enum StoreSetupError {
    /// The database could not be opened.
    #[error("failed to open incident store database: {0}")]
    Open(String),
    /// Schema creation failed.
    #[error("failed to prepare incident store schema: {0}")]
    Migrate(String),
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// SQLite-backed implementation of [`IncidentStore`].
pub struct SqliteIncidentStore {
    connection: Mutex<Connection>,
    user_gen_domains_cache: Mutex<Option<BTreeSet<String>>>,
}

impl SqliteIncidentStore {
    /// Opens (creating if necessary) the incident store database at
    /// `config.path` and ensures its schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreSetupError`] when the database cannot be opened or the
    /// schema cannot be created.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, StoreSetupError> {
        let connection = Connection::open_with_flags(
            &config.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|error| StoreSetupError::Open(error.to_string()))?;

        connection
            .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
            .map_err(|error| StoreSetupError::Open(error.to_string()))?;
        connection
            .pragma_update(None, "journal_mode", "wal")
            .map_err(|error| StoreSetupError::Open(error.to_string()))?;
        connection
            .pragma_update(None, "foreign_keys", "on")
            .map_err(|error| StoreSetupError::Open(error.to_string()))?;

        connection.execute_batch(SCHEMA_SQL).map_err(|error| StoreSetupError::Migrate(error.to_string()))?;

        Ok(Self {
            connection: Mutex::new(connection),
            user_gen_domains_cache: Mutex::new(None),
        })
    }
}

/// Schema for the three collections this adapter fronts (§3, §4.2, §6).
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS incidents (
    ticket_id           TEXT PRIMARY KEY NOT NULL,
    type                TEXT NOT NULL,
    source              TEXT,
    source_domain_or_ip TEXT,
    source_sub_domain   TEXT,
    target              TEXT,
    proxy               TEXT,
    reporter            TEXT,
    metadata_json       TEXT,
    evidence_snow       INTEGER,
    abuse_verified      INTEGER,
    phishstory_status   TEXT NOT NULL,
    close_reason        TEXT,
    closed_at           TEXT
);

CREATE INDEX IF NOT EXISTS idx_incidents_cap_bucket
    ON incidents (type, source_sub_domain, source_domain_or_ip, phishstory_status);

CREATE TABLE IF NOT EXISTS acknowledge_email (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    source  TEXT NOT NULL,
    email   TEXT NOT NULL,
    created TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS blacklist (
    domain   TEXT NOT NULL,
    category TEXT NOT NULL,
    PRIMARY KEY (domain, category)
);
";

// ============================================================================
// SECTION: Enum Codec
// ============================================================================

/// Encodes a unit-carrying enum to its wire string form via its existing
/// `serde` implementation, so the on-disk representation never drifts from
/// the canonical wire vocabulary (§3).
fn encode_enum<T: Serialize>(value: T) -> Result<String, StoreError> {
    serde_json::to_value(value)
        .ok()
        .and_then(|encoded| encoded.as_str().map(str::to_string))
        .ok_or_else(|| StoreError::Invalid("failed to encode enum column".to_string()))
}

/// Decodes a unit-carrying enum from its wire string form.
fn decode_enum<T: DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|error| StoreError::Invalid(format!("failed to decode enum column: {error}")))
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Builds an [`Incident`] from a fully-projected `incidents` row.
#[allow(clippy::too_many_arguments, reason = "mirrors the incidents table's column list 1:1")]
fn row_to_incident(
    ticket_id: String,
    type_raw: String,
    source: Option<String>,
    source_domain_or_ip: Option<String>,
    source_sub_domain: Option<String>,
    target: Option<String>,
    proxy: Option<String>,
    reporter: Option<String>,
    metadata_json: Option<String>,
    evidence_snow: Option<bool>,
    abuse_verified: Option<bool>,
    status_raw: String,
    close_reason_raw: Option<String>,
    closed_at_raw: Option<String>,
) -> Result<Incident, StoreError> {
    let metadata = metadata_json
        .map(|raw| {
            serde_json::from_str::<Map<String, Value>>(&raw)
                .map_err(|error| StoreError::Invalid(format!("invalid metadata_json: {error}")))
        })
        .transpose()?;
    let close_reason = close_reason_raw.map(|raw| decode_enum::<CloseReason>(&raw)).transpose()?;
    let closed_at = closed_at_raw
        .map(|raw| {
            OffsetDateTime::parse(&raw, &Rfc3339)
                .map_err(|error| StoreError::Invalid(format!("invalid closed_at: {error}")))
        })
        .transpose()?;

    Ok(Incident {
        ticket_id: TicketId::from(ticket_id),
        r#type: decode_enum::<TicketType>(&type_raw)?,
        source,
        source_domain_or_ip,
        source_sub_domain,
        target,
        proxy,
        reporter,
        metadata,
        evidence: evidence_snow.map(|snow| Evidence {
            snow,
        }),
        abuse_verified,
        phishstory_status: decode_enum::<PhishstoryStatus>(&status_raw)?,
        close_reason,
        closed_at,
    })
}

const INCIDENT_COLUMNS: &str = "ticket_id, type, source, source_domain_or_ip, source_sub_domain, \
     target, proxy, reporter, metadata_json, evidence_snow, abuse_verified, \
     phishstory_status, close_reason, closed_at";

/// Reads one `incidents` row into an [`Incident`], propagating both SQLite
/// and decode failures as [`StoreError`].
fn read_incident_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Incident, StoreError>> {
    let ticket_id: String = row.get(0)?;
    let type_raw: String = row.get(1)?;
    let source: Option<String> = row.get(2)?;
    let source_domain_or_ip: Option<String> = row.get(3)?;
    let source_sub_domain: Option<String> = row.get(4)?;
    let target: Option<String> = row.get(5)?;
    let proxy: Option<String> = row.get(6)?;
    let reporter: Option<String> = row.get(7)?;
    let metadata_json: Option<String> = row.get(8)?;
    let evidence_snow: Option<bool> = row.get(9)?;
    let abuse_verified: Option<bool> = row.get(10)?;
    let status_raw: String = row.get(11)?;
    let close_reason_raw: Option<String> = row.get(12)?;
    let closed_at_raw: Option<String> = row.get(13)?;

    Ok(row_to_incident(
        ticket_id,
        type_raw,
        source,
        source_domain_or_ip,
        source_sub_domain,
        target,
        proxy,
        reporter,
        metadata_json,
        evidence_snow,
        abuse_verified,
        status_raw,
        close_reason_raw,
        closed_at_raw,
    ))
}

// ============================================================================
// SECTION: IncidentStore Implementation
// ============================================================================

impl IncidentStore for SqliteIncidentStore {
    fn add_incident(&self, ticket_id: &TicketId, doc: &IncidentProjection) -> Result<(), StoreError> {
        let type_raw = encode_enum(doc.r#type)?;
        let metadata_json = doc
            .metadata
            .as_ref()
            .map(|metadata| {
                serde_json::to_string(metadata)
                    .map_err(|error| StoreError::Invalid(format!("failed to encode metadata: {error}")))
            })
            .transpose()?;
        let status_raw = encode_enum(PhishstoryStatus::Open)?;

        let connection = self.connection.lock().map_err(|_| StoreError::Io("store mutex poisoned".to_string()))?;
        connection
            .execute(
                "INSERT INTO incidents (ticket_id, type, source, source_domain_or_ip, source_sub_domain, \
                 target, proxy, reporter, metadata_json, evidence_snow, abuse_verified, phishstory_status) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
                 ON CONFLICT(ticket_id) DO UPDATE SET \
                    type = excluded.type, source = excluded.source, \
                    source_domain_or_ip = excluded.source_domain_or_ip, \
                    source_sub_domain = excluded.source_sub_domain, target = excluded.target, \
                    proxy = excluded.proxy, reporter = excluded.reporter, \
                    metadata_json = excluded.metadata_json, evidence_snow = excluded.evidence_snow, \
                    abuse_verified = excluded.abuse_verified",
                params![
                    ticket_id.as_str(),
                    type_raw,
                    doc.source,
                    doc.source_domain_or_ip,
                    doc.source_sub_domain,
                    doc.target,
                    doc.proxy,
                    doc.reporter,
                    metadata_json,
                    doc.evidence.map(|evidence| evidence.snow),
                    doc.abuse_verified,
                    status_raw,
                ],
            )
            .map_err(|error| StoreError::Io(error.to_string()))?;
        Ok(())
    }

    fn update_incident(&self, ticket_id: &TicketId, patch: &IncidentPatch) -> Result<(), StoreError> {
        let Some(abuse_verified) = patch.abuse_verified else {
            return Ok(());
        };
        let connection = self.connection.lock().map_err(|_| StoreError::Io("store mutex poisoned".to_string()))?;
        connection
            .execute(
                "UPDATE incidents SET abuse_verified = ?1 WHERE ticket_id = ?2",
                params![abuse_verified, ticket_id.as_str()],
            )
            .map_err(|error| StoreError::Io(error.to_string()))?;
        Ok(())
    }

    fn close_incident(&self, ticket_id: &TicketId, close_reason: CloseReason) -> Result<(), StoreError> {
        let close_reason_raw = encode_enum(close_reason)?;
        let status_raw = encode_enum(PhishstoryStatus::Closed)?;
        let closed_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|error| StoreError::Invalid(format!("failed to format closed_at: {error}")))?;

        let connection = self.connection.lock().map_err(|_| StoreError::Io("store mutex poisoned".to_string()))?;
        connection
            .execute(
                "UPDATE incidents SET phishstory_status = ?1, close_reason = ?2, closed_at = ?3 \
                 WHERE ticket_id = ?4",
                params![status_raw, close_reason_raw, closed_at, ticket_id.as_str()],
            )
            .map_err(|error| StoreError::Io(error.to_string()))?;
        Ok(())
    }

    fn get_incident(&self, ticket_id: &TicketId) -> Result<Option<Incident>, StoreError> {
        let connection = self.connection.lock().map_err(|_| StoreError::Io("store mutex poisoned".to_string()))?;
        let sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE ticket_id = ?1");
        let incident = connection
            .query_row(&sql, params![ticket_id.as_str()], read_incident_row)
            .optional()
            .map_err(|error| StoreError::Io(error.to_string()))?
            .transpose()?;
        Ok(incident)
    }

    fn find_incidents(&self, query: &IncidentQuery, limit: usize) -> Result<Vec<Incident>, StoreError> {
        let mut sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE 1 = 1");
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if query.exclude_closed {
            let status_raw = encode_enum(PhishstoryStatus::Closed)?;
            sql.push_str(" AND phishstory_status != ?");
            bound.push(Box::new(status_raw));
        }
        if let Some(ticket_type) = query.r#type {
            let type_raw = encode_enum(ticket_type)?;
            sql.push_str(" AND type = ?");
            bound.push(Box::new(type_raw));
        }
        match &query.subdomain_or_domain {
            Some(SubdomainOrDomain::Subdomain {
                www_form,
                bare_form,
            }) => {
                sql.push_str(" AND (source_sub_domain = ? OR source_sub_domain = ?)");
                bound.push(Box::new(www_form.clone()));
                bound.push(Box::new(bare_form.clone()));
            }
            Some(SubdomainOrDomain::Domain(domain)) => {
                sql.push_str(" AND source_domain_or_ip = ?");
                bound.push(Box::new(domain.clone()));
            }
            None => {}
        }
        sql.push_str(" LIMIT ?");
        bound.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));

        let connection = self.connection.lock().map_err(|_| StoreError::Io("store mutex poisoned".to_string()))?;
        let mut statement = connection.prepare(&sql).map_err(|error| StoreError::Io(error.to_string()))?;
        let params_ref: Vec<&dyn rusqlite::ToSql> = bound.iter().map(AsRef::as_ref).collect();
        let rows = statement
            .query_map(params_ref.as_slice(), read_incident_row)
            .map_err(|error| StoreError::Io(error.to_string()))?;

        let mut incidents = Vec::new();
        for row in rows {
            let incident = row.map_err(|error| StoreError::Io(error.to_string()))?;
            incidents.push(incident?);
        }
        Ok(incidents)
    }

    fn add_email_ack(&self, ack: &ticket_core::EmailAck) -> Result<(), StoreError> {
        let created = ack
            .created
            .format(&Rfc3339)
            .map_err(|error| StoreError::Invalid(format!("failed to format created: {error}")))?;
        let connection = self.connection.lock().map_err(|_| StoreError::Io("store mutex poisoned".to_string()))?;
        connection
            .execute(
                "INSERT INTO acknowledge_email (source, email, created) VALUES (?1, ?2, ?3)",
                params![ack.source, ack.email, created],
            )
            .map_err(|error| StoreError::Io(error.to_string()))?;
        Ok(())
    }

    fn user_gen_domains(&self) -> Result<BTreeSet<String>, StoreError> {
        if let Ok(cache) = self.user_gen_domains_cache.lock()
            && let Some(cached) = cache.as_ref()
        {
            return Ok(cached.clone());
        }

        match self.load_user_gen_domains() {
            Ok(domains) => {
                if let Ok(mut cache) = self.user_gen_domains_cache.lock() {
                    *cache = Some(domains.clone());
                }
                Ok(domains)
            }
            Err(error) => {
                warn!(error = %error, "failed to load user-generated domains from blacklist; treating as empty");
                Ok(BTreeSet::new())
            }
        }
    }
}

impl SqliteIncidentStore {
    /// Reads the user-generated-domains set from the `blacklist` table's
    /// [`USER_GENERATED_DOMAIN_CATEGORY`] category.
    fn load_user_gen_domains(&self) -> Result<BTreeSet<String>, StoreError> {
        let connection = self.connection.lock().map_err(|_| StoreError::Io("store mutex poisoned".to_string()))?;
        let mut statement = connection
            .prepare("SELECT domain FROM blacklist WHERE category = ?1")
            .map_err(|error| StoreError::Io(error.to_string()))?;
        let rows = statement
            .query_map(params![USER_GENERATED_DOMAIN_CATEGORY], |row| row.get::<_, String>(0))
            .map_err(|error| StoreError::Io(error.to_string()))?;

        let mut domains = BTreeSet::new();
        for row in rows {
            domains.insert(row.map_err(|error| StoreError::Io(error.to_string()))?);
        }
        Ok(domains)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> SqliteIncidentStore {
        let config = SqliteStoreConfig::new(":memory:");
        SqliteIncidentStore::open(&config).expect("in-memory store must open")
    }

    fn projection(ticket_id: &str) -> IncidentProjection {
        IncidentProjection {
            ticket_id: TicketId::from(ticket_id),
            r#type: TicketType::Phishing,
            source: Some("http://a.example/x".to_string()),
            source_domain_or_ip: Some("a.example".to_string()),
            source_sub_domain: Some("a.example".to_string()),
            target: None,
            proxy: None,
            reporter: Some("R".to_string()),
            metadata: None,
            evidence: None,
            abuse_verified: None,
        }
    }

    #[test]
    fn add_then_get_round_trips_the_projection() {
        let store = open_temp();
        let ticket_id = TicketId::from("DCU1");
        store.add_incident(&ticket_id, &projection("DCU1")).expect("add must succeed");

        let loaded = store.get_incident(&ticket_id).expect("get must succeed").expect("incident must exist");
        assert_eq!(loaded.ticket_id, ticket_id);
        assert_eq!(loaded.r#type, TicketType::Phishing);
        assert_eq!(loaded.phishstory_status, PhishstoryStatus::Open);
        assert_eq!(loaded.source_domain_or_ip.as_deref(), Some("a.example"));
    }

    #[test]
    fn add_incident_upserts_by_ticket_id() {
        let store = open_temp();
        let ticket_id = TicketId::from("DCU1");
        store.add_incident(&ticket_id, &projection("DCU1")).expect("first add must succeed");

        let mut updated = projection("DCU1");
        updated.target = Some("victim.example".to_string());
        store.add_incident(&ticket_id, &updated).expect("second add must upsert");

        let loaded = store.get_incident(&ticket_id).expect("get must succeed").expect("incident must exist");
        assert_eq!(loaded.target.as_deref(), Some("victim.example"));
    }

    #[test]
    fn update_incident_sets_abuse_verified() {
        let store = open_temp();
        let ticket_id = TicketId::from("DCU1");
        store.add_incident(&ticket_id, &projection("DCU1")).expect("add must succeed");

        store
            .update_incident(
                &ticket_id,
                &IncidentPatch {
                    abuse_verified: Some(true),
                },
            )
            .expect("update must succeed");

        let loaded = store.get_incident(&ticket_id).expect("get must succeed").expect("incident must exist");
        assert_eq!(loaded.abuse_verified, Some(true));
    }

    #[test]
    fn close_incident_transitions_status_and_records_reason() {
        let store = open_temp();
        let ticket_id = TicketId::from("DCU1");
        store.add_incident(&ticket_id, &projection("DCU1")).expect("add must succeed");

        store.close_incident(&ticket_id, CloseReason::Resolved).expect("close must succeed");

        let loaded = store.get_incident(&ticket_id).expect("get must succeed").expect("incident must exist");
        assert_eq!(loaded.phishstory_status, PhishstoryStatus::Closed);
        assert_eq!(loaded.close_reason, Some(CloseReason::Resolved));
        assert!(loaded.closed_at.is_some());
    }

    #[test]
    fn find_incidents_counts_toward_domain_cap_bucket() {
        let store = open_temp();
        for index in 0..5 {
            let ticket_id = TicketId::from(format!("DCU{index}"));
            store.add_incident(&ticket_id, &projection(&format!("DCU{index}"))).expect("add must succeed");
        }

        let query = IncidentQuery {
            exclude_closed: true,
            r#type: Some(TicketType::Phishing),
            subdomain_or_domain: Some(SubdomainOrDomain::Subdomain {
                www_form: "www.a.example".to_string(),
                bare_form: "a.example".to_string(),
            }),
        };
        let matches = store.find_incidents(&query, 5).expect("find must succeed");
        assert_eq!(matches.len(), 5);
    }

    #[test]
    fn find_incidents_excludes_closed_from_the_cap_count() {
        let store = open_temp();
        let ticket_id = TicketId::from("DCU1");
        store.add_incident(&ticket_id, &projection("DCU1")).expect("add must succeed");
        store.close_incident(&ticket_id, CloseReason::Resolved).expect("close must succeed");

        let query = IncidentQuery {
            exclude_closed: true,
            r#type: Some(TicketType::Phishing),
            subdomain_or_domain: Some(SubdomainOrDomain::Domain("a.example".to_string())),
        };
        let matches = store.find_incidents(&query, 5).expect("find must succeed");
        assert!(matches.is_empty());
    }

    #[test]
    fn user_gen_domains_is_empty_when_blacklist_is_empty() {
        let store = open_temp();
        let domains = store.user_gen_domains().expect("load must succeed");
        assert!(domains.is_empty());
    }

    #[test]
    fn user_gen_domains_loads_and_caches_blacklist_category() {
        let store = open_temp();
        {
            let connection = store.connection.lock().expect("lock must succeed");
            connection
                .execute(
                    "INSERT INTO blacklist (domain, category) VALUES (?1, ?2)",
                    params!["blogspot.example", USER_GENERATED_DOMAIN_CATEGORY],
                )
                .expect("seed insert must succeed");
            connection
                .execute(
                    "INSERT INTO blacklist (domain, category) VALUES (?1, ?2)",
                    params!["spam.example", "other_category"],
                )
                .expect("seed insert must succeed");
        }

        let domains = store.user_gen_domains().expect("load must succeed");
        assert_eq!(domains, BTreeSet::from(["blogspot.example".to_string()]));

        // Second call must hit the cache, not the table, even after a row
        // that would change the result is inserted directly.
        {
            let connection = store.connection.lock().expect("lock must succeed");
            connection
                .execute(
                    "INSERT INTO blacklist (domain, category) VALUES (?1, ?2)",
                    params!["wixsite.example", USER_GENERATED_DOMAIN_CATEGORY],
                )
                .expect("seed insert must succeed");
        }
        let cached_again = store.user_gen_domains().expect("load must succeed");
        assert_eq!(cached_again, BTreeSet::from(["blogspot.example".to_string()]));
    }

    #[test]
    fn add_email_ack_appends_a_record() {
        let store = open_temp();
        store
            .add_email_ack(&ticket_core::EmailAck {
                source: "http://a.example/x".to_string(),
                email: "a@b.example".to_string(),
                created: OffsetDateTime::now_utc(),
            })
            .expect("ack insert must succeed");

        let connection = store.connection.lock().expect("lock must succeed");
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM acknowledge_email", [], |row| row.get(0))
            .expect("count query must succeed");
        assert_eq!(count, 1);
    }
}
