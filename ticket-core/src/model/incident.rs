// ticket-core/src/model/incident.rs
// ============================================================================
// Module: Incident Types
// Description: Local projection of a ticket used for cap checks and enrichment.
// Purpose: Define the document persisted by the incident store adapter.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! An incident is the local projection of a ticket, keyed by [`TicketId`]. It
//! carries only the fields downstream workers need plus lifecycle state used
//! by the domain-cap and duplicate-detection policy checks. Incidents are
//! never deleted; closure is a status transition.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::model::identifiers::TicketId;
use crate::model::ticket::CloseReason;
use crate::model::ticket::TicketType;

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Incident lifecycle status.
///
/// # Invariants
/// - `Closed` is terminal; no further transition is valid.
/// - Only `Open`, `Paused`, and `Processing` count against the domain cap and
///   against duplicate-open detection (§3 invariant 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhishstoryStatus {
    /// Newly created, awaiting processing.
    Open,
    /// Temporarily paused.
    Paused,
    /// Actively being processed by a downstream worker.
    Processing,
    /// Terminal: closed.
    Closed,
}

impl PhishstoryStatus {
    /// Returns true when this status counts toward open-ticket admission
    /// checks (domain cap, duplicate detection).
    #[must_use]
    pub const fn counts_as_open(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

// ============================================================================
// SECTION: Incident
// ============================================================================

/// Local projection of a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// Remote ticket identifier; primary key.
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
    /// Set when the reporter is trusted, or when a duplicate-suppressed
    /// original is retroactively flagged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abuse_verified: Option<bool>,
    /// Lifecycle status.
    pub phishstory_status: PhishstoryStatus,
    /// Closure reason, set only once `phishstory_status` is `Closed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<CloseReason>,
    /// Closure timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
    pub closed_at: Option<OffsetDateTime>,
}

/// Evidence flags attached to an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// True when the originating report carried an `info` field.
    pub snow: bool,
}

// ============================================================================
// SECTION: Email Acknowledgement
// ============================================================================

/// Append-only record of an acknowledgement email sent for a duplicate
/// report, kept separate from the main incident document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAck {
    /// Source URL or host the report concerned.
    pub source: String,
    /// Reporter email address.
    pub email: String,
    /// Time the acknowledgement was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}
