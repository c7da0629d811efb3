// ticket-core/src/model/ticket.rs
// ============================================================================
// Module: Ticket Types
// Description: Canonical, backend-agnostic representation of an abuse ticket.
// Purpose: Provide the shared vocabulary used by the policy module, the ticket
//          engine, and every adapter that talks to the remote ticketing backend.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A ticket is identified by an opaque [`TicketId`](crate::model::identifiers::TicketId)
//! minted by the remote ticketing backend. This module defines the enumerated
//! vocabulary (`type`, close reason) and the canonical field set exchanged with
//! callers; the backend adapter is responsible for translating these canonical
//! names into the remote wire format (see [`crate::model::mapping`]).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::model::identifiers::ReporterId;
use crate::model::identifiers::Source;
use crate::model::identifiers::TicketId;

// ============================================================================
// SECTION: Ticket Type
// ============================================================================

/// Abuse ticket type, supplied by the reporter on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketType {
    /// Phishing report.
    Phishing,
    /// Malware hosting report.
    Malware,
    /// Spam report.
    Spam,
    /// General network abuse report.
    NetworkAbuse,
    /// DNS `A` record abuse report.
    ARecord,
    /// Wire-fraud report.
    FraudWire,
    /// IP-block abuse report.
    IpBlock,
    /// User-generated content abuse report; exempt from domain caps.
    Content,
}

impl TicketType {
    /// Returns every supported ticket type.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Phishing,
            Self::Malware,
            Self::Spam,
            Self::NetworkAbuse,
            Self::ARecord,
            Self::FraudWire,
            Self::IpBlock,
            Self::Content,
        ]
    }

    /// Returns true for the content type, which is never subject to the
    /// per-domain admission cap.
    #[must_use]
    pub const fn is_content(self) -> bool {
        matches!(self, Self::Content)
    }

    /// Returns true for the types whose projection is forwarded to the
    /// middleware queue on create.
    #[must_use]
    pub const fn is_middleware_routed(self) -> bool {
        matches!(self, Self::Phishing | Self::Malware | Self::Spam | Self::NetworkAbuse)
    }
}

// ============================================================================
// SECTION: Close Reason
// ============================================================================

/// Ticket closure reason, required whenever a ticket is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Report could not be resolved.
    Unresolvable,
    /// Report could not be worked.
    Unworkable,
    /// Report was resolved.
    Resolved,
    /// Report was parked pending further action.
    Parked,
    /// Report was a false positive.
    FalsePositive,
    /// Reported shopper account was suspended.
    Suspended,
    /// Activity was intentionally malicious.
    IntentionallyMalicious,
    /// Source is a shared IP address.
    SharedIp,
    /// Source is not hosted by this provider.
    NotHosted,
    /// Offending content was removed.
    ContentRemoved,
    /// Reporter or target is a repeat offender.
    RepeatOffender,
    /// Compromise was extensive and handled out of band.
    ExtensiveCompromise,
    /// Notification was emailed to the EMEA abuse desk.
    EmailSentToEmea,
    /// Ticket was transferred to another queue.
    Transferred,
    /// Shopper account was compromised.
    ShopperCompromise,
    /// Closed by an automated malware scanner notice.
    MalwareScannerNotice,
}

impl CloseReason {
    /// Returns every supported close reason.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Unresolvable,
            Self::Unworkable,
            Self::Resolved,
            Self::Parked,
            Self::FalsePositive,
            Self::Suspended,
            Self::IntentionallyMalicious,
            Self::SharedIp,
            Self::NotHosted,
            Self::ContentRemoved,
            Self::RepeatOffender,
            Self::ExtensiveCompromise,
            Self::EmailSentToEmea,
            Self::Transferred,
            Self::ShopperCompromise,
            Self::MalwareScannerNotice,
        ]
    }
}

// ============================================================================
// SECTION: Canonical Ticket Fields
// ============================================================================

/// Canonical fields accepted by `CreateTicket`.
///
/// Field names mirror §3 of the ticket intake contract; `reporter_email` is
/// deliberately excluded from [`crate::model::mapping`] because it must never reach
/// the remote backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTicketArgs {
    /// Abuse ticket type.
    pub r#type: Option<TicketType>,
    /// The URL or host under investigation.
    pub source: Option<Source>,
    /// Domain or IP extracted from the source.
    pub source_domain_or_ip: Option<String>,
    /// Subdomain extracted from the source, used for cap bucketing.
    pub source_sub_domain: Option<String>,
    /// Attack or victim target.
    pub target: Option<String>,
    /// Proxy IP observed for the source, if any.
    pub proxy: Option<String>,
    /// Reporter identifier (trusted without authentication).
    pub reporter: Option<ReporterId>,
    /// Reporter email address; consumed for acknowledgement, never forwarded.
    pub reporter_email: Option<String>,
    /// Free-form supporting information.
    pub info: Option<String>,
    /// URL to further supporting information.
    pub info_url: Option<String>,
    /// Whether the abuse was intentional.
    pub intentional: Option<bool>,
    /// Free-form metadata; may carry `reclassified_from` and `fraud_score`.
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Canonical fields accepted by `UpdateTicket`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTicketArgs {
    /// Ticket being updated.
    pub ticket_id: TicketId,
    /// Whether the ticket should be marked closed.
    pub closed: Option<bool>,
    /// Closure reason; required when `closed` is `true`.
    pub close_reason: Option<CloseReason>,
    /// Updated attack or victim target.
    pub target: Option<String>,
    /// Updated ticket type.
    pub r#type: Option<TicketType>,
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// Reporter-facing projection returned by `GetTicket` (the inverse of the
/// canonical-to-remote mapping in [`crate::model::mapping`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReporterTicketView {
    /// Remote ticket identifier.
    pub ticket_id: TicketId,
    /// Reporter identifier.
    pub reporter: Option<String>,
    /// Source URL or host.
    pub source: Option<String>,
    /// Domain or IP extracted from the source.
    pub source_domain_or_ip: Option<String>,
    /// Whether the ticket is closed.
    pub closed: bool,
    /// Ticket creation time.
    pub created_at: Option<String>,
    /// Ticket closure time.
    pub closed_at: Option<String>,
    /// Ticket type.
    pub r#type: Option<String>,
    /// Attack or victim target.
    pub target: Option<String>,
    /// Observed proxy IP.
    pub proxy: Option<String>,
}

/// Marker timestamp helper used when a caller needs "now" for audit records.
///
/// The engine itself never calls this on the hot path (ordering and
/// admission decisions never depend on wall-clock time); it exists for
/// adapters that must stamp locally-originated records such as email
/// acknowledgements.
#[must_use]
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}
