// ticket-core/src/model/mapping.rs
// ============================================================================
// Module: Canonical Field Mapping
// Description: Translation table between canonical and remote field names.
// Purpose: Give every adapter and the engine one source of truth for field names.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The remote ticketing backend uses field names distinct from the canonical
//! vocabulary used by callers and by [`crate::model::incident::Incident`]. This
//! table is a compile-time constant rather than a dynamically built map (see
//! `DESIGN.md`): the key set is closed and known at compile time, so a linear
//! scan over a small static slice is both simpler and faster than a runtime
//! hash map built on every call.
//!
//! # Invariants
//! - The mapping is injective on canonical keys: no two canonical keys map to
//!   the same remote key, with one documented exception — `createdAt`,
//!   `createdStart`, and `createdEnd` all translate to `sys_created_on`, and
//!   the reverse direction resolves that remote key back to `createdAt` (see
//!   [`remote_to_canonical`]).
//! - Keys outside this table pass through unchanged in both directions.

// ============================================================================
// SECTION: Mapping Table
// ============================================================================

/// Canonical-to-remote field name pairs (§3 of the ticket intake contract).
///
/// `createdStart`/`createdEnd` both translate to the remote `sys_created_on`
/// field; they are range-operator variants of the same column rather than
/// independent ones, so the table keeps them alongside the equality mapping
/// used by [`canonical_to_remote`].
pub const FIELD_MAP: &[(&str, &str)] = &[
    ("ticketId", "u_number"),
    ("reporter", "u_reporter"),
    ("source", "u_source"),
    ("sourceDomainOrIp", "u_source_domain_or_ip"),
    ("closed", "u_closed"),
    ("createdAt", "sys_created_on"),
    ("closedAt", "u_closed_date"),
    ("type", "u_type"),
    ("target", "u_target"),
    ("proxy", "u_proxy_ip"),
    ("intentional", "u_intentional"),
    ("info", "u_info"),
    ("infoUrl", "u_url_more_info"),
    ("limit", "sysparm_limit"),
    ("offset", "sysparm_offset"),
    ("createdStart", "sys_created_on"),
    ("createdEnd", "sys_created_on"),
];

/// Fields that exist only in the incident store and are never sent to, or
/// received from, the remote backend.
pub const INCIDENT_ONLY_FIELDS: &[&str] = &["sourceSubDomain"];

/// Remote table name for abuse tickets.
pub const TICKET_TABLE_NAME: &str = "u_dcu_ticket";

// ============================================================================
// SECTION: Translation Helpers
// ============================================================================

/// Translates a canonical field name to its remote equivalent.
///
/// Unknown keys pass through untranslated (§3 invariant 4).
#[must_use]
pub fn canonical_to_remote(key: &str) -> &str {
    FIELD_MAP.iter().find(|(canonical, _)| *canonical == key).map_or(key, |(_, remote)| *remote)
}

/// Translates a remote field name back to its canonical equivalent.
///
/// `sys_created_on` is ambiguous in reverse (it backs `createdAt`,
/// `createdStart`, and `createdEnd`); the reverse direction always resolves
/// it to `createdAt`, matching the reporter-facing projection in
/// `GetTicket`.
///
/// Unknown keys pass through untranslated (§3 invariant 4).
#[must_use]
pub fn remote_to_canonical(key: &str) -> &str {
    FIELD_MAP.iter().find(|(_, remote)| *remote == key).map_or(key, |(canonical, _)| *canonical)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
