// ticket-service/src/dto.rs
// ============================================================================
// Module: HTTP Data Transfer Objects
// Description: Serializable response shapes not already carried by ticket-core.
// Purpose: Present GetTickets pagination and CheckDuplicate results as JSON.
// Dependencies: serde, ticket-core
// ============================================================================

//! ## Overview
//! `CreateTicketArgs`, `UpdateTicketArgs`, `GetTicketsArgs`, and
//! `ReporterTicketView` already derive `serde::{Serialize, Deserialize}` in
//! `ticket-core` and are used directly as request/response bodies. The types
//! defined here cover the handful of response shapes that don't carry serde
//! derives because they have no reason to outside an HTTP boundary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use ticket_core::GetTicketsResult;
use ticket_core::PaginationLinks;
use ticket_core::TicketId;

// ============================================================================
// SECTION: CreateTicket
// ============================================================================

/// Response body for a successful `CreateTicket` call.
#[derive(Debug, Serialize)]
pub struct CreateTicketResponse {
    /// Newly created ticket identifier.
    pub ticket_id: TicketId,
}

// ============================================================================
// SECTION: GetTickets
// ============================================================================

/// Pagination metadata for a `GetTickets` response (§4.1).
#[derive(Debug, Serialize)]
pub struct PaginationResponse {
    /// Page size used for the request.
    pub limit: u64,
    /// Total matching row count reported by the backend.
    pub total: u64,
    /// Offset of the first page; always `0`.
    pub first_offset: u64,
    /// Offset of the previous page, when present.
    pub previous_offset: Option<u64>,
    /// Offset of the next page, when more rows remain.
    pub next_offset: Option<u64>,
    /// Offset of the last page, when distinct from the current one.
    pub last_offset: Option<u64>,
}

impl From<PaginationLinks> for PaginationResponse {
    fn from(links: PaginationLinks) -> Self {
        Self {
            limit: links.limit,
            total: links.total,
            first_offset: links.first_offset,
            previous_offset: links.previous_offset,
            next_offset: links.next_offset,
            last_offset: links.last_offset,
        }
    }
}

/// Response body for `GetTickets`.
#[derive(Debug, Serialize)]
pub struct GetTicketsResponse {
    /// Matching ticket identifiers, in backend order.
    pub ticket_ids: Vec<TicketId>,
    /// Pagination metadata, present when the backend reported a total count.
    pub pagination: Option<PaginationResponse>,
}

impl From<GetTicketsResult> for GetTicketsResponse {
    fn from(result: GetTicketsResult) -> Self {
        Self {
            ticket_ids: result.ticket_ids,
            pagination: result.pagination.map(PaginationResponse::from),
        }
    }
}

// ============================================================================
// SECTION: CheckDuplicate
// ============================================================================

/// Request body for `CheckDuplicate`.
#[derive(Debug, serde::Deserialize)]
pub struct CheckDuplicateRequest {
    /// Source URL or host to check.
    pub source: String,
    /// Ticket id to exclude from the duplicate set (the `reclassified_from` case).
    pub excluded: Option<TicketId>,
}

/// Response body for `CheckDuplicate`.
///
/// `duplicate` mirrors the RPC contract's single-string return (§6): empty
/// when no duplicate exists, otherwise the first matching ticket id.
#[derive(Debug, Serialize)]
pub struct CheckDuplicateResponse {
    /// One duplicate ticket id, or an empty string when none exists.
    pub duplicate: String,
}
