// ticket-core/src/model/mod.rs
// ============================================================================
// Module: Ticket Core Data Model
// Description: Canonical ticket and incident schema shared across adapters.
// Purpose: Provide stable, serializable types for the ticket intake engine.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Core data model types define the canonical ticket vocabulary, the local
//! incident projection, and the field-name mapping between them. These types
//! are the source of truth for any derived API surfaces (RPC, HTTP, adapters).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod incident;
pub mod mapping;
pub mod ticket;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::ReporterId;
pub use identifiers::Source;
pub use identifiers::TicketId;
pub use incident::EmailAck;
pub use incident::Evidence;
pub use incident::Incident;
pub use incident::PhishstoryStatus;
pub use ticket::CloseReason;
pub use ticket::CreateTicketArgs;
pub use ticket::ReporterTicketView;
pub use ticket::TicketType;
pub use ticket::UpdateTicketArgs;
