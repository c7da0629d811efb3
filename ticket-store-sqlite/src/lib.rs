// ticket-store-sqlite/src/lib.rs
// ============================================================================
// Module: Ticket Store SQLite Library
// Description: SQLite-backed implementation of ticket_core::IncidentStore.
// Purpose: Front the incidents, acknowledge_email, and blacklist collections
//          described in §3, §4.2, and §6 of the ticket intake contract.
// Dependencies: ticket-core, rusqlite, serde_json, time
// ============================================================================

//! ## Overview
//! `ticket-store-sqlite` is the durable incident store adapter. The original
//! deployment fronts a document database (`PhishstoryMongo`, a thin wrapper
//! over MongoDB); this crate preserves the same three collections —
//! `incidents`, `acknowledge_email`, and a category-indexed `blacklist` — as
//! SQLite tables, so the shape of [`ticket_core::interfaces::IncidentStore`]
//! stays identical regardless of which concrete store a deployment wires in.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteIncidentStore;
pub use store::SqliteStoreConfig;
pub use store::StoreSetupError;
pub use store::USER_GENERATED_DOMAIN_CATEGORY;
