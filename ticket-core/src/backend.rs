// ticket-core/src/backend.rs
// ============================================================================
// Module: Backend Adapter Algorithms
// Description: Backend-agnostic translation, query, and pagination helpers.
// Purpose: Give the remote ticketing backend adapter a tested, pure core so
//          transport crates only own the HTTP call itself.
// Dependencies: crate::model::mapping, serde_json
// ============================================================================

//! ## Overview
//! The remote ticketing backend is a ServiceNow-style table API. Everything
//! about how a canonical field map becomes a POST body, a query string, or a
//! date-range filter is pure and backend-agnostic; only the actual HTTPS call
//! (basic auth, timeouts, connection pooling) is transport-specific and lives
//! in `ticket-backend-http`. Keeping this logic here means it is exercised by
//! the same test suite regardless of which transport crate is wired in.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use serde_json::Map;
use serde_json::Value;

use crate::model::mapping::canonical_to_remote;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Low-bound time-of-day used for the `createdStart` date-generate expression.
const RANGE_LOW_TIME: &str = "00:00:00";
/// High-bound time-of-day used for the `createdEnd` date-generate expression.
const RANGE_HIGH_TIME: &str = "23:59:59";

// ============================================================================
// SECTION: POST Payload Construction
// ============================================================================

/// Builds the remote POST body for a canonical field map.
///
/// Keys are rewritten via [`canonical_to_remote`]; unknown keys pass through
/// verbatim. Values are serialized as-is (§4.1).
#[must_use]
pub fn create_post_payload(canonical: &Map<String, Value>) -> Map<String, Value> {
    let mut body = Map::with_capacity(canonical.len());
    for (key, value) in canonical {
        body.insert(canonical_to_remote(key).to_string(), value.clone());
    }
    body
}

// ============================================================================
// SECTION: URL Parameter Construction
// ============================================================================

/// Returns the query operator for a canonical key: `>=` for `createdStart`,
/// `<=` for `createdEnd`, `=` otherwise.
fn operator_for(canonical_key: &str) -> &'static str {
    match canonical_key {
        "createdStart" => ">=",
        "createdEnd" => "<=",
        _ => "=",
    }
}

/// Renders a canonical JSON value as a query-string value.
fn value_to_query_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Builds the `?`-prefixed, `&`-joined query string for a canonical field map.
///
/// Keys are rewritten via [`canonical_to_remote`]; the operator is `=` by
/// default, `>=` for `createdStart`, and `<=` for `createdEnd`. An empty map
/// yields the empty string rather than a bare `?` (§4.1).
#[must_use]
pub fn create_url_parameters(canonical: &Map<String, Value>) -> String {
    if canonical.is_empty() {
        return String::new();
    }
    let mut out = String::from("?");
    for (index, (key, value)) in canonical.iter().enumerate() {
        if index > 0 {
            out.push('&');
        }
        let remote_key = canonical_to_remote(key);
        let operator = operator_for(key);
        let encoded_value =
            url::form_urlencoded::byte_serialize(value_to_query_string(value).as_bytes())
                .collect::<String>();
        let _ = write!(out, "{remote_key}{operator}{encoded_value}");
    }
    out
}

// ============================================================================
// SECTION: Created-Date Range Query
// ============================================================================

/// Builds the `gs.dateGenerate` expression used by the remote query language.
fn date_generate(date: &str, time: &str) -> String {
    format!("javascript:gs.dateGenerate('{date}','{time}')")
}

/// Builds the `&sysparm_query=...^ORDERBYDESCu_number` fragment for a
/// `createdStart`/`createdEnd` range filter.
///
/// Emits `BETWEEN low@high` when both bounds are present, `>=low` or `<=high`
/// when only one is, and the empty string when neither is set (§4.1).
#[must_use]
pub fn create_param_query(created_start: Option<&str>, created_end: Option<&str>) -> String {
    let low = created_start.map(|date| date_generate(date, RANGE_LOW_TIME));
    let high = created_end.map(|date| date_generate(date, RANGE_HIGH_TIME));
    let expr = match (low, high) {
        (Some(low), Some(high)) => format!("sys_created_onBETWEEN{low}@{high}"),
        (Some(low), None) => format!("sys_created_on>={low}"),
        (None, Some(high)) => format!("sys_created_on<={high}"),
        (None, None) => return String::new(),
    };
    format!("&sysparm_query={expr}^ORDERBYDESCu_number")
}

// ============================================================================
// SECTION: Pagination
// ============================================================================

/// Pagination links computed for a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationLinks {
    /// Page size used for the request.
    pub limit: u64,
    /// Total matching row count reported by the backend.
    pub total: u64,
    /// Offset of the first page; always `0`.
    pub first_offset: u64,
    /// Offset of the previous page, when `offset > 0`.
    pub previous_offset: Option<u64>,
    /// Offset of the next page, when more rows remain.
    pub next_offset: Option<u64>,
    /// Offset of the last page, when it is distinct from the current one.
    pub last_offset: Option<u64>,
}

/// Computes pagination links from `offset`, `limit`, and the backend-reported
/// `total` row count (§4.1).
///
/// The last full page is computed as `(total / limit - 1) * limit` when
/// `total` is an exact multiple of `limit`, so the final page offset never
/// names a trailing empty page; otherwise it is `(total / limit) * limit`.
/// This off-by-one is preserved verbatim from the source behavior (§9) and
/// must not be "fixed" without corresponding reference-test changes.
///
/// # Panics
///
/// Panics if `limit` is zero; callers must validate `limit > 0` before
/// calling (the RPC boundary rejects a zero limit).
#[must_use]
pub fn create_pagination_links(offset: u64, limit: u64, total: u64) -> PaginationLinks {
    assert!(limit > 0, "pagination limit must be greater than zero");

    let next = offset + limit;
    let mut pages = total / limit;
    if total % limit == 0 && pages > 0 {
        pages -= 1;
    }
    let last = pages * limit;

    let previous_offset = (offset > 0).then(|| offset.saturating_sub(limit));
    let next_offset = (total > next).then_some(next);
    let last_offset = (next < last || total <= next).then_some(last);

    PaginationLinks {
        limit,
        total,
        first_offset: 0,
        previous_offset,
        next_offset,
        last_offset,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_payload_rewrites_known_keys_and_passes_unknown_through() {
        let mut canonical = Map::new();
        canonical.insert("ticketId".to_string(), Value::String("DCU1".to_string()));
        canonical.insert("reporter".to_string(), Value::String("R".to_string()));
        canonical.insert("unknownField".to_string(), Value::Bool(true));

        let body = create_post_payload(&canonical);

        assert_eq!(body.get("u_number"), Some(&Value::String("DCU1".to_string())));
        assert_eq!(body.get("u_reporter"), Some(&Value::String("R".to_string())));
        assert_eq!(body.get("unknownField"), Some(&Value::Bool(true)));
    }

    #[test]
    fn url_parameters_are_empty_for_empty_input() {
        assert_eq!(create_url_parameters(&Map::new()), "");
    }

    #[test]
    fn url_parameters_use_range_operators_for_created_bounds() {
        let mut canonical = Map::new();
        canonical.insert("createdStart".to_string(), Value::String("2026-01-01".to_string()));
        let params = create_url_parameters(&canonical);
        assert_eq!(params, "?sys_created_on>=2026-01-01");
    }

    #[test]
    fn url_parameters_use_equality_operator_by_default() {
        let mut canonical = Map::new();
        canonical.insert("reporter".to_string(), Value::String("R1".to_string()));
        let params = create_url_parameters(&canonical);
        assert_eq!(params, "?u_reporter=R1");
    }

    #[test]
    fn param_query_is_empty_when_no_bounds_given() {
        assert_eq!(create_param_query(None, None), "");
    }

    #[test]
    fn param_query_emits_between_for_both_bounds() {
        let query = create_param_query(Some("2026-01-01"), Some("2026-01-31"));
        assert_eq!(
            query,
            "&sysparm_query=sys_created_onBETWEENjavascript:gs.dateGenerate('2026-01-01','00:00:00')@javascript:gs.dateGenerate('2026-01-31','23:59:59')^ORDERBYDESCu_number"
        );
    }

    #[test]
    fn param_query_emits_lower_bound_only() {
        let query = create_param_query(Some("2026-01-01"), None);
        assert_eq!(
            query,
            "&sysparm_query=sys_created_on>=javascript:gs.dateGenerate('2026-01-01','00:00:00')^ORDERBYDESCu_number"
        );
    }

    #[test]
    fn pagination_first_offset_is_always_zero() {
        let links = create_pagination_links(0, 10, 25);
        assert_eq!(links.first_offset, 0);
    }

    #[test]
    fn pagination_total_25_limit_10() {
        let links = create_pagination_links(0, 10, 25);
        assert_eq!(links.next_offset, Some(10));
        assert_eq!(links.last_offset, Some(20));
        assert_eq!(links.previous_offset, None);
    }

    #[test]
    fn pagination_total_is_exact_multiple_of_limit() {
        let links = create_pagination_links(0, 10, 30);
        assert_eq!(links.last_offset, Some(20));
    }

    #[test]
    fn pagination_previous_offset_present_past_first_page() {
        let links = create_pagination_links(10, 10, 25);
        assert_eq!(links.previous_offset, Some(0));
    }

    #[test]
    fn pagination_previous_offset_clamped_at_zero() {
        let links = create_pagination_links(5, 10, 25);
        assert_eq!(links.previous_offset, Some(0));
    }

    #[test]
    fn pagination_next_offset_absent_on_last_page() {
        let links = create_pagination_links(20, 10, 25);
        assert_eq!(links.next_offset, None);
    }
}
