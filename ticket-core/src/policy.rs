// ticket-core/src/policy.rs
// ============================================================================
// Module: Admission Policy
// Description: Pure functions deciding type/closure support, reporter class,
//              user-generated domain exemption, and the per-domain cap.
// Purpose: Isolate the admission rules from the orchestration in crate::engine
//          so each rule is independently testable.
// Dependencies: crate::interfaces, crate::model
// ============================================================================

//! ## Overview
//! Every function here is a pure decision or a single read against the
//! incident store; none of them perform remote writes or publish tasks. The
//! ticket engine composes these with the backend adapter and the store to
//! decide admission for `CreateTicket` (§4.4).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::interfaces::IncidentQuery;
use crate::interfaces::IncidentStore;
use crate::interfaces::StoreError;
use crate::interfaces::SubdomainOrDomain;
use crate::model::CloseReason;
use crate::model::ReporterId;
use crate::model::TicketType;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Platform hostnames excluded from per-domain admission caps regardless of
/// store-loaded blocklist contents (§3).
pub const BUILTIN_USER_GENERATED_DOMAINS: &[&str] = &["wix.com", "joomla.com"];

/// Maximum number of non-closed incidents permitted on a single (type,
/// domain-bucket) tuple before admission is refused (§3 invariant 3).
pub const DOMAIN_CAP_LIMIT: usize = 5;

// ============================================================================
// SECTION: Type And Closure Support
// ============================================================================

/// Returns true when `ticket_type` is present and supported.
///
/// [`TicketType`] is itself the closed enumeration of supported types (§3),
/// so this reduces to an `Option` check; it exists so the admission-ordering
/// rule in §4.5 step 1 has a single named predicate to call, and so a
/// deserialization failure upstream (an unrecognized wire value) and an
/// omitted field are rejected identically.
#[must_use]
pub const fn is_supported_type(ticket_type: Option<TicketType>) -> bool {
    ticket_type.is_some()
}

/// Returns true when `close_reason` is present and supported.
///
/// Mirrors [`is_supported_type`]: [`CloseReason`] is itself the closed set.
#[must_use]
pub const fn is_supported_closure(close_reason: Option<CloseReason>) -> bool {
    close_reason.is_some()
}

// ============================================================================
// SECTION: Reporter Class
// ============================================================================

/// Returns true when `reporter` is a member of `trusted`.
#[must_use]
pub fn is_trusted(reporter: Option<&ReporterId>, trusted: &BTreeSet<ReporterId>) -> bool {
    reporter.is_some_and(|reporter| trusted.contains(reporter))
}

/// Returns true when `reporter` is a member of `exempt`.
///
/// Exempt reporters are a superset of trusted reporters (§3): every trusted
/// ID is expected to also appear in `exempt`, but this function does not
/// enforce that invariant — it is the configuration loader's responsibility.
#[must_use]
pub fn is_exempt(reporter: Option<&ReporterId>, exempt: &BTreeSet<ReporterId>) -> bool {
    reporter.is_some_and(|reporter| exempt.contains(reporter))
}

// ============================================================================
// SECTION: User-Generated Domains
// ============================================================================

/// Returns true when `domain` is user-generated: either a built-in platform
/// hostname or a member of the store-loaded blocklist set (§3, §4.4).
#[must_use]
pub fn is_user_gen(domain: &str, store_domains: &BTreeSet<String>) -> bool {
    BUILTIN_USER_GENERATED_DOMAINS.contains(&domain) || store_domains.contains(domain)
}

// ============================================================================
// SECTION: Subdomain Normalization
// ============================================================================

/// Normalizes a subdomain into its `www.`-prefixed and bare equivalent forms.
///
/// If `subdomain` begins with `www.` and has more than four characters, the
/// stripped form is considered equivalent for cap-bucketing purposes (§4.4);
/// otherwise the `www.`-prefixed form is synthesized from the bare one. Both
/// forms always refer to the same cap bucket.
#[must_use]
pub fn normalize_subdomain(subdomain: &str) -> (String, String) {
    if let Some(stripped) = subdomain.strip_prefix("www.")
        && subdomain.len() > 4
    {
        (subdomain.to_string(), stripped.to_string())
    } else {
        (format!("www.{subdomain}"), subdomain.to_string())
    }
}

// ============================================================================
// SECTION: Domain Cap
// ============================================================================

/// Evaluates whether the per-domain admission cap has been reached for a new
/// create (§4.4).
///
/// Returns `false` unconditionally when `ticket_type` is [`TicketType::Content`],
/// when `domain` is user-generated, when `reporter` is exempt, or when
/// neither `subdomain` nor `domain` is set. Otherwise issues `find_incidents`
/// with `limit = `[`DOMAIN_CAP_LIMIT`] and returns true iff the result count
/// is exactly that limit.
///
/// # Errors
///
/// Returns [`StoreError`] when the incident store read fails; per §7 this is
/// fatal to the enclosing `CreateTicket` call.
#[allow(clippy::too_many_arguments, reason = "mirrors the five-input policy predicate in §4.4")]
pub fn domain_cap_reached<S: IncidentStore>(
    store: &S,
    ticket_type: TicketType,
    reporter: Option<&ReporterId>,
    subdomain: Option<&str>,
    domain: Option<&str>,
    exempt: &BTreeSet<ReporterId>,
    store_domains: &BTreeSet<String>,
) -> Result<bool, StoreError> {
    if ticket_type.is_content() {
        return Ok(false);
    }
    if let Some(domain) = domain
        && is_user_gen(domain, store_domains)
    {
        return Ok(false);
    }
    if is_exempt(reporter, exempt) {
        return Ok(false);
    }
    let Some(bucket) = subdomain_or_domain_filter(subdomain, domain) else {
        return Ok(false);
    };

    let query = IncidentQuery {
        exclude_closed: true,
        r#type: Some(ticket_type),
        subdomain_or_domain: Some(bucket),
    };
    let matches = store.find_incidents(&query, DOMAIN_CAP_LIMIT)?;
    Ok(matches.len() == DOMAIN_CAP_LIMIT)
}

/// Builds the cap-bucket filter for `subdomain`/`domain`.
///
/// When `subdomain` is present, the filter matches either its `www.`-prefixed
/// or bare form (§4.4); when absent, it falls back to an exact `domain`
/// match. Returns `None` when neither is set.
fn subdomain_or_domain_filter(
    subdomain: Option<&str>,
    domain: Option<&str>,
) -> Option<SubdomainOrDomain> {
    if let Some(subdomain) = subdomain {
        let (www_form, bare_form) = normalize_subdomain(subdomain);
        Some(SubdomainOrDomain::Subdomain {
            www_form,
            bare_form,
        })
    } else {
        domain.map(|domain| SubdomainOrDomain::Domain(domain.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_type_requires_presence() {
        assert!(is_supported_type(Some(TicketType::Phishing)));
        assert!(!is_supported_type(None));
    }

    #[test]
    fn supported_closure_requires_presence() {
        assert!(is_supported_closure(Some(CloseReason::Resolved)));
        assert!(!is_supported_closure(None));
    }

    #[test]
    fn trusted_and_exempt_membership() {
        let trusted: BTreeSet<ReporterId> = [ReporterId::new("TR1")].into_iter().collect();
        let exempt: BTreeSet<ReporterId> =
            [ReporterId::new("TR1"), ReporterId::new("EX1")].into_iter().collect();

        assert!(is_trusted(Some(&ReporterId::new("TR1")), &trusted));
        assert!(!is_trusted(Some(&ReporterId::new("EX1")), &trusted));
        assert!(is_exempt(Some(&ReporterId::new("EX1")), &exempt));
        assert!(!is_trusted(None, &trusted));
    }

    #[test]
    fn user_gen_checks_builtin_and_store_sets() {
        let store_domains: BTreeSet<String> = ["blogspot.example".to_string()].into_iter().collect();
        assert!(is_user_gen("wix.com", &store_domains));
        assert!(is_user_gen("blogspot.example", &store_domains));
        assert!(!is_user_gen("evil.example", &store_domains));
    }

    #[test]
    fn www_prefixed_subdomain_normalizes_to_bare_form() {
        let (www_form, bare_form) = normalize_subdomain("www.abc.com");
        assert_eq!(www_form, "www.abc.com");
        assert_eq!(bare_form, "abc.com");
    }

    #[test]
    fn bare_subdomain_synthesizes_www_form() {
        let (www_form, bare_form) = normalize_subdomain("abc.com");
        assert_eq!(www_form, "www.abc.com");
        assert_eq!(bare_form, "abc.com");
    }

    #[test]
    fn short_www_literal_is_not_stripped() {
        // "www." alone has length 4, not > 4, so it is treated as a bare form.
        let (www_form, bare_form) = normalize_subdomain("www.");
        assert_eq!(bare_form, "www.");
        assert_eq!(www_form, "www.www.");
    }
}
