//! Policy compiler: backend policy document to validation grammar.
//!
//! Compilation is a pure function of the document. Locked attributes become
//! escaped exact-match patterns, unlocked ones become permit-all, and domain
//! attributes follow the zone's whitelist and wildcard flag. Unknown key
//! algorithms or curves reported by the backend are errors, not panics.

use tracing::{debug, trace};

use certward_common::keys::{SUPPORTED_CURVES, SUPPORTED_KEY_SIZES};
use certward_common::{EllipticCurve, KeyType};

use crate::compiled::{AllowedKeyConfiguration, AttributePatterns, CompiledPolicy, ManualCsr};
use crate::document::{KeyPairPolicy, LockedValue, LockedValues, PolicyDocument};
use crate::error::PolicyResult;

/// Label class for domain patterns when wildcards are allowed.
const WILDCARD_LABEL: &str = r"[\p{L}\p{N}*-]+";

/// Label class for domain patterns when wildcards are forbidden.
const PLAIN_LABEL: &str = r"[\p{L}\p{N}-]+";

/// CSR generation mode that leaves key generation to the backend.
const SERVICE_GENERATED_CSR: &str = "ServiceGenerated";

/// Compile a policy document into its validation grammar.
pub fn compile(doc: &PolicyDocument) -> PolicyResult<CompiledPolicy> {
    let subject = &doc.subject;

    let policy = CompiledPolicy {
        common_name: domain_patterns(&doc.whitelisted_domains, doc.wildcards_allowed, true)?,
        organization: locked_single(&subject.organization)?,
        organizational_unit: locked_multi(&subject.organizational_unit)?,
        locality: locked_single(&subject.city)?,
        province: locked_single(&subject.state)?,
        country: locked_single(&subject.country)?,
        dns_san: domain_patterns(
            &doc.whitelisted_domains,
            doc.wildcards_allowed,
            doc.subj_alt_name_dns_allowed,
        )?,
        ip_san: toggle(doc.subj_alt_name_ip_allowed),
        email_san: toggle(doc.subj_alt_name_email_allowed),
        uri_san: toggle(doc.subj_alt_name_uri_allowed),
        upn_san: toggle(doc.subj_alt_name_upn_allowed),
        allowed_keys: key_configurations(&doc.key_pair)?,
        allow_wildcards: doc.wildcards_allowed,
        allow_key_reuse: doc.private_key_reuse_allowed,
        manual_csr: manual_csr(&doc.csr_generation),
    };

    debug!(
        whitelisted_domains = doc.whitelisted_domains.len(),
        key_configurations = policy.allowed_keys.len(),
        wildcards = policy.allow_wildcards,
        "Compiled zone policy"
    );

    Ok(policy)
}

fn anchor(pattern: &str) -> String {
    format!("^{pattern}$")
}

/// Anchored exact match for a literal value.
fn exact(value: &str) -> String {
    anchor(&regex::escape(value))
}

/// Pattern for one whitelisted domain.
///
/// A leading `.` requires at least one label in front of the domain.
fn domain_pattern(domain: &str, wildcards_allowed: bool) -> String {
    let (domain, requires_prefix) = match domain.strip_prefix('.') {
        Some(rest) => (rest, true),
        None => (domain, false),
    };
    let label = if wildcards_allowed {
        WILDCARD_LABEL
    } else {
        PLAIN_LABEL
    };
    let repeat = if requires_prefix { '+' } else { '*' };
    anchor(&format!("({label}\\.){repeat}{}", regex::escape(domain)))
}

fn domain_patterns(
    domains: &[String],
    wildcards_allowed: bool,
    default_allow_all: bool,
) -> PolicyResult<AttributePatterns> {
    if domains.is_empty() {
        return Ok(toggle(default_allow_all));
    }
    let patterns = domains
        .iter()
        .map(|d| domain_pattern(d, wildcards_allowed))
        .collect();
    AttributePatterns::new(patterns)
}

fn locked_single(attr: &LockedValue<String>) -> PolicyResult<AttributePatterns> {
    if attr.locked {
        trace!(value = %attr.value, "Locked subject attribute");
        AttributePatterns::new(vec![exact(&attr.value)])
    } else {
        Ok(AttributePatterns::permit_all())
    }
}

fn locked_multi(attr: &LockedValues) -> PolicyResult<AttributePatterns> {
    if attr.locked {
        AttributePatterns::new(attr.values.iter().map(|v| exact(v)).collect())
    } else {
        Ok(AttributePatterns::permit_all())
    }
}

fn toggle(allowed: bool) -> AttributePatterns {
    if allowed {
        AttributePatterns::permit_all()
    } else {
        AttributePatterns::disabled()
    }
}

fn manual_csr(csr_generation: &LockedValue<String>) -> ManualCsr {
    if csr_generation.locked && csr_generation.value.eq_ignore_ascii_case(SERVICE_GENERATED_CSR) {
        ManualCsr::Forbidden
    } else {
        ManualCsr::Unspecified
    }
}

/// RSA sizes at or above a locked minimum; all sizes when unlocked.
fn rsa_sizes(key_size: &LockedValue<u32>) -> Vec<u32> {
    SUPPORTED_KEY_SIZES
        .iter()
        .copied()
        .filter(|&s| !key_size.locked || s >= key_size.value)
        .collect()
}

/// The single locked curve, or every supported curve when unlocked.
fn curves(curve: &LockedValue<String>) -> PolicyResult<Vec<EllipticCurve>> {
    if curve.locked {
        Ok(vec![curve.value.parse::<EllipticCurve>()?])
    } else {
        Ok(SUPPORTED_CURVES.to_vec())
    }
}

fn key_configurations(key_pair: &KeyPairPolicy) -> PolicyResult<Vec<AllowedKeyConfiguration>> {
    if key_pair.key_algorithm.locked {
        let key_type = KeyType::from_backend(
            &key_pair.key_algorithm.value,
            &key_pair.elliptic_curve.value,
        )?;
        let config = match key_type {
            KeyType::Rsa => AllowedKeyConfiguration::rsa(rsa_sizes(&key_pair.key_size)),
            elliptic => AllowedKeyConfiguration::elliptic(elliptic, curves(&key_pair.elliptic_curve)?),
        };
        return Ok(vec![config]);
    }

    // Either option satisfies the zone.
    Ok(vec![
        AllowedKeyConfiguration::rsa(rsa_sizes(&key_pair.key_size)),
        AllowedKeyConfiguration::elliptic(KeyType::Ecdsa, curves(&key_pair.elliptic_curve)?),
    ])
}
