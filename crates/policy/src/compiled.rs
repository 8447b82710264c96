//! Compiled zone policy and offline request validation.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, trace};

use certward_common::keys::DEFAULT_RSA_KEY_SIZE;
use certward_common::{
    CertificateRequest, CsrOrigin, EllipticCurve, KeyParams, KeyType, SanKind,
};

use crate::error::{PolicyError, PolicyResult, Violation, ViolationReason};

/// Permit-all pattern. Anchored, and matches across newlines.
pub const PERMIT_ALL_PATTERN: &str = "^(?s:.*)$";

static PERMIT_ALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PERMIT_ALL_PATTERN).expect("permit-all pattern should compile"));

/// Anchored patterns for one attribute.
///
/// An attribute value is accepted when any pattern matches it. An empty set
/// means the attribute must be absent.
#[derive(Clone)]
pub struct AttributePatterns {
    patterns: Vec<String>,
    regexes: Vec<Regex>,
}

impl AttributePatterns {
    /// Compile a list of anchored patterns.
    pub fn new(patterns: Vec<String>) -> PolicyResult<Self> {
        let regexes = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| PolicyError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<PolicyResult<Vec<_>>>()?;
        Ok(Self { patterns, regexes })
    }

    /// A set that accepts every value.
    pub fn permit_all() -> Self {
        Self {
            patterns: vec![PERMIT_ALL_PATTERN.to_string()],
            regexes: vec![PERMIT_ALL.clone()],
        }
    }

    /// A set that accepts nothing; the attribute must be absent.
    pub fn disabled() -> Self {
        Self {
            patterns: Vec::new(),
            regexes: Vec::new(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_disabled(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regexes.iter().any(|re| re.is_match(value))
    }
}

impl PartialEq for AttributePatterns {
    fn eq(&self, other: &Self) -> bool {
        self.patterns == other.patterns
    }
}

impl Eq for AttributePatterns {}

impl fmt::Debug for AttributePatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.patterns).finish()
    }
}

/// One acceptable key shape: a key type with its permitted sizes or curves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedKeyConfiguration {
    pub key_type: KeyType,
    /// RSA modulus sizes. Empty for elliptic key types.
    pub key_sizes: Vec<u32>,
    /// Curves. Empty for RSA.
    pub curves: Vec<EllipticCurve>,
}

impl AllowedKeyConfiguration {
    pub fn rsa(key_sizes: Vec<u32>) -> Self {
        Self {
            key_type: KeyType::Rsa,
            key_sizes,
            curves: Vec::new(),
        }
    }

    pub fn elliptic(key_type: KeyType, curves: Vec<EllipticCurve>) -> Self {
        Self {
            key_type,
            key_sizes: Vec::new(),
            curves,
        }
    }

    /// Whether key parameters fit this configuration.
    ///
    /// ECDSA and Ed25519 are one family here: the curve decides.
    pub fn permits(&self, key: &KeyParams) -> bool {
        let key_type = key.key_type.unwrap_or_default();
        match (self.key_type.is_elliptic(), key_type.is_elliptic()) {
            (false, false) => {
                let size = key.key_size.unwrap_or(DEFAULT_RSA_KEY_SIZE);
                self.key_sizes.contains(&size)
            }
            (true, true) => {
                let curve = key.curve.unwrap_or(match key_type {
                    KeyType::Ed25519 => EllipticCurve::Ed25519,
                    _ => EllipticCurve::default(),
                });
                self.curves.contains(&curve)
            }
            _ => false,
        }
    }
}

/// Tri-state flag for whether a zone accepts caller-side CSRs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManualCsr {
    /// The zone does not say; caller-side CSRs are accepted.
    #[default]
    Unspecified,
    Allowed,
    Forbidden,
}

impl ManualCsr {
    /// Interpret the backend's `Manual Csr` attribute value.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("0") => ManualCsr::Forbidden,
            Some("1") => ManualCsr::Allowed,
            _ => ManualCsr::Unspecified,
        }
    }

    pub fn permits_caller_csr(&self) -> bool {
        !matches!(self, ManualCsr::Forbidden)
    }
}

/// The offline validation grammar for a zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPolicy {
    pub common_name: AttributePatterns,
    pub organization: AttributePatterns,
    pub organizational_unit: AttributePatterns,
    pub locality: AttributePatterns,
    pub province: AttributePatterns,
    pub country: AttributePatterns,
    pub dns_san: AttributePatterns,
    pub ip_san: AttributePatterns,
    pub email_san: AttributePatterns,
    pub uri_san: AttributePatterns,
    pub upn_san: AttributePatterns,
    /// A key is allowed when it fits at least one entry.
    pub allowed_keys: Vec<AllowedKeyConfiguration>,
    pub allow_wildcards: bool,
    pub allow_key_reuse: bool,
    /// Whether CSRs generated by the caller are accepted.
    pub manual_csr: ManualCsr,
}

impl CompiledPolicy {
    /// Patterns for a SAN kind.
    pub fn san_patterns(&self, kind: SanKind) -> &AttributePatterns {
        match kind {
            SanKind::Dns => &self.dns_san,
            SanKind::Email => &self.email_san,
            SanKind::Ip => &self.ip_san,
            SanKind::Uri => &self.uri_san,
            SanKind::Upn => &self.upn_san,
        }
    }

    /// Whether some allowed key configuration accepts these parameters.
    pub fn permits_key(&self, key: &KeyParams) -> bool {
        self.allowed_keys.iter().any(|k| k.permits(key))
    }

    /// Check a request against the zone, collecting every violation.
    ///
    /// Key parameters are not checked for user-provided CSRs; the key is
    /// inside the CSR and the backend checks it.
    pub fn validate(&self, request: &CertificateRequest) -> PolicyResult<()> {
        let mut violations = Vec::new();
        let subject = &request.subject;

        if !subject.common_name.is_empty() {
            check_value(&mut violations, "CN", &self.common_name, &subject.common_name);
            if !self.allow_wildcards && subject.common_name.contains('*') {
                violations.push(Violation::new(
                    "CN",
                    &subject.common_name,
                    ViolationReason::WildcardForbidden,
                ));
            }
        }

        check_values(&mut violations, "O", &self.organization, &subject.organization);
        check_values(
            &mut violations,
            "OU",
            &self.organizational_unit,
            &subject.organizational_unit,
        );
        check_values(&mut violations, "L", &self.locality, &subject.locality);
        check_values(&mut violations, "ST", &self.province, &subject.province);
        check_values(&mut violations, "C", &self.country, &subject.country);

        for kind in [SanKind::Dns, SanKind::Ip, SanKind::Email, SanKind::Uri, SanKind::Upn] {
            let attribute = format!("{kind} SAN");
            let values = request.sans.values(kind);
            check_values(&mut violations, &attribute, self.san_patterns(kind), &values);
        }

        if !self.allow_wildcards {
            for name in request.sans.dns.iter().filter(|n| n.contains('*')) {
                violations.push(Violation::new(
                    "DNS SAN",
                    name,
                    ViolationReason::WildcardForbidden,
                ));
            }
        }

        if request.csr_origin != CsrOrigin::UserProvided && !self.permits_key(&request.key) {
            violations.push(Violation::new(
                "key",
                describe_key(&request.key),
                ViolationReason::KeyNotAllowed,
            ));
        }

        if violations.is_empty() {
            trace!(common_name = %subject.common_name, "Request satisfies zone policy");
            Ok(())
        } else {
            debug!(
                common_name = %subject.common_name,
                violation_count = violations.len(),
                "Request violates zone policy"
            );
            Err(PolicyError::Violations(violations))
        }
    }
}

fn check_value(out: &mut Vec<Violation>, attribute: &str, patterns: &AttributePatterns, value: &str) {
    if patterns.is_disabled() {
        out.push(Violation::new(attribute, value, ViolationReason::MustBeAbsent));
    } else if !patterns.is_match(value) {
        out.push(Violation::new(attribute, value, ViolationReason::NotPermitted));
    }
}

fn check_values(
    out: &mut Vec<Violation>,
    attribute: &str,
    patterns: &AttributePatterns,
    values: &[String],
) {
    for value in values {
        check_value(out, attribute, patterns, value);
    }
}

fn describe_key(key: &KeyParams) -> String {
    let key_type = key.key_type.unwrap_or_default();
    match key_type {
        KeyType::Rsa => format!(
            "{key_type} {}",
            key.key_size.unwrap_or(DEFAULT_RSA_KEY_SIZE)
        ),
        _ => format!(
            "{key_type} {}",
            key.curve.map(|c| c.to_string()).unwrap_or_else(|| "default curve".to_string())
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permit_all_matches_anything() {
        let patterns = AttributePatterns::permit_all();
        assert!(patterns.is_match(""));
        assert!(patterns.is_match("anything at all"));
        assert!(patterns.is_match("multi\nline"));
    }

    #[test]
    fn test_disabled_matches_nothing() {
        let patterns = AttributePatterns::disabled();
        assert!(patterns.is_disabled());
        assert!(!patterns.is_match(""));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let err = AttributePatterns::new(vec!["^(unclosed$".to_string()]).unwrap_err();
        assert!(matches!(err, PolicyError::Pattern { .. }));
    }

    #[test]
    fn test_rsa_configuration_permits_default_size() {
        let config = AllowedKeyConfiguration::rsa(vec![2048, 4096]);
        assert!(config.permits(&KeyParams::default()));
        assert!(!config.permits(&KeyParams {
            key_type: Some(KeyType::Rsa),
            key_size: Some(1024),
            curve: None,
        }));
        assert!(!config.permits(&KeyParams {
            key_type: Some(KeyType::Ecdsa),
            key_size: None,
            curve: Some(EllipticCurve::P256),
        }));
    }

    #[test]
    fn test_elliptic_configuration_covers_ed25519_curve() {
        let config = AllowedKeyConfiguration::elliptic(
            KeyType::Ecdsa,
            vec![EllipticCurve::P256, EllipticCurve::Ed25519],
        );
        assert!(config.permits(&KeyParams {
            key_type: Some(KeyType::Ed25519),
            key_size: None,
            curve: None,
        }));
        assert!(!config.permits(&KeyParams {
            key_type: Some(KeyType::Ecdsa),
            key_size: None,
            curve: Some(EllipticCurve::P384),
        }));
    }

    #[test]
    fn test_manual_csr_attribute() {
        assert_eq!(ManualCsr::from_attribute(Some("0")), ManualCsr::Forbidden);
        assert_eq!(ManualCsr::from_attribute(Some("1")), ManualCsr::Allowed);
        assert_eq!(ManualCsr::from_attribute(None), ManualCsr::Unspecified);
        assert!(ManualCsr::Unspecified.permits_caller_csr());
        assert!(!ManualCsr::Forbidden.permits_caller_csr());
    }
}
