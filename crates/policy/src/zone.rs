//! Zone configuration: the defaults a zone pre-fills into requests.

use std::fmt;
use tracing::{debug, warn};

use certward_common::keys::DEFAULT_RSA_KEY_SIZE;
use certward_common::{CertificateRequest, EllipticCurve, KeyType};

use crate::compiled::{AllowedKeyConfiguration, CompiledPolicy, ManualCsr};
use crate::compiler::compile;
use crate::document::{KeyPairPolicy, PolicyDocument};
use crate::error::PolicyResult;

/// How certificates in a zone are managed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ManagementType {
    #[default]
    Enrollment,
    Provisioning,
    Monitoring,
    Unassigned,
    Unknown(String),
}

impl ManagementType {
    pub fn from_backend(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "enrollment" => ManagementType::Enrollment,
            "provisioning" => ManagementType::Provisioning,
            "monitoring" => ManagementType::Monitoring,
            "unassigned" => ManagementType::Unassigned,
            _ => ManagementType::Unknown(value.to_string()),
        }
    }

    /// Whether the zone accepts enrollment requests at all.
    pub fn permits_requests(&self) -> bool {
        !matches!(self, ManagementType::Monitoring | ManagementType::Unassigned)
    }
}

impl fmt::Display for ManagementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagementType::Enrollment => f.write_str("Enrollment"),
            ManagementType::Provisioning => f.write_str("Provisioning"),
            ManagementType::Monitoring => f.write_str("Monitoring"),
            ManagementType::Unassigned => f.write_str("Unassigned"),
            ManagementType::Unknown(s) => write!(f, "{s}"),
        }
    }
}

/// Simplified zone defaults plus the compiled validation grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneConfiguration {
    pub country: String,
    pub organization: String,
    pub organizational_unit: Vec<String>,
    pub province: String,
    pub locality: String,
    /// Default key shape, when the zone declares a recognizable one.
    pub key_configuration: Option<AllowedKeyConfiguration>,
    pub policy: CompiledPolicy,
    pub management_type: ManagementType,
}

impl ZoneConfiguration {
    /// Derive defaults and compile the policy for a zone document.
    pub fn from_document(doc: &PolicyDocument) -> PolicyResult<Self> {
        let policy = compile(doc)?;
        let subject = &doc.subject;

        Ok(Self {
            country: subject.country.value.clone(),
            organization: subject.organization.value.clone(),
            organizational_unit: subject.organizational_unit.values.clone(),
            province: subject.state.value.clone(),
            locality: subject.city.value.clone(),
            key_configuration: default_key(&doc.key_pair),
            policy,
            management_type: ManagementType::from_backend(&doc.management_type.value),
        })
    }

    /// Apply the `Manual Csr` and `Management Type` policy attributes.
    pub fn with_attributes(mut self, manual_csr: Option<&str>, management_type: Option<&str>) -> Self {
        match ManualCsr::from_attribute(manual_csr) {
            ManualCsr::Unspecified => {}
            flag => self.policy.manual_csr = flag,
        }
        if let Some(value) = management_type {
            self.management_type = ManagementType::from_backend(value);
        }
        self
    }

    /// Fill unset request fields with zone defaults.
    ///
    /// Caller-set values are never overwritten. Without a zone key
    /// configuration, keys default to RSA 2048.
    pub fn apply_to(&self, request: &mut CertificateRequest) {
        let subject = &mut request.subject;
        fill(&mut subject.country, &self.country);
        fill(&mut subject.organization, &self.organization);
        fill(&mut subject.province, &self.province);
        fill(&mut subject.locality, &self.locality);
        if subject.organizational_unit.is_empty() {
            subject.organizational_unit = self.organizational_unit.clone();
        }

        let key = &mut request.key;
        let zone_key = self.key_configuration.as_ref();
        let key_type = *key
            .key_type
            .get_or_insert_with(|| zone_key.map(|k| k.key_type).unwrap_or_default());

        if key_type.is_elliptic() {
            if key.curve.is_none() {
                let zone_curve = zone_key
                    .filter(|k| k.key_type.is_elliptic())
                    .and_then(|k| k.curves.first().copied());
                key.curve = Some(zone_curve.unwrap_or(match key_type {
                    KeyType::Ed25519 => EllipticCurve::Ed25519,
                    _ => EllipticCurve::default(),
                }));
            }
        } else if key.key_size.is_none() {
            let zone_size = zone_key
                .filter(|k| k.key_type == KeyType::Rsa)
                .and_then(|k| k.key_sizes.first().copied());
            key.key_size = Some(zone_size.unwrap_or(DEFAULT_RSA_KEY_SIZE));
        }

        debug!(
            zone = %request.zone,
            key_type = %key_type,
            "Applied zone defaults to request"
        );
    }
}

fn fill(field: &mut Vec<String>, default: &str) {
    if field.is_empty() && !default.is_empty() {
        field.push(default.to_string());
    }
}

/// Default key shape from the document's declared values, locked or not.
fn default_key(key_pair: &KeyPairPolicy) -> Option<AllowedKeyConfiguration> {
    if key_pair.key_algorithm.value.is_empty() {
        return None;
    }
    let key_type = match KeyType::from_backend(
        &key_pair.key_algorithm.value,
        &key_pair.elliptic_curve.value,
    ) {
        Ok(k) => k,
        Err(e) => {
            warn!(error = %e, "Ignoring unrecognized zone key algorithm");
            return None;
        }
    };

    let mut config = AllowedKeyConfiguration {
        key_type,
        key_sizes: Vec::new(),
        curves: Vec::new(),
    };
    if key_pair.key_size.value != 0 {
        config.key_sizes.push(key_pair.key_size.value);
    }
    if !key_pair.elliptic_curve.value.is_empty() {
        match key_pair.elliptic_curve.value.parse::<EllipticCurve>() {
            Ok(curve) => config.curves.push(curve),
            Err(e) => warn!(error = %e, "Ignoring unrecognized zone curve"),
        }
    }
    Some(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{LockedValue, LockedValues, SubjectPolicy};
    use certward_common::KeyParams;

    fn zone_document() -> PolicyDocument {
        PolicyDocument {
            subject: SubjectPolicy {
                country: LockedValue::locked("US".to_string()),
                organization: LockedValue::unlocked("Example Inc.".to_string()),
                organizational_unit: LockedValues {
                    locked: false,
                    values: vec!["Eng".to_string()],
                },
                state: LockedValue::unlocked("Utah".to_string()),
                city: LockedValue::unlocked(String::new()),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_apply_fills_empty_fields() {
        let zone = ZoneConfiguration::from_document(&zone_document()).unwrap();
        let mut request = CertificateRequest::new("Certificates", "web.example.com");
        request.subject.organization = vec!["Caller Org".to_string()];

        zone.apply_to(&mut request);

        assert_eq!(request.subject.country, vec!["US"]);
        assert_eq!(request.subject.organization, vec!["Caller Org"]);
        assert_eq!(request.subject.organizational_unit, vec!["Eng"]);
        assert_eq!(request.subject.province, vec!["Utah"]);
        assert!(request.subject.locality.is_empty());
    }

    #[test]
    fn test_apply_defaults_to_rsa_2048() {
        let zone = ZoneConfiguration::from_document(&PolicyDocument::default()).unwrap();
        assert!(zone.key_configuration.is_none());

        let mut request = CertificateRequest::new("Certificates", "a.example.com");
        zone.apply_to(&mut request);
        assert_eq!(
            request.key,
            KeyParams {
                key_type: Some(KeyType::Rsa),
                key_size: Some(2048),
                curve: None,
            }
        );
    }

    #[test]
    fn test_apply_uses_zone_key() {
        let mut doc = PolicyDocument::default();
        doc.key_pair.key_algorithm = LockedValue::unlocked("ECC".to_string());
        doc.key_pair.elliptic_curve = LockedValue::unlocked("P384".to_string());
        let zone = ZoneConfiguration::from_document(&doc).unwrap();

        let mut request = CertificateRequest::new("Certificates", "a.example.com");
        zone.apply_to(&mut request);
        assert_eq!(request.key.key_type, Some(KeyType::Ecdsa));
        assert_eq!(request.key.curve, Some(EllipticCurve::P384));

        // An explicit RSA choice keeps RSA and gets the default size.
        let mut request = CertificateRequest::new("Certificates", "a.example.com").with_key(KeyType::Rsa);
        zone.apply_to(&mut request);
        assert_eq!(request.key.key_size, Some(2048));
        assert_eq!(request.key.curve, None);
    }

    #[test]
    fn test_unparseable_zone_key_is_ignored() {
        let mut doc = PolicyDocument::default();
        doc.key_pair.key_algorithm = LockedValue::unlocked("DSA".to_string());
        let zone = ZoneConfiguration::from_document(&doc).unwrap();
        assert!(zone.key_configuration.is_none());
    }

    #[test]
    fn test_attributes_override_document() {
        let zone = ZoneConfiguration::from_document(&PolicyDocument::default())
            .unwrap()
            .with_attributes(Some("0"), Some("Monitoring"));
        assert_eq!(zone.policy.manual_csr, ManualCsr::Forbidden);
        assert!(!zone.management_type.permits_requests());
    }

    #[test]
    fn test_management_type_unknown_arm() {
        assert_eq!(
            ManagementType::from_backend("Frobnicate"),
            ManagementType::Unknown("Frobnicate".to_string())
        );
        assert!(ManagementType::from_backend("Frobnicate").permits_requests());
        assert!(!ManagementType::from_backend("unassigned").permits_requests());
        assert_eq!(ManagementType::from_backend(""), ManagementType::Enrollment);
    }
}
