//! Backend policy document.
//!
//! This is the zone policy exactly as the backend's policy-check resource
//! returns it: each attribute carries a value and a `Locked` flag. Missing
//! or `null` fields decode to their defaults.

use serde::{Deserialize, Deserializer, Serialize};

/// A single policy value together with its lock flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    rename_all = "PascalCase",
    bound(deserialize = "T: Deserialize<'de> + Default")
)]
pub struct LockedValue<T> {
    #[serde(default, deserialize_with = "nullable")]
    pub locked: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub value: T,
}

impl<T: Default> LockedValue<T> {
    pub fn locked(value: T) -> Self {
        Self {
            locked: true,
            value,
        }
    }

    pub fn unlocked(value: T) -> Self {
        Self {
            locked: false,
            value,
        }
    }
}

/// A multi-valued policy attribute together with its lock flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LockedValues {
    #[serde(default, deserialize_with = "nullable")]
    pub locked: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub values: Vec<String>,
}

/// Key pair constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyPairPolicy {
    #[serde(default)]
    pub key_algorithm: LockedValue<String>,
    #[serde(default)]
    pub key_size: LockedValue<u32>,
    #[serde(default)]
    pub elliptic_curve: LockedValue<String>,
}

/// Subject constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubjectPolicy {
    #[serde(default)]
    pub city: LockedValue<String>,
    #[serde(default)]
    pub country: LockedValue<String>,
    #[serde(default)]
    pub organization: LockedValue<String>,
    #[serde(default)]
    pub organizational_unit: LockedValues,
    #[serde(default)]
    pub state: LockedValue<String>,
}

/// Zone policy as declared by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    #[serde(default)]
    pub certificate_authority: LockedValue<String>,
    #[serde(default)]
    pub csr_generation: LockedValue<String>,
    #[serde(default)]
    pub key_generation: LockedValue<String>,
    #[serde(default)]
    pub key_pair: KeyPairPolicy,
    #[serde(default)]
    pub management_type: LockedValue<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub private_key_reuse_allowed: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub subj_alt_name_dns_allowed: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub subj_alt_name_email_allowed: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub subj_alt_name_ip_allowed: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub subj_alt_name_upn_allowed: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub subj_alt_name_uri_allowed: bool,
    #[serde(default)]
    pub subject: SubjectPolicy,
    #[serde(default, deserialize_with = "nullable")]
    pub unique_subject_enforced: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub whitelisted_domains: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub wildcards_allowed: bool,
}

impl PolicyDocument {
    /// Decode a policy document from its JSON form.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_backend_document() {
        let json = br#"{
            "CertificateAuthority": {"Locked": false, "Value": "\\VED\\Policy\\CA Templates\\MSCA"},
            "CsrGeneration": {"Locked": false, "Value": "ServiceGenerated"},
            "KeyGeneration": {"Locked": false, "Value": "Central"},
            "KeyPair": {
                "KeyAlgorithm": {"Locked": true, "Value": "RSA"},
                "KeySize": {"Locked": true, "Value": 2048},
                "EllipticCurve": {"Locked": false, "Value": null}
            },
            "ManagementType": {"Locked": false, "Value": "Enrollment"},
            "PrivateKeyReuseAllowed": true,
            "SubjAltNameDnsAllowed": true,
            "SubjAltNameEmailAllowed": false,
            "SubjAltNameIpAllowed": false,
            "SubjAltNameUpnAllowed": false,
            "SubjAltNameUriAllowed": false,
            "Subject": {
                "City": {"Locked": false, "Value": "Salt Lake City"},
                "Country": {"Locked": true, "Value": "US"},
                "Organization": {"Locked": true, "Value": "Example Inc."},
                "OrganizationalUnit": {"Locked": false, "Values": null},
                "State": {"Locked": false, "Value": "Utah"}
            },
            "UniqueSubjectEnforced": false,
            "WhitelistedDomains": null,
            "WildcardsAllowed": true
        }"#;

        let doc = PolicyDocument::from_json(json).unwrap();
        assert!(doc.key_pair.key_algorithm.locked);
        assert_eq!(doc.key_pair.key_size.value, 2048);
        assert_eq!(doc.key_pair.elliptic_curve.value, "");
        assert_eq!(doc.subject.country, LockedValue::locked("US".to_string()));
        assert!(doc.subject.organizational_unit.values.is_empty());
        assert!(doc.whitelisted_domains.is_empty());
        assert!(doc.wildcards_allowed);
    }

    #[test]
    fn test_decode_empty_document() {
        let doc = PolicyDocument::from_json(b"{}").unwrap();
        assert_eq!(doc, PolicyDocument::default());
    }
}
