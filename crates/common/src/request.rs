//! Caller-facing certificate request model.
//!
//! A [`CertificateRequest`] is built by the caller, filled in place with
//! zone defaults, checked against the zone's compiled policy, and finally
//! serialized by the client into the backend's wire format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::keys::{EllipticCurve, KeyType};

/// Where the CSR for a request comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CsrOrigin {
    /// The client generates the key pair and CSR before submitting.
    #[default]
    LocalGenerated,
    /// The caller supplies a ready-made CSR.
    UserProvided,
    /// The backend generates the key pair; no CSR is sent.
    ServiceGenerated,
}

impl CsrOrigin {
    /// Whether this origin sends a CSR the zone must accept.
    pub fn carries_csr(&self) -> bool {
        !matches!(self, CsrOrigin::ServiceGenerated)
    }
}

impl fmt::Display for CsrOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CsrOrigin::LocalGenerated => "local",
            CsrOrigin::UserProvided => "file",
            CsrOrigin::ServiceGenerated => "service",
        };
        f.write_str(s)
    }
}

/// Subject distinguished name fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub common_name: String,
    #[serde(default)]
    pub organization: Vec<String>,
    #[serde(default)]
    pub organizational_unit: Vec<String>,
    #[serde(default)]
    pub locality: Vec<String>,
    #[serde(default)]
    pub province: Vec<String>,
    #[serde(default)]
    pub country: Vec<String>,
}

/// Kind of a subject alternative name entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SanKind {
    Dns,
    Email,
    Ip,
    Uri,
    Upn,
}

impl SanKind {
    /// GeneralName tag the backend uses for this kind.
    pub fn wire_type(&self) -> u8 {
        match self {
            SanKind::Upn => 0,
            SanKind::Email => 1,
            SanKind::Dns => 2,
            SanKind::Uri => 6,
            SanKind::Ip => 7,
        }
    }
}

impl fmt::Display for SanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SanKind::Dns => "DNS",
            SanKind::Email => "email",
            SanKind::Ip => "IP",
            SanKind::Uri => "URI",
            SanKind::Upn => "UPN",
        };
        f.write_str(s)
    }
}

/// Typed subject alternative names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAltNames {
    #[serde(default)]
    pub dns: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub ips: Vec<IpAddr>,
    #[serde(default)]
    pub uris: Vec<String>,
    #[serde(default)]
    pub upns: Vec<String>,
}

impl SubjectAltNames {
    /// All entries as `(kind, value)` pairs, grouped by kind.
    pub fn entries(&self) -> Vec<(SanKind, String)> {
        let mut out = Vec::new();
        out.extend(self.emails.iter().map(|v| (SanKind::Email, v.clone())));
        out.extend(self.dns.iter().map(|v| (SanKind::Dns, v.clone())));
        out.extend(self.ips.iter().map(|v| (SanKind::Ip, v.to_string())));
        out.extend(self.uris.iter().map(|v| (SanKind::Uri, v.clone())));
        out.extend(self.upns.iter().map(|v| (SanKind::Upn, v.clone())));
        out
    }

    /// Values of one kind, rendered as strings.
    pub fn values(&self, kind: SanKind) -> Vec<String> {
        match kind {
            SanKind::Dns => self.dns.clone(),
            SanKind::Email => self.emails.clone(),
            SanKind::Ip => self.ips.iter().map(|ip| ip.to_string()).collect(),
            SanKind::Uri => self.uris.clone(),
            SanKind::Upn => self.upns.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dns.is_empty()
            && self.emails.is_empty()
            && self.ips.is_empty()
            && self.uris.is_empty()
            && self.upns.is_empty()
    }
}

/// Key parameters. Unset fields are filled from zone defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyParams {
    pub key_type: Option<KeyType>,
    pub key_size: Option<u32>,
    pub curve: Option<EllipticCurve>,
}

/// How a custom field value is delivered to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomFieldKind {
    /// Sent in the custom fields list.
    #[default]
    Plain,
    /// Sent as the request's origin (application identifier).
    Origin,
}

/// A custom field value attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub kind: CustomFieldKind,
}

impl CustomField {
    pub fn plain(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: CustomFieldKind::Plain,
        }
    }
}

/// Backend identity (user or group), as returned by identity lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IdentityEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefixed_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefixed_universal: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub r#type: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub universal: String,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

/// Device the issued certificate is installed on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Host (instance) name.
    pub instance: String,
    /// Application name on the host. Defaults to `Default`.
    #[serde(default)]
    pub workload: String,
    /// `host:port` the certificate is served on, for validation.
    #[serde(default)]
    pub tls_address: String,
    /// Zone to create the device in, if different from the request zone.
    #[serde(default)]
    pub zone: Option<String>,
}

/// CA family the requested validity period is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssuerHint {
    #[default]
    Generic,
    DigiCert,
    Microsoft,
    Entrust,
}

impl IssuerHint {
    /// CA-specific attribute carrying the requested end date.
    pub fn end_date_attribute(&self) -> &'static str {
        match self {
            IssuerHint::Generic => "Specific End Date",
            IssuerHint::DigiCert => "DigiCert CA:Specific End Date",
            IssuerHint::Microsoft => "Microsoft CA:Specific End Date",
            IssuerHint::Entrust => "EntrustNET CA:Specific End Date",
        }
    }
}

/// A certificate enrollment request.
#[derive(Clone, Default)]
pub struct CertificateRequest {
    /// Zone (policy folder) the certificate is requested in.
    pub zone: String,
    pub subject: Subject,
    pub sans: SubjectAltNames,
    pub key: KeyParams,
    pub csr_origin: CsrOrigin,
    /// PEM-encoded CSR. Supplied by the caller for `UserProvided`,
    /// filled by the client for `LocalGenerated`.
    pub csr: Vec<u8>,
    /// PEM-encoded private key generated alongside a local CSR.
    pub private_key_pem: Option<String>,
    /// Object name; the common name is used when empty.
    pub friendly_name: String,
    pub custom_fields: Vec<CustomField>,
    pub contacts: Vec<IdentityEntry>,
    pub location: Option<Location>,
    /// Requested validity in hours, delivered as a CA-specific attribute.
    pub validity_hours: Option<u32>,
    pub issuer_hint: IssuerHint,
    /// Path of a specific CA template to issue from.
    pub ca_path: Option<String>,
    /// Server-side work timeout for issuance.
    pub timeout: Option<Duration>,
    /// Password protecting a service-generated private key on retrieval.
    pub key_password: Option<String>,
}

impl CertificateRequest {
    /// Create a request for a common name in a zone.
    pub fn new(zone: impl Into<String>, common_name: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            subject: Subject {
                common_name: common_name.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_csr_origin(mut self, origin: CsrOrigin) -> Self {
        self.csr_origin = origin;
        self
    }

    pub fn with_csr(mut self, csr_pem: impl Into<Vec<u8>>) -> Self {
        self.csr = csr_pem.into();
        self
    }

    pub fn with_dns_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sans.dns.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_key(mut self, key_type: KeyType) -> Self {
        self.key.key_type = Some(key_type);
        self
    }

    /// Name the certificate object will carry in the backend.
    pub fn object_name(&self) -> &str {
        if self.friendly_name.is_empty() {
            &self.subject.common_name
        } else {
            &self.friendly_name
        }
    }
}

impl fmt::Debug for CertificateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateRequest")
            .field("zone", &self.zone)
            .field("subject", &self.subject)
            .field("sans", &self.sans)
            .field("key", &self.key)
            .field("csr_origin", &self.csr_origin)
            .field("csr_len", &self.csr.len())
            .field("has_private_key", &self.private_key_pem.is_some())
            .field("friendly_name", &self.friendly_name)
            .field("custom_fields", &self.custom_fields.len())
            .field("location", &self.location)
            .field("validity_hours", &self.validity_hours)
            .finish()
    }
}
