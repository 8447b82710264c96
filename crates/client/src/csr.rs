//! Local key and CSR generation.

use rcgen::string::Ia5String;
use rcgen::{
    CertificateParams, DistinguishedName, DnType, KeyPair, OtherNameValue, SanType,
    RsaKeySize, PKCS_ECDSA_P256_SHA256, PKCS_ECDSA_P384_SHA384, PKCS_ECDSA_P521_SHA512,
    PKCS_RSA_SHA256,
};
use tracing::debug;

use certward_common::keys::DEFAULT_RSA_KEY_SIZE;
use certward_common::{CertificateRequest, EllipticCurve, KeyType};

use crate::error::{ClientError, ClientResult};

/// Microsoft UPN other-name OID.
const UPN_OID: [u64; 10] = [1, 3, 6, 1, 4, 1, 311, 20, 2, 3];

/// A freshly generated CSR and the private key behind it.
#[derive(Clone)]
pub struct GeneratedCsr {
    pub csr_pem: String,
    pub private_key_pem: String,
}

impl std::fmt::Debug for GeneratedCsr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedCsr")
            .field("csr_pem", &self.csr_pem)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// Produces a key pair and CSR for a request whose key parameters are set.
pub trait CsrGenerator: Send + Sync {
    fn generate(&self, request: &CertificateRequest) -> ClientResult<GeneratedCsr>;
}

/// [`CsrGenerator`] backed by rcgen.
#[derive(Debug, Clone, Copy, Default)]
pub struct RcgenCsrGenerator;

impl CsrGenerator for RcgenCsrGenerator {
    fn generate(&self, request: &CertificateRequest) -> ClientResult<GeneratedCsr> {
        let key_pair = generate_key(request)?;
        let params = csr_params(request)?;

        let csr = params
            .serialize_request(&key_pair)
            .and_then(|csr| csr.pem())
            .map_err(|e| ClientError::Csr(e.to_string()))?;

        debug!(
            common_name = %request.subject.common_name,
            key_type = %request.key.key_type.unwrap_or_default(),
            "Generated CSR"
        );

        Ok(GeneratedCsr {
            csr_pem: csr,
            private_key_pem: key_pair.serialize_pem(),
        })
    }
}

fn generate_key(request: &CertificateRequest) -> ClientResult<KeyPair> {
    let key = &request.key;
    let result = match key.key_type.unwrap_or_default() {
        KeyType::Rsa => {
            let size = match key.key_size.unwrap_or(DEFAULT_RSA_KEY_SIZE) {
                2048 => RsaKeySize::_2048,
                3072 => RsaKeySize::_3072,
                4096 => RsaKeySize::_4096,
                other => {
                    return Err(ClientError::UnsupportedOperation(format!(
                        "local generation of {other}-bit RSA keys"
                    )))
                }
            };
            KeyPair::generate_rsa_for(&PKCS_RSA_SHA256, size)
        }
        KeyType::Ecdsa => match key.curve.unwrap_or_default() {
            EllipticCurve::P256 => KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256),
            EllipticCurve::P384 => KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384),
            EllipticCurve::P521 => KeyPair::generate_for(&PKCS_ECDSA_P521_SHA512),
            EllipticCurve::Ed25519 => {
                return Err(ClientError::UnsupportedOperation(
                    "ECDSA key on curve ED25519".to_string(),
                ))
            }
        },
        KeyType::Ed25519 => {
            return Err(ClientError::UnsupportedOperation(
                "ED25519 keys are not supported by this backend".to_string(),
            ))
        }
    };
    result.map_err(|e| ClientError::Csr(format!("key generation failed: {e}")))
}

fn csr_params(request: &CertificateRequest) -> ClientResult<CertificateParams> {
    let subject = &request.subject;
    let mut dn = DistinguishedName::new();
    if !subject.common_name.is_empty() {
        dn.push(DnType::CommonName, subject.common_name.as_str());
    }
    for (dn_type, values) in [
        (DnType::OrganizationName, &subject.organization),
        (DnType::OrganizationalUnitName, &subject.organizational_unit),
        (DnType::LocalityName, &subject.locality),
        (DnType::StateOrProvinceName, &subject.province),
        (DnType::CountryName, &subject.country),
    ] {
        for value in values.iter().filter(|v| !v.is_empty()) {
            dn.push(dn_type.clone(), value.as_str());
        }
    }

    let sans = &request.sans;
    let mut names = Vec::new();
    for name in &sans.dns {
        names.push(SanType::DnsName(ia5(name)?));
    }
    for email in &sans.emails {
        names.push(SanType::Rfc822Name(ia5(email)?));
    }
    for ip in &sans.ips {
        names.push(SanType::IpAddress(*ip));
    }
    for uri in &sans.uris {
        names.push(SanType::URI(ia5(uri)?));
    }
    for upn in &sans.upns {
        names.push(SanType::OtherName((
            UPN_OID.to_vec(),
            OtherNameValue::Utf8String(upn.clone()),
        )));
    }

    let mut params = CertificateParams::default();
    params.distinguished_name = dn;
    params.subject_alt_names = names;
    Ok(params)
}

fn ia5(value: &str) -> ClientResult<Ia5String> {
    Ia5String::try_from(value)
        .map_err(|e| ClientError::Csr(format!("invalid SAN value {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use x509_parser::prelude::*;

    fn parse(csr_pem: &str) -> Vec<u8> {
        ::pem::parse(csr_pem).unwrap().into_contents()
    }

    #[test]
    fn test_ecdsa_csr_carries_subject_and_sans() {
        let mut request = CertificateRequest::new("Certs", "web.example.com")
            .with_key(KeyType::Ecdsa)
            .with_dns_names(["web.example.com", "www.example.com"]);
        request.key.curve = Some(EllipticCurve::P384);
        request.subject.organization = vec!["Example Corp".to_string()];
        request.sans.ips = vec!["10.0.0.1".parse().unwrap()];
        request.sans.upns = vec!["svc@example.com".to_string()];

        let generated = RcgenCsrGenerator.generate(&request).unwrap();
        assert!(generated.private_key_pem.contains("PRIVATE KEY"));

        let der = parse(&generated.csr_pem);
        let (_, csr) = X509CertificationRequest::from_der(&der).unwrap();
        let subject = csr.certification_request_info.subject.to_string();
        assert!(subject.contains("CN=web.example.com"), "{subject}");
        assert!(subject.contains("O=Example Corp"), "{subject}");

        let san_count = csr
            .requested_extensions()
            .into_iter()
            .flatten()
            .find_map(|ext| match ext {
                ParsedExtension::SubjectAlternativeName(san) => Some(san.general_names.len()),
                _ => None,
            })
            .unwrap();
        assert_eq!(san_count, 4);
    }

    #[test]
    fn test_rsa_default_size() {
        let request = CertificateRequest::new("Certs", "rsa.example.com");
        let generated = RcgenCsrGenerator.generate(&request).unwrap();
        assert!(generated.csr_pem.starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
    }

    #[test]
    fn test_unsupported_keys_rejected() {
        let mut request = CertificateRequest::new("Certs", "a.example.com");
        request.key.key_size = Some(1024);
        assert!(matches!(
            RcgenCsrGenerator.generate(&request),
            Err(ClientError::UnsupportedOperation(_))
        ));

        let request = CertificateRequest::new("Certs", "a.example.com").with_key(KeyType::Ed25519);
        assert!(matches!(
            RcgenCsrGenerator.generate(&request),
            Err(ClientError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_non_ascii_dns_name_is_csr_error() {
        let request = CertificateRequest::new("Certs", "a.example.com")
            .with_key(KeyType::Ecdsa)
            .with_dns_names(["bücher.example.com"]);
        assert!(matches!(
            RcgenCsrGenerator.generate(&request),
            Err(ClientError::Csr(_))
        ));
    }
}
