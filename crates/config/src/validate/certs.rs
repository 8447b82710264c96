//! Certificate file validation
//!
//! Checks that the trust bundle and client certificate files exist and that
//! the trust bundle holds parseable, unexpired certificates.

use super::{ErrorCategory, ValidationError, ValidationResult, ValidationWarning};
use crate::ConnectorConfig;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Certificates expiring within this window produce a warning.
const EXPIRY_WARNING_WINDOW: Duration = Duration::from_secs(30 * 86400);

/// Validate certificate files referenced by the configuration
pub fn validate_certificates(config: &ConnectorConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    if let Some(ref bundle) = config.trust_bundle {
        if config.insecure {
            result.add_warning(ValidationWarning::new(format!(
                "Trust bundle {:?} is ignored because verification is disabled",
                bundle
            )));
        }
        match load_bundle(bundle) {
            Ok(warnings) => {
                for w in warnings {
                    result.add_warning(w);
                }
            }
            Err(e) => result.add_error(e),
        }
    }

    if let Some(ref client_cert) = config.credentials.client_certificate {
        if !client_cert.path.exists() {
            result.add_error(ValidationError::new(
                ErrorCategory::Credentials,
                format!("Client certificate bundle not found: {:?}", client_cert.path),
            ));
        }
    }

    result
}

/// Parse every certificate in a PEM bundle and check expiry.
fn load_bundle(path: &Path) -> Result<Vec<ValidationWarning>, ValidationError> {
    let data = std::fs::read(path).map_err(|e| {
        ValidationError::new(
            ErrorCategory::Certificate,
            format!("Failed to read trust bundle {:?}: {}", path, e),
        )
    })?;

    let blocks = pem::parse_many(&data).map_err(|e| {
        ValidationError::new(
            ErrorCategory::Certificate,
            format!("Failed to parse trust bundle {:?}: {}", path, e),
        )
    })?;

    let certs: Vec<_> = blocks
        .iter()
        .filter(|b| b.tag() == "CERTIFICATE")
        .collect();
    if certs.is_empty() {
        return Err(ValidationError::new(
            ErrorCategory::Certificate,
            format!("Trust bundle {:?} contains no certificates", path),
        ));
    }

    let now = SystemTime::now();
    let mut warnings = Vec::new();
    for block in certs {
        let (_, cert) = x509_parser::parse_x509_certificate(block.contents()).map_err(|e| {
            ValidationError::new(
                ErrorCategory::Certificate,
                format!("Invalid X509 certificate in {:?}: {}", path, e),
            )
        })?;

        let not_after = cert.validity().not_after.timestamp().max(0) as u64;
        let expiry_time = SystemTime::UNIX_EPOCH + Duration::from_secs(not_after);
        let subject = cert.subject().to_string();

        if expiry_time < now {
            warnings.push(ValidationWarning::new(format!(
                "Trusted root {} in {:?} expired at {}",
                subject,
                path,
                cert.validity().not_after
            )));
        } else if expiry_time < now + EXPIRY_WARNING_WINDOW {
            warnings.push(ValidationWarning::new(format!(
                "Trusted root {} in {:?} expires soon ({})",
                subject,
                path,
                cert.validity().not_after
            )));
        }
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientCertificateConfig;
    use std::io::Write;

    fn self_signed_pem() -> String {
        let key = rcgen::KeyPair::generate().unwrap();
        let params = rcgen::CertificateParams::new(vec!["root.example.com".to_string()]).unwrap();
        params.self_signed(&key).unwrap().pem()
    }

    #[test]
    fn test_valid_trust_bundle() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(self_signed_pem().as_bytes()).unwrap();

        let mut config = ConnectorConfig::new("https://tpp.example.com");
        config.trust_bundle = Some(file.path().to_path_buf());

        let result = validate_certificates(&config);
        assert!(result.is_ok(), "{:?}", result.errors);
    }

    #[test]
    fn test_missing_trust_bundle() {
        let mut config = ConnectorConfig::new("https://tpp.example.com");
        config.trust_bundle = Some("/nonexistent/roots.pem".into());

        let result = validate_certificates(&config);
        assert!(result
            .errors
            .iter()
            .any(|e| e.message.contains("Failed to read trust bundle")));
    }

    #[test]
    fn test_bundle_without_certificates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a pem file").unwrap();

        let mut config = ConnectorConfig::new("https://tpp.example.com");
        config.trust_bundle = Some(file.path().to_path_buf());

        let result = validate_certificates(&config);
        assert!(!result.is_ok());
    }

    #[test]
    fn test_missing_client_certificate() {
        let mut config = ConnectorConfig::new("https://tpp.example.com");
        config.credentials.client_certificate = Some(ClientCertificateConfig {
            path: "/nonexistent/client.p12".into(),
            password: "pw".to_string(),
        });

        let result = validate_certificates(&config);
        assert!(result
            .errors
            .iter()
            .any(|e| e.category == ErrorCategory::Credentials));
    }
}
