//! Configuration linting
//!
//! Flags settings that work but are probably not what the operator meant.

use super::{ValidationResult, ValidationWarning};
use crate::ConnectorConfig;

/// Lint connector settings
pub fn lint_config(config: &ConnectorConfig) -> ValidationResult {
    let mut result = ValidationResult::new();
    let creds = &config.credentials;

    if config.insecure {
        result.add_warning(ValidationWarning::new(
            "Server certificate verification is disabled",
        ));
    }

    if config.base_url.starts_with("http://") {
        result.add_warning(ValidationWarning::new(format!(
            "Base URL {} is not using TLS; credentials are sent in clear text",
            config.base_url
        )));
    }

    if creds.access_token.is_some() && creds.api_key.is_some() {
        result.add_warning(ValidationWarning::new(
            "Both access_token and api_key are set; the access token takes precedence",
        ));
    }

    let can_authenticate = creds.access_token.is_some()
        || creds.refresh_token.is_some()
        || creds.api_key.is_some()
        || (creds.user.is_some() && creds.password.is_some())
        || creds.client_certificate.is_some();
    if !can_authenticate {
        result.add_warning(ValidationWarning::new(
            "No credentials configured; requests will be sent unauthenticated",
        ));
    }

    if config.zone.is_empty() {
        result.add_warning(ValidationWarning::new(
            "No default zone; every request must name its zone",
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lint_insecure() {
        let mut config = ConnectorConfig::new("https://tpp.example.com/");
        config.insecure = true;

        let result = lint_config(&config);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.message.contains("verification is disabled")));
    }

    #[test]
    fn test_lint_token_and_api_key() {
        let mut config = ConnectorConfig::new("https://tpp.example.com/");
        config.credentials.access_token = Some("t".to_string());
        config.credentials.api_key = Some("k".to_string());

        let result = lint_config(&config);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.message.contains("takes precedence")));
    }

    #[test]
    fn test_lint_unauthenticated_plain_http() {
        let config = ConnectorConfig::new("http://tpp.example.com/");

        let result = lint_config(&config);
        assert!(result.is_ok());
        assert!(result.warnings.iter().any(|w| w.message.contains("clear text")));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.message.contains("unauthenticated")));
    }
}
