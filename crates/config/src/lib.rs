//! Certward Configuration
//!
//! Connector configuration: where the backend lives, how to authenticate,
//! and how to trust it. Configuration is loaded from TOML, overridden from
//! `CERTWARD_*` environment variables, normalized, then validated.
//!
//! ```toml
//! base_url = "tpp.example.com"
//! zone = "Certificates\\Web"
//!
//! [credentials]
//! user = "svc-enroll"
//! password = "..."
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, trace};

use certward_common::ChainOrder;

pub mod base_url;
pub mod error;
pub mod validate;

pub use base_url::normalize_base_url;
pub use error::ConfigError;
pub use validate::{validate_files, ValidationResult};

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "CERTWARD_";

/// Client identifier sent with token grants when none is configured.
pub const DEFAULT_CLIENT_ID: &str = "certward-sdk";

/// Token scope requested when none is configured.
pub const DEFAULT_SCOPE: &str = "certificate:manage,revoke";

// ============================================================================
// Connector Configuration
// ============================================================================

/// Root connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Backend base URL. Normalized by [`ConnectorConfig::normalize`].
    pub base_url: String,

    /// Default zone for requests that name none.
    #[serde(default)]
    pub zone: String,

    /// Authentication settings.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// PEM file whose certificates become the trusted roots.
    #[serde(default)]
    pub trust_bundle: Option<PathBuf>,

    /// Disable server certificate verification entirely.
    #[serde(default)]
    pub insecure: bool,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Delay between retrieve attempts while issuance is pending, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Total time to wait for issuance, in seconds.
    #[serde(default = "default_retrieve_timeout")]
    pub retrieve_timeout_secs: u64,

    /// Order of retrieved chains.
    #[serde(default)]
    pub chain_order: ChainOrder,
}

fn default_request_timeout() -> u64 {
    60
}
fn default_poll_interval() -> u64 {
    5
}
fn default_retrieve_timeout() -> u64 {
    180
}

/// Authentication settings.
///
/// At most one scheme is active per connection: a bearer token wins over an
/// API key, and with neither, requests go out unauthenticated. Username and
/// password (or a client certificate) are used to obtain a token.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Legacy API key.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Client certificate bundle for mutual TLS and certificate grants.
    #[serde(default)]
    pub client_certificate: Option<ClientCertificateConfig>,
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}
fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("access_token", &redacted(&self.access_token))
            .field("refresh_token", &redacted(&self.refresh_token))
            .field("api_key", &redacted(&self.api_key))
            .field("user", &self.user)
            .field("password", &redacted(&self.password))
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("client_certificate", &self.client_certificate)
            .finish()
    }
}

/// Password-protected client certificate bundle.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientCertificateConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for ClientCertificateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificateConfig")
            .field("path", &self.path)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "<redacted>")
}

/// Environment overrides (`CERTWARD_BASE_URL`, `CERTWARD_ACCESS_TOKEN`, ...).
#[derive(Debug, Default, Deserialize)]
pub struct EnvOverrides {
    pub base_url: Option<String>,
    pub zone: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub api_key: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub trust_bundle: Option<PathBuf>,
    pub insecure: Option<bool>,
}

impl EnvOverrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::prefixed(ENV_PREFIX).from_env()?)
    }

    /// Read overrides from explicit `(name, value)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(ENV_PREFIX).from_iter(pairs)?)
    }
}

impl ConnectorConfig {
    /// Minimal configuration for a base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            zone: String::new(),
            credentials: CredentialsConfig {
                client_id: default_client_id(),
                scope: default_scope(),
                ..Default::default()
            },
            trust_bundle: None,
            insecure: false,
            request_timeout_secs: default_request_timeout(),
            poll_interval_secs: default_poll_interval(),
            retrieve_timeout_secs: default_retrieve_timeout(),
            chain_order: ChainOrder::default(),
        }
    }

    /// Load, override from the environment, normalize and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading connector configuration");

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_overrides(EnvOverrides::from_env()?);
        config.normalize()?;
        config.validate()?;

        debug!(
            base_url = %config.base_url,
            zone = %config.zone,
            insecure = config.insecure,
            "Connector configuration loaded"
        );
        Ok(config)
    }

    /// Parse TOML without overrides or validation.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides on top of file settings.
    pub fn apply_overrides(&mut self, env: EnvOverrides) {
        fn set<T>(target: &mut T, value: Option<T>, name: &str) {
            if let Some(v) = value {
                trace!(setting = name, "Applying environment override");
                *target = v;
            }
        }

        let creds = &mut self.credentials;
        set(&mut self.base_url, env.base_url, "base_url");
        set(&mut self.zone, env.zone, "zone");
        set(&mut creds.client_id, env.client_id, "client_id");
        set(&mut self.insecure, env.insecure, "insecure");
        set(&mut creds.access_token, env.access_token.map(Some), "access_token");
        set(&mut creds.refresh_token, env.refresh_token.map(Some), "refresh_token");
        set(&mut creds.api_key, env.api_key.map(Some), "api_key");
        set(&mut creds.user, env.user.map(Some), "user");
        set(&mut creds.password, env.password.map(Some), "password");
        set(&mut self.trust_bundle, env.trust_bundle.map(Some), "trust_bundle");
    }

    /// Normalize the base URL in place.
    pub fn normalize(&mut self) -> Result<(), ConfigError> {
        self.base_url = normalize_base_url(&self.base_url)?;
        Ok(())
    }

    /// Structural validation. File contents are checked by [`validate_files`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_base_url(&self.base_url)?;

        let creds = &self.credentials;
        if creds.password.is_some() && creds.user.is_none() {
            return Err(ConfigError::Invalid(
                "password is set without a user".to_string(),
            ));
        }
        if creds.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid("client_id must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.poll_interval_secs > self.retrieve_timeout_secs {
            return Err(ConfigError::Invalid(format!(
                "poll_interval_secs ({}) exceeds retrieve_timeout_secs ({})",
                self.poll_interval_secs, self.retrieve_timeout_secs
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn retrieve_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieve_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
base_url = "tpp.example.com/vedsdk"
zone = "Certificates\\Web"
insecure = false
chain_order = "root-first"

[credentials]
user = "svc-enroll"
password = "hunter2"

[credentials.client_certificate]
path = "/etc/certward/client.pem"
password = "bundle-pass"
"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = ConnectorConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.zone, "Certificates\\Web");
        assert_eq!(config.credentials.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(config.credentials.scope, DEFAULT_SCOPE);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.chain_order, ChainOrder::RootFirst);
        assert_eq!(
            config.credentials.client_certificate.as_ref().unwrap().password,
            "bundle-pass"
        );
    }

    #[test]
    fn test_load_normalizes_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = ConnectorConfig::load(file.path()).unwrap();
        assert_eq!(config.base_url, "https://tpp.example.com/");
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConnectorConfig::load("/nonexistent/certward.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ConnectorConfig::from_toml_str(SAMPLE).unwrap();
        let env = EnvOverrides::from_pairs(vec![
            ("CERTWARD_ACCESS_TOKEN".to_string(), "tok".to_string()),
            ("CERTWARD_ZONE".to_string(), "Other".to_string()),
            ("CERTWARD_INSECURE".to_string(), "true".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ])
        .unwrap();

        config.apply_overrides(env);
        assert_eq!(config.credentials.access_token.as_deref(), Some("tok"));
        assert_eq!(config.zone, "Other");
        assert!(config.insecure);
        assert_eq!(config.credentials.user.as_deref(), Some("svc-enroll"));
    }

    #[test]
    fn test_validate_rejects_password_without_user() {
        let mut config = ConnectorConfig::new("https://tpp.example.com");
        config.credentials.password = Some("secret".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_poll_interval_beyond_timeout() {
        let mut config = ConnectorConfig::new("https://tpp.example.com");
        config.poll_interval_secs = 600;
        assert!(config.validate().is_err());
        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ConnectorConfig::from_toml_str(SAMPLE).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("bundle-pass"));
        assert!(debug.contains("svc-enroll"));
    }
}
