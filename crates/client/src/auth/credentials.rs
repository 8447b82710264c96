//! Connection credentials.

use std::fmt;

use certward_config::CredentialsConfig;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::tls::ClientBundle;

/// Credentials loaded once at connector construction.
#[derive(Clone, Default)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub api_key: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
    pub scope: String,
    pub client_bundle: Option<ClientBundle>,
}

impl Credentials {
    /// Resolve configured credentials, reading the client bundle from disk.
    pub async fn load(config: &CredentialsConfig) -> ClientResult<Self> {
        let client_bundle = match &config.client_certificate {
            Some(cert) => {
                let data = tokio::fs::read(&cert.path).await.map_err(|source| ClientError::Io {
                    path: cert.path.display().to_string(),
                    source,
                })?;
                debug!(path = %cert.path.display(), "Loaded client certificate bundle");
                Some(ClientBundle {
                    data,
                    password: cert.password.clone(),
                })
            }
            None => None,
        };

        Ok(Self {
            access_token: non_empty(&config.access_token),
            refresh_token: non_empty(&config.refresh_token),
            api_key: non_empty(&config.api_key),
            user: non_empty(&config.user),
            password: config.password.clone(),
            client_id: config.client_id.clone(),
            scope: config.scope.clone(),
            client_bundle,
        })
    }

    /// Whether a password grant is possible.
    pub fn has_password(&self) -> bool {
        self.user.is_some() && self.password.is_some()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.is_some())
            .field("refresh_token", &self.refresh_token.is_some())
            .field("api_key", &self.api_key.is_some())
            .field("user", &self.user)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("client_bundle", &self.client_bundle)
            .finish()
    }
}
