//! Token manager.
//!
//! Holds the connection's bearer token (or legacy API key) and replaces it
//! on refresh. Readers load the current value lock-free from an
//! [`ArcSwapOption`] and always see a whole token; writers serialize on an
//! async mutex so concurrent callers trigger at most one refresh.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::credentials::Credentials;
use super::token::{
    ApiKey, ApiKeyRequest, ApiKeyResponse, CertificateGrantRequest, PasswordGrantRequest,
    RefreshGrantRequest, TokenInfo, TokenResponse, TokenVerification, ValidityWindow,
};
use crate::error::{ClientError, ClientResult};
use crate::transport::{AuthHeader, Resource, Transport};

/// Refresh this long before the token expires.
const DEFAULT_REFRESH_MARGIN_SECS: i64 = 60;

/// Acquires, refreshes and revokes credentials for one connection.
pub struct TokenManager {
    credentials: Credentials,
    token: ArcSwapOption<TokenInfo>,
    api_key: ArcSwapOption<ApiKey>,
    refresh_lock: Mutex<()>,
    refresh_margin: ChronoDuration,
}

impl TokenManager {
    /// Seed the manager with any configured token or API key.
    pub fn new(credentials: Credentials) -> Self {
        let token = credentials
            .access_token
            .clone()
            .map(|t| Arc::new(TokenInfo::from_static(t, credentials.refresh_token.clone())));
        let api_key = credentials.api_key.clone().map(|key| {
            Arc::new(ApiKey {
                key,
                valid_until: None,
            })
        });

        Self {
            credentials,
            token: ArcSwapOption::new(token),
            api_key: ArcSwapOption::new(api_key),
            refresh_lock: Mutex::new(()),
            refresh_margin: ChronoDuration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
        }
    }

    pub fn with_refresh_margin(mut self, margin: std::time::Duration) -> Self {
        self.refresh_margin =
            ChronoDuration::from_std(margin).unwrap_or(ChronoDuration::seconds(DEFAULT_REFRESH_MARGIN_SECS));
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Current bearer token, if any.
    pub fn current(&self) -> Option<Arc<TokenInfo>> {
        self.token.load_full()
    }

    /// Validity window of the current token.
    pub fn validity(&self) -> Option<ValidityWindow> {
        self.token.load_full().map(|t| t.validity())
    }

    /// Authentication for the next request: bearer, then API key, then none.
    pub fn auth_header(&self) -> AuthHeader {
        let token = self.token.load_full();
        let api_key = self.api_key.load_full();
        AuthHeader::select(
            token.as_ref().map(|t| t.access_token.as_str()),
            api_key.as_ref().map(|k| k.key.as_str()),
        )
    }

    /// Obtain a token if none is configured.
    ///
    /// Uses the password grant when a username and password are set, then
    /// the client-certificate grant when a client certificate is attached.
    /// Otherwise the connection stays on its API key, or unauthenticated.
    pub async fn authenticate(&self, transport: &Transport) -> ClientResult<()> {
        if self.token.load().is_some() {
            return Ok(());
        }
        if self.credentials.has_password() {
            self.authorize_password(transport).await?;
        } else if transport.tls().has_client_certificate() {
            self.authorize_certificate(transport).await?;
        } else if self.api_key.load().is_none() {
            debug!("No credentials configured, requests will be unauthenticated");
        }
        Ok(())
    }

    /// Password grant.
    pub async fn authorize_password(&self, transport: &Transport) -> ClientResult<Arc<TokenInfo>> {
        let _guard = self.refresh_lock.lock().await;
        self.authorize_password_locked(transport).await
    }

    /// Password grant; the caller holds `refresh_lock`.
    async fn authorize_password_locked(&self, transport: &Transport) -> ClientResult<Arc<TokenInfo>> {
        let (user, password) = match (&self.credentials.user, &self.credentials.password) {
            (Some(u), Some(p)) => (u.as_str(), p.as_str()),
            _ => {
                return Err(ClientError::Authentication(
                    "username and password are required for the password grant".to_string(),
                ))
            }
        };

        let body = PasswordGrantRequest {
            client_id: &self.credentials.client_id,
            username: user,
            password,
            scope: &self.credentials.scope,
        };
        let response: TokenResponse = transport
            .post("authorize", Resource::AuthorizeOAuth, &AuthHeader::None, &body)
            .await?
            .expect_status("authorize", &[200])?
            .json("authorize")?;

        let token = self.store(response, None);
        info!(identity = %token.identity, "Obtained access token via password grant");
        Ok(token)
    }

    /// Client-certificate grant. The transport must carry the certificate.
    pub async fn authorize_certificate(&self, transport: &Transport) -> ClientResult<Arc<TokenInfo>> {
        if !transport.tls().has_client_certificate() {
            return Err(ClientError::Authentication(
                "certificate grant requires a client certificate".to_string(),
            ));
        }

        let _guard = self.refresh_lock.lock().await;
        let body = CertificateGrantRequest {
            client_id: &self.credentials.client_id,
            scope: &self.credentials.scope,
        };
        let response: TokenResponse = transport
            .post(
                "authorize_certificate",
                Resource::AuthorizeCertificate,
                &AuthHeader::None,
                &body,
            )
            .await?
            .expect_status("authorize_certificate", &[200])?
            .json("authorize_certificate")?;

        let token = self.store(response, None);
        info!(identity = %token.identity, "Obtained access token via client certificate");
        Ok(token)
    }

    /// Refresh-token grant.
    pub async fn refresh(&self, transport: &Transport) -> ClientResult<Arc<TokenInfo>> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked(transport).await
    }

    async fn refresh_locked(&self, transport: &Transport) -> ClientResult<Arc<TokenInfo>> {
        let previous = self.token.load_full();
        let refresh_token = previous
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .or_else(|| self.credentials.refresh_token.clone())
            .ok_or_else(|| ClientError::Authentication("no refresh token available".to_string()))?;

        let body = RefreshGrantRequest {
            client_id: &self.credentials.client_id,
            refresh_token: &refresh_token,
        };
        let response: TokenResponse = transport
            .post("refresh_token", Resource::RefreshToken, &AuthHeader::None, &body)
            .await?
            .expect_status("refresh_token", &[200])?
            .json("refresh_token")?;

        let token = self.store(response, previous.as_deref());
        info!(expires = ?token.expires, "Refreshed access token");
        Ok(token)
    }

    /// Refresh the token if it expires within the refresh margin.
    ///
    /// Call before a long polling loop. Falls back to the password grant
    /// when the refresh token is missing or past its window.
    pub async fn ensure_fresh(&self, transport: &Transport) -> ClientResult<()> {
        let now = Utc::now();
        let stale = |m: &Self| {
            m.validity()
                .is_some_and(|w| w.needs_refresh_at(now, m.refresh_margin))
        };
        if !stale(self) {
            return Ok(());
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed or re-authorized while we waited.
        if !stale(self) {
            return Ok(());
        }

        let window = self.validity();
        let can_refresh = window.is_some_and(|w| w.can_refresh_at(now))
            && (self.current().is_some_and(|t| t.refresh_token.is_some())
                || self.credentials.refresh_token.is_some());

        if can_refresh {
            self.refresh_locked(transport).await?;
            return Ok(());
        }

        if self.credentials.has_password() {
            warn!("Refresh token unusable, re-authorizing with password");
            self.authorize_password_locked(transport).await?;
            Ok(())
        } else {
            Err(ClientError::Authentication(
                "access token is expiring and cannot be refreshed".to_string(),
            ))
        }
    }

    /// Exchange username and password for a legacy API key.
    pub async fn authorize_api_key(&self, transport: &Transport) -> ClientResult<ApiKey> {
        let (username, password) = match (&self.credentials.user, &self.credentials.password) {
            (Some(u), Some(p)) => (u.as_str(), p.as_str()),
            _ => {
                return Err(ClientError::Authentication(
                    "username and password are required for API key authorization".to_string(),
                ))
            }
        };

        let response: ApiKeyResponse = transport
            .post(
                "authorize_api_key",
                Resource::AuthorizeApiKey,
                &AuthHeader::None,
                &ApiKeyRequest { username, password },
            )
            .await?
            .expect_status("authorize_api_key", &[200])?
            .json("authorize_api_key")?;

        let api_key = ApiKey::from(response);
        if api_key.key.is_empty() {
            return Err(ClientError::decode("authorize_api_key", "response has no API key"));
        }
        self.api_key.store(Some(Arc::new(api_key.clone())));
        info!(valid_until = ?api_key.valid_until, "Obtained API key");
        Ok(api_key)
    }

    /// Ask the backend about the current token.
    pub async fn verify(&self, transport: &Transport) -> ClientResult<TokenVerification> {
        let auth = self.bearer()?;
        transport
            .get("verify_token", Resource::VerifyToken, &auth, &[])
            .await?
            .expect_status("verify_token", &[200])?
            .json("verify_token")
    }

    /// Revoke the current token and forget it.
    pub async fn revoke(&self, transport: &Transport) -> ClientResult<()> {
        let auth = self.bearer()?;
        let _guard = self.refresh_lock.lock().await;
        transport
            .get("revoke_token", Resource::RevokeToken, &auth, &[])
            .await?
            .expect_status("revoke_token", &[200])?;
        self.token.store(None);
        info!("Access token revoked");
        Ok(())
    }

    fn bearer(&self) -> ClientResult<AuthHeader> {
        match self.token.load_full() {
            Some(t) => Ok(AuthHeader::Bearer(t.access_token.clone())),
            None => Err(ClientError::Authentication("no access token".to_string())),
        }
    }

    fn store(&self, response: TokenResponse, previous: Option<&TokenInfo>) -> Arc<TokenInfo> {
        let token = Arc::new(response.into_token(Utc::now(), previous));
        self.token.store(Some(token.clone()));
        token
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("credentials", &self.credentials)
            .field("has_token", &self.token.load().is_some())
            .field("has_api_key", &self.api_key.load().is_some())
            .field("refresh_margin", &self.refresh_margin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_token_wins_over_api_key() {
        let manager = TokenManager::new(Credentials {
            access_token: Some("tok".to_string()),
            api_key: Some("key".to_string()),
            ..Default::default()
        });
        assert_eq!(manager.auth_header(), AuthHeader::Bearer("tok".to_string()));
    }

    #[test]
    fn test_api_key_used_without_token() {
        let manager = TokenManager::new(Credentials {
            api_key: Some("key".to_string()),
            ..Default::default()
        });
        assert_eq!(manager.auth_header(), AuthHeader::ApiKey("key".to_string()));
        assert!(manager.validity().is_none());
    }

    #[test]
    fn test_no_credentials_is_unauthenticated() {
        let manager = TokenManager::new(Credentials::default());
        assert_eq!(manager.auth_header(), AuthHeader::None);
    }

    #[test]
    fn test_static_token_has_unknown_validity() {
        let manager = TokenManager::new(Credentials {
            access_token: Some("tok".to_string()),
            ..Default::default()
        });
        let window = manager.validity().unwrap();
        assert!(window.expires.is_none());
        assert!(!window.needs_refresh_at(Utc::now(), ChronoDuration::seconds(60)));
    }
}
