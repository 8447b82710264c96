//! Bearer token state and the token endpoints' wire formats.

use std::fmt;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A bearer token with its validity window.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// When the access token expires. `None` when the backend did not say.
    pub expires: Option<DateTime<Utc>>,
    /// Last moment the refresh token can be used.
    pub refresh_until: Option<DateTime<Utc>>,
    pub identity: String,
    pub scope: String,
    pub token_type: String,
}

impl TokenInfo {
    /// A token supplied by configuration, with no known expiry.
    pub fn from_static(access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            refresh_token,
            expires: None,
            refresh_until: None,
            identity: String::new(),
            scope: String::new(),
            token_type: "Bearer".to_string(),
        }
    }

    pub fn validity(&self) -> ValidityWindow {
        ValidityWindow {
            expires: self.expires,
            refresh_until: self.refresh_until,
        }
    }
}

impl fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenInfo")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires", &self.expires)
            .field("refresh_until", &self.refresh_until)
            .field("identity", &self.identity)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Validity of the current credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub expires: Option<DateTime<Utc>>,
    pub refresh_until: Option<DateTime<Utc>>,
}

impl ValidityWindow {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|e| now >= e)
    }

    /// Whether the token expires within `margin` of `now`.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>, margin: ChronoDuration) -> bool {
        self.expires.is_some_and(|e| now + margin >= e)
    }

    pub fn can_refresh_at(&self, now: DateTime<Utc>) -> bool {
        self.refresh_until.map_or(true, |r| now < r)
    }

    /// Time left before expiry; `None` when unknown.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<ChronoDuration> {
        self.expires.map(|e| e - now)
    }
}

/// Password grant body.
#[derive(Serialize)]
pub(crate) struct PasswordGrantRequest<'a> {
    pub client_id: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub scope: &'a str,
}

/// Client-certificate grant body. The certificate itself travels in the
/// TLS handshake.
#[derive(Serialize)]
pub(crate) struct CertificateGrantRequest<'a> {
    pub client_id: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub scope: &'a str,
}

/// Refresh grant body.
#[derive(Serialize)]
pub(crate) struct RefreshGrantRequest<'a> {
    pub client_id: &'a str,
    pub refresh_token: &'a str,
}

/// Token endpoint response. Times are Unix seconds.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub expires: i64,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub refresh_until: i64,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub token_type: String,
}

impl TokenResponse {
    /// Convert to token state. `previous` supplies fields a refresh omits.
    pub fn into_token(self, now: DateTime<Utc>, previous: Option<&TokenInfo>) -> TokenInfo {
        let expires = unix(self.expires).or_else(|| {
            (self.expires_in > 0).then(|| now + ChronoDuration::seconds(self.expires_in))
        });
        let refresh_token = if self.refresh_token.is_empty() {
            previous.and_then(|p| p.refresh_token.clone())
        } else {
            Some(self.refresh_token)
        };
        let scope = if self.scope.is_empty() {
            previous.map(|p| p.scope.clone()).unwrap_or_default()
        } else {
            self.scope
        };

        TokenInfo {
            access_token: self.access_token,
            refresh_token,
            expires,
            refresh_until: unix(self.refresh_until),
            identity: self.identity,
            scope,
            token_type: if self.token_type.is_empty() {
                "Bearer".to_string()
            } else {
                self.token_type
            },
        }
    }
}

/// Result of verifying a token with the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenVerification {
    #[serde(default, rename = "access_issued_on_ISO8601")]
    pub access_issued_on: String,
    #[serde(default, rename = "application")]
    pub client_id: String,
    #[serde(default, rename = "expires_ISO8601")]
    pub expires: String,
    #[serde(default, rename = "grant_issued_on_ISO8601")]
    pub grant_issued_on: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub scope: String,
    /// Token lifetime in seconds.
    #[serde(default)]
    pub valid_for: i64,
}

impl TokenVerification {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.expires)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }
}

/// Legacy username/password authorize body.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ApiKeyRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ApiKeyResponse {
    #[serde(default, rename = "APIKey")]
    pub api_key: String,
    #[serde(default)]
    pub valid_until: String,
}

/// A legacy API key and when it stops working.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub key: String,
    pub valid_until: Option<DateTime<Utc>>,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("key", &"<redacted>")
            .field("valid_until", &self.valid_until)
            .finish()
    }
}

impl From<ApiKeyResponse> for ApiKey {
    fn from(r: ApiKeyResponse) -> Self {
        Self {
            valid_until: parse_wcf_date(&r.valid_until),
            key: r.api_key,
        }
    }
}

fn unix(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        return None;
    }
    Utc.timestamp_opt(secs, 0).single()
}

/// Parse `/Date(1700000000000)/` (milliseconds, optional offset suffix).
pub(crate) fn parse_wcf_date(s: &str) -> Option<DateTime<Utc>> {
    let inner = s.trim().strip_prefix("/Date(")?.strip_suffix(")/")?;
    let millis_end = inner
        .get(1..)?
        .find(['+', '-'])
        .map(|i| i + 1)
        .unwrap_or(inner.len());
    let millis: i64 = inner[..millis_end].parse().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}
