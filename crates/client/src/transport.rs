//! HTTP transport bound to one connector.
//!
//! Every connector owns its transport: the reqwest client is built from that
//! connector's TLS configuration and is never shared process-wide. Each call
//! is a single awaited round trip that yields the raw status and body; the
//! lifecycle layer decides which statuses an operation accepts.

use std::fmt;
use std::time::Duration;

use http::header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::tls::TlsConfig;

/// Fixed client identifier sent as the user agent.
pub const CLIENT_IDENTIFIER: &str = concat!("certward-sdk/", env!("CARGO_PKG_VERSION"));

/// Header carrying a legacy API key.
pub const API_KEY_HEADER: &str = "x-venafi-api-key";

/// Backend resources, relative to the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    AuthorizeApiKey,
    AuthorizeOAuth,
    AuthorizeCertificate,
    RefreshToken,
    VerifyToken,
    RevokeToken,
    CertificateRequest,
    CertificateRetrieve,
    CertificateRenew,
    CertificateRevoke,
    CertificateReset,
    CertificateImport,
    CertificateSearch,
    CheckPolicy,
    ReadPolicy,
    BrowseIdentities,
    ValidateIdentity,
    MetadataGet,
    MetadataGetItems,
    MetadataSet,
    DnToGuid,
    Log,
    SystemVersion,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Resource::AuthorizeApiKey => "vedsdk/authorize/",
            Resource::AuthorizeOAuth => "vedauth/authorize/oauth",
            Resource::AuthorizeCertificate => "vedauth/authorize/certificate",
            Resource::RefreshToken => "vedauth/authorize/token",
            Resource::VerifyToken => "vedauth/authorize/verify",
            Resource::RevokeToken => "vedauth/revoke/token",
            Resource::CertificateRequest => "vedsdk/certificates/request",
            Resource::CertificateRetrieve => "vedsdk/certificates/retrieve",
            Resource::CertificateRenew => "vedsdk/certificates/renew",
            Resource::CertificateRevoke => "vedsdk/certificates/revoke",
            Resource::CertificateReset => "vedsdk/certificates/reset",
            Resource::CertificateImport => "vedsdk/certificates/import",
            Resource::CertificateSearch => "vedsdk/certificates/",
            Resource::CheckPolicy => "vedsdk/certificates/checkpolicy",
            Resource::ReadPolicy => "vedsdk/Config/ReadPolicy",
            Resource::BrowseIdentities => "vedsdk/Identity/Browse",
            Resource::ValidateIdentity => "vedsdk/Identity/Validate",
            Resource::MetadataGet => "vedsdk/metadata/get",
            Resource::MetadataGetItems => "vedsdk/metadata/getitems",
            Resource::MetadataSet => "vedsdk/metadata/set",
            Resource::DnToGuid => "vedsdk/Config/DnToGuid",
            Resource::Log => "vedsdk/Log",
            Resource::SystemVersion => "vedsdk/systemstatus/version",
        }
    }
}

/// Authentication attached to one request.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthHeader {
    Bearer(String),
    ApiKey(String),
    None,
}

impl AuthHeader {
    /// Pick the active scheme: a bearer token wins over an API key.
    pub fn select(access_token: Option<&str>, api_key: Option<&str>) -> Self {
        match (access_token, api_key) {
            (Some(token), _) if !token.is_empty() => AuthHeader::Bearer(token.to_string()),
            (_, Some(key)) if !key.is_empty() => AuthHeader::ApiKey(key.to_string()),
            _ => AuthHeader::None,
        }
    }

    fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            AuthHeader::Bearer(token) => builder.bearer_auth(token),
            AuthHeader::ApiKey(key) => builder.header(API_KEY_HEADER, key),
            AuthHeader::None => builder,
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            AuthHeader::Bearer(_) => "bearer",
            AuthHeader::ApiKey(_) => "api-key",
            AuthHeader::None => "none",
        }
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthHeader({})", self.scheme())
    }
}

/// Status and body of a completed round trip.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Status line, e.g. `400 Bad Request`.
    pub status_text: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Fail with `UnexpectedStatus` unless the status is accepted.
    pub fn expect_status(self, operation: &'static str, accepted: &[u16]) -> ClientResult<Self> {
        if accepted.contains(&self.status) {
            Ok(self)
        } else {
            Err(ClientError::UnexpectedStatus {
                operation,
                status: self.status,
                status_text: self.status_text.clone(),
                body: self.body_text(),
            })
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, operation: &'static str) -> ClientResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::decode(operation, e))
    }
}

/// Per-connector HTTP transport.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    base_url: Url,
    tls: TlsConfig,
}

impl Transport {
    /// Build a transport for a normalized base URL.
    pub fn new(base_url: &str, tls: TlsConfig, timeout: Duration) -> ClientResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ClientError::Config(certward_config::ConfigError::BaseUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            })
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .use_preconfigured_tls(tls.client_config().as_ref().clone())
            .default_headers(headers)
            .user_agent(CLIENT_IDENTIFIER)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Tls(format!("failed to build HTTP client: {e}")))?;

        debug!(
            base_url = %base_url,
            roots = %tls.root_source(),
            client_certificate = tls.has_client_certificate(),
            "Transport initialized"
        );

        Ok(Self {
            client,
            base_url,
            tls,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tls(&self) -> &TlsConfig {
        &self.tls
    }

    fn url(&self, resource: Resource) -> ClientResult<Url> {
        self.base_url.join(resource.path()).map_err(|e| {
            ClientError::Config(certward_config::ConfigError::BaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
        })
    }

    /// POST a JSON body.
    pub async fn post<B>(
        &self,
        operation: &'static str,
        resource: Resource,
        auth: &AuthHeader,
        body: &B,
    ) -> ClientResult<RawResponse>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(resource)?;
        let builder = self.client.request(Method::POST, url).json(body);
        self.send(operation, resource, auth, builder).await
    }

    /// GET with query parameters.
    pub async fn get(
        &self,
        operation: &'static str,
        resource: Resource,
        auth: &AuthHeader,
        query: &[(&str, &str)],
    ) -> ClientResult<RawResponse> {
        let url = self.url(resource)?;
        let builder = self.client.request(Method::GET, url).query(query);
        self.send(operation, resource, auth, builder).await
    }

    async fn send(
        &self,
        operation: &'static str,
        resource: Resource,
        auth: &AuthHeader,
        builder: RequestBuilder,
    ) -> ClientResult<RawResponse> {
        trace!(
            operation,
            resource = resource.path(),
            auth = auth.scheme(),
            "Sending request"
        );

        let response = auth
            .apply(builder)
            .send()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?
            .to_vec();

        debug!(
            operation,
            resource = resource.path(),
            status = status.as_u16(),
            body_len = body.len(),
            "Received response"
        );

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: format!(
                "{} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string(),
            body,
        })
    }
}
