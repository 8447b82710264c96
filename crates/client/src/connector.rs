//! The connector: one configured connection to a backend.
//!
//! A connector owns its transport (and with it the TLS configuration), its
//! token manager and its CSR generator. Lifecycle operations are methods on
//! the connector, grouped by operation under [`crate::lifecycle`].

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use certward_common::ChainOrder;
use certward_config::{validate_files, ConnectorConfig};

use crate::auth::{Credentials, TokenManager};
use crate::csr::{CsrGenerator, RcgenCsrGenerator};
use crate::error::{ClientError, ClientResult};
use crate::tls::{TlsConfig, TlsConfigurator};
use crate::transport::{RawResponse, Resource, Transport};

/// A connection to a certificate management backend.
pub struct Connector {
    pub(crate) transport: Transport,
    pub(crate) tokens: TokenManager,
    pub(crate) csr_generator: Arc<dyn CsrGenerator>,
    zone: String,
    chain_order: ChainOrder,
    poll_interval: Duration,
    retrieve_timeout: Duration,
}

impl Connector {
    /// Build a connector from configuration with the default TLS setup.
    pub async fn from_config(config: &ConnectorConfig) -> ClientResult<Self> {
        Self::from_config_with(config, TlsConfigurator::new()).await
    }

    /// Build a connector with a custom TLS configurator (for example one
    /// with a different client bundle decoder).
    pub async fn from_config_with(
        config: &ConnectorConfig,
        configurator: TlsConfigurator,
    ) -> ClientResult<Self> {
        let mut config = config.clone();
        config.normalize()?;
        config.validate()?;

        // File findings are advisory here; unreadable files fail below and a
        // bad client bundle degrades in the TLS configurator.
        let findings = validate_files(&config);
        for finding in &findings.errors {
            warn!(finding = %finding, "Configuration check failed");
        }
        for finding in &findings.warnings {
            warn!(finding = %finding.message, "Configuration warning");
        }

        let credentials = Credentials::load(&config.credentials).await?;
        let trust_bundle = match &config.trust_bundle {
            Some(path) => Some(tokio::fs::read(path).await.map_err(|source| ClientError::Io {
                path: path.display().to_string(),
                source,
            })?),
            None => None,
        };

        let tls = configurator.configure(
            credentials.client_bundle.as_ref(),
            trust_bundle.as_deref(),
            config.insecure,
        )?;
        let transport = Transport::new(&config.base_url, tls, config.request_timeout())?;

        info!(
            base_url = %config.base_url,
            zone = %config.zone,
            chain_order = %config.chain_order,
            "Connector created"
        );

        Ok(Self {
            transport,
            tokens: TokenManager::new(credentials),
            csr_generator: Arc::new(RcgenCsrGenerator),
            zone: config.zone.clone(),
            chain_order: config.chain_order,
            poll_interval: config.poll_interval(),
            retrieve_timeout: config.retrieve_timeout(),
        })
    }

    /// Replace the CSR generator used for locally generated requests.
    pub fn with_csr_generator(mut self, generator: Arc<dyn CsrGenerator>) -> Self {
        self.csr_generator = generator;
        self
    }

    /// Obtain a token with the configured credentials, if needed.
    pub async fn authenticate(&self) -> ClientResult<()> {
        self.tokens.authenticate(&self.transport).await
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// TLS configuration in effect, e.g. to check whether a client
    /// certificate was attached.
    pub fn tls(&self) -> &TlsConfig {
        self.transport.tls()
    }

    /// Zone used when a request names none.
    pub fn default_zone(&self) -> &str {
        &self.zone
    }

    pub fn chain_order(&self) -> ChainOrder {
        self.chain_order
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn retrieve_timeout(&self) -> Duration {
        self.retrieve_timeout
    }

    /// POST with the connection's current authentication.
    pub(crate) async fn post<B>(
        &self,
        operation: &'static str,
        resource: Resource,
        body: &B,
    ) -> ClientResult<RawResponse>
    where
        B: Serialize + ?Sized,
    {
        let auth = self.tokens.auth_header();
        self.transport.post(operation, resource, &auth, body).await
    }

    /// GET with the connection's current authentication.
    pub(crate) async fn get(
        &self,
        operation: &'static str,
        resource: Resource,
        query: &[(&str, &str)],
    ) -> ClientResult<RawResponse> {
        let auth = self.tokens.auth_header();
        self.transport.get(operation, resource, &auth, query).await
    }

    /// Resolve a request's zone, falling back to the connector default.
    pub(crate) fn zone_or_default<'a>(&'a self, zone: &'a str) -> &'a str {
        if zone.is_empty() {
            &self.zone
        } else {
            zone
        }
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("base_url", &self.transport.base_url().as_str())
            .field("zone", &self.zone)
            .field("tokens", &self.tokens)
            .field("chain_order", &self.chain_order)
            .finish()
    }
}
