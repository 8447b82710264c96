//! Certward Client
//!
//! Certificate lifecycle client for a certificate management backend.
//!
//! - **Connector**: one configured connection with its own transport, TLS
//!   setup and token state ([`Connector`])
//! - **Lifecycle**: request, retrieve, renew, revoke, reset and import of
//!   certificates, plus zone, identity and metadata lookups
//! - **Authentication**: bearer tokens with refresh, legacy API keys
//! - **TLS**: per-connector trust and client certificate configuration
//! - **Chains**: retrieved certificate bundles in the caller's chain order
//!
//! # Example
//!
//! ```ignore
//! use certward_client::{Connector, RetrieveRequest};
//! use certward_common::CertificateRequest;
//! use certward_config::ConnectorConfig;
//!
//! let config = ConnectorConfig::load("certward.toml")?;
//! let connector = Connector::from_config(&config).await?;
//! connector.authenticate().await?;
//!
//! let mut request = CertificateRequest::new("", "web.example.com");
//! let object_path = connector.enroll(&mut request).await?;
//! let bundle = connector
//!     .wait_for_certificate(RetrieveRequest::new(object_path))
//!     .await?;
//! println!("{}", bundle.to_pem());
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod auth;
pub mod chain;
pub mod connector;
pub mod csr;
pub mod error;
pub mod lifecycle;
pub mod tls;
pub mod transport;

// ============================================================================
// Public API Re-exports
// ============================================================================

pub use connector::Connector;
pub use error::{ClientError, ClientResult};

// Certificates
pub use chain::CertificateBundle;
pub use csr::{CsrGenerator, GeneratedCsr, RcgenCsrGenerator};

// Authentication and transport
pub use auth::{ApiKey, Credentials, TokenInfo, TokenManager, TokenVerification, ValidityWindow};
pub use tls::{
    BundleDecoder, ClientBundle, ClientIdentity, ClientIdentityStatus, PemBundleDecoder,
    RootSource, TlsConfig, TlsConfigurator,
};
pub use transport::{AuthHeader, RawResponse, Resource, Transport, CLIENT_IDENTIFIER};

// Lifecycle
pub use lifecycle::{
    format_end_date, prepare_request, IdentityType, ImportRequest, ImportResponse,
    LifecycleSession, LifecycleState, LogEvent, MetadataField, MetadataValue, ObjectGuidInfo,
    Operation, RenewRequest, RetrievalPoller, RetrieveOutcome, RetrieveRequest, RevocationReason,
    RevokeOutcome, RevokeRequest,
};
