//! TLS transport configuration.
//!
//! [`TlsConfigurator::configure`] turns a client certificate bundle, a trust
//! bundle and the `insecure` flag into an immutable [`TlsConfig`]. The
//! result is owned by one connector's transport and never installed into
//! shared state, so connectors with different credentials do not interfere.
//!
//! Root selection:
//!
//! - `insecure`: verification disabled, any trust bundle ignored
//! - trust bundle given: its certificates are the only roots
//! - otherwise: the bundled Mozilla root set (`webpki-roots`)
//!
//! A client bundle that fails to decode is logged and skipped; the
//! configuration is still built, without a client certificate. Callers that
//! require mutual TLS check [`TlsConfig::client_identity`].

use std::fmt;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WantsClientCert;
use rustls::crypto::{aws_lc_rs, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, ConfigBuilder, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

/// Password-protected client certificate bundle, as read from disk.
#[derive(Clone)]
pub struct ClientBundle {
    pub data: Vec<u8>,
    pub password: String,
}

impl fmt::Debug for ClientBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBundle")
            .field("len", &self.data.len())
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Leaf-first certificate chain plus the matching private key.
pub struct ClientIdentity {
    pub chain: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("certificates", &self.chain.len())
            .finish_non_exhaustive()
    }
}

/// Decodes a credential bundle into a client identity.
///
/// PKCS#12 decoding lives outside this crate; plug a decoder in through
/// [`TlsConfigurator::with_decoder`].
pub trait BundleDecoder: Send + Sync {
    fn decode(&self, data: &[u8], password: &str) -> Result<ClientIdentity, String>;
}

/// Decodes unencrypted PEM bundles (certificates plus one private key).
#[derive(Debug, Default, Clone, Copy)]
pub struct PemBundleDecoder;

impl BundleDecoder for PemBundleDecoder {
    fn decode(&self, data: &[u8], password: &str) -> Result<ClientIdentity, String> {
        if !password.is_empty() {
            warn!("PEM client bundles are read unencrypted, ignoring the bundle password");
        }
        let mut chain = Vec::new();
        let mut key = None;

        for item in rustls_pemfile::read_all(&mut &data[..]) {
            match item.map_err(|e| format!("malformed PEM: {e}"))? {
                rustls_pemfile::Item::X509Certificate(cert) => chain.push(cert),
                rustls_pemfile::Item::Pkcs1Key(k) if key.is_none() => key = Some(k.into()),
                rustls_pemfile::Item::Pkcs8Key(k) if key.is_none() => key = Some(k.into()),
                rustls_pemfile::Item::Sec1Key(k) if key.is_none() => key = Some(k.into()),
                _ => {}
            }
        }

        if chain.is_empty() {
            return Err("bundle contains no certificates".to_string());
        }
        let key = match key {
            Some(k) => k,
            None if contains_encrypted_key(data) => {
                return Err("encrypted private keys are not supported".to_string())
            }
            None => return Err("bundle contains no private key".to_string()),
        };
        Ok(ClientIdentity { chain, key })
    }
}

fn contains_encrypted_key(data: &[u8]) -> bool {
    const MARKER: &[u8] = b"ENCRYPTED PRIVATE KEY";
    data.windows(MARKER.len()).any(|w| w == MARKER)
}

/// Where server certificates are verified against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSource {
    /// Roots from the caller's trust bundle.
    Bundle { certificates: usize },
    /// The bundled default root set.
    PlatformDefault { certificates: usize },
    /// Server certificates are not verified.
    VerificationDisabled,
}

impl RootSource {
    pub fn certificate_count(&self) -> usize {
        match self {
            RootSource::Bundle { certificates } | RootSource::PlatformDefault { certificates } => {
                *certificates
            }
            RootSource::VerificationDisabled => 0,
        }
    }
}

impl fmt::Display for RootSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootSource::Bundle { certificates } => write!(f, "bundle({certificates})"),
            RootSource::PlatformDefault { certificates } => write!(f, "default({certificates})"),
            RootSource::VerificationDisabled => f.write_str("disabled"),
        }
    }
}

/// Outcome of attaching a client certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIdentityStatus {
    NotConfigured,
    Attached { certificates: usize },
    /// The bundle was supplied but could not be used.
    DecodeFailed { reason: String },
}

/// Immutable TLS configuration for one connector.
#[derive(Clone)]
pub struct TlsConfig {
    client_config: Arc<ClientConfig>,
    client_chain: Vec<CertificateDer<'static>>,
    root_source: RootSource,
    client_identity: ClientIdentityStatus,
}

impl TlsConfig {
    pub fn client_config(&self) -> &Arc<ClientConfig> {
        &self.client_config
    }

    /// Client certificate chain presented to the server, leaf first.
    pub fn client_chain(&self) -> &[CertificateDer<'static>] {
        &self.client_chain
    }

    pub fn root_source(&self) -> RootSource {
        self.root_source
    }

    pub fn client_identity(&self) -> &ClientIdentityStatus {
        &self.client_identity
    }

    pub fn has_client_certificate(&self) -> bool {
        matches!(self.client_identity, ClientIdentityStatus::Attached { .. })
    }

    /// Whether server certificates are verified.
    pub fn verifies_server(&self) -> bool {
        self.root_source != RootSource::VerificationDisabled
    }
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("root_source", &self.root_source)
            .field("client_identity", &self.client_identity)
            .field("client_chain", &self.client_chain.len())
            .finish()
    }
}

/// Builds [`TlsConfig`] values.
#[derive(Clone)]
pub struct TlsConfigurator {
    provider: Arc<CryptoProvider>,
    decoder: Arc<dyn BundleDecoder>,
}

impl Default for TlsConfigurator {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsConfigurator {
    pub fn new() -> Self {
        Self {
            provider: Arc::new(aws_lc_rs::default_provider()),
            decoder: Arc::new(PemBundleDecoder),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn BundleDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Build the TLS configuration for one connector.
    pub fn configure(
        &self,
        client_bundle: Option<&ClientBundle>,
        trust_bundle: Option<&[u8]>,
        insecure: bool,
    ) -> ClientResult<TlsConfig> {
        let (roots, root_source) = self.roots(trust_bundle, insecure)?;

        let identity = client_bundle.map(|bundle| {
            self.decoder
                .decode(&bundle.data, &bundle.password)
                .map_err(|reason| {
                    warn!(
                        reason = %reason,
                        "Failed to decode client certificate bundle, continuing without client certificate"
                    );
                    reason
                })
        });

        let (client_config, client_chain, client_identity) = match identity {
            None => (
                self.builder(roots.as_ref())?.with_no_client_auth(),
                Vec::new(),
                ClientIdentityStatus::NotConfigured,
            ),
            Some(Err(reason)) => (
                self.builder(roots.as_ref())?.with_no_client_auth(),
                Vec::new(),
                ClientIdentityStatus::DecodeFailed { reason },
            ),
            Some(Ok(identity)) => {
                let chain = identity.chain.clone();
                match self
                    .builder(roots.as_ref())?
                    .with_client_auth_cert(identity.chain, identity.key)
                {
                    Ok(config) => {
                        let certificates = chain.len();
                        (config, chain, ClientIdentityStatus::Attached { certificates })
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            "Client certificate rejected, continuing without client certificate"
                        );
                        (
                            self.builder(roots.as_ref())?.with_no_client_auth(),
                            Vec::new(),
                            ClientIdentityStatus::DecodeFailed {
                                reason: e.to_string(),
                            },
                        )
                    }
                }
            }
        };

        info!(
            roots = %root_source,
            client_certificates = client_chain.len(),
            "TLS configuration built"
        );

        Ok(TlsConfig {
            client_config: Arc::new(client_config),
            client_chain,
            root_source,
            client_identity,
        })
    }

    fn roots(
        &self,
        trust_bundle: Option<&[u8]>,
        insecure: bool,
    ) -> ClientResult<(Option<Arc<RootCertStore>>, RootSource)> {
        if insecure {
            if trust_bundle.is_some() {
                debug!("Ignoring trust bundle, server verification is disabled");
            }
            warn!("Server certificate verification is disabled");
            return Ok((None, RootSource::VerificationDisabled));
        }

        let mut store = RootCertStore::empty();
        let source = match trust_bundle {
            Some(pem) => {
                let certs = rustls_pemfile::certs(&mut &pem[..])
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| ClientError::Tls(format!("malformed trust bundle: {e}")))?;
                let (added, ignored) = store.add_parsable_certificates(certs);
                if added == 0 {
                    return Err(ClientError::Tls(
                        "trust bundle contains no usable certificates".to_string(),
                    ));
                }
                if ignored > 0 {
                    warn!(ignored, "Skipped unparseable certificates in trust bundle");
                }
                RootSource::Bundle {
                    certificates: added,
                }
            }
            None => {
                store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
                RootSource::PlatformDefault {
                    certificates: store.len(),
                }
            }
        };
        Ok((Some(Arc::new(store)), source))
    }

    fn builder(
        &self,
        roots: Option<&Arc<RootCertStore>>,
    ) -> ClientResult<ConfigBuilder<ClientConfig, WantsClientCert>> {
        let builder = ClientConfig::builder_with_provider(self.provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| ClientError::Tls(e.to_string()))?;

        Ok(match roots {
            Some(store) => builder.with_root_certificates(store.clone()),
            None => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerification(self.provider.clone()))),
        })
    }
}

/// Accepts any server certificate. Handshake signatures are still checked.
#[derive(Debug)]
struct NoVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
