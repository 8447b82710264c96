//! Certificate retrieval and the wait-for-issuance loop.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use certward_common::{ChainOrder, ObjectPath};

use super::wire::{RetrieveRequestBody, RetrieveResponse};
use super::{LifecycleSession, LifecycleState, Operation};
use crate::chain::CertificateBundle;
use crate::connector::Connector;
use crate::error::{ClientError, ClientResult};
use crate::transport::Resource;

const OPERATION: &str = "retrieve_certificate";
const FORMAT: &str = "base64";
const FORMAT_WITH_KEY: &str = "base64 (PKCS #8)";

/// What to retrieve and how.
#[derive(Clone, Default)]
pub struct RetrieveRequest {
    pub object_path: ObjectPath,
    /// Chain order; the connector's configured order when unset.
    pub chain_order: Option<ChainOrder>,
    /// Include the service-generated private key, encrypted with this password.
    pub key_password: Option<String>,
    /// File name hint for the returned certificate.
    pub friendly_name: String,
}

impl RetrieveRequest {
    pub fn new(object_path: ObjectPath) -> Self {
        Self {
            object_path,
            ..Default::default()
        }
    }

    pub fn with_chain_order(mut self, order: ChainOrder) -> Self {
        self.chain_order = Some(order);
        self
    }

    pub fn with_private_key(mut self, password: impl Into<String>) -> Self {
        self.key_password = Some(password.into());
        self
    }
}

impl std::fmt::Debug for RetrieveRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrieveRequest")
            .field("object_path", &self.object_path)
            .field("chain_order", &self.chain_order)
            .field("include_private_key", &self.key_password.is_some())
            .finish()
    }
}

/// Result of one retrieve attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrieveOutcome {
    Issued(CertificateBundle),
    /// Not issued yet. Retry later. `status` and `stage` are the backend's
    /// free-form progress report.
    Pending { status: String, stage: i64 },
}

impl RetrieveOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, RetrieveOutcome::Pending { .. })
    }
}

impl Connector {
    /// One retrieve attempt. A certificate still being issued is a
    /// [`RetrieveOutcome::Pending`], not an error.
    ///
    /// Completion is decided by the presence of certificate data: a 202, or
    /// a 200 whose `CertificateData` is empty, is pending whatever its
    /// `Stage` says. The backend's stage number and status text are carried
    /// on the pending outcome as reported, for logging and display only.
    pub async fn retrieve_certificate(
        &self,
        request: &RetrieveRequest,
    ) -> ClientResult<RetrieveOutcome> {
        let order = request.chain_order.unwrap_or(self.chain_order());
        let mut session = LifecycleSession::new(Operation::Retrieve, request.object_path.clone());

        let body = RetrieveRequestBody {
            certificate_dn: request.object_path.to_string(),
            format: if request.key_password.is_some() {
                FORMAT_WITH_KEY
            } else {
                FORMAT
            }
            .to_string(),
            password: request.key_password.clone().unwrap_or_default(),
            include_private_key: request.key_password.is_some(),
            include_chain: order.includes_chain(),
            friendly_name: request.friendly_name.clone(),
            root_first_order: order == ChainOrder::RootFirst,
        };

        let raw = self
            .post(OPERATION, Resource::CertificateRetrieve, &body)
            .await?
            .expect_status(OPERATION, &[200, 202])?;
        let response: RetrieveResponse = if raw.status == 202 && raw.body.is_empty() {
            RetrieveResponse::default()
        } else {
            raw.json(OPERATION)?
        };

        if raw.status == 202 || response.certificate_data.is_empty() {
            session.advance(LifecycleState::Pending);
            session.finish();
            debug!(
                object_path = %request.object_path,
                status = %response.status,
                stage = response.stage,
                "Certificate not issued yet"
            );
            return Ok(RetrieveOutcome::Pending {
                status: response.status,
                stage: response.stage,
            });
        }

        let bundle = CertificateBundle::from_base64(&response.certificate_data, order)?;
        session.advance(LifecycleState::Issued);
        session.finish();
        info!(
            object_path = %request.object_path,
            chain_len = bundle.chain.len(),
            "Certificate retrieved"
        );
        Ok(RetrieveOutcome::Issued(bundle))
    }

    /// Poll until issued, using the configured interval and timeout.
    pub async fn wait_for_certificate(
        &self,
        request: RetrieveRequest,
    ) -> ClientResult<CertificateBundle> {
        let interval = self.poll_interval();
        RetrievalPoller::new(self, request)
            .wait(self.retrieve_timeout(), |_| interval)
            .await
    }
}

/// Step-by-step retrieval of one certificate.
///
/// Each [`poll`](Self::poll) is one retrieve attempt; [`wait`](Self::wait)
/// loops until issuance or a deadline. The poller can be reused after a
/// timeout or [`restart`](Self::restart)ed.
pub struct RetrievalPoller<'a> {
    connector: &'a Connector,
    request: RetrieveRequest,
    attempts: u32,
    last: Option<RetrieveOutcome>,
}

impl<'a> RetrievalPoller<'a> {
    pub fn new(connector: &'a Connector, request: RetrieveRequest) -> Self {
        Self {
            connector,
            request,
            attempts: 0,
            last: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Outcome of the latest attempt.
    pub fn last_outcome(&self) -> Option<&RetrieveOutcome> {
        self.last.as_ref()
    }

    /// Forget previous attempts.
    pub fn restart(&mut self) {
        self.attempts = 0;
        self.last = None;
    }

    /// Make one retrieve attempt.
    pub async fn poll(&mut self) -> ClientResult<RetrieveOutcome> {
        self.attempts += 1;
        let outcome = self.connector.retrieve_certificate(&self.request).await?;
        self.last = Some(outcome.clone());
        Ok(outcome)
    }

    /// Poll until the certificate is issued or `timeout` elapses.
    ///
    /// `backoff` gives the delay after the n-th pending attempt (1-based).
    /// The token is refreshed ahead of each attempt when it is about to
    /// expire. A timeout leaves the submitted request in place.
    pub async fn wait<F>(&mut self, timeout: Duration, mut backoff: F) -> ClientResult<CertificateBundle>
    where
        F: FnMut(u32) -> Duration,
    {
        let started = Instant::now();
        let deadline = started + timeout;

        loop {
            self.connector
                .tokens
                .ensure_fresh(&self.connector.transport)
                .await?;

            match self.poll().await? {
                RetrieveOutcome::Issued(bundle) => return Ok(bundle),
                RetrieveOutcome::Pending { status, stage } => {
                    let delay = backoff(self.attempts);
                    if Instant::now() + delay > deadline {
                        return Err(ClientError::Timeout {
                            object_path: self.request.object_path.to_string(),
                            waited: started.elapsed(),
                        });
                    }
                    debug!(
                        object_path = %self.request.object_path,
                        attempt = self.attempts,
                        status = %status,
                        stage,
                        delay = ?delay,
                        "Waiting for issuance"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
