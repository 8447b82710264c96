//! Certificate renewal.

use tracing::info;

use certward_common::ObjectPath;

use super::wire::{RenewRequestBody, RenewResponse};
use super::{LifecycleSession, LifecycleState, Operation};
use crate::connector::Connector;
use crate::error::{ClientError, ClientResult};
use crate::transport::Resource;

const OPERATION: &str = "renew_certificate";

/// Which certificate to renew. Identify it by object path or by
/// thumbprint; a new CSR is optional.
#[derive(Debug, Clone, Default)]
pub struct RenewRequest {
    pub object_path: Option<ObjectPath>,
    pub thumbprint: Option<String>,
    /// PEM CSR for the renewed certificate. The backend reuses its own
    /// settings when empty.
    pub csr: Vec<u8>,
}

impl RenewRequest {
    pub fn by_path(object_path: ObjectPath) -> Self {
        Self {
            object_path: Some(object_path),
            ..Default::default()
        }
    }

    pub fn by_thumbprint(thumbprint: impl Into<String>) -> Self {
        Self {
            thumbprint: Some(thumbprint.into()),
            ..Default::default()
        }
    }

    pub fn with_csr(mut self, csr_pem: impl Into<Vec<u8>>) -> Self {
        self.csr = csr_pem.into();
        self
    }
}

impl Connector {
    /// Ask the backend to renew a certificate. Returns the object path to
    /// retrieve the renewed certificate from.
    ///
    /// Only HTTP 200 is accepted; any other status is an error whatever the
    /// body says.
    pub async fn renew_certificate(&self, request: &RenewRequest) -> ClientResult<ObjectPath> {
        let path = match (&request.object_path, &request.thumbprint) {
            (Some(path), _) if !path.is_empty() => path.clone(),
            (_, Some(thumbprint)) if !thumbprint.is_empty() => {
                self.search_by_thumbprint(thumbprint).await?.ok_or_else(|| {
                    ClientError::InvalidRequest(format!(
                        "no certificate found with thumbprint {thumbprint}"
                    ))
                })?
            }
            _ => {
                return Err(ClientError::InvalidRequest(
                    "renewal needs an object path or a thumbprint".to_string(),
                ))
            }
        };

        let mut session = LifecycleSession::new(Operation::Renew, path.clone());
        let body = RenewRequestBody {
            certificate_dn: path.to_string(),
            pkcs10: String::from_utf8_lossy(&request.csr).into_owned(),
        };

        let response: RenewResponse = self
            .post(OPERATION, Resource::CertificateRenew, &body)
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;

        if !response.success {
            session.finish();
            return Err(ClientError::Rejected {
                operation: OPERATION,
                message: response.error,
            });
        }

        session.advance(LifecycleState::Renewed);
        session.finish();
        info!(object_path = %path, new_csr = !request.csr.is_empty(), "Certificate renewal requested");
        Ok(path)
    }
}
