//! Reset of a stuck certificate work item.

use tracing::info;

use certward_common::ObjectPath;

use super::wire::{ErrorOnlyResponse, ResetRequestBody};
use super::{LifecycleSession, LifecycleState, Operation};
use crate::connector::Connector;
use crate::error::{ClientError, ClientResult};
use crate::transport::Resource;

const OPERATION: &str = "reset_certificate";

impl Connector {
    /// Clear the pending work on a certificate object. With `restart`, the
    /// backend immediately starts processing it again.
    pub async fn reset_certificate(&self, object_path: &ObjectPath, restart: bool) -> ClientResult<()> {
        if object_path.is_empty() {
            return Err(ClientError::InvalidRequest(
                "reset needs an object path".to_string(),
            ));
        }

        let mut session = LifecycleSession::new(Operation::Reset, object_path.clone());
        let response: ErrorOnlyResponse = self
            .post(
                OPERATION,
                Resource::CertificateReset,
                &ResetRequestBody {
                    certificate_dn: object_path.to_string(),
                    restart,
                },
            )
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;

        if !response.error.is_empty() {
            session.finish();
            return Err(ClientError::Rejected {
                operation: OPERATION,
                message: response.error,
            });
        }

        session.advance(LifecycleState::Reset);
        if restart {
            session.advance(LifecycleState::Requested);
        }
        session.finish();
        info!(object_path = %object_path, restart, "Certificate reset");
        Ok(())
    }
}
