//! Certificate revocation.

use std::fmt;

use tracing::{info, warn};

use certward_common::ObjectPath;

use super::wire::{RevokeRequestBody, RevokeResponse};
use super::{LifecycleSession, LifecycleState, Operation};
use crate::connector::Connector;
use crate::error::{ClientError, ClientResult};
use crate::transport::Resource;

const OPERATION: &str = "revoke_certificate";

/// Revocation reasons the backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RevocationReason {
    #[default]
    None,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
}

impl RevocationReason {
    /// Parse a caller-facing reason. Anything unrecognized means no reason.
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "key-compromise" => RevocationReason::KeyCompromise,
            "ca-compromise" => RevocationReason::CaCompromise,
            "affiliation-changed" => RevocationReason::AffiliationChanged,
            "superseded" => RevocationReason::Superseded,
            "cessation-of-operation" => RevocationReason::CessationOfOperation,
            _ => RevocationReason::None,
        }
    }

    /// Wire value.
    pub fn code(&self) -> u8 {
        match self {
            RevocationReason::None => 0,
            RevocationReason::KeyCompromise => 1,
            RevocationReason::CaCompromise => 2,
            RevocationReason::AffiliationChanged => 3,
            RevocationReason::Superseded => 4,
            RevocationReason::CessationOfOperation => 5,
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RevocationReason::None => "none",
            RevocationReason::KeyCompromise => "key-compromise",
            RevocationReason::CaCompromise => "ca-compromise",
            RevocationReason::AffiliationChanged => "affiliation-changed",
            RevocationReason::Superseded => "superseded",
            RevocationReason::CessationOfOperation => "cessation-of-operation",
        };
        f.write_str(s)
    }
}

/// Which certificate to revoke and why. Identify it by object path or by
/// thumbprint.
#[derive(Debug, Clone, Default)]
pub struct RevokeRequest {
    pub object_path: Option<ObjectPath>,
    pub thumbprint: Option<String>,
    pub reason: RevocationReason,
    pub comments: String,
    /// Also disable the object so it is not renewed.
    pub disable: bool,
}

impl RevokeRequest {
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

    pub fn with_reason(mut self, reason: RevocationReason) -> Self {
        self.reason = reason;
        self
    }
}

/// Successful revocation outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked,
    /// The certificate was revoked before this call.
    AlreadyRevoked,
}

impl Connector {
    /// Revoke a certificate. A failure reported in the response body is a
    /// [`ClientError::Rejected`].
    pub async fn revoke_certificate(&self, request: &RevokeRequest) -> ClientResult<RevokeOutcome> {
        let path = request.object_path.clone().unwrap_or_default();
        let thumbprint = request.thumbprint.clone().unwrap_or_default();
        if path.is_empty() && thumbprint.is_empty() {
            return Err(ClientError::InvalidRequest(
                "revocation needs an object path or a thumbprint".to_string(),
            ));
        }

        let mut session = LifecycleSession::new(Operation::Revoke, path.clone());
        let body = RevokeRequestBody {
            certificate_dn: path.to_string(),
            thumbprint,
            reason: request.reason.code(),
            comments: request.comments.clone(),
            disable: request.disable,
        };

        let response: RevokeResponse = self
            .post(OPERATION, Resource::CertificateRevoke, &body)
            .await?
            .expect_status(OPERATION, &[200, 202])?
            .json(OPERATION)?;

        if !response.success {
            session.finish();
            warn!(object_path = %path, error = %response.error, "Revocation failed");
            return Err(ClientError::Rejected {
                operation: OPERATION,
                message: response.error,
            });
        }

        session.advance(LifecycleState::Revoked);
        session.finish();
        let outcome = if response.requested {
            RevokeOutcome::Revoked
        } else {
            RevokeOutcome::AlreadyRevoked
        };
        info!(object_path = %path, reason = %request.reason, outcome = ?outcome, "Certificate revoked");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_mapping() {
        assert_eq!(RevocationReason::from_str_loose("key-compromise").code(), 1);
        assert_eq!(RevocationReason::from_str_loose("CA-Compromise").code(), 2);
        assert_eq!(RevocationReason::from_str_loose("affiliation-changed").code(), 3);
        assert_eq!(RevocationReason::from_str_loose("superseded").code(), 4);
        assert_eq!(RevocationReason::from_str_loose("cessation-of-operation").code(), 5);
        assert_eq!(RevocationReason::from_str_loose("").code(), 0);
        assert_eq!(RevocationReason::from_str_loose("stolen laptop").code(), 0);
    }

    #[test]
    fn test_reason_display_parses_back() {
        for code in 0..=5u8 {
            let reason = [
                RevocationReason::None,
                RevocationReason::KeyCompromise,
                RevocationReason::CaCompromise,
                RevocationReason::AffiliationChanged,
                RevocationReason::Superseded,
                RevocationReason::CessationOfOperation,
            ][code as usize];
            assert_eq!(reason.code(), code);
            assert_eq!(RevocationReason::from_str_loose(&reason.to_string()), reason);
        }
    }
}
