//! Import of externally issued certificates.

use tracing::info;

use certward_common::ObjectPath;

use super::wire::{ImportRequestBody, ImportResponseBody};
use crate::chain::CertificateBundle;
use crate::connector::Connector;
use crate::error::{ClientError, ClientResult};
use crate::transport::Resource;

const OPERATION: &str = "import_certificate";

/// A certificate (and optionally its key) to place in a zone.
#[derive(Clone, Default)]
pub struct ImportRequest {
    /// Zone to import into; the connector default when empty.
    pub zone: String,
    /// Object name; derived by the backend from the certificate when empty.
    pub object_name: String,
    /// PEM certificate, optionally followed by its chain.
    pub certificate_pem: String,
    pub private_key_pem: Option<String>,
    /// Password protecting the private key.
    pub password: String,
    /// Merge with an existing object of the same name.
    pub reconcile: bool,
}

impl ImportRequest {
    /// Import a retrieved bundle, including its key when present.
    pub fn from_bundle(zone: impl Into<String>, bundle: &CertificateBundle) -> Self {
        Self {
            zone: zone.into(),
            certificate_pem: bundle.certificates_pem(),
            private_key_pem: bundle.private_key.clone(),
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for ImportRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportRequest")
            .field("zone", &self.zone)
            .field("object_name", &self.object_name)
            .field("has_private_key", &self.private_key_pem.is_some())
            .field("reconcile", &self.reconcile)
            .finish()
    }
}

/// Where an imported certificate landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResponse {
    pub object_path: ObjectPath,
    pub guid: String,
    pub certificate_vault_id: i64,
    pub private_key_vault_id: i64,
}

impl Connector {
    pub async fn import_certificate(&self, request: &ImportRequest) -> ClientResult<ImportResponse> {
        if request.certificate_pem.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "import needs certificate data".to_string(),
            ));
        }
        let zone = self.zone_or_default(&request.zone);

        let body = ImportRequestBody {
            policy_dn: ObjectPath::policy(zone).into_string(),
            object_name: request.object_name.clone(),
            certificate_data: request.certificate_pem.clone(),
            private_key_data: request.private_key_pem.clone().unwrap_or_default(),
            password: request.password.clone(),
            reconcile: request.reconcile,
        };

        let response: ImportResponseBody = self
            .post(OPERATION, Resource::CertificateImport, &body)
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;

        if response.certificate_dn.is_empty() {
            return Err(ClientError::decode(OPERATION, "response has no certificate DN"));
        }

        let imported = ImportResponse {
            object_path: ObjectPath::from_backend(response.certificate_dn),
            guid: response.guid,
            certificate_vault_id: response.certificate_vault_id,
            private_key_vault_id: response.private_key_vault_id,
        };
        info!(object_path = %imported.object_path, "Certificate imported");
        Ok(imported)
    }
}
