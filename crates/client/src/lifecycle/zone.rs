//! Zone read: policy document plus the policy attributes that gate requests.

use tracing::{debug, info};

use certward_common::ObjectPath;
use certward_policy::{PolicyError, ZoneConfiguration};

use super::wire::{PolicyCheckBody, PolicyCheckResponse, ReadPolicyBody, ReadPolicyResponse};
use crate::connector::Connector;
use crate::error::{ClientError, ClientResult};
use crate::transport::Resource;

const CERTIFICATE_CLASS: &str = "X509 Certificate";
const MANUAL_CSR_ATTRIBUTE: &str = "Manual Csr";
const MANAGEMENT_TYPE_ATTRIBUTE: &str = "Management Type";

impl Connector {
    /// Read and compile a zone's policy.
    pub async fn read_zone_configuration(&self, zone: &str) -> ClientResult<ZoneConfiguration> {
        const OPERATION: &str = "read_zone";
        let zone = self.zone_or_default(zone);
        if zone.is_empty() {
            return Err(ClientError::PolicyViolation("no zone specified".to_string()));
        }
        let policy_dn = ObjectPath::policy(zone);

        let response: PolicyCheckResponse = self
            .post(
                OPERATION,
                Resource::CheckPolicy,
                &PolicyCheckBody {
                    policy_dn: policy_dn.to_string(),
                },
            )
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;

        if !response.error.is_empty() {
            return Err(ClientError::Rejected {
                operation: OPERATION,
                message: response.error,
            });
        }
        let document = response.policy.ok_or_else(|| {
            ClientError::Policy(PolicyError::Malformed(format!(
                "zone {policy_dn} returned no policy"
            )))
        })?;

        let manual_csr = self.read_policy_attribute(&policy_dn, MANUAL_CSR_ATTRIBUTE).await?;
        let management_type = self
            .read_policy_attribute(&policy_dn, MANAGEMENT_TYPE_ATTRIBUTE)
            .await?;

        let config = ZoneConfiguration::from_document(&document)?
            .with_attributes(manual_csr.as_deref(), management_type.as_deref());

        info!(
            zone = %policy_dn,
            management_type = %config.management_type,
            manual_csr = ?config.policy.manual_csr,
            "Zone configuration read"
        );
        Ok(config)
    }

    /// First value of a certificate-class policy attribute on a folder.
    pub async fn read_policy_attribute(
        &self,
        policy_dn: &ObjectPath,
        attribute: &str,
    ) -> ClientResult<Option<String>> {
        const OPERATION: &str = "read_policy";
        let response: ReadPolicyResponse = self
            .post(
                OPERATION,
                Resource::ReadPolicy,
                &ReadPolicyBody {
                    object_dn: policy_dn.to_string(),
                    class: CERTIFICATE_CLASS.to_string(),
                    attribute_name: attribute.to_string(),
                },
            )
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;

        if !response.error.is_empty() {
            return Err(ClientError::Rejected {
                operation: OPERATION,
                message: response.error,
            });
        }

        let value = response.values.into_iter().next();
        debug!(
            object_dn = %policy_dn,
            attribute,
            value = ?value,
            locked = response.locked,
            "Read policy attribute"
        );
        Ok(value)
    }
}
