//! Object lookups, event logging and backend version.

use tracing::{debug, info};

use certward_common::{ObjectGuid, ObjectPath};

use super::wire::{DnToGuidBody, DnToGuidResponse, LogRequestBody, LogResponse, SearchResponse};
use crate::connector::Connector;
use crate::error::{ClientError, ClientResult};
use crate::transport::Resource;

/// Config API result code for success.
const CONFIG_RESULT_SUCCESS: i64 = 1;

/// A backend object's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectGuidInfo {
    pub guid: ObjectGuid,
    pub class_name: String,
    pub hierarchical_guid: String,
    pub revision: i64,
}

/// An event for the backend's log.
#[derive(Debug, Clone, Default)]
pub struct LogEvent {
    /// Event definition ID.
    pub id: u32,
    /// Object the event is about.
    pub component: ObjectPath,
    pub severity: Option<u8>,
    pub text1: String,
    pub text2: String,
    pub value1: Option<i64>,
    pub value2: Option<i64>,
}

impl Connector {
    /// Translate an object path into the object's GUID.
    pub async fn dn_to_guid(&self, object_path: &ObjectPath) -> ClientResult<ObjectGuidInfo> {
        const OPERATION: &str = "dn_to_guid";
        let response: DnToGuidResponse = self
            .post(
                OPERATION,
                Resource::DnToGuid,
                &DnToGuidBody {
                    object_dn: object_path.to_string(),
                },
            )
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;

        if response.result != CONFIG_RESULT_SUCCESS || response.guid.is_empty() {
            return Err(ClientError::Rejected {
                operation: OPERATION,
                message: format!(
                    "lookup of {object_path} failed with result code {}",
                    response.result
                ),
            });
        }

        Ok(ObjectGuidInfo {
            guid: ObjectGuid::new(response.guid),
            class_name: response.class_name,
            hierarchical_guid: response.hierarchical_guid,
            revision: response.revision,
        })
    }

    /// Object path of the certificate with this SHA-1 thumbprint, if any.
    pub async fn search_by_thumbprint(&self, thumbprint: &str) -> ClientResult<Option<ObjectPath>> {
        const OPERATION: &str = "search_certificates";
        let thumbprint = thumbprint.replace(':', "").to_ascii_uppercase();
        let response: SearchResponse = self
            .get(
                OPERATION,
                Resource::CertificateSearch,
                &[("Thumbprint", thumbprint.as_str())],
            )
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;

        debug!(thumbprint = %thumbprint, total = response.total_count, "Searched certificates");
        Ok(response
            .certificates
            .into_iter()
            .map(|hit| hit.dn)
            .find(|dn| !dn.is_empty())
            .map(ObjectPath::from_backend))
    }

    /// Write an event to the backend's log.
    pub async fn log_event(&self, event: &LogEvent) -> ClientResult<()> {
        const OPERATION: &str = "log_event";
        let response: LogResponse = self
            .post(
                OPERATION,
                Resource::Log,
                &LogRequestBody {
                    id: event.id,
                    component: event.component.to_string(),
                    severity: event.severity,
                    text1: event.text1.clone(),
                    text2: event.text2.clone(),
                    value1: event.value1,
                    value2: event.value2,
                },
            )
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;

        if response.log_result != 0 {
            return Err(ClientError::Rejected {
                operation: OPERATION,
                message: format!("log result code {}", response.log_result),
            });
        }
        debug!(event_id = event.id, component = %event.component, "Logged event");
        Ok(())
    }

    /// Backend product version.
    pub async fn backend_version(&self) -> ClientResult<String> {
        const OPERATION: &str = "system_version";
        let version: String = self
            .get(OPERATION, Resource::SystemVersion, &[])
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;
        info!(version = %version, "Backend version");
        Ok(version)
    }
}
