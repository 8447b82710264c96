//! Custom-field metadata on certificate objects.

use serde::Deserialize;
use tracing::{debug, info};

use certward_common::ObjectPath;

use super::wire::{nullable, DnBody, GuidData, MetadataSetBody, MetadataSetResponse};
use crate::connector::Connector;
use crate::error::{ClientError, ClientResult};
use crate::transport::Resource;

/// A metadata field definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MetadataField {
    #[serde(deserialize_with = "nullable")]
    pub guid: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub label: String,
    #[serde(deserialize_with = "nullable")]
    pub help: String,
    #[serde(rename = "DN", deserialize_with = "nullable")]
    pub dn: String,
    #[serde(deserialize_with = "nullable")]
    pub r#type: i64,
    pub allowed_values: Option<Vec<String>>,
    pub default_values: Option<Vec<String>>,
    #[serde(deserialize_with = "nullable")]
    pub regular_expression: String,
    #[serde(deserialize_with = "nullable")]
    pub error_message: String,
    #[serde(deserialize_with = "nullable")]
    pub policyable: bool,
    #[serde(deserialize_with = "nullable")]
    pub render_hidden: bool,
    #[serde(deserialize_with = "nullable")]
    pub render_read_only: bool,
}

/// Values of one field on an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataValue {
    pub field: MetadataField,
    pub values: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ItemsResponse {
    items: Option<Vec<MetadataField>>,
    locked: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ValuesResponse {
    data: Option<Vec<ValueEntry>>,
    locked: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ValueEntry {
    key: MetadataField,
    value: Option<Vec<String>>,
}

impl Connector {
    /// Fields that apply to an object.
    pub async fn metadata_fields(&self, object_path: &ObjectPath) -> ClientResult<Vec<MetadataField>> {
        const OPERATION: &str = "metadata_items";
        let response: ItemsResponse = self
            .post(OPERATION, Resource::MetadataGetItems, &dn(object_path))
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;
        let items = response.items.unwrap_or_default();
        debug!(object_path = %object_path, fields = items.len(), locked = response.locked, "Read metadata fields");
        Ok(items)
    }

    /// Field values set on an object.
    pub async fn metadata_values(&self, object_path: &ObjectPath) -> ClientResult<Vec<MetadataValue>> {
        const OPERATION: &str = "metadata_get";
        let response: ValuesResponse = self
            .post(OPERATION, Resource::MetadataGet, &dn(object_path))
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;
        debug!(object_path = %object_path, locked = response.locked, "Read metadata values");
        Ok(response
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|e| MetadataValue {
                field: e.key,
                values: e.value.unwrap_or_default(),
            })
            .collect())
    }

    /// Set field values by field name or label. With `keep_existing`,
    /// values of fields not named here are left alone.
    pub async fn set_metadata(
        &self,
        object_path: &ObjectPath,
        values: &[(&str, Vec<String>)],
        keep_existing: bool,
    ) -> ClientResult<()> {
        const OPERATION: &str = "metadata_set";
        let fields = self.metadata_fields(object_path).await?;

        let guid_data = values
            .iter()
            .map(|(name, list)| {
                fields
                    .iter()
                    .find(|f| f.name.eq_ignore_ascii_case(name) || f.label.eq_ignore_ascii_case(name))
                    .map(|f| GuidData {
                        item_guid: f.guid.clone(),
                        list: list.clone(),
                    })
                    .ok_or_else(|| {
                        ClientError::InvalidRequest(format!(
                            "no metadata field {name:?} on {object_path}"
                        ))
                    })
            })
            .collect::<ClientResult<Vec<_>>>()?;

        let response: MetadataSetResponse = self
            .post(
                OPERATION,
                Resource::MetadataSet,
                &MetadataSetBody {
                    dn: object_path.to_string(),
                    guid_data,
                    keep_existing,
                },
            )
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;

        if response.locked {
            return Err(ClientError::Rejected {
                operation: OPERATION,
                message: format!("metadata on {object_path} is locked"),
            });
        }
        if response.result != 0 {
            return Err(ClientError::Rejected {
                operation: OPERATION,
                message: format!("backend result code {}", response.result),
            });
        }
        info!(object_path = %object_path, fields = values.len(), "Metadata set");
        Ok(())
    }
}

fn dn(object_path: &ObjectPath) -> DnBody {
    DnBody {
        dn: object_path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_response_tolerates_nulls() {
        let response: ValuesResponse = serde_json::from_str(
            r#"{"Data":[{"Key":{"Guid":"{1}","Name":"Cost Center","AllowedValues":null},
                         "Value":["42"]},
                        {"Key":{"Guid":"{2}","Name":"Owner","Help":null},"Value":null}],
                "Locked":false}"#,
        )
        .unwrap();
        let data = response.data.unwrap();
        assert_eq!(data[0].key.name, "Cost Center");
        assert_eq!(data[0].value.as_deref(), Some(&["42".to_string()][..]));
        assert!(data[1].value.is_none());
    }
}
