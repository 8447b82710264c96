//! Request and response bodies of the lifecycle resources.
//!
//! Field names are the backend's PascalCase names; empty values are
//! omitted from request bodies, and `null` response fields decode to
//! their defaults.

use serde::{Deserialize, Serialize};

use certward_common::IdentityEntry;
use certward_policy::PolicyDocument;

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SanEntry {
    pub r#type: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct NameValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CustomFieldEntry {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Application {
    pub object_name: String,
    pub class: String,
    pub driver_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub validation_host: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub validation_port: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Device {
    #[serde(rename = "PolicyDN")]
    pub policy_dn: String,
    pub object_name: String,
    pub host: String,
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CertificateRequestBody {
    #[serde(rename = "PolicyDN")]
    pub policy_dn: String,
    #[serde(rename = "CADN", skip_serializing_if = "String::is_empty")]
    pub ca_dn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub object_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subject: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub organizational_unit: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub organization: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub city: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub country: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subject_alt_names: Vec<SanEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contacts: Vec<IdentityEntry>,
    #[serde(rename = "CASpecificAttributes", skip_serializing_if = "Vec::is_empty")]
    pub ca_specific_attributes: Vec<NameValue>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub origin: String,
    #[serde(rename = "PKCS10", skip_serializing_if = "String::is_empty")]
    pub pkcs10: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_algorithm: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub key_bit_size: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub elliptic_curve: String,
    #[serde(skip_serializing_if = "is_false")]
    pub disable_automatic_renewal: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomFieldEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<Device>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub certificate_type: String,
    #[serde(skip_serializing_if = "is_false")]
    pub reenable: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub work_to_do_timeout: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CertificateRequestResponse {
    #[serde(default, rename = "CertificateDN", deserialize_with = "nullable")]
    pub certificate_dn: String,
    #[serde(default, deserialize_with = "nullable")]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RetrieveRequestBody {
    #[serde(rename = "CertificateDN")]
    pub certificate_dn: String,
    pub format: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(skip_serializing_if = "is_false")]
    pub include_private_key: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub include_chain: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub friendly_name: String,
    #[serde(skip_serializing_if = "is_false")]
    pub root_first_order: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RetrieveResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub certificate_data: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    #[serde(default, deserialize_with = "nullable")]
    pub stage: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RevokeRequestBody {
    #[serde(rename = "CertificateDN", skip_serializing_if = "String::is_empty")]
    pub certificate_dn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thumbprint: String,
    pub reason: u8,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comments: String,
    #[serde(skip_serializing_if = "is_false")]
    pub disable: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RevokeResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub requested: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub success: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RenewRequestBody {
    #[serde(rename = "CertificateDN")]
    pub certificate_dn: String,
    #[serde(rename = "PKCS10", skip_serializing_if = "String::is_empty")]
    pub pkcs10: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RenewResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub success: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ResetRequestBody {
    #[serde(rename = "CertificateDN")]
    pub certificate_dn: String,
    pub restart: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ErrorOnlyResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ImportRequestBody {
    #[serde(rename = "PolicyDN")]
    pub policy_dn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub object_name: String,
    pub certificate_data: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_key_data: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(skip_serializing_if = "is_false")]
    pub reconcile: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ImportResponseBody {
    #[serde(default, rename = "CertificateDN", deserialize_with = "nullable")]
    pub certificate_dn: String,
    #[serde(default, rename = "CertificateVaultId", deserialize_with = "nullable")]
    pub certificate_vault_id: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub guid: String,
    #[serde(default, rename = "PrivateKeyVaultId", deserialize_with = "nullable")]
    pub private_key_vault_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PolicyCheckBody {
    #[serde(rename = "PolicyDN")]
    pub policy_dn: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PolicyCheckResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub error: String,
    #[serde(default, deserialize_with = "nullable")]
    pub policy: Option<PolicyDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ReadPolicyBody {
    #[serde(rename = "ObjectDN")]
    pub object_dn: String,
    pub class: String,
    pub attribute_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ReadPolicyResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub error: String,
    #[serde(default, deserialize_with = "nullable")]
    pub result: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub values: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BrowseIdentitiesBody {
    pub filter: String,
    pub limit: u32,
    pub identity_type: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BrowseIdentitiesResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub identities: Vec<IdentityEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct IdentityRef {
    pub prefixed_universal: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ValidateIdentityBody {
    #[serde(rename = "ID")]
    pub id: IdentityRef,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ValidateIdentityResponse {
    #[serde(default, rename = "ID", deserialize_with = "nullable")]
    pub id: IdentityEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct DnBody {
    #[serde(rename = "DN")]
    pub dn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DnToGuidBody {
    #[serde(rename = "ObjectDN")]
    pub object_dn: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DnToGuidResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub class_name: String,
    #[serde(default, rename = "GUID", deserialize_with = "nullable")]
    pub guid: String,
    #[serde(default, rename = "HierarchicalGUID", deserialize_with = "nullable")]
    pub hierarchical_guid: String,
    #[serde(default, deserialize_with = "nullable")]
    pub result: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub revision: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct GuidData {
    pub item_guid: String,
    pub list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct MetadataSetBody {
    #[serde(rename = "DN")]
    pub dn: String,
    pub guid_data: Vec<GuidData>,
    pub keep_existing: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct MetadataSetResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub locked: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub result: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct LogRequestBody {
    #[serde(rename = "ID")]
    pub id: u32,
    #[serde(rename = "Component")]
    pub component: String,
    #[serde(rename = "Severity", skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    #[serde(rename = "Text1", skip_serializing_if = "String::is_empty")]
    pub text1: String,
    #[serde(rename = "Text2", skip_serializing_if = "String::is_empty")]
    pub text2: String,
    #[serde(rename = "Value1", skip_serializing_if = "Option::is_none")]
    pub value1: Option<i64>,
    #[serde(rename = "Value2", skip_serializing_if = "Option::is_none")]
    pub value2: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LogResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub log_result: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SearchResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub certificates: Vec<SearchHit>,
    #[serde(default, deserialize_with = "nullable")]
    pub total_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SearchHit {
    #[serde(default, rename = "DN", deserialize_with = "nullable")]
    pub dn: String,
    #[serde(default, rename = "Guid", deserialize_with = "nullable")]
    pub guid: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
