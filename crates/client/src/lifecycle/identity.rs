//! Identity lookups for request contacts.

use tracing::debug;

use certward_common::IdentityEntry;

use super::wire::{
    BrowseIdentitiesBody, BrowseIdentitiesResponse, IdentityRef, ValidateIdentityBody,
    ValidateIdentityResponse,
};
use crate::connector::Connector;
use crate::error::{ClientError, ClientResult};
use crate::transport::Resource;

/// Identity kinds, as a bit set on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityType {
    User,
    SecurityGroup,
    DistributionGroup,
    All,
}

impl IdentityType {
    pub fn code(&self) -> u32 {
        match self {
            IdentityType::User => 1,
            IdentityType::SecurityGroup => 2,
            IdentityType::DistributionGroup => 8,
            IdentityType::All => 1 | 2 | 8,
        }
    }
}

/// Browse results to fetch when resolving one contact; two is enough to
/// tell a unique match from an ambiguous one.
const RESOLVE_LIMIT: u32 = 2;

impl Connector {
    /// Identities whose names match `filter`.
    pub async fn browse_identities(
        &self,
        filter: &str,
        limit: u32,
        identity_type: IdentityType,
    ) -> ClientResult<Vec<IdentityEntry>> {
        const OPERATION: &str = "browse_identities";
        let response: BrowseIdentitiesResponse = self
            .post(
                OPERATION,
                Resource::BrowseIdentities,
                &BrowseIdentitiesBody {
                    filter: filter.to_string(),
                    limit,
                    identity_type: identity_type.code(),
                },
            )
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;
        debug!(filter, found = response.identities.len(), "Browsed identities");
        Ok(response.identities)
    }

    /// Look up an identity by its prefixed universal name.
    pub async fn validate_identity(&self, prefixed_universal: &str) -> ClientResult<IdentityEntry> {
        const OPERATION: &str = "validate_identity";
        let response: ValidateIdentityResponse = self
            .post(
                OPERATION,
                Resource::ValidateIdentity,
                &ValidateIdentityBody {
                    id: IdentityRef {
                        prefixed_universal: prefixed_universal.to_string(),
                    },
                },
            )
            .await?
            .expect_status(OPERATION, &[200])?
            .json(OPERATION)?;
        Ok(response.id)
    }

    /// Resolve contact names to identities for a request's contact list.
    pub async fn resolve_contacts<S: AsRef<str>>(&self, names: &[S]) -> ClientResult<Vec<IdentityEntry>> {
        let mut contacts = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let found = self
                .browse_identities(name, RESOLVE_LIMIT, IdentityType::All)
                .await?;
            contacts.push(pick_identity(name, found)?);
        }
        Ok(contacts)
    }
}

fn pick_identity(name: &str, mut found: Vec<IdentityEntry>) -> ClientResult<IdentityEntry> {
    match found.len() {
        0 => Err(ClientError::InvalidRequest(format!("no identity named {name:?}"))),
        1 => Ok(found.remove(0)),
        _ => found
            .into_iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ClientError::InvalidRequest(format!("identity name {name:?} is ambiguous"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str) -> IdentityEntry {
        IdentityEntry {
            name: name.to_string(),
            prefixed_universal: format!("local:{{{name}}}"),
            ..Default::default()
        }
    }

    #[test]
    fn test_pick_identity() {
        assert!(pick_identity("alice", vec![]).is_err());
        assert_eq!(pick_identity("al", vec![identity("alice")]).unwrap().name, "alice");
        assert_eq!(
            pick_identity("Alice", vec![identity("alice2"), identity("alice")])
                .unwrap()
                .name,
            "alice"
        );
        assert!(pick_identity("al", vec![identity("alice"), identity("alan")]).is_err());
    }

    #[test]
    fn test_identity_type_codes() {
        assert_eq!(IdentityType::All.code(), 11);
        assert_eq!(IdentityType::User.code(), 1);
    }
}
