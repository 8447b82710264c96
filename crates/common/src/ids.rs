//! Type-safe identifier newtypes for backend objects.
//!
//! These types keep the different kinds of backend identifiers apart
//! (a policy folder path is not a certificate path, and neither is a GUID),
//! and own the path normalization rules of the backend's object tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root of the backend policy tree. Every object path lives below it.
pub const POLICY_ROOT: &str = "\\VED\\Policy";

/// Separator between object path components.
pub const PATH_SEPARATOR: char = '\\';

/// Workload name used for device applications when the caller sets none.
pub const DEFAULT_WORKLOAD: &str = "Default";

/// Backslash-separated distinguished name of a backend object.
///
/// Object paths double as the pickup identifier of a certificate request:
/// the path returned by a request is what retrieve, renew, revoke and reset
/// operate on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Wrap a path exactly as the backend returned it.
    pub fn from_backend(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Resolve a zone into its policy folder path.
    ///
    /// Zones may be given relative (`Certificates\Web`) or absolute
    /// (`\VED\Policy\Certificates\Web`); both resolve to the same path.
    /// Runs of separators collapse to one.
    pub fn policy(zone: &str) -> Self {
        Self(collapse_separators(&rooted(zone)))
    }

    /// Resolve the path a certificate object gets inside a zone.
    ///
    /// The object is named by its friendly name when one is set, and by
    /// its common name otherwise.
    pub fn for_certificate(zone: &str, friendly_name: &str, common_name: &str) -> Self {
        let name = if friendly_name.is_empty() {
            common_name
        } else {
            friendly_name
        };
        Self::policy(&format!("{zone}{PATH_SEPARATOR}{name}"))
    }

    /// Resolve the path of a device object (`zone\instance\workload`).
    pub fn for_device(zone: &str, instance: &str, workload: &str) -> Self {
        let workload = if workload.is_empty() {
            DEFAULT_WORKLOAD
        } else {
            workload
        };
        Self::policy(&format!(
            "{zone}{PATH_SEPARATOR}{instance}{PATH_SEPARATOR}{workload}"
        ))
    }

    /// Last path component.
    pub fn name(&self) -> &str {
        self.0
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or(self.0.as_str())
    }

    /// Path of the containing folder, if any.
    pub fn parent(&self) -> Option<ObjectPath> {
        let idx = self.0.rfind(PATH_SEPARATOR)?;
        if idx == 0 {
            return None;
        }
        Some(Self(self.0[..idx].to_string()))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String
    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ObjectPath {
    fn from(s: &str) -> Self {
        Self::from_backend(s)
    }
}

/// GUID of a backend object, as returned by the DN-to-GUID lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectGuid(String);

impl ObjectGuid {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn rooted(zone: &str) -> String {
    if zone.starts_with(POLICY_ROOT) {
        return zone.to_string();
    }
    if zone.starts_with(PATH_SEPARATOR) {
        format!("{POLICY_ROOT}{zone}")
    } else {
        format!("{POLICY_ROOT}{PATH_SEPARATOR}{zone}")
    }
}

fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_was_separator = false;
    for c in path.chars() {
        if c == PATH_SEPARATOR {
            if !previous_was_separator {
                out.push(c);
            }
            previous_was_separator = true;
        } else {
            out.push(c);
            previous_was_separator = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_path_relative_zone() {
        let path = ObjectPath::policy("Certificates\\Web");
        assert_eq!(path.as_str(), "\\VED\\Policy\\Certificates\\Web");
    }

    #[test]
    fn test_policy_path_leading_separator() {
        let path = ObjectPath::policy("\\Certificates\\Web");
        assert_eq!(path.as_str(), "\\VED\\Policy\\Certificates\\Web");
    }

    #[test]
    fn test_policy_path_already_rooted() {
        let path = ObjectPath::policy("\\VED\\Policy\\Certificates");
        assert_eq!(path.as_str(), "\\VED\\Policy\\Certificates");
    }

    #[test]
    fn test_certificate_path_prefers_friendly_name() {
        let path = ObjectPath::for_certificate("Certificates", "web-01", "web.example.com");
        assert_eq!(path.as_str(), "\\VED\\Policy\\Certificates\\web-01");

        let path = ObjectPath::for_certificate("Certificates", "", "web.example.com");
        assert_eq!(path.as_str(), "\\VED\\Policy\\Certificates\\web.example.com");
    }

    #[test]
    fn test_certificate_path_collapses_repeats() {
        let path = ObjectPath::for_certificate("\\\\Certificates\\\\", "", "a.example.com");
        assert_eq!(path.as_str(), "\\VED\\Policy\\Certificates\\a.example.com");
    }

    #[test]
    fn test_certificate_path_is_deterministic() {
        let a = ObjectPath::for_certificate("Certs\\Web", "", "x.example.com");
        let b = ObjectPath::for_certificate("\\VED\\Policy\\Certs\\Web", "", "x.example.com");
        assert_eq!(a, b);
    }

    #[test]
    fn test_device_path_defaults_workload() {
        let path = ObjectPath::for_device("Devices", "host-1", "");
        assert_eq!(path.as_str(), "\\VED\\Policy\\Devices\\host-1\\Default");
    }

    #[test]
    fn test_name_and_parent() {
        let path = ObjectPath::from_backend("\\VED\\Policy\\Certificates\\web");
        assert_eq!(path.name(), "web");
        assert_eq!(
            path.parent().unwrap().as_str(),
            "\\VED\\Policy\\Certificates"
        );
        assert!(ObjectPath::from_backend("\\VED").parent().is_none());
    }

    proptest::proptest! {
        #[test]
        fn prop_certificate_path_has_no_repeated_separators(
            zone in "[a-zA-Z\\\\]{0,12}",
            name in "[a-z.]{1,12}",
        ) {
            let path = ObjectPath::for_certificate(&zone, "", &name);
            proptest::prop_assert!(path.as_str().starts_with(POLICY_ROOT));
            proptest::prop_assert!(!path.as_str().contains("\\\\"));
        }
    }
}
