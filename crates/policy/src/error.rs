//! Policy error types.

use std::fmt;
use thiserror::Error;

use certward_common::KeySpecError;

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors from compiling a policy document or validating a request against it.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The backend reported a key algorithm or curve this client does not know.
    #[error("invalid key specification in zone policy: {0}")]
    KeySpec(#[from] KeySpecError),

    /// A generated pattern failed to compile.
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The policy document could not be decoded.
    #[error("malformed policy document: {0}")]
    Malformed(String),

    /// The request breaks one or more zone rules.
    #[error("request violates zone policy: {}", join_violations(.0))]
    Violations(Vec<Violation>),
}

/// A single rule a request breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Attribute the rule applies to (`CN`, `O`, `DNS SAN`, `key`, ...).
    pub attribute: String,
    /// Offending value.
    pub value: String,
    pub reason: ViolationReason,
}

/// Why a value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationReason {
    /// The value matches none of the zone's patterns.
    NotPermitted,
    /// The zone disables this attribute entirely.
    MustBeAbsent,
    /// Wildcards are not allowed in this zone.
    WildcardForbidden,
    /// No allowed key configuration accepts the key parameters.
    KeyNotAllowed,
}

impl Violation {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>, reason: ViolationReason) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
            reason,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            ViolationReason::NotPermitted => {
                write!(f, "{} {:?} does not match zone policy", self.attribute, self.value)
            }
            ViolationReason::MustBeAbsent => {
                write!(f, "{} {:?} is not allowed in this zone", self.attribute, self.value)
            }
            ViolationReason::WildcardForbidden => {
                write!(f, "{} {:?}: wildcards are not allowed", self.attribute, self.value)
            }
            ViolationReason::KeyNotAllowed => {
                write!(f, "key {} is not an allowed key configuration", self.value)
            }
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
