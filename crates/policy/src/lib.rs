//! Certward Policy
//!
//! Translates the backend's declared enrollment policy into an offline
//! validation grammar:
//!
//! - [`PolicyDocument`]: the policy exactly as the backend reports it
//! - [`compile`]: pure, deterministic compilation into a [`CompiledPolicy`]
//! - [`CompiledPolicy::validate`]: check a request without a network call
//! - [`ZoneConfiguration`]: defaults a zone pre-fills into requests
//!
//! Every compiled pattern is anchored at both ends. A locked attribute
//! compiles to an escaped exact match, an unlocked one to a permit-all
//! pattern, and a disabled SAN kind to an empty set.

pub mod compiled;
pub mod compiler;
pub mod document;
pub mod error;
pub mod zone;

pub use compiled::{AllowedKeyConfiguration, AttributePatterns, CompiledPolicy, ManualCsr};
pub use compiler::compile;
pub use document::{KeyPairPolicy, LockedValue, LockedValues, PolicyDocument, SubjectPolicy};
pub use error::{PolicyError, PolicyResult, Violation, ViolationReason};
pub use zone::{ManagementType, ZoneConfiguration};
