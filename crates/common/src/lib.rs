//! Certward Common
//!
//! Shared types for the certward certificate lifecycle client:
//!
//! - **Identifiers**: backend object paths and GUIDs ([`ObjectPath`], [`ObjectGuid`])
//! - **Keys**: key algorithms, curves and supported sizes
//! - **Requests**: the caller-facing [`CertificateRequest`] model
//! - **Chains**: chain ordering for retrieved certificates

pub mod chain;
pub mod ids;
pub mod keys;
pub mod request;

pub use chain::ChainOrder;
pub use ids::{ObjectGuid, ObjectPath};
pub use keys::{EllipticCurve, KeySpecError, KeyType};
pub use request::{
    CertificateRequest, CsrOrigin, CustomField, CustomFieldKind, IdentityEntry, IssuerHint,
    KeyParams, Location, SanKind, Subject, SubjectAltNames,
};
