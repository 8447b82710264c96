//! Certificate lifecycle orchestration.
//!
//! Every operation is one method on [`Connector`](crate::Connector) and one
//! round trip to the backend, except [`RetrievalPoller::wait`], which is a
//! caller-bounded loop of retrieve attempts.
//!
//! ```text
//! Unrequested -> Requested -> Issued | Pending | Rejected
//! Pending     -> Issued | Pending | Rejected
//! Issued      -> Renewed | Revoked
//! Renewed     -> Issued | Pending
//! Requested | Pending | Issued | Renewed -> Reset -> Requested
//! ```
//!
//! Each call records its progress in a [`LifecycleSession`] that lives only
//! for that call and is logged when it ends.

use std::fmt;
use std::time::Instant;

use tracing::{debug, warn};

use certward_common::ObjectPath;

mod identity;
mod import;
mod metadata;
mod renew;
mod request;
mod reset;
mod retrieve;
mod revoke;
mod system;
mod wire;
mod zone;

pub use identity::IdentityType;
pub use import::{ImportRequest, ImportResponse};
pub use metadata::{MetadataField, MetadataValue};
pub use renew::RenewRequest;
pub use request::{format_end_date, prepare_request};
pub use retrieve::{RetrievalPoller, RetrieveOutcome, RetrieveRequest};
pub use revoke::{RevocationReason, RevokeOutcome, RevokeRequest};
pub use system::{LogEvent, ObjectGuidInfo};

/// Where a certificate object is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Unrequested,
    Requested,
    Issued,
    Pending,
    Rejected,
    Renewed,
    Revoked,
    Reset,
}

impl LifecycleState {
    /// Rejected and revoked objects take no further operations.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Rejected | LifecycleState::Revoked)
    }

    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, next) {
            (Unrequested, Requested) => true,
            (Requested | Pending, Issued | Pending | Rejected) => true,
            (Issued, Renewed | Revoked) => true,
            (Renewed, Issued | Pending) => true,
            (Requested | Pending | Issued | Renewed, Reset) => true,
            (Reset, Requested) => true,
            _ => false,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Unrequested => "unrequested",
            LifecycleState::Requested => "requested",
            LifecycleState::Issued => "issued",
            LifecycleState::Pending => "pending",
            LifecycleState::Rejected => "rejected",
            LifecycleState::Renewed => "renewed",
            LifecycleState::Revoked => "revoked",
            LifecycleState::Reset => "reset",
        };
        f.write_str(s)
    }
}

/// Lifecycle operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Request,
    Retrieve,
    Renew,
    Revoke,
    Reset,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Request => "request",
            Operation::Retrieve => "retrieve",
            Operation::Renew => "renew",
            Operation::Revoke => "revoke",
            Operation::Reset => "reset",
        }
    }

    /// State the object is assumed to be in when the operation starts.
    fn assumed_start(&self) -> LifecycleState {
        match self {
            Operation::Request => LifecycleState::Unrequested,
            Operation::Retrieve => LifecycleState::Requested,
            Operation::Renew | Operation::Revoke => LifecycleState::Issued,
            Operation::Reset => LifecycleState::Pending,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call lifecycle state.
#[derive(Debug, Clone)]
pub struct LifecycleSession {
    object_path: ObjectPath,
    operation: Operation,
    state: LifecycleState,
    started: Instant,
}

impl LifecycleSession {
    pub fn new(operation: Operation, object_path: ObjectPath) -> Self {
        Self {
            object_path,
            operation,
            state: operation.assumed_start(),
            started: Instant::now(),
        }
    }

    pub fn object_path(&self) -> &ObjectPath {
        &self.object_path
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Record a state change. Returns false, leaving the state unchanged,
    /// when the transition is not part of the lifecycle.
    pub fn advance(&mut self, next: LifecycleState) -> bool {
        if !self.state.can_transition_to(next) {
            warn!(
                object_path = %self.object_path,
                operation = %self.operation,
                from = %self.state,
                to = %next,
                "Ignoring invalid lifecycle transition"
            );
            return false;
        }
        self.state = next;
        true
    }

    /// Set the object path once the backend has assigned it.
    pub(crate) fn set_object_path(&mut self, path: ObjectPath) {
        self.object_path = path;
    }

    /// Log the outcome and drop the session.
    pub(crate) fn finish(self) -> LifecycleState {
        debug!(
            object_path = %self.object_path,
            operation = %self.operation,
            state = %self.state,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Lifecycle operation finished"
        );
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_path() {
        let mut session =
            LifecycleSession::new(Operation::Request, ObjectPath::policy("Certs\\a"));
        assert_eq!(session.state(), LifecycleState::Unrequested);
        assert!(session.advance(LifecycleState::Requested));
        assert!(session.advance(LifecycleState::Pending));
        assert!(session.advance(LifecycleState::Issued));
        assert!(session.advance(LifecycleState::Renewed));
        assert_eq!(session.finish(), LifecycleState::Renewed);
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for terminal in [LifecycleState::Rejected, LifecycleState::Revoked] {
            assert!(terminal.is_terminal());
            for next in [
                LifecycleState::Requested,
                LifecycleState::Issued,
                LifecycleState::Reset,
                LifecycleState::Renewed,
            ] {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_reset_returns_to_requested() {
        assert!(LifecycleState::Pending.can_transition_to(LifecycleState::Reset));
        assert!(LifecycleState::Reset.can_transition_to(LifecycleState::Requested));
        assert!(!LifecycleState::Reset.can_transition_to(LifecycleState::Issued));
    }

    #[test]
    fn test_invalid_transition_keeps_state() {
        let mut session =
            LifecycleSession::new(Operation::Revoke, ObjectPath::policy("Certs\\a"));
        assert!(session.advance(LifecycleState::Revoked));
        assert!(!session.advance(LifecycleState::Issued));
        assert_eq!(session.state(), LifecycleState::Revoked);
    }
}
