//! # Error Types
//!
//! Defines error types used across the relay crates.

use thiserror::Error;

use crate::entities::{Action, DomainName, SessionId};
use crate::envelope::CorrelationId;

/// Errors surfaced by the domain relay.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// Inbound message belongs to another session.
    #[error("Session mismatch: expected {expected}, received {received}")]
    SessionMismatch {
        expected: SessionId,
        received: SessionId,
    },

    /// Receiving domain's registry entry does not list the action.
    #[error("Domain {domain} cannot handle action {action}")]
    UnsupportedAction { domain: DomainName, action: String },

    /// No response arrived within the request timeout.
    #[error("Request to {target} for {action} timed out after {timeout_ms}ms")]
    Timeout {
        target: DomainName,
        action: Action,
        timeout_ms: u64,
    },

    /// Neither a frame nor a window could be reached.
    #[error("Transport unavailable for domain {0}")]
    TransportUnavailable(DomainName),

    /// Inbound message could not be understood.
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// Inbound message came from an origin outside the allow list.
    #[error("Origin rejected: {0}")]
    OriginRejected(String),

    /// Remote handler reported a failure.
    #[error("Action {action} failed on {target}: {reason}")]
    ActionFailed {
        target: DomainName,
        action: Action,
        reason: String,
    },

    /// The resolver was dropped before a response or timeout.
    #[error("Request {0} was abandoned")]
    Abandoned(CorrelationId),

    /// A domain tried to message itself.
    #[error("Cannot send to the current domain {0}")]
    SelfTarget(DomainName),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from message transports.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The receiving frame or window has gone away.
    #[error("Window for domain {0} is closed")]
    Closed(DomainName),

    /// No window could be opened for the domain.
    #[error("No window could be opened for domain {0}")]
    Unavailable(DomainName),

    /// The message could not be encoded.
    #[error("Encoding error: {0}")]
    Encode(String),
}

/// Errors from durable key/value storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Storage encoding error: {0}")]
    Encode(String),

    /// The store was closed and cannot be written anymore.
    #[error("Storage closed")]
    Closed,
}

/// Errors from session updates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session update for {received} does not match session {expected}")]
    Mismatch {
        expected: SessionId,
        received: SessionId,
    },

    #[error("Session update carries no session id")]
    MissingId,
}

/// Errors from action handlers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    /// The payload is not acceptable for the action.
    #[error("Invalid input for {action}: {reason}")]
    InvalidInput { action: Action, reason: String },

    /// No handler is registered for the action.
    #[error("No handler registered for {0}")]
    NotHandled(Action),

    /// The handler's result could not be encoded.
    #[error("Failed to encode result of {action}: {reason}")]
    Encode { action: Action, reason: String },
}

/// Errors from parsing wire names.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error_names_target_and_action() {
        let err = RelayError::Timeout {
            target: DomainName::Crypto,
            action: Action::FeeCalculation,
            timeout_ms: 30_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("crypto"));
        assert!(msg.contains("feeCalculation"));
        assert!(msg.contains("30000ms"));
    }

    #[test]
    fn test_transport_error_converts() {
        let err: RelayError = TransportError::Unavailable(DomainName::Nft).into();
        assert!(matches!(
            err,
            RelayError::Transport(TransportError::Unavailable(DomainName::Nft))
        ));
    }

    #[test]
    fn test_unsupported_action_message() {
        let err = RelayError::UnsupportedAction {
            domain: DomainName::Wallet,
            action: "feeCalculation".into(),
        };
        assert!(err.to_string().contains("wallet"));
    }
}
