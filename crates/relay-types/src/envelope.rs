//! # `RelayMessage` Envelope
//!
//! The wrapper for every message exchanged between domains.
//!
//! ## Wire Format
//!
//! ```text
//! {
//!   "type":         "ACTION_REQUEST" | "ACTION_RESPONSE" | "EMERGENCY_ACTIVATION"
//!                   | "SESSION_UPDATE" | "DOMAIN_READY",
//!   "payload":      { ...type specific... },
//!   "sourceDomain": "blockchain",
//!   "sessionId":    "sid_...",            (optional)
//!   "timestamp":    "2024-01-01T00:00:00Z",
//!   "messageId":    "<uuid>"
//! }
//! ```
//!
//! - **Correlation**: request/response pairs carry a `correlationId` in their
//!   payload, generated fresh for every request.
//! - **Deduplication**: `messageId` is unique per message so a receiver can
//!   drop copies that arrive over more than one transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::entities::{DomainName, SessionId};

/// Correlation ID for matching an action response to its request.
///
/// Uses UUID v7, which is time-ordered and therefore sorts by creation time
/// in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a new correlation ID (UUID v7)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse from string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// The recognized values of the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    ActionRequest,
    ActionResponse,
    EmergencyActivation,
    SessionUpdate,
    DomainReady,
}

impl MessageType {
    pub const ALL: [MessageType; 5] = [
        MessageType::ActionRequest,
        MessageType::ActionResponse,
        MessageType::EmergencyActivation,
        MessageType::SessionUpdate,
        MessageType::DomainReady,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::ActionRequest => "ACTION_REQUEST",
            MessageType::ActionResponse => "ACTION_RESPONSE",
            MessageType::EmergencyActivation => "EMERGENCY_ACTIVATION",
            MessageType::SessionUpdate => "SESSION_UPDATE",
            MessageType::DomainReady => "DOMAIN_READY",
        }
    }

    /// Look up a wire `type` value.
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome reported in an action response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Complete,
    Failed,
}

/// Type-specific body of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessagePayload {
    /// Ask the receiving domain to run `action`.
    #[serde(rename_all = "camelCase")]
    ActionRequest {
        /// Wire name of the requested action. Kept as a string so requests
        /// for actions this build does not know can still be reported.
        action: String,
        correlation_id: CorrelationId,
        /// Domain the response must be sent to.
        response_channel: DomainName,
        #[serde(default)]
        data: Value,
    },

    /// Result of an earlier `ActionRequest`.
    #[serde(rename_all = "camelCase")]
    ActionResponse {
        original_action: String,
        correlation_id: CorrelationId,
        status: ResponseStatus,
        #[serde(default)]
        result: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// An emergency flow was started somewhere.
    EmergencyActivation {
        #[serde(default)]
        data: Value,
    },

    /// Full or partial session to merge into the receiver's session.
    SessionUpdate { session: Value },

    /// An embedded frame finished initializing.
    DomainReady,
}

impl MessagePayload {
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            MessagePayload::ActionRequest { .. } => MessageType::ActionRequest,
            MessagePayload::ActionResponse { .. } => MessageType::ActionResponse,
            MessagePayload::EmergencyActivation { .. } => MessageType::EmergencyActivation,
            MessagePayload::SessionUpdate { .. } => MessageType::SessionUpdate,
            MessagePayload::DomainReady => MessageType::DomainReady,
        }
    }
}

/// The envelope every domain sends and receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayMessage {
    #[serde(flatten)]
    pub payload: MessagePayload,

    /// Domain that produced the message.
    pub source_domain: DomainName,

    /// Session of the sender. Absent only for messages sent before a
    /// session exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    pub timestamp: DateTime<Utc>,

    /// Unique per message, used for deduplication.
    pub message_id: Uuid,
}

impl RelayMessage {
    /// Build a new envelope stamped with the current time and a fresh id.
    pub fn new(
        payload: MessagePayload,
        source_domain: DomainName,
        session_id: Option<SessionId>,
    ) -> Self {
        Self {
            payload,
            source_domain,
            session_id,
            timestamp: Utc::now(),
            message_id: Uuid::new_v4(),
        }
    }

    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }
}
