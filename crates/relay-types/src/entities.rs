//! # Domain Entities
//!
//! Domains, actions and the session record shared across all domains.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::{ParseError, SessionError};

// =============================================================================
// DOMAINS
// =============================================================================

/// A logical partition of functionality, intended to map to its own origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainName {
    /// Primary hub and contract engine.
    Blockchain,
    /// Payment processing.
    Crypto,
    /// Contract verification and documentation.
    Nft,
    /// Wallet integration.
    Wallet,
    /// Bondsman network.
    X,
}

impl DomainName {
    /// Every domain, in registry order.
    pub const ALL: [DomainName; 5] = [
        DomainName::Blockchain,
        DomainName::Crypto,
        DomainName::Nft,
        DomainName::Wallet,
        DomainName::X,
    ];

    /// Wire name of the domain.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainName::Blockchain => "blockchain",
            DomainName::Crypto => "crypto",
            DomainName::Nft => "nft",
            DomainName::Wallet => "wallet",
            DomainName::X => "x",
        }
    }

    /// All domains except `self`.
    pub fn others(self) -> impl Iterator<Item = DomainName> {
        Self::ALL.into_iter().filter(move |d| *d != self)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ParseError::UnknownDomain(s.to_string()))
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// A named operation that exactly one domain fulfils.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    // blockchain
    EmergencyInitiation,
    ContractGeneration,
    JailScanning,
    // crypto
    PaymentProcessing,
    EscrowManagement,
    FeeCalculation,
    // nft
    ContractVerification,
    DocumentationStorage,
    AuditTrail,
    // wallet
    WalletConnection,
    ProxySignature,
    EmergencyAuthorization,
    // x
    BondsmanPortal,
    NotificationSystem,
    SubscriptionManagement,
}

impl Action {
    /// Every action.
    pub const ALL: [Action; 15] = [
        Action::EmergencyInitiation,
        Action::ContractGeneration,
        Action::JailScanning,
        Action::PaymentProcessing,
        Action::EscrowManagement,
        Action::FeeCalculation,
        Action::ContractVerification,
        Action::DocumentationStorage,
        Action::AuditTrail,
        Action::WalletConnection,
        Action::ProxySignature,
        Action::EmergencyAuthorization,
        Action::BondsmanPortal,
        Action::NotificationSystem,
        Action::SubscriptionManagement,
    ];

    /// Wire name of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::EmergencyInitiation => "emergencyInitiation",
            Action::ContractGeneration => "contractGeneration",
            Action::JailScanning => "jailScanning",
            Action::PaymentProcessing => "paymentProcessing",
            Action::EscrowManagement => "escrowManagement",
            Action::FeeCalculation => "feeCalculation",
            Action::ContractVerification => "contractVerification",
            Action::DocumentationStorage => "documentationStorage",
            Action::AuditTrail => "auditTrail",
            Action::WalletConnection => "walletConnection",
            Action::ProxySignature => "proxySignature",
            Action::EmergencyAuthorization => "emergencyAuthorization",
            Action::BondsmanPortal => "bondsmanPortal",
            Action::NotificationSystem => "notificationSystem",
            Action::SubscriptionManagement => "subscriptionManagement",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ParseError::UnknownAction(s.to_string()))
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Opaque session identifier (`sid_` followed by 26 base36 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    const PREFIX: &'static str = "sid_";
    const RANDOM_LEN: usize = 26;

    /// Generate a fresh random session id.
    #[must_use]
    pub fn generate() -> Self {
        const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut rng = rand::thread_rng();
        let suffix: String = (0..Self::RANDOM_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(format!("{}{}", Self::PREFIX, suffix))
    }

    /// Wrap an existing id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a session. The only transition is
/// `Initialized -> EmergencyActive`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Initialized,
    EmergencyActive,
}

/// Per-storage-scope session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub domain_access: BTreeMap<DomainName, bool>,
    pub emergency_activated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_data: Option<Value>,
    pub status: SessionStatus,
}

impl Session {
    /// Create a fresh session with no domain accessed yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_id: SessionId::generate(),
            timestamp: Utc::now(),
            domain_access: DomainName::ALL.into_iter().map(|d| (d, false)).collect(),
            emergency_activated: false,
            emergency_data: None,
            status: SessionStatus::Initialized,
        }
    }

    /// Mark a domain as accessed. Returns `true` if it was not accessed before.
    pub fn mark_accessed(&mut self, domain: DomainName) -> bool {
        let entry = self.domain_access.entry(domain).or_insert(false);
        let changed = !*entry;
        *entry = true;
        changed
    }

    #[must_use]
    pub fn has_accessed(&self, domain: DomainName) -> bool {
        self.domain_access.get(&domain).copied().unwrap_or(false)
    }

    /// Enter the terminal `EmergencyActive` state.
    pub fn activate_emergency(&mut self, data: Value) {
        self.emergency_activated = true;
        self.emergency_data = Some(data);
        self.status = SessionStatus::EmergencyActive;
    }

    #[must_use]
    pub fn is_emergency_active(&self) -> bool {
        self.status == SessionStatus::EmergencyActive
    }

    /// Merge an incoming update into this session.
    ///
    /// The update must name this session. Domain access flags only ever go
    /// from `false` to `true`, and the emergency state is never reverted.
    /// An update carrying either `emergencyActivated: true` or status
    /// `emergency_active` sets both.
    ///
    /// # Errors
    ///
    /// - `SessionError::Mismatch` - the update names another session
    /// - `SessionError::MissingId` - the update carries no session id
    pub fn apply_update(&mut self, update: SessionUpdate) -> Result<(), SessionError> {
        let Some(incoming) = update.session_id else {
            return Err(SessionError::MissingId);
        };
        if incoming != self.session_id {
            return Err(SessionError::Mismatch {
                expected: self.session_id.clone(),
                received: incoming,
            });
        }

        if let Some(timestamp) = update.timestamp {
            self.timestamp = timestamp;
        }
        if let Some(access) = update.domain_access {
            for (domain, accessed) in access {
                if accessed {
                    self.mark_accessed(domain);
                }
            }
        }
        if update.emergency_data.is_some() {
            self.emergency_data = update.emergency_data;
        }
        // Either field signals the emergency; both move together.
        if update.emergency_activated == Some(true)
            || update.status == Some(SessionStatus::EmergencyActive)
        {
            self.emergency_activated = true;
            self.status = SessionStatus::EmergencyActive;
        }
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial session carried by a `SESSION_UPDATE`. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub domain_access: Option<BTreeMap<DomainName, bool>>,
    #[serde(default)]
    pub emergency_activated: Option<bool>,
    #[serde(default)]
    pub emergency_data: Option<Value>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

impl From<&Session> for SessionUpdate {
    fn from(session: &Session) -> Self {
        Self {
            session_id: Some(session.session_id.clone()),
            timestamp: Some(session.timestamp),
            domain_access: Some(session.domain_access.clone()),
            emergency_activated: Some(session.emergency_activated),
            emergency_data: session.emergency_data.clone(),
            status: Some(session.status),
        }
    }
}
