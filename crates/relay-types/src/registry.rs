//! # Domain Registry
//!
//! Static table of the five domains: where each one lives and which actions
//! it is permitted to fulfil. The table is defined at compile time and never
//! changes at runtime.

use crate::entities::{Action, DomainName};

/// Path on every domain that receives relayed messages in a fresh window.
pub const RECEIVE_MESSAGE_PATH: &str = "/receive-message.html";

/// Registry entry for one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainEntry {
    pub domain: DomainName,
    /// Origin URL of the domain.
    pub endpoint: &'static str,
    /// Actions this domain handles.
    pub actions: &'static [Action],
}

impl DomainEntry {
    /// Hostname part of the endpoint, lowercased.
    #[must_use]
    pub fn host(&self) -> String {
        self.endpoint
            .split_once("://")
            .map_or(self.endpoint, |(_, rest)| rest)
            .trim_end_matches('/')
            .to_ascii_lowercase()
    }

    /// URL of the receive-message endpoint of this domain.
    #[must_use]
    pub fn receive_url(&self) -> String {
        format!("{}{}", self.endpoint, RECEIVE_MESSAGE_PATH)
    }

    #[must_use]
    pub fn handles(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a.as_str() == action)
    }
}

/// The static domain registry.
#[derive(Debug)]
pub struct DomainRegistry {
    entries: [DomainEntry; 5],
}

static REGISTRY: DomainRegistry = DomainRegistry {
    entries: [
        DomainEntry {
            domain: DomainName::Blockchain,
            endpoint: "https://Nine1Eight.blockchain",
            actions: &[
                Action::EmergencyInitiation,
                Action::ContractGeneration,
                Action::JailScanning,
            ],
        },
        DomainEntry {
            domain: DomainName::Crypto,
            endpoint: "https://Nine1Eight.crypto",
            actions: &[
                Action::PaymentProcessing,
                Action::EscrowManagement,
                Action::FeeCalculation,
            ],
        },
        DomainEntry {
            domain: DomainName::Nft,
            endpoint: "https://Nine1Eight.nft",
            actions: &[
                Action::ContractVerification,
                Action::DocumentationStorage,
                Action::AuditTrail,
            ],
        },
        DomainEntry {
            domain: DomainName::Wallet,
            endpoint: "https://Nine1Eight.wallet",
            actions: &[
                Action::WalletConnection,
                Action::ProxySignature,
                Action::EmergencyAuthorization,
            ],
        },
        DomainEntry {
            domain: DomainName::X,
            endpoint: "https://Nine1Eight.x",
            actions: &[
                Action::BondsmanPortal,
                Action::NotificationSystem,
                Action::SubscriptionManagement,
            ],
        },
    ],
};

impl DomainRegistry {
    /// The registry shared by every relay.
    #[must_use]
    pub fn global() -> &'static DomainRegistry {
        &REGISTRY
    }

    #[must_use]
    pub fn entries(&self) -> &[DomainEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, domain: DomainName) -> &DomainEntry {
        // Entries are stored in `DomainName::ALL` order.
        &self.entries[domain as usize]
    }

    #[must_use]
    pub fn endpoint(&self, domain: DomainName) -> &'static str {
        self.entry(domain).endpoint
    }

    /// Does `domain` permit the action named `action`?
    #[must_use]
    pub fn permits(&self, domain: DomainName, action: &str) -> bool {
        self.entry(domain).handles(action)
    }

    /// The domain that fulfils `action`.
    #[must_use]
    pub fn owner_of(&self, action: Action) -> DomainName {
        self.entries
            .iter()
            .find(|e| e.actions.contains(&action))
            .map_or(DomainName::Blockchain, |e| e.domain)
    }

    /// Find the domain whose endpoint is `origin` (case-insensitive).
    #[must_use]
    pub fn domain_for_origin(&self, origin: &str) -> Option<DomainName> {
        let origin = origin.trim_end_matches('/');
        self.entries
            .iter()
            .find(|e| e.endpoint.eq_ignore_ascii_case(origin))
            .map(|e| e.domain)
    }

    /// Find the domain whose host appears in `url` (case-insensitive).
    #[must_use]
    pub fn domain_for_url(&self, url: &str) -> Option<DomainName> {
        let url = url.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|e| url.contains(&e.host()))
            .map(|e| e.domain)
    }
}
