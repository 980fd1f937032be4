//! NFT domain: contract verification, document storage and the audit trail.

use super::{decode, encode, ActionHandler};
use crate::domain::{ipfs_hash, iso_now, prefixed_id, random_in};
use async_trait::async_trait;
use relay_types::{Action, ActionError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub fn handlers() -> Vec<Arc<dyn ActionHandler>> {
    vec![
        Arc::new(ContractVerification),
        Arc::new(DocumentationStorage),
        Arc::new(AuditTrail),
    ]
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VerificationRequest {
    contract_id: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Verification {
    verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    contract_id: Option<Value>,
    verification_id: String,
    timestamp: String,
}

pub struct ContractVerification;

#[async_trait]
impl ActionHandler for ContractVerification {
    fn action(&self) -> Action {
        Action::ContractVerification
    }

    async fn handle(&self, data: &Value) -> Result<Value, ActionError> {
        let request: VerificationRequest = decode(self.action(), data)?;
        encode(
            self.action(),
            &Verification {
                verified: true,
                contract_id: request.contract_id,
                verification_id: prefixed_id("ver"),
                timestamp: iso_now(),
            },
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredDocument {
    document_id: String,
    ipfs_hash: String,
    token_id: u32,
    status: &'static str,
}

/// Mints a document token and pins it to content storage.
pub struct DocumentationStorage;

#[async_trait]
impl ActionHandler for DocumentationStorage {
    fn action(&self) -> Action {
        Action::DocumentationStorage
    }

    async fn handle(&self, _data: &Value) -> Result<Value, ActionError> {
        let document = StoredDocument {
            document_id: prefixed_id("doc"),
            ipfs_hash: ipfs_hash(),
            token_id: random_in(1000, 9999),
            status: "stored",
        };
        info!(
            document_id = %document.document_id,
            token_id = document.token_id,
            "Document stored"
        );
        encode(self.action(), &document)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuditRequest {
    action: Option<Value>,
    actor: Option<Value>,
    details: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditEntry {
    audit_id: String,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actor: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    recorded: bool,
}

pub struct AuditTrail;

#[async_trait]
impl ActionHandler for AuditTrail {
    fn action(&self) -> Action {
        Action::AuditTrail
    }

    async fn handle(&self, data: &Value) -> Result<Value, ActionError> {
        let request: AuditRequest = decode(self.action(), data)?;
        encode(
            self.action(),
            &AuditEntry {
                audit_id: prefixed_id("aud"),
                timestamp: iso_now(),
                action: request.action,
                actor: request.actor,
                details: request.details,
                recorded: true,
            },
        )
    }
}
