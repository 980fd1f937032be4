//! Wallet domain: wallet connection, proxy signatures and emergency spend
//! authorization.

use super::{decode, encode, ActionHandler};
use crate::domain::{hex_token, iso_after, or_default, prefixed_id, str_or};
use async_trait::async_trait;
use chrono::Duration;
use relay_types::{Action, ActionError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// How long proxy signatures and emergency authorizations stay valid.
pub const AUTHORIZATION_VALIDITY_HOURS: i64 = 24;

const DEFAULT_MAX_AMOUNT: &str = "5000";

pub fn handlers() -> Vec<Arc<dyn ActionHandler>> {
    vec![
        Arc::new(WalletConnection),
        Arc::new(ProxySignature),
        Arc::new(EmergencyAuthorization),
    ]
}

fn validity() -> Duration {
    Duration::hours(AUTHORIZATION_VALIDITY_HOURS)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ConnectRequest {
    chain_id: Option<u64>,
    provider: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Connection {
    connected: bool,
    address: String,
    chain_id: u64,
    provider: String,
}

pub struct WalletConnection;

#[async_trait]
impl ActionHandler for WalletConnection {
    fn action(&self) -> Action {
        Action::WalletConnection
    }

    async fn handle(&self, data: &Value) -> Result<Value, ActionError> {
        let request: ConnectRequest = decode(self.action(), data)?;
        let connection = Connection {
            connected: true,
            address: hex_token(20),
            chain_id: request.chain_id.filter(|id| *id != 0).unwrap_or(1),
            provider: str_or(request.provider, "metamask"),
        };
        info!(
            address = %connection.address,
            chain_id = connection.chain_id,
            "Wallet connected"
        );
        encode(self.action(), &connection)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SignatureRequest {
    message: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Signature {
    signature_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<Value>,
    signature: String,
    valid: bool,
    expires_at: String,
}

/// Signs on behalf of a user who has no device at hand.
pub struct ProxySignature;

#[async_trait]
impl ActionHandler for ProxySignature {
    fn action(&self) -> Action {
        Action::ProxySignature
    }

    async fn handle(&self, data: &Value) -> Result<Value, ActionError> {
        let request: SignatureRequest = decode(self.action(), data)?;
        encode(
            self.action(),
            &Signature {
                signature_id: prefixed_id("sig"),
                message: request.message,
                signature: hex_token(65),
                valid: true,
                expires_at: iso_after(validity()),
            },
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AuthorizationRequest {
    max_amount: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpendLimits {
    transactions: u32,
    total_spend: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Authorization {
    authorized: bool,
    auth_id: String,
    max_amount: Value,
    expires_at: String,
    limits: SpendLimits,
}

/// Authorizes a single emergency transaction up to `maxAmount`.
pub struct EmergencyAuthorization;

#[async_trait]
impl ActionHandler for EmergencyAuthorization {
    fn action(&self) -> Action {
        Action::EmergencyAuthorization
    }

    async fn handle(&self, data: &Value) -> Result<Value, ActionError> {
        let request: AuthorizationRequest = decode(self.action(), data)?;
        let max_amount = or_default(request.max_amount, json!(DEFAULT_MAX_AMOUNT));

        let authorization = Authorization {
            authorized: true,
            auth_id: prefixed_id("auth"),
            max_amount: max_amount.clone(),
            expires_at: iso_after(validity()),
            limits: SpendLimits {
                transactions: 1,
                total_spend: max_amount,
            },
        };
        warn!(
            auth_id = %authorization.auth_id,
            max_amount = %authorization.max_amount,
            "Emergency spend authorized"
        );
        encode(self.action(), &authorization)
    }
}
