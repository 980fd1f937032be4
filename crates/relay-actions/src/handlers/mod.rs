//! # Action Handlers
//!
//! One handler per registry action, grouped by the domain that fulfils it.
//! Handlers take the request payload and return the result payload; they
//! never touch the relay.

pub mod blockchain;
pub mod crypto;
pub mod nft;
pub mod wallet;
pub mod x;

use async_trait::async_trait;
use relay_types::{Action, ActionError, DomainName};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Handler for a single action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// The action this handler fulfils.
    fn action(&self) -> Action;

    /// Run the action against the request payload.
    async fn handle(&self, data: &Value) -> Result<Value, ActionError>;
}

/// Handlers of every action `domain` fulfils.
#[must_use]
pub fn handlers_for(domain: DomainName) -> Vec<Arc<dyn ActionHandler>> {
    match domain {
        DomainName::Blockchain => blockchain::handlers(),
        DomainName::Crypto => crypto::handlers(),
        DomainName::Nft => nft::handlers(),
        DomainName::Wallet => wallet::handlers(),
        DomainName::X => x::handlers(),
    }
}

/// Decode a request payload. A `null` payload reads as the empty request.
pub(crate) fn decode<T>(action: Action, data: &Value) -> Result<T, ActionError>
where
    T: DeserializeOwned + Default,
{
    if data.is_null() {
        return Ok(T::default());
    }
    T::deserialize(data).map_err(|e| ActionError::InvalidInput {
        action,
        reason: e.to_string(),
    })
}

/// Encode a result payload.
pub(crate) fn encode<T: Serialize>(action: Action, result: &T) -> Result<Value, ActionError> {
    serde_json::to_value(result).map_err(|e| ActionError::Encode {
        action,
        reason: e.to_string(),
    })
}
