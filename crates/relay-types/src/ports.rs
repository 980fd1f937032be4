//! # Ports
//!
//! Traits implemented outside the relay and consumed by it.

use async_trait::async_trait;
use serde_json::Value;

use crate::entities::Action;
use crate::errors::ActionError;

/// Runs the actions a domain fulfils.
///
/// The relay only calls `execute` for actions the domain registry lists for
/// the receiving domain.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Whether a handler is registered for `action`.
    fn handles(&self, action: Action) -> bool;

    /// Run `action` against the request payload.
    ///
    /// # Errors
    ///
    /// - `ActionError::NotHandled` - no handler is registered
    /// - `ActionError::InvalidInput` - the payload is not acceptable
    async fn execute(&self, action: Action, data: &Value) -> Result<Value, ActionError>;
}
