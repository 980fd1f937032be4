//! Routes relay action requests to the registered handlers.

use crate::handlers::{handlers_for, ActionHandler};
use async_trait::async_trait;
use relay_types::{Action, ActionError, ActionExecutor, DomainName};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Action executor backed by a table of handlers.
#[derive(Default, Clone)]
pub struct ActionDispatcher {
    handlers: HashMap<Action, Arc<dyn ActionHandler>>,
}

impl ActionDispatcher {
    /// Dispatcher with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher for the actions `domain` fulfils.
    #[must_use]
    pub fn for_domain(domain: DomainName) -> Self {
        let mut dispatcher = Self::new();
        for handler in handlers_for(domain) {
            dispatcher.register(handler);
        }
        dispatcher
    }

    /// Dispatcher for every action of every domain.
    #[must_use]
    pub fn all() -> Self {
        let mut dispatcher = Self::new();
        for domain in DomainName::ALL {
            for handler in handlers_for(domain) {
                dispatcher.register(handler);
            }
        }
        dispatcher
    }

    /// Register `handler`, replacing any handler for the same action.
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) {
        let action = handler.action();
        if self.handlers.insert(action, handler).is_some() {
            warn!(%action, "Replaced action handler");
        }
    }

    /// Registered actions, in no particular order.
    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.handlers.keys().copied()
    }
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("actions", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl ActionExecutor for ActionDispatcher {
    fn handles(&self, action: Action) -> bool {
        self.handlers.contains_key(&action)
    }

    async fn execute(&self, action: Action, data: &Value) -> Result<Value, ActionError> {
        let handler = self
            .handlers
            .get(&action)
            .ok_or(ActionError::NotHandled(action))?;

        let started = Instant::now();
        let result = handler.handle(data).await;
        debug!(
            %action,
            ok = result.is_ok(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Action executed"
        );
        result
    }
}
