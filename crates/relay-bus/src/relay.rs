//! # Domain Relay
//!
//! One relay runs per page. It owns the page's session, consumes the page's
//! inbound message inbox and routes outbound messages to the other domains.
//!
//! ## Inbound pipeline
//!
//! ```text
//! PostedMessage -> origin check -> type check -> decode -> session check
//!               -> dedup by messageId -> dispatch by type
//! ```
//!
//! Every rejected message is dropped and logged. Nothing is answered except
//! permitted action requests.
//!
//! ## Requests
//!
//! `request_action` registers a fresh correlation id, sends an
//! `ACTION_REQUEST` and waits for the matching `ACTION_RESPONSE` or the
//! request timeout, whichever comes first.

use crate::config::{ConfigError, RelayConfig};
use crate::dedup::SeenMessages;
use crate::environment::{detect_current_domain, Notifier, PageEnvironment, Severity, TracingNotifier};
use crate::events::{EventFilter, RelayEvent};
use crate::pending::{PendingGuard, PendingRequestStore};
use crate::publisher::{EventPublisher, LocalEventBus};
use crate::storage::SessionStore;
use crate::subscriber::{EventStream, Subscription};
use crate::transport::{StorageRecord, TransportKind, TransportTable};
use crate::window::{Inbox, PostedMessage};
use parking_lot::{Mutex, RwLock};
use relay_types::{
    Action, ActionExecutor, CorrelationId, DomainName, DomainRegistry, MessagePayload,
    MessageType, RelayError, RelayMessage, ResponseStatus, Session, SessionError, SessionId,
    SessionUpdate, TransportError,
};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Builder for a `DomainRelay`.
pub struct DomainRelayBuilder {
    env: Arc<dyn PageEnvironment>,
    inbox: Inbox,
    executor: Arc<dyn ActionExecutor>,
    config: RelayConfig,
    notifier: Arc<dyn Notifier>,
}

impl DomainRelayBuilder {
    #[must_use]
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Detect the current domain and open the session.
    ///
    /// An unreadable storage scope does not fail the build; the relay then
    /// starts from a fresh session.
    pub fn build(self) -> Result<Arc<DomainRelay>, ConfigError> {
        let config = self.config;
        config.validate()?;

        let registry = DomainRegistry::global();
        let location = self.env.location();
        let current = detect_current_domain(registry, &location, |host| config.is_dev_host(host));

        let store = SessionStore::new(self.env.storage(), config.session_key.clone());
        let session = match store.open() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to open session store, starting a fresh session");
                Session::new()
            }
        };

        info!(
            domain = %current,
            location = %location,
            session_id = %session.session_id,
            "Domain relay created"
        );

        let transports = TransportTable::new(
            self.env.clone(),
            registry,
            config.relay_key_prefix.clone(),
        );

        Ok(Arc::new(DomainRelay {
            origin: self.env.origin(),
            registry,
            current,
            env: self.env,
            store,
            session: RwLock::new(session),
            pending: PendingRequestStore::new(),
            transports,
            executor: self.executor,
            notifier: self.notifier,
            events: LocalEventBus::with_capacity(config.event_capacity),
            seen: Mutex::new(SeenMessages::new(config.dedup_window())),
            ready_frames: RwLock::new(BTreeSet::new()),
            initialized: AtomicBool::new(false),
            inbox: Mutex::new(Some(self.inbox)),
            listener: Mutex::new(None),
            config,
        }))
    }
}

/// Cross-domain message relay of one page.
pub struct DomainRelay {
    config: RelayConfig,
    registry: &'static DomainRegistry,
    current: DomainName,
    origin: String,
    env: Arc<dyn PageEnvironment>,
    store: SessionStore,
    session: RwLock<Session>,
    pending: PendingRequestStore,
    transports: TransportTable,
    executor: Arc<dyn ActionExecutor>,
    notifier: Arc<dyn Notifier>,
    events: LocalEventBus,
    seen: Mutex<SeenMessages>,
    /// Embedded frames that announced `DOMAIN_READY`.
    ready_frames: RwLock<BTreeSet<DomainName>>,
    initialized: AtomicBool,
    inbox: Mutex<Option<Inbox>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl DomainRelay {
    /// Start building a relay for the page behind `env`, consuming `inbox`.
    pub fn builder(
        env: Arc<dyn PageEnvironment>,
        inbox: Inbox,
        executor: Arc<dyn ActionExecutor>,
    ) -> DomainRelayBuilder {
        DomainRelayBuilder {
            env,
            inbox,
            executor,
            config: RelayConfig::default(),
            notifier: Arc::new(TracingNotifier),
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Mark the current domain accessed, drain relayed records addressed to
    /// it, start the inbound listener and announce readiness to the parent
    /// frame. Calling it again has no effect.
    pub async fn initialize(self: &Arc<Self>) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!(domain = %self.current, "Relay already initialized");
            return;
        }

        let snapshot = {
            let mut session = self.session.write();
            session.mark_accessed(self.current);
            session.clone()
        };
        self.persist(&snapshot);

        self.drain_storage_relay().await;

        let inbox = self.inbox.lock().take();
        if let Some(inbox) = inbox {
            let listener = tokio::spawn(Self::run(Arc::downgrade(self), inbox, self.current));
            *self.listener.lock() = Some(listener);
        }

        if let Some(parent) = self.env.parent() {
            let ready = self.envelope(MessagePayload::DomainReady);
            let posted = serde_json::to_value(&ready)
                .map_err(|e| TransportError::Encode(e.to_string()))
                .and_then(|data| parent.post_message(&self.origin, data));
            if let Err(e) = posted {
                warn!(domain = %self.current, error = %e, "Failed to announce readiness to parent");
            }
        }

        info!(domain = %self.current, "Domain relay initialized");
    }

    /// Stop the inbound listener and close the session store.
    pub async fn close(&self) {
        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            listener.abort();
            // Cancellation is the expected outcome.
            let _ = listener.await;
        }
        self.inbox.lock().take();
        self.store.close();
        info!(domain = %self.current, "Domain relay closed");
    }

    #[instrument(name = "relay_listener", skip_all, fields(domain = %domain))]
    async fn run(relay: Weak<Self>, mut inbox: Inbox, domain: DomainName) {
        debug!("Listening for inbound messages");
        while let Some(posted) = inbox.recv().await {
            let Some(relay) = relay.upgrade() else {
                break;
            };
            if let Err(e) = relay.handle_posted(posted).await {
                warn!(error = %e, "Dropped inbound message");
            }
        }
        debug!("Inbound listener stopped");
    }

    /// Feed storage-relay records addressed to this domain through inbound
    /// handling. Returns the number of records consumed.
    pub async fn drain_storage_relay(&self) -> usize {
        let storage = self.env.storage();
        let keys = match storage.keys_with_prefix(&self.config.relay_key_prefix) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to scan storage relay records");
                return 0;
            }
        };

        let mut drained = 0;
        for key in keys {
            let raw = match storage.get(&key) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to read relay record");
                    continue;
                }
            };

            let record: StorageRecord = match serde_json::from_str(&raw) {
                Ok(record) => record,
                Err(e) => {
                    warn!(key = %key, error = %e, "Removing unreadable relay record");
                    if let Err(e) = storage.remove(&key) {
                        warn!(key = %key, error = %e, "Failed to remove relay record");
                    }
                    continue;
                }
            };
            if record.target_domain != self.current {
                continue;
            }

            if let Err(e) = storage.remove(&key) {
                warn!(key = %key, error = %e, "Failed to remove relay record");
            }
            drained += 1;

            if let Err(e) = self.handle_value(record.message).await {
                warn!(key = %key, error = %e, "Dropped relayed message");
            }
        }

        if drained > 0 {
            info!(domain = %self.current, count = drained, "Drained storage relay");
        }
        drained
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    /// Handle a message posted to this page.
    ///
    /// # Errors
    ///
    /// Returns why the message was dropped. Nothing is sent back for a
    /// dropped message.
    pub async fn handle_posted(&self, posted: PostedMessage) -> Result<(), RelayError> {
        if !self.config.is_origin_allowed(self.registry, &posted.origin) {
            return Err(RelayError::OriginRejected(posted.origin));
        }
        self.handle_value(posted.data).await
    }

    /// Handle a raw message whose origin is already trusted.
    pub async fn handle_value(&self, data: Value) -> Result<(), RelayError> {
        let message = decode(data)?;

        if let Some(received) = &message.session_id {
            let expected = self.session.read().session_id.clone();
            if *received != expected {
                return Err(RelayError::SessionMismatch {
                    expected,
                    received: received.clone(),
                });
            }
        }

        let first = self.seen.lock().first_sighting(message.message_id);
        if !first {
            debug!(message_id = %message.message_id, "Duplicate message ignored");
            return Ok(());
        }

        debug!(
            domain = %self.current,
            message_type = %message.message_type(),
            source = %message.source_domain,
            "Received message"
        );
        self.dispatch(message).await
    }

    async fn dispatch(&self, message: RelayMessage) -> Result<(), RelayError> {
        let source = message.source_domain;
        match message.payload {
            MessagePayload::ActionRequest {
                action,
                correlation_id,
                response_channel,
                data,
            } => {
                self.handle_action_request(action, correlation_id, response_channel, data)
                    .await
            }
            MessagePayload::ActionResponse {
                original_action,
                correlation_id,
                status,
                result,
                error,
            } => {
                self.handle_action_response(original_action, correlation_id, status, result, error)
                    .await;
                Ok(())
            }
            MessagePayload::EmergencyActivation { data } => {
                self.activate_emergency(data).await;
                Ok(())
            }
            MessagePayload::SessionUpdate { session } => self.handle_session_update(session).await,
            MessagePayload::DomainReady => {
                self.ready_frames.write().insert(source);
                debug!(frame = %source, "Frame ready");
                self.events
                    .publish(RelayEvent::DomainReady { domain: source })
                    .await;
                Ok(())
            }
        }
    }

    async fn handle_action_request(
        &self,
        action: String,
        correlation_id: CorrelationId,
        response_channel: DomainName,
        data: Value,
    ) -> Result<(), RelayError> {
        let unsupported = || RelayError::UnsupportedAction {
            domain: self.current,
            action: action.clone(),
        };
        if !self.registry.permits(self.current, &action) {
            return Err(unsupported());
        }
        let parsed: Action = action.parse().map_err(|_| unsupported())?;

        let (status, result, error) = match self.executor.execute(parsed, &data).await {
            Ok(result) => (ResponseStatus::Complete, result, None),
            Err(e) => {
                warn!(action = %parsed, error = %e, "Action handler failed");
                (ResponseStatus::Failed, Value::Null, Some(e.to_string()))
            }
        };

        let response = MessagePayload::ActionResponse {
            original_action: action,
            correlation_id,
            status,
            result,
            error,
        };
        if let Err(e) = self.send(response_channel, response).await {
            warn!(
                correlation_id = %correlation_id,
                response_channel = %response_channel,
                error = %e,
                "Failed to send action response"
            );
        }
        Ok(())
    }

    async fn handle_action_response(
        &self,
        action: String,
        correlation_id: CorrelationId,
        status: ResponseStatus,
        result: Value,
        error: Option<String>,
    ) {
        if let Err(reason) =
            self.pending
                .complete(correlation_id, &action, status, result.clone(), error)
        {
            debug!(
                correlation_id = %correlation_id,
                reason = ?reason,
                "Response did not resolve a pending request"
            );
        }

        self.events
            .publish(RelayEvent::ActionComplete {
                action,
                correlation_id,
                status,
                result,
            })
            .await;
    }

    async fn handle_session_update(&self, session: Value) -> Result<(), RelayError> {
        let update: SessionUpdate = serde_json::from_value(session)
            .map_err(|e| RelayError::Malformed(format!("session update: {e}")))?;

        let snapshot = {
            let mut session = self.session.write();
            session.apply_update(update).map_err(|e| match e {
                SessionError::Mismatch { expected, received } => {
                    RelayError::SessionMismatch { expected, received }
                }
                SessionError::MissingId => {
                    RelayError::Malformed("session update carries no session id".into())
                }
            })?;
            session.clone()
        };

        self.persist(&snapshot);
        self.events.publish(RelayEvent::SessionUpdated(snapshot)).await;
        Ok(())
    }

    /// Put the session into the emergency state, persist it, notify the UI
    /// and broadcast the updated session to every other domain.
    pub async fn activate_emergency(&self, data: Value) {
        let snapshot = {
            let mut session = self.session.write();
            session.activate_emergency(data.clone());
            session.clone()
        };
        self.persist(&snapshot);

        self.notifier.notify(
            "Emergency Activated",
            "Emergency bail flow is active across all domains",
            Severity::Critical,
        );
        self.events
            .publish(RelayEvent::EmergencyActivated { data })
            .await;

        match serde_json::to_value(&snapshot) {
            Ok(session) => {
                let delivered = self
                    .broadcast(MessagePayload::SessionUpdate { session })
                    .await;
                info!(
                    session_id = %snapshot.session_id,
                    delivered = delivered,
                    "Emergency session broadcast"
                );
            }
            Err(e) => error!(error = %e, "Failed to encode session for broadcast"),
        }
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    /// Hand a message off to `target`. Fire-and-forget: success means the
    /// message left this page, not that it was handled.
    ///
    /// # Errors
    ///
    /// - `RelayError::SelfTarget` - `target` is the current domain
    /// - `RelayError::TransportUnavailable` - no frame and no window
    /// - `RelayError::Transport` - the transport failed to post
    pub async fn send(
        &self,
        target: DomainName,
        payload: MessagePayload,
    ) -> Result<TransportKind, RelayError> {
        if target == self.current {
            warn!(target_domain = %target, "Refusing to send to the current domain");
            return Err(RelayError::SelfTarget(target));
        }

        let message = self.envelope(payload);
        let transport = self.transports.resolve(target);
        let kind = transport.kind();

        match transport.deliver(&message).await {
            Ok(()) => {
                debug!(
                    target_domain = %target,
                    message_type = %message.message_type(),
                    message_id = %message.message_id,
                    transport = %kind,
                    "Message handed off"
                );
                Ok(kind)
            }
            Err(TransportError::Unavailable(domain)) => {
                error!(target_domain = %domain, "No transport could reach domain");
                Err(RelayError::TransportUnavailable(domain))
            }
            Err(e) => {
                if kind == TransportKind::Frame {
                    self.transports.invalidate(target);
                }
                error!(target_domain = %target, transport = %kind, error = %e, "Delivery failed");
                Err(e.into())
            }
        }
    }

    /// Send `payload` once to every domain except the current one. Returns
    /// how many hand-offs succeeded.
    pub async fn broadcast(&self, payload: MessagePayload) -> usize {
        let message_type = payload.message_type();
        let mut delivered = 0;
        for target in self.current.others() {
            match self.send(target, payload.clone()).await {
                Ok(_) => delivered += 1,
                Err(e) => {
                    warn!(target_domain = %target, message_type = %message_type, error = %e, "Broadcast hand-off failed");
                }
            }
        }
        delivered
    }

    /// Ask `target` to run `action` and wait for its result.
    ///
    /// # Errors
    ///
    /// - `RelayError::Timeout` - no response within the request timeout
    /// - `RelayError::ActionFailed` - the handler reported a failure
    /// - `RelayError::SelfTarget` - `target` is the current domain
    pub async fn request_action(
        &self,
        target: DomainName,
        action: Action,
        data: Value,
    ) -> Result<Value, RelayError> {
        if target == self.current {
            return Err(RelayError::SelfTarget(target));
        }

        let (correlation_id, rx) = self.pending.register(target, action);
        let _guard = PendingGuard::new(&self.pending, correlation_id);

        let request = MessagePayload::ActionRequest {
            action: action.as_str().to_string(),
            correlation_id,
            response_channel: self.current,
            data,
        };
        if let Err(e) = self.send(target, request).await {
            warn!(
                correlation_id = %correlation_id,
                error = %e,
                "Request hand-off failed, waiting for timeout"
            );
        }

        match tokio::time::timeout(self.config.request_timeout(), rx).await {
            Ok(Ok(reply)) => {
                debug!(
                    correlation_id = %correlation_id,
                    response_time_ms = reply.response_time.as_millis(),
                    "Action response received"
                );
                match reply.status {
                    ResponseStatus::Complete => Ok(reply.result),
                    ResponseStatus::Failed => Err(RelayError::ActionFailed {
                        target,
                        action,
                        reason: reply.error.unwrap_or_else(|| "unspecified failure".into()),
                    }),
                }
            }
            Ok(Err(_)) => Err(RelayError::Abandoned(correlation_id)),
            Err(_) => {
                self.pending.expire(&correlation_id);
                Err(RelayError::Timeout {
                    target,
                    action,
                    timeout_ms: self.config.request_timeout_ms,
                })
            }
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn current_domain(&self) -> DomainName {
        self.current
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Snapshot of the session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session.read().session_id.clone()
    }

    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.events.subscribe(filter)
    }

    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        self.events.event_stream(filter)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn ready_frames(&self) -> Vec<DomainName> {
        self.ready_frames.read().iter().copied().collect()
    }

    /// Transport currently cached for `target`.
    #[must_use]
    pub fn transport_kind(&self, target: DomainName) -> Option<TransportKind> {
        self.transports.cached_kind(target)
    }

    fn envelope(&self, payload: MessagePayload) -> RelayMessage {
        RelayMessage::new(payload, self.current, Some(self.session_id()))
    }

    fn persist(&self, session: &Session) {
        if let Err(e) = self.store.save(session) {
            warn!(session_id = %session.session_id, error = %e, "Failed to persist session");
        }
    }
}

/// Decode a raw message, rejecting anything without a recognized `type`.
fn decode(data: Value) -> Result<RelayMessage, RelayError> {
    let Some(type_name) = data.get("type").and_then(Value::as_str) else {
        return Err(RelayError::Malformed("missing type".into()));
    };
    if MessageType::from_wire(type_name).is_none() {
        return Err(RelayError::Malformed(format!("unrecognized type {type_name}")));
    }
    serde_json::from_value(data).map_err(|e| RelayError::Malformed(e.to_string()))
}
