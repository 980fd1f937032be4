//! Mock page environment, executor and notifier for unit tests.

use crate::environment::{Notifier, PageEnvironment, PageLocation, Severity};
use crate::storage::{KeyValueStore, MemoryStorage};
use crate::transport::StorageRecord;
use crate::window::{Inbox, WindowHandle};
use crate::DEFAULT_RELAY_KEY_PREFIX;
use async_trait::async_trait;
use parking_lot::Mutex;
use relay_types::{Action, ActionError, ActionExecutor, DomainName, DomainRegistry};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) struct MockPage {
    location: PageLocation,
    storage: Arc<MemoryStorage>,
    frames: Mutex<HashMap<DomainName, WindowHandle>>,
    parent: Mutex<Option<WindowHandle>>,
    windows: Mutex<HashMap<String, Inbox>>,
    opened: Mutex<Vec<(String, String)>>,
    popups_blocked: AtomicBool,
}

impl MockPage {
    pub(crate) fn new(url: &str) -> Arc<Self> {
        Self::with_storage(url, Arc::new(MemoryStorage::new()))
    }

    pub(crate) fn with_storage(url: &str, storage: Arc<MemoryStorage>) -> Arc<Self> {
        Arc::new(Self {
            location: PageLocation::parse(url).unwrap(),
            storage,
            frames: Mutex::new(HashMap::new()),
            parent: Mutex::new(None),
            windows: Mutex::new(HashMap::new()),
            opened: Mutex::new(Vec::new()),
            popups_blocked: AtomicBool::new(false),
        })
    }

    pub(crate) fn add_frame(&self, domain: DomainName) -> Inbox {
        let (handle, inbox) = WindowHandle::channel(domain, format!("frame_{domain}"));
        self.frames.lock().insert(domain, handle);
        inbox
    }

    pub(crate) fn remove_frame(&self, domain: DomainName) {
        self.frames.lock().remove(&domain);
    }

    pub(crate) fn embed_in_parent(&self, parent: DomainName) -> Inbox {
        let (handle, inbox) = WindowHandle::channel(parent, "parent");
        *self.parent.lock() = Some(handle);
        inbox
    }

    pub(crate) fn block_popups(&self) {
        self.popups_blocked.store(true, Ordering::SeqCst);
    }

    pub(crate) fn opened_windows(&self) -> Vec<(String, String)> {
        self.opened.lock().clone()
    }

    pub(crate) fn take_window_inbox(&self, name: &str) -> Option<Inbox> {
        self.windows.lock().remove(name)
    }

    pub(crate) fn storage_handle(&self) -> Arc<MemoryStorage> {
        self.storage.clone()
    }

    pub(crate) fn relay_records(&self) -> Vec<StorageRecord> {
        let keys = self
            .storage
            .keys_with_prefix(DEFAULT_RELAY_KEY_PREFIX)
            .unwrap();
        keys.iter()
            .filter_map(|k| self.storage.get(k).unwrap())
            .map(|raw| serde_json::from_str(&raw).unwrap())
            .collect()
    }
}

impl PageEnvironment for MockPage {
    fn location(&self) -> PageLocation {
        self.location.clone()
    }

    fn frame(&self, domain: DomainName) -> Option<WindowHandle> {
        self.frames.lock().get(&domain).cloned()
    }

    fn parent(&self) -> Option<WindowHandle> {
        self.parent.lock().clone()
    }

    fn open_window(&self, url: &str, name: &str) -> Option<WindowHandle> {
        if self.popups_blocked.load(Ordering::SeqCst) {
            return None;
        }
        let domain = DomainRegistry::global().domain_for_url(url)?;
        let (handle, inbox) = WindowHandle::channel(domain, name);
        self.windows.lock().insert(name.to_string(), inbox);
        self.opened.lock().push((url.to_string(), name.to_string()));
        Some(handle)
    }

    fn storage(&self) -> Arc<dyn KeyValueStore> {
        self.storage.clone()
    }
}

/// Executor answering every action with `{"action": <name>, "echo": <data>}`.
#[derive(Default)]
pub(crate) struct EchoExecutor {
    pub(crate) calls: AtomicUsize,
}

#[async_trait]
impl ActionExecutor for EchoExecutor {
    fn handles(&self, _action: Action) -> bool {
        true
    }

    async fn execute(&self, action: Action, data: &Value) -> Result<Value, ActionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if data.get("fail").is_some() {
            return Err(ActionError::InvalidInput {
                action,
                reason: "asked to fail".into(),
            });
        }
        Ok(json!({"action": action.as_str(), "echo": data}))
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) seen: Mutex<Vec<(String, Severity)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, _message: &str, severity: Severity) {
        self.seen.lock().push((title.to_string(), severity));
    }
}
