//! # Simulated Browser
//!
//! Hosts domain pages in one process. Pages share one durable storage scope,
//! find each other by window name and may embed frames of other domains.
//! Every page runs its own `DomainRelay` with the action handlers of the
//! domain it belongs to.
//!
//! ## Window Naming
//!
//! A top-level page of domain `d` is registered under `domain_<d>`, the name
//! the storage relay opens for `d`. Opening a name that is already live
//! returns the existing window instead of creating a second one.

use parking_lot::Mutex;
use relay_actions::ActionDispatcher;
use relay_bus::{
    detect_current_domain, ConfigError, DomainRelay, Inbox, KeyValueStore, LocationError,
    Notifier, PageEnvironment, PageLocation, RelayConfig, TracingNotifier, WindowHandle,
};
use relay_types::{DomainName, DomainRegistry};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name under which the top-level page of `domain` is registered.
#[must_use]
pub fn window_name(domain: DomainName) -> String {
    format!("domain_{domain}")
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Invalid page location: {0}")]
    Location(#[from] LocationError),

    #[error("Invalid relay configuration: {0}")]
    Config(#[from] ConfigError),
}

/// One browsing context as its relay sees it.
struct PageContext {
    location: PageLocation,
    browser: Weak<SimulatedBrowser>,
    storage: Arc<dyn KeyValueStore>,
    frames: HashMap<DomainName, WindowHandle>,
    parent: Option<WindowHandle>,
}

impl PageEnvironment for PageContext {
    fn location(&self) -> PageLocation {
        self.location.clone()
    }

    fn frame(&self, domain: DomainName) -> Option<WindowHandle> {
        // An embedded page reaches its embedder like a frame.
        self.frames.get(&domain).cloned().or_else(|| {
            self.parent
                .as_ref()
                .filter(|parent| parent.domain() == domain)
                .cloned()
        })
    }

    fn parent(&self) -> Option<WindowHandle> {
        self.parent.clone()
    }

    fn open_window(&self, url: &str, name: &str) -> Option<WindowHandle> {
        self.browser.upgrade()?.open_window(url, name)
    }

    fn storage(&self) -> Arc<dyn KeyValueStore> {
        self.storage.clone()
    }
}

/// A top-level window and the frames it embeds.
#[derive(Clone)]
struct Window {
    handle: WindowHandle,
    relay: Arc<DomainRelay>,
    frames: Vec<Arc<DomainRelay>>,
}

/// In-process browser hosting domain pages.
pub struct SimulatedBrowser {
    storage: Arc<dyn KeyValueStore>,
    config: RelayConfig,
    notifier: Arc<dyn Notifier>,
    windows: Mutex<HashMap<String, Window>>,
    popups_blocked: AtomicBool,
}

impl SimulatedBrowser {
    pub fn new(storage: Arc<dyn KeyValueStore>, config: RelayConfig) -> Arc<Self> {
        Self::with_notifier(storage, config, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(
        storage: Arc<dyn KeyValueStore>,
        config: RelayConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            storage,
            config,
            notifier,
            windows: Mutex::new(HashMap::new()),
            popups_blocked: AtomicBool::new(false),
        })
    }

    /// Open a top-level page at `url` and initialize its relay.
    ///
    /// If the window for that domain is already open its relay is returned.
    pub async fn open_page(self: &Arc<Self>, url: &str) -> Result<Arc<DomainRelay>, BrowserError> {
        self.open_page_with_frames(url, &[]).await
    }

    /// Open a top-level page at `url` embedding a frame for each domain in
    /// `frames`. Frames are initialized after the page itself.
    pub async fn open_page_with_frames(
        self: &Arc<Self>,
        url: &str,
        frames: &[DomainName],
    ) -> Result<Arc<DomainRelay>, BrowserError> {
        let location = PageLocation::parse(url)?;
        let domain = self.domain_of(&location);
        let name = window_name(domain);

        if let Some(existing) = self.live_window(&name) {
            debug!(window = %name, "Page already open");
            return Ok(existing.relay);
        }

        let (handle, inbox) = WindowHandle::channel(domain, name.clone());

        let mut frame_handles = HashMap::new();
        let mut frame_relays = Vec::new();
        for &frame_domain in frames {
            if frame_domain == domain || frame_handles.contains_key(&frame_domain) {
                continue;
            }
            let entry = DomainRegistry::global().entry(frame_domain);
            let frame_location = PageLocation::parse(&entry.receive_url())?;
            let (frame_handle, frame_inbox) =
                WindowHandle::channel(frame_domain, format!("frame_{frame_domain}"));
            let relay = self.build_relay(
                frame_location,
                frame_inbox,
                HashMap::new(),
                Some(handle.clone()),
            )?;
            frame_handles.insert(frame_domain, frame_handle);
            frame_relays.push(relay);
        }

        let relay = self.build_relay(location, inbox, frame_handles, None)?;
        self.windows.lock().insert(
            name.clone(),
            Window {
                handle,
                relay: relay.clone(),
                frames: frame_relays.clone(),
            },
        );

        relay.initialize().await;
        for frame in &frame_relays {
            frame.initialize().await;
        }

        info!(
            window = %name,
            domain = %domain,
            frames = frame_relays.len(),
            "Page opened"
        );
        Ok(relay)
    }

    /// Close the window called `name` and the frames it embeds.
    ///
    /// Returns false if no such window is open.
    pub async fn close_window(&self, name: &str) -> bool {
        let Some(window) = self.windows.lock().remove(name) else {
            return false;
        };
        for frame in &window.frames {
            frame.close().await;
        }
        window.relay.close().await;
        info!(window = %name, "Window closed");
        true
    }

    /// Close every open window.
    pub async fn close_all(&self) {
        let names: Vec<String> = self.windows.lock().keys().cloned().collect();
        for name in names {
            self.close_window(&name).await;
        }
    }

    /// Refuse to open new windows from now on.
    pub fn block_popups(&self) {
        self.popups_blocked.store(true, Ordering::SeqCst);
    }

    /// Relay of the open window called `name`.
    #[must_use]
    pub fn relay(&self, name: &str) -> Option<Arc<DomainRelay>> {
        self.live_window(name).map(|w| w.relay)
    }

    /// Handle for posting into the window called `name`, as a page holding
    /// a reference to it would.
    #[must_use]
    pub fn window_handle(&self, name: &str) -> Option<WindowHandle> {
        self.live_window(name).map(|w| w.handle)
    }

    /// Relay of the frame of `domain` embedded in the window called `name`.
    #[must_use]
    pub fn frame_relay(&self, name: &str, domain: DomainName) -> Option<Arc<DomainRelay>> {
        self.live_window(name)?
            .frames
            .into_iter()
            .find(|f| f.current_domain() == domain)
    }

    /// Names of the open windows, sorted.
    #[must_use]
    pub fn window_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.windows.lock().keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn storage(&self) -> Arc<dyn KeyValueStore> {
        self.storage.clone()
    }

    fn domain_of(&self, location: &PageLocation) -> DomainName {
        detect_current_domain(DomainRegistry::global(), location, |host| {
            self.config.is_dev_host(host)
        })
    }

    fn live_window(&self, name: &str) -> Option<Window> {
        self.windows
            .lock()
            .get(name)
            .filter(|w| !w.handle.is_closed())
            .cloned()
    }

    fn build_relay(
        self: &Arc<Self>,
        location: PageLocation,
        inbox: Inbox,
        frames: HashMap<DomainName, WindowHandle>,
        parent: Option<WindowHandle>,
    ) -> Result<Arc<DomainRelay>, ConfigError> {
        let domain = self.domain_of(&location);
        let context = Arc::new(PageContext {
            location,
            browser: Arc::downgrade(self),
            storage: self.storage.clone(),
            frames,
            parent,
        });
        DomainRelay::builder(context, inbox, Arc::new(ActionDispatcher::for_domain(domain)))
            .config(self.config.clone())
            .notifier(self.notifier.clone())
            .build()
    }

    /// `window.open`: focus the live window called `name`, or open a new
    /// page at `url` under that name. The new page initializes in the
    /// background.
    fn open_window(self: &Arc<Self>, url: &str, name: &str) -> Option<WindowHandle> {
        if let Some(existing) = self.live_window(name) {
            return Some(existing.handle);
        }
        if self.popups_blocked.load(Ordering::SeqCst) {
            warn!(url = %url, window = %name, "Popup blocked");
            return None;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(url = %url, error = %e, "No runtime to host a new window");
                return None;
            }
        };

        let location = match PageLocation::parse(url) {
            Ok(location) => location,
            Err(e) => {
                warn!(url = %url, error = %e, "Refusing to open window");
                return None;
            }
        };
        let domain = self.domain_of(&location);
        let (handle, inbox) = WindowHandle::channel(domain, name);
        let relay = match self.build_relay(location, inbox, HashMap::new(), None) {
            Ok(relay) => relay,
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to start page");
                return None;
            }
        };

        self.windows.lock().insert(
            name.to_string(),
            Window {
                handle: handle.clone(),
                relay: relay.clone(),
                frames: Vec::new(),
            },
        );
        runtime.spawn(async move { relay.initialize().await });

        info!(url = %url, window = %name, domain = %domain, "Window opened");
        Some(handle)
    }
}
