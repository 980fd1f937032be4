//! Shared setup for the integration flows.

use parking_lot::Mutex;
use relay_bus::{DomainRelay, MemoryStorage, Notifier, RelayConfig, Severity};
use relay_runtime::SimulatedBrowser;
use relay_types::{DomainName, DomainRegistry, MessagePayload, RelayMessage};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Hub page on a development host.
pub(crate) const HUB_URL: &str = "http://localhost:5000/";

pub(crate) const HUB_WINDOW: &str = "domain_blockchain";

pub(crate) fn browser() -> Arc<SimulatedBrowser> {
    browser_with(RelayConfig::default())
}

pub(crate) fn browser_with(config: RelayConfig) -> Arc<SimulatedBrowser> {
    SimulatedBrowser::new(Arc::new(MemoryStorage::new()), config)
}

/// Config with a short request timeout, for flows expected to time out.
pub(crate) fn short_timeout() -> RelayConfig {
    RelayConfig {
        request_timeout_ms: 1_000,
        ..RelayConfig::default()
    }
}

/// Hub page embedding frames of the other four domains.
pub(crate) async fn hub_with_frames(browser: &Arc<SimulatedBrowser>) -> Arc<DomainRelay> {
    let frames: Vec<DomainName> = DomainName::Blockchain.others().collect();
    browser
        .open_page_with_frames(HUB_URL, &frames)
        .await
        .unwrap()
}

/// Hub page with no frames; every send goes through the storage relay.
pub(crate) async fn bare_hub(browser: &Arc<SimulatedBrowser>) -> Arc<DomainRelay> {
    browser.open_page(HUB_URL).await.unwrap()
}

/// Envelope as `source` would send it within `relay`'s session.
pub(crate) fn envelope_for(
    relay: &DomainRelay,
    source: DomainName,
    payload: MessagePayload,
) -> Value {
    let message = RelayMessage::new(payload, source, Some(relay.session_id()));
    serde_json::to_value(message).unwrap()
}

/// Origin of `domain`'s registry endpoint, as a page there stamps it.
pub(crate) fn origin_of(domain: DomainName) -> String {
    DomainRegistry::global()
        .endpoint(domain)
        .to_ascii_lowercase()
}

/// Poll `check` until it holds, failing the test after about two seconds.
pub(crate) async fn eventually(what: &str, check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
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
