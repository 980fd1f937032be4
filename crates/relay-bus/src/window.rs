//! Window and frame handles.
//!
//! A `WindowHandle` is the sending half of a page's inbound message inbox,
//! the equivalent of a `postMessage` target. The page owns the matching
//! `Inbox`; once the page goes away the handle reports `is_closed()`.

use relay_types::{DomainName, TransportError};
use serde_json::Value;
use tokio::sync::mpsc;

/// A message posted to a page, tagged with the sender's origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub origin: String,
    pub data: Value,
}

/// Receiving half of a page's message channel.
pub type Inbox = mpsc::UnboundedReceiver<PostedMessage>;

/// Handle to a window or embedded frame of one domain.
#[derive(Debug, Clone)]
pub struct WindowHandle {
    domain: DomainName,
    name: String,
    sender: mpsc::UnboundedSender<PostedMessage>,
}

impl WindowHandle {
    /// Create a handle and the inbox it posts into.
    pub fn channel(domain: DomainName, name: impl Into<String>) -> (Self, Inbox) {
        let (sender, inbox) = mpsc::unbounded_channel();
        (
            Self {
                domain,
                name: name.into(),
                sender,
            },
            inbox,
        )
    }

    #[must_use]
    pub fn domain(&self) -> DomainName {
        self.domain
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Post `data` to the page.
    ///
    /// # Errors
    ///
    /// `TransportError::Closed` if the page is gone.
    pub fn post_message(&self, origin: &str, data: Value) -> Result<(), TransportError> {
        self.sender
            .send(PostedMessage {
                origin: origin.to_string(),
                data,
            })
            .map_err(|_| TransportError::Closed(self.domain))
    }

    /// Has the receiving page gone away?
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Do both handles post into the same inbox?
    #[must_use]
    pub fn same_window(&self, other: &WindowHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }
}
