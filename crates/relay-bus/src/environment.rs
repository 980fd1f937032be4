//! # Page Environment
//!
//! The relay never touches a browser directly. Everything it needs from the
//! hosting page (location, embedded frames, the parent window, the window
//! opener, durable storage) comes through the `PageEnvironment` port, and UI
//! notifications go out through the `Notifier` port.

use crate::storage::KeyValueStore;
use crate::window::WindowHandle;
use relay_types::{DomainName, DomainRegistry};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Path prefixes that select a domain on development hosts, in match order.
const DEV_PATH_PREFIXES: [(&str, DomainName); 4] = [
    ("/crypto/", DomainName::Crypto),
    ("/nft/", DomainName::Nft),
    ("/wallet/", DomainName::Wallet),
    ("/x/", DomainName::X),
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("URL has no scheme: {0}")]
    MissingScheme(String),

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("Invalid port in URL: {0}")]
    InvalidPort(String),

    #[error("Invalid host in URL: {0}")]
    InvalidHost(String),
}

fn parse_port(port: &str, url: &str) -> Result<u16, LocationError> {
    port.parse::<u16>()
        .map_err(|_| LocationError::InvalidPort(url.to_string()))
}

/// Location of a page, split the way `window.location` exposes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub scheme: String,
    /// Lowercased hostname without port.
    pub hostname: String,
    pub port: Option<u16>,
    /// Path starting with `/`.
    pub pathname: String,
}

impl PageLocation {
    /// Parse an absolute URL. Query and fragment are discarded.
    pub fn parse(url: &str) -> Result<Self, LocationError> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| LocationError::MissingScheme(url.to_string()))?;

        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, "/"),
        };

        // A bracketed IPv6 host keeps its brackets, as `window.location` does.
        let (host, port) = if authority.starts_with('[') {
            let end = authority
                .find(']')
                .ok_or_else(|| LocationError::InvalidHost(url.to_string()))?;
            let (host, rest) = authority.split_at(end + 1);
            match rest {
                "" => (host, None),
                _ => match rest.strip_prefix(':') {
                    Some(port) => (host, Some(parse_port(port, url)?)),
                    None => return Err(LocationError::InvalidHost(url.to_string())),
                },
            }
        } else {
            match authority.rsplit_once(':') {
                Some((host, port)) => (host, Some(parse_port(port, url)?)),
                None => (authority, None),
            }
        };
        if host.is_empty() {
            return Err(LocationError::MissingHost(url.to_string()));
        }

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            hostname: host.to_ascii_lowercase(),
            port,
            pathname: path.to_string(),
        })
    }

    /// `scheme://host[:port]`
    #[must_use]
    pub fn origin(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme, self.hostname, port),
            None => format!("{}://{}", self.scheme, self.hostname),
        }
    }
}

impl fmt::Display for PageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin(), self.pathname)
    }
}

/// Which domain a page at `location` belongs to.
///
/// On development hosts the path decides, elsewhere the hostname does.
/// Anything unrecognized is the blockchain hub.
#[must_use]
pub fn detect_current_domain(
    registry: &DomainRegistry,
    location: &PageLocation,
    is_dev_host: impl Fn(&str) -> bool,
) -> DomainName {
    if is_dev_host(&location.hostname) {
        return DEV_PATH_PREFIXES
            .iter()
            .find(|(prefix, _)| location.pathname.contains(prefix))
            .map_or(DomainName::Blockchain, |(_, domain)| *domain);
    }

    registry
        .domain_for_url(&location.hostname)
        .unwrap_or(DomainName::Blockchain)
}

/// What the relay sees of its hosting page.
pub trait PageEnvironment: Send + Sync {
    fn location(&self) -> PageLocation;

    /// Origin stamped on every message this page posts.
    fn origin(&self) -> String {
        self.location().origin()
    }

    /// Embedded frame tagged with `domain`, if any.
    fn frame(&self, domain: DomainName) -> Option<WindowHandle>;

    /// Parent window when this page is embedded in a frame.
    fn parent(&self) -> Option<WindowHandle>;

    /// Open (or focus) the window called `name` at `url`. `None` when the
    /// window cannot be opened.
    fn open_window(&self, url: &str, name: &str) -> Option<WindowHandle>;

    /// Durable storage shared by every page of the browser profile.
    fn storage(&self) -> Arc<dyn KeyValueStore>;
}

/// Severity of a UI notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Critical,
}

/// UI notification sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str, severity: Severity);
}

/// Notifier that logs instead of rendering.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, title: &str, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => {
                info!(title = title, severity = ?severity, "{}", message);
            }
            Severity::Warning => warn!(title = title, "{}", message),
            Severity::Critical => error!(title = title, "{}", message),
        }
    }
}
