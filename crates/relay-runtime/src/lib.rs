//! # Relay Runtime
//!
//! Hosts the five domain pages in one process and runs cross-domain flows
//! between them.
//!
//! ## Modules
//!
//! - `browser/` - Simulated browser: pages, frames, named windows, storage
//! - `config/` - Runtime configuration from `RELAY_*` variables
//! - `scenario/` - Demonstration flows run against the hub page
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Open the shared storage scope
//! 3. Open the hub page, embedding frames of the other domains
//! 4. Run the demonstration flows
//! 5. Close every window

pub mod browser;
pub mod config;
pub mod scenario;

pub use browser::{window_name, BrowserError, SimulatedBrowser};
pub use config::RuntimeConfig;
pub use scenario::{run_demo, DemoReport};
