//! # Domain Relay Test Suite
//!
//! Cross-domain flows run over the simulated browser.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs    # Browser and hub helpers
//!     ├── flows.rs       # Request/response round trips
//!     ├── emergency.rs   # Emergency activation and session propagation
//!     └── resilience.rs  # Reloads, stale windows, foreign input, timeouts
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p relay-tests
//! cargo test -p relay-tests integration::emergency::
//! ```

pub mod integration;
