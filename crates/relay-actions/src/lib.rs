//! # Relay Actions
//!
//! Mock action handlers for the five bail-bond domains.
//!
//! ## Purpose
//!
//! Each domain fulfils the three actions the domain registry lists for it.
//! Results are realistic mock payloads: generated identifiers, hashes and
//! timestamps. Fee quotes are the one exact computation and use integer
//! cents.
//!
//! ## Module Structure
//!
//! ```text
//! relay-actions/
//! ├── domain/          # Cents, fee quotes, mock ids, payload defaults
//! ├── handlers/        # One ActionHandler per action, grouped by domain
//! └── dispatcher       # ActionExecutor used by a domain relay
//! ```

#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod dispatcher;
pub mod domain;
pub mod handlers;

// Re-exports
pub use dispatcher::ActionDispatcher;
pub use domain::{Cents, FeeBreakdown, FeeQuote, MoneyError, BASE_FEE_PERCENT, FEE_PERCENT};
pub use handlers::{handlers_for, ActionHandler};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
