//! # Relay Types Crate
//!
//! This crate contains all cross-domain entities, the `RelayMessage`
//! envelope and the static domain registry.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a domain boundary is
//!   defined here.
//! - **Envelope Identity**: the envelope's `source_domain` and `session_id`
//!   are the only identity fields; payloads never repeat them.
//! - **Correlated Requests**: request/response pairs are matched by a
//!   per-call `CorrelationId`, never by action name.

pub mod entities;
pub mod envelope;
pub mod errors;
pub mod ports;
pub mod registry;

pub use entities::*;
pub use envelope::{CorrelationId, MessagePayload, MessageType, RelayMessage, ResponseStatus};
pub use errors::*;
pub use ports::ActionExecutor;
pub use registry::{DomainEntry, DomainRegistry};
