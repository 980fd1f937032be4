//! Domain layer: money, identifiers and payload conventions.

pub mod errors;
pub mod ids;
pub mod money;
pub mod payload;

pub use errors::MoneyError;
pub use ids::{hex_token, ipfs_hash, iso_after, iso_now, prefixed_id, random_in};
pub use money::{Cents, FeeBreakdown, FeeQuote, BASE_FEE_PERCENT, FEE_PERCENT};
pub use payload::{is_set, or_default, str_or};
