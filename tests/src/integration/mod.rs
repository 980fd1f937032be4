//! Integration flows between domain pages.

#[cfg(test)]
pub(crate) mod fixtures;

pub mod emergency;
pub mod flows;
pub mod resilience;
