//! Resolver module - turns monitored items into numeric observations
//!
//! Live quotes and economic series are tried first; a keyword-driven
//! simulation guarantees every item gets a value.

mod chain;
pub mod sources;

pub use chain::{Pacer, ResolverChain};
pub use sources::simulated::{classify, simulate_value, ValueBand};
pub use sources::ValueSource;
