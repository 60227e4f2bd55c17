//! Re-export public algorithms.

pub mod communicator;
pub mod exchange;
pub mod pack;
pub mod wire;

pub use exchange::{ExchangeKind, HaloExchange, Phase};
