//! Halo exchange rounds: the handle pool and the phase entry points.

pub mod phases;
pub mod transfers;

pub use phases::{ExchangeKind, HaloExchange, Phase};
pub use transfers::{Completed, Pending, TransferPool};
