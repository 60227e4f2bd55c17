#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-halo
//!
//! mesh-halo is the ghost-layer (halo) exchange of a structured-mesh code
//! decomposed over a cubic grid of ranks. Each rank owns a brick of the global
//! mesh and trades boundary data with up to 26 neighbors (6 faces, 12 edges,
//! 8 corners) every step.
//!
//! ## Features
//! - Neighbor ranks derived in closed form from a rank's (row, col, plane)
//!   coordinate in the processor cube
//! - Boundary layouts for all 26 directions from one parametrized rule
//! - Pre-allocated send/receive buffers with fixed per-direction regions
//! - Non-blocking rounds: receives posted before sends, one handle per
//!   direction, consumed exactly once
//! - Three combine policies: sum, overwrite and segmented ghost append
//! - Pluggable transports (serial, in-process Rayon, MPI)
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-halo = "0.3"
//! # Optional features:
//! # features = ["mpi-support", "single-precision"]
//! ```
//!
//! A round is split so computation can run while messages are in flight:
//!
//! ```no_run
//! use mesh_halo::prelude::*;
//!
//! # fn step(ex: &mut HaloExchange<RayonComm>, mass: &mut Vec<Real>) -> Result<(), MeshHaloError> {
//! let nodes = Extents::cube(5)?;
//! ex.post_receives(ExchangeKind::NodalSum, 1, nodes, true, false)?;
//! ex.pack_and_send(ExchangeKind::NodalSum, &[&*mass], nodes, true, false)?;
//! // ... local work ...
//! ex.combine_sum(&mut [mass])?;
//! # Ok(())
//! # }
//! ```

pub mod algs;
pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod mesh_error;
pub mod overlap;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{CommTag, Communicator, NoComm, RayonComm, Wait};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::exchange::{ExchangeKind, HaloExchange, Phase};
    pub use crate::config::HaloConfig;
    pub use crate::data::{BoundaryLayout, Extents, FieldAccess, HaloScalar, Real, Strided};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::mesh_error::MeshHaloError;
    pub use crate::overlap::delta::{AddDelta, CopyDelta, Delta};
    pub use crate::topology::{
        ActiveNeighbors, Axis, DIRECTIONS, Direction, DirectionClass, ProcessorGrid, Side,
    };
}
