//! `HaloExchange`: the per-step exchange phases.
//!
//! One exchange round runs in three calls:
//!
//! 1. [`post_receives`](HaloExchange::post_receives) posts one receive per
//!    active direction into its region of the receive buffer.
//! 2. [`pack_and_send`](HaloExchange::pack_and_send) packs the boundary of
//!    every field into the send buffer, posts the sends, and blocks until all
//!    of them have completed so the send buffer can be reused.
//! 3. A combine phase waits on each posted receive, in activation order, and
//!    folds it into the fields: [`combine_sum`](HaloExchange::combine_sum),
//!    [`combine_overwrite`](HaloExchange::combine_overwrite) or
//!    [`combine_segmented`](HaloExchange::combine_segmented).
//!
//! Computation may be overlapped between the calls. Every phase is a no-op
//! when the run has a single rank.
//!
//! Validation failures (wrong field count, short fields, oversized layouts)
//! are reported before anything is posted or consumed and leave the round as
//! it was. Transport failures end the round: all outstanding handles are
//! drained, the exchange returns to [`Phase::Idle`], and the first failure is
//! returned.

use crate::algs::communicator::{CommTag, Communicator};
use crate::algs::exchange::transfers::{Completed, Pending, TransferPool};
use crate::algs::pack::{check_lengths, pack_fields, unpack_fields, unpack_segmented};
use crate::algs::wire::{cast_slice, cast_slice_mut, decode_into};
use crate::config::HaloConfig;
use crate::data::buffers::CommBuffers;
use crate::data::field::FieldAccess;
use crate::data::layout::{BoundaryLayout, Extents};
use crate::data::scalar::{HaloScalar, Real};
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshHaloError;
use crate::overlap::delta::{AddDelta, CopyDelta, Delta};
use crate::topology::direction::{Direction, DirectionClass};
use crate::topology::grid::ProcessorGrid;
use crate::topology::neighbors::ActiveNeighbors;
use std::ops::Range;

/// Where the exchange is within a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No round in progress.
    Idle,
    /// Receives are outstanding; sends not yet posted.
    ReceivesPosted,
    /// Sends have completed; receives await a combine phase.
    SendsCompleted,
}

/// What an exchange round carries. Each kind owns a message tag, so rounds
/// of different kinds never match each other's messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    /// Partial nodal quantities summed across sub-domains.
    NodalSum,
    /// Positions and velocities copied from higher ranks.
    PositionVelocity,
    /// Element gradients appended to ghost storage, faces only.
    MonotonicGradient,
    /// Caller-defined round with an explicit tag.
    Custom(u16),
}

impl ExchangeKind {
    pub const fn tag(self) -> CommTag {
        match self {
            ExchangeKind::NodalSum => CommTag::new(1024),
            ExchangeKind::PositionVelocity => CommTag::new(2048),
            ExchangeKind::MonotonicGradient => CommTag::new(3072),
            ExchangeKind::Custom(t) => CommTag::new(t),
        }
    }
}

/// Shape of the round whose receives are outstanding.
#[derive(Clone, Copy, Debug)]
struct Round {
    kind: ExchangeKind,
    field_count: usize,
    extents: Extents,
}

/// Halo exchange state of one rank.
pub struct HaloExchange<C: Communicator, T: HaloScalar = Real> {
    comm: C,
    grid: ProcessorGrid,
    config: HaloConfig,
    max_extents: Extents,
    buffers: CommBuffers<T>,
    recvs: TransferPool<C::RecvHandle>,
    round: Option<Round>,
    phase: Phase,
}

impl<C: Communicator, T: HaloScalar> HaloExchange<C, T> {
    /// Build the exchange for `grid`, with buffers sized for extents up to
    /// `max_extents`.
    pub fn new(
        comm: C,
        grid: ProcessorGrid,
        max_extents: Extents,
        config: HaloConfig,
    ) -> Result<Self, MeshHaloError> {
        grid.validate_invariants()?;
        if comm.size() != grid.num_ranks() {
            return Err(MeshHaloError::CommSizeMismatch {
                grid: grid.num_ranks(),
                comm: comm.size(),
            });
        }
        if comm.rank() != grid.rank() {
            return Err(MeshHaloError::RankOutOfRange {
                rank: comm.rank(),
                ranks: grid.num_ranks(),
            });
        }
        let buffers = CommBuffers::new(max_extents, &config)?;
        buffers.debug_assert_invariants();
        log::debug!(
            "rank {} at (row {}, col {}, plane {}) of a {}^3 grid",
            grid.rank(),
            grid.row(),
            grid.col(),
            grid.plane(),
            grid.edge()
        );
        Ok(Self {
            comm,
            grid,
            config,
            max_extents,
            buffers,
            recvs: TransferPool::new(),
            round: None,
            phase: Phase::Idle,
        })
    }

    /// Place this rank in the grid implied by the communicator's world size.
    pub fn from_comm(comm: C, max_extents: Extents, config: HaloConfig) -> Result<Self, MeshHaloError> {
        let grid = ProcessorGrid::from_rank(comm.rank(), comm.size())?;
        Self::new(comm, grid, max_extents, config)
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn grid(&self) -> &ProcessorGrid {
        &self.grid
    }

    pub fn config(&self) -> &HaloConfig {
        &self.config
    }

    pub fn max_extents(&self) -> Extents {
        self.max_extents
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Kind of the round in progress, if any.
    pub fn current_kind(&self) -> Option<ExchangeKind> {
        self.round.map(|r| r.kind)
    }

    /// Receives not yet consumed by a combine phase.
    pub fn pending_receives(&self) -> usize {
        self.recvs.len()
    }

    /// Values per field a round with these settings would receive, summed
    /// over its active directions. Sizes the ghost storage a segmented round
    /// appends to.
    pub fn receive_count(&self, extents: Extents, do_receive: bool, planes_only: bool) -> usize {
        if self.is_serial() {
            return 0;
        }
        ActiveNeighbors::for_receive(&self.grid, do_receive, planes_only)
            .iter()
            .map(|(d, _)| BoundaryLayout::new(d, extents).element_count())
            .sum()
    }

    /// True when there is nobody to exchange with.
    pub fn is_serial(&self) -> bool {
        self.comm.is_no_comm() || self.comm.size() == 1 || self.grid.num_ranks() == 1
    }

    fn expect_phase(&self, operation: &'static str, want: Phase) -> Result<(), MeshHaloError> {
        if self.phase != want {
            return Err(MeshHaloError::PhaseOrder {
                operation,
                found: self.phase,
            });
        }
        Ok(())
    }

    /// Regions for every active direction, or the first sizing failure.
    fn plan(
        &self,
        active: &ActiveNeighbors,
        extents: Extents,
        field_count: usize,
    ) -> Result<Vec<(Direction, usize, BoundaryLayout, Range<usize>)>, MeshHaloError> {
        active
            .iter()
            .map(|(d, peer)| {
                let layout = BoundaryLayout::new(d, extents);
                let region = self.buffers.region(d, field_count, layout.element_count())?;
                Ok((d, peer, layout, region))
            })
            .collect()
    }

    /// Post receives for one round.
    ///
    /// `do_receive` gates receives from lower-ranked neighbors; `planes_only`
    /// restricts the round to the six face directions.
    pub fn post_receives(
        &mut self,
        kind: ExchangeKind,
        field_count: usize,
        extents: Extents,
        do_receive: bool,
        planes_only: bool,
    ) -> Result<(), MeshHaloError> {
        if self.is_serial() {
            return Ok(());
        }
        self.expect_phase("post receives", Phase::Idle)?;
        let active = ActiveNeighbors::for_receive(&self.grid, do_receive, planes_only);
        let plan = self.plan(&active, extents, field_count)?;
        let tag = kind.tag();
        log::debug!(
            "rank {}: posting {} receives for {kind:?} ({field_count} fields, faces {}, edges {}, corners {})",
            self.grid.rank(),
            plan.len(),
            active.count_of(DirectionClass::Face),
            active.count_of(DirectionClass::Edge),
            active.count_of(DirectionClass::Corner),
        );
        for (d, peer, layout, region) in plan {
            log::trace!(
                "recv {d:?} from rank {peer}: {} values/field into {region:?}",
                layout.element_count()
            );
            let bytes = cast_slice_mut(self.buffers.recv_mut(region.clone()));
            let handle = self.comm.irecv(peer, tag.base(), bytes);
            self.recvs.insert(
                d,
                Pending {
                    peer,
                    region,
                    handle,
                },
            )?;
        }
        self.recvs.debug_assert_invariants();
        self.round = Some(Round {
            kind,
            field_count,
            extents,
        });
        self.phase = Phase::ReceivesPosted;
        Ok(())
    }

    /// Pack every field's boundary and send it to each active neighbor, then
    /// block until all sends have completed.
    ///
    /// `do_send` gates sends toward higher-ranked neighbors.
    pub fn pack_and_send(
        &mut self,
        kind: ExchangeKind,
        fields: &[&dyn FieldAccess<T>],
        extents: Extents,
        do_send: bool,
        planes_only: bool,
    ) -> Result<(), MeshHaloError> {
        if self.is_serial() {
            return Ok(());
        }
        self.expect_phase("pack and send", Phase::ReceivesPosted)?;
        let round = self.round.ok_or(MeshHaloError::PhaseOrder {
            operation: "pack and send",
            found: self.phase,
        })?;
        if round.kind != kind {
            return Err(MeshHaloError::PhaseOrder {
                operation: "pack and send for a different exchange kind",
                found: self.phase,
            });
        }
        if fields.len() != round.field_count {
            return Err(MeshHaloError::FieldCountMismatch {
                expected: round.field_count,
                got: fields.len(),
            });
        }
        if extents != round.extents {
            return Err(MeshHaloError::ExtentsMismatch {
                posted: round.extents,
                got: extents,
            });
        }
        let active = ActiveNeighbors::for_send(&self.grid, do_send, planes_only);
        let plan = self.plan(&active, extents, fields.len())?;
        for (_, _, layout, _) in &plan {
            check_lengths(layout, fields.iter().map(|f| f.len()))?;
        }

        for (_, _, layout, region) in &plan {
            pack_fields(layout, fields, self.buffers.send_mut(region.clone()))?;
        }

        let tag = kind.tag();
        let mut sends = TransferPool::new();
        for (d, peer, layout, region) in plan {
            log::trace!(
                "send {d:?} to rank {peer}: {} values/field from {region:?}",
                layout.element_count()
            );
            let handle = self
                .comm
                .isend(peer, tag.base(), cast_slice(self.buffers.send(region.clone())));
            if let Err(e) = sends.insert(
                d,
                Pending {
                    peer,
                    region,
                    handle,
                },
            ) {
                sends.drain();
                return Err(self.abort(e));
            }
        }
        let sent = sends.drain();
        log::debug!("rank {}: {sent} sends for {kind:?} complete", self.grid.rank());
        self.phase = Phase::SendsCompleted;
        Ok(())
    }

    /// Sum incoming boundary values into the fields.
    pub fn combine_sum(&mut self, fields: &mut [&mut dyn FieldAccess<T>]) -> Result<(), MeshHaloError> {
        self.combine::<AddDelta>("combine sum", fields)
    }

    /// Overwrite the fields' boundary values with the incoming ones.
    pub fn combine_overwrite(&mut self, fields: &mut [&mut dyn FieldAccess<T>]) -> Result<(), MeshHaloError> {
        self.combine::<CopyDelta>("combine overwrite", fields)
    }

    fn combine<D: Delta<T>>(
        &mut self,
        operation: &'static str,
        fields: &mut [&mut dyn FieldAccess<T>],
    ) -> Result<(), MeshHaloError> {
        if self.is_serial() {
            return Ok(());
        }
        let round = self.begin_combine(operation, fields.len())?;
        let layouts: Vec<BoundaryLayout> = self
            .recvs
            .directions()
            .map(|d| BoundaryLayout::new(d, round.extents))
            .collect();
        for layout in &layouts {
            check_lengths(layout, fields.iter().map(|f| f.len()))?;
        }

        let mut first_err = None;
        for layout in layouts {
            let Some(done) = self.recvs.wait(layout.direction()) else {
                continue;
            };
            if first_err.is_some() {
                continue;
            }
            match self.receive(&done) {
                Ok(()) => {
                    let incoming = self.buffers.recv(done.region.clone());
                    if let Err(e) = unpack_fields::<D, T>(&layout, incoming, fields) {
                        first_err = Some(e);
                    }
                }
                Err(e) => first_err = Some(e),
            }
        }
        self.finish(operation, first_err)
    }

    /// Copy incoming face data into contiguous ghost storage appended to
    /// each field.
    ///
    /// Field `i` is written from `ghost_base[i]` onward, one block per active
    /// direction in activation order. Returns the offset just past the last
    /// value written to each field.
    pub fn combine_segmented(
        &mut self,
        fields: &mut [&mut dyn FieldAccess<T>],
        ghost_base: &[usize],
    ) -> Result<Vec<usize>, MeshHaloError> {
        if self.is_serial() {
            return Ok(ghost_base.to_vec());
        }
        if ghost_base.len() != fields.len() {
            return Err(MeshHaloError::FieldCountMismatch {
                expected: fields.len(),
                got: ghost_base.len(),
            });
        }
        let operation = "combine segmented";
        let round = self.begin_combine(operation, fields.len())?;
        let counts: Vec<(Direction, usize)> = self
            .recvs
            .directions()
            .map(|d| (d, BoundaryLayout::new(d, round.extents).element_count()))
            .collect();
        let total: usize = counts.iter().map(|(_, n)| n).sum();
        for (field, (f, &base)) in fields.iter().zip(ghost_base).enumerate() {
            if total > 0 && base + total > f.len() {
                return Err(MeshHaloError::FieldTooShort {
                    field,
                    needed: base + total - 1,
                    len: f.len(),
                });
            }
        }

        let mut cursors = ghost_base.to_vec();
        let mut first_err = None;
        for (d, count) in counts {
            let Some(done) = self.recvs.wait(d) else {
                continue;
            };
            if first_err.is_some() {
                continue;
            }
            match self.receive(&done) {
                Ok(()) => {
                    let incoming = self.buffers.recv(done.region.clone());
                    if let Err(e) = unpack_segmented(count, incoming, fields, &mut cursors) {
                        first_err = Some(e);
                    }
                }
                Err(e) => first_err = Some(e),
            }
        }
        self.finish(operation, first_err)?;
        Ok(cursors)
    }

    fn begin_combine(&self, operation: &'static str, field_count: usize) -> Result<Round, MeshHaloError> {
        self.expect_phase(operation, Phase::SendsCompleted)?;
        let round = self.round.ok_or(MeshHaloError::PhaseOrder {
            operation,
            found: self.phase,
        })?;
        if field_count != round.field_count {
            return Err(MeshHaloError::FieldCountMismatch {
                expected: round.field_count,
                got: field_count,
            });
        }
        Ok(round)
    }

    /// Copy a completed receive into its region of the receive buffer.
    fn receive(&mut self, done: &Completed) -> Result<(), MeshHaloError> {
        let payload = done.payload.as_deref().ok_or_else(|| MeshHaloError::CommError {
            neighbor: done.peer,
            source: format!("no data received for {:?}", done.direction).into(),
        })?;
        decode_into(done.peer, payload, self.buffers.recv_mut(done.region.clone()))
    }

    fn finish(&mut self, operation: &str, first_err: Option<MeshHaloError>) -> Result<(), MeshHaloError> {
        match first_err {
            Some(e) => Err(self.abort(e)),
            None => {
                log::debug!("rank {}: {operation} done", self.grid.rank());
                self.round = None;
                self.phase = Phase::Idle;
                Ok(())
            }
        }
    }

    /// End the round after a transport failure.
    fn abort(&mut self, err: MeshHaloError) -> MeshHaloError {
        log::warn!(
            "rank {}: exchange round failed ({err}); draining {} outstanding receives",
            self.grid.rank(),
            self.recvs.len()
        );
        self.recvs.drain();
        self.round = None;
        self.phase = Phase::Idle;
        err
    }

    /// Run a whole summing round over shared boundary data.
    pub fn exchange_sum(
        &mut self,
        kind: ExchangeKind,
        fields: &mut [&mut dyn FieldAccess<T>],
        extents: Extents,
    ) -> Result<(), MeshHaloError> {
        self.post_receives(kind, fields.len(), extents, true, false)?;
        self.send_views(kind, fields, extents, true, false)?;
        self.combine_sum(fields)
    }

    /// Run a whole overwriting round. With both flags cleared, values only
    /// flow from higher ranks to lower ranks.
    pub fn exchange_overwrite(
        &mut self,
        kind: ExchangeKind,
        fields: &mut [&mut dyn FieldAccess<T>],
        extents: Extents,
        do_receive: bool,
        do_send: bool,
    ) -> Result<(), MeshHaloError> {
        self.post_receives(kind, fields.len(), extents, do_receive, false)?;
        self.send_views(kind, fields, extents, do_send, false)?;
        self.combine_overwrite(fields)
    }

    /// Run a whole face-only segmented round.
    pub fn exchange_segmented(
        &mut self,
        kind: ExchangeKind,
        fields: &mut [&mut dyn FieldAccess<T>],
        extents: Extents,
        ghost_base: &[usize],
    ) -> Result<Vec<usize>, MeshHaloError> {
        self.post_receives(kind, fields.len(), extents, true, true)?;
        self.send_views(kind, fields, extents, true, true)?;
        self.combine_segmented(fields, ghost_base)
    }

    fn send_views(
        &mut self,
        kind: ExchangeKind,
        fields: &[&mut dyn FieldAccess<T>],
        extents: Extents,
        do_send: bool,
        planes_only: bool,
    ) -> Result<(), MeshHaloError> {
        let views: Vec<&dyn FieldAccess<T>> = fields.iter().map(|f| &**f).collect();
        let sent = self.pack_and_send(kind, &views, extents, do_send, planes_only);
        if sent.is_err() && self.phase == Phase::ReceivesPosted {
            // A one-shot round cannot be resumed by the caller.
            let outstanding = self.recvs.len();
            log::warn!("abandoning {outstanding} posted receives after a failed send");
            self.recvs.drain();
            self.round = None;
            self.phase = Phase::Idle;
        }
        sent
    }
}

impl<C: Communicator, T: HaloScalar> DebugInvariants for HaloExchange<C, T> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "HaloExchange");
    }

    fn validate_invariants(&self) -> Result<(), MeshHaloError> {
        self.grid.validate_invariants()?;
        self.buffers.validate_invariants()?;
        self.recvs.validate_invariants()?;
        let consistent = match self.phase {
            Phase::Idle => self.round.is_none() && self.recvs.is_empty(),
            Phase::ReceivesPosted | Phase::SendsCompleted => self.round.is_some(),
        };
        if !consistent {
            return Err(MeshHaloError::PhaseOrder {
                operation: "validate",
                found: self.phase,
            });
        }
        Ok(())
    }
}
