// This example runs one step's worth of halo traffic of a LULESH-style
// hydrodynamics code on an in-process world of 8 ranks (a 2x2x2 processor
// grid). Each rank owns an `n`³ element brick (default 4, override with the
// first argument) and performs the three exchanges of a step:
//   1. nodal mass summed over shared boundary nodes,
//   2. positions and velocities copied from higher ranks,
//   3. monotonic-Q gradients appended as face ghosts.
// Each rank prints a short summary of what it received.
use mesh_halo::algs::communicator::run_local_world;
use mesh_halo::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let n: usize = std::env::args().nth(1).map(|s| s.parse()).transpose()?.unwrap_or(4);
    let elems = Extents::cube(n)?;
    let nodes = Extents::nodes_of(elems);

    let reports = run_local_world(8, |comm| -> Result<String, MeshHaloError> {
        let mut ex: HaloExchange<RayonComm> = HaloExchange::from_comm(comm, nodes, HaloConfig::default())?;
        let rank = ex.grid().rank();

        // 1. every node starts with one unit of mass per owning sub-domain
        let mut mass = vec![1.0 as Real; nodes.volume()];
        ex.exchange_sum(ExchangeKind::NodalSum, &mut [&mut mass], nodes)?;
        let shared = mass.iter().filter(|&&m| m > 1.0).count();

        // 2. positions and velocities, split so work can overlap the messages
        let mut xyz: Vec<Vec<Real>> = (0..6).map(|_| vec![rank as Real; nodes.volume()]).collect();
        let kind = ExchangeKind::PositionVelocity;
        ex.post_receives(kind, 6, nodes, false, false)?;
        {
            let views: Vec<&dyn FieldAccess<Real>> = xyz.iter().map(|f| f as &dyn FieldAccess<Real>).collect();
            ex.pack_and_send(kind, &views, nodes, false, false)?;
        }
        // ... element-local work would run here ...
        let mut views: Vec<&mut dyn FieldAccess<Real>> =
            xyz.iter_mut().map(|f| f as &mut dyn FieldAccess<Real>).collect();
        ex.combine_overwrite(&mut views)?;
        let synced = xyz[0].iter().filter(|&&x| x != rank as Real).count();

        // 3. gradients with room for face ghosts after the owned elements
        let owned = elems.volume();
        let ghosts = ex.receive_count(elems, true, true);
        let mut grads: Vec<Vec<Real>> = (0..3).map(|_| vec![rank as Real; owned + ghosts]).collect();
        let mut views: Vec<&mut dyn FieldAccess<Real>> =
            grads.iter_mut().map(|f| f as &mut dyn FieldAccess<Real>).collect();
        let ends = ex.exchange_segmented(ExchangeKind::MonotonicGradient, &mut views, elems, &[owned; 3])?;

        Ok(format!(
            "rank {rank}: {shared} shared nodes, {synced} nodes synced from above, \
             {ghosts} ghost elements per gradient (ends {ends:?})"
        ))
    })?;

    for report in reports {
        println!("{}", report?);
    }
    Ok(())
}
