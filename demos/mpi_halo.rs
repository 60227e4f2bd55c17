// This example runs a nodal-sum halo exchange across real MPI ranks. Launch it
// with a cubic number of ranks, e.g. `mpirun -n 8`. Each rank owns a 4³
// element brick; after the exchange every shared boundary node holds the
// number of sub-domains that share it, which each rank checks and reports.
fn main() {
    use mesh_halo::algs::communicator::{Communicator, MpiComm};
    use mesh_halo::prelude::*;

    let comm = match MpiComm::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("MPI initialization failed: {e}");
            return;
        }
    };
    let rank = comm.rank();
    let elems = Extents::cube(4).expect("non-zero extents");
    let nodes = Extents::nodes_of(elems);
    let mut ex: HaloExchange<MpiComm> = match HaloExchange::from_comm(comm, nodes, HaloConfig::default()) {
        Ok(ex) => ex,
        Err(e) => {
            eprintln!("rank {rank}: {e}");
            return;
        }
    };

    let mut mass = vec![1.0 as Real; nodes.volume()];
    if let Err(e) = ex.exchange_sum(ExchangeKind::NodalSum, &mut [&mut mass], nodes) {
        eprintln!("rank {rank}: exchange failed: {e}");
        return;
    }
    let max = mass.iter().cloned().fold(0.0 as Real, Real::max);
    println!("rank {rank}: largest share count {max}");
}
