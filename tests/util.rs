#![allow(dead_code)]
use mesh_halo::{
    algs::communicator::RayonComm,
    data::Extents,
    topology::{Axis, DIRECTIONS, Direction, ProcessorGrid, Side},
};

/// Two-rank Rayon comms sharing the process-wide mailbox (ranks 0 and 1).
pub fn rayons() -> (RayonComm, RayonComm) {
    (RayonComm::new(0, 2), RayonComm::new(1, 2))
}

/// A value unique to each global mesh position.
pub fn global_value(g: [usize; 3]) -> f64 {
    (g[0] + 100 * g[1] + 10_000 * g[2]) as f64
}

/// Global position of the brick's local origin when each sub-domain spans
/// `elems` elements.
pub fn origin(grid: &ProcessorGrid, elems: Extents) -> [usize; 3] {
    [
        grid.col() * elems.dx(),
        grid.row() * elems.dy(),
        grid.plane() * elems.dz(),
    ]
}

/// Local coordinates of every index of an `ext` array, in index order.
pub fn local_coords(ext: Extents) -> impl Iterator<Item = [usize; 3]> {
    (0..ext.volume()).map(move |i| [i % ext.dx(), (i / ext.dx()) % ext.dy(), i / (ext.dx() * ext.dy())])
}

/// Fill an `ext` array of the brick of `grid` from a function of global position.
pub fn fill_brick<F>(grid: &ProcessorGrid, elems: Extents, ext: Extents, f: F) -> Vec<f64>
where
    F: Fn([usize; 3]) -> f64,
{
    let o = origin(grid, elems);
    local_coords(ext)
        .map(|[x, y, z]| f([o[0] + x, o[1] + y, o[2] + z]))
        .collect()
}

/// Number of sub-domains whose node arrays contain global node `g`.
pub fn sharing_count(edge: usize, elems: Extents, g: [usize; 3]) -> usize {
    let per_axis = [elems.dx(), elems.dy(), elems.dz()];
    (0..3)
        .map(|a| {
            let e = per_axis[a];
            if g[a] > 0 && g[a] < edge * e && g[a] % e == 0 { 2 } else { 1 }
        })
        .product()
}

/// True if local coordinate `c` of an `ext` array lies on `direction`'s boundary.
pub fn on_boundary(direction: Direction, ext: Extents, c: [usize; 3]) -> bool {
    [(Axis::Col, 0), (Axis::Row, 1), (Axis::Plane, 2)]
        .into_iter()
        .all(|(axis, i)| match direction.component(axis) {
            Some(Side::Min) => c[i] == 0,
            Some(Side::Max) => c[i] + 1 == ext.along(axis),
            None => true,
        })
}

/// Which peer's value an overwriting round leaves at each node: the last
/// active direction in activation order whose boundary holds the node.
pub fn last_writer(grid: &ProcessorGrid, nodes: Extents, upward_only: bool) -> Vec<Option<usize>> {
    local_coords(nodes)
        .map(|c| {
            DIRECTIONS
                .iter()
                .filter(|d| !upward_only || !d.is_downward())
                .filter(|d| on_boundary(**d, nodes, c))
                .filter_map(|d| grid.peer_rank(*d))
                .last()
        })
        .collect()
}

/// Assert vec is a permutation of another vec (order-agnostic).
pub fn assert_permutation<T: Ord + Copy + std::fmt::Debug>(got: &[T], want: &[T]) {
    let mut a = got.to_vec();
    a.sort_unstable();
    let mut b = want.to_vec();
    b.sort_unstable();
    assert_eq!(a, b, "not a permutation\n got={:?}\nwant={:?}", got, want);
}
