use itertools::iproduct;
use mesh_halo::topology::{
    ActiveNeighbors, Axis, DIRECTIONS, Direction, DirectionClass, ProcessorGrid, Side,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Brute-force neighbors: every offset in {-1,0,1}³ \ {0} that stays inside
/// the cube, as (fixed-axis count, neighbor rank).
fn brute_force(grid: &ProcessorGrid) -> BTreeSet<(usize, usize)> {
    let e = grid.edge() as isize;
    let (r, c, p) = (grid.row() as isize, grid.col() as isize, grid.plane() as isize);
    iproduct!(-1isize..=1, -1isize..=1, -1isize..=1)
        .filter(|&(dr, dc, dp)| (dr, dc, dp) != (0, 0, 0))
        .filter(|&(dr, dc, dp)| {
            (0..e).contains(&(r + dr)) && (0..e).contains(&(c + dc)) && (0..e).contains(&(p + dp))
        })
        .map(|(dr, dc, dp)| {
            let fixed = [dr, dc, dp].iter().filter(|&&s| s != 0).count();
            let rank = (p + dp) * e * e + (r + dr) * e + (c + dc);
            (fixed, rank as usize)
        })
        .collect()
}

fn class_fixed(class: DirectionClass) -> usize {
    match class {
        DirectionClass::Face => 1,
        DirectionClass::Edge => 2,
        DirectionClass::Corner => 3,
    }
}

proptest! {
    #[test]
    fn peers_match_brute_force(edge in 1usize..6, seed in any::<usize>()) {
        let ranks = edge * edge * edge;
        let grid = ProcessorGrid::from_rank(seed % ranks, ranks).unwrap();
        let ours: BTreeSet<_> = DIRECTIONS
            .iter()
            .filter_map(|d| grid.peer_rank(*d).map(|p| (class_fixed(d.class()), p)))
            .collect();
        prop_assert_eq!(&ours, &brute_force(&grid));
        let active = ActiveNeighbors::for_receive(&grid, true, false);
        prop_assert_eq!(active.len(), ours.len());
    }

    #[test]
    fn off_grid_directions_have_no_peer(edge in 1usize..6, seed in any::<usize>()) {
        let ranks = edge * edge * edge;
        let grid = ProcessorGrid::from_rank(seed % ranks, ranks).unwrap();
        for d in DIRECTIONS {
            let off = Axis::ALL.iter().any(|&a| match d.component(a) {
                Some(side) => grid.is_boundary(a, side),
                None => false,
            });
            prop_assert_eq!(grid.peer_rank(d).is_none(), off);
        }
    }

    #[test]
    fn every_send_has_a_matching_receive(
        edge in 1usize..5,
        do_receive in any::<bool>(),
        planes_only in any::<bool>(),
    ) {
        // With the same flags on both ends, the send sets and receive sets
        // of the whole grid describe the same transfers.
        let ranks = edge * edge * edge;
        let mut sends = BTreeSet::new();
        let mut recvs = BTreeSet::new();
        for rank in 0..ranks {
            let grid = ProcessorGrid::from_rank(rank, ranks).unwrap();
            for (d, peer) in ActiveNeighbors::for_send(&grid, do_receive, planes_only).iter() {
                sends.insert((rank, peer, d.index()));
            }
            for (d, peer) in ActiveNeighbors::for_receive(&grid, do_receive, planes_only).iter() {
                recvs.insert((peer, rank, d.opposite().index()));
            }
        }
        prop_assert_eq!(sends, recvs);
    }
}

#[test]
fn class_counts_of_interior_rank() {
    let grid = ProcessorGrid::new(1, 1, 1, 3).unwrap();
    let recv = ActiveNeighbors::for_receive(&grid, true, false);
    assert_eq!(recv.count_of(DirectionClass::Face), 6);
    assert_eq!(recv.count_of(DirectionClass::Edge), 12);
    assert_eq!(recv.count_of(DirectionClass::Corner), 8);
}

#[test]
fn peer_offsets_are_closed_form() {
    let grid = ProcessorGrid::new(1, 2, 3, 4).unwrap();
    let me = grid.rank();
    assert_eq!(me, 3 * 16 + 4 + 2);
    assert_eq!(grid.peer_rank(Direction::face(Axis::Plane, Side::Min)), Some(me - 16));
    assert_eq!(grid.peer_rank(Direction::face(Axis::Row, Side::Max)), Some(me + 4));
    assert_eq!(grid.peer_rank(Direction::face(Axis::Col, Side::Max)), Some(me + 1));
    let corner = Direction::new(Some(Side::Min), Some(Side::Min), Some(Side::Max)).unwrap();
    // plane 3 is the top of a 4-wide grid
    assert_eq!(grid.peer_rank(corner), None);
    let corner = Direction::new(Some(Side::Min), Some(Side::Min), Some(Side::Min)).unwrap();
    assert_eq!(grid.peer_rank(corner), Some(me - 16 - 4 - 1));
}

#[test]
fn bad_grids_are_rejected() {
    assert!(ProcessorGrid::from_rank(0, 9).is_err());
    assert!(ProcessorGrid::from_rank(8, 8).is_err());
    assert!(ProcessorGrid::new(2, 0, 0, 2).is_err());
}
