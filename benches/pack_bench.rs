use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use mesh_halo::algs::communicator::run_local_world;
use mesh_halo::algs::pack::{pack_fields, unpack_fields};
use mesh_halo::data::{BoundaryLayout, Extents, FieldAccess};
use mesh_halo::overlap::delta::AddDelta;
use mesh_halo::prelude::{ExchangeKind, HaloConfig, HaloExchange, RayonComm};
use mesh_halo::topology::{DIRECTIONS, DirectionClass};

fn random_field(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n).map(|_| rng.r#gen::<f64>()).collect()
}

// 1) Packing and summing one face/edge/corner of a node brick, 3 fields
fn bench_pack_unpack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack");
    for &n in &[16usize, 46, 91] {
        let e = Extents::cube(n).unwrap();
        let fields: Vec<Vec<f64>> = (0..3).map(|s| random_field(e.volume(), s)).collect();
        for class in [DirectionClass::Face, DirectionClass::Edge, DirectionClass::Corner] {
            // the column face is the fully scattered case
            let d = DIRECTIONS[class.first_index() + class.len() - 1];
            let layout = BoundaryLayout::new(d, e);
            let mut msg = vec![0.0; 3 * layout.element_count()];
            group.throughput(Throughput::Elements(msg.len() as u64));
            group.bench_with_input(BenchmarkId::new(format!("{class:?}"), n), &layout, |b, l| {
                let views: Vec<&dyn FieldAccess<f64>> =
                    fields.iter().map(|f| f as &dyn FieldAccess<f64>).collect();
                b.iter(|| pack_fields(l, &views, &mut msg).unwrap());
            });
        }
    }
    group.finish();

    let mut group = c.benchmark_group("unpack_sum");
    for &n in &[16usize, 46, 91] {
        let e = Extents::cube(n).unwrap();
        // column max face
        let d = DIRECTIONS[5];
        let layout = BoundaryLayout::new(d, e);
        let msg = random_field(3 * layout.element_count(), 9);
        let mut fields: Vec<Vec<f64>> = (0..3).map(|s| random_field(e.volume(), s)).collect();
        group.throughput(Throughput::Elements(msg.len() as u64));
        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            b.iter(|| {
                let mut views: Vec<&mut dyn FieldAccess<f64>> =
                    fields.iter_mut().map(|f| f as &mut dyn FieldAccess<f64>).collect();
                unpack_fields::<AddDelta, f64>(&layout, &msg, &mut views).unwrap()
            });
        });
    }
    group.finish();
}

// 2) A full nodal-sum round on an in-process 2x2x2 world
fn bench_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("round");
    group.sample_size(10);
    for &n in &[8usize, 24] {
        let nodes = Extents::cube(n + 1).unwrap();
        group.bench_function(BenchmarkId::new("nodal_sum_8_ranks", n), |b| {
            b.iter(|| {
                run_local_world(8, |comm: RayonComm| {
                    let mut ex: HaloExchange<RayonComm, f64> =
                        HaloExchange::from_comm(comm, nodes, HaloConfig::default()).unwrap();
                    let mut mass = vec![1.0; nodes.volume()];
                    ex.exchange_sum(ExchangeKind::NodalSum, &mut [&mut mass], nodes).unwrap();
                    mass[0]
                })
                .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pack_unpack, bench_round);
criterion_main!(benches);
