// benches/bench_select_working_set.rs
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use traffic_signal_network::simulation_engine::intersections::{GeoPosition, Intersection, IntersectionRegistry};
use traffic_signal_network::simulation_engine::state::WorkingSet;
use traffic_signal_network::simulation_engine::viewport::{select_working_set, Bounds};

// Intersections scattered over a one-degree square.
fn scattered_registry(count: u32) -> IntersectionRegistry {
    let mut rng = SmallRng::seed_from_u64(count as u64);
    let intersections = (1..=count)
        .map(|id| {
            let position = GeoPosition::new(rng.random_range(0.0..1.0), rng.random_range(0.0..1.0));
            Intersection::new(id, &format!("Junction {}", id), position, 100, rng.random_range(0..40), 50, [10; 24])
        })
        .collect();
    match IntersectionRegistry::new(intersections) {
        Ok(registry) => registry,
        Err(e) => panic!("benchmark registry is invalid: {}", e),
    }
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_working_set");
    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));

    let viewport = Bounds::new(0.6, 0.4, 0.6, 0.4);
    for &size in [12, 100, 1_000].iter() {
        let registry = scattered_registry(size);
        let previous = select_working_set(Some(&Bounds::new(0.55, 0.35, 0.55, 0.35)), &registry, &WorkingSet::default());
        group.bench_function(format!("registry_{}", size), |b| {
            b.iter(|| black_box(select_working_set(Some(black_box(&viewport)), &registry, &previous)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_select);
criterion_main!(benches);
