//! Criterion run of the access-pattern matrix against the in-memory collaborator
//!
//! `cargo bench --bench write_patterns -- write_scalar` selects by name.

use coupling_bench::config::CouplingConfig;
use coupling_bench::variant::FieldNames;
use coupling_bench::{default_matrix, CouplingInterface, Fixture, InMemoryCoupling};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const SENTINEL: f64 = 3.14159;

fn bench_write_patterns(c: &mut Criterion) {
    let config = CouplingConfig {
        write_by_name: true,
        ..CouplingConfig::default()
    };
    let names = FieldNames {
        mesh: config.mesh.clone(),
        scalar: config.scalar_data.clone(),
        vector: config.vector_data.clone(),
    };

    let mut group = c.benchmark_group("write_patterns");
    for entities in [1_000usize, 100_000] {
        let mut coupling = InMemoryCoupling::new(&config).expect("in-memory session");
        let fixture =
            Fixture::build(&mut coupling, &config.mesh, entities, 0x5eed).expect("fixture");
        group.throughput(Throughput::Elements(entities as u64));

        for spec in default_matrix() {
            if spec.requires_write_by_name() && !coupling.supports_write_by_name() {
                continue;
            }
            let prepared = spec
                .prepare(&coupling, &names, fixture.ids(), SENTINEL)
                .expect("prepare");

            group.bench_function(BenchmarkId::new(spec.name.as_str(), entities), |b| {
                b.iter(|| prepared.iterate(&mut coupling).expect("iteration"))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_write_patterns);
criterion_main!(benches);
