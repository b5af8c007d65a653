//! Full-size scenario: one million vertices, scalar per-vertex writes

use coupling_bench::config::CouplingConfig;
use coupling_bench::types::ComponentCount;
use coupling_bench::variant::{FieldNames, KeyRepr, Resolution, Transfer};
use coupling_bench::{BenchConfig, CouplingInterface, Fixture, InMemoryCoupling, VariantSpec};

const ENTITIES: usize = 1_000_000;
const SENTINEL: f64 = 3.14159;

fn names() -> FieldNames {
    FieldNames {
        mesh: "MeshA".into(),
        scalar: "Scalar".into(),
        vector: "Vector".into(),
    }
}

#[test]
fn scalar_per_vertex_writes_at_full_size() {
    let mut coupling = InMemoryCoupling::new(&CouplingConfig::default()).unwrap();
    let fixture = Fixture::build(&mut coupling, "MeshA", ENTITIES, 42).unwrap();
    assert_eq!(fixture.len(), ENTITIES);
    assert_eq!(fixture.positions().len(), ENTITIES * 3);

    let cached = VariantSpec::new(
        ComponentCount::Scalar,
        Transfer::PerEntity,
        Resolution::Cached,
        KeyRepr::Stable,
    );
    let prepared = cached
        .prepare(&coupling, &names(), fixture.ids(), SENTINEL)
        .unwrap();
    coupling.reset_calls();
    prepared.iterate(&mut coupling).unwrap();

    let calls = coupling.calls();
    assert_eq!(calls.write_scalar_one, ENTITIES as u64);
    assert_eq!(calls.resolve_data, 0);
    assert_eq!(calls.resolve_mesh, 0);

    for key in [KeyRepr::Fresh, KeyRepr::Stable] {
        let every_call = VariantSpec::new(
            ComponentCount::Scalar,
            Transfer::PerEntity,
            Resolution::EveryCall,
            key,
        );
        let prepared = every_call
            .prepare(&coupling, &names(), fixture.ids(), SENTINEL)
            .unwrap();
        coupling.reset_calls();
        prepared.iterate(&mut coupling).unwrap();

        let calls = coupling.calls();
        assert_eq!(calls.write_scalar_one, ENTITIES as u64, "{}", every_call.name);
        assert_eq!(calls.resolve_data, ENTITIES as u64, "{}", every_call.name);
    }

    let mesh = coupling.resolve_mesh_handle("MeshA").unwrap();
    let data = coupling.resolve_data_handle("Scalar", mesh).unwrap();
    let values = coupling.values(data).unwrap();
    assert_eq!(values.len(), ENTITIES);
    assert!(values.iter().all(|&v| v == SENTINEL));
}

#[test]
fn config_file_drives_a_filtered_run() {
    let path = std::env::temp_dir().join(format!("coupling-bench-e2e-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{
            "fixture": { "entity_count": 200, "access_order": "shuffled" },
            "measurement": { "min_time_ms": 1, "max_iterations": 2 },
            "coupling": { "write_by_name": true },
            "selection": {
                "filter": "single_function$",
                "disabled": ["write_scalar_data_string_copy_single_function"]
            }
        }"#,
    )
    .unwrap();
    let config = BenchConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let mut coupling = InMemoryCoupling::new(&config.coupling).unwrap();
    let mut fixtures =
        coupling_bench::FixtureCache::new(&config.coupling.mesh, config.fixture.seed);
    let report = coupling_bench::run_benchmarks(&config, &mut coupling, &mut fixtures).unwrap();

    let names: Vec<_> = report.names().collect();
    assert_eq!(names, vec!["write_scalar_data_string_reference_single_function"]);
    assert_eq!(report.entity_count, 200);
    assert_eq!(report.results[0].timing.calls_per_iteration, 200);
}
