//! Coupling Bench
//!
//! Micro-benchmarks for the call overhead of coupling-library API patterns:
//! resolving mesh/data names on every call vs. caching handles, bulk vs.
//! per-vertex writes, fresh vs. borrowed key strings.
//!
//! ## Architecture
//! - Coupling: the library as a trait, with in-memory and C-binding backends
//! - Fixture: random vertices registered once, shared read-only
//! - Variant: the access-pattern matrix and its timed-loop template
//! - Bench: adaptive timing, registry, filtering and reports

pub mod bench;
pub mod config;
pub mod coupling;
pub mod error;
#[cfg(feature = "native")]
pub mod ffi;
pub mod fixture;
pub mod telemetry;
pub mod types;
pub mod variant;

pub use bench::{BenchResult, Driver, Registry, Report, VariantFilter};
pub use config::BenchConfig;
pub use coupling::{CouplingInterface, InMemoryCoupling};
pub use error::{BenchError, CouplingError, Result};
pub use fixture::{Fixture, FixtureCache};
pub use variant::{default_matrix, VariantSpec};

use tracing::{info, warn};

/// Build (or reuse) the fixture, register the matrix and run every selected variant
pub fn run_benchmarks<C>(
    config: &BenchConfig,
    coupling: &mut C,
    fixtures: &mut FixtureCache,
) -> Result<Report>
where
    C: CouplingInterface + ?Sized,
{
    config.validate()?;
    let filter = VariantFilter::from_config(&config.selection)?;
    let registry = Registry::with_default_matrix(coupling.supports_write_by_name());

    // A selection that matches nothing must not touch the session
    if !registry.variants().iter().any(|spec| filter.allows(&spec.name)) {
        warn!("no variant matched the selection");
        return Ok(Report::new(
            config.fixture.entity_count,
            config.fixture.access_order,
        ));
    }

    let fixture = fixtures.get_or_build(coupling, config.fixture.entity_count)?;
    info!(
        variants = registry.len(),
        entities = fixture.len(),
        "starting benchmark run"
    );

    let report = Driver::from_config(config).run_all(&registry, coupling, fixture, &filter)?;

    for violation in report.ordering_violations() {
        warn!(payload = %violation.payload, "unexpected ordering: {}", violation);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_benchmarks_small() {
        let mut config = BenchConfig::default();
        config.fixture.entity_count = 16;
        config.measurement.min_time_ms = 1;
        config.measurement.max_iterations = 2;
        config.selection.filter = Some("^write_block".into());

        let mut coupling = InMemoryCoupling::new(&config.coupling).unwrap();
        let mut fixtures = FixtureCache::new(&config.coupling.mesh, config.fixture.seed);
        let report = run_benchmarks(&config, &mut coupling, &mut fixtures).unwrap();

        assert_eq!(report.results.len(), 6);
        assert!(report.names().all(|n| n.starts_with("write_block")));

        // Second run reuses the fixture
        run_benchmarks(&config, &mut coupling, &mut fixtures).unwrap();
        assert_eq!(fixtures.builds(), 1);
    }

    #[test]
    fn test_invalid_config_fails_before_setup() {
        let mut config = BenchConfig::default();
        config.fixture.entity_count = 0;

        let mut coupling = InMemoryCoupling::new(&config.coupling).unwrap();
        let mut fixtures = FixtureCache::new("MeshA", 1);
        assert!(run_benchmarks(&config, &mut coupling, &mut fixtures).is_err());
        assert_eq!(coupling.calls().register_entities, 0);
    }

    #[test]
    fn test_empty_selection_leaves_session_untouched() {
        let mut config = BenchConfig::default();
        config.fixture.entity_count = 10;
        config.selection.filter = Some("^nomatch$".into());

        let mut coupling = InMemoryCoupling::new(&config.coupling).unwrap();
        let mut fixtures = FixtureCache::new("MeshA", 1);
        let report = run_benchmarks(&config, &mut coupling, &mut fixtures).unwrap();

        assert!(report.results.is_empty());
        assert_eq!(report.entity_count, 10);
        assert_eq!(coupling.calls().register_entities, 0);
        assert_eq!(coupling.calls().writes(), 0);
        assert_eq!(fixtures.builds(), 0);
    }
}
