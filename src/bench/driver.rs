//! Variant registry and the sequential benchmark driver

use super::report::{Report, VariantResult};
use super::timing::run_adaptive;
use crate::config::{BenchConfig, MeasurementConfig, SelectionConfig};
use crate::coupling::CouplingInterface;
use crate::error::{BenchError, Result};
use crate::fixture::Fixture;
use crate::types::{AccessOrder, VertexId};
use crate::variant::{default_matrix, FieldNames, VariantSpec};
use regex::Regex;
use tracing::{debug, error, info, warn};

/// Registered variants, in run order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    variants: Vec<VariantSpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default matrix; combined name+write variants only when the
    /// collaborator has that capability
    pub fn with_default_matrix(supports_write_by_name: bool) -> Self {
        let mut registry = Self::new();
        for spec in default_matrix() {
            if spec.requires_write_by_name() && !supports_write_by_name {
                debug!(
                    variant = %spec.name,
                    "combined name+write call unavailable, not registered"
                );
                continue;
            }
            // Matrix entries are valid and uniquely named
            registry.variants.push(spec);
        }
        registry
    }

    pub fn register(&mut self, spec: VariantSpec) -> Result<()> {
        spec.validate()?;
        if self.variants.iter().any(|v| v.name == spec.name) {
            return Err(BenchError::InvalidConfig(format!(
                "variant {} registered twice",
                spec.name
            )));
        }
        self.variants.push(spec);
        Ok(())
    }

    pub fn variants(&self) -> &[VariantSpec] {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Selects variants by name
#[derive(Debug, Clone, Default)]
pub struct VariantFilter {
    include: Option<Regex>,
    enabled: Vec<String>,
    disabled: Vec<String>,
}

impl VariantFilter {
    pub fn new(include: Option<&str>, enabled: Vec<String>, disabled: Vec<String>) -> Result<Self> {
        let include = include.map(Regex::new).transpose()?;
        Ok(Self {
            include,
            enabled,
            disabled,
        })
    }

    pub fn from_config(selection: &SelectionConfig) -> Result<Self> {
        Self::new(
            selection.filter.as_deref(),
            selection.enabled.clone(),
            selection.disabled.clone(),
        )
    }

    /// Everything passes
    pub fn all() -> Self {
        Self::default()
    }

    pub fn allows(&self, name: &str) -> bool {
        if !self.enabled.is_empty() && !self.enabled.iter().any(|n| n == name) {
            return false;
        }
        if self.disabled.iter().any(|n| n == name) {
            return false;
        }
        self.include.as_ref().map_or(true, |re| re.is_match(name))
    }
}

/// Runs variants one at a time against a shared fixture
pub struct Driver {
    measurement: MeasurementConfig,
    names: FieldNames,
    sentinel: f64,
    access_order: AccessOrder,
}

impl Driver {
    pub fn new(
        measurement: MeasurementConfig,
        names: FieldNames,
        sentinel: f64,
        access_order: AccessOrder,
    ) -> Self {
        Self {
            measurement,
            names,
            sentinel,
            access_order,
        }
    }

    pub fn from_config(config: &BenchConfig) -> Self {
        Self::new(
            config.measurement.clone(),
            FieldNames {
                mesh: config.coupling.mesh.clone(),
                scalar: config.coupling.scalar_data.clone(),
                vector: config.coupling.vector_data.clone(),
            },
            config.fixture.sentinel,
            config.fixture.access_order,
        )
    }

    /// Run every registered variant the filter allows, in registration order.
    ///
    /// The first failure aborts the whole run.
    pub fn run_all<C>(
        &self,
        registry: &Registry,
        coupling: &mut C,
        fixture: &Fixture,
        filter: &VariantFilter,
    ) -> Result<Report>
    where
        C: CouplingInterface + ?Sized,
    {
        let ids = fixture.ids_in_order(self.access_order);
        let mut report = Report::new(fixture.len(), self.access_order);

        for spec in registry.variants() {
            if !filter.allows(&spec.name) {
                debug!(variant = %spec.name, "skipped by filter");
                continue;
            }
            let result = self.run_variant(spec, coupling, &ids)?;
            report.results.push(result);
        }

        if report.results.is_empty() {
            warn!("no variant matched the selection");
        }
        Ok(report)
    }

    /// Prepare one variant outside the timed region, then time it
    pub fn run_variant<C>(
        &self,
        spec: &VariantSpec,
        coupling: &mut C,
        ids: &[VertexId],
    ) -> Result<VariantResult>
    where
        C: CouplingInterface + ?Sized,
    {
        let variant_error = |iteration, source| BenchError::Variant {
            variant: spec.name.clone(),
            iteration,
            source,
        };

        let prepared = spec
            .prepare(&*coupling, &self.names, ids, self.sentinel)
            .map_err(|source| variant_error(0, source))?;

        info!(variant = %spec.name, entities = ids.len(), "running");
        let timing = run_adaptive(
            &spec.name,
            &self.measurement,
            spec.writes_per_iteration(ids.len()),
            |iteration| {
                prepared
                    .iterate(coupling)
                    .map_err(|source| variant_error(iteration, source))
            },
        )
        .map_err(|e| {
            error!(variant = %spec.name, error = %e, "variant failed");
            e
        })?;

        info!(
            variant = %spec.name,
            iterations = timing.iterations,
            avg_ns = timing.avg_ns,
            ns_per_call = timing.ns_per_call,
            "done"
        );
        Ok(VariantResult {
            variant: spec.clone(),
            timing,
        })
    }
}
