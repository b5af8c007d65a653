//! Benchmark variants
//!
//! A variant is one point of the access-pattern matrix: how names are
//! resolved, how key text is passed, and how values are transferred. Every
//! variant runs through the same timed-loop template in
//! [`PreparedVariant::iterate`].

use crate::coupling::CouplingInterface;
use crate::error::{BenchError, CouplingError, Result};
use crate::types::{ComponentCount, DataHandle, VertexId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hint::black_box;

/// When mesh/data names are turned into handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Once, before timing
    Cached,
    /// Inside the timed loop, before every write call
    EveryCall,
    /// Inside the write call itself (combined name+write API)
    FoldedIntoWrite,
}

/// How the name text reaches the resolving call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRepr {
    /// A newly allocated string per call
    Fresh,
    /// A borrow of a string built before timing
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transfer {
    /// One call for all entities
    Bulk,
    /// One call per entity
    PerEntity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSpec {
    pub name: String,
    pub payload: ComponentCount,
    pub transfer: Transfer,
    pub resolution: Resolution,
    pub key: KeyRepr,
}

/// Names the variants resolve
#[derive(Debug, Clone)]
pub struct FieldNames {
    pub mesh: String,
    pub scalar: String,
    pub vector: String,
}

impl FieldNames {
    pub fn data(&self, payload: ComponentCount) -> &str {
        match payload {
            ComponentCount::Scalar => &self.scalar,
            ComponentCount::Vector => &self.vector,
        }
    }
}

impl VariantSpec {
    pub fn new(
        payload: ComponentCount,
        transfer: Transfer,
        resolution: Resolution,
        key: KeyRepr,
    ) -> Self {
        Self {
            name: Self::derived_name(payload, transfer, resolution, key),
            payload,
            transfer,
            resolution,
            key,
        }
    }

    /// Name following the `write_<api>[_string_<key>][_single_function]` scheme
    pub fn derived_name(
        payload: ComponentCount,
        transfer: Transfer,
        resolution: Resolution,
        key: KeyRepr,
    ) -> String {
        let base = match (transfer, payload) {
            (Transfer::Bulk, ComponentCount::Vector) => "write_block_vector",
            (Transfer::Bulk, ComponentCount::Scalar) => "write_block_scalar",
            (Transfer::PerEntity, ComponentCount::Vector) => "write_vector_data",
            (Transfer::PerEntity, ComponentCount::Scalar) => "write_scalar_data",
        };
        let key = match key {
            KeyRepr::Fresh => "_string_copy",
            KeyRepr::Stable => "_string_reference",
        };
        match resolution {
            Resolution::Cached => base.to_string(),
            Resolution::EveryCall => format!("{}{}", base, key),
            Resolution::FoldedIntoWrite => format!("{}{}_single_function", base, key),
        }
    }

    /// Reject axis combinations with no meaning
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(BenchError::InvalidConfig("variant name must not be empty".into()));
        }
        if self.resolution == Resolution::Cached && self.key == KeyRepr::Fresh {
            return Err(BenchError::InvalidConfig(format!(
                "{}: cached handles never pass key text inside the loop",
                self.name
            )));
        }
        if self.resolution == Resolution::FoldedIntoWrite
            && (self.transfer != Transfer::PerEntity || self.payload != ComponentCount::Scalar)
        {
            return Err(BenchError::InvalidConfig(format!(
                "{}: the combined name+write call only exists for single scalar values",
                self.name
            )));
        }
        Ok(())
    }

    pub fn requires_write_by_name(&self) -> bool {
        self.resolution == Resolution::FoldedIntoWrite
    }

    /// Write calls issued by one iteration over `entities` entities
    pub fn writes_per_iteration(&self, entities: usize) -> u64 {
        match self.transfer {
            Transfer::Bulk => 1,
            Transfer::PerEntity => entities as u64,
        }
    }

    /// Separate data-handle resolutions issued by one iteration
    pub fn resolutions_per_iteration(&self, entities: usize) -> u64 {
        match self.resolution {
            Resolution::Cached | Resolution::FoldedIntoWrite => 0,
            Resolution::EveryCall => self.writes_per_iteration(entities),
        }
    }

    /// Build the data buffer and, for cached variants, resolve handles.
    ///
    /// Everything here happens outside the timed region.
    pub fn prepare<'a, C>(
        &'a self,
        coupling: &C,
        names: &FieldNames,
        ids: &'a [VertexId],
        sentinel: f64,
    ) -> Result<PreparedVariant<'a>, CouplingError>
    where
        C: CouplingInterface + ?Sized,
    {
        let mesh_name = names.mesh.clone();
        let data_name = names.data(self.payload).to_string();

        let lookup = match self.resolution {
            Resolution::Cached => {
                let mesh = coupling.resolve_mesh_handle(&mesh_name)?;
                Lookup::Cached(coupling.resolve_data_handle(&data_name, mesh)?)
            }
            Resolution::EveryCall => Lookup::EveryCall(self.key),
            Resolution::FoldedIntoWrite => {
                if !coupling.supports_write_by_name() {
                    return Err(CouplingError::Unsupported("write_scalar_data_by_name"));
                }
                Lookup::Folded(self.key)
            }
        };

        Ok(PreparedVariant {
            spec: self,
            ids,
            buffer: vec![sentinel; ids.len() * self.payload.len()],
            mesh_name,
            data_name,
            lookup,
        })
    }
}

impl fmt::Display for VariantSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<52} {:<7} {:<11} {:<18} {:?}",
            self.name,
            self.payload.to_string(),
            format!("{:?}", self.transfer),
            format!("{:?}", self.resolution),
            self.key
        )
    }
}

/// The full access-pattern matrix, in registration order.
///
/// The two `single_function` variants need the combined name+write capability.
pub fn default_matrix() -> Vec<VariantSpec> {
    let lookups = [
        (Resolution::Cached, KeyRepr::Stable),
        (Resolution::EveryCall, KeyRepr::Fresh),
        (Resolution::EveryCall, KeyRepr::Stable),
    ];

    let mut variants = Vec::with_capacity(14);
    for payload in ComponentCount::all() {
        for transfer in [Transfer::Bulk, Transfer::PerEntity] {
            for (resolution, key) in lookups {
                variants.push(VariantSpec::new(payload, transfer, resolution, key));
            }
        }
    }
    for key in [KeyRepr::Fresh, KeyRepr::Stable] {
        variants.push(VariantSpec::new(
            ComponentCount::Scalar,
            Transfer::PerEntity,
            Resolution::FoldedIntoWrite,
            key,
        ));
    }
    variants
}

#[derive(Debug, Clone, Copy)]
enum Lookup {
    Cached(DataHandle),
    EveryCall(KeyRepr),
    Folded(KeyRepr),
}

/// A variant with its buffer and handles ready for timing
pub struct PreparedVariant<'a> {
    spec: &'a VariantSpec,
    ids: &'a [VertexId],
    buffer: Vec<f64>,
    mesh_name: String,
    data_name: String,
    lookup: Lookup,
}

impl<'a> PreparedVariant<'a> {
    pub fn spec(&self) -> &VariantSpec {
        self.spec
    }

    pub fn buffer(&self) -> &[f64] {
        &self.buffer
    }

    /// One timed iteration: exactly the work the variant's axes describe
    pub fn iterate<C>(&self, coupling: &mut C) -> Result<(), CouplingError>
    where
        C: CouplingInterface + ?Sized,
    {
        if let Lookup::Folded(key) = self.lookup {
            return self.write_each_by_name(coupling, key);
        }

        match (self.spec.transfer, self.spec.payload) {
            (Transfer::Bulk, ComponentCount::Vector) => {
                let data = self.data_handle(coupling)?;
                coupling.write_bulk_vector_data(data, self.ids, &self.buffer)
            }
            (Transfer::Bulk, ComponentCount::Scalar) => {
                let data = self.data_handle(coupling)?;
                coupling.write_bulk_scalar_data(data, self.ids, &self.buffer)
            }
            (Transfer::PerEntity, ComponentCount::Vector) => {
                for (&id, value) in self.ids.iter().zip(self.buffer.chunks_exact(3)) {
                    let data = self.data_handle(coupling)?;
                    coupling.write_vector_data_for_one(data, id, value)?;
                }
                Ok(())
            }
            (Transfer::PerEntity, ComponentCount::Scalar) => {
                for (&id, &value) in self.ids.iter().zip(&self.buffer) {
                    let data = self.data_handle(coupling)?;
                    coupling.write_scalar_data_for_one(data, id, value)?;
                }
                Ok(())
            }
        }
    }

    #[inline(always)]
    fn data_handle<C>(&self, coupling: &C) -> Result<DataHandle, CouplingError>
    where
        C: CouplingInterface + ?Sized,
    {
        match self.lookup {
            Lookup::Cached(data) => Ok(data),
            Lookup::EveryCall(KeyRepr::Fresh) => {
                let mesh_name = black_box(self.mesh_name.clone());
                let data_name = black_box(self.data_name.clone());
                let mesh = coupling.resolve_mesh_handle(&mesh_name)?;
                coupling.resolve_data_handle(&data_name, mesh)
            }
            Lookup::EveryCall(KeyRepr::Stable) => {
                let mesh = coupling.resolve_mesh_handle(&self.mesh_name)?;
                coupling.resolve_data_handle(&self.data_name, mesh)
            }
            Lookup::Folded(_) => Err(CouplingError::Unsupported(
                "separate handle for a folded lookup",
            )),
        }
    }

    fn write_each_by_name<C>(&self, coupling: &mut C, key: KeyRepr) -> Result<(), CouplingError>
    where
        C: CouplingInterface + ?Sized,
    {
        for (&id, &value) in self.ids.iter().zip(&self.buffer) {
            match key {
                KeyRepr::Fresh => {
                    let mesh_name = black_box(self.mesh_name.clone());
                    let data_name = black_box(self.data_name.clone());
                    coupling.write_scalar_data_by_name(&mesh_name, &data_name, id, value)?;
                }
                KeyRepr::Stable => {
                    coupling.write_scalar_data_by_name(
                        &self.mesh_name,
                        &self.data_name,
                        id,
                        value,
                    )?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CouplingConfig;
    use crate::coupling::{CallCounts, InMemoryCoupling};
    use crate::fixture::Fixture;
    use std::collections::HashSet;

    const SENTINEL: f64 = 3.14159;

    fn names() -> FieldNames {
        FieldNames {
            mesh: "MeshA".into(),
            scalar: "Scalar".into(),
            vector: "Vector".into(),
        }
    }

    fn setup(entities: usize, write_by_name: bool) -> (InMemoryCoupling, Fixture) {
        let config = CouplingConfig {
            write_by_name,
            ..CouplingConfig::default()
        };
        let mut coupling = InMemoryCoupling::new(&config).unwrap();
        let fixture = Fixture::build(&mut coupling, "MeshA", entities, 1).unwrap();
        coupling.reset_calls();
        (coupling, fixture)
    }

    fn one_iteration(spec: &VariantSpec, entities: usize) -> CallCounts {
        let (mut coupling, fixture) = setup(entities, true);
        let prepared = spec.prepare(&coupling, &names(), fixture.ids(), SENTINEL).unwrap();
        coupling.reset_calls();
        prepared.iterate(&mut coupling).unwrap();
        coupling.calls()
    }

    #[test]
    fn test_default_matrix() {
        let matrix = default_matrix();
        assert_eq!(matrix.len(), 14);
        assert_eq!(matrix.iter().filter(|v| v.requires_write_by_name()).count(), 2);

        let names: HashSet<_> = matrix.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names.len(), matrix.len());
        for expected in [
            "write_block_vector",
            "write_block_vector_string_copy",
            "write_vector_data_string_reference",
            "write_scalar_data",
            "write_scalar_data_string_reference_single_function",
        ] {
            assert!(names.contains(expected), "missing {}", expected);
        }
        assert!(matrix.iter().all(|v| v.validate().is_ok()));
    }

    #[test]
    fn test_validate_rejects_meaningless_combinations() {
        let folded_bulk = VariantSpec::new(
            ComponentCount::Scalar,
            Transfer::Bulk,
            Resolution::FoldedIntoWrite,
            KeyRepr::Stable,
        );
        assert!(folded_bulk.validate().is_err());

        let folded_vector = VariantSpec::new(
            ComponentCount::Vector,
            Transfer::PerEntity,
            Resolution::FoldedIntoWrite,
            KeyRepr::Fresh,
        );
        assert!(folded_vector.validate().is_err());

        let cached_fresh = VariantSpec::new(
            ComponentCount::Vector,
            Transfer::Bulk,
            Resolution::Cached,
            KeyRepr::Fresh,
        );
        assert!(cached_fresh.validate().is_err());
    }

    #[test]
    fn test_each_variant_issues_exactly_its_calls() {
        let entities = 64;
        for spec in default_matrix() {
            let calls = one_iteration(&spec, entities);

            assert_eq!(calls.writes(), spec.writes_per_iteration(entities), "{}", spec.name);
            assert_eq!(
                calls.resolve_data,
                spec.resolutions_per_iteration(entities),
                "{}",
                spec.name
            );
            assert_eq!(calls.resolve_mesh, calls.resolve_data, "{}", spec.name);
            assert_eq!(calls.register_entities, 0, "{}", spec.name);
        }
    }

    #[test]
    fn test_cached_resolves_only_in_prepare() {
        let (mut coupling, fixture) = setup(10, false);
        let spec = VariantSpec::new(
            ComponentCount::Scalar,
            Transfer::PerEntity,
            Resolution::Cached,
            KeyRepr::Stable,
        );
        let prepared = spec.prepare(&coupling, &names(), fixture.ids(), SENTINEL).unwrap();
        assert_eq!(coupling.calls().resolve_data, 1);

        coupling.reset_calls();
        for _ in 0..3 {
            prepared.iterate(&mut coupling).unwrap();
        }
        assert_eq!(coupling.calls().resolve_data, 0);
        assert_eq!(coupling.calls().write_scalar_one, 30);
    }

    #[test]
    fn test_buffer_sized_per_component() {
        let (coupling, fixture) = setup(20, false);
        for spec in default_matrix().iter().filter(|v| !v.requires_write_by_name()) {
            let prepared = spec.prepare(&coupling, &names(), fixture.ids(), SENTINEL).unwrap();
            assert_eq!(prepared.buffer().len(), 20 * spec.payload.len());
            assert!(prepared.buffer().iter().all(|&v| v == SENTINEL));
        }
    }

    #[test]
    fn test_values_reach_the_collaborator() {
        let (mut coupling, fixture) = setup(5, false);
        let spec = VariantSpec::new(
            ComponentCount::Vector,
            Transfer::PerEntity,
            Resolution::EveryCall,
            KeyRepr::Fresh,
        );
        let prepared = spec.prepare(&coupling, &names(), fixture.ids(), SENTINEL).unwrap();
        prepared.iterate(&mut coupling).unwrap();

        let mesh = coupling.resolve_mesh_handle("MeshA").unwrap();
        let data = coupling.resolve_data_handle("Vector", mesh).unwrap();
        assert!(coupling.values(data).unwrap().iter().all(|&v| v == SENTINEL));
    }

    #[test]
    fn test_folded_needs_capability() {
        let (coupling, fixture) = setup(5, false);
        let spec = VariantSpec::new(
            ComponentCount::Scalar,
            Transfer::PerEntity,
            Resolution::FoldedIntoWrite,
            KeyRepr::Stable,
        );
        assert!(matches!(
            spec.prepare(&coupling, &names(), fixture.ids(), SENTINEL),
            Err(CouplingError::Unsupported(_))
        ));
    }

    #[test]
    fn test_unknown_data_name_fails_every_call_variant() {
        let (mut coupling, fixture) = setup(5, false);
        let names = FieldNames {
            scalar: "Pressure".into(),
            ..names()
        };
        let spec = VariantSpec::new(
            ComponentCount::Scalar,
            Transfer::Bulk,
            Resolution::EveryCall,
            KeyRepr::Stable,
        );
        let prepared = spec.prepare(&coupling, &names, fixture.ids(), SENTINEL).unwrap();
        assert!(matches!(
            prepared.iterate(&mut coupling),
            Err(CouplingError::UnknownData { .. })
        ));
        assert_eq!(coupling.calls().write_bulk_scalar, 0);
    }
}
