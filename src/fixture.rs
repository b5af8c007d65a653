//! Benchmark fixture: synthetic vertices registered once and shared read-only

use crate::coupling::CouplingInterface;
use crate::error::{BenchError, Result};
use crate::types::{AccessOrder, MeshHandle, VertexId};
use once_cell::unsync::OnceCell;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

/// Coordinates are drawn from `[0, COORDINATE_RANGE)`
pub const COORDINATE_RANGE: f64 = 100.0;

/// Vertices registered on one mesh, in registration order
#[derive(Debug, Clone)]
pub struct Fixture {
    mesh: MeshHandle,
    ids: Vec<VertexId>,
    positions: Vec<f64>,
    shuffle_seed: u64,
}

impl Fixture {
    /// Generate `entity_count` random 3-D positions from a generator seeded
    /// with `seed` and register them in one bulk call.
    ///
    /// Mutates the coupling session; never call inside a timed region.
    pub fn build<C>(
        coupling: &mut C,
        mesh_name: &str,
        entity_count: usize,
        seed: u64,
    ) -> Result<Self>
    where
        C: CouplingInterface + ?Sized,
    {
        Self::build_with(coupling, mesh_name, entity_count, &mut StdRng::seed_from_u64(seed))
    }

    /// Same as [`Fixture::build`], drawing from a caller-owned generator
    pub fn build_with<C>(
        coupling: &mut C,
        mesh_name: &str,
        entity_count: usize,
        rng: &mut StdRng,
    ) -> Result<Self>
    where
        C: CouplingInterface + ?Sized,
    {
        if entity_count == 0 {
            return Err(BenchError::InvalidConfig("fixture needs at least one entity".into()));
        }
        let dims = coupling.dimensions();

        let coordinate = Uniform::new(0.0, COORDINATE_RANGE);
        let positions: Vec<f64> = coordinate
            .sample_iter(&mut *rng)
            .take(entity_count * dims)
            .collect();
        let shuffle_seed = rng.gen();

        let mesh = coupling
            .resolve_mesh_handle(mesh_name)
            .map_err(BenchError::Setup)?;
        let ids = coupling
            .register_entities(mesh, &positions)
            .map_err(BenchError::Setup)?;

        if ids.len() != entity_count {
            return Err(BenchError::InvalidConfig(format!(
                "coupling returned {} ids for {} entities",
                ids.len(),
                entity_count
            )));
        }

        Ok(Self {
            mesh,
            ids,
            positions,
            shuffle_seed,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    pub fn ids(&self) -> &[VertexId] {
        &self.ids
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Ids in the order a timed loop should visit them.
    ///
    /// `Shuffled` is a permutation seeded when the fixture was built, so
    /// every variant of a run sees the same order.
    pub fn ids_in_order(&self, order: AccessOrder) -> Vec<VertexId> {
        let mut ids = self.ids.clone();
        if order == AccessOrder::Shuffled {
            let mut rng = StdRng::seed_from_u64(self.shuffle_seed);
            ids.shuffle(&mut rng);
        }
        ids
    }
}

/// Builds each fixture size at most once per cache.
///
/// One generator is seeded on creation and shared by every build.
pub struct FixtureCache {
    mesh_name: String,
    rng: StdRng,
    slots: HashMap<usize, OnceCell<Fixture>>,
    builds: usize,
}

impl FixtureCache {
    pub fn new(mesh_name: impl Into<String>, seed: u64) -> Self {
        Self {
            mesh_name: mesh_name.into(),
            rng: StdRng::seed_from_u64(seed),
            slots: HashMap::new(),
            builds: 0,
        }
    }

    /// Return the fixture of `entity_count` entities, building it on first use
    pub fn get_or_build<C>(&mut self, coupling: &mut C, entity_count: usize) -> Result<&Fixture>
    where
        C: CouplingInterface + ?Sized,
    {
        let mesh_name = &self.mesh_name;
        let rng = &mut self.rng;
        let builds = &mut self.builds;

        let slot = self.slots.entry(entity_count).or_default();
        slot.get_or_try_init(|| {
            let start = Instant::now();
            let fixture = Fixture::build_with(coupling, mesh_name, entity_count, rng)?;
            *builds += 1;
            info!(
                entities = entity_count,
                mesh = %mesh_name,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "fixture built"
            );
            Ok::<_, BenchError>(fixture)
        })
    }

    /// Number of fixtures actually constructed
    pub fn builds(&self) -> usize {
        self.builds
    }
}
