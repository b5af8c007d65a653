//! Storage-only coupling collaborator
//!
//! Keeps mesh/data name tables and flat value buffers, validates every handle
//! and buffer length, and counts each call so tests can check exactly what a
//! benchmark variant issued. No mapping or communication happens here.

use super::{check_len, CouplingInterface};
use crate::config::CouplingConfig;
use crate::error::CouplingError;
use crate::types::{ComponentCount, DataHandle, MeshHandle, VertexId};
use std::cell::Cell;
use std::collections::HashMap;
use tracing::debug;

const DIMENSIONS: usize = 3;

/// Per-operation call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub resolve_mesh: u64,
    pub resolve_data: u64,
    pub register_entities: u64,
    pub write_bulk_vector: u64,
    pub write_bulk_scalar: u64,
    pub write_vector_one: u64,
    pub write_scalar_one: u64,
    pub write_scalar_by_name: u64,
}

impl CallCounts {
    /// Write calls of any kind
    pub fn writes(&self) -> u64 {
        self.write_bulk_vector
            + self.write_bulk_scalar
            + self.write_vector_one
            + self.write_scalar_one
            + self.write_scalar_by_name
    }
}

struct MeshStore {
    name: String,
    positions: Vec<f64>,
    data_lookup: HashMap<String, DataHandle>,
}

impl MeshStore {
    fn vertex_count(&self) -> usize {
        self.positions.len() / DIMENSIONS
    }
}

struct FieldStore {
    mesh: MeshHandle,
    components: ComponentCount,
    values: Vec<f64>,
}

/// In-process coupling collaborator.
///
/// Uses `Cell` counters, so it is `!Sync`; the harness is single-threaded.
pub struct InMemoryCoupling {
    participant: String,
    meshes: Vec<MeshStore>,
    mesh_lookup: HashMap<String, MeshHandle>,
    fields: Vec<FieldStore>,
    write_by_name: bool,
    calls: Cell<CallCounts>,
}

impl InMemoryCoupling {
    /// Create a session and declare the configured mesh with its scalar and vector fields
    pub fn new(config: &CouplingConfig) -> Result<Self, CouplingError> {
        if config.rank >= config.size {
            return Err(CouplingError::Config(format!(
                "rank {} out of range for size {}",
                config.rank, config.size
            )));
        }
        if let Some(path) = &config.config_file {
            if !path.exists() {
                return Err(CouplingError::Config(format!(
                    "configuration file {} not found",
                    path.display()
                )));
            }
        }

        let mut coupling = Self::empty(&config.participant);
        coupling.write_by_name = config.write_by_name;

        let mesh = coupling.declare_mesh(&config.mesh)?;
        coupling.declare_data(mesh, &config.scalar_data, ComponentCount::Scalar)?;
        coupling.declare_data(mesh, &config.vector_data, ComponentCount::Vector)?;

        debug!(
            participant = %coupling.participant,
            mesh = %config.mesh,
            "in-memory coupling session created"
        );
        Ok(coupling)
    }

    /// Session without any meshes
    pub fn empty(participant: &str) -> Self {
        Self {
            participant: participant.to_string(),
            meshes: Vec::new(),
            mesh_lookup: HashMap::new(),
            fields: Vec::new(),
            write_by_name: false,
            calls: Cell::new(CallCounts::default()),
        }
    }

    /// Toggle the combined name+write capability
    pub fn with_write_by_name(mut self, enabled: bool) -> Self {
        self.write_by_name = enabled;
        self
    }

    pub fn declare_mesh(&mut self, name: &str) -> Result<MeshHandle, CouplingError> {
        if self.mesh_lookup.contains_key(name) {
            return Err(CouplingError::Config(format!("mesh {} declared twice", name)));
        }
        let handle = MeshHandle(self.meshes.len() as i32);
        self.meshes.push(MeshStore {
            name: name.to_string(),
            positions: Vec::new(),
            data_lookup: HashMap::new(),
        });
        self.mesh_lookup.insert(name.to_string(), handle);
        Ok(handle)
    }

    pub fn declare_data(
        &mut self,
        mesh: MeshHandle,
        name: &str,
        components: ComponentCount,
    ) -> Result<DataHandle, CouplingError> {
        let handle = DataHandle(self.fields.len() as i32);
        let store = self.mesh_mut(mesh)?;
        if store.data_lookup.contains_key(name) {
            return Err(CouplingError::Config(format!(
                "data {} declared twice on mesh {}",
                name, store.name
            )));
        }
        store.data_lookup.insert(name.to_string(), handle);
        let len = store.vertex_count() * components.len();

        self.fields.push(FieldStore {
            mesh,
            components,
            values: vec![0.0; len],
        });
        Ok(handle)
    }

    /// Snapshot of the call counters
    pub fn calls(&self) -> CallCounts {
        self.calls.get()
    }

    pub fn reset_calls(&self) {
        self.calls.set(CallCounts::default());
    }

    pub fn vertex_count(&self, mesh: MeshHandle) -> Option<usize> {
        self.mesh(mesh).ok().map(MeshStore::vertex_count)
    }

    pub fn positions(&self, mesh: MeshHandle) -> Option<&[f64]> {
        self.mesh(mesh).ok().map(|m| m.positions.as_slice())
    }

    /// Stored values of a data field
    pub fn values(&self, data: DataHandle) -> Option<&[f64]> {
        self.field(data).ok().map(|f| f.values.as_slice())
    }

    #[inline(always)]
    fn bump(&self, update: impl FnOnce(&mut CallCounts)) {
        let mut counts = self.calls.get();
        update(&mut counts);
        self.calls.set(counts);
    }

    fn mesh(&self, mesh: MeshHandle) -> Result<&MeshStore, CouplingError> {
        usize::try_from(mesh.0)
            .ok()
            .and_then(|i| self.meshes.get(i))
            .ok_or(CouplingError::InvalidMesh(mesh.0))
    }

    fn mesh_mut(&mut self, mesh: MeshHandle) -> Result<&mut MeshStore, CouplingError> {
        usize::try_from(mesh.0)
            .ok()
            .and_then(|i| self.meshes.get_mut(i))
            .ok_or(CouplingError::InvalidMesh(mesh.0))
    }

    fn field(&self, data: DataHandle) -> Result<&FieldStore, CouplingError> {
        usize::try_from(data.0)
            .ok()
            .and_then(|i| self.fields.get(i))
            .ok_or(CouplingError::InvalidData(data.0))
    }

    /// Field of the expected kind, with the vertex count of its mesh
    fn field_mut(
        &mut self,
        data: DataHandle,
        components: ComponentCount,
    ) -> Result<(&mut FieldStore, usize), CouplingError> {
        let field = usize::try_from(data.0)
            .ok()
            .and_then(|i| self.fields.get_mut(i))
            .filter(|f| f.components == components)
            .ok_or(CouplingError::InvalidData(data.0))?;
        let count = field.values.len() / components.len();
        Ok((field, count))
    }

    #[inline(always)]
    fn slot(id: VertexId, count: usize) -> Result<usize, CouplingError> {
        usize::try_from(id)
            .ok()
            .filter(|&i| i < count)
            .ok_or(CouplingError::InvalidVertex { id, count })
    }

    /// Validate every id before anything is written, then hand out their slots
    fn slots(
        ids: &[VertexId],
        count: usize,
    ) -> Result<impl Iterator<Item = usize> + '_, CouplingError> {
        ids.iter().try_for_each(|&id| Self::slot(id, count).map(drop))?;
        Ok(ids.iter().map(|&id| id as usize))
    }

    fn write_scalar(
        &mut self,
        data: DataHandle,
        id: VertexId,
        value: f64,
    ) -> Result<(), CouplingError> {
        let (field, count) = self.field_mut(data, ComponentCount::Scalar)?;
        let slot = Self::slot(id, count)?;
        field.values[slot] = value;
        Ok(())
    }
}

impl CouplingInterface for InMemoryCoupling {
    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn resolve_mesh_handle(&self, name: &str) -> Result<MeshHandle, CouplingError> {
        self.bump(|c| c.resolve_mesh += 1);
        self.mesh_lookup
            .get(name)
            .copied()
            .ok_or_else(|| CouplingError::UnknownMesh(name.to_string()))
    }

    fn resolve_data_handle(
        &self,
        name: &str,
        mesh: MeshHandle,
    ) -> Result<DataHandle, CouplingError> {
        self.bump(|c| c.resolve_data += 1);
        let store = self.mesh(mesh)?;
        store
            .data_lookup
            .get(name)
            .copied()
            .ok_or_else(|| CouplingError::UnknownData {
                mesh: store.name.clone(),
                data: name.to_string(),
            })
    }

    fn register_entities(
        &mut self,
        mesh: MeshHandle,
        positions: &[f64],
    ) -> Result<Vec<VertexId>, CouplingError> {
        self.bump(|c| c.register_entities += 1);
        let count = positions.len() / DIMENSIONS;
        check_len(count * DIMENSIONS, positions.len())?;

        let store = self.mesh_mut(mesh)?;
        let first = store.vertex_count();
        let last = first + count;
        if last > i32::MAX as usize {
            return Err(CouplingError::Config(format!(
                "mesh {} would exceed {} vertices",
                store.name,
                i32::MAX
            )));
        }
        store.positions.extend_from_slice(positions);

        // Grow every field on this mesh to the new vertex count
        for field in self.fields.iter_mut().filter(|f| f.mesh == mesh) {
            field.values.resize(last * field.components.len(), 0.0);
        }

        Ok((first as VertexId..last as VertexId).collect())
    }

    fn write_bulk_vector_data(
        &mut self,
        data: DataHandle,
        ids: &[VertexId],
        values: &[f64],
    ) -> Result<(), CouplingError> {
        self.bump(|c| c.write_bulk_vector += 1);
        check_len(ids.len() * DIMENSIONS, values.len())?;
        let (field, count) = self.field_mut(data, ComponentCount::Vector)?;

        let slots = Self::slots(ids, count)?;
        for (slot, value) in slots.zip(values.chunks_exact(DIMENSIONS)) {
            let start = slot * DIMENSIONS;
            field.values[start..start + DIMENSIONS].copy_from_slice(value);
        }
        Ok(())
    }

    fn write_bulk_scalar_data(
        &mut self,
        data: DataHandle,
        ids: &[VertexId],
        values: &[f64],
    ) -> Result<(), CouplingError> {
        self.bump(|c| c.write_bulk_scalar += 1);
        check_len(ids.len(), values.len())?;
        let (field, count) = self.field_mut(data, ComponentCount::Scalar)?;

        let slots = Self::slots(ids, count)?;
        for (slot, &value) in slots.zip(values) {
            field.values[slot] = value;
        }
        Ok(())
    }

    fn write_vector_data_for_one(
        &mut self,
        data: DataHandle,
        id: VertexId,
        value: &[f64],
    ) -> Result<(), CouplingError> {
        self.bump(|c| c.write_vector_one += 1);
        check_len(DIMENSIONS, value.len())?;
        let (field, count) = self.field_mut(data, ComponentCount::Vector)?;
        let slot = Self::slot(id, count)? * DIMENSIONS;
        field.values[slot..slot + DIMENSIONS].copy_from_slice(value);
        Ok(())
    }

    fn write_scalar_data_for_one(
        &mut self,
        data: DataHandle,
        id: VertexId,
        value: f64,
    ) -> Result<(), CouplingError> {
        self.bump(|c| c.write_scalar_one += 1);
        self.write_scalar(data, id, value)
    }

    fn supports_write_by_name(&self) -> bool {
        self.write_by_name
    }

    fn write_scalar_data_by_name(
        &mut self,
        mesh_name: &str,
        data_name: &str,
        id: VertexId,
        value: f64,
    ) -> Result<(), CouplingError> {
        if !self.write_by_name {
            return Err(CouplingError::Unsupported("write_scalar_data_by_name"));
        }
        self.bump(|c| c.write_scalar_by_name += 1);

        let mesh = self
            .mesh_lookup
            .get(mesh_name)
            .copied()
            .ok_or_else(|| CouplingError::UnknownMesh(mesh_name.to_string()))?;
        let data = self
            .mesh(mesh)?
            .data_lookup
            .get(data_name)
            .copied()
            .ok_or_else(|| CouplingError::UnknownData {
                mesh: mesh_name.to_string(),
                data: data_name.to_string(),
            })?;
        self.write_scalar(data, id, value)
    }
}
