//! Coupling library interface
//!
//! The harness only ever talks to the library through [`CouplingInterface`].
//! Implementations:
//! - [`InMemoryCoupling`]: name tables and flat value buffers, with call counting
//! - `NativeCoupling`: the library's C bindings (feature `native`)

mod in_memory;
#[cfg(feature = "native")]
mod native;

pub use in_memory::{CallCounts, InMemoryCoupling};
#[cfg(feature = "native")]
pub use native::NativeCoupling;

use crate::config::{Backend, CouplingConfig};
use crate::error::{BenchError, CouplingError};
use crate::types::{DataHandle, MeshHandle, VertexId};

/// Operations the benchmarks consume from a coupling library.
///
/// Buffers are checked against the expected length before anything is
/// written; a mismatch is reported as [`CouplingError::SizeMismatch`].
pub trait CouplingInterface {
    /// Spatial dimensions of every mesh
    fn dimensions(&self) -> usize {
        3
    }

    /// Resolve a mesh name. Repeated calls with the same name yield the same handle.
    fn resolve_mesh_handle(&self, name: &str) -> Result<MeshHandle, CouplingError>;

    /// Resolve a data-field name on a mesh.
    fn resolve_data_handle(&self, name: &str, mesh: MeshHandle)
        -> Result<DataHandle, CouplingError>;

    /// Register `positions.len() / dimensions()` vertices in one call.
    fn register_entities(
        &mut self,
        mesh: MeshHandle,
        positions: &[f64],
    ) -> Result<Vec<VertexId>, CouplingError>;

    /// `values.len()` must equal `ids.len() * 3`
    fn write_bulk_vector_data(
        &mut self,
        data: DataHandle,
        ids: &[VertexId],
        values: &[f64],
    ) -> Result<(), CouplingError>;

    /// `values.len()` must equal `ids.len()`
    fn write_bulk_scalar_data(
        &mut self,
        data: DataHandle,
        ids: &[VertexId],
        values: &[f64],
    ) -> Result<(), CouplingError>;

    /// `value.len()` must equal 3
    fn write_vector_data_for_one(
        &mut self,
        data: DataHandle,
        id: VertexId,
        value: &[f64],
    ) -> Result<(), CouplingError>;

    fn write_scalar_data_for_one(
        &mut self,
        data: DataHandle,
        id: VertexId,
        value: f64,
    ) -> Result<(), CouplingError>;

    /// Whether [`write_scalar_data_by_name`](Self::write_scalar_data_by_name) is available
    fn supports_write_by_name(&self) -> bool {
        false
    }

    /// Resolve both names and write one scalar in a single call
    fn write_scalar_data_by_name(
        &mut self,
        _mesh_name: &str,
        _data_name: &str,
        _id: VertexId,
        _value: f64,
    ) -> Result<(), CouplingError> {
        Err(CouplingError::Unsupported("write_scalar_data_by_name"))
    }
}

impl<C: CouplingInterface + ?Sized> CouplingInterface for Box<C> {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn resolve_mesh_handle(&self, name: &str) -> Result<MeshHandle, CouplingError> {
        (**self).resolve_mesh_handle(name)
    }

    fn resolve_data_handle(
        &self,
        name: &str,
        mesh: MeshHandle,
    ) -> Result<DataHandle, CouplingError> {
        (**self).resolve_data_handle(name, mesh)
    }

    fn register_entities(
        &mut self,
        mesh: MeshHandle,
        positions: &[f64],
    ) -> Result<Vec<VertexId>, CouplingError> {
        (**self).register_entities(mesh, positions)
    }

    fn write_bulk_vector_data(
        &mut self,
        data: DataHandle,
        ids: &[VertexId],
        values: &[f64],
    ) -> Result<(), CouplingError> {
        (**self).write_bulk_vector_data(data, ids, values)
    }

    fn write_bulk_scalar_data(
        &mut self,
        data: DataHandle,
        ids: &[VertexId],
        values: &[f64],
    ) -> Result<(), CouplingError> {
        (**self).write_bulk_scalar_data(data, ids, values)
    }

    fn write_vector_data_for_one(
        &mut self,
        data: DataHandle,
        id: VertexId,
        value: &[f64],
    ) -> Result<(), CouplingError> {
        (**self).write_vector_data_for_one(data, id, value)
    }

    fn write_scalar_data_for_one(
        &mut self,
        data: DataHandle,
        id: VertexId,
        value: f64,
    ) -> Result<(), CouplingError> {
        (**self).write_scalar_data_for_one(data, id, value)
    }

    fn supports_write_by_name(&self) -> bool {
        (**self).supports_write_by_name()
    }

    fn write_scalar_data_by_name(
        &mut self,
        mesh_name: &str,
        data_name: &str,
        id: VertexId,
        value: f64,
    ) -> Result<(), CouplingError> {
        (**self).write_scalar_data_by_name(mesh_name, data_name, id, value)
    }
}

/// Length check shared by every implementation
#[inline(always)]
pub(crate) fn check_len(expected: usize, actual: usize) -> Result<(), CouplingError> {
    if expected == actual {
        Ok(())
    } else {
        Err(CouplingError::SizeMismatch { expected, actual })
    }
}

/// Open the backend named in the config
pub fn open(config: &CouplingConfig) -> Result<Box<dyn CouplingInterface>, BenchError> {
    match config.backend {
        Backend::InMemory => {
            let coupling = InMemoryCoupling::new(config).map_err(BenchError::Setup)?;
            Ok(Box::new(coupling))
        }
        #[cfg(feature = "native")]
        Backend::Native => {
            let coupling = NativeCoupling::new(config).map_err(BenchError::Setup)?;
            Ok(Box::new(coupling))
        }
        #[cfg(not(feature = "native"))]
        Backend::Native => Err(BenchError::InvalidConfig(
            "native backend requested but the `native` feature is disabled".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_len() {
        assert!(check_len(3, 3).is_ok());
        assert_eq!(
            check_len(3, 2),
            Err(CouplingError::SizeMismatch { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn test_open_in_memory() {
        let config = CouplingConfig::default();
        let coupling = open(&config).unwrap();
        let mesh = coupling.resolve_mesh_handle("MeshA").unwrap();
        assert!(coupling.resolve_data_handle("Scalar", mesh).is_ok());
        assert!(!coupling.supports_write_by_name());
    }

    #[cfg(not(feature = "native"))]
    #[test]
    fn test_open_native_without_feature() {
        let config = CouplingConfig {
            backend: Backend::Native,
            ..CouplingConfig::default()
        };
        assert!(matches!(open(&config), Err(BenchError::InvalidConfig(_))));
    }
}
