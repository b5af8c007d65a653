//! Coupling interface backed by the library's C bindings
//!
//! The C API holds one process-wide solver interface, so at most one
//! `NativeCoupling` may exist per process. Configured mesh and data names are
//! checked once at creation; the library aborts the process on unknown names
//! passed later.

use super::{check_len, CouplingInterface};
use crate::config::CouplingConfig;
use crate::error::CouplingError;
use crate::ffi;
use crate::types::{DataHandle, MeshHandle, VertexId};
use libc::c_int;
use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

static CREATED: AtomicBool = AtomicBool::new(false);

pub struct NativeCoupling {
    dimensions: usize,
}

fn c_string(value: &str) -> Result<CString, CouplingError> {
    CString::new(value)
        .map_err(|_| CouplingError::Config(format!("name contains a NUL byte: {:?}", value)))
}

fn c_size(len: usize) -> Result<c_int, CouplingError> {
    c_int::try_from(len).map_err(|_| CouplingError::SizeMismatch {
        expected: c_int::MAX as usize,
        actual: len,
    })
}

impl NativeCoupling {
    pub fn new(config: &CouplingConfig) -> Result<Self, CouplingError> {
        let config_file = config
            .config_file
            .as_ref()
            .ok_or_else(|| {
                CouplingError::Config("native backend needs coupling.config_file".into())
            })?;
        if !config_file.exists() {
            return Err(CouplingError::Config(format!(
                "configuration file {} not found",
                config_file.display()
            )));
        }

        let participant = c_string(&config.participant)?;
        let file = c_string(&config_file.to_string_lossy())?;
        let rank = c_int::try_from(config.rank)
            .map_err(|_| CouplingError::Config("rank out of range".into()))?;
        let size = c_int::try_from(config.size)
            .map_err(|_| CouplingError::Config("size out of range".into()))?;

        if CREATED.swap(true, Ordering::SeqCst) {
            return Err(CouplingError::Config(
                "a native coupling session already exists in this process".into(),
            ));
        }

        unsafe {
            ffi::precicec_createSolverInterface(participant.as_ptr(), file.as_ptr(), rank, size);
        }

        let coupling = Self {
            dimensions: unsafe { ffi::precicec_getDimensions() } as usize,
        };
        if coupling.dimensions != 3 {
            return Err(CouplingError::Config(format!(
                "benchmarks need a 3-D configuration, got {} dimensions",
                coupling.dimensions
            )));
        }

        let mesh_name = c_string(&config.mesh)?;
        if unsafe { ffi::precicec_hasMesh(mesh_name.as_ptr()) } == 0 {
            return Err(CouplingError::UnknownMesh(config.mesh.clone()));
        }
        let mesh = unsafe { ffi::precicec_getMeshID(mesh_name.as_ptr()) };
        for data in [&config.scalar_data, &config.vector_data] {
            let name = c_string(data)?;
            if unsafe { ffi::precicec_hasData(name.as_ptr(), mesh) } == 0 {
                return Err(CouplingError::UnknownData {
                    mesh: config.mesh.clone(),
                    data: data.clone(),
                });
            }
        }

        info!(
            participant = %config.participant,
            config = %config_file.display(),
            "native coupling session created"
        );
        Ok(coupling)
    }
}

impl Drop for NativeCoupling {
    fn drop(&mut self) {
        unsafe { ffi::precicec_finalize() };
    }
}

impl CouplingInterface for NativeCoupling {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn resolve_mesh_handle(&self, name: &str) -> Result<MeshHandle, CouplingError> {
        let name = c_string(name)?;
        Ok(MeshHandle(unsafe { ffi::precicec_getMeshID(name.as_ptr()) }))
    }

    fn resolve_data_handle(
        &self,
        name: &str,
        mesh: MeshHandle,
    ) -> Result<DataHandle, CouplingError> {
        let name = c_string(name)?;
        Ok(DataHandle(unsafe { ffi::precicec_getDataID(name.as_ptr(), mesh.0) }))
    }

    fn register_entities(
        &mut self,
        mesh: MeshHandle,
        positions: &[f64],
    ) -> Result<Vec<VertexId>, CouplingError> {
        let count = positions.len() / self.dimensions;
        check_len(count * self.dimensions, positions.len())?;
        let size = c_size(count)?;

        let mut ids = vec![0 as VertexId; count];
        unsafe {
            ffi::precicec_setMeshVertices(mesh.0, size, positions.as_ptr(), ids.as_mut_ptr());
        }
        Ok(ids)
    }

    fn write_bulk_vector_data(
        &mut self,
        data: DataHandle,
        ids: &[VertexId],
        values: &[f64],
    ) -> Result<(), CouplingError> {
        check_len(ids.len() * self.dimensions, values.len())?;
        let size = c_size(ids.len())?;
        unsafe { ffi::precicec_writeBlockVectorData(data.0, size, ids.as_ptr(), values.as_ptr()) };
        Ok(())
    }

    fn write_bulk_scalar_data(
        &mut self,
        data: DataHandle,
        ids: &[VertexId],
        values: &[f64],
    ) -> Result<(), CouplingError> {
        check_len(ids.len(), values.len())?;
        let size = c_size(ids.len())?;
        unsafe { ffi::precicec_writeBlockScalarData(data.0, size, ids.as_ptr(), values.as_ptr()) };
        Ok(())
    }

    fn write_vector_data_for_one(
        &mut self,
        data: DataHandle,
        id: VertexId,
        value: &[f64],
    ) -> Result<(), CouplingError> {
        check_len(self.dimensions, value.len())?;
        unsafe { ffi::precicec_writeVectorData(data.0, id, value.as_ptr()) };
        Ok(())
    }

    fn write_scalar_data_for_one(
        &mut self,
        data: DataHandle,
        id: VertexId,
        value: f64,
    ) -> Result<(), CouplingError> {
        unsafe { ffi::precicec_writeScalarData(data.0, id, value) };
        Ok(())
    }
}
