//! FFI bindings for the coupling library's C API (libprecice, `precicec_*`)
//!
//! Linked by `build.rs` when the `native` feature is enabled.

use libc::{c_char, c_double, c_int};

#[link(name = "precice")]
extern "C" {
    pub fn precicec_createSolverInterface(
        participant_name: *const c_char,
        config_file_name: *const c_char,
        solver_process_index: c_int,
        solver_process_size: c_int,
    );
    pub fn precicec_finalize();
    pub fn precicec_getDimensions() -> c_int;

    // Mesh and data lookup
    pub fn precicec_hasMesh(mesh_name: *const c_char) -> c_int;
    pub fn precicec_getMeshID(mesh_name: *const c_char) -> c_int;
    pub fn precicec_hasData(data_name: *const c_char, mesh_id: c_int) -> c_int;
    pub fn precicec_getDataID(data_name: *const c_char, mesh_id: c_int) -> c_int;

    // Vertices
    pub fn precicec_setMeshVertices(
        mesh_id: c_int,
        size: c_int,
        positions: *const c_double,
        ids: *mut c_int,
    );

    // Writing
    pub fn precicec_writeBlockVectorData(
        data_id: c_int,
        size: c_int,
        value_indices: *const c_int,
        values: *const c_double,
    );
    pub fn precicec_writeVectorData(
        data_id: c_int,
        value_index: c_int,
        data_value: *const c_double,
    );
    pub fn precicec_writeBlockScalarData(
        data_id: c_int,
        size: c_int,
        value_indices: *const c_int,
        values: *const c_double,
    );
    pub fn precicec_writeScalarData(data_id: c_int, value_index: c_int, data_value: c_double);
}
