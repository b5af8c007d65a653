//! Error types for the harness and the coupling interface

use thiserror::Error;

/// Errors signalled by a coupling collaborator
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CouplingError {
    #[error("unknown mesh name: {0}")]
    UnknownMesh(String),

    #[error("unknown data name {data} on mesh {mesh}")]
    UnknownData { mesh: String, data: String },

    #[error("invalid mesh handle: {0}")]
    InvalidMesh(i32),

    #[error("invalid data handle: {0}")]
    InvalidData(i32),

    #[error("invalid vertex id {id} (mesh has {count} vertices)")]
    InvalidVertex { id: i32, count: usize },

    #[error("buffer size mismatch: expected {expected} values, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("operation not supported by this coupling interface: {0}")]
    Unsupported(&'static str),

    #[error("coupling configuration error: {0}")]
    Config(String),
}

/// Errors raised by the benchmark harness
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("setup failed: {0}")]
    Setup(#[source] CouplingError),

    #[error("variant {variant} failed at iteration {iteration}: {source}")]
    Variant {
        variant: String,
        iteration: u64,
        #[source]
        source: CouplingError,
    },

    #[error("invalid filter pattern: {0}")]
    Filter(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = BenchError> = std::result::Result<T, E>;
