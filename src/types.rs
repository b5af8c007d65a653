//! Core types shared by the harness and the coupling interface

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vertex identifier handed out by the coupling library
pub type VertexId = i32;

/// Opaque mesh handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub(crate) i32);

impl MeshHandle {
    pub fn raw(self) -> i32 {
        self.0
    }
}

/// Opaque data-field handle, scoped to a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataHandle(pub(crate) i32);

impl DataHandle {
    pub fn raw(self) -> i32 {
        self.0
    }
}

/// Number of values stored per vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCount {
    Scalar,
    Vector,
}

impl ComponentCount {
    pub fn len(self) -> usize {
        match self {
            ComponentCount::Scalar => 1,
            ComponentCount::Vector => 3,
        }
    }

    pub fn all() -> [Self; 2] {
        [Self::Vector, Self::Scalar]
    }
}

impl fmt::Display for ComponentCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentCount::Scalar => write!(f, "scalar"),
            ComponentCount::Vector => write!(f, "vector"),
        }
    }
}

/// Order in which vertex ids are visited inside a timed loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOrder {
    /// Registration order
    #[default]
    Sequential,
    /// Seeded permutation, fixed before timing starts
    Shuffled,
}

impl fmt::Display for AccessOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessOrder::Sequential => write!(f, "sequential"),
            AccessOrder::Shuffled => write!(f, "shuffled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_len() {
        assert_eq!(ComponentCount::Scalar.len(), 1);
        assert_eq!(ComponentCount::Vector.len(), 3);
    }

    #[test]
    fn test_access_order_serde() {
        let order: AccessOrder = serde_json::from_str("\"shuffled\"").unwrap();
        assert_eq!(order, AccessOrder::Shuffled);
        assert_eq!(AccessOrder::default(), AccessOrder::Sequential);
    }
}
