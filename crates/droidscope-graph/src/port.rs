//! The graph port consumed by trace replay, coverage recording and live
//! exploration.
//!
//! The graph itself is produced by static analysis of the application;
//! this crate only needs lookup, visitation and coverage ratios.

use serde::{Deserialize, Serialize};

use crate::vertex::{Vertex, VertexId};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Vertex not found: {0}")]
    UnknownVertex(VertexId),

    #[error("Graph JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Edge references unknown vertex ({from} -> {to})")]
    DanglingEdge { from: VertexId, to: VertexId },
}

/// Instantaneous coverage of the graph, both components in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoverageSnapshot {
    /// Percentage of control vertices visited.
    pub interaction: f64,
    /// Percentage of method vertices visited.
    pub method: f64,
}

impl CoverageSnapshot {
    pub fn new(interaction: f64, method: f64) -> Self {
        Self {
            interaction,
            method,
        }
    }

    /// Componentwise minimum.
    pub fn min(self, other: Self) -> Self {
        Self::new(
            self.interaction.min(other.interaction),
            self.method.min(other.method),
        )
    }

    /// Componentwise maximum.
    pub fn max(self, other: Self) -> Self {
        Self::new(
            self.interaction.max(other.interaction),
            self.method.max(other.method),
        )
    }
}

/// Operations the coverage core needs from an interaction graph.
///
/// All methods return owned values so the port can be implemented over a
/// lock (see [`crate::SharedGraph`]).
pub trait GraphPort {
    /// Exact-match lookup of a method vertex by signature.
    fn find_method_vertex(&self, signature: &str) -> Option<VertexId>;

    /// Exact-match lookup of a control vertex by owner class and control id.
    fn find_control_vertex(&self, owner: &str, control_id: i32) -> Option<VertexId>;

    /// Insert a vertex. Inserting a key that already exists returns the
    /// existing id and leaves the graph unchanged.
    fn add_vertex(&mut self, vertex: Vertex) -> VertexId;

    fn add_edge(&mut self, from: VertexId, to: VertexId) -> Result<(), GraphError>;

    fn visit(&mut self, id: VertexId) -> Result<(), GraphError>;

    /// Visit count of a vertex, `None` if the id is unknown.
    fn visits(&self, id: VertexId) -> Option<u32>;

    fn compute_coverage(&self) -> CoverageSnapshot;

    fn reset_visits(&mut self);
}
