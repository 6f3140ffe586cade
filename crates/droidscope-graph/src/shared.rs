use std::sync::Arc;

use parking_lot::Mutex;

use crate::port::{CoverageSnapshot, GraphError, GraphPort};
use crate::vertex::{Vertex, VertexId};

/// A graph shared between the live log callback and the exploration loop.
///
/// Visitation and coverage reads go through one mutex. Use [`with_lock`]
/// when an update and the snapshot that follows it must be atomic.
///
/// [`with_lock`]: SharedGraph::with_lock
#[derive(Debug)]
pub struct SharedGraph<G> {
    inner: Arc<Mutex<G>>,
}

impl<G> Clone for SharedGraph<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: GraphPort> SharedGraph<G> {
    pub fn new(graph: G) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Run `f` while holding the graph lock.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut G) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Recover the graph if this is the last handle.
    pub fn try_unwrap(self) -> Result<G, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl<G: GraphPort> GraphPort for SharedGraph<G> {
    fn find_method_vertex(&self, signature: &str) -> Option<VertexId> {
        self.inner.lock().find_method_vertex(signature)
    }

    fn find_control_vertex(&self, owner: &str, control_id: i32) -> Option<VertexId> {
        self.inner.lock().find_control_vertex(owner, control_id)
    }

    fn add_vertex(&mut self, vertex: Vertex) -> VertexId {
        self.inner.lock().add_vertex(vertex)
    }

    fn add_edge(&mut self, from: VertexId, to: VertexId) -> Result<(), GraphError> {
        self.inner.lock().add_edge(from, to)
    }

    fn visit(&mut self, id: VertexId) -> Result<(), GraphError> {
        self.inner.lock().visit(id)
    }

    fn visits(&self, id: VertexId) -> Option<u32> {
        self.inner.lock().visits(id)
    }

    fn compute_coverage(&self) -> CoverageSnapshot {
        self.inner.lock().compute_coverage()
    }

    fn reset_visits(&mut self) {
        self.inner.lock().reset_visits()
    }
}
