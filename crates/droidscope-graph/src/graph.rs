use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::port::{CoverageSnapshot, GraphError, GraphPort};
use crate::vertex::{Vertex, VertexId, VertexKind};

/// Vertex and edge counts, used to report how much a log merge enhanced
/// the static model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Composition {
    pub vertices: usize,
    pub methods: usize,
    pub controls: usize,
    pub edges: usize,
    /// Methods reached by an edge from a control.
    pub listeners: usize,
}

/// On-disk form of a graph. Indexes are rebuilt on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub edges: Vec<(VertexId, VertexId)>,
}

/// In-memory interaction graph with exact-match vertex indexes.
#[derive(Debug, Clone, Default)]
pub struct InteractionGraph {
    vertices: Vec<Vertex>,
    edges: Vec<(VertexId, VertexId)>,
    edge_set: HashSet<(VertexId, VertexId)>,
    methods: HashMap<String, VertexId>,
    controls: HashMap<(String, i32), VertexId>,
}

impl InteractionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from its document. Vertices repeating an earlier
    /// key collapse into it and their edges follow.
    pub fn from_document(doc: GraphDocument) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        let ids: Vec<VertexId> = doc
            .vertices
            .into_iter()
            .map(|vertex| graph.add_vertex(vertex))
            .collect();
        for (from, to) in doc.edges {
            match (ids.get(from as usize), ids.get(to as usize)) {
                (Some(&a), Some(&b)) => graph.add_edge(a, b)?,
                _ => return Err(GraphError::DanglingEdge { from, to }),
            }
        }
        Ok(graph)
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let doc: GraphDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            vertices: self.vertices.clone(),
            edges: self.edges.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id as usize)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[(VertexId, VertexId)] {
        &self.edges
    }

    pub fn has_edge(&self, from: VertexId, to: VertexId) -> bool {
        self.edge_set.contains(&(from, to))
    }

    pub fn composition(&self) -> Composition {
        let controls = self.vertices.iter().filter(|v| v.is_control()).count();
        let listeners: HashSet<VertexId> = self
            .edges
            .iter()
            .filter(|(from, to)| {
                self.vertices[*from as usize].is_control() && !self.vertices[*to as usize].is_control()
            })
            .map(|&(_, to)| to)
            .collect();
        Composition {
            vertices: self.vertices.len(),
            methods: self.vertices.len() - controls,
            controls,
            edges: self.edges.len(),
            listeners: listeners.len(),
        }
    }

    /// Every vertex key with its visit count, in insertion order.
    pub fn visit_status(&self) -> Vec<(String, u32)> {
        self.vertices.iter().map(|v| (v.key(), v.visits)).collect()
    }
}

fn percent(visited: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        visited as f64 / total as f64 * 100.0
    }
}

impl GraphPort for InteractionGraph {
    fn find_method_vertex(&self, signature: &str) -> Option<VertexId> {
        self.methods.get(signature).copied()
    }

    fn find_control_vertex(&self, owner: &str, control_id: i32) -> Option<VertexId> {
        self.controls.get(&(owner.to_string(), control_id)).copied()
    }

    fn add_vertex(&mut self, vertex: Vertex) -> VertexId {
        let existing = match &vertex.kind {
            VertexKind::Method { signature } => self.find_method_vertex(signature),
            VertexKind::Control(meta) => self.find_control_vertex(&meta.owner, meta.control_id),
        };
        if let Some(id) = existing {
            return id;
        }

        let id = self.vertices.len() as VertexId;
        match &vertex.kind {
            VertexKind::Method { signature } => {
                self.methods.insert(signature.clone(), id);
            }
            VertexKind::Control(meta) => {
                self.controls.insert((meta.owner.clone(), meta.control_id), id);
            }
        }
        self.vertices.push(vertex);
        id
    }

    fn add_edge(&mut self, from: VertexId, to: VertexId) -> Result<(), GraphError> {
        let len = self.vertices.len() as VertexId;
        if from >= len || to >= len {
            return Err(GraphError::DanglingEdge { from, to });
        }
        if self.edge_set.insert((from, to)) {
            self.edges.push((from, to));
        }
        Ok(())
    }

    fn visit(&mut self, id: VertexId) -> Result<(), GraphError> {
        let vertex = self
            .vertices
            .get_mut(id as usize)
            .ok_or(GraphError::UnknownVertex(id))?;
        vertex.visits = vertex.visits.saturating_add(1);
        Ok(())
    }

    fn visits(&self, id: VertexId) -> Option<u32> {
        self.vertex(id).map(|v| v.visits)
    }

    fn compute_coverage(&self) -> CoverageSnapshot {
        let (mut controls, mut controls_visited) = (0usize, 0usize);
        let (mut methods, mut methods_visited) = (0usize, 0usize);
        for vertex in &self.vertices {
            if vertex.is_control() {
                controls += 1;
                controls_visited += vertex.is_visited() as usize;
            } else {
                methods += 1;
                methods_visited += vertex.is_visited() as usize;
            }
        }
        CoverageSnapshot::new(
            percent(controls_visited, controls),
            percent(methods_visited, methods),
        )
    }

    fn reset_visits(&mut self) {
        for vertex in &mut self.vertices {
            vertex.visits = 0;
        }
    }
}
