use serde::{Deserialize, Serialize};

pub type VertexId = u32;

/// Metadata carried by a control vertex.
///
/// Everything except `owner` and `control_id` is opaque to coverage
/// tracking; it is kept so graphs survive a load/save round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMeta {
    /// Fully-qualified name of the class that owns the control.
    pub owner: String,
    /// Resource id of the control within its owner.
    pub control_id: i32,
    pub label: String,
    /// Id of the enclosing container, -1 when unknown.
    pub parent_id: i32,
    pub text: String,
    /// Method signatures the control is known to trigger.
    #[serde(default)]
    pub targets: Vec<String>,
}

impl ControlMeta {
    /// Placeholder metadata for a control seen at runtime but absent
    /// from the static graph.
    pub fn placeholder(owner: &str, control_id: i32) -> Self {
        Self {
            owner: owner.to_string(),
            control_id,
            label: "Unknown".to_string(),
            parent_id: -1,
            text: "Unknown".to_string(),
            targets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VertexKind {
    /// Keyed by a signature such as `<com.example.Main: void onClick(android.view.View)>`.
    Method { signature: String },
    /// Keyed by `(owner, control_id)`.
    Control(ControlMeta),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub kind: VertexKind,
    /// Number of times the vertex was observed during the current run.
    #[serde(default)]
    pub visits: u32,
}

impl Vertex {
    pub fn method(signature: impl Into<String>) -> Self {
        Self {
            kind: VertexKind::Method {
                signature: signature.into(),
            },
            visits: 0,
        }
    }

    pub fn control(meta: ControlMeta) -> Self {
        Self {
            kind: VertexKind::Control(meta),
            visits: 0,
        }
    }

    pub fn is_visited(&self) -> bool {
        self.visits > 0
    }

    pub fn is_control(&self) -> bool {
        matches!(self.kind, VertexKind::Control(_))
    }

    /// Human-readable key, used in visit status listings.
    pub fn key(&self) -> String {
        match &self.kind {
            VertexKind::Method { signature } => signature.clone(),
            VertexKind::Control(meta) => format!("{}#{}", meta.owner, meta.control_id),
        }
    }
}
