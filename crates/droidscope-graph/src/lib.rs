pub mod graph;
pub mod port;
pub mod shared;
pub mod symbols;
pub mod vertex;

pub use graph::{Composition, InteractionGraph};
pub use port::{CoverageSnapshot, GraphError, GraphPort};
pub use shared::SharedGraph;
pub use symbols::{ClassIndex, SymbolTable};
pub use vertex::{ControlMeta, Vertex, VertexId, VertexKind};
