//! Keyed adjacency graph for annotation links.
//!
//! Nodes are keyed by id; each node groups its edges by neighbor so parallel links between the
//! same two nodes stay distinct. Edge identity comes from the edge type's ordering, which for
//! the link keys in `anno_types` folds reversed bidirectional links together.

mod edge;
mod graph;
mod node;
mod path;

pub use anno_types::{EdgeKey, GraphError};
pub use edge::GraphEdge;
pub use graph::Graph;
pub use node::Node;
