//! Structure graph built from the local cache.

use crate::objects::{StructureLinkObj, StructureObj};
use anno_graph::Graph;
use anno_types::{GraphError, Keyed, StructureLinkKey};
use std::sync::Arc;

pub type StructureGraph = Graph<i64, StructureLinkKey, Arc<StructureObj>>;

/// Graph with one node per structure and one edge per link.
///
/// Links with an endpoint missing from `structures` are skipped with a warning, as are repeated
/// structures and links.
pub fn build_structure_graph(
    structures: &[Arc<StructureObj>],
    links: &[Arc<StructureLinkObj>],
) -> StructureGraph {
    let mut graph = StructureGraph::new();
    for structure in structures {
        if let Err(e) = graph.insert_node(structure.id(), Arc::clone(structure)) {
            tracing::debug!(error = %e, "skipping repeated structure");
        }
    }
    for link in links {
        match graph.add_edge(link.key()) {
            Ok(()) => {}
            Err(GraphError::EdgeExists(_)) => {
                tracing::debug!(link = %link.key(), "skipping repeated link");
            }
            Err(e) => tracing::warn!(link = %link.key(), error = %e, "link left out of graph"),
        }
    }
    graph
}
