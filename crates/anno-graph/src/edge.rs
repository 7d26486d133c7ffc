//! Edge trait for graph members.

use anno_types::{EdgeKey, LinkKey, LocationLinkKey, PermittedStructureLinkKey, StructureLinkKey};

/// An edge stored in a [`Graph`](crate::Graph).
///
/// `Ord` decides identity inside the graph: two edges that compare equal are the same edge and
/// cannot both be added. Edge types that carry more than a key (parallel physical links between
/// the same pair of nodes) must order on that extra data too.
pub trait GraphEdge<K>: Ord + Clone {
    /// Canonical endpoints and direction of the edge.
    fn endpoints(&self) -> EdgeKey<K>;
}

impl<K: Ord + Copy> GraphEdge<K> for EdgeKey<K> {
    fn endpoints(&self) -> EdgeKey<K> {
        *self
    }
}

impl GraphEdge<i64> for StructureLinkKey {
    fn endpoints(&self) -> EdgeKey<i64> {
        self.edge_key()
    }
}

impl GraphEdge<i64> for LocationLinkKey {
    fn endpoints(&self) -> EdgeKey<i64> {
        self.edge_key()
    }
}

impl GraphEdge<i64> for PermittedStructureLinkKey {
    fn endpoints(&self) -> EdgeKey<i64> {
        self.edge_key()
    }
}
