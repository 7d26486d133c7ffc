//! Graph node with per-neighbor edge sets.

use crate::GraphEdge;
use anno_types::GraphError;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

/// A node and its adjacency.
///
/// Edges are grouped by the neighbor at their other end. Several distinct edges to the same
/// neighbor share one ordered set. A loop edge is filed under the node's own key.
#[derive(Debug, Clone)]
pub struct Node<K, E, V = ()> {
    key: K,
    pub value: V,
    edges: BTreeMap<K, BTreeSet<E>>,
}

impl<K, E, V> Node<K, E, V>
where
    K: Ord + Copy + Debug,
    E: GraphEdge<K>,
{
    pub fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            edges: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> K {
        self.key
    }

    /// neighbor -> edges to that neighbor
    pub fn edges(&self) -> &BTreeMap<K, BTreeSet<E>> {
        &self.edges
    }

    pub fn edges_to(&self, neighbor: &K) -> Option<&BTreeSet<E>> {
        self.edges.get(neighbor)
    }

    pub fn neighbors(&self) -> impl Iterator<Item = K> + '_ {
        self.edges.keys().copied()
    }

    /// Number of edges touching this node, parallel edges counted separately.
    pub fn degree(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    pub fn is_isolated(&self) -> bool {
        self.edges.is_empty()
    }

    pub(crate) fn add_edge(&mut self, edge: E) -> Result<bool, GraphError> {
        let neighbor = edge.endpoints().other_key(self.key)?;
        Ok(self.edges.entry(neighbor).or_default().insert(edge))
    }

    pub(crate) fn remove_edge(&mut self, edge: &E) -> bool {
        let Ok(neighbor) = edge.endpoints().other_key(self.key) else {
            return false;
        };
        let Some(set) = self.edges.get_mut(&neighbor) else {
            return false;
        };
        let removed = set.remove(edge);
        if set.is_empty() {
            self.edges.remove(&neighbor);
        }
        removed
    }

    pub(crate) fn all_edges(&self) -> impl Iterator<Item = &E> + '_ {
        self.edges.values().flatten()
    }
}
