//! Keyed graph: nodes by key plus a global ordered edge index.

use crate::{GraphEdge, Node};
use anno_types::GraphError;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

/// Graph over keys `K` with edges `E` and node payloads `V`.
///
/// Every edge in `edges` is also filed in the adjacency of both its endpoint nodes (once for a
/// loop). Edge identity is the edge type's `Ord`, so reversed spellings of a bidirectional
/// key collide.
#[derive(Debug, Clone)]
pub struct Graph<K, E, V = ()> {
    nodes: BTreeMap<K, Node<K, E, V>>,
    edges: BTreeSet<E>,
}

impl<K, E, V> Default for Graph<K, E, V> {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeSet::new(),
        }
    }
}

impl<K, E, V> Graph<K, E, V>
where
    K: Ord + Copy + Debug,
    E: GraphEdge<K> + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, key: &K) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn contains_edge(&self, edge: &E) -> bool {
        self.edges.contains(edge)
    }

    pub fn node(&self, key: &K) -> Option<&Node<K, E, V>> {
        self.nodes.get(key)
    }

    pub fn node_mut(&mut self, key: &K) -> Option<&mut Node<K, E, V>> {
        self.nodes.get_mut(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node<K, E, V>> + '_ {
        self.nodes.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.nodes.keys().copied()
    }

    /// Edges in canonical order.
    pub fn edges(&self) -> impl Iterator<Item = &E> + '_ {
        self.edges.iter()
    }

    pub(crate) fn require_node(&self, key: &K) -> Result<&Node<K, E, V>, GraphError> {
        self.nodes
            .get(key)
            .ok_or_else(|| GraphError::NodeNotFound(format!("{:?}", key)))
    }

    pub fn add_node(&mut self, node: Node<K, E, V>) -> Result<(), GraphError> {
        let key = node.key();
        if self.nodes.contains_key(&key) {
            return Err(GraphError::NodeExists(format!("{:?}", key)));
        }
        self.nodes.insert(key, node);
        Ok(())
    }

    /// Shorthand for `add_node(Node::new(key, value))`.
    pub fn insert_node(&mut self, key: K, value: V) -> Result<(), GraphError> {
        self.add_node(Node::new(key, value))
    }

    /// Add an edge between two existing nodes.
    pub fn add_edge(&mut self, edge: E) -> Result<(), GraphError> {
        let ends = edge.endpoints();
        let (source, target) = (ends.source(), ends.target());
        self.require_node(&source)?;
        self.require_node(&target)?;
        if self.edges.contains(&edge) {
            return Err(GraphError::EdgeExists(format!("{:?}", edge)));
        }

        if let Some(node) = self.nodes.get_mut(&source) {
            node.add_edge(edge.clone())?;
        }
        if source != target {
            if let Some(node) = self.nodes.get_mut(&target) {
                node.add_edge(edge.clone())?;
            }
        }
        self.edges.insert(edge);
        Ok(())
    }

    /// Remove an edge from both endpoints and the edge index. Returns the stored edge.
    pub fn remove_edge(&mut self, edge: &E) -> Result<E, GraphError> {
        let stored = self
            .edges
            .take(edge)
            .ok_or_else(|| GraphError::EdgeNotFound(format!("{:?}", edge)))?;
        let ends = stored.endpoints();
        for key in [ends.source(), ends.target()] {
            if let Some(node) = self.nodes.get_mut(&key) {
                node.remove_edge(&stored);
            }
        }
        Ok(stored)
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, key: &K) -> Result<Node<K, E, V>, GraphError> {
        let touching: Vec<E> = self.require_node(key)?.all_edges().cloned().collect();
        for edge in &touching {
            self.remove_edge(edge)?;
        }
        self.nodes
            .remove(key)
            .ok_or_else(|| GraphError::NodeNotFound(format!("{:?}", key)))
    }

    /// Edges touching `key`, empty for unknown keys.
    pub fn edges_of(&self, key: &K) -> Vec<&E> {
        self.nodes
            .get(key)
            .map(|n| n.all_edges().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anno_types::EdgeKey;

    type KeyGraph = Graph<i64, EdgeKey<i64>>;

    fn graph_with_nodes(keys: &[i64]) -> KeyGraph {
        let mut g = KeyGraph::new();
        for &k in keys {
            g.insert_node(k, ()).unwrap();
        }
        g
    }

    /// A physical link; several may join the same pair of nodes.
    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
    struct Synapse {
        key: EdgeKey<i64>,
        id: u32,
    }

    impl GraphEdge<i64> for Synapse {
        fn endpoints(&self) -> EdgeKey<i64> {
            self.key
        }
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let mut g = graph_with_nodes(&[1]);
        assert_eq!(
            g.insert_node(1, ()),
            Err(GraphError::NodeExists("1".to_string()))
        );
    }

    #[test]
    fn reversed_bidirectional_edge_is_duplicate() {
        let mut g = graph_with_nodes(&[1, 2]);
        g.add_edge(EdgeKey::new(1, 2, false)).unwrap();
        let err = g.add_edge(EdgeKey::new(2, 1, false)).unwrap_err();
        assert!(matches!(err, GraphError::EdgeExists(_)));
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn reversed_directional_edge_is_distinct() {
        let mut g = graph_with_nodes(&[1, 2]);
        g.add_edge(EdgeKey::directional(1, 2)).unwrap();
        g.add_edge(EdgeKey::directional(2, 1)).unwrap();
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.node(&1).unwrap().edges_to(&2).unwrap().len(), 2);
    }

    #[test]
    fn edge_needs_both_endpoints() {
        let mut g = graph_with_nodes(&[1]);
        let err = g.add_edge(EdgeKey::bidirectional(1, 2)).unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound("2".to_string()));
        assert_eq!(g.edge_count(), 0);
        assert!(g.node(&1).unwrap().is_isolated());
    }

    #[test]
    fn loop_is_filed_under_own_key() {
        let mut g = graph_with_nodes(&[5]);
        g.add_edge(EdgeKey::bidirectional(5, 5)).unwrap();
        let node = g.node(&5).unwrap();
        assert_eq!(node.neighbors().collect::<Vec<_>>(), vec![5]);
        assert_eq!(node.degree(), 1);
        g.remove_node(&5).unwrap();
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn parallel_edges_share_neighbor_set() {
        let mut g: Graph<i64, Synapse> = Graph::new();
        g.insert_node(1, ()).unwrap();
        g.insert_node(2, ()).unwrap();
        let key = EdgeKey::bidirectional(1, 2);
        g.add_edge(Synapse { key, id: 1 }).unwrap();
        g.add_edge(Synapse { key, id: 2 }).unwrap();
        assert!(g.add_edge(Synapse { key, id: 2 }).is_err());

        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.node(&2).unwrap().edges_to(&1).unwrap().len(), 2);
        assert_eq!(g.node(&1).unwrap().degree(), 2);
    }

    #[test]
    fn remove_missing_edge_fails() {
        let mut g = graph_with_nodes(&[1, 2]);
        let err = g.remove_edge(&EdgeKey::bidirectional(1, 2)).unwrap_err();
        assert!(matches!(err, GraphError::EdgeNotFound(_)));
    }

    #[test]
    fn remove_edge_clears_both_adjacencies() {
        let mut g = graph_with_nodes(&[1, 2]);
        g.add_edge(EdgeKey::bidirectional(2, 1)).unwrap();
        let removed = g.remove_edge(&EdgeKey::bidirectional(1, 2)).unwrap();
        assert_eq!(removed, EdgeKey::bidirectional(1, 2));
        assert!(g.node(&1).unwrap().is_isolated());
        assert!(g.node(&2).unwrap().is_isolated());
    }

    #[test]
    fn remove_node_drops_touching_edges() {
        let mut g = graph_with_nodes(&[1, 2, 3]);
        g.add_edge(EdgeKey::bidirectional(1, 2)).unwrap();
        g.add_edge(EdgeKey::directional(3, 2)).unwrap();
        g.add_edge(EdgeKey::directional(1, 3)).unwrap();

        g.remove_node(&2).unwrap();
        assert!(!g.contains_node(&2));
        assert_eq!(g.edges().collect::<Vec<_>>(), vec![&EdgeKey::directional(1, 3)]);
        assert!(g.node(&1).unwrap().edges_to(&2).is_none());
        assert!(g.node(&3).unwrap().edges_to(&2).is_none());
    }
}
