//! Reachability and path queries.
//!
//! Travel rule: a directional edge may only be walked from its source to its target. A node's
//! neighbor is reachable if any of the parallel edges to it may be walked.

use crate::{Graph, GraphEdge, Node};
use anno_types::GraphError;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Debug;

impl<K, E, V> Graph<K, E, V>
where
    K: Ord + Copy + Debug,
    E: GraphEdge<K> + Debug,
{
    /// Neighbors of `from` that can be entered by walking an edge, loops excluded.
    fn travel_targets(&self, from: &Node<K, E, V>) -> Vec<K> {
        let key = from.key();
        from.edges()
            .iter()
            .filter(|(neighbor, edges)| {
                **neighbor != key && edges.iter().any(|e| e.endpoints().can_travel_from(key))
            })
            .map(|(neighbor, _)| *neighbor)
            .collect()
    }

    /// Every node connected to `root` by any number of edges, direction ignored.
    pub fn connected_nodes(&self, root: &K) -> Result<BTreeSet<K>, GraphError> {
        self.require_node(root)?;
        let mut seen = BTreeSet::from([*root]);
        let mut queue = VecDeque::from([*root]);
        while let Some(current) = queue.pop_front() {
            let Some(node) = self.node(&current) else { continue };
            for neighbor in node.neighbors() {
                if seen.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        Ok(seen)
    }

    /// Fewest-hop path from `origin` to `destination`, both included.
    pub fn shortest_path(&self, origin: &K, destination: &K) -> Result<Option<Vec<K>>, GraphError> {
        self.require_node(destination)?;
        self.shortest_path_to(origin, |n| n.key() == *destination)
    }

    /// Fewest-hop path from `origin` to the nearest node matching `is_match`.
    /// `origin` itself is tested first.
    pub fn shortest_path_to<F>(&self, origin: &K, is_match: F) -> Result<Option<Vec<K>>, GraphError>
    where
        F: Fn(&Node<K, E, V>) -> bool,
    {
        let start = self.require_node(origin)?;
        if is_match(start) {
            return Ok(Some(vec![*origin]));
        }
        Ok(self.search(*origin, |_, _| true, |n| is_match(n)))
    }

    /// Matching nodes reachable from `origin` without passing through another match.
    pub fn find_reachable_matches<F>(&self, origin: &K, is_match: F) -> Result<BTreeSet<K>, GraphError>
    where
        F: Fn(&Node<K, E, V>) -> bool,
    {
        let start = self.require_node(origin)?;
        let mut matches = BTreeSet::new();
        if is_match(start) {
            matches.insert(*origin);
            return Ok(matches);
        }

        let mut seen = BTreeSet::from([*origin]);
        let mut queue = VecDeque::from([*origin]);
        while let Some(current) = queue.pop_front() {
            let Some(node) = self.node(&current) else { continue };
            for next in self.travel_targets(node) {
                if !seen.insert(next) {
                    continue;
                }
                let Some(next_node) = self.node(&next) else { continue };
                if is_match(next_node) {
                    matches.insert(next);
                } else {
                    queue.push_back(next);
                }
            }
        }
        Ok(matches)
    }

    /// A path leaving `origin` and coming back to it without stepping straight back over an
    /// edge to the neighbor it left through. The returned path starts and ends with `origin`.
    pub fn find_cycle(&self, origin: &K) -> Result<Option<Vec<K>>, GraphError> {
        let start = self.require_node(origin)?;
        let first_hops = self.travel_targets(start);
        if start.neighbors().filter(|k| k != origin).count() <= 1 {
            return Ok(None);
        }

        for first in first_hops {
            let found = self.search(
                first,
                |from, to| !(from == first && to == *origin),
                |n| n.key() == *origin,
            );
            if let Some(rest) = found {
                let mut path = Vec::with_capacity(rest.len() + 1);
                path.push(*origin);
                path.extend(rest);
                tracing::trace!(origin = ?origin, len = path.len(), "cycle found");
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Breadth-first search from `origin` (not itself tested) to the first node matching
    /// `is_match`, walking only steps allowed by `can_step`.
    fn search<S, M>(&self, origin: K, can_step: S, is_match: M) -> Option<Vec<K>>
    where
        S: Fn(K, K) -> bool,
        M: Fn(&Node<K, E, V>) -> bool,
    {
        let mut previous: BTreeMap<K, K> = BTreeMap::new();
        let mut seen = BTreeSet::from([origin]);
        let mut queue = VecDeque::from([origin]);

        while let Some(current) = queue.pop_front() {
            let Some(node) = self.node(&current) else { continue };
            for next in self.travel_targets(node) {
                if !can_step(current, next) {
                    continue;
                }
                let Some(next_node) = self.node(&next) else { continue };
                if is_match(next_node) {
                    previous.insert(next, current);
                    return Some(Self::unwind(&previous, origin, next));
                }
                if seen.insert(next) {
                    previous.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    fn unwind(previous: &BTreeMap<K, K>, origin: K, end: K) -> Vec<K> {
        let mut path = vec![end];
        let mut current = end;
        while current != origin {
            match previous.get(&current) {
                Some(&p) => {
                    path.push(p);
                    current = p;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use crate::Graph;
    use anno_types::EdgeKey;

    fn build(nodes: &[i64], edges: &[EdgeKey<i64>]) -> Graph<i64, EdgeKey<i64>> {
        let mut g = Graph::new();
        for &n in nodes {
            g.insert_node(n, ()).unwrap();
        }
        for &e in edges {
            g.add_edge(e).unwrap();
        }
        g
    }

    #[test]
    fn connected_nodes_ignores_direction() {
        let g = build(
            &[1, 2, 3, 4],
            &[EdgeKey::directional(2, 1), EdgeKey::bidirectional(2, 3)],
        );
        assert_eq!(
            g.connected_nodes(&1).unwrap().into_iter().collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn shortest_path_prefers_fewest_hops() {
        let g = build(
            &[1, 2, 3, 4, 5],
            &[
                EdgeKey::bidirectional(1, 2),
                EdgeKey::bidirectional(2, 3),
                EdgeKey::bidirectional(3, 5),
                EdgeKey::bidirectional(1, 4),
                EdgeKey::bidirectional(4, 5),
            ],
        );
        assert_eq!(g.shortest_path(&1, &5).unwrap(), Some(vec![1, 4, 5]));
        assert_eq!(g.shortest_path(&3, &3).unwrap(), Some(vec![3]));
    }

    #[test]
    fn shortest_path_honors_direction() {
        let g = build(&[1, 2], &[EdgeKey::directional(2, 1)]);
        assert_eq!(g.shortest_path(&1, &2).unwrap(), None);
        assert_eq!(g.shortest_path(&2, &1).unwrap(), Some(vec![2, 1]));
    }

    #[test]
    fn unknown_origin_is_an_error() {
        let g = build(&[1], &[]);
        assert!(g.shortest_path(&9, &1).is_err());
        assert!(g.connected_nodes(&9).is_err());
        assert!(g.find_cycle(&9).is_err());
    }

    #[test]
    fn reachable_matches_stop_at_first_match() {
        // 1 - 2(match) - 3(match), 1 - 4 - 5(match)
        let g = build(
            &[1, 2, 3, 4, 5],
            &[
                EdgeKey::bidirectional(1, 2),
                EdgeKey::bidirectional(2, 3),
                EdgeKey::bidirectional(1, 4),
                EdgeKey::bidirectional(4, 5),
            ],
        );
        let matches = g
            .find_reachable_matches(&1, |n| [2, 3, 5].contains(&n.key()))
            .unwrap();
        assert_eq!(matches.into_iter().collect::<Vec<_>>(), vec![2, 5]);
    }

    #[test]
    fn find_cycle_returns_loop_through_origin() {
        let g = build(
            &[1, 2, 3],
            &[
                EdgeKey::bidirectional(1, 2),
                EdgeKey::bidirectional(2, 3),
                EdgeKey::bidirectional(3, 1),
            ],
        );
        assert_eq!(g.find_cycle(&1).unwrap(), Some(vec![1, 2, 3, 1]));
    }

    #[test]
    fn tree_has_no_cycle() {
        let g = build(
            &[1, 2, 3],
            &[EdgeKey::bidirectional(1, 2), EdgeKey::bidirectional(1, 3)],
        );
        assert_eq!(g.find_cycle(&1).unwrap(), None);
        assert_eq!(g.find_cycle(&2).unwrap(), None);
    }
}
