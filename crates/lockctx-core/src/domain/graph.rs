//! Directed graph over lock identifiers
//!
//! The graph records only edges. A node "exists" once it has been named by an
//! edge, and a node without outgoing edges behaves exactly like an unknown node.
//! Storage is ordered so that cycle detection visits nodes deterministically.

use std::collections::{BTreeMap, BTreeSet};

static NO_NEIGHBOURS: BTreeSet<String> = BTreeSet::new();

/// Directed graph where an edge `a -> b` means "b may follow a"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    /// Maps a node to the set of its direct successors
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the directed edge `from -> to`
    ///
    /// Idempotent. Adding `a -> b` never adds `b -> a`. Self-edges are accepted
    /// and are reported as a cycle by [`Graph::has_cycle`].
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let to = to.into();
        self.edges.entry(to.clone()).or_default();
        self.edges.entry(from.into()).or_default().insert(to);
    }

    /// Direct successors of `node`; empty for a node with no outgoing edges
    pub fn neighbours(&self, node: &str) -> &BTreeSet<String> {
        self.edges.get(node).unwrap_or(&NO_NEIGHBOURS)
    }

    /// Whether the edge `from -> to` exists
    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        self.neighbours(from).contains(to)
    }

    /// Every node named by at least one edge, in sorted order
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Total number of distinct edges
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Whether the graph has no edges
    pub fn is_empty(&self) -> bool {
        self.edge_count() == 0
    }

    /// Search the graph for a cycle
    ///
    /// Returns `None` for an acyclic graph. Otherwise returns one cycle as a
    /// list of nodes where each node has an edge to the next and the last node
    /// has an edge back to the first. Which cycle is returned when several
    /// exist is unspecified.
    pub fn has_cycle(&self) -> Option<Vec<String>> {
        let mut visited = BTreeSet::new();

        self.edges
            .keys()
            .find_map(|node| self.dfs_cycle(node, &mut visited))
    }

    /// Depth-first search from `root` with an explicit frame stack
    ///
    /// `visited` is shared across all roots. `path` holds the current branch
    /// and `on_path` mirrors it for membership checks; a node is pushed when
    /// its frame is entered and popped when its successors are exhausted, so
    /// siblings never observe each other's nodes.
    fn dfs_cycle<'g>(
        &'g self,
        root: &'g str,
        visited: &mut BTreeSet<&'g str>,
    ) -> Option<Vec<String>> {
        if !visited.insert(root) {
            return None;
        }

        let mut path = vec![root];
        let mut on_path = BTreeSet::from([root]);
        let mut frames = vec![self.neighbours(root).iter()];

        while let Some(frame) = frames.last_mut() {
            let Some(neighbour) = frame.next() else {
                frames.pop();
                if let Some(node) = path.pop() {
                    on_path.remove(node);
                }
                continue;
            };
            let neighbour = neighbour.as_str();

            if on_path.contains(neighbour) {
                let start = path.iter().position(|n| *n == neighbour)?;
                return Some(path[start..].iter().map(|n| n.to_string()).collect());
            }
            if visited.insert(neighbour) {
                path.push(neighbour);
                on_path.insert(neighbour);
                frames.push(self.neighbours(neighbour).iter());
            }
        }

        None
    }
}
