//! The mixed-endpoint graph the searches mutate.
//!
//! At most one edge connects any two nodes and no node is adjacent to
//! itself. Every mutation goes through [`Graph::add_edge`],
//! [`Graph::remove_edge`] or [`Graph::set_endpoint`], which keep both
//! invariants.

use crate::error::{GraphError, Result};
use crate::{Edge, Endpoint, Node};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

/// Unordered node pair, stored smaller-first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct NodePair(Node, Node);

impl NodePair {
    fn new(a: &Node, b: &Node) -> Self {
        if a <= b {
            NodePair(a.clone(), b.clone())
        } else {
            NodePair(b.clone(), a.clone())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Insertion order.
    nodes: Vec<Node>,
    by_name: HashMap<String, Node>,
    adjacency: HashMap<Node, BTreeSet<Node>>,
    edges: BTreeMap<NodePair, Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self> {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node)?;
        }
        Ok(graph)
    }

    /// A graph over the same nodes with no edges.
    pub fn empty_copy(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            by_name: self.by_name.clone(),
            adjacency: self
                .nodes
                .iter()
                .map(|n| (n.clone(), BTreeSet::new()))
                .collect(),
            edges: BTreeMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.by_name.contains_key(node.name()) {
            return Err(GraphError::DuplicateNode(node.name().to_string()));
        }
        self.by_name.insert(node.name().to_string(), node.clone());
        self.adjacency.insert(node.clone(), BTreeSet::new());
        self.nodes.push(node);
        Ok(())
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.by_name.get(name)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains_node(&self, node: &Node) -> bool {
        self.adjacency.contains_key(node)
    }

    fn check_pair(&self, a: &Node, b: &Node) -> Result<()> {
        if a == b {
            return Err(GraphError::SelfLoop(a.name().to_string()));
        }
        for n in [a, b] {
            if !self.contains_node(n) {
                return Err(GraphError::UnknownNode(n.name().to_string()));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Insert `edge`, replacing whatever edge already joined its two nodes.
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        let (a, b) = (edge.node1().clone(), edge.node2().clone());
        self.check_pair(&a, &b)?;

        self.edges.insert(NodePair::new(&a, &b), edge);
        if let Some(adj) = self.adjacency.get_mut(&a) {
            adj.insert(b.clone());
        }
        if let Some(adj) = self.adjacency.get_mut(&b) {
            adj.insert(a);
        }
        Ok(())
    }

    pub fn add_directed_edge(&mut self, from: &Node, to: &Node) -> Result<()> {
        self.add_edge(Edge::directed(from.clone(), to.clone()))
    }

    pub fn add_undirected_edge(&mut self, a: &Node, b: &Node) -> Result<()> {
        self.add_edge(Edge::undirected(a.clone(), b.clone()))
    }

    pub fn add_bidirected_edge(&mut self, a: &Node, b: &Node) -> Result<()> {
        self.add_edge(Edge::bidirected(a.clone(), b.clone()))
    }

    /// Remove the edge between `a` and `b`.
    ///
    /// Removing an edge that does not exist is an error, never a silent
    /// no-op.
    pub fn remove_edge(&mut self, a: &Node, b: &Node) -> Result<Edge> {
        let edge = self.edges.remove(&NodePair::new(a, b)).ok_or_else(|| {
            GraphError::InvalidMutation(format!("no edge between {a} and {b} to remove"))
        })?;
        if let Some(adj) = self.adjacency.get_mut(a) {
            adj.remove(b);
        }
        if let Some(adj) = self.adjacency.get_mut(b) {
            adj.remove(a);
        }
        Ok(edge)
    }

    /// Set the mark at `to`'s end of the existing `from`-`to` edge.
    ///
    /// `set_endpoint(b, c, Endpoint::Arrow)` turns `b --- c` into `b --> c`.
    pub fn set_endpoint(&mut self, from: &Node, to: &Node, mark: Endpoint) -> Result<()> {
        let edge = self
            .edges
            .get_mut(&NodePair::new(from, to))
            .ok_or_else(|| {
                GraphError::InvalidMutation(format!(
                    "cannot set endpoint: {from} and {to} are not adjacent"
                ))
            })?;
        edge.set_proximal_endpoint(to, mark);
        Ok(())
    }

    /// Drop every edge, keeping the nodes.
    pub fn clear_edges(&mut self) {
        self.edges.clear();
        for adj in self.adjacency.values_mut() {
            adj.clear();
        }
    }

    // ------------------------------------------------------------------
    // Local queries
    // ------------------------------------------------------------------

    pub fn edge(&self, a: &Node, b: &Node) -> Option<&Edge> {
        self.edges.get(&NodePair::new(a, b))
    }

    /// All edges, ordered by their (smaller, larger) node pair.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values()
    }

    pub fn edges_of<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Edge> + 'a {
        self.adjacency
            .get(node)
            .into_iter()
            .flatten()
            .filter_map(move |other| self.edge(node, other))
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn is_adjacent(&self, a: &Node, b: &Node) -> bool {
        self.adjacency.get(a).is_some_and(|adj| adj.contains(b))
    }

    /// Neighbors of `node`, in node order.
    pub fn adjacent_nodes(&self, node: &Node) -> Vec<Node> {
        self.adjacency
            .get(node)
            .map(|adj| adj.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn parents(&self, node: &Node) -> Vec<Node> {
        self.edges_of(node)
            .filter(|e| e.points_towards(node))
            .filter_map(|e| e.directed_tail().cloned())
            .collect()
    }

    pub fn children(&self, node: &Node) -> Vec<Node> {
        self.edges_of(node)
            .filter(|e| e.directed_tail() == Some(node))
            .filter_map(|e| e.directed_head().cloned())
            .collect()
    }

    pub fn is_directed_from_to(&self, from: &Node, to: &Node) -> bool {
        self.edge(from, to)
            .is_some_and(|e| e.directed_tail() == Some(from) && e.directed_head() == Some(to))
    }

    pub fn is_undirected_from_to(&self, a: &Node, b: &Node) -> bool {
        self.edge(a, b).is_some_and(Edge::is_undirected)
    }

    pub fn is_parent_of(&self, parent: &Node, child: &Node) -> bool {
        self.is_directed_from_to(parent, child)
    }

    pub fn is_child_of(&self, child: &Node, parent: &Node) -> bool {
        self.is_directed_from_to(parent, child)
    }

    // ------------------------------------------------------------------
    // Reachability
    // ------------------------------------------------------------------

    /// Nodes with a directed path into `node`, including `node` itself.
    pub fn ancestors(&self, node: &Node) -> BTreeSet<Node> {
        self.closure(node, |g, n| g.parents(n))
    }

    /// Nodes reachable from `node` along directed edges, including `node`.
    pub fn descendants(&self, node: &Node) -> BTreeSet<Node> {
        self.closure(node, |g, n| g.children(n))
    }

    fn closure<F>(&self, start: &Node, step: F) -> BTreeSet<Node>
    where
        F: Fn(&Graph, &Node) -> Vec<Node>,
    {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        seen.insert(start.clone());
        queue.push_back(start.clone());
        while let Some(n) = queue.pop_front() {
            for next in step(self, &n) {
                if seen.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Reflexive: every node is its own ancestor.
    pub fn is_ancestor_of(&self, ancestor: &Node, node: &Node) -> bool {
        ancestor == node || self.exists_directed_path_from_to(ancestor, node)
    }

    /// True if a directed path of length at least one leads from `from` to
    /// `to`.
    pub fn exists_directed_path_from_to(&self, from: &Node, to: &Node) -> bool {
        self.exists_path(from, to, |e, n| e.traverse_directed(n))
    }

    /// True if a path of undirected edges and edges directed away from the
    /// walker leads from `from` to `to`.
    pub fn exists_semi_directed_path_from_to(&self, from: &Node, to: &Node) -> bool {
        self.exists_path(from, to, |e, n| e.traverse_semi_directed(n))
    }

    fn exists_path<F>(&self, from: &Node, to: &Node, traverse: F) -> bool
    where
        F: for<'e> Fn(&'e Edge, &Node) -> Option<&'e Node>,
    {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(from.clone());
        while let Some(n) = queue.pop_front() {
            for edge in self.edges_of(&n) {
                let Some(next) = traverse(edge, &n) else {
                    continue;
                };
                if next == to {
                    return true;
                }
                if seen.insert(next.clone()) {
                    queue.push_back(next.clone());
                }
            }
        }
        false
    }

    /// Kahn's algorithm over the directed edges; other edge kinds are
    /// ignored.
    pub fn exists_directed_cycle(&self) -> bool {
        let mut in_degree: HashMap<&Node, usize> = self.nodes.iter().map(|n| (n, 0)).collect();
        for edge in self.edges.values() {
            if let Some(head) = edge.directed_head() {
                *in_degree.entry(head).or_insert(0) += 1;
            }
        }

        let mut queue: VecDeque<Node> = self
            .nodes
            .iter()
            .filter(|n| in_degree.get(n).copied() == Some(0))
            .cloned()
            .collect();
        let mut removed = 0usize;

        while let Some(n) = queue.pop_front() {
            removed += 1;
            for child in self.children(&n) {
                if let Some(d) = in_degree.get_mut(&child) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }

        removed != self.nodes.len()
    }

    /// Every edge directed and no directed cycle.
    pub fn is_dag(&self) -> bool {
        self.edges.values().all(Edge::is_directed) && !self.exists_directed_cycle()
    }

    /// True if both graphs join the same pairs of node names.
    pub fn skeleton_matches(&self, other: &Graph) -> bool {
        self.skeleton_names() == other.skeleton_names()
    }

    fn skeleton_names(&self) -> BTreeSet<(String, String)> {
        self.edges
            .keys()
            .map(|NodePair(a, b)| {
                let (a, b) = (a.name().to_string(), b.name().to_string());
                if a <= b {
                    (a, b)
                } else {
                    (b, a)
                }
            })
            .collect()
    }
}

impl PartialEq for Graph {
    /// Same nodes (by identity) and the same edges with the same marks.
    fn eq(&self, other: &Self) -> bool {
        let mine: BTreeSet<&Node> = self.nodes.iter().collect();
        let theirs: BTreeSet<&Node> = other.nodes.iter().collect();
        mine == theirs && self.edges == other.edges
    }
}

impl Eq for Graph {}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph Nodes:")?;
        let names: Vec<&str> = self.nodes.iter().map(Node::name).collect();
        writeln!(f, "{}", names.join(";"))?;
        writeln!(f)?;
        writeln!(f, "Graph Edges:")?;
        for (i, edge) in self.edges.values().enumerate() {
            writeln!(f, "{}. {}", i + 1, edge)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> (Graph, Node, Node, Node) {
        let nodes = Node::many(&["A", "B", "C"]);
        let graph = Graph::with_nodes(nodes.clone()).unwrap();
        (graph, nodes[0].clone(), nodes[1].clone(), nodes[2].clone())
    }

    #[test]
    fn add_replaces_existing_edge() {
        let (mut g, a, b, _) = abc();
        g.add_undirected_edge(&a, &b).unwrap();
        g.add_directed_edge(&b, &a).unwrap();
        assert_eq!(g.num_edges(), 1);
        assert!(g.is_directed_from_to(&b, &a));
        assert!(!g.is_undirected_from_to(&a, &b));
    }

    #[test]
    fn self_loops_and_strangers_rejected() {
        let (mut g, a, _, _) = abc();
        assert_eq!(
            g.add_directed_edge(&a, &a),
            Err(GraphError::SelfLoop("A".to_string()))
        );
        let stranger = Node::new("Z");
        assert!(matches!(
            g.add_directed_edge(&a, &stranger),
            Err(GraphError::UnknownNode(_))
        ));
    }

    #[test]
    fn duplicate_names_rejected() {
        let (mut g, _, _, _) = abc();
        assert!(matches!(
            g.add_node(Node::new("A")),
            Err(GraphError::DuplicateNode(_))
        ));
    }

    #[test]
    fn removing_missing_edge_is_an_error() {
        let (mut g, a, b, _) = abc();
        assert!(matches!(
            g.remove_edge(&a, &b),
            Err(GraphError::InvalidMutation(_))
        ));
        g.add_undirected_edge(&a, &b).unwrap();
        let removed = g.remove_edge(&b, &a).unwrap();
        assert!(removed.is_undirected());
        assert!(!g.is_adjacent(&a, &b));
        assert!(g.adjacent_nodes(&a).is_empty());
    }

    #[test]
    fn set_endpoint_changes_far_mark() {
        let (mut g, a, b, c) = abc();
        g.add_undirected_edge(&a, &b).unwrap();
        g.set_endpoint(&a, &b, Endpoint::Arrow).unwrap();
        assert!(g.is_directed_from_to(&a, &b));
        assert!(matches!(
            g.set_endpoint(&a, &c, Endpoint::Arrow),
            Err(GraphError::InvalidMutation(_))
        ));
    }

    #[test]
    fn parents_children_and_ancestry() {
        let (mut g, a, b, c) = abc();
        g.add_directed_edge(&a, &b).unwrap();
        g.add_directed_edge(&b, &c).unwrap();
        assert_eq!(g.parents(&b), vec![a.clone()]);
        assert_eq!(g.children(&b), vec![c.clone()]);
        assert!(g.is_ancestor_of(&a, &c));
        assert!(g.is_ancestor_of(&c, &c));
        assert!(!g.is_ancestor_of(&c, &a));
        assert_eq!(g.descendants(&a).len(), 3);
        assert!(!g.exists_directed_cycle());
        assert!(g.is_dag());

        g.add_directed_edge(&c, &a).unwrap();
        assert!(g.exists_directed_cycle());
    }

    #[test]
    fn semi_directed_paths_follow_tails() {
        let (mut g, a, b, c) = abc();
        g.add_undirected_edge(&a, &b).unwrap();
        g.add_directed_edge(&b, &c).unwrap();
        assert!(g.exists_semi_directed_path_from_to(&a, &c));
        assert!(!g.exists_semi_directed_path_from_to(&c, &a));
        assert!(!g.exists_directed_path_from_to(&a, &c));
    }

    #[test]
    fn equality_and_skeleton() {
        let (mut g1, a, b, c) = abc();
        g1.add_directed_edge(&a, &b).unwrap();
        g1.add_undirected_edge(&b, &c).unwrap();
        let mut g2 = g1.clone();
        assert_eq!(g1, g2);

        g2.set_endpoint(&b, &c, Endpoint::Arrow).unwrap();
        assert_ne!(g1, g2);
        assert!(g1.skeleton_matches(&g2));
    }
}
