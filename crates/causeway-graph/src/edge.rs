//! Edges with a mark at each end.

use crate::Node;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// The mark an edge carries at one of its ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Tail,
    Arrow,
    Circle,
}

impl Endpoint {
    fn near_glyph(self) -> char {
        match self {
            Endpoint::Tail => '-',
            Endpoint::Arrow => '<',
            Endpoint::Circle => 'o',
        }
    }

    fn far_glyph(self) -> char {
        match self {
            Endpoint::Tail => '-',
            Endpoint::Arrow => '>',
            Endpoint::Circle => 'o',
        }
    }
}

/// An edge between two distinct nodes.
///
/// `endpoint1` is the mark at `node1`, `endpoint2` the mark at `node2`.
/// Equality ignores which node was listed first: `A --> B` built as
/// `(A, B, Tail, Arrow)` equals `(B, A, Arrow, Tail)`.
#[derive(Debug, Clone)]
pub struct Edge {
    node1: Node,
    node2: Node,
    endpoint1: Endpoint,
    endpoint2: Endpoint,
}

impl Edge {
    pub fn new(node1: Node, node2: Node, endpoint1: Endpoint, endpoint2: Endpoint) -> Self {
        Self {
            node1,
            node2,
            endpoint1,
            endpoint2,
        }
    }

    /// `from --> to`
    pub fn directed(from: Node, to: Node) -> Self {
        Self::new(from, to, Endpoint::Tail, Endpoint::Arrow)
    }

    /// `a --- b`
    pub fn undirected(a: Node, b: Node) -> Self {
        Self::new(a, b, Endpoint::Tail, Endpoint::Tail)
    }

    /// `a <-> b`
    pub fn bidirected(a: Node, b: Node) -> Self {
        Self::new(a, b, Endpoint::Arrow, Endpoint::Arrow)
    }

    /// `a o-o b`
    pub fn nondirected(a: Node, b: Node) -> Self {
        Self::new(a, b, Endpoint::Circle, Endpoint::Circle)
    }

    /// `from o-> to`
    pub fn partially_oriented(from: Node, to: Node) -> Self {
        Self::new(from, to, Endpoint::Circle, Endpoint::Arrow)
    }

    pub fn node1(&self) -> &Node {
        &self.node1
    }

    pub fn node2(&self) -> &Node {
        &self.node2
    }

    pub fn endpoint1(&self) -> Endpoint {
        self.endpoint1
    }

    pub fn endpoint2(&self) -> Endpoint {
        self.endpoint2
    }

    pub fn contains(&self, node: &Node) -> bool {
        &self.node1 == node || &self.node2 == node
    }

    /// The mark at `node`'s end, if `node` is on this edge.
    pub fn proximal_endpoint(&self, node: &Node) -> Option<Endpoint> {
        if &self.node1 == node {
            Some(self.endpoint1)
        } else if &self.node2 == node {
            Some(self.endpoint2)
        } else {
            None
        }
    }

    /// The node at the other end from `node`.
    pub fn distal_node(&self, node: &Node) -> Option<&Node> {
        if &self.node1 == node {
            Some(&self.node2)
        } else if &self.node2 == node {
            Some(&self.node1)
        } else {
            None
        }
    }

    /// Replace the mark at `node`'s end. Returns false if `node` is not on
    /// this edge.
    pub(crate) fn set_proximal_endpoint(&mut self, node: &Node, mark: Endpoint) -> bool {
        if &self.node1 == node {
            self.endpoint1 = mark;
            true
        } else if &self.node2 == node {
            self.endpoint2 = mark;
            true
        } else {
            false
        }
    }

    pub fn is_directed(&self) -> bool {
        matches!(
            (self.endpoint1, self.endpoint2),
            (Endpoint::Tail, Endpoint::Arrow) | (Endpoint::Arrow, Endpoint::Tail)
        )
    }

    pub fn is_undirected(&self) -> bool {
        self.endpoint1 == Endpoint::Tail && self.endpoint2 == Endpoint::Tail
    }

    pub fn is_bidirected(&self) -> bool {
        self.endpoint1 == Endpoint::Arrow && self.endpoint2 == Endpoint::Arrow
    }

    /// True if either end carries a circle.
    pub fn is_partially_oriented(&self) -> bool {
        self.endpoint1 == Endpoint::Circle || self.endpoint2 == Endpoint::Circle
    }

    /// True for a directed edge whose head is `node`.
    pub fn points_towards(&self, node: &Node) -> bool {
        self.directed_head() == Some(node)
    }

    pub fn directed_tail(&self) -> Option<&Node> {
        match (self.endpoint1, self.endpoint2) {
            (Endpoint::Tail, Endpoint::Arrow) => Some(&self.node1),
            (Endpoint::Arrow, Endpoint::Tail) => Some(&self.node2),
            _ => None,
        }
    }

    pub fn directed_head(&self) -> Option<&Node> {
        match (self.endpoint1, self.endpoint2) {
            (Endpoint::Tail, Endpoint::Arrow) => Some(&self.node2),
            (Endpoint::Arrow, Endpoint::Tail) => Some(&self.node1),
            _ => None,
        }
    }

    /// Step across this edge from `from` along a semi-directed path: allowed
    /// when the mark at `from` is a tail (undirected, or directed away).
    pub fn traverse_semi_directed(&self, from: &Node) -> Option<&Node> {
        match self.proximal_endpoint(from) {
            Some(Endpoint::Tail) => self.distal_node(from),
            _ => None,
        }
    }

    /// Step across this edge from `from` along a directed path.
    pub fn traverse_directed(&self, from: &Node) -> Option<&Node> {
        if self.directed_tail() == Some(from) {
            self.directed_head()
        } else {
            None
        }
    }

    fn canonical(&self) -> (&Node, &Node, Endpoint, Endpoint) {
        if self.node1 <= self.node2 {
            (&self.node1, &self.node2, self.endpoint1, self.endpoint2)
        } else {
            (&self.node2, &self.node1, self.endpoint2, self.endpoint1)
        }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Print directed edges tail-first so they always read `A --> B`.
        let (n1, n2, e1, e2) = match (self.endpoint1, self.endpoint2) {
            (Endpoint::Arrow, Endpoint::Tail) => {
                (&self.node2, &self.node1, self.endpoint2, self.endpoint1)
            }
            _ => (&self.node1, &self.node2, self.endpoint1, self.endpoint2),
        };
        write!(f, "{} {}-{} {}", n1, e1.near_glyph(), e2.far_glyph(), n2)
    }
}
