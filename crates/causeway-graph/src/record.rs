//! Serializable graph form used for file I/O.

use crate::error::{GraphError, Result};
use crate::{Edge, Endpoint, Graph, Node};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// `from --> to`
    Directed,
    Undirected,
    Bidirected,
    Nondirected,
    /// `from o-> to`
    PartiallyOriented,
    /// Any other mark combination.
    Marks { at_from: Endpoint, at_to: Endpoint },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub nodes: Vec<String>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl EdgeRecord {
    fn from_edge(edge: &Edge) -> Self {
        let (from, to, at_from, at_to) = match (edge.endpoint1(), edge.endpoint2()) {
            // Keep the arrowhead on the `to` side where there is one.
            (Endpoint::Arrow, e) if e != Endpoint::Arrow => {
                (edge.node2(), edge.node1(), e, Endpoint::Arrow)
            }
            (e1, e2) => (edge.node1(), edge.node2(), e1, e2),
        };

        let kind = match (at_from, at_to) {
            (Endpoint::Tail, Endpoint::Arrow) => EdgeKind::Directed,
            (Endpoint::Tail, Endpoint::Tail) => EdgeKind::Undirected,
            (Endpoint::Arrow, Endpoint::Arrow) => EdgeKind::Bidirected,
            (Endpoint::Circle, Endpoint::Circle) => EdgeKind::Nondirected,
            (Endpoint::Circle, Endpoint::Arrow) => EdgeKind::PartiallyOriented,
            (at_from, at_to) => EdgeKind::Marks { at_from, at_to },
        };

        Self {
            from: from.name().to_string(),
            to: to.name().to_string(),
            kind,
        }
    }

    fn marks(&self) -> (Endpoint, Endpoint) {
        match &self.kind {
            EdgeKind::Directed => (Endpoint::Tail, Endpoint::Arrow),
            EdgeKind::Undirected => (Endpoint::Tail, Endpoint::Tail),
            EdgeKind::Bidirected => (Endpoint::Arrow, Endpoint::Arrow),
            EdgeKind::Nondirected => (Endpoint::Circle, Endpoint::Circle),
            EdgeKind::PartiallyOriented => (Endpoint::Circle, Endpoint::Arrow),
            EdgeKind::Marks { at_from, at_to } => (*at_from, *at_to),
        }
    }
}

impl Graph {
    pub fn to_record(&self) -> GraphRecord {
        GraphRecord {
            nodes: self.nodes().iter().map(|n| n.name().to_string()).collect(),
            edges: self.edges().map(EdgeRecord::from_edge).collect(),
        }
    }

    /// Build a graph with fresh nodes named by the record.
    pub fn from_record(record: &GraphRecord) -> Result<Self> {
        let mut graph = Graph::with_nodes(record.nodes.iter().map(Node::new))?;
        graph.add_record_edges(&record.edges)?;
        Ok(graph)
    }

    /// Build a graph over existing nodes, matched by name.
    pub fn from_record_with_nodes(record: &GraphRecord, nodes: &[Node]) -> Result<Self> {
        let mut graph = Graph::new();
        for name in &record.nodes {
            let node = nodes
                .iter()
                .find(|n| n.name() == name)
                .ok_or_else(|| GraphError::UnknownNode(name.clone()))?;
            graph.add_node(node.clone())?;
        }
        graph.add_record_edges(&record.edges)?;
        Ok(graph)
    }

    fn add_record_edges(&mut self, edges: &[EdgeRecord]) -> Result<()> {
        for rec in edges {
            let from = self
                .node(&rec.from)
                .cloned()
                .ok_or_else(|| GraphError::UnknownNode(rec.from.clone()))?;
            let to = self
                .node(&rec.to)
                .cloned()
                .ok_or_else(|| GraphError::UnknownNode(rec.to.clone()))?;
            let (at_from, at_to) = rec.marks();
            self.add_edge(Edge::new(from, to, at_from, at_to))?;
        }
        Ok(())
    }
}
