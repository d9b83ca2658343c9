//! Moving between DAGs and their equivalence-class patterns.

use crate::error::{GraphError, Result};
use crate::{Edge, Graph, Node};

/// Strip every orientation that is not part of an unshielded collider.
///
/// A directed edge `x --> y` keeps its arrowhead only if some other parent
/// of `y` is not adjacent to `x`; otherwise it becomes `x --- y`. Meek
/// propagation afterwards restores the orientations the colliders imply.
/// Returns the edges that were made undirected.
pub fn basic_pattern(graph: &mut Graph) -> Result<Vec<Edge>> {
    let mut to_undirect = Vec::new();

    for edge in graph.edges() {
        let (Some(x), Some(y)) = (edge.directed_tail(), edge.directed_head()) else {
            continue;
        };

        let in_collider = graph
            .parents(y)
            .iter()
            .any(|p| p != x && !graph.is_adjacent(p, x));

        if !in_collider {
            to_undirect.push(edge.clone());
        }
    }

    for edge in &to_undirect {
        graph.add_undirected_edge(edge.node1(), edge.node2())?;
    }

    Ok(to_undirect)
}

/// Extend a pattern to one of the DAGs it represents (Dor & Tarsi 1992).
///
/// Repeatedly picks a sink `x` whose undirected neighbors are adjacent to
/// every other neighbor of `x`, points its undirected edges into `x` and
/// sets it aside. Candidates are tried in node insertion order, so the
/// chosen member DAG is deterministic. Fails with
/// [`GraphError::NotExtendable`] when no such node remains.
pub fn pdag_to_dag(pattern: &Graph) -> Result<Graph> {
    let mut dag = pattern.clone();
    let mut work = pattern.clone();
    let mut remaining: Vec<Node> = pattern.nodes().to_vec();

    while !remaining.is_empty() {
        let pick = remaining
            .iter()
            .position(|x| is_removable_sink(&work, x))
            .ok_or(GraphError::NotExtendable)?;
        let x = remaining.remove(pick);

        for y in work.adjacent_nodes(&x) {
            if work.is_undirected_from_to(&x, &y) {
                dag.add_directed_edge(&y, &x)?;
            }
            work.remove_edge(&x, &y)?;
        }
    }

    Ok(dag)
}

fn is_removable_sink(graph: &Graph, x: &Node) -> bool {
    let neighbors = graph.adjacent_nodes(x);

    // Must be a sink, and only directed or undirected edges can be extended.
    let blocked = neighbors.iter().any(|y| {
        graph.is_directed_from_to(x, y)
            || !graph
                .edge(x, y)
                .is_some_and(|e| e.is_directed() || e.is_undirected())
    });
    if blocked {
        return false;
    }

    neighbors
        .iter()
        .filter(|y| graph.is_undirected_from_to(x, y))
        .all(|y| {
            neighbors
                .iter()
                .all(|z| z == y || graph.is_adjacent(y, z))
        })
}
