//! Insert and delete operators on a pattern (Chickering 2002, section 4).
//!
//! Everything here reads or mutates a single [`Graph`]; scoring and
//! candidate selection live in the parent module.

use causeway_graph::{Graph, Node};
use std::collections::{BTreeSet, VecDeque};

/// Nodes joined to `y` by an undirected edge and adjacent to `x` by any
/// edge, in node order.
pub fn na_y_x(x: &Node, y: &Node, graph: &Graph) -> Vec<Node> {
    graph
        .adjacent_nodes(y)
        .into_iter()
        .filter(|z| z != x && graph.is_undirected_from_to(y, z) && graph.is_adjacent(z, x))
        .collect()
}

/// Nodes joined to `y` by an undirected edge and not adjacent to `x`, in
/// node order. These are the candidates for an insert's T set.
pub fn t_neighbors(x: &Node, y: &Node, graph: &Graph) -> Vec<Node> {
    graph
        .adjacent_nodes(y)
        .into_iter()
        .filter(|z| z != x && graph.is_undirected_from_to(y, z) && !graph.is_adjacent(z, x))
        .collect()
}

pub fn is_clique<'a>(nodes: impl IntoIterator<Item = &'a Node>, graph: &Graph) -> bool {
    let nodes: Vec<&Node> = nodes.into_iter().collect();
    nodes
        .iter()
        .enumerate()
        .all(|(i, a)| nodes[i + 1..].iter().all(|b| graph.is_adjacent(a, b)))
}

/// Breadth-first search for a semi-directed path from `from` to `to` that
/// avoids every node in `blocked`.
///
/// A search that would go deeper than `bound` edges gives up and reports a
/// path, so a bounded check only ever errs towards rejecting an insert.
pub fn exists_unblocked_semi_directed_path(
    from: &Node,
    to: &Node,
    blocked: &BTreeSet<Node>,
    graph: &Graph,
    bound: usize,
) -> bool {
    let mut seen = BTreeSet::from([from.clone()]);
    let mut frontier = VecDeque::from([from.clone()]);
    let mut depth = 0;

    while !frontier.is_empty() {
        if depth > bound {
            return true;
        }
        depth += 1;

        for _ in 0..frontier.len() {
            let Some(t) = frontier.pop_front() else {
                break;
            };
            for edge in graph.edges_of(&t) {
                let Some(next) = edge.traverse_semi_directed(&t) else {
                    continue;
                };
                if blocked.contains(next) {
                    continue;
                }
                if next == to {
                    return true;
                }
                if seen.insert(next.clone()) {
                    frontier.push_back(next.clone());
                }
            }
        }
    }
    false
}

/// Theorem 15: `NaYX ∪ T` must be a clique and every semi-directed path
/// from `y` to `x` must pass through it.
pub fn valid_insert(
    x: &Node,
    y: &Node,
    t: &[Node],
    na_y_x: &[Node],
    graph: &Graph,
    bound: usize,
) -> bool {
    let union: BTreeSet<Node> = t.iter().chain(na_y_x).cloned().collect();
    is_clique(&union, graph) && !exists_unblocked_semi_directed_path(y, x, &union, graph, bound)
}

/// Theorem 17: `NaYX \ H` must be a clique.
pub fn valid_delete(h: &[Node], na_y_x: &[Node], graph: &Graph) -> bool {
    is_clique(na_y_x.iter().filter(|n| !h.contains(n)), graph)
}

/// Add `x --> y` and point every undirected `t --- y` with `t` in T at `y`.
pub fn insert(x: &Node, y: &Node, t: &[Node], graph: &mut Graph) -> causeway_graph::Result<()> {
    graph.add_directed_edge(x, y)?;
    for node in t {
        if graph.is_undirected_from_to(node, y) {
            graph.add_directed_edge(node, y)?;
        }
    }
    Ok(())
}

/// Remove the `x`-`y` edge and orient undirected `y --- h` and `x --- h`
/// away from `y` and `x` for every `h` in H.
pub fn delete(x: &Node, y: &Node, h: &[Node], graph: &mut Graph) -> causeway_graph::Result<()> {
    graph.remove_edge(x, y)?;
    for node in h {
        if graph.is_undirected_from_to(y, node) {
            graph.add_directed_edge(y, node)?;
        }
        if graph.is_undirected_from_to(x, node) {
            graph.add_directed_edge(x, node)?;
        }
    }
    Ok(())
}
