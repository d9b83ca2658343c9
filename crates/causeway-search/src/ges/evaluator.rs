//! Read-only scoring of candidate operators against one pattern.
//!
//! An [`Evaluator`] borrows everything it needs immutably, so the same
//! candidate scan can run sequentially or on the rayon pool and reduce to
//! the same winner.

use super::operators::{na_y_x, t_neighbors, valid_delete, valid_insert};
use crate::knowledge::Knowledge;
use crate::score::{Score, ScoreError};
use ahash::AHashMap;
use causeway_graph::choice::select;
use causeway_graph::{DepthChoiceGenerator, Graph, Node};
use rayon::prelude::*;
use tracing::debug;

/// The best operator found for one `(x, y)` pair.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Arrow {
    pub bump: f64,
    pub x: Node,
    pub y: Node,
    /// T for an insert, H for a delete.
    pub subset: Vec<Node>,
    /// Undirected neighbours of `y` adjacent to `x`, before the operator.
    pub na_y_x: Vec<Node>,
    /// Position of the pair in the scan; breaks bump ties.
    pub rank: usize,
}

impl Arrow {
    fn beats(&self, other: &Arrow) -> bool {
        self.bump > other.bump || (self.bump == other.bump && self.rank < other.rank)
    }
}

fn better(a: Arrow, b: Arrow) -> Arrow {
    if b.beats(&a) {
        b
    } else {
        a
    }
}

pub(crate) struct Evaluator<'a> {
    pub score: &'a dyn Score,
    pub indices: &'a AHashMap<Node, usize>,
    pub knowledge: &'a Knowledge,
    pub graph: &'a Graph,
    pub depth: usize,
    pub cycle_bound: usize,
    pub prevent_cycles: bool,
}

impl Evaluator<'_> {
    /// Best insert over `pairs`, in scan order.
    pub fn best_insert(&self, pairs: &[(Node, Node)], parallel: bool) -> Option<Arrow> {
        self.scan(pairs, parallel, |rank, x, y| self.max_insert(rank, x, y))
    }

    /// Best delete over `pairs`, in scan order.
    pub fn best_delete(&self, pairs: &[(Node, Node)], parallel: bool) -> Option<Arrow> {
        self.scan(pairs, parallel, |rank, x, y| self.max_delete(rank, x, y))
    }

    fn scan<F>(&self, pairs: &[(Node, Node)], parallel: bool, eval: F) -> Option<Arrow>
    where
        F: Fn(usize, &Node, &Node) -> Option<Arrow> + Send + Sync,
    {
        if parallel {
            pairs
                .par_iter()
                .enumerate()
                .filter_map(|(rank, (x, y))| eval(rank, x, y))
                .reduce_with(better)
        } else {
            pairs
                .iter()
                .enumerate()
                .filter_map(|(rank, (x, y))| eval(rank, x, y))
                .reduce(better)
        }
    }

    fn index(&self, node: &Node) -> Result<usize, ScoreError> {
        self.indices
            .get(node)
            .copied()
            .ok_or_else(|| ScoreError::UnknownVariable(node.name().to_string()))
    }

    fn local_score(&self, y: &Node, parents: &[Node]) -> Result<f64, ScoreError> {
        let parents = parents
            .iter()
            .map(|p| self.index(p))
            .collect::<Result<Vec<_>, _>>()?;
        self.score.local_score(self.index(y)?, &parents)
    }

    /// Score change of `y` when `x` joins `base` as a parent.
    fn bump(&self, x: &Node, y: &Node, base: &[Node]) -> Result<f64, ScoreError> {
        let mut with_x = base.to_vec();
        with_x.push(x.clone());
        Ok(self.local_score(y, &with_x)? - self.local_score(y, base)?)
    }

    /// Best `Insert(x, y, T)` over the T subsets, keeping the first of equal
    /// bumps.
    fn max_insert(&self, rank: usize, x: &Node, y: &Node) -> Option<Arrow> {
        if self.graph.is_adjacent(x, y) || self.knowledge.is_forbidden(x.name(), y.name()) {
            return None;
        }
        if self.prevent_cycles && self.graph.is_ancestor_of(y, x) {
            return None;
        }

        let na = na_y_x(x, y, self.graph);
        let t_all = t_neighbors(x, y, self.graph);
        let parents = self.graph.parents(y);
        let mut best: Option<Arrow> = None;

        for choice in DepthChoiceGenerator::new(t_all.len(), self.depth) {
            let t = select(&choice, &t_all);
            if t.iter().any(|n| self.knowledge.is_forbidden(n.name(), y.name())) {
                continue;
            }
            if !valid_insert(x, y, &t, &na, self.graph, self.cycle_bound) {
                continue;
            }

            let mut base: Vec<Node> = na.iter().chain(&t).chain(&parents).cloned().collect();
            base.sort();
            base.dedup();

            let bump = match self.bump(x, y, &base) {
                Ok(bump) => bump,
                Err(err) => {
                    debug!(x = %x, y = %y, error = %err, "skipping insert");
                    continue;
                }
            };
            if bump > 0.0 && best.as_ref().map_or(true, |b| bump > b.bump) {
                best = Some(Arrow {
                    bump,
                    x: x.clone(),
                    y: y.clone(),
                    subset: t,
                    na_y_x: na.clone(),
                    rank,
                });
            }
        }
        best
    }

    /// Best `Delete(x, y, H)` over the H subsets of NaYX.
    fn max_delete(&self, rank: usize, x: &Node, y: &Node) -> Option<Arrow> {
        if !self.graph.is_adjacent(x, y) || !self.knowledge.no_edge_required(x.name(), y.name()) {
            return None;
        }

        let na = na_y_x(x, y, self.graph);
        let parents = self.graph.parents(y);
        let mut best: Option<Arrow> = None;

        for choice in DepthChoiceGenerator::new(na.len(), na.len()) {
            let h = select(&choice, &na);
            let against_knowledge = h.iter().any(|n| {
                self.knowledge.is_forbidden(y.name(), n.name())
                    || (self.graph.is_undirected_from_to(x, n)
                        && self.knowledge.is_forbidden(x.name(), n.name()))
            });
            if against_knowledge || !valid_delete(&h, &na, self.graph) {
                continue;
            }

            let mut base: Vec<Node> = na
                .iter()
                .filter(|n| !h.contains(n))
                .chain(&parents)
                .filter(|n| *n != x)
                .cloned()
                .collect();
            base.sort();
            base.dedup();

            let bump = match self.bump(x, y, &base) {
                Ok(gain) => -gain,
                Err(err) => {
                    debug!(x = %x, y = %y, error = %err, "skipping delete");
                    continue;
                }
            };
            if bump > 0.0 && best.as_ref().map_or(true, |b| bump > b.bump) {
                best = Some(Arrow {
                    bump,
                    x: x.clone(),
                    y: y.clone(),
                    subset: h,
                    na_y_x: na.clone(),
                    rank,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UNLIMITED_DEPTH;

    /// Additive table score: each `(node, set, weight)` term adds `weight`
    /// whenever every member of `set` is a parent of `node`.
    struct TableScore {
        variables: Vec<Node>,
        terms: Vec<(usize, Vec<usize>, f64)>,
    }

    impl Score for TableScore {
        fn variables(&self) -> &[Node] {
            &self.variables
        }

        fn sample_size(&self) -> usize {
            100
        }

        fn local_score(&self, node: usize, parents: &[usize]) -> Result<f64, ScoreError> {
            Ok(self
                .terms
                .iter()
                .filter(|(n, set, _)| *n == node && set.iter().all(|p| parents.contains(p)))
                .map(|(_, _, w)| w)
                .sum())
        }
    }

    struct Fixture {
        nodes: Vec<Node>,
        graph: Graph,
        indices: AHashMap<Node, usize>,
        knowledge: Knowledge,
        score: TableScore,
    }

    impl Fixture {
        fn new(names: &[&str]) -> Self {
            let nodes = Node::many(names);
            Self {
                graph: Graph::with_nodes(nodes.clone()).unwrap(),
                indices: nodes.iter().cloned().zip(0..).collect(),
                knowledge: Knowledge::new(),
                score: TableScore {
                    variables: nodes.clone(),
                    terms: Vec::new(),
                },
                nodes,
            }
        }

        fn evaluator(&self) -> Evaluator<'_> {
            Evaluator {
                score: &self.score,
                indices: &self.indices,
                knowledge: &self.knowledge,
                graph: &self.graph,
                depth: UNLIMITED_DEPTH,
                cycle_bound: UNLIMITED_DEPTH,
                prevent_cycles: false,
            }
        }
    }

    #[test]
    fn insert_closing_a_semi_directed_path_is_passed_over() {
        // Y --> M --> X: X --> Y scores best but would close a cycle.
        let mut f = Fixture::new(&["M", "X", "Y", "Z"]);
        let (m, x, y, z) = (&f.nodes[0], &f.nodes[1], &f.nodes[2], &f.nodes[3]);
        f.graph.add_directed_edge(y, m).unwrap();
        f.graph.add_directed_edge(m, x).unwrap();
        f.score.terms = vec![(2, vec![1], 100.0), (2, vec![3], 5.0)];

        let pairs = vec![(x.clone(), y.clone()), (z.clone(), y.clone())];
        for parallel in [false, true] {
            let best = f.evaluator().best_insert(&pairs, parallel).unwrap();
            assert_eq!((&best.x, &best.y), (z, y));
            assert_eq!(best.bump, 5.0);
            assert_eq!(best.rank, 1);
        }
    }

    #[test]
    fn insert_with_non_clique_subset_is_passed_over() {
        // A --- Y --- B, A and B not adjacent. T = {A, B} scores best but is
        // not a clique.
        let mut f = Fixture::new(&["A", "B", "X", "Y"]);
        let (a, b, x, y) = (&f.nodes[0], &f.nodes[1], &f.nodes[2], &f.nodes[3]);
        f.graph.add_undirected_edge(y, a).unwrap();
        f.graph.add_undirected_edge(y, b).unwrap();
        f.score.terms = vec![(3, vec![2], 10.0), (3, vec![0, 1, 2], 50.0)];

        let best = f
            .evaluator()
            .best_insert(&[(x.clone(), y.clone())], false)
            .unwrap();
        assert!(best.subset.is_empty());
        assert_eq!(best.bump, 10.0);
        assert!(best.na_y_x.is_empty());
    }

    #[test]
    fn delete_leaving_a_non_clique_is_passed_over() {
        // X --- Y with A and B each adjacent to both, A and B not adjacent.
        // H = {} would leave NaYX = {A, B}, which is not a clique.
        let mut f = Fixture::new(&["A", "B", "X", "Y"]);
        let (a, b, x, y) = (&f.nodes[0], &f.nodes[1], &f.nodes[2], &f.nodes[3]);
        f.graph.add_undirected_edge(x, y).unwrap();
        for z in [a, b] {
            f.graph.add_undirected_edge(y, z).unwrap();
            f.graph.add_undirected_edge(x, z).unwrap();
        }
        f.score.terms = vec![(3, vec![2], -10.0), (3, vec![0, 1, 2], -50.0)];

        for parallel in [false, true] {
            let best = f
                .evaluator()
                .best_delete(&[(x.clone(), y.clone())], parallel)
                .unwrap();
            assert_eq!(best.subset, vec![a.clone()]);
            assert_eq!(best.bump, 10.0);
            assert_eq!(best.na_y_x, vec![a.clone(), b.clone()]);
        }
    }

    #[test]
    fn forbidden_insert_is_never_proposed() {
        let mut f = Fixture::new(&["X", "Y"]);
        f.score.terms = vec![(1, vec![0], 10.0)];
        f.knowledge.set_forbidden("X", "Y");
        let pair = [(f.nodes[0].clone(), f.nodes[1].clone())];
        assert!(f.evaluator().best_insert(&pair, false).is_none());
    }
}
