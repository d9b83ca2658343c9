//! Meek orientation rules, run as a worklist to a fixed point.
//!
//! One FIFO queue per rule holds the nodes around which that rule should be
//! re-tried. The queues are drained in rule order (1, 2, 3, then 4 when it
//! is active) and the pass repeats until all of them are empty. Orienting
//! `x --> y` re-enqueues only the nodes whose rule instances the new arrow
//! can complete:
//!
//! | rule | keyed by                 | enqueued after `x --> y` |
//! |------|--------------------------|--------------------------|
//! | R1   | middle of `b --> a --- c` | `y`                      |
//! | R2   | middle of `b --> a --> c` | `x`, `y`                 |
//! | R3   | target `b`               | `y`                      |
//! | R4   | middle of `b --> a --> c` | `x`, `y`                 |

use crate::config::{MeekConfig, Rule4Mode};
use crate::error::Result;
use crate::knowledge::Knowledge;
use crate::observer::{MeekRule, SearchObserver};
use causeway_graph::{basic_pattern, Endpoint, Graph, Node};
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct WorkQueue {
    queue: VecDeque<Node>,
    queued: HashSet<Node>,
}

impl WorkQueue {
    fn push(&mut self, node: &Node) {
        if self.queued.insert(node.clone()) {
            self.queue.push_back(node.clone());
        }
    }

    fn pop(&mut self) -> Option<Node> {
        let node = self.queue.pop_front()?;
        self.queued.remove(&node);
        Some(node)
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[derive(Debug, Default)]
struct Queues {
    r1: WorkQueue,
    r2: WorkQueue,
    r3: WorkQueue,
    /// Stays empty when rule 4 is inactive.
    r4: WorkQueue,
    rule4: bool,
}

impl Queues {
    fn seed(&mut self, node: &Node) {
        self.r1.push(node);
        self.r2.push(node);
        self.r3.push(node);
        if self.rule4 {
            self.r4.push(node);
        }
    }

    fn oriented(&mut self, from: &Node, to: &Node) {
        self.r1.push(to);
        self.r2.push(from);
        self.r2.push(to);
        self.r3.push(to);
        if self.rule4 {
            self.r4.push(from);
            self.r4.push(to);
        }
    }

    fn is_empty(&self) -> bool {
        self.r1.is_empty() && self.r2.is_empty() && self.r3.is_empty() && self.r4.is_empty()
    }
}

/// Orients the undirected edges of a pattern that its directed edges (and
/// optional background knowledge) imply.
pub struct MeekRules<'a> {
    config: MeekConfig,
    knowledge: Option<&'a Knowledge>,
    observer: Option<&'a mut dyn SearchObserver>,
}

impl<'a> MeekRules<'a> {
    pub fn new(config: MeekConfig) -> Self {
        Self {
            config,
            knowledge: None,
            observer: None,
        }
    }

    pub fn with_knowledge(mut self, knowledge: &'a Knowledge) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn with_observer(mut self, observer: &'a mut dyn SearchObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    fn has_knowledge(&self) -> bool {
        self.knowledge.is_some_and(|k| !k.is_empty())
    }

    fn rule4_active(&self) -> bool {
        match self.config.rule4 {
            Rule4Mode::Auto => self.has_knowledge(),
            Rule4Mode::Always => true,
            Rule4Mode::Never => false,
        }
    }

    /// Propagate from every node that has a directed parent, in node order.
    /// Returns the nodes touched by an orientation.
    pub fn orient_implied(&mut self, graph: &mut Graph) -> Result<BTreeSet<Node>> {
        let seeds: Vec<Node> = graph
            .nodes()
            .iter()
            .filter(|n| !graph.parents(n).is_empty())
            .cloned()
            .collect();
        self.orient_implied_from(graph, &seeds)
    }

    /// Propagate from `seeds`, processed in the order given.
    pub fn orient_implied_from(
        &mut self,
        graph: &mut Graph,
        seeds: &[Node],
    ) -> Result<BTreeSet<Node>> {
        let mut queues = Queues {
            rule4: self.rule4_active(),
            ..Queues::default()
        };
        let mut visited = BTreeSet::new();

        if self.has_knowledge() {
            self.orient_by_knowledge(graph, &mut queues, &mut visited)?;
        }
        for seed in seeds {
            queues.seed(seed);
        }

        while !queues.is_empty() {
            while let Some(a) = queues.r1.pop() {
                self.rule1(graph, &a, &mut queues, &mut visited)?;
            }
            while let Some(a) = queues.r2.pop() {
                self.rule2(graph, &a, &mut queues, &mut visited)?;
            }
            while let Some(b) = queues.r3.pop() {
                self.rule3(graph, &b, &mut queues, &mut visited)?;
            }
            while let Some(a) = queues.r4.pop() {
                self.rule4(graph, &a, &mut queues, &mut visited)?;
            }
        }

        debug!(touched = visited.len(), "meek propagation finished");
        Ok(visited)
    }

    /// Orient undirected edges whose direction the knowledge settles on its
    /// own: a required edge, or one forbidden in exactly one direction.
    fn orient_by_knowledge(
        &mut self,
        graph: &mut Graph,
        queues: &mut Queues,
        visited: &mut BTreeSet<Node>,
    ) -> Result<()> {
        let Some(knowledge) = self.knowledge else {
            return Ok(());
        };
        let undirected: Vec<(Node, Node)> = graph
            .edges()
            .filter(|e| e.is_undirected())
            .map(|e| (e.node1().clone(), e.node2().clone()))
            .collect();

        for (x, y) in undirected {
            let (xn, yn) = (x.name(), y.name());
            let x_to_y = knowledge.is_required(xn, yn)
                || (knowledge.is_forbidden(yn, xn) && !knowledge.is_forbidden(xn, yn));
            let y_to_x = knowledge.is_required(yn, xn)
                || (knowledge.is_forbidden(xn, yn) && !knowledge.is_forbidden(yn, xn));

            if x_to_y {
                self.direct(graph, &x, &y, MeekRule::Knowledge, queues, visited)?;
            } else if y_to_x {
                self.direct(graph, &y, &x, MeekRule::Knowledge, queues, visited)?;
            }
        }
        Ok(())
    }

    /// R1: `b --> a --- c`, `b` and `c` not adjacent: orient `a --> c`.
    fn rule1(
        &mut self,
        graph: &mut Graph,
        a: &Node,
        queues: &mut Queues,
        visited: &mut BTreeSet<Node>,
    ) -> Result<()> {
        for b in graph.parents(a) {
            for c in graph.adjacent_nodes(a) {
                if c == b || !graph.is_undirected_from_to(a, &c) || graph.is_adjacent(&b, &c) {
                    continue;
                }
                self.direct(graph, a, &c, MeekRule::R1, queues, visited)?;
            }
        }
        Ok(())
    }

    /// R2: `b --> a --> c` and `b --- c`: orient `b --> c`.
    fn rule2(
        &mut self,
        graph: &mut Graph,
        a: &Node,
        queues: &mut Queues,
        visited: &mut BTreeSet<Node>,
    ) -> Result<()> {
        let children = graph.children(a);
        for b in graph.parents(a) {
            for c in &children {
                if graph.is_undirected_from_to(&b, c) {
                    self.direct(graph, &b, c, MeekRule::R2, queues, visited)?;
                }
            }
        }
        Ok(())
    }

    /// R3: `a --- b`, `c --> b <-- d`, `a --- c`, `a --- d`, `c` and `d`
    /// not adjacent: orient `a --> b`.
    fn rule3(
        &mut self,
        graph: &mut Graph,
        b: &Node,
        queues: &mut Queues,
        visited: &mut BTreeSet<Node>,
    ) -> Result<()> {
        let parents = graph.parents(b);
        if parents.len() < 2 {
            return Ok(());
        }

        for a in graph.adjacent_nodes(b) {
            if !graph.is_undirected_from_to(&a, b) {
                continue;
            }
            let around: Vec<&Node> = parents
                .iter()
                .filter(|p| graph.is_undirected_from_to(&a, p))
                .collect();

            let unshielded = around
                .iter()
                .enumerate()
                .any(|(i, c)| around[i + 1..].iter().any(|d| !graph.is_adjacent(c, d)));
            if unshielded {
                self.direct(graph, &a, b, MeekRule::R3, queues, visited)?;
            }
        }
        Ok(())
    }

    /// R4: `b --> a --> c`, `b` and `c` not adjacent, `d --- b`, `d --- c`,
    /// `d` adjacent to `a`: orient `d --> c`.
    fn rule4(
        &mut self,
        graph: &mut Graph,
        a: &Node,
        queues: &mut Queues,
        visited: &mut BTreeSet<Node>,
    ) -> Result<()> {
        let children = graph.children(a);
        for b in graph.parents(a) {
            for c in &children {
                if graph.is_adjacent(&b, c) {
                    continue;
                }
                for d in graph.adjacent_nodes(a) {
                    if &d == c || d == b {
                        continue;
                    }
                    if graph.is_undirected_from_to(&d, &b) && graph.is_undirected_from_to(&d, c) {
                        self.direct(graph, &d, c, MeekRule::R4, queues, visited)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Turn `from --- to` into `from --> to` unless knowledge or the cycle
    /// check forbids it. Returns whether the edge was oriented.
    fn direct(
        &mut self,
        graph: &mut Graph,
        from: &Node,
        to: &Node,
        rule: MeekRule,
        queues: &mut Queues,
        visited: &mut BTreeSet<Node>,
    ) -> Result<bool> {
        if !graph.is_undirected_from_to(from, to) {
            return Ok(false);
        }
        if let Some(knowledge) = self.knowledge {
            if !knowledge.is_arrowpoint_allowed(from.name(), to.name()) {
                return Ok(false);
            }
        }
        if self.config.aggressively_prevent_cycles && graph.is_ancestor_of(to, from) {
            trace!(from = %from, to = %to, ?rule, "orientation would close a cycle");
            return Ok(false);
        }

        graph.set_endpoint(from, to, Endpoint::Arrow)?;
        trace!(from = %from, to = %to, ?rule, "oriented");
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.edge_oriented(rule, from, to);
        }

        visited.insert(from.clone());
        visited.insert(to.clone());
        queues.oriented(from, to);
        Ok(true)
    }
}

/// The pattern of `dag`: its unshielded colliders plus every orientation
/// they and `knowledge` imply.
pub fn pattern_for_dag(dag: &Graph, knowledge: &Knowledge) -> Result<Graph> {
    let mut pattern = dag.clone();
    basic_pattern(&mut pattern)?;
    MeekRules::new(MeekConfig::default())
        .with_knowledge(knowledge)
        .orient_implied(&mut pattern)?;
    Ok(pattern)
}
