//! Hooks for watching a search as it runs.
//!
//! The engine always emits `tracing` events; an observer is for callers that
//! want the same events as values (progress bars, tests, trace recorders).

use causeway_graph::{Graph, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchPhase {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeekRule {
    /// Orientation forced by required/forbidden edges before any rule ran.
    Knowledge,
    R1,
    R2,
    R3,
    R4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Insert,
    Delete,
}

/// An insert or delete that the engine committed to.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedOperator {
    pub kind: OperatorKind,
    pub x: Node,
    pub y: Node,
    /// T for an insert, H for a delete.
    pub subset: Vec<Node>,
    /// NaYX in the pattern the operator was scored against.
    pub na_y_x: Vec<Node>,
    pub bump: f64,
    /// Running score after this operator.
    pub total_score: f64,
}

/// Every method defaults to doing nothing.
pub trait SearchObserver {
    fn phase_started(&mut self, _phase: SearchPhase, _graph: &Graph) {}

    /// Called after the operator mutated the graph and before the pattern
    /// is rebuilt.
    fn operator_applied(&mut self, _operator: &AppliedOperator, _graph: &Graph) {}

    fn pattern_rebuilt(&mut self, _graph: &Graph) {}

    fn edge_oriented(&mut self, _rule: MeekRule, _from: &Node, _to: &Node) {}

    fn phase_finished(&mut self, _phase: SearchPhase, _graph: &Graph, _total_score: f64) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SearchObserver for NoopObserver {}
