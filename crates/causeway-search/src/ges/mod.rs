//! Greedy equivalence search over patterns (Chickering 2002).
//!
//! The forward phase repeatedly applies the best-scoring valid
//! `Insert(X, Y, T)` until none improves the score; the backward phase does
//! the same with `Delete(X, Y, H)`. After every operator the graph is
//! reduced to its collider skeleton and re-oriented with the Meek rules, so
//! the working graph is always a pattern.

mod evaluator;
pub mod operators;

use crate::config::GesConfig;
use crate::data::{CovarianceMatrix, DataSet};
use crate::error::{Result, SearchError};
use crate::knowledge::{Knowledge, KnowledgeViolation};
use crate::meek::MeekRules;
use crate::observer::{AppliedOperator, NoopObserver, OperatorKind, SearchObserver, SearchPhase};
use crate::score::{Score, SemBicScore};
use crate::scored_graph::{ScoredGraph, TopGraphs};
use ahash::{AHashMap, AHashSet};
use causeway_graph::{basic_pattern, Graph, Node};
use evaluator::{Arrow, Evaluator};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span};

pub struct Ges {
    score: Arc<dyn Score>,
    /// Scan order: by name, then creation.
    variables: Vec<Node>,
    /// Node -> column in the score.
    indices: AHashMap<Node, usize>,
    config: GesConfig,
    knowledge: Knowledge,
    initial_graph: Option<Graph>,
    observer: Box<dyn SearchObserver + Send>,
    /// Ordered pairs whose single-parent bump is an effect.
    effect_edges: AHashSet<(Node, Node)>,
    total_score: f64,
    elapsed: Duration,
    top_graphs: TopGraphs,
}

impl Ges {
    pub fn new(score: impl Score + 'static) -> Self {
        Self::with_score(Arc::new(score))
    }

    pub fn with_score(score: Arc<dyn Score>) -> Self {
        let indices = score
            .variables()
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), i))
            .collect();
        let mut variables = score.variables().to_vec();
        variables.sort();

        Self {
            score,
            variables,
            indices,
            config: GesConfig::default(),
            knowledge: Knowledge::new(),
            initial_graph: None,
            observer: Box::new(NoopObserver),
            effect_edges: AHashSet::new(),
            total_score: 0.0,
            elapsed: Duration::ZERO,
            top_graphs: TopGraphs::new(0),
        }
    }

    /// SEM BIC search over a covariance matrix, with the config's penalty
    /// discount.
    pub fn from_covariance(covariances: CovarianceMatrix, config: &GesConfig) -> Result<Self> {
        config.validate()?;
        let score = SemBicScore::new(covariances).with_penalty_discount(config.penalty_discount)?;
        Self::new(score).with_config(config.clone())
    }

    pub fn from_dataset(data: &DataSet, config: &GesConfig) -> Result<Self> {
        Self::from_covariance(data.covariance(), config)
    }

    pub fn with_config(mut self, config: GesConfig) -> Result<Self> {
        config.validate()?;
        self.top_graphs = TopGraphs::new(config.num_patterns_to_store);
        self.config = config;
        Ok(self)
    }

    /// Rejects knowledge that contradicts itself, names variables the score
    /// does not have, or is violated by the initial graph.
    pub fn with_knowledge(mut self, knowledge: Knowledge) -> Result<Self> {
        knowledge.check_consistent()?;
        if let Some(unknown) = knowledge
            .variables()
            .into_iter()
            .find(|name| !self.variables.iter().any(|v| v.name() == *name))
        {
            return Err(KnowledgeViolation::UnknownVariable(unknown.to_string()).into());
        }
        if let Some(graph) = &self.initial_graph {
            if let Some(violation) = knowledge.violations(graph).into_iter().next() {
                return Err(violation.into());
            }
        }
        self.knowledge = knowledge;
        Ok(self)
    }

    /// Start the forward phase from `graph` instead of the empty graph. Its
    /// nodes must carry exactly the score's variable names; it may contain
    /// only directed and undirected edges.
    pub fn with_initial_graph(mut self, graph: &Graph) -> Result<Self> {
        let mut names: Vec<&str> = graph.nodes().iter().map(Node::name).collect();
        let mut expected: Vec<&str> = self.variables.iter().map(Node::name).collect();
        names.sort_unstable();
        expected.sort_unstable();
        if names != expected {
            return Err(SearchError::VariableMismatch);
        }
        if let Some(edge) = graph.edges().find(|e| !e.is_directed() && !e.is_undirected()) {
            return Err(SearchError::InvalidConfig(format!(
                "initial graph edge {edge} is neither directed nor undirected"
            )));
        }

        let rebased = Graph::from_record_with_nodes(&graph.to_record(), self.score.variables())?;
        if let Some(violation) = self.knowledge.violations(&rebased).into_iter().next() {
            return Err(violation.into());
        }
        self.initial_graph = Some(rebased);
        Ok(self)
    }

    pub fn with_observer(mut self, observer: impl SearchObserver + Send + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn config(&self) -> &GesConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &Knowledge {
        &self.knowledge
    }

    /// Sum of the bumps applied by the last search.
    pub fn score(&self) -> f64 {
        self.total_score
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Best patterns seen during the last search, best first.
    pub fn top_graphs(&self) -> &[ScoredGraph] {
        self.top_graphs.as_slice()
    }

    /// Run both phases and return the final pattern.
    pub fn search(&mut self) -> Result<Graph> {
        let start = Instant::now();

        let mut graph = match &self.initial_graph {
            Some(initial) => initial.clone(),
            None => Graph::with_nodes(self.score.variables().iter().cloned())?,
        };
        self.add_required_edges(&mut graph)?;

        self.total_score = 0.0;
        self.top_graphs.clear();
        self.top_graphs.offer(&graph, self.total_score);
        self.effect_edges = if self.config.faithfulness_assumed {
            self.effect_edges()
        } else {
            AHashSet::new()
        };

        info!(
            variables = self.variables.len(),
            sample_size = self.score.sample_size(),
            parallel = self.config.parallel,
            "starting GES"
        );

        self.fes(&mut graph)?;
        self.bes(&mut graph)?;

        self.elapsed = start.elapsed();
        info!(
            edges = graph.num_edges(),
            score = self.total_score,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "GES finished"
        );
        Ok(graph)
    }

    /// Sum of local scores of `dag`, matching nodes to the score by name.
    pub fn score_dag(&self, dag: &Graph) -> Result<f64> {
        if !dag.is_dag() {
            return Err(SearchError::NotADag);
        }
        let column = |node: &Node| {
            self.score
                .variables()
                .iter()
                .position(|v| v.name() == node.name())
                .ok_or_else(|| SearchError::UnknownVariable(node.name().to_string()))
        };

        let mut total = 0.0;
        for node in dag.nodes() {
            let parents = dag
                .parents(node)
                .iter()
                .map(column)
                .collect::<Result<Vec<_>>>()?;
            total += self.score.local_score(column(node)?, &parents)?;
        }
        Ok(total)
    }

    // ====================================================================
    // Phases
    // ====================================================================

    fn fes(&mut self, graph: &mut Graph) -> Result<()> {
        let _span = info_span!("fes").entered();
        info!("forward equivalence search");
        self.observer.phase_started(SearchPhase::Forward, graph);

        loop {
            if let Some(max) = self.config.max_num_edges {
                if graph.num_edges() >= max {
                    info!(max_num_edges = max, "edge limit reached");
                    break;
                }
            }

            let pairs = self.insert_candidates(graph);
            let Some(arrow) = self.evaluator(graph).best_insert(&pairs, self.config.parallel) else {
                break;
            };

            operators::insert(&arrow.x, &arrow.y, &arrow.subset, graph)?;
            self.applied(OperatorKind::Insert, &arrow, graph)?;
        }

        self.observer.phase_finished(SearchPhase::Forward, graph, self.total_score);
        Ok(())
    }

    fn bes(&mut self, graph: &mut Graph) -> Result<()> {
        let _span = info_span!("bes").entered();
        info!("backward equivalence search");
        self.observer.phase_started(SearchPhase::Backward, graph);

        loop {
            let pairs = delete_candidates(graph);
            let Some(arrow) = self.evaluator(graph).best_delete(&pairs, self.config.parallel) else {
                break;
            };

            operators::delete(&arrow.x, &arrow.y, &arrow.subset, graph)?;
            self.applied(OperatorKind::Delete, &arrow, graph)?;
        }

        self.observer.phase_finished(SearchPhase::Backward, graph, self.total_score);
        Ok(())
    }

    /// Book-keeping shared by both phases once an operator has been applied.
    fn applied(&mut self, kind: OperatorKind, arrow: &Arrow, graph: &mut Graph) -> Result<()> {
        self.total_score += arrow.bump;
        debug!(
            ?kind,
            x = %arrow.x,
            y = %arrow.y,
            subset = ?arrow.subset,
            na_y_x = ?arrow.na_y_x,
            bump = arrow.bump,
            score = self.total_score,
            edges = graph.num_edges(),
            "applied operator"
        );

        let operator = AppliedOperator {
            kind,
            x: arrow.x.clone(),
            y: arrow.y.clone(),
            subset: arrow.subset.clone(),
            na_y_x: arrow.na_y_x.clone(),
            bump: arrow.bump,
            total_score: self.total_score,
        };
        self.observer.operator_applied(&operator, graph);

        self.rebuild_pattern(graph)?;
        self.top_graphs.offer(graph, self.total_score);
        Ok(())
    }

    fn rebuild_pattern(&mut self, graph: &mut Graph) -> Result<()> {
        basic_pattern(graph)?;
        MeekRules::new(self.config.meek_config())
            .with_knowledge(&self.knowledge)
            .with_observer(&mut *self.observer)
            .orient_implied(graph)?;
        self.observer.pattern_rebuilt(graph);
        Ok(())
    }

    // ====================================================================
    // Candidates
    // ====================================================================

    fn evaluator<'a>(&'a self, graph: &'a Graph) -> Evaluator<'a> {
        Evaluator {
            score: self.score.as_ref(),
            indices: &self.indices,
            knowledge: &self.knowledge,
            graph,
            depth: self.config.effective_depth(),
            cycle_bound: self.config.effective_cycle_bound(),
            prevent_cycles: self.config.aggressively_prevent_cycles,
        }
    }

    /// Non-adjacent ordered pairs in scan order, restricted to effect edges
    /// when faithfulness is assumed.
    fn insert_candidates(&self, graph: &Graph) -> Vec<(Node, Node)> {
        let mut pairs = Vec::new();
        for x in &self.variables {
            for y in &self.variables {
                if x == y || graph.is_adjacent(x, y) {
                    continue;
                }
                if self.config.faithfulness_assumed
                    && !self.effect_edges.contains(&(x.clone(), y.clone()))
                {
                    continue;
                }
                pairs.push((x.clone(), y.clone()));
            }
        }
        pairs
    }

    fn effect_edges(&self) -> AHashSet<(Node, Node)> {
        let variables = self.score.variables();
        let mut edges = AHashSet::new();
        for (ix, x) in variables.iter().enumerate() {
            for (iy, y) in variables.iter().enumerate() {
                if ix == iy {
                    continue;
                }
                match self.score.local_score_diff(ix, iy, &[]) {
                    Ok(bump) if self.score.is_effect_edge(bump) => {
                        edges.insert((x.clone(), y.clone()));
                    }
                    Ok(_) => {}
                    Err(err) => debug!(x = %x, y = %y, error = %err, "no marginal effect score"),
                }
            }
        }
        debug!(count = edges.len(), "effect edges");
        edges
    }

    /// Put required edges into `graph` and turn undirected edges away from
    /// forbidden directions.
    fn add_required_edges(&self, graph: &mut Graph) -> Result<()> {
        if self.knowledge.is_empty() {
            return Ok(());
        }

        for (from, to) in self.knowledge.required_edges() {
            let (a, b) = (self.node(graph, from)?, self.node(graph, to)?);
            if graph.is_ancestor_of(&b, &a) {
                debug!(from, to, "required edge would close a cycle; skipped");
                continue;
            }
            graph.add_directed_edge(&a, &b)?;
            debug!(from, to, "added required edge");
        }

        let undirected: Vec<(Node, Node)> = graph
            .edges()
            .filter(|e| e.is_undirected())
            .map(|e| (e.node1().clone(), e.node2().clone()))
            .collect();
        for (a, b) in undirected {
            let a_to_b = self.knowledge.is_forbidden(a.name(), b.name());
            let b_to_a = self.knowledge.is_forbidden(b.name(), a.name());
            let (from, to) = match (a_to_b, b_to_a) {
                (true, false) => (b, a),
                (false, true) => (a, b),
                _ => continue,
            };
            if !graph.exists_directed_path_from_to(&to, &from) {
                graph.add_directed_edge(&from, &to)?;
            }
        }
        Ok(())
    }

    fn node(&self, graph: &Graph, name: &str) -> Result<Node> {
        graph
            .node(name)
            .cloned()
            .ok_or_else(|| SearchError::UnknownVariable(name.to_string()))
    }
}

/// Adjacent pairs in edge order: `(tail, head)` for a directed edge, both
/// orders (smaller node first) for an undirected one.
fn delete_candidates(graph: &Graph) -> Vec<(Node, Node)> {
    let mut pairs = Vec::new();
    for edge in graph.edges() {
        match (edge.directed_tail(), edge.directed_head()) {
            (Some(tail), Some(head)) => pairs.push((tail.clone(), head.clone())),
            _ => {
                let (a, b) = (edge.node1().min(edge.node2()), edge.node1().max(edge.node2()));
                pairs.push((a.clone(), b.clone()));
                pairs.push((b.clone(), a.clone()));
            }
        }
    }
    pairs
}
