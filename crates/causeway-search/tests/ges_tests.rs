//! End-to-end GES runs on covariance matrices with known structure.

use approx::assert_relative_eq;
use causeway_graph::{pdag_to_dag, Graph, Node};
use causeway_search::{
    AppliedOperator, CovarianceMatrix, Ges, GesConfig, Knowledge, KnowledgeViolation,
    OperatorKind, SearchError, SearchObserver, SearchPhase,
};
use std::sync::{Arc, Mutex};

/// Implied covariance of x1 --> x3 <-- x2, x3 --> x4 with coefficients 0.8,
/// 0.7 and 0.9 and unit noise.
fn collider_chain(sample_size: usize) -> CovarianceMatrix {
    let names = ["x1", "x2", "x3", "x4"].iter().map(|s| s.to_string()).collect();
    CovarianceMatrix::from_rows(
        names,
        vec![
            vec![1.0, 0.0, 0.8, 0.72],
            vec![0.0, 1.0, 0.7, 0.63],
            vec![0.8, 0.7, 2.13, 1.917],
            vec![0.72, 0.63, 1.917, 2.7253],
        ],
        sample_size,
    )
    .unwrap()
}

fn node(graph: &Graph, name: &str) -> Node {
    graph.node(name).cloned().unwrap()
}

#[test]
fn recovers_collider_and_downstream_orientation() {
    let mut ges = Ges::from_covariance(collider_chain(1000), &GesConfig::default()).unwrap();
    let pattern = ges.search().unwrap();

    let (x1, x2, x3, x4) = (
        node(&pattern, "x1"),
        node(&pattern, "x2"),
        node(&pattern, "x3"),
        node(&pattern, "x4"),
    );
    assert_eq!(pattern.num_edges(), 3);
    assert!(pattern.is_directed_from_to(&x1, &x3));
    assert!(pattern.is_directed_from_to(&x2, &x3));
    assert!(pattern.is_directed_from_to(&x3, &x4));
    assert!(ges.score() > 0.0);
}

#[test]
fn running_score_matches_rescored_dag() {
    let mut ges = Ges::from_covariance(collider_chain(1000), &GesConfig::default()).unwrap();
    let pattern = ges.search().unwrap();

    let dag = pdag_to_dag(&pattern).unwrap();
    let empty = pattern.empty_copy();
    let expected = ges.score_dag(&dag).unwrap() - ges.score_dag(&empty).unwrap();
    assert_relative_eq!(ges.score(), expected, max_relative = 1e-6);
}

#[test]
fn parallel_scan_matches_sequential() {
    let sequential = Ges::from_covariance(collider_chain(500), &GesConfig::default())
        .unwrap()
        .search()
        .unwrap();
    let config = GesConfig {
        parallel: true,
        ..GesConfig::default()
    };
    let parallel = Ges::from_covariance(collider_chain(500), &config)
        .unwrap()
        .search()
        .unwrap();
    assert_eq!(sequential.to_record(), parallel.to_record());
}

#[derive(Default, Clone)]
struct Recorder {
    operators: Arc<Mutex<Vec<AppliedOperator>>>,
    phases: Arc<Mutex<Vec<(SearchPhase, bool)>>>,
}

impl SearchObserver for Recorder {
    fn phase_started(&mut self, phase: SearchPhase, _graph: &Graph) {
        self.phases.lock().unwrap().push((phase, true));
    }

    fn operator_applied(&mut self, operator: &AppliedOperator, _graph: &Graph) {
        self.operators.lock().unwrap().push(operator.clone());
    }

    fn phase_finished(&mut self, phase: SearchPhase, _graph: &Graph, _total_score: f64) {
        self.phases.lock().unwrap().push((phase, false));
    }
}

#[test]
fn every_applied_operator_improves_the_score() {
    let recorder = Recorder::default();
    let mut ges = Ges::from_covariance(collider_chain(1000), &GesConfig::default())
        .unwrap()
        .with_observer(recorder.clone());
    ges.search().unwrap();

    let operators = recorder.operators.lock().unwrap();
    assert!(!operators.is_empty());
    assert!(operators.iter().all(|op| op.bump > 0.0));
    assert!(operators
        .windows(2)
        .all(|w| w[1].total_score > w[0].total_score));
    assert_relative_eq!(
        operators.last().unwrap().total_score,
        ges.score(),
        epsilon = 1e-9
    );
    assert!(operators
        .iter()
        .any(|op| op.kind == OperatorKind::Insert));

    assert_eq!(
        *recorder.phases.lock().unwrap(),
        vec![
            (SearchPhase::Forward, true),
            (SearchPhase::Forward, false),
            (SearchPhase::Backward, true),
            (SearchPhase::Backward, false),
        ]
    );
}

#[test]
fn knowledge_is_respected() {
    let mut knowledge = Knowledge::new();
    knowledge.add_to_tier(0, "x4");
    for name in ["x1", "x2", "x3"] {
        knowledge.add_to_tier(1, name);
    }
    let mut ges = Ges::from_covariance(collider_chain(1000), &GesConfig::default())
        .unwrap()
        .with_knowledge(knowledge.clone())
        .unwrap();
    let pattern = ges.search().unwrap();

    assert!(!knowledge.is_violated_by(&pattern));
    let x4 = node(&pattern, "x4");
    assert!(pattern.parents(&x4).is_empty());
}

#[test]
fn required_edge_survives_backward_phase() {
    let mut knowledge = Knowledge::new();
    knowledge.set_required("x1", "x2");
    let mut ges = Ges::from_covariance(collider_chain(1000), &GesConfig::default())
        .unwrap()
        .with_knowledge(knowledge)
        .unwrap();
    let pattern = ges.search().unwrap();

    assert!(pattern.is_directed_from_to(&node(&pattern, "x1"), &node(&pattern, "x2")));
}

#[test]
fn forbidden_pair_stays_non_adjacent() {
    let mut knowledge = Knowledge::new();
    knowledge.set_forbidden("x3", "x4");
    knowledge.set_forbidden("x4", "x3");
    let mut ges = Ges::from_covariance(collider_chain(1000), &GesConfig::default())
        .unwrap()
        .with_knowledge(knowledge)
        .unwrap();
    let pattern = ges.search().unwrap();

    assert!(!pattern.is_adjacent(&node(&pattern, "x3"), &node(&pattern, "x4")));
}

#[test]
fn edge_limit_stops_forward_phase() {
    let config = GesConfig {
        max_num_edges: Some(1),
        ..GesConfig::default()
    };
    let pattern = Ges::from_covariance(collider_chain(1000), &config)
        .unwrap()
        .search()
        .unwrap();
    assert!(pattern.num_edges() <= 1);
}

#[test]
fn top_graphs_are_kept_best_first() {
    let config = GesConfig {
        num_patterns_to_store: 3,
        ..GesConfig::default()
    };
    let mut ges = Ges::from_covariance(collider_chain(1000), &config).unwrap();
    ges.search().unwrap();

    let top = ges.top_graphs();
    assert!(!top.is_empty() && top.len() <= 3);
    assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
    assert_relative_eq!(top[0].score, ges.score(), epsilon = 1e-9);
}

#[test]
fn prevent_cycles_result_is_acyclic() {
    let config = GesConfig {
        aggressively_prevent_cycles: true,
        ..GesConfig::default()
    };
    let pattern = Ges::from_covariance(collider_chain(1000), &config)
        .unwrap()
        .search()
        .unwrap();
    assert!(!pattern.exists_directed_cycle());
}

#[test]
fn singular_candidates_are_skipped() {
    // x2 duplicates x1, so any parent set holding both is singular.
    let names = ["x1", "x2", "x3"].iter().map(|s| s.to_string()).collect();
    let cov = CovarianceMatrix::from_rows(
        names,
        vec![
            vec![1.0, 1.0, 0.5],
            vec![1.0, 1.0, 0.5],
            vec![0.5, 0.5, 1.0],
        ],
        200,
    )
    .unwrap();
    let mut ges = Ges::from_covariance(cov, &GesConfig::default()).unwrap();
    let pattern = ges.search().unwrap();
    assert!(pattern.num_edges() >= 1);
}

#[test]
fn initial_graph_must_match_variables() {
    let other = Graph::with_nodes(Node::many(&["x1", "x2", "x3", "y"])).unwrap();
    let result = Ges::from_covariance(collider_chain(100), &GesConfig::default())
        .unwrap()
        .with_initial_graph(&other);
    assert!(matches!(result, Err(SearchError::VariableMismatch)));
}

#[test]
fn initial_graph_reversing_a_required_edge_is_rejected() {
    let nodes = Node::many(&["x1", "x2", "x3", "x4"]);
    let mut initial = Graph::with_nodes(nodes.clone()).unwrap();
    initial.add_directed_edge(&nodes[1], &nodes[0]).unwrap();

    let mut knowledge = Knowledge::new();
    knowledge.set_required("x1", "x2");
    let reversed = KnowledgeViolation::RequiredEdgeReversed {
        from: "x1".into(),
        to: "x2".into(),
    };

    // Knowledge first, then the graph.
    let result = Ges::from_covariance(collider_chain(100), &GesConfig::default())
        .unwrap()
        .with_knowledge(knowledge.clone())
        .unwrap()
        .with_initial_graph(&initial);
    assert_eq!(
        result.err(),
        Some(SearchError::Knowledge(reversed.clone()))
    );

    // Graph first, then the knowledge.
    let result = Ges::from_covariance(collider_chain(100), &GesConfig::default())
        .unwrap()
        .with_initial_graph(&initial)
        .unwrap()
        .with_knowledge(knowledge);
    assert_eq!(result.err(), Some(SearchError::Knowledge(reversed)));
}

#[test]
fn search_can_start_from_initial_graph() {
    let nodes = Node::many(&["x1", "x2", "x3", "x4"]);
    let mut initial = Graph::with_nodes(nodes.clone()).unwrap();
    initial.add_undirected_edge(&nodes[0], &nodes[3]).unwrap();

    let mut ges = Ges::from_covariance(collider_chain(1000), &GesConfig::default())
        .unwrap()
        .with_initial_graph(&initial)
        .unwrap();
    let pattern = ges.search().unwrap();

    // x1 and x4 are independent given x3, so the backward phase drops the
    // seeded edge. The forward phase never revisits it.
    let adjacent = |a: &str, b: &str| pattern.is_adjacent(&node(&pattern, a), &node(&pattern, b));
    assert!(!adjacent("x1", "x4"));
    assert!(adjacent("x1", "x3"));
    assert!(adjacent("x2", "x3"));
    assert!(adjacent("x3", "x4"));
    assert_eq!(pattern.num_edges(), 3);
}

#[test]
fn knowledge_with_unknown_variable_is_rejected() {
    let mut knowledge = Knowledge::new();
    knowledge.set_forbidden("x1", "nope");
    let result = Ges::from_covariance(collider_chain(100), &GesConfig::default())
        .unwrap()
        .with_knowledge(knowledge);
    assert!(matches!(result, Err(SearchError::Knowledge(_))));
}

#[test]
fn invalid_config_is_rejected() {
    let config = GesConfig {
        depth: -3,
        ..GesConfig::default()
    };
    assert!(matches!(
        Ges::from_covariance(collider_chain(100), &config),
        Err(SearchError::InvalidConfig(_))
    ));
}
