//! Causeway search
//!
//! Score-based structure search over continuous data:
//!
//! - **Scores**: [`Score`] is the decomposable local-score oracle;
//!   [`SemBicScore`] is the linear-Gaussian BIC
//! - **Search**: [`Ges`] runs greedy equivalence search (forward inserts,
//!   then backward deletes) and returns a pattern
//! - **Orientation**: [`MeekRules`] propagates implied orientations to a
//!   fixed point; [`pattern_for_dag`] builds the pattern of a DAG
//! - **Constraints**: [`Knowledge`] holds forbidden and required edges and
//!   temporal tiers
//! - **Inputs**: [`DataSet`] and [`CovarianceMatrix`] validate data before a
//!   score is built
//!
//! Progress is reported through `tracing`; callers that want the events as
//! values can install a [`SearchObserver`].

pub mod config;
pub mod data;
mod error;
pub mod ges;
pub mod knowledge;
pub mod meek;
pub mod observer;
pub mod score;
mod scored_graph;

pub use config::{GesConfig, MeekConfig, Rule4Mode, UNLIMITED_DEPTH};
pub use data::{CovarianceMatrix, DataError, DataSet};
pub use error::{Result, SearchError};
pub use ges::Ges;
pub use knowledge::{Knowledge, KnowledgeViolation};
pub use meek::{pattern_for_dag, MeekRules};
pub use observer::{
    AppliedOperator, MeekRule, NoopObserver, OperatorKind, SearchObserver, SearchPhase,
};
pub use score::{Score, ScoreError, SemBicScore};
pub use scored_graph::{ScoredGraph, TopGraphs};
