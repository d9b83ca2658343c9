use crate::data::DataError;
use crate::knowledge::KnowledgeViolation;
use crate::score::ScoreError;
use causeway_graph::GraphError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeViolation),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("initial graph variables do not match the score's variables")]
    VariableMismatch,

    #[error("variable {0} is not known to the score")]
    UnknownVariable(String),

    #[error("graph is not a DAG")]
    NotADag,
}

pub type Result<T> = std::result::Result<T, SearchError>;
