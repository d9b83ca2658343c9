use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A mutation referred to an edge that is not in the graph.
    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("self-loop on {0} is not allowed")]
    SelfLoop(String),

    #[error("node {0} is not in the graph")]
    UnknownNode(String),

    #[error("a node named {0} is already in the graph")]
    DuplicateNode(String),

    /// The partially directed graph admits no consistent DAG extension.
    #[error("pattern has no consistent DAG extension")]
    NotExtendable,
}

pub type Result<T> = std::result::Result<T, GraphError>;
