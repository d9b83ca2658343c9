//! Local scores for score-based search.
//!
//! A score is decomposable: the score of a DAG is the sum over its nodes of
//! `local_score(node, parents)`. Higher is better. Variables are addressed by
//! their column index in [`Score::variables`].

mod sem_bic;

pub use sem_bic::SemBicScore;

use causeway_graph::Node;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    /// The parents' covariance could not be inverted.
    #[error("singular covariance when scoring {node} given {parents:?}")]
    Singular { node: String, parents: Vec<String> },

    #[error("non-finite score for {node} given {parents:?}")]
    NonFinite { node: String, parents: Vec<String> },

    #[error("variable {0} is not known to the score")]
    UnknownVariable(String),

    #[error("variable index {0} is out of range")]
    IndexOutOfRange(usize),

    #[error("penalty discount must be >= 0, got {0}")]
    InvalidPenaltyDiscount(f64),
}

pub trait Score: Send + Sync {
    /// Variables in column order.
    fn variables(&self) -> &[Node];

    fn sample_size(&self) -> usize;

    /// Score of `node` with exactly `parents` as parents. The order of
    /// `parents` does not matter.
    fn local_score(&self, node: usize, parents: &[usize]) -> Result<f64, ScoreError>;

    /// Change in `y`'s score from adding `x` to parents `z`.
    fn local_score_diff(&self, x: usize, y: usize, z: &[usize]) -> Result<f64, ScoreError> {
        let mut with_x = z.to_vec();
        with_x.push(x);
        Ok(self.local_score(y, &with_x)? - self.local_score(y, z)?)
    }

    /// Whether a single-parent bump indicates a real dependence.
    fn is_effect_edge(&self, bump: f64) -> bool {
        bump > 0.0
    }
}
