use super::{Score, ScoreError};
use crate::data::{CovarianceMatrix, DataError, DataSet};
use causeway_graph::Node;
use nalgebra::DVector;
use std::f64::consts::PI;

/// Linear-Gaussian BIC score computed from a covariance matrix.
///
/// For node `y` with parents `P` and residual variance
/// `s2 = S_yy - S_yP inv(S_PP) S_Py`:
///
/// ```text
/// lik   = -n/2 * (ln(2 pi s2) + 1)
/// score = 2 lik - c |P| ln n
/// ```
///
/// where `c` is the penalty discount (1.0 gives standard BIC).
#[derive(Debug, Clone)]
pub struct SemBicScore {
    covariances: CovarianceMatrix,
    penalty_discount: f64,
    log_n: f64,
}

impl SemBicScore {
    pub fn new(covariances: CovarianceMatrix) -> Self {
        let log_n = (covariances.sample_size() as f64).ln();
        Self {
            covariances,
            penalty_discount: 1.0,
            log_n,
        }
    }

    pub fn from_dataset(data: &DataSet) -> Result<Self, DataError> {
        Ok(Self::new(data.covariance()))
    }

    pub fn with_penalty_discount(mut self, penalty_discount: f64) -> Result<Self, ScoreError> {
        if !(penalty_discount >= 0.0) {
            return Err(ScoreError::InvalidPenaltyDiscount(penalty_discount));
        }
        self.penalty_discount = penalty_discount;
        Ok(self)
    }

    pub fn penalty_discount(&self) -> f64 {
        self.penalty_discount
    }

    pub fn covariances(&self) -> &CovarianceMatrix {
        &self.covariances
    }

    fn names(&self, node: usize, parents: &[usize]) -> (String, Vec<String>) {
        let vars = self.covariances.variables();
        (
            vars[node].name().to_string(),
            parents.iter().map(|&p| vars[p].name().to_string()).collect(),
        )
    }

    fn residual_variance(&self, node: usize, parents: &[usize]) -> Result<f64, ScoreError> {
        let s_yy = self.covariances.get(node, node);
        if parents.is_empty() {
            return Ok(s_yy);
        }

        let s_pp = self.covariances.submatrix(parents, parents);
        let s_py: DVector<f64> =
            DVector::from_iterator(parents.len(), parents.iter().map(|&p| self.covariances.get(p, node)));

        let singular = || {
            let (node, parents) = self.names(node, parents);
            ScoreError::Singular { node, parents }
        };

        let coefs = s_pp.cholesky().ok_or_else(singular)?.solve(&s_py);
        let s2 = s_yy - s_py.dot(&coefs);
        if s2 > 0.0 {
            Ok(s2)
        } else {
            Err(singular())
        }
    }
}

impl Score for SemBicScore {
    fn variables(&self) -> &[Node] {
        self.covariances.variables()
    }

    fn sample_size(&self) -> usize {
        self.covariances.sample_size()
    }

    fn local_score(&self, node: usize, parents: &[usize]) -> Result<f64, ScoreError> {
        let dim = self.covariances.dim();
        if node >= dim {
            return Err(ScoreError::IndexOutOfRange(node));
        }
        if let Some(&bad) = parents.iter().find(|&&p| p >= dim) {
            return Err(ScoreError::IndexOutOfRange(bad));
        }

        let mut parents = parents.to_vec();
        parents.sort_unstable();
        parents.dedup();

        let n = self.covariances.sample_size() as f64;
        let s2 = self.residual_variance(node, &parents)?;
        let lik = -0.5 * n * ((2.0 * PI * s2).ln() + 1.0);
        let score = 2.0 * lik - self.penalty_discount * parents.len() as f64 * self.log_n;

        if score.is_finite() {
            Ok(score)
        } else {
            let (node, parents) = self.names(node, &parents);
            Err(ScoreError::NonFinite { node, parents })
        }
    }
}
