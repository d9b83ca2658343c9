//! Continuous data inputs for the scores.
//!
//! Both types validate on construction so malformed input is rejected
//! before any search starts.

use causeway_graph::Node;
use nalgebra::DMatrix;
use std::collections::HashSet;
use thiserror::Error;

/// Relative tolerance for the symmetry check on covariance input.
const SYMMETRY_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("no variables")]
    NoVariables,

    #[error("duplicate variable name {0}")]
    DuplicateVariable(String),

    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("missing or non-finite value at row {row}, column {column}")]
    MissingValue { row: usize, column: usize },

    #[error("need at least 2 rows to estimate covariance, got {0}")]
    TooFewRows(usize),

    #[error("covariance matrix is {rows}x{cols}, expected square")]
    NotSquare { rows: usize, cols: usize },

    #[error("{variables} variables but covariance matrix has dimension {dim}")]
    DimensionMismatch { variables: usize, dim: usize },

    #[error("covariance matrix is not symmetric at ({i}, {j})")]
    Asymmetric { i: usize, j: usize },

    #[error("covariance matrix has a non-finite entry at ({i}, {j})")]
    NonFinite { i: usize, j: usize },

    #[error("sample size must be at least 1")]
    InvalidSampleSize,
}

fn check_names(names: &[String]) -> Result<(), DataError> {
    if names.is_empty() {
        return Err(DataError::NoVariables);
    }
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(DataError::DuplicateVariable(name.clone()));
        }
    }
    Ok(())
}

/// Rows of continuous observations over named variables.
#[derive(Debug, Clone)]
pub struct DataSet {
    variables: Vec<Node>,
    rows: Vec<Vec<f64>>,
}

impl DataSet {
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, DataError> {
        check_names(&names)?;
        let width = names.len();
        for (r, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(DataError::RaggedRow {
                    row: r,
                    expected: width,
                    found: row.len(),
                });
            }
            if let Some(c) = row.iter().position(|v| !v.is_finite()) {
                return Err(DataError::MissingValue { row: r, column: c });
            }
        }
        if rows.len() < 2 {
            return Err(DataError::TooFewRows(rows.len()));
        }

        Ok(Self {
            variables: names.into_iter().map(Node::new).collect(),
            rows,
        })
    }

    pub fn variables(&self) -> &[Node] {
        &self.variables
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Unbiased sample covariance over the same variables.
    pub fn covariance(&self) -> CovarianceMatrix {
        let n = self.rows.len();
        let p = self.variables.len();
        let means: Vec<f64> = (0..p)
            .map(|c| self.rows.iter().map(|row| row[c]).sum::<f64>() / n as f64)
            .collect();
        let centered = DMatrix::from_fn(n, p, |r, c| self.rows[r][c] - means[c]);
        let matrix = centered.transpose() * &centered / (n as f64 - 1.0);

        CovarianceMatrix {
            variables: self.variables.clone(),
            matrix,
            sample_size: n,
        }
    }
}

/// A covariance matrix with the sample size it was estimated from.
#[derive(Debug, Clone)]
pub struct CovarianceMatrix {
    variables: Vec<Node>,
    matrix: DMatrix<f64>,
    sample_size: usize,
}

impl CovarianceMatrix {
    pub fn new(
        variables: Vec<Node>,
        matrix: DMatrix<f64>,
        sample_size: usize,
    ) -> Result<Self, DataError> {
        let names: Vec<String> = variables.iter().map(|v| v.name().to_string()).collect();
        check_names(&names)?;

        let (rows, cols) = matrix.shape();
        if rows != cols {
            return Err(DataError::NotSquare { rows, cols });
        }
        if rows != variables.len() {
            return Err(DataError::DimensionMismatch {
                variables: variables.len(),
                dim: rows,
            });
        }
        if sample_size < 1 {
            return Err(DataError::InvalidSampleSize);
        }

        for i in 0..rows {
            for j in 0..cols {
                let v = matrix[(i, j)];
                if !v.is_finite() {
                    return Err(DataError::NonFinite { i, j });
                }
                if j > i {
                    let w = matrix[(j, i)];
                    let scale = v.abs().max(w.abs()).max(1.0);
                    if (v - w).abs() > SYMMETRY_TOLERANCE * scale {
                        return Err(DataError::Asymmetric { i, j });
                    }
                }
            }
        }

        Ok(Self {
            variables,
            matrix,
            sample_size,
        })
    }

    /// Build from names and row-major nested vectors.
    pub fn from_rows(
        names: Vec<String>,
        rows: Vec<Vec<f64>>,
        sample_size: usize,
    ) -> Result<Self, DataError> {
        let dim = rows.len();
        for (r, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(DataError::NotSquare {
                    rows: dim,
                    cols: row.len(),
                });
            }
            if let Some(c) = row.iter().position(|v| !v.is_finite()) {
                return Err(DataError::NonFinite { i: r, j: c });
            }
        }
        let matrix = DMatrix::from_fn(dim, dim, |i, j| rows[i][j]);
        Self::new(names.into_iter().map(Node::new).collect(), matrix, sample_size)
    }

    pub fn variables(&self) -> &[Node] {
        &self.variables
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn dim(&self) -> usize {
        self.variables.len()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[(i, j)]
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Entries at `rows` x `cols`, in the order given.
    pub fn submatrix(&self, rows: &[usize], cols: &[usize]) -> DMatrix<f64> {
        DMatrix::from_fn(rows.len(), cols.len(), |i, j| self.matrix[(rows[i], cols[j])])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn covariance_of_small_dataset() {
        let data = DataSet::new(
            names(&["X", "Y"]),
            vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]],
        )
        .unwrap();
        let cov = data.covariance();
        assert_eq!(cov.sample_size(), 3);
        assert_relative_eq!(cov.get(0, 0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(cov.get(0, 1), 2.0, epsilon = 1e-12);
        assert_relative_eq!(cov.get(1, 1), 4.0, epsilon = 1e-12);
        assert_eq!(cov.variables()[1].name(), "Y");
    }

    #[test]
    fn dataset_rejects_malformed_input() {
        assert_eq!(
            DataSet::new(names(&["X", "X"]), vec![]).unwrap_err(),
            DataError::DuplicateVariable("X".into())
        );
        assert_eq!(
            DataSet::new(names(&["X", "Y"]), vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err(),
            DataError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            }
        );
        assert_eq!(
            DataSet::new(names(&["X"]), vec![vec![1.0], vec![f64::NAN]]).unwrap_err(),
            DataError::MissingValue { row: 1, column: 0 }
        );
        assert_eq!(
            DataSet::new(names(&["X"]), vec![vec![1.0]]).unwrap_err(),
            DataError::TooFewRows(1)
        );
    }

    #[test]
    fn covariance_rejects_malformed_input() {
        assert!(matches!(
            CovarianceMatrix::from_rows(names(&["X", "Y"]), vec![vec![1.0, 0.5]], 10),
            Err(DataError::NotSquare { .. })
        ));
        assert!(matches!(
            CovarianceMatrix::from_rows(
                names(&["X", "Y"]),
                vec![vec![1.0, 0.5], vec![0.4, 1.0]],
                10
            ),
            Err(DataError::Asymmetric { i: 0, j: 1 })
        ));
        assert!(matches!(
            CovarianceMatrix::from_rows(names(&["X"]), vec![vec![1.0]], 0),
            Err(DataError::InvalidSampleSize)
        ));
        assert!(matches!(
            CovarianceMatrix::from_rows(names(&["X", "Y", "Z"]), vec![vec![1.0, 0.0], vec![0.0, 1.0]], 5),
            Err(DataError::DimensionMismatch { variables: 3, dim: 2 })
        ));
    }

    #[test]
    fn submatrix_follows_index_order() {
        let cov = CovarianceMatrix::from_rows(
            names(&["A", "B", "C"]),
            vec![
                vec![1.0, 0.1, 0.2],
                vec![0.1, 2.0, 0.3],
                vec![0.2, 0.3, 3.0],
            ],
            100,
        )
        .unwrap();
        let sub = cov.submatrix(&[2, 0], &[1]);
        assert_eq!(sub.shape(), (2, 1));
        assert_relative_eq!(sub[(0, 0)], 0.3);
        assert_relative_eq!(sub[(1, 0)], 0.1);
    }
}
