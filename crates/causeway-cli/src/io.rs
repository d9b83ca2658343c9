//! JSON inputs and outputs for the CLI.

use anyhow::{bail, Context, Result};
use causeway_graph::{Graph, GraphRecord};
use causeway_search::{CovarianceMatrix, DataSet, GesConfig, Knowledge, ScoredGraph};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Either a covariance matrix with its sample size or raw rows.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContinuousInput {
    Covariance {
        variables: Vec<String>,
        sample_size: usize,
        matrix: Vec<Vec<f64>>,
    },
    Data {
        variables: Vec<String>,
        rows: Vec<Vec<f64>>,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {what} file {}", path.display()))
}

/// Load a covariance matrix, estimating it first when the file holds rows.
pub fn load_covariance(path: &Path) -> Result<CovarianceMatrix> {
    let input: ContinuousInput = read_json(path, "covariance")?;
    let covariances = match input {
        ContinuousInput::Covariance {
            variables,
            sample_size,
            matrix,
        } => CovarianceMatrix::from_rows(variables, matrix, sample_size)?,
        ContinuousInput::Data { variables, rows } => DataSet::new(variables, rows)?.covariance(),
    };
    Ok(covariances)
}

pub fn load_knowledge(path: &Path) -> Result<Knowledge> {
    let knowledge: Knowledge = read_json(path, "knowledge")?;
    knowledge.check_consistent()?;
    Ok(knowledge)
}

pub fn load_config(path: &Path) -> Result<GesConfig> {
    let config: GesConfig = read_json(path, "config")?;
    config.validate()?;
    Ok(config)
}

pub fn load_graph(path: &Path) -> Result<Graph> {
    let record: GraphRecord = read_json(path, "graph")?;
    if record.nodes.is_empty() {
        bail!("graph file {} has no nodes", path.display());
    }
    Ok(Graph::from_record(&record)?)
}

#[derive(Debug, Serialize)]
pub struct StoredPattern {
    pub score: f64,
    pub graph: GraphRecord,
}

/// What `causeway ges` writes.
#[derive(Debug, Serialize)]
pub struct GesReport {
    pub score: f64,
    pub elapsed_ms: u64,
    pub pattern: GraphRecord,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_graphs: Vec<StoredPattern>,
}

impl GesReport {
    pub fn new(pattern: &Graph, score: f64, elapsed_ms: u64, top: &[ScoredGraph]) -> Self {
        Self {
            score,
            elapsed_ms,
            pattern: pattern.to_record(),
            top_graphs: top
                .iter()
                .map(|s| StoredPattern {
                    score: s.score,
                    graph: s.graph.to_record(),
                })
                .collect(),
        }
    }
}

/// Pretty JSON to `out`, or to stdout when no path is given.
pub fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => fs::write(path, text + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{text}"),
    }
    Ok(())
}
