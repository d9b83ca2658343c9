//! Search configuration.

use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};

/// Stand-in for "unlimited" wherever a depth or bound of -1 is given.
pub const UNLIMITED_DEPTH: usize = 1000;

/// Options for [`crate::Ges`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GesConfig {
    /// Largest T subset tried by an insert; -1 means unlimited.
    pub depth: i32,
    /// Multiplier on the BIC complexity penalty.
    pub penalty_discount: f64,
    /// Only try inserting X --> Y when X alone already improves Y's score.
    pub faithfulness_assumed: bool,
    /// Reject any orientation or insert that would close a directed cycle.
    pub aggressively_prevent_cycles: bool,
    /// Stop the forward phase once the graph has this many edges.
    pub max_num_edges: Option<usize>,
    /// How many of the best patterns seen to keep; 0 keeps none.
    pub num_patterns_to_store: usize,
    /// Longest semi-directed path followed by the insert cycle check; -1
    /// means unlimited.
    pub cycle_bound: i32,
    /// Score candidate operators on the rayon thread pool.
    pub parallel: bool,
}

impl Default for GesConfig {
    fn default() -> Self {
        Self {
            depth: -1,
            penalty_discount: 1.0,
            faithfulness_assumed: true,
            aggressively_prevent_cycles: false,
            max_num_edges: None,
            num_patterns_to_store: 0,
            cycle_bound: -1,
            parallel: false,
        }
    }
}

impl GesConfig {
    pub fn validate(&self) -> Result<()> {
        if self.depth < -1 {
            return Err(SearchError::InvalidConfig(format!(
                "depth must be -1 or >= 0, got {}",
                self.depth
            )));
        }
        if self.cycle_bound < -1 {
            return Err(SearchError::InvalidConfig(format!(
                "cycle bound must be -1 or >= 0, got {}",
                self.cycle_bound
            )));
        }
        if !(self.penalty_discount >= 0.0) {
            return Err(SearchError::InvalidConfig(format!(
                "penalty discount must be >= 0, got {}",
                self.penalty_discount
            )));
        }
        Ok(())
    }

    pub fn effective_depth(&self) -> usize {
        resolve_limit(self.depth)
    }

    pub fn effective_cycle_bound(&self) -> usize {
        resolve_limit(self.cycle_bound)
    }

    pub(crate) fn meek_config(&self) -> MeekConfig {
        MeekConfig {
            aggressively_prevent_cycles: self.aggressively_prevent_cycles,
            rule4: Rule4Mode::Auto,
        }
    }
}

fn resolve_limit(value: i32) -> usize {
    usize::try_from(value).unwrap_or(UNLIMITED_DEPTH)
}

/// When Meek's fourth rule runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule4Mode {
    /// Only when background knowledge is non-empty; without knowledge the
    /// rule can never fire on a pattern.
    #[default]
    Auto,
    Always,
    Never,
}

/// Options for [`crate::MeekRules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeekConfig {
    /// Refuse to orient `x --> y` when `y` is already an ancestor of `x`.
    pub aggressively_prevent_cycles: bool,
    pub rule4: Rule4Mode,
}
