use causeway_graph::Graph;

/// A pattern together with the running score it was reached at.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredGraph {
    pub graph: Graph,
    pub score: f64,
}

/// Keeps the `capacity` best distinct graphs offered to it, best first.
#[derive(Debug, Clone, Default)]
pub struct TopGraphs {
    capacity: usize,
    entries: Vec<ScoredGraph>,
}

impl TopGraphs {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Returns true if the graph was kept.
    pub fn offer(&mut self, graph: &Graph, score: f64) -> bool {
        if self.capacity == 0 || score.is_nan() {
            return false;
        }
        if self.entries.iter().any(|e| &e.graph == graph) {
            return false;
        }
        if self.entries.len() == self.capacity {
            match self.entries.last() {
                Some(worst) if worst.score >= score => return false,
                _ => {
                    self.entries.pop();
                }
            }
        }

        // Equal scores keep arrival order.
        let at = self
            .entries
            .iter()
            .position(|e| e.score < score)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            at,
            ScoredGraph {
                graph: graph.clone(),
                score,
            },
        );
        true
    }

    pub fn as_slice(&self) -> &[ScoredGraph] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
