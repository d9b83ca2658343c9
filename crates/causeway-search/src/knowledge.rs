//! Background knowledge: forbidden and required directed edges.
//!
//! Rules are stated over variable names. Besides explicit pairs, variables
//! may be placed in numbered temporal tiers: nothing in a later tier may
//! point into an earlier one, and a tier can additionally forbid edges among
//! its own members.

use causeway_graph::Graph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KnowledgeViolation {
    #[error("edge {from} --> {to} is both required and forbidden")]
    Contradiction { from: String, to: String },

    #[error("graph contains forbidden edge {from} --> {to}")]
    ForbiddenEdgePresent { from: String, to: String },

    /// The graph holds `to --> from` although `from --> to` is required.
    #[error("required edge {from} --> {to} is reversed in the graph")]
    RequiredEdgeReversed { from: String, to: String },

    #[error("knowledge mentions unknown variable {0}")]
    UnknownVariable(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Knowledge {
    forbidden: BTreeSet<(String, String)>,
    required: BTreeSet<(String, String)>,
    /// tier -> variables
    tiers: BTreeMap<usize, BTreeSet<String>>,
    forbidden_within: BTreeSet<usize>,
}

impl Knowledge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_forbidden(&mut self, from: &str, to: &str) {
        self.forbidden.insert((from.to_string(), to.to_string()));
    }

    pub fn remove_forbidden(&mut self, from: &str, to: &str) {
        self.forbidden.remove(&(from.to_string(), to.to_string()));
    }

    pub fn set_required(&mut self, from: &str, to: &str) {
        self.required.insert((from.to_string(), to.to_string()));
    }

    pub fn remove_required(&mut self, from: &str, to: &str) {
        self.required.remove(&(from.to_string(), to.to_string()));
    }

    /// Place `var` in `tier`, moving it out of any tier it was in.
    pub fn add_to_tier(&mut self, tier: usize, var: &str) {
        for members in self.tiers.values_mut() {
            members.remove(var);
        }
        self.tiers.entry(tier).or_default().insert(var.to_string());
    }

    pub fn set_tier_forbidden_within(&mut self, tier: usize, forbidden: bool) {
        if forbidden {
            self.forbidden_within.insert(tier);
        } else {
            self.forbidden_within.remove(&tier);
        }
    }

    pub fn tier_of(&self, var: &str) -> Option<usize> {
        self.tiers
            .iter()
            .find(|(_, members)| members.contains(var))
            .map(|(tier, _)| *tier)
    }

    /// Whether `from --> to` is ruled out, explicitly or by tiers.
    pub fn is_forbidden(&self, from: &str, to: &str) -> bool {
        if from == to {
            return false;
        }
        self.forbidden.contains(&(from.to_string(), to.to_string()))
            || self.is_forbidden_by_tiers(from, to)
    }

    pub fn is_forbidden_by_tiers(&self, from: &str, to: &str) -> bool {
        match (self.tier_of(from), self.tier_of(to)) {
            (Some(tf), Some(tt)) => tf > tt || (tf == tt && self.forbidden_within.contains(&tf)),
            _ => false,
        }
    }

    pub fn is_required(&self, from: &str, to: &str) -> bool {
        from != to && self.required.contains(&(from.to_string(), to.to_string()))
    }

    /// True if no edge between `x` and `y` is required in either direction.
    pub fn no_edge_required(&self, x: &str, y: &str) -> bool {
        !(self.is_required(x, y) || self.is_required(y, x))
    }

    /// An arrowhead at `to` on a `from`-`to` edge is allowed unless
    /// `to --> from` is required or `from --> to` is forbidden.
    pub fn is_arrowpoint_allowed(&self, from: &str, to: &str) -> bool {
        !self.is_required(to, from) && !self.is_forbidden(from, to)
    }

    pub fn is_empty(&self) -> bool {
        self.forbidden.is_empty() && self.required.is_empty() && self.tiers.is_empty()
    }

    pub fn required_edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.required.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    /// Explicitly forbidden pairs; tier rules are not expanded.
    pub fn forbidden_edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.forbidden.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    /// Every variable name the knowledge mentions.
    pub fn variables(&self) -> BTreeSet<&str> {
        let pairs = self.forbidden.iter().chain(self.required.iter());
        pairs
            .flat_map(|(a, b)| [a.as_str(), b.as_str()])
            .chain(self.tiers.values().flatten().map(String::as_str))
            .collect()
    }

    /// Reject knowledge that requires and forbids the same directed edge.
    pub fn check_consistent(&self) -> Result<(), KnowledgeViolation> {
        match self
            .required
            .iter()
            .find(|(a, b)| self.is_forbidden(a, b))
        {
            Some((from, to)) => Err(KnowledgeViolation::Contradiction {
                from: from.clone(),
                to: to.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Directed edges of `graph` that the knowledge forbids, and required
    /// edges that `graph` holds pointing the other way.
    pub fn violations(&self, graph: &Graph) -> Vec<KnowledgeViolation> {
        let mut violations = Vec::new();
        for edge in graph.edges() {
            let (Some(tail), Some(head)) = (edge.directed_tail(), edge.directed_head()) else {
                continue;
            };
            let (tail, head) = (tail.name(), head.name());
            if self.is_required(head, tail) {
                violations.push(KnowledgeViolation::RequiredEdgeReversed {
                    from: head.to_string(),
                    to: tail.to_string(),
                });
            } else if self.is_forbidden(tail, head) {
                violations.push(KnowledgeViolation::ForbiddenEdgePresent {
                    from: tail.to_string(),
                    to: head.to_string(),
                });
            }
        }
        violations
    }

    pub fn is_violated_by(&self, graph: &Graph) -> bool {
        !self.violations(graph).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_graph::Node;

    #[test]
    fn explicit_rules() {
        let mut k = Knowledge::new();
        assert!(k.is_empty());
        k.set_forbidden("A", "B");
        k.set_required("C", "D");
        assert!(!k.is_empty());
        assert!(k.is_forbidden("A", "B"));
        assert!(!k.is_forbidden("B", "A"));
        assert!(k.is_required("C", "D"));
        assert!(!k.no_edge_required("D", "C"));
        assert!(k.no_edge_required("A", "B"));
        assert!(!k.is_arrowpoint_allowed("A", "B"));
        assert!(!k.is_arrowpoint_allowed("D", "C"));
        assert!(k.is_arrowpoint_allowed("C", "D"));

        k.remove_forbidden("A", "B");
        assert!(!k.is_forbidden("A", "B"));
    }

    #[test]
    fn tiers_forbid_backwards_edges() {
        let mut k = Knowledge::new();
        k.add_to_tier(0, "Smoking");
        k.add_to_tier(1, "Tar");
        k.add_to_tier(1, "Cancer");
        assert!(k.is_forbidden("Tar", "Smoking"));
        assert!(!k.is_forbidden("Smoking", "Tar"));
        assert!(!k.is_forbidden("Tar", "Cancer"));

        k.set_tier_forbidden_within(1, true);
        assert!(k.is_forbidden("Tar", "Cancer"));
        assert!(k.is_forbidden("Cancer", "Tar"));

        k.add_to_tier(0, "Tar");
        assert_eq!(k.tier_of("Tar"), Some(0));
        assert!(!k.is_forbidden("Tar", "Smoking"));
    }

    #[test]
    fn contradiction_detected() {
        let mut k = Knowledge::new();
        k.set_required("A", "B");
        assert!(k.check_consistent().is_ok());
        k.add_to_tier(0, "B");
        k.add_to_tier(1, "A");
        assert_eq!(
            k.check_consistent(),
            Err(KnowledgeViolation::Contradiction {
                from: "A".into(),
                to: "B".into()
            })
        );
    }

    #[test]
    fn violations_report_forbidden_directed_edges() {
        let nodes = Node::many(&["A", "B", "C"]);
        let mut g = Graph::with_nodes(nodes.clone()).unwrap();
        g.add_directed_edge(&nodes[1], &nodes[0]).unwrap();
        g.add_undirected_edge(&nodes[1], &nodes[2]).unwrap();

        let mut k = Knowledge::new();
        k.set_forbidden("C", "B");
        assert!(!k.is_violated_by(&g));
        k.set_forbidden("B", "A");
        assert_eq!(
            k.violations(&g),
            vec![KnowledgeViolation::ForbiddenEdgePresent {
                from: "B".into(),
                to: "A".into()
            }]
        );
    }

    #[test]
    fn reversed_required_edge_is_a_violation() {
        let nodes = Node::many(&["A", "B", "C"]);
        let mut g = Graph::with_nodes(nodes.clone()).unwrap();
        g.add_directed_edge(&nodes[1], &nodes[0]).unwrap();
        g.add_undirected_edge(&nodes[1], &nodes[2]).unwrap();

        let mut k = Knowledge::new();
        k.set_required("C", "B");
        assert!(!k.is_violated_by(&g));
        k.set_required("A", "B");
        assert_eq!(
            k.violations(&g),
            vec![KnowledgeViolation::RequiredEdgeReversed {
                from: "A".into(),
                to: "B".into()
            }]
        );
    }

    #[test]
    fn serde_round_trip() {
        let mut k = Knowledge::new();
        k.set_forbidden("A", "B");
        k.add_to_tier(2, "C");
        let json = serde_json::to_string(&k).unwrap();
        let back: Knowledge = serde_json::from_str(&json).unwrap();
        assert_eq!(back, k);
        let partial: Knowledge = serde_json::from_str(r#"{"required":[["X","Y"]]}"#).unwrap();
        assert!(partial.is_required("X", "Y"));
    }
}
