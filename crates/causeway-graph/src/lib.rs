//! Causeway graph model
//!
//! Graphs over named variables whose edges carry a mark at each end
//! (tail, arrowhead or circle). This is the shared substrate for the
//! equivalence-class searches in `causeway-search`:
//!
//! - **Model**: [`Node`], [`Endpoint`], [`Edge`], [`Graph`]
//! - **Queries**: adjacency, parents/children, ancestry, directed and
//!   semi-directed reachability, cycle detection
//! - **Patterns**: [`basic_pattern`] reduces a DAG to the collider skeleton
//!   of its equivalence class; [`pdag_to_dag`] picks a member DAG back out
//! - **Enumeration**: [`ChoiceGenerator`] and [`DepthChoiceGenerator`] walk
//!   subsets in a fixed order so searches are reproducible
//! - **I/O**: [`GraphRecord`] is the serde form of a graph

pub mod choice;
mod edge;
mod error;
mod graph;
mod node;
pub mod pattern;
mod record;

pub use choice::{ChoiceGenerator, DepthChoiceGenerator};
pub use edge::{Edge, Endpoint};
pub use error::{GraphError, Result};
pub use graph::Graph;
pub use node::Node;
pub use pattern::{basic_pattern, pdag_to_dag};
pub use record::{EdgeKind, EdgeRecord, GraphRecord};
