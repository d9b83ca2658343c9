//! Graph variables.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);

/// A named graph variable with identity semantics.
///
/// Every call to [`Node::new`] mints a fresh identity, so two nodes that
/// happen to share a name are still different nodes. Clones share the
/// identity of their source.
///
/// Ordering is by name first and identity second. Ordered collections of
/// nodes therefore iterate alphabetically, which is the iteration order the
/// search relies on for reproducible tie-breaking.
#[derive(Clone)]
pub struct Node {
    id: u64,
    name: Arc<str>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            id: NEXT_NODE_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name: Arc::from(name),
        }
    }

    /// Mint one node per name, in the given order.
    pub fn many<S: AsRef<str>>(names: &[S]) -> Vec<Node> {
        names.iter().map(|n| Node::new(n.as_ref())).collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process-unique identity.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}
