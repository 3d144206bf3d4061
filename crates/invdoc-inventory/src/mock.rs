//! In-memory inventory for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::{Inventory, InventoryError, InventorySession, NodeSnapshot};

/// Inventory serving fixed nodes from memory.
///
/// Counts opened and closed sessions and records every fetch, so tests can
/// check that sessions are released and which nodes were requested.
///
/// # Example
///
/// ```ignore
/// use invdoc_inventory::{MemoryInventory, NodeSnapshot, Session};
///
/// let inventory = MemoryInventory::new()
///     .with_node(NodeSnapshot::new("web01").with_attribute("platform", "ubuntu"));
///
/// {
///     let mut session = Session::open(&inventory).unwrap();
///     assert!(session.node("web01").is_ok());
/// }
/// assert_eq!(inventory.closed(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryInventory {
    nodes: BTreeMap<String, NodeSnapshot>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl MemoryInventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, keyed by its name.
    #[must_use]
    pub fn with_node(mut self, node: NodeSnapshot) -> Self {
        self.nodes.insert(node.name.clone(), node);
        self
    }

    /// Sessions opened so far.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed so far.
    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Node names requested so far, in order.
    #[must_use]
    pub fn fetched(&self) -> Vec<String> {
        self.fetched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Inventory for MemoryInventory {
    fn open(&self) -> Result<Box<dyn InventorySession + '_>, InventoryError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession { inventory: self }))
    }
}

struct MemorySession<'a> {
    inventory: &'a MemoryInventory,
}

impl InventorySession for MemorySession<'_> {
    fn node(&mut self, name: &str) -> Result<NodeSnapshot, InventoryError> {
        self.inventory
            .fetched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.to_owned());
        self.inventory
            .nodes
            .get(name)
            .cloned()
            .ok_or_else(|| InventoryError::NodeNotFound(name.to_owned()))
    }

    fn close(&mut self) {
        self.inventory.closed.fetch_add(1, Ordering::SeqCst);
    }
}
