//! Inventory access for invdoc.
//!
//! An [`Inventory`] hands out sessions; a session fetches [`NodeSnapshot`]s.
//! Callers hold a session through the [`Session`] guard, which closes it
//! when dropped, error paths included:
//!
//! ```ignore
//! let mut session = Session::open(&inventory)?;
//! let node = session.node("web01.example.com")?;
//! // session closed here
//! ```
//!
//! [`ChefServer`] talks to a Chef server over HTTP. With the `mock` feature,
//! `MemoryInventory` serves nodes from memory for tests.

mod chef;
mod error;
mod key;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod snapshot;

pub use chef::ChefServer;
pub use error::{InventoryError, RsaKeyError};
pub use key::{load_private_key, load_private_key_from_file};
#[cfg(any(test, feature = "mock"))]
pub use mock::MemoryInventory;
pub use snapshot::NodeSnapshot;

/// Source of node data.
pub trait Inventory: Send + Sync {
    /// Start a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the inventory cannot be reached.
    fn open(&self) -> Result<Box<dyn InventorySession + '_>, InventoryError>;
}

/// One connection to an inventory.
pub trait InventorySession {
    /// Fetch a node by name.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NodeNotFound`] for unknown nodes and
    /// transport errors otherwise.
    fn node(&mut self, name: &str) -> Result<NodeSnapshot, InventoryError>;

    /// Release the connection.
    fn close(&mut self) {}
}

/// Scoped inventory session; [`InventorySession::close`] runs exactly once,
/// when the guard is dropped.
pub struct Session<'a> {
    inner: Box<dyn InventorySession + 'a>,
}

impl<'a> Session<'a> {
    /// Open a session on `inventory`.
    ///
    /// # Errors
    ///
    /// Returns the inventory's error if the session cannot be opened.
    pub fn open(inventory: &'a dyn Inventory) -> Result<Self, InventoryError> {
        Ok(Self {
            inner: inventory.open()?,
        })
    }

    /// Fetch a node by name.
    ///
    /// # Errors
    ///
    /// See [`InventorySession::node`].
    pub fn node(&mut self, name: &str) -> Result<NodeSnapshot, InventoryError> {
        self.inner.node(name)
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.inner.close();
    }
}
