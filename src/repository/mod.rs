//! Table repository
//!
//! In-memory registry mapping table id to live handle. Loading registers
//! every restored table here so that later references to the same id
//! resolve to one shared handle. It supports:
//! - Put / register: add a handle, strictly or first-wins
//! - Get: look up a handle by id
//! - Release: remove and clear everything a node owns below a handle

use crate::table::TableHandle;
use crate::types::{NodeId, TableId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Repository error types
#[derive(Debug, PartialEq, Eq)]
pub enum RepositoryError {
    /// A different table is already registered under this id
    AlreadyRegistered(TableId),
    /// No table registered under this id
    NotFound(TableId),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::AlreadyRegistered(id) => {
                write!(f, "Another table is already registered as {}", id)
            }
            RepositoryError::NotFound(id) => write!(f, "Table not found: {}", id),
        }
    }
}

impl std::error::Error for RepositoryError {}

/// Repository result type
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Registry of live tables keyed by id
///
/// # Examples
///
/// ```
/// use tablestore::repository::TableRepository;
/// use tablestore::table::{TableHandle, VoidTable};
/// use tablestore::types::TableSpec;
///
/// let repository = TableRepository::new();
/// let handle = TableHandle::new(VoidTable::new(TableSpec::default()));
/// repository.put(handle.clone()).unwrap();
/// assert!(repository.get(handle.id()).unwrap().same_table(&handle));
/// ```
#[derive(Default)]
pub struct TableRepository {
    tables: RwLock<HashMap<TableId, TableHandle>>,
}

impl TableRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TableId) -> Option<TableHandle> {
        self.tables.read().get(&id).cloned()
    }

    pub fn contains(&self, id: TableId) -> bool {
        self.tables.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    /// Registered ids in ascending order
    pub fn ids(&self) -> Vec<TableId> {
        let mut ids: Vec<TableId> = self.tables.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Add `handle`; putting the same table twice is fine, a different
    /// table under a taken id is not
    pub fn put(&self, handle: TableHandle) -> RepositoryResult<()> {
        match self.tables.write().entry(handle.id()) {
            Entry::Occupied(existing) => {
                if existing.get().same_table(&handle) {
                    Ok(())
                } else {
                    Err(RepositoryError::AlreadyRegistered(handle.id()))
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }

    /// Add `handle` unless its id is taken; returns the registered entry
    pub fn register(&self, handle: TableHandle) -> TableHandle {
        self.tables
            .write()
            .entry(handle.id())
            .or_insert(handle)
            .clone()
    }

    /// Add `handle` and every reachable handle owned by `owner`
    pub fn put_owned(&self, handle: &TableHandle, owner: NodeId) -> RepositoryResult<()> {
        for owned in handle.collect_owned_by(owner) {
            self.put(owned)?;
        }
        self.put(handle.clone())
    }

    pub fn remove(&self, id: TableId) -> RepositoryResult<TableHandle> {
        self.tables
            .write()
            .remove(&id)
            .ok_or(RepositoryError::NotFound(id))
    }

    /// Remove and clear every handle below `handle` owned by `owner`
    ///
    /// Handles owned by other nodes stay registered and intact. Returns the
    /// ids of the released tables.
    pub fn release(&self, handle: &TableHandle, owner: NodeId) -> Vec<TableId> {
        let owned = handle.collect_owned_by(owner);
        {
            let mut tables = self.tables.write();
            for table in &owned {
                tables.remove(&table.id());
            }
        }
        for table in &owned {
            table.clear(owner);
        }
        log::debug!("{} released {} table(s)", owner, owned.len());
        owned.iter().map(TableHandle::id).collect()
    }

    /// Drop every entry without clearing the tables
    pub fn clear_all(&self) {
        self.tables.write().clear();
    }
}

impl std::fmt::Debug for TableRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRepository")
            .field("ids", &self.ids())
            .finish()
    }
}
