//! Identity-bearing table handle
//!
//! A `TableHandle` is what clients hold: a process-unique id, the delegate
//! of one of the eight kinds, a set-once owner and the cleared flag. Clones
//! share the same table.
//!
//! Locking: the cleared flag is a `Mutex<bool>` that also guards iterator
//! creation and every fail-safe read. Locks are taken parent before child,
//! never the other way round.

use crate::table::variant::{TableKind, TableVariant};
use crate::table::{
    CloseableRowIterator, RowCountedTable, RowIterator, TableError, TableResult, generate_id,
};
use crate::types::{DataRow, NodeId, RowKey, TableId, TableSpec};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

struct HandleInner {
    id: TableId,
    delegate: TableVariant,
    owner: OnceLock<NodeId>,
    cleared: Mutex<bool>,
}

/// Shared, identity-bearing wrapper around a table delegate
#[derive(Clone)]
pub struct TableHandle {
    inner: Arc<HandleInner>,
}

impl TableHandle {
    /// Wrap `delegate` under a freshly generated id
    pub fn new(delegate: impl Into<TableVariant>) -> Self {
        Self::with_id(delegate, generate_id())
    }

    /// Wrap `delegate` under a known id, e.g. one restored from disk
    pub fn with_id(delegate: impl Into<TableVariant>, id: TableId) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id,
                delegate: delegate.into(),
                owner: OnceLock::new(),
                cleared: Mutex::new(false),
            }),
        }
    }

    pub fn id(&self) -> TableId {
        self.inner.id
    }

    pub fn kind(&self) -> TableKind {
        self.inner.delegate.kind()
    }

    pub fn delegate(&self) -> &TableVariant {
        &self.inner.delegate
    }

    pub fn spec(&self) -> &TableSpec {
        self.inner.delegate.spec()
    }

    pub fn size(&self) -> u64 {
        self.inner.delegate.size()
    }

    /// Row count through the 32-bit accessor
    pub fn row_count(&self) -> TableResult<i32> {
        self.inner.delegate.row_count()
    }

    pub fn owner(&self) -> Option<NodeId> {
        self.inner.owner.get().copied()
    }

    pub fn is_cleared(&self) -> bool {
        *self.inner.cleared.lock()
    }

    /// Whether both handles point at the same table
    pub fn same_table(&self, other: &TableHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn referenced_handles(&self) -> Vec<TableHandle> {
        self.inner.delegate.referenced_handles()
    }

    /// Fresh iterator; fails once the table has been cleared
    pub fn iterator(&self) -> TableResult<RowIterator> {
        let cleared = self.inner.cleared.lock();
        if *cleared {
            return Err(TableError::Cleared(self.id()));
        }
        self.inner.delegate.iterator()
    }

    /// Iterator that never fails, serving missing-value rows once the table
    /// is cleared
    pub fn iterator_fail_safe(&self) -> FailSafeRowIterator {
        FailSafeRowIterator::new(self.clone())
    }

    /// Re-open storage restored from disk, references first
    pub fn ensure_open(&self) -> TableResult<()> {
        if self.is_cleared() {
            return Err(TableError::Cleared(self.id()));
        }
        for reference in self.referenced_handles() {
            reference.ensure_open()?;
        }
        self.inner.delegate.ensure_open()
    }

    /// Assign `owner` to this handle and every unowned handle below it
    ///
    /// The first owner wins; an already owned handle keeps its owner and its
    /// subtree is left alone.
    pub fn set_owner_recursively(&self, owner: NodeId) {
        if self.inner.owner.set(owner).is_ok() {
            for reference in self.referenced_handles() {
                reference.set_owner_recursively(owner);
            }
        }
    }

    /// Every reachable handle owned by `owner`, this one included, each once
    pub fn collect_owned_by(&self, owner: NodeId) -> Vec<TableHandle> {
        let mut visited = HashSet::new();
        let mut owned = Vec::new();
        self.collect_owned_into(owner, &mut visited, &mut owned);
        owned
    }

    fn collect_owned_into(
        &self,
        owner: NodeId,
        visited: &mut HashSet<TableId>,
        owned: &mut Vec<TableHandle>,
    ) {
        if !visited.insert(self.id()) {
            return;
        }
        if self.owner() == Some(owner) {
            owned.push(self.clone());
        }
        for reference in self.referenced_handles() {
            reference.collect_owned_into(owner, visited, owned);
        }
    }

    /// Clear this table and every reference owned by `owner`
    ///
    /// No-op unless `owner` owns this handle.
    pub fn clear(&self, owner: NodeId) {
        if self.owner() != Some(owner) {
            return;
        }
        let mut cleared = self.inner.cleared.lock();
        if *cleared {
            return;
        }
        for reference in self.referenced_handles() {
            reference.clear(owner);
        }
        *cleared = true;
        self.inner.delegate.clear();
        log::debug!("Cleared table {} of {}", self.id(), owner);
    }

    /// Clear only this table, leaving its references intact
    ///
    /// # Panics
    ///
    /// Panics if `owner` does not own this handle.
    pub fn clear_single(&self, owner: NodeId) {
        let actual = self.owner();
        if actual != Some(owner) {
            panic!(
                "{} must not clear table {} owned by {:?}",
                owner,
                self.id(),
                actual
            );
        }
        let mut cleared = self.inner.cleared.lock();
        if !*cleared {
            *cleared = true;
            self.inner.delegate.clear();
        }
    }

    /// One-line summary, e.g. `Rows: 3, Cols: 2`
    pub fn summary(&self) -> String {
        format!(
            "Rows: {}, Cols: {}",
            self.size(),
            self.spec().num_columns()
        )
    }

    /// Indented listing of the reference graph below this handle
    ///
    /// Tables reached a second time are marked `(shared)` and not expanded.
    pub fn describe_tree(&self) -> String {
        let mut out = String::new();
        let mut visited = HashSet::new();
        self.describe_into(0, &mut visited, &mut out);
        out
    }

    fn describe_into(&self, depth: usize, visited: &mut HashSet<TableId>, out: &mut String) {
        let owner = match self.owner() {
            Some(node) => node.to_string(),
            None => "unowned".to_string(),
        };
        let _ = write!(
            out,
            "{:indent$}#{} {} [{}] {}",
            "",
            self.id(),
            self.kind(),
            owner,
            self.summary(),
            indent = depth * 2
        );
        if self.is_cleared() {
            out.push_str(" (cleared)");
        }
        if !visited.insert(self.id()) {
            out.push_str(" (shared)\n");
            return;
        }
        out.push('\n');
        for reference in self.referenced_handles() {
            reference.describe_into(depth + 1, visited, out);
        }
    }
}

impl fmt::Debug for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableHandle")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("owner", &self.owner())
            .field("rows", &self.size())
            .field("cleared", &self.is_cleared())
            .finish()
    }
}

/// Row iterator that survives a concurrent `clear`
///
/// Yields exactly the row count recorded at creation. Once the table is
/// cleared, or the underlying iterator runs dry early, every further row is
/// all-missing with key `Cleared_row_<index>`.
pub struct FailSafeRowIterator {
    handle: TableHandle,
    base: Option<RowIterator>,
    cell_count: usize,
    max_rows: u64,
    row_index: u64,
}

impl FailSafeRowIterator {
    fn new(handle: TableHandle) -> Self {
        let base = {
            let cleared = handle.inner.cleared.lock();
            if *cleared {
                None
            } else {
                match handle.inner.delegate.iterator() {
                    Ok(it) => Some(it),
                    Err(e) => {
                        log::warn!(
                            "Serving missing rows for table {}, iterator failed: {}",
                            handle.id(),
                            e
                        );
                        None
                    }
                }
            }
        };
        Self {
            cell_count: handle.spec().num_columns(),
            max_rows: handle.size(),
            row_index: 0,
            base,
            handle,
        }
    }

    /// Rows handed out so far
    pub fn position(&self) -> u64 {
        self.row_index
    }
}

impl Iterator for FailSafeRowIterator {
    type Item = DataRow;

    fn next(&mut self) -> Option<DataRow> {
        if self.row_index >= self.max_rows {
            return None;
        }
        let index = self.row_index;
        self.row_index += 1;

        let row = {
            let cleared = self.handle.inner.cleared.lock();
            if *cleared {
                if let Some(mut base) = self.base.take() {
                    base.close();
                }
                None
            } else {
                self.base.as_mut().and_then(|base| base.next())
            }
        };
        Some(row.unwrap_or_else(|| {
            DataRow::missing(RowKey::new(format!("Cleared_row_{}", index)), self.cell_count)
        }))
    }
}

impl CloseableRowIterator for FailSafeRowIterator {
    fn close(&mut self) {
        if let Some(mut base) = self.base.take() {
            base.close();
        }
        self.row_index = self.max_rows;
    }
}

impl fmt::Debug for FailSafeRowIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailSafeRowIterator")
            .field("table", &self.handle.id())
            .field("row_index", &self.row_index)
            .field("max_rows", &self.max_rows)
            .finish()
    }
}
