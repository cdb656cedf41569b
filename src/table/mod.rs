//! Table module
//!
//! This module implements the table reference graph:
//! - `RowCountedTable`, the contract every table kind fulfils
//! - the eight table kinds, one leaf and seven composites
//! - `TableHandle`, the identity-bearing wrapper clients hold
//! - process-wide table id allocation

pub mod builder;
pub mod error;
pub mod handle;
pub mod id;
pub mod iterator;
pub mod kinds;
pub mod variant;

pub use builder::ContainerBuilder;
pub use error::{TableError, TableResult};
pub use handle::{FailSafeRowIterator, TableHandle};
pub use id::{IdAllocator, generate_id, observe_id};
pub use iterator::{CloseableRowIterator, EmptyRowIterator, RowIterator};
pub use kinds::{
    ColumnSource, ConcatenateTable, ContainerTable, DuplicateKeyPolicy, ExtensionLoadContext,
    ExtensionLoader, ExtensionRegistry, ExtensionTable, ExtensionTableImpl, JoinedTable,
    RearrangeColumnsTable, RowSliceLoader, RowSliceTable, TableSpecReplacerTable, VoidTable,
    WrappedTable,
};
pub use variant::{TableKind, TableVariant};

use crate::persist::PersistResult;
use crate::progress::ExecutionMonitor;
use crate::settings::NodeSettings;
use crate::types::TableSpec;
use std::path::Path;

/// Contract implemented by every table kind
pub trait RowCountedTable: Send + Sync {
    /// Schema of the rows
    fn spec(&self) -> &TableSpec;

    /// Exact number of rows
    fn size(&self) -> u64;

    /// Row count through the 32-bit accessor
    fn row_count(&self) -> TableResult<i32> {
        let size = self.size();
        i32::try_from(size).map_err(|_| TableError::RowCountOutOfRange(size))
    }

    /// Fresh iterator positioned at the first row
    fn iterator(&self) -> TableResult<RowIterator>;

    /// Tables this one derives its rows from; empty for leaves
    fn referenced_handles(&self) -> Vec<TableHandle>;

    /// Persist kind-specific metadata into `settings`, and rows into
    /// `data_file` if the kind owns any
    fn save_to_file(
        &self,
        data_file: &Path,
        settings: &mut NodeSettings,
        monitor: &dyn ExecutionMonitor,
    ) -> PersistResult<()>;

    /// Release backing resources
    fn clear(&self);

    /// Re-open storage that was restored from disk without materializing
    fn ensure_open(&self) -> TableResult<()>;
}
