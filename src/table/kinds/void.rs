//! Placeholder carrying only a schema

use crate::persist::{LoadContext, PersistResult};
use crate::progress::ExecutionMonitor;
use crate::settings::NodeSettings;
use crate::table::{EmptyRowIterator, RowCountedTable, RowIterator, TableHandle, TableResult};
use crate::types::TableSpec;
use std::path::Path;

pub struct VoidTable {
    spec: TableSpec,
}

impl VoidTable {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }

    /// A void table saved without schema loads with an empty one
    pub fn load(ctx: &LoadContext<'_>) -> PersistResult<Self> {
        Ok(Self::new(ctx.spec.cloned().unwrap_or_default()))
    }
}

impl RowCountedTable for VoidTable {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn size(&self) -> u64 {
        0
    }

    fn iterator(&self) -> TableResult<RowIterator> {
        Ok(Box::new(EmptyRowIterator))
    }

    fn referenced_handles(&self) -> Vec<TableHandle> {
        Vec::new()
    }

    fn save_to_file(
        &self,
        _data_file: &Path,
        _settings: &mut NodeSettings,
        _monitor: &dyn ExecutionMonitor,
    ) -> PersistResult<()> {
        Ok(())
    }

    fn clear(&self) {}

    fn ensure_open(&self) -> TableResult<()> {
        Ok(())
    }
}
