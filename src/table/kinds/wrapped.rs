//! Plain delegation to another table

use crate::persist::{LoadContext, PersistResult};
use crate::progress::ExecutionMonitor;
use crate::settings::NodeSettings;
use crate::table::{RowCountedTable, RowIterator, TableHandle, TableResult};
use crate::types::TableSpec;
use std::path::Path;

const CFG_REFERENCE_ID: &str = "table_reference_ID";

pub struct WrappedTable {
    reference: TableHandle,
}

impl WrappedTable {
    pub fn new(reference: TableHandle) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> &TableHandle {
        &self.reference
    }

    pub fn load(ctx: &LoadContext<'_>) -> PersistResult<Self> {
        let reference = ctx.reference(ctx.meta.get_int(CFG_REFERENCE_ID)?)?;
        Ok(Self { reference })
    }
}

impl RowCountedTable for WrappedTable {
    fn spec(&self) -> &TableSpec {
        self.reference.spec()
    }

    fn size(&self) -> u64 {
        self.reference.size()
    }

    fn iterator(&self) -> TableResult<RowIterator> {
        self.reference.iterator()
    }

    fn referenced_handles(&self) -> Vec<TableHandle> {
        vec![self.reference.clone()]
    }

    fn save_to_file(
        &self,
        _data_file: &Path,
        settings: &mut NodeSettings,
        _monitor: &dyn ExecutionMonitor,
    ) -> PersistResult<()> {
        settings.add_int(CFG_REFERENCE_ID, self.reference.id() as i64);
        Ok(())
    }

    fn clear(&self) {}

    fn ensure_open(&self) -> TableResult<()> {
        Ok(())
    }
}
