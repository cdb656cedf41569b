//! Same rows under a replaced schema

use crate::buffer::RowBuffer;
use crate::persist::{FormatEra, LoadContext, PersistError, PersistResult};
use crate::progress::ExecutionMonitor;
use crate::settings::NodeSettings;
use crate::table::{RowCountedTable, RowIterator, TableError, TableHandle, TableResult};
use crate::types::TableSpec;
use std::path::Path;

const CFG_REFERENCE_ID: &str = "table_reference_ID";

pub struct TableSpecReplacerTable {
    reference: TableHandle,
    spec: TableSpec,
}

impl TableSpecReplacerTable {
    /// `spec` must describe as many columns as the reference has
    pub fn create(reference: TableHandle, spec: TableSpec) -> TableResult<Self> {
        if spec.num_columns() != reference.spec().num_columns() {
            return Err(TableError::InvalidArgument(format!(
                "replacement spec has {} columns, reference has {}",
                spec.num_columns(),
                reference.spec().num_columns()
            )));
        }
        Ok(Self { reference, spec })
    }

    pub fn reference(&self) -> &TableHandle {
        &self.reference
    }

    pub fn load(ctx: &LoadContext<'_>) -> PersistResult<Self> {
        let reference = ctx.reference(ctx.meta.get_int(CFG_REFERENCE_ID)?)?;
        let spec = match (ctx.era, ctx.spec) {
            (FormatEra::Modern, Some(spec)) => spec.clone(),
            // oldest format keeps the replaced spec in the data file
            _ => RowBuffer::read_eager(ctx.require_data_file()?, ctx.verify_checksums)?
                .spec()
                .clone(),
        };
        Self::create(reference, spec).map_err(|e| PersistError::Corrupted(e.to_string()))
    }
}

impl RowCountedTable for TableSpecReplacerTable {
    fn spec(&self) -> &TableSpec {
        &self.spec
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
