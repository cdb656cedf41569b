//! Built-in `row_slice` extension: a contiguous row range of another table

use crate::persist::{PersistError, PersistResult};
use crate::progress::ExecutionMonitor;
use crate::settings::NodeSettings;
use crate::table::kinds::extension::{
    ExtensionLoadContext, ExtensionLoader, ExtensionTableImpl,
};
use crate::table::{CloseableRowIterator, RowIterator, TableHandle, TableResult};
use crate::types::{DataRow, TableSpec};
use std::path::Path;

const CFG_REFERENCE_ID: &str = "table_reference_ID";
const CFG_FROM: &str = "from";
const CFG_TO: &str = "to";

/// Rows `from..to` of a reference table, clamped to its size
pub struct RowSliceTable {
    reference: TableHandle,
    from: u64,
    to: u64,
}

impl RowSliceTable {
    pub fn new(reference: TableHandle, from: u64, to: u64) -> Self {
        let to = to.min(reference.size());
        let from = from.min(to);
        Self {
            reference,
            from,
            to,
        }
    }

    pub fn range(&self) -> (u64, u64) {
        (self.from, self.to)
    }
}

impl ExtensionTableImpl for RowSliceTable {
    fn implementation_name(&self) -> &str {
        RowSliceLoader::IMPLEMENTATION_NAME
    }

    fn spec(&self) -> &TableSpec {
        self.reference.spec()
    }

    fn size(&self) -> u64 {
        self.to - self.from
    }

    fn iterator(&self) -> TableResult<RowIterator> {
        Ok(Box::new(SliceIterator {
            base: self.reference.iterator()?,
            skip: self.from,
            remaining: self.to - self.from,
        }))
    }

    fn referenced_handles(&self) -> Vec<TableHandle> {
        vec![self.reference.clone()]
    }

    fn save_config(
        &self,
        _data_file: &Path,
        config: &mut NodeSettings,
        _monitor: &dyn ExecutionMonitor,
    ) -> PersistResult<()> {
        config.add_int(CFG_REFERENCE_ID, self.reference.id() as i64);
        config.add_int(CFG_FROM, self.from as i64);
        config.add_int(CFG_TO, self.to as i64);
        Ok(())
    }

    fn clear(&self) {}
}

/// Loader registered under [`RowSliceLoader::IMPLEMENTATION_NAME`]
#[derive(Debug, Default)]
pub struct RowSliceLoader;

impl RowSliceLoader {
    pub const IMPLEMENTATION_NAME: &'static str = "row_slice";
}

impl ExtensionLoader for RowSliceLoader {
    fn load(&self, ctx: &ExtensionLoadContext<'_>) -> PersistResult<Box<dyn ExtensionTableImpl>> {
        let reference = ctx.reference(ctx.config.get_int(CFG_REFERENCE_ID)?)?;
        let from = ctx.config.get_int(CFG_FROM)?;
        let to = ctx.config.get_int(CFG_TO)?;
        if from < 0 || to < from {
            return Err(PersistError::Corrupted(format!(
                "invalid row slice {}..{}",
                from, to
            )));
        }
        let table = RowSliceTable::new(reference, from as u64, to as u64);
        if table.range() != (from as u64, to as u64) {
            return Err(PersistError::Corrupted(format!(
                "row slice {}..{} exceeds {} rows of table {}",
                from,
                to,
                table.reference.size(),
                table.reference.id()
            )));
        }
        Ok(Box::new(table))
    }
}

struct SliceIterator {
    base: RowIterator,
    skip: u64,
    remaining: u64,
}

impl Iterator for SliceIterator {
    type Item = DataRow;

    fn next(&mut self) -> Option<DataRow> {
        while self.skip > 0 {
            self.base.next()?;
            self.skip -= 1;
        }
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.base.next()
    }
}

impl CloseableRowIterator for SliceIterator {
    fn close(&mut self) {
        self.remaining = 0;
        self.base.close();
    }
}
