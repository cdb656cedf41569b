//! Column-wise join of two equally long tables

use crate::persist::{LoadContext, PersistError, PersistResult};
use crate::progress::ExecutionMonitor;
use crate::settings::NodeSettings;
use crate::table::{
    CloseableRowIterator, RowCountedTable, RowIterator, TableError, TableHandle, TableResult,
};
use crate::types::{DataRow, TableSpec};
use std::path::Path;

const CFG_LEFT_ID: &str = "left_table_ID";
const CFG_RIGHT_ID: &str = "right_table_ID";

/// Joins `left` and `right` row by row
///
/// Both inputs are assumed to list the same row keys in the same order;
/// the output keeps the left key.
pub struct JoinedTable {
    left: TableHandle,
    right: TableHandle,
    spec: TableSpec,
}

impl JoinedTable {
    pub fn create(left: TableHandle, right: TableHandle) -> TableResult<Self> {
        if left.size() != right.size() {
            return Err(TableError::InvalidArgument(format!(
                "cannot join {} rows with {} rows",
                left.size(),
                right.size()
            )));
        }
        if let Some(col) = right
            .spec()
            .columns()
            .iter()
            .find(|c| left.spec().find_column(&c.name).is_some())
        {
            return Err(TableError::InvalidArgument(format!(
                "column \"{}\" exists in both tables",
                col.name
            )));
        }
        let spec = left.spec().append(right.spec());
        Ok(Self { left, right, spec })
    }

    pub fn left(&self) -> &TableHandle {
        &self.left
    }

    pub fn right(&self) -> &TableHandle {
        &self.right
    }

    pub fn load(ctx: &LoadContext<'_>) -> PersistResult<Self> {
        let left = ctx.reference(ctx.meta.get_int(CFG_LEFT_ID)?)?;
        let right = ctx.reference(ctx.meta.get_int(CFG_RIGHT_ID)?)?;
        Self::create(left, right).map_err(|e| PersistError::Corrupted(e.to_string()))
    }
}

impl RowCountedTable for JoinedTable {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn size(&self) -> u64 {
        self.left.size()
    }

    fn iterator(&self) -> TableResult<RowIterator> {
        Ok(Box::new(JoinedIterator {
            left: self.left.iterator()?,
            right: self.right.iterator()?,
            warned: false,
        }))
    }

    fn referenced_handles(&self) -> Vec<TableHandle> {
        vec![self.left.clone(), self.right.clone()]
    }

    fn save_to_file(
        &self,
        _data_file: &Path,
        settings: &mut NodeSettings,
        _monitor: &dyn ExecutionMonitor,
    ) -> PersistResult<()> {
        settings.add_int(CFG_LEFT_ID, self.left.id() as i64);
        settings.add_int(CFG_RIGHT_ID, self.right.id() as i64);
        Ok(())
    }

    fn clear(&self) {}

    fn ensure_open(&self) -> TableResult<()> {
        Ok(())
    }
}

struct JoinedIterator {
    left: RowIterator,
    right: RowIterator,
    warned: bool,
}

impl Iterator for JoinedIterator {
    type Item = DataRow;

    fn next(&mut self) -> Option<DataRow> {
        let mut left = self.left.next()?;
        let right = self.right.next()?;
        if left.key != right.key && !self.warned {
            log::warn!(
                "Joined rows differ in key (\"{}\" vs. \"{}\"), keeping left key",
                left.key,
                right.key
            );
            self.warned = true;
        }
        left.cells.extend(right.cells);
        Some(left)
    }
}

impl CloseableRowIterator for JoinedIterator {
    fn close(&mut self) {
        self.left.close();
        self.right.close();
    }
}
