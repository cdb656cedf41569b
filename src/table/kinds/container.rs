//! Leaf table owning a row buffer

use crate::buffer::RowBuffer;
use crate::persist::{FormatEra, LoadContext, PersistError, PersistResult};
use crate::progress::ExecutionMonitor;
use crate::settings::NodeSettings;
use crate::table::{RowCountedTable, RowIterator, TableHandle, TableResult};
use crate::types::{DataRow, TableSpec};
use std::path::Path;

/// Leaf table; the only kind with rows of its own
pub struct ContainerTable {
    buffer: RowBuffer,
}

impl ContainerTable {
    pub fn new(spec: TableSpec, rows: Vec<DataRow>) -> TableResult<Self> {
        Ok(Self::from_buffer(RowBuffer::from_rows(spec, rows)?))
    }

    pub fn from_buffer(buffer: RowBuffer) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> &RowBuffer {
        &self.buffer
    }

    /// Restore from a saved data file
    ///
    /// Current directories carry `spec.xml` and the rows stay on disk until
    /// first access. The oldest format has no spec document, so the data
    /// file is read eagerly and describes its own schema.
    pub fn load(ctx: &LoadContext<'_>) -> PersistResult<Self> {
        let data_file = ctx.require_data_file()?;
        let buffer = match (ctx.era, ctx.spec) {
            (FormatEra::Modern, Some(spec)) => {
                RowBuffer::read_delayed(data_file, spec.clone(), ctx.verify_checksums)?
            }
            _ => RowBuffer::read_eager(data_file, ctx.verify_checksums)?,
        };
        if let Some(spec) = ctx.spec {
            if spec.num_columns() != buffer.spec().num_columns() {
                return Err(PersistError::Corrupted(format!(
                    "spec declares {} columns, data file {} holds {}",
                    spec.num_columns(),
                    data_file.display(),
                    buffer.spec().num_columns()
                )));
            }
        }
        Ok(Self { buffer })
    }
}

impl RowCountedTable for ContainerTable {
    fn spec(&self) -> &TableSpec {
        self.buffer.spec()
    }

    fn size(&self) -> u64 {
        self.buffer.row_count()
    }

    fn iterator(&self) -> TableResult<RowIterator> {
        Ok(Box::new(self.buffer.iterator()?))
    }

    fn referenced_handles(&self) -> Vec<TableHandle> {
        Vec::new()
    }

    fn save_to_file(
        &self,
        data_file: &Path,
        _settings: &mut NodeSettings,
        monitor: &dyn ExecutionMonitor,
    ) -> PersistResult<()> {
        monitor.check_canceled()?;
        self.buffer.save_to_file(data_file)?;
        Ok(())
    }

    fn clear(&self) {
        self.buffer.clear();
    }

    fn ensure_open(&self) -> TableResult<()> {
        Ok(self.buffer.ensure_open()?)
    }
}
