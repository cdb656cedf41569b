//! Column projection and append over a base table

use crate::buffer::RowBuffer;
use crate::persist::{FormatEra, LoadContext, PersistError, PersistResult};
use crate::progress::ExecutionMonitor;
use crate::settings::NodeSettings;
use crate::table::kinds::ContainerTable;
use crate::table::{
    CloseableRowIterator, RowCountedTable, RowIterator, TableError, TableHandle, TableResult,
};
use crate::types::{DataCell, DataRow, RowKey, TableSpec};
use std::path::Path;

const CFG_INTERNAL_META: &str = "meta_internal";
const CFG_REFERENCE_ID: &str = "table_reference_ID";
const CFG_MAP: &str = "table_internal_map";
const CFG_FLAGS: &str = "table_internal_flags";

/// Where an output column comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    /// Column index in the reference table
    Reference(usize),
    /// Column index in the appended columns
    Appended(usize),
}

/// Table whose columns are picked from a reference table and an internal
/// append table; rows and keys come from the reference
pub struct RearrangeColumnsTable {
    spec: TableSpec,
    reference: TableHandle,
    map: Vec<usize>,
    from_reference: Vec<bool>,
    append_table: Option<ContainerTable>,
}

impl RearrangeColumnsTable {
    /// Build the output layout over `reference`
    ///
    /// `appended` carries the spec and per-row cells of newly computed
    /// columns, one cell vector per reference row.
    pub fn create(
        reference: TableHandle,
        layout: &[ColumnSource],
        appended: Option<(TableSpec, Vec<Vec<DataCell>>)>,
    ) -> TableResult<Self> {
        let ref_spec = reference.spec().clone();
        let append_spec = appended
            .as_ref()
            .map(|(spec, _)| spec.clone())
            .unwrap_or_default();

        let mut columns = Vec::with_capacity(layout.len());
        let mut map = Vec::with_capacity(layout.len());
        let mut from_reference = Vec::with_capacity(layout.len());
        for source in layout {
            let (col, index, is_ref) = match *source {
                ColumnSource::Reference(i) => (ref_spec.column(i), i, true),
                ColumnSource::Appended(i) => (append_spec.column(i), i, false),
            };
            let col = col.ok_or_else(|| {
                TableError::InvalidArgument(format!("column source {:?} out of range", source))
            })?;
            columns.push(col.clone());
            map.push(index);
            from_reference.push(is_ref);
        }

        let append_table = match appended {
            Some((spec, cells)) => {
                if cells.len() as u64 != reference.size() {
                    return Err(TableError::InvalidArgument(format!(
                        "{} appended rows for a reference of {} rows",
                        cells.len(),
                        reference.size()
                    )));
                }
                let rows = cells
                    .into_iter()
                    .map(|c| DataRow::new(RowKey::new(""), c))
                    .collect();
                Some(ContainerTable::new(spec, rows)?)
            }
            None => None,
        };

        Ok(Self {
            spec: TableSpec::new(columns),
            reference,
            map,
            from_reference,
            append_table,
        })
    }

    pub fn reference(&self) -> &TableHandle {
        &self.reference
    }

    pub fn append_table(&self) -> Option<&ContainerTable> {
        self.append_table.as_ref()
    }

    pub fn load(ctx: &LoadContext<'_>) -> PersistResult<Self> {
        let sub = ctx.meta.get_node_settings(CFG_INTERNAL_META)?;
        let reference = ctx.reference(sub.get_int(CFG_REFERENCE_ID)?)?;
        let map = sub
            .get_int_array(CFG_MAP)?
            .into_iter()
            .map(|i| {
                usize::try_from(i)
                    .map_err(|_| PersistError::Corrupted(format!("negative column index {}", i)))
            })
            .collect::<PersistResult<Vec<usize>>>()?;
        let from_reference = sub.get_bool_array(CFG_FLAGS)?;
        if map.len() != from_reference.len() {
            return Err(PersistError::Corrupted(format!(
                "column map has {} entries but {} flags",
                map.len(),
                from_reference.len()
            )));
        }
        let append_count = from_reference.iter().filter(|f| !**f).count();

        // a pure column filter has no append table
        let append_table = if append_count == 0 {
            None
        } else {
            let data_file = ctx.require_data_file()?;
            let buffer = match (ctx.era, ctx.spec) {
                (FormatEra::Modern, Some(spec)) => {
                    let mut append_cols = vec![None; append_count];
                    for (i, is_ref) in from_reference.iter().enumerate() {
                        if !is_ref {
                            let slot = append_cols.get_mut(map[i]).ok_or_else(|| {
                                PersistError::Corrupted(format!(
                                    "append column index {} out of range",
                                    map[i]
                                ))
                            })?;
                            *slot = spec.column(i).cloned();
                        }
                    }
                    let append_cols = append_cols.into_iter().collect::<Option<Vec<_>>>();
                    let append_cols = append_cols.ok_or_else(|| {
                        PersistError::Corrupted("spec does not cover appended columns".into())
                    })?;
                    RowBuffer::read_delayed(
                        data_file,
                        TableSpec::new(append_cols),
                        ctx.verify_checksums,
                    )?
                }
                _ => {
                    let buffer = RowBuffer::read_eager(data_file, ctx.verify_checksums)?;
                    if buffer.spec().num_columns() != append_count {
                        return Err(PersistError::Corrupted(format!(
                            "Inconsistency in data file \"{}\", read {} columns, expected {}",
                            data_file.display(),
                            buffer.spec().num_columns(),
                            append_count
                        )));
                    }
                    buffer
                }
            };
            Some(ContainerTable::from_buffer(buffer))
        };

        let append_spec = append_table
            .as_ref()
            .map(|t| t.spec().clone())
            .unwrap_or_default();
        let ref_spec = reference.spec();
        let mut columns = Vec::with_capacity(map.len());
        for (i, is_ref) in from_reference.iter().enumerate() {
            let source = if *is_ref { ref_spec } else { &append_spec };
            let col = source.column(map[i]).ok_or_else(|| {
                PersistError::Corrupted(format!("column index {} out of range", map[i]))
            })?;
            columns.push(col.clone());
        }

        Ok(Self {
            spec: TableSpec::new(columns),
            reference,
            map,
            from_reference,
            append_table,
        })
    }
}

impl RowCountedTable for RearrangeColumnsTable {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn size(&self) -> u64 {
        self.reference.size()
    }

    fn iterator(&self) -> TableResult<RowIterator> {
        let append = match &self.append_table {
            Some(t) => Some(t.iterator()?),
            None => None,
        };
        Ok(Box::new(RearrangeIterator {
            base: self.reference.iterator()?,
            append,
            map: self.map.clone(),
            from_reference: self.from_reference.clone(),
        }))
    }

    fn referenced_handles(&self) -> Vec<TableHandle> {
        vec![self.reference.clone()]
    }

    fn save_to_file(
        &self,
        data_file: &Path,
        settings: &mut NodeSettings,
        monitor: &dyn ExecutionMonitor,
    ) -> PersistResult<()> {
        let mut sub = NodeSettings::new(CFG_INTERNAL_META);
        sub.add_int(CFG_REFERENCE_ID, self.reference.id() as i64);
        let map: Vec<i64> = self.map.iter().map(|i| *i as i64).collect();
        sub.add_int_array(CFG_MAP, &map);
        sub.add_bool_array(CFG_FLAGS, &self.from_reference);
        settings.add_node_settings(sub);
        if let Some(append) = &self.append_table {
            append.save_to_file(data_file, settings, monitor)?;
        }
        Ok(())
    }

    fn clear(&self) {
        if let Some(append) = &self.append_table {
            append.clear();
        }
    }

    fn ensure_open(&self) -> TableResult<()> {
        match &self.append_table {
            Some(append) => append.ensure_open(),
            None => Ok(()),
        }
    }
}

struct RearrangeIterator {
    base: RowIterator,
    append: Option<RowIterator>,
    map: Vec<usize>,
    from_reference: Vec<bool>,
}

impl Iterator for RearrangeIterator {
    type Item = DataRow;

    fn next(&mut self) -> Option<DataRow> {
        let base = self.base.next()?;
        let appended = match self.append.as_mut() {
            Some(it) => it.next().map(|r| r.cells).unwrap_or_default(),
            None => Vec::new(),
        };
        let cells = self
            .map
            .iter()
            .zip(&self.from_reference)
            .map(|(i, is_ref)| {
                let source = if *is_ref { &base.cells } else { &appended };
                source.get(*i).cloned().unwrap_or(DataCell::Missing)
            })
            .collect();
        Some(DataRow::new(base.key, cells))
    }
}

impl CloseableRowIterator for RearrangeIterator {
    fn close(&mut self) {
        self.base.close();
        if let Some(it) = self.append.as_mut() {
            it.close();
        }
    }
}
