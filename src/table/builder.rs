//! ContainerBuilder for fluent leaf table construction
//!
//! Provides a builder pattern for creating container tables with:
//! - Column definition
//! - Row accumulation
//! - Validation before build

use crate::table::{ContainerTable, TableError, TableResult};
use crate::types::{ColumnSpec, DataCell, DataRow, DataType, RowKey, TableSpec};
use std::collections::HashSet;

/// Builder for constructing [`ContainerTable`] instances
///
/// # Example
/// ```
/// use tablestore::table::{ContainerBuilder, RowCountedTable};
/// use tablestore::types::{DataCell, DataType};
///
/// let table = ContainerBuilder::new()
///     .column("id", DataType::Int)
///     .column("name", DataType::String)
///     .row("Row0", vec![DataCell::Int(1), DataCell::String("a".into())])
///     .build()
///     .unwrap();
/// assert_eq!(table.size(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    columns: Vec<ColumnSpec>,
    rows: Vec<DataRow>,
}

impl ContainerBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing spec
    pub fn with_spec(spec: &TableSpec) -> Self {
        Self {
            columns: spec.columns().to_vec(),
            rows: Vec::new(),
        }
    }

    /// Add a single column
    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(ColumnSpec::new(name, data_type));
        self
    }

    /// Add a single row
    pub fn row(mut self, key: impl Into<String>, cells: Vec<DataCell>) -> Self {
        self.rows.push(DataRow::new(RowKey::new(key), cells));
        self
    }

    /// Add multiple rows at once
    pub fn rows(mut self, rows: impl IntoIterator<Item = DataRow>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Build the table
    ///
    /// Fails on duplicate column names, duplicate row keys, or rows whose
    /// width differs from the column count.
    pub fn build(self) -> TableResult<ContainerTable> {
        let mut names = HashSet::new();
        if let Some(dup) = self.columns.iter().find(|c| !names.insert(c.name.as_str())) {
            return Err(TableError::InvalidArgument(format!(
                "duplicate column name \"{}\"",
                dup.name
            )));
        }

        let mut keys = HashSet::new();
        if let Some(dup) = self.rows.iter().find(|r| !keys.insert(&r.key)) {
            return Err(TableError::DuplicateRowKey(dup.key.clone()));
        }

        ContainerTable::new(TableSpec::new(self.columns), self.rows)
    }
}
