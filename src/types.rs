use crate::settings::{NodeSettings, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Global type definitions
///
/// Stores identifiers, the cell/row/spec data model and configuration
/// shared by every table kind.
/// Table ID type
pub type TableId = u64;

/// Metadata document of a saved table
pub const TABLE_DESCRIPTION_FILE: &str = "data.xml";

/// Schema document of a saved table
pub const TABLE_SPEC_FILE: &str = "spec.xml";

/// Row data file of a saved table
pub const TABLE_DATA_FILE: &str = "data.zip";

/// Prefix of owned-reference sub-directories (`r0`, `r1`, ...)
pub const REFERENCE_DIR_PREFIX: &str = "r";

/// Identifier of the workflow node that owns a table
///
/// Only ever compared for equality; holding a `NodeId` never keeps a node alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Int,
    Double,
    String,
    Boolean,
}

impl DataType {
    fn name(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Double => "double",
            DataType::String => "string",
            DataType::Boolean => "boolean",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(DataType::Int),
            "double" => Some(DataType::Double),
            "string" => Some(DataType::String),
            "boolean" => Some(DataType::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataCell {
    /// Missing value sentinel
    Missing,
    Int(i64),
    Double(f64),
    String(String),
    Boolean(bool),
}

impl DataCell {
    pub fn is_missing(&self) -> bool {
        matches!(self, DataCell::Missing)
    }
}

/// Row identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey(pub String);

impl RowKey {
    pub fn new(key: impl Into<String>) -> Self {
        RowKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A keyed row of cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    pub key: RowKey,
    pub cells: Vec<DataCell>,
}

impl DataRow {
    pub fn new(key: RowKey, cells: Vec<DataCell>) -> Self {
        Self { key, cells }
    }

    /// Row of `cell_count` missing cells
    pub fn missing(key: RowKey, cell_count: usize) -> Self {
        Self {
            key,
            cells: vec![DataCell::Missing; cell_count],
        }
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Table schema
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableSpec {
    columns: Vec<ColumnSpec>,
}

impl TableSpec {
    const CFG_COLUMN_COUNT: &'static str = "number_columns";
    const CFG_COLUMN_PREFIX: &'static str = "column_spec_";
    const CFG_COLUMN_NAME: &'static str = "column_name";
    const CFG_COLUMN_TYPE: &'static str = "column_type";

    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&ColumnSpec> {
        self.columns.get(index)
    }

    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Columns of `self` followed by columns of `other`
    pub fn append(&self, other: &TableSpec) -> TableSpec {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        TableSpec { columns }
    }

    /// Write the spec into `settings`
    pub fn save(&self, settings: &mut NodeSettings) {
        settings.add_int(Self::CFG_COLUMN_COUNT, self.columns.len() as i64);
        for (i, col) in self.columns.iter().enumerate() {
            let mut sub = NodeSettings::new(format!("{}{}", Self::CFG_COLUMN_PREFIX, i));
            sub.add_string(Self::CFG_COLUMN_NAME, Some(&col.name));
            sub.add_string(Self::CFG_COLUMN_TYPE, Some(col.data_type.name()));
            settings.add_node_settings(sub);
        }
    }

    /// Read a spec written by [`TableSpec::save`]
    pub fn load(settings: &NodeSettings) -> SettingsResult<Self> {
        let count = settings.get_int(Self::CFG_COLUMN_COUNT)?;
        let mut columns = Vec::with_capacity(count.max(0) as usize);
        for i in 0..count {
            let sub = settings.get_node_settings(&format!("{}{}", Self::CFG_COLUMN_PREFIX, i))?;
            let name = sub
                .get_string(Self::CFG_COLUMN_NAME)?
                .ok_or_else(|| SettingsError::WrongType {
                    key: Self::CFG_COLUMN_NAME.to_string(),
                    expected: "non-null string",
                })?;
            let type_name = sub.get_string(Self::CFG_COLUMN_TYPE)?.unwrap_or_default();
            let data_type =
                DataType::from_name(&type_name).ok_or_else(|| SettingsError::WrongType {
                    key: Self::CFG_COLUMN_TYPE.to_string(),
                    expected: "known column type",
                })?;
            columns.push(ColumnSpec { name, data_type });
        }
        Ok(TableSpec { columns })
    }
}

/// Which references a save pass writes next to the table referencing them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferencePolicy {
    /// Only references owned by the same node are written; the rest are
    /// assumed persisted by their own owner
    #[default]
    OwnedOnly,
    /// Every reference not yet written in this pass is written, so the
    /// directory can be loaded on its own
    SelfContained,
}

/// Table store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableStoreConfig {
    /// Reference persistence policy used by save
    pub reference_policy: ReferencePolicy,
    /// Verify the data file checksum when rows are read back
    pub verify_checksums: bool,
    /// Suffix appended to duplicate row keys by concatenation
    pub duplicate_key_suffix: String,
}

impl Default for TableStoreConfig {
    fn default() -> Self {
        Self {
            reference_policy: ReferencePolicy::OwnedOnly,
            verify_checksums: true,
            duplicate_key_suffix: String::from("_dup"),
        }
    }
}

impl TableStoreConfig {
    /// Read a JSON configuration file; absent fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
