//! Closed set of table kinds and their persisted type tags

use crate::persist::{LoadContext, PersistResult};
use crate::progress::ExecutionMonitor;
use crate::settings::NodeSettings;
use crate::table::kinds::{
    ConcatenateTable, ContainerTable, ExtensionTable, JoinedTable, RearrangeColumnsTable,
    TableSpecReplacerTable, VoidTable, WrappedTable,
};
use crate::table::{RowCountedTable, RowIterator, TableHandle, TableResult};
use crate::types::TableSpec;
use std::fmt;
use std::path::Path;

/// Tag written in place of a table already saved in the same pass
pub const TABLE_TYPE_REFERENCE_IN_SAME_NODE: &str = "reference_from_same_node_table";

/// Kind of a table, as persisted in its type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Container,
    RearrangeColumns,
    TableSpecReplacer,
    Wrapped,
    Concatenate,
    Joined,
    Void,
    Extension,
}

impl TableKind {
    pub const ALL: [TableKind; 8] = [
        TableKind::Container,
        TableKind::RearrangeColumns,
        TableKind::TableSpecReplacer,
        TableKind::Wrapped,
        TableKind::Concatenate,
        TableKind::Joined,
        TableKind::Void,
        TableKind::Extension,
    ];

    pub fn type_tag(&self) -> &'static str {
        match self {
            TableKind::Container => "container_table",
            TableKind::RearrangeColumns => "rearrange_columns_table",
            TableKind::TableSpecReplacer => "new_spec_table",
            TableKind::Wrapped => "wrapped_table",
            TableKind::Concatenate => "concatenate_table",
            TableKind::Joined => "joined_table",
            TableKind::Void => "void_table",
            TableKind::Extension => "extension_table",
        }
    }

    pub fn from_type_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_tag() == tag)
    }

    /// Leaf kinds own their rows and reference nothing
    pub fn is_container(&self) -> bool {
        matches!(self, TableKind::Container)
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

/// A table delegate of one of the eight kinds
pub enum TableVariant {
    Container(ContainerTable),
    RearrangeColumns(RearrangeColumnsTable),
    TableSpecReplacer(TableSpecReplacerTable),
    Wrapped(WrappedTable),
    Concatenate(ConcatenateTable),
    Joined(JoinedTable),
    Void(VoidTable),
    Extension(ExtensionTable),
}

impl TableVariant {
    pub fn kind(&self) -> TableKind {
        match self {
            TableVariant::Container(_) => TableKind::Container,
            TableVariant::RearrangeColumns(_) => TableKind::RearrangeColumns,
            TableVariant::TableSpecReplacer(_) => TableKind::TableSpecReplacer,
            TableVariant::Wrapped(_) => TableKind::Wrapped,
            TableVariant::Concatenate(_) => TableKind::Concatenate,
            TableVariant::Joined(_) => TableKind::Joined,
            TableVariant::Void(_) => TableKind::Void,
            TableVariant::Extension(_) => TableKind::Extension,
        }
    }

    /// Rebuild the delegate of `kind` from a saved directory
    pub fn load(kind: TableKind, ctx: &LoadContext<'_>) -> PersistResult<Self> {
        Ok(match kind {
            TableKind::Container => TableVariant::Container(ContainerTable::load(ctx)?),
            TableKind::RearrangeColumns => {
                TableVariant::RearrangeColumns(RearrangeColumnsTable::load(ctx)?)
            }
            TableKind::TableSpecReplacer => {
                TableVariant::TableSpecReplacer(TableSpecReplacerTable::load(ctx)?)
            }
            TableKind::Wrapped => TableVariant::Wrapped(WrappedTable::load(ctx)?),
            TableKind::Concatenate => TableVariant::Concatenate(ConcatenateTable::load(ctx)?),
            TableKind::Joined => TableVariant::Joined(JoinedTable::load(ctx)?),
            TableKind::Void => TableVariant::Void(VoidTable::load(ctx)?),
            TableKind::Extension => TableVariant::Extension(ExtensionTable::load(ctx)?),
        })
    }

    fn table(&self) -> &dyn RowCountedTable {
        match self {
            TableVariant::Container(t) => t,
            TableVariant::RearrangeColumns(t) => t,
            TableVariant::TableSpecReplacer(t) => t,
            TableVariant::Wrapped(t) => t,
            TableVariant::Concatenate(t) => t,
            TableVariant::Joined(t) => t,
            TableVariant::Void(t) => t,
            TableVariant::Extension(t) => t,
        }
    }
}

impl RowCountedTable for TableVariant {
    fn spec(&self) -> &TableSpec {
        self.table().spec()
    }

    fn size(&self) -> u64 {
        self.table().size()
    }

    fn iterator(&self) -> TableResult<RowIterator> {
        self.table().iterator()
    }

    fn referenced_handles(&self) -> Vec<TableHandle> {
        self.table().referenced_handles()
    }

    fn save_to_file(
        &self,
        data_file: &Path,
        settings: &mut NodeSettings,
        monitor: &dyn ExecutionMonitor,
    ) -> PersistResult<()> {
        self.table().save_to_file(data_file, settings, monitor)
    }

    fn clear(&self) {
        self.table().clear()
    }

    fn ensure_open(&self) -> TableResult<()> {
        self.table().ensure_open()
    }
}

impl From<ContainerTable> for TableVariant {
    fn from(t: ContainerTable) -> Self {
        TableVariant::Container(t)
    }
}

impl From<RearrangeColumnsTable> for TableVariant {
    fn from(t: RearrangeColumnsTable) -> Self {
        TableVariant::RearrangeColumns(t)
    }
}

impl From<TableSpecReplacerTable> for TableVariant {
    fn from(t: TableSpecReplacerTable) -> Self {
        TableVariant::TableSpecReplacer(t)
    }
}

impl From<WrappedTable> for TableVariant {
    fn from(t: WrappedTable) -> Self {
        TableVariant::Wrapped(t)
    }
}

impl From<ConcatenateTable> for TableVariant {
    fn from(t: ConcatenateTable) -> Self {
        TableVariant::Concatenate(t)
    }
}

impl From<JoinedTable> for TableVariant {
    fn from(t: JoinedTable) -> Self {
        TableVariant::Joined(t)
    }
}

impl From<VoidTable> for TableVariant {
    fn from(t: VoidTable) -> Self {
        TableVariant::Void(t)
    }
}

impl From<ExtensionTable> for TableVariant {
    fn from(t: ExtensionTable) -> Self {
        TableVariant::Extension(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags_are_distinct_and_round_trip() {
        for kind in TableKind::ALL {
            assert_eq!(TableKind::from_type_tag(kind.type_tag()), Some(kind));
            assert_ne!(kind.type_tag(), TABLE_TYPE_REFERENCE_IN_SAME_NODE);
        }
        assert_eq!(TableKind::from_type_tag("no_such_table"), None);
        assert_eq!(TableKind::from_type_tag(TABLE_TYPE_REFERENCE_IN_SAME_NODE), None);
    }

    #[test]
    fn test_only_container_is_leaf() {
        let leaves: Vec<TableKind> = TableKind::ALL
            .into_iter()
            .filter(TableKind::is_container)
            .collect();
        assert_eq!(leaves, vec![TableKind::Container]);
    }
}
