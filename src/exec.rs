//! Table construction on behalf of one node
//!
//! An `ExecutionContext` is what a node computation uses to create tables:
//! every factory wraps the new delegate in a handle, makes the node its
//! owner and registers it in the repository.

use crate::repository::TableRepository;
use crate::table::{
    ColumnSource, ConcatenateTable, ContainerTable, DuplicateKeyPolicy, ExtensionTable,
    ExtensionTableImpl, JoinedTable, RearrangeColumnsTable, RowSliceTable, TableHandle,
    TableResult, TableSpecReplacerTable, TableVariant, VoidTable, WrappedTable,
};
use crate::types::{DataCell, DataRow, NodeId, TableId, TableSpec, TableStoreConfig};
use std::sync::Arc;

pub struct ExecutionContext {
    owner: NodeId,
    repository: Arc<TableRepository>,
    config: TableStoreConfig,
}

impl ExecutionContext {
    pub fn new(owner: NodeId, repository: Arc<TableRepository>, config: TableStoreConfig) -> Self {
        Self {
            owner,
            repository,
            config,
        }
    }

    /// Node on whose behalf tables are created
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn repository(&self) -> &Arc<TableRepository> {
        &self.repository
    }

    pub fn config(&self) -> &TableStoreConfig {
        &self.config
    }

    fn adopt(&self, delegate: impl Into<TableVariant>) -> TableResult<TableHandle> {
        let handle = TableHandle::new(delegate);
        handle.set_owner_recursively(self.owner);
        self.repository.put_owned(&handle, self.owner)?;
        log::debug!("{} created {} table {}", self.owner, handle.kind(), handle.id());
        Ok(handle)
    }

    pub fn create_container(
        &self,
        spec: TableSpec,
        rows: Vec<DataRow>,
    ) -> TableResult<TableHandle> {
        self.adopt(ContainerTable::new(spec, rows)?)
    }

    /// Adopt a container built elsewhere, e.g. with [`crate::table::ContainerBuilder`]
    pub fn adopt_container(&self, table: ContainerTable) -> TableResult<TableHandle> {
        self.adopt(table)
    }

    pub fn create_rearranged(
        &self,
        reference: &TableHandle,
        layout: &[ColumnSource],
        appended: Option<(TableSpec, Vec<Vec<DataCell>>)>,
    ) -> TableResult<TableHandle> {
        self.adopt(RearrangeColumnsTable::create(reference.clone(), layout, appended)?)
    }

    pub fn create_spec_replaced(
        &self,
        reference: &TableHandle,
        spec: TableSpec,
    ) -> TableResult<TableHandle> {
        self.adopt(TableSpecReplacerTable::create(reference.clone(), spec)?)
    }

    pub fn create_wrapped(&self, reference: &TableHandle) -> TableResult<TableHandle> {
        self.adopt(WrappedTable::new(reference.clone()))
    }

    /// Concatenate with the configured duplicate key suffix
    pub fn create_concatenated(&self, references: &[TableHandle]) -> TableResult<TableHandle> {
        let policy = DuplicateKeyPolicy::AppendSuffix(self.config.duplicate_key_suffix.clone());
        self.create_concatenated_with(references, policy)
    }

    pub fn create_concatenated_with(
        &self,
        references: &[TableHandle],
        policy: DuplicateKeyPolicy,
    ) -> TableResult<TableHandle> {
        self.adopt(ConcatenateTable::create(references.to_vec(), policy)?)
    }

    pub fn create_joined(
        &self,
        left: &TableHandle,
        right: &TableHandle,
    ) -> TableResult<TableHandle> {
        self.adopt(JoinedTable::create(left.clone(), right.clone())?)
    }

    pub fn create_void(&self, spec: TableSpec) -> TableResult<TableHandle> {
        self.adopt(VoidTable::new(spec))
    }

    pub fn create_extension(&self, inner: Box<dyn ExtensionTableImpl>) -> TableResult<TableHandle> {
        self.adopt(ExtensionTable::new(inner))
    }

    /// Rows `from..to` of `reference` through the built-in slice extension
    pub fn create_slice(
        &self,
        reference: &TableHandle,
        from: u64,
        to: u64,
    ) -> TableResult<TableHandle> {
        self.create_extension(Box::new(RowSliceTable::new(reference.clone(), from, to)))
    }

    /// Release every table this node owns below `handle`
    pub fn release(&self, handle: &TableHandle) -> Vec<TableId> {
        self.repository.release(handle, self.owner)
    }
}
