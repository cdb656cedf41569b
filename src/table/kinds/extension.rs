//! Pluggable table kinds
//!
//! An extension table delegates to an implementation looked up by name in
//! an [`ExtensionRegistry`] at load time. A directory whose implementation
//! is not registered fails with `PersistError::ExtensionNotInstalled`.

use crate::persist::{LoadContext, PersistError, PersistResult};
use crate::progress::ExecutionMonitor;
use crate::repository::TableRepository;
use crate::settings::NodeSettings;
use crate::table::kinds::slice::RowSliceLoader;
use crate::table::{RowCountedTable, RowIterator, TableHandle, TableResult};
use crate::types::{TableId, TableSpec};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

const CFG_EXTENSION_IMPL: &str = "extension_impl";
const CFG_EXTENSION_CONFIG: &str = "extension_config";

/// Behaviour of a custom table kind
pub trait ExtensionTableImpl: Send + Sync {
    /// Registry key of the loader able to restore this table
    fn implementation_name(&self) -> &str;

    fn spec(&self) -> &TableSpec;

    fn size(&self) -> u64;

    fn iterator(&self) -> TableResult<RowIterator>;

    fn referenced_handles(&self) -> Vec<TableHandle>;

    /// Write the implementation's own config; rows, if any, go to `data_file`
    fn save_config(
        &self,
        data_file: &Path,
        config: &mut NodeSettings,
        monitor: &dyn ExecutionMonitor,
    ) -> PersistResult<()>;

    fn clear(&self);

    fn ensure_open(&self) -> TableResult<()> {
        Ok(())
    }
}

/// What an extension loader gets to see of the saved directory
pub struct ExtensionLoadContext<'a> {
    pub config: &'a NodeSettings,
    pub spec: Option<&'a TableSpec>,
    pub data_file: Option<&'a Path>,
    pub repository: &'a TableRepository,
}

impl ExtensionLoadContext<'_> {
    /// Resolve a referenced table restored earlier in this load
    pub fn reference(&self, id: i64) -> PersistResult<TableHandle> {
        let id = TableId::try_from(id)
            .map_err(|_| PersistError::Corrupted(format!("invalid table id {}", id)))?;
        self.repository
            .get(id)
            .ok_or(PersistError::UnresolvedReference(id))
    }
}

/// Restores one extension implementation
pub trait ExtensionLoader: Send + Sync {
    fn load(&self, ctx: &ExtensionLoadContext<'_>) -> PersistResult<Box<dyn ExtensionTableImpl>>;
}

/// Extension loaders keyed by implementation name
#[derive(Default)]
pub struct ExtensionRegistry {
    loaders: HashMap<String, Arc<dyn ExtensionLoader>>,
}

impl ExtensionRegistry {
    /// Registry without any loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the loaders shipped with this crate
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(RowSliceLoader::IMPLEMENTATION_NAME, Arc::new(RowSliceLoader));
        registry
    }

    /// Add or replace the loader for `name`
    pub fn register(&mut self, name: impl Into<String>, loader: Arc<dyn ExtensionLoader>) {
        self.loaders.insert(name.into(), loader);
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ExtensionLoader>> {
        self.loaders.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.loaders.contains_key(name)
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.loaders.keys().collect();
        names.sort();
        f.debug_struct("ExtensionRegistry")
            .field("loaders", &names)
            .finish()
    }
}

pub struct ExtensionTable {
    inner: Box<dyn ExtensionTableImpl>,
}

impl ExtensionTable {
    pub fn new(inner: Box<dyn ExtensionTableImpl>) -> Self {
        Self { inner }
    }

    pub fn implementation_name(&self) -> &str {
        self.inner.implementation_name()
    }

    pub fn inner(&self) -> &dyn ExtensionTableImpl {
        self.inner.as_ref()
    }

    pub fn load(ctx: &LoadContext<'_>) -> PersistResult<Self> {
        let name = ctx.meta.get_string(CFG_EXTENSION_IMPL)?.ok_or_else(|| {
            PersistError::Corrupted("extension table without implementation name".to_string())
        })?;
        let loader = ctx
            .extensions
            .resolve(&name)
            .ok_or_else(|| PersistError::ExtensionNotInstalled(name.clone()))?;
        let ext_ctx = ExtensionLoadContext {
            config: ctx.meta.get_node_settings(CFG_EXTENSION_CONFIG)?,
            spec: ctx.spec,
            data_file: ctx.data_file,
            repository: ctx.repository,
        };
        Ok(Self::new(loader.load(&ext_ctx)?))
    }
}

impl RowCountedTable for ExtensionTable {
    fn spec(&self) -> &TableSpec {
        self.inner.spec()
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn iterator(&self) -> TableResult<RowIterator> {
        self.inner.iterator()
    }

    fn referenced_handles(&self) -> Vec<TableHandle> {
        self.inner.referenced_handles()
    }

    fn save_to_file(
        &self,
        data_file: &Path,
        settings: &mut NodeSettings,
        monitor: &dyn ExecutionMonitor,
    ) -> PersistResult<()> {
        settings.add_string(CFG_EXTENSION_IMPL, Some(self.inner.implementation_name()));
        let mut config = NodeSettings::new(CFG_EXTENSION_CONFIG);
        self.inner.save_config(data_file, &mut config, monitor)?;
        settings.add_node_settings(config);
        Ok(())
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn ensure_open(&self) -> TableResult<()> {
        self.inner.ensure_open()
    }
}
