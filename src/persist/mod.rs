//! Persistence engine
//!
//! Saves a table and its reference graph to a directory tree and restores
//! it. Every table gets its own directory:
//! - `data.xml`: id, type tag, reference sub-directories, data file name
//! - `spec.xml`: schema
//! - `data.zip`: rows, only for kinds that own rows
//! - `r0/`, `r1/`, ...: references written alongside
//!
//! A table met twice within one save pass is written once; its second
//! occurrence is a marker resolved through the repository on load.

pub mod error;
pub mod format;

pub use error::{PersistError, PersistResult};
pub use format::{FormatEra, FormatLoader, LegacyLoader, ModernLoader};

use crate::progress::ExecutionMonitor;
use crate::repository::TableRepository;
use crate::settings::NodeSettings;
use crate::table::variant::TABLE_TYPE_REFERENCE_IN_SAME_NODE;
use crate::table::{
    ExtensionRegistry, RowCountedTable, TableHandle, TableKind, TableVariant, observe_id,
};
use crate::types::{
    REFERENCE_DIR_PREFIX, ReferencePolicy, TABLE_DATA_FILE, TABLE_DESCRIPTION_FILE,
    TABLE_SPEC_FILE, TableId, TableSpec, TableStoreConfig,
};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path};
use std::sync::Arc;

pub(crate) const CFG_TABLE_META: &str = "table_meta_info";
const CFG_TABLE_ID: &str = "table_ID";
const CFG_TABLE_TYPE: &str = "table_type";
const CFG_TABLE_REFERENCES: &str = "table_references";
const CFG_TABLE_REFERENCE_LEGACY: &str = "table_reference";
const CFG_TABLE_FILE_NAME: &str = "table_file_name";

/// Data file name while a save is writing it
const STAGED_DATA_FILE: &str = "data.zip.part";

/// Everything a table kind needs to rebuild itself from a directory
pub struct LoadContext<'a> {
    /// Metadata document of the table
    pub meta: &'a NodeSettings,
    /// Schema from `spec.xml`, absent for legacy directories
    pub spec: Option<&'a TableSpec>,
    /// Data file, if the table saved one
    pub data_file: Option<&'a Path>,
    pub repository: &'a TableRepository,
    pub extensions: &'a ExtensionRegistry,
    pub monitor: &'a dyn ExecutionMonitor,
    pub era: FormatEra,
    pub verify_checksums: bool,
}

impl LoadContext<'_> {
    /// Resolve a referenced table restored earlier in this load
    pub fn reference(&self, id: i64) -> PersistResult<TableHandle> {
        let id = TableId::try_from(id)
            .map_err(|_| PersistError::Corrupted(format!("invalid table id {}", id)))?;
        self.repository
            .get(id)
            .ok_or(PersistError::UnresolvedReference(id))
    }

    /// Data file that the table kind cannot do without
    pub fn require_data_file(&self) -> PersistResult<&Path> {
        self.data_file
            .ok_or_else(|| PersistError::Corrupted("table has no data file".to_string()))
    }
}

struct SaveProgress {
    done: usize,
    total: usize,
}

/// Saves and loads table directories
pub struct PersistenceEngine {
    config: TableStoreConfig,
    extensions: Arc<ExtensionRegistry>,
}

impl Default for PersistenceEngine {
    fn default() -> Self {
        Self::new(
            TableStoreConfig::default(),
            Arc::new(ExtensionRegistry::with_builtins()),
        )
    }
}

impl PersistenceEngine {
    pub fn new(config: TableStoreConfig, extensions: Arc<ExtensionRegistry>) -> Self {
        Self { config, extensions }
    }

    pub fn config(&self) -> &TableStoreConfig {
        &self.config
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    // ========================================================================
    // Save
    // ========================================================================

    /// Save `handle` into `dir`
    ///
    /// `saved_ids` collects the ids written during one save pass; pass the
    /// same set when saving several tables of one node so that shared
    /// tables are written once.
    pub fn save(
        &self,
        handle: &TableHandle,
        dir: &Path,
        saved_ids: &mut HashSet<TableId>,
        monitor: &dyn ExecutionMonitor,
    ) -> PersistResult<()> {
        let mut visited = saved_ids.clone();
        let mut progress = SaveProgress {
            done: 0,
            total: self.count_to_save(handle, &mut visited),
        };
        self.save_table(handle, dir, saved_ids, &mut progress, monitor)
    }

    fn count_to_save(&self, handle: &TableHandle, visited: &mut HashSet<TableId>) -> usize {
        if !visited.insert(handle.id()) {
            return 0;
        }
        1 + handle
            .referenced_handles()
            .iter()
            .filter(|r| self.writes_reference(handle, r))
            .map(|r| self.count_to_save(r, visited))
            .sum::<usize>()
    }

    fn writes_reference(&self, handle: &TableHandle, reference: &TableHandle) -> bool {
        match self.config.reference_policy {
            ReferencePolicy::OwnedOnly => reference.owner() == handle.owner(),
            ReferencePolicy::SelfContained => true,
        }
    }

    fn save_table(
        &self,
        handle: &TableHandle,
        dir: &Path,
        saved_ids: &mut HashSet<TableId>,
        progress: &mut SaveProgress,
        monitor: &dyn ExecutionMonitor,
    ) -> PersistResult<()> {
        monitor.check_canceled()?;
        fs::create_dir_all(dir).map_err(|e| PersistError::io(dir, e))?;
        let data_file = dir.join(TABLE_DATA_FILE);
        // tables loaded lazily from `dir` still read their rows from `data_file`
        let staged_file = dir.join(STAGED_DATA_FILE);
        remove_if_exists(&staged_file)?;

        let mut meta = NodeSettings::new(CFG_TABLE_META);
        meta.add_int(CFG_TABLE_ID, handle.id() as i64);
        if !saved_ids.insert(handle.id()) {
            log::debug!("Table {} already saved, writing reference", handle.id());
            meta.add_string(CFG_TABLE_TYPE, Some(TABLE_TYPE_REFERENCE_IN_SAME_NODE));
        } else {
            let kind = handle.kind();
            meta.add_string(CFG_TABLE_TYPE, Some(kind.type_tag()));
            if !kind.is_container() {
                let mut reference_dirs = Vec::new();
                for reference in handle.referenced_handles() {
                    if !self.writes_reference(handle, &reference)
                        || saved_ids.contains(&reference.id())
                    {
                        continue;
                    }
                    let name = format!("{}{}", REFERENCE_DIR_PREFIX, reference_dirs.len());
                    self.save_table(&reference, &dir.join(&name), saved_ids, progress, monitor)?;
                    reference_dirs.push(name);
                }
                meta.add_string_array(CFG_TABLE_REFERENCES, &reference_dirs);
            }
            handle.delegate().save_to_file(&staged_file, &mut meta, monitor)?;

            progress.done += 1;
            monitor.report_progress(
                progress.done as f64 / progress.total.max(1) as f64,
                &format!("Saved table {}", handle.id()),
            );
            log::debug!("Saved {} table {} to {}", kind, handle.id(), dir.display());
        }

        if staged_file.exists() {
            fs::rename(&staged_file, &data_file).map_err(|e| PersistError::io(&data_file, e))?;
        } else {
            remove_if_exists(&data_file)?;
        }

        // only name the data file if one was written
        if data_file.exists() {
            meta.add_string(CFG_TABLE_FILE_NAME, Some(TABLE_DATA_FILE));
        } else {
            meta.add_string(CFG_TABLE_FILE_NAME, None);
        }

        let mut spec_settings = NodeSettings::new(TABLE_SPEC_FILE);
        handle.spec().save(&mut spec_settings);
        spec_settings.save_to_file(&dir.join(TABLE_SPEC_FILE))?;
        meta.save_to_file(&dir.join(TABLE_DESCRIPTION_FILE))?;
        Ok(())
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Restore the table saved in `dir`
    ///
    /// `legacy` carries the metadata of directories written before tables
    /// described themselves; it is ignored when `dir` has a `data.xml`.
    /// Every restored table, references included, ends up in `repository`.
    pub fn load(
        &self,
        dir: &Path,
        legacy: Option<&NodeSettings>,
        monitor: &dyn ExecutionMonitor,
        repository: &TableRepository,
    ) -> PersistResult<TableHandle> {
        monitor.check_canceled()?;
        let era = FormatEra::detect(dir, legacy)?;
        let loader = era.loader();
        let meta = loader.read_meta(dir, legacy)?;

        let raw_id = meta.get_int(CFG_TABLE_ID)?;
        let id = TableId::try_from(raw_id)
            .map_err(|_| PersistError::Corrupted(format!("invalid table id {}", raw_id)))?;
        observe_id(id);

        let data_file = match meta.get_string(CFG_TABLE_FILE_NAME)? {
            Some(name) => {
                let path = dir.join(checked_file_name(&name)?);
                if !path.is_file() {
                    return Err(PersistError::io(
                        &path,
                        io::Error::new(io::ErrorKind::NotFound, "no such data file"),
                    ));
                }
                Some(path)
            }
            None => None,
        };

        let tag = meta
            .get_string(CFG_TABLE_TYPE)?
            .ok_or_else(|| PersistError::Corrupted(format!("table {} has no type", id)))?;
        if tag == TABLE_TYPE_REFERENCE_IN_SAME_NODE {
            return repository
                .get(id)
                .ok_or(PersistError::UnresolvedReference(id));
        }
        let kind =
            TableKind::from_type_tag(&tag).ok_or_else(|| PersistError::UnknownTableType(tag))?;

        if let Some(existing) = repository.get(id) {
            log::debug!("Table {} already loaded, reusing it", id);
            return Ok(existing);
        }

        let spec = loader.read_spec(dir)?;
        if !kind.is_container() {
            for name in reference_dirs(&meta)? {
                let sub_dir = dir.join(checked_file_name(&name)?);
                self.load(&sub_dir, Some(&meta), monitor, repository)?;
            }
        }

        let ctx = LoadContext {
            meta: &meta,
            spec: spec.as_ref(),
            data_file: data_file.as_deref(),
            repository,
            extensions: &self.extensions,
            monitor,
            era,
            verify_checksums: self.config.verify_checksums,
        };
        let variant = TableVariant::load(kind, &ctx)?;
        let handle = repository.register(TableHandle::with_id(variant, id));
        log::debug!("Loaded {} table {} from {}", kind, id, dir.display());
        Ok(handle)
    }
}

fn remove_if_exists(path: &Path) -> PersistResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PersistError::io(path, e)),
    }
}

/// Reference sub-directory names, accepting the single-reference form of
/// old documents
fn reference_dirs(meta: &NodeSettings) -> PersistResult<Vec<String>> {
    if meta.contains_key(CFG_TABLE_REFERENCE_LEGACY) {
        return Ok(meta
            .get_string(CFG_TABLE_REFERENCE_LEGACY)?
            .into_iter()
            .collect());
    }
    Ok(meta.get_string_array(CFG_TABLE_REFERENCES)?)
}

/// Name of an entry directly inside the table directory
fn checked_file_name(name: &str) -> PersistResult<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(PersistError::Corrupted(format!(
            "invalid entry name \"{}\" in table directory",
            name
        ))),
    }
}
