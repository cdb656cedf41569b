//! On-disk format eras and their loader strategies
//!
//! Current directories describe themselves through `data.xml` and
//! `spec.xml`. The oldest supported directories carry neither: their
//! metadata arrives in settings handed in by the caller and their schema
//! lives inside the data file.

use crate::persist::{CFG_TABLE_META, PersistError, PersistResult};
use crate::settings::NodeSettings;
use crate::types::{TABLE_DESCRIPTION_FILE, TABLE_SPEC_FILE, TableSpec};
use std::io;
use std::path::Path;

/// Format generation of a saved table directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatEra {
    /// Self-describing directory with `data.xml`
    Modern,
    /// Metadata supplied externally, schema inside the data file
    Legacy,
}

impl FormatEra {
    /// Decide the era of `dir`
    ///
    /// A directory without `data.xml` is only loadable when the caller
    /// supplies the legacy settings.
    pub fn detect(dir: &Path, legacy: Option<&NodeSettings>) -> PersistResult<Self> {
        let description = dir.join(TABLE_DESCRIPTION_FILE);
        if description.is_file() {
            Ok(FormatEra::Modern)
        } else if legacy.is_some() {
            Ok(FormatEra::Legacy)
        } else {
            Err(PersistError::io(
                &description,
                io::Error::new(io::ErrorKind::NotFound, "no such table description"),
            ))
        }
    }

    /// Loader strategy for this era
    pub fn loader(&self) -> &'static dyn FormatLoader {
        match self {
            FormatEra::Modern => &ModernLoader,
            FormatEra::Legacy => &LegacyLoader,
        }
    }
}

/// Reads the era-specific parts of a table directory
pub trait FormatLoader: Sync {
    fn era(&self) -> FormatEra;

    /// Metadata document holding id, type tag, references and file name
    fn read_meta(&self, dir: &Path, legacy: Option<&NodeSettings>) -> PersistResult<NodeSettings>;

    /// Schema document, `None` if the directory has none
    fn read_spec(&self, dir: &Path) -> PersistResult<Option<TableSpec>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModernLoader;

impl FormatLoader for ModernLoader {
    fn era(&self) -> FormatEra {
        FormatEra::Modern
    }

    fn read_meta(&self, dir: &Path, _legacy: Option<&NodeSettings>) -> PersistResult<NodeSettings> {
        Ok(NodeSettings::load_from_file(
            &dir.join(TABLE_DESCRIPTION_FILE),
        )?)
    }

    fn read_spec(&self, dir: &Path) -> PersistResult<Option<TableSpec>> {
        let path = dir.join(TABLE_SPEC_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let settings = NodeSettings::load_from_file(&path)?;
        Ok(Some(TableSpec::load(&settings)?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyLoader;

impl FormatLoader for LegacyLoader {
    fn era(&self) -> FormatEra {
        FormatEra::Legacy
    }

    fn read_meta(&self, dir: &Path, legacy: Option<&NodeSettings>) -> PersistResult<NodeSettings> {
        let settings = legacy.ok_or_else(|| {
            PersistError::Corrupted(format!(
                "no settings supplied for legacy table in {}",
                dir.display()
            ))
        })?;
        Ok(settings.get_node_settings(CFG_TABLE_META)?.clone())
    }

    fn read_spec(&self, _dir: &Path) -> PersistResult<Option<TableSpec>> {
        Ok(None)
    }
}
