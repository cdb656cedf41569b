//! Persistence error definitions

use crate::buffer::BufferError;
use crate::progress::CanceledExecution;
use crate::settings::SettingsError;
use crate::table::TableError;
use crate::types::TableId;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

/// Persistence error types
///
/// `Canceled` is kept apart from every other variant: callers abort on it
/// and never report it as a failure of the data.
#[derive(Debug)]
pub enum PersistError {
    /// User requested abort
    Canceled(CanceledExecution),
    /// I/O failure on a file or directory
    Io { path: PathBuf, source: std::io::Error },
    /// Saved data is malformed or inconsistent
    Corrupted(String),
    /// Type tag not known to this version
    UnknownTableType(String),
    /// Referenced table id is not in the repository
    UnresolvedReference(TableId),
    /// Extension table implementation is not installed
    ExtensionNotInstalled(String),
    /// Settings document error
    Settings(SettingsError),
    /// Table contract error
    Table(TableError),
}

impl PersistError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        PersistError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, PersistError::Canceled(_))
    }

    pub fn is_extension_missing(&self) -> bool {
        matches!(self, PersistError::ExtensionNotInstalled(_))
    }

    /// True for errors caused by the saved data itself
    pub fn is_data_corrupted(&self) -> bool {
        matches!(
            self,
            PersistError::Corrupted(_)
                | PersistError::UnknownTableType(_)
                | PersistError::UnresolvedReference(_)
                | PersistError::Settings(_)
        )
    }
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Canceled(err) => write!(f, "{}", err),
            PersistError::Io { path, source } => {
                write!(f, "I/O error on \"{}\": {}", path.display(), source)
            }
            PersistError::Corrupted(msg) => write!(f, "Data corrupted: {}", msg),
            PersistError::UnknownTableType(tag) => {
                write!(f, "Unknown table identifier: {}", tag)
            }
            PersistError::UnresolvedReference(id) => {
                write!(f, "Table reference with ID {} not found in load map", id)
            }
            PersistError::ExtensionNotInstalled(name) => write!(
                f,
                "Extension table implementation \"{}\" is not installed",
                name
            ),
            PersistError::Settings(err) => write!(f, "Invalid settings: {}", err),
            PersistError::Table(err) => write!(f, "{}", err),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PersistError::Canceled(err) => Some(err),
            PersistError::Io { source, .. } => Some(source),
            PersistError::Settings(err) => Some(err),
            PersistError::Table(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CanceledExecution> for PersistError {
    fn from(err: CanceledExecution) -> Self {
        PersistError::Canceled(err)
    }
}

impl From<SettingsError> for PersistError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Io { path, source } => PersistError::Io { path, source },
            other => PersistError::Settings(other),
        }
    }
}

impl From<BufferError> for PersistError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::Io { path, source } => PersistError::Io { path, source },
            BufferError::Cleared => PersistError::Table(TableError::Buffer(BufferError::Cleared)),
            other => PersistError::Corrupted(other.to_string()),
        }
    }
}

impl From<TableError> for PersistError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::Buffer(buffer_err) => buffer_err.into(),
            other => PersistError::Table(other),
        }
    }
}

/// Result type for persistence operations
pub type PersistResult<T> = Result<T, PersistError>;
