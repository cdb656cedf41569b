//! Settings error definitions

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Settings error types
///
/// Raised while reading typed entries from a settings document or while
/// moving a document to and from disk.
#[derive(Debug)]
pub enum SettingsError {
    /// Requested key is not present in the config
    MissingKey { config: String, key: String },
    /// Key is present but holds a different entry type
    WrongType { key: String, expected: &'static str },
    /// I/O error while reading or writing a settings file
    Io { path: PathBuf, source: std::io::Error },
    /// Settings file could not be parsed
    Parse { path: PathBuf, message: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::MissingKey { config, key } => {
                write!(f, "Config \"{}\" does not contain key \"{}\"", config, key)
            }
            SettingsError::WrongType { key, expected } => {
                write!(f, "Entry \"{}\" is not of type {}", key, expected)
            }
            SettingsError::Io { path, source } => {
                write!(f, "I/O error on \"{}\": {}", path.display(), source)
            }
            SettingsError::Parse { path, message } => {
                write!(f, "Unable to parse \"{}\": {}", path.display(), message)
            }
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SettingsError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for settings operations
pub type SettingsResult<T> = Result<T, SettingsError>;
