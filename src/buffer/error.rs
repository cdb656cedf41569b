//! Row buffer error definitions

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Row buffer errors
#[derive(Debug)]
pub enum BufferError {
    /// Data file does not start with the expected magic number
    BadMagic(PathBuf),
    /// Data file was written by an unsupported format version
    UnsupportedVersion { path: PathBuf, version: u32 },
    /// Stored payload does not match its checksum
    ChecksumMismatch(PathBuf),
    /// Rows or stored spec disagree with the expected schema
    SchemaMismatch { expected: usize, found: usize },
    /// Row payload could not be encoded or decoded
    Codec(String),
    /// Buffer was cleared and its rows released
    Cleared,
    /// I/O error on a data file
    Io { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::BadMagic(path) => {
                write!(f, "Not a table data file: {}", path.display())
            }
            BufferError::UnsupportedVersion { path, version } => write!(
                f,
                "Unsupported data file version {} in {}",
                version,
                path.display()
            ),
            BufferError::ChecksumMismatch(path) => {
                write!(f, "Checksum mismatch in data file {}", path.display())
            }
            BufferError::SchemaMismatch { expected, found } => write!(
                f,
                "Schema mismatch: expected {} columns, found {}",
                expected, found
            ),
            BufferError::Codec(msg) => write!(f, "Row codec error: {}", msg),
            BufferError::Cleared => write!(f, "Buffer has been cleared"),
            BufferError::Io { path, source } => {
                write!(f, "I/O error on \"{}\": {}", path.display(), source)
            }
        }
    }
}

impl Error for BufferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BufferError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<bincode::Error> for BufferError {
    fn from(err: bincode::Error) -> Self {
        BufferError::Codec(err.to_string())
    }
}

/// Result type for row buffer operations
pub type BufferResult<T> = Result<T, BufferError>;
