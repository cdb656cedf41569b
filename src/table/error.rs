//! Table error definitions

use crate::buffer::BufferError;
use crate::repository::RepositoryError;
use crate::types::{RowKey, TableId};
use std::error::Error;
use std::fmt;

/// Table error types
///
/// Errors raised by the row-counted-table contract and by the derived
/// table constructors.
#[derive(Debug)]
pub enum TableError {
    /// Row count does not fit the 32-bit accessor
    RowCountOutOfRange(u64),
    /// Table was cleared and no longer serves rows
    Cleared(TableId),
    /// Invalid argument provided to a table constructor
    InvalidArgument(String),
    /// Row key occurs more than once where keys must be unique
    DuplicateRowKey(RowKey),
    /// Row buffer error
    Buffer(BufferError),
    /// Table repository error
    Repository(RepositoryError),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::RowCountOutOfRange(count) => {
                write!(f, "Row count {} exceeds the 32-bit range", count)
            }
            TableError::Cleared(id) => write!(f, "Table {} has been cleared", id),
            TableError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            TableError::DuplicateRowKey(key) => write!(f, "Duplicate row key: {}", key),
            TableError::Buffer(err) => write!(f, "Buffer error: {}", err),
            TableError::Repository(err) => write!(f, "Repository error: {}", err),
        }
    }
}

impl Error for TableError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TableError::Buffer(err) => Some(err),
            TableError::Repository(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BufferError> for TableError {
    fn from(err: BufferError) -> Self {
        TableError::Buffer(err)
    }
}

impl From<RepositoryError> for TableError {
    fn from(err: RepositoryError) -> Self {
        TableError::Repository(err)
    }
}

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;
