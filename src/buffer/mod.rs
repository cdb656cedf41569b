//! Row buffer backing leaf tables
//!
//! A `RowBuffer` holds the rows of a container table. Buffers restored from
//! disk stay closed until first access (`ensure_open`), and `clear`
//! releases the rows for good.

pub mod codec;
pub mod error;

pub use error::{BufferError, BufferResult};

use crate::table::iterator::CloseableRowIterator;
use crate::types::{DataRow, TableSpec};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

enum BufferState {
    /// Rows materialized in memory
    Open(Arc<Vec<DataRow>>),
    /// Rows still in a data file, read on first access
    OnDisk { path: PathBuf, verify: bool },
    /// Rows released
    Cleared,
}

/// Row storage of a leaf table
pub struct RowBuffer {
    spec: TableSpec,
    row_count: u64,
    state: RwLock<BufferState>,
}

impl RowBuffer {
    /// Create an open buffer from rows; every row must match the spec width
    pub fn from_rows(spec: TableSpec, rows: Vec<DataRow>) -> BufferResult<Self> {
        if let Some(bad) = rows.iter().find(|r| r.cell_count() != spec.num_columns()) {
            return Err(BufferError::SchemaMismatch {
                expected: spec.num_columns(),
                found: bad.cell_count(),
            });
        }
        Ok(Self {
            row_count: rows.len() as u64,
            spec,
            state: RwLock::new(BufferState::Open(Arc::new(rows))),
        })
    }

    /// Restore a buffer whose rows stay on disk until first access
    ///
    /// Only the header is read here; the stored spec is checked against
    /// `spec` when the rows are materialized.
    pub fn read_delayed(path: &Path, spec: TableSpec, verify: bool) -> BufferResult<Self> {
        let header = codec::read_header(path)?;
        Ok(Self {
            spec,
            row_count: header.row_count,
            state: RwLock::new(BufferState::OnDisk {
                path: path.to_path_buf(),
                verify,
            }),
        })
    }

    /// Restore a buffer eagerly, taking the spec from the data file itself
    pub fn read_eager(path: &Path, verify: bool) -> BufferResult<Self> {
        let (spec, rows) = codec::read_data_file(path, verify)?;
        Self::from_rows(spec, rows)
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.state.read(), BufferState::Open(_))
    }

    pub fn is_cleared(&self) -> bool {
        matches!(*self.state.read(), BufferState::Cleared)
    }

    /// Materialize rows of a buffer restored with [`RowBuffer::read_delayed`]
    pub fn ensure_open(&self) -> BufferResult<()> {
        let mut state = self.state.write();
        let (path, verify) = match &*state {
            BufferState::Open(_) => return Ok(()),
            BufferState::Cleared => return Err(BufferError::Cleared),
            BufferState::OnDisk { path, verify } => (path.clone(), *verify),
        };
        let (stored_spec, rows) = codec::read_data_file(&path, verify)?;
        if stored_spec.num_columns() != self.spec.num_columns() {
            return Err(BufferError::SchemaMismatch {
                expected: self.spec.num_columns(),
                found: stored_spec.num_columns(),
            });
        }
        log::debug!("Opened {} rows from {}", rows.len(), path.display());
        *state = BufferState::Open(Arc::new(rows));
        Ok(())
    }

    /// Shared snapshot of all rows
    pub fn rows(&self) -> BufferResult<Arc<Vec<DataRow>>> {
        {
            let state = self.state.read();
            match &*state {
                BufferState::Open(rows) => return Ok(rows.clone()),
                BufferState::Cleared => return Err(BufferError::Cleared),
                BufferState::OnDisk { .. } => {}
            }
        }
        self.ensure_open()?;
        self.rows()
    }

    /// Fresh iterator positioned at the first row
    pub fn iterator(&self) -> BufferResult<BufferRowIterator> {
        Ok(BufferRowIterator::new(self.rows()?))
    }

    /// Write the rows to `path`
    ///
    /// A buffer still closed on disk is copied file-to-file without
    /// materializing its rows.
    pub fn save_to_file(&self, path: &Path) -> BufferResult<()> {
        let state = self.state.read();
        match &*state {
            BufferState::Open(rows) => codec::write_data_file(path, &self.spec, rows),
            BufferState::OnDisk { path: source, .. } => {
                if source.as_path() != path {
                    std::fs::copy(source, path).map_err(|e| BufferError::Io {
                        path: path.to_path_buf(),
                        source: e,
                    })?;
                }
                Ok(())
            }
            BufferState::Cleared => Err(BufferError::Cleared),
        }
    }

    /// Release the rows; further reads fail with [`BufferError::Cleared`]
    pub fn clear(&self) {
        *self.state.write() = BufferState::Cleared;
    }
}

/// Forward iterator over a row snapshot
pub struct BufferRowIterator {
    rows: Option<Arc<Vec<DataRow>>>,
    position: usize,
}

impl BufferRowIterator {
    fn new(rows: Arc<Vec<DataRow>>) -> Self {
        Self {
            rows: Some(rows),
            position: 0,
        }
    }
}

impl Iterator for BufferRowIterator {
    type Item = DataRow;

    fn next(&mut self) -> Option<DataRow> {
        let row = self.rows.as_ref()?.get(self.position)?.clone();
        self.position += 1;
        Some(row)
    }
}

impl CloseableRowIterator for BufferRowIterator {
    fn close(&mut self) {
        self.rows = None;
    }
}
