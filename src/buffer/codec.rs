//! Data file codec
//!
//! Layout of `data.zip`:
//! ```text
//! Offset  Size  Field
//!   0     4     magic ("TBLZ")
//!   4     4     version
//!   8     8     row count
//!  16     8     payload length
//!  24     4     crc32 of payload
//!  28     ...   payload (bincode: spec, rows)
//! ```
//! The spec travels inside the payload so that files written before
//! `spec.xml` existed still describe their own schema.

use crate::buffer::error::{BufferError, BufferResult};
use crate::types::{DataRow, TableSpec};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Data file magic number ("TBLZ")
pub const DATA_FILE_MAGIC: u32 = 0x5442_4C5A;

/// Data file version
pub const DATA_FILE_VERSION: u32 = 1;

/// Data file header size
pub const DATA_FILE_HEADER_SIZE: usize = 28;

/// Fixed header at the start of every data file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFileHeader {
    pub magic: u32,
    pub version: u32,
    pub row_count: u64,
    pub payload_len: u64,
    pub checksum: u32,
}

impl DataFileHeader {
    pub fn new(row_count: u64, payload: &[u8]) -> Self {
        Self {
            magic: DATA_FILE_MAGIC,
            version: DATA_FILE_VERSION,
            row_count,
            payload_len: payload.len() as u64,
            checksum: crc32fast::hash(payload),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == DATA_FILE_MAGIC
    }

    #[inline]
    pub fn verify_checksum(&self, payload: &[u8]) -> bool {
        crc32fast::hash(payload) == self.checksum
    }

    pub fn to_bytes(&self) -> [u8; DATA_FILE_HEADER_SIZE] {
        let mut buf = [0u8; DATA_FILE_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.row_count.to_le_bytes());
        buf[16..24].copy_from_slice(&self.payload_len.to_le_bytes());
        buf[24..28].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; DATA_FILE_HEADER_SIZE]) -> Self {
        let u32_at = |i: usize| u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
        let u64_at = |i: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&buf[i..i + 8]);
            u64::from_le_bytes(b)
        };
        Self {
            magic: u32_at(0),
            version: u32_at(4),
            row_count: u64_at(8),
            payload_len: u64_at(16),
            checksum: u32_at(24),
        }
    }
}

#[derive(Serialize)]
struct StoredTableRef<'a> {
    spec: &'a TableSpec,
    rows: &'a [DataRow],
}

#[derive(Deserialize)]
struct StoredTable {
    spec: TableSpec,
    rows: Vec<DataRow>,
}

fn io_error(path: &Path) -> impl Fn(std::io::Error) -> BufferError + '_ {
    move |source| BufferError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `spec` and `rows` to a data file at `path`
pub fn write_data_file(path: &Path, spec: &TableSpec, rows: &[DataRow]) -> BufferResult<()> {
    let payload = bincode::serialize(&StoredTableRef { spec, rows })?;
    let header = DataFileHeader::new(rows.len() as u64, &payload);

    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&header.to_bytes()).map_err(io_error(path))?;
    writer.write_all(&payload).map_err(io_error(path))?;
    writer.flush().map_err(io_error(path))?;
    Ok(())
}

fn read_header_from(reader: &mut impl Read, path: &Path) -> BufferResult<DataFileHeader> {
    let mut buf = [0u8; DATA_FILE_HEADER_SIZE];
    reader.read_exact(&mut buf).map_err(io_error(path))?;
    let header = DataFileHeader::from_bytes(&buf);
    if !header.is_valid() {
        return Err(BufferError::BadMagic(path.to_path_buf()));
    }
    if header.version != DATA_FILE_VERSION {
        return Err(BufferError::UnsupportedVersion {
            path: path.to_path_buf(),
            version: header.version,
        });
    }
    Ok(header)
}

/// Read only the header of a data file
pub fn read_header(path: &Path) -> BufferResult<DataFileHeader> {
    let file = File::open(path).map_err(io_error(path))?;
    read_header_from(&mut BufReader::new(file), path)
}

/// Read spec and rows of a data file
pub fn read_data_file(path: &Path, verify: bool) -> BufferResult<(TableSpec, Vec<DataRow>)> {
    let file = File::open(path).map_err(io_error(path))?;
    let file_len = file.metadata().map_err(io_error(path))?.len();
    let mut reader = BufReader::new(file);
    let header = read_header_from(&mut reader, path)?;

    let stored_len = file_len.saturating_sub(DATA_FILE_HEADER_SIZE as u64);
    if header.payload_len != stored_len {
        return Err(BufferError::Codec(format!(
            "header announces {} payload bytes, {} holds {}",
            header.payload_len,
            path.display(),
            stored_len
        )));
    }

    let mut payload = Vec::with_capacity(stored_len as usize);
    reader
        .take(header.payload_len)
        .read_to_end(&mut payload)
        .map_err(io_error(path))?;
    if payload.len() as u64 != header.payload_len {
        return Err(BufferError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "payload truncated: {} of {} bytes",
                    payload.len(),
                    header.payload_len
                ),
            ),
        });
    }
    if verify && !header.verify_checksum(&payload) {
        return Err(BufferError::ChecksumMismatch(path.to_path_buf()));
    }

    let stored: StoredTable = bincode::deserialize(&payload)?;
    if stored.rows.len() as u64 != header.row_count {
        return Err(BufferError::Codec(format!(
            "header announces {} rows, payload holds {}",
            header.row_count,
            stored.rows.len()
        )));
    }
    Ok((stored.spec, stored.rows))
}
