//! Row iterator contract

use crate::types::DataRow;

/// Forward-only, finite row iterator that can be closed early
///
/// Every `iterator()` call on a table returns a fresh instance positioned
/// at the first row. After `close`, `next` returns `None`.
pub trait CloseableRowIterator: Iterator<Item = DataRow> + Send {
    fn close(&mut self);
}

/// Boxed iterator handed out by tables
pub type RowIterator = Box<dyn CloseableRowIterator>;

/// Iterator over no rows
#[derive(Debug, Default)]
pub struct EmptyRowIterator;

impl Iterator for EmptyRowIterator {
    type Item = DataRow;

    fn next(&mut self) -> Option<DataRow> {
        None
    }
}

impl CloseableRowIterator for EmptyRowIterator {
    fn close(&mut self) {}
}
