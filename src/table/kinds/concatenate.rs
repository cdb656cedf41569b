//! Row-wise union of tables sharing one schema

use crate::persist::{LoadContext, PersistError, PersistResult};
use crate::progress::ExecutionMonitor;
use crate::settings::NodeSettings;
use crate::table::{
    CloseableRowIterator, RowCountedTable, RowIterator, TableError, TableHandle, TableResult,
};
use crate::types::{DataRow, RowKey, TableSpec};
use std::collections::{HashSet, VecDeque};
use std::path::Path;

const CFG_REFERENCE_IDS: &str = "table_reference_IDs";
const CFG_ROW_COUNT: &str = "row_count";
const CFG_KEY_POLICY: &str = "duplicate_key_policy";
const CFG_KEY_SUFFIX: &str = "duplicate_key_suffix";

/// How concatenation treats a row key seen in an earlier table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateKeyPolicy {
    /// Construction fails on the first duplicate
    Fail,
    /// Append the suffix until the key is unique
    AppendSuffix(String),
}

impl DuplicateKeyPolicy {
    fn save(&self, settings: &mut NodeSettings) {
        match self {
            DuplicateKeyPolicy::Fail => {
                settings.add_string(CFG_KEY_POLICY, Some("fail"));
                settings.add_string(CFG_KEY_SUFFIX, None);
            }
            DuplicateKeyPolicy::AppendSuffix(suffix) => {
                settings.add_string(CFG_KEY_POLICY, Some("append_suffix"));
                settings.add_string(CFG_KEY_SUFFIX, Some(suffix));
            }
        }
    }

    fn load(settings: &NodeSettings) -> PersistResult<Self> {
        match settings.get_string(CFG_KEY_POLICY)?.as_deref() {
            Some("fail") => Ok(DuplicateKeyPolicy::Fail),
            Some("append_suffix") => match settings.get_string(CFG_KEY_SUFFIX)? {
                Some(suffix) if !suffix.is_empty() => Ok(DuplicateKeyPolicy::AppendSuffix(suffix)),
                _ => Err(PersistError::Corrupted(
                    "append_suffix policy without suffix".to_string(),
                )),
            },
            other => Err(PersistError::Corrupted(format!(
                "unknown duplicate key policy {:?}",
                other
            ))),
        }
    }
}

pub struct ConcatenateTable {
    references: Vec<TableHandle>,
    spec: TableSpec,
    row_count: u64,
    policy: DuplicateKeyPolicy,
}

impl ConcatenateTable {
    /// Concatenate `references` in order
    ///
    /// All references must share the spec of the first one. With
    /// [`DuplicateKeyPolicy::Fail`] every key is scanned up front.
    pub fn create(references: Vec<TableHandle>, policy: DuplicateKeyPolicy) -> TableResult<Self> {
        let first = references.first().ok_or_else(|| {
            TableError::InvalidArgument("concatenation needs at least one table".to_string())
        })?;
        let spec = first.spec().clone();
        if let Some(other) = references.iter().find(|t| t.spec() != &spec) {
            return Err(TableError::InvalidArgument(format!(
                "spec of table {} differs from table {}",
                other.id(),
                first.id()
            )));
        }
        if let DuplicateKeyPolicy::AppendSuffix(suffix) = &policy {
            if suffix.is_empty() {
                return Err(TableError::InvalidArgument(
                    "duplicate key suffix must not be empty".to_string(),
                ));
            }
        }
        if policy == DuplicateKeyPolicy::Fail {
            let mut seen = HashSet::new();
            for table in &references {
                for row in table.iterator()? {
                    if !seen.insert(row.key.clone()) {
                        return Err(TableError::DuplicateRowKey(row.key));
                    }
                }
            }
        }
        let row_count = references.iter().map(|t| t.size()).sum();
        Ok(Self {
            references,
            spec,
            row_count,
            policy,
        })
    }

    pub fn policy(&self) -> &DuplicateKeyPolicy {
        &self.policy
    }

    pub fn load(ctx: &LoadContext<'_>) -> PersistResult<Self> {
        let references = ctx
            .meta
            .get_int_array(CFG_REFERENCE_IDS)?
            .into_iter()
            .map(|id| ctx.reference(id))
            .collect::<PersistResult<Vec<TableHandle>>>()?;
        let first = references
            .first()
            .ok_or_else(|| PersistError::Corrupted("concatenation without tables".to_string()))?;
        let spec = match ctx.spec {
            Some(spec) => spec.clone(),
            None => first.spec().clone(),
        };
        let row_count = ctx.meta.get_int(CFG_ROW_COUNT)?;
        let actual: u64 = references.iter().map(|t| t.size()).sum();
        if row_count < 0 || row_count as u64 != actual {
            return Err(PersistError::Corrupted(format!(
                "concatenation saved with {} rows, references hold {}",
                row_count, actual
            )));
        }
        Ok(Self {
            references,
            spec,
            row_count: actual,
            policy: DuplicateKeyPolicy::load(ctx.meta)?,
        })
    }
}

impl RowCountedTable for ConcatenateTable {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn size(&self) -> u64 {
        self.row_count
    }

    fn iterator(&self) -> TableResult<RowIterator> {
        let iterators = self
            .references
            .iter()
            .map(|t| t.iterator())
            .collect::<TableResult<VecDeque<RowIterator>>>()?;
        let suffix = match &self.policy {
            DuplicateKeyPolicy::AppendSuffix(s) => Some(s.clone()),
            DuplicateKeyPolicy::Fail => None,
        };
        Ok(Box::new(ConcatenateIterator {
            iterators,
            seen: HashSet::new(),
            suffix,
        }))
    }

    fn referenced_handles(&self) -> Vec<TableHandle> {
        self.references.clone()
    }

    fn save_to_file(
        &self,
        _data_file: &Path,
        settings: &mut NodeSettings,
        _monitor: &dyn ExecutionMonitor,
    ) -> PersistResult<()> {
        let ids: Vec<i64> = self.references.iter().map(|t| t.id() as i64).collect();
        settings.add_int_array(CFG_REFERENCE_IDS, &ids);
        settings.add_int(CFG_ROW_COUNT, self.row_count as i64);
        self.policy.save(settings);
        Ok(())
    }

    fn clear(&self) {}

    fn ensure_open(&self) -> TableResult<()> {
        Ok(())
    }
}

struct ConcatenateIterator {
    iterators: VecDeque<RowIterator>,
    seen: HashSet<RowKey>,
    suffix: Option<String>,
}

impl Iterator for ConcatenateIterator {
    type Item = DataRow;

    fn next(&mut self) -> Option<DataRow> {
        loop {
            let current = self.iterators.front_mut()?;
            match current.next() {
                Some(mut row) => {
                    if let Some(suffix) = &self.suffix {
                        while self.seen.contains(&row.key) {
                            row.key.0.push_str(suffix);
                        }
                        self.seen.insert(row.key.clone());
                    }
                    return Some(row);
                }
                None => {
                    if let Some(mut done) = self.iterators.pop_front() {
                        done.close();
                    }
                }
            }
        }
    }
}

impl CloseableRowIterator for ConcatenateIterator {
    fn close(&mut self) {
        for it in self.iterators.iter_mut() {
            it.close();
        }
        self.iterators.clear();
    }
}
