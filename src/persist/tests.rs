// Persistence engine tests

use super::*;
use crate::buffer::codec;
use crate::progress::{CancelFlagMonitor, NullMonitor};
use crate::table::{
    ColumnSource, ConcatenateTable, ContainerBuilder, DuplicateKeyPolicy, ExtensionTable,
    JoinedTable, RearrangeColumnsTable, RowSliceTable, TableError, TableSpecReplacerTable,
    VoidTable, WrappedTable, generate_id,
};
use crate::types::{ColumnSpec, DataCell, DataRow, DataType, NodeId, RowKey};
use tempfile::TempDir;

fn three_by_two() -> TableHandle {
    TableHandle::new(
        ContainerBuilder::new()
            .column("id", DataType::Int)
            .column("name", DataType::String)
            .row("Row0", vec![DataCell::Int(1), DataCell::String("a".into())])
            .row("Row1", vec![DataCell::Int(2), DataCell::Missing])
            .row("Row2", vec![DataCell::Int(3), DataCell::String("c".into())])
            .build()
            .unwrap(),
    )
}

fn rows(handle: &TableHandle) -> Vec<DataRow> {
    handle.iterator().unwrap().collect()
}

fn engine(policy: ReferencePolicy) -> PersistenceEngine {
    let config = TableStoreConfig {
        reference_policy: policy,
        ..TableStoreConfig::default()
    };
    PersistenceEngine::new(config, Arc::new(ExtensionRegistry::with_builtins()))
}

fn save(engine: &PersistenceEngine, handle: &TableHandle, dir: &Path) {
    let mut saved = HashSet::new();
    engine.save(handle, dir, &mut saved, &NullMonitor).unwrap();
}

/// Save into a temp dir and load back into a fresh repository
fn round_trip(handle: &TableHandle) -> (TempDir, TableRepository, TableHandle) {
    let temp_dir = TempDir::new().unwrap();
    let engine = PersistenceEngine::default();
    save(&engine, handle, temp_dir.path());

    let repository = TableRepository::new();
    let loaded = engine
        .load(temp_dir.path(), None, &NullMonitor, &repository)
        .unwrap();
    (temp_dir, repository, loaded)
}

fn assert_same_content(expected: &TableHandle, loaded: &TableHandle) {
    assert_eq!(loaded.id(), expected.id());
    assert_eq!(loaded.kind(), expected.kind());
    assert_eq!(loaded.spec(), expected.spec());
    assert_eq!(loaded.size(), expected.size());
    assert_eq!(rows(loaded), rows(expected));
}

fn count_data_files(dir: &Path) -> usize {
    let mut count = 0;
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            count += count_data_files(&path);
        } else if path.file_name().unwrap() == TABLE_DATA_FILE {
            count += 1;
        }
    }
    count
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_container_round_trip() {
    let expected = three_by_two();
    let (temp_dir, repository, loaded) = round_trip(&expected);

    assert!(temp_dir.path().join(TABLE_DESCRIPTION_FILE).is_file());
    assert!(temp_dir.path().join(TABLE_SPEC_FILE).is_file());
    assert!(temp_dir.path().join(TABLE_DATA_FILE).is_file());
    assert_eq!(loaded.size(), 3);
    assert_same_content(&expected, &loaded);
    assert!(repository.get(expected.id()).unwrap().same_table(&loaded));

    let keys: Vec<RowKey> = rows(&loaded).into_iter().map(|r| r.key).collect();
    assert_eq!(
        keys,
        vec![RowKey::new("Row0"), RowKey::new("Row1"), RowKey::new("Row2")]
    );
}

#[test]
fn test_container_opens_lazily() {
    let expected = three_by_two();
    let (_temp_dir, _repository, loaded) = round_trip(&expected);
    let TableVariant::Container(container) = loaded.delegate() else {
        panic!("expected a container");
    };
    assert!(!container.buffer().is_open());
    loaded.ensure_open().unwrap();
    assert!(container.buffer().is_open());
}

#[test]
fn test_rearrange_round_trip() {
    let base = three_by_two();
    let append_spec = TableSpec::new(vec![ColumnSpec::new("score", DataType::Double)]);
    let cells = (0..3).map(|i| vec![DataCell::Double(i as f64)]).collect();
    let expected = TableHandle::new(
        RearrangeColumnsTable::create(
            base,
            &[ColumnSource::Appended(0), ColumnSource::Reference(1)],
            Some((append_spec, cells)),
        )
        .unwrap(),
    );
    let (temp_dir, repository, loaded) = round_trip(&expected);
    assert!(temp_dir.path().join("r0").join(TABLE_DATA_FILE).is_file());
    assert!(temp_dir.path().join(TABLE_DATA_FILE).is_file());
    assert_eq!(repository.len(), 2);
    assert_same_content(&expected, &loaded);
}

#[test]
fn test_resave_into_load_directory() {
    let expected = three_by_two();
    let (temp_dir, _repository, loaded) = round_trip(&expected);
    let TableVariant::Container(container) = loaded.delegate() else {
        panic!("expected a container");
    };
    assert!(!container.buffer().is_open());

    save(&PersistenceEngine::default(), &loaded, temp_dir.path());
    assert!(temp_dir.path().join(TABLE_DATA_FILE).is_file());
    assert!(!temp_dir.path().join(STAGED_DATA_FILE).exists());

    let reloaded = PersistenceEngine::default()
        .load(temp_dir.path(), None, &NullMonitor, &TableRepository::new())
        .unwrap();
    assert_same_content(&expected, &reloaded);
}

#[test]
fn test_resave_rearrange_into_load_directory() {
    let append_spec = TableSpec::new(vec![ColumnSpec::new("score", DataType::Double)]);
    let cells = (0..3).map(|i| vec![DataCell::Double(i as f64)]).collect();
    let expected = TableHandle::new(
        RearrangeColumnsTable::create(
            three_by_two(),
            &[ColumnSource::Reference(0), ColumnSource::Appended(0)],
            Some((append_spec, cells)),
        )
        .unwrap(),
    );
    let (temp_dir, _repository, loaded) = round_trip(&expected);

    save(&PersistenceEngine::default(), &loaded, temp_dir.path());
    assert_eq!(count_data_files(temp_dir.path()), 2);

    let reloaded = PersistenceEngine::default()
        .load(temp_dir.path(), None, &NullMonitor, &TableRepository::new())
        .unwrap();
    assert_same_content(&expected, &reloaded);
}

#[test]
fn test_resave_drops_stale_data_file() {
    let temp_dir = TempDir::new().unwrap();
    save(&PersistenceEngine::default(), &three_by_two(), temp_dir.path());
    let void = TableHandle::new(VoidTable::new(three_by_two().spec().clone()));
    save(&PersistenceEngine::default(), &void, temp_dir.path());
    assert!(!temp_dir.path().join(TABLE_DATA_FILE).exists());

    let loaded = PersistenceEngine::default()
        .load(temp_dir.path(), None, &NullMonitor, &TableRepository::new())
        .unwrap();
    assert_eq!(loaded.kind(), TableKind::Void);
}

#[test]
fn test_column_filter_round_trip() {
    let expected = TableHandle::new(
        RearrangeColumnsTable::create(three_by_two(), &[ColumnSource::Reference(1)], None)
            .unwrap(),
    );
    let (temp_dir, _repository, loaded) = round_trip(&expected);
    assert!(!temp_dir.path().join(TABLE_DATA_FILE).exists());
    assert_same_content(&expected, &loaded);
}

#[test]
fn test_single_reference_kinds_round_trip() {
    let renamed_spec = TableSpec::new(vec![
        ColumnSpec::new("key", DataType::Int),
        ColumnSpec::new("label", DataType::String),
    ]);
    let replaced = TableHandle::new(
        TableSpecReplacerTable::create(three_by_two(), renamed_spec).unwrap(),
    );
    let (_d1, _r1, loaded) = round_trip(&replaced);
    assert_same_content(&replaced, &loaded);

    let wrapped = TableHandle::new(WrappedTable::new(three_by_two()));
    let (_d2, _r2, loaded) = round_trip(&wrapped);
    assert_same_content(&wrapped, &loaded);
}

#[test]
fn test_concatenate_round_trip() {
    let expected = TableHandle::new(
        ConcatenateTable::create(
            vec![three_by_two(), three_by_two()],
            DuplicateKeyPolicy::AppendSuffix("_dup".to_string()),
        )
        .unwrap(),
    );
    let (temp_dir, _repository, loaded) = round_trip(&expected);
    assert_eq!(loaded.size(), 6);
    assert_eq!(count_data_files(temp_dir.path()), 2);
    assert_same_content(&expected, &loaded);
    assert_eq!(rows(&loaded)[3].key, RowKey::new("Row0_dup"));
}

#[test]
fn test_joined_round_trip() {
    let right = TableHandle::new(
        ContainerBuilder::new()
            .column("flag", DataType::Boolean)
            .row("Row0", vec![DataCell::Boolean(true)])
            .row("Row1", vec![DataCell::Boolean(false)])
            .row("Row2", vec![DataCell::Missing])
            .build()
            .unwrap(),
    );
    let expected = TableHandle::new(JoinedTable::create(three_by_two(), right).unwrap());
    let (_temp_dir, _repository, loaded) = round_trip(&expected);
    assert_eq!(loaded.spec().num_columns(), 3);
    assert_same_content(&expected, &loaded);
}

#[test]
fn test_void_round_trip() {
    let expected = TableHandle::new(VoidTable::new(three_by_two().spec().clone()));
    let (temp_dir, _repository, loaded) = round_trip(&expected);
    assert!(!temp_dir.path().join(TABLE_DATA_FILE).exists());
    assert_eq!(loaded.size(), 0);
    assert_same_content(&expected, &loaded);
}

#[test]
fn test_extension_round_trip() {
    let expected = TableHandle::new(ExtensionTable::new(Box::new(RowSliceTable::new(
        three_by_two(),
        1,
        3,
    ))));
    let (_temp_dir, _repository, loaded) = round_trip(&expected);
    assert_eq!(loaded.size(), 2);
    assert_same_content(&expected, &loaded);
}

// ============================================================================
// Reference sharing and identity
// ============================================================================

#[test]
fn test_diamond_written_once() {
    let shared = three_by_two();
    let left = TableHandle::new(WrappedTable::new(shared.clone()));
    let right = TableHandle::new(
        TableSpecReplacerTable::create(
            shared.clone(),
            TableSpec::new(vec![
                ColumnSpec::new("id2", DataType::Int),
                ColumnSpec::new("name2", DataType::String),
            ]),
        )
        .unwrap(),
    );
    let top = TableHandle::new(JoinedTable::create(left, right).unwrap());
    top.set_owner_recursively(NodeId(1));

    let (temp_dir, repository, loaded) = round_trip(&top);
    assert_eq!(count_data_files(temp_dir.path()), 1);
    assert_eq!(repository.len(), 4);

    let refs = loaded.referenced_handles();
    let via_left = &refs[0].referenced_handles()[0];
    let via_right = &refs[1].referenced_handles()[0];
    assert!(via_left.same_table(via_right));
    assert_eq!(via_left.id(), shared.id());
    assert_same_content(&top, &loaded);
}

#[test]
fn test_same_table_saved_twice_in_one_pass() {
    let temp_dir = TempDir::new().unwrap();
    let engine = PersistenceEngine::default();
    let table = three_by_two();
    let mut saved = HashSet::new();
    let first_dir = temp_dir.path().join("port_0");
    let second_dir = temp_dir.path().join("port_1");
    engine.save(&table, &first_dir, &mut saved, &NullMonitor).unwrap();
    engine.save(&table, &second_dir, &mut saved, &NullMonitor).unwrap();

    let meta = NodeSettings::load_from_file(&second_dir.join(TABLE_DESCRIPTION_FILE)).unwrap();
    assert_eq!(
        meta.get_string(CFG_TABLE_TYPE).unwrap().as_deref(),
        Some(TABLE_TYPE_REFERENCE_IN_SAME_NODE)
    );
    assert!(!second_dir.join(TABLE_DATA_FILE).exists());

    let repository = TableRepository::new();
    let unresolved = engine.load(&second_dir, None, &NullMonitor, &repository);
    assert!(matches!(unresolved, Err(PersistError::UnresolvedReference(id)) if id == table.id()));

    let first = engine
        .load(&first_dir, None, &NullMonitor, &repository)
        .unwrap();
    let second = engine
        .load(&second_dir, None, &NullMonitor, &repository)
        .unwrap();
    assert!(first.same_table(&second));
}

#[test]
fn test_existing_id_resolves_to_live_entry() {
    let expected = three_by_two();
    let (temp_dir, repository, loaded) = round_trip(&expected);
    let again = PersistenceEngine::default()
        .load(temp_dir.path(), None, &NullMonitor, &repository)
        .unwrap();
    assert!(again.same_table(&loaded));
    assert_eq!(repository.len(), 1);
}

#[test]
fn test_load_raises_id_floor() {
    let temp_dir = TempDir::new().unwrap();
    let big_id: TableId = 1 << 40;
    let table = TableHandle::with_id(VoidTable::new(TableSpec::default()), big_id);
    save(&PersistenceEngine::default(), &table, temp_dir.path());

    let repository = TableRepository::new();
    PersistenceEngine::default()
        .load(temp_dir.path(), None, &NullMonitor, &repository)
        .unwrap();
    assert!(generate_id() > big_id);
}

// ============================================================================
// Reference policy
// ============================================================================

fn upstream_and_downstream() -> (TableHandle, TableHandle) {
    let upstream = three_by_two();
    upstream.set_owner_recursively(NodeId(1));
    let downstream = TableHandle::new(WrappedTable::new(upstream.clone()));
    downstream.set_owner_recursively(NodeId(2));
    (upstream, downstream)
}

#[test]
fn test_owned_only_skips_foreign_reference() {
    let (upstream, downstream) = upstream_and_downstream();
    let temp_dir = TempDir::new().unwrap();
    let upstream_dir = temp_dir.path().join("node_1");
    let downstream_dir = temp_dir.path().join("node_2");
    let engine = engine(ReferencePolicy::OwnedOnly);
    save(&engine, &upstream, &upstream_dir);
    save(&engine, &downstream, &downstream_dir);
    assert!(!downstream_dir.join("r0").exists());

    let alone = TableRepository::new();
    let err = engine
        .load(&downstream_dir, None, &NullMonitor, &alone)
        .unwrap_err();
    assert!(matches!(err, PersistError::UnresolvedReference(id) if id == upstream.id()));

    let repository = TableRepository::new();
    let loaded_upstream = engine
        .load(&upstream_dir, None, &NullMonitor, &repository)
        .unwrap();
    let loaded = engine
        .load(&downstream_dir, None, &NullMonitor, &repository)
        .unwrap();
    assert!(loaded.referenced_handles()[0].same_table(&loaded_upstream));
    assert_eq!(rows(&loaded), rows(&downstream));
}

#[test]
fn test_self_contained_writes_foreign_reference() {
    let (_upstream, downstream) = upstream_and_downstream();
    let temp_dir = TempDir::new().unwrap();
    let engine = engine(ReferencePolicy::SelfContained);
    save(&engine, &downstream, temp_dir.path());
    assert!(temp_dir.path().join("r0").join(TABLE_DATA_FILE).is_file());

    let repository = TableRepository::new();
    let loaded = engine
        .load(temp_dir.path(), None, &NullMonitor, &repository)
        .unwrap();
    assert_same_content(&downstream, &loaded);
}

// ============================================================================
// Legacy format
// ============================================================================

fn legacy_meta(id: i64, tag: &str, file: Option<&str>) -> NodeSettings {
    let mut meta = NodeSettings::new(CFG_TABLE_META);
    meta.add_int(CFG_TABLE_ID, id);
    meta.add_string(CFG_TABLE_TYPE, Some(tag));
    meta.add_string(CFG_TABLE_FILE_NAME, file);
    meta
}

#[test]
fn test_legacy_container() {
    let temp_dir = TempDir::new().unwrap();
    let table = three_by_two();
    let all_rows = rows(&table);
    codec::write_data_file(
        &temp_dir.path().join(TABLE_DATA_FILE),
        table.spec(),
        &all_rows,
    )
    .unwrap();
    let mut port = NodeSettings::new("port_0");
    port.add_node_settings(legacy_meta(1 << 41, "container_table", Some(TABLE_DATA_FILE)));

    let repository = TableRepository::new();
    let loaded = PersistenceEngine::default()
        .load(temp_dir.path(), Some(&port), &NullMonitor, &repository)
        .unwrap();
    assert_eq!(loaded.id(), 1 << 41);
    assert_eq!(loaded.spec(), table.spec());
    assert_eq!(rows(&loaded), all_rows);
    assert!(generate_id() > 1 << 41);
}

#[test]
fn test_legacy_spec_replacer_with_single_reference() {
    let temp_dir = TempDir::new().unwrap();
    let base = three_by_two();
    let base_rows = rows(&base);
    let renamed = TableSpec::new(vec![
        ColumnSpec::new("key", DataType::Int),
        ColumnSpec::new("label", DataType::String),
    ]);
    let child_dir = temp_dir.path().join("reference");
    fs::create_dir_all(&child_dir).unwrap();
    codec::write_data_file(&child_dir.join(TABLE_DATA_FILE), base.spec(), &base_rows).unwrap();
    codec::write_data_file(&temp_dir.path().join(TABLE_DATA_FILE), &renamed, &[]).unwrap();

    let child_id = generate_id() as i64 + 1000;
    let mut meta = legacy_meta(child_id + 1, "new_spec_table", Some(TABLE_DATA_FILE));
    meta.add_string(CFG_TABLE_REFERENCE_LEGACY, Some("reference"));
    meta.add_int("table_reference_ID", child_id);
    meta.add_node_settings(legacy_meta(child_id, "container_table", Some(TABLE_DATA_FILE)));
    let mut port = NodeSettings::new("port_0");
    port.add_node_settings(meta);

    let repository = TableRepository::new();
    let loaded = PersistenceEngine::default()
        .load(temp_dir.path(), Some(&port), &NullMonitor, &repository)
        .unwrap();
    assert_eq!(loaded.kind(), TableKind::TableSpecReplacer);
    assert_eq!(loaded.spec(), &renamed);
    assert_eq!(rows(&loaded), base_rows);
    assert_eq!(repository.len(), 2);
}

/// Legacy rearrange over a container in `reference/`, appending `append`
fn legacy_rearrange(
    dir: &Path,
    base: &TableHandle,
    append: &TableSpec,
    flags: &[bool],
) -> NodeSettings {
    let child_dir = dir.join("reference");
    fs::create_dir_all(&child_dir).unwrap();
    codec::write_data_file(&child_dir.join(TABLE_DATA_FILE), base.spec(), &rows(base)).unwrap();
    let append_rows: Vec<DataRow> = (0..base.size())
        .map(|i| {
            let cells = (0..append.num_columns())
                .map(|_| DataCell::Double(i as f64))
                .collect();
            DataRow::new(RowKey::new(""), cells)
        })
        .collect();
    codec::write_data_file(&dir.join(TABLE_DATA_FILE), append, &append_rows).unwrap();

    let child_id = generate_id() as i64 + 1000;
    let mut internal = NodeSettings::new("meta_internal");
    internal.add_int("table_reference_ID", child_id);
    internal.add_int_array("table_internal_map", &[0, 1]);
    internal.add_bool_array("table_internal_flags", flags);

    let mut meta = legacy_meta(child_id + 1, "rearrange_columns_table", Some(TABLE_DATA_FILE));
    meta.add_string(CFG_TABLE_REFERENCE_LEGACY, Some("reference"));
    meta.add_node_settings(internal);
    meta.add_node_settings(legacy_meta(child_id, "container_table", Some(TABLE_DATA_FILE)));
    let mut port = NodeSettings::new("port_0");
    port.add_node_settings(meta);
    port
}

#[test]
fn test_legacy_rearrange_reads_append_spec_from_data_file() {
    let temp_dir = TempDir::new().unwrap();
    let base = three_by_two();
    let append = TableSpec::new(vec![ColumnSpec::new("score", DataType::Double)]);
    let port = legacy_rearrange(temp_dir.path(), &base, &append, &[false, true]);

    let repository = TableRepository::new();
    let loaded = PersistenceEngine::default()
        .load(temp_dir.path(), Some(&port), &NullMonitor, &repository)
        .unwrap();
    assert_eq!(loaded.kind(), TableKind::RearrangeColumns);
    assert_eq!(
        loaded.spec(),
        &TableSpec::new(vec![
            ColumnSpec::new("score", DataType::Double),
            ColumnSpec::new("name", DataType::String),
        ])
    );
    assert_eq!(repository.len(), 2);

    let loaded_rows = rows(&loaded);
    let base_rows = rows(&base);
    assert_eq!(loaded_rows.len(), 3);
    for (i, (row, base_row)) in loaded_rows.iter().zip(&base_rows).enumerate() {
        assert_eq!(row.key, base_row.key);
        assert_eq!(
            row.cells,
            vec![DataCell::Double(i as f64), base_row.cells[1].clone()]
        );
    }
}

#[test]
fn test_legacy_rearrange_column_count_mismatch() {
    let temp_dir = TempDir::new().unwrap();
    let append = TableSpec::new(vec![
        ColumnSpec::new("score", DataType::Double),
        ColumnSpec::new("weight", DataType::Double),
    ]);
    let port = legacy_rearrange(temp_dir.path(), &three_by_two(), &append, &[false, true]);

    let err = PersistenceEngine::default()
        .load(temp_dir.path(), Some(&port), &NullMonitor, &TableRepository::new())
        .unwrap_err();
    assert!(matches!(err, PersistError::Corrupted(ref msg) if msg.contains("Inconsistency")));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_cancel_is_not_an_error_of_the_data() {
    let temp_dir = TempDir::new().unwrap();
    let monitor = CancelFlagMonitor::new();
    monitor.cancel();
    let mut saved = HashSet::new();
    let err = PersistenceEngine::default()
        .save(&three_by_two(), temp_dir.path(), &mut saved, &monitor)
        .unwrap_err();
    assert!(err.is_canceled());
    assert!(matches!(err, PersistError::Canceled(_)));

    let err = PersistenceEngine::default()
        .load(temp_dir.path(), None, &monitor, &TableRepository::new())
        .unwrap_err();
    assert!(err.is_canceled());
}

#[test]
fn test_save_reports_progress() {
    let temp_dir = TempDir::new().unwrap();
    let monitor = CancelFlagMonitor::new();
    let table = TableHandle::new(WrappedTable::new(three_by_two()));
    let mut saved = HashSet::new();
    PersistenceEngine::default()
        .save(&table, temp_dir.path(), &mut saved, &monitor)
        .unwrap();
    let (fraction, message) = monitor.last_progress().unwrap();
    assert_eq!(fraction, 1.0);
    assert_eq!(message, format!("Saved table {}", table.id()));
    assert_eq!(saved.len(), 2);
}

#[test]
fn test_missing_description_without_settings() {
    let temp_dir = TempDir::new().unwrap();
    let err = PersistenceEngine::default()
        .load(temp_dir.path(), None, &NullMonitor, &TableRepository::new())
        .unwrap_err();
    assert!(matches!(err, PersistError::Io { .. }));
}

fn rewrite_meta(dir: &Path, edit: impl FnOnce(&mut NodeSettings)) {
    let path = dir.join(TABLE_DESCRIPTION_FILE);
    let mut meta = NodeSettings::load_from_file(&path).unwrap();
    edit(&mut meta);
    meta.save_to_file(&path).unwrap();
}

#[test]
fn test_unknown_table_type() {
    let temp_dir = TempDir::new().unwrap();
    save(&PersistenceEngine::default(), &three_by_two(), temp_dir.path());
    rewrite_meta(temp_dir.path(), |meta| {
        meta.add_string(CFG_TABLE_TYPE, Some("hologram_table"))
    });

    let err = PersistenceEngine::default()
        .load(temp_dir.path(), None, &NullMonitor, &TableRepository::new())
        .unwrap_err();
    assert!(matches!(err, PersistError::UnknownTableType(ref tag) if tag == "hologram_table"));
    assert!(err.is_data_corrupted());
}

#[test]
fn test_negative_id_is_corrupted() {
    let temp_dir = TempDir::new().unwrap();
    save(&PersistenceEngine::default(), &three_by_two(), temp_dir.path());
    rewrite_meta(temp_dir.path(), |meta| meta.add_int(CFG_TABLE_ID, -4));

    let err = PersistenceEngine::default()
        .load(temp_dir.path(), None, &NullMonitor, &TableRepository::new())
        .unwrap_err();
    assert!(matches!(err, PersistError::Corrupted(_)));
}

#[test]
fn test_reference_dir_must_stay_inside() {
    let temp_dir = TempDir::new().unwrap();
    let table = TableHandle::new(WrappedTable::new(three_by_two()));
    save(&PersistenceEngine::default(), &table, temp_dir.path());
    rewrite_meta(temp_dir.path(), |meta| {
        meta.add_string_array(CFG_TABLE_REFERENCES, &["../r0".to_string()])
    });

    let err = PersistenceEngine::default()
        .load(temp_dir.path(), None, &NullMonitor, &TableRepository::new())
        .unwrap_err();
    assert!(matches!(err, PersistError::Corrupted(_)));
}

#[test]
fn test_missing_data_file() {
    let temp_dir = TempDir::new().unwrap();
    save(&PersistenceEngine::default(), &three_by_two(), temp_dir.path());
    fs::remove_file(temp_dir.path().join(TABLE_DATA_FILE)).unwrap();

    let err = PersistenceEngine::default()
        .load(temp_dir.path(), None, &NullMonitor, &TableRepository::new())
        .unwrap_err();
    assert!(matches!(err, PersistError::Io { ref path, .. } if path.ends_with(TABLE_DATA_FILE)));
}

#[test]
fn test_extension_not_installed() {
    let temp_dir = TempDir::new().unwrap();
    let slice = TableHandle::new(ExtensionTable::new(Box::new(RowSliceTable::new(
        three_by_two(),
        0,
        1,
    ))));
    save(&PersistenceEngine::default(), &slice, temp_dir.path());

    let bare = PersistenceEngine::new(
        TableStoreConfig::default(),
        Arc::new(ExtensionRegistry::new()),
    );
    let err = bare
        .load(temp_dir.path(), None, &NullMonitor, &TableRepository::new())
        .unwrap_err();
    assert!(err.is_extension_missing());
    assert!(!err.is_data_corrupted());
    assert!(matches!(err, PersistError::ExtensionNotInstalled(ref name) if name == "row_slice"));
}

#[test]
fn test_corrupted_rows_fail_on_access() {
    let temp_dir = TempDir::new().unwrap();
    save(&PersistenceEngine::default(), &three_by_two(), temp_dir.path());
    let data_file = temp_dir.path().join(TABLE_DATA_FILE);
    let mut bytes = fs::read(&data_file).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&data_file, bytes).unwrap();

    let repository = TableRepository::new();
    let loaded = PersistenceEngine::default()
        .load(temp_dir.path(), None, &NullMonitor, &repository)
        .unwrap();
    assert!(loaded.ensure_open().is_err());
    assert!(loaded.iterator().is_err());

    let fail_safe: Vec<DataRow> = loaded.iterator_fail_safe().collect();
    assert_eq!(fail_safe.len(), 3);
    assert!(fail_safe.iter().all(|r| r.cells.iter().all(DataCell::is_missing)));
}

fn overwrite_payload_len(data_file: &Path, len: u64) {
    let mut bytes = fs::read(data_file).unwrap();
    bytes[16..24].copy_from_slice(&len.to_le_bytes());
    fs::write(data_file, bytes).unwrap();
}

#[test]
fn test_bad_payload_length_fails_on_access() {
    let temp_dir = TempDir::new().unwrap();
    save(&PersistenceEngine::default(), &three_by_two(), temp_dir.path());
    overwrite_payload_len(&temp_dir.path().join(TABLE_DATA_FILE), u64::MAX);

    let loaded = PersistenceEngine::default()
        .load(temp_dir.path(), None, &NullMonitor, &TableRepository::new())
        .unwrap();
    assert!(matches!(loaded.ensure_open(), Err(TableError::Buffer(_))));
    assert_eq!(loaded.iterator_fail_safe().count(), 3);
}

#[test]
fn test_legacy_bad_payload_length_is_load_error() {
    let temp_dir = TempDir::new().unwrap();
    let table = three_by_two();
    let data_file = temp_dir.path().join(TABLE_DATA_FILE);
    codec::write_data_file(&data_file, table.spec(), &rows(&table)).unwrap();
    overwrite_payload_len(&data_file, u64::MAX);
    let mut port = NodeSettings::new("port_0");
    port.add_node_settings(legacy_meta(
        generate_id() as i64,
        "container_table",
        Some(TABLE_DATA_FILE),
    ));

    let err = PersistenceEngine::default()
        .load(temp_dir.path(), Some(&port), &NullMonitor, &TableRepository::new())
        .unwrap_err();
    assert!(err.is_data_corrupted());
}

#[test]
fn test_cleared_table_cannot_be_saved() {
    let temp_dir = TempDir::new().unwrap();
    let table = three_by_two();
    table.set_owner_recursively(NodeId(9));
    table.clear(NodeId(9));
    let mut saved = HashSet::new();
    let err = PersistenceEngine::default()
        .save(&table, temp_dir.path(), &mut saved, &NullMonitor)
        .unwrap_err();
    assert!(matches!(err, PersistError::Table(_)));
}
