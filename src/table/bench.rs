use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use tablestore::table::{ContainerBuilder, IdAllocator, TableHandle};
use tablestore::types::{DataCell, DataType, NodeId};

// Test configuration
const ID_THREADS: usize = 8;
const IDS_PER_THREAD: usize = 10_000;
const TABLE_ROWS: usize = 10_000;

fn table_with_rows(rows: usize) -> TableHandle {
    let mut builder = ContainerBuilder::new()
        .column("id", DataType::Int)
        .column("name", DataType::String);
    for i in 0..rows {
        builder = builder.row(
            format!("Row{}", i),
            vec![DataCell::Int(i as i64), DataCell::String(format!("n{}", i))],
        );
    }
    TableHandle::new(builder.build().unwrap())
}

// Contended id generation
pub fn bench_id_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("IdAllocator");

    group.bench_function("single_thread", |b| {
        let ids = IdAllocator::new();
        b.iter(|| black_box(ids.generate_id()))
    });

    group.bench_function("contended", |b| {
        b.iter(|| {
            let ids = Arc::new(IdAllocator::new());
            let handles: Vec<_> = (0..ID_THREADS)
                .map(|_| {
                    let ids = ids.clone();
                    thread::spawn(move || {
                        for _ in 0..IDS_PER_THREAD {
                            black_box(ids.generate_id());
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        })
    });

    group.finish();
}

// Plain versus fail-safe iteration over one container
pub fn bench_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("Iteration");
    let table = table_with_rows(TABLE_ROWS);

    group.bench_function("plain", |b| {
        b.iter(|| black_box(table.iterator().unwrap().count()))
    });

    group.bench_function("fail_safe", |b| {
        b.iter(|| black_box(table.iterator_fail_safe().count()))
    });

    group.bench_function("fail_safe_cleared", |b| {
        let cleared = table_with_rows(TABLE_ROWS);
        cleared.set_owner_recursively(NodeId(1));
        cleared.clear(NodeId(1));
        b.iter(|| black_box(cleared.iterator_fail_safe().count()))
    });

    group.finish();
}

criterion_group!(benches, bench_id_generation, bench_iteration);
criterion_main!(benches);
