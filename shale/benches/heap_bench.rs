use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shale::buffer_pool::BufferPool;
use shale::catalog::Catalog;
use shale::heap_file::HeapFile;
use shale::iterator::DbIterator;
use shale::transaction::TransactionId;
use shale::tuple::{Field, FieldType, TdItem, Tuple, TupleDesc};
use shale::{TableId, DEFAULT_PAGES};
use std::sync::Arc;
use tempfile::TempDir;

fn int_desc() -> TupleDesc {
    TupleDesc::new(vec![TdItem::new(FieldType::Int, "value")])
}

fn setup_test_db(rows: i32) -> (Arc<BufferPool>, Arc<HeapFile>, TableId, TempDir) {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(Catalog::new());
    let file = Arc::new(HeapFile::open(dir.path().join("bench.dat"), int_desc()).unwrap());
    let table_id = catalog.add_table(Arc::clone(&file), "bench");
    let pool = Arc::new(BufferPool::new(DEFAULT_PAGES, catalog));

    let tid = TransactionId::new();
    for value in 0..rows {
        let mut tuple = Tuple::new(int_desc());
        tuple.set_field(0, Field::Int(value));
        pool.insert_tuple(tid, table_id, &mut tuple).unwrap();
    }
    pool.transaction_complete(tid, true).unwrap();

    (pool, file, table_id, dir)
}

fn benchmark_insert(c: &mut Criterion) {
    let (pool, _file, table_id, _dir) = setup_test_db(0);

    c.bench_function("insert_100", |b| {
        b.iter(|| {
            let tid = TransactionId::new();
            for value in 0..100 {
                let mut tuple = Tuple::new(int_desc());
                tuple.set_field(0, Field::Int(black_box(value)));
                pool.insert_tuple(tid, table_id, &mut tuple).unwrap();
            }
            pool.transaction_complete(tid, true).unwrap();
        })
    });
}

fn benchmark_full_scan(c: &mut Criterion) {
    let (pool, file, _table_id, _dir) = setup_test_db(10_000);

    c.bench_function("scan_10k", |b| {
        b.iter(|| {
            let tid = TransactionId::new();
            let mut it = file.iter(&pool, tid);
            it.open().unwrap();
            let mut count = 0usize;
            while it.has_next().unwrap() {
                black_box(it.next().unwrap());
                count += 1;
            }
            pool.transaction_complete(tid, true).unwrap();
            count
        })
    });
}

criterion_group!(benches, benchmark_insert, benchmark_full_scan);
criterion_main!(benches);
