#![allow(dead_code)]

use std::sync::Arc;

use shale::buffer_pool::BufferPool;
use shale::catalog::Catalog;
use shale::heap_file::HeapFile;
use shale::iterator::DbIterator;
use shale::transaction::TransactionId;
use shale::tuple::{Field, FieldType, TdItem, Tuple, TupleDesc};
use shale::TableId;
use tempfile::TempDir;

/// A scratch database: one single-column int table behind a pool, torn down
/// with the temp directory.
pub struct TestDb {
    pub pool: Arc<BufferPool>,
    pub catalog: Arc<Catalog>,
    pub file: Arc<HeapFile>,
    pub table_id: TableId,
    _dir: TempDir,
}

pub fn int_desc() -> TupleDesc {
    TupleDesc::new(vec![TdItem::new(FieldType::Int, "value")])
}

pub fn int_tuple(value: i32) -> Tuple {
    let mut tuple = Tuple::new(int_desc());
    tuple.set_field(0, Field::Int(value));
    tuple
}

pub fn setup(test_name: &str, capacity: usize) -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(Catalog::new());
    let file = Arc::new(
        HeapFile::open(dir.path().join(format!("{test_name}.dat")), int_desc()).unwrap(),
    );
    let table_id = catalog.add_table(Arc::clone(&file), test_name);
    let pool = Arc::new(BufferPool::new(capacity, Arc::clone(&catalog)));
    TestDb {
        pool,
        catalog,
        file,
        table_id,
        _dir: dir,
    }
}

/// Inserts the values under one transaction and commits it.
pub fn insert_committed(db: &TestDb, values: impl IntoIterator<Item = i32>) {
    let tid = TransactionId::new();
    for value in values {
        let mut tuple = int_tuple(value);
        db.pool.insert_tuple(tid, db.table_id, &mut tuple).unwrap();
    }
    db.pool.transaction_complete(tid, true).unwrap();
}

/// Scans the whole table under `tid`, returning the int values in iteration
/// order. Leaves the transaction open.
pub fn scan_values(db: &TestDb, tid: TransactionId) -> Vec<i32> {
    let mut it = db.file.iter(&db.pool, tid);
    it.open().unwrap();
    let mut values = Vec::new();
    while it.has_next().unwrap() {
        match it.next().unwrap().field(0) {
            Field::Int(v) => values.push(*v),
            other => panic!("unexpected field {other:?}"),
        }
    }
    values
}

/// Scans under `tid` until a tuple with the given value is found.
pub fn find_tuple(db: &TestDb, tid: TransactionId, value: i32) -> Option<Tuple> {
    let mut it = db.file.iter(&db.pool, tid);
    it.open().unwrap();
    while it.has_next().unwrap() {
        let tuple = it.next().unwrap();
        if tuple.field(0) == &Field::Int(value) {
            return Some(tuple);
        }
    }
    None
}
