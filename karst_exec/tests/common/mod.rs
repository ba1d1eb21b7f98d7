#![allow(dead_code)]

use std::sync::Arc;

use shale::buffer_pool::BufferPool;
use shale::catalog::Catalog;
use shale::heap_file::HeapFile;
use shale::transaction::TransactionId;
use shale::tuple::{Field, FieldType, TdItem, Tuple, TupleDesc};
use shale::{DbIterator, TableId, DEFAULT_PAGES};
use tempfile::TempDir;

/// A scratch database the operator tests run against.
pub struct TestDb {
    pub pool: Arc<BufferPool>,
    pub catalog: Arc<Catalog>,
    _dir: TempDir,
}

pub fn setup() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(Catalog::new());
    let pool = Arc::new(BufferPool::new(DEFAULT_PAGES, Arc::clone(&catalog)));
    TestDb {
        pool,
        catalog,
        _dir: dir,
    }
}

/// An `(id INT, name TEXT(16))` descriptor shared by the test tables.
pub fn people_desc() -> TupleDesc {
    TupleDesc::new(vec![
        TdItem::new(FieldType::Int, "id"),
        TdItem::new(FieldType::Text(16), "name"),
    ])
}

pub fn person(id: i32, name: &str) -> Tuple {
    let mut tuple = Tuple::new(people_desc());
    tuple.set_field(0, Field::Int(id));
    tuple.set_field(1, Field::Text(name.to_string()));
    tuple
}

impl TestDb {
    /// Creates a table and commits the given rows into it.
    pub fn create_table(
        &self,
        name: &str,
        rows: &[(i32, &str)],
    ) -> (TableId, Arc<HeapFile>) {
        let path = self._dir.path().join(format!("{name}.dat"));
        let file = Arc::new(HeapFile::open(path, people_desc()).unwrap());
        let table_id = self.catalog.add_table(Arc::clone(&file), name);

        let tid = TransactionId::new();
        for &(id, row_name) in rows {
            let mut tuple = person(id, row_name);
            self.pool.insert_tuple(tid, table_id, &mut tuple).unwrap();
        }
        self.pool.transaction_complete(tid, true).unwrap();
        (table_id, file)
    }
}

/// Drains an iterator into field rows.
pub fn drain<I: DbIterator>(it: &mut I) -> Vec<Vec<Field>> {
    let mut rows = Vec::new();
    while it.has_next().unwrap() {
        rows.push(it.next().unwrap().fields().to_vec());
    }
    rows
}
