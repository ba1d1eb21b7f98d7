//! The insert operator.

use shale::buffer_pool::BufferPool;
use shale::error::DbError;
use shale::iterator::DbIterator;
use shale::transaction::TransactionId;
use shale::tuple::{Field, FieldType, TdItem, Tuple, TupleDesc};
use shale::TableId;

/// Drains its child into a table through the buffer pool. Yields exactly one
/// single-field tuple holding the number of inserted records, then is
/// exhausted until rewound.
pub struct Insert<'p, C: DbIterator> {
    pool: &'p BufferPool,
    tid: TransactionId,
    table_id: TableId,
    child: C,
    desc: TupleDesc,
    done: bool,
}

impl<'p, C: DbIterator> Insert<'p, C> {
    pub fn new(
        pool: &'p BufferPool,
        tid: TransactionId,
        table_id: TableId,
        child: C,
    ) -> Insert<'p, C> {
        Insert {
            pool,
            tid,
            table_id,
            child,
            desc: TupleDesc::new(vec![TdItem::new(FieldType::Int, "insertedCount")]),
            done: false,
        }
    }
}

impl<C: DbIterator> DbIterator for Insert<'_, C> {
    fn open(&mut self) -> Result<(), DbError> {
        self.done = false;
        self.child.open()
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        Ok(!self.done)
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        if self.done {
            return Err(DbError::NoSuchElement);
        }
        let mut count = 0;
        while self.child.has_next()? {
            let mut tuple = self.child.next()?;
            self.pool.insert_tuple(self.tid, self.table_id, &mut tuple)?;
            count += 1;
        }
        crate::karst_debug_log!("[Insert::next] {} inserted {count} tuples", self.tid);
        self.done = true;
        let mut result = Tuple::new(self.desc.clone());
        result.set_field(0, Field::Int(count));
        Ok(result)
    }

    fn rewind(&mut self) -> Result<(), DbError> {
        self.done = false;
        self.child.rewind()
    }

    fn tuple_desc(&self) -> TupleDesc {
        self.desc.clone()
    }
}
