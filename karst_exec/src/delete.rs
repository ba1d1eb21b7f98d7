//! The delete operator.

use shale::buffer_pool::BufferPool;
use shale::error::DbError;
use shale::iterator::DbIterator;
use shale::transaction::TransactionId;
use shale::tuple::{Field, FieldType, TdItem, Tuple, TupleDesc};

/// Reads tuples from its child and removes them from the table they belong
/// to, resolved through each tuple's record id. Yields exactly one
/// single-field tuple holding the number of deleted records.
pub struct Delete<'p, C: DbIterator> {
    pool: &'p BufferPool,
    tid: TransactionId,
    child: C,
    desc: TupleDesc,
    done: bool,
}

impl<'p, C: DbIterator> Delete<'p, C> {
    pub fn new(pool: &'p BufferPool, tid: TransactionId, child: C) -> Delete<'p, C> {
        Delete {
            pool,
            tid,
            child,
            desc: TupleDesc::new(vec![TdItem::new(FieldType::Int, "deletedCount")]),
            done: false,
        }
    }
}

impl<C: DbIterator> DbIterator for Delete<'_, C> {
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
            let tuple = self.child.next()?;
            self.pool.delete_tuple(self.tid, &tuple)?;
            count += 1;
        }
        crate::karst_debug_log!("[Delete::next] {} deleted {count} tuples", self.tid);
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
