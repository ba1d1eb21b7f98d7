//! The sequential scan access method.

use std::sync::Arc;

use shale::buffer_pool::BufferPool;
use shale::error::DbError;
use shale::heap_file::{HeapFile, HeapFileIterator};
use shale::iterator::DbIterator;
use shale::transaction::TransactionId;
use shale::tuple::{TdItem, Tuple, TupleDesc};

/// Reads each tuple of a table in the order it is laid out on disk.
///
/// The exposed descriptor prefixes every field name with the scan's alias
/// (`alias.field`), which keeps same-named columns apart once two scans meet
/// in a join.
pub struct SeqScan<'p> {
    pool: &'p BufferPool,
    tid: TransactionId,
    file: Arc<HeapFile>,
    alias: String,
    it: Option<HeapFileIterator<'p>>,
}

impl<'p> SeqScan<'p> {
    pub fn new(
        pool: &'p BufferPool,
        tid: TransactionId,
        file: Arc<HeapFile>,
        alias: &str,
    ) -> SeqScan<'p> {
        SeqScan {
            pool,
            tid,
            file,
            alias: alias.to_string(),
            it: None,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl DbIterator for SeqScan<'_> {
    fn open(&mut self) -> Result<(), DbError> {
        crate::karst_debug_log!("[SeqScan::open] table {} as '{}'", self.file.id(), self.alias);
        let mut it = self.file.iter(self.pool, self.tid);
        it.open()?;
        self.it = Some(it);
        Ok(())
    }

    fn close(&mut self) {
        self.it = None;
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        match self.it.as_mut() {
            Some(it) => it.has_next(),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        self.it.as_mut().ok_or(DbError::NoSuchElement)?.next()
    }

    fn rewind(&mut self) -> Result<(), DbError> {
        self.it.as_mut().ok_or(DbError::NoSuchElement)?.rewind()
    }

    fn tuple_desc(&self) -> TupleDesc {
        let items = self
            .file
            .tuple_desc()
            .iter()
            .map(|item| TdItem::new(item.field_type, &format!("{}.{}", self.alias, item.name)))
            .collect();
        TupleDesc::new(items)
    }
}
