//! The pull-based tuple iterator interface shared by the heap-file scan and
//! the query operators built on top of it.

use crate::error::DbError;
use crate::tuple::{Tuple, TupleDesc};

/// A restartable tuple stream.
///
/// `open` must be called before the stream yields anything; `next` on an
/// exhausted or unopened stream fails with `NoSuchElement`. Iterators are
/// driven by a single thread.
pub trait DbIterator {
    fn open(&mut self) -> Result<(), DbError>;
    fn close(&mut self);
    fn has_next(&mut self) -> Result<bool, DbError>;
    fn next(&mut self) -> Result<Tuple, DbError>;
    /// Restarts the stream from the beginning.
    fn rewind(&mut self) -> Result<(), DbError>;
    /// The descriptor of the tuples this iterator yields.
    fn tuple_desc(&self) -> TupleDesc;
}

/// A `DbIterator` over an in-memory list of tuples.
pub struct TupleIterator {
    desc: TupleDesc,
    tuples: Vec<Tuple>,
    pos: usize,
    opened: bool,
}

impl TupleIterator {
    pub fn new(desc: TupleDesc, tuples: Vec<Tuple>) -> TupleIterator {
        TupleIterator {
            desc,
            tuples,
            pos: 0,
            opened: false,
        }
    }
}

impl DbIterator for TupleIterator {
    fn open(&mut self) -> Result<(), DbError> {
        self.opened = true;
        self.pos = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
        self.pos = 0;
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        Ok(self.opened && self.pos < self.tuples.len())
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        if !self.opened || self.pos >= self.tuples.len() {
            return Err(DbError::NoSuchElement);
        }
        let tuple = self.tuples[self.pos].clone();
        self.pos += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> Result<(), DbError> {
        self.pos = 0;
        Ok(())
    }

    fn tuple_desc(&self) -> TupleDesc {
        self.desc.clone()
    }
}
