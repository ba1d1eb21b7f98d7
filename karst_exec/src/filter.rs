//! The selection operator.

use shale::error::DbError;
use shale::iterator::DbIterator;
use shale::tuple::{Tuple, TupleDesc};

use crate::predicate::Predicate;

/// Yields the child's tuples that satisfy a predicate.
pub struct Filter<C: DbIterator> {
    predicate: Predicate,
    child: C,
    lookahead: Option<Tuple>,
}

impl<C: DbIterator> Filter<C> {
    pub fn new(predicate: Predicate, child: C) -> Filter<C> {
        Filter {
            predicate,
            child,
            lookahead: None,
        }
    }

    fn read_next(&mut self) -> Result<Option<Tuple>, DbError> {
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            if self.predicate.matches(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }
}

impl<C: DbIterator> DbIterator for Filter<C> {
    fn open(&mut self) -> Result<(), DbError> {
        self.lookahead = None;
        self.child.open()
    }

    fn close(&mut self) {
        self.lookahead = None;
        self.child.close();
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        if self.lookahead.is_none() {
            self.lookahead = self.read_next()?;
        }
        Ok(self.lookahead.is_some())
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        if self.lookahead.is_none() {
            self.lookahead = self.read_next()?;
        }
        self.lookahead.take().ok_or(DbError::NoSuchElement)
    }

    fn rewind(&mut self) -> Result<(), DbError> {
        self.lookahead = None;
        self.child.rewind()
    }

    fn tuple_desc(&self) -> TupleDesc {
        self.child.tuple_desc()
    }
}
