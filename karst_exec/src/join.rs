//! The nested-loop join operator.

use shale::error::DbError;
use shale::iterator::DbIterator;
use shale::tuple::{Tuple, TupleDesc};

use crate::predicate::JoinPredicate;

/// Joins two children with a predicate, nested-loop style: for every outer
/// tuple the inner child is scanned in full and then rewound. The output
/// descriptor is the concatenation of the children's descriptors.
pub struct Join<L: DbIterator, R: DbIterator> {
    predicate: JoinPredicate,
    left: L,
    right: R,
    desc: TupleDesc,
    current_left: Option<Tuple>,
    lookahead: Option<Tuple>,
}

impl<L: DbIterator, R: DbIterator> Join<L, R> {
    pub fn new(predicate: JoinPredicate, left: L, right: R) -> Join<L, R> {
        let desc = TupleDesc::merge(&left.tuple_desc(), &right.tuple_desc());
        Join {
            predicate,
            left,
            right,
            desc,
            current_left: None,
            lookahead: None,
        }
    }

    fn combine(&self, left: &Tuple, right: &Tuple) -> Tuple {
        let mut out = Tuple::new(self.desc.clone());
        for (i, field) in left.fields().iter().chain(right.fields().iter()).enumerate() {
            out.set_field(i, field.clone());
        }
        out
    }

    fn read_next(&mut self) -> Result<Option<Tuple>, DbError> {
        loop {
            let left_tuple = match &self.current_left {
                Some(tuple) => tuple.clone(),
                None => {
                    if !self.left.has_next()? {
                        return Ok(None);
                    }
                    let tuple = self.left.next()?;
                    self.current_left = Some(tuple.clone());
                    tuple
                }
            };
            while self.right.has_next()? {
                let right_tuple = self.right.next()?;
                if self.predicate.matches(&left_tuple, &right_tuple) {
                    return Ok(Some(self.combine(&left_tuple, &right_tuple)));
                }
            }
            self.right.rewind()?;
            self.current_left = None;
        }
    }
}

impl<L: DbIterator, R: DbIterator> DbIterator for Join<L, R> {
    fn open(&mut self) -> Result<(), DbError> {
        self.current_left = None;
        self.lookahead = None;
        self.left.open()?;
        self.right.open()
    }

    fn close(&mut self) {
        self.current_left = None;
        self.lookahead = None;
        self.left.close();
        self.right.close();
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
        self.current_left = None;
        self.lookahead = None;
        self.left.rewind()?;
        self.right.rewind()
    }

    fn tuple_desc(&self) -> TupleDesc {
        self.desc.clone()
    }
}
