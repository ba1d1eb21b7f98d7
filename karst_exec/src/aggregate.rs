//! Grouped aggregation over a tuple stream.

use std::collections::HashMap;

use shale::error::DbError;
use shale::iterator::{DbIterator, TupleIterator};
use shale::tuple::{Field, FieldType, TdItem, Tuple, TupleDesc};

/// The aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

/// Folds tuples into per-group aggregate state and exposes the result as a
/// tuple stream: `(groupVal, aggregateVal)` rows when grouping, a single
/// `(aggregateVal)` row otherwise.
pub trait Aggregator {
    fn merge(&mut self, tuple: &Tuple) -> Result<(), DbError>;
    fn iterator(&self) -> TupleIterator;
}

fn result_desc(group_type: Option<FieldType>) -> TupleDesc {
    match group_type {
        None => TupleDesc::new(vec![TdItem::new(FieldType::Int, "aggregateVal")]),
        Some(field_type) => TupleDesc::new(vec![
            TdItem::new(field_type, "groupVal"),
            TdItem::new(FieldType::Int, "aggregateVal"),
        ]),
    }
}

fn result_tuples(desc: &TupleDesc, groups: impl Iterator<Item = (Option<Field>, i32)>) -> Vec<Tuple> {
    groups
        .map(|(key, value)| {
            let mut tuple = Tuple::new(desc.clone());
            match key {
                None => tuple.set_field(0, Field::Int(value)),
                Some(group) => {
                    tuple.set_field(0, group);
                    tuple.set_field(1, Field::Int(value));
                }
            }
            tuple
        })
        .collect()
}

/// Computes one aggregate over an integer column, optionally grouped by
/// another column.
pub struct IntegerAggregator {
    group_by: Option<(usize, FieldType)>,
    field: usize,
    op: AggregateOp,
    totals: HashMap<Option<Field>, i32>,
    counts: HashMap<Option<Field>, i32>,
}

impl IntegerAggregator {
    pub fn new(group_by: Option<(usize, FieldType)>, field: usize, op: AggregateOp) -> IntegerAggregator {
        IntegerAggregator {
            group_by,
            field,
            op,
            totals: HashMap::new(),
            counts: HashMap::new(),
        }
    }
}

impl Aggregator for IntegerAggregator {
    fn merge(&mut self, tuple: &Tuple) -> Result<(), DbError> {
        let key = self
            .group_by
            .map(|(group_field, _)| tuple.field(group_field).clone());
        let Field::Int(value) = *tuple.field(self.field) else {
            return Err(DbError::SchemaMismatch);
        };

        let total = self.totals.entry(key.clone()).or_insert(match self.op {
            AggregateOp::Max => i32::MIN,
            AggregateOp::Min => i32::MAX,
            _ => 0,
        });
        match self.op {
            AggregateOp::Min => *total = (*total).min(value),
            AggregateOp::Max => *total = (*total).max(value),
            AggregateOp::Sum => *total += value,
            AggregateOp::Count => *total += 1,
            AggregateOp::Avg => {
                *total += value;
                *self.counts.entry(key).or_insert(0) += 1;
            }
        }
        Ok(())
    }

    fn iterator(&self) -> TupleIterator {
        let desc = result_desc(self.group_by.map(|(_, field_type)| field_type));
        let groups = self.totals.iter().map(|(key, &total)| {
            let value = match self.op {
                AggregateOp::Avg => total / self.counts[key],
                _ => total,
            };
            (key.clone(), value)
        });
        let tuples = result_tuples(&desc, groups);
        TupleIterator::new(desc, tuples)
    }
}

/// Counts string values, optionally grouped. Count is the only aggregate
/// defined over strings.
pub struct StringAggregator {
    group_by: Option<(usize, FieldType)>,
    field: usize,
    counts: HashMap<Option<Field>, i32>,
}

impl StringAggregator {
    pub fn new(group_by: Option<(usize, FieldType)>, field: usize) -> StringAggregator {
        StringAggregator {
            group_by,
            field,
            counts: HashMap::new(),
        }
    }
}

impl Aggregator for StringAggregator {
    fn merge(&mut self, tuple: &Tuple) -> Result<(), DbError> {
        let Field::Text(_) = tuple.field(self.field) else {
            return Err(DbError::SchemaMismatch);
        };
        let key = self
            .group_by
            .map(|(group_field, _)| tuple.field(group_field).clone());
        *self.counts.entry(key).or_insert(0) += 1;
        Ok(())
    }

    fn iterator(&self) -> TupleIterator {
        let desc = result_desc(self.group_by.map(|(_, field_type)| field_type));
        let groups = self.counts.iter().map(|(key, &count)| (key.clone(), count));
        let tuples = result_tuples(&desc, groups);
        TupleIterator::new(desc, tuples)
    }
}

/// The aggregation operator: drains its child on open, then yields one
/// result tuple per group.
pub struct Aggregate<C: DbIterator> {
    child: C,
    field: usize,
    group_by: Option<usize>,
    op: AggregateOp,
    results: Option<TupleIterator>,
}

impl<C: DbIterator> Aggregate<C> {
    pub fn new(child: C, field: usize, group_by: Option<usize>, op: AggregateOp) -> Aggregate<C> {
        Aggregate {
            child,
            field,
            group_by,
            op,
            results: None,
        }
    }

    fn group_key(&self) -> Option<(usize, FieldType)> {
        let child_desc = self.child.tuple_desc();
        self.group_by
            .map(|group_field| (group_field, *child_desc.field_type(group_field)))
    }
}

impl<C: DbIterator> DbIterator for Aggregate<C> {
    fn open(&mut self) -> Result<(), DbError> {
        self.child.open()?;
        let child_desc = self.child.tuple_desc();
        let mut aggregator: Box<dyn Aggregator> = match child_desc.field_type(self.field) {
            FieldType::Int => Box::new(IntegerAggregator::new(self.group_key(), self.field, self.op)),
            FieldType::Text(_) => {
                if self.op != AggregateOp::Count {
                    return Err(DbError::SchemaMismatch);
                }
                Box::new(StringAggregator::new(self.group_key(), self.field))
            }
        };
        while self.child.has_next()? {
            aggregator.merge(&self.child.next()?)?;
        }
        let mut results = aggregator.iterator();
        results.open()?;
        self.results = Some(results);
        Ok(())
    }

    fn close(&mut self) {
        self.results = None;
        self.child.close();
    }

    fn has_next(&mut self) -> Result<bool, DbError> {
        match self.results.as_mut() {
            Some(results) => results.has_next(),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> Result<Tuple, DbError> {
        self.results.as_mut().ok_or(DbError::NoSuchElement)?.next()
    }

    fn rewind(&mut self) -> Result<(), DbError> {
        self.results.as_mut().ok_or(DbError::NoSuchElement)?.rewind()
    }

    fn tuple_desc(&self) -> TupleDesc {
        result_desc(self.group_key().map(|(_, field_type)| field_type))
    }
}
