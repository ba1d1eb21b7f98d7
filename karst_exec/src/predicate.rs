//! Comparison predicates applied to tuples while filtering and joining.

use shale::tuple::{Field, Tuple};

/// Comparison operators on field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equals,
    GreaterThan,
    LessThan,
    LessThanOrEq,
    GreaterThanOrEq,
    NotEquals,
}

impl CompareOp {
    /// Compares two field values. Values of different kinds neither equal
    /// nor order each other.
    pub fn apply(self, lhs: &Field, rhs: &Field) -> bool {
        match (lhs, rhs) {
            (Field::Int(a), Field::Int(b)) => self.compare(a, b),
            (Field::Text(a), Field::Text(b)) => self.compare(a, b),
            _ => false,
        }
    }

    fn compare<T: PartialOrd>(self, a: T, b: T) -> bool {
        match self {
            CompareOp::Equals => a == b,
            CompareOp::GreaterThan => a > b,
            CompareOp::LessThan => a < b,
            CompareOp::LessThanOrEq => a <= b,
            CompareOp::GreaterThanOrEq => a >= b,
            CompareOp::NotEquals => a != b,
        }
    }
}

/// Compares one field of a tuple against a constant.
#[derive(Debug, Clone)]
pub struct Predicate {
    field: usize,
    op: CompareOp,
    operand: Field,
}

impl Predicate {
    pub fn new(field: usize, op: CompareOp, operand: Field) -> Predicate {
        Predicate { field, op, operand }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn operand(&self) -> &Field {
        &self.operand
    }

    pub fn matches(&self, tuple: &Tuple) -> bool {
        self.op.apply(tuple.field(self.field), &self.operand)
    }
}

/// Compares a field of one tuple against a field of another.
#[derive(Debug, Clone, Copy)]
pub struct JoinPredicate {
    field1: usize,
    field2: usize,
    op: CompareOp,
}

impl JoinPredicate {
    pub fn new(field1: usize, op: CompareOp, field2: usize) -> JoinPredicate {
        JoinPredicate { field1, field2, op }
    }

    pub fn matches(&self, left: &Tuple, right: &Tuple) -> bool {
        self.op.apply(left.field(self.field1), right.field(self.field2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shale::tuple::{FieldType, TdItem, TupleDesc};

    fn tuple(value: i32, name: &str) -> Tuple {
        let desc = TupleDesc::new(vec![
            TdItem::new(FieldType::Int, "id"),
            TdItem::new(FieldType::Text(16), "name"),
        ]);
        let mut t = Tuple::new(desc);
        t.set_field(0, Field::Int(value));
        t.set_field(1, Field::Text(name.to_string()));
        t
    }

    #[test]
    fn int_comparisons() {
        let t = tuple(5, "five");
        assert!(Predicate::new(0, CompareOp::Equals, Field::Int(5)).matches(&t));
        assert!(Predicate::new(0, CompareOp::GreaterThan, Field::Int(4)).matches(&t));
        assert!(Predicate::new(0, CompareOp::LessThanOrEq, Field::Int(5)).matches(&t));
        assert!(!Predicate::new(0, CompareOp::NotEquals, Field::Int(5)).matches(&t));
    }

    #[test]
    fn text_comparisons_are_lexicographic() {
        let t = tuple(1, "banana");
        assert!(Predicate::new(1, CompareOp::GreaterThan, Field::Text("apple".into())).matches(&t));
        assert!(Predicate::new(1, CompareOp::LessThan, Field::Text("cherry".into())).matches(&t));
    }

    #[test]
    fn mismatched_kinds_never_match() {
        let t = tuple(5, "five");
        assert!(!Predicate::new(0, CompareOp::Equals, Field::Text("5".into())).matches(&t));
        assert!(!Predicate::new(1, CompareOp::NotEquals, Field::Int(5)).matches(&t));
    }

    #[test]
    fn join_predicate_compares_across_tuples() {
        let a = tuple(3, "a");
        let b = tuple(3, "b");
        assert!(JoinPredicate::new(0, CompareOp::Equals, 0).matches(&a, &b));
        assert!(!JoinPredicate::new(1, CompareOp::Equals, 1).matches(&a, &b));
    }
}
