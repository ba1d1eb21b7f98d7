//! Tuples, fields and tuple descriptors.

use std::fmt;

use crate::error::DbError;
use crate::page::HeapPageId;

/// The type of a single field. The serialized width of every type is fixed,
/// so the width of a whole tuple is constant per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A 32-bit signed integer, serialized big-endian.
    Int,
    /// A string of at most the given number of bytes, serialized as a 4-byte
    /// big-endian length followed by the bytes, zero-padded to the maximum.
    Text(usize),
}

impl FieldType {
    /// Serialized width in bytes.
    pub fn byte_len(&self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::Text(max) => 4 + max,
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Int(i32),
    Text(String),
}

impl Field {
    /// True if this value can be stored under `field_type`.
    pub fn fits(&self, field_type: &FieldType) -> bool {
        match (self, field_type) {
            (Field::Int(_), FieldType::Int) => true,
            (Field::Text(s), FieldType::Text(max)) => s.len() <= *max,
            _ => false,
        }
    }

    pub(crate) fn write_to(&self, field_type: &FieldType, out: &mut Vec<u8>) {
        match (self, field_type) {
            (Field::Int(v), FieldType::Int) => out.extend_from_slice(&v.to_be_bytes()),
            (Field::Text(s), FieldType::Text(max)) => {
                let bytes = &s.as_bytes()[..s.len().min(*max)];
                out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                out.extend_from_slice(bytes);
                out.resize(out.len() + (max - bytes.len()), 0);
            }
            (_, field_type) => out.resize(out.len() + field_type.byte_len(), 0),
        }
    }

    /// Parses one field from a buffer of exactly `field_type.byte_len()`
    /// bytes.
    pub(crate) fn read_from(field_type: &FieldType, buf: &[u8]) -> Result<Field, DbError> {
        match field_type {
            FieldType::Int => Ok(Field::Int(i32::from_be_bytes(buf[..4].try_into().unwrap()))),
            FieldType::Text(max) => {
                let len = u32::from_be_bytes(buf[..4].try_into().unwrap()) as usize;
                if len > *max {
                    return Err(DbError::MalformedPage);
                }
                let text = std::str::from_utf8(&buf[4..4 + len])
                    .map_err(|_| DbError::MalformedPage)?;
                Ok(Field::Text(text.to_string()))
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{v}"),
            Field::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One entry of a tuple descriptor: a field type plus a field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TdItem {
    pub field_type: FieldType,
    pub name: String,
}

impl TdItem {
    pub fn new(field_type: FieldType, name: &str) -> TdItem {
        TdItem {
            field_type,
            name: name.to_string(),
        }
    }
}

/// The schema of a tuple: an ordered list of typed, named fields.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    pub fn new(items: Vec<TdItem>) -> TupleDesc {
        TupleDesc { items }
    }

    /// Concatenates two descriptors, first's fields before second's.
    pub fn merge(first: &TupleDesc, second: &TupleDesc) -> TupleDesc {
        let mut items = first.items.clone();
        items.extend(second.items.iter().cloned());
        TupleDesc { items }
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn field_type(&self, i: usize) -> &FieldType {
        &self.items[i].field_type
    }

    pub fn field_name(&self, i: usize) -> &str {
        &self.items[i].name
    }

    /// Index of the field with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|item| item.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TdItem> {
        self.items.iter()
    }

    /// Serialized width of one tuple under this descriptor.
    pub fn byte_size(&self) -> usize {
        self.items.iter().map(|item| item.field_type.byte_len()).sum()
    }

    /// True if every field of `tuple` is storable under this descriptor.
    pub fn fits(&self, tuple: &Tuple) -> bool {
        tuple.desc() == self
            && tuple
                .fields()
                .iter()
                .zip(self.items.iter())
                .all(|(field, item)| field.fits(&item.field_type))
    }
}

// Field names are aliases, not schema: two descriptors are interchangeable
// whenever their field types match pairwise.
impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(other.items.iter())
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for TupleDesc {}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}({:?})", item.name, item.field_type)?;
        }
        Ok(())
    }
}

/// The identity of a persisted tuple: its page plus its slot on that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub pid: HeapPageId,
    pub slot: usize,
}

impl RecordId {
    pub fn new(pid: HeapPageId, slot: usize) -> RecordId {
        RecordId { pid, slot }
    }
}

/// A value bound to a descriptor. Newly constructed tuples carry default
/// field values and no record id; the record id is assigned when the tuple
/// lands on a page.
#[derive(Debug, Clone)]
pub struct Tuple {
    desc: TupleDesc,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(desc: TupleDesc) -> Tuple {
        let fields = desc
            .iter()
            .map(|item| match item.field_type {
                FieldType::Int => Field::Int(0),
                FieldType::Text(_) => Field::Text(String::new()),
            })
            .collect();
        Tuple {
            desc,
            fields,
            record_id: None,
        }
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn set_field(&mut self, i: usize, field: Field) {
        self.fields[i] = field;
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc() -> TupleDesc {
        TupleDesc::new(vec![
            TdItem::new(FieldType::Int, "id"),
            TdItem::new(FieldType::Text(16), "name"),
        ])
    }

    #[test]
    fn byte_size_sums_field_widths() {
        assert_eq!(desc().byte_size(), 4 + 4 + 16);
    }

    #[test]
    fn descriptors_compare_by_types_not_names() {
        let renamed = TupleDesc::new(vec![
            TdItem::new(FieldType::Int, "a.id"),
            TdItem::new(FieldType::Text(16), "a.name"),
        ]);
        assert_eq!(desc(), renamed);
        let narrower = TupleDesc::new(vec![
            TdItem::new(FieldType::Int, "id"),
            TdItem::new(FieldType::Text(8), "name"),
        ]);
        assert_ne!(desc(), narrower);
    }

    #[test]
    fn field_round_trips_through_bytes() {
        let ft = FieldType::Text(16);
        let field = Field::Text("karst".to_string());
        let mut buf = Vec::new();
        field.write_to(&ft, &mut buf);
        assert_eq!(buf.len(), ft.byte_len());
        assert_eq!(Field::read_from(&ft, &buf).unwrap(), field);

        let ft = FieldType::Int;
        let field = Field::Int(-7);
        let mut buf = Vec::new();
        field.write_to(&ft, &mut buf);
        assert_eq!(Field::read_from(&ft, &buf).unwrap(), field);
    }

    #[test]
    fn oversized_length_prefix_is_malformed() {
        let mut buf = vec![0u8; FieldType::Text(8).byte_len()];
        buf[..4].copy_from_slice(&100u32.to_be_bytes());
        assert!(matches!(
            Field::read_from(&FieldType::Text(8), &buf),
            Err(DbError::MalformedPage)
        ));
    }

    #[test]
    fn overlong_text_does_not_fit() {
        let field = Field::Text("a-string-longer-than-eight".to_string());
        assert!(!field.fits(&FieldType::Text(8)));
        assert!(field.fits(&FieldType::Text(64)));
    }

    #[test]
    fn merge_concatenates_fields() {
        let merged = TupleDesc::merge(&desc(), &desc());
        assert_eq!(merged.num_fields(), 4);
        assert_eq!(merged.byte_size(), 2 * desc().byte_size());
        assert_eq!(merged.field_name(2), "id");
    }

    #[test]
    fn index_of_finds_named_field() {
        assert_eq!(desc().index_of("name"), Some(1));
        assert_eq!(desc().index_of("age"), None);
    }
}
