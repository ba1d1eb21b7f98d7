//! The heap page layout and data structures.

use std::fmt;

use crate::error::DbError;
use crate::page_size;
use crate::transaction::TransactionId;
use crate::tuple::{Field, RecordId, Tuple, TupleDesc};
use crate::TableId;

/// A unique identifier for a heap page: the owning table plus the page's
/// ordinal within the backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapPageId {
    pub table_id: TableId,
    pub page_no: usize,
}

impl HeapPageId {
    pub fn new(table_id: TableId, page_no: usize) -> HeapPageId {
        HeapPageId { table_id, page_no }
    }
}

impl fmt::Display for HeapPageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} of table {}", self.page_no, self.table_id)
    }
}

/// One fixed-size page of a heap file.
///
/// On disk a page is an occupancy bitmap followed by fixed-width tuple
/// slots. With page size `P` and tuple width `W`, a page holds
/// `S = (P * 8) / (W * 8 + 1)` slots behind a header of `ceil(S / 8)` bytes;
/// bit `i` of the header (least significant first within each byte) is set
/// iff slot `i` is occupied. Trailing bytes are zero.
///
/// Pages are not internally synchronized. A page is mutated only by the
/// transaction holding its exclusive lock, and the buffer pool wraps every
/// cached page in a read-write lock for memory safety.
#[derive(Debug, Clone)]
pub struct HeapPage {
    pid: HeapPageId,
    desc: TupleDesc,
    header: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    dirtied_by: Option<TransactionId>,
    before_image: Vec<u8>,
}

impl HeapPage {
    /// Slots that fit on one page: each tuple costs its width in the slot
    /// area plus one occupancy bit in the header.
    pub fn slots_per_page(desc: &TupleDesc) -> usize {
        (page_size() * 8) / (desc.byte_size() * 8 + 1)
    }

    fn header_bytes(slots: usize) -> usize {
        slots.div_ceil(8)
    }

    /// The bytes of a page with every slot empty.
    pub fn empty_page_data() -> Vec<u8> {
        vec![0; page_size()]
    }

    /// Creates a page with a zeroed header and zeroed tuple area.
    pub fn new_empty(pid: HeapPageId, desc: TupleDesc) -> HeapPage {
        let slots = Self::slots_per_page(&desc);
        let mut page = HeapPage {
            pid,
            header: vec![0; Self::header_bytes(slots)],
            slots: vec![None; slots],
            desc,
            dirtied_by: None,
            before_image: Vec::new(),
        };
        page.set_before_image();
        page
    }

    /// Parses a page from exactly one page worth of bytes. The parsed page's
    /// before-image is the input itself.
    pub fn from_bytes(pid: HeapPageId, desc: TupleDesc, data: &[u8]) -> Result<HeapPage, DbError> {
        if data.len() != page_size() {
            return Err(DbError::MalformedPage);
        }
        let slots = Self::slots_per_page(&desc);
        if slots == 0 {
            return Err(DbError::MalformedPage);
        }
        let header_len = Self::header_bytes(slots);
        let header = data[..header_len].to_vec();
        let width = desc.byte_size();

        let mut parsed = Vec::with_capacity(slots);
        for i in 0..slots {
            if header[i / 8] >> (i % 8) & 1 == 0 {
                parsed.push(None);
                continue;
            }
            let raw = &data[header_len + i * width..header_len + (i + 1) * width];
            let mut tuple = Tuple::new(desc.clone());
            let mut offset = 0;
            for j in 0..desc.num_fields() {
                let field_type = *desc.field_type(j);
                let field = Field::read_from(&field_type, &raw[offset..offset + field_type.byte_len()])?;
                tuple.set_field(j, field);
                offset += field_type.byte_len();
            }
            tuple.set_record_id(Some(RecordId::new(pid, i)));
            parsed.push(Some(tuple));
        }

        let mut page = HeapPage {
            pid,
            desc,
            header,
            slots: parsed,
            dirtied_by: None,
            before_image: Vec::new(),
        };
        page.before_image = data.to_vec();
        Ok(page)
    }

    /// Serializes the page. Round-trips with `from_bytes`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(page_size());
        out.extend_from_slice(&self.header);
        let width = self.desc.byte_size();
        for slot in &self.slots {
            match slot {
                Some(tuple) => {
                    for (j, field) in tuple.fields().iter().enumerate() {
                        field.write_to(self.desc.field_type(j), &mut out);
                    }
                }
                None => out.resize(out.len() + width, 0),
            }
        }
        out.resize(page_size(), 0);
        out
    }

    pub fn id(&self) -> HeapPageId {
        self.pid
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn slot_used(&self, i: usize) -> bool {
        self.header[i / 8] >> (i % 8) & 1 == 1
    }

    fn set_slot(&mut self, i: usize, used: bool) {
        if used {
            self.header[i / 8] |= 1 << (i % 8);
        } else {
            self.header[i / 8] &= !(1 << (i % 8));
        }
    }

    pub fn empty_slot_count(&self) -> usize {
        (0..self.slots.len()).filter(|&i| !self.slot_used(i)).count()
    }

    /// Occupied tuples in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().flatten()
    }

    /// Writes `tuple` into the lowest-numbered free slot, setting the header
    /// bit and assigning the tuple's record id.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<(), DbError> {
        if !self.desc.fits(tuple) {
            return Err(DbError::SchemaMismatch);
        }
        let slot = (0..self.slots.len())
            .find(|&i| !self.slot_used(i))
            .ok_or(DbError::PageFull(self.pid))?;
        tuple.set_record_id(Some(RecordId::new(self.pid, slot)));
        self.slots[slot] = Some(tuple.clone());
        self.set_slot(slot, true);
        Ok(())
    }

    /// Clears the slot named by the tuple's record id, which must refer to
    /// an occupied slot of this page.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<(), DbError> {
        let rid = tuple.record_id().ok_or(DbError::TupleNotOnPage)?;
        if rid.pid != self.pid || rid.slot >= self.slots.len() || !self.slot_used(rid.slot) {
            return Err(DbError::TupleNotOnPage);
        }
        self.set_slot(rid.slot, false);
        self.slots[rid.slot] = None;
        Ok(())
    }

    /// The transaction that last dirtied the page, if it is dirty.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    pub fn mark_dirty(&mut self, by: Option<TransactionId>) {
        self.dirtied_by = by;
    }

    /// Snapshots the current serialized bytes as the rollback state.
    pub fn set_before_image(&mut self) {
        self.before_image = self.to_bytes();
    }

    /// The page as it was when its before-image was last captured.
    pub fn before_image(&self) -> Result<HeapPage, DbError> {
        HeapPage::from_bytes(self.pid, self.desc.clone(), &self.before_image)
    }
}
