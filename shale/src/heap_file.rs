//! Heap files and their tuple access paths.

use std::collections::hash_map::DefaultHasher;
use std::fs::{create_dir_all, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::buffer_pool::{BufferPool, PageRef, Permissions};
use crate::error::DbError;
use crate::iterator::DbIterator;
use crate::page::{HeapPage, HeapPageId};
use crate::page_size;
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::TableId;

/// A table stored as an unordered collection of fixed-size heap pages.
/// Page `k` occupies bytes `[k * P, (k + 1) * P)` of the backing file, so
/// the file length is always a multiple of the page size. Tuple access goes
/// through the buffer pool; only raw page IO touches the file directly.
pub struct HeapFile {
    path: PathBuf,
    desc: TupleDesc,
    id: TableId,
}

impl HeapFile {
    /// Opens the heap file at `path`, creating it empty if missing. The
    /// table id is derived from the absolute path, so two files at the same
    /// path are the same table for the life of the process.
    pub fn open<P: AsRef<Path>>(path: P, desc: TupleDesc) -> Result<HeapFile, DbError> {
        let path = std::path::absolute(path.as_ref())?;
        crate::shale_debug_log!("[HeapFile::open] Opening table file at: {path:?}");
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        let id = hasher.finish();

        Ok(HeapFile { path, desc, id })
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_pages(&self) -> Result<usize, DbError> {
        let len = std::fs::metadata(&self.path)?.len() as usize;
        Ok(len / page_size())
    }

    /// Reads the page at `pid.page_no * P` straight from disk.
    pub fn read_page(&self, pid: HeapPageId) -> Result<HeapPage, DbError> {
        let offset = pid.page_no * page_size();
        let mut file = File::open(&self.path)?;
        if offset + page_size() > file.metadata()?.len() as usize {
            return Err(DbError::IllegalPage(pid));
        }
        file.seek(SeekFrom::Start(offset as u64))?;
        let mut buf = vec![0u8; page_size()];
        file.read_exact(&mut buf)?;
        HeapPage::from_bytes(pid, self.desc.clone(), &buf)
    }

    /// Writes the page's serialized bytes at its offset, extending the file
    /// when the page is one past the current end.
    pub fn write_page(&self, page: &HeapPage) -> Result<(), DbError> {
        let offset = page.id().page_no * page_size();
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(offset as u64))?;
        file.write_all(&page.to_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Inserts `tuple` into the first page with a free slot, appending a
    /// fresh empty page when every existing page is full. Pages are probed
    /// under a read lock and only a page that will actually be written is
    /// escalated to a write lock, so readers of full pages stay unblocked.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>, DbError> {
        for page_no in 0..self.num_pages()? {
            let pid = HeapPageId::new(self.id, page_no);
            let has_room = {
                let page = pool.get_page(tid, pid, Permissions::ReadOnly)?;
                let guard = page.read();
                guard.empty_slot_count() > 0
            };
            if !has_room {
                continue;
            }
            let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
            page.write().insert_tuple(tuple)?;
            return Ok(vec![page]);
        }

        // Every page is full. Append an empty page on disk first, then
        // insert through the pool so the new page is locked and cached like
        // any other.
        let pid = HeapPageId::new(self.id, self.num_pages()?);
        crate::shale_debug_log!("[HeapFile::insert_tuple] Appending {pid}");
        self.write_page(&HeapPage::new_empty(pid, self.desc.clone()))?;
        let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
        page.write().insert_tuple(tuple)?;
        Ok(vec![page])
    }

    /// Deletes the tuple named by its record id.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>, DbError> {
        let rid = tuple.record_id().ok_or(DbError::TupleNotOnPage)?;
        let page = pool.get_page(tid, rid.pid, Permissions::ReadWrite)?;
        page.write().delete_tuple(tuple)?;
        Ok(vec![page])
    }

    /// A restartable scan over every tuple of the file in page-then-slot
    /// order, fetching pages through the buffer pool with read permission.
    pub fn iter<'p>(
        self: &Arc<Self>,
        pool: &'p BufferPool,
        tid: TransactionId,
    ) -> HeapFileIterator<'p> {
        HeapFileIterator {
            file: Arc::clone(self),
            pool,
            tid,
            next_page_no: 0,
            current: Vec::new().into_iter(),
            lookahead: None,
            opened: false,
        }
    }
}

/// Iterates a heap file one page at a time. The tuples of the page under
/// the cursor are materialized so no page lock outlives a call.
pub struct HeapFileIterator<'p> {
    file: Arc<HeapFile>,
    pool: &'p BufferPool,
    tid: TransactionId,
    next_page_no: usize,
    current: std::vec::IntoIter<Tuple>,
    lookahead: Option<Tuple>,
    opened: bool,
}

impl HeapFileIterator<'_> {
    fn page_tuples(&self, page_no: usize) -> Result<std::vec::IntoIter<Tuple>, DbError> {
        let pid = HeapPageId::new(self.file.id(), page_no);
        let page = self.pool.get_page(self.tid, pid, Permissions::ReadOnly)?;
        let tuples: Vec<Tuple> = page.read().iter().cloned().collect();
        Ok(tuples.into_iter())
    }

    fn read_next(&mut self) -> Result<Option<Tuple>, DbError> {
        if !self.opened {
            return Ok(None);
        }
        loop {
            if let Some(tuple) = self.current.next() {
                return Ok(Some(tuple));
            }
            if self.next_page_no >= self.file.num_pages()? {
                return Ok(None);
            }
            self.current = self.page_tuples(self.next_page_no)?;
            self.next_page_no += 1;
        }
    }
}

impl DbIterator for HeapFileIterator<'_> {
    fn open(&mut self) -> Result<(), DbError> {
        self.opened = true;
        self.next_page_no = 0;
        self.current = Vec::new().into_iter();
        self.lookahead = None;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
        self.next_page_no = 0;
        self.current = Vec::new().into_iter();
        self.lookahead = None;
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
        self.open()
    }

    fn tuple_desc(&self) -> TupleDesc {
        self.file.tuple_desc().clone()
    }
}
