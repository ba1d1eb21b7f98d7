//! Manages the buffer pool: a bounded cache of heap pages shared by every
//! transaction, and the locking that guards it.
//!
//! Access methods call into the pool to retrieve pages; the pool checks that
//! the requesting transaction holds the appropriate page lock before the
//! page is handed out. Eviction never writes a dirty page (no steal) and
//! commit writes every page the transaction dirtied (force), so aborts roll
//! back from in-memory before-images and nothing uncommitted ever reaches
//! disk.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::catalog::Catalog;
use crate::error::DbError;
use crate::lock_manager::{LockManager, LockMode};
use crate::page::{HeapPage, HeapPageId};
use crate::transaction::TransactionId;
use crate::tuple::Tuple;
use crate::TableId;

/// Number of pages cached when no capacity is given.
pub const DEFAULT_PAGES: usize = 50;

/// A cached page, shared between the pool and everyone who fetched it. The
/// read-write lock provides memory safety only; real isolation comes from
/// the page locks.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// The access level a transaction requests on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

impl Permissions {
    fn lock_mode(self) -> LockMode {
        match self {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        }
    }
}

/// The buffer pool manager.
pub struct BufferPool {
    capacity: usize,
    catalog: Arc<Catalog>,
    cache: Mutex<HashMap<HeapPageId, PageRef>>,
    locks: LockManager,
}

impl BufferPool {
    /// Creates a pool that caches up to `capacity` pages, resolving table
    /// ids through `catalog`.
    pub fn new(capacity: usize, catalog: Arc<Catalog>) -> BufferPool {
        BufferPool {
            capacity,
            catalog,
            cache: Mutex::new(HashMap::new()),
            locks: LockManager::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn cached_page_count(&self) -> usize {
        self.cache.lock().len()
    }

    /// Retrieves `pid` with the requested permission on behalf of `tid`.
    ///
    /// The page lock is acquired first; the call blocks while the lock is
    /// contended and fails with `TransactionAborted` if waiting would
    /// deadlock. A cached page is returned as is. On a miss the page is read
    /// through the catalog-resolved heap file and installed with its
    /// before-image captured; if the cache is full a clean page is evicted
    /// first, or the fetch fails with `BufferFull`.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: HeapPageId,
        perm: Permissions,
    ) -> Result<PageRef, DbError> {
        self.locks.acquire(tid, pid, perm.lock_mode())?;

        let mut cache = self.cache.lock();
        if let Some(page) = cache.get(&pid) {
            return Ok(Arc::clone(page));
        }
        while cache.len() >= self.capacity {
            Self::evict_page(&mut cache)?;
        }
        let file = self
            .catalog
            .file_for(pid.table_id)
            .ok_or(DbError::NoSuchElement)?;
        let page = Arc::new(RwLock::new(file.read_page(pid)?));
        cache.insert(pid, Arc::clone(&page));
        Ok(page)
    }

    /// Evicts one clean page. Dirty pages are never written back here: only
    /// committing transactions write to disk, so an all-dirty cache fails
    /// with `BufferFull`. Which clean page goes is unspecified.
    fn evict_page(cache: &mut HashMap<HeapPageId, PageRef>) -> Result<(), DbError> {
        let victim = cache
            .iter()
            .find(|(_, page)| page.read().dirtied_by().is_none())
            .map(|(pid, _)| *pid);
        match victim {
            Some(pid) => {
                cache.remove(&pid);
                Ok(())
            }
            None => Err(DbError::BufferFull),
        }
    }

    /// Inserts `tuple` into `table_id` on behalf of `tid`. The touched
    /// pages come back write-locked by `tid`; each is marked dirty and
    /// (re)installed in the cache so future requests see the new version.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> Result<(), DbError> {
        let file = self
            .catalog
            .file_for(table_id)
            .ok_or(DbError::NoSuchElement)?;
        let pages = file.insert_tuple(self, tid, tuple)?;
        self.install_dirty(tid, pages)
    }

    /// Removes the tuple named by its record id on behalf of `tid`.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<(), DbError> {
        let rid = tuple.record_id().ok_or(DbError::TupleNotOnPage)?;
        let file = self
            .catalog
            .file_for(rid.pid.table_id)
            .ok_or(DbError::NoSuchElement)?;
        let pages = file.delete_tuple(self, tid, tuple)?;
        self.install_dirty(tid, pages)
    }

    fn install_dirty(&self, tid: TransactionId, pages: Vec<PageRef>) -> Result<(), DbError> {
        for page in pages {
            let pid = {
                let mut guard = page.write();
                guard.mark_dirty(Some(tid));
                guard.id()
            };
            let mut cache = self.cache.lock();
            if !cache.contains_key(&pid) {
                while cache.len() >= self.capacity {
                    Self::evict_page(&mut cache)?;
                }
            }
            cache.insert(pid, page);
        }
        Ok(())
    }

    /// Releases the lock `tid` holds on `pid` without completing the
    /// transaction. Risky: this breaks two-phase locking, so it is only
    /// sound for pages the transaction has read and will not read again.
    pub fn release_page(&self, tid: TransactionId, pid: HeapPageId) {
        self.locks.release(tid, pid);
    }

    /// True if `tid` holds any lock on `pid`.
    pub fn holds_lock(&self, tid: TransactionId, pid: HeapPageId) -> bool {
        self.locks.holds(tid, pid)
    }

    /// Commits or aborts `tid`, then releases all of its locks.
    ///
    /// Commit flushes each page the transaction dirtied and re-captures its
    /// before-image, making the committed bytes the new rollback state.
    /// Abort restores each dirtied page from the before-image it carried
    /// into the pool; the disk is untouched, since no-steal kept every
    /// uncommitted byte in memory. Pages only read need no per-page work.
    /// A second call for the same transaction is a no-op.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<(), DbError> {
        crate::shale_debug_log!(
            "[BufferPool::transaction_complete] {tid} {}",
            if commit { "commit" } else { "abort" }
        );
        for pid in self.locks.exclusive_pages_of(tid) {
            let page = self.cache.lock().get(&pid).cloned();
            let Some(page) = page else {
                continue;
            };
            if commit {
                if page.read().dirtied_by().is_some() {
                    self.flush_page(pid)?;
                    page.write().set_before_image();
                }
            } else if page.read().dirtied_by().is_some() {
                let restored = page.read().before_image()?;
                *page.write() = restored;
            }
        }
        self.locks.release_all(tid);
        Ok(())
    }

    /// Writes `pid` back to disk if it is cached and dirty, clearing the
    /// dirty bit. Absent or clean pages are left alone.
    pub fn flush_page(&self, pid: HeapPageId) -> Result<(), DbError> {
        let page = self.cache.lock().get(&pid).cloned();
        let Some(page) = page else {
            return Ok(());
        };
        if page.read().dirtied_by().is_none() {
            return Ok(());
        }
        let file = self
            .catalog
            .file_for(pid.table_id)
            .ok_or(DbError::NoSuchElement)?;
        let mut guard = page.write();
        guard.mark_dirty(None);
        file.write_page(&guard)?;
        Ok(())
    }

    /// Flushes every dirty page in the cache. Writing dirty data to disk
    /// bypasses no-steal; keep this away from live transactions.
    pub fn flush_all_pages(&self) -> Result<(), DbError> {
        let pids: Vec<HeapPageId> = self.cache.lock().keys().copied().collect();
        for pid in pids {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    /// Drops `pid` from the cache without writing it back.
    pub fn discard_page(&self, pid: HeapPageId) {
        self.cache.lock().remove(&pid);
    }
}
