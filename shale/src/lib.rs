//! # Shale Storage Engine
//! Paged heap-file storage for the Karst database. This crate is responsible
//! for the on-disk page format, the shared buffer pool, and page-level
//! concurrency control: strict two-phase locking with deadlock detection,
//! no-steal eviction, and before-image rollback on abort.

/// The buffer pool manager.
pub mod buffer_pool;
/// The table catalog.
pub mod catalog;
/// The crate-wide error type.
pub mod error;
/// Heap files and their tuple access paths.
pub mod heap_file;
/// The tuple iterator interface.
pub mod iterator;
/// The lock manager for concurrency control.
pub mod lock_manager;
/// The heap page layout and data structures.
pub mod page;
/// Transaction identifiers.
pub mod transaction;
/// Tuples, fields and tuple descriptors.
pub mod tuple;

use std::sync::atomic::{AtomicUsize, Ordering};

/// The default size of a single page in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// A unique identifier for a table, derived from the absolute path of its
/// backing file. Two files at the same path are the same table.
pub type TableId = u64;

pub use buffer_pool::{BufferPool, PageRef, Permissions, DEFAULT_PAGES};
pub use error::DbError;
pub use iterator::DbIterator;
pub use page::{HeapPage, HeapPageId};
pub use transaction::TransactionId;
pub use tuple::{Field, FieldType, RecordId, TdItem, Tuple, TupleDesc};

/// Bytes per page, including the header.
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Relaxed)
}

/// Overrides the process-wide page size. Only valid at startup: pages
/// written under one size are unreadable under another.
pub fn set_page_size(bytes: usize) {
    PAGE_SIZE.store(bytes, Ordering::Relaxed);
}

/// Restores the default page size. Test hook.
pub fn reset_page_size() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::Relaxed);
}

pub fn debug_logs_enabled() -> bool {
    std::env::var_os("SHALE_DEBUG_LOG").is_some()
}

#[macro_export]
macro_rules! shale_debug_log {
    ($($arg:tt)*) => {
        if $crate::debug_logs_enabled() {
            println!($($arg)*);
        }
    };
}
