//! The crate-wide error type.

use std::fmt;
use std::io;

use crate::page::HeapPageId;

/// Everything that can fail inside the storage engine, one variant per
/// failure kind. Waiting for a lock is not an error; deadlock is.
#[derive(Debug)]
pub enum DbError {
    /// The page id addresses bytes past the end of its backing file.
    IllegalPage(HeapPageId),
    /// A serialized page failed structural checks.
    MalformedPage,
    /// An insert found no free slot on the page.
    PageFull(HeapPageId),
    /// A delete named a record id that does not live on the target page.
    TupleNotOnPage,
    /// A tuple's descriptor differs from the table's.
    SchemaMismatch,
    /// Eviction found no clean victim to drop.
    BufferFull,
    /// The requesting transaction closed a waits-for cycle and must abort.
    TransactionAborted,
    /// An exhausted iterator was advanced, or a catalog lookup missed.
    NoSuchElement,
    /// An underlying disk read or write failed.
    Io(io::Error),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::IllegalPage(pid) => write!(f, "{pid} is out of range for its file"),
            DbError::MalformedPage => write!(f, "page bytes failed structural checks"),
            DbError::PageFull(pid) => write!(f, "{pid} has no free slot"),
            DbError::TupleNotOnPage => write!(f, "tuple record id does not match the page"),
            DbError::SchemaMismatch => write!(f, "tuple descriptor differs from the table's"),
            DbError::BufferFull => write!(f, "buffer pool has no clean page to evict"),
            DbError::TransactionAborted => write!(f, "transaction aborted by deadlock detection"),
            DbError::NoSuchElement => write!(f, "no such element"),
            DbError::Io(err) => write!(f, "io failure: {err}"),
        }
    }
}

impl std::error::Error for DbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DbError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DbError {
    fn from(err: io::Error) -> Self {
        DbError::Io(err)
    }
}
