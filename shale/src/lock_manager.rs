//! Manages shared and exclusive locks on pages.

use std::collections::{HashMap, HashSet, VecDeque};
use std::thread;

use parking_lot::Mutex;

use crate::error::DbError;
use crate::page::HeapPageId;
use crate::transaction::TransactionId;

/// Represents the two modes of locking a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug, Default)]
struct LockState {
    /// Transactions holding a shared lock, per page.
    shared: HashMap<HeapPageId, HashSet<TransactionId>>,
    /// The single exclusive holder, per page.
    exclusive: HashMap<HeapPageId, TransactionId>,
    /// Reverse maps: the pages each transaction has locked.
    shared_pages: HashMap<TransactionId, HashSet<HeapPageId>>,
    exclusive_pages: HashMap<TransactionId, HashSet<HeapPageId>>,
    /// Waits-for graph. A blocked transaction maps to the holders it is
    /// currently waiting on; edges are replaced on every blocked attempt,
    /// never accumulated, so the graph only ever shows live blockers.
    waits_for: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl LockState {
    fn try_acquire(&mut self, tid: TransactionId, pid: HeapPageId, mode: LockMode) -> bool {
        match mode {
            LockMode::Shared => self.try_shared(tid, pid),
            LockMode::Exclusive => self.try_exclusive(tid, pid),
        }
    }

    fn try_shared(&mut self, tid: TransactionId, pid: HeapPageId) -> bool {
        if let Some(&holder) = self.exclusive.get(&pid) {
            // An exclusive holder re-reads through its own lock.
            return holder == tid;
        }
        self.shared.entry(pid).or_default().insert(tid);
        self.shared_pages.entry(tid).or_default().insert(pid);
        true
    }

    fn try_exclusive(&mut self, tid: TransactionId, pid: HeapPageId) -> bool {
        if let Some(&holder) = self.exclusive.get(&pid) {
            return holder == tid;
        }
        if let Some(readers) = self.shared.get(&pid) {
            if readers.iter().any(|&reader| reader != tid) {
                return false;
            }
        }
        // No other holder. If the requester was the sole shared holder its
        // entry is swapped for an exclusive one: the upgrade happens in
        // place, without ever dropping the lock.
        self.remove_shared(tid, pid);
        self.exclusive.insert(pid, tid);
        self.exclusive_pages.entry(tid).or_default().insert(pid);
        true
    }

    fn remove_shared(&mut self, tid: TransactionId, pid: HeapPageId) {
        if let Some(readers) = self.shared.get_mut(&pid) {
            readers.remove(&tid);
            if readers.is_empty() {
                self.shared.remove(&pid);
            }
        }
        if let Some(pages) = self.shared_pages.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                self.shared_pages.remove(&tid);
            }
        }
    }

    fn remove_exclusive(&mut self, tid: TransactionId, pid: HeapPageId) {
        if self.exclusive.get(&pid) == Some(&tid) {
            self.exclusive.remove(&pid);
        }
        if let Some(pages) = self.exclusive_pages.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                self.exclusive_pages.remove(&tid);
            }
        }
    }

    /// Every current holder of `pid` other than the requester.
    fn holders_of(&self, pid: HeapPageId, requester: TransactionId) -> HashSet<TransactionId> {
        let mut holders = HashSet::new();
        if let Some(readers) = self.shared.get(&pid) {
            holders.extend(readers.iter().copied().filter(|&t| t != requester));
        }
        if let Some(&writer) = self.exclusive.get(&pid) {
            if writer != requester {
                holders.insert(writer);
            }
        }
        holders
    }

    /// Breadth-first search over the waits-for graph for a path from
    /// `start`'s out-edges back to `start`.
    fn closes_cycle(&self, start: TransactionId) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);
        while let Some(tx) = queue.pop_front() {
            let Some(edges) = self.waits_for.get(&tx) else {
                continue;
            };
            for &next in edges {
                if next == start {
                    return true;
                }
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }
}

/// The lock manager. All grant decisions are made atomically under a single
/// mutex; blocked callers yield the thread and retry, so the only
/// lock-level failure is `TransactionAborted` on deadlock.
#[derive(Debug, Default)]
pub struct LockManager {
    state: Mutex<LockState>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires `mode` on `pid` for `tid`, blocking until granted.
    ///
    /// Each failed attempt replaces the transaction's waits-for edges with
    /// the page's current holders and re-runs cycle detection. Only the
    /// attempt that closes a cycle aborts; its edges are dropped in the same
    /// critical section, so the remaining transactions on the cycle cannot
    /// observe it a second time and keep waiting.
    pub fn acquire(
        &self,
        tid: TransactionId,
        pid: HeapPageId,
        mode: LockMode,
    ) -> Result<(), DbError> {
        loop {
            {
                let mut state = self.state.lock();
                if state.try_acquire(tid, pid, mode) {
                    state.waits_for.remove(&tid);
                    return Ok(());
                }
                let holders = state.holders_of(pid, tid);
                state.waits_for.insert(tid, holders);
                if state.closes_cycle(tid) {
                    state.waits_for.remove(&tid);
                    crate::shale_debug_log!(
                        "[LockManager::acquire] deadlock: {tid} aborts waiting for {pid}"
                    );
                    return Err(DbError::TransactionAborted);
                }
            }
            thread::yield_now();
        }
    }

    /// True if `tid` holds any lock on `pid`.
    pub fn holds(&self, tid: TransactionId, pid: HeapPageId) -> bool {
        let state = self.state.lock();
        state.exclusive.get(&pid) == Some(&tid)
            || state
                .shared
                .get(&pid)
                .is_some_and(|readers| readers.contains(&tid))
    }

    /// Drops whatever lock `tid` holds on `pid`. This shrinks the lock set
    /// mid-transaction, which breaks two-phase locking; callers must know
    /// the page was only read.
    pub fn release(&self, tid: TransactionId, pid: HeapPageId) {
        let mut state = self.state.lock();
        state.remove_shared(tid, pid);
        state.remove_exclusive(tid, pid);
    }

    /// Releases every lock held by `tid` and removes it from the waits-for
    /// graph entirely, out-edges and in-edges both.
    pub fn release_all(&self, tid: TransactionId) {
        let mut state = self.state.lock();
        if let Some(pids) = state.shared_pages.remove(&tid) {
            for pid in pids {
                if let Some(readers) = state.shared.get_mut(&pid) {
                    readers.remove(&tid);
                    if readers.is_empty() {
                        state.shared.remove(&pid);
                    }
                }
            }
        }
        if let Some(pids) = state.exclusive_pages.remove(&tid) {
            for pid in pids {
                state.exclusive.remove(&pid);
            }
        }
        state.waits_for.remove(&tid);
        for edges in state.waits_for.values_mut() {
            edges.remove(&tid);
        }
    }

    /// The pages `tid` holds exclusively: the set the buffer pool flushes on
    /// commit or reverts on abort.
    pub fn exclusive_pages_of(&self, tid: TransactionId) -> HashSet<HeapPageId> {
        self.state
            .lock()
            .exclusive_pages
            .get(&tid)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pid(page_no: usize) -> HeapPageId {
        HeapPageId::new(1, page_no)
    }

    #[test]
    fn shared_locks_coexist() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());
        lm.acquire(t1, pid(0), LockMode::Shared).unwrap();
        lm.acquire(t2, pid(0), LockMode::Shared).unwrap();
        assert!(lm.holds(t1, pid(0)));
        assert!(lm.holds(t2, pid(0)));
    }

    #[test]
    fn shared_reacquire_is_idempotent() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();
        lm.acquire(t1, pid(0), LockMode::Shared).unwrap();
        lm.acquire(t1, pid(0), LockMode::Shared).unwrap();
        lm.release(t1, pid(0));
        assert!(!lm.holds(t1, pid(0)));
    }

    #[test]
    fn sole_reader_upgrades_in_place() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();
        lm.acquire(t1, pid(0), LockMode::Shared).unwrap();
        lm.acquire(t1, pid(0), LockMode::Exclusive).unwrap();
        assert!(lm.holds(t1, pid(0)));
        assert_eq!(lm.exclusive_pages_of(t1).len(), 1);
        // The shared entry was swapped out, not left behind.
        assert!(lm.state.lock().shared.get(&pid(0)).is_none());
    }

    #[test]
    fn exclusive_holder_reacquires_either_mode() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();
        lm.acquire(t1, pid(0), LockMode::Exclusive).unwrap();
        lm.acquire(t1, pid(0), LockMode::Shared).unwrap();
        lm.acquire(t1, pid(0), LockMode::Exclusive).unwrap();
        assert_eq!(lm.exclusive_pages_of(t1).len(), 1);
    }

    #[test]
    fn release_all_clears_every_trace() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();
        lm.acquire(t1, pid(0), LockMode::Shared).unwrap();
        lm.acquire(t1, pid(1), LockMode::Exclusive).unwrap();
        lm.release_all(t1);
        assert!(!lm.holds(t1, pid(0)));
        assert!(!lm.holds(t1, pid(1)));
        assert!(lm.exclusive_pages_of(t1).is_empty());
    }

    #[test]
    fn crossed_upgrades_abort_exactly_one() {
        let lm = Arc::new(LockManager::new());
        let (t1, t2) = (TransactionId::new(), TransactionId::new());
        lm.acquire(t1, pid(0), LockMode::Shared).unwrap();
        lm.acquire(t2, pid(1), LockMode::Shared).unwrap();

        let lm1 = Arc::clone(&lm);
        let a = std::thread::spawn(move || {
            let result = lm1.acquire(t1, pid(1), LockMode::Exclusive);
            if result.is_err() {
                lm1.release_all(t1);
            }
            result.is_err()
        });
        let lm2 = Arc::clone(&lm);
        let b = std::thread::spawn(move || {
            let result = lm2.acquire(t2, pid(0), LockMode::Exclusive);
            if result.is_err() {
                lm2.release_all(t2);
            }
            result.is_err()
        });

        let aborted = [a.join().unwrap(), b.join().unwrap()];
        assert_eq!(aborted.iter().filter(|&&x| x).count(), 1);
    }
}
