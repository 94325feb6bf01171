//! Transactions as seen by the executors: an id, a 2PL phase, and the table
//! locks held so far. Commit and rollback live outside this crate.

pub mod lock_manager;

use std::{collections::HashSet, sync::Arc};

use parking_lot::Mutex;

use crate::types::{FileId, TransactionId};

pub use lock_manager::{LockManager, LockMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    Growing,
    Shrinking,
    Committed,
    Aborted,
}

#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: Mutex<TxnState>,
    lock_set: Mutex<HashSet<FileId>>,
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            state: Mutex::new(TxnState::Growing),
            lock_set: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TxnState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: TxnState) {
        *self.state.lock() = state;
    }

    /// Tables this transaction currently holds a lock on.
    pub fn locked_tables(&self) -> Vec<FileId> {
        let mut fds: Vec<FileId> = self.lock_set.lock().iter().copied().collect();
        fds.sort_unstable();
        fds
    }

    pub(crate) fn record_lock(&self, fd: FileId) {
        self.lock_set.lock().insert(fd);
    }

    pub(crate) fn take_locks(&self) -> HashSet<FileId> {
        std::mem::take(&mut *self.lock_set.lock())
    }
}

/// What an executor needs from the surrounding statement: the lock manager
/// and the transaction it runs under.
#[derive(Debug, Clone)]
pub struct Context {
    pub lock_mgr: Arc<LockManager>,
    pub txn: Arc<Transaction>,
}

impl Context {
    pub fn new(lock_mgr: Arc<LockManager>, txn: Arc<Transaction>) -> Self {
        Self { lock_mgr, txn }
    }
}
