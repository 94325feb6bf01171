use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    txn::{Transaction, TxnState},
    types::{
        FileId, TransactionId,
        error::{DatabaseError, Result},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => write!(f, "S"),
            LockMode::Exclusive => write!(f, "X"),
        }
    }
}

#[derive(Debug, Default)]
struct TableLock {
    shared: HashSet<TransactionId>,
    exclusive: Option<TransactionId>,
}

impl TableLock {
    fn is_free(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_none()
    }
}

/// Table-granularity lock manager with a no-wait policy: a request that
/// conflicts with another transaction aborts the requester instead of
/// queueing, which also rules out deadlock.
#[derive(Debug, Default)]
pub struct LockManager {
    tables: Mutex<HashMap<FileId, TableLock>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_shared_on_table(&self, txn: &Transaction, fd: FileId) -> Result<()> {
        self.check_growing(txn, fd, LockMode::Shared)?;
        let mut tables = self.tables.lock();
        let lock = tables.entry(fd).or_default();
        let exclusive = lock.exclusive;
        match exclusive {
            Some(holder) if holder == txn.id() => return Ok(()),
            Some(holder) => {
                drop(tables);
                return Err(Self::abort(txn, fd, LockMode::Shared, holder));
            }
            None => {}
        }
        if lock.shared.insert(txn.id()) {
            debug!(txn = txn.id(), fd, "granted table S lock");
        }
        txn.record_lock(fd);
        Ok(())
    }

    /// Grants X on the table, upgrading an S lock when this transaction is
    /// the only reader.
    pub fn lock_exclusive_on_table(&self, txn: &Transaction, fd: FileId) -> Result<()> {
        self.check_growing(txn, fd, LockMode::Exclusive)?;
        let mut tables = self.tables.lock();
        let lock = tables.entry(fd).or_default();
        let exclusive = lock.exclusive;
        match exclusive {
            Some(holder) if holder == txn.id() => return Ok(()),
            Some(holder) => {
                drop(tables);
                return Err(Self::abort(txn, fd, LockMode::Exclusive, holder));
            }
            None => {}
        }
        let reader = lock.shared.iter().copied().find(|id| *id != txn.id());
        if let Some(reader) = reader {
            drop(tables);
            return Err(Self::abort(txn, fd, LockMode::Exclusive, reader));
        }
        lock.shared.remove(&txn.id());
        lock.exclusive = Some(txn.id());
        debug!(txn = txn.id(), fd, "granted table X lock");
        txn.record_lock(fd);
        Ok(())
    }

    /// Releases every table lock `txn` holds.
    pub fn release_all(&self, txn: &Transaction) {
        let held = txn.take_locks();
        let mut tables = self.tables.lock();
        for fd in held {
            if let Some(lock) = tables.get_mut(&fd) {
                lock.shared.remove(&txn.id());
                if lock.exclusive == Some(txn.id()) {
                    lock.exclusive = None;
                }
                if lock.is_free() {
                    tables.remove(&fd);
                }
            }
        }
        if txn.state() == TxnState::Growing {
            txn.set_state(TxnState::Shrinking);
        }
    }

    /// Mode held by `txn` on the table, if any.
    pub fn held_mode(&self, txn: &Transaction, fd: FileId) -> Option<LockMode> {
        let tables = self.tables.lock();
        let lock = tables.get(&fd)?;
        if lock.exclusive == Some(txn.id()) {
            Some(LockMode::Exclusive)
        } else if lock.shared.contains(&txn.id()) {
            Some(LockMode::Shared)
        } else {
            None
        }
    }

    fn check_growing(&self, txn: &Transaction, fd: FileId, mode: LockMode) -> Result<()> {
        match txn.state() {
            TxnState::Growing => Ok(()),
            state => Err(DatabaseError::TransactionAborted {
                txn_id: txn.id(),
                reason: format!("cannot acquire {} lock on table {} in state {:?}", mode, fd, state),
            }),
        }
    }

    fn abort(txn: &Transaction, fd: FileId, mode: LockMode, holder: TransactionId) -> DatabaseError {
        txn.set_state(TxnState::Aborted);
        warn!(txn = txn.id(), fd, %mode, holder, "lock conflict, aborting");
        DatabaseError::TransactionAborted {
            txn_id: txn.id(),
            reason: format!("{} lock on table {} conflicts with transaction {}", mode, fd, holder),
        }
    }
}
