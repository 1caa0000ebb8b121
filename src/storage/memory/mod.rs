//! In-memory ledger store.
//!
//! A transaction takes the store lock for its whole lifetime, so transactions
//! run one at a time (serializable). Writes are staged in the transaction and
//! only published on commit.
//!
//! Besides the ledger itself the store keeps a small row area
//! (`table`, `key`) → JSON value that handler code can write through the
//! transaction. It lets tests and single-node deployments observe that
//! handler side effects commit and roll back together with the ledger.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LedgerStore, LedgerTransaction, Result, StorageError};

/// Key type for ledger records: (client_group_id, client_id).
type LedgerKey = (String, String);

/// Key type for handler rows: (table, key).
type RowKey = (String, String);

#[derive(Debug, Default)]
struct MemoryState {
    lmids: HashMap<LedgerKey, i64>,
    rows: HashMap<RowKey, Value>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_on_begin: AtomicBool,
    fail_on_increment: AtomicBool,
    fail_on_commit: AtomicBool,
}

/// In-memory ledger store.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Faults>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a ledger record directly, bypassing the increment path.
    pub async fn set_last_mutation_id(&self, client_group_id: &str, client_id: &str, value: i64) {
        self.state
            .lock()
            .await
            .lmids
            .insert((client_group_id.to_string(), client_id.to_string()), value);
    }

    /// Read a committed handler row.
    pub async fn row(&self, table: &str, key: &str) -> Option<Value> {
        self.state
            .lock()
            .await
            .rows
            .get(&(table.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of committed rows in a table.
    pub async fn row_count(&self, table: &str) -> usize {
        self.state
            .lock()
            .await
            .rows
            .keys()
            .filter(|(t, _)| t == table)
            .count()
    }

    pub fn set_fail_on_begin(&self, fail: bool) {
        self.faults.fail_on_begin.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_on_increment(&self, fail: bool) {
        self.faults.fail_on_increment.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_on_commit(&self, fail: bool) {
        self.faults.fail_on_commit.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryLedgerTransaction;

    async fn begin(&self) -> Result<MemoryLedgerTransaction> {
        if self.faults.fail_on_begin.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("begin refused".to_string()));
        }
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(MemoryLedgerTransaction {
            guard,
            faults: Arc::clone(&self.faults),
            staged_lmids: HashMap::new(),
            staged_rows: HashMap::new(),
        })
    }

    async fn last_mutation_id(&self, client_group_id: &str, client_id: &str) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state
            .lmids
            .get(&(client_group_id.to_string(), client_id.to_string()))
            .copied()
            .unwrap_or(0))
    }
}

/// Transaction over a [`MemoryLedgerStore`].
///
/// Holds the store lock until committed, rolled back or dropped.
pub struct MemoryLedgerTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    faults: Arc<Faults>,
    staged_lmids: HashMap<LedgerKey, i64>,
    staged_rows: HashMap<RowKey, Value>,
}

impl MemoryLedgerTransaction {
    /// Write a handler row inside this transaction.
    pub fn put(&mut self, table: &str, key: &str, value: Value) {
        self.staged_rows
            .insert((table.to_string(), key.to_string()), value);
    }

    /// Read a handler row as seen by this transaction.
    pub fn get(&self, table: &str, key: &str) -> Option<&Value> {
        let key = (table.to_string(), key.to_string());
        self.staged_rows
            .get(&key)
            .or_else(|| self.guard.rows.get(&key))
    }
}

impl std::fmt::Debug for MemoryLedgerTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLedgerTransaction")
            .field("staged_lmids", &self.staged_lmids)
            .field("staged_rows", &self.staged_rows.len())
            .finish()
    }
}

#[async_trait]
impl LedgerTransaction for MemoryLedgerTransaction {
    async fn fetch_and_increment(&mut self, client_group_id: &str, client_id: &str) -> Result<i64> {
        if self.faults.fail_on_increment.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("increment refused".to_string()));
        }
        let key = (client_group_id.to_string(), client_id.to_string());
        let current = self
            .staged_lmids
            .get(&key)
            .or_else(|| self.guard.lmids.get(&key))
            .copied()
            .unwrap_or(0);
        let next = current.checked_add(1).ok_or_else(|| {
            StorageError::Unavailable(format!(
                "last mutation ID for {client_id} is at its maximum"
            ))
        })?;
        self.staged_lmids.insert(key, next);
        Ok(next)
    }

    async fn commit(mut self) -> Result<()> {
        if self.faults.fail_on_commit.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("commit refused".to_string()));
        }
        let lmids = std::mem::take(&mut self.staged_lmids);
        let rows = std::mem::take(&mut self.staged_rows);
        self.guard.lmids.extend(lmids);
        self.guard.rows.extend(rows);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
