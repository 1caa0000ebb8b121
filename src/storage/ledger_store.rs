//! LedgerStore trait definition.

use async_trait::async_trait;

use super::Result;

/// Transactional access to the last-mutation-id ledger.
///
/// The ledger record for a `(client_group_id, client_id)` pair starts at 0
/// (an absent record reads as 0) and only ever moves forward, one step per
/// [`LedgerTransaction::fetch_and_increment`] that commits.
///
/// Implementations:
/// - `MemoryLedgerStore`: in-process ledger for tests and single-node setups
/// - `SqliteLedgerStore`: SQLite storage
/// - `PostgresLedgerStore`: PostgreSQL storage
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Transaction handle produced by [`LedgerStore::begin`].
    ///
    /// Handler code receives `&mut Self::Tx` and performs its own writes
    /// through it, so they commit or roll back together with the ledger
    /// increment.
    type Tx: LedgerTransaction + 'static;

    /// Open a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Read the committed `last_mutation_id`, or 0 when no record exists.
    ///
    /// Inspection only. The push processor never derives a write from this
    /// value.
    async fn last_mutation_id(&self, client_group_id: &str, client_id: &str) -> Result<i64>;
}

/// A single ledger transaction.
///
/// Dropping a transaction without calling [`LedgerTransaction::commit`]
/// discards everything written through it.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Atomically bump the ledger record and return the new value.
    ///
    /// Creates the record at 1 when absent. Concurrent transactions touching
    /// the same pair are serialized by the backend, so a given value is
    /// handed out by at most one committed transaction.
    async fn fetch_and_increment(&mut self, client_group_id: &str, client_id: &str)
        -> Result<i64>;

    /// Make every write in this transaction durable.
    async fn commit(self) -> Result<()>;

    /// Discard every write in this transaction.
    async fn rollback(self) -> Result<()>;
}
