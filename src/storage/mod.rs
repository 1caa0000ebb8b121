//! Ledger storage.
//!
//! The ledger holds one `last_mutation_id` per `(client_group_id, client_id)`
//! pair. Backends implement [`LedgerStore`]; the push processor is generic
//! over the backend so handler code can reach the concrete transaction type
//! and perform its own writes inside the same transaction as the ledger
//! increment.

pub mod ledger_store;
pub mod memory;

#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod schema;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use crate::config::{PostgresConfig, SqliteConfig, StorageConfig};
pub use ledger_store::{LedgerStore, LedgerTransaction};
pub use memory::{MemoryLedgerStore, MemoryLedgerTransaction};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteLedgerStore, SqliteLedgerTransaction};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresLedgerStore, PostgresLedgerTransaction};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during ledger storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}
