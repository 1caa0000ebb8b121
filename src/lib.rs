//! Pushgate - mutation push processing
//!
//! Server side of an optimistic-sync mutation protocol: clients queue
//! mutations with per-client sequence numbers and push them in batches;
//! pushgate applies each exactly once, in order, guarded by a
//! last-mutation-id ledger, and reports structured per-mutation results.

pub mod config;
pub mod mutation;
pub mod push;
pub mod storage;
pub mod utils;

pub use config::{Config, PushConfig};
pub use mutation::{
    HandlerRegistry, HandlerResult, MutationHandler, Phase, TransactMode, Transactor,
};
pub use push::{MutationError, PushProcessor, PushResponse};
pub use storage::{LedgerStore, LedgerTransaction, MemoryLedgerStore, StorageError};
