//! Mutation handler trait.

use async_trait::async_trait;
use serde_json::Value;

use super::Transactor;
use crate::push::MutationError;
use crate::storage::LedgerStore;

/// Result type for handler code. `Some(data)` is echoed back to the client
/// in the mutation's success result.
pub type HandlerResult = Result<Option<Value>, MutationError>;

/// Who opens the ledger transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactMode {
    /// The processor wraps [`MutationHandler::execute`] in the transaction.
    #[default]
    Auto,
    /// The processor calls [`MutationHandler::run`]; the handler opens the
    /// transaction itself, exactly once, around its side effects.
    Manual,
}

/// User code bound to a mutation name.
///
/// In [`TransactMode::Auto`] only [`MutationHandler::execute`] matters. A
/// handler in [`TransactMode::Manual`] overrides [`MutationHandler::run`] to
/// do work before opening the transaction (pre-transaction phase) and after
/// committing it (post-commit phase):
///
/// ```rust,ignore
/// async fn run(&self, t: &mut Transactor<'_, S>, args: &Value) -> HandlerResult {
///     let quote = fetch_quote(args).await?;          // pre-transaction
///     let tx = t.begin().await?;
///     let data = write_order(tx, &quote).await?;     // transaction
///     t.commit().await?;
///     notify(&data).await?;                          // post-commit
///     Ok(Some(data))
/// }
/// ```
#[async_trait]
pub trait MutationHandler<S: LedgerStore>: Send + Sync {
    fn transact_mode(&self) -> TransactMode {
        TransactMode::Auto
    }

    /// Check and coerce the normalized arguments.
    ///
    /// Return every problem found, not just the first.
    fn validate_args(&self, args: Value) -> Result<Value, Vec<String>> {
        Ok(args)
    }

    /// Transactional body. Runs after the mutation id has been claimed, on
    /// the same transaction; an error rolls back everything written here.
    async fn execute(&self, tx: &mut S::Tx, args: &Value) -> HandlerResult;

    /// Manual-mode entry point.
    async fn run(&self, transactor: &mut Transactor<'_, S>, args: &Value) -> HandlerResult {
        transact_around(self, transactor, args).await
    }
}

/// Open the transaction, run `execute`, commit.
///
/// This is the whole of automatic mode, and the default body of
/// [`MutationHandler::run`].
pub async fn transact_around<S, H>(
    handler: &H,
    transactor: &mut Transactor<'_, S>,
    args: &Value,
) -> HandlerResult
where
    S: LedgerStore,
    H: MutationHandler<S> + ?Sized,
{
    let tx = transactor.begin().await?;
    let data = handler.execute(tx, args).await?;
    transactor.commit().await?;
    Ok(data)
}
