//! Phase tracking around the ledger transaction.
//!
//! A [`Transactor`] is created per mutation. It starts in
//! [`Phase::PreTransaction`]; [`Transactor::begin`] moves it to
//! [`Phase::Transaction`], claims the mutation's id from the ledger and hands
//! out the open transaction; [`Transactor::commit`] moves it to
//! [`Phase::PostCommit`]. Phases never move backwards.

use serde_json::Value;
use tracing::{debug, warn};

use crate::push::MutationError;
use crate::storage::{LedgerStore, LedgerTransaction};
use crate::utils::sequence_validator::{validate_mutation_id, SequenceValidationResult};

/// Where a mutation is relative to its ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing committed; the transaction has not been opened.
    PreTransaction,
    /// The transaction is (or was) open; nothing committed yet.
    Transaction,
    /// The ledger increment and handler writes are committed.
    PostCommit,
}

/// Gate between a handler and the ledger store for one mutation.
pub struct Transactor<'a, S: LedgerStore> {
    store: &'a S,
    client_group_id: &'a str,
    client_id: &'a str,
    mutation_id: i64,
    phase: Phase,
    tx: Option<S::Tx>,
    failure: Option<MutationError>,
}

impl<'a, S: LedgerStore> Transactor<'a, S> {
    pub(crate) fn new(
        store: &'a S,
        client_group_id: &'a str,
        client_id: &'a str,
        mutation_id: i64,
    ) -> Self {
        Self {
            store,
            client_group_id,
            client_id,
            mutation_id,
            phase: Phase::PreTransaction,
            tx: None,
            failure: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Client that sent the mutation.
    pub fn client_id(&self) -> &str {
        self.client_id
    }

    /// Client group the push belongs to.
    pub fn client_group_id(&self) -> &str {
        self.client_group_id
    }

    /// The request's mutation id.
    pub fn mutation_id(&self) -> i64 {
        self.mutation_id
    }

    /// Open the transaction and claim this mutation's id.
    ///
    /// May be called once. Fails with `AlreadyProcessed` or `OutOfOrder`
    /// when the ledger disagrees with the request id; the transaction is
    /// rolled back before returning.
    pub async fn begin(&mut self) -> Result<&mut S::Tx, MutationError> {
        if self.phase != Phase::PreTransaction {
            return Err(MutationError::app(format!(
                "transact called more than once for mutation {} from {}",
                self.mutation_id, self.client_id
            )));
        }
        self.phase = Phase::Transaction;

        let mut tx = match self.store.begin().await {
            Ok(tx) => tx,
            Err(e) => return Err(self.fail(e.into())),
        };

        let next = match tx
            .fetch_and_increment(self.client_group_id, self.client_id)
            .await
        {
            Ok(next) => next,
            Err(e) => {
                discard(tx).await;
                return Err(self.fail(e.into()));
            }
        };

        let rejection = match validate_mutation_id(self.mutation_id, next) {
            SequenceValidationResult::Valid => None,
            SequenceValidationResult::AlreadyProcessed { last_applied } => {
                Some(MutationError::AlreadyProcessed {
                    client_id: self.client_id.to_string(),
                    received: self.mutation_id,
                    last_applied,
                })
            }
            SequenceValidationResult::OutOfOrder { expected } => Some(MutationError::OutOfOrder {
                client_id: self.client_id.to_string(),
                received: self.mutation_id,
                expected,
            }),
        };

        if let Some(err) = rejection {
            discard(tx).await;
            return Err(self.fail(err));
        }

        debug!(
            client_id = %self.client_id,
            mutation_id = self.mutation_id,
            "Claimed mutation id"
        );
        Ok(self.tx.insert(tx))
    }

    /// The open transaction, if [`Transactor::begin`] succeeded and no
    /// commit has happened yet.
    pub fn tx(&mut self) -> Option<&mut S::Tx> {
        self.tx.as_mut()
    }

    /// Commit the open transaction.
    pub async fn commit(&mut self) -> Result<(), MutationError> {
        let tx = self.tx.take().ok_or_else(|| {
            MutationError::app(format!(
                "commit without an open transaction for mutation {} from {}",
                self.mutation_id, self.client_id
            ))
        })?;

        if let Err(e) = tx.commit().await {
            return Err(self.fail(e.into()));
        }
        self.phase = Phase::PostCommit;
        Ok(())
    }

    /// Settle the transaction after the handler returned.
    ///
    /// A ledger or storage failure seen by [`Transactor::begin`] or
    /// [`Transactor::commit`] wins over whatever the handler returned, so a
    /// handler cannot mask it. A transaction left open is committed on
    /// success and rolled back on error. A handler that returned success
    /// without ever opening the transaction is reported as
    /// `TransactNotCalled`.
    pub(crate) async fn finish(
        &mut self,
        name: &str,
        outcome: Result<Option<Value>, MutationError>,
    ) -> Result<Option<Value>, MutationError> {
        if let Some(failure) = self.failure.take() {
            if let Some(tx) = self.tx.take() {
                discard(tx).await;
            }
            return Err(failure);
        }

        match outcome {
            Ok(data) => {
                if self.tx.is_some() {
                    self.commit().await?;
                }
                if self.phase == Phase::PreTransaction {
                    return Err(MutationError::TransactNotCalled {
                        name: name.to_string(),
                    });
                }
                Ok(data)
            }
            Err(err) => {
                if let Some(tx) = self.tx.take() {
                    discard(tx).await;
                }
                Err(err)
            }
        }
    }

    fn fail(&mut self, err: MutationError) -> MutationError {
        self.failure = Some(err.clone());
        err
    }
}

/// Roll back a transaction whose outcome is already decided.
async fn discard<T: LedgerTransaction>(tx: T) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "Rollback failed");
    }
}
