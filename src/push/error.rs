//! Mutation error taxonomy and classification.
//!
//! Every failure the processor can observe is a [`MutationError`]. What the
//! processor does with it (report it on the mutation, abort the batch, move
//! the ledger) is decided by [`classify`], a pure function of the error and
//! the phase the mutation had reached.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mutation::Phase;
use crate::storage::StorageError;

/// Errors produced while processing a push.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MutationError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported push version: received {received:?}, supported {supported}")]
    UnsupportedPushVersion { received: Option<i64>, supported: u32 },

    #[error("Mutation not found: {name}")]
    MutationNotFound { name: String },

    #[error("Validation failed for mutation {name}")]
    Validation { name: String, messages: Vec<String> },

    #[error(
        "Ignoring mutation from {client_id} with ID {received} as it was already processed. \
         Last applied: {last_applied}"
    )]
    AlreadyProcessed {
        client_id: String,
        received: i64,
        last_applied: i64,
    },

    #[error("Client {client_id} sent mutation ID {received} but expected {expected}")]
    OutOfOrder {
        client_id: String,
        received: i64,
        expected: i64,
    },

    #[error("{message}")]
    App {
        message: String,
        details: Option<Value>,
    },

    #[error("Mutation {name} uses manual transactions but never called transact")]
    TransactNotCalled { name: String },

    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl MutationError {
    /// Application error raised by handler code.
    pub fn app(message: impl Into<String>) -> Self {
        MutationError::App {
            message: message.into(),
            details: None,
        }
    }

    /// Application error with a structured `details` payload.
    pub fn app_with_details(message: impl Into<String>, details: Value) -> Self {
        MutationError::App {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Taxonomy discriminant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MutationError::Parse(_) => ErrorKind::Parse,
            MutationError::UnsupportedPushVersion { .. } => ErrorKind::UnsupportedPushVersion,
            MutationError::MutationNotFound { .. } => ErrorKind::MutationNotFound,
            MutationError::Validation { .. } => ErrorKind::Validation,
            MutationError::AlreadyProcessed { .. } => ErrorKind::AlreadyProcessed,
            MutationError::OutOfOrder { .. } => ErrorKind::OutOfOrder,
            MutationError::App { .. } => ErrorKind::App,
            MutationError::TransactNotCalled { .. } => ErrorKind::TransactNotCalled,
            MutationError::Transaction(_) => ErrorKind::Transaction,
        }
    }

    /// The `details` field reported to the client, if any.
    pub fn details(&self) -> Option<Value> {
        match self {
            MutationError::Validation { messages, .. } => {
                Some(serde_json::json!({ "messages": messages }))
            }
            // Clients predating structured details expect a plain string here.
            MutationError::AlreadyProcessed { .. } => Some(Value::String(self.to_string())),
            MutationError::App { details, .. } => details.clone(),
            _ => None,
        }
    }
}

impl From<StorageError> for MutationError {
    fn from(err: StorageError) -> Self {
        MutationError::Transaction(err.to_string())
    }
}

impl From<serde_json::Error> for MutationError {
    fn from(err: serde_json::Error) -> Self {
        MutationError::app(format!("Invalid arguments: {err}"))
    }
}

/// Closed set of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    UnsupportedPushVersion,
    MutationNotFound,
    Validation,
    AlreadyProcessed,
    OutOfOrder,
    App,
    TransactNotCalled,
    Transaction,
}

/// Error code carried by a per-mutation error result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationErrorCode {
    App,
    AlreadyProcessed,
}

/// Reason carried by a batch-terminating push failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    Parse,
    UnsupportedPushVersion,
    OooMutation,
    Database,
}

/// What happens to the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Record an error result for this mutation and continue with the next.
    Report(MutationErrorCode),
    /// Stop; this mutation and all after it are returned as unprocessed.
    AbortBatch(FailureReason),
}

/// What happens to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEffect {
    /// Nothing was committed and nothing more is written.
    Unchanged,
    /// Advance the ledger in a fresh, increment-only transaction so the
    /// client does not resubmit a mutation that will fail the same way.
    AdvanceSeparately,
    /// The failing code ran after commit; the ledger already moved.
    AlreadyAdvanced,
}

/// Outcome of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub disposition: Disposition,
    pub ledger: LedgerEffect,
}

impl Classification {
    pub fn aborts_batch(&self) -> bool {
        matches!(self.disposition, Disposition::AbortBatch(_))
    }
}

/// Map an error to its batch and ledger policy.
///
/// `phase` is `None` when the mutation failed before its handler was
/// invoked (lookup or argument validation), otherwise the phase reached
/// when the error surfaced.
pub fn classify(kind: ErrorKind, phase: Option<Phase>) -> Classification {
    use Disposition::{AbortBatch, Report};

    let (disposition, ledger) = match kind {
        // Envelope-level reasons; raised by a handler they are a transaction failure.
        ErrorKind::Parse | ErrorKind::UnsupportedPushVersion if phase.is_some() => {
            (AbortBatch(FailureReason::Database), LedgerEffect::Unchanged)
        }
        ErrorKind::Parse => (AbortBatch(FailureReason::Parse), LedgerEffect::Unchanged),
        ErrorKind::UnsupportedPushVersion => (
            AbortBatch(FailureReason::UnsupportedPushVersion),
            LedgerEffect::Unchanged,
        ),
        ErrorKind::OutOfOrder => (
            AbortBatch(FailureReason::OooMutation),
            LedgerEffect::Unchanged,
        ),
        ErrorKind::Transaction => (AbortBatch(FailureReason::Database), LedgerEffect::Unchanged),
        ErrorKind::AlreadyProcessed => (
            Report(MutationErrorCode::AlreadyProcessed),
            LedgerEffect::Unchanged,
        ),
        ErrorKind::TransactNotCalled => {
            (Report(MutationErrorCode::App), LedgerEffect::Unchanged)
        }
        ErrorKind::MutationNotFound | ErrorKind::Validation | ErrorKind::App => {
            let ledger = match phase {
                None => LedgerEffect::Unchanged,
                Some(Phase::PreTransaction) | Some(Phase::Transaction) => {
                    LedgerEffect::AdvanceSeparately
                }
                Some(Phase::PostCommit) => LedgerEffect::AlreadyAdvanced,
            };
            (Report(MutationErrorCode::App), ledger)
        }
    };

    Classification {
        disposition,
        ledger,
    }
}
