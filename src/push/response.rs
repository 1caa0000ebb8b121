//! Push response shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{FailureReason, MutationError, MutationErrorCode, MutationId};

/// Result of processing a push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PushResponse {
    Failed(PushFailure),
    Ok(PushOk),
}

impl PushResponse {
    pub fn is_ok(&self) -> bool {
        matches!(self, PushResponse::Ok(_))
    }

    /// Serialize to the wire representation.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Per-mutation results, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushOk {
    pub mutations: Vec<MutationResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResponse {
    pub id: MutationId,
    pub result: MutationResult,
}

/// Outcome of a single mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MutationResult {
    Error {
        error: MutationErrorCode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
    Ok {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
}

impl MutationResult {
    pub fn ok(data: Option<Value>) -> Self {
        MutationResult::Ok { data }
    }

    /// Error result reporting `err` under `code`.
    pub fn error(code: MutationErrorCode, err: &MutationError) -> Self {
        MutationResult::Error {
            error: code,
            message: Some(err.to_string()),
            details: err.details(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, MutationResult::Error { .. })
    }

    pub fn error_code(&self) -> Option<MutationErrorCode> {
        match self {
            MutationResult::Error { error, .. } => Some(*error),
            MutationResult::Ok { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    PushFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureOrigin {
    Server,
}

/// Batch-terminating failure.
///
/// `mutation_ids` lists the mutations the client must keep queued: the one
/// that failed and every one after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushFailure {
    pub kind: FailureKind,
    pub origin: FailureOrigin,
    pub reason: FailureReason,
    pub message: String,
    #[serde(rename = "mutationIDs")]
    pub mutation_ids: Vec<MutationId>,
}

impl PushFailure {
    pub fn new(
        reason: FailureReason,
        message: impl Into<String>,
        mutation_ids: Vec<MutationId>,
    ) -> Self {
        Self {
            kind: FailureKind::PushFailed,
            origin: FailureOrigin::Server,
            reason,
            message: message.into(),
            mutation_ids,
        }
    }
}
