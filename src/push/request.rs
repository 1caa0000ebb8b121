//! Push envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{FailureReason, MutationError, PushFailure};
use crate::mutation::json_type;

/// Envelope fields that must be present before anything else is looked at.
const REQUIRED_FIELDS: [&str; 4] = ["clientGroupID", "mutations", "timestamp", "requestID"];

/// A batch of mutations from one client group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub push_version: i64,
    #[serde(rename = "clientGroupID")]
    pub client_group_id: String,
    #[serde(rename = "requestID")]
    pub request_id: String,
    pub timestamp: i64,
    pub mutations: Vec<MutationRequest>,
}

/// One queued client mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRequest {
    pub id: i64,
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl MutationRequest {
    pub fn identity(&self) -> MutationId {
        MutationId {
            id: self.id,
            client_id: self.client_id.clone(),
        }
    }
}

/// Identifies a mutation in responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutationId {
    pub id: i64,
    #[serde(rename = "clientID")]
    pub client_id: String,
}

/// Validate and decode a push envelope.
///
/// Structural problems fail with reason `parse` and no mutation ids. A
/// `pushVersion` other than `supported` fails with reason
/// `unsupportedPushVersion`, listing every mutation whose identity is
/// readable.
pub fn parse_envelope(body: &Value, supported: u32) -> Result<PushRequest, PushFailure> {
    let Some(envelope) = body.as_object() else {
        return Err(parse_failure(format!(
            "Push body must be an object, got {}",
            json_type(body)
        )));
    };

    if let Some(missing) = REQUIRED_FIELDS
        .iter()
        .find(|field| !envelope.contains_key(**field))
    {
        return Err(parse_failure(format!("Push body is missing {missing}")));
    }

    let Some(mutations) = envelope.get("mutations").and_then(Value::as_array) else {
        return Err(parse_failure("Push mutations must be an array"));
    };

    let received = envelope.get("pushVersion").and_then(Value::as_i64);
    if received != Some(i64::from(supported)) {
        let err = MutationError::UnsupportedPushVersion {
            received,
            supported,
        };
        return Err(PushFailure::new(
            FailureReason::UnsupportedPushVersion,
            err.to_string(),
            mutations.iter().filter_map(readable_identity).collect(),
        ));
    }

    PushRequest::deserialize(body).map_err(|e| parse_failure(e.to_string()))
}

fn parse_failure(message: impl Into<String>) -> PushFailure {
    let err = MutationError::Parse(message.into());
    PushFailure::new(FailureReason::Parse, err.to_string(), Vec::new())
}

fn readable_identity(mutation: &Value) -> Option<MutationId> {
    Some(MutationId {
        id: mutation.get("id")?.as_i64()?,
        client_id: mutation.get("clientID")?.as_str()?.to_string(),
    })
}
