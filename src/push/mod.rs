//! Push processing.
//!
//! - [`parse_envelope`]: structural and version checks on the raw body
//! - [`PushProcessor`]: drives each mutation through the ledger protocol
//! - [`classify`]: maps failures to batch and ledger policy
//! - [`PushResponse`]: the wire response

mod error;
mod processor;
mod request;
mod response;

pub use error::{
    classify, Classification, Disposition, ErrorKind, FailureReason, LedgerEffect, MutationError,
    MutationErrorCode,
};
pub use processor::PushProcessor;
pub use request::{parse_envelope, MutationId, MutationRequest, PushRequest};
pub use response::{
    FailureKind, FailureOrigin, MutationResponse, MutationResult, PushFailure, PushOk,
    PushResponse,
};
