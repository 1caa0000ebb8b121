//! Mutation handlers and the machinery the processor drives them with.
//!
//! - [`MutationHandler`]: user code bound to a mutation name
//! - [`Transactor`]: phase-tracking gate around the ledger transaction
//! - [`HandlerRegistry`]: name → handler lookup
//! - [`ArgSchema`]: declared arguments, validated with every error collected

mod args;
mod handler;
mod registry;
mod transactor;

pub(crate) use args::json_type;
pub use args::{normalize_args, ArgSchema, ArgType};
pub use handler::{transact_around, HandlerResult, MutationHandler, TransactMode};
pub use registry::{normalize_name, HandlerRegistry};
pub use transactor::{Phase, Transactor};
