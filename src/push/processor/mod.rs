//! The push processor.
//!
//! Mutations are applied strictly in submission order. Each one is looked
//! up, has its arguments validated, then runs through a [`Transactor`] that
//! claims its id from the ledger. Failures are classified: per-mutation
//! kinds are reported and the loop continues, batch kinds stop it and the
//! remaining mutations are returned to the client as unprocessed.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{
    classify, parse_envelope, Disposition, FailureReason, LedgerEffect, MutationError,
    MutationErrorCode, MutationRequest, MutationResponse, MutationResult, PushFailure, PushOk,
    PushRequest, PushResponse,
};
use crate::config::PushConfig;
use crate::mutation::{
    normalize_args, normalize_name, transact_around, HandlerRegistry, Phase, TransactMode,
    Transactor,
};
use crate::storage::LedgerStore;

/// A failure that ends the batch.
struct BatchAbort {
    reason: FailureReason,
    error: MutationError,
}

/// Applies pushes against a ledger store.
///
/// Holds no per-request state; one processor can serve concurrent pushes.
pub struct PushProcessor<S: LedgerStore> {
    store: Arc<S>,
    registry: Arc<HandlerRegistry<S>>,
    config: PushConfig,
}

impl<S: LedgerStore> Clone for PushProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
        }
    }
}

impl<S: LedgerStore> std::fmt::Debug for PushProcessor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushProcessor")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: LedgerStore> PushProcessor<S> {
    pub fn new(store: Arc<S>, registry: HandlerRegistry<S>, config: PushConfig) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &HandlerRegistry<S> {
        &self.registry
    }

    pub fn config(&self) -> &PushConfig {
        &self.config
    }

    /// Process a raw push body.
    pub async fn process(&self, body: &serde_json::Value) -> PushResponse {
        match parse_envelope(body, self.config.push_version) {
            Ok(request) => self.process_request(&request).await,
            Err(failure) => {
                error!(reason = ?failure.reason, message = %failure.message, "Rejected push");
                PushResponse::Failed(failure)
            }
        }
    }

    /// Process a decoded push.
    #[tracing::instrument(
        name = "push",
        skip_all,
        fields(
            client_group_id = %request.client_group_id,
            request_id = %request.request_id,
            mutations = request.mutations.len()
        )
    )]
    pub async fn process_request(&self, request: &PushRequest) -> PushResponse {
        if request.push_version != i64::from(self.config.push_version) {
            let err = MutationError::UnsupportedPushVersion {
                received: Some(request.push_version),
                supported: self.config.push_version,
            };
            error!(error = %err, "Rejected push");
            return PushResponse::Failed(PushFailure::new(
                FailureReason::UnsupportedPushVersion,
                err.to_string(),
                request.mutations.iter().map(MutationRequest::identity).collect(),
            ));
        }

        let mut results = Vec::with_capacity(request.mutations.len());
        for (index, mutation) in request.mutations.iter().enumerate() {
            match self
                .process_mutation(&request.client_group_id, mutation)
                .await
            {
                Ok(result) => results.push(MutationResponse {
                    id: mutation.identity(),
                    result,
                }),
                Err(abort) => {
                    let unprocessed: Vec<_> = request.mutations[index..]
                        .iter()
                        .map(MutationRequest::identity)
                        .collect();
                    error!(
                        reason = ?abort.reason,
                        error = %abort.error,
                        processed = index,
                        unprocessed = unprocessed.len(),
                        "Push aborted"
                    );
                    return PushResponse::Failed(PushFailure::new(
                        abort.reason,
                        abort.error.to_string(),
                        unprocessed,
                    ));
                }
            }
        }

        let failed = results.iter().filter(|r| r.result.is_error()).count();
        info!(processed = results.len(), failed, "Push processed");
        PushResponse::Ok(PushOk { mutations: results })
    }

    #[tracing::instrument(
        name = "mutation",
        skip_all,
        fields(
            mutation_name = %mutation.name,
            client_id = %mutation.client_id,
            mutation_id = mutation.id
        )
    )]
    async fn process_mutation(
        &self,
        client_group_id: &str,
        mutation: &MutationRequest,
    ) -> Result<MutationResult, BatchAbort> {
        let (outcome, phase) = self.execute(client_group_id, mutation).await;

        let err = match outcome {
            Ok(data) => {
                debug!("Mutation applied");
                return Ok(MutationResult::ok(data));
            }
            Err(err) => err,
        };

        let classification = classify(err.kind(), phase);
        let code = match classification.disposition {
            Disposition::AbortBatch(reason) => return Err(BatchAbort { reason, error: err }),
            Disposition::Report(code) => code,
        };

        match code {
            MutationErrorCode::AlreadyProcessed => info!(error = %err, "Skipped mutation"),
            MutationErrorCode::App => warn!(error = %err, ?phase, "Mutation failed"),
        }

        if classification.ledger == LedgerEffect::AdvanceSeparately {
            if let Err(rejected) = self.advance_ledger(client_group_id, mutation).await {
                info!(error = %rejected, "Skipped mutation");
                return Ok(MutationResult::error(MutationErrorCode::AlreadyProcessed, &rejected));
            }
        }

        Ok(MutationResult::error(code, &err))
    }

    /// Run lookup, validation and the handler.
    ///
    /// Returns the phase the mutation reached, or `None` if the handler was
    /// never invoked.
    async fn execute(
        &self,
        client_group_id: &str,
        mutation: &MutationRequest,
    ) -> (Result<Option<serde_json::Value>, MutationError>, Option<Phase>) {
        let name = normalize_name(&mutation.name);

        let Some(handler) = self.registry.get(&name) else {
            return (Err(MutationError::MutationNotFound { name }), None);
        };

        let args = match handler.validate_args(normalize_args(mutation.args.clone())) {
            Ok(args) => args,
            Err(messages) => return (Err(MutationError::Validation { name, messages }), None),
        };

        let mut transactor = Transactor::new(
            self.store.as_ref(),
            client_group_id,
            &mutation.client_id,
            mutation.id,
        );
        let outcome = match handler.transact_mode() {
            TransactMode::Auto => transact_around(handler.as_ref(), &mut transactor, &args).await,
            TransactMode::Manual => handler.run(&mut transactor, &args).await,
        };
        let outcome = transactor.finish(&name, outcome).await;
        (outcome, Some(transactor.phase()))
    }

    /// Claim the mutation's id in an increment-only transaction.
    ///
    /// Used after an application error so the client does not resubmit a
    /// mutation that will fail the same way. An id the ledger has already
    /// passed is returned so it is reported as such; any other failure is
    /// logged only.
    async fn advance_ledger(
        &self,
        client_group_id: &str,
        mutation: &MutationRequest,
    ) -> Result<(), MutationError> {
        let mut transactor = Transactor::new(
            self.store.as_ref(),
            client_group_id,
            &mutation.client_id,
            mutation.id,
        );

        let begun = transactor.begin().await.map(|_| ());
        let advanced = match begun {
            Ok(()) => transactor.commit().await,
            Err(e) => Err(e),
        };

        match advanced {
            Ok(()) => debug!("Advanced ledger past failed mutation"),
            Err(e @ MutationError::AlreadyProcessed { .. }) => return Err(e),
            Err(e) => warn!(error = %e, "Failed to advance ledger past failed mutation"),
        }
        Ok(())
    }
}
