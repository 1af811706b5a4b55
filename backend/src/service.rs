use crate::errors::ServiceError;
use crate::models::{SubmitOutcome, VerificationRecord, VerificationResult};
use crate::orchestrator::Orchestrator;
use crate::state::AppState;
use crate::store::{receipt_hash, HistorySink};
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use zk_proofs::artifacts::ProvingArtifacts;
use zk_proofs::verifier::verify_bundle;
use zk_proofs::{CircuitInput, PredicateParams, ProofBundle, ZkError};

/// Entry point: prove a predicate about one identity and have it attested.
#[derive(Clone)]
pub struct ThresholdService {
    state: AppState,
    orchestrator: Orchestrator,
    history: Arc<dyn HistorySink>,
    local_check: bool,
}

impl ThresholdService {
    pub fn new(state: AppState, orchestrator: Orchestrator, history: Arc<dyn HistorySink>) -> Self {
        Self { state, orchestrator, history, local_check: true }
    }

    /// Toggle the local verification gate run before anything is submitted.
    pub fn with_local_check(mut self, enabled: bool) -> Self {
        self.local_check = enabled;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Generate a proof for `identity` without touching the network.
    pub async fn generate_proof(
        &self,
        identity: &str,
        params: &PredicateParams,
    ) -> Result<(ProofBundle, ProvingArtifacts), ServiceError> {
        if identity.is_empty() {
            return Err(ServiceError::InvalidRequest("identity must not be empty".to_string()));
        }
        let family = params.family();
        let dataset = self.state.committed(family).await?;
        let input = CircuitInput::assemble(&dataset, identity, params)?;
        let artifacts = self.state.ensure_artifacts(family).await?;
        let bundle = self.state.prover.prove(input, &artifacts).await?;

        if self.local_check {
            let vk = artifacts.vk.clone();
            let checked = bundle.clone();
            let ok = tokio::task::spawn_blocking(move || verify_bundle(&vk, &checked))
                .await
                .map_err(|_| ServiceError::Internal)??;
            if !ok {
                return Err(ZkError::ProofGenerationFailed("proof failed local verification".to_string()).into());
            }
        }

        Ok((bundle, artifacts))
    }

    pub async fn submit_proof(&self, identity: &str, params: PredicateParams) -> SubmitOutcome {
        self.submit_proof_with_cancel(identity, params, CancellationToken::new()).await
    }

    /// Like [`submit_proof`](Self::submit_proof) but abandoned as soon as `cancel` fires.
    pub async fn submit_proof_with_cancel(
        &self,
        identity: &str,
        params: PredicateParams,
        cancel: CancellationToken,
    ) -> SubmitOutcome {
        let family = params.family();
        match self.try_submit(identity, &params, cancel).await {
            Ok(result) => SubmitOutcome::from_result(&result),
            Err(e) => {
                warn!(%family, error = %e, category = ?e.category(), "submission failed");
                SubmitOutcome::failed(e)
            }
        }
    }

    pub async fn try_submit(
        &self,
        identity: &str,
        params: &PredicateParams,
        cancel: CancellationToken,
    ) -> Result<VerificationResult, ServiceError> {
        if !self.orchestrator.has_credentials() {
            return Err(ServiceError::SeedCredentialMissing);
        }
        let family = params.family();

        let (bundle, artifacts) = tokio::select! {
            _ = cancel.cancelled() => return Err(ServiceError::Cancelled),
            generated = self.generate_proof(identity, params) => generated?,
        };

        self.state.results.record_submission(identity, family, Utc::now()).await;
        let result = self.orchestrator.verify(&bundle, &artifacts.vk, cancel).await?;
        self.state.results.record_result(identity, family, result.clone()).await;

        let record = VerificationRecord {
            identity: identity.to_string(),
            family,
            timestamp: Utc::now(),
            verified: result.verified,
            result: result.result,
            receipt_hash: receipt_hash(&result),
        };
        if let Err(e) = self.history.record(&record).await {
            warn!(%family, error = %e, "history write failed");
        }

        info!(%family, verified = result.verified, "submission complete");
        Ok(result)
    }
}
