use crate::errors::ServiceError;
use rand::rngs::OsRng;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;
use zk_proofs::artifacts::ProvingArtifacts;
use zk_proofs::{CircuitInput, ProofBundle};

/// Bounded pool for CPU-heavy proof generation.
///
/// Proving runs on tokio's blocking threads; the permit travels with the blocking
/// task so it is released only when the work actually ends.
#[derive(Clone)]
pub struct ProverPool {
    permits: Arc<Semaphore>,
}

impl ProverPool {
    pub fn new(max_concurrent: usize) -> Self {
        Self { permits: Arc::new(Semaphore::new(max_concurrent.max(1))) }
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn prove(&self, input: CircuitInput, artifacts: &ProvingArtifacts) -> Result<ProofBundle, ServiceError> {
        let permit = self.permits.clone().acquire_owned().await.map_err(|_| ServiceError::Internal)?;
        let pk = artifacts.pk.clone();
        let family = input.family();
        debug!(%family, "proving");

        let bundle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let mut rng = OsRng;
            zk_proofs::groth16::prove(input, &pk, &mut rng)
        })
        .await
        .map_err(|_| ServiceError::Internal)??;

        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use zk_proofs::artifacts::generate_artifacts;
    use zk_proofs::verifier::verify_bundle;
    use zk_proofs::{CommittedDataset, PredicateFamily, PredicateParams, Record};

    #[tokio::test]
    async fn proves_off_the_runtime_and_releases_permits() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let artifacts = generate_artifacts(dir.path(), PredicateFamily::Cibil, 3, &mut rng).unwrap();

        let set = CommittedDataset::commit(PredicateFamily::Cibil, vec![Record::score("A", 720)], 3).unwrap();
        let input = CircuitInput::assemble(&set, "A", &PredicateParams::Cibil { threshold: 700 }).unwrap();

        let pool = ProverPool::new(1);
        let bundle = pool.prove(input, &artifacts).await.unwrap();
        assert_eq!(bundle.result().unwrap(), 1);
        assert!(verify_bundle(&artifacts.vk, &bundle).unwrap());
        assert_eq!(pool.available(), 1);
    }
}
