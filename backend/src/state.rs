use crate::config::BackendConfig;
use crate::dataset::DatasetRegistry;
use crate::errors::ServiceError;
use crate::prover::ProverPool;
use crate::store::ResultStore;
use crate::tree_cache::TreeCache;
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;
use zk_proofs::artifacts::{generate_artifacts, load_artifacts, ProvingArtifacts};
use zk_proofs::{CommittedDataset, PredicateFamily};

#[derive(Clone)]
pub struct AppState {
    pub artifacts_dir: PathBuf,
    pub depth: usize,
    pub datasets: DatasetRegistry,
    pub trees: TreeCache,
    pub prover: ProverPool,
    pub results: ResultStore,
    artifacts: Arc<HashMap<PredicateFamily, OnceCell<ProvingArtifacts>>>,
}

impl AppState {
    pub fn new(artifacts_dir: PathBuf, depth: usize, max_concurrent_proofs: usize) -> Self {
        Self {
            artifacts_dir,
            depth,
            datasets: DatasetRegistry::new(),
            trees: TreeCache::new(),
            prover: ProverPool::new(max_concurrent_proofs),
            results: ResultStore::new(),
            artifacts: Arc::new(PredicateFamily::ALL.iter().map(|f| (*f, OnceCell::new())).collect()),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.artifacts_dir.clone(), config.tree_depth, config.max_concurrent_proofs)
    }

    /// Install every dataset file named in `config`.
    pub async fn load_datasets(&self, config: &BackendConfig) -> Result<(), ServiceError> {
        for family in PredicateFamily::ALL {
            if let Some(path) = config.dataset_path(family) {
                self.datasets.load_file(family, path).await?;
            }
        }
        Ok(())
    }

    /// Proving artifacts for `family`, read from disk on first use.
    ///
    /// Missing files are reported, never generated on the fly.
    pub async fn ensure_artifacts(&self, family: PredicateFamily) -> Result<ProvingArtifacts, ServiceError> {
        let cell = self.artifacts.get(&family).ok_or(ServiceError::Internal)?;
        let root = self.artifacts_dir.clone();
        let depth = self.depth;

        cell.get_or_try_init(|| async move {
            let artifacts = tokio::task::spawn_blocking(move || load_artifacts(&root, family, depth))
                .await
                .map_err(|_| ServiceError::Internal)??;
            info!(%family, depth, "proving artifacts loaded");
            Ok::<ProvingArtifacts, ServiceError>(artifacts)
        })
        .await
        .cloned()
    }

    /// Run the development setup for `family` and write the keys under `artifacts_dir`.
    ///
    /// IMPORTANT: single-party randomness; real deployments need a ceremony.
    pub async fn generate_artifacts(&self, family: PredicateFamily) -> Result<ProvingArtifacts, ServiceError> {
        let root = self.artifacts_dir.clone();
        let depth = self.depth;
        let artifacts = tokio::task::spawn_blocking(move || {
            let mut rng = OsRng;
            generate_artifacts(&root, family, depth, &mut rng)
        })
        .await
        .map_err(|_| ServiceError::Internal)??;

        info!(%family, depth, dir = %self.artifacts_dir.display(), "proving artifacts generated");
        Ok(artifacts)
    }

    /// Committed tree for the family's current dataset.
    pub async fn committed(&self, family: PredicateFamily) -> Result<Arc<CommittedDataset>, ServiceError> {
        let snapshot = self.datasets.snapshot(family).await?;
        self.trees.get_or_build(&snapshot, self.depth).await
    }
}
