use crate::dataset::DatasetSnapshot;
use crate::errors::ServiceError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use zk_proofs::{CommittedDataset, PredicateFamily};

#[derive(Clone)]
struct Published {
    version: u64,
    depth: usize,
    dataset: Arc<CommittedDataset>,
}

/// Latest committed tree per family.
///
/// Readers clone an `Arc` out of the slot and never observe a half-built tree.
/// Builds run on the blocking pool; publishing is a single swap under the write lock
/// and a build for an older dataset version never replaces a newer one.
#[derive(Clone, Default)]
pub struct TreeCache {
    slots: Arc<RwLock<HashMap<PredicateFamily, Published>>>,
    build: Arc<Mutex<()>>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached tree for exactly this dataset version and depth.
    pub async fn get(&self, family: PredicateFamily, version: u64, depth: usize) -> Option<Arc<CommittedDataset>> {
        self.slots
            .read()
            .await
            .get(&family)
            .filter(|p| p.version == version && p.depth == depth)
            .map(|p| p.dataset.clone())
    }

    pub async fn published_version(&self, family: PredicateFamily) -> Option<u64> {
        self.slots.read().await.get(&family).map(|p| p.version)
    }

    pub async fn get_or_build(&self, snapshot: &DatasetSnapshot, depth: usize) -> Result<Arc<CommittedDataset>, ServiceError> {
        if let Some(hit) = self.get(snapshot.family, snapshot.version, depth).await {
            return Ok(hit);
        }

        // One build at a time; re-check in case a concurrent caller just finished ours.
        let _guard = self.build.lock().await;
        if let Some(hit) = self.get(snapshot.family, snapshot.version, depth).await {
            return Ok(hit);
        }

        let family = snapshot.family;
        let records = snapshot.records.as_ref().clone();
        let dataset = tokio::task::spawn_blocking(move || CommittedDataset::commit(family, records, depth))
            .await
            .map_err(|_| ServiceError::Internal)??;
        let dataset = Arc::new(dataset);

        info!(%family, version = snapshot.version, depth, leaves = dataset.len(), "tree built");
        self.publish(family, snapshot.version, depth, dataset.clone()).await;
        Ok(dataset)
    }

    /// Returns false when a newer version was already published.
    pub async fn publish(&self, family: PredicateFamily, version: u64, depth: usize, dataset: Arc<CommittedDataset>) -> bool {
        let mut slots = self.slots.write().await;
        if let Some(current) = slots.get(&family) {
            if current.version > version {
                debug!(%family, stale = version, current = current.version, "discarding stale tree");
                return false;
            }
        }
        slots.insert(family, Published { version, depth, dataset });
        true
    }
}
