use crate::errors::ServiceError;
use crate::models::{VerificationRecord, VerificationResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use zk_proofs::PredicateFamily;

/// Latest result per (identity, family) plus submission timestamps.
#[derive(Clone, Default)]
pub struct ResultStore {
    inner: Arc<RwLock<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    results: HashMap<(String, PredicateFamily), VerificationResult>,
    submitted_at: HashMap<(String, PredicateFamily), DateTime<Utc>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_submission(&self, identity: &str, family: PredicateFamily, at: DateTime<Utc>) {
        self.inner.write().await.submitted_at.insert((identity.to_string(), family), at);
    }

    pub async fn record_result(&self, identity: &str, family: PredicateFamily, result: VerificationResult) {
        self.inner.write().await.results.insert((identity.to_string(), family), result);
    }

    pub async fn latest(&self, identity: &str, family: PredicateFamily) -> Option<VerificationResult> {
        self.inner.read().await.results.get(&(identity.to_string(), family)).cloned()
    }

    pub async fn submitted_at(&self, identity: &str, family: PredicateFamily) -> Option<DateTime<Utc>> {
        self.inner.read().await.submitted_at.get(&(identity.to_string(), family)).copied()
    }
}

/// Hex SHA-256 of the aggregation receipt, or of the statement id when there is none.
pub fn receipt_hash(result: &VerificationResult) -> String {
    let material = match (&result.aggregation, &result.statement) {
        (Some(agg), _) => agg.receipt.as_str(),
        (None, Some(statement)) => statement.as_str(),
        (None, None) => "",
    };
    hex::encode(Sha256::digest(material.as_bytes()))
}

/// Destination for verification history.
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn record(&self, record: &VerificationRecord) -> Result<(), ServiceError>;
}

#[derive(Clone, Default)]
pub struct MemoryHistory {
    records: Arc<Mutex<Vec<VerificationRecord>>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<VerificationRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl HistorySink for MemoryHistory {
    async fn record(&self, record: &VerificationRecord) -> Result<(), ServiceError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AggregationProof;

    fn result(statement: &str) -> VerificationResult {
        VerificationResult {
            verified: true,
            result: 1,
            statement: Some(statement.to_string()),
            block_hash: None,
            aggregation: None,
            pending: None,
        }
    }

    #[tokio::test]
    async fn keeps_latest_per_identity_and_family() {
        let store = ResultStore::new();
        store.record_result("A", PredicateFamily::Cibil, result("s1")).await;
        store.record_result("A", PredicateFamily::Cibil, result("s2")).await;
        store.record_result("A", PredicateFamily::Fraud, result("s3")).await;

        let latest = store.latest("A", PredicateFamily::Cibil).await.unwrap();
        assert_eq!(latest.statement.as_deref(), Some("s2"));
        assert!(store.latest("B", PredicateFamily::Cibil).await.is_none());

        let now = Utc::now();
        store.record_submission("A", PredicateFamily::Budget, now).await;
        assert_eq!(store.submitted_at("A", PredicateFamily::Budget).await, Some(now));
    }

    #[test]
    fn receipt_hash_prefers_aggregation_receipt() {
        let mut r = result("stmt");
        let by_statement = receipt_hash(&r);
        assert_eq!(by_statement, hex::encode(Sha256::digest(b"stmt")));

        r.aggregation = Some(AggregationProof {
            domain_id: 1,
            aggregation_id: 2,
            receipt: "rcpt".to_string(),
            root: "rcpt".to_string(),
            path: vec![],
            leaf_index: 0,
            number_of_leaves: 1,
        });
        assert_eq!(receipt_hash(&r), hex::encode(Sha256::digest(b"rcpt")));
        assert_eq!(receipt_hash(&r).len(), 64);
    }
}
