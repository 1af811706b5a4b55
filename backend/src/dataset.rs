use crate::errors::ServiceError;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use zk_proofs::constants::SPEND_SLOTS;
use zk_proofs::types::Attribute;
use zk_proofs::{PredicateFamily, Record, ZkError};

/// On-disk row shape shared by all three families.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordRow {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spends: Option<Vec<u32>>,
}

impl RecordRow {
    fn into_record(self, family: PredicateFamily, position: usize) -> Result<Record, ZkError> {
        let invalid = |what: &str| ZkError::InvalidRecord(format!("row {position}: {what}"));
        if self.id.is_empty() {
            return Err(invalid("empty id"));
        }

        match (family, self.score, self.spends) {
            (PredicateFamily::Cibil, Some(score), None) => Ok(Record::score(self.id, score)),
            (PredicateFamily::Budget, None, Some(spends)) => {
                let spends: [u32; SPEND_SLOTS] = spends
                    .try_into()
                    .map_err(|v: Vec<u32>| invalid(&format!("expected {SPEND_SLOTS} spends, got {}", v.len())))?;
                Ok(Record::spends(self.id, spends))
            }
            (PredicateFamily::Fraud, None, None) => Ok(Record::presence(self.id)),
            (family, _, _) => Err(invalid(&format!("attribute shape does not match {family}"))),
        }
    }

    fn from_record(record: &Record) -> Self {
        let (score, spends) = match &record.attribute {
            Attribute::Score(s) => (Some(*s), None),
            Attribute::Spends(s) => (None, Some(s.to_vec())),
            Attribute::None => (None, None),
        };
        Self { id: record.identity.clone(), score, spends }
    }
}

pub fn parse_records(family: PredicateFamily, json: &str) -> Result<Vec<Record>, ServiceError> {
    let rows: Vec<RecordRow> =
        serde_json::from_str(json).map_err(|e| ZkError::InvalidRecord(format!("malformed dataset: {e}")))?;
    let records = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| row.into_record(family, i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

pub fn load_records(family: PredicateFamily, path: &Path) -> Result<Vec<Record>, ServiceError> {
    let json = std::fs::read_to_string(path).map_err(ZkError::from)?;
    parse_records(family, &json)
}

pub fn write_records(path: &Path, records: &[Record]) -> Result<(), ServiceError> {
    let rows: Vec<RecordRow> = records.iter().map(RecordRow::from_record).collect();
    let json = serde_json::to_string_pretty(&rows).map_err(|_| ServiceError::Internal)?;
    std::fs::write(path, json).map_err(ZkError::from)?;
    Ok(())
}

/// Generate one synthetic record.
///
/// Scores fall in the familiar [300, 900] band; spends in [0, 5000) per slot.
fn gen_record(family: PredicateFamily, i: usize, rng: &mut ChaCha20Rng) -> Record {
    let identity = format!("{}_{:05}", family.as_str().to_uppercase(), i);
    match family {
        PredicateFamily::Cibil => Record::score(identity, 300 + u64::from(rng.next_u32() % 601)),
        PredicateFamily::Budget => {
            let mut spends = [0u32; SPEND_SLOTS];
            for s in spends.iter_mut() {
                *s = rng.next_u32() % 5000;
            }
            Record::spends(identity, spends)
        }
        PredicateFamily::Fraud => Record::presence(identity),
    }
}

/// Deterministic synthetic dataset for demos and tests.
pub fn synthetic_records(family: PredicateFamily, count: usize, seed: u64) -> Vec<Record> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    (0..count).map(|i| gen_record(family, i, &mut rng)).collect()
}

/// A loaded dataset at a point in time.
#[derive(Clone, Debug)]
pub struct DatasetSnapshot {
    pub family: PredicateFamily,
    pub version: u64,
    pub records: Arc<Vec<Record>>,
}

impl DatasetSnapshot {
    pub fn index_of(&self, identity: &str) -> Option<usize> {
        self.records.iter().position(|r| r.identity == identity)
    }
}

/// Current dataset per family; every install bumps a process-wide version.
#[derive(Clone, Default)]
pub struct DatasetRegistry {
    slots: Arc<RwLock<HashMap<PredicateFamily, DatasetSnapshot>>>,
    next_version: Arc<AtomicU64>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn install(&self, family: PredicateFamily, records: Vec<Record>) -> u64 {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        let len = records.len();
        let snapshot = DatasetSnapshot { family, version, records: Arc::new(records) };
        self.slots.write().await.insert(family, snapshot);
        info!(%family, version, records = len, "dataset installed");
        version
    }

    pub async fn load_file(&self, family: PredicateFamily, path: &Path) -> Result<u64, ServiceError> {
        let records = load_records(family, path)?;
        Ok(self.install(family, records).await)
    }

    pub async fn snapshot(&self, family: PredicateFamily) -> Result<DatasetSnapshot, ServiceError> {
        self.slots
            .read()
            .await
            .get(&family)
            .cloned()
            .ok_or(ServiceError::DatasetUnavailable(family))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_family() {
        let cibil = parse_records(PredicateFamily::Cibil, r#"[{"id":"A","score":750},{"id":"B","score":610}]"#).unwrap();
        assert_eq!(cibil[0], Record::score("A", 750));

        let budget = parse_records(PredicateFamily::Budget, r#"[{"id":"A","spends":[1,2,3,4,5]}]"#).unwrap();
        assert_eq!(budget[0], Record::spends("A", [1, 2, 3, 4, 5]));

        let fraud = parse_records(PredicateFamily::Fraud, r#"[{"id":"X"}]"#).unwrap();
        assert_eq!(fraud[0], Record::presence("X"));
    }

    #[test]
    fn rejects_bad_rows() {
        for (family, json) in [
            (PredicateFamily::Cibil, r#"[{"id":"","score":1}]"#),
            (PredicateFamily::Cibil, r#"[{"id":"A"}]"#),
            (PredicateFamily::Budget, r#"[{"id":"A","spends":[1,2]}]"#),
            (PredicateFamily::Fraud, r#"[{"id":"A","score":3}]"#),
            (PredicateFamily::Fraud, r#"{"id":"A"}"#),
        ] {
            let err = parse_records(family, json).unwrap_err();
            assert!(matches!(err, ServiceError::Zk(ZkError::InvalidRecord(_))), "{json}");
        }
    }

    #[test]
    fn synthetic_is_deterministic_and_round_trips() {
        let a = synthetic_records(PredicateFamily::Budget, 8, 3);
        assert_eq!(a, synthetic_records(PredicateFamily::Budget, 8, 3));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("budget.json");
        write_records(&path, &a).unwrap();
        assert_eq!(load_records(PredicateFamily::Budget, &path).unwrap(), a);
    }

    #[tokio::test]
    async fn versions_increase_on_reload() {
        let registry = DatasetRegistry::new();
        assert!(matches!(
            registry.snapshot(PredicateFamily::Cibil).await,
            Err(ServiceError::DatasetUnavailable(PredicateFamily::Cibil))
        ));

        let v1 = registry.install(PredicateFamily::Cibil, vec![Record::score("A", 1)]).await;
        let v2 = registry.install(PredicateFamily::Cibil, vec![Record::score("A", 2)]).await;
        assert!(v2 > v1);

        let snap = registry.snapshot(PredicateFamily::Cibil).await.unwrap();
        assert_eq!(snap.version, v2);
        assert_eq!(snap.index_of("A"), Some(0));
        assert_eq!(snap.index_of("B"), None);
    }
}
