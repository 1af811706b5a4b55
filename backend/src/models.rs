use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zk_proofs::PredicateFamily;

/// What an included-but-unresolved verification is still waiting on at timeout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pending {
    Finalization,
    Aggregation,
}

/// Aggregation receipt plus the statement's path inside the aggregate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationProof {
    pub domain_id: u32,
    pub aggregation_id: u64,
    pub receipt: String,
    pub root: String,
    pub path: Vec<String>,
    pub leaf_index: u64,
    pub number_of_leaves: u64,
}

/// Outcome of one attestation session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    /// Disclosed predicate outcome (`public_signals[0]`); only meaningful when `verified`.
    pub result: u8,
    pub statement: Option<String>,
    pub block_hash: Option<String>,
    pub aggregation: Option<AggregationProof>,
    pub pending: Option<Pending>,
}

/// Caller-facing contract of `submit_proof`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub verified: bool,
    pub result: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<Pending>,
}

impl SubmitOutcome {
    pub fn from_result(result: &VerificationResult) -> Self {
        Self {
            verified: result.verified,
            result: result.result,
            error: None,
            statement: result.statement.clone(),
            pending: result.pending,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self { verified: false, result: 0, error: Some(error.to_string()), statement: None, pending: None }
    }
}

/// Row emitted for the verification-history store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub identity: String,
    pub family: PredicateFamily,
    pub timestamp: DateTime<Utc>,
    pub verified: bool,
    pub result: u8,
    pub receipt_hash: String,
}
