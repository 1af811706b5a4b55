//! Client side of the external attestation network.
//!
//! A session is opened with a seed credential, a proof is submitted and the
//! network answers with a stream of lifecycle events. Aggregation receipts arrive
//! on a separate subscription keyed by domain.

use crate::errors::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use zk_proofs::types::EncodedProofBundle;

/// Seed phrase for the network account; never logged.
#[derive(Clone)]
pub struct Credentials {
    seed: String,
}

impl Credentials {
    pub fn new(seed: impl Into<String>) -> Self {
        Self { seed: seed.into() }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(..)")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofScheme {
    Groth16Bn254,
}

/// One verification request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Submission {
    pub scheme: ProofScheme,
    pub bundle: EncodedProofBundle,
    /// Compressed verifying key, base64.
    pub vk_b64: String,
    pub domain_id: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkEvent {
    IncludedInBlock {
        statement: String,
        block_hash: String,
        /// Assigned when the submission targets an aggregation domain.
        aggregation_id: Option<u64>,
    },
    Finalized {
        statement: String,
    },
    /// The network refused the submission (e.g. the proof did not verify).
    Error {
        message: String,
    },
    /// The event transport dropped.
    Disconnected {
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregationReceipt {
    pub domain_id: u32,
    pub aggregation_id: u64,
    /// Aggregate root, hex.
    pub receipt: String,
}

/// Membership path of a statement inside a published aggregate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatementPath {
    pub root: String,
    pub leaf: String,
    pub path: Vec<String>,
    pub leaf_index: u64,
    pub number_of_leaves: u64,
}

#[async_trait]
pub trait AttestationClient: Send + Sync {
    async fn start_session(&self, credentials: &Credentials) -> Result<Box<dyn AttestationSession>, ServiceError>;
}

#[async_trait]
pub trait AttestationSession: Send + Sync {
    /// Submit for verification; the receiver yields the submission's lifecycle.
    async fn submit(&self, submission: Submission) -> Result<mpsc::Receiver<NetworkEvent>, ServiceError>;

    async fn subscribe(&self, domain_id: u32) -> Result<mpsc::Receiver<AggregationReceipt>, ServiceError>;

    async fn aggregate_statement_path(
        &self,
        domain_id: u32,
        aggregation_id: u64,
        statement: &str,
    ) -> Result<StatementPath, ServiceError>;

    /// Release the session. Idempotent.
    async fn close(&self);
}
