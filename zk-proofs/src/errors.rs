use thiserror::Error;

use crate::types::PredicateFamily;

/// Coarse error taxonomy shared with the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    InputValidation,
    Dataset,
    Artifact,
    Proof,
    NetworkAttestation,
}

#[derive(Debug, Error)]
pub enum ZkError {
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("identity not found in committed dataset")]
    IdentityNotFound,

    #[error("leaf index {index} out of range (leaf count {leaf_count})")]
    IndexOutOfRange { index: usize, leaf_count: usize },

    #[error("dataset of {len} entries exceeds tree capacity {capacity}")]
    CapacityExceeded { len: usize, capacity: usize },

    #[error("proving artifact missing for {family} at {path}")]
    ProvingArtifactMissing { family: PredicateFamily, path: String },

    #[error("invalid verification key: {0}")]
    InvalidVerificationKey(String),

    #[error("proof generation failed: {0}")]
    ProofGenerationFailed(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZkError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ZkError::InvalidRecord(_) | ZkError::InvalidInput(_) | ZkError::Serialization(_) => {
                ErrorCategory::InputValidation
            }
            ZkError::IdentityNotFound
            | ZkError::IndexOutOfRange { .. }
            | ZkError::CapacityExceeded { .. } => ErrorCategory::Dataset,
            ZkError::ProvingArtifactMissing { .. }
            | ZkError::InvalidVerificationKey(_)
            | ZkError::Io(_) => ErrorCategory::Artifact,
            ZkError::ProofGenerationFailed(_) => ErrorCategory::Proof,
        }
    }
}
