use std::time::Duration;
use thiserror::Error;
use zk_proofs::{ErrorCategory, PredicateFamily, ZkError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no {0} dataset loaded")]
    DatasetUnavailable(PredicateFamily),

    #[error(transparent)]
    Zk(#[from] ZkError),

    #[error("attestation seed credential missing")]
    SeedCredentialMissing,

    #[error("submission error: {0}")]
    SubmissionError(String),

    #[error("event stream error: {0}")]
    EventStreamError(String),

    #[error("verification timed out after {0:?}")]
    VerificationTimeout(Duration),

    #[error("verification cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error")]
    Internal,
}

impl ServiceError {
    /// Position in the error taxonomy; `None` for faults of this process itself.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            ServiceError::InvalidRequest(_) => Some(ErrorCategory::InputValidation),
            ServiceError::DatasetUnavailable(_) => Some(ErrorCategory::Dataset),
            ServiceError::Zk(e) => Some(e.category()),
            ServiceError::SeedCredentialMissing
            | ServiceError::SubmissionError(_)
            | ServiceError::EventStreamError(_)
            | ServiceError::VerificationTimeout(_)
            | ServiceError::Cancelled => Some(ErrorCategory::NetworkAttestation),
            ServiceError::Storage(_) | ServiceError::Internal => None,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Storage(e.to_string())
    }
}
