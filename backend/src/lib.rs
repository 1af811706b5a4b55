//! Async side of the threshold-proof pipeline: datasets, trees, proving pool,
//! network attestation and the `submit_proof` facade.

pub mod config;
pub mod dataset;
pub mod db;
pub mod errors;
pub mod loopback;
pub mod models;
pub mod network;
pub mod orchestrator;
pub mod prover;
pub mod service;
pub mod state;
pub mod store;
pub mod tree_cache;

pub use errors::ServiceError;
pub use models::{SubmitOutcome, VerificationResult};
pub use service::ThresholdService;
