//! ZK layer for private threshold proofs over identity-keyed datasets.
//!
//! This crate contains:
//! - Leaf encoding and a fixed-depth Poseidon Merkle tree committing a dataset to a root.
//! - R1CS circuits for three predicates (credit score threshold, spend budget,
//!   blacklist non-membership), each disclosing only a 0/1 outcome as public signal 0.
//! - Circuit-input assembly, Groth16 setup/proving and a local offline verifier.
//! - Artifact files and serialization helpers for transporting proofs.

pub mod artifacts;
pub mod circuit;
pub mod commitment;
pub mod constants;
pub mod errors;
pub mod gadgets;
pub mod groth16;
pub mod hash;
pub mod inputs;
pub mod leaf;
pub mod merkle;
pub mod types;
pub mod verifier;

pub use commitment::CommittedDataset;
pub use errors::{ErrorCategory, ZkError};
pub use inputs::CircuitInput;
pub use types::{PredicateFamily, PredicateParams, ProofBundle, Record};
