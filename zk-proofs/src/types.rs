//! Types shared between the circuits, the assembler and the host-side prover/verifier.

use crate::constants::SPEND_SLOTS;
use crate::errors::ZkError;
use ark_bn254::{Bn254, Fr};
use ark_ff::{One, Zero};
use ark_groth16::Proof;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three fixed predicate circuits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateFamily {
    /// Credit score at or above a threshold.
    Cibil,
    /// Total spend at or below a budget.
    Budget,
    /// Identity absent from a blacklist.
    Fraud,
}

impl PredicateFamily {
    pub const ALL: [PredicateFamily; 3] = [PredicateFamily::Cibil, PredicateFamily::Budget, PredicateFamily::Fraud];

    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateFamily::Cibil => "cibil",
            PredicateFamily::Budget => "budget",
            PredicateFamily::Fraud => "fraud",
        }
    }

    /// Number of public inputs the family's circuit allocates.
    ///
    /// Index 0 is always the predicate outcome.
    pub fn public_signal_count(&self) -> usize {
        match self {
            PredicateFamily::Cibil | PredicateFamily::Budget => 3,
            PredicateFamily::Fraud => 2,
        }
    }
}

impl fmt::Display for PredicateFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hidden attribute(s) carried by one record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attribute {
    Score(u64),
    Spends([u32; SPEND_SLOTS]),
    /// Presence-only (blacklist entries).
    None,
}

impl Attribute {
    pub fn family(&self) -> PredicateFamily {
        match self {
            Attribute::Score(_) => PredicateFamily::Cibil,
            Attribute::Spends(_) => PredicateFamily::Budget,
            Attribute::None => PredicateFamily::Fraud,
        }
    }
}

/// One identity-keyed record of a private dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub identity: String,
    pub attribute: Attribute,
}

impl Record {
    pub fn score(identity: impl Into<String>, score: u64) -> Self {
        Self { identity: identity.into(), attribute: Attribute::Score(score) }
    }

    pub fn spends(identity: impl Into<String>, spends: [u32; SPEND_SLOTS]) -> Self {
        Self { identity: identity.into(), attribute: Attribute::Spends(spends) }
    }

    pub fn presence(identity: impl Into<String>) -> Self {
        Self { identity: identity.into(), attribute: Attribute::None }
    }
}

/// Caller-chosen public parameters of a predicate request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "predicate", rename_all = "snake_case")]
pub enum PredicateParams {
    Cibil { threshold: u64 },
    Budget { budget: u64 },
    Fraud,
}

impl PredicateParams {
    pub fn family(&self) -> PredicateFamily {
        match self {
            PredicateParams::Cibil { .. } => PredicateFamily::Cibil,
            PredicateParams::Budget { .. } => PredicateFamily::Budget,
            PredicateParams::Fraud => PredicateFamily::Fraud,
        }
    }
}

/// JSON-friendly representation of a field element.
///
/// We expose Fr values as hex strings of their canonical compressed encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrHex {
    pub hex: String,
}

impl FrHex {
    pub fn from_fr(x: &Fr) -> Self {
        let mut bytes = Vec::new();
        x.serialize_compressed(&mut bytes)
            .expect("in-memory serialization");
        Self { hex: hex::encode(bytes) }
    }

    pub fn to_fr(&self) -> Result<Fr, ZkError> {
        let bytes = hex::decode(&self.hex).map_err(|e| ZkError::Serialization(format!("invalid hex: {e}")))?;
        Fr::deserialize_compressed(&bytes[..]).map_err(|e| ZkError::Serialization(format!("invalid field bytes: {e}")))
    }
}

/// A Groth16 proof together with the public signals it was generated for.
#[derive(Clone, Debug)]
pub struct ProofBundle {
    pub family: PredicateFamily,
    pub proof: Proof<Bn254>,
    pub public_signals: Vec<Fr>,
}

impl ProofBundle {
    /// The disclosed predicate outcome, `public_signals[0]`.
    pub fn result(&self) -> Result<u8, ZkError> {
        signal_to_result(&self.public_signals)
    }
}

/// Interpret `signals[0]` as the 0/1 predicate outcome.
pub fn signal_to_result(signals: &[Fr]) -> Result<u8, ZkError> {
    match signals.first() {
        Some(s) if s.is_zero() => Ok(0),
        Some(s) if s.is_one() => Ok(1),
        Some(_) => Err(ZkError::InvalidInput("public signal 0 is not a boolean".to_string())),
        None => Err(ZkError::InvalidInput("no public signals".to_string())),
    }
}

/// Transport form of [`ProofBundle`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncodedProofBundle {
    pub family: PredicateFamily,
    pub proof_b64: String,
    pub public_signals: Vec<FrHex>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fr_hex_round_trip() {
        let x = Fr::from(123_456_789u64);
        let encoded = FrHex::from_fr(&x);
        assert_eq!(encoded.to_fr().unwrap(), x);
        assert!(FrHex { hex: "zz".to_string() }.to_fr().is_err());
    }

    #[test]
    fn result_reads_signal_zero() {
        assert_eq!(signal_to_result(&[Fr::from(1u64), Fr::from(9u64)]).unwrap(), 1);
        assert_eq!(signal_to_result(&[Fr::from(0u64)]).unwrap(), 0);
        assert!(signal_to_result(&[Fr::from(2u64)]).is_err());
        assert!(signal_to_result(&[]).is_err());
    }

    #[test]
    fn params_serialize_with_tag() {
        let p: PredicateParams = serde_json::from_str(r#"{"predicate":"cibil","threshold":700}"#).unwrap();
        assert_eq!(p, PredicateParams::Cibil { threshold: 700 });
        let f: PredicateParams = serde_json::from_str(r#"{"predicate":"fraud"}"#).unwrap();
        assert_eq!(f.family(), PredicateFamily::Fraud);
    }
}
