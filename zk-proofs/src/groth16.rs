//! Groth16 key generation, proving and serialization for the predicate circuits.
//!
//! SECURITY NOTE: `setup_keys` runs a local, single-party setup. It exists so a
//! development deployment can produce artifacts; production keys come from a
//! ceremony and are only ever loaded (see `artifacts`).

use crate::circuit::PredicateCircuit;
use crate::constants::MAX_TREE_DEPTH;
use crate::errors::ZkError;
use crate::inputs::CircuitInput;
use crate::types::{EncodedProofBundle, FrHex, PredicateFamily, ProofBundle};
use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use base64::Engine;
use rand::RngCore;

/// Generate a Groth16 keypair for `family` at Merkle depth `depth`.
///
/// Constraints depend only on family and depth, so a blank witness sizes the circuit.
pub fn setup_keys(
    family: PredicateFamily,
    depth: usize,
    rng: &mut impl RngCore,
) -> Result<(ProvingKey<Bn254>, VerifyingKey<Bn254>), ZkError> {
    if depth == 0 || depth > MAX_TREE_DEPTH {
        return Err(ZkError::InvalidInput(format!("tree depth must be in 1..={MAX_TREE_DEPTH}, got {depth}")));
    }

    let circuit = PredicateCircuit::from(CircuitInput::blank(family, depth));
    let pk = Groth16::<Bn254>::generate_random_parameters_with_reduction(circuit, rng)
        .map_err(|e| ZkError::ProofGenerationFailed(format!("setup: {e}")))?;

    let vk = pk.vk.clone();
    Ok((pk, vk))
}

/// Prove an assembled input. Both outcomes of the predicate are provable.
pub fn prove(input: CircuitInput, pk: &ProvingKey<Bn254>, rng: &mut impl RngCore) -> Result<ProofBundle, ZkError> {
    let family = input.family();
    let public_signals = input.public_signals();

    let expected_inputs = pk.vk.gamma_abc_g1.len();
    if expected_inputs != public_signals.len() + 1 {
        return Err(ZkError::ProofGenerationFailed(format!(
            "proving key expects {} public inputs, {} circuit has {}",
            expected_inputs.saturating_sub(1),
            family,
            public_signals.len()
        )));
    }

    let circuit = PredicateCircuit::from(input);
    let proof = Groth16::<Bn254>::create_random_proof_with_reduction(circuit, pk, rng)
        .map_err(|e| ZkError::ProofGenerationFailed(format!("{e}")))?;

    Ok(ProofBundle { family, proof, public_signals })
}

/// Serialize a proving key to bytes.
pub fn serialize_pk(pk: &ProvingKey<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    pk.serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

/// Proving keys are produced locally and read back from trusted storage, so point
/// validation is skipped; at depth 10 it dominates load time.
pub fn deserialize_pk(bytes: &[u8]) -> Result<ProvingKey<Bn254>, ZkError> {
    ProvingKey::<Bn254>::deserialize_compressed_unchecked(bytes)
        .map_err(|e| ZkError::Serialization(format!("{e}")))
}

pub fn serialize_vk(vk: &VerifyingKey<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    vk.serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

pub fn deserialize_vk(bytes: &[u8]) -> Result<VerifyingKey<Bn254>, ZkError> {
    VerifyingKey::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkError::InvalidVerificationKey(format!("{e}")))
}

pub fn serialize_proof(proof: &Proof<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    proof
        .serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

pub fn deserialize_proof(bytes: &[u8]) -> Result<Proof<Bn254>, ZkError> {
    Proof::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkError::Serialization(format!("{e}")))
}

/// Encode a bundle for transport (base64 proof, hex field elements).
pub fn encode_bundle(bundle: &ProofBundle) -> Result<EncodedProofBundle, ZkError> {
    let proof_bytes = serialize_proof(&bundle.proof)?;
    Ok(EncodedProofBundle {
        family: bundle.family,
        proof_b64: base64::engine::general_purpose::STANDARD.encode(proof_bytes),
        public_signals: bundle.public_signals.iter().map(FrHex::from_fr).collect(),
    })
}

pub fn decode_bundle(encoded: &EncodedProofBundle) -> Result<ProofBundle, ZkError> {
    let proof_bytes = base64::engine::general_purpose::STANDARD
        .decode(&encoded.proof_b64)
        .map_err(|e| ZkError::Serialization(format!("invalid proof_b64: {e}")))?;
    let public_signals = encoded
        .public_signals
        .iter()
        .map(FrHex::to_fr)
        .collect::<Result<Vec<Fr>, _>>()?;

    Ok(ProofBundle {
        family: encoded.family,
        proof: deserialize_proof(&proof_bytes)?,
        public_signals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::CommittedDataset;
    use crate::types::{PredicateParams, Record};
    use crate::verifier::verify_bundle;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn cibil_round_trip_both_outcomes() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let (pk, vk) = setup_keys(PredicateFamily::Cibil, 3, &mut rng).unwrap();

        let records = vec![Record::score("USER_750", 750), Record::score("USER_650", 650)];
        let set = CommittedDataset::commit(PredicateFamily::Cibil, records, 3).unwrap();

        for (identity, expected) in [("USER_750", 1u8), ("USER_650", 0u8)] {
            let input = CircuitInput::assemble(&set, identity, &PredicateParams::Cibil { threshold: 700 }).unwrap();
            let bundle = prove(input, &pk, &mut rng).unwrap();
            assert_eq!(bundle.result().unwrap(), expected);
            assert!(verify_bundle(&vk, &bundle).unwrap(), "{identity}");
        }
    }

    #[test]
    fn tampered_signal_fails_verification() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let (pk, vk) = setup_keys(PredicateFamily::Budget, 2, &mut rng).unwrap();

        let records = vec![Record::spends("SPENDER", [100, 200, 150, 50, 300])];
        let set = CommittedDataset::commit(PredicateFamily::Budget, records, 2).unwrap();
        let input = CircuitInput::assemble(&set, "SPENDER", &PredicateParams::Budget { budget: 500 }).unwrap();

        let mut bundle = prove(input, &pk, &mut rng).unwrap();
        assert_eq!(bundle.result().unwrap(), 0);
        bundle.public_signals[0] = Fr::from(1u64);
        assert!(!verify_bundle(&vk, &bundle).unwrap());
    }

    #[test]
    fn wrong_family_key_is_rejected_before_proving() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let (fraud_pk, _) = setup_keys(PredicateFamily::Fraud, 2, &mut rng).unwrap();
        let input = CircuitInput::blank(PredicateFamily::Cibil, 2);
        assert!(matches!(prove(input, &fraud_pk, &mut rng), Err(ZkError::ProofGenerationFailed(_))));
    }

    #[test]
    fn bundle_encoding_round_trip() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let (pk, _) = setup_keys(PredicateFamily::Cibil, 1, &mut rng).unwrap();
        let bundle = prove(CircuitInput::blank(PredicateFamily::Cibil, 1), &pk, &mut rng).unwrap();

        let encoded = encode_bundle(&bundle).unwrap();
        let json = serde_json::to_string(&encoded).unwrap();
        let decoded = decode_bundle(&serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(decoded.public_signals, bundle.public_signals);
        assert_eq!(decoded.proof, bundle.proof);
    }

    #[test]
    fn setup_rejects_bad_depth() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert!(setup_keys(PredicateFamily::Cibil, 0, &mut rng).is_err());
    }
}
