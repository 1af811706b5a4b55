//! Local, network-free proof verification.

use crate::errors::ZkError;
use crate::groth16::{deserialize_proof, deserialize_vk};
use crate::types::ProofBundle;
use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof, VerifyingKey};
use ark_snark::SNARK;

/// Check `proof` against `public_signals` under `vk`.
///
/// `Ok(false)` means the proof is well-formed but does not verify. A key whose
/// input count disagrees with the signals is reported as `InvalidVerificationKey`.
pub fn verify_proof(vk: &VerifyingKey<Bn254>, proof: &Proof<Bn254>, public_signals: &[Fr]) -> Result<bool, ZkError> {
    if vk.gamma_abc_g1.len() != public_signals.len() + 1 {
        return Err(ZkError::InvalidVerificationKey(format!(
            "key expects {} public inputs, got {}",
            vk.gamma_abc_g1.len().saturating_sub(1),
            public_signals.len()
        )));
    }

    Groth16::<Bn254>::verify(vk, public_signals, proof)
        .map_err(|e| ZkError::InvalidVerificationKey(format!("{e}")))
}

pub fn verify_bundle(vk: &VerifyingKey<Bn254>, bundle: &ProofBundle) -> Result<bool, ZkError> {
    verify_proof(vk, &bundle.proof, &bundle.public_signals)
}

/// Verify from serialized key and proof bytes.
///
/// A malformed key is an error; a proof that does not decode (e.g. a flipped bit
/// pushing a point off the curve) simply does not verify.
pub fn verify_encoded(vk_bytes: &[u8], proof_bytes: &[u8], public_signals: &[Fr]) -> Result<bool, ZkError> {
    let vk = deserialize_vk(vk_bytes)?;
    let Ok(proof) = deserialize_proof(proof_bytes) else {
        return Ok(false);
    };
    verify_proof(&vk, &proof, public_signals)
}
