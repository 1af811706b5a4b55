//! Proving artifacts on disk.
//!
//! Layout: `<root>/<family>-d<depth>/groth16_pk.bin` and `groth16_vk.bin`. The circuit
//! synthesizer itself is compiled into this crate, so the keys are the only files
//! a deployment has to ship.

use crate::errors::ZkError;
use crate::groth16::{deserialize_pk, deserialize_vk, serialize_pk, serialize_vk, setup_keys};
use crate::types::PredicateFamily;
use ark_bn254::Bn254;
use ark_groth16::{ProvingKey, VerifyingKey};
use rand::RngCore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const PROVING_KEY_FILE: &str = "groth16_pk.bin";
pub const VERIFYING_KEY_FILE: &str = "groth16_vk.bin";

#[derive(Clone)]
pub struct ProvingArtifacts {
    pub family: PredicateFamily,
    pub depth: usize,
    pub pk: Arc<ProvingKey<Bn254>>,
    pub vk: Arc<VerifyingKey<Bn254>>,
}

pub fn artifact_dir(root: &Path, family: PredicateFamily, depth: usize) -> PathBuf {
    root.join(format!("{}-d{}", family.as_str(), depth))
}

fn read_artifact(path: &Path, family: PredicateFamily) -> Result<Vec<u8>, ZkError> {
    if !path.exists() {
        return Err(ZkError::ProvingArtifactMissing { family, path: path.display().to_string() });
    }
    Ok(std::fs::read(path)?)
}

/// Load the verification key alone (for verifier-only deployments).
pub fn load_verifying_key(root: &Path, family: PredicateFamily, depth: usize) -> Result<VerifyingKey<Bn254>, ZkError> {
    let path = artifact_dir(root, family, depth).join(VERIFYING_KEY_FILE);
    let vk = deserialize_vk(&read_artifact(&path, family)?)?;
    if vk.gamma_abc_g1.len() != family.public_signal_count() + 1 {
        return Err(ZkError::InvalidVerificationKey(format!(
            "{} does not belong to the {} circuit",
            path.display(),
            family
        )));
    }
    Ok(vk)
}

/// Load both keys; a missing file is a precondition failure, not a runtime one.
pub fn load_artifacts(root: &Path, family: PredicateFamily, depth: usize) -> Result<ProvingArtifacts, ZkError> {
    let vk = load_verifying_key(root, family, depth)?;
    let pk_path = artifact_dir(root, family, depth).join(PROVING_KEY_FILE);
    let pk = deserialize_pk(&read_artifact(&pk_path, family)?)?;

    if pk.vk != vk {
        return Err(ZkError::InvalidVerificationKey(format!(
            "{} and its proving key come from different setups",
            VERIFYING_KEY_FILE
        )));
    }

    Ok(ProvingArtifacts { family, depth, pk: Arc::new(pk), vk: Arc::new(vk) })
}

pub fn write_artifacts(
    root: &Path,
    family: PredicateFamily,
    depth: usize,
    pk: &ProvingKey<Bn254>,
    vk: &VerifyingKey<Bn254>,
) -> Result<(), ZkError> {
    let dir = artifact_dir(root, family, depth);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(PROVING_KEY_FILE), serialize_pk(pk)?)?;
    std::fs::write(dir.join(VERIFYING_KEY_FILE), serialize_vk(vk)?)?;
    Ok(())
}

/// Run the local setup for `family` and persist the keys.
pub fn generate_artifacts(
    root: &Path,
    family: PredicateFamily,
    depth: usize,
    rng: &mut impl RngCore,
) -> Result<ProvingArtifacts, ZkError> {
    let (pk, vk) = setup_keys(family, depth, rng)?;
    write_artifacts(root, family, depth, &pk, &vk)?;
    Ok(ProvingArtifacts { family, depth, pk: Arc::new(pk), vk: Arc::new(vk) })
}
