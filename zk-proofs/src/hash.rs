//! Field hashing: SHA-256 identity reduction plus native and in-circuit Poseidon.
//!
//! Native and gadget variants absorb elements one at a time in the same order, so a
//! value computed here is reproduced bit-for-bit inside the circuits.

use crate::constants::{poseidon_config, IDENTITY_HASH_BYTES, SINGLE_HASH_DOMAIN_TAG};
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_crypto_primitives::sponge::poseidon::PoseidonSponge;
use ark_crypto_primitives::sponge::CryptographicSponge;
use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::fields::FieldVar;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use sha2::{Digest, Sha256};

/// Reduce an identity string into a 248-bit field element.
pub fn identity_hash(identity: &str) -> Fr {
    let digest = Sha256::digest(identity.as_bytes());
    Fr::from_le_bytes_mod_order(&digest[..IDENTITY_HASH_BYTES])
}

/// Poseidon over a single element, prefixed with [`SINGLE_HASH_DOMAIN_TAG`].
pub fn poseidon_hash_one(a: Fr) -> Fr {
    let mut sponge = PoseidonSponge::<Fr>::new(poseidon_config());
    sponge.absorb(&Fr::from(SINGLE_HASH_DOMAIN_TAG));
    sponge.absorb(&a);
    sponge.squeeze_field_elements::<Fr>(1)[0]
}

/// Poseidon over an ordered pair. Used for leaves with an attribute and for tree nodes.
pub fn poseidon_hash_two(a: Fr, b: Fr) -> Fr {
    let mut sponge = PoseidonSponge::<Fr>::new(poseidon_config());
    sponge.absorb(&a);
    sponge.absorb(&b);
    sponge.squeeze_field_elements::<Fr>(1)[0]
}

pub fn poseidon_hash_one_var(cs: ConstraintSystemRef<Fr>, a: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    let tag = FpVar::<Fr>::constant(Fr::from(SINGLE_HASH_DOMAIN_TAG));
    let mut sponge = PoseidonSpongeVar::<Fr>::new(cs, poseidon_config());
    sponge.absorb(&tag)?;
    sponge.absorb(a)?;
    let out = sponge.squeeze_field_elements(1)?;
    Ok(out[0].clone())
}

pub fn poseidon_hash_two_var(
    cs: ConstraintSystemRef<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::<Fr>::new(cs, poseidon_config());
    sponge.absorb(a)?;
    sponge.absorb(b)?;
    let out = sponge.squeeze_field_elements(1)?;
    Ok(out[0].clone())
}
