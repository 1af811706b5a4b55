//! Crate-wide constants used by the predicate circuits and host-side assembly.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig};
use ark_ff::{Field, PrimeField};
use std::sync::OnceLock;

/// Default Merkle depth for every predicate family (1024 leaves).
pub const DEFAULT_TREE_DEPTH: usize = 10;

/// Largest depth accepted by the tree builder and the setup routine.
pub const MAX_TREE_DEPTH: usize = 20;

/// Bit width of scores, thresholds and spend totals inside the circuits.
pub const ATTRIBUTE_BITS: usize = 64;

/// Fixed length of a budget record's spend vector.
pub const SPEND_SLOTS: usize = 5;

/// Number of SHA-256 output bytes kept when reducing an identity into the field.
///
/// 31 bytes = 248 bits, which always fits below the BN254 scalar modulus, so the
/// reduction is injective over digests and the value can be compared in-circuit.
pub const IDENTITY_HASH_BYTES: usize = 31;

/// Bit width of a reduced identity hash.
pub const IDENTITY_HASH_BITS: usize = IDENTITY_HASH_BYTES * 8;

/// Bit width of keys stored in the sorted blacklist tree.
///
/// One more than an identity hash so the high sentinel `2^248` fits.
pub const SET_KEY_BITS: usize = IDENTITY_HASH_BITS + 1;

// Poseidon sponge configuration.
//
// Width-3 sponge (rate=2, capacity=1) so a parent node absorbs exactly its two children.
pub const POSEIDON_RATE: usize = 2;
pub const POSEIDON_CAPACITY: usize = 1;

pub const POSEIDON_FULL_ROUNDS: usize = 8;
pub const POSEIDON_PARTIAL_ROUNDS: usize = 57;

/// Poseidon S-box exponent (alpha).
pub const POSEIDON_ALPHA: u64 = 5;

/// Absorbed ahead of the element in single-element hashes, so a key leaf never
/// shares a sponge state with a two-child node.
pub const SINGLE_HASH_DOMAIN_TAG: u64 = 0x6b65_795f_6c65_6166;

static POSEIDON_CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

/// Deterministically derived Poseidon parameters for BN254::Fr.
///
/// Both the native hasher and the in-circuit gadget read the same constants. The
/// Grain LFSR derivation is not free, so it runs once per process.
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    POSEIDON_CONFIG.get_or_init(|| {
        let prime_bits = Fr::MODULUS_BIT_SIZE as u64;

        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            prime_bits,
            POSEIDON_RATE,
            POSEIDON_FULL_ROUNDS as u64,
            POSEIDON_PARTIAL_ROUNDS as u64,
            0,
        );

        PoseidonConfig::new(
            POSEIDON_FULL_ROUNDS,
            POSEIDON_PARTIAL_ROUNDS,
            POSEIDON_ALPHA,
            mds,
            ark,
            POSEIDON_RATE,
            POSEIDON_CAPACITY,
        )
    })
}

/// `2^bits` as a field element.
pub fn two_pow(bits: usize) -> Fr {
    Fr::from(2u64).pow([bits as u64])
}

/// Smallest key in the sorted blacklist tree; always stored at index 0.
pub fn low_sentinel_key() -> Fr {
    Fr::from(0u64)
}

/// Key strictly above every reduced identity hash; fills the tail of the blacklist tree.
pub fn high_sentinel_key() -> Fr {
    two_pow(IDENTITY_HASH_BITS)
}
