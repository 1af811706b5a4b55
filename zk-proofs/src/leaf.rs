//! Record leaf encoding.
//!
//! - CIBIL:  `Poseidon(H(id), score)`
//! - Budget: `Poseidon(H(id), sum(spends))`
//! - Fraud:  `Poseidon(TAG, H(id))`
//!
//! where `H` is the SHA-256 identity reduction. The blacklist tree stores keys, not
//! records, so its sentinels go through [`fraud_leaf`] directly.

use crate::constants::SPEND_SLOTS;
use crate::errors::ZkError;
use crate::hash::{identity_hash, poseidon_hash_one, poseidon_hash_two};
use crate::types::{Attribute, PredicateFamily, Record};
use ark_bn254::Fr;

pub fn cibil_leaf(id_hash: Fr, score: u64) -> Fr {
    poseidon_hash_two(id_hash, Fr::from(score))
}

pub fn budget_leaf(id_hash: Fr, total_spend: u64) -> Fr {
    poseidon_hash_two(id_hash, Fr::from(total_spend))
}

pub fn fraud_leaf(key: Fr) -> Fr {
    poseidon_hash_one(key)
}

/// Sum of a spend vector; cannot overflow since every slot is a `u32`.
pub fn spend_total(spends: &[u32; SPEND_SLOTS]) -> u64 {
    spends.iter().map(|s| *s as u64).sum()
}

/// Reject records that cannot be committed.
pub fn validate_record(record: &Record, family: PredicateFamily) -> Result<(), ZkError> {
    if record.identity.trim().is_empty() {
        return Err(ZkError::InvalidRecord("empty identity".to_string()));
    }
    if record.attribute.family() != family {
        return Err(ZkError::InvalidRecord(format!(
            "record for {} carries a {} attribute",
            family,
            record.attribute.family()
        )));
    }
    Ok(())
}

/// Encode one record as its committed leaf.
pub fn encode_leaf(record: &Record) -> Result<Fr, ZkError> {
    validate_record(record, record.attribute.family())?;
    let id = identity_hash(&record.identity);
    Ok(match &record.attribute {
        Attribute::Score(score) => cibil_leaf(id, *score),
        Attribute::Spends(spends) => budget_leaf(id, spend_total(spends)),
        Attribute::None => fraud_leaf(id),
    })
}

/// Leaf replicated into unused slots of a CIBIL or budget tree.
pub fn padding_leaf() -> Fr {
    poseidon_hash_two(Fr::from(0u64), Fr::from(0u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_is_deterministic() {
        let r = Record::score("USER_001", 750);
        assert_eq!(encode_leaf(&r).unwrap(), encode_leaf(&r.clone()).unwrap());
    }

    #[test]
    fn distinct_identities_give_distinct_leaves() {
        let leaves: Vec<Fr> = (0..16)
            .map(|i| encode_leaf(&Record::score(format!("USER_{i:03}"), 700)).unwrap())
            .collect();
        for i in 0..leaves.len() {
            for j in (i + 1)..leaves.len() {
                assert_ne!(leaves[i], leaves[j]);
            }
        }
    }

    #[test]
    fn attribute_changes_leaf() {
        let a = encode_leaf(&Record::score("USER_001", 750)).unwrap();
        let b = encode_leaf(&Record::score("USER_001", 751)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn budget_leaf_commits_to_total() {
        let r = Record::spends("USER_001", [100, 200, 150, 50, 300]);
        let expected = budget_leaf(identity_hash("USER_001"), 800);
        assert_eq!(encode_leaf(&r).unwrap(), expected);
    }

    #[test]
    fn fraud_leaf_is_presence_only() {
        let r = Record::presence("FRAUDSTER_001");
        assert_eq!(encode_leaf(&r).unwrap(), fraud_leaf(identity_hash("FRAUDSTER_001")));
    }

    #[test]
    fn key_leaves_differ_from_padding_and_nodes() {
        let zero = Fr::from(0u64);
        assert_ne!(fraud_leaf(zero), padding_leaf());
        let key = identity_hash("FRAUDSTER_001");
        assert_ne!(fraud_leaf(key), poseidon_hash_two(key, zero));
    }

    #[test]
    fn empty_identity_is_rejected() {
        assert!(matches!(encode_leaf(&Record::score("", 1)), Err(ZkError::InvalidRecord(_))));
        assert!(matches!(encode_leaf(&Record::presence("   ")), Err(ZkError::InvalidRecord(_))));
    }

    #[test]
    fn family_mismatch_is_rejected() {
        let r = Record::score("USER_001", 1);
        assert!(validate_record(&r, PredicateFamily::Budget).is_err());
        assert!(validate_record(&r, PredicateFamily::Cibil).is_ok());
    }
}
