//! Committed datasets: a validated record set plus the Merkle tree over its leaves.
//!
//! CIBIL and budget datasets keep dataset order (leaf `i` = record `i`). The fraud
//! blacklist is committed as a sorted key set framed by sentinels:
//!
//! `[0, k_1 < k_2 < ... < k_n, 2^248, 2^248, ...]`
//!
//! so that absence of a key is witnessed by two adjacent leaves that bracket it.

use crate::constants::{high_sentinel_key, low_sentinel_key};
use crate::errors::ZkError;
use crate::hash::identity_hash;
use crate::leaf::{encode_leaf, fraud_leaf, padding_leaf, validate_record};
use crate::merkle::MerkleTree;
use crate::types::{PredicateFamily, Record};
use ark_bn254::Fr;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct CommittedDataset {
    family: PredicateFamily,
    records: Vec<Record>,
    tree: MerkleTree,

    /// identity -> leaf index.
    index: HashMap<String, usize>,

    /// Fraud only: leaf keys in tree order, sentinels included.
    keys: Vec<Fr>,
}

impl CommittedDataset {
    /// Validate `records` for `family` and commit them into a tree of `depth`.
    pub fn commit(family: PredicateFamily, records: Vec<Record>, depth: usize) -> Result<Self, ZkError> {
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            validate_record(record, family)?;
            if index.insert(record.identity.clone(), i).is_some() {
                return Err(ZkError::InvalidRecord(format!("duplicate identity at position {i}")));
            }
        }

        match family {
            PredicateFamily::Cibil | PredicateFamily::Budget => {
                let leaves = records.iter().map(encode_leaf).collect::<Result<Vec<_>, _>>()?;
                let tree = MerkleTree::from_leaves(leaves, depth, padding_leaf())?;
                Ok(Self { family, records, tree, index, keys: Vec::new() })
            }
            PredicateFamily::Fraud => Self::commit_blacklist(records, depth),
        }
    }

    fn commit_blacklist(records: Vec<Record>, depth: usize) -> Result<Self, ZkError> {
        let capacity = MerkleTree::capacity(depth);
        if records.len() + 2 > capacity {
            return Err(ZkError::CapacityExceeded { len: records.len() + 2, capacity });
        }

        let mut hashed: Vec<(Fr, usize)> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (identity_hash(&r.identity), i))
            .collect();
        hashed.sort_by(|a, b| a.0.cmp(&b.0));

        let mut keys = Vec::with_capacity(records.len() + 2);
        let mut index = HashMap::with_capacity(records.len());
        keys.push(low_sentinel_key());
        for (key, record_pos) in &hashed {
            if keys.last() == Some(key) {
                return Err(ZkError::InvalidRecord("identity hash collision in blacklist".to_string()));
            }
            index.insert(records[*record_pos].identity.clone(), keys.len());
            keys.push(*key);
        }
        keys.push(high_sentinel_key());

        let leaves = keys.iter().map(|k| fraud_leaf(*k)).collect();
        let tree = MerkleTree::from_leaves(leaves, depth, fraud_leaf(high_sentinel_key()))?;

        Ok(Self { family: PredicateFamily::Fraud, records, tree, index, keys })
    }

    pub fn family(&self) -> PredicateFamily {
        self.family
    }

    pub fn root(&self) -> Fr {
        self.tree.root()
    }

    pub fn depth(&self) -> usize {
        self.tree.depth()
    }

    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Leaf index of `identity`, if it was committed.
    pub fn locate(&self, identity: &str) -> Option<usize> {
        self.index.get(identity).copied()
    }

    /// The record behind a CIBIL/budget leaf index.
    pub fn record_at(&self, leaf_index: usize) -> Result<&Record, ZkError> {
        match self.family {
            PredicateFamily::Fraud => Err(ZkError::InvalidInput("blacklist leaves are keys, not records".to_string())),
            _ => self.records.get(leaf_index).ok_or(ZkError::IndexOutOfRange {
                index: leaf_index,
                leaf_count: self.records.len(),
            }),
        }
    }

    /// Key stored at a blacklist leaf.
    pub fn key_at(&self, leaf_index: usize) -> Result<Fr, ZkError> {
        self.keys.get(leaf_index).copied().ok_or(ZkError::IndexOutOfRange {
            index: leaf_index,
            leaf_count: self.keys.len(),
        })
    }

    /// Adjacent blacklist leaves `(low, low + 1)` with `key(low) <= key < key(low + 1)`.
    ///
    /// For a member this pair starts at the member's own leaf.
    pub fn bracket(&self, key: Fr) -> Result<(usize, usize), ZkError> {
        if self.family != PredicateFamily::Fraud {
            return Err(ZkError::InvalidInput(format!("{} dataset has no sorted key set", self.family)));
        }
        // keys[0] is the zero sentinel, so the partition point is always >= 1.
        let upper = self.keys.partition_point(|k| *k <= key);
        if upper == 0 || upper >= self.keys.len() {
            return Err(ZkError::InvalidInput("key outside blacklist sentinels".to_string()));
        }
        Ok((upper - 1, upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blacklist(n: usize) -> Vec<Record> {
        (0..n).map(|i| Record::presence(format!("FRAUDSTER_{i:03}"))).collect()
    }

    #[test]
    fn cibil_keeps_dataset_order() {
        let records = vec![Record::score("A", 700), Record::score("B", 650)];
        let set = CommittedDataset::commit(PredicateFamily::Cibil, records, 4).unwrap();
        assert_eq!(set.locate("B"), Some(1));
        assert_eq!(set.locate("C"), None);
        assert_eq!(set.record_at(1).unwrap().identity, "B");
        assert_eq!(set.tree().leaf_count(), 2);
    }

    #[test]
    fn duplicate_identities_rejected() {
        let records = vec![Record::score("A", 700), Record::score("A", 650)];
        assert!(matches!(
            CommittedDataset::commit(PredicateFamily::Cibil, records, 4),
            Err(ZkError::InvalidRecord(_))
        ));
    }

    #[test]
    fn wrong_attribute_shape_rejected() {
        let records = vec![Record::presence("A")];
        assert!(CommittedDataset::commit(PredicateFamily::Budget, records, 4).is_err());
    }

    #[test]
    fn blacklist_is_sorted_and_framed() {
        let set = CommittedDataset::commit(PredicateFamily::Fraud, blacklist(50), 6).unwrap();
        assert_eq!(set.tree().leaf_count(), 52);
        assert_eq!(set.key_at(0).unwrap(), low_sentinel_key());
        assert_eq!(set.key_at(51).unwrap(), high_sentinel_key());
        for i in 1..52 {
            assert!(set.key_at(i - 1).unwrap() < set.key_at(i).unwrap());
        }
    }

    #[test]
    fn bracket_member_starts_at_member() {
        let set = CommittedDataset::commit(PredicateFamily::Fraud, blacklist(50), 6).unwrap();
        let pos = set.locate("FRAUDSTER_007").unwrap();
        let (low, high) = set.bracket(identity_hash("FRAUDSTER_007")).unwrap();
        assert_eq!((low, high), (pos, pos + 1));
    }

    #[test]
    fn bracket_non_member_straddles_key() {
        let set = CommittedDataset::commit(PredicateFamily::Fraud, blacklist(50), 6).unwrap();
        let key = identity_hash("CLEAN_USER_X");
        let (low, high) = set.bracket(key).unwrap();
        assert_eq!(high, low + 1);
        assert!(set.key_at(low).unwrap() < key);
        assert!(key < set.key_at(high).unwrap());
    }

    #[test]
    fn blacklist_needs_room_for_sentinels() {
        assert!(matches!(
            CommittedDataset::commit(PredicateFamily::Fraud, blacklist(7), 3),
            Err(ZkError::CapacityExceeded { len: 9, capacity: 8 })
        ));
        assert!(CommittedDataset::commit(PredicateFamily::Fraud, blacklist(6), 3).is_ok());
    }

    #[test]
    fn empty_blacklist_commits() {
        let set = CommittedDataset::commit(PredicateFamily::Fraud, Vec::new(), 2).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.bracket(identity_hash("ANYONE")).unwrap(), (0, 1));
    }
}
