//! Fixed-depth binary Merkle tree over Poseidon.
//!
//! Level 0 holds the leaves, padded with a caller-chosen sentinel up to `2^depth`;
//! level `depth` holds the root. The tree is immutable once built.

use crate::constants::MAX_TREE_DEPTH;
use crate::errors::ZkError;
use crate::hash::poseidon_hash_two;
use ark_bn254::Fr;

/// Sibling hashes and direction bits from a leaf up to the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthPath {
    /// Sibling hashes from leaf level (0) to level `depth - 1`.
    siblings: Vec<Fr>,

    /// Direction at each level: true = current node is the right child.
    directions: Vec<bool>,
}

impl AuthPath {
    pub fn new(siblings: Vec<Fr>, directions: Vec<bool>) -> Result<Self, ZkError> {
        if siblings.len() != directions.len() {
            return Err(ZkError::InvalidInput(format!(
                "path has {} siblings but {} direction bits",
                siblings.len(),
                directions.len()
            )));
        }
        Ok(Self { siblings, directions })
    }

    /// All-zero path of the given depth; only used to size circuits for key generation.
    pub fn blank(depth: usize) -> Self {
        Self { siblings: vec![Fr::from(0u64); depth], directions: vec![false; depth] }
    }

    pub fn siblings(&self) -> &[Fr] {
        &self.siblings
    }

    pub fn directions(&self) -> &[bool] {
        &self.directions
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Leaf index encoded by the direction bits (bit `i` = direction at level `i`).
    pub fn index(&self) -> u64 {
        self.directions
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &right)| if right { acc | (1u64 << i) } else { acc })
    }

    /// Recombine a leaf with this path into a root.
    pub fn compute_root(&self, leaf: Fr) -> Fr {
        let mut current = leaf;
        for (sibling, &is_right) in self.siblings.iter().zip(self.directions.iter()) {
            current = if is_right {
                poseidon_hash_two(*sibling, current)
            } else {
                poseidon_hash_two(current, *sibling)
            };
        }
        current
    }
}

#[derive(Clone, Debug)]
pub struct MerkleTree {
    depth: usize,

    /// Number of leaves supplied by the caller (before padding).
    leaf_count: usize,

    /// `levels[0]` = padded leaves, `levels[depth]` = `[root]`.
    levels: Vec<Vec<Fr>>,
}

impl MerkleTree {
    pub fn capacity(depth: usize) -> usize {
        1usize << depth
    }

    /// Build the tree bottom-up, replicating `padding` into unused leaf slots.
    pub fn from_leaves(leaves: Vec<Fr>, depth: usize, padding: Fr) -> Result<Self, ZkError> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(ZkError::InvalidInput(format!("tree depth must be in 1..={MAX_TREE_DEPTH}, got {depth}")));
        }

        let capacity = Self::capacity(depth);
        let leaf_count = leaves.len();
        if leaf_count > capacity {
            return Err(ZkError::CapacityExceeded { len: leaf_count, capacity });
        }

        let mut level = leaves;
        level.resize(capacity, padding);

        let mut levels = Vec::with_capacity(depth + 1);
        for _ in 0..depth {
            let parent: Vec<Fr> = level
                .chunks_exact(2)
                .map(|pair| poseidon_hash_two(pair[0], pair[1]))
                .collect();
            levels.push(level);
            level = parent;
        }
        levels.push(level);

        Ok(Self { depth, leaf_count, levels })
    }

    pub fn root(&self) -> Fr {
        self.levels[self.depth][0]
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn leaf(&self, index: usize) -> Result<Fr, ZkError> {
        self.check_index(index)?;
        Ok(self.levels[0][index])
    }

    /// Authentication path for the leaf at `index`.
    pub fn get_proof(&self, index: usize) -> Result<AuthPath, ZkError> {
        self.check_index(index)?;

        let mut siblings = Vec::with_capacity(self.depth);
        let mut directions = Vec::with_capacity(self.depth);

        let mut current = index;
        for level in 0..self.depth {
            siblings.push(self.levels[level][current ^ 1]);
            directions.push(current & 1 == 1);
            current >>= 1;
        }

        Ok(AuthPath { siblings, directions })
    }

    fn check_index(&self, index: usize) -> Result<(), ZkError> {
        if index >= self.leaf_count {
            return Err(ZkError::IndexOutOfRange { index, leaf_count: self.leaf_count });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::padding_leaf;

    fn leaves(n: u64) -> Vec<Fr> {
        (0..n).map(|i| Fr::from(i * 7 + 3)).collect()
    }

    #[test]
    fn every_path_reproduces_root() {
        for n in [1u64, 2, 5, 16, 33, 64] {
            let tree = MerkleTree::from_leaves(leaves(n), 6, padding_leaf()).unwrap();
            for i in 0..n as usize {
                let path = tree.get_proof(i).unwrap();
                assert_eq!(path.depth(), 6);
                assert_eq!(path.index(), i as u64);
                assert_eq!(path.compute_root(tree.leaf(i).unwrap()), tree.root(), "n={n} i={i}");
            }
        }
    }

    #[test]
    fn production_depth_paths_reproduce_root() {
        let tree = MerkleTree::from_leaves(leaves(1000), 10, padding_leaf()).unwrap();
        for i in [0usize, 1, 511, 512, 998, 999] {
            let path = tree.get_proof(i).unwrap();
            assert_eq!(path.compute_root(tree.leaf(i).unwrap()), tree.root());
        }
    }

    #[test]
    fn wrong_leaf_gives_different_root() {
        let tree = MerkleTree::from_leaves(leaves(8), 3, padding_leaf()).unwrap();
        let path = tree.get_proof(3).unwrap();
        assert_ne!(path.compute_root(Fr::from(999u64)), tree.root());
    }

    #[test]
    fn index_out_of_range() {
        let tree = MerkleTree::from_leaves(leaves(5), 3, padding_leaf()).unwrap();
        assert!(matches!(
            tree.get_proof(5),
            Err(ZkError::IndexOutOfRange { index: 5, leaf_count: 5 })
        ));
        assert!(tree.get_proof(4).is_ok());
    }

    #[test]
    fn capacity_exceeded() {
        let err = MerkleTree::from_leaves(leaves(9), 3, padding_leaf()).unwrap_err();
        assert!(matches!(err, ZkError::CapacityExceeded { len: 9, capacity: 8 }));
    }

    #[test]
    fn padding_is_deterministic() {
        let a = MerkleTree::from_leaves(leaves(3), 4, padding_leaf()).unwrap();
        let b = MerkleTree::from_leaves(leaves(3), 4, padding_leaf()).unwrap();
        assert_eq!(a.root(), b.root());

        let c = MerkleTree::from_leaves(leaves(4), 4, padding_leaf()).unwrap();
        assert_ne!(a.root(), c.root());
    }

    #[test]
    fn depth_is_validated() {
        assert!(MerkleTree::from_leaves(leaves(1), 0, padding_leaf()).is_err());
        assert!(MerkleTree::from_leaves(leaves(1), MAX_TREE_DEPTH + 1, padding_leaf()).is_err());
    }

    #[test]
    fn mismatched_path_is_rejected() {
        assert!(AuthPath::new(vec![Fr::from(1u64)], vec![]).is_err());
    }
}
