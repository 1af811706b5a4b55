//! R1CS building blocks shared by the predicate circuits.

use crate::constants::two_pow;
use crate::hash::poseidon_hash_two_var;
use crate::merkle::AuthPath;
use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

/// Convert little-endian boolean bits into an FpVar.
pub fn bits_le_to_fp(bits_le: &[Boolean<Fr>]) -> Result<FpVar<Fr>, SynthesisError> {
    let mut acc = FpVar::<Fr>::constant(Fr::from(0u64));
    let mut coeff = FpVar::<Fr>::constant(Fr::from(1u64));

    for b in bits_le {
        // b ? coeff : 0
        let term = b.select(&coeff, &FpVar::<Fr>::constant(Fr::from(0u64)))?;
        acc += term;
        coeff += coeff.clone();
    }

    Ok(acc)
}

/// 1 if `b` holds, else 0.
pub fn bool_to_fp(b: &Boolean<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    b.select(&FpVar::<Fr>::constant(Fr::from(1u64)), &FpVar::<Fr>::constant(Fr::from(0u64)))
}

/// Enforce that `value` fits in `num_bits` bits.
///
/// Every bit of the canonical decomposition above `num_bits` must be zero, so a
/// wrapped-around negative value cannot satisfy it.
pub fn enforce_range(value: &FpVar<Fr>, num_bits: usize) -> Result<(), SynthesisError> {
    let bits = value.to_bits_le()?;
    for bit in bits.iter().skip(num_bits) {
        bit.enforce_equal(&Boolean::FALSE)?;
    }
    Ok(())
}

/// Boolean gadget: `a >= b` for `a, b` already constrained to `num_bits` bits.
///
/// `a + 2^n - b` lies in `[1, 2^(n+1))`; bit `n` of it is set iff `a >= b`.
pub fn is_geq(a: &FpVar<Fr>, b: &FpVar<Fr>, num_bits: usize) -> Result<Boolean<Fr>, SynthesisError> {
    let offset = FpVar::<Fr>::constant(two_pow(num_bits));
    let shifted = a + &offset - b;

    let bits = shifted.to_bits_le()?;
    if num_bits + 1 >= bits.len() {
        return Err(SynthesisError::Unsatisfiable);
    }
    for bit in bits.iter().skip(num_bits + 1) {
        bit.enforce_equal(&Boolean::FALSE)?;
    }
    Ok(bits[num_bits].clone())
}

/// Circuit variable representation of an [`AuthPath`].
#[derive(Clone)]
pub struct AuthPathVar {
    siblings: Vec<FpVar<Fr>>,
    directions: Vec<Boolean<Fr>>,
}

impl AuthPathVar {
    /// Allocate an authentication path as witness variables.
    pub fn new_witness(cs: ConstraintSystemRef<Fr>, path: &AuthPath) -> Result<Self, SynthesisError> {
        let siblings = path
            .siblings()
            .iter()
            .map(|h| FpVar::new_witness(cs.clone(), || Ok(*h)))
            .collect::<Result<Vec<_>, _>>()?;

        let directions = path
            .directions()
            .iter()
            .map(|&b| Boolean::new_witness(cs.clone(), || Ok(b)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { siblings, directions })
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Leaf index recomposed from the direction bits.
    pub fn index(&self) -> Result<FpVar<Fr>, SynthesisError> {
        bits_le_to_fp(&self.directions)
    }

    /// Hash `leaf` up the path and return the resulting root.
    pub fn compute_root(&self, cs: ConstraintSystemRef<Fr>, leaf: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
        let mut current = leaf.clone();

        for (sibling, is_right) in self.siblings.iter().zip(self.directions.iter()) {
            // is_right: H(sibling, current), else H(current, sibling)
            let left = is_right.select(sibling, &current)?;
            let right = is_right.select(&current, sibling)?;
            current = poseidon_hash_two_var(cs.clone(), &left, &right)?;
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::padding_leaf;
    use crate::merkle::MerkleTree;
    use ark_relations::r1cs::ConstraintSystem;
    use std::ops::Neg;

    fn geq(a: u64, b: u64) -> (bool, bool) {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let a = FpVar::new_witness(cs.clone(), || Ok(Fr::from(a))).unwrap();
        let b = FpVar::new_witness(cs.clone(), || Ok(Fr::from(b))).unwrap();
        let out = is_geq(&a, &b, 64).unwrap();
        (out.value().unwrap(), cs.is_satisfied().unwrap())
    }

    #[test]
    fn geq_boundaries() {
        assert_eq!(geq(750, 700), (true, true));
        assert_eq!(geq(700, 700), (true, true));
        assert_eq!(geq(699, 700), (false, true));
        assert_eq!(geq(0, u64::MAX), (false, true));
        assert_eq!(geq(u64::MAX, 0), (true, true));
    }

    #[test]
    fn range_check_rejects_wraparound() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let v = FpVar::new_witness(cs.clone(), || Ok(Fr::from(5u64).neg())).unwrap();
        enforce_range(&v, 64).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn range_check_accepts_max() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let v = FpVar::new_witness(cs.clone(), || Ok(Fr::from(u64::MAX))).unwrap();
        enforce_range(&v, 64).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn bits_recompose() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let bits: Vec<Boolean<Fr>> = [true, false, true, true]
            .iter()
            .map(|&b| Boolean::new_witness(cs.clone(), || Ok(b)).unwrap())
            .collect();
        assert_eq!(bits_le_to_fp(&bits).unwrap().value().unwrap(), Fr::from(13u64));
    }

    #[test]
    fn path_gadget_matches_native_tree() {
        let leaves: Vec<Fr> = (0..6u64).map(Fr::from).collect();
        let tree = MerkleTree::from_leaves(leaves, 3, padding_leaf()).unwrap();
        let path = tree.get_proof(5).unwrap();

        let cs = ConstraintSystem::<Fr>::new_ref();
        let root = FpVar::new_input(cs.clone(), || Ok(tree.root())).unwrap();
        let leaf = FpVar::new_witness(cs.clone(), || Ok(Fr::from(5u64))).unwrap();
        let path_var = AuthPathVar::new_witness(cs.clone(), &path).unwrap();

        path_var.compute_root(cs.clone(), &leaf).unwrap().enforce_equal(&root).unwrap();
        assert_eq!(path_var.index().unwrap().value().unwrap(), Fr::from(5u64));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn path_gadget_rejects_wrong_leaf() {
        let leaves: Vec<Fr> = (0..6u64).map(Fr::from).collect();
        let tree = MerkleTree::from_leaves(leaves, 3, padding_leaf()).unwrap();
        let path = tree.get_proof(2).unwrap();

        let cs = ConstraintSystem::<Fr>::new_ref();
        let root = FpVar::new_input(cs.clone(), || Ok(tree.root())).unwrap();
        let leaf = FpVar::new_witness(cs.clone(), || Ok(Fr::from(3u64))).unwrap();
        let path_var = AuthPathVar::new_witness(cs.clone(), &path).unwrap();

        path_var.compute_root(cs.clone(), &leaf).unwrap().enforce_equal(&root).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }
}
