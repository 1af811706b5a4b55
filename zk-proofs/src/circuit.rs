//! R1CS circuits for the three predicate families.
//!
//! Every circuit proves, for a private record committed under a public Merkle root,
//! that a public bit `result` equals the predicate evaluated on that record. The
//! bit is the first public input, so both outcomes are provable and `result = 0`
//! is a valid proof rather than a failure.
//!
//! Public input order (MUST match `CircuitInput::public_signals`):
//! - CIBIL:  result, root, threshold
//! - Budget: result, root, budget
//! - Fraud:  result, root
//!
//! The Fraud statement is "some identity hash is absent from the list under `root`".
//! The hash stays private and nothing public binds it, so a verifier learns that the
//! prover knows an unlisted identity, not which one.

use crate::constants::{ATTRIBUTE_BITS, IDENTITY_HASH_BITS, SET_KEY_BITS};
use crate::gadgets::{bool_to_fp, enforce_range, is_geq, AuthPathVar};
use crate::hash::{poseidon_hash_one_var, poseidon_hash_two_var};
use crate::inputs::{BudgetInput, CibilInput, CircuitInput, FraudInput};
use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

/// Credit score at or above a public threshold.
#[derive(Clone, Debug)]
pub struct CibilCircuit {
    pub input: CibilInput,
    /// Claimed outcome; the honest value is `score >= threshold`.
    pub result: bool,
}

impl CibilCircuit {
    pub fn new(input: CibilInput) -> Self {
        let result = input.holds();
        Self { input, result }
    }
}

impl ConstraintSynthesizer<Fr> for CibilCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let input = self.input;

        let result = FpVar::<Fr>::new_input(cs.clone(), || Ok(Fr::from(self.result as u64)))?;
        let root = FpVar::<Fr>::new_input(cs.clone(), || Ok(input.root))?;
        let threshold = FpVar::<Fr>::new_input(cs.clone(), || Ok(Fr::from(input.threshold)))?;

        let id_hash = FpVar::<Fr>::new_witness(cs.clone(), || Ok(input.id_hash))?;
        let score = FpVar::<Fr>::new_witness(cs.clone(), || Ok(Fr::from(input.score)))?;
        let path = AuthPathVar::new_witness(cs.clone(), &input.path)?;

        enforce_range(&score, ATTRIBUTE_BITS)?;
        enforce_range(&threshold, ATTRIBUTE_BITS)?;

        // Membership: the record leaf hashes up to the public root.
        let leaf = poseidon_hash_two_var(cs.clone(), &id_hash, &score)?;
        path.compute_root(cs.clone(), &leaf)?.enforce_equal(&root)?;

        let holds = is_geq(&score, &threshold, ATTRIBUTE_BITS)?;
        bool_to_fp(&holds)?.enforce_equal(&result)?;

        Ok(())
    }
}

/// Total spend at or below a public budget.
#[derive(Clone, Debug)]
pub struct BudgetCircuit {
    pub input: BudgetInput,
    pub result: bool,
}

impl BudgetCircuit {
    pub fn new(input: BudgetInput) -> Self {
        let result = input.holds();
        Self { input, result }
    }
}

impl ConstraintSynthesizer<Fr> for BudgetCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let input = self.input;

        let result = FpVar::<Fr>::new_input(cs.clone(), || Ok(Fr::from(self.result as u64)))?;
        let root = FpVar::<Fr>::new_input(cs.clone(), || Ok(input.root))?;
        let budget = FpVar::<Fr>::new_input(cs.clone(), || Ok(Fr::from(input.budget)))?;

        let id_hash = FpVar::<Fr>::new_witness(cs.clone(), || Ok(input.id_hash))?;
        let mut total = FpVar::<Fr>::constant(Fr::from(0u64));
        for spend in input.spends {
            let s = FpVar::<Fr>::new_witness(cs.clone(), || Ok(Fr::from(spend as u64)))?;
            enforce_range(&s, 32)?;
            total += s;
        }
        let path = AuthPathVar::new_witness(cs.clone(), &input.path)?;

        enforce_range(&budget, ATTRIBUTE_BITS)?;

        let leaf = poseidon_hash_two_var(cs.clone(), &id_hash, &total)?;
        path.compute_root(cs.clone(), &leaf)?.enforce_equal(&root)?;

        // total <= budget  <=>  budget >= total
        let holds = is_geq(&budget, &total, ATTRIBUTE_BITS)?;
        bool_to_fp(&holds)?.enforce_equal(&result)?;

        Ok(())
    }
}

/// Identity absent from a sorted, sentinel-framed blacklist.
///
/// The witness is two adjacent leaves `low`, `high` with `low <= id <= high`. Keys are
/// strictly increasing, so a listed identity can only be bracketed by a pair that
/// contains it; the outcome is therefore `id != low && id != high`.
#[derive(Clone, Debug)]
pub struct FraudCircuit {
    pub input: FraudInput,
    pub result: bool,
}

impl FraudCircuit {
    pub fn new(input: FraudInput) -> Self {
        let result = input.holds();
        Self { input, result }
    }
}

impl ConstraintSynthesizer<Fr> for FraudCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let input = self.input;

        let result = FpVar::<Fr>::new_input(cs.clone(), || Ok(Fr::from(self.result as u64)))?;
        let root = FpVar::<Fr>::new_input(cs.clone(), || Ok(input.root))?;

        let id_hash = FpVar::<Fr>::new_witness(cs.clone(), || Ok(input.id_hash))?;
        let low_key = FpVar::<Fr>::new_witness(cs.clone(), || Ok(input.low_key))?;
        let high_key = FpVar::<Fr>::new_witness(cs.clone(), || Ok(input.high_key))?;
        let low_path = AuthPathVar::new_witness(cs.clone(), &input.low_path)?;
        let high_path = AuthPathVar::new_witness(cs.clone(), &input.high_path)?;

        enforce_range(&id_hash, IDENTITY_HASH_BITS)?;
        enforce_range(&low_key, SET_KEY_BITS)?;
        enforce_range(&high_key, SET_KEY_BITS)?;

        // Both leaves are committed under the root.
        let low_leaf = poseidon_hash_one_var(cs.clone(), &low_key)?;
        low_path.compute_root(cs.clone(), &low_leaf)?.enforce_equal(&root)?;
        let high_leaf = poseidon_hash_one_var(cs.clone(), &high_key)?;
        high_path.compute_root(cs.clone(), &high_leaf)?.enforce_equal(&root)?;

        // ...and adjacent.
        let one = FpVar::<Fr>::constant(Fr::from(1u64));
        (low_path.index()? + &one).enforce_equal(&high_path.index()?)?;

        // low <= id <= high
        is_geq(&id_hash, &low_key, SET_KEY_BITS)?.enforce_equal(&Boolean::TRUE)?;
        is_geq(&high_key, &id_hash, SET_KEY_BITS)?.enforce_equal(&Boolean::TRUE)?;

        let eq_low = bool_to_fp(&id_hash.is_eq(&low_key)?)?;
        let eq_high = bool_to_fp(&id_hash.is_eq(&high_key)?)?;
        let member = &eq_low + &eq_high - &eq_low * &eq_high;
        (one - member).enforce_equal(&result)?;

        Ok(())
    }
}

/// Family dispatch over the three circuits.
#[derive(Clone, Debug)]
pub enum PredicateCircuit {
    Cibil(CibilCircuit),
    Budget(BudgetCircuit),
    Fraud(FraudCircuit),
}

impl From<CircuitInput> for PredicateCircuit {
    fn from(input: CircuitInput) -> Self {
        match input {
            CircuitInput::Cibil(i) => PredicateCircuit::Cibil(CibilCircuit::new(i)),
            CircuitInput::Budget(i) => PredicateCircuit::Budget(BudgetCircuit::new(i)),
            CircuitInput::Fraud(i) => PredicateCircuit::Fraud(FraudCircuit::new(i)),
        }
    }
}

impl ConstraintSynthesizer<Fr> for PredicateCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        match self {
            PredicateCircuit::Cibil(c) => c.generate_constraints(cs),
            PredicateCircuit::Budget(c) => c.generate_constraints(cs),
            PredicateCircuit::Fraud(c) => c.generate_constraints(cs),
        }
    }
}
