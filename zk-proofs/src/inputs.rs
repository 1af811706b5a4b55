//! Circuit input assembly.
//!
//! One input struct per predicate family, each built from a [`CommittedDataset`] by a
//! dedicated assembler that validates the request before any witness is produced.

use crate::commitment::CommittedDataset;
use crate::constants::{high_sentinel_key, low_sentinel_key, SPEND_SLOTS};
use crate::errors::ZkError;
use crate::hash::identity_hash;
use crate::leaf::spend_total;
use crate::merkle::AuthPath;
use crate::types::{Attribute, PredicateFamily, PredicateParams};
use ark_bn254::Fr;

/// CIBIL witness: `score >= threshold`.
#[derive(Clone, Debug)]
pub struct CibilInput {
    pub root: Fr,
    pub threshold: u64,
    pub id_hash: Fr,
    pub score: u64,
    pub path: AuthPath,
}

/// Budget witness: `sum(spends) <= budget`.
#[derive(Clone, Debug)]
pub struct BudgetInput {
    pub root: Fr,
    pub budget: u64,
    pub id_hash: Fr,
    pub spends: [u32; SPEND_SLOTS],
    pub path: AuthPath,
}

/// Fraud witness: two adjacent blacklist leaves bracketing `id_hash`.
#[derive(Clone, Debug)]
pub struct FraudInput {
    pub root: Fr,
    pub id_hash: Fr,
    pub low_key: Fr,
    pub low_path: AuthPath,
    pub high_key: Fr,
    pub high_path: AuthPath,
}

#[derive(Clone, Debug)]
pub enum CircuitInput {
    Cibil(CibilInput),
    Budget(BudgetInput),
    Fraud(FraudInput),
}

impl CibilInput {
    pub fn holds(&self) -> bool {
        self.score >= self.threshold
    }
}

impl BudgetInput {
    pub fn total(&self) -> u64 {
        spend_total(&self.spends)
    }

    pub fn holds(&self) -> bool {
        self.total() <= self.budget
    }
}

impl FraudInput {
    /// True when the identity is absent from the blacklist.
    pub fn holds(&self) -> bool {
        self.id_hash != self.low_key && self.id_hash != self.high_key
    }
}

impl CircuitInput {
    /// Build the witness for `identity` under `params` against a committed dataset.
    pub fn assemble(dataset: &CommittedDataset, identity: &str, params: &PredicateParams) -> Result<Self, ZkError> {
        if identity.trim().is_empty() {
            return Err(ZkError::InvalidInput("empty identity".to_string()));
        }
        if dataset.family() != params.family() {
            return Err(ZkError::InvalidInput(format!(
                "{} request against a {} dataset",
                params.family(),
                dataset.family()
            )));
        }

        match params {
            PredicateParams::Cibil { threshold } => assemble_cibil(dataset, identity, *threshold),
            PredicateParams::Budget { budget } => assemble_budget(dataset, identity, *budget),
            PredicateParams::Fraud => assemble_fraud(dataset, identity),
        }
    }

    /// Structurally valid input of the given depth, used to size circuits for key generation.
    pub fn blank(family: PredicateFamily, depth: usize) -> Self {
        let zero = Fr::from(0u64);
        match family {
            PredicateFamily::Cibil => CircuitInput::Cibil(CibilInput {
                root: zero,
                threshold: 0,
                id_hash: zero,
                score: 0,
                path: AuthPath::blank(depth),
            }),
            PredicateFamily::Budget => CircuitInput::Budget(BudgetInput {
                root: zero,
                budget: 0,
                id_hash: zero,
                spends: [0; SPEND_SLOTS],
                path: AuthPath::blank(depth),
            }),
            PredicateFamily::Fraud => CircuitInput::Fraud(FraudInput {
                root: zero,
                id_hash: zero,
                low_key: low_sentinel_key(),
                low_path: AuthPath::blank(depth),
                high_key: high_sentinel_key(),
                high_path: AuthPath::blank(depth),
            }),
        }
    }

    pub fn family(&self) -> PredicateFamily {
        match self {
            CircuitInput::Cibil(_) => PredicateFamily::Cibil,
            CircuitInput::Budget(_) => PredicateFamily::Budget,
            CircuitInput::Fraud(_) => PredicateFamily::Fraud,
        }
    }

    /// Predicate outcome evaluated natively on the witness.
    pub fn holds(&self) -> bool {
        match self {
            CircuitInput::Cibil(i) => i.holds(),
            CircuitInput::Budget(i) => i.holds(),
            CircuitInput::Fraud(i) => i.holds(),
        }
    }

    /// Public inputs in circuit allocation order; index 0 is the outcome.
    pub fn public_signals(&self) -> Vec<Fr> {
        let result = Fr::from(self.holds() as u64);
        match self {
            CircuitInput::Cibil(i) => vec![result, i.root, Fr::from(i.threshold)],
            CircuitInput::Budget(i) => vec![result, i.root, Fr::from(i.budget)],
            CircuitInput::Fraud(i) => vec![result, i.root],
        }
    }
}

fn assemble_cibil(dataset: &CommittedDataset, identity: &str, threshold: u64) -> Result<CircuitInput, ZkError> {
    let index = dataset.locate(identity).ok_or(ZkError::IdentityNotFound)?;
    let record = dataset.record_at(index)?;
    let Attribute::Score(score) = record.attribute else {
        return Err(ZkError::InvalidRecord("CIBIL record without a score".to_string()));
    };

    Ok(CircuitInput::Cibil(CibilInput {
        root: dataset.root(),
        threshold,
        id_hash: identity_hash(identity),
        score,
        path: dataset.tree().get_proof(index)?,
    }))
}

fn assemble_budget(dataset: &CommittedDataset, identity: &str, budget: u64) -> Result<CircuitInput, ZkError> {
    let index = dataset.locate(identity).ok_or(ZkError::IdentityNotFound)?;
    let record = dataset.record_at(index)?;
    let Attribute::Spends(spends) = record.attribute else {
        return Err(ZkError::InvalidRecord("budget record without spends".to_string()));
    };

    Ok(CircuitInput::Budget(BudgetInput {
        root: dataset.root(),
        budget,
        id_hash: identity_hash(identity),
        spends,
        path: dataset.tree().get_proof(index)?,
    }))
}

/// Absent identities are proven too: the bracketing pair then straddles the key.
fn assemble_fraud(dataset: &CommittedDataset, identity: &str) -> Result<CircuitInput, ZkError> {
    let id_hash = identity_hash(identity);
    let (low, high) = dataset.bracket(id_hash)?;
    let tree = dataset.tree();

    Ok(CircuitInput::Fraud(FraudInput {
        root: dataset.root(),
        id_hash,
        low_key: dataset.key_at(low)?,
        low_path: tree.get_proof(low)?,
        high_key: dataset.key_at(high)?,
        high_path: tree.get_proof(high)?,
    }))
}
