use crate::errors::ServiceError;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use zk_proofs::constants::DEFAULT_TREE_DEPTH;
use zk_proofs::{PredicateFamily, PredicateParams};

#[derive(Debug, Parser)]
#[command(name = "attestation-backend", about = "Private threshold proofs with network attestation")]
pub struct Cli {
    #[command(flatten)]
    pub config: BackendConfig,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, Args)]
pub struct BackendConfig {
    /// Directory holding `<family>-d<depth>/groth16_{pk,vk}.bin`.
    #[arg(long, env = "ARTIFACTS_DIR", default_value = "data/artifacts")]
    pub artifacts_dir: PathBuf,

    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:data/history.sqlite")]
    pub database_url: String,

    #[arg(long, env = "CIBIL_DATASET")]
    pub cibil_dataset: Option<PathBuf>,

    #[arg(long, env = "BUDGET_DATASET")]
    pub budget_dataset: Option<PathBuf>,

    #[arg(long, env = "FRAUD_BLACKLIST")]
    pub fraud_blacklist: Option<PathBuf>,

    #[arg(long, env = "TREE_DEPTH", default_value_t = DEFAULT_TREE_DEPTH)]
    pub tree_depth: usize,

    #[arg(long, env = "VERIFICATION_TIMEOUT_SECS", default_value_t = 90)]
    pub verification_timeout_secs: u64,

    #[arg(long, env = "MAX_CONCURRENT_PROOFS", default_value_t = 2)]
    pub max_concurrent_proofs: usize,

    #[arg(long, env = "ATTESTATION_SEED", hide_env_values = true)]
    pub attestation_seed: Option<String>,

    /// When set, verification waits for an aggregation receipt in this domain.
    #[arg(long, env = "AGGREGATION_DOMAIN")]
    pub aggregation_domain: Option<u32>,

    #[arg(long, env = "SKIP_LOCAL_CHECK", default_value_t = false)]
    pub skip_local_check: bool,
}

impl BackendConfig {
    pub fn verification_timeout(&self) -> Duration {
        Duration::from_secs(self.verification_timeout_secs)
    }

    pub fn dataset_path(&self, family: PredicateFamily) -> Option<&PathBuf> {
        match family {
            PredicateFamily::Cibil => self.cibil_dataset.as_ref(),
            PredicateFamily::Budget => self.budget_dataset.as_ref(),
            PredicateFamily::Fraud => self.fraud_blacklist.as_ref(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate proving and verifying keys for every family (development only).
    Setup,
    /// Generate a proof and check it locally, without touching the network.
    Prove(PredicateArgs),
    /// Generate, check and submit a proof to the loopback attestation network.
    Submit(PredicateArgs),
    /// Write a deterministic synthetic dataset for one family.
    Synth(SynthArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FamilyArg {
    Cibil,
    Budget,
    Fraud,
}

impl From<FamilyArg> for PredicateFamily {
    fn from(f: FamilyArg) -> Self {
        match f {
            FamilyArg::Cibil => PredicateFamily::Cibil,
            FamilyArg::Budget => PredicateFamily::Budget,
            FamilyArg::Fraud => PredicateFamily::Fraud,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct PredicateArgs {
    #[arg(long)]
    pub identity: String,

    #[arg(long, value_enum)]
    pub predicate: FamilyArg,

    /// Score threshold (cibil) or spend budget (budget).
    #[arg(long)]
    pub threshold: Option<u64>,
}

impl PredicateArgs {
    pub fn params(&self) -> Result<PredicateParams, ServiceError> {
        let need = |name: &str| {
            self.threshold
                .ok_or_else(|| ServiceError::InvalidRequest(format!("--threshold is required for {name}")))
        };
        match self.predicate {
            FamilyArg::Cibil => Ok(PredicateParams::Cibil { threshold: need("cibil")? }),
            FamilyArg::Budget => Ok(PredicateParams::Budget { budget: need("budget")? }),
            FamilyArg::Fraud => Ok(PredicateParams::Fraud),
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct SynthArgs {
    #[arg(long, value_enum)]
    pub family: FamilyArg,

    #[arg(long, default_value_t = 100)]
    pub count: usize,

    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    #[arg(long)]
    pub out: PathBuf,
}
