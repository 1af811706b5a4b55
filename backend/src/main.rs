use attestation_backend::config::{Cli, Command, PredicateArgs};
use attestation_backend::dataset::{synthetic_records, write_records};
use attestation_backend::db::SqliteHistory;
use attestation_backend::errors::ServiceError;
use attestation_backend::loopback::{LoopbackBehavior, LoopbackNetwork};
use attestation_backend::network::Credentials;
use attestation_backend::orchestrator::Orchestrator;
use attestation_backend::state::AppState;
use attestation_backend::ThresholdService;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use zk_proofs::groth16::encode_bundle;
use zk_proofs::PredicateFamily;

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().map_err(|_| ServiceError::Internal)?))
        .init();

    let cli = Cli::parse();
    let config = cli.config;
    let state = AppState::from_config(&config);

    match cli.command {
        Command::Setup => {
            for family in PredicateFamily::ALL {
                state.generate_artifacts(family).await?;
            }
        }
        Command::Synth(args) => {
            let records = synthetic_records(args.family.into(), args.count, args.seed);
            write_records(&args.out, &records)?;
            tracing::info!(out = %args.out.display(), count = records.len(), "synthetic dataset written");
        }
        Command::Prove(args) => {
            state.load_datasets(&config).await?;
            let service = build_service(&config, state).await?;
            prove(&service, &args).await?;
        }
        Command::Submit(args) => {
            state.load_datasets(&config).await?;
            let service = build_service(&config, state).await?;
            let params = args.params()?;

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_signal.cancel();
                }
            });

            let outcome = service.submit_proof_with_cancel(&args.identity, params, cancel).await;
            println!("{}", serde_json::to_string_pretty(&outcome).map_err(|_| ServiceError::Internal)?);
        }
    }

    Ok(())
}

async fn build_service(
    config: &attestation_backend::config::BackendConfig,
    state: AppState,
) -> Result<ThresholdService, ServiceError> {
    if let Some(parent) = config
        .database_url
        .strip_prefix("sqlite:")
        .map(std::path::Path::new)
        .and_then(|p| p.parent())
    {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|_| ServiceError::Internal)?;
        }
    }
    let history = SqliteHistory::open(&config.database_url).await?;

    let network = LoopbackNetwork::new(LoopbackBehavior::default());
    let orchestrator = Orchestrator::new(
        Arc::new(network),
        config.attestation_seed.clone().map(Credentials::new),
        config.verification_timeout(),
    )
    .with_domain(config.aggregation_domain);

    Ok(ThresholdService::new(state, orchestrator, Arc::new(history)).with_local_check(!config.skip_local_check))
}

async fn prove(service: &ThresholdService, args: &PredicateArgs) -> Result<(), ServiceError> {
    let params = args.params()?;
    let (bundle, _) = service.generate_proof(&args.identity, &params).await?;

    let output = serde_json::json!({
        "family": bundle.family,
        "result": bundle.result()?,
        "bundle": encode_bundle(&bundle)?,
    });
    println!("{}", serde_json::to_string_pretty(&output).map_err(|_| ServiceError::Internal)?);
    Ok(())
}
