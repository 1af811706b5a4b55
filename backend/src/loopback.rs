//! In-process attestation network.
//!
//! Checks submissions with the local verifier and replays the lifecycle a real
//! network would emit. The fault knobs in [`LoopbackBehavior`] drive the
//! orchestrator down its failure paths.

use crate::errors::ServiceError;
use crate::network::{
    AggregationReceipt, AttestationClient, AttestationSession, Credentials, NetworkEvent, StatementPath, Submission,
};
use async_trait::async_trait;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;
use uuid::Uuid;
use zk_proofs::groth16::decode_bundle;
use zk_proofs::verifier::verify_bundle;

#[derive(Clone, Debug, Default)]
pub struct LoopbackBehavior {
    /// Accept the submission but never emit anything.
    pub unreachable: bool,
    /// Refuse every submission, valid or not.
    pub reject_all: bool,
    /// Never publish aggregation receipts.
    pub skip_aggregation: bool,
    /// Emit every event twice, plus an unrelated receipt and a late `Finalized`.
    pub duplicate_events: bool,
    /// Drop the event transport right after inclusion.
    pub disconnect_after_inclusion: bool,
    /// Pause before each lifecycle step.
    pub event_delay: Duration,
}

#[derive(Debug, Default)]
pub struct LoopbackStats {
    pub sessions_opened: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub submissions: AtomicUsize,
}

impl LoopbackStats {
    pub fn opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    behavior: LoopbackBehavior,
    stats: Arc<LoopbackStats>,
    next_aggregation: Arc<AtomicU64>,
}

impl LoopbackNetwork {
    pub fn new(behavior: LoopbackBehavior) -> Self {
        Self { behavior, ..Self::default() }
    }

    pub fn stats(&self) -> Arc<LoopbackStats> {
        self.stats.clone()
    }
}

#[async_trait]
impl AttestationClient for LoopbackNetwork {
    async fn start_session(&self, credentials: &Credentials) -> Result<Box<dyn AttestationSession>, ServiceError> {
        if credentials.seed().trim().is_empty() {
            return Err(ServiceError::SeedCredentialMissing);
        }
        self.stats.sessions_opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(LoopbackSession {
            behavior: self.behavior.clone(),
            stats: self.stats.clone(),
            next_aggregation: self.next_aggregation.clone(),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            parked: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }))
    }
}

type Subscribers = Arc<Mutex<Vec<(u32, mpsc::Sender<AggregationReceipt>)>>>;

struct LoopbackSession {
    behavior: LoopbackBehavior,
    stats: Arc<LoopbackStats>,
    next_aggregation: Arc<AtomicU64>,
    subscribers: Subscribers,
    /// Event senders held open without ever sending (unreachable mode).
    parked: Mutex<Vec<mpsc::Sender<NetworkEvent>>>,
    closed: AtomicBool,
}

impl LoopbackSession {
    fn ensure_open(&self) -> Result<(), ServiceError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ServiceError::SubmissionError("session closed".to_string()));
        }
        Ok(())
    }
}

/// Deterministic statement id of a submission.
pub fn statement_id(submission: &Submission) -> String {
    let mut hasher = Sha256::new();
    hasher.update(submission.bundle.proof_b64.as_bytes());
    for s in &submission.bundle.public_signals {
        hasher.update(s.hex.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Aggregate root the loopback publishes for a single-statement aggregation.
pub fn aggregate_root(domain_id: u32, aggregation_id: u64, statement: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(domain_id.to_le_bytes());
    hasher.update(aggregation_id.to_le_bytes());
    hasher.update(statement.as_bytes());
    hex::encode(hasher.finalize())
}

fn check_submission(submission: &Submission) -> Result<(), String> {
    let vk_bytes = base64::engine::general_purpose::STANDARD
        .decode(&submission.vk_b64)
        .map_err(|e| format!("invalid verification key encoding: {e}"))?;
    let vk = zk_proofs::groth16::deserialize_vk(&vk_bytes).map_err(|e| e.to_string())?;
    let bundle = decode_bundle(&submission.bundle).map_err(|_| "proof does not decode".to_string())?;

    match verify_bundle(&vk, &bundle) {
        Ok(true) => Ok(()),
        Ok(false) => Err("proof verification failed".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

async fn publish_receipt(subscribers: &Subscribers, receipt: AggregationReceipt) {
    for (domain, tx) in subscribers.lock().await.iter() {
        if *domain == receipt.domain_id {
            let _ = tx.try_send(receipt.clone());
        }
    }
}

async fn emit(
    behavior: LoopbackBehavior,
    submission: Submission,
    tx: mpsc::Sender<NetworkEvent>,
    subscribers: Subscribers,
    next_aggregation: Arc<AtomicU64>,
) {
    let repeat = if behavior.duplicate_events { 2 } else { 1 };
    let send = move |event: NetworkEvent| {
        let tx = tx.clone();
        async move {
            for _ in 0..repeat {
                let _ = tx.send(event.clone()).await;
            }
        }
    };

    tokio::time::sleep(behavior.event_delay).await;
    let verdict = if behavior.reject_all { Err("submission rejected".to_string()) } else { check_submission(&submission) };
    if let Err(message) = verdict {
        debug!(%message, "loopback rejecting submission");
        send(NetworkEvent::Error { message }).await;
        return;
    }

    let statement = statement_id(&submission);
    let aggregation_id = submission
        .domain_id
        .map(|_| next_aggregation.fetch_add(1, Ordering::SeqCst) + 1);

    send(NetworkEvent::IncludedInBlock {
        statement: statement.clone(),
        block_hash: Uuid::new_v4().simple().to_string(),
        aggregation_id,
    })
    .await;

    if behavior.disconnect_after_inclusion {
        send(NetworkEvent::Disconnected { reason: "websocket closed".to_string() }).await;
        return;
    }

    tokio::time::sleep(behavior.event_delay).await;
    send(NetworkEvent::Finalized { statement: statement.clone() }).await;

    if let (Some(domain_id), Some(aggregation_id)) = (submission.domain_id, aggregation_id) {
        if !behavior.skip_aggregation {
            tokio::time::sleep(behavior.event_delay).await;
            if behavior.duplicate_events {
                let foreign = aggregation_id + 1_000;
                publish_receipt(
                    &subscribers,
                    AggregationReceipt { domain_id, aggregation_id: foreign, receipt: aggregate_root(domain_id, foreign, "") },
                )
                .await;
            }
            let receipt = AggregationReceipt {
                domain_id,
                aggregation_id,
                receipt: aggregate_root(domain_id, aggregation_id, &statement),
            };
            for _ in 0..repeat {
                publish_receipt(&subscribers, receipt.clone()).await;
            }
        }
    }

    if behavior.duplicate_events {
        send(NetworkEvent::Finalized { statement }).await;
    }
}

#[async_trait]
impl AttestationSession for LoopbackSession {
    async fn submit(&self, submission: Submission) -> Result<mpsc::Receiver<NetworkEvent>, ServiceError> {
        self.ensure_open()?;
        self.stats.submissions.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(16);
        if self.behavior.unreachable {
            self.parked.lock().await.push(tx);
            return Ok(rx);
        }

        tokio::spawn(emit(
            self.behavior.clone(),
            submission,
            tx,
            self.subscribers.clone(),
            self.next_aggregation.clone(),
        ));
        Ok(rx)
    }

    async fn subscribe(&self, domain_id: u32) -> Result<mpsc::Receiver<AggregationReceipt>, ServiceError> {
        self.ensure_open()?;
        let (tx, rx) = mpsc::channel(16);
        self.subscribers.lock().await.push((domain_id, tx));
        Ok(rx)
    }

    async fn aggregate_statement_path(
        &self,
        domain_id: u32,
        aggregation_id: u64,
        statement: &str,
    ) -> Result<StatementPath, ServiceError> {
        self.ensure_open()?;
        Ok(StatementPath {
            root: aggregate_root(domain_id, aggregation_id, statement),
            leaf: statement.to_string(),
            path: Vec::new(),
            leaf_index: 0,
            number_of_leaves: 1,
        })
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.parked.lock().await.clear();
        self.subscribers.lock().await.clear();
        self.stats.sessions_closed.fetch_add(1, Ordering::SeqCst);
    }
}
