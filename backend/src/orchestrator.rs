//! Verification orchestrator.
//!
//! Drives one attestation session per proof:
//!
//! `Created -> SessionStarted -> Submitted -> IncludedInBlock -> Finalized [-> Aggregated] -> Resolved`
//!
//! with `Failed`, `TimedOut` and `Cancelled` reachable from any non-terminal phase.
//! A session settles exactly once, the network session is closed on every exit
//! path, and the whole exchange is bounded by a single deadline.

use crate::errors::ServiceError;
use crate::models::{AggregationProof, Pending, VerificationResult};
use crate::network::{
    AggregationReceipt, AttestationClient, AttestationSession, Credentials, NetworkEvent, ProofScheme, Submission,
};
use ark_bn254::Bn254;
use ark_groth16::VerifyingKey;
use base64::Engine;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use zk_proofs::groth16::{encode_bundle, serialize_vk};
use zk_proofs::{PredicateFamily, ProofBundle};

/// Receipts seen before their statement was finalized; bounded.
const MAX_BUFFERED_RECEIPTS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Created,
    SessionStarted,
    Submitted,
    IncludedInBlock,
    Finalized,
    Aggregated,
    Resolved,
    Failed,
    TimedOut,
    Cancelled,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Resolved | SessionPhase::Failed | SessionPhase::TimedOut | SessionPhase::Cancelled)
    }

    fn can_advance_to(self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        match (self, next) {
            (Created, SessionStarted)
            | (SessionStarted, Submitted)
            | (Submitted, IncludedInBlock)
            | (Submitted | IncludedInBlock, Finalized)
            | (Finalized, Aggregated)
            | (IncludedInBlock | Finalized | Aggregated, Resolved) => true,
            (from, Failed | TimedOut | Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Bookkeeping for one verification.
#[derive(Debug)]
pub struct VerificationSession {
    id: Uuid,
    family: PredicateFamily,
    phase: SessionPhase,
    statement: Option<String>,
    block_hash: Option<String>,
    aggregation_id: Option<u64>,
    settled: bool,
}

impl VerificationSession {
    pub fn new(family: PredicateFamily) -> Self {
        Self {
            id: Uuid::new_v4(),
            family,
            phase: SessionPhase::Created,
            statement: None,
            block_hash: None,
            aggregation_id: None,
            settled: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn included(&self) -> bool {
        self.block_hash.is_some()
    }

    /// Move to `next` if the transition is legal; illegal or late moves are ignored.
    pub fn advance(&mut self, next: SessionPhase) -> bool {
        if self.settled || !self.phase.can_advance_to(next) {
            debug!(session = %self.id, from = ?self.phase, to = ?next, "transition ignored");
            return false;
        }
        debug!(session = %self.id, from = ?self.phase, to = ?next, "transition");
        self.phase = next;
        true
    }

    /// Enter a terminal phase. Only the first call has any effect.
    pub fn settle(&mut self, terminal: SessionPhase) -> bool {
        if self.settled || !terminal.is_terminal() {
            return false;
        }
        let moved = self.advance(terminal);
        self.settled = moved;
        moved
    }

    fn record_inclusion(&mut self, statement: String, block_hash: String, aggregation_id: Option<u64>) {
        self.statement = Some(statement);
        self.block_hash = Some(block_hash);
        self.aggregation_id = aggregation_id;
    }
}

/// Closes the network session when dropped without an explicit `close`.
struct SessionHandle {
    session: Arc<dyn AttestationSession>,
    closed: bool,
}

impl SessionHandle {
    fn new(session: Box<dyn AttestationSession>) -> Self {
        Self { session: Arc::from(session), closed: false }
    }

    async fn close(mut self) {
        self.closed = true;
        self.session.close().await;
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let session = self.session.clone();
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            rt.spawn(async move { session.close().await });
        }
    }
}

async fn next_receipt(rx: &mut Option<mpsc::Receiver<AggregationReceipt>>) -> Option<AggregationReceipt> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    client: Arc<dyn AttestationClient>,
    credentials: Option<Credentials>,
    timeout: Duration,
    domain_id: Option<u32>,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn AttestationClient>, credentials: Option<Credentials>, timeout: Duration) -> Self {
        Self { client, credentials, timeout, domain_id: None }
    }

    /// Wait for an aggregation receipt in `domain_id` before resolving.
    pub fn with_domain(mut self, domain_id: Option<u32>) -> Self {
        self.domain_id = domain_id;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Submit `bundle` for attestation and wait for the outcome.
    pub async fn verify(
        &self,
        bundle: &ProofBundle,
        vk: &VerifyingKey<Bn254>,
        cancel: CancellationToken,
    ) -> Result<VerificationResult, ServiceError> {
        let credentials = self.credentials.clone().ok_or(ServiceError::SeedCredentialMissing)?;
        let result = bundle.result()?;
        let submission = Submission {
            scheme: ProofScheme::Groth16Bn254,
            bundle: encode_bundle(bundle)?,
            vk_b64: base64::engine::general_purpose::STANDARD.encode(serialize_vk(vk)?),
            domain_id: self.domain_id,
        };

        let mut session = VerificationSession::new(bundle.family);
        let deadline = Instant::now() + self.timeout;

        let opened = self.bounded(self.client.start_session(&credentials), deadline, &cancel).await;
        let handle = match opened {
            Ok(s) => SessionHandle::new(s),
            Err(e) => {
                session.settle(terminal_phase(&e));
                error!(session = %session.id, family = %session.family, error = %e, "could not start attestation session");
                return Err(e);
            }
        };
        session.advance(SessionPhase::SessionStarted);

        let outcome = self.drive(&mut session, &handle, submission, result, deadline, &cancel).await;
        handle.close().await;

        match &outcome {
            Ok(r) => {
                session.settle(SessionPhase::Resolved);
                info!(
                    session = %session.id,
                    family = %session.family,
                    statement = r.statement.as_deref().unwrap_or(""),
                    verified = r.verified,
                    pending = ?r.pending,
                    "verification resolved"
                );
            }
            Err(e) => {
                session.settle(terminal_phase(e));
                error!(session = %session.id, family = %session.family, error = %e, "verification failed");
            }
        }
        outcome
    }

    /// Race `fut` against the deadline and the cancellation token.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, ServiceError>>,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<T, ServiceError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ServiceError::Cancelled),
            _ = sleep_until(deadline) => Err(ServiceError::VerificationTimeout(self.timeout)),
            r = fut => r,
        }
    }

    async fn drive(
        &self,
        session: &mut VerificationSession,
        handle: &SessionHandle,
        submission: Submission,
        result: u8,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<VerificationResult, ServiceError> {
        let domain_id = submission.domain_id;

        // Subscribe before submitting so no receipt can slip past.
        let mut receipts = match domain_id {
            Some(d) => Some(self.bounded(handle.session.subscribe(d), deadline, cancel).await?),
            None => None,
        };
        let mut events = self.bounded(handle.session.submit(submission), deadline, cancel).await?;
        session.advance(SessionPhase::Submitted);
        info!(session = %session.id, family = %session.family, "proof submitted");

        let mut events_open = true;
        let mut finalized = false;
        let mut buffered: Vec<AggregationReceipt> = Vec::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ServiceError::Cancelled),
                _ = sleep_until(deadline) => return self.on_deadline(session, result, finalized),
                event = events.recv(), if events_open => match event {
                    Some(NetworkEvent::IncludedInBlock { statement, block_hash, aggregation_id }) => {
                        if session.included() {
                            debug!(session = %session.id, "duplicate inclusion ignored");
                            continue;
                        }
                        info!(session = %session.id, %statement, %block_hash, ?aggregation_id, "included in block");
                        session.record_inclusion(statement, block_hash, aggregation_id);
                        session.advance(SessionPhase::IncludedInBlock);

                        // Finalization raced ahead of inclusion.
                        if finalized {
                            match (domain_id, aggregation_id) {
                                (Some(domain), Some(aggregation_id)) => {
                                    if let Some(receipt) = take_receipt(&mut buffered, domain, aggregation_id) {
                                        return self.aggregated(session, handle, result, receipt, deadline, cancel).await;
                                    }
                                }
                                _ => return Ok(resolved(session, result, None, None)),
                            }
                        }
                    }
                    Some(NetworkEvent::Finalized { statement }) => {
                        if finalized {
                            debug!(session = %session.id, "duplicate finalization ignored");
                            continue;
                        }
                        finalized = true;
                        if session.statement.is_none() {
                            session.statement = Some(statement);
                        }
                        session.advance(SessionPhase::Finalized);

                        match (domain_id, session.aggregation_id) {
                            (Some(domain), Some(aggregation_id)) => {
                                if let Some(receipt) = take_receipt(&mut buffered, domain, aggregation_id) {
                                    return self.aggregated(session, handle, result, receipt, deadline, cancel).await;
                                }
                                debug!(session = %session.id, aggregation_id, "finalized; awaiting aggregation receipt");
                            }
                            (Some(_), None) if !session.included() => {
                                debug!(session = %session.id, "finalized before inclusion; awaiting aggregation id");
                            }
                            _ => return Ok(resolved(session, result, None, None)),
                        }
                    }
                    Some(NetworkEvent::Error { message }) => {
                        warn!(session = %session.id, %message, "network rejected submission");
                        return Err(ServiceError::SubmissionError(message));
                    }
                    Some(NetworkEvent::Disconnected { reason }) => {
                        if !session.included() && !finalized {
                            return Err(ServiceError::EventStreamError(reason));
                        }
                        warn!(session = %session.id, %reason, "event stream dropped after inclusion; waiting");
                        events_open = false;
                    }
                    None => {
                        if !session.included() && !finalized {
                            return Err(ServiceError::EventStreamError("event stream closed".to_string()));
                        }
                        warn!(session = %session.id, "event stream closed after inclusion; waiting");
                        events_open = false;
                    }
                },
                receipt = next_receipt(&mut receipts) => match receipt {
                    Some(r) => {
                        let ours = Some(r.domain_id) == domain_id
                            && session.aggregation_id.is_none_or(|id| id == r.aggregation_id);
                        if !ours {
                            debug!(session = %session.id, aggregation_id = r.aggregation_id, "unrelated receipt ignored");
                        } else if finalized && session.aggregation_id == Some(r.aggregation_id) {
                            return self.aggregated(session, handle, result, r, deadline, cancel).await;
                        } else if buffered.len() < MAX_BUFFERED_RECEIPTS {
                            buffered.push(r);
                        }
                    }
                    None => {
                        warn!(session = %session.id, "receipt subscription closed");
                        receipts = None;
                    }
                },
            }
        }
    }

    async fn aggregated(
        &self,
        session: &mut VerificationSession,
        handle: &SessionHandle,
        result: u8,
        receipt: AggregationReceipt,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<VerificationResult, ServiceError> {
        session.advance(SessionPhase::Aggregated);
        let statement = session.statement.clone().unwrap_or_default();
        let path = self
            .bounded(
                handle.session.aggregate_statement_path(receipt.domain_id, receipt.aggregation_id, &statement),
                deadline,
                cancel,
            )
            .await;

        match path {
            Ok(path) => {
                let proof = AggregationProof {
                    domain_id: receipt.domain_id,
                    aggregation_id: receipt.aggregation_id,
                    receipt: receipt.receipt,
                    root: path.root,
                    path: path.path,
                    leaf_index: path.leaf_index,
                    number_of_leaves: path.number_of_leaves,
                };
                Ok(resolved(session, result, Some(proof), None))
            }
            Err(ServiceError::Cancelled) => Err(ServiceError::Cancelled),
            Err(e) => {
                warn!(session = %session.id, error = %e, "statement path unavailable");
                Ok(resolved(session, result, None, Some(Pending::Aggregation)))
            }
        }
    }

    /// Past inclusion or finalization the proof is accepted and only the final receipt is missing.
    fn on_deadline(&self, session: &VerificationSession, result: u8, finalized: bool) -> Result<VerificationResult, ServiceError> {
        if !session.included() && !finalized {
            return Err(ServiceError::VerificationTimeout(self.timeout));
        }
        let pending = if finalized { Pending::Aggregation } else { Pending::Finalization };
        warn!(session = %session.id, ?pending, "deadline reached after inclusion");
        Ok(resolved(session, result, None, Some(pending)))
    }
}

fn take_receipt(buffered: &mut Vec<AggregationReceipt>, domain: u32, aggregation_id: u64) -> Option<AggregationReceipt> {
    let pos = buffered.iter().position(|r| r.domain_id == domain && r.aggregation_id == aggregation_id)?;
    Some(buffered.swap_remove(pos))
}

fn resolved(
    session: &VerificationSession,
    result: u8,
    aggregation: Option<AggregationProof>,
    pending: Option<Pending>,
) -> VerificationResult {
    VerificationResult {
        verified: true,
        result,
        statement: session.statement.clone(),
        block_hash: session.block_hash.clone(),
        aggregation,
        pending,
    }
}

fn terminal_phase(e: &ServiceError) -> SessionPhase {
    match e {
        ServiceError::VerificationTimeout(_) => SessionPhase::TimedOut,
        ServiceError::Cancelled => SessionPhase::Cancelled,
        _ => SessionPhase::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::StatementPath;
    use ark_bn254::Fr;
    use ark_groth16::Proof;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Clone, Debug)]
    enum Step {
        Event(NetworkEvent),
        Receipt(AggregationReceipt),
        /// Keep both channels open forever.
        Hang,
    }

    #[derive(Clone, Default)]
    struct Scripted {
        steps: Vec<Step>,
        closes: Arc<AtomicUsize>,
    }

    struct ScriptedSession {
        steps: Vec<Step>,
        closes: Arc<AtomicUsize>,
        receipts: Mutex<Option<mpsc::Sender<AggregationReceipt>>>,
    }

    #[async_trait]
    impl AttestationClient for Scripted {
        async fn start_session(&self, _: &Credentials) -> Result<Box<dyn AttestationSession>, ServiceError> {
            Ok(Box::new(ScriptedSession {
                steps: self.steps.clone(),
                closes: self.closes.clone(),
                receipts: Mutex::new(None),
            }))
        }
    }

    #[async_trait]
    impl AttestationSession for ScriptedSession {
        async fn submit(&self, _: Submission) -> Result<mpsc::Receiver<NetworkEvent>, ServiceError> {
            let (tx, rx) = mpsc::channel(32);
            let receipts = self.receipts.lock().await.clone();
            let steps = self.steps.clone();
            tokio::spawn(async move {
                for step in steps {
                    match step {
                        Step::Event(e) => {
                            let _ = tx.send(e).await;
                        }
                        Step::Receipt(r) => {
                            if let Some(rtx) = &receipts {
                                let _ = rtx.send(r).await;
                            }
                        }
                        Step::Hang => {
                            let _keep = (tx, receipts);
                            std::future::pending::<()>().await;
                            return;
                        }
                    }
                }
            });
            Ok(rx)
        }

        async fn subscribe(&self, _: u32) -> Result<mpsc::Receiver<AggregationReceipt>, ServiceError> {
            let (tx, rx) = mpsc::channel(32);
            *self.receipts.lock().await = Some(tx);
            Ok(rx)
        }

        async fn aggregate_statement_path(&self, _: u32, _: u64, statement: &str) -> Result<StatementPath, ServiceError> {
            Ok(StatementPath {
                root: "root".to_string(),
                leaf: statement.to_string(),
                path: vec!["sib".to_string()],
                leaf_index: 3,
                number_of_leaves: 8,
            })
        }

        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn bundle(result: u64) -> ProofBundle {
        ProofBundle {
            family: PredicateFamily::Cibil,
            proof: Proof::<Bn254>::default(),
            public_signals: vec![Fr::from(result), Fr::from(7u64), Fr::from(700u64)],
        }
    }

    fn included(aggregation_id: Option<u64>) -> Step {
        Step::Event(NetworkEvent::IncludedInBlock {
            statement: "stmt".to_string(),
            block_hash: "0xblock".to_string(),
            aggregation_id,
        })
    }

    fn finalized() -> Step {
        Step::Event(NetworkEvent::Finalized { statement: "stmt".to_string() })
    }

    fn receipt(aggregation_id: u64) -> Step {
        Step::Receipt(AggregationReceipt { domain_id: 1, aggregation_id, receipt: format!("r{aggregation_id}") })
    }

    fn orchestrator(script: &Scripted, domain: Option<u32>) -> Orchestrator {
        Orchestrator::new(Arc::new(script.clone()), Some(Credentials::new("seed")), Duration::from_secs(90)).with_domain(domain)
    }

    async fn run(script: &Scripted, domain: Option<u32>, result: u64) -> Result<VerificationResult, ServiceError> {
        orchestrator(script, domain)
            .verify(&bundle(result), &VerifyingKey::<Bn254>::default(), CancellationToken::new())
            .await
    }

    #[test]
    fn settles_exactly_once() {
        let mut s = VerificationSession::new(PredicateFamily::Fraud);
        assert!(s.advance(SessionPhase::SessionStarted));
        assert!(!s.advance(SessionPhase::Finalized));
        assert!(s.settle(SessionPhase::Failed));
        assert!(!s.settle(SessionPhase::Resolved));
        assert!(!s.advance(SessionPhase::Submitted));
        assert_eq!(s.phase(), SessionPhase::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn finalization_resolves_without_domain() {
        let script = Scripted { steps: vec![included(None), finalized()], ..Default::default() };
        let r = run(&script, None, 1).await.unwrap();
        assert!(r.verified);
        assert_eq!(r.result, 1);
        assert_eq!(r.statement.as_deref(), Some("stmt"));
        assert_eq!(r.pending, None);
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn negative_outcome_is_still_verified() {
        let script = Scripted { steps: vec![included(None), finalized()], ..Default::default() };
        let r = run(&script, None, 0).await.unwrap();
        assert!(r.verified);
        assert_eq!(r.result, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_matching_receipt() {
        let script = Scripted {
            steps: vec![included(Some(5)), finalized(), receipt(9), receipt(5), Step::Hang],
            ..Default::default()
        };
        let r = run(&script, Some(1), 1).await.unwrap();
        let agg = r.aggregation.unwrap();
        assert_eq!(agg.aggregation_id, 5);
        assert_eq!(agg.receipt, "r5");
        assert_eq!(agg.leaf_index, 3);
        assert_eq!(r.pending, None);
    }

    #[tokio::test(start_paused = true)]
    async fn receipt_before_finalization_is_buffered() {
        let script = Scripted {
            steps: vec![included(Some(2)), receipt(2), finalized(), Step::Hang],
            ..Default::default()
        };
        let r = run(&script, Some(1), 1).await.unwrap();
        assert_eq!(r.aggregation.unwrap().aggregation_id, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicates_after_resolution_are_ignored() {
        let script = Scripted {
            steps: vec![included(None), included(None), finalized(), finalized(), included(None)],
            ..Default::default()
        };
        let r = run(&script, None, 1).await.unwrap();
        assert!(r.verified);
        assert_eq!(r.pending, None);
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_network_times_out_and_closes() {
        let script = Scripted { steps: vec![Step::Hang], ..Default::default() };
        let err = run(&script, None, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::VerificationTimeout(_)));
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_after_inclusion_resolves_pending() {
        let script = Scripted { steps: vec![included(Some(4)), finalized(), Step::Hang], ..Default::default() };
        let r = run(&script, Some(1), 1).await.unwrap();
        assert!(r.verified);
        assert_eq!(r.pending, Some(Pending::Aggregation));

        let script = Scripted { steps: vec![included(None), Step::Hang], ..Default::default() };
        let r = run(&script, None, 1).await.unwrap();
        assert_eq!(r.pending, Some(Pending::Finalization));
    }

    #[tokio::test(start_paused = true)]
    async fn finalization_before_inclusion_still_waits_for_receipt() {
        let script = Scripted {
            steps: vec![finalized(), receipt(6), included(Some(6)), Step::Hang],
            ..Default::default()
        };
        let r = run(&script, Some(1), 1).await.unwrap();
        assert_eq!(r.pending, None);
        assert_eq!(r.block_hash.as_deref(), Some("0xblock"));
        assert_eq!(r.aggregation.unwrap().aggregation_id, 6);

        let script = Scripted { steps: vec![finalized(), Step::Hang], ..Default::default() };
        let r = run(&script, Some(1), 1).await.unwrap();
        assert!(r.verified);
        assert!(r.aggregation.is_none());
        assert_eq!(r.pending, Some(Pending::Aggregation));
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_before_inclusion_is_an_error() {
        let script = Scripted {
            steps: vec![Step::Event(NetworkEvent::Disconnected { reason: "reset".to_string() }), Step::Hang],
            ..Default::default()
        };
        assert!(matches!(run(&script, None, 1).await, Err(ServiceError::EventStreamError(_))));
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_after_inclusion_is_absorbed() {
        let script = Scripted {
            steps: vec![included(None), Step::Event(NetworkEvent::Disconnected { reason: "reset".to_string() })],
            ..Default::default()
        };
        let r = run(&script, None, 1).await.unwrap();
        assert!(r.verified);
        assert_eq!(r.pending, Some(Pending::Finalization));
    }

    #[tokio::test(start_paused = true)]
    async fn network_error_is_a_submission_error() {
        let script = Scripted {
            steps: vec![Step::Event(NetworkEvent::Error { message: "bad proof".to_string() })],
            ..Default::default()
        };
        let err = run(&script, None, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::SubmissionError(ref m) if m == "bad proof"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_closes_session() {
        let script = Scripted { steps: vec![included(None), Step::Hang], ..Default::default() };
        let cancel = CancellationToken::new();
        let orch = orchestrator(&script, None);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let err = orch.verify(&bundle(1), &VerifyingKey::<Bn254>::default(), cancel).await.unwrap_err();
        assert!(matches!(err, ServiceError::Cancelled));
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_seed_fails_before_network() {
        let script = Scripted::default();
        let orch = Orchestrator::new(Arc::new(script.clone()), None, Duration::from_secs(1));
        let err = orch
            .verify(&bundle(1), &VerifyingKey::<Bn254>::default(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::SeedCredentialMissing));
        assert_eq!(script.closes.load(Ordering::SeqCst), 0);
    }
}
