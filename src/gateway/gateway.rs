use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::Mutex as AsyncMutex;

use crate::{
    gateway::{
        error::{ReconcileError, invalid_input},
        ports::{DecisionStore, SettlementPort},
        telemetry::{IterationObservation, PaymentMetricsSink, PaymentObservation, claim_status},
        types::{BillingClaim, ClaimId, ClaimKind, DecisionOutcome, ReconciliationDecision},
    },
    ledger::{AgreementLedger, IterationReport},
    params::ParamStore,
    reputation::{ReputationEntry, ReputationStore},
};

const BAN_REASON_NO_WORK: &str = "failed to deliver work";

/// Accept/reject pipeline for every invoice and debit note. Composes the
/// agreement ledger, the reputation store and the parameter store, persists
/// outcomes through the decision store and forwards accepted claims to the
/// settlement collaborator. Holds no persistent state of its own.
pub struct PaymentGateway {
    ledger: Arc<AgreementLedger>,
    reputation: Arc<ReputationStore>,
    params: Arc<ParamStore>,
    settlement: Arc<dyn SettlementPort>,
    decisions: Arc<dyn DecisionStore>,
    metrics: Arc<dyn PaymentMetricsSink>,
    claim_locks: Mutex<HashMap<ClaimId, Arc<AsyncMutex<()>>>>,
}

impl PaymentGateway {
    pub fn new(
        ledger: Arc<AgreementLedger>,
        reputation: Arc<ReputationStore>,
        params: Arc<ParamStore>,
        settlement: Arc<dyn SettlementPort>,
        decisions: Arc<dyn DecisionStore>,
        metrics: Arc<dyn PaymentMetricsSink>,
    ) -> Self {
        Self {
            ledger,
            reputation,
            params,
            settlement,
            decisions,
            metrics,
            claim_locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn accept_invoice(
        &self,
        claim: &BillingClaim,
    ) -> Result<ReconciliationDecision, ReconcileError> {
        if claim.kind != ClaimKind::Invoice {
            return Err(invalid_input(format!(
                "claim {} is not an invoice",
                claim.claim_id
            )));
        }
        self.process_claim(claim).await
    }

    pub async fn accept_debit_note(
        &self,
        claim: &BillingClaim,
    ) -> Result<ReconciliationDecision, ReconcileError> {
        if claim.kind != ClaimKind::DebitNote {
            return Err(invalid_input(format!(
                "claim {} is not a debit note",
                claim.claim_id
            )));
        }
        self.process_claim(claim).await
    }

    /// Records a throughput sample and meters the iteration duration.
    pub async fn record_iteration(&self, report: &IterationReport) {
        self.ledger.record_iteration(report).await;
        self.metrics.observe_iteration(&IterationObservation {
            provider_id: report.provider_id.clone(),
            provider_name: report.provider_name.clone(),
            agreement_id: report.agreement_id.clone(),
            iteration_no: report.iteration_no,
            status: report.status,
            duration_sec: report.duration_sec,
        });
    }

    pub async fn process_claim(
        &self,
        claim: &BillingClaim,
    ) -> Result<ReconciliationDecision, ReconcileError> {
        // One claim id is evaluated and settled by one task at a time.
        // Duplicate submissions queue here and are answered by the replay
        // guard once the first evaluation has run to completion.
        let _claim_guard = self.claim_lock(&claim.claim_id).lock_owned().await;
        match self.process_claim_inner(claim).await {
            Ok(decision) => Ok(decision),
            Err(err) => {
                tracing::error!(
                    target: "gateway",
                    claim_id = %claim.claim_id,
                    agreement_id = %claim.agreement_id,
                    error = %err,
                    "claim processing failed"
                );
                self.meter(claim, 0.0, claim_status::ERROR);
                Err(err)
            }
        }
    }

    async fn process_claim_inner(
        &self,
        claim: &BillingClaim,
    ) -> Result<ReconciliationDecision, ReconcileError> {
        // Replay guard: a claim already decided is never re-evaluated. An
        // accepted-but-unsettled decision is settled again; everything else
        // is answered from the log.
        if let Some(existing) = self.decisions.find(&claim.claim_id) {
            if existing.is_accepted() && !existing.settled {
                tracing::info!(
                    target: "gateway",
                    claim_id = %claim.claim_id,
                    "replaying settlement for accepted claim"
                );
                return self.settle_accepted(claim, existing).await;
            }
            tracing::debug!(
                target: "gateway",
                claim_id = %claim.claim_id,
                outcome = ?existing.outcome,
                "claim already decided; returning recorded decision"
            );
            return Ok(existing);
        }

        let amount = match parse_amount(&claim.amount) {
            Ok(amount) => amount,
            Err(reason) => {
                tracing::error!(
                    target: "gateway",
                    claim_id = %claim.claim_id,
                    raw_amount = %claim.amount,
                    "invalid amount in claim"
                );
                let decision = ReconciliationDecision::new(
                    claim,
                    0.0,
                    DecisionOutcome::RejectedInvalidAmount,
                    Some(reason),
                );
                self.decisions.record(&decision)?;
                self.meter(claim, 0.0, claim_status::INVALID_AMOUNT);
                return Ok(decision);
            }
        };

        let params = self.params.get();
        let mut lease = self
            .ledger
            .lease(&claim.agreement_id, &claim.provider_id, &claim.provider_name)
            .await;

        if self
            .ledger
            .check_anomalous(&mut lease, amount, params.as_deref())
        {
            tracing::warn!(
                target: "gateway",
                claim_id = %claim.claim_id,
                agreement_id = %claim.agreement_id,
                provider_id = %claim.provider_id,
                "agreement terminated for claim; banning provider"
            );
            self.reputation.ban(ReputationEntry::new(
                claim.provider_id.clone(),
                claim.provider_name.clone(),
                BAN_REASON_NO_WORK,
            ))?;
            let decision = ReconciliationDecision::new(
                claim,
                amount,
                DecisionOutcome::RejectedAnomaly,
                Some(String::from(BAN_REASON_NO_WORK)),
            );
            self.decisions.record(&decision)?;
            drop(lease);
            self.meter(claim, amount, claim_status::TERMINATED);
            return Ok(decision);
        }

        let report = self.ledger.report_cost(&mut lease, amount);
        if !report.accepted {
            tracing::error!(
                target: "gateway",
                claim_id = %claim.claim_id,
                reason = report.reason.as_deref().unwrap_or("unspecified"),
                "claim rejected by budget gate"
            );
            let decision = ReconciliationDecision::new(
                claim,
                amount,
                DecisionOutcome::RejectedBudget,
                report.reason,
            );
            self.decisions.record(&decision)?;
            drop(lease);
            self.meter(claim, amount, claim_status::NOT_ACCEPTED);
            return Ok(decision);
        }

        // Persist the accepted decision before delegating to settlement, then
        // release the lease: the verdict cannot be revisited, and unrelated
        // claims for this agreement must not wait on the settlement call.
        let decision =
            ReconciliationDecision::new(claim, amount, DecisionOutcome::Accepted, None);
        self.decisions.record(&decision)?;
        drop(lease);

        self.settle_accepted(claim, decision).await
    }

    async fn settle_accepted(
        &self,
        claim: &BillingClaim,
        mut decision: ReconciliationDecision,
    ) -> Result<ReconciliationDecision, ReconcileError> {
        match claim.kind {
            ClaimKind::Invoice => self.settlement.settle_invoice(claim).await?,
            ClaimKind::DebitNote => self.settlement.settle_debit_note(claim).await?,
        }

        self.decisions.mark_settled(&claim.claim_id)?;
        decision.settled = true;
        tracing::info!(
            target: "gateway",
            claim_id = %claim.claim_id,
            agreement_id = %claim.agreement_id,
            amount = decision.amount,
            kind = ?claim.kind,
            "claim accepted and settled"
        );
        self.meter(claim, decision.amount, claim_status::ACCEPTED);
        Ok(decision)
    }

    fn claim_lock(&self, claim_id: &str) -> Arc<AsyncMutex<()>> {
        let mut guard = match self.claim_locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard
            .entry(claim_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn meter(&self, claim: &BillingClaim, amount: f64, status: &'static str) {
        self.metrics.observe_claim(&PaymentObservation {
            provider_id: claim.provider_id.clone(),
            provider_name: claim.provider_name.clone(),
            agreement_id: claim.agreement_id.clone(),
            amount,
            kind: claim.kind,
            status,
        });
    }
}

fn parse_amount(raw: &str) -> Result<f64, String> {
    let parsed: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("amount '{}' is not a number", raw))?;
    if !parsed.is_finite() {
        return Err(format!("amount '{}' is not finite", raw));
    }
    if parsed < 0.0 {
        return Err(format!("amount '{}' is negative", raw));
    }
    Ok(parsed)
}
