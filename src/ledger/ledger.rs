use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::{
    ledger::types::{
        AgreementId, AgreementPhase, CostReport, IterationReport, ProviderAgreement,
    },
    params::DynamicParams,
};

/// Exclusive access to one agreement's accounting record. Billing events for
/// an agreement queue on this lease, so two claims are never evaluated
/// concurrently against the same record.
#[derive(Debug)]
pub struct AgreementLease {
    pub agreement_id: AgreementId,
    guard: OwnedMutexGuard<ProviderAgreement>,
}

impl AgreementLease {
    pub fn agreement(&self) -> &ProviderAgreement {
        &self.guard
    }
}

pub struct AgreementLedger {
    agreements: Mutex<HashMap<AgreementId, Arc<AsyncMutex<ProviderAgreement>>>>,
    budget_ceiling: Option<f64>,
}

impl AgreementLedger {
    pub fn new(budget_ceiling: Option<f64>) -> Self {
        Self {
            agreements: Mutex::new(HashMap::new()),
            budget_ceiling,
        }
    }

    fn entry(
        &self,
        agreement_id: &str,
        provider_id: &str,
        provider_name: &str,
    ) -> Arc<AsyncMutex<ProviderAgreement>> {
        let mut guard = match self.agreements.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard
            .entry(agreement_id.to_string())
            .or_insert_with(|| {
                Arc::new(AsyncMutex::new(ProviderAgreement::new(
                    agreement_id,
                    provider_id,
                    provider_name,
                )))
            })
            .clone()
    }

    /// Acquires the per-agreement critical section, creating the record on
    /// first observation. Tolerant of out-of-order session-start signaling:
    /// a claim or iteration may arrive before the session event does.
    pub async fn lease(
        &self,
        agreement_id: &str,
        provider_id: &str,
        provider_name: &str,
    ) -> AgreementLease {
        let entry = self.entry(agreement_id, provider_id, provider_name);
        AgreementLease {
            agreement_id: agreement_id.to_string(),
            guard: entry.lock_owned().await,
        }
    }

    /// Updates running throughput stats. No accept/reject effect by itself.
    pub async fn record_iteration(&self, report: &IterationReport) {
        let entry = self.entry(
            &report.agreement_id,
            &report.provider_id,
            &report.provider_name,
        );
        let mut agreement = entry.lock().await;
        agreement.iteration_count = agreement.iteration_count.saturating_add(1);
        if report.status == crate::ledger::types::IterationStatus::Completed {
            agreement.successful_iterations = agreement.successful_iterations.saturating_add(1);
        }
        if report.duration_sec.is_finite() && report.duration_sec > 0.0 {
            agreement.cumulative_duration_sec += report.duration_sec;
        }
        agreement.last_iteration_status = Some(report.status);

        tracing::debug!(
            target: "ledger",
            agreement_id = %report.agreement_id,
            iteration_no = report.iteration_no,
            duration_sec = report.duration_sec,
            status = ?report.status,
            "iteration recorded"
        );
    }

    /// Kill-switch check: does the observed throughput justify the cumulative
    /// amount now being claimed? A `true` verdict terminates the agreement
    /// permanently; asking again for a terminated agreement stays `true`
    /// without re-deriving stats.
    pub fn check_anomalous(
        &self,
        lease: &mut AgreementLease,
        claimed: f64,
        params: Option<&DynamicParams>,
    ) -> bool {
        let agreement = &mut *lease.guard;
        if agreement.is_terminated() {
            return true;
        }

        // Without a configured baseline there is nothing to verify against;
        // claims pass through to the budget gate until the operator sets one.
        let Some(params) = params else {
            tracing::debug!(
                target: "ledger",
                agreement_id = %agreement.agreement_id,
                "dynamic parameters not configured; skipping anomaly check"
            );
            return false;
        };

        let Some(reason) = assess_throughput(agreement, claimed, params) else {
            return false;
        };

        tracing::warn!(
            target: "ledger",
            agreement_id = %agreement.agreement_id,
            provider_id = %agreement.provider_id,
            claimed,
            reason = %reason,
            "terminating agreement: claim not justified by delivered work"
        );
        agreement.phase = AgreementPhase::Terminated;
        true
    }

    /// Budget gate, invoked only when the kill switch said no. Updates the
    /// cumulative claimed amount only on acceptance.
    pub fn report_cost(&self, lease: &mut AgreementLease, amount: f64) -> CostReport {
        let agreement = &mut *lease.guard;
        if agreement.is_terminated() {
            return CostReport::rejected(format!(
                "agreement {} is terminated",
                agreement.agreement_id
            ));
        }

        if amount < agreement.cumulative_claimed {
            return CostReport::rejected(format!(
                "cumulative claim decreased: previous={}, claimed={}",
                agreement.cumulative_claimed, amount
            ));
        }

        if let Some(ceiling) = self.budget_ceiling
            && amount > ceiling
        {
            return CostReport::rejected(format!(
                "cumulative claim {} exceeds agreement budget ceiling {}",
                amount, ceiling
            ));
        }

        agreement.cumulative_claimed = amount;
        CostReport::accepted()
    }

    /// Cloned snapshot of every agreement record, for the control surface.
    pub async fn status_snapshot(&self) -> Vec<ProviderAgreement> {
        let entries: Vec<Arc<AsyncMutex<ProviderAgreement>>> = {
            let guard = match self.agreements.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.values().cloned().collect()
        };

        let mut snapshot = Vec::with_capacity(entries.len());
        for entry in entries {
            snapshot.push(entry.lock().await.clone());
        }
        snapshot.sort_by(|lhs, rhs| lhs.agreement_id.cmp(&rhs.agreement_id));
        snapshot
    }
}

/// Pure anomaly assessment. Returns the reason when the claim cannot be
/// justified under the given thresholds, `None` otherwise.
fn assess_throughput(
    agreement: &ProviderAgreement,
    claimed: f64,
    params: &DynamicParams,
) -> Option<String> {
    if claimed <= 0.0 {
        return None;
    }

    if agreement.successful_iterations == 0 {
        return Some(format!(
            "non-zero claim {} with no successful iteration recorded",
            claimed
        ));
    }

    let delivered_sec = agreement.successful_iterations as f64 * params.single_pass_seconds as f64;

    if agreement.cumulative_duration_sec > 0.0 {
        let efficiency = delivered_sec / agreement.cumulative_duration_sec;
        if efficiency < params.minimum_accepted_efficiency {
            return Some(format!(
                "efficiency {:.4} below minimum accepted {:.4}",
                efficiency, params.minimum_accepted_efficiency
            ));
        }
    }

    let paid_speed = delivered_sec / claimed;
    if paid_speed < params.minimum_accepted_speed {
        return Some(format!(
            "delivered work per claimed unit {:.4} below minimum accepted speed {:.4}",
            paid_speed, params.minimum_accepted_speed
        ));
    }

    None
}
