use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::ledger::types::{AgreementId, ProviderId};

pub type ClaimId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Invoice,
    DebitNote,
}

/// A single billing event: a final invoice or an interim debit note. The
/// amount is the marketplace's decimal string, cumulative for the agreement;
/// the gateway parses and validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingClaim {
    pub claim_id: ClaimId,
    pub agreement_id: AgreementId,
    pub provider_id: ProviderId,
    pub provider_name: String,
    pub amount: String,
    pub kind: ClaimKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Accepted,
    RejectedBudget,
    RejectedAnomaly,
    RejectedInvalidAmount,
}

/// Durable record of one claim's verdict. Persisted before any
/// externally-visible effect so a crash between decision and effect is
/// recoverable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationDecision {
    pub claim_id: ClaimId,
    pub agreement_id: AgreementId,
    pub provider_id: ProviderId,
    pub kind: ClaimKind,
    pub amount: f64,
    pub outcome: DecisionOutcome,
    #[serde(default)]
    pub reason: Option<String>,
    pub decided_at: String,
    pub settled: bool,
}

impl ReconciliationDecision {
    pub fn new(
        claim: &BillingClaim,
        amount: f64,
        outcome: DecisionOutcome,
        reason: Option<String>,
    ) -> Self {
        let decided_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("unknown"));
        Self {
            claim_id: claim.claim_id.clone(),
            agreement_id: claim.agreement_id.clone(),
            provider_id: claim.provider_id.clone(),
            kind: claim.kind,
            amount,
            outcome,
            reason,
            decided_at,
            settled: false,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.outcome == DecisionOutcome::Accepted
    }
}
