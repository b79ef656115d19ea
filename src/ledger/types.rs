use serde::{Deserialize, Serialize};

pub type AgreementId = String;
pub type ProviderId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementPhase {
    Active,
    Terminated,
}

/// Per-agreement accounting record. Owned exclusively by the ledger; billing
/// events mutate it only through the per-agreement lease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAgreement {
    pub agreement_id: AgreementId,
    pub provider_id: ProviderId,
    pub provider_name: String,
    pub phase: AgreementPhase,
    pub cumulative_claimed: f64,
    pub iteration_count: u64,
    pub successful_iterations: u64,
    pub cumulative_duration_sec: f64,
    pub last_iteration_status: Option<IterationStatus>,
}

impl ProviderAgreement {
    pub fn new(
        agreement_id: impl Into<AgreementId>,
        provider_id: impl Into<ProviderId>,
        provider_name: impl Into<String>,
    ) -> Self {
        Self {
            agreement_id: agreement_id.into(),
            provider_id: provider_id.into(),
            provider_name: provider_name.into(),
            phase: AgreementPhase::Active,
            cumulative_claimed: 0.0,
            iteration_count: 0,
            successful_iterations: 0,
            cumulative_duration_sec: 0.0,
            last_iteration_status: None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == AgreementPhase::Terminated
    }
}

/// One throughput sample reported by a provider session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationReport {
    pub agreement_id: AgreementId,
    pub provider_id: ProviderId,
    pub provider_name: String,
    pub iteration_no: u64,
    pub duration_sec: f64,
    pub status: IterationStatus,
}

/// Budget-gate verdict for a single cumulative claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostReport {
    pub accepted: bool,
    pub reason: Option<String>,
}

impl CostReport {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}
