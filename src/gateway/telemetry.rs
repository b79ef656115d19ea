use crate::{
    gateway::types::ClaimKind,
    ledger::types::IterationStatus,
};

/// Metric statuses attached to every claim observation.
pub mod claim_status {
    pub const ACCEPTED: &str = "accepted";
    pub const NOT_ACCEPTED: &str = "not_accepted";
    pub const TERMINATED: &str = "terminated";
    pub const INVALID_AMOUNT: &str = "invalid_amount";
    pub const ERROR: &str = "error";
}

#[derive(Debug, Clone)]
pub struct PaymentObservation {
    pub provider_id: String,
    pub provider_name: String,
    pub agreement_id: String,
    pub amount: f64,
    pub kind: ClaimKind,
    pub status: &'static str,
}

#[derive(Debug, Clone)]
pub struct IterationObservation {
    pub provider_id: String,
    pub provider_name: String,
    pub agreement_id: String,
    pub iteration_no: u64,
    pub status: IterationStatus,
    pub duration_sec: f64,
}

/// Fire-and-forget metrics sink. Implementations must never fail the caller;
/// the reconciliation outcome does not depend on telemetry delivery.
pub trait PaymentMetricsSink: Send + Sync {
    fn observe_claim(&self, observation: &PaymentObservation);
    fn observe_iteration(&self, observation: &IterationObservation);
}

pub struct NoopMetricsSink;

impl PaymentMetricsSink for NoopMetricsSink {
    fn observe_claim(&self, _observation: &PaymentObservation) {}
    fn observe_iteration(&self, _observation: &IterationObservation) {}
}
