use async_trait::async_trait;

use crate::{
    gateway::{
        error::ReconcileError,
        types::{BillingClaim, ReconciliationDecision},
    },
    reputation::types::ReputationEntry,
};

/// External settlement collaborator. A failure here never rolls back an
/// Accepted decision; the gateway surfaces it to the caller and the decision
/// stays recorded for replay.
#[async_trait]
pub trait SettlementPort: Send + Sync {
    async fn settle_invoice(&self, claim: &BillingClaim) -> Result<(), ReconcileError>;
    async fn settle_debit_note(&self, claim: &BillingClaim) -> Result<(), ReconcileError>;
}

/// Append-only decision log. `find` backs the replay guard: a claim id that
/// already has a row is never re-evaluated.
pub trait DecisionStore: Send + Sync {
    fn record(&self, decision: &ReconciliationDecision) -> Result<(), ReconcileError>;
    fn mark_settled(&self, claim_id: &str) -> Result<(), ReconcileError>;
    fn find(&self, claim_id: &str) -> Option<ReconciliationDecision>;
}

/// Append-only ban table with an administrative bulk clear.
pub trait BanStore: Send + Sync {
    fn append(&self, entry: &ReputationEntry) -> Result<(), ReconcileError>;
    fn clear(&self) -> Result<(), ReconcileError>;
    fn load(&self) -> Result<Vec<ReputationEntry>, ReconcileError>;
}
