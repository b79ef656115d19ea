use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::ledger::types::ProviderId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationEntry {
    pub provider_id: ProviderId,
    pub provider_name: String,
    pub reason: String,
    pub banned_at: String,
}

impl ReputationEntry {
    pub fn new(
        provider_id: impl Into<ProviderId>,
        provider_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let banned_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("unknown"));
        Self {
            provider_id: provider_id.into(),
            provider_name: provider_name.into(),
            reason: reason.into(),
            banned_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Cleared { removed: usize },
    NothingToReset,
}
