pub mod ledger;
pub mod types;

pub use ledger::{AgreementLease, AgreementLedger};
pub use types::{
    AgreementId, AgreementPhase, CostReport, IterationReport, IterationStatus, ProviderAgreement,
    ProviderId,
};
