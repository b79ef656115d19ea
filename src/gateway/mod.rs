pub mod error;
pub mod gateway;
pub mod ports;
pub mod settlement;
pub mod telemetry;
pub mod types;

pub use error::{ReconcileError, ReconcileErrorKind};
pub use gateway::PaymentGateway;
pub use ports::{BanStore, DecisionStore, SettlementPort};
pub use settlement::HttpSettlement;
pub use telemetry::{NoopMetricsSink, PaymentMetricsSink};
pub use types::{BillingClaim, ClaimKind, DecisionOutcome, ReconciliationDecision};
