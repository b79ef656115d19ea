pub mod store;
pub mod types;

pub use store::ReputationStore;
pub use types::{ReputationEntry, ResetOutcome};
