use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileErrorKind {
    InvalidInput,
    Persistence,
    Settlement,
    NotConfigured,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileError {
    pub kind: ReconcileErrorKind,
    pub message: String,
}

impl ReconcileError {
    pub fn new(kind: ReconcileErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind {
            ReconcileErrorKind::InvalidInput => "invalid_input",
            ReconcileErrorKind::Persistence => "persistence_failure",
            ReconcileErrorKind::Settlement => "settlement_failure",
            ReconcileErrorKind::NotConfigured => "not_configured",
            ReconcileErrorKind::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ReconcileError {}

pub fn invalid_input(message: impl Into<String>) -> ReconcileError {
    ReconcileError::new(ReconcileErrorKind::InvalidInput, message)
}

pub fn persistence_failure(message: impl Into<String>) -> ReconcileError {
    ReconcileError::new(ReconcileErrorKind::Persistence, message)
}

pub fn settlement_failure(message: impl Into<String>) -> ReconcileError {
    ReconcileError::new(ReconcileErrorKind::Settlement, message)
}

pub fn not_configured(message: impl Into<String>) -> ReconcileError {
    ReconcileError::new(ReconcileErrorKind::NotConfigured, message)
}

pub fn internal_error(message: impl Into<String>) -> ReconcileError {
    ReconcileError::new(ReconcileErrorKind::Internal, message)
}
