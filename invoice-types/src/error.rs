//! Error types for the invoice service.

/// Domain-level errors (business rule violations).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("Invoice amount must be positive, got {0}")]
    InvalidAmount(f64),

    #[error("Exchange rate must be positive, got {0}")]
    InvalidRate(f64),

    #[error("Invoice sequence cannot go backwards: last issued {last}, attempted {attempted}")]
    SequenceRegression { last: u64, attempted: u64 },

    #[error("Invoice sequence is exhausted at {0}")]
    SequenceExhausted(u64),
}

/// Persisted-state read/write failures. Always non-fatal for a run.
#[derive(Debug, thiserror::Error)]
pub enum StateIoError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Corrupt state in {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("State change rejected: {0}")]
    Rejected(#[from] DomainError),
}

/// Rendering failures. Fatal for the run; never retried.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to write invoice document: {0}")]
    Io(String),

    #[error("Failed to lay out invoice document: {0}")]
    Layout(String),
}

/// Delivery failures. The sequence is not advanced.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery is not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to read invoice artifact: {0}")]
    Attachment(String),

    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Mail relay rejected the message: HTTP {status} - {message}")]
    Rejected { status: u16, message: String },
}

/// Notification failures. Logged and otherwise ignored.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification transport error: {0}")]
    Transport(String),

    #[error("Notification rejected: HTTP {0}")]
    Rejected(u16),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("An invoice run is already in progress")]
    RunInProgress,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("Internal error: {0}")]
    Internal(String),
}
