use crate::ui::NotificationLevel;
use thiserror::Error as ThisError;

/// The exact text the backend uses when refusing to delete a committed reservation.
pub const COMMITTED_DELETE_MARKER: &str = "cannot delete a committed reservation";

#[derive(ThisError, Debug)]
pub enum Error {
    /// A required field was missing; detected before anything was sent
    #[error("{message}")]
    ValidationFailed { message: String },

    /// The backend answered with a 4xx/5xx status
    #[error("Server rejected request ({status}): {message}")]
    ServerRejected { status: u16, message: String },

    /// The backend refused to delete a reservation because it is committed
    #[error("Cannot delete a committed reservation")]
    CommittedConflict,

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Commit was requested for a reservation that is already committed
    #[error("Reservation is already committed")]
    AlreadyCommitted,

    /// No usable response was obtained from the backend
    #[error("Network failure: {message}")]
    NetworkFailure { message: String },

    /// No session, or the session expired
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Another mutation for the same resource has not finished yet
    #[error("A request for {id} is already in progress")]
    RequestInFlight { id: String },

    /// `confirm` or `cancel` was called with nothing awaiting confirmation
    #[error("No action is awaiting confirmation")]
    NoPendingConfirmation,

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Reading or writing the persisted session failed
    #[error("Session storage error: {message}")]
    Storage { message: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::ValidationFailed { message: message.into() }
    }

    /// Returns the message shown to the user in a notification
    pub fn user_message(&self) -> String {
        match self {
            Error::ValidationFailed { message } => message.clone(),
            Error::ServerRejected { message, .. } => message.clone(),
            Error::CommittedConflict => "Cannot delete a committed reservation. Please release it first.".to_string(),
            Error::NotFound { resource, .. } => format!("{resource} not found"),
            Error::AlreadyCommitted => "Reservation is already committed".to_string(),
            Error::NetworkFailure { message } => format!("Could not reach the server: {message}"),
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Please log in to continue".to_string()),
            Error::RequestInFlight { .. } => "That reservation is still being updated. Please wait.".to_string(),
            Error::NoPendingConfirmation => "Nothing is awaiting confirmation".to_string(),
            Error::Config { message } => format!("Invalid configuration: {message}"),
            Error::Storage { message } => format!("Could not access the saved session: {message}"),
            Error::Other(e) => format!("Unexpected error: {e}"),
        }
    }

    /// Severity used when the error is surfaced as a notification
    pub fn level(&self) -> NotificationLevel {
        match self {
            Error::RequestInFlight { .. } | Error::NoPendingConfirmation => NotificationLevel::Warning,
            _ => NotificationLevel::Danger,
        }
    }

    /// Whether a rejection message is the backend's committed-delete refusal
    pub fn is_committed_delete_message(message: &str) -> bool {
        message.to_lowercase().contains(COMMITTED_DELETE_MARKER)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::NetworkFailure { message: e.to_string() }
    }
}

/// Type alias for client operation results
pub type Result<T> = std::result::Result<T, Error>;
