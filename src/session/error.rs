//! Session error types

use super::LifecycleKind;
use crate::gateway::RemoteError;
use thiserror::Error;

/// Message shown when the backend could not be reached
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

/// Errors surfaced by session transitions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Server-reported failure, shown to the user verbatim
    #[error("{0}")]
    Rejected(String),

    /// The backend could not be reached or answered with garbage
    #[error("Network error. Please try again.")]
    Network,

    /// The session was rejected and has been ended
    #[error("Session expired, please log in again")]
    Unauthorized,

    /// The operation is not valid in the current state
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: LifecycleKind,
    },
}

impl SessionError {
    /// Classify a remote failure, using `fallback` when the server gave no message
    pub(crate) fn from_remote(err: &RemoteError, fallback: &str) -> Self {
        if err.is_transport() {
            return SessionError::Network;
        }
        SessionError::Rejected(
            err.server_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
        )
    }
}
