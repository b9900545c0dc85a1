//! Supervisor API trait
//!
//! The dashboard never talks HTTP itself. It is handed an implementation of
//! [`SupervisorApi`] that knows how to list supervisors and how to send a
//! management request. The CLI provides a reqwest-backed one; tests use
//! in-memory fakes.

use async_trait::async_trait;

use crate::manage::{ManageRequest, ManageResult};
use crate::model::Supervisor;

/// Errors that can occur while calling the supervisor API
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Request never got a response (connect, timeout, TLS)
    #[error("{0}")]
    Transport(String),
    /// Server answered with a non-success status
    #[error("server responded with status {status}")]
    Status { status: u16, detail: Option<String> },
    /// Response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The error's own message. Status errors have none; the server's
    /// `detail` is what describes them.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Status { .. } => None,
            other => Some(other.to_string()),
        }
    }

    /// Server-supplied `detail` field of an error response
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Text for the user notification raised when a command is rejected
    pub fn notification_text(&self) -> String {
        match self.message() {
            Some(message) => message,
            None => format!(
                "Something went wrong: \n\n{}",
                self.detail().unwrap_or("No details")
            ),
        }
    }
}

#[async_trait]
pub trait SupervisorApi: Send + Sync {
    /// Fetch the current list of supervisors with their processes
    async fn fetch_supervisors(&self) -> Result<Vec<Supervisor>, ApiError>;

    /// Send a management request
    async fn manage(&self, request: ManageRequest) -> Result<ManageResult, ApiError>;

    /// Human-readable name of this backend
    fn name(&self) -> &'static str {
        "supervisor-api"
    }
}
