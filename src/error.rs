//! Error types shared by the wizard, the backend clients and the portal.
//!
//! Two families exist: validation errors, raised locally before any request
//! leaves the process, and API errors, raised after a request failed or came
//! back with a non-2xx status. Both render to the single message shown to the
//! user.

use thiserror::Error;

use crate::wizard::Step;

/// Local input problems detected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Select a home university first")]
    MissingHomeUniversity,
    #[error("Session id missing. Run step 1 again.")]
    MissingSession,
    #[error("No Erasmus program was found for this university")]
    ProgramNotFound,
    #[error("Select a department first")]
    MissingDepartment,
    #[error("Destination not in the current shortlist: {0}")]
    UnknownDestination(String),
    #[error("Study plan PDF missing")]
    MissingStudyPlan,
    #[error("Please upload a valid PDF file (got {0})")]
    NotPdf(String),
    #[error("The PDF exceeds {max} bytes ({size} bytes)")]
    FileTooLarge { size: u64, max: u64 },
    #[error("{field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Failures talking to a backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response. `detail` is the server's message, verbatim.
    #[error("{detail}")]
    Status {
        status: reqwest::StatusCode,
        detail: String,
    },
    #[error("Connection error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status_code(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }
}

/// Failures persisting session or token data.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("No data directory available")]
    NoDataDir,
}

/// Errors surfaced by the wizard controller.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{0} is already in progress")]
    InFlight(Step),
    #[error("{0} result discarded: the wizard changed while it was loading")]
    Stale(Step),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WizardError {
    /// True when nothing reached the network.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InFlight(_))
    }
}

/// Errors surfaced by the university portal client.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Session expired or invalid token. Log in again.")]
    Unauthorized,
    #[error("Not logged in")]
    NotLoggedIn,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_shows_detail_verbatim() {
        let err = ApiError::Status {
            status: reqwest::StatusCode::BAD_REQUEST,
            detail: "Sessione non valida o scaduta. Rieseguire lo Step 1.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Sessione non valida o scaduta. Rieseguire lo Step 1."
        );
        assert_eq!(err.status_code(), Some(reqwest::StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_local_errors() {
        assert!(WizardError::from(ValidationError::MissingStudyPlan).is_local());
        assert!(WizardError::InFlight(Step::Shortlist).is_local());
        assert!(!WizardError::Stale(Step::Program).is_local());
    }

    #[test]
    fn test_file_too_large_message() {
        let err = ValidationError::FileTooLarge {
            size: 12 * 1024 * 1024,
            max: 10 * 1024 * 1024,
        };
        assert!(err.to_string().contains("10485760"));
    }
}
