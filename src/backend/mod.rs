//! Advising backend interface
//!
//! The matching and analysis engine is an external service. The wizard only
//! sees it through [`AdvisingBackend`]; [`HttpBackend`] talks to the real
//! API and [`MockBackend`] serves canned payloads for demos and tests.

mod http;
mod mock;

pub use http::HttpBackend;
pub use mock::{sample_destinations, sample_report, MockBackend, MockCalls, MockOp};

use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;
use crate::models::{Destination, MatchReport, Period, ProgramInfo, SessionHandle};
use crate::study_plan::StudyPlanFile;

/// Operations of the student advising API.
#[async_trait]
pub trait AdvisingBackend: Send + Sync {
    /// Home universities with a published Erasmus call.
    async fn list_universities(&self) -> Result<Vec<String>, ApiError>;

    /// Departments available for the session's home university.
    async fn list_departments(&self, session: &SessionHandle) -> Result<Vec<String>, ApiError>;

    /// Step 1: look up the Erasmus call and open a session.
    async fn find_program(&self, home_university: &str) -> Result<ProgramInfo, ApiError>;

    /// Step 2: destinations matching department and period.
    async fn shortlist(
        &self,
        session: &SessionHandle,
        department: &str,
        period: Period,
    ) -> Result<Vec<Destination>, ApiError>;

    /// Step 3: exam matching against the destination's courses.
    async fn match_exams(
        &self,
        session: &SessionHandle,
        destination_name: &str,
        study_plan: &StudyPlanFile,
    ) -> Result<MatchReport, ApiError>;
}

/// Decode a JSON body, turning non-2xx responses into [`ApiError::Status`]
/// with the server's `detail` message.
pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Pass 2xx responses through, map the rest to [`ApiError::Status`].
pub(crate) async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = error_detail(&body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    debug!("Request failed with {}: {}", status, detail);
    Err(ApiError::Status { status, detail })
}

fn error_detail(body: &str) -> Option<String> {
    serde_json::from_str::<crate::models::ErrorBody>(body)
        .ok()
        .and_then(|b| b.message())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail() {
        assert_eq!(
            error_detail(r#"{"detail": "Sessione non valida"}"#).as_deref(),
            Some("Sessione non valida")
        );
        assert!(error_detail("Internal Server Error").is_none());
        assert!(error_detail(r#"{"detail": ""}"#).is_none());
    }
}
