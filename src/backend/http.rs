//! HTTP client for the student advising API.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::{check_status, decode_json, AdvisingBackend};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::models::{
    DepartmentsRequest, DepartmentsResponse, Destination, MatchReport, Period, ProgramInfo,
    ProgramRequest, SessionHandle, ShortlistRequest, ShortlistResponse,
};
use crate::study_plan::{StudyPlanFile, PDF_MIME};

/// Suffix stripped from the API base to reach the server origin, where
/// report artifacts are served.
const STUDENT_API_SUFFIX: &str = "/api/students";

pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(&config.api_base, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Server origin: the base URL without its student API suffix.
    pub fn origin(&self) -> &str {
        self.base_url
            .strip_suffix(STUDENT_API_SUFFIX)
            .unwrap_or(&self.base_url)
    }

    /// Absolute download link for the report's course catalogue PDF.
    pub fn artifact_url(&self, report: &MatchReport) -> Option<String> {
        let url = report.exams_pdf_url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return Some(url.to_string());
        }
        let sep = if url.starts_with('/') { "" } else { "/" };
        Some(format!("{}{}{}", self.origin(), sep, url))
    }

    /// Download the report's PDF into `dest_dir`, returning the written path.
    pub async fn download_artifact(
        &self,
        report: &MatchReport,
        dest_dir: &Path,
    ) -> Result<Option<PathBuf>, ApiError> {
        let Some(url) = self.artifact_url(report) else {
            return Ok(None);
        };
        let file_name = artifact_file_name(report, &url);

        info!("Downloading {} from {}", file_name, url);
        let response = check_status(self.client.get(&url).send().await?).await?;
        let bytes = response.bytes().await?;

        std::fs::create_dir_all(dest_dir)?;
        let path = dest_dir.join(file_name);
        std::fs::write(&path, &bytes)?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(Some(path))
    }
}

/// Only the last path segment is kept, so the name cannot escape `dest_dir`.
fn artifact_file_name(report: &MatchReport, url: &str) -> String {
    let candidate = report
        .exams_pdf_filename
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| url.rsplit('/').next().unwrap_or_default().to_string());
    let name = Path::new(&candidate)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if name.is_empty() || name == ".." {
        "exams.pdf".to_string()
    } else {
        name
    }
}

#[async_trait]
impl AdvisingBackend for HttpBackend {
    async fn list_universities(&self) -> Result<Vec<String>, ApiError> {
        let response = self.client.get(self.url("/universities")).send().await?;
        decode_json(response).await
    }

    async fn list_departments(&self, session: &SessionHandle) -> Result<Vec<String>, ApiError> {
        let response = self
            .client
            .post(self.url("/departments"))
            .json(&DepartmentsRequest {
                session_id: session.as_str(),
            })
            .send()
            .await?;
        let body: DepartmentsResponse = decode_json(response).await?;
        Ok(body.departments)
    }

    async fn find_program(&self, home_university: &str) -> Result<ProgramInfo, ApiError> {
        debug!("POST /step1 home_university={}", home_university);
        let response = self
            .client
            .post(self.url("/step1"))
            .json(&ProgramRequest { home_university })
            .send()
            .await?;
        decode_json(response).await
    }

    async fn shortlist(
        &self,
        session: &SessionHandle,
        department: &str,
        period: Period,
    ) -> Result<Vec<Destination>, ApiError> {
        debug!("POST /step2 department={} period={}", department, period);
        let response = self
            .client
            .post(self.url("/step2"))
            .json(&ShortlistRequest {
                session_id: session.as_str(),
                department,
                period,
            })
            .send()
            .await?;
        let body: ShortlistResponse = decode_json(response).await?;
        Ok(body.destinations)
    }

    async fn match_exams(
        &self,
        session: &SessionHandle,
        destination_name: &str,
        study_plan: &StudyPlanFile,
    ) -> Result<MatchReport, ApiError> {
        debug!(
            "POST /step3 destination={} file={} ({} bytes)",
            destination_name,
            study_plan.file_name,
            study_plan.size()
        );
        let part = Part::bytes(study_plan.bytes.clone())
            .file_name(study_plan.file_name.clone())
            .mime_str(PDF_MIME)?;
        let form = Form::new()
            .text("session_id", session.as_str().to_string())
            .text("destination_university_name", destination_name.to_string())
            .part("study_plan_file", part);

        let response = self
            .client
            .post(self.url("/step3"))
            .multipart(form)
            .send()
            .await?;
        decode_json(response).await
    }
}
