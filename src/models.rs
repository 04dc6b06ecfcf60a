//! Wire types of the student advising API.
//!
//! Field names follow the backend's JSON. The destination record keeps the
//! Italian names of the Erasmus call on the wire and exposes English
//! accessors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Study period for the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Fall,
    Spring,
}

impl Period {
    pub const ALL: [Period; 2] = [Period::Fall, Period::Spring];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fall => "fall",
            Self::Spring => "spring",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Fall => "Fall semester",
            Self::Spring => "Spring semester",
        }
    }

    pub fn other(&self) -> Period {
        match self {
            Self::Fall => Self::Spring,
            Self::Spring => Self::Fall,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fall" => Ok(Self::Fall),
            "spring" => Ok(Self::Spring),
            other => Err(format!("Unknown period '{}': expected fall or spring", other)),
        }
    }
}

/// Opaque session identifier issued by step 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(String);

impl SessionHandle {
    /// Returns `None` for blank ids.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Step 1
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProgramRequest<'a> {
    pub home_university: &'a str,
}

/// Erasmus call lookup for the home university.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramInfo {
    pub has_program: bool,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ProgramInfo {
    pub fn session(&self) -> Option<SessionHandle> {
        self.session_id.clone().and_then(SessionHandle::new)
    }
}

// ============================================================================
// Departments
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentsRequest<'a> {
    pub session_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentsResponse {
    #[serde(default)]
    pub departments: Vec<String>,
}

// ============================================================================
// Step 2
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ShortlistRequest<'a> {
    pub session_id: &'a str,
    pub department: &'a str,
    pub period: Period,
}

/// A candidate destination university.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "codice_europeo", default)]
    pub code: Option<String>,
    #[serde(rename = "nome_istituzione", default)]
    pub institution_name: Option<String>,
    #[serde(rename = "codice_area", default)]
    pub area_code: Option<String>,
    #[serde(rename = "posti", default)]
    pub slots: Option<String>,
    #[serde(rename = "durata_per_posto", default)]
    pub duration_months: Option<String>,
    #[serde(rename = "livello", default)]
    pub level: Option<String>,
    #[serde(rename = "dettagli_livello", default)]
    pub level_details: Option<String>,
    #[serde(rename = "requisiti_linguistici", default)]
    pub language_requirement: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShortlistResponse {
    #[serde(default)]
    pub destinations: Vec<Destination>,
}

// ============================================================================
// Step 3
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedExam {
    pub student_exam: String,
    pub destination_course: String,
    pub compatibility: String,
    pub credits_student: String,
    pub credits_destination: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedExam {
    pub course_name: String,
    pub credits: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Exam-equivalence analysis between the study plan and a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    #[serde(default)]
    pub matched_exams: Vec<MatchedExam>,
    #[serde(default)]
    pub suggested_exams: Vec<SuggestedExam>,
    /// 0-100
    #[serde(default)]
    pub compatibility_score: f64,
    #[serde(default)]
    pub analysis_summary: String,
    #[serde(default)]
    pub exams_pdf_url: Option<String>,
    #[serde(default)]
    pub exams_pdf_filename: Option<String>,
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// The detail as a display string. Validation errors from the backend
    /// carry a structured detail; those are rendered as compact JSON.
    pub fn message(&self) -> Option<String> {
        match &self.detail {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(serde_json::Value::String(_)) => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_wire_format() {
        assert_eq!(serde_json::to_string(&Period::Fall).unwrap(), "\"fall\"");
        assert_eq!("Spring".parse::<Period>().unwrap(), Period::Spring);
        assert!("winter".parse::<Period>().is_err());
        assert_eq!(Period::Fall.other(), Period::Spring);
    }

    #[test]
    fn test_session_handle_rejects_blank() {
        assert!(SessionHandle::new("   ").is_none());
        assert_eq!(SessionHandle::new("abc").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_destination_from_backend_json() {
        let json = r#"{
            "name": "TECHNICAL UNIVERSITY OF MUNICH",
            "description": "AI and Machine Learning",
            "codice_europeo": "D MUNCHEN02",
            "posti": "1",
            "durata_per_posto": "6",
            "requisiti_linguistici": "EN B2"
        }"#;
        let dest: Destination = serde_json::from_str(json).unwrap();
        assert_eq!(dest.code.as_deref(), Some("D MUNCHEN02"));
        assert_eq!(dest.slots.as_deref(), Some("1"));
        assert_eq!(dest.duration_months.as_deref(), Some("6"));
        assert_eq!(dest.language_requirement.as_deref(), Some("EN B2"));
        assert!(dest.level.is_none());
    }

    #[test]
    fn test_program_info_without_session() {
        let info: ProgramInfo = serde_json::from_str(r#"{"has_program": false}"#).unwrap();
        assert!(!info.has_program);
        assert!(info.session().is_none());
    }

    #[test]
    fn test_error_body_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "File non trovato"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("File non trovato"));

        let body: ErrorBody = serde_json::from_str(r#"{"detail": [{"loc": ["body"]}]}"#).unwrap();
        assert!(body.message().unwrap().contains("loc"));

        let body: ErrorBody = serde_json::from_str(r#"{}"#).unwrap();
        assert!(body.message().is_none());
    }
}
