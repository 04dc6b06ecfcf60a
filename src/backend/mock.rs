//! Canned backend for offline demos (`ehd wizard --mock`) and tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::AdvisingBackend;
use crate::error::ApiError;
use crate::models::{
    Destination, MatchReport, MatchedExam, Period, ProgramInfo, SessionHandle, SuggestedExam,
};
use crate::study_plan::StudyPlanFile;

/// Backend operations, used to script failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Universities,
    Departments,
    Program,
    Shortlist,
    Exams,
}

/// Number of calls made per operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub universities: usize,
    pub departments: usize,
    pub program: usize,
    pub shortlist: usize,
    pub exams: usize,
    /// Session ids seen by `list_departments`, in order.
    pub department_sessions: Vec<String>,
}

impl MockCalls {
    pub fn total(&self) -> usize {
        self.universities + self.departments + self.program + self.shortlist + self.exams
    }
}

pub struct MockBackend {
    latency: Duration,
    universities: Vec<String>,
    departments: Vec<String>,
    program: ProgramInfo,
    destinations: Vec<Destination>,
    report: MatchReport,
    failures: HashMap<MockOp, (StatusCode, String)>,
    calls: Mutex<MockCalls>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            universities: vec![
                "Politecnico di Torino".to_string(),
                "Università di Pisa".to_string(),
                "Università di Bologna".to_string(),
            ],
            departments: vec![
                "Computer Science".to_string(),
                "Electronic Engineering".to_string(),
                "Mathematics".to_string(),
            ],
            program: ProgramInfo {
                has_program: true,
                summary: Some(
                    "Minimum 24 CFU, EN/IT language level B2, quarterly application windows. \
                     ECTS equivalence for elective exams."
                        .to_string(),
                ),
                session_id: Some(format!("mock-session-{}", chrono::Utc::now().timestamp_millis())),
            },
            destinations: sample_destinations(),
            report: sample_report(),
            failures: HashMap::new(),
            calls: Mutex::new(MockCalls::default()),
        }
    }

    /// Simulated network delay per call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_program(mut self, program: ProgramInfo) -> Self {
        self.program = program;
        self
    }

    pub fn with_departments(mut self, departments: Vec<String>) -> Self {
        self.departments = departments;
        self
    }

    pub fn with_destinations(mut self, destinations: Vec<Destination>) -> Self {
        self.destinations = destinations;
        self
    }

    pub fn with_report(mut self, report: MatchReport) -> Self {
        self.report = report;
        self
    }

    /// Make `op` fail with the given status and detail.
    pub fn with_failure(mut self, op: MockOp, status: u16, detail: &str) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.failures.insert(op, (status, detail.to_string()));
        self
    }

    pub fn calls(&self) -> MockCalls {
        self.calls.lock().clone()
    }

    async fn enter(&self, op: MockOp) -> Result<(), ApiError> {
        {
            let mut calls = self.calls.lock();
            match op {
                MockOp::Universities => calls.universities += 1,
                MockOp::Departments => calls.departments += 1,
                MockOp::Program => calls.program += 1,
                MockOp::Shortlist => calls.shortlist += 1,
                MockOp::Exams => calls.exams += 1,
            }
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some((status, detail)) = self.failures.get(&op) {
            debug!("Mock {:?} failing with {}", op, status);
            return Err(ApiError::Status {
                status: *status,
                detail: detail.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AdvisingBackend for MockBackend {
    async fn list_universities(&self) -> Result<Vec<String>, ApiError> {
        self.enter(MockOp::Universities).await?;
        Ok(self.universities.clone())
    }

    async fn list_departments(&self, session: &SessionHandle) -> Result<Vec<String>, ApiError> {
        self.calls
            .lock()
            .department_sessions
            .push(session.as_str().to_string());
        self.enter(MockOp::Departments).await?;
        Ok(self.departments.clone())
    }

    async fn find_program(&self, _home_university: &str) -> Result<ProgramInfo, ApiError> {
        self.enter(MockOp::Program).await?;
        Ok(self.program.clone())
    }

    async fn shortlist(
        &self,
        _session: &SessionHandle,
        _department: &str,
        _period: Period,
    ) -> Result<Vec<Destination>, ApiError> {
        self.enter(MockOp::Shortlist).await?;
        Ok(self.destinations.clone())
    }

    async fn match_exams(
        &self,
        _session: &SessionHandle,
        _destination_name: &str,
        _study_plan: &StudyPlanFile,
    ) -> Result<MatchReport, ApiError> {
        self.enter(MockOp::Exams).await?;
        Ok(self.report.clone())
    }
}

pub fn sample_destinations() -> Vec<Destination> {
    vec![
        Destination {
            name: "UNIVERSITAT POLITECNICA DE CATALUNYA".to_string(),
            description: "Strong Computer Science program with courses in English.".to_string(),
            code: Some("E BARCELO03".to_string()),
            institution_name: None,
            area_code: Some("0613".to_string()),
            slots: Some("2".to_string()),
            duration_months: Some("5".to_string()),
            level: Some("U".to_string()),
            level_details: None,
            language_requirement: Some("EN B2".to_string()),
        },
        Destination {
            name: "TECHNICAL UNIVERSITY OF MUNICH".to_string(),
            description: "Advanced AI and Machine Learning offer, industry projects.".to_string(),
            code: Some("D MUNCHEN02".to_string()),
            institution_name: None,
            area_code: Some("0613".to_string()),
            slots: Some("1".to_string()),
            duration_months: Some("6".to_string()),
            level: Some("U".to_string()),
            level_details: None,
            language_requirement: Some("EN B2".to_string()),
        },
    ]
}

pub fn sample_report() -> MatchReport {
    MatchReport {
        matched_exams: vec![
            MatchedExam {
                student_exam: "Algoritmi e Strutture Dati".to_string(),
                destination_course: "Advanced Algorithms".to_string(),
                compatibility: "alta".to_string(),
                credits_student: "6 CFU".to_string(),
                credits_destination: "6 ECTS".to_string(),
                notes: Some("Close match of contents and prerequisites, fall semester".to_string()),
            },
            MatchedExam {
                student_exam: "Basi di Dati".to_string(),
                destination_course: "Database Systems".to_string(),
                compatibility: "media".to_string(),
                credits_student: "9 CFU".to_string(),
                credits_destination: "6 ECTS".to_string(),
                notes: Some("Offered in the spring semester".to_string()),
            },
        ],
        suggested_exams: vec![
            SuggestedExam {
                course_name: "Machine Learning".to_string(),
                credits: "6 ECTS".to_string(),
                reason: "Complements the computer science curriculum".to_string(),
                category: Some("Computer Science".to_string()),
            },
            SuggestedExam {
                course_name: "Cloud Computing".to_string(),
                credits: "6 ECTS".to_string(),
                reason: "In demand on the job market, first semester".to_string(),
                category: Some("Distributed Systems".to_string()),
            },
        ],
        compatibility_score: 85.0,
        analysis_summary: "The study plan is highly compatible with the available courses."
            .to_string(),
        exams_pdf_url: Some("/api/students/files/exams/EETAC_Erasmus_Courses_2025-26.pdf".to_string()),
        exams_pdf_filename: Some("EETAC_Erasmus_Courses_2025-26.pdf".to_string()),
    }
}
