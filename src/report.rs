//! Match report analysis
//!
//! Derives presentation hints from a step-3 report:
//! - compatibility level of each matched exam (the backend sends free text
//!   in Italian or English)
//! - whether a course runs in the selected period, read from its notes

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{MatchReport, MatchedExam, Period, SuggestedExam};

/// Compatibility level of a matched exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatibilityLevel {
    High,
    Medium,
    Low,
    Unknown,
}

impl CompatibilityLevel {
    pub fn classify(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "alta" | "high" => Self::High,
            "media" | "medium" => Self::Medium,
            "bassa" | "low" => Self::Low,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "n/a",
        }
    }
}

/// Whether a course's text places it in the selected period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodFit {
    Matches,
    Conflicts,
    Unknown,
}

fn fall_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)fall|autumn|semester 1|first semester|autunno|primo semestre")
            .expect("static regex")
    })
}

fn spring_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)spring|semester 2|second semester|primavera|secondo semestre")
            .expect("static regex")
    })
}

fn mentions(text: &str, period: Period) -> bool {
    match period {
        Period::Fall => fall_pattern().is_match(text),
        Period::Spring => spring_pattern().is_match(text),
    }
}

impl PeriodFit {
    pub fn assess(text: &str, period: Period) -> Self {
        if mentions(text, period) {
            Self::Matches
        } else if mentions(text, period.other()) {
            Self::Conflicts
        } else {
            Self::Unknown
        }
    }
}

/// A matched exam with its derived hints.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedExamView {
    pub exam: MatchedExam,
    pub level: CompatibilityLevel,
    pub period_fit: PeriodFit,
}

/// A suggested exam with its derived hint.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedExamView {
    pub exam: SuggestedExam,
    pub period_fit: PeriodFit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportView {
    pub score: f64,
    pub summary: String,
    pub matched: Vec<MatchedExamView>,
    pub suggested: Vec<SuggestedExamView>,
    pub artifact_url: Option<String>,
    pub artifact_filename: Option<String>,
}

/// Score clamped to 0..=100, NaN as 0.
pub fn display_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

pub fn analyze(report: &MatchReport, period: Period) -> ReportView {
    let matched = report
        .matched_exams
        .iter()
        .map(|exam| MatchedExamView {
            level: CompatibilityLevel::classify(&exam.compatibility),
            period_fit: exam
                .notes
                .as_deref()
                .map(|n| PeriodFit::assess(n, period))
                .unwrap_or(PeriodFit::Unknown),
            exam: exam.clone(),
        })
        .collect();

    let suggested = report
        .suggested_exams
        .iter()
        .map(|exam| SuggestedExamView {
            period_fit: PeriodFit::assess(&exam.reason, period),
            exam: exam.clone(),
        })
        .collect();

    ReportView {
        score: display_score(report.compatibility_score),
        summary: report.analysis_summary.clone(),
        matched,
        suggested,
        artifact_url: report.exams_pdf_url.clone().filter(|u| !u.is_empty()),
        artifact_filename: report.exams_pdf_filename.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_levels() {
        assert_eq!(CompatibilityLevel::classify("Alta"), CompatibilityLevel::High);
        assert_eq!(CompatibilityLevel::classify(" medium "), CompatibilityLevel::Medium);
        assert_eq!(CompatibilityLevel::classify("bassa"), CompatibilityLevel::Low);
        assert_eq!(CompatibilityLevel::classify("parziale"), CompatibilityLevel::Unknown);
    }

    #[test]
    fn test_period_fit() {
        assert_eq!(
            PeriodFit::assess("Offered in the first semester", Period::Fall),
            PeriodFit::Matches
        );
        assert_eq!(
            PeriodFit::assess("Corso del secondo semestre", Period::Fall),
            PeriodFit::Conflicts
        );
        assert_eq!(
            PeriodFit::assess("Ottima corrispondenza", Period::Spring),
            PeriodFit::Unknown
        );
        assert_eq!(
            PeriodFit::assess("Runs in Fall and Spring", Period::Spring),
            PeriodFit::Matches
        );
    }

    #[test]
    fn test_display_score_clamps() {
        assert_eq!(display_score(85.0), 85.0);
        assert_eq!(display_score(140.0), 100.0);
        assert_eq!(display_score(-3.0), 0.0);
        assert_eq!(display_score(f64::NAN), 0.0);
    }

    #[test]
    fn test_analyze_report() {
        let report = MatchReport {
            matched_exams: vec![MatchedExam {
                student_exam: "Basi di Dati".to_string(),
                destination_course: "Database Systems".to_string(),
                compatibility: "alta".to_string(),
                credits_student: "9 CFU".to_string(),
                credits_destination: "9 ECTS".to_string(),
                notes: Some("Spring semester only".to_string()),
            }],
            suggested_exams: vec![SuggestedExam {
                course_name: "Cloud Computing".to_string(),
                credits: "6 ECTS".to_string(),
                reason: "Autumn course".to_string(),
                category: None,
            }],
            compatibility_score: 85.0,
            analysis_summary: "Good".to_string(),
            exams_pdf_url: Some(String::new()),
            exams_pdf_filename: None,
        };

        let view = analyze(&report, Period::Fall);
        assert_eq!(view.matched[0].level, CompatibilityLevel::High);
        assert_eq!(view.matched[0].period_fit, PeriodFit::Conflicts);
        assert_eq!(view.suggested[0].period_fit, PeriodFit::Matches);
        assert!(view.artifact_url.is_none());
    }
}
