//! Wizard State Management

use std::fmt;

use crate::models::{Destination, MatchReport, Period, ProgramInfo, SessionHandle};
use crate::study_plan::StudyPlanFile;

/// Stage of the three-step wizard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    /// Erasmus call lookup for the home university
    #[default]
    Program,
    /// Destination shortlist
    Shortlist,
    /// Exam matching
    Exams,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::Program, Step::Shortlist, Step::Exams];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Program => "Program",
            Self::Shortlist => "Destinations",
            Self::Exams => "Exams",
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Self::Program => 1,
            Self::Shortlist => 2,
            Self::Exams => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Program),
            2 => Some(Self::Shortlist),
            3 => Some(Self::Exams),
            _ => None,
        }
    }

    pub fn total_steps() -> u8 {
        3
    }

    /// This step and every later one.
    pub fn and_later(self) -> impl Iterator<Item = Step> {
        Self::ALL.into_iter().filter(move |s| *s >= self)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {} ({})", self.number(), self.title())
    }
}

/// Complete wizard state. One instance per controller.
#[derive(Debug, Clone, Default)]
pub struct WizardState {
    /// Furthest step with results. Never ahead of [`WizardState::satisfied_step`].
    pub step: Step,

    // Form
    pub home_university: String,
    pub department: String,
    pub period: Period,
    pub study_plan: Option<StudyPlanFile>,

    // Backend session and lookups
    pub session: Option<SessionHandle>,
    pub universities: Vec<String>,
    pub departments: Vec<String>,

    // Results
    pub program: Option<ProgramInfo>,
    pub shortlist: Option<Vec<Destination>>,
    pub selected: Option<Destination>,
    pub report: Option<MatchReport>,

    // UI
    pub error_message: Option<String>,
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step 1 found a program and opened a session.
    pub fn program_found(&self) -> bool {
        self.session.is_some() && self.program.as_ref().is_some_and(|p| p.has_program)
    }

    /// The furthest step whose results are present.
    pub fn satisfied_step(&self) -> Step {
        if !self.program_found() || self.shortlist.is_none() {
            Step::Program
        } else if self.report.is_some() && self.selected.is_some() {
            Step::Exams
        } else {
            Step::Shortlist
        }
    }

    /// Whether `step` has any result data left.
    pub fn has_results_for(&self, step: Step) -> bool {
        match step {
            Step::Program => self.program.is_some() || self.session.is_some(),
            Step::Shortlist => self.shortlist.is_some(),
            Step::Exams => self.selected.is_some() || self.report.is_some(),
        }
    }

    /// Clear results from `from` onward, inclusive.
    pub fn clear_from(&mut self, from: Step) {
        for step in from.and_later() {
            match step {
                Step::Program => {
                    self.program = None;
                    self.session = None;
                    self.departments.clear();
                }
                Step::Shortlist => {
                    self.shortlist = None;
                }
                Step::Exams => {
                    self.selected = None;
                    self.report = None;
                }
            }
        }
        self.step = self.step.min(self.satisfied_step());
    }

    pub fn find_destination(&self, name: &str) -> Option<&Destination> {
        self.shortlist
            .as_ref()?
            .iter()
            .find(|d| d.name == name)
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.error_message = Some(msg.into());
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }
}
