//! Derived, read-only view of the wizard for front ends.

use super::controller::WizardController;
use super::state::Step;
use crate::models::{Destination, Period};
use crate::report::{self, ReportView};

/// One entry of the step indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepperItem {
    pub step: Step,
    pub title: &'static str,
    /// Reached or passed
    pub active: bool,
    pub current: bool,
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgramPanel {
    /// Step 1 not run yet
    Pending,
    Found { summary: Option<String> },
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DestinationRow {
    pub destination: Destination,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShortlistPanel {
    /// Step 2 not run yet
    Prompt,
    /// Step 2 ran and returned nothing
    Empty { department: String, period: Period },
    Results(Vec<DestinationRow>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WizardView {
    pub stepper: Vec<StepperItem>,
    pub program: ProgramPanel,
    pub shortlist: ShortlistPanel,
    pub report: Option<ReportView>,
    pub error: Option<String>,
    pub loading: bool,
    pub can_submit_step1: bool,
    pub can_submit_step2: bool,
}

impl WizardView {
    pub fn build(ctrl: &WizardController) -> Self {
        let state = ctrl.state();

        let stepper = Step::ALL
            .into_iter()
            .map(|step| StepperItem {
                step,
                title: step.title(),
                active: state.has_results_for(step) && step <= state.step,
                current: step == state.step,
                loading: ctrl.is_in_flight(step),
            })
            .collect();

        let program = match &state.program {
            None => ProgramPanel::Pending,
            Some(p) if p.has_program => ProgramPanel::Found {
                summary: p.summary.clone(),
            },
            Some(_) => ProgramPanel::NotFound,
        };

        let selected = state.selected.as_ref().map(|d| d.name.as_str());
        let shortlist = match &state.shortlist {
            None => ShortlistPanel::Prompt,
            Some(list) if list.is_empty() => ShortlistPanel::Empty {
                department: state.department.clone(),
                period: state.period,
            },
            Some(list) => ShortlistPanel::Results(
                list.iter()
                    .map(|d| DestinationRow {
                        selected: selected == Some(d.name.as_str()),
                        destination: d.clone(),
                    })
                    .collect(),
            ),
        };

        Self {
            stepper,
            program,
            shortlist,
            report: state
                .report
                .as_ref()
                .map(|r| report::analyze(r, state.period)),
            error: state.error_message.clone(),
            loading: ctrl.is_loading(),
            can_submit_step1: ctrl.can_submit_step1(),
            can_submit_step2: ctrl.can_submit_step2(),
        }
    }

    pub fn current_step(&self) -> Step {
        self.stepper
            .iter()
            .find(|item| item.current)
            .map(|item| item.step)
            .unwrap_or_default()
    }
}
