//! Wizard Controller
//!
//! Drives the three-step advising workflow over an [`AdvisingBackend`].
//!
//! Every step runs in three phases so the front end can keep handling input
//! while a request is out:
//! 1. `begin_stepN` validates local preconditions, marks the step in flight
//!    and returns a request carrying a [`Ticket`]
//! 2. the request is sent to the backend (no borrow of the controller)
//! 3. `complete_stepN` applies the result atomically, or discards it when the
//!    ticket's generation is no longer current
//!
//! `submit_stepN` runs all three in sequence.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::state::{Step, WizardState};
use super::view::WizardView;
use crate::backend::AdvisingBackend;
use crate::error::{ApiError, ValidationError, WizardError};
use crate::models::{Destination, MatchReport, Period, ProgramInfo, SessionHandle};
use crate::session_store::{PersistedSession, SessionStore};
use crate::study_plan::StudyPlanFile;

/// Identifies one step request. Stale once its step is invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub step: Step,
    generation: u64,
    request_id: u64,
}

#[derive(Debug, Clone)]
pub struct Step1Request {
    pub ticket: Ticket,
    pub home_university: String,
}

impl Step1Request {
    pub async fn send(&self, backend: &dyn AdvisingBackend) -> Result<ProgramInfo, ApiError> {
        backend.find_program(&self.home_university).await
    }
}

#[derive(Debug, Clone)]
pub struct Step2Request {
    pub ticket: Ticket,
    pub session: SessionHandle,
    pub department: String,
    pub period: Period,
}

impl Step2Request {
    pub async fn send(&self, backend: &dyn AdvisingBackend) -> Result<Vec<Destination>, ApiError> {
        backend
            .shortlist(&self.session, &self.department, self.period)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct Step3Request {
    pub ticket: Ticket,
    pub session: SessionHandle,
    pub destination: Destination,
    pub study_plan: StudyPlanFile,
}

impl Step3Request {
    pub async fn send(&self, backend: &dyn AdvisingBackend) -> Result<MatchReport, ApiError> {
        backend
            .match_exams(&self.session, &self.destination.name, &self.study_plan)
            .await
    }
}

/// Department listing tied to the step-1 session it was started for.
#[derive(Debug, Clone)]
pub struct DepartmentsFetch {
    generation: u64,
    pub session: SessionHandle,
}

impl DepartmentsFetch {
    pub async fn send(&self, backend: &dyn AdvisingBackend) -> Result<Vec<String>, ApiError> {
        backend.list_departments(&self.session).await
    }
}

pub struct WizardController {
    state: WizardState,
    backend: Arc<dyn AdvisingBackend>,
    store: Arc<dyn SessionStore>,
    /// Per-step generation, bumped whenever the step is invalidated
    generations: [u64; 3],
    next_request_id: u64,
    in_flight: HashMap<Step, u64>,
}

fn slot(step: Step) -> usize {
    usize::from(step.number() - 1)
}

impl WizardController {
    /// Create a controller, rehydrating the persisted home university and
    /// session id.
    pub fn new(backend: Arc<dyn AdvisingBackend>, store: Arc<dyn SessionStore>) -> Self {
        let persisted = store.load();
        let mut state = WizardState::new();
        if let Some(home) = persisted.home_university {
            state.home_university = home;
        }
        state.session = persisted.session_id.and_then(SessionHandle::new);
        if state.session.is_some() {
            debug!("Rehydrated session for '{}'", state.home_university);
        }

        Self {
            state,
            backend,
            store,
            generations: [0; 3],
            next_request_id: 1,
            in_flight: HashMap::new(),
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn backend(&self) -> Arc<dyn AdvisingBackend> {
        Arc::clone(&self.backend)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.state.error_message.as_deref()
    }

    pub fn is_in_flight(&self, step: Step) -> bool {
        self.in_flight.contains_key(&step)
    }

    /// True while any step request is outstanding.
    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn view(&self) -> WizardView {
        WizardView::build(self)
    }

    // ========================================================================
    // Gating
    // ========================================================================

    pub fn can_submit_step1(&self) -> bool {
        !self.is_loading() && !self.state.home_university.trim().is_empty()
    }

    pub fn can_submit_step2(&self) -> bool {
        !self.is_loading() && self.state.program_found() && !self.state.department.trim().is_empty()
    }

    pub fn can_submit_step3(&self, destination_name: &str) -> bool {
        !self.is_loading()
            && self.state.session.is_some()
            && self.state.find_destination(destination_name).is_some()
            && self
                .state
                .study_plan
                .as_ref()
                .is_some_and(|p| p.validate().is_ok())
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Load home universities, then departments when a rehydrated session
    /// exists.
    pub async fn init(&mut self) {
        if let Err(e) = self.load_universities().await {
            warn!("Failed to load universities: {}", e);
        }
        if self.state.session.is_some() {
            if let Err(e) = self.load_departments().await {
                warn!("Failed to load departments: {}", e);
            }
        }
    }

    /// Failures leave the list empty and do not touch the error banner.
    pub async fn load_universities(&mut self) -> Result<Vec<String>, WizardError> {
        match self.backend.list_universities().await {
            Ok(list) => {
                debug!("Loaded {} universities", list.len());
                self.state.universities = list.clone();
                Ok(list)
            }
            Err(e) => {
                self.state.universities.clear();
                Err(e.into())
            }
        }
    }

    /// `None` without a session: there is nothing to list yet.
    pub fn begin_departments(&self) -> Option<DepartmentsFetch> {
        let Some(session) = self.state.session.clone() else {
            warn!("No session id, cannot load departments");
            return None;
        };
        Some(DepartmentsFetch {
            generation: self.generations[slot(Step::Program)],
            session,
        })
    }

    pub fn complete_departments(
        &mut self,
        fetch: DepartmentsFetch,
        result: Result<Vec<String>, ApiError>,
    ) -> Result<Vec<String>, WizardError> {
        if fetch.generation != self.generations[slot(Step::Program)] {
            debug!("Discarding stale department list");
            return Err(WizardError::Stale(Step::Program));
        }
        match result {
            Ok(departments) => {
                debug!("Loaded {} departments", departments.len());
                self.state.departments = departments.clone();
                Ok(departments)
            }
            Err(e) => {
                self.state.departments.clear();
                Err(e.into())
            }
        }
    }

    /// Returns an empty list without a request when there is no session.
    pub async fn load_departments(&mut self) -> Result<Vec<String>, WizardError> {
        let Some(fetch) = self.begin_departments() else {
            self.state.departments.clear();
            return Ok(Vec::new());
        };
        let result = fetch.send(self.backend.as_ref()).await;
        self.complete_departments(fetch, result)
    }

    // ========================================================================
    // Form updates
    // ========================================================================

    /// A different home university invalidates everything from step 1.
    pub fn set_home_university(&mut self, name: &str) {
        let name = name.trim();
        if name == self.state.home_university {
            return;
        }
        self.state.home_university = name.to_string();
        self.state.department.clear();
        self.reset_from(Step::Program);
    }

    /// A different department invalidates the shortlist and what follows.
    pub fn set_department(&mut self, department: &str) {
        let department = department.trim();
        if department == self.state.department {
            return;
        }
        self.state.department = department.to_string();
        self.reset_from(Step::Shortlist);
    }

    pub fn set_period(&mut self, period: Period) {
        if period == self.state.period {
            return;
        }
        self.state.period = period;
        self.reset_from(Step::Shortlist);
    }

    /// Keep the previous file when the new one is rejected.
    pub fn select_study_plan(&mut self, file: StudyPlanFile) -> Result<(), WizardError> {
        if let Err(e) = file.validate() {
            self.state.set_error(e.to_string());
            return Err(e.into());
        }
        info!("Study plan selected: {} ({} bytes)", file.file_name, file.size());
        self.state.study_plan = Some(file);
        self.state.clear_error();
        self.study_plan_changed();
        Ok(())
    }

    pub fn clear_study_plan(&mut self) {
        self.state.study_plan = None;
        self.study_plan_changed();
    }

    /// A report or pending step 3 request belongs to the previous file.
    fn study_plan_changed(&mut self) {
        if self.state.report.is_some() || self.is_in_flight(Step::Exams) {
            self.reset_from(Step::Exams);
        }
    }

    /// Clear results from `step` onward and discard any response still
    /// pending for those steps.
    pub fn reset_from(&mut self, step: Step) {
        debug!("Resetting from {}", step);
        self.invalidate(step);
        self.state.clear_from(step);
        if step == Step::Program {
            self.persist();
        }
    }

    fn invalidate(&mut self, from: Step) {
        for step in from.and_later() {
            self.generations[slot(step)] += 1;
            self.in_flight.remove(&step);
        }
    }

    // ========================================================================
    // Request bookkeeping
    // ========================================================================

    fn issue(&mut self, step: Step) -> Result<Ticket, WizardError> {
        if self.is_in_flight(step) {
            return Err(WizardError::InFlight(step));
        }
        let ticket = Ticket {
            step,
            generation: self.generations[slot(step)],
            request_id: self.next_request_id,
        };
        self.next_request_id += 1;
        Ok(ticket)
    }

    fn start(&mut self, ticket: Ticket) {
        self.in_flight.insert(ticket.step, ticket.request_id);
        self.state.clear_error();
    }

    /// Clear the in-flight mark and report whether the ticket is current.
    fn finish(&mut self, ticket: Ticket) -> Result<(), WizardError> {
        if self.in_flight.get(&ticket.step) == Some(&ticket.request_id) {
            self.in_flight.remove(&ticket.step);
        }
        if ticket.generation != self.generations[slot(ticket.step)] {
            debug!("Discarding stale {} response", ticket.step);
            return Err(WizardError::Stale(ticket.step));
        }
        Ok(())
    }

    /// Drop a request that will never be completed.
    pub fn abandon(&mut self, ticket: Ticket) {
        if self.in_flight.get(&ticket.step) == Some(&ticket.request_id) {
            self.in_flight.remove(&ticket.step);
        }
    }

    fn fail(&mut self, err: WizardError) -> WizardError {
        self.state.set_error(err.to_string());
        err
    }

    fn persist(&self) {
        let home = self.state.home_university.trim();
        let session = PersistedSession {
            home_university: (!home.is_empty()).then(|| home.to_string()),
            session_id: self.state.session.as_ref().map(|s| s.as_str().to_string()),
            saved_at: None,
        };
        if let Err(e) = self.store.save(&session) {
            warn!("Failed to persist session: {}", e);
        }
    }

    // ========================================================================
    // Step 1
    // ========================================================================

    pub fn begin_step1(&mut self) -> Result<Step1Request, WizardError> {
        let ticket = self.issue(Step::Program)?;
        let home = self.state.home_university.trim().to_string();
        if home.is_empty() {
            return Err(self.fail(ValidationError::MissingHomeUniversity.into()));
        }
        self.start(ticket);
        Ok(Step1Request {
            ticket,
            home_university: home,
        })
    }

    /// On success the previous session and everything after it are replaced.
    pub fn complete_step1(
        &mut self,
        request: Step1Request,
        result: Result<ProgramInfo, ApiError>,
    ) -> Result<ProgramInfo, WizardError> {
        self.finish(request.ticket)?;
        let info = match result {
            Ok(info) => info,
            Err(e) => return Err(self.fail(e.into())),
        };

        self.invalidate(Step::Program);
        self.state.clear_from(Step::Program);
        self.state.session = info.session();
        self.state.program = Some(info.clone());
        self.state.step = Step::Program;
        self.persist();

        info!(
            "Step 1 for '{}': has_program={}",
            request.home_university, info.has_program
        );
        Ok(info)
    }

    /// Look up the program, then load departments for the new session.
    pub async fn submit_step1(&mut self, home_university: &str) -> Result<ProgramInfo, WizardError> {
        self.set_home_university(home_university);
        let request = self.begin_step1()?;
        let result = request.send(self.backend.as_ref()).await;
        let info = self.complete_step1(request, result)?;

        if self.state.session.is_some() {
            if let Err(e) = self.load_departments().await {
                warn!("Failed to load departments: {}", e);
            }
        }
        Ok(info)
    }

    // ========================================================================
    // Step 2
    // ========================================================================

    pub fn begin_step2(&mut self) -> Result<Step2Request, WizardError> {
        let ticket = self.issue(Step::Shortlist)?;
        let Some(session) = self.state.session.clone() else {
            return Err(self.fail(ValidationError::MissingSession.into()));
        };
        if !self.state.program_found() {
            return Err(self.fail(ValidationError::ProgramNotFound.into()));
        }
        let department = self.state.department.trim().to_string();
        if department.is_empty() {
            return Err(self.fail(ValidationError::MissingDepartment.into()));
        }
        self.start(ticket);
        Ok(Step2Request {
            ticket,
            session,
            department,
            period: self.state.period,
        })
    }

    /// An empty list is a valid "no results" outcome.
    pub fn complete_step2(
        &mut self,
        request: Step2Request,
        result: Result<Vec<Destination>, ApiError>,
    ) -> Result<Vec<Destination>, WizardError> {
        self.finish(request.ticket)?;
        let destinations = match result {
            Ok(d) => d,
            Err(e) => return Err(self.fail(e.into())),
        };

        self.invalidate(Step::Shortlist);
        self.state.clear_from(Step::Shortlist);
        self.state.shortlist = Some(destinations.clone());
        self.state.step = Step::Shortlist;

        info!(
            "Step 2 for {} / {}: {} destinations",
            request.department,
            request.period,
            destinations.len()
        );
        Ok(destinations)
    }

    pub async fn submit_step2(&mut self) -> Result<Vec<Destination>, WizardError> {
        let request = self.begin_step2()?;
        let result = request.send(self.backend.as_ref()).await;
        self.complete_step2(request, result)
    }

    // ========================================================================
    // Step 3
    // ========================================================================

    /// All checks are local; a rejected file never reaches the network.
    pub fn begin_step3(&mut self, destination_name: &str) -> Result<Step3Request, WizardError> {
        let ticket = self.issue(Step::Exams)?;
        let Some(session) = self.state.session.clone() else {
            return Err(self.fail(ValidationError::MissingSession.into()));
        };
        let Some(destination) = self.state.find_destination(destination_name).cloned() else {
            return Err(self.fail(
                ValidationError::UnknownDestination(destination_name.to_string()).into(),
            ));
        };
        let Some(study_plan) = self.state.study_plan.clone() else {
            return Err(self.fail(ValidationError::MissingStudyPlan.into()));
        };
        if let Err(e) = study_plan.validate() {
            return Err(self.fail(e.into()));
        }
        self.start(ticket);
        Ok(Step3Request {
            ticket,
            session,
            destination,
            study_plan,
        })
    }

    pub fn complete_step3(
        &mut self,
        request: Step3Request,
        result: Result<MatchReport, ApiError>,
    ) -> Result<MatchReport, WizardError> {
        self.finish(request.ticket)?;
        let report = match result {
            Ok(r) => r,
            Err(e) => return Err(self.fail(e.into())),
        };

        self.invalidate(Step::Exams);
        self.state.selected = Some(request.destination.clone());
        self.state.report = Some(report.clone());
        self.state.step = Step::Exams;

        info!(
            "Step 3 for {}: score {:.1}, {} matched, {} suggested",
            request.destination.name,
            report.compatibility_score,
            report.matched_exams.len(),
            report.suggested_exams.len()
        );
        Ok(report)
    }

    pub async fn submit_step3(&mut self, destination_name: &str) -> Result<MatchReport, WizardError> {
        let request = self.begin_step3(destination_name)?;
        let result = request.send(self.backend.as_ref()).await;
        self.complete_step3(request, result)
    }
}
