//! Three-step advising wizard
//!
//! 1. Program: look up the home university's Erasmus call, open a session
//! 2. Shortlist: destinations for a department and study period
//! 3. Exams: match the student's study plan against a destination

mod controller;
mod state;
mod view;

pub use controller::{
    DepartmentsFetch, Step1Request, Step2Request, Step3Request, Ticket, WizardController,
};
pub use state::{Step, WizardState};
pub use view::{DestinationRow, ProgramPanel, ShortlistPanel, StepperItem, WizardView};
