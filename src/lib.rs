//! Erasmus Helpdesk client
//!
//! Guides a student through an Erasmus exchange application in three steps
//! against a remote advising API, and lets universities manage the
//! documents that API reads.
//!
//! ## Module Structure
//!
//! - `wizard/`: step state, controller and derived views
//! - `backend/`: advising API trait, HTTP client and canned mock
//! - `portal/`: university portal client and token storage
//! - `report`: compatibility and study-period hints for match reports
//! - `session_store`: per-tab persistence of the wizard session
//! - `study_plan`: study plan file loading and validation
//! - `config`: endpoints, timeouts and data directory

// ============================================================================
// MODULES
// ============================================================================

/// Advising API clients
pub mod backend;
/// Client configuration
pub mod config;
/// Error types
pub mod error;
/// Wire types of the advising API
pub mod models;
/// University portal
pub mod portal;
/// Match report analysis
pub mod report;
/// Wizard session persistence
pub mod session_store;
/// Study plan upload handling
pub mod study_plan;
/// Three-step wizard
pub mod wizard;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use backend::{AdvisingBackend, HttpBackend, MockBackend};
pub use config::{ClientConfig, ConfigOverrides};
pub use error::{ApiError, PortalError, StoreError, ValidationError, WizardError};
pub use models::{Destination, MatchReport, Period, ProgramInfo, SessionHandle};
pub use portal::{DocumentKind, FileTokenStore, PortalClient, TokenStore};
pub use report::{analyze, CompatibilityLevel, PeriodFit, ReportView};
pub use session_store::{FileSessionStore, MemorySessionStore, PersistedSession, SessionStore};
pub use study_plan::{StudyPlanFile, MAX_STUDY_PLAN_BYTES};
pub use wizard::{Step, WizardController, WizardState, WizardView};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Client version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
