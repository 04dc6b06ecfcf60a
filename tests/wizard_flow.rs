//! End-to-end wizard flow against a mocked advising API.

use erasmus_helpdesk::{
    ClientConfig, ConfigOverrides, FileSessionStore, HttpBackend, Period, SessionStore, Step,
    StudyPlanFile, WizardController, WizardError,
};
use httpmock::prelude::*;
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

const TORINO: &str = "Politecnico di Torino";
const MUNICH: &str = "TECHNICAL UNIVERSITY OF MUNICH";

fn mock_api(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/api/students/universities");
        then.status(200).json_body(json!([TORINO, "Università di Pisa"]));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/students/step1")
            .json_body(json!({"home_university": TORINO}));
        then.status(200).json_body(json!({
            "has_program": true,
            "summary": "Minimum 24 CFU, language level B2",
            "session_id": "sess-torino"
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/students/departments")
            .json_body(json!({"session_id": "sess-torino"}));
        then.status(200)
            .json_body(json!({"departments": ["Computer Science", "Mathematics"]}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/students/step2").json_body(json!({
            "session_id": "sess-torino",
            "department": "Computer Science",
            "period": "fall"
        }));
        then.status(200).json_body(json!({
            "destinations": [{
                "name": MUNICH,
                "description": "AI and Machine Learning",
                "codice_europeo": "D MUNCHEN02",
                "posti": "1",
                "durata_per_posto": "6",
                "livello": "U",
                "requisiti_linguistici": "EN B2"
            }]
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/students/step3")
            .body_contains("sess-torino")
            .body_contains(MUNICH);
        then.status(200).json_body(json!({
            "matched_exams": [{
                "student_exam": "Basi di Dati",
                "destination_course": "Database Systems",
                "compatibility": "alta",
                "credits_student": "9 CFU",
                "credits_destination": "6 ECTS",
                "notes": "Winter term, first semester"
            }],
            "suggested_exams": [],
            "compatibility_score": 91.0,
            "analysis_summary": "Very compatible",
            "exams_pdf_url": "/api/students/files/exams/TUM.pdf",
            "exams_pdf_filename": "TUM.pdf"
        }));
    });
}

fn study_plan() -> StudyPlanFile {
    StudyPlanFile::new(
        "piano.pdf",
        erasmus_helpdesk::study_plan::PDF_MIME,
        b"%PDF-1.4 piano di studi".to_vec(),
    )
}

#[tokio::test]
async fn test_full_wizard_over_http() {
    let server = MockServer::start();
    mock_api(&server);
    let dir = tempfile::tempdir().unwrap();

    let backend = Arc::new(
        HttpBackend::new(&server.url("/api/students"), Duration::from_secs(5)).unwrap(),
    );
    let store = Arc::new(FileSessionStore::new(dir.path(), "tab-1"));
    let mut ctrl = WizardController::new(backend.clone(), store.clone());

    ctrl.init().await;
    assert_eq!(ctrl.state().universities.len(), 2);

    ctrl.submit_step1(TORINO).await.unwrap();
    assert_eq!(ctrl.state().departments, vec!["Computer Science", "Mathematics"]);

    ctrl.set_department("Computer Science");
    ctrl.set_period(Period::Fall);
    let destinations = ctrl.submit_step2().await.unwrap();
    assert_eq!(destinations[0].code.as_deref(), Some("D MUNCHEN02"));

    ctrl.select_study_plan(study_plan()).unwrap();
    let report = ctrl.submit_step3(MUNICH).await.unwrap();
    assert_eq!(report.compatibility_score, 91.0);
    assert_eq!(ctrl.state().step, Step::Exams);

    let view = ctrl.view();
    let report_view = view.report.unwrap();
    assert_eq!(
        report_view.matched[0].period_fit,
        erasmus_helpdesk::PeriodFit::Matches
    );
    assert_eq!(
        backend.artifact_url(&report).as_deref(),
        Some(format!("{}/api/students/files/exams/TUM.pdf", server.base_url()).as_str())
    );

    // The tab survives a restart
    let persisted = store.load();
    assert_eq!(persisted.home_university.as_deref(), Some(TORINO));
    assert_eq!(persisted.session_id.as_deref(), Some("sess-torino"));
    assert!(persisted.saved_at.is_some());
}

#[tokio::test]
async fn test_server_error_surfaces_detail() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/students/step1");
        then.status(404)
            .json_body(json!({"detail": "Nessun bando trovato per questa università"}));
    });

    let backend =
        Arc::new(HttpBackend::new(&server.url("/api/students"), Duration::from_secs(5)).unwrap());
    let store = Arc::new(erasmus_helpdesk::MemorySessionStore::new());
    let mut ctrl = WizardController::new(backend, store);

    let err = ctrl.submit_step1("Università di Nessuno").await.unwrap_err();
    assert!(matches!(err, WizardError::Api(_)));
    assert_eq!(
        ctrl.last_error(),
        Some("Nessun bando trovato per questa università")
    );
    assert!(ctrl.state().program.is_none());
}

#[tokio::test]
async fn test_separate_tabs_do_not_share_sessions() {
    let server = MockServer::start();
    mock_api(&server);
    let dir = tempfile::tempdir().unwrap();
    let backend =
        Arc::new(HttpBackend::new(&server.url("/api/students"), Duration::from_secs(5)).unwrap());

    let (first, _) = FileSessionStore::new_tab(dir.path());
    let mut ctrl = WizardController::new(backend.clone(), Arc::new(first));
    ctrl.submit_step1(TORINO).await.unwrap();

    let (second, _) = FileSessionStore::new_tab(dir.path());
    let other = WizardController::new(backend, Arc::new(second));
    assert!(other.state().session.is_none());
    assert!(other.state().home_university.is_empty());
}

#[test]
#[serial]
fn test_config_file_and_overrides() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "api_base = \"http://advisor.local/api/students/\"\ntimeout_secs = 30\n",
    )
    .unwrap();

    let config = ClientConfig::resolve(ConfigOverrides {
        data_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(config.api_base, "http://advisor.local/api/students");
    assert_eq!(config.timeout_secs, 30);

    let config = ClientConfig::resolve(ConfigOverrides {
        api_base: Some("http://other/api/students".to_string()),
        data_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(config.api_base, "http://other/api/students");
}

#[test]
#[serial]
fn test_default_data_dir_follows_home() {
    let home = tempfile::tempdir().unwrap();
    let previous = std::env::var_os("HOME");
    std::env::set_var("HOME", home.path());

    let config = ClientConfig::resolve(ConfigOverrides::default()).unwrap();
    assert!(config.data_dir.starts_with(home.path()));

    match previous {
        Some(value) => std::env::set_var("HOME", value),
        None => std::env::remove_var("HOME"),
    }
}
