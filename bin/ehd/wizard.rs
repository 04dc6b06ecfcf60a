//! Advising Wizard - Interactive CLI
//!
//! Walks the student through the three steps:
//! 1. Home university and Erasmus call lookup
//! 2. Department and period, destination shortlist
//! 3. Destination choice and study plan matching

use anyhow::{Context, Result};
use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use erasmus_helpdesk::report::{CompatibilityLevel, PeriodFit};
use erasmus_helpdesk::study_plan::StudyPlanFile;
use erasmus_helpdesk::wizard::{ProgramPanel, ShortlistPanel, WizardView};
use erasmus_helpdesk::{
    AdvisingBackend, ClientConfig, FileSessionStore, HttpBackend, MemorySessionStore, MockBackend,
    Period, ReportView, SessionStore, Step, WizardController, WizardError,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::style::*;

pub struct WizardOptions {
    pub mock: bool,
    pub tab: Option<String>,
    pub ephemeral: bool,
    pub download_dir: PathBuf,
}

/// Where the flow goes next.
enum Next {
    Program,
    Shortlist,
    Exams,
    Quit,
}

pub async fn run(config: &ClientConfig, opts: WizardOptions) -> Result<()> {
    let http = if opts.mock {
        None
    } else {
        Some(Arc::new(
            HttpBackend::from_config(config).context("Failed to build HTTP client")?,
        ))
    };
    let backend: Arc<dyn AdvisingBackend> = match &http {
        Some(http) => http.clone() as Arc<dyn AdvisingBackend>,
        None => Arc::new(MockBackend::new().with_latency(Duration::from_millis(400))),
    };

    let store: Arc<dyn SessionStore> = if opts.ephemeral {
        Arc::new(MemorySessionStore::new())
    } else {
        match &opts.tab {
            Some(tab) => Arc::new(FileSessionStore::new(&config.data_dir, tab)),
            None => {
                let (store, tab) = FileSessionStore::new_tab(&config.data_dir);
                info!("New wizard tab {}", tab);
                print_info(&format!(
                    "Resume this session later with: ehd wizard --tab {}",
                    tab
                ));
                Arc::new(store)
            }
        }
    };

    let term = Term::stdout();
    term.clear_screen()?;
    print_banner(opts.mock);

    let mut ctrl = WizardController::new(backend, store);
    with_spinner("Loading universities...", ctrl.init()).await;

    let mut next = Next::Program;
    loop {
        next = match next {
            Next::Program => program_step(&mut ctrl).await?,
            Next::Shortlist => shortlist_step(&mut ctrl).await?,
            Next::Exams => exams_step(&mut ctrl, http.as_deref(), &opts.download_dir).await?,
            Next::Quit => break,
        };
    }

    println!();
    println!("  {}", style("Good luck with your Erasmus!").cyan().bold());
    println!();
    Ok(())
}

fn print_banner(mock: bool) {
    println!();
    println!("{}", style("  Erasmus Helpdesk").cyan().bold());
    println!(
        "  {}",
        style("Find your Erasmus destination and check your exams").dim()
    );
    if mock {
        println!("  {}", style("(offline demo data)").yellow());
    }
    println!();
}

fn print_stepper(view: &WizardView) {
    let items: Vec<String> = view
        .stepper
        .iter()
        .map(|item| {
            let label = format!("{}. {}", item.step.number(), item.title);
            if item.current && item.active {
                style_cyan(&style_bold(&label))
            } else if item.active {
                style_bold(&label)
            } else {
                style_dim(&label)
            }
        })
        .collect();
    println!();
    println!("  {}", items.join(&format!(" {} ", icon_arrow())));
}

async fn with_spinner<F: Future>(msg: &str, fut: F) -> F::Output {
    let pb = spinner(msg);
    let out = fut.await;
    pb.finish_and_clear();
    out
}

/// Stale results are expected after navigating back; only log them.
fn report_error(err: &WizardError) {
    match err {
        WizardError::Stale(step) => debug!("Ignored stale {} result", step),
        other => print_error(&other.to_string()),
    }
}

fn retry(prompt: &str) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("  {}", prompt))
        .default(true)
        .interact()?)
}

// ============================================================================
// Step 1
// ============================================================================

async fn program_step(ctrl: &mut WizardController) -> Result<Next> {
    print_stepper(&ctrl.view());
    print_header("Step 1: Home University");

    let home = pick_home_university(ctrl)?;
    let result = with_spinner(
        "Looking up the Erasmus call...",
        ctrl.submit_step1(&home),
    )
    .await;

    if let Err(e) = result {
        report_error(&e);
        return Ok(if retry("Try again?")? {
            Next::Program
        } else {
            Next::Quit
        });
    }

    match ctrl.view().program {
        ProgramPanel::Found { summary } => {
            print_success(&format!("Erasmus call found for {}", home));
            if let Some(summary) = summary {
                print_section("Call summary");
                for line in summary.lines() {
                    println!("  {}", line);
                }
            }
            Ok(Next::Shortlist)
        }
        ProgramPanel::NotFound => {
            print_warning(&format!("No Erasmus program found for {}", home));
            Ok(if retry("Choose another university?")? {
                Next::Program
            } else {
                Next::Quit
            })
        }
        ProgramPanel::Pending => Ok(Next::Program),
    }
}

fn pick_home_university(ctrl: &WizardController) -> Result<String> {
    let state = ctrl.state();
    let current = state.home_university.clone();

    if state.universities.is_empty() {
        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme)
            .with_prompt("  Home university")
            .validate_with(|s: &String| -> Result<(), &str> {
                if s.trim().is_empty() {
                    Err("Home university cannot be empty")
                } else {
                    Ok(())
                }
            });
        if !current.is_empty() {
            input = input.default(current);
        }
        return Ok(input.interact_text()?.trim().to_string());
    }

    let default = state
        .universities
        .iter()
        .position(|u| *u == current)
        .unwrap_or(0);
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("  Home university")
        .items(&state.universities)
        .default(default)
        .interact()?;
    Ok(state.universities[idx].clone())
}

// ============================================================================
// Step 2
// ============================================================================

async fn shortlist_step(ctrl: &mut WizardController) -> Result<Next> {
    print_stepper(&ctrl.view());
    print_header("Step 2: Destinations");

    let department = pick_department(ctrl)?;
    ctrl.set_department(&department);
    let period = pick_period(ctrl.state().period)?;
    ctrl.set_period(period);

    let result = with_spinner("Searching destinations...", ctrl.submit_step2()).await;
    if let Err(e) = result {
        report_error(&e);
        return Ok(if retry("Try again?")? {
            Next::Shortlist
        } else {
            Next::Quit
        });
    }

    match ctrl.view().shortlist {
        ShortlistPanel::Results(rows) => {
            print_success(&format!("{} destinations found", rows.len()));
            let mut table = table(&["Destination", "Slots", "Months", "Level", "Language"]);
            for row in &rows {
                let d = &row.destination;
                table.add_row(vec![
                    d.name.clone(),
                    d.slots.clone().unwrap_or_default(),
                    d.duration_months.clone().unwrap_or_default(),
                    d.level.clone().unwrap_or_default(),
                    d.language_requirement.clone().unwrap_or_default(),
                ]);
            }
            print_table(&table);
            Ok(Next::Exams)
        }
        ShortlistPanel::Empty { department, period } => {
            print_warning(&format!(
                "No destinations for {} in the {}",
                department,
                period.label().to_lowercase()
            ));
            back_menu(ctrl, false)
        }
        ShortlistPanel::Prompt => Ok(Next::Shortlist),
    }
}

fn pick_department(ctrl: &WizardController) -> Result<String> {
    let state = ctrl.state();
    if state.departments.is_empty() {
        print_warning("Department list unavailable, type it instead");
        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme)
            .with_prompt("  Department");
        if !state.department.is_empty() {
            input = input.default(state.department.clone());
        }
        return Ok(input.interact_text()?.trim().to_string());
    }

    let default = state
        .departments
        .iter()
        .position(|d| *d == state.department)
        .unwrap_or(0);
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("  Department")
        .items(&state.departments)
        .default(default)
        .interact()?;
    Ok(state.departments[idx].clone())
}

fn pick_period(current: Period) -> Result<Period> {
    let labels: Vec<&str> = Period::ALL.iter().map(|p| p.label()).collect();
    let default = Period::ALL.iter().position(|p| *p == current).unwrap_or(0);
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("  Study period")
        .items(&labels)
        .default(default)
        .interact()?;
    Ok(Period::ALL[idx])
}

// ============================================================================
// Step 3
// ============================================================================

async fn exams_step(
    ctrl: &mut WizardController,
    http: Option<&HttpBackend>,
    download_dir: &std::path::Path,
) -> Result<Next> {
    print_stepper(&ctrl.view());
    print_header("Step 3: Exams");

    let Some(shortlist) = ctrl.state().shortlist.clone() else {
        return Ok(Next::Shortlist);
    };
    let names: Vec<&str> = shortlist.iter().map(|d| d.name.as_str()).collect();
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("  Destination")
        .items(&names)
        .default(0)
        .interact()?;
    let destination = names[idx].to_string();

    if !pick_study_plan(ctrl)? {
        return back_menu(ctrl, false);
    }

    let result = with_spinner(
        "Matching your study plan (this can take a minute)...",
        ctrl.submit_step3(&destination),
    )
    .await;
    if let Err(e) = result {
        report_error(&e);
        return Ok(if retry("Try again?")? {
            Next::Exams
        } else {
            Next::Quit
        });
    }

    let view = ctrl.view();
    if let Some(report) = &view.report {
        print_report(&destination, ctrl.state().period, report);
        if let (Some(http), Some(raw)) = (http, ctrl.state().report.as_ref()) {
            offer_download(http, raw, download_dir).await?;
        }
    }
    back_menu(ctrl, true)
}

/// Keep the current file or pick a new one. False when the user gives up.
fn pick_study_plan(ctrl: &mut WizardController) -> Result<bool> {
    if let Some(current) = &ctrl.state().study_plan {
        let keep = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("  Use study plan {}?", current.file_name))
            .default(true)
            .interact()?;
        if keep {
            return Ok(true);
        }
    }

    loop {
        let path: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("  Study plan PDF")
            .interact_text()?;
        let path = PathBuf::from(path.trim());

        match StudyPlanFile::from_path(&path) {
            Ok(file) => {
                if let Err(e) = ctrl.select_study_plan(file) {
                    report_error(&e);
                } else {
                    print_success(&format!("Selected {}", path.display()));
                    return Ok(true);
                }
            }
            Err(e) => print_error(&e.to_string()),
        }
        if !retry("Pick another file?")? {
            ctrl.clear_study_plan();
            return Ok(false);
        }
    }
}

fn print_report(destination: &str, period: Period, report: &ReportView) {
    print_section(&format!("Compatibility with {}", destination));
    let score_color = if report.score >= 70.0 {
        colors::GREEN
    } else if report.score >= 40.0 {
        colors::YELLOW
    } else {
        colors::RED
    };
    print_key_value_colored("Score", &format!("{:.0}%", report.score), score_color);
    println!("  {}", progress_bar(report.score / 100.0, 30));
    if !report.summary.is_empty() {
        println!();
        println!("  {}", report.summary);
    }

    if !report.matched.is_empty() {
        print_section("Matched exams");
        let mut table = table(&["Your exam", "Destination course", "Match", "Credits", "Period"]);
        for m in &report.matched {
            table.add_row(vec![
                m.exam.student_exam.clone(),
                m.exam.destination_course.clone(),
                level_label(m.level, &m.exam.compatibility),
                format!("{} / {}", m.exam.credits_student, m.exam.credits_destination),
                fit_label(m.period_fit, period),
            ]);
        }
        print_table(&table);
    }

    if !report.suggested.is_empty() {
        print_section("Suggested exams");
        let mut table = table(&["Course", "Credits", "Why", "Period"]);
        for s in &report.suggested {
            table.add_row(vec![
                s.exam.course_name.clone(),
                s.exam.credits.clone(),
                s.exam.reason.clone(),
                fit_label(s.period_fit, period),
            ]);
        }
        print_table(&table);
    }
}

fn level_label(level: CompatibilityLevel, raw: &str) -> String {
    match level {
        CompatibilityLevel::Unknown => raw.to_string(),
        known => known.label().to_string(),
    }
}

fn fit_label(fit: PeriodFit, period: Period) -> String {
    match fit {
        PeriodFit::Matches => format!("{} {}", icon_success(), period),
        PeriodFit::Conflicts => format!("{} {}", icon_warning(), period.other()),
        PeriodFit::Unknown => "-".to_string(),
    }
}

async fn offer_download(
    http: &HttpBackend,
    report: &erasmus_helpdesk::MatchReport,
    dir: &std::path::Path,
) -> Result<()> {
    let Some(url) = http.artifact_url(report) else {
        return Ok(());
    };
    println!();
    print_key_value("Course catalogue", &url);

    let download = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("  Download the course catalogue PDF?")
        .default(false)
        .interact()?;
    if !download {
        return Ok(());
    }
    match with_spinner("Downloading...", http.download_artifact(report, dir)).await {
        Ok(Some(path)) => print_success(&format!("Saved {}", path.display())),
        Ok(None) => {}
        Err(e) => print_error(&e.to_string()),
    }
    Ok(())
}

/// Navigation after a step: go back, retry, or quit.
fn back_menu(ctrl: &mut WizardController, has_report: bool) -> Result<Next> {
    let mut items = Vec::new();
    if has_report {
        items.push(("Try another destination", Some(Step::Exams)));
    }
    items.push(("Change department or period", Some(Step::Shortlist)));
    items.push(("Change home university", Some(Step::Program)));
    items.push(("Quit", None));

    let labels: Vec<&str> = items.iter().map(|(l, _)| *l).collect();
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("  What next?")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(match items[idx].1 {
        Some(Step::Exams) => {
            ctrl.reset_from(Step::Exams);
            Next::Exams
        }
        Some(Step::Shortlist) => {
            ctrl.reset_from(Step::Shortlist);
            Next::Shortlist
        }
        Some(Step::Program) => {
            ctrl.reset_from(Step::Program);
            Next::Program
        }
        None => Next::Quit,
    })
}
