mod support;

use dashpilot_engine::confirm::ScriptedInput;
use dashpilot_engine::runlog::{MemoryLog, SharedLog};
use dashpilot_engine::workflow::{Mode, Step, StepStatus, Workflow};
use std::path::Path;
use std::sync::Arc;
use support::{FakeApp, credentials, fast_config, session};
use tokio_util::sync::CancellationToken;

fn workflow(
    app: FakeApp,
    dir: &Path,
    answers: &[&str],
    tweak: impl FnOnce(&mut dashpilot_engine::config::DashpilotConfig),
) -> (Workflow<FakeApp>, Arc<MemoryLog>) {
    let mut config = fast_config(dir);
    tweak(&mut config);
    let log = Arc::new(MemoryLog::new());
    let shared: SharedLog = log.clone();
    let workflow = Workflow::new(
        app,
        config,
        credentials(),
        Box::new(ScriptedInput::new(answers.iter().copied())),
        shared,
        session(),
        CancellationToken::new(),
    );
    (workflow, log)
}

#[tokio::test]
async fn test_full_run_without_questions() {
    let dir = tempfile::tempdir().unwrap();
    let (mut workflow, log) = workflow(FakeApp::logged_out(&["Sales"], Some(0)), dir.path(), &[], |_| {});

    let report = workflow.run(Mode::Run).await;

    assert!(report.is_success(), "{}", report.render());
    let expected = "AUTO-TEST-424242-Widget-Test";
    assert_eq!(report.dashboard.as_deref(), Some(expected));
    assert_eq!(report.created, vec![expected]);
    assert!(!log.contains("QUESTION"));

    let app = workflow.driver();
    assert_eq!(app.dashboards, vec!["Sales", expected]);
    assert_eq!(
        app.widget_events,
        vec!["metric First reply time", "period Today", "status Solved", "filter"]
    );
    assert_eq!(app.filled.get("Email").map(String::as_str), Some("qa@example.test"));
    assert!(!app.screenshots.is_empty());
    assert!(app.screenshots[0].ends_with("424242-01-after-login.png"));

    let summary = std::fs::read_to_string(dir.path().join("summary.txt")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines[0], format!("Dashboard: {}", expected));
    assert!(lines[1].starts_with("URL: https://app.example.test/edit/dashboards/"));
    assert!(lines[2].starts_with("Created: "));
}

#[tokio::test]
async fn test_widget_follows_configured_values() {
    let dir = tempfile::tempdir().unwrap();
    let (mut workflow, log) = workflow(
        FakeApp::logged_out(&["Sales"], Some(0)),
        dir.path(),
        &[],
        |config| {
            let widget = &mut config.workflow.widget;
            widget.metric = "Satisfaction score".to_string();
            // Only reachable through an alias.
            widget.time_period = Some("Past day".to_string());
            widget.option_aliases.insert("Past day".to_string(), vec!["Last 24".to_string()]);
            widget.status = Some("pending".to_string());
            widget.add_filter = false;
        },
    );

    let report = workflow.run(Mode::Run).await;

    assert!(report.is_success(), "{}", report.render());
    assert!(!log.contains("QUESTION"));
    assert!(log.contains("Selected 'Last 24 hours' in time period select"));
    let app = workflow.driver();
    assert_eq!(
        app.widget_events,
        vec!["metric Satisfaction score", "period Last 24 hours", "status Pending"]
    );
    assert_eq!(app.calls_to("click Metric(\"First reply time\")"), 0);
}

#[tokio::test]
async fn test_unknown_metric_is_handed_to_the_operator() {
    let dir = tempfile::tempdir().unwrap();
    let (mut workflow, log) = workflow(
        FakeApp::logged_out(&["Sales"], Some(0)),
        dir.path(),
        &["yes"],
        |config| {
            config.workflow.widget.metric = "Ticket volume".to_string();
            config.workflow.widget.status = None;
        },
    );

    let report = workflow.run(Mode::Run).await;

    assert!(report.is_success(), "{}", report.render());
    assert!(log.contains("QUESTION: Could not select the Ticket volume metric automatically (metric: "));
    assert!(log.contains("Operator completed: select the Ticket volume metric"));
    let app = workflow.driver();
    assert_eq!(app.widget_events, vec!["period Today", "filter"]);
}

#[tokio::test]
async fn test_failure_skips_remaining_steps_but_finalizes() {
    let dir = tempfile::tempdir().unwrap();
    let app = FakeApp::logged_out(&["Sales"], Some(0)).hide("button");
    let (mut workflow, log) = workflow(app, dir.path(), &["no"], |_| {});

    let report = workflow.run(Mode::Run).await;

    assert!(!report.is_success());
    assert!(!report.aborted);
    assert!(matches!(report.status_of(Step::Login), Some(StepStatus::Succeeded(_))));
    assert!(matches!(report.status_of(Step::Create), Some(StepStatus::Failed(_))));
    assert_eq!(report.status_of(Step::Rename), Some(&StepStatus::Skipped));
    assert_eq!(report.status_of(Step::ConfigureWidget), Some(&StepStatus::Skipped));
    assert_eq!(report.status_of(Step::Finalize), Some(&StepStatus::Succeeded(None)));
    assert!(log.contains("STEP finalize"));
    assert!(log.contains("Final URL:"));
    assert!(!dir.path().join("summary.txt").exists());
}

#[tokio::test]
async fn test_closed_input_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let app = FakeApp::logged_out(&["Sales"], Some(0)).hide("button");
    let (mut workflow, _log) = workflow(app, dir.path(), &[], |_| {});

    let report = workflow.run(Mode::Run).await;

    assert!(report.aborted);
    assert_eq!(report.first_failure().map(|(s, _)| s), Some(Step::Create));
    assert!(matches!(report.status_of(Step::Finalize), Some(StepStatus::Succeeded(_))));
}

#[tokio::test]
async fn test_unconfirmed_login_records_the_description() {
    let dir = tempfile::tempdir().unwrap();
    let app = FakeApp::logged_out(&[], None);
    let (mut workflow, log) = workflow(app, dir.path(), &["no", "a captcha page"], |_| {});

    let report = workflow.run(Mode::Run).await;

    let (step, reason) = report.first_failure().unwrap();
    assert_eq!(step, Step::Login);
    assert!(reason.contains("a captcha page"));
    assert!(log.contains("QUESTION: Did the login work? Are you now on the main dashboard page? (yes/no):"));
    assert!(log.contains("ANSWER: a captcha page"));
    assert_eq!(report.status_of(Step::Cleanup), Some(&StepStatus::Skipped));
}

#[tokio::test]
async fn test_check_mode_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let app = FakeApp::logged_out(&["Sales", "Dashboard 3", "AUTO-TEST-1-Widget-Test"], Some(0));
    let (mut workflow, _log) = workflow(app, dir.path(), &[], |_| {});

    let report = workflow.run(Mode::Check).await;

    assert!(report.is_success(), "{}", report.render());
    let flagged: Vec<(&str, bool)> = report
        .dashboards
        .iter()
        .map(|d| (d.name.as_str(), d.test_dashboard))
        .collect();
    assert_eq!(
        flagged,
        vec![("Sales", false), ("Dashboard 3", true), ("AUTO-TEST-1-Widget-Test", true)]
    );
    let app = workflow.driver();
    assert_eq!(app.dashboards.len(), 3);
    assert_eq!(app.clicks(), 1, "only the login button is clicked");
}

#[tokio::test]
async fn test_teardown_removes_created_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let (mut workflow, log) = workflow(
        FakeApp::logged_out(&["Sales"], Some(0)),
        dir.path(),
        &["yes"],
        |config| config.workflow.teardown_created = true,
    );

    let report = workflow.run(Mode::Run).await;

    assert!(report.is_success(), "{}", report.render());
    assert!(matches!(report.status_of(Step::Teardown), Some(StepStatus::Succeeded(_))));
    assert!(log.contains("QUESTION: Delete the 1 dashboard(s) created in this run"));
    assert!(report.created.is_empty());
    let app = workflow.driver();
    assert_eq!(app.dashboards, vec!["Sales"]);
    assert_eq!(app.active_name(), Some("Sales"));
}

#[tokio::test]
async fn test_shutdown_closes_driver() {
    let dir = tempfile::tempdir().unwrap();
    let (mut workflow, log) = workflow(FakeApp::new(&["Sales"], Some(0)), dir.path(), &[], |_| {});

    workflow.shutdown().await;

    assert!(workflow.driver().closed);
    assert!(log.contains("Session closed"));
}
