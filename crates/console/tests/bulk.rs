use std::sync::Arc;
use std::time::Duration;

use crm_api::{ApiError, MockApi, Op};
use crm_console::{Action, Console, DashboardConfig, Severity, LABEL_COMPLETED, LABEL_GENERATING, LABEL_STARTING};
use crm_core::{Provider, User};
use tokio::time::Instant;

fn users(n: i64) -> Vec<User> {
    (1..=n)
        .map(|id| User { id, first_name: format!("Ana{id}"), last_name: "Gil".into(), age: 30, created_at: None })
        .collect()
}

fn console(api: &Arc<MockApi>) -> Console {
    Console::new(api.clone(), DashboardConfig::default())
}

#[tokio::test(start_paused = true)]
async fn users_success_after_ticker_reached_cap() {
    let api = Arc::new(MockApi::new());
    api.delay_on(Op::GenerateUsers, Duration::from_secs(5));
    let mut c = console(&api);

    c.dispatch(Action::GenerateUsers(50));
    let p = c.progress().expect("surface open");
    assert_eq!((p.percent, p.label), (0, LABEL_STARTING));
    assert_eq!(p.title, "Generating random users");

    let mut seen = Vec::new();
    let mut completed_at = None;
    let mut closed_at = None;
    while c.step().await {
        match c.progress() {
            Some(p) => {
                if p.percent == 100 && completed_at.is_none() {
                    completed_at = Some(Instant::now());
                }
                seen.push((p.percent, p.label));
            }
            None => {
                closed_at = Some(Instant::now());
                break;
            }
        }
    }

    // Ticker climbed to its cap and stayed there until the response.
    let ticks: Vec<u8> = seen.iter().filter(|(_, l)| *l == LABEL_GENERATING).map(|(p, _)| *p).collect();
    assert_eq!(ticks.iter().max(), Some(&90));
    assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
    // The completed state is the last thing the surface showed.
    assert_eq!(seen.last(), Some(&(100, LABEL_COMPLETED)));
    let first_done = seen.iter().position(|(p, _)| *p == 100).expect("reached 100");
    assert!(seen[first_done..].iter().all(|s| *s == (100, LABEL_COMPLETED)));
    let held = closed_at.expect("closed") - completed_at.expect("completed");
    assert!(held >= Duration::from_millis(500), "held {held:?}");

    let toast = c.toast().expect("toast");
    assert_eq!(toast.severity, Severity::Success);
    assert_eq!(toast.text, "50 random users generated");

    c.run_until_idle().await;
    assert_eq!(c.users().len(), 50);
    assert_eq!(c.summary().users, Some(50));
    assert_eq!(api.call_count(Op::GenerateUsers), 1);
    // One reload of the list plus both summary counts.
    assert_eq!(api.call_count(Op::ListUsers), 2);
    assert_eq!(api.call_count(Op::ListEmails), 1);

    // Nothing keeps ticking after completion.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!c.step().await);
    assert!(c.progress().is_none());
}

#[tokio::test(start_paused = true)]
async fn failure_closes_surface_without_reload() {
    let api = Arc::new(MockApi::new().with_users(users(3)));
    api.delay_on(Op::GenerateEmails, Duration::from_secs(1));
    api.fail_on(Op::GenerateEmails, ApiError::Status { status: 500, message: "template store unavailable".into() });
    let mut c = console(&api);

    c.dispatch(Action::GenerateEmails);
    assert!(c.progress().is_some());
    c.run_until_idle().await;

    assert!(c.progress().is_none());
    let toast = c.toast().expect("toast");
    assert_eq!(toast.severity, Severity::Error);
    assert_eq!(toast.text, "Error generating emails: template store unavailable");
    assert_eq!(api.call_count(Op::ListEmails), 0);
    assert_eq!(api.call_count(Op::ListUsers), 0);
}

#[tokio::test(start_paused = true)]
async fn network_failure_names_the_operation() {
    let api = Arc::new(MockApi::new());
    api.fail_on(Op::GenerateUsers, ApiError::Network("connection refused".into()));
    let mut c = console(&api);
    c.dispatch(Action::QuickGenerateUsers);
    c.run_until_idle().await;
    assert_eq!(api.calls(), vec![crm_api::MockCall::GenerateUsers(100)]);
    assert_eq!(c.toast().map(|t| t.text.as_str()), Some("Error generating users: network error (connection refused)"));
}

#[tokio::test(start_paused = true)]
async fn oversized_request_is_rejected_before_any_call() {
    let api = Arc::new(MockApi::new());
    let mut c = console(&api);
    c.dispatch(Action::GenerateUsers(10_001));
    assert!(c.progress().is_none());
    assert!(c.is_idle());
    let toast = c.toast().expect("toast");
    assert_eq!(toast.severity, Severity::Error);
    assert!(toast.text.contains("10000"), "{}", toast.text);
    c.run_until_idle().await;
    assert!(api.calls().is_empty());

    c.dispatch(Action::GenerateUsers(0));
    assert!(c.progress().is_none());
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn empty_selection_is_rejected() {
    let api = Arc::new(MockApi::new().with_users(users(1)));
    let mut c = console(&api);
    c.dispatch(Action::GenerateSelectedEmails(Vec::new()));
    assert!(c.progress().is_none());
    assert_eq!(c.toast().map(|t| t.text.as_str()), Some("select at least one email type"));
    c.run_until_idle().await;
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn selected_emails_report_scope() {
    let api = Arc::new(MockApi::new().with_users(users(4)));
    let mut c = console(&api);
    c.dispatch(Action::GenerateSelectedEmails(vec![Provider::Gmail, Provider::Yahoo]));
    c.run_until_idle().await;
    assert_eq!(c.toast().map(|t| t.text.as_str()), Some("8 emails generated for 2 selected types"));
    assert_eq!(c.emails().len(), 8);
    assert_eq!(c.summary().providers, Some(2));
    assert_eq!(api.call_count(Op::ListEmails), 2);
    assert_eq!(api.call_count(Op::ListUsers), 1);
}

#[tokio::test(start_paused = true)]
async fn second_trigger_while_running_is_refused() {
    let api = Arc::new(MockApi::new().with_users(users(2)));
    api.delay_on(Op::GenerateUsers, Duration::from_secs(2));
    let mut c = console(&api);
    c.dispatch(Action::GenerateUsers(10));
    let op_title = c.progress().map(|p| p.title);

    c.dispatch(Action::GenerateEmails);
    assert_eq!(c.toast().map(|t| t.severity), Some(Severity::Warning));
    // The running operation keeps the surface.
    assert_eq!(c.progress().map(|p| p.title), op_title);

    c.run_until_idle().await;
    assert_eq!(api.call_count(Op::GenerateEmails), 0);
    assert_eq!(c.toast().map(|t| t.text.as_str()), Some("10 random users generated"));

    // Once finished, a new trigger goes through.
    c.dispatch(Action::GenerateEmails);
    c.run_until_idle().await;
    assert_eq!(api.call_count(Op::GenerateEmails), 1);
}
