use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use crm_api::{timeout_from_env, HttpApi, DEFAULT_BASE_URL};
use crm_console::{Action, Console, LoadStatus, ProgressState, Severity, Toast};
use crm_core::{NewUser, Provider, UserId};
use crm_search::{EmailFilter, UserFilter};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "crmctl", version, about = "CRM dashboard from the terminal")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Backend base URL
    #[arg(long = "base-url", global = true, env = "CRM_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dashboard counters
    Summary,
    /// List users through the search and sort controls
    Users {
        #[arg(long, default_value = "")]
        search: String,
        /// Age bracket: 18-25, 26-35, 36-50, 51+
        #[arg(long, default_value = "")]
        age: String,
        /// newest, oldest, name_asc, name_desc, age_asc, age_desc
        #[arg(long, default_value = "newest")]
        sort: String,
    },
    /// List email addresses
    Emails {
        #[arg(long, default_value = "")]
        search: String,
        /// Provider tag, e.g. gmail or custom2
        #[arg(long, default_value = "")]
        provider: String,
        /// newest, oldest, provider
        #[arg(long, default_value = "newest")]
        sort: String,
    },
    /// Create one user
    AddUser { first: String, last: String, age: u32 },
    /// Delete one user (and their emails)
    RmUser { id: UserId },
    /// Delete every user
    ClearUsers {
        #[arg(long, action = ArgAction::SetTrue)]
        yes: bool,
    },
    /// Delete every email address
    ClearEmails {
        #[arg(long, action = ArgAction::SetTrue)]
        yes: bool,
    },
    /// Generate random users in one request
    GenUsers {
        count: Option<u32>,
        /// Generate the quick batch instead
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "count")]
        quick: bool,
    },
    /// Generate addresses for every user; all provider types unless --type is given
    GenEmails {
        #[arg(long = "type")]
        types: Vec<String>,
    },
}

fn init_tracing() {
    let env = std::env::var("CRM_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("CRM_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid CRM_METRICS_ADDR; expected host:port");
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    let api = HttpApi::new(&cli.base_url, timeout_from_env()).context("building backend client")?;
    info!(base_url = %api.base_url(), "crmctl starting");
    let mut console = Console::from_env(Arc::new(api));
    let out = cli.output;

    match cli.command {
        Commands::Summary => {
            console.dispatch(Action::Navigate("dashboard".into()));
            console.dispatch(Action::ReloadSummary);
            drive(&mut console, out).await;
            let s = console.summary();
            match out {
                Output::Human => {
                    let dash = || "-".to_string();
                    println!("{}", console.nav().title);
                    println!("users      {} ({})", s.users.map(|n| n.to_string()).unwrap_or_else(dash), s.users_growth().unwrap_or_else(dash));
                    println!("emails     {} ({})", s.emails.map(|n| n.to_string()).unwrap_or_else(dash), s.emails_growth().unwrap_or_else(dash));
                    println!("providers  {}", s.providers_label().unwrap_or_else(dash));
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(s)?),
            }
            if s.users.is_none() || s.emails.is_none() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Users { search, age, sort } => {
            console.dispatch(Action::Navigate("users".into()));
            console.dispatch(Action::SetUserFilter(UserFilter::from_controls(&search, &age, &sort)));
            console.dispatch(Action::ReloadUsers);
            drive(&mut console, out).await;
            let view = console.users_view();
            match out {
                Output::Human => {
                    println!("{}", console.nav().title);
                    println!("{:<6} {:<32} {:>4}  CREATED", "ID", "NAME", "AGE");
                    for r in view.rows.iter() {
                        println!("{:<6} {:<32} {:>4}  {}", r.id, r.name, r.age, r.created);
                    }
                    print_footer(view.rows.len(), view.total, view.placeholder, &view.status);
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&view)?),
            }
            if matches!(view.status, LoadStatus::Failed(_)) {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Emails { search, provider, sort } => {
            console.dispatch(Action::Navigate("emails".into()));
            console.dispatch(Action::SetEmailFilter(EmailFilter::from_controls(&search, &provider, &sort)));
            console.dispatch(Action::ReloadEmails);
            drive(&mut console, out).await;
            let view = console.emails_view();
            match out {
                Output::Human => {
                    println!("{}", console.nav().title);
                    println!("{:<6} {:<36} {:<10} {:<24} CREATED", "ID", "ADDRESS", "PROVIDER", "OWNER");
                    for r in view.rows.iter() {
                        println!("{:<6} {:<36} {:<10} {:<24} {}", r.id, r.address, r.provider, r.owner, r.created);
                    }
                    print_footer(view.rows.len(), view.total, view.placeholder, &view.status);
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&view)?),
            }
            if matches!(view.status, LoadStatus::Failed(_)) {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::AddUser { first, last, age } => {
            console.dispatch(Action::CreateUser(NewUser::new(first, last, age)));
            return finish(&mut console, out).await;
        }
        Commands::RmUser { id } => {
            console.dispatch(Action::DeleteUser(id));
            return finish(&mut console, out).await;
        }
        Commands::ClearUsers { yes } => {
            if !yes {
                eprintln!("refusing to delete every user without --yes");
                return Ok(ExitCode::FAILURE);
            }
            console.dispatch(Action::ClearUsers);
            return finish(&mut console, out).await;
        }
        Commands::ClearEmails { yes } => {
            if !yes {
                eprintln!("refusing to delete every email without --yes");
                return Ok(ExitCode::FAILURE);
            }
            console.dispatch(Action::ClearEmails);
            return finish(&mut console, out).await;
        }
        Commands::GenUsers { count, quick } => {
            let action = if quick {
                Action::QuickGenerateUsers
            } else {
                Action::GenerateUsers(count.unwrap_or(console.config().default_bulk_users))
            };
            console.dispatch(action);
            return finish(&mut console, out).await;
        }
        Commands::GenEmails { types } => {
            let action = if types.is_empty() {
                Action::GenerateEmails
            } else {
                Action::GenerateSelectedEmails(types.iter().map(|t| Provider::from(t.as_str())).collect())
            };
            console.dispatch(action);
            return finish(&mut console, out).await;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_footer(shown: usize, total: usize, placeholder: Option<&str>, status: &LoadStatus) {
    if let LoadStatus::Failed(msg) = status {
        eprintln!("{msg}");
    } else if let Some(p) = placeholder {
        println!("{p}");
    }
    println!("{shown} of {total}");
}

#[derive(Serialize)]
struct ToastOut<'a> {
    severity: Severity,
    icon: &'static str,
    text: &'a str,
}

fn print_toast(t: &Toast, out: Output) {
    match out {
        Output::Human => println!("[{}] {}", t.severity.style().icon, t.text),
        Output::Json => {
            let line = ToastOut { severity: t.severity, icon: t.severity.style().icon, text: &t.text };
            if let Ok(s) = serde_json::to_string(&line) {
                println!("{s}");
            }
        }
    }
}

/// Run a mutation or generation to the end; the exit status follows the last toast.
async fn finish(console: &mut Console, out: Output) -> Result<ExitCode> {
    drive(console, out).await;
    let failed = console.last_toast().map(|t| t.severity == Severity::Error).unwrap_or(false);
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Pump console updates until nothing is in flight, mirroring the progress
/// surface on a bar and printing each toast as it appears.
async fn drive(console: &mut Console, out: Output) {
    let mut bar: Option<ProgressBar> = None;
    let mut toast_seq = 0u64;
    loop {
        if let Some(t) = console.last_toast() {
            if t.seq != toast_seq {
                toast_seq = t.seq;
                if let Some(pb) = &bar {
                    pb.suspend(|| print_toast(t, out));
                } else {
                    print_toast(t, out);
                }
            }
        }
        match console.progress() {
            Some(p) if out == Output::Human => render(bar.get_or_insert_with(new_bar), p),
            _ => {
                if let Some(pb) = bar.take() {
                    pb.finish_and_clear();
                }
            }
        }
        if !console.step().await {
            break;
        }
    }
    if let Some(pb) = bar {
        pb.finish_and_clear();
    }
}

fn new_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    match ProgressStyle::with_template(":: {prefix} [{bar:40}] {pos}% :: {msg}") {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => tracing::warn!(error = %e, "progress style rejected; using default"),
    }
    pb
}

fn render(pb: &ProgressBar, p: &ProgressState) {
    pb.set_prefix(p.title);
    pb.set_position(u64::from(p.percent));
    pb.set_message(p.label);
}
