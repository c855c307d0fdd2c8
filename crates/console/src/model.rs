#![forbid(unsafe_code)]

use crm_api::{ApiError, EmailScope};
use crm_core::{Collection, Email, User, UserId};
use serde::Serialize;
use uuid::Uuid;

/// Messages from background tasks to the console, applied in arrival order.
#[derive(Debug)]
pub enum UiUpdate {
    UsersLoaded(Vec<User>),
    EmailsLoaded(Vec<Email>),
    LoadFailed { collection: Collection, message: String },
    SummaryUsers(usize),
    SummaryEmails { count: usize, providers: usize },
    Mutation { what: Mutation, result: Result<Option<String>, ApiError> },
    Progress { op: Uuid, percent: u8, label: &'static str },
    BulkFinished { op: Uuid, result: Result<BulkOutcome, ApiError> },
    /// Last message of every spawned task. `clean` is false when the task's
    /// future was dropped before finishing (panic or abort).
    TaskEnded { name: &'static str, clean: bool },
}

pub const LABEL_STARTING: &str = "Starting...";
pub const LABEL_GENERATING: &str = "Generating...";
pub const LABEL_COMPLETED: &str = "Completed!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reloads {
    pub users: bool,
    pub emails: bool,
    pub summary: bool,
}

impl Reloads {
    pub const USERS: Reloads = Reloads { users: true, emails: false, summary: true };
    pub const EMAILS: Reloads = Reloads { users: false, emails: true, summary: true };
    pub const ALL: Reloads = Reloads { users: true, emails: true, summary: true };
}

/// Single-record and clear-all mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    CreateUser,
    DeleteUser(UserId),
    ClearUsers,
    ClearEmails,
}

impl Mutation {
    pub fn reloads(self) -> Reloads {
        match self {
            Mutation::CreateUser => Reloads::USERS,
            // Emails belong to users and go with them server side.
            Mutation::DeleteUser(_) | Mutation::ClearUsers => Reloads::ALL,
            Mutation::ClearEmails => Reloads::EMAILS,
        }
    }

    pub fn success_text(self) -> &'static str {
        match self {
            Mutation::CreateUser => "User added",
            Mutation::DeleteUser(_) => "User deleted",
            Mutation::ClearUsers => "All users deleted",
            Mutation::ClearEmails => "All emails deleted",
        }
    }

    pub fn failure_prefix(self) -> &'static str {
        match self {
            Mutation::CreateUser => "Could not add user",
            Mutation::DeleteUser(_) => "Could not delete user",
            Mutation::ClearUsers => "Could not delete users",
            Mutation::ClearEmails => "Could not delete emails",
        }
    }
}

/// One bulk generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkKind {
    Users { count: u32 },
    Emails(EmailScope),
}

impl BulkKind {
    pub fn title(&self) -> &'static str {
        match self {
            BulkKind::Users { .. } => "Generating random users",
            BulkKind::Emails(_) => "Generating emails",
        }
    }

    /// Leads the error toast when the generation request fails.
    pub fn failure_prefix(&self) -> &'static str {
        match self {
            BulkKind::Users { .. } => "Error generating users",
            BulkKind::Emails(_) => "Error generating emails",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BulkKind::Users { .. } => "users",
            BulkKind::Emails(_) => "emails",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BulkOutcome {
    Users { generated: usize },
    Emails { generated: usize, scope: String, elapsed_secs: Option<f64> },
}

impl BulkOutcome {
    pub fn reloads(&self) -> Reloads {
        match self {
            BulkOutcome::Users { .. } => Reloads::USERS,
            BulkOutcome::Emails { .. } => Reloads::EMAILS,
        }
    }

    pub fn success_text(&self) -> String {
        match self {
            BulkOutcome::Users { generated } => format!("{generated} random users generated"),
            BulkOutcome::Emails { generated, scope, .. } => format!("{generated} emails generated for {scope}"),
        }
    }
}

/// The visible progress surface of the running bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    #[serde(skip)]
    pub op: Uuid,
    pub title: &'static str,
    pub percent: u8,
    pub label: &'static str,
    #[serde(skip)]
    pub failure_prefix: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Dashboard counters; `None` until the first successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub users: Option<usize>,
    pub emails: Option<usize>,
    pub providers: Option<usize>,
}

impl Summary {
    pub fn users_growth(&self) -> Option<String> {
        self.users.map(|n| format!("+{n}"))
    }

    pub fn emails_growth(&self) -> Option<String> {
        self.emails.map(|n| format!("+{n}"))
    }

    pub fn providers_label(&self) -> Option<String> {
        self.providers.map(|n| if n == 1 { "1 type".to_string() } else { format!("{n} types") })
    }
}
