#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use crm_core::{Email, User, UserId};
use crm_search::{derive_emails, derive_users};
use serde::Serialize;

use crate::model::LoadStatus;
use crate::Console;

pub const NO_RECORDS: &str = "No records match the current filters";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRow {
    pub id: UserId,
    pub name: String,
    pub age: u32,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailRow {
    pub id: i64,
    pub user_id: UserId,
    pub address: String,
    pub provider: String,
    pub badge: String,
    pub owner: String,
    pub created: String,
}

/// What the users panel renders: rows, or a placeholder when nothing matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsersView {
    pub rows: Vec<UserRow>,
    pub total: usize,
    pub status: LoadStatus,
    pub placeholder: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailsView {
    pub rows: Vec<EmailRow>,
    pub total: usize,
    pub status: LoadStatus,
    pub placeholder: Option<&'static str>,
}

fn date_cell(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d").to_string()).unwrap_or_else(|| "-".to_string())
}

fn placeholder(rows: usize, status: &LoadStatus) -> Option<&'static str> {
    // A failed load shows its status message instead.
    (rows == 0 && !matches!(status, LoadStatus::Failed(_))).then_some(NO_RECORDS)
}

impl UserRow {
    fn from_user(u: &User) -> Self {
        Self { id: u.id, name: u.full_name(), age: u.age, created: date_cell(u.created_at.as_ref()) }
    }
}

impl EmailRow {
    fn from_email(e: &Email) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            address: e.address.clone(),
            provider: e.provider.to_string(),
            badge: e.provider.badge_class(),
            owner: e.owner_name(),
            created: date_cell(e.created_at.as_ref()),
        }
    }
}

impl Console {
    /// Current snapshot through the active user filter.
    pub fn users_view(&self) -> UsersView {
        let snap = self.users.current();
        let rows: Vec<UserRow> = derive_users(&snap.items, &self.user_filter).into_iter().map(UserRow::from_user).collect();
        let status = self.users_status.clone();
        UsersView { placeholder: placeholder(rows.len(), &status), total: snap.len(), rows, status }
    }

    pub fn emails_view(&self) -> EmailsView {
        let snap = self.emails.current();
        let rows: Vec<EmailRow> =
            derive_emails(&snap.items, &self.email_filter).into_iter().map(EmailRow::from_email).collect();
        let status = self.emails_status.clone();
        EmailsView { placeholder: placeholder(rows.len(), &status), total: snap.len(), rows, status }
    }
}
