//! CRM core types: records, provider tags, snapshots and client-side validation.

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub mod time;

pub use time::parse_timestamp;

/// Server-assigned user identifier.
pub type UserId = i64;

/// Upper bound for one random-user generation request.
pub const MAX_BULK_USERS: u32 = 10_000;

/// Which backend collection a snapshot, load or reload refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Users,
    Emails,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Emails => "emails",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "edad")]
    pub age: u32,
    #[serde(rename = "fecha_creacion", default, deserialize_with = "de_opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Given name followed by surname without a separator; the key used for name ordering.
    pub fn name_key(&self) -> String {
        let mut s = String::with_capacity(self.first_name.len() + self.last_name.len());
        s.push_str(&self.first_name);
        s.push_str(&self.last_name);
        s
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub id: i64,
    #[serde(rename = "usuario_id")]
    pub user_id: UserId,
    #[serde(rename = "tipo")]
    pub provider: Provider,
    #[serde(rename = "correo")]
    pub address: String,
    #[serde(rename = "fecha_creacion", default, deserialize_with = "de_opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "nombre", default, deserialize_with = "de_null_string")]
    pub first_name: String,
    #[serde(rename = "apellido", default, deserialize_with = "de_null_string")]
    pub last_name: String,
}

impl Email {
    pub fn owner_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Email provider tag. The backend generates one address per known tag; anything
/// else it reports is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Provider {
    Gmail,
    Outlook,
    Hotmail,
    Yahoo,
    Empresa,
    Custom1,
    Custom2,
    Custom3,
    Other(String),
}

impl Provider {
    pub const KNOWN: [Provider; 8] = [
        Provider::Gmail,
        Provider::Outlook,
        Provider::Hotmail,
        Provider::Yahoo,
        Provider::Empresa,
        Provider::Custom1,
        Provider::Custom2,
        Provider::Custom3,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Provider::Gmail => "gmail",
            Provider::Outlook => "outlook",
            Provider::Hotmail => "hotmail",
            Provider::Yahoo => "yahoo",
            Provider::Empresa => "empresa",
            Provider::Custom1 => "custom1",
            Provider::Custom2 => "custom2",
            Provider::Custom3 => "custom3",
            Provider::Other(s) => s.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Provider::Other(_))
    }

    /// Style class used for the provider badge in email listings.
    pub fn badge_class(&self) -> String {
        if self.is_known() {
            format!("badge-{}", self.as_str())
        } else {
            "badge-other".to_string()
        }
    }
}

impl From<&str> for Provider {
    fn from(s: &str) -> Self {
        match s {
            "gmail" => Provider::Gmail,
            "outlook" => Provider::Outlook,
            "hotmail" => Provider::Hotmail,
            "yahoo" => Provider::Yahoo,
            "empresa" => Provider::Empresa,
            "custom1" => Provider::Custom1,
            "custom2" => Provider::Custom2,
            "custom3" => Provider::Custom3,
            other => Provider::Other(other.to_string()),
        }
    }
}

impl From<String> for Provider {
    fn from(s: String) -> Self {
        match Provider::from(s.as_str()) {
            Provider::Other(_) => Provider::Other(s),
            known => known,
        }
    }
}

impl From<Provider> for String {
    fn from(p: Provider) -> Self {
        match p {
            Provider::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Provider {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Provider::from(s))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload for creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "edad")]
    pub age: u32,
}

impl NewUser {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, age: u32) -> Self {
        Self {
            first_name: first_name.into().trim().to_string(),
            last_name: last_name.into().trim().to_string(),
            age,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() || self.age == 0 {
            return Err(ValidationError::MissingFields);
        }
        Ok(())
    }
}

/// Check a random-user generation count before any request is issued.
pub fn validate_bulk_count(count: u32, max: u32) -> Result<(), ValidationError> {
    if count == 0 {
        return Err(ValidationError::EmptyBulkCount);
    }
    if count > max {
        return Err(ValidationError::BulkCountTooLarge { requested: count, max });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("all fields are required")]
    MissingFields,
    #[error("the maximum allowed is {max} users (requested {requested})")]
    BulkCountTooLarge { requested: u32, max: u32 },
    #[error("the number of users to generate must be positive")]
    EmptyBulkCount,
    #[error("select at least one email type")]
    NoProviderSelected,
}

/// Full in-memory copy of one collection as last fetched; replaced wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub epoch: u64,
    pub items: Vec<T>,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self { epoch: 0, items: Vec::new() }
    }
}

impl<T> Snapshot<T> {
    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}

pub mod prelude {
    pub use super::{Collection, Email, NewUser, Provider, Snapshot, User, UserId, ValidationError};
}

fn de_opt_timestamp<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn de_null_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.unwrap_or_default())
}
