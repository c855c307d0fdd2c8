//! CRM backend API façade.
//!
//! This crate defines the async trait front ends depend on, the request and
//! response shapes of the REST backend, and two implementations: [`HttpApi`]
//! talking to the real backend and [`MockApi`] for tests.

#![forbid(unsafe_code)]

use std::fmt;

use crm_core::{Email, NewUser, Provider, User, UserId, ValidationError};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

mod http;
mod mock;

pub use http::{classify, timeout_from_env, HttpApi, DEFAULT_BASE_URL};
pub use mock::{MockApi, MockCall};

/// Backend operations, used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListUsers,
    CreateUser,
    DeleteUser,
    DeleteAllUsers,
    GenerateUsers,
    ListEmails,
    DeleteAllEmails,
    GenerateEmails,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::ListUsers => "list_users",
            Op::CreateUser => "create_user",
            Op::DeleteUser => "delete_user",
            Op::DeleteAllUsers => "delete_all_users",
            Op::GenerateUsers => "generate_users",
            Op::ListEmails => "list_emails",
            Op::DeleteAllEmails => "delete_all_emails",
            Op::GenerateEmails => "generate_emails",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which provider types an email generation request covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EmailScope {
    /// Omit the type list: the backend generates every provider type.
    #[default]
    All,
    Selected(SmallVec<[Provider; 8]>),
}

impl EmailScope {
    /// Scope for an explicit selection; an empty selection is rejected.
    pub fn selected<I: IntoIterator<Item = Provider>>(types: I) -> Result<Self, ValidationError> {
        let mut picked: SmallVec<[Provider; 8]> = SmallVec::new();
        for p in types {
            if !picked.contains(&p) {
                picked.push(p);
            }
        }
        if picked.is_empty() {
            return Err(ValidationError::NoProviderSelected);
        }
        Ok(EmailScope::Selected(picked))
    }

    pub fn providers(&self) -> Vec<Provider> {
        match self {
            EmailScope::All => Provider::KNOWN.to_vec(),
            EmailScope::Selected(v) => v.to_vec(),
        }
    }

    /// Human description used in the completion notice.
    pub fn label(&self) -> String {
        match self {
            EmailScope::All => "all types".to_string(),
            EmailScope::Selected(v) if v.len() == 1 => "1 selected type".to_string(),
            EmailScope::Selected(v) => format!("{} selected types", v.len()),
        }
    }

    pub fn request_body(&self) -> GenerateEmailsRequest {
        match self {
            EmailScope::All => GenerateEmailsRequest { types: None },
            EmailScope::Selected(v) => GenerateEmailsRequest { types: Some(v.to_vec()) },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateEmailsRequest {
    #[serde(rename = "tipos", skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<Provider>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateUsersRequest {
    #[serde(rename = "cantidad")]
    pub count: u32,
}

/// Plain confirmation body (`{"mensaje": ...}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(rename = "mensaje", default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedUser {
    pub id: UserId,
    #[serde(rename = "mensaje", default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedUsers {
    #[serde(rename = "usuarios", default)]
    pub users: Vec<User>,
    #[serde(rename = "mensaje", default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedEmail {
    #[serde(rename = "usuario_id")]
    pub user_id: UserId,
    #[serde(rename = "tipo")]
    pub provider: Provider,
    #[serde(rename = "correo")]
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedEmails {
    #[serde(rename = "correos", default)]
    pub emails: Vec<GeneratedEmail>,
    #[serde(rename = "tiempo", default)]
    pub elapsed_secs: Option<f64>,
    #[serde(rename = "mensaje", default)]
    pub message: Option<String>,
}

/// Failure taxonomy of one backend call. All of them are recoverable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The request could not complete (connect, timeout, body read).
    #[error("network: {0}")]
    Network(String),
    /// Non-2xx status; `message` is the server's `error` text when it sent one.
    #[error("http {status}: {message}")]
    Status { status: u16, message: String },
    /// 2xx response carrying an `error` field.
    #[error("{0}")]
    Application(String),
    /// Rejected client side; no request was issued.
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),
    #[error("decode: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text shown to the operator.
    pub fn message(&self) -> String {
        match self {
            ApiError::Network(detail) => format!("network error ({detail})"),
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Application(m) => m.clone(),
            ApiError::Validation(v) => v.to_string(),
            ApiError::Decode(_) => "unexpected response from server".to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "network",
            ApiError::Status { .. } => "status",
            ApiError::Application(_) => "application",
            ApiError::Validation(_) => "validation",
            ApiError::Decode(_) => "decode",
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Backend surface consumed by the console.
#[async_trait::async_trait]
pub trait CrmApi: Send + Sync {
    async fn list_users(&self) -> ApiResult<Vec<User>>;

    async fn create_user(&self, user: NewUser) -> ApiResult<CreatedUser>;

    async fn delete_user(&self, id: UserId) -> ApiResult<Ack>;

    async fn delete_all_users(&self) -> ApiResult<Ack>;

    /// Ask the backend to create `count` random users in one request.
    async fn generate_users(&self, count: u32) -> ApiResult<GeneratedUsers>;

    async fn list_emails(&self) -> ApiResult<Vec<Email>>;

    async fn delete_all_emails(&self) -> ApiResult<Ack>;

    /// Generate addresses for every user, for the provider types in `scope`.
    async fn generate_emails(&self, scope: EmailScope) -> ApiResult<GeneratedEmails>;
}
