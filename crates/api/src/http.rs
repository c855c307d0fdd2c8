#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use crm_core::{Email, NewUser, User, UserId};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    Ack, ApiError, ApiResult, CreatedUser, CrmApi, EmailScope, GenerateUsersRequest, GeneratedEmails,
    GeneratedUsers, Op,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Client for the CRM REST backend.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base: Url,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let mut base = Url::parse(base_url).map_err(|e| ApiError::Network(format!("invalid base url {base_url}: {e}")))?;
        // Relative joins below must keep any path prefix of the base.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("crmctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url { &self.base }

    fn url(&self, path: &str) -> ApiResult<Url> {
        self.base.join(path).map_err(|e| ApiError::Network(format!("invalid path {path}: {e}")))
    }

    async fn call<T, B>(&self, op: Op, method: Method, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let t0 = Instant::now();
        debug!(op = %op, method = %method, url = %url, "api: request");
        let mut req = self.client.request(method, url);
        if let Some(b) = body {
            req = req.json(b);
        }
        let res = match req.send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                match resp.bytes().await {
                    Ok(bytes) => classify(status, &bytes),
                    Err(e) => Err(ApiError::Network(e.to_string())),
                }
            }
            Err(e) => Err(ApiError::Network(e.to_string())),
        };
        let took_ms = t0.elapsed().as_millis();
        metrics::histogram!("crm_api_request_ms", t0.elapsed().as_secs_f64() * 1_000.0, "op" => op.as_str());
        match &res {
            Ok(_) => {
                metrics::counter!("crm_api_requests_total", 1, "op" => op.as_str(), "outcome" => "ok");
                info!(op = %op, took_ms = %took_ms, "api: ok");
            }
            Err(e) => {
                metrics::counter!("crm_api_requests_total", 1, "op" => op.as_str(), "outcome" => e.kind());
                warn!(op = %op, took_ms = %took_ms, error = %e, "api: failed");
            }
        }
        res
    }
}

/// Request timeout from `CRM_HTTP_TIMEOUT_SECS`, 30 seconds by default.
pub fn timeout_from_env() -> Duration {
    let secs = std::env::var("CRM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(30);
    Duration::from_secs(secs.max(1))
}

/// Map a raw response to a result.
///
/// Non-2xx is a [`ApiError::Status`] carrying the server's `error` text when
/// present; a 2xx object with a non-empty `error` field is an
/// [`ApiError::Application`] failure; everything else must decode as `T`.
pub fn classify<T: DeserializeOwned>(status: u16, body: &[u8]) -> ApiResult<T> {
    let parsed: Option<serde_json::Value> = serde_json::from_slice(body).ok();
    let server_error = parsed.as_ref().and_then(|v| v.get("error")).and_then(|e| match e {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    });
    if !(200..300).contains(&status) {
        let message = server_error.unwrap_or_else(|| format!("request failed (HTTP {status})"));
        return Err(ApiError::Status { status, message });
    }
    if let Some(message) = server_error {
        return Err(ApiError::Application(message));
    }
    let value = parsed.ok_or_else(|| ApiError::Decode("response body is not JSON".to_string()))?;
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait::async_trait]
impl CrmApi for HttpApi {
    async fn list_users(&self) -> ApiResult<Vec<User>> {
        self.call::<_, ()>(Op::ListUsers, Method::GET, "usuarios", None).await
    }

    async fn create_user(&self, user: NewUser) -> ApiResult<CreatedUser> {
        user.validate()?;
        self.call(Op::CreateUser, Method::POST, "usuarios", Some(&user)).await
    }

    async fn delete_user(&self, id: UserId) -> ApiResult<Ack> {
        self.call::<_, ()>(Op::DeleteUser, Method::DELETE, &format!("usuarios/{id}"), None).await
    }

    async fn delete_all_users(&self) -> ApiResult<Ack> {
        self.call::<_, ()>(Op::DeleteAllUsers, Method::DELETE, "usuarios/todos", None).await
    }

    async fn generate_users(&self, count: u32) -> ApiResult<GeneratedUsers> {
        let body = GenerateUsersRequest { count };
        self.call(Op::GenerateUsers, Method::POST, "usuarios/aleatorios", Some(&body)).await
    }

    async fn list_emails(&self) -> ApiResult<Vec<Email>> {
        self.call::<_, ()>(Op::ListEmails, Method::GET, "correos", None).await
    }

    async fn delete_all_emails(&self) -> ApiResult<Ack> {
        self.call::<_, ()>(Op::DeleteAllEmails, Method::DELETE, "correos/todos", None).await
    }

    async fn generate_emails(&self, scope: EmailScope) -> ApiResult<GeneratedEmails> {
        let body = scope.request_body();
        self.call(Op::GenerateEmails, Method::POST, "generar-correos", Some(&body)).await
    }
}
