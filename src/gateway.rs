//! Backend gateway: the single chokepoint for all network calls.
//!
//! Normalizes every response into one result contract: JSON bodies are
//! parsed, non-JSON bodies surface as raw text, and any non-2xx status maps
//! to a [`GatewayError`] carrying the backend's `detail` message when it has
//! one. No retries; transport failures surface immediately to the caller.

use crate::model::{
    ChatReply, DecisionRequest, EventAck, ExternalEvent, HealthInfo, PlanRequest, Run, UploadAck,
};
use crate::session::SessionContext;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Non-2xx response. The message prefers the backend's structured
    /// `detail` field, then the raw body, then an HTTP status placeholder.
    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Typed endpoint surface of the runbook backend. The workflow controller
/// only talks to this trait; tests implement it in memory.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn health(&self) -> Result<HealthInfo, GatewayError>;
    async fn list_runs(&self) -> Result<Vec<Run>, GatewayError>;
    async fn fetch_run(&self, run_id: &str) -> Result<Run, GatewayError>;
    async fn generate_plan(&self, req: &PlanRequest) -> Result<ChatReply, GatewayError>;
    async fn decide(&self, run_id: &str, req: &DecisionRequest) -> Result<Run, GatewayError>;
    async fn upload_evidence(&self, filename: &str, bytes: Vec<u8>)
        -> Result<UploadAck, GatewayError>;
    async fn post_event(&self, event: &ExternalEvent) -> Result<EventAck, GatewayError>;
}

pub struct HttpGateway {
    client: Client,
    session: Arc<SessionContext>,
}

impl HttpGateway {
    pub fn new(session: Arc<SessionContext>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, session })
    }

    /// Issue a JSON call. Identity headers are read from the session at call
    /// time. Bodiless GETs carry no content-type header; some backends
    /// reject an empty JSON body.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, GatewayError> {
        let identity = self.session.identity();
        let mut req = self
            .client
            .request(method, self.session.url(path))
            .header("X-User", identity.user.as_str())
            .header("X-Role", identity.role.as_str());
        if let Some(body) = body {
            req = req.header(CONTENT_TYPE, "application/json").json(body);
        }
        let res = req.send().await?;
        read_response(res).await
    }

    /// Multipart upload with exactly one `file` field. Same identity headers
    /// and error mapping as [`call`], but the multipart boundary supplies its
    /// own content type.
    pub async fn upload(
        &self,
        path: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Value, GatewayError> {
        let identity = self.session.identity();
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let res = self
            .client
            .post(self.session.url(path))
            .header("X-User", identity.user.as_str())
            .header("X-Role", identity.role.as_str())
            .multipart(form)
            .send()
            .await?;
        read_response(res).await
    }
}

async fn read_response(res: reqwest::Response) -> Result<Value, GatewayError> {
    let status = res.status();
    let is_json = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);
    let text = res.text().await?;
    let body = if is_json {
        // A backend claiming JSON but sending garbage still surfaces as text.
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    } else {
        Value::String(text)
    };
    if !status.is_success() {
        return Err(GatewayError::Backend {
            status: status.as_u16(),
            message: error_message(status.as_u16(), &body),
        });
    }
    Ok(body)
}

/// Error text for a non-2xx response: structured `detail` field, else the
/// raw body, else an HTTP status placeholder.
fn error_message(status: u16, body: &Value) -> String {
    match body.get("detail") {
        Some(Value::String(s)) if !s.is_empty() => return s.clone(),
        Some(other) if !other.is_null() => return other.to_string(),
        _ => {}
    }
    match body {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Null => format!("HTTP {status}"),
        other => {
            let raw = other.to_string();
            if raw == "null" || raw == "{}" || raw == "[]" {
                format!("HTTP {status}")
            } else {
                raw
            }
        }
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, GatewayError> {
    Ok(serde_json::from_value(body)?)
}

#[async_trait]
impl Backend for HttpGateway {
    async fn health(&self) -> Result<HealthInfo, GatewayError> {
        decode(self.call(Method::GET, "/api/health", None).await?)
    }

    async fn list_runs(&self) -> Result<Vec<Run>, GatewayError> {
        decode(self.call(Method::GET, "/api/runs", None).await?)
    }

    async fn fetch_run(&self, run_id: &str) -> Result<Run, GatewayError> {
        let path = format!("/api/runs/{run_id}");
        decode(self.call(Method::GET, &path, None).await?)
    }

    async fn generate_plan(&self, req: &PlanRequest) -> Result<ChatReply, GatewayError> {
        let body = serde_json::to_value(req)?;
        decode(self.call(Method::POST, "/api/chat", Some(&body)).await?)
    }

    async fn decide(&self, run_id: &str, req: &DecisionRequest) -> Result<Run, GatewayError> {
        let path = format!("/api/runs/{run_id}/approve");
        let body = serde_json::to_value(req)?;
        decode(self.call(Method::POST, &path, Some(&body)).await?)
    }

    async fn upload_evidence(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadAck, GatewayError> {
        decode(self.upload("/api/vuln/upload", filename, bytes).await?)
    }

    async fn post_event(&self, event: &ExternalEvent) -> Result<EventAck, GatewayError> {
        let body = serde_json::to_value(event)?;
        decode(
            self.call(Method::POST, "/api/solarwinds/webhook", Some(&body))
                .await?,
        )
    }
}
