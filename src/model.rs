use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Parse failure for one of the closed wire enumerations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Recognized identity roles. The backend accepts the role as a free-form
/// header, so this set only gates what the console itself will send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Operator,
    Approver,
    Admin,
    Viewer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Operator => "operator",
            Role::Approver => "approver",
            Role::Admin => "admin",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "operator" => Ok(Role::Operator),
            "approver" => Ok(Role::Approver),
            "admin" => Ok(Role::Admin),
            "viewer" => Ok(Role::Viewer),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// Active identity attached to every backend call as X-User / X-Role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Stage,
    Prod,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Stage => "stage",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "stage" => Ok(Environment::Stage),
            "prod" => Ok(Environment::Prod),
            other => Err(ParseEnumError::new("environment", other)),
        }
    }
}

/// Risk classification of an intent. Open on the wire: values the backend
/// adds later are carried through verbatim instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Risk {
    Low,
    Medium,
    High,
    Other(String),
}

impl Risk {
    pub fn as_str(&self) -> &str {
        match self {
            Risk::Low => "low",
            Risk::Medium => "medium",
            Risk::High => "high",
            Risk::Other(s) => s,
        }
    }

    fn default_low() -> Risk {
        Risk::Low
    }
}

impl From<String> for Risk {
    fn from(s: String) -> Self {
        match s.as_str() {
            "low" => Risk::Low,
            "medium" => Risk::Medium,
            "high" => Risk::High,
            _ => Risk::Other(s),
        }
    }
}

impl From<Risk> for String {
    fn from(r: Risk) -> Self {
        r.as_str().to_string()
    }
}

/// Run lifecycle status. The status set is backend-owned and open; unknown
/// values are preserved so they can still be listed and rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    PendingApproval,
    Running,
    DryRun,
    Succeeded,
    Rejected,
    Failed,
    Other(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::PendingApproval => "pending_approval",
            RunStatus::Running => "running",
            RunStatus::DryRun => "dry_run",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Rejected => "rejected",
            RunStatus::Failed => "failed",
            RunStatus::Other(s) => s,
        }
    }

    pub fn is_pending_approval(&self) -> bool {
        matches!(self, RunStatus::PendingApproval)
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending_approval" => RunStatus::PendingApproval,
            "running" => RunStatus::Running,
            "dry_run" => RunStatus::DryRun,
            "succeeded" => RunStatus::Succeeded,
            "rejected" => RunStatus::Rejected,
            "failed" => RunStatus::Failed,
            _ => RunStatus::Other(s),
        }
    }
}

impl From<RunStatus> for String {
    fn from(s: RunStatus) -> Self {
        s.as_str().to_string()
    }
}

/// Backend-classified purpose of a natural-language request. Immutable once
/// attached to a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub skill: String,
    pub summary: String,
    #[serde(default = "Risk::default_low")]
    pub risk: Risk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub title: String,
    pub action: String,
    pub tool: String,
    #[serde(default)]
    pub safe: bool,
}

/// Ordered, immutable plan the backend proposes for an intent. Step order is
/// execution order and is preserved end-to-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub intent: Intent,
    pub steps: Vec<PlanStep>,
}

/// One instantiation of a plan moving through the approval/execution
/// lifecycle. Created and mutated by the backend only; the console observes
/// it by re-fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub status: RunStatus,
    pub plan: Plan,
    pub requested_by: String,
    pub role: String,
    pub environment: String,
    pub created_at: String,
    #[serde(default)]
    pub approval_required: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub evidence: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthInfo {
    #[serde(default)]
    pub gemini_configured: bool,
    #[serde(default)]
    pub model: String,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

/// Body of the plan-generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub message: String,
    pub skill_hint: Option<String>,
    pub environment: Environment,
    pub change_id: Option<String>,
    #[serde(default = "empty_object")]
    pub extra: serde_json::Value,
}

/// Response of the plan-generation call: the new run plus the assistant's
/// one-paragraph commentary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub run: Run,
    #[serde(default)]
    pub assistant_message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
    pub comment: Option<String>,
}

/// Synthetic monitoring event posted to the webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalEvent {
    pub site: String,
    pub device: String,
    pub state: String,
    pub circuit: String,
    pub change_id: Option<String>,
}

impl ExternalEvent {
    /// Canned demo payload for the event-driven automation walkthrough.
    pub fn demo() -> Self {
        Self {
            site: "Pune-DC".to_string(),
            device: "core-sw-01".to_string(),
            state: "PRIMARY_DOWN".to_string(),
            circuit: "ISP-A".to_string(),
            change_id: None,
        }
    }
}

/// Ack returned by the webhook endpoint; the run itself is fetched afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAck {
    pub run_id: String,
    #[serde(default)]
    pub approval_required: bool,
}

/// Ack returned by the evidence upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadAck {
    pub run_id: String,
    #[serde(default)]
    pub rows: u64,
    #[serde(default)]
    pub approval_required: bool,
}
