//! Session context: the active identity and backend endpoint.
//!
//! Every gateway call reads the identity at call time, so an identity change
//! takes effect on the next request rather than any in-flight one.

use crate::model::{Identity, ParseEnumError, Role};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::RwLock;

/// Sentinel used when no user name is configured.
pub const DEFAULT_USER: &str = "operator";

/// Persisted console settings: endpoint and identity only. Run records are
/// never written to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_base: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub role: String,
}

impl Settings {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("opspilot").join("settings.json"))
    }

    /// Load saved settings, falling back to defaults on a missing or
    /// unreadable file.
    pub fn load() -> Self {
        Self::path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path().context("no config directory available")?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create {}", dir.display()))?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, raw).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

pub struct SessionContext {
    api_base: String,
    identity: RwLock<Identity>,
}

impl SessionContext {
    pub fn new(api_base: &str, identity: Identity) -> Self {
        Self {
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            identity: RwLock::new(identity),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Current identity, read at call time.
    pub fn identity(&self) -> Identity {
        match self.identity.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the active identity. An empty user falls back to the
    /// `"operator"` sentinel; the role must be one of the recognized set.
    pub fn set_identity(&self, user: &str, role: &str) -> Result<Identity, ParseEnumError> {
        let role = Role::from_str(role)?;
        let user = user.trim();
        let identity = Identity {
            user: if user.is_empty() {
                DEFAULT_USER.to_string()
            } else {
                user.to_string()
            },
            role,
        };
        match self.identity.write() {
            Ok(mut guard) => *guard = identity.clone(),
            Err(poisoned) => *poisoned.into_inner() = identity.clone(),
        }
        Ok(identity)
    }
}

/// Build the starting identity from optional CLI overrides and saved
/// settings, applying the same sentinel/validation rules as
/// [`SessionContext::set_identity`].
pub fn resolve_identity(
    user: Option<&str>,
    role: Option<&str>,
) -> Result<Identity, ParseEnumError> {
    let role = match role {
        Some(r) => Role::from_str(r)?,
        None => Role::Operator,
    };
    let user = user.map(str::trim).unwrap_or("");
    Ok(Identity {
        user: if user.is_empty() {
            DEFAULT_USER.to_string()
        } else {
            user.to_string()
        },
        role,
    })
}
