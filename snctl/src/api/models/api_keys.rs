//! API request/response models for API keys.

use crate::errors::Error;
use crate::types::{ApiKeyId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an API key may be used for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Read,
    Reserve,
    Commit,
    Release,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Read => "read",
            Scope::Reserve => "reserve",
            Scope::Commit => "commit",
            Scope::Release => "release",
        };
        f.write_str(name)
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(Scope::Read),
            "reserve" => Ok(Scope::Reserve),
            "commit" => Ok(Scope::Commit),
            "release" => Ok(Scope::Release),
            other => Err(Error::validation(format!("Unknown scope '{other}'"))),
        }
    }
}

// API Key request models.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyCreate {
    pub name: String,
    pub description: String,
    /// Lifetime in days; absent means the key never expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u32>,
    pub scopes: Vec<Scope>,
}

// API Key response models
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub name: String,
    /// Plaintext key, only present in the response that created it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub user_id: UserId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scopes: Vec<Scope>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}
