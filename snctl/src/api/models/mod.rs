//! Request/response models for the backend API.

pub mod api_keys;
pub mod auth;
pub mod health;
pub mod reservations;
pub mod stats;
pub mod users;

use serde::{Deserialize, Serialize};

/// Body the backend returns for mutations that carry no payload, and for every error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}
