use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response of `GET /api/health`. Only `status` is interpreted; everything else is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.to_ascii_lowercase().as_str(), "ok" | "up" | "healthy")
    }
}
