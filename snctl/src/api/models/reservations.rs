//! API request/response models for reservations.

use crate::errors::Error;
use crate::types::ReservationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Reserved,
    Committed,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Reserved => write!(f, "Reserved"),
            ReservationStatus::Committed => write!(f, "Committed"),
        }
    }
}

impl FromStr for ReservationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reserved" => Ok(ReservationStatus::Reserved),
            "committed" => Ok(ReservationStatus::Committed),
            other => Err(Error::validation(format!(
                "Unknown status '{other}', expected 'reserved' or 'committed'"
            ))),
        }
    }
}

/// A claimed server name, as listed by `GET /api/reservations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: ReservationId,
    pub server_name: String,
    pub status: ReservationStatus,
    pub unit_code: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub provider: String,
    pub region: String,
    pub environment: String,
    pub function: String,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_committed(&self) -> bool {
        self.status == ReservationStatus::Committed
    }

    /// Text the free-text search runs against.
    pub fn searchable_text(&self) -> String {
        format!(
            "{} {} {} {} {} {} {}",
            self.server_name, self.unit_code, self.kind, self.provider, self.region, self.environment, self.function
        )
        .to_lowercase()
    }
}

/// Attributes sent to `POST /api/reserve`; the backend derives the server name from them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationCreate {
    pub unit_code: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub provider: String,
    pub region: String,
    pub environment: String,
    pub function: String,
}

impl ReservationCreate {
    /// Every attribute must be a non-empty string. Reports the first one that is not.
    pub fn validate(&self) -> Result<(), Error> {
        let fields = [
            ("unitCode", &self.unit_code),
            ("type", &self.kind),
            ("provider", &self.provider),
            ("region", &self.region),
            ("environment", &self.environment),
            ("function", &self.function),
        ];

        match fields.iter().find(|(_, value)| value.is_empty()) {
            Some((name, _)) => Err(Error::validation(format!("{name} is required"))),
            None => Ok(()),
        }
    }
}

/// Response of `POST /api/reserve`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReservedName {
    pub server_name: String,
    pub reservation_id: ReservationId,
}

/// Body of `POST /api/commit` and `POST /api/release`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationReference {
    pub reservation_id: ReservationId,
}
