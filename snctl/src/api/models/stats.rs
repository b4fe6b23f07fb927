//! API response models for the dashboard statistics endpoint.

use super::reservations::Reservation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_reservations: u64,
    pub committed_count: u64,
    pub reserved_count: u64,
    pub recent_reservations: Vec<Reservation>,
    pub daily_activity: Vec<DailyActivity>,
    pub top_environments: Vec<EnvironmentCount>,
}

/// Reservations created and committed on one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyActivity {
    pub date: String,
    #[serde(default)]
    pub reserved: u64,
    #[serde(default)]
    pub committed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentCount {
    pub environment: String,
    pub count: u64,
}
