//! Shared fixtures for unit tests: an HTTP client pointed at a wiremock server, reservation JSON
//! in the backend's wire format, and recording fakes for the presentation traits.

use crate::api::client::HttpApiClient;
use crate::api::models::stats::DashboardStats;
use crate::config::Config;
use crate::controller::ReservationLifecycleController;
use crate::ui::{ConfirmationPrompt, ConfirmationRequest, NotificationLog, ReservationRow, TableView};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;
use wiremock::MockServer;

pub fn test_client(server: &MockServer) -> HttpApiClient {
    HttpApiClient::new(server.uri().parse().unwrap(), Duration::from_secs(5)).unwrap()
}

pub fn test_config(api_url: &str) -> Config {
    Config {
        api_url: api_url.parse().unwrap(),
        request_timeout: Duration::from_secs(5),
        session_file: None,
        notification_ttl: Duration::from_secs(5),
        log_level: "debug".to_string(),
        enable_otel_export: false,
    }
}

pub fn reservation_json(id: Uuid, server_name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "serverName": server_name,
        "status": status,
        "unitCode": "A1",
        "type": "web",
        "provider": "aws",
        "region": "us-east",
        "environment": "prod",
        "function": "api",
        "createdAt": "2024-03-01T12:00:00Z",
        "updatedAt": "2024-03-01T12:00:00Z"
    })
}

pub fn stats_json(total: u64, committed: u64) -> Value {
    json!({
        "totalReservations": total,
        "committedCount": committed,
        "reservedCount": total - committed,
        "recentReservations": [],
        "dailyActivity": [],
        "topEnvironments": []
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
    Opened(ConfirmationRequest),
    FlaggedInvalid,
    Closed,
}

#[derive(Debug, Default)]
pub struct RecordingPrompt {
    events: Mutex<Vec<PromptEvent>>,
}

impl RecordingPrompt {
    pub fn events(&self) -> Vec<PromptEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_opened(&self) -> Option<ConfirmationRequest> {
        self.events().into_iter().rev().find_map(|e| match e {
            PromptEvent::Opened(request) => Some(request),
            _ => None,
        })
    }
}

impl ConfirmationPrompt for RecordingPrompt {
    fn open(&self, request: &ConfirmationRequest) {
        self.events.lock().unwrap().push(PromptEvent::Opened(request.clone()));
    }

    fn flag_invalid(&self) {
        self.events.lock().unwrap().push(PromptEvent::FlaggedInvalid);
    }

    fn close(&self) {
        self.events.lock().unwrap().push(PromptEvent::Closed);
    }
}

#[derive(Debug, Default)]
pub struct RecordingView {
    reservations: Mutex<Vec<Vec<ReservationRow>>>,
    stats: Mutex<Vec<DashboardStats>>,
}

impl RecordingView {
    pub fn last_rows(&self) -> Option<Vec<ReservationRow>> {
        self.reservations.lock().unwrap().last().cloned()
    }

    pub fn reservation_renders(&self) -> usize {
        self.reservations.lock().unwrap().len()
    }

    pub fn stats_renders(&self) -> usize {
        self.stats.lock().unwrap().len()
    }
}

impl TableView for RecordingView {
    fn render_reservations(&self, rows: &[ReservationRow]) {
        self.reservations.lock().unwrap().push(rows.to_vec());
    }

    fn render_stats(&self, stats: &DashboardStats) {
        self.stats.lock().unwrap().push(stats.clone());
    }
}

/// A controller wired to a wiremock server, with handles on every fake it talks to.
pub struct TestHarness {
    pub controller: ReservationLifecycleController,
    pub prompt: Arc<RecordingPrompt>,
    pub notifications: Arc<NotificationLog>,
    pub view: Arc<RecordingView>,
}

pub fn test_controller(server: &MockServer) -> TestHarness {
    let client = test_client(server);
    let prompt = Arc::new(RecordingPrompt::default());
    let notifications = Arc::new(NotificationLog::default());
    let view = Arc::new(RecordingView::default());

    let controller = ReservationLifecycleController::new(Arc::new(client), prompt.clone(), notifications.clone(), view.clone());

    TestHarness {
        controller,
        prompt,
        notifications,
        view,
    }
}
