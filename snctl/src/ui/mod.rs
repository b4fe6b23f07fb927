//! Presentation seams used by the controllers.
//!
//! The library never writes to a terminal directly. Everything visible goes through one of three
//! traits:
//!
//! - [`NotificationSink`]: transient messages with a severity and a lifetime
//! - [`ConfirmationPrompt`]: a yes/no modal, optionally gated on retyping a name
//! - [`TableView`]: reservation rows with their action affordances, and dashboard statistics
//!
//! [`terminal`] has the implementations the `snctl` binary uses. [`NotificationLog`] is an
//! in-memory sink that keeps every notification and can answer which ones are still showing.

pub mod terminal;

use crate::api::models::reservations::Reservation;
use crate::api::models::stats::DashboardStats;
use crate::controller::dispatch::ActionKind;
use crate::errors::Error;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// How long a notification stays visible unless configured otherwise.
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub ttl: Duration,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            ttl: DEFAULT_NOTIFICATION_TTL,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Danger, message)
    }

    pub fn from_error(error: &Error) -> Self {
        Self::new(error.level(), error.user_message())
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards to another sink with every notification's lifetime set to `ttl`.
pub struct TimedSink {
    inner: Arc<dyn NotificationSink>,
    ttl: Duration,
}

impl TimedSink {
    pub fn new(inner: Arc<dyn NotificationSink>, ttl: Duration) -> Self {
        Self { inner, ttl }
    }
}

impl NotificationSink for TimedSink {
    fn notify(&self, notification: Notification) {
        self.inner.notify(notification.with_ttl(self.ttl));
    }
}

/// Keeps every notification it receives, stamped with its arrival time.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<(Instant, Notification)>>,
}

impl NotificationLog {
    /// Notifications whose lifetime has not run out at `now`.
    pub fn active_at(&self, now: Instant) -> Vec<Notification> {
        self.lock()
            .iter()
            .filter(|(shown_at, n)| now.saturating_duration_since(*shown_at) < n.ttl)
            .map(|(_, n)| n.clone())
            .collect()
    }

    pub fn active(&self) -> Vec<Notification> {
        self.active_at(Instant::now())
    }

    /// Every message received so far, oldest first, expired or not.
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|(_, n)| n.message.clone()).collect()
    }

    pub fn last(&self) -> Option<Notification> {
        self.lock().last().map(|(_, n)| n.clone())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Instant, Notification)>> {
        // A panic while holding the lock cannot leave the vector half-written
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NotificationSink for NotificationLog {
    fn notify(&self, notification: Notification) {
        self.lock().push((Instant::now(), notification));
    }
}

/// What the prompt should ask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub message: String,
    pub confirm_label: String,
    /// When set, the user has to type exactly this to be allowed through.
    pub required_name: Option<String>,
}

impl ConfirmationRequest {
    pub fn new(message: impl Into<String>, confirm_label: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            confirm_label: confirm_label.into(),
            required_name: None,
        }
    }

    pub fn requiring_name(mut self, name: impl Into<String>) -> Self {
        self.required_name = Some(name.into());
        self
    }
}

/// The modal side of a confirmation. Answers come back to the controller through its own
/// `confirm`/`cancel` calls, so nothing here blocks.
pub trait ConfirmationPrompt: Send + Sync {
    fn open(&self, request: &ConfirmationRequest);
    /// The typed name did not match; the prompt stays open.
    fn flag_invalid(&self);
    fn close(&self);
}

/// A reservation as displayed, with the actions its status allows.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationRow {
    pub reservation: Reservation,
    pub actions: Vec<ActionKind>,
}

impl ReservationRow {
    pub fn new(reservation: Reservation) -> Self {
        let actions = ActionKind::available_for(reservation.status).to_vec();
        Self { reservation, actions }
    }
}

pub trait TableView: Send + Sync {
    fn render_reservations(&self, rows: &[ReservationRow]);
    fn render_stats(&self, stats: &DashboardStats);
}
