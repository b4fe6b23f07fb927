//! Reservation lifecycle controller.
//!
//! Owns the cached reservation list and dashboard statistics, and is the only thing that issues
//! reservation mutations against the backend. Reservations move between two states:
//!
//! ```text
//!   reserve ──► Reserved ──commit──► Committed
//!                  ▲                    │
//!                  └──────release───────┘
//! ```
//!
//! Delete is allowed from either state. Release and delete are destructive, so they go through
//! a [`ConfirmationGate`](confirmation::ConfirmationGate): the trigger (`request_release`,
//! `request_delete`) opens a prompt and the answer arrives later through [`confirm`] or
//! [`cancel`]. Deleting a committed reservation additionally requires the exact server name to
//! be typed back.
//!
//! A successful mutation is applied to the cached entry straight away (commit and release flip
//! its status, delete drops it), then the cache is replaced from `GET /api/reservations` together
//! with a single stats reload. If that reload fails the locally applied change stands. Every failure is pushed to the
//! [`NotificationSink`] before being returned, so callers that only care about the happy path can
//! ignore the error value.
//!
//! [`confirm`]: ReservationLifecycleController::confirm
//! [`cancel`]: ReservationLifecycleController::cancel

pub mod confirmation;
pub mod dispatch;
pub mod filters;

use crate::api::client::ApiClient;
use crate::api::models::reservations::{Reservation, ReservationCreate, ReservationStatus, ReservedName};
use crate::api::models::stats::DashboardStats;
use crate::errors::{Error, Result};
use crate::types::{ReservationId, abbrev_uuid};
use crate::ui::{
    ConfirmationPrompt, ConfirmationRequest, DEFAULT_NOTIFICATION_TTL, Notification, NotificationSink, ReservationRow, TableView,
};
use confirmation::{ConfirmationGate, GateDecision, PendingConfirmation};
use dashmap::DashSet;
use dispatch::{ActionKind, Command};
use filters::{FilterOptions, ReservationFilter};
use scopeguard::ScopeGuard;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Result of resolving a pending confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The action was sent and the backend accepted it
    Completed,
    /// The typed name did not match; the prompt is still open
    NameMismatch,
}

#[derive(Default)]
struct ControllerState {
    reservations: Vec<Reservation>,
    /// Whether the list has been fetched at least once since construction or reset
    loaded: bool,
    stats: Option<DashboardStats>,
    filter: ReservationFilter,
    gate: ConfirmationGate<Command>,
}

impl ControllerState {
    fn find(&self, id: ReservationId) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    fn set_status(&mut self, id: ReservationId, status: ReservationStatus) {
        if let Some(reservation) = self.reservations.iter_mut().find(|r| r.id == id) {
            reservation.status = status;
        }
    }

    fn remove(&mut self, id: ReservationId) {
        self.reservations.retain(|r| r.id != id);
    }

    fn visible_rows(&self) -> Vec<ReservationRow> {
        self.filter.apply(&self.reservations).into_iter().cloned().map(ReservationRow::new).collect()
    }
}

pub struct ReservationLifecycleController {
    api: Arc<dyn ApiClient>,
    prompt: Arc<dyn ConfirmationPrompt>,
    notifier: Arc<dyn NotificationSink>,
    view: Arc<dyn TableView>,
    state: RwLock<ControllerState>,
    in_flight: DashSet<ReservationId>,
    notification_ttl: Duration,
}

impl ReservationLifecycleController {
    pub fn new(
        api: Arc<dyn ApiClient>,
        prompt: Arc<dyn ConfirmationPrompt>,
        notifier: Arc<dyn NotificationSink>,
        view: Arc<dyn TableView>,
    ) -> Self {
        Self {
            api,
            prompt,
            notifier,
            view,
            state: RwLock::new(ControllerState::default()),
            in_flight: DashSet::new(),
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
        }
    }

    pub fn with_notification_ttl(mut self, ttl: Duration) -> Self {
        self.notification_ttl = ttl;
        self
    }

    fn notify(&self, notification: Notification) {
        self.notifier.notify(notification.with_ttl(self.notification_ttl));
    }

    /// Push an error to the notification sink and hand it back.
    fn surface(&self, error: Error) -> Error {
        warn!("{}", error);
        self.notify(Notification::from_error(&error));
        error
    }

    /// Mark `id` as having a mutation in flight until the returned guard is dropped.
    fn begin(&self, id: ReservationId) -> Result<ScopeGuard<ReservationId, impl FnOnce(ReservationId) + '_>> {
        if !self.in_flight.insert(id) {
            return Err(Error::RequestInFlight { id: id.to_string() });
        }
        Ok(scopeguard::guard(id, move |id| {
            self.in_flight.remove(&id);
        }))
    }

    pub fn is_in_flight(&self, id: ReservationId) -> bool {
        self.in_flight.contains(&id)
    }

    // ----- cache -----

    /// Reload the reservation list and the stats. Both are attempted even if the first fails.
    pub async fn refresh(&self) -> Result<()> {
        let reservations = self.load_reservations().await;
        let stats = self.load_stats().await;
        reservations.and(stats)
    }

    pub async fn load_reservations(&self) -> Result<()> {
        let reservations = self.api.list_reservations().await.map_err(|e| self.surface(e))?;

        let rows = {
            let mut state = self.state.write().await;
            state.reservations = reservations;
            state.loaded = true;
            state.visible_rows()
        };
        self.view.render_reservations(&rows);
        Ok(())
    }

    pub async fn load_stats(&self) -> Result<()> {
        let stats = self.api.stats().await.map_err(|e| self.surface(e))?;
        self.state.write().await.stats = Some(stats.clone());
        self.view.render_stats(&stats);
        Ok(())
    }

    /// After a mutation the list and stats are reloaded once each. Reload failures have already
    /// been notified and do not undo the mutation; the locally updated cache is rendered instead.
    async fn refresh_after_mutation(&self) {
        if self.load_reservations().await.is_err() {
            let rows = {
                let state = self.state.read().await;
                state.loaded.then(|| state.visible_rows())
            };
            if let Some(rows) = rows {
                self.view.render_reservations(&rows);
            }
        }
        let _ = self.load_stats().await;
    }

    pub async fn reservations(&self) -> Vec<Reservation> {
        self.state.read().await.reservations.clone()
    }

    pub async fn reservation(&self, id: ReservationId) -> Option<Reservation> {
        self.state.read().await.find(id).cloned()
    }

    /// Cached reservations that pass the current filter, in server order.
    pub async fn filtered(&self) -> Vec<Reservation> {
        let state = self.state.read().await;
        state.filter.apply(&state.reservations).into_iter().cloned().collect()
    }

    pub async fn rows(&self) -> Vec<ReservationRow> {
        self.state.read().await.visible_rows()
    }

    pub async fn stats(&self) -> Option<DashboardStats> {
        self.state.read().await.stats.clone()
    }

    pub async fn filter_options(&self) -> FilterOptions {
        FilterOptions::from_reservations(&self.state.read().await.reservations)
    }

    pub async fn filter(&self) -> ReservationFilter {
        self.state.read().await.filter.clone()
    }

    /// Replace the active filter and re-render, if there is anything loaded to render.
    pub async fn set_filter(&self, filter: ReservationFilter) {
        let rows = {
            let mut state = self.state.write().await;
            state.filter = filter;
            state.loaded.then(|| state.visible_rows())
        };
        if let Some(rows) = rows {
            self.view.render_reservations(&rows);
        }
    }

    // ----- mutations -----

    /// Reserve a new server name. All six attributes are required and checked before anything is
    /// sent.
    #[instrument(skip(self, attributes))]
    pub async fn reserve(&self, attributes: &ReservationCreate) -> Result<ReservedName> {
        attributes.validate().map_err(|e| self.surface(e))?;

        let reserved = self.api.reserve(attributes).await.map_err(|e| self.surface(e))?;

        info!(server_name = %reserved.server_name, reservation_id = %abbrev_uuid(&reserved.reservation_id), "Name reserved");
        self.notify(Notification::success(format!("Name reserved successfully: {}", reserved.server_name)));
        self.refresh_after_mutation().await;
        Ok(reserved)
    }

    /// Commit a reservation. Not gated. A reservation the cache already shows as committed is
    /// refused locally; ids the cache does not know are left for the backend to judge.
    #[instrument(skip(self), fields(reservation_id = %abbrev_uuid(&id)))]
    pub async fn commit(&self, id: ReservationId) -> Result<()> {
        if self.reservation(id).await.is_some_and(|r| r.is_committed()) {
            return Err(self.surface(Error::AlreadyCommitted));
        }

        let _guard = self.begin(id).map_err(|e| self.surface(e))?;
        self.api.commit(id).await.map_err(|e| self.surface(e))?;
        self.state.write().await.set_status(id, ReservationStatus::Committed);

        info!("Reservation committed");
        self.notify(Notification::success("Reservation committed successfully"));
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Ask for confirmation to release a reservation back to reserved.
    pub async fn release(&self, id: ReservationId) -> Result<()> {
        self.request_release(id).await
    }

    /// Ask for confirmation to delete a reservation.
    pub async fn delete(&self, id: ReservationId) -> Result<()> {
        self.request_delete(id).await
    }

    pub async fn request_release(&self, id: ReservationId) -> Result<()> {
        let reservation = self.target(id).await?;
        let message = format!(
            "Are you sure you want to release \"{}\" from committed status? This will change its status back to reserved.",
            reservation.server_name
        );
        self.open_gate(Command { action: ActionKind::Release, reservation_id: id }, ConfirmationRequest::new(message, "Release"))
            .await;
        Ok(())
    }

    pub async fn request_delete(&self, id: ReservationId) -> Result<()> {
        let reservation = self.target(id).await?;
        let request = if reservation.is_committed() {
            ConfirmationRequest::new(
                format!(
                    "WARNING: \"{}\" is COMMITTED. Deleting this reservation could cause conflicts if the server name is already in use.",
                    reservation.server_name
                ),
                "Delete",
            )
            .requiring_name(reservation.server_name.clone())
        } else {
            ConfirmationRequest::new(
                format!("Are you sure you want to delete the reservation for \"{}\"?", reservation.server_name),
                "Delete",
            )
        };
        self.open_gate(Command { action: ActionKind::Delete, reservation_id: id }, request).await;
        Ok(())
    }

    /// The cached reservation a trigger acts on. Unknown ids and ids with a mutation in flight are
    /// refused without touching the gate.
    async fn target(&self, id: ReservationId) -> Result<Reservation> {
        let Some(reservation) = self.reservation(id).await else {
            return Err(self.surface(Error::NotFound {
                resource: "Reservation".to_string(),
                id: id.to_string(),
            }));
        };
        if self.is_in_flight(id) {
            return Err(self.surface(Error::RequestInFlight { id: id.to_string() }));
        }
        Ok(reservation)
    }

    async fn open_gate(&self, action: Command, request: ConfirmationRequest) {
        self.state.write().await.gate.request(PendingConfirmation {
            action,
            message: request.message.clone(),
            required_name: request.required_name.clone(),
        });
        self.prompt.open(&request);
    }

    /// Resolve the pending confirmation with what the user typed (`None` for a plain yes).
    ///
    /// On a name mismatch the prompt stays open and is flagged. Otherwise the prompt is closed
    /// before the request goes out.
    pub async fn confirm(&self, input: Option<&str>) -> Result<ConfirmOutcome> {
        let decision = self.state.write().await.gate.submit(input).map_err(|e| self.surface(e))?;

        let pending = match decision {
            GateDecision::NameMismatch => {
                self.prompt.flag_invalid();
                return Ok(ConfirmOutcome::NameMismatch);
            }
            GateDecision::Proceed(pending) => pending,
        };
        self.prompt.close();

        let Command { action, reservation_id } = pending.action;
        match action {
            ActionKind::Release => self.perform_release(reservation_id).await?,
            ActionKind::Delete => self.perform_delete(reservation_id).await?,
            ActionKind::Commit => self.commit(reservation_id).await?,
        }
        Ok(ConfirmOutcome::Completed)
    }

    pub async fn cancel(&self) -> Result<()> {
        let pending = self.state.write().await.gate.cancel().map_err(|e| self.surface(e))?;
        tracing::debug!(action = %pending.action.action, "Confirmation cancelled");
        self.prompt.close();
        Ok(())
    }

    pub async fn pending_confirmation(&self) -> Option<PendingConfirmation<Command>> {
        self.state.read().await.gate.pending().cloned()
    }

    pub async fn is_confirmation_flagged_invalid(&self) -> bool {
        self.state.read().await.gate.is_flagged_invalid()
    }

    #[instrument(skip(self), fields(reservation_id = %abbrev_uuid(&id)))]
    async fn perform_release(&self, id: ReservationId) -> Result<()> {
        let _guard = self.begin(id).map_err(|e| self.surface(e))?;
        self.api.release(id).await.map_err(|e| self.surface(e))?;
        self.state.write().await.set_status(id, ReservationStatus::Reserved);

        info!("Reservation released");
        self.notify(Notification::success("Reservation released successfully"));
        self.refresh_after_mutation().await;
        Ok(())
    }

    #[instrument(skip(self), fields(reservation_id = %abbrev_uuid(&id)))]
    async fn perform_delete(&self, id: ReservationId) -> Result<()> {
        let _guard = self.begin(id).map_err(|e| self.surface(e))?;
        self.api.delete_reservation(id).await.map_err(|e| self.surface(e))?;
        self.state.write().await.remove(id);

        info!("Reservation deleted");
        self.notify(Notification::success("Reservation deleted successfully"));
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Route a row action through the dispatch table.
    pub async fn dispatch(&self, command: Command) -> Result<()> {
        let handler = dispatch::handler_for(command.action);
        handler(self, command.reservation_id).await
    }

    /// Drop everything cached for the current session. An open prompt is closed.
    pub async fn reset(&self) {
        let had_pending = {
            let mut state = self.state.write().await;
            let had_pending = state.gate.pending().is_some();
            *state = ControllerState::default();
            had_pending
        };
        self.in_flight.clear();
        if had_pending {
            self.prompt.close();
        }
    }
}
