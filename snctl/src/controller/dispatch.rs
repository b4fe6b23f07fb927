//! Row actions and the table that routes them to controller handlers.

use super::ReservationLifecycleController;
use crate::api::models::reservations::ReservationStatus;
use crate::errors::Result;
use crate::types::ReservationId;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Commit,
    Release,
    Delete,
}

impl ActionKind {
    /// Actions a row in the given status offers.
    pub fn available_for(status: ReservationStatus) -> &'static [ActionKind] {
        match status {
            ReservationStatus::Reserved => &[ActionKind::Commit, ActionKind::Delete],
            ReservationStatus::Committed => &[ActionKind::Release],
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Commit => write!(f, "Commit"),
            ActionKind::Release => write!(f, "Release"),
            ActionKind::Delete => write!(f, "Delete"),
        }
    }
}

/// A row action as triggered from the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub action: ActionKind,
    pub reservation_id: ReservationId,
}

pub type Handler = for<'a> fn(&'a ReservationLifecycleController, ReservationId) -> BoxFuture<'a, Result<()>>;

fn commit(controller: &ReservationLifecycleController, id: ReservationId) -> BoxFuture<'_, Result<()>> {
    controller.commit(id).boxed()
}

fn release(controller: &ReservationLifecycleController, id: ReservationId) -> BoxFuture<'_, Result<()>> {
    async move { controller.request_release(id).await }.boxed()
}

fn delete(controller: &ReservationLifecycleController, id: ReservationId) -> BoxFuture<'_, Result<()>> {
    async move { controller.request_delete(id).await }.boxed()
}

/// Commit runs straight away; release and delete only open the confirmation gate.
pub fn handler_for(action: ActionKind) -> Handler {
    match action {
        ActionKind::Commit => commit,
        ActionKind::Release => release,
        ActionKind::Delete => delete,
    }
}
