//! User and API key administration.
//!
//! Thin flows over the backend: list, create, update and delete, with the form checks done
//! locally before anything is sent. Deleting a user and revoking a key go through the same
//! [`ConfirmationGate`](crate::controller::confirmation::ConfirmationGate) as reservation
//! deletes, as a plain yes/no without a name to retype.

pub mod api_keys;
pub mod users;

use crate::errors::{Error, Result};
use crate::ui::{Notification, NotificationSink};

/// Notify the sink of a failed result and pass it through unchanged.
fn surfaced<T>(notifier: &dyn NotificationSink, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        tracing::warn!("{}", e);
        notifier.notify(Notification::from_error(e));
    }
    result
}

fn required(fields: &[&str], message: &str) -> Result<()> {
    if fields.iter().any(|f| f.is_empty()) {
        return Err(Error::validation(message));
    }
    Ok(())
}
