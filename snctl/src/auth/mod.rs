//! Login, logout and session persistence.
//!
//! The backend issues a bearer token on `POST /api/auth/login`. [`AuthService`] stores it (with
//! the user and its expiry) through a [`session::SessionStore`], installs it on the
//! [`ApiClient`] and hands it back on the next start via [`AuthService::restore`]. A session whose
//! expiry has passed is treated as absent and removed from disk.

pub mod session;

use crate::api::client::ApiClient;
use crate::api::models::auth::{LoginRequest, SessionUser};
use crate::errors::{Error, Result};
use crate::ui::{Notification, NotificationSink};
use arc_swap::ArcSwapOption;
use chrono::Utc;
use session::{SessionStore, StoredSession};
use std::sync::Arc;

pub struct AuthService {
    api: Arc<dyn ApiClient>,
    store: SessionStore,
    notifier: Arc<dyn NotificationSink>,
    current: ArcSwapOption<StoredSession>,
}

impl AuthService {
    pub fn new(api: Arc<dyn ApiClient>, store: SessionStore, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            api,
            store,
            notifier,
            current: ArcSwapOption::empty(),
        }
    }

    /// Pick up a previously stored session, if one exists and has not expired.
    pub fn restore(&self) -> Result<Option<SessionUser>> {
        let session = self.store.load()?;
        self.install(session.clone());
        Ok(session.map(|s| s.user))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SessionUser> {
        if username.is_empty() || password.is_empty() {
            let err = Error::validation("Username and password are required");
            self.notifier.notify(Notification::from_error(&err));
            return Err(err);
        }

        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response = match self.api.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::info!(username, "Login rejected: {}", e);
                self.notifier.notify(Notification::from_error(&e));
                return Err(e);
            }
        };

        let session = StoredSession::from(response);
        self.store.save(&session)?;
        let user = session.user.clone();
        self.install(Some(session));

        tracing::info!(username = %user.username, "Logged in");
        self.notifier.notify(Notification::success(format!("Welcome, {}!", user.username)));
        Ok(user)
    }

    pub fn logout(&self) -> Result<()> {
        self.install(None);
        self.store.clear()
    }

    /// The active session, or `Unauthenticated` if there is none or it has expired since it was
    /// loaded.
    pub fn require_session(&self) -> Result<Arc<StoredSession>> {
        match self.current.load_full() {
            Some(session) if !session.is_expired_at(Utc::now()) => Ok(session),
            Some(_) => {
                self.logout()?;
                Err(Error::Unauthenticated {
                    message: Some("Your session has expired. Please log in again.".to_string()),
                })
            }
            None => Err(Error::Unauthenticated { message: None }),
        }
    }

    fn install(&self, session: Option<StoredSession>) {
        self.api.set_token(session.as_ref().map(|s| s.token.clone()));
        self.current.store(session.map(Arc::new));
    }
}
