//! One console session: the API client, the logged-in user and every controller built on them.

use crate::api::client::{ApiClient, HttpApiClient};
use crate::auth::AuthService;
use crate::auth::session::SessionStore;
use crate::config::Config;
use crate::controller::ReservationLifecycleController;
use crate::errors::Result;
use crate::management::api_keys::ApiKeyManager;
use crate::management::users::UserManager;
use crate::ui::{ConfirmationPrompt, NotificationSink, TableView, TimedSink};
use std::sync::Arc;

/// The presentation side a console talks through.
#[derive(Clone)]
pub struct Frontend {
    pub prompt: Arc<dyn ConfirmationPrompt>,
    pub notifier: Arc<dyn NotificationSink>,
    pub view: Arc<dyn TableView>,
}

pub struct Console {
    pub api: Arc<dyn ApiClient>,
    pub auth: AuthService,
    pub reservations: ReservationLifecycleController,
    pub users: UserManager,
    pub api_keys: ApiKeyManager,
}

impl Console {
    pub fn new(config: &Config, frontend: Frontend) -> Result<Self> {
        let api: Arc<dyn ApiClient> = Arc::new(HttpApiClient::from_config(config)?);
        let store = SessionStore::new(config.session_path());
        Ok(Self::with_client(api, store, frontend, config))
    }

    pub fn with_client(api: Arc<dyn ApiClient>, store: SessionStore, frontend: Frontend, config: &Config) -> Self {
        let Frontend { prompt, notifier, view } = frontend;
        let notifier: Arc<dyn NotificationSink> = Arc::new(TimedSink::new(notifier, config.notification_ttl));
        Self {
            auth: AuthService::new(api.clone(), store, notifier.clone()),
            reservations: ReservationLifecycleController::new(api.clone(), prompt.clone(), notifier.clone(), view)
                .with_notification_ttl(config.notification_ttl),
            users: UserManager::new(api.clone(), prompt.clone(), notifier.clone()),
            api_keys: ApiKeyManager::new(api.clone(), prompt, notifier),
            api,
        }
    }

    /// End the session: forget the token on disk and in memory, and drop all cached state.
    pub async fn logout(&self) -> Result<()> {
        self.auth.logout()?;
        self.reservations.reset().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::api_keys::ApiKeyCreate;
    use crate::test_utils::{RecordingPrompt, RecordingView, reservation_json, test_client, test_config};
    use crate::ui::NotificationLog;
    use serde_json::json;
    use std::time::Duration;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_logout_resets_controller_and_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/reservations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([reservation_json(Uuid::new_v4(), "DEV-WEB-002", "reserved")])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "t0ken",
                "user": {"id": Uuid::new_v4(), "username": "admin", "email": "admin@example.com", "role": "admin"},
                "expiresAt": "2999-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.uri());
        let frontend = Frontend {
            prompt: Arc::new(RecordingPrompt::default()),
            notifier: Arc::new(NotificationLog::default()),
            view: Arc::new(RecordingView::default()),
        };
        let console = Console::with_client(
            Arc::new(test_client(&server)),
            SessionStore::new(dir.path().join("session.json")),
            frontend,
            &config,
        );

        console.auth.login("admin", "hunter22").await.unwrap();
        console.reservations.load_reservations().await.unwrap();
        assert_eq!(console.reservations.reservations().await.len(), 1);

        console.logout().await.unwrap();
        assert!(console.reservations.reservations().await.is_empty());
        assert!(console.auth.require_session().is_err());
        assert!(!dir.path().join("session.json").exists());
    }

    #[tokio::test]
    async fn test_configured_notification_ttl_applies_to_every_flow() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&server.uri());
        config.notification_ttl = Duration::from_secs(12);

        let log = Arc::new(NotificationLog::default());
        let console = Console::with_client(
            Arc::new(test_client(&server)),
            SessionStore::new(dir.path().join("session.json")),
            Frontend {
                prompt: Arc::new(RecordingPrompt::default()),
                notifier: log.clone(),
                view: Arc::new(RecordingView::default()),
            },
            &config,
        );

        // All of these fail local validation, so nothing reaches the server
        assert!(console.auth.login("", "").await.is_err());
        assert!(console.users.change_password(Uuid::new_v4(), "short", "short").await.is_err());
        let unnamed_key = ApiKeyCreate {
            name: String::new(),
            description: String::new(),
            expires_in: None,
            scopes: vec![],
        };
        assert!(console.api_keys.create(unnamed_key).await.is_err());
        assert!(console.reservations.confirm(None).await.is_err());

        let active = log.active();
        assert_eq!(active.len(), 4);
        assert!(active.iter().all(|n| n.ttl == Duration::from_secs(12)));
    }
}
