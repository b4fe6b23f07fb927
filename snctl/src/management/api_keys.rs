use super::surfaced;
use crate::api::client::ApiClient;
use crate::api::models::api_keys::{ApiKey, ApiKeyCreate, Scope};
use crate::controller::confirmation::{ConfirmationGate, GateDecision, PendingConfirmation};
use crate::errors::{Error, Result};
use crate::types::{ApiKeyId, abbrev_uuid};
use crate::ui::{ConfirmationPrompt, ConfirmationRequest, Notification, NotificationSink};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// Scopes a new key gets when none are chosen.
pub const DEFAULT_SCOPES: [Scope; 2] = [Scope::Read, Scope::Reserve];

/// Keys expiring within this many days get a countdown badge.
const EXPIRY_WARNING_DAYS: i64 = 7;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Text for the "Expires" column: a countdown within a week of expiry, `Expired` once past,
/// `Never` for keys without an expiry, and the date otherwise.
pub fn expiry_badge(key: &ApiKey, now: DateTime<Utc>) -> String {
    let Some(expires_at) = key.expires_at else {
        return "Never".to_string();
    };

    // Whole days remaining, rounded up
    let seconds = (expires_at - now).num_seconds();
    let days = -((-seconds).div_euclid(SECONDS_PER_DAY));

    match days {
        d if d <= 0 => "Expired".to_string(),
        1 => "Expires in 1 day".to_string(),
        d if d <= EXPIRY_WARNING_DAYS => format!("Expires in {d} days"),
        _ => expires_at.format("%Y-%m-%d").to_string(),
    }
}

pub struct ApiKeyManager {
    api: Arc<dyn ApiClient>,
    prompt: Arc<dyn ConfirmationPrompt>,
    notifier: Arc<dyn NotificationSink>,
    gate: Mutex<ConfirmationGate<ApiKeyId>>,
}

impl ApiKeyManager {
    pub fn new(api: Arc<dyn ApiClient>, prompt: Arc<dyn ConfirmationPrompt>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            api,
            prompt,
            notifier,
            gate: Mutex::new(ConfirmationGate::default()),
        }
    }

    pub async fn list(&self) -> Result<Vec<ApiKey>> {
        surfaced(&*self.notifier, self.api.list_api_keys().await)
    }

    /// Create a key. The returned key carries the plaintext secret, which the backend never
    /// shows again.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: ApiKeyCreate) -> Result<ApiKey> {
        if request.name.is_empty() {
            return surfaced(
                &*self.notifier,
                Err(Error::validation("Please enter a name for your API key")),
            );
        }

        let mut request = request;
        if request.scopes.is_empty() {
            request.scopes = DEFAULT_SCOPES.to_vec();
        }
        // Zero days means no expiry
        request.expires_in = request.expires_in.filter(|days| *days > 0);

        let key = surfaced(&*self.notifier, self.api.create_api_key(&request).await)?;
        info!(api_key_id = %abbrev_uuid(&key.id), "API key created");
        self.notifier.notify(Notification::success("API key created successfully"));
        Ok(key)
    }

    pub async fn request_revoke(&self, key: &ApiKey) {
        let request = ConfirmationRequest::new(format!("Are you sure you want to revoke the API key \"{}\"?", key.name), "Revoke");
        self.gate.lock().await.request(PendingConfirmation {
            action: key.id,
            message: request.message.clone(),
            required_name: None,
        });
        self.prompt.open(&request);
    }

    pub async fn confirm_revoke(&self) -> Result<()> {
        let decision = surfaced(&*self.notifier, self.gate.lock().await.submit(None))?;
        let GateDecision::Proceed(pending) = decision else {
            return Ok(());
        };
        self.prompt.close();

        surfaced(&*self.notifier, self.api.revoke_api_key(pending.action).await)?;
        info!(api_key_id = %abbrev_uuid(&pending.action), "API key revoked");
        self.notifier.notify(Notification::success("API key revoked successfully"));
        Ok(())
    }

    pub async fn cancel(&self) -> Result<()> {
        surfaced(&*self.notifier, self.gate.lock().await.cancel())?;
        self.prompt.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RecordingPrompt, test_client};
    use crate::ui::NotificationLog;
    use chrono::Duration;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn key(expires_at: Option<DateTime<Utc>>) -> ApiKey {
        ApiKey {
            id: Uuid::new_v4(),
            name: "ci".to_string(),
            key: None,
            user_id: Uuid::new_v4(),
            description: String::new(),
            scopes: vec![Scope::Read],
            last_used: None,
            created_at: Utc::now(),
            expires_at,
            is_active: true,
        }
    }

    fn manager(server: &MockServer) -> (ApiKeyManager, Arc<NotificationLog>) {
        let log = Arc::new(NotificationLog::default());
        let manager = ApiKeyManager::new(Arc::new(test_client(server)), Arc::new(RecordingPrompt::default()), log.clone());
        (manager, log)
    }

    #[test]
    fn test_expiry_badge() {
        let now = Utc::now();
        assert_eq!(expiry_badge(&key(None), now), "Never");
        assert_eq!(expiry_badge(&key(Some(now - Duration::hours(1))), now), "Expired");
        assert_eq!(expiry_badge(&key(Some(now + Duration::hours(3))), now), "Expires in 1 day");
        assert_eq!(expiry_badge(&key(Some(now + Duration::days(3) + Duration::hours(1))), now), "Expires in 4 days");
        assert_eq!(expiry_badge(&key(Some(now + Duration::days(7))), now), "Expires in 7 days");

        let later = now + Duration::days(30);
        assert_eq!(expiry_badge(&key(Some(later)), now), later.format("%Y-%m-%d").to_string());
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let server = MockServer::start().await;
        let (manager, log) = manager(&server);

        let result = manager
            .create(ApiKeyCreate {
                name: String::new(),
                description: "deploy pipeline".to_string(),
                expires_in: None,
                scopes: vec![],
            })
            .await;

        assert!(matches!(result, Err(Error::ValidationFailed { .. })));
        assert_eq!(log.messages(), vec!["Please enter a name for your API key".to_string()]);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_applies_default_scopes_and_returns_plaintext_key() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/api/api-keys"))
            .and(body_json(json!({
                "name": "ci",
                "description": "",
                "scopes": ["read", "reserve"]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": id,
                "name": "ci",
                "key": "snk_live_abc123",
                "userId": Uuid::new_v4(),
                "scopes": ["read", "reserve"],
                "createdAt": "2024-03-01T12:00:00Z",
                "isActive": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (manager, _) = manager(&server);
        let created = manager
            .create(ApiKeyCreate {
                name: "ci".to_string(),
                description: String::new(),
                expires_in: Some(0),
                scopes: vec![],
            })
            .await
            .unwrap();

        assert_eq!(created.key.as_deref(), Some("snk_live_abc123"));
    }

    #[tokio::test]
    async fn test_revoke_after_confirmation() {
        let server = MockServer::start().await;
        let target = key(None);
        Mock::given(method("DELETE"))
            .and(path(format!("/api/api-keys/{}", target.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "API key revoked"})))
            .expect(1)
            .mount(&server)
            .await;

        let (manager, log) = manager(&server);
        manager.request_revoke(&target).await;
        assert!(server.received_requests().await.unwrap().is_empty());

        manager.confirm_revoke().await.unwrap();
        assert_eq!(log.last().unwrap().message, "API key revoked successfully");
    }
}
