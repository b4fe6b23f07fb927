//! HTTP client for the server name generator API.

use crate::api::models::MessageResponse;
use crate::api::models::api_keys::{ApiKey, ApiKeyCreate};
use crate::api::models::auth::{LoginRequest, LoginResponse};
use crate::api::models::health::HealthResponse;
use crate::api::models::reservations::{Reservation, ReservationCreate, ReservationReference, ReservedName};
use crate::api::models::stats::DashboardStats;
use crate::api::models::users::{PasswordChange, User, UserCreate, UserUpdate};
use crate::config::Config;
use crate::errors::{Error, Result};
use crate::types::{ApiKeyId, ReservationId, UserId, abbrev_uuid};
use anyhow::anyhow;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Every call the console makes against the backend.
///
/// Implemented over HTTP by [`HttpApiClient`]. Failures come back as [`Error`] values; nothing
/// here panics or retries.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Install (or clear) the bearer token sent with every subsequent request.
    fn set_token(&self, token: Option<String>);

    async fn reserve(&self, request: &ReservationCreate) -> Result<ReservedName>;
    async fn commit(&self, id: ReservationId) -> Result<()>;
    async fn release(&self, id: ReservationId) -> Result<()>;
    async fn delete_reservation(&self, id: ReservationId) -> Result<()>;
    async fn list_reservations(&self) -> Result<Vec<Reservation>>;
    async fn stats(&self) -> Result<DashboardStats>;

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse>;
    async fn current_user(&self) -> Result<User>;

    async fn list_users(&self) -> Result<Vec<User>>;
    async fn create_user(&self, request: &UserCreate) -> Result<User>;
    async fn update_user(&self, id: UserId, request: &UserUpdate) -> Result<User>;
    async fn delete_user(&self, id: UserId) -> Result<()>;
    async fn change_password(&self, id: UserId, request: &PasswordChange) -> Result<()>;

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>>;
    async fn create_api_key(&self, request: &ApiKeyCreate) -> Result<ApiKey>;
    async fn revoke_api_key(&self, id: ApiKeyId) -> Result<()>;

    async fn health(&self) -> Result<HealthResponse>;
}

/// The concrete implementation of `ApiClient`, built on `reqwest`.
pub struct HttpApiClient {
    client: Client,
    base_url: Url,
    token: ArcSwapOption<String>,
}

impl HttpApiClient {
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self> {
        // reqwest is built without a bundled rustls provider. Installing twice is a no-op error.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("snctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(anyhow!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: ensure_slash(&base_url),
            token: ArcSwapOption::empty(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.api_url.clone(), config.request_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.load().is_some()
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| Error::Other(anyhow!("Failed to construct URL for {path}: {e}")))?;

        debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(token) = self.token.load_full() {
            request = request.bearer_auth(token.as_str());
        }
        Ok(request)
    }

    /// Send a request, turning any non-2xx status into a typed error.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "Request rejected by server");
        Err(rejection(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        decode(response).await
    }
}

/// Makes sure a url has a trailing slash, so that `join` appends to the path rather than
/// replacing its last segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

/// Build the error for a rejected request from its status and (possibly non-JSON) body.
fn rejection(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<MessageResponse>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

    if status == StatusCode::UNAUTHORIZED {
        return Error::Unauthenticated { message: Some(message) };
    }

    Error::ServerRejected {
        status: status.as_u16(),
        message,
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str::<T>(&body).map_err(|e| {
        tracing::error!("Failed to parse response as JSON. Error: {}", e);
        tracing::debug!("Response body was: {}", body);
        Error::NetworkFailure {
            message: format!("error decoding response body: {e}"),
        }
    })
}

fn reservation_not_found(id: ReservationId) -> Error {
    Error::NotFound {
        resource: "Reservation".to_string(),
        id: id.to_string(),
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    fn set_token(&self, token: Option<String>) {
        self.token.store(token.map(Arc::new));
    }

    #[instrument(skip(self, request))]
    async fn reserve(&self, request: &ReservationCreate) -> Result<ReservedName> {
        let builder = self.request(Method::POST, "api/reserve")?.json(request);
        self.send_json(builder).await
    }

    #[instrument(skip(self), fields(reservation_id = %abbrev_uuid(&id)))]
    async fn commit(&self, id: ReservationId) -> Result<()> {
        let builder = self
            .request(Method::POST, "api/commit")?
            .json(&ReservationReference { reservation_id: id });

        match self.send(builder).await {
            Ok(_) => Ok(()),
            Err(Error::ServerRejected { status: 404, .. }) => Err(reservation_not_found(id)),
            Err(Error::ServerRejected { status: 409, .. }) => Err(Error::AlreadyCommitted),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(reservation_id = %abbrev_uuid(&id)))]
    async fn release(&self, id: ReservationId) -> Result<()> {
        let builder = self
            .request(Method::POST, "api/release")?
            .json(&ReservationReference { reservation_id: id });
        self.send(builder).await.map(|_| ())
    }

    #[instrument(skip(self), fields(reservation_id = %abbrev_uuid(&id)))]
    async fn delete_reservation(&self, id: ReservationId) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("api/reservations/{id}"))?;

        match self.send(builder).await {
            Ok(_) => Ok(()),
            Err(Error::ServerRejected { message, .. }) if Error::is_committed_delete_message(&message) => Err(Error::CommittedConflict),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn list_reservations(&self) -> Result<Vec<Reservation>> {
        let builder = self.request(Method::GET, "api/reservations")?;
        self.send_json(builder).await
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> Result<DashboardStats> {
        let builder = self.request(Method::GET, "api/stats")?;
        self.send_json(builder).await
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let builder = self.request(Method::POST, "api/auth/login")?.json(request);
        self.send_json(builder).await
    }

    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<User> {
        let builder = self.request(Method::GET, "api/auth/me")?;
        self.send_json(builder).await
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>> {
        let builder = self.request(Method::GET, "api/users")?;
        self.send_json(builder).await
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn create_user(&self, request: &UserCreate) -> Result<User> {
        let builder = self.request(Method::POST, "api/users")?.json(request);
        self.send_json(builder).await
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)))]
    async fn update_user(&self, id: UserId, request: &UserUpdate) -> Result<User> {
        let builder = self.request(Method::PUT, &format!("api/users/{id}"))?.json(request);
        self.send_json(builder).await
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)))]
    async fn delete_user(&self, id: UserId) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("api/users/{id}"))?;
        self.send(builder).await.map(|_| ())
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)))]
    async fn change_password(&self, id: UserId, request: &PasswordChange) -> Result<()> {
        let builder = self.request(Method::POST, &format!("api/users/{id}/password"))?.json(request);
        self.send(builder).await.map(|_| ())
    }

    #[instrument(skip(self))]
    async fn list_api_keys(&self) -> Result<Vec<ApiKey>> {
        let builder = self.request(Method::GET, "api/api-keys")?;
        self.send_json(builder).await
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn create_api_key(&self, request: &ApiKeyCreate) -> Result<ApiKey> {
        let builder = self.request(Method::POST, "api/api-keys")?.json(request);
        self.send_json(builder).await
    }

    #[instrument(skip(self), fields(api_key_id = %abbrev_uuid(&id)))]
    async fn revoke_api_key(&self, id: ApiKeyId) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("api/api-keys/{id}"))?;
        self.send(builder).await.map(|_| ())
    }

    #[instrument(skip(self))]
    async fn health(&self) -> Result<HealthResponse> {
        let builder = self.request(Method::GET, "api/health")?;
        self.send_json(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{reservation_json, test_client};
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_ensure_slash() {
        let url = Url::parse("http://localhost:8080/names").unwrap();
        assert_eq!(ensure_slash(&url).join("api/stats").unwrap().path(), "/names/api/stats");

        let url = Url::parse("http://localhost:8080/").unwrap();
        assert_eq!(ensure_slash(&url).as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_rejection_without_json_body() {
        let err = rejection(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        match err {
            Error::ServerRejected { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Request failed with status 502");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reserve_sends_attributes_with_bearer_token() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/api/reserve"))
            .and(header("authorization", "Bearer secret-token"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "unitCode": "A1",
                "type": "web",
                "provider": "aws",
                "region": "us-east",
                "environment": "prod",
                "function": "api"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "serverName": "A1WEBAWSUSEASTPRODAPI001",
                "reservationId": id
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.set_token(Some("secret-token".to_string()));

        let reserved = client
            .reserve(&ReservationCreate {
                unit_code: "A1".to_string(),
                kind: "web".to_string(),
                provider: "aws".to_string(),
                region: "us-east".to_string(),
                environment: "prod".to_string(),
                function: "api".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(reserved.reservation_id, id);
        assert!(!reserved.server_name.is_empty());
    }

    #[tokio::test]
    async fn test_no_authorization_header_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "version": "1.2.0"})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let health = client.health().await.unwrap();
        assert!(health.is_healthy());

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_commit_maps_status_codes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/commit"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"status": 409, "message": "Reservation is already committed"})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/commit"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"status": 404, "message": "Reservation not found"})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let id = Uuid::new_v4();

        assert!(matches!(client.commit(id).await, Err(Error::AlreadyCommitted)));
        match client.commit(id).await {
            Err(Error::NotFound { resource, id: missing }) => {
                assert_eq!(resource, "Reservation");
                assert_eq!(missing, id.to_string());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_of_committed_reservation_is_a_conflict() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("DELETE"))
            .and(path(format!("/api/reservations/{id}")))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "cannot delete a committed reservation"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.delete_reservation(id).await.unwrap_err();
        assert!(matches!(err, Error::CommittedConflict));
        assert_eq!(err.user_message(), "Cannot delete a committed reservation. Please release it first.");
    }

    #[tokio::test]
    async fn test_other_delete_failures_pass_message_through() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("DELETE"))
            .and(path(format!("/api/reservations/{id}")))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "Failed to delete reservation: disk full"})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.delete_reservation(id).await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to delete reservation: disk full");
    }

    #[tokio::test]
    async fn test_unrelated_conflict_on_delete_keeps_server_message() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("DELETE"))
            .and(path(format!("/api/reservations/{id}")))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "Reservation is locked by another operation"})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.delete_reservation(id).await.unwrap_err();
        assert!(matches!(err, Error::ServerRejected { status: 409, .. }));
        assert_eq!(err.user_message(), "Reservation is locked by another operation");
    }

    #[tokio::test]
    async fn test_committed_delete_message_on_bad_request_is_a_conflict() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("DELETE"))
            .and(path(format!("/api/reservations/{id}")))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Cannot delete a committed reservation"})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.delete_reservation(id).await.unwrap_err();
        assert!(matches!(err, Error::CommittedConflict));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/reservations"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        match client.list_reservations().await {
            Err(Error::Unauthenticated { message }) => assert_eq!(message.as_deref(), Some("Token expired")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_reservations_preserves_server_order() {
        let server = MockServer::start().await;
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/api/reservations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                reservation_json(second, "B2APPAZEUWPAPI002", "committed"),
                reservation_json(first, "A1WEBAWSUSEASTPAPI001", "reserved"),
            ])))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let reservations = client.list_reservations().await.unwrap();
        let ids: Vec<_> = reservations.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_network_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert!(matches!(client.stats().await, Err(Error::NetworkFailure { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_network_failure() {
        let client = HttpApiClient::new(Url::parse("http://127.0.0.1:1").unwrap(), Duration::from_secs(2)).unwrap();
        assert!(matches!(client.list_reservations().await, Err(Error::NetworkFailure { .. })));
    }

    #[tokio::test]
    async fn test_password_change_path() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path(format!("/api/users/{id}/password")))
            .and(body_json(json!({"password": "correct horse"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Password updated"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client
            .change_password(
                id,
                &PasswordChange {
                    password: "correct horse".to_string(),
                },
            )
            .await
            .unwrap();
    }
}
