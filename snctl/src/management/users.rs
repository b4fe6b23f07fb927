use super::{required, surfaced};
use crate::api::client::ApiClient;
use crate::api::models::users::{MIN_PASSWORD_LENGTH, PasswordChange, Role, User, UserCreate, UserUpdate};
use crate::controller::confirmation::{ConfirmationGate, GateDecision, PendingConfirmation};
use crate::errors::{Error, Result};
use crate::types::{UserId, abbrev_uuid};
use crate::ui::{ConfirmationPrompt, ConfirmationRequest, Notification, NotificationSink};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

const REQUIRED_FIELDS: &str = "Please fill in all required fields";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub search: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if self.role.is_some_and(|role| role != user.role) {
            return false;
        }
        match self.search.as_deref().filter(|s| !s.is_empty()) {
            Some(term) => format!("{} {}", user.username, user.email)
                .to_lowercase()
                .contains(&term.to_lowercase()),
            None => true,
        }
    }
}

/// Password change form: the new password typed twice.
pub fn check_new_password(password: &str, confirmation: &str) -> Result<()> {
    if password != confirmation {
        return Err(Error::validation("Passwords do not match"));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

pub struct UserManager {
    api: Arc<dyn ApiClient>,
    prompt: Arc<dyn ConfirmationPrompt>,
    notifier: Arc<dyn NotificationSink>,
    gate: Mutex<ConfirmationGate<UserId>>,
}

impl UserManager {
    pub fn new(api: Arc<dyn ApiClient>, prompt: Arc<dyn ConfirmationPrompt>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            api,
            prompt,
            notifier,
            gate: Mutex::new(ConfirmationGate::default()),
        }
    }

    pub async fn list(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let users = surfaced(&*self.notifier, self.api.list_users().await)?;
        Ok(users.into_iter().filter(|u| filter.matches(u)).collect())
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create(&self, request: &UserCreate) -> Result<User> {
        surfaced(
            &*self.notifier,
            required(&[request.username.as_str(), &request.email, &request.password], REQUIRED_FIELDS),
        )?;
        let user = surfaced(&*self.notifier, self.api.create_user(request).await)?;

        info!(user_id = %abbrev_uuid(&user.id), "User created");
        self.notifier.notify(Notification::success("User created successfully"));
        Ok(user)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)))]
    pub async fn update(&self, id: UserId, request: &UserUpdate) -> Result<User> {
        surfaced(&*self.notifier, required(&[request.username.as_str(), &request.email], REQUIRED_FIELDS))?;
        let user = surfaced(&*self.notifier, self.api.update_user(id, request).await)?;

        info!("User updated");
        self.notifier.notify(Notification::success("User updated successfully"));
        Ok(user)
    }

    #[instrument(skip(self, password, confirmation), fields(user_id = %abbrev_uuid(&id)))]
    pub async fn change_password(&self, id: UserId, password: &str, confirmation: &str) -> Result<()> {
        surfaced(&*self.notifier, check_new_password(password, confirmation))?;
        let request = PasswordChange {
            password: password.to_string(),
        };
        surfaced(&*self.notifier, self.api.change_password(id, &request).await)?;

        info!("Password changed");
        self.notifier.notify(Notification::success("Password changed successfully"));
        Ok(())
    }

    /// Open a yes/no prompt for deleting `user`.
    pub async fn request_delete(&self, user: &User) {
        let request = ConfirmationRequest::new(format!("Are you sure you want to delete user \"{}\"?", user.username), "Delete");
        self.gate.lock().await.request(PendingConfirmation {
            action: user.id,
            message: request.message.clone(),
            required_name: None,
        });
        self.prompt.open(&request);
    }

    /// Delete the user awaiting confirmation.
    pub async fn confirm_delete(&self) -> Result<()> {
        let decision = surfaced(&*self.notifier, self.gate.lock().await.submit(None))?;
        let GateDecision::Proceed(pending) = decision else {
            // A yes/no prompt has no name to mismatch
            return Ok(());
        };
        self.prompt.close();

        surfaced(&*self.notifier, self.api.delete_user(pending.action).await)?;
        info!(user_id = %abbrev_uuid(&pending.action), "User deleted");
        self.notifier.notify(Notification::success("User deleted successfully"));
        Ok(())
    }

    pub async fn cancel(&self) -> Result<()> {
        surfaced(&*self.notifier, self.gate.lock().await.cancel())?;
        self.prompt.close();
        Ok(())
    }
}
