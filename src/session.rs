//! Session store
//!
//! Owns the current user and authentication phase and runs the login,
//! signup, logout, restore and profile flows against the API client and the
//! credential store. UI surfaces hold a clone of [`SessionStore`] and watch
//! [`Session`] changes through [`SessionStore::subscribe`].

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::api::{ApiClient, ClientOptions, SessionExpiryHandler};
use crate::models::{
    ApiError, ChangePasswordRequest, FormErrors, LoginRequest, ProfileUpdate,
    ResetPasswordRequest, SignupRequest, User, VerifyResetRequest,
};
use crate::storage::{CredentialStore, KeyValueStore, StorageError};

// =============================================================================
// Collaborators
// =============================================================================

/// Destinations the session flows navigate to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Main tabbed app
    MainApp,
    /// Sign-in screen
    SignIn,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::MainApp => "/(tabs)/home",
            Route::SignIn => "/(auth)/sign-in",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Router driven after auth transitions
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// User-visible alerts
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

// =============================================================================
// Session State
// =============================================================================

/// Authentication phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Store created, restore not started
    #[default]
    Uninitialized,
    /// Restore, login or signup in flight
    Loading,
    Authenticated,
    Unauthenticated,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionPhase::Uninitialized => "uninitialized",
            SessionPhase::Loading => "loading",
            SessionPhase::Authenticated => "authenticated",
            SessionPhase::Unauthenticated => "unauthenticated",
        };
        f.write_str(s)
    }
}

/// In-memory session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub phase: SessionPhase,
    /// Message of the last failed login, restore or signup
    pub last_error: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Uninitialized | SessionPhase::Loading
        )
    }
}

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Could not persist session: {0}")]
    Storage(#[from] StorageError),

    #[error("Authentication response is missing {0}")]
    InvalidAuthPayload(&'static str),
}

impl SessionError {
    /// Errors split for form display
    pub fn form_errors(&self) -> FormErrors {
        match self {
            SessionError::Api(e) => FormErrors::from(e),
            other => FormErrors {
                toast: Some(other.to_string()),
                ..FormErrors::default()
            },
        }
    }
}

// =============================================================================
// Teardown
// =============================================================================

/// Clears credentials and resets the session to signed-out
struct Teardown {
    state: Arc<watch::Sender<Session>>,
    credentials: CredentialStore,
    navigator: Arc<dyn Navigator>,
}

impl Teardown {
    async fn run(&self) {
        if let Err(e) = self.credentials.clear().await {
            tracing::warn!(error = %e, "Could not clear stored credentials");
        }
        self.state.send_modify(|s| {
            s.user = None;
            s.phase = SessionPhase::Unauthenticated;
        });
        tracing::info!("Session cleared");
        self.navigator.navigate(Route::SignIn);
    }
}

#[async_trait]
impl SessionExpiryHandler for Teardown {
    async fn session_expired(&self) {
        tracing::warn!("Session expired, signing out");
        self.run().await;
    }
}

// =============================================================================
// Session Store
// =============================================================================

/// Shared handle to the session and its flows
#[derive(Clone)]
pub struct SessionStore {
    client: ApiClient,
    credentials: CredentialStore,
    state: Arc<watch::Sender<Session>>,
    teardown: Arc<Teardown>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
}

impl SessionStore {
    /// Build the store and an API client wired to tear the session down when
    /// a token refresh fails
    pub fn new(
        options: ClientOptions,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (tx, _) = watch::channel(Session::default());
        let state = Arc::new(tx);
        let credentials = CredentialStore::new(store.clone());
        let teardown = Arc::new(Teardown {
            state: state.clone(),
            credentials: credentials.clone(),
            navigator: navigator.clone(),
        });
        let client = ApiClient::with_options(options, store).with_expiry_handler(teardown.clone());

        Self {
            client,
            credentials,
            state,
            teardown,
            navigator,
            notifier,
        }
    }

    /// Client sharing this session's credentials
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver notified on every session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.state.send_modify(|s| {
            if s.phase != phase {
                tracing::debug!(from = %s.phase, to = %phase, "Session transition");
            }
            s.phase = phase;
        });
    }

    fn fail(&self, message: &str) {
        self.state.send_modify(|s| {
            s.phase = SessionPhase::Unauthenticated;
            s.last_error = Some(message.to_string());
        });
    }

    fn authenticate(&self, user: User) {
        self.state.send_modify(|s| {
            tracing::info!(user_id = %user.id, "Session authenticated");
            s.user = Some(user);
            s.phase = SessionPhase::Authenticated;
            s.last_error = None;
        });
    }

    /// Restore a persisted session and refresh the user from the server
    ///
    /// A stored pair whose profile fetch fails leaves the last-known user in
    /// memory with the phase set to unauthenticated; storage is not cleared
    /// here.
    pub async fn initialize(&self) {
        self.set_phase(SessionPhase::Loading);

        let stored = match self.credentials.load().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored session");
                None
            }
        };

        let Some(stored) = stored else {
            tracing::debug!("No stored session");
            self.set_phase(SessionPhase::Unauthenticated);
            return;
        };

        self.state.send_modify(|s| s.user = Some(stored.user.clone()));

        match self.client.profile_info().await {
            Ok(fresh) => {
                if let Err(e) = self.credentials.save_user(&fresh.data).await {
                    tracing::warn!(error = %e, "Could not persist refreshed profile");
                }
                self.authenticate(fresh.data);
            }
            Err(e) => {
                tracing::info!(error = %e, "Stored session is no longer valid");
                self.state.send_modify(|s| {
                    s.user = Some(stored.user);
                    s.phase = SessionPhase::Unauthenticated;
                    s.last_error = Some(e.message.clone());
                });
            }
        }
    }

    /// Sign in; failures are logged and leave the session unauthenticated
    ///
    /// Returns whether the session is now authenticated. The failure reason
    /// is kept in [`Session::last_error`].
    pub async fn login(&self, credentials: &LoginRequest) -> bool {
        self.set_phase(SessionPhase::Loading);

        match self.sign_in(self.client.login(credentials).await).await {
            Ok(_) => {
                self.navigator.navigate(Route::MainApp);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Login failed");
                self.fail(&e.to_string());
                false
            }
        }
    }

    /// Create an account and sign in; failures are returned to the caller
    pub async fn signup(&self, request: &SignupRequest) -> Result<User, SessionError> {
        self.set_phase(SessionPhase::Loading);

        match self.sign_in(self.client.signup(request).await).await {
            Ok(user) => {
                self.navigator.navigate(Route::MainApp);
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Signup failed");
                self.fail(&e.to_string());
                Err(e)
            }
        }
    }

    async fn sign_in(
        &self,
        result: crate::models::ApiResult<crate::models::AuthPayload>,
    ) -> Result<User, SessionError> {
        let payload = result?.data;
        let token = payload
            .access_token
            .ok_or(SessionError::InvalidAuthPayload("access token"))?;
        let user = payload
            .user
            .ok_or(SessionError::InvalidAuthPayload("user"))?;

        self.credentials.save(&token, &user).await?;
        self.authenticate(user.clone());
        Ok(user)
    }

    /// Sign out; always ends signed-out regardless of the server's answer
    pub async fn logout(&self) {
        if let Err(e) = self.client.logout().await {
            tracing::debug!(error = %e, "Server logout failed, clearing locally");
        }
        self.teardown.run().await;
    }

    fn alert_failure(&self, err: &SessionError) {
        if let Some(toast) = err.form_errors().toast {
            self.notifier.error(&toast);
        }
    }

    fn alert_success(&self, message: &str, default: &str) {
        if message.is_empty() || message == crate::models::DEFAULT_SUCCESS_MESSAGE {
            self.notifier.success(default);
        } else {
            self.notifier.success(message);
        }
    }

    /// Apply profile edits and persist the returned user
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, SessionError> {
        let result = async {
            let response = self.client.update_profile(update).await?;
            self.credentials.save_user(&response.data).await?;
            Ok::<_, SessionError>(response)
        }
        .await;

        match result {
            Ok(response) => {
                let user = response.data;
                self.state.send_modify(|s| s.user = Some(user.clone()));
                self.alert_success(&response.message, "Profile updated successfully");
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile update failed");
                self.alert_failure(&e);
                Err(e)
            }
        }
    }

    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<(), SessionError> {
        let result = self.client.change_password(request).await;
        self.report(result, "Password changed successfully")
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), SessionError> {
        let result = self.client.forgot_password(email).await;
        self.report(result, "Reset code sent to your email")
    }

    pub async fn verify_password_reset(&self, request: &VerifyResetRequest) -> Result<(), SessionError> {
        let result = self.client.verify_password_reset(request).await;
        self.report(result, "Code verified")
    }

    pub async fn change_password_with_reset(
        &self,
        request: &ResetPasswordRequest,
    ) -> Result<(), SessionError> {
        let result = self.client.change_password_with_reset(request).await;
        self.report(result, "Password reset successfully")
    }

    /// Alert on either outcome and hand failures back to the caller
    fn report<T>(
        &self,
        result: crate::models::ApiResult<T>,
        success: &str,
    ) -> Result<(), SessionError> {
        match result {
            Ok(response) => {
                self.alert_success(&response.message, success);
                Ok(())
            }
            Err(e) => {
                let err = SessionError::Api(e);
                tracing::warn!(error = %err, "Account request failed");
                self.alert_failure(&err);
                Err(err)
            }
        }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("client", &self.client)
            .field("session", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_is_loading_and_signed_out() {
        let session = Session::default();
        assert!(session.is_loading());
        assert!(!session.is_authenticated());
        assert!(session.user.is_none());
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::MainApp.to_string(), "/(tabs)/home");
        assert_eq!(Route::SignIn.path(), "/(auth)/sign-in");
    }

    #[test]
    fn test_storage_error_becomes_toast() {
        let err = SessionError::InvalidAuthPayload("user");
        let form = err.form_errors();
        assert!(form.fields.is_empty());
        assert_eq!(
            form.toast.as_deref(),
            Some("Authentication response is missing user")
        );
    }
}
