//! Authentication endpoints
//!
//! Login, signup, logout, token refresh and the three-step password reset.

use serde_json::Value;

use super::client::{ApiClient, ApiRequest, REFRESH_ENDPOINT};
use crate::models::{
    ApiResult, AuthPayload, ForgotPasswordRequest, LoginRequest, RefreshPayload,
    ResetPasswordRequest, SignupRequest, VerifyResetRequest,
};

pub const LOGIN: &str = "/auth/login";
pub const SIGNUP: &str = "/auth/signup";
pub const LOGOUT: &str = "/auth/logout";
pub const FORGOT_PASSWORD: &str = "/auth/forgot-password";
pub const VERIFY_RESET: &str = "/auth/forgot-password/verify";
pub const CHANGE_PASSWORD_WITH_RESET: &str = "/auth/forgot-password/change";

impl ApiClient {
    /// Login with email and password
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> ApiResult<AuthPayload> {
        let req = ApiRequest::post(LOGIN).json(request)?;
        self.request(req, "Login failed. Please check your credentials.")
            .await
    }

    /// Create a new account
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: &SignupRequest) -> ApiResult<AuthPayload> {
        let req = ApiRequest::post(SIGNUP).json(request)?;
        self.request(req, "Signup failed. Please try again.").await
    }

    /// End the server-side session
    pub async fn logout(&self) -> ApiResult<Value> {
        self.request(ApiRequest::post(LOGOUT), "Logout failed").await
    }

    /// Exchange the refresh cookie for a new session
    pub async fn refresh_token(&self) -> ApiResult<RefreshPayload> {
        self.request(ApiRequest::post(REFRESH_ENDPOINT), "Session refresh failed")
            .await
    }

    /// Send a reset code to `email`
    #[tracing::instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> ApiResult<Value> {
        let req = ApiRequest::post(FORGOT_PASSWORD).json(&ForgotPasswordRequest {
            email: email.to_string(),
        })?;
        self.request(req, "Could not send reset code").await
    }

    /// Check the emailed reset code
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn verify_password_reset(&self, request: &VerifyResetRequest) -> ApiResult<Value> {
        let req = ApiRequest::post(VERIFY_RESET).json(request)?;
        self.request(req, "Invalid or expired reset code").await
    }

    /// Set a new password using a verified reset code
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn change_password_with_reset(
        &self,
        request: &ResetPasswordRequest,
    ) -> ApiResult<Value> {
        let req = ApiRequest::post(CHANGE_PASSWORD_WITH_RESET).json(request)?;
        self.request(req, "Could not reset password").await
    }
}
