//! Profile endpoints

use serde_json::{json, Value};

use super::client::{ApiClient, ApiRequest};
use crate::models::{ApiResult, ChangePasswordRequest, Notification, ProfileUpdate, User};

pub const INFO: &str = "/profile/info";
pub const CHANGE_PASSWORD: &str = "/profile/change-password";
pub const NOTIFICATIONS: &str = "/profile/notifications";
pub const NOTIFICATIONS_READ: &str = "/profile/notifications/read";

impl ApiClient {
    /// Current user's profile
    pub async fn profile_info(&self) -> ApiResult<User> {
        self.request(ApiRequest::get(INFO), "Could not load profile")
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
        let req = ApiRequest::put(INFO).json(update)?;
        self.request(req, "Could not update profile").await
    }

    #[tracing::instrument(skip_all)]
    pub async fn change_password(&self, request: &ChangePasswordRequest) -> ApiResult<Value> {
        let req = ApiRequest::post(CHANGE_PASSWORD).json(request)?;
        self.request(req, "Could not change password").await
    }

    pub async fn notifications(&self) -> ApiResult<Vec<Notification>> {
        self.request(ApiRequest::get(NOTIFICATIONS), "Could not load notifications")
            .await
    }

    /// Mark notifications as read; an empty list marks all of them
    #[tracing::instrument(skip(self))]
    pub async fn mark_notifications_read(&self, ids: &[String]) -> ApiResult<Value> {
        let req = ApiRequest::post(NOTIFICATIONS_READ).body(json!({ "notification_ids": ids }));
        self.request(req, "Could not update notifications").await
    }
}
