//! System endpoints

use super::client::{ApiClient, ApiRequest};
use crate::models::{ApiResult, HealthStatus};

pub const HEALTH: &str = "/system/health";

impl ApiClient {
    /// Backend liveness check
    pub async fn health(&self) -> ApiResult<HealthStatus> {
        self.request(ApiRequest::get(HEALTH), "Service unavailable")
            .await
    }
}
