//! Data structures and types for CineMate
//!
//! Contains all shared models used across the client organized by domain:
//! - **Envelope**: the `{success, message, data}` response contract and its error twin
//! - **Auth**: users, credentials and auth payloads
//! - **Movies**: titles, details, genres and paginated lists
//! - **Profile**: profile updates, password changes and notifications

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Response Envelope
// =============================================================================

/// Default message for successful responses that carry none
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Request successful";

/// Validation bucket for errors that do not belong to a single form field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Successful API response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    /// Map the payload while keeping the envelope
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            message: self.message,
            data: f(self.data),
        }
    }
}

/// Result type returned by every API call
pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// Nested error object of a failed response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Per-field validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, Vec<String>>>,
}

/// Failed API response
///
/// Every failure the client can produce (HTTP, transport, decoding) ends up
/// in this shape. `data` is always an empty object.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    pub success: bool,
    pub message: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Value::Object(Default::default()),
            error: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: &str, detail: impl Into<String>) -> Self {
        Self {
            error: Some(ErrorBody {
                code: Some(code.to_string()),
                message: Some(detail.into()),
                details: None,
            }),
            ..Self::new(message)
        }
    }

    /// Machine-readable error code, if the server or client set one
    pub fn code(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.code.as_deref())
    }

    /// Per-field validation messages
    pub fn details(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        self.error.as_ref().and_then(|e| e.details.as_ref())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self.code(), Some(codes::NETWORK_ERROR) | Some(codes::TIMEOUT))
    }
}

/// Client-side error codes
pub mod codes {
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";
}

/// Render validation details as `field: a, b; other: c`
pub fn format_details(details: &BTreeMap<String, Vec<String>>) -> String {
    details
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors split the way a form displays them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    /// Message shown under each field
    pub fields: BTreeMap<String, String>,
    /// Aggregate message for a toast, if any
    pub toast: Option<String>,
}

impl FormErrors {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl From<&ApiError> for FormErrors {
    fn from(err: &ApiError) -> Self {
        let Some(details) = err.details() else {
            return Self {
                fields: BTreeMap::new(),
                toast: Some(err.message.clone()),
            };
        };

        let mut form = Self::default();
        for (field, messages) in details {
            if field == NON_FIELD_ERRORS {
                form.toast = Some(messages.join(" "));
            } else {
                form.fields.insert(field.clone(), messages.join(", "));
            }
        }
        form
    }
}

// =============================================================================
// Auth Models
// =============================================================================

/// Genre preference; the server sends either ids or names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenreRef {
    Id(u64),
    Name(String),
}

impl fmt::Display for GenreRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenreRef::Id(id) => write!(f, "{}", id),
            GenreRef::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Authenticated user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<GenreRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maturity_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Login form
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Signup form
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<GenreRef>>,
}

/// Payload of a successful login or signup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthPayload {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Payload of the refresh-token endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshPayload {
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Forgot-password request
#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Verification of the emailed reset code
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResetRequest {
    pub email: String,
    pub code: String,
}

/// Final step of the reset flow
#[derive(Debug, Clone, Serialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

// =============================================================================
// Movie Models
// =============================================================================

/// Movie or show as listed in search, popular and favourites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default, alias = "first_air_date")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub genre_ids: Vec<u64>,
}

impl Movie {
    /// Release year parsed from `release_date`
    pub fn year(&self) -> Option<u16> {
        self.release_date.as_deref().and_then(extract_year)
    }
}

impl fmt::Display for Movie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year_str = self.year().map(|y| format!(" ({})", y)).unwrap_or_default();
        write!(f, "{}{} - ⭐ {:.1}", self.title, year_str, self.vote_average)
    }
}

/// Genre as returned by the genres endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

/// Detailed movie information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: u64,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub is_favourite: bool,
}

impl fmt::Display for MovieDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = self
            .release_date
            .as_deref()
            .and_then(extract_year)
            .map(|y| y.to_string())
            .unwrap_or_else(|| "----".to_string());
        match self.runtime {
            Some(runtime) => write!(
                f,
                "{} ({}) - {}h {}m - ⭐ {:.1}",
                self.title,
                year,
                runtime / 60,
                runtime % 60,
                self.vote_average
            ),
            None => write!(f, "{} ({}) - ⭐ {:.1}", self.title, year, self.vote_average),
        }
    }
}

/// One page of a listing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Paginated<T> {
    #[serde(default)]
    pub results: Vec<T>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

impl<T> Default for Paginated<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            page: 1,
            total_pages: 1,
            total_results: 0,
        }
    }
}

fn first_page() -> u32 {
    1
}

// =============================================================================
// Profile Models
// =============================================================================

/// Editable profile fields; unset fields are left untouched server-side
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<GenreRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maturity_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
}

/// Authenticated password change
#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// In-app notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_read { " " } else { "•" };
        write!(f, "{} {} - {}", marker, self.title, self.message)
    }
}

/// Health endpoint payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Extract year from a date string like "2022-03-04"
pub fn extract_year(date: &str) -> Option<u16> {
    date.get(..4).and_then(|y| y.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paginated_movies_fill_missing_fields() {
        let page: Paginated<Movie> =
            serde_json::from_value(json!({"results": [{"id": 1, "title": "Heat"}]})).unwrap();
        assert_eq!(page.results[0].title, "Heat");
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);

        let empty: Paginated<Movie> = serde_json::from_value(json!({})).unwrap();
        assert!(empty.results.is_empty());
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("2022-03-04"), Some(2022));
        assert_eq!(extract_year(""), None);
        assert_eq!(extract_year("abc"), None);
    }

    #[test]
    fn test_user_accepts_numeric_id() {
        let user: User = serde_json::from_value(json!({"id": 42, "email": "a@b.com"})).unwrap();
        assert_eq!(user.id, "42");
        assert!(user.name.is_none());
    }

    #[test]
    fn test_user_mixed_genres() {
        let user: User = serde_json::from_value(json!({
            "id": "1",
            "email": "a@b.com",
            "genres": [28, "Drama"]
        }))
        .unwrap();
        assert_eq!(
            user.genres,
            Some(vec![GenreRef::Id(28), GenreRef::Name("Drama".into())])
        );
    }

    #[test]
    fn test_format_details_sorted_and_joined() {
        let mut details = BTreeMap::new();
        details.insert("password".to_string(), vec!["Too short".into(), "Too common".into()]);
        details.insert("email".to_string(), vec!["Invalid email".into()]);
        assert_eq!(
            format_details(&details),
            "email: Invalid email; password: Too short, Too common"
        );
    }

    #[test]
    fn test_form_errors_field_only_has_no_toast() {
        let err: ApiError = serde_json::from_value(json!({
            "success": false,
            "message": "email: Invalid email",
            "data": {},
            "error": {"details": {"email": ["Invalid email"]}}
        }))
        .unwrap();
        let form = FormErrors::from(&err);
        assert_eq!(form.field("email"), Some("Invalid email"));
        assert!(form.toast.is_none());
    }

    #[test]
    fn test_form_errors_non_field_bucket_becomes_toast() {
        let mut details = BTreeMap::new();
        details.insert(NON_FIELD_ERRORS.to_string(), vec!["Bad credentials".into()]);
        let err = ApiError {
            error: Some(ErrorBody {
                details: Some(details),
                ..Default::default()
            }),
            ..ApiError::new("non_field_errors: Bad credentials")
        };
        let form = FormErrors::from(&err);
        assert!(form.fields.is_empty());
        assert_eq!(form.toast.as_deref(), Some("Bad credentials"));
    }

    #[test]
    fn test_form_errors_without_details_uses_message() {
        let form = FormErrors::from(&ApiError::new("Server exploded"));
        assert_eq!(form.toast.as_deref(), Some("Server exploded"));
    }

    #[test]
    fn test_movie_display() {
        let movie: Movie = serde_json::from_value(json!({
            "id": 1,
            "title": "Dune",
            "release_date": "2021-10-22",
            "vote_average": 7.8
        }))
        .unwrap();
        assert_eq!(movie.to_string(), "Dune (2021) - ⭐ 7.8");
    }
}
