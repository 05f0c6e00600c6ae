//! CineMate API client and typed endpoint facades
//!
//! - `client`: HTTP core (auth header, refresh-and-retry, normalization)
//! - `auth`: login, signup, logout, password reset
//! - `movies`: search, listings, details, favourites, genres
//! - `profile`: profile info, password change, notifications
//! - `system`: health check

pub mod auth;
pub mod client;
pub mod movies;
pub mod profile;
pub mod system;

pub use client::{
    ApiClient, ApiRequest, ClientOptions, SessionExpiryHandler, DEFAULT_BASE_URL,
    DEFAULT_PLATFORM, DEFAULT_TIMEOUT, REFRESH_ENDPOINT,
};
pub use movies::SearchQuery;
