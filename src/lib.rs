//! CineMate - client core for the CineMate movie discovery app
//!
//! Token-authenticated REST access with one-shot refresh, a session store
//! that owns the signed-in user, and the timing controller behind the home
//! carousel.
//!
//! # Modules
//!
//! - `models` - Response envelope, users, movies, profile payloads
//! - `storage` - Key-value persistence and the stored credential pair
//! - `api` - HTTP client core and endpoint facades
//! - `session` - Login/signup/logout/restore flows and session state
//! - `slider` - Carousel autoplay and gesture state machine
//! - `config` - Config file and environment overrides
//! - `cli` / `commands` - Command-line surface

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod session;
pub mod slider;
pub mod storage;

// Re-export commonly used types
pub use models::{
    ApiError, ApiResponse, ApiResult, FormErrors, Genre, GenreRef, Movie, MovieDetail,
    Notification, Paginated, User,
};

pub use api::{ApiClient, ApiRequest, ClientOptions};
pub use session::{Navigator, Notifier, Route, Session, SessionPhase, SessionStore};
pub use slider::{SliderConfig, SliderController};
pub use storage::{CredentialStore, FileStore, KeyValueStore, MemoryStore};
