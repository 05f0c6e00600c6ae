//! CLI Command Handlers
//!
//! Implements all CLI commands on top of the session store and API client.
//! Each handler takes CLI args and Output, returns ExitCode.

use std::time::Duration;

use crate::api::SearchQuery;
use crate::cli::{
    ExitCode, FavouritesAction, ListCmd, LoginCmd, NotificationsAction, Output, PasswordAction,
    ProfileAction, ProfileUpdateArgs, SearchCmd, SignupCmd, SpotlightCmd,
};
use crate::config::Config;
use crate::models::{
    ApiError, ChangePasswordRequest, GenreRef, LoginRequest, Movie, ProfileUpdate,
    ResetPasswordRequest, SignupRequest, VerifyResetRequest,
};
use crate::session::{Navigator, Notifier, Route, SessionError, SessionStore};
use crate::slider::{self, SliderController, SliderEffect, SliderInput};

// =============================================================================
// Console Collaborators
// =============================================================================

/// Logs navigation instead of switching screens
#[derive(Debug, Default)]
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!(route = %route, "Navigate");
    }
}

/// Prints alerts to stderr
#[derive(Debug)]
pub struct ConsoleNotifier {
    output: Output,
}

impl ConsoleNotifier {
    pub fn new(output: Output) -> Self {
        Self { output }
    }
}

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        self.output.info(format!("✓ {}", message));
    }

    fn error(&self, message: &str) {
        if !self.output.quiet {
            eprintln!("✗ {}", message);
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn api_exit_code(err: &ApiError) -> ExitCode {
    if err.is_transport() {
        ExitCode::NetworkError
    } else {
        ExitCode::Error
    }
}

fn fail(output: &Output, context: &str, err: &ApiError) -> ExitCode {
    output.error(format!("{}: {}", context, err), api_exit_code(err))
}

/// Field-level errors are printed; the aggregate was already alerted
fn session_fail(output: &Output, err: &SessionError) -> ExitCode {
    let form = err.form_errors();
    for (field, message) in &form.fields {
        output.info(format!("  {}: {}", field, message));
    }
    let code = match err {
        SessionError::Api(e) => api_exit_code(e),
        _ => ExitCode::Error,
    };
    output.error(err.to_string(), code)
}

fn emit(output: &Output, result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
    }
}

fn require_session(session: &SessionStore, output: &Output) -> Result<(), ExitCode> {
    if session.session().is_authenticated() {
        Ok(())
    } else {
        Err(output.error(
            "Not signed in. Run `cinemate login <email> -p <password>` first",
            ExitCode::AuthRequired,
        ))
    }
}

fn parse_genres(raw: &[String]) -> Vec<GenreRef> {
    raw.iter()
        .map(|g| match g.trim().parse::<u64>() {
            Ok(id) => GenreRef::Id(id),
            Err(_) => GenreRef::Name(g.trim().to_string()),
        })
        .collect()
}

// =============================================================================
// Account Commands
// =============================================================================

pub async fn login_cmd(cmd: LoginCmd, session: &SessionStore, output: &Output) -> ExitCode {
    let request = LoginRequest {
        email: cmd.email,
        password: cmd.password,
    };

    if session.login(&request).await {
        let user = session.session().user;
        output.info("Signed in");
        emit(output, output.print(&user))
    } else {
        let message = session
            .session()
            .last_error
            .unwrap_or_else(|| "Login failed".to_string());
        output.error(message, ExitCode::Error)
    }
}

pub async fn signup_cmd(cmd: SignupCmd, session: &SessionStore, output: &Output) -> ExitCode {
    let genres = (!cmd.genres.is_empty()).then(|| parse_genres(&cmd.genres));
    let request = SignupRequest {
        name: cmd.name,
        email: cmd.email,
        password: cmd.password,
        genres,
    };

    match session.signup(&request).await {
        Ok(user) => emit(output, output.print(&user)),
        Err(e) => session_fail(output, &e),
    }
}

pub async fn logout_cmd(session: &SessionStore, output: &Output) -> ExitCode {
    session.logout().await;
    output.info("Signed out");
    ExitCode::Success
}

pub async fn whoami_cmd(session: &SessionStore, output: &Output) -> ExitCode {
    if let Err(code) = require_session(session, output) {
        return code;
    }
    match session.session().user {
        Some(user) => emit(output, output.item(&user)),
        None => output.error("No user in session", ExitCode::AuthRequired),
    }
}

pub async fn profile_cmd(action: ProfileAction, session: &SessionStore, output: &Output) -> ExitCode {
    if let Err(code) = require_session(session, output) {
        return code;
    }

    match action {
        ProfileAction::Show => match session.client().profile_info().await {
            Ok(res) => emit(output, output.print(&res.data)),
            Err(e) => fail(output, "Profile", &e),
        },
        ProfileAction::Update(args) => {
            if args.is_empty() {
                return output.error("Nothing to update", ExitCode::InvalidArgs);
            }
            match session.update_profile(&profile_update(args)).await {
                Ok(user) => emit(output, output.print(&user)),
                Err(e) => session_fail(output, &e),
            }
        }
    }
}

fn profile_update(args: ProfileUpdateArgs) -> ProfileUpdate {
    ProfileUpdate {
        name: args.name,
        genres: args.genres.as_deref().map(parse_genres),
        maturity_filter: args.maturity,
        preferred_language: args.language,
    }
}

pub async fn password_cmd(action: PasswordAction, session: &SessionStore, output: &Output) -> ExitCode {
    let result = match action {
        PasswordAction::Change { old, new } => {
            if let Err(code) = require_session(session, output) {
                return code;
            }
            session
                .change_password(&ChangePasswordRequest {
                    old_password: old,
                    new_password: new,
                })
                .await
        }
        PasswordAction::Forgot { email } => session.forgot_password(&email).await,
        PasswordAction::Verify { email, code } => {
            session
                .verify_password_reset(&VerifyResetRequest { email, code })
                .await
        }
        PasswordAction::Reset { email, code, new } => {
            session
                .change_password_with_reset(&ResetPasswordRequest {
                    email,
                    code,
                    new_password: new,
                })
                .await
        }
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => session_fail(output, &e),
    }
}

// =============================================================================
// Discovery Commands
// =============================================================================

pub async fn search_cmd(cmd: SearchCmd, session: &SessionStore, output: &Output) -> ExitCode {
    output.info(format!("Searching for: {}", cmd.query));

    let query = SearchQuery {
        query: cmd.query,
        page: cmd.page,
        genre: cmd.genre,
        year: cmd.year,
    };

    match session.client().search(&query).await {
        Ok(res) => {
            let mut results = res.data.results;
            results.truncate(cmd.limit);
            emit(output, output.list(&results))
        }
        Err(e) => fail(output, "Search failed", &e),
    }
}

/// Which curated listing to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Popular,
    ComingSoon,
    Recommendations,
}

pub async fn listing_cmd(
    listing: Listing,
    cmd: ListCmd,
    session: &SessionStore,
    output: &Output,
) -> ExitCode {
    let client = session.client();
    let result = match listing {
        Listing::Popular => client.popular(cmd.page).await,
        Listing::ComingSoon => client.coming_soon(cmd.page).await,
        Listing::Recommendations => {
            if let Err(code) = require_session(session, output) {
                return code;
            }
            client.recommendations(cmd.page).await
        }
    };

    match result {
        Ok(res) => {
            let mut results = res.data.results;
            results.truncate(cmd.limit);
            emit(output, output.list(&results))
        }
        Err(e) => fail(output, "Listing failed", &e),
    }
}

pub async fn details_cmd(id: u64, session: &SessionStore, output: &Output) -> ExitCode {
    match session.client().details(id).await {
        Ok(res) => emit(output, output.item(&res.data)),
        Err(e) => fail(output, "Details failed", &e),
    }
}

pub async fn favourites_cmd(
    action: Option<FavouritesAction>,
    session: &SessionStore,
    output: &Output,
) -> ExitCode {
    if let Err(code) = require_session(session, output) {
        return code;
    }
    let client = session.client();

    match action.unwrap_or(FavouritesAction::List) {
        FavouritesAction::List => match client.favourites().await {
            Ok(res) => emit(output, output.list(&res.data)),
            Err(e) => fail(output, "Favourites", &e),
        },
        FavouritesAction::Add { id } => match client.add_favourite(id).await {
            Ok(res) => {
                output.info(res.message);
                ExitCode::Success
            }
            Err(e) => fail(output, "Add favourite", &e),
        },
        FavouritesAction::Remove { id } => match client.remove_favourite(id).await {
            Ok(res) => {
                output.info(res.message);
                ExitCode::Success
            }
            Err(e) => fail(output, "Remove favourite", &e),
        },
    }
}

pub async fn genres_cmd(session: &SessionStore, output: &Output) -> ExitCode {
    match session.client().genres().await {
        Ok(res) => {
            if output.json {
                return emit(output, output.print(&res.data));
            }
            for genre in &res.data {
                println!("{:>6}  {}", genre.id, genre.name);
            }
            ExitCode::Success
        }
        Err(e) => fail(output, "Genres", &e),
    }
}

pub async fn notifications_cmd(
    action: Option<NotificationsAction>,
    session: &SessionStore,
    output: &Output,
) -> ExitCode {
    if let Err(code) = require_session(session, output) {
        return code;
    }
    let client = session.client();

    match action.unwrap_or(NotificationsAction::List) {
        NotificationsAction::List => match client.notifications().await {
            Ok(res) => emit(output, output.list(&res.data)),
            Err(e) => fail(output, "Notifications", &e),
        },
        NotificationsAction::Read { ids } => match client.mark_notifications_read(&ids).await {
            Ok(res) => {
                output.info(res.message);
                ExitCode::Success
            }
            Err(e) => fail(output, "Mark read", &e),
        },
    }
}

pub async fn health_cmd(session: &SessionStore, output: &Output) -> ExitCode {
    match session.client().health().await {
        Ok(res) => emit(output, output.print(&res.data)),
        Err(e) => fail(output, "Health check failed", &e),
    }
}

// =============================================================================
// Spotlight Command
// =============================================================================

/// Autoplay popular titles through the carousel controller
pub async fn spotlight_cmd(
    cmd: SpotlightCmd,
    config: &Config,
    session: &SessionStore,
    output: &Output,
) -> ExitCode {
    let movies: Vec<Movie> = match session.client().popular(None).await {
        Ok(res) => res.data.results,
        Err(e) => return fail(output, "Spotlight", &e),
    };
    if movies.is_empty() {
        return output.error("No titles to show", ExitCode::Error);
    }

    if movies.len() < 2 {
        return emit(output, output.list(&movies));
    }

    let mut slider_config = config.slider_config();
    if let Some(ms) = cmd.interval_ms {
        slider_config.autoplay_interval = Duration::from_millis(ms);
    }

    // Without looping autoplay halts on the last title
    let slides = if slider_config.loop_items {
        cmd.slides
    } else {
        cmd.slides.min(movies.len() - 1)
    };

    let (handle, mut effects) = slider::spawn(SliderController::new(slider_config, movies.len()));
    handle.send(SliderInput::Layout);

    let mut shown = vec![movies[0].clone()];
    output.info(format!("▶ {}", movies[0]));

    while shown.len() <= slides {
        let Some(effect) = effects.recv().await else {
            break;
        };
        if let SliderEffect::SlideChanged(index) = effect {
            if let Some(movie) = movies.get(index) {
                output.info(format!("▶ {}", movie));
                shown.push(movie.clone());
            }
        }
    }

    if let Some(state) = handle.shutdown().await {
        tracing::debug!(index = state.current_index, "Spotlight finished");
    }

    if output.json {
        return emit(output, output.print(&shown));
    }
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_genres_mixes_ids_and_names() {
        let genres = parse_genres(&["28".into(), " Drama ".into()]);
        assert_eq!(genres, vec![GenreRef::Id(28), GenreRef::Name("Drama".into())]);
    }

    #[test]
    fn test_profile_update_maps_fields() {
        let update = profile_update(ProfileUpdateArgs {
            name: Some("Ada".into()),
            language: Some("en".into()),
            maturity: None,
            genres: Some(vec!["12".into()]),
        });
        assert_eq!(update.name.as_deref(), Some("Ada"));
        assert_eq!(update.preferred_language.as_deref(), Some("en"));
        assert_eq!(update.genres, Some(vec![GenreRef::Id(12)]));
        assert!(update.maturity_filter.is_none());
    }

    #[test]
    fn test_api_exit_code() {
        let offline = ApiError::with_code("x", crate::models::codes::NETWORK_ERROR, "offline");
        assert_eq!(api_exit_code(&offline), ExitCode::NetworkError);
        assert_eq!(api_exit_code(&ApiError::new("nope")), ExitCode::Error);
    }
}
