//! CineMate - movie discovery from the terminal
//!
//! Drives the CineMate client core (authenticated API client, session store,
//! carousel controller) from the command line.
//!
//! # Usage
//!
//! ```bash
//! cinemate login a@b.com -p secret
//! cinemate popular --limit 5
//! cinemate favourites add 603
//! RUST_LOG=cinemate=debug cinemate whoami
//! ```

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cinemate::cli::{self, Cli, Command, ExitCode, Output};
use cinemate::commands::{self, ConsoleNavigator, ConsoleNotifier, Listing};
use cinemate::config::Config;
use cinemate::session::SessionStore;
use cinemate::storage::FileStore;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = run_cli(cli).await;
    std::process::exit(exit_code.into());
}

/// Log to stderr; RUST_LOG wins over --verbose
fn init_tracing(verbose: bool) {
    let default = if verbose { "cinemate=debug" } else { "cinemate=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);

    let config = match &cli.config {
        Some(path) => Config::load_from(path).with_env_overrides(),
        None => Config::load(),
    };

    match &cli.command {
        Command::Login(cmd) => {
            if let Err(e) = cli::validate_email(&cmd.email) {
                return output.error(e, ExitCode::InvalidArgs);
            }
        }
        Command::Signup(cmd) => {
            if let Err(e) = cli::validate_email(&cmd.email) {
                return output.error(e, ExitCode::InvalidArgs);
            }
        }
        _ => {}
    }

    let store = Arc::new(FileStore::new(config.store_path()));
    tracing::debug!(path = %store.path().display(), "Using session store");

    let session = SessionStore::new(
        config.client_options(),
        store,
        Arc::new(ConsoleNavigator),
        Arc::new(ConsoleNotifier::new(output)),
    );
    session.initialize().await;

    match cli.command {
        Command::Login(cmd) => commands::login_cmd(cmd, &session, &output).await,

        Command::Signup(cmd) => commands::signup_cmd(cmd, &session, &output).await,

        Command::Logout => commands::logout_cmd(&session, &output).await,

        Command::Whoami => commands::whoami_cmd(&session, &output).await,

        Command::Profile(cmd) => commands::profile_cmd(cmd.action, &session, &output).await,

        Command::Password(cmd) => commands::password_cmd(cmd.action, &session, &output).await,

        Command::Search(cmd) => commands::search_cmd(cmd, &session, &output).await,

        Command::Popular(cmd) => {
            commands::listing_cmd(Listing::Popular, cmd, &session, &output).await
        }

        Command::ComingSoon(cmd) => {
            commands::listing_cmd(Listing::ComingSoon, cmd, &session, &output).await
        }

        Command::Recommendations(cmd) => {
            commands::listing_cmd(Listing::Recommendations, cmd, &session, &output).await
        }

        Command::Details(cmd) => commands::details_cmd(cmd.id, &session, &output).await,

        Command::Favourites(cmd) => commands::favourites_cmd(cmd.action, &session, &output).await,

        Command::Genres => commands::genres_cmd(&session, &output).await,

        Command::Notifications(cmd) => {
            commands::notifications_cmd(cmd.action, &session, &output).await
        }

        Command::Health => commands::health_cmd(&session, &output).await,

        Command::Spotlight(cmd) => commands::spotlight_cmd(cmd, &config, &session, &output).await,
    }
}
