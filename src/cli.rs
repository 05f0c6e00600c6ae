//! CLI - Command Line Interface for CineMate
//!
//! Every account and discovery flow of the app is scriptable.
//! Output is JSON when `--json` is given or stdout is not a terminal.
//!
//! # Examples
//!
//! ```bash
//! cinemate login a@b.com --password hunter2
//! cinemate search "blade runner" --year 1982
//! cinemate favourites add 78
//! cinemate spotlight --slides 5
//! ```

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fmt::Display;
use std::io::IsTerminal;
use std::path::PathBuf;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error (server rejected the request)
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error (timeout, offline)
    NetworkError = 3,
    /// Command needs a signed-in session
    AuthRequired = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// CineMate - movie discovery from the terminal
#[derive(Parser, Debug)]
#[command(
    name = "cinemate",
    version,
    about = "Movie discovery, favourites and profile management",
    after_help = "EXAMPLES:\n\
                  cinemate login a@b.com -p secret     Sign in\n\
                  cinemate popular --limit 10          Popular titles\n\
                  cinemate details 603 --json          Details as JSON\n\
                  cinemate spotlight                   Autoplay popular titles"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Verbose logging to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with email and password
    Login(LoginCmd),

    /// Create an account
    Signup(SignupCmd),

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// View or edit the profile
    Profile(ProfileCmd),

    /// Change or reset the password
    #[command(visible_alias = "pw")]
    Password(PasswordCmd),

    /// Search movies and shows
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// Popular titles
    Popular(ListCmd),

    /// Upcoming releases
    ComingSoon(ListCmd),

    /// Personalised recommendations
    #[command(visible_alias = "recs")]
    Recommendations(ListCmd),

    /// Details for a title
    #[command(visible_alias = "i")]
    Details(DetailsCmd),

    /// Manage favourites
    #[command(visible_alias = "fav")]
    Favourites(FavouritesCmd),

    /// List genres
    Genres,

    /// Notifications
    Notifications(NotificationsCmd),

    /// Check backend health
    Health,

    /// Autoplay popular titles like the home carousel
    Spotlight(SpotlightCmd),
}

// =============================================================================
// Account Commands
// =============================================================================

#[derive(Args, Debug)]
pub struct LoginCmd {
    pub email: String,

    #[arg(long, short = 'p')]
    pub password: String,
}

#[derive(Args, Debug)]
pub struct SignupCmd {
    pub email: String,

    #[arg(long, short = 'p')]
    pub password: String,

    /// Display name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Favourite genres (ids or names)
    #[arg(long, short = 'g', value_delimiter = ',')]
    pub genres: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ProfileCmd {
    #[command(subcommand)]
    pub action: ProfileAction,
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    /// Fetch the profile from the server
    Show,
    /// Update profile fields
    Update(ProfileUpdateArgs),
}

#[derive(Args, Debug, Default)]
pub struct ProfileUpdateArgs {
    #[arg(long)]
    pub name: Option<String>,

    /// Preferred language code (e.g. en, es)
    #[arg(long)]
    pub language: Option<String>,

    /// Maturity filter (e.g. all, teen, adult)
    #[arg(long)]
    pub maturity: Option<String>,

    #[arg(long, value_delimiter = ',')]
    pub genres: Option<Vec<String>>,
}

impl ProfileUpdateArgs {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.language.is_none()
            && self.maturity.is_none()
            && self.genres.is_none()
    }
}

#[derive(Args, Debug)]
pub struct PasswordCmd {
    #[command(subcommand)]
    pub action: PasswordAction,
}

#[derive(Subcommand, Debug)]
pub enum PasswordAction {
    /// Change password while signed in
    Change {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
    /// Email a reset code
    Forgot { email: String },
    /// Verify a reset code
    Verify { email: String, code: String },
    /// Set a new password with a verified code
    Reset {
        email: String,
        code: String,
        #[arg(long)]
        new: String,
    },
}

// =============================================================================
// Discovery Commands
// =============================================================================

#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Search query (title, keywords)
    #[arg(required = true)]
    pub query: String,

    #[arg(long)]
    pub page: Option<u32>,

    /// Genre id filter
    #[arg(long, short = 'g')]
    pub genre: Option<u64>,

    /// Release year filter
    #[arg(long, short = 'y')]
    pub year: Option<u16>,

    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct ListCmd {
    #[arg(long)]
    pub page: Option<u32>,

    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct DetailsCmd {
    /// Movie id
    pub id: u64,
}

#[derive(Args, Debug)]
pub struct FavouritesCmd {
    #[command(subcommand)]
    pub action: Option<FavouritesAction>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum FavouritesAction {
    /// List favourites (default)
    List,
    /// Add a movie by id
    Add { id: u64 },
    /// Remove a movie by id
    Remove { id: u64 },
}

#[derive(Args, Debug)]
pub struct NotificationsCmd {
    #[command(subcommand)]
    pub action: Option<NotificationsAction>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum NotificationsAction {
    /// List notifications (default)
    List,
    /// Mark notifications read; no ids marks all
    Read { ids: Vec<String> },
}

#[derive(Args, Debug)]
pub struct SpotlightCmd {
    /// Number of slide changes to show before exiting
    #[arg(long, default_value = "5")]
    pub slides: usize,

    /// Autoplay interval in milliseconds (overrides config)
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

// =============================================================================
// JSON Output
// =============================================================================

/// JSON envelope for CLI output
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonError>,
}

#[derive(Debug, Serialize)]
pub struct JsonError {
    pub message: String,
    pub code: i32,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl JsonOutput<()> {
    pub fn error_msg(message: &str, code: ExitCode) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(JsonError {
                message: message.to_string(),
                code: code.into(),
            }),
        }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print a list: JSON array, or one line per item
    pub fn list<T: Serialize + Display>(&self, items: &[T]) -> anyhow::Result<()> {
        if self.json {
            return self.print(items);
        }
        if items.is_empty() && !self.quiet {
            eprintln!("Nothing to show");
        }
        for item in items {
            println!("{}", item);
        }
        Ok(())
    }

    /// Print a single item: JSON object, or its display form
    pub fn item<T: Serialize + Display>(&self, item: &T) -> anyhow::Result<()> {
        if self.json {
            return self.print(item);
        }
        println!("{}", item);
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Input Validation
// =============================================================================

/// Loose email shape check before hitting the server
pub fn validate_email(email: &str) -> Result<&str, &'static str> {
    let valid = email
        .split_once('@')
        .map(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        })
        .unwrap_or(false);

    if valid && !email.contains(char::is_whitespace) {
        Ok(email)
    } else {
        Err("Invalid email address")
    }
}
