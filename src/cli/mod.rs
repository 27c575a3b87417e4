//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;
pub mod prompt;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;

use crate::clipboard::SystemClipboard;
use crate::config::{Settings, StoreBackend};
use crate::controller::{ControllerOptions, KeyTableController, Notification, Outcome};
use crate::errors::{KeydashError, Result};
use crate::identity::SessionIdentity;
use crate::keys::{SortColumn, SortDirection, SortState};
use crate::logging::{init_logging, LoggingConfig};
use crate::store::RecordStore;

/// Maximum accepted length of a user id.
const MAX_USER_ID_LEN: usize = 128;

/// Keydash CLI: manage API keys from the terminal.
#[derive(Parser)]
#[command(name = "keydash", about = "Terminal dashboard for managing API keys", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// User whose keys to manage
    #[arg(short, long, env = "KEYDASH_USER_ID", global = true)]
    pub user: Option<String>,

    /// SQLite database path (overrides .keydash.toml)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Directory containing .keydash.toml (default: current directory)
    #[arg(long, default_value = ".", global = true)]
    pub project_dir: String,

    /// Log filter, e.g. `debug` or `keydash=trace`
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// List API keys in a table
    List {
        /// Column to sort by: name, key, limit, usage
        #[arg(short, long)]
        sort: Option<SortColumn>,
        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,
    },

    /// Create a new API key
    Create {
        /// A unique name to identify this key
        #[arg(short, long)]
        name: Option<String>,
        /// Key value (omit for interactive prompt)
        #[arg(short, long, conflicts_with = "generate")]
        secret: Option<String>,
        /// Generate a random pk_live_ key instead of entering one
        #[arg(long)]
        generate: bool,
        /// Monthly request limit (unlimited if omitted)
        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// Edit an API key (interactive when no flags are given)
    Edit {
        /// Key id
        id: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New key value
        #[arg(short, long)]
        secret: Option<String>,
        /// New monthly request limit
        #[arg(short, long, conflicts_with = "unlimited")]
        limit: Option<u64>,
        /// Remove the monthly limit
        #[arg(long)]
        unlimited: bool,
    },

    /// Show the full value of an API key
    View {
        /// Key id
        id: String,
        /// Copy the key to the clipboard after showing it
        #[arg(long)]
        copy: bool,
    },

    /// Copy an API key to the clipboard
    Copy {
        /// Key id
        id: String,
    },

    /// Delete an API key
    Delete {
        /// Key id
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Interactive dashboard (create, edit, view, copy, delete, sort)
    Dashboard,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Everything a command needs to talk to the table.
pub struct AppContext {
    pub settings: Settings,
    pub identity: Arc<SessionIdentity>,
    pub controller: KeyTableController,
}

/// Load settings, set up logging, open the store and sign in.
pub fn build_context(cli: &Cli) -> Result<AppContext> {
    let project_dir = PathBuf::from(&cli.project_dir);
    let settings = Settings::load(&project_dir)?;

    init_logging(&LoggingConfig {
        level: cli
            .log_level
            .clone()
            .unwrap_or_else(|| settings.log_level.clone()),
        format: settings.log_format,
    });

    let user_id = resolve_user(cli, &settings)?;
    let store = open_store(cli, &settings, &project_dir)?;
    let identity = Arc::new(SessionIdentity::signed_in(user_id));
    let options: ControllerOptions = settings.controller_options()?;

    let controller = KeyTableController::new(
        store,
        identity.clone(),
        Arc::new(SystemClipboard::new()),
        options,
    );

    Ok(AppContext {
        settings,
        identity,
        controller,
    })
}

/// The user to sign in as: `--user` / `KEYDASH_USER_ID`, then config.
pub fn resolve_user(cli: &Cli, settings: &Settings) -> Result<String> {
    let user_id = cli
        .user
        .clone()
        .or_else(|| settings.user_id.clone())
        .ok_or(KeydashError::NoSession)?;
    validate_user_id(&user_id)?;
    Ok(user_id)
}

/// Open the record store selected in the settings.
pub fn open_store(
    cli: &Cli,
    settings: &Settings,
    project_dir: &std::path::Path,
) -> Result<Arc<dyn RecordStore>> {
    match settings.backend {
        StoreBackend::Sqlite => open_sqlite(cli, settings, project_dir),
        StoreBackend::Rest => open_rest(settings),
    }
}

#[cfg(feature = "sqlite-store")]
fn open_sqlite(
    cli: &Cli,
    settings: &Settings,
    project_dir: &std::path::Path,
) -> Result<Arc<dyn RecordStore>> {
    let path = match &cli.db {
        Some(db) => PathBuf::from(db),
        None => settings.database_path(project_dir),
    };
    tracing::debug!(path = %path.display(), "opening sqlite store");
    Ok(Arc::new(crate::store::SqliteStore::open(&path)?))
}

#[cfg(not(feature = "sqlite-store"))]
fn open_sqlite(
    _cli: &Cli,
    _settings: &Settings,
    _project_dir: &std::path::Path,
) -> Result<Arc<dyn RecordStore>> {
    Err(KeydashError::Config(
        "this build has no sqlite backend — rebuild with `--features sqlite-store`".into(),
    ))
}

#[cfg(feature = "rest-store")]
fn open_rest(settings: &Settings) -> Result<Arc<dyn RecordStore>> {
    let base_url = settings
        .rest_url
        .clone()
        .ok_or_else(|| KeydashError::Config("rest_url is not set".into()))?;
    let config = crate::store::RestStoreConfig {
        base_url,
        anon_key: settings.rest_anon_key.clone().unwrap_or_default(),
        access_token: std::env::var("KEYDASH_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.is_empty()),
        table: settings.rest_table.clone(),
    };
    Ok(Arc::new(crate::store::RestStore::new(config)?))
}

#[cfg(not(feature = "rest-store"))]
fn open_rest(_settings: &Settings) -> Result<Arc<dyn RecordStore>> {
    Err(KeydashError::Config(
        "this build has no rest backend — rebuild with `--features rest-store`".into(),
    ))
}

/// Print the info notifications raised so far and turn the outcome into
/// a command result. A failure is reported through the returned error,
/// using the notification text when there is one.
pub fn settle<T>(
    outcome: Outcome<T>,
    notices: &mut broadcast::Receiver<Notification>,
) -> Result<Option<T>> {
    let mut failure = None;
    while let Ok(notification) = notices.try_recv() {
        if notification.is_error() {
            failure = Some(notification.message);
        } else {
            output::notification(&notification);
        }
    }

    match outcome {
        Outcome::Done(value) => Ok(Some(value)),
        Outcome::Skipped => Ok(None),
        Outcome::Failed(message) => Err(KeydashError::Operation(failure.unwrap_or(message))),
    }
}

/// Click `column` until the table is sorted the requested way.
pub fn apply_sort(controller: &KeyTableController, column: SortColumn, descending: bool) {
    let direction = if descending {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    };
    let target = SortState::new(column, direction);

    // At most three clicks reach any state of a column.
    for _ in 0..3 {
        if controller.sort_state() == target {
            break;
        }
        controller.set_sort(column);
    }
}

/// Validate that a user id is safe and sensible.
///
/// Must be non-empty, at most 128 characters, and free of whitespace and
/// control characters. This catches shell-quoting mistakes before they
/// reach the backend filter.
pub fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.is_empty() {
        return Err(KeydashError::Validation("user id cannot be empty".into()));
    }

    if user_id.chars().count() > MAX_USER_ID_LEN {
        return Err(KeydashError::Validation(format!(
            "user id cannot exceed {MAX_USER_ID_LEN} characters"
        )));
    }

    if user_id
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(KeydashError::Validation(format!(
            "user id '{}' is invalid — whitespace and control characters are not allowed",
            user_id.escape_default()
        )));
    }

    Ok(())
}
