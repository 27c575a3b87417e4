use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::controller::ControllerOptions;
use crate::errors::{KeydashError, Result};
use crate::keys::{SortColumn, SortDirection, SortState};

/// Which record store the CLI talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local SQLite database.
    Sqlite,
    /// Hosted PostgREST endpoint.
    Rest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

/// Project-level configuration, loaded from `.keydash.toml`.
///
/// Every field has a sensible default so Keydash works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Record store backend (default: sqlite).
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// SQLite database path, relative to the project root.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Base URL of the hosted backend (rest backend only).
    #[serde(default)]
    pub rest_url: Option<String>,

    /// Public anon key of the hosted backend (rest backend only).
    #[serde(default)]
    pub rest_anon_key: Option<String>,

    /// Table holding the keys.
    #[serde(default = "default_rest_table")]
    pub rest_table: String,

    /// User to sign in as when `--user` is not given.
    #[serde(default)]
    pub user_id: Option<String>,

    /// How long "Copied!" / "Added!" markers stay visible.
    #[serde(default = "default_marker_ttl_ms")]
    pub marker_ttl_ms: u64,

    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Column the table opens sorted by.
    #[serde(default = "default_sort_column")]
    pub default_sort_column: String,

    /// asc, desc or none.
    #[serde(default = "default_sort_direction")]
    pub default_sort_direction: String,

    /// Key prefixes treated as public when masking (`pk_live_******`).
    #[serde(default = "default_public_prefixes")]
    pub public_prefixes: Vec<String>,

    /// Plan shown on the usage card.
    #[serde(default = "default_plan_name")]
    pub plan_name: String,

    /// Combined monthly request allowance of the plan.
    #[serde(default = "default_plan_request_limit")]
    pub plan_request_limit: u64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_backend() -> StoreBackend {
    StoreBackend::Sqlite
}

fn default_database_path() -> String {
    ".keydash/keys.db".to_string()
}

fn default_rest_table() -> String {
    "api_keys".to_string()
}

fn default_marker_ttl_ms() -> u64 {
    600
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

fn default_sort_column() -> String {
    "name".to_string()
}

fn default_sort_direction() -> String {
    "asc".to_string()
}

fn default_public_prefixes() -> Vec<String> {
    vec!["pk".to_string()]
}

fn default_plan_name() -> String {
    "Professional".to_string()
}

fn default_plan_request_limit() -> u64 {
    1_000
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            database_path: default_database_path(),
            rest_url: None,
            rest_anon_key: None,
            rest_table: default_rest_table(),
            user_id: None,
            marker_ttl_ms: default_marker_ttl_ms(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            default_sort_column: default_sort_column(),
            default_sort_direction: default_sort_direction(),
            public_prefixes: default_public_prefixes(),
            plan_name: default_plan_name(),
            plan_request_limit: default_plan_request_limit(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".keydash.toml";

    /// Load settings from `<project_dir>/.keydash.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            KeydashError::Config(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Full path to the SQLite database.
    ///
    /// Example: `project_dir/.keydash/keys.db`
    pub fn database_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.database_path)
    }

    /// Parse the configured default sort.
    pub fn initial_sort(&self) -> Result<SortState> {
        let direction: SortDirection = self.default_sort_direction.parse()?;
        if self.default_sort_column.eq_ignore_ascii_case("none") {
            return Ok(SortState::unsorted());
        }
        let column: SortColumn = self.default_sort_column.parse()?;
        Ok(SortState::new(column, direction))
    }

    /// Convert into controller tunables.
    pub fn controller_options(&self) -> Result<ControllerOptions> {
        Ok(ControllerOptions {
            marker_ttl: Duration::from_millis(self.marker_ttl_ms),
            initial_sort: self.initial_sort()?,
            public_prefixes: self.public_prefixes.clone(),
        })
    }

    fn validate(&self) -> Result<()> {
        self.initial_sort()
            .map_err(|e| KeydashError::Config(e.to_string()))?;

        if self.backend == StoreBackend::Rest && self.rest_url.is_none() {
            return Err(KeydashError::Config(
                "backend = \"rest\" requires rest_url".into(),
            ));
        }

        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
