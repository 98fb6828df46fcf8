use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::quota::DAILY_LIMIT;
use crate::suggest::DEFAULT_CACHE_TTL_SECS;
use crate::template::Owner;
use crate::validators::{validate_endpoint_url, validate_parent_directory};

/// Status of config file loading
#[derive(Debug, Clone)]
pub enum ConfigLoadStatus {
    /// Config loaded successfully from existing file
    Loaded,
    /// Created default config file (first run)
    Created,
    /// Error occurred during loading, using defaults.
    Error(String),
}

/// Platform directories for promptforge.
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "promptforge", "promptforge")
}

/// Default location for a data file, falling back to the working directory.
fn default_data_file(name: &str) -> String {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(name).to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("./{}", name))
}

/// Chat-completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    /// The key itself is never written to the config file.
    pub api_key_env: String,
    pub daily_limit: u32,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            daily_limit: DAILY_LIMIT,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS as u64,
            timeout_secs: 30,
        }
    }
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database: String,
    pub usage_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_data_file("prompts.db"),
            usage_file: default_data_file("usage.json"),
        }
    }
}

/// Local identity used for attribution and ownership checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Default for UserConfig {
    fn default() -> Self {
        let id = env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| "local".to_string());
        Self {
            id,
            name: None,
            email: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Quiet period after the last keystroke before autocomplete fires.
    pub autocomplete_debounce_ms: u64,
    /// Minimum text length before autocomplete is requested.
    pub autocomplete_min_chars: usize,
    /// Ask before discarding unsaved changes.
    pub confirm_discard: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            autocomplete_debounce_ms: 500,
            autocomplete_min_chars: 3,
            confirm_discard: true,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
}

impl Config {
    /// Expand `~` to home directory in a path string
    pub fn expand_tilde(path: &str) -> PathBuf {
        if let Some(stripped) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(stripped);
        }
        PathBuf::from(path)
    }

    /// Get the expanded database path
    pub fn database_path(&self) -> PathBuf {
        Self::expand_tilde(&self.storage.database)
    }

    /// Get the expanded usage file path
    pub fn usage_path(&self) -> PathBuf {
        Self::expand_tilde(&self.storage.usage_file)
    }

    /// Session identity built from the `[user]` section.
    pub fn owner(&self) -> Owner {
        Owner {
            user_id: self.user.id.clone(),
            email: self.user.email.clone(),
            name: self.user.name.clone(),
        }
    }

    /// Problems worth warning about. None of them stop the app from starting.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(e) = validate_endpoint_url(&self.ai.api_url) {
            warnings.push(format!("ai.api_url: {}", e));
        }
        if self.user.id.trim().is_empty() {
            warnings.push("user.id: User id cannot be empty".to_string());
        }
        if self.ai.daily_limit == 0 {
            warnings.push("ai.daily_limit: AI features are disabled with a limit of 0".to_string());
        }
        warnings
    }

    /// Create the parent directories of the storage files.
    pub fn ensure_storage_dirs(&self) -> io::Result<()> {
        for path in [self.database_path(), self.usage_path()] {
            if validate_parent_directory(&path).is_some()
                && let Some(parent) = path.parent()
            {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Partial AI configuration for project overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialAiConfig {
    pub api_url: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub daily_limit: Option<u32>,
    pub cache_ttl_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

/// Partial storage configuration for project overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialStorageConfig {
    pub database: Option<String>,
    pub usage_file: Option<String>,
}

/// Partial user configuration for project overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialUserConfig {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Partial logging configuration for project overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialLoggingConfig {
    pub level: Option<String>,
}

/// Partial behavior configuration for project overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialBehaviorConfig {
    pub autocomplete_debounce_ms: Option<u64>,
    pub autocomplete_min_chars: Option<usize>,
    pub confirm_discard: Option<bool>,
}

/// Project-specific configuration where every field is optional.
/// Parsed from `.promptforge` files. Fields that are `None` inherit from the global config.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialConfig {
    pub ai: PartialAiConfig,
    pub storage: PartialStorageConfig,
    pub user: PartialUserConfig,
    pub logging: PartialLoggingConfig,
    pub behavior: PartialBehaviorConfig,
}

/// Merge a global config with a project-level partial config.
/// Project values override global values where present.
pub fn merge_config(global: &Config, project: &PartialConfig) -> Config {
    let ai = &project.ai;
    let storage = &project.storage;
    let user = &project.user;
    let behavior = &project.behavior;
    Config {
        ai: AiConfig {
            api_url: ai
                .api_url
                .clone()
                .unwrap_or_else(|| global.ai.api_url.clone()),
            model: ai.model.clone().unwrap_or_else(|| global.ai.model.clone()),
            api_key_env: ai
                .api_key_env
                .clone()
                .unwrap_or_else(|| global.ai.api_key_env.clone()),
            daily_limit: ai.daily_limit.unwrap_or(global.ai.daily_limit),
            cache_ttl_secs: ai.cache_ttl_secs.unwrap_or(global.ai.cache_ttl_secs),
            timeout_secs: ai.timeout_secs.unwrap_or(global.ai.timeout_secs),
        },
        storage: StorageConfig {
            database: storage
                .database
                .clone()
                .unwrap_or_else(|| global.storage.database.clone()),
            usage_file: storage
                .usage_file
                .clone()
                .unwrap_or_else(|| global.storage.usage_file.clone()),
        },
        user: UserConfig {
            id: user.id.clone().unwrap_or_else(|| global.user.id.clone()),
            name: user.name.clone().or_else(|| global.user.name.clone()),
            email: user.email.clone().or_else(|| global.user.email.clone()),
        },
        logging: LoggingConfig {
            level: project
                .logging
                .level
                .clone()
                .unwrap_or_else(|| global.logging.level.clone()),
        },
        behavior: BehaviorConfig {
            autocomplete_debounce_ms: behavior
                .autocomplete_debounce_ms
                .unwrap_or(global.behavior.autocomplete_debounce_ms),
            autocomplete_min_chars: behavior
                .autocomplete_min_chars
                .unwrap_or(global.behavior.autocomplete_min_chars),
            confirm_discard: behavior
                .confirm_discard
                .unwrap_or(global.behavior.confirm_discard),
        },
    }
}

/// Loaded configuration with metadata
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_path: PathBuf,
    pub project_config_path: Option<PathBuf>,
    pub status: ConfigLoadStatus,
    /// Set when a `.promptforge` file exists but could not be used.
    pub project_error: Option<String>,
}

/// Get the platform-appropriate config directory
fn get_config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the full path to the config file
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.promptforge in current working directory).
pub fn get_project_config_path() -> Option<PathBuf> {
    let path = std::env::current_dir().ok()?.join(".promptforge");
    if path.exists() { Some(path) } else { None }
}

/// Load a project config (.promptforge) from the given path.
/// Returns Ok(PartialConfig) on success, Err(String) on parse/read failure.
fn load_project_config(path: &Path) -> Result<PartialConfig, String> {
    let contents = fs::read_to_string(path).map_err(|e| {
        warn!(path = ?path, error = %e, "project_config_read_failed");
        format!("Failed to read .promptforge: {}", e)
    })?;

    toml::from_str::<PartialConfig>(&contents).map_err(|e| {
        warn!(path = ?path, error = %e, "project_config_parse_failed");
        format!("Invalid .promptforge: {}", e)
    })
}

/// Load configuration from file, environment, and defaults
pub fn load_config() -> LoadedConfig {
    let config_path = match get_config_path() {
        Some(path) => path,
        None => {
            warn!("config_dir_unavailable");
            return LoadedConfig {
                config: apply_env_overrides(Config::default()),
                config_path: PathBuf::from("config.toml"),
                project_config_path: None,
                status: ConfigLoadStatus::Error("Could not determine config directory".to_string()),
                project_error: None,
            };
        }
    };

    debug!(path = ?config_path, "config_path");

    let (mut config, status) = load_or_create_config(&config_path);

    let project_config_path = get_project_config_path();
    let mut project_error = None;
    if let Some(ref project_path) = project_config_path {
        match load_project_config(project_path) {
            Ok(partial) => {
                config = merge_config(&config, &partial);
                info!(path = ?project_path, "project_config_loaded");
            }
            Err(e) => {
                // Keep using global config only
                project_error = Some(e);
            }
        }
    }

    LoadedConfig {
        config: apply_env_overrides(config),
        config_path,
        project_config_path,
        status,
        project_error,
    }
}

/// Load config from file, or create default if not exists
fn load_or_create_config(config_path: &Path) -> (Config, ConfigLoadStatus) {
    match fs::read_to_string(config_path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(config) => {
                info!(path = ?config_path, "config_loaded");
                (config, ConfigLoadStatus::Loaded)
            }
            Err(e) => {
                warn!(path = ?config_path, error = %e, "config_malformed");
                (
                    Config::default(),
                    ConfigLoadStatus::Error(format!("Malformed TOML: {}", e)),
                )
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => create_default_config(config_path),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!(path = ?config_path, "config_permission_denied");
            (
                Config::default(),
                ConfigLoadStatus::Error("Permission denied reading config".to_string()),
            )
        }
        Err(e) => {
            warn!(path = ?config_path, error = %e, "config_read_failed");
            (
                Config::default(),
                ConfigLoadStatus::Error(format!("Read error: {}", e)),
            )
        }
    }
}

/// Create the default config file
fn create_default_config(config_path: &Path) -> (Config, ConfigLoadStatus) {
    let config = Config::default();

    if let Some(parent) = config_path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!(path = ?parent, error = %e, "config_dir_create_failed");
        return (
            config,
            ConfigLoadStatus::Error(format!("Could not create config directory: {}", e)),
        );
    }

    let toml_content = match toml::to_string_pretty(&config) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "config_serialize_failed");
            return (
                config,
                ConfigLoadStatus::Error(format!("Serialization error: {}", e)),
            );
        }
    };

    match fs::write(config_path, &toml_content) {
        Ok(()) => {
            info!(path = ?config_path, "config_created");
            (config, ConfigLoadStatus::Created)
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!(path = ?config_path, "config_create_permission_denied");
            (
                config,
                ConfigLoadStatus::Error("Permission denied creating config".to_string()),
            )
        }
        Err(e) => {
            warn!(path = ?config_path, error = %e, "config_write_failed");
            (
                config,
                ConfigLoadStatus::Error(format!("Write error: {}", e)),
            )
        }
    }
}

/// Apply environment variable overrides to config
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |key| env::var(key).ok())
}

fn apply_overrides(mut config: Config, var: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(path) = var("PROMPTFORGE_DB") {
        debug!("Overriding storage.database from PROMPTFORGE_DB");
        config.storage.database = path;
    }

    if let Some(level) = var("PROMPTFORGE_LOG") {
        debug!("Overriding logging.level from PROMPTFORGE_LOG");
        config.logging.level = level;
    }

    if let Some(url) = var("PROMPTFORGE_API_URL") {
        debug!("Overriding ai.api_url from PROMPTFORGE_API_URL");
        config.ai.api_url = url;
    }

    if let Some(model) = var("PROMPTFORGE_MODEL") {
        debug!("Overriding ai.model from PROMPTFORGE_MODEL");
        config.ai.model = model;
    }

    if let Some(user) = var("PROMPTFORGE_USER") {
        debug!("Overriding user.id from PROMPTFORGE_USER");
        config.user.id = user;
    }

    config
}
