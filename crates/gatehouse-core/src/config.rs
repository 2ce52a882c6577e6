//! Configuration management for Gatehouse.
//!
//! Loads configuration from ${GATEHOUSE_HOME}/config.toml with sensible defaults.
//! Backend settings are resolved from the environment first, then the file.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the backend endpoint.
pub const ENDPOINT_ENV: &str = "GATEHOUSE_ENDPOINT";
/// Environment variable overriding the backend project id.
pub const PROJECT_ID_ENV: &str = "GATEHOUSE_PROJECT_ID";
/// Environment variable overriding the storage bucket id.
pub const BUCKET_ID_ENV: &str = "GATEHOUSE_BUCKET_ID";
/// Environment variable overriding the application origin.
pub const APP_ORIGIN_ENV: &str = "GATEHOUSE_APP_ORIGIN";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// New comments/sections from the template are always present, while the
/// user's customized values are preserved.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for Gatehouse configuration and data directories.
    //!
    //! GATEHOUSE_HOME resolution order:
    //! 1. GATEHOUSE_HOME environment variable (if set)
    //! 2. ~/.config/gatehouse (default)
    //! 3. ./.gatehouse when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the Gatehouse home directory.
    pub fn gatehouse_home() -> PathBuf {
        if let Ok(home) = std::env::var("GATEHOUSE_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".gatehouse"),
            |h| h.join(".config").join("gatehouse"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        gatehouse_home().join("config.toml")
    }

    /// Returns the path to the persisted cookie jar.
    pub fn cookie_jar_path() -> PathBuf {
        gatehouse_home().join("cookies.json")
    }

    /// Returns the path of the unfinished sign-up record.
    pub fn signup_progress_path() -> PathBuf {
        gatehouse_home().join("signup.json")
    }

    /// Returns the directory holding rolling log files.
    pub fn logs_dir() -> PathBuf {
        gatehouse_home().join("logs")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend API endpoint
    pub endpoint: Option<String>,

    /// Backend project identifier
    pub project_id: Option<String>,

    /// Storage bucket used for profile images
    pub bucket_id: Option<String>,

    /// Origin of the web application (scheme + host + optional port)
    pub app_origin: String,

    /// Route shown after a successful sign-in
    pub landing_route: String,

    /// Route of the auth page itself
    pub auth_route: String,

    /// Whether to open redirect targets in the system browser
    pub open_browser: bool,

    /// Timeout for backend requests in seconds (0 disables)
    pub request_timeout_secs: u64,
}

impl Config {
    const DEFAULT_APP_ORIGIN: &str = "http://localhost:3000";
    const DEFAULT_LANDING_ROUTE: &str = "/";
    const DEFAULT_AUTH_ROUTE: &str = "/start";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Saves a single key to a config file, keeping comments and other values.
    ///
    /// Creates the file from the template if it doesn't exist.
    pub fn save_value_to(path: &Path, key: ConfigKey, raw: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        let trimmed = raw.trim();
        match key {
            ConfigKey::OpenBrowser => {
                let flag: bool = trimmed
                    .parse()
                    .with_context(|| format!("Expected true or false for {key}, got '{raw}'"))?;
                doc[key.toml_key()] = value(flag);
            }
            ConfigKey::RequestTimeoutSecs => {
                let secs: i64 = trimmed
                    .parse()
                    .with_context(|| format!("Expected a number of seconds for {key}, got '{raw}'"))?;
                if secs < 0 {
                    anyhow::bail!("{key} must not be negative");
                }
                doc[key.toml_key()] = value(secs);
            }
            ConfigKey::Endpoint | ConfigKey::AppOrigin => {
                url::Url::parse(trimmed)
                    .with_context(|| format!("Invalid URL for {key}: {trimmed}"))?;
                doc[key.toml_key()] = value(trimmed);
            }
            ConfigKey::ProjectId | ConfigKey::BucketId => {
                doc[key.toml_key()] = value(trimmed);
            }
        }

        // Round-trip through serde so a bad edit never lands on disk.
        let rendered = doc.to_string();
        toml::from_str::<Config>(&rendered).context("Edited config no longer parses")?;

        Self::write_config(path, &rendered)
    }

    /// Returns the request timeout, or None when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            project_id: None,
            bucket_id: None,
            app_origin: Self::DEFAULT_APP_ORIGIN.to_string(),
            landing_route: Self::DEFAULT_LANDING_ROUTE.to_string(),
            auth_route: Self::DEFAULT_AUTH_ROUTE.to_string(),
            open_browser: true,
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Keys editable through `gatehouse config set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Endpoint,
    ProjectId,
    BucketId,
    AppOrigin,
    OpenBrowser,
    RequestTimeoutSecs,
}

impl ConfigKey {
    pub fn toml_key(self) -> &'static str {
        match self {
            ConfigKey::Endpoint => "endpoint",
            ConfigKey::ProjectId => "project_id",
            ConfigKey::BucketId => "bucket_id",
            ConfigKey::AppOrigin => "app_origin",
            ConfigKey::OpenBrowser => "open_browser",
            ConfigKey::RequestTimeoutSecs => "request_timeout_secs",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.toml_key())
    }
}

impl FromStr for ConfigKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().replace('-', "_").as_str() {
            "endpoint" => Ok(ConfigKey::Endpoint),
            "project_id" => Ok(ConfigKey::ProjectId),
            "bucket_id" => Ok(ConfigKey::BucketId),
            "app_origin" => Ok(ConfigKey::AppOrigin),
            "open_browser" => Ok(ConfigKey::OpenBrowser),
            "request_timeout_secs" => Ok(ConfigKey::RequestTimeoutSecs),
            other => Err(format!("Unknown config key: {other}")),
        }
    }
}

/// Backend connection settings after env/config resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    /// Endpoint without trailing slash, e.g. `https://cloud.appwrite.io/v1`.
    pub endpoint: String,
    pub project_id: String,
    pub bucket_id: Option<String>,
    pub timeout: Option<Duration>,
}

impl BackendSettings {
    /// Resolves settings from the process environment and the config file.
    pub fn resolve(config: &Config) -> Result<Self> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    /// Resolves settings with precedence: env > config.
    ///
    /// A missing endpoint or project id is a fatal startup error.
    pub fn resolve_with<F>(config: &Config, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = pick(&env, ENDPOINT_ENV, config.endpoint.as_deref()).with_context(|| {
            format!("Backend endpoint is not defined. Set {ENDPOINT_ENV} or `endpoint` in config.toml.")
        })?;
        url::Url::parse(&endpoint)
            .with_context(|| format!("Invalid backend endpoint: {endpoint}"))?;

        let project_id =
            pick(&env, PROJECT_ID_ENV, config.project_id.as_deref()).with_context(|| {
                format!(
                    "Backend project ID is not defined. Set {PROJECT_ID_ENV} or `project_id` in config.toml."
                )
            })?;

        let bucket_id = pick(&env, BUCKET_ID_ENV, config.bucket_id.as_deref());

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id,
            bucket_id,
            timeout: config.request_timeout(),
        })
    }
}

/// Absolute URLs the auth page redirects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    /// Where the user lands after authenticating.
    pub landing_url: String,
    /// The auth page itself (OAuth failure target).
    pub auth_url: String,
}

impl Routes {
    pub fn resolve(config: &Config) -> Result<Self> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(config: &Config, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let origin = pick(&env, APP_ORIGIN_ENV, Some(&config.app_origin))
            .unwrap_or_else(|| Config::DEFAULT_APP_ORIGIN.to_string());
        let base =
            url::Url::parse(&origin).with_context(|| format!("Invalid app origin: {origin}"))?;

        let join = |route: &str| -> Result<String> {
            base.join(route)
                .map(String::from)
                .with_context(|| format!("Invalid route '{route}' for origin {origin}"))
        };

        Ok(Self {
            landing_url: join(&config.landing_route)?,
            auth_url: join(&config.auth_route)?,
        })
    }
}

/// Picks the first non-blank value from env, then config.
fn pick<F>(env: &F, key: &str, config_value: Option<&str>) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .filter(|v| !v.trim().is_empty())
        .or_else(|| config_value.map(str::to_string))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.app_origin, "http://localhost:3000");
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "project_id = \"p1\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.project_id.as_deref(), Some("p1"));
        assert_eq!(config.auth_route, "/start");
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "# mine").unwrap();

        let err = Config::init(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_save_value_preserves_comments_and_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::save_value_to(&path, ConfigKey::ProjectId, "proj-42").unwrap();
        Config::save_value_to(&path, ConfigKey::Endpoint, "https://api.example.com/v1").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("# Backend project identifier"));

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.project_id.as_deref(), Some("proj-42"));
        assert_eq!(config.endpoint.as_deref(), Some("https://api.example.com/v1"));
    }

    #[test]
    fn test_save_value_rejects_bad_url_and_bool() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(Config::save_value_to(&path, ConfigKey::Endpoint, "not a url").is_err());
        assert!(Config::save_value_to(&path, ConfigKey::OpenBrowser, "maybe").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_backend_settings_require_endpoint_and_project() {
        let config = Config::default();

        let err = BackendSettings::resolve_with(&config, env_from(&[])).unwrap_err();
        assert!(err.to_string().contains(ENDPOINT_ENV));

        let err = BackendSettings::resolve_with(
            &config,
            env_from(&[(ENDPOINT_ENV, "https://api.example.com/v1")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains(PROJECT_ID_ENV));
    }

    #[test]
    fn test_backend_settings_env_overrides_config() {
        let config = Config {
            endpoint: Some("https://file.example.com/v1/".to_string()),
            project_id: Some("file-project".to_string()),
            bucket_id: Some("avatars".to_string()),
            ..Config::default()
        };

        let settings = BackendSettings::resolve_with(
            &config,
            env_from(&[(PROJECT_ID_ENV, "env-project"), (BUCKET_ID_ENV, "  ")]),
        )
        .unwrap();

        assert_eq!(settings.endpoint, "https://file.example.com/v1");
        assert_eq!(settings.project_id, "env-project");
        assert_eq!(settings.bucket_id.as_deref(), Some("avatars"));
        assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_routes_join_origin() {
        let config = Config::default();
        let routes =
            Routes::resolve_with(&config, env_from(&[(APP_ORIGIN_ENV, "https://app.example.com")]))
                .unwrap();
        assert_eq!(routes.landing_url, "https://app.example.com/");
        assert_eq!(routes.auth_url, "https://app.example.com/start");
    }

    #[test]
    fn test_config_key_parses_dashed_names() {
        assert_eq!("project-id".parse::<ConfigKey>(), Ok(ConfigKey::ProjectId));
        assert!("colour".parse::<ConfigKey>().is_err());
    }
}
