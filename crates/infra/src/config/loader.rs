//! Configuration loader
//!
//! Loads the child application's [`AuthConfig`] from environment variables or
//! files.
//!
//! ## Loading Strategy
//! 1. A `.env` file in the working directory, if any, is merged into the
//!    process environment (existing variables win)
//! 2. Environment variables are read
//! 3. If they name neither the parent provider nor the embedded database,
//!    falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `MENTORHUB_PARENT_APP_URL`: Parent application (identity provider) URL
//! - `MENTORHUB_CHILD_APP_ID`: This application's id at the parent
//! - `MENTORHUB_API_KEY`: Key sent as `X-API-Key` to the token endpoint
//! - `MENTORHUB_REDIRECT_URI`: Callback URI registered with the parent
//! - `MENTORHUB_SCOPES`: Space- or comma-separated scopes
//! - `MENTORHUB_ENV`: `production`, `development` or `test`
//! - `MENTORHUB_SIGN_IN_PATH`: Where logout and failed refreshes land
//! - `MENTORHUB_SUPABASE_URL`: Embedded database URL (local sign-in)
//! - `MENTORHUB_SUPABASE_ANON_KEY`: Embedded database public key
//! - `MENTORHUB_SUPABASE_PROFILE_TABLE`: Profile table (default `users`)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./mentorhub.toml` or `./mentorhub.json` (current working directory)
//! 2. `./config/mentorhub.toml` or `./config/mentorhub.json`
//! 3. Relative to executable location

use std::path::{Path, PathBuf};

use mentorhub_domain::{AuthConfig, Environment, LocalAuthConfig, MentorHubError, Result};

const FILE_NAMES: [&str; 4] =
    ["mentorhub.toml", "mentorhub.json", "config/mentorhub.toml", "config/mentorhub.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `MentorHubError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
pub fn load() -> Result<AuthConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `MentorHubError::Config` if neither the parent provider pair
/// (`MENTORHUB_PARENT_APP_URL` + `MENTORHUB_CHILD_APP_ID`) nor the embedded
/// database pair (`MENTORHUB_SUPABASE_URL` + `MENTORHUB_SUPABASE_ANON_KEY`)
/// is set.
pub fn load_from_env() -> Result<AuthConfig> {
    from_lookup(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
}

/// Build a configuration from any variable source
///
/// # Errors
/// As [`load_from_env`]
pub fn from_lookup<F>(lookup: F) -> Result<AuthConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let parent_url = lookup("MENTORHUB_PARENT_APP_URL");
    let app_id = lookup("MENTORHUB_CHILD_APP_ID");
    let supabase_url = lookup("MENTORHUB_SUPABASE_URL");
    let anon_key = lookup("MENTORHUB_SUPABASE_ANON_KEY");
    let local_auth = match (supabase_url, anon_key) {
        (Some(url), Some(anon_key)) => Some(LocalAuthConfig {
            url,
            anon_key,
            profile_table: lookup("MENTORHUB_SUPABASE_PROFILE_TABLE")
                .unwrap_or_else(|| "users".to_string()),
        }),
        _ => None,
    };

    if (parent_url.is_none() || app_id.is_none()) && local_auth.is_none() {
        return Err(MentorHubError::Config(
            "Missing MENTORHUB_PARENT_APP_URL/MENTORHUB_CHILD_APP_ID and Supabase settings"
                .to_string(),
        ));
    }

    let mut config = AuthConfig::new(
        parent_url.unwrap_or_default(),
        app_id.unwrap_or_default(),
        lookup("MENTORHUB_REDIRECT_URI").unwrap_or_default(),
    );
    config.api_key = lookup("MENTORHUB_API_KEY");
    config.local_auth = local_auth;
    if let Some(env) = lookup("MENTORHUB_ENV") {
        config.environment = Environment::parse(&env);
    }
    if let Some(scopes) = lookup("MENTORHUB_SCOPES") {
        config.scopes = parse_scopes(&scopes);
    }
    if let Some(path) = lookup("MENTORHUB_SIGN_IN_PATH") {
        config.sign_in_path = path;
    }
    Ok(config)
}

fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `MentorHubError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<AuthConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MentorHubError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            MentorHubError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| MentorHubError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `MentorHubError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<AuthConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| MentorHubError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MentorHubError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(MentorHubError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}
