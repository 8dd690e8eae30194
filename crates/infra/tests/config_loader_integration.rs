//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::fs;

use mentorhub_domain::{Environment, MentorHubError, SameSite};
use mentorhub_infra::config;
use tempfile::TempDir;

#[test]
fn test_load_config_from_json_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("mentorhub.json");
    fs::write(
        &path,
        r#"{
            "parent_app_url": "https://hub.example.com",
            "child_app_id": "mentor-app",
            "api_key": "child-key",
            "redirect_uri": "https://mentor.example.com/auth/callback",
            "environment": "production",
            "scopes": ["read", "profile"]
        }"#,
    )?;

    let config = config::load_from_file(Some(path))?;

    assert!(config.oauth_configured());
    assert_eq!(config.api_key.as_deref(), Some("child-key"));
    assert_eq!(config.environment, Environment::Production);
    assert_eq!(config.scope_string(), "read profile");
    assert_eq!(config.storage_attributes().same_site, SameSite::Strict);
    assert_eq!(config.refresh_lead_secs, 300);
    assert_eq!(config.min_refresh_delay_secs, 60);
    assert_eq!(
        config.token_url()?.as_str(),
        "https://hub.example.com/api/auth/child-app/token"
    );
    Ok(())
}

#[test]
fn test_load_config_from_toml_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("mentorhub.toml");
    fs::write(
        &path,
        r#"
parent_app_url = "https://hub.example.com/"
child_app_id = "mentor-app"
redirect_uri = "http://localhost:5173/auth/callback"
sign_in_path = "/signin"
access_token_ttl_secs = 900

[local_auth]
url = "https://db.example.com"
anon_key = "anon"
profile_table = "profiles"
"#,
    )?;

    let config = config::load_from_file(Some(path))?;

    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.sign_in_path, "/signin");
    assert_eq!(config.access_token_ttl_secs, 900);
    assert_eq!(config.storage_attributes().same_site, SameSite::Lax);
    let local = config.local_auth.expect("local auth section");
    assert_eq!(local.profile_table, "profiles");
    Ok(())
}

#[test]
fn test_invalid_toml_is_config_error() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("mentorhub.toml");
    fs::write(&path, "child_app_id = [unterminated")?;

    let result = config::load_from_file(Some(path));
    assert!(matches!(result, Err(MentorHubError::Config(_))));
    Ok(())
}

#[test]
fn test_lookup_without_any_provider_fails() {
    let result = config::from_lookup(|_| None);
    assert!(matches!(result, Err(MentorHubError::Config(_))));
}
