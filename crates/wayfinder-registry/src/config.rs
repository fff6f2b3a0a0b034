//! Registration config: which APIs exist, where their specs live, and
//! how to authenticate against them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How requests to an API authenticate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    Bearer,
    ApiKey,
    Basic,
    #[default]
    None,
}

/// Authentication settings for one API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type", default)]
    pub auth_type: AuthType,
    /// Secret value; `$NAME` resolves from the environment at load time.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_header_name")]
    pub header_name: String,
    /// For `api_key` auth: carry the key in a header or a query param.
    #[serde(default = "default_api_key_in")]
    pub api_key_in: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            auth_type: AuthType::None,
            token: None,
            header_name: default_header_name(),
            api_key_in: default_api_key_in(),
        }
    }
}

fn default_header_name() -> String {
    "Authorization".to_string()
}

fn default_api_key_in() -> String {
    "header".to_string()
}

/// Per-API behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_batch_size")]
    pub max_batch_size: u32,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: u32,
    #[serde(default = "default_confirm_destructive")]
    pub confirm_destructive: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            default_page_size: default_page_size(),
            max_batch_size: default_batch_size(),
            rate_limit_per_second: default_rate_limit(),
            confirm_destructive: default_confirm_destructive(),
        }
    }
}

fn default_page_size() -> u32 {
    20
}

fn default_batch_size() -> u32 {
    50
}

fn default_rate_limit() -> u32 {
    5
}

fn default_confirm_destructive() -> bool {
    true
}

/// One registered API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub name: String,
    /// URL or filesystem path of the OpenAPI/Swagger document.
    pub spec_url: String,
    /// Base URL requests are issued against.
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub settings: ApiSettings,
}

/// Root config: every API this process serves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub apis: Vec<ApiConfig>,
}

/// Resolve `$NAME` values from the environment. Anything else passes
/// through untouched; a missing variable resolves to the empty string.
pub fn resolve_env_vars(value: &str) -> String {
    match value.strip_prefix('$') {
        Some(name) => std::env::var(name).unwrap_or_default(),
        None => value.to_string(),
    }
}

/// Load and validate a JSON config file, resolving `$ENV` auth tokens.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut config: Config = serde_json::from_str(&content).map_err(|e| ConfigError::Json {
        path: path.display().to_string(),
        source: e,
    })?;

    for api in &mut config.apis {
        if let Some(token) = &api.auth.token {
            api.auth.token = Some(resolve_env_vars(token));
        }
        validate_settings(&api.name, &api.settings)?;
    }

    Ok(config)
}

fn validate_settings(api: &str, settings: &ApiSettings) -> Result<(), ConfigError> {
    let in_range = |value: u32| (1..=100).contains(&value);
    if !in_range(settings.default_page_size) {
        return Err(ConfigError::Invalid(format!(
            "api '{api}': default_page_size must be in 1..=100"
        )));
    }
    if !in_range(settings.max_batch_size) {
        return Err(ConfigError::Invalid(format!(
            "api '{api}': max_batch_size must be in 1..=100"
        )));
    }
    if !in_range(settings.rate_limit_per_second) {
        return Err(ConfigError::Invalid(format!(
            "api '{api}': rate_limit_per_second must be in 1..=100"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{json}").unwrap();
        file
    }

    #[test]
    fn env_var_resolution() {
        std::env::set_var("WAYFINDER_TEST_KEY", "secret-key-123");
        assert_eq!(resolve_env_vars("$WAYFINDER_TEST_KEY"), "secret-key-123");
        std::env::remove_var("WAYFINDER_TEST_KEY");

        assert_eq!(resolve_env_vars("plain-value"), "plain-value");
        assert_eq!(resolve_env_vars("$WAYFINDER_TEST_MISSING_12345"), "");
    }

    #[test]
    fn load_minimal_config_applies_defaults() {
        let file = write_config(
            r#"{
                "apis": [
                    {
                        "name": "petstore",
                        "spec_url": "http://example.com/openapi.json",
                        "base_url": "http://example.com"
                    }
                ]
            }"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.apis.len(), 1);

        let api = &config.apis[0];
        assert_eq!(api.name, "petstore");
        assert_eq!(api.auth.auth_type, AuthType::None);
        assert_eq!(api.auth.header_name, "Authorization");
        assert_eq!(api.settings.default_page_size, 20);
        assert!(api.settings.confirm_destructive);
    }

    #[test]
    fn auth_token_resolved_from_environment() {
        std::env::set_var("WAYFINDER_CFG_TOKEN", "tok-42");
        let file = write_config(
            r#"{
                "apis": [
                    {
                        "name": "a",
                        "spec_url": "spec.json",
                        "base_url": "http://a",
                        "auth": {"type": "bearer", "token": "$WAYFINDER_CFG_TOKEN"}
                    }
                ]
            }"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.apis[0].auth.token.as_deref(), Some("tok-42"));
        std::env::remove_var("WAYFINDER_CFG_TOKEN");
    }

    #[test]
    fn out_of_range_settings_rejected() {
        let file = write_config(
            r#"{
                "apis": [
                    {
                        "name": "a",
                        "spec_url": "spec.json",
                        "base_url": "http://a",
                        "settings": {"default_page_size": 0}
                    }
                ]
            }"#,
        );

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_rejected() {
        let file = write_config("{not json");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn missing_file_rejected() {
        let err = load_config(Path::new("/nonexistent/apis.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
