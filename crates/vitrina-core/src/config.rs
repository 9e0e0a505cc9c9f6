use crate::app_config::{AppConfig, Environment};
use crate::cart::DEFAULT_CART_KEY;
use crate::image::DEFAULT_FALLBACK_IMAGE;
use crate::price::DEFAULT_CURRENCY_CODE;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let backend_url = require("VITRINA_BACKEND_URL")?;
    url::Url::parse(&backend_url).map_err(|e| ConfigError::InvalidEnvVar {
        var: "VITRINA_BACKEND_URL".to_string(),
        reason: e.to_string(),
    })?;

    let env = parse_environment(&or_default("VITRINA_ENV", "development"))?;
    let log_level = or_default("VITRINA_LOG_LEVEL", "info");
    let backend_token = lookup("VITRINA_BACKEND_TOKEN")
        .ok()
        .filter(|t| !t.is_empty());

    let app_origin = or_default("VITRINA_APP_ORIGIN", "http://localhost:3000");
    url::Url::parse(&app_origin).map_err(|e| ConfigError::InvalidEnvVar {
        var: "VITRINA_APP_ORIGIN".to_string(),
        reason: e.to_string(),
    })?;

    let fallback_image = or_default("VITRINA_FALLBACK_IMAGE", DEFAULT_FALLBACK_IMAGE);
    let currency_code = or_default("VITRINA_CURRENCY_CODE", DEFAULT_CURRENCY_CODE);
    if currency_code.is_empty() || !currency_code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::InvalidEnvVar {
            var: "VITRINA_CURRENCY_CODE".to_string(),
            reason: format!("\"{currency_code}\" is not an alphabetic currency code"),
        });
    }

    let cart_dir = PathBuf::from(or_default("VITRINA_CART_DIR", "./.vitrina"));
    let cart_key = or_default("VITRINA_CART_KEY", DEFAULT_CART_KEY);

    let request_timeout_secs = parse_u64("VITRINA_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("VITRINA_USER_AGENT", "vitrina/0.1");
    let max_retries = parse_u32("VITRINA_MAX_RETRIES", "3")?;
    let retry_backoff_base_secs = parse_u64("VITRINA_RETRY_BACKOFF_BASE_SECS", "1")?;

    Ok(AppConfig {
        env,
        log_level,
        backend_url,
        backend_token,
        app_origin,
        fallback_image,
        currency_code,
        cart_dir,
        cart_key,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "VITRINA_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
